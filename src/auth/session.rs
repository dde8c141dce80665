//! Session state observed by the UI

use super::types::User;

/// Coarse session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Unauthenticated,
    Authenticated,
}

/// The client's belief about who is signed in
///
/// The user travels inside the `Authenticated` variant, so status and user
/// always change in the same write.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    /// Startup resolution has not finished; render a placeholder
    #[default]
    Loading,
    Unauthenticated,
    Authenticated(User),
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Loading => SessionStatus::Loading,
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}
