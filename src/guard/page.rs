use log::{debug, warn};

use crate::auth::{AuthContext, SessionState};
use crate::config::ClientOptions;
use crate::navigation::{login_redirect, Navigation};
use crate::storage::Flags;

/// What a guarded page should show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    /// Session still resolving; show a blocking placeholder
    Placeholder,
    Redirect(String),
    Render,
}

/// Client-side wrapper around a protected page
#[derive(Clone)]
pub struct PageGuard {
    auth: AuthContext,
    flags: Flags,
    login_path: String,
    home_path: String,
    visit_once: Option<String>,
}

impl PageGuard {
    pub fn new(auth: AuthContext, flags: Flags, options: &ClientOptions) -> Self {
        Self {
            auth,
            flags,
            login_path: options.login_path.clone(),
            home_path: options.home_path.clone(),
            visit_once: None,
        }
    }

    /// Show the page at most once on this device; later visits go home
    pub fn visit_once(mut self, page_key: impl Into<String>) -> Self {
        self.visit_once = Some(page_key.into());
        self
    }

    /// Decide from the current session without waiting
    ///
    /// Marks a visit-once page as visited when it decides to render it.
    pub fn evaluate(&self, current_path: &str) -> PageDecision {
        match self.auth.snapshot() {
            SessionState::Loading => PageDecision::Placeholder,
            SessionState::Unauthenticated => {
                if let Err(err) = self.auth.pending_redirect().remember(current_path) {
                    debug!("not remembering {}: {}", current_path, err);
                }
                PageDecision::Redirect(login_redirect(&self.login_path, current_path))
            }
            SessionState::Authenticated(_) => match &self.visit_once {
                None => PageDecision::Render,
                Some(key) => match self.flags.check_and_set(key) {
                    Ok(false) => PageDecision::Render,
                    Ok(true) => PageDecision::Redirect(self.home_path.clone()),
                    Err(err) => {
                        warn!("visit marker for {} unavailable: {}", key, err);
                        PageDecision::Redirect(self.home_path.clone())
                    }
                },
            },
        }
    }

    /// Resolve the session if nobody has yet, decide, and carry out any
    /// redirect
    pub async fn enter(&self, current_path: &str) -> PageDecision {
        self.auth.initialize().await;
        let decision = self.evaluate(current_path);
        if let PageDecision::Redirect(to) = &decision {
            self.auth.navigator().navigate(Navigation::Push(to.clone()));
        }
        decision
    }
}
