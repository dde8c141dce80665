//! Navigation side effects
//!
//! The auth core decides *where* to go; the host application decides *how*.
//! A browser shell maps [`Navigation::Push`] to a client-side route change
//! and [`Navigation::Hard`] to a full page load.

use log::debug;
use std::sync::Mutex;

/// A requested navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Client-side route change
    Push(String),
    /// Full reload of the target, discarding in-memory state
    Hard(String),
}

impl Navigation {
    pub fn target(&self) -> &str {
        match self {
            Navigation::Push(to) | Navigation::Hard(to) => to,
        }
    }
}

/// Host hook that performs navigations
pub trait Navigator: Send + Sync {
    fn navigate(&self, to: Navigation);
}

/// Navigator that only records what was requested
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every navigation so far, oldest first
    pub fn history(&self) -> Vec<Navigation> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Navigation> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, to: Navigation) {
        debug!("navigate: {:?}", to);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(to);
    }
}

/// Build `<login_path>?redirectTo=<target>` with the target percent-encoded
pub fn login_redirect(login_path: &str, target: &str) -> String {
    format!("{}?redirectTo={}", login_path, urlencoding::encode(target))
}

/// Accept only same-origin absolute paths as post-login destinations
pub fn sanitize_destination(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    if raw.starts_with('/') && !raw.starts_with("//") && !raw.contains('\\') {
        Some(raw)
    } else {
        None
    }
}

/// Post-login destination carried in a query string
///
/// Callers use `redirectTo`, `returnUrl` or `redirect`; the first valid one
/// wins.
pub fn destination_from_query(query: &str) -> Option<String> {
    let query = query.trim_start_matches('?');
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    ["redirectTo", "returnUrl", "redirect"].iter().find_map(|name| {
        pairs
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| sanitize_destination(value))
            .map(str::to_string)
    })
}
