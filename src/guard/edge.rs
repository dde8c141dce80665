use chrono::Utc;
use log::debug;

use crate::config::ClientOptions;
use crate::navigation::login_redirect;
use crate::storage::StoredTokens;

/// What the edge should do with an incoming navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeDecision {
    Continue,
    Redirect(String),
}

/// Request interceptor for statically protected paths
///
/// Does not validate the token, only that one is present; validation happens
/// when the app resolves its session.
#[derive(Debug, Clone)]
pub struct EdgeGuard {
    protected_prefixes: Vec<String>,
    login_path: String,
    cookie_name: String,
}

impl EdgeGuard {
    pub fn new(options: &ClientOptions) -> Self {
        Self {
            protected_prefixes: options
                .protected_prefixes
                .iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .collect(),
            login_path: options.login_path.clone(),
            cookie_name: options.token_record_key.clone(),
        }
    }

    /// Whether `path` is a protected prefix or lies beneath one
    pub fn is_protected(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.protected_prefixes.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .map_or(false, |rest| rest.starts_with('/'))
        })
    }

    /// Decide on a navigation to `path_and_query` carrying `cookie_header`
    pub fn intercept(&self, path_and_query: &str, cookie_header: Option<&str>) -> EdgeDecision {
        if !self.is_protected(path_and_query) {
            return EdgeDecision::Continue;
        }
        if self.has_access_token(cookie_header) {
            return EdgeDecision::Continue;
        }

        debug!("edge: no access token for {}, redirecting to login", path_and_query);
        EdgeDecision::Redirect(login_redirect(&self.login_path, path_and_query))
    }

    fn has_access_token(&self, cookie_header: Option<&str>) -> bool {
        let Some(header) = cookie_header else {
            return false;
        };
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == self.cookie_name)
            .filter_map(|(_, value)| StoredTokens::from_cookie_value(value))
            .any(|record| record.live_access_token(Utc::now()).is_some())
    }
}
