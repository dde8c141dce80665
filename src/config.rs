//! Configuration options for the Jamhub client

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Same-site policy attached to persisted cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes applied to every persisted cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Cookie path
    pub path: String,

    /// Only send over HTTPS (enabled in production)
    pub secure: bool,

    /// Same-site policy
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secure: false,
            same_site: SameSite::Strict,
        }
    }
}

/// Configuration options for the Jamhub client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the REST API server
    pub api_url: String,

    /// Path prefix of the auth endpoints
    pub auth_path: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Where unauthenticated visitors are sent
    pub login_path: String,

    /// Default destination after sign-in and for visit-once pages
    pub home_path: String,

    /// Paths (and their sub-paths) that require an access token at the edge
    pub protected_prefixes: Vec<String>,

    /// Lifetime of the access token in storage
    pub access_token_max_age: Duration,

    /// Lifetime of the refresh token in storage
    pub refresh_token_max_age: Duration,

    /// Lifetime of visit-once markers
    pub visit_marker_max_age: Duration,

    /// Prefix of visit-once marker keys
    pub visit_marker_prefix: String,

    /// Storage key of the post-login destination
    pub pending_redirect_key: String,

    /// Storage key (and cookie name) of the token record
    pub token_record_key: String,

    /// Cookie attributes
    pub cookie: CookieOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:4000".to_string(),
            auth_path: "/api/auth".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
            protected_prefixes: [
                "/profile",
                "/teams/create",
                "/teams/invitations",
                "/jams/create",
                "/games/submit",
                "/settings",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            access_token_max_age: Duration::from_secs(60 * 60),
            refresh_token_max_age: Duration::from_secs(7 * 24 * 60 * 60),
            visit_marker_max_age: Duration::from_secs(365 * 24 * 60 * 60),
            visit_marker_prefix: "visited_".to_string(),
            pending_redirect_key: "redirectAfterLogin".to_string(),
            token_record_key: "authSession".to_string(),
            cookie: CookieOptions::default(),
        }
    }
}

impl ClientOptions {
    /// Build options from the environment, loading a `.env` file if present.
    ///
    /// Reads `JAMHUB_API_URL`, `JAMHUB_REQUEST_TIMEOUT_SECS` and
    /// `JAMHUB_SECURE_COOKIES`; anything unset keeps its default.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut options = Self::default();
        if let Ok(url) = std::env::var("JAMHUB_API_URL") {
            options.api_url = url;
        }
        if let Ok(secs) = std::env::var("JAMHUB_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::config(format!("invalid JAMHUB_REQUEST_TIMEOUT_SECS: {}", secs))
            })?;
            options.request_timeout = Some(Duration::from_secs(secs));
        }
        if let Ok(secure) = std::env::var("JAMHUB_SECURE_COOKIES") {
            options.cookie.secure = matches!(secure.as_str(), "1" | "true" | "yes");
        }

        options.validate()?;
        Ok(options)
    }

    /// Check the options for values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url)?;
        if url.cannot_be_a_base() {
            return Err(Error::config(format!("api_url is not a base URL: {}", self.api_url)));
        }
        if self.access_token_max_age > self.refresh_token_max_age {
            return Err(Error::config(
                "access token must not outlive the refresh token",
            ));
        }
        if !self.login_path.starts_with('/') || !self.home_path.starts_with('/') {
            return Err(Error::config("login_path and home_path must be absolute paths"));
        }
        Ok(())
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the auth endpoint prefix
    pub fn with_auth_path(mut self, value: &str) -> Self {
        self.auth_path = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the login page path
    pub fn with_login_path(mut self, value: &str) -> Self {
        self.login_path = value.to_string();
        self
    }

    /// Set the home page path
    pub fn with_home_path(mut self, value: &str) -> Self {
        self.home_path = value.to_string();
        self
    }

    /// Replace the list of protected path prefixes
    pub fn with_protected_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set token lifetimes
    pub fn with_token_lifetimes(mut self, access: Duration, refresh: Duration) -> Self {
        self.access_token_max_age = access;
        self.refresh_token_max_age = refresh;
        self
    }

    /// Set cookie attributes
    pub fn with_cookie(mut self, value: CookieOptions) -> Self {
        self.cookie = value;
        self
    }

    pub(crate) fn auth_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.auth_path, path)
    }
}
