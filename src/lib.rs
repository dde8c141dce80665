//! Jamhub client core
//!
//! Session, token and route-guard plumbing shared by every screen of the
//! Jamhub game jam platform: sign-in and registration, startup session
//! resolution, token-bearing requests with refresh-on-401, and the two
//! route-guard layers.

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod navigation;
pub mod profile;
pub mod storage;

use std::sync::Arc;

use crate::auth::{AuthContext, PendingRedirect};
use crate::config::ClientOptions;
use crate::error::Result;
use crate::fetch::HttpClient;
use crate::guard::{EdgeGuard, PageGuard};
use crate::navigation::Navigator;
use crate::profile::ProfileApi;
use crate::storage::{Flags, KeyValueStore, TokenStore};

/// The main entry point for the Jamhub client
///
/// One instance per app. Everything it hands out shares the same session.
pub struct JamHub {
    options: ClientOptions,
    http: HttpClient,
    auth: AuthContext,
    flags: Flags,
}

impl JamHub {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `options` - API location, paths and lifetimes
    /// * `store` - where tokens, the pending redirect and visit markers persist
    /// * `navigator` - host hook that performs redirects
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use jamhub::{JamHub, config::ClientOptions};
    /// use jamhub::navigation::HistoryNavigator;
    /// use jamhub::storage::MemoryStore;
    ///
    /// let hub = JamHub::new(
    ///     ClientOptions::default().with_api_url("https://api.jamhub.dev"),
    ///     Arc::new(MemoryStore::new()),
    ///     Arc::new(HistoryNavigator::new()),
    /// ).unwrap();
    /// assert!(hub.auth().snapshot().is_loading());
    /// ```
    pub fn new(
        options: ClientOptions,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let tokens = TokenStore::new(store.clone(), &options);
        let http = HttpClient::new(options.clone(), tokens, navigator)?;
        let auth = AuthContext::new(http.clone(), PendingRedirect::new(store.clone(), &options));
        let flags = Flags::new(store, &options);

        Ok(Self {
            options,
            http,
            auth,
            flags,
        })
    }

    /// Session state machine
    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Authenticated request dispatcher for domain screens
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Interceptor for the server side of navigation
    pub fn edge_guard(&self) -> EdgeGuard {
        EdgeGuard::new(&self.options)
    }

    /// Guard for one protected page
    pub fn page_guard(&self) -> PageGuard {
        PageGuard::new(self.auth.clone(), self.flags.clone(), &self.options)
    }

    pub fn profile(&self) -> ProfileApi {
        ProfileApi::new(self.http.clone(), self.auth.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{
        AuthContext, Credentials, SessionState, SessionStatus, SignUpData, User, UserPatch,
    };
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::guard::{EdgeDecision, PageDecision};
    pub use crate::JamHub;
}
