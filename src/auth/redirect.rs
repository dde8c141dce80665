//! Post-login destination remembered across navigations

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::navigation::sanitize_destination;
use crate::storage::KeyValueStore;

// Deep links that divert to login are expected to complete within a day.
const PENDING_REDIRECT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Single stored path to visit after the next successful sign-in
#[derive(Clone)]
pub struct PendingRedirect {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl PendingRedirect {
    pub fn new(store: Arc<dyn KeyValueStore>, options: &ClientOptions) -> Self {
        Self {
            store,
            key: options.pending_redirect_key.clone(),
        }
    }

    /// Remember `path`, replacing any earlier one
    pub fn remember(&self, path: &str) -> Result<()> {
        let path = sanitize_destination(path)
            .ok_or_else(|| Error::config(format!("not a local path: {}", path)))?;
        debug!("remembering post-login destination {}", path);
        self.store.set(&self.key, path, PENDING_REDIRECT_MAX_AGE)
    }

    /// Read without consuming
    pub fn peek(&self) -> Option<String> {
        match self.store.get(&self.key) {
            Ok(value) => value,
            Err(err) => {
                warn!("failed to read pending redirect: {}", err);
                None
            }
        }
    }

    /// Read and delete
    pub fn take(&self) -> Option<String> {
        let value = self.peek()?;
        if let Err(err) = self.store.remove(&self.key) {
            warn!("failed to clear pending redirect: {}", err);
        }
        sanitize_destination(&value).map(str::to_string)
    }
}
