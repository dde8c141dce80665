//! Named boolean flags scoped to this device

use log::debug;
use std::sync::Arc;
use std::time::Duration;

use super::KeyValueStore;
use crate::config::ClientOptions;
use crate::error::Result;

/// Mark-and-check flags, used for visit-once pages
///
/// A flag is never unset by the client; it only disappears when its
/// max-age runs out.
#[derive(Clone)]
pub struct Flags {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    max_age: Duration,
}

impl Flags {
    pub fn new(store: Arc<dyn KeyValueStore>, options: &ClientOptions) -> Self {
        Self {
            store,
            prefix: options.visit_marker_prefix.clone(),
            max_age: options.visit_marker_max_age,
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    pub fn is_set(&self, name: &str) -> Result<bool> {
        Ok(self.store.get(&self.key(name))?.is_some())
    }

    pub fn set(&self, name: &str) -> Result<()> {
        debug!("setting flag {}", name);
        self.store.set(&self.key(name), "true", self.max_age)
    }

    /// Set the flag and report whether it was already set
    pub fn check_and_set(&self, name: &str) -> Result<bool> {
        if self.is_set(name)? {
            return Ok(true);
        }
        self.set(name)?;
        Ok(false)
    }
}
