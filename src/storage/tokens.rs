//! Persisted token pair

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::KeyValueStore;
use crate::auth::TokenPair;
use crate::config::{ClientOptions, CookieOptions, SameSite};
use crate::error::Result;

/// Which half of the pair to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// The single record both tokens are persisted in
///
/// The access token keeps its own shorter lifetime inside the record, so
/// writing the pair is one storage operation instead of two.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
}

impl StoredTokens {
    /// Decode a record from a (percent-encoded) cookie value
    pub fn from_cookie_value(raw: &str) -> Option<Self> {
        let decoded = urlencoding::decode(raw).ok()?;
        serde_json::from_str(&decoded).ok()
    }

    /// Encode the record as a cookie value
    pub fn to_cookie_value(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(urlencoding::encode(&json).into_owned())
    }

    /// Access token, if it has not outlived its max-age
    pub fn live_access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        if now < self.access_expires_at && !self.access_token.is_empty() {
            Some(&self.access_token)
        } else {
            None
        }
    }
}

impl std::fmt::Debug for StoredTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokens")
            .field("access_expires_at", &self.access_expires_at)
            .finish_non_exhaustive()
    }
}

/// Reads and writes the token pair through a [`KeyValueStore`]
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
    access_max_age: Duration,
    refresh_max_age: Duration,
    cookie: CookieOptions,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>, options: &ClientOptions) -> Self {
        Self {
            store,
            key: options.token_record_key.clone(),
            access_max_age: options.access_token_max_age,
            refresh_max_age: options.refresh_token_max_age,
            cookie: options.cookie.clone(),
        }
    }

    /// Persist both tokens in one write
    pub fn save(&self, pair: &TokenPair) -> Result<()> {
        let access_max_age = chrono::Duration::from_std(self.access_max_age)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let record = StoredTokens {
            access_token: pair.access_token.clone(),
            refresh_token: pair.refresh_token.clone(),
            access_expires_at: Utc::now() + access_max_age,
        };
        let value = serde_json::to_string(&record)?;
        self.store.set(&self.key, &value, self.refresh_max_age)
    }

    /// The stored record, if any
    pub fn record(&self) -> Option<StoredTokens> {
        let raw = match self.store.get(&self.key) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("failed to read token record: {}", err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("discarding unreadable token record: {}", err);
                None
            }
        }
    }

    /// Read one token; expired or missing tokens read as `None`
    pub fn read(&self, kind: TokenKind) -> Option<String> {
        let record = self.record()?;
        match kind {
            TokenKind::Access => record.live_access_token(Utc::now()).map(str::to_string),
            TokenKind::Refresh => Some(record.refresh_token).filter(|t| !t.is_empty()),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TokenKind::Access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(TokenKind::Refresh)
    }

    /// Both tokens, only while the access token is still live
    pub fn pair(&self) -> Option<TokenPair> {
        let record = self.record()?;
        let access = record.live_access_token(Utc::now())?;
        Some(TokenPair::new(access, &record.refresh_token))
    }

    /// `Set-Cookie` value carrying the stored record, for hosts that mirror
    /// storage into a browser cookie. Without a record it expires the cookie.
    pub fn set_cookie_header(&self) -> Result<String> {
        let (value, max_age) = match self.record() {
            Some(record) => (record.to_cookie_value()?, self.refresh_max_age.as_secs()),
            None => (String::new(), 0),
        };

        let mut header = format!(
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.key,
            value,
            self.cookie.path,
            max_age,
            match self.cookie.same_site {
                SameSite::Strict => "Strict",
                SameSite::Lax => "Lax",
                SameSite::None => "None",
            }
        );
        if self.cookie.secure {
            header.push_str("; Secure");
        }
        Ok(header)
    }

    /// Remove both tokens. Safe to call when nothing is stored.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}
