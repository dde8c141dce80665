//! Error handling for the Jamhub client

use std::fmt;
use thiserror::Error;

/// Unified error type for the Jamhub client
#[derive(Error, Debug)]
pub enum Error {
    /// Network or transport errors (no response received)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// A bearer-authenticated call was rejected and could not be recovered
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The refresh token was rejected; the client has been sent to the login page
    #[error("Session expired")]
    SessionExpired,

    /// The server rejected the request with a message
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// Sign-in was refused because the account email is not verified yet
    #[error("Email not verified: {0}")]
    EmailNotVerified(String),

    /// A one-time token (verification or reset link) is expired or invalid
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The operation needs a session that is not present
    #[error("Missing session")]
    MissingSession,

    /// Persistence backend errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new storage error
    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// The message a form should show inline for this failure.
    pub fn message(&self) -> String {
        match self {
            Error::Api { message, .. }
            | Error::Unauthorized(message)
            | Error::EmailNotVerified(message)
            | Error::InvalidToken(message) => message.clone(),
            Error::Http(_) => "Unable to reach the server. Check your connection.".to_string(),
            Error::SessionExpired => "Your session has expired. Please sign in again.".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Unauthorized(_) | Error::SessionExpired => Some(401),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the UI should offer to resend the verification email.
    pub fn is_email_not_verified(&self) -> bool {
        matches!(self, Error::EmailNotVerified(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
