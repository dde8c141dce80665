//! Typed wrappers over the `/api/auth` endpoints

use serde_json::json;

use super::types::{AuthPayload, Credentials, SignUpData, TokenPair, User, UserEnvelope};
use crate::error::{Error, Result};
use crate::fetch::HttpClient;

/// Endpoint calls with no session side effects; [`super::AuthContext`]
/// decides what to do with the results
#[derive(Clone)]
pub struct AuthApi {
    http: HttpClient,
}

impl AuthApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn endpoint(&self, path: &str) -> String {
        self.http.options().auth_endpoint(path)
    }

    /// Create an account
    pub async fn register(&self, data: &SignUpData) -> Result<AuthPayload> {
        self.http
            .post(&self.endpoint("/register"))
            .no_auth_retry()
            .json(data)?
            .execute::<AuthPayload>()
            .await
    }

    /// Exchange credentials for a user and token pair
    pub async fn login(&self, credentials: &Credentials) -> Result<AuthPayload> {
        self.http
            .post(&self.endpoint("/login"))
            .no_auth_retry()
            .json(credentials)?
            .execute::<AuthPayload>()
            .await
            .map_err(classify_login_error)
    }

    /// Fetch the user the stored access token belongs to
    ///
    /// Never triggers the automatic refresh; the session resolver owns
    /// the retry policy for this call.
    pub async fn me(&self) -> Result<User> {
        let envelope = self
            .http
            .get(&self.endpoint("/me"))
            .no_auth_retry()
            .execute::<UserEnvelope>()
            .await?;
        Ok(envelope.user)
    }

    /// Refresh the stored token pair
    pub async fn refresh(&self, stale_access: Option<&str>) -> Result<TokenPair> {
        self.http.refresh_tokens(stale_access).await
    }

    /// Confirm an email address with the code from the verification link
    pub async fn verify_email(&self, token: &str) -> Result<User> {
        let envelope = self
            .http
            .get(&self.endpoint("/verify-email"))
            .query("token", token)
            .no_auth_retry()
            .execute::<UserEnvelope>()
            .await
            .map_err(classify_one_time_token_error)?;
        Ok(envelope.user)
    }

    pub async fn resend_verification(&self) -> Result<()> {
        self.http
            .post(&self.endpoint("/resend-verification"))
            .execute_unit()
            .await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.http
            .post(&self.endpoint("/forgot-password"))
            .no_auth_retry()
            .json(&json!({ "email": email }))?
            .execute_unit()
            .await
    }

    /// Set a new password with the token from the reset link
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<User> {
        let envelope = self
            .http
            .post(&self.endpoint("/reset-password"))
            .no_auth_retry()
            .json(&json!({ "token": token, "password": password }))?
            .execute::<UserEnvelope>()
            .await
            .map_err(classify_one_time_token_error)?;
        Ok(envelope.user)
    }
}

fn classify_login_error(err: Error) -> Error {
    match err {
        Error::Api { message, .. } | Error::Unauthorized(message)
            if mentions_unverified_email(&message) =>
        {
            Error::EmailNotVerified(message)
        }
        other => other,
    }
}

fn mentions_unverified_email(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("verif") && lower.contains("email")
}

fn classify_one_time_token_error(err: Error) -> Error {
    match err {
        Error::Api {
            status: 400 | 404 | 410,
            message,
        }
        | Error::Unauthorized(message) => Error::InvalidToken(message),
        other => other,
    }
}
