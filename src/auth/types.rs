//! Types for authentication and user management

use serde::{Deserialize, Serialize};

/// Role granted to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

/// Public profile embedded in a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name shown on jam pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Free-form biography
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// Personal website or portfolio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Fields the client does not model
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// User data, owned by the server and cached by the auth context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user ID
    pub id: String,

    /// The user's email address
    pub email: String,

    /// Chosen handle, unset until onboarding completes
    #[serde(default)]
    pub username: Option<String>,

    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Whether the email has been confirmed
    #[serde(default)]
    pub email_verified: bool,

    /// The user's role
    pub role: Role,

    /// Embedded profile, when the endpoint includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<UserProfile>,
}

impl User {
    /// Shallow-merge `patch` into this user. Fields the patch leaves unset
    /// are not touched.
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(avatar_url) = patch.avatar_url {
            self.avatar_url = avatar_url;
        }
        if let Some(email_verified) = patch.email_verified {
            self.email_verified = email_verified;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(user_profile) = patch.user_profile {
            self.user_profile = user_profile;
        }
    }
}

/// Partial user update applied locally after a mutation the caller already performed
///
/// Nullable fields use `Option<Option<_>>`: the outer `None` leaves the field
/// alone, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub email_verified: Option<bool>,
    pub role: Option<Role>,
    pub user_profile: Option<Option<UserProfile>>,
}

impl UserPatch {
    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    pub fn username(mut self, value: Option<String>) -> Self {
        self.username = Some(value);
        self
    }

    pub fn avatar_url(mut self, value: Option<String>) -> Self {
        self.avatar_url = Some(value);
        self
    }

    pub fn email_verified(mut self, value: bool) -> Self {
        self.email_verified = Some(value);
        self
    }

    pub fn role(mut self, value: Role) -> Self {
        self.role = Some(value);
        self
    }

    pub fn user_profile(mut self, value: Option<UserProfile>) -> Self {
        self.user_profile = Some(value);
        self
    }

    /// Whether applying the patch would change nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Access and refresh token, always written and cleared together
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived bearer credential
    pub access_token: String,

    /// Long-lived credential exchanged for a new pair
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Email and password sign-in credentials
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration form data
#[derive(Debug, Clone, Serialize)]
pub struct SignUpData {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// Response of `login` and `register`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub tokens: TokenPair,
}

/// Response carrying a single user
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub user: User,
}

/// Response of `refresh-token`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokensEnvelope {
    pub tokens: TokenPair,
}

/// Where a successful sign-in sent the user
#[derive(Debug, Clone, PartialEq)]
pub struct SignInOutcome {
    pub user: User,
    pub redirect_to: String,
}
