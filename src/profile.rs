//! Profile screen plumbing
//!
//! Mutations go to the server through the authenticated client; the
//! returned fields are then merged into the cached user so every screen
//! sees the change without another `/me` round trip.

use serde::Serialize;

use crate::auth::{AuthContext, User, UserEnvelope, UserPatch};
use crate::error::Result;
use crate::fetch::HttpClient;

const PROFILE_PATH: &str = "/api/users/me";

/// Editable profile fields; unset fields are left unchanged on the server
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// Profile mutations that keep the auth context's user in sync
#[derive(Clone)]
pub struct ProfileApi {
    http: HttpClient,
    auth: AuthContext,
}

impl ProfileApi {
    pub fn new(http: HttpClient, auth: AuthContext) -> Self {
        Self { http, auth }
    }

    /// Update profile fields and patch the cached username and profile
    pub async fn update(&self, update: &ProfileUpdate) -> Result<User> {
        let user = self
            .http
            .patch(PROFILE_PATH)
            .json(update)?
            .execute::<UserEnvelope>()
            .await?
            .user;

        self.auth.update_user_info(
            UserPatch::default()
                .username(user.username.clone())
                .user_profile(user.user_profile.clone()),
        );
        Ok(user)
    }

    /// Point the avatar at an already uploaded image
    pub async fn set_avatar_url(&self, avatar_url: &str) -> Result<User> {
        let user = self
            .http
            .patch(&format!("{}/avatar", PROFILE_PATH))
            .json(&serde_json::json!({ "avatarUrl": avatar_url }))?
            .execute::<UserEnvelope>()
            .await?
            .user;

        self.auth
            .update_user_info(UserPatch::default().avatar_url(user.avatar_url.clone()));
        Ok(user)
    }
}
