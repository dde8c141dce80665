#![allow(dead_code)]

use jamhub::auth::TokenPair;
use jamhub::config::ClientOptions;
use jamhub::navigation::{HistoryNavigator, Navigation};
use jamhub::storage::{MemoryStore, TokenStore};
use jamhub::JamHub;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::MockServer;

pub struct Harness {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub navigator: Arc<HistoryNavigator>,
    pub hub: JamHub,
}

impl Harness {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let navigator = Arc::new(HistoryNavigator::new());
        let hub = JamHub::new(
            ClientOptions::default().with_api_url(&server.uri()),
            store.clone(),
            navigator.clone(),
        )
        .expect("valid options");

        Self {
            server,
            store,
            navigator,
            hub,
        }
    }

    pub fn tokens(&self) -> TokenStore {
        TokenStore::new(self.store.clone(), self.hub.options())
    }

    pub fn seed_tokens(&self, access: &str, refresh: &str) {
        self.tokens()
            .save(&TokenPair::new(access, refresh))
            .expect("token write");
    }

    pub fn last_navigation(&self) -> Option<Navigation> {
        self.navigator.last()
    }
}

pub fn user_json(id: &str, email: &str) -> Value {
    json!({
        "id": id,
        "email": email,
        "username": "pixelpusher",
        "avatarUrl": "https://cdn.jamhub.dev/avatars/1.png",
        "emailVerified": false,
        "role": "USER",
        "userProfile": {
            "displayName": "Pixel Pusher",
            "bio": "Ludum Dare regular"
        }
    })
}

pub fn auth_payload(id: &str, email: &str, access: &str, refresh: &str) -> Value {
    json!({
        "user": user_json(id, email),
        "tokens": { "accessToken": access, "refreshToken": refresh }
    })
}

pub fn tokens_payload(access: &str, refresh: &str) -> Value {
    json!({ "tokens": { "accessToken": access, "refreshToken": refresh } })
}
