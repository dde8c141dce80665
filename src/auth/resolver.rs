//! Startup session resolution
//!
//! ```text
//! no access token ─────────────────────────────────────────► Unauthenticated
//! FetchingUser ──ok──► Authenticated
//!      └─err──► Refreshing ──err──► Unauthenticated (tokens cleared)
//!                   └─ok──► RetryingFetch ──ok──► Authenticated
//!                                └─err──► Unauthenticated (tokens cleared)
//! ```
//!
//! `RetryingFetch` has no edge back to `Refreshing`: at most one refresh per
//! resolution.

use log::{debug, info, warn};

use super::api::AuthApi;
use super::session::SessionState;
use crate::storage::TokenStore;

/// A step the resolver went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    FetchingUser,
    Refreshing,
    RetryingFetch,
    Resolved,
}

/// Outcome of a resolution together with the path taken
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub state: SessionState,
    pub steps: Vec<ResolveStep>,
}

enum Phase {
    FetchingUser { access_token: String },
    Refreshing { stale_access: String },
    RetryingFetch,
    Resolved(SessionState),
}

/// Decides whether a valid session exists
#[derive(Clone)]
pub struct SessionResolver {
    api: AuthApi,
    tokens: TokenStore,
}

impl SessionResolver {
    pub fn new(api: AuthApi, tokens: TokenStore) -> Self {
        Self { api, tokens }
    }

    /// Run the resolution state machine to completion
    ///
    /// Failures are not errors here: an anonymous visitor resolving to
    /// `Unauthenticated` is the expected cold start.
    pub async fn resolve(&self) -> Resolution {
        let mut steps = Vec::with_capacity(4);

        let mut phase = match self.tokens.access_token() {
            Some(access_token) => Phase::FetchingUser { access_token },
            None => {
                debug!("no access token stored, skipping session lookup");
                Phase::Resolved(SessionState::Unauthenticated)
            }
        };

        loop {
            phase = match phase {
                Phase::FetchingUser { access_token } => {
                    steps.push(ResolveStep::FetchingUser);
                    match self.api.me().await {
                        Ok(user) => Phase::Resolved(SessionState::Authenticated(user)),
                        Err(err) => {
                            debug!("current user lookup failed: {}", err);
                            Phase::Refreshing {
                                stale_access: access_token,
                            }
                        }
                    }
                }
                Phase::Refreshing { stale_access } => {
                    steps.push(ResolveStep::Refreshing);
                    match self.api.refresh(Some(&stale_access)).await {
                        Ok(_) => Phase::RetryingFetch,
                        Err(_) => Phase::Resolved(SessionState::Unauthenticated),
                    }
                }
                Phase::RetryingFetch => {
                    steps.push(ResolveStep::RetryingFetch);
                    match self.api.me().await {
                        Ok(user) => Phase::Resolved(SessionState::Authenticated(user)),
                        Err(err) => {
                            warn!("current user lookup failed after refresh: {}", err);
                            if let Err(err) = self.tokens.clear() {
                                warn!("failed to clear tokens: {}", err);
                            }
                            Phase::Resolved(SessionState::Unauthenticated)
                        }
                    }
                }
                Phase::Resolved(state) => {
                    steps.push(ResolveStep::Resolved);
                    match state.user() {
                        Some(user) => info!("session resolved for user {}", user.id),
                        None => info!("session resolved as anonymous"),
                    }
                    return Resolution { state, steps };
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenPair;
    use crate::config::ClientOptions;
    use crate::fetch::HttpClient;
    use crate::navigation::HistoryNavigator;
    use crate::storage::MemoryStore;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(server: &MockServer) -> (SessionResolver, TokenStore) {
        let options = ClientOptions::default().with_api_url(&server.uri());
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()), &options);
        let http = HttpClient::new(options, tokens.clone(), Arc::new(HistoryNavigator::new()))
            .unwrap();
        (SessionResolver::new(AuthApi::new(http), tokens.clone()), tokens)
    }

    #[test]
    fn test_refresh_failure_resolves_anonymous() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/api/auth/me"))
                .respond_with(ResponseTemplate::new(401))
                .expect(1)
                .mount(&mock_server)
                .await;

            Mock::given(method("POST"))
                .and(path("/api/auth/refresh-token"))
                .respond_with(ResponseTemplate::new(401))
                .expect(1)
                .mount(&mock_server)
                .await;

            let (resolver, tokens) = resolver(&mock_server);
            tokens.save(&TokenPair::new("bad", "revoked")).unwrap();

            let resolution = resolver.resolve().await;

            assert_eq!(resolution.state, SessionState::Unauthenticated);
            assert_eq!(
                resolution.steps,
                vec![
                    ResolveStep::FetchingUser,
                    ResolveStep::Refreshing,
                    ResolveStep::Resolved
                ]
            );
            assert_eq!(tokens.refresh_token(), None);
        });
    }

    #[test]
    fn test_server_error_on_lookup_still_tries_refresh() {
        tokio_test::block_on(async {
            let mock_server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/api/auth/me"))
                .respond_with(ResponseTemplate::new(503))
                .expect(2)
                .mount(&mock_server)
                .await;

            Mock::given(method("POST"))
                .and(path("/api/auth/refresh-token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "tokens": { "accessToken": "fresh", "refreshToken": "ref2" }
                })))
                .expect(1)
                .mount(&mock_server)
                .await;

            let (resolver, tokens) = resolver(&mock_server);
            tokens.save(&TokenPair::new("acc", "ref")).unwrap();

            let resolution = resolver.resolve().await;

            assert_eq!(resolution.state, SessionState::Unauthenticated);
            assert_eq!(resolution.steps.len(), 4);
            assert_eq!(tokens.access_token(), None);
        });
    }
}
