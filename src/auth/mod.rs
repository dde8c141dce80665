//! Authentication and session management for Jamhub
//!
//! [`AuthContext`] owns the in-memory session. It starts in
//! [`SessionState::Loading`], leaves it once through [`AuthContext::initialize`],
//! and from then on moves between `Authenticated` and `Unauthenticated` only
//! through its own operations. Screens read the session through
//! [`AuthContext::snapshot`] or [`AuthContext::subscribe`] and never touch the
//! token store directly.

mod api;
mod redirect;
mod resolver;
mod session;
mod types;

use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

use crate::error::Result;
use crate::fetch::HttpClient;
use crate::navigation::{destination_from_query, Navigation, Navigator};
use crate::storage::TokenStore;

pub use api::AuthApi;
pub use redirect::PendingRedirect;
pub use resolver::{Resolution, ResolveStep, SessionResolver};
pub use session::*;
pub use types::*;

pub(crate) use types::{TokensEnvelope, UserEnvelope};

struct Inner {
    api: AuthApi,
    resolver: SessionResolver,
    tokens: TokenStore,
    pending: PendingRedirect,
    navigator: Arc<dyn Navigator>,
    home_path: String,
    state: watch::Sender<SessionState>,
    resolution: OnceCell<Resolution>,
}

/// Session state machine shared by every screen of the app
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    /// Create a context in the `Loading` state
    ///
    /// The context signs itself out whenever `http` gives up on a session
    /// after a failed refresh.
    pub fn new(http: HttpClient, pending: PendingRedirect) -> Self {
        let api = AuthApi::new(http.clone());
        let tokens = http.tokens().clone();
        let (state, _) = watch::channel(SessionState::Loading);

        let inner = Arc::new(Inner {
            resolver: SessionResolver::new(api.clone(), tokens.clone()),
            api,
            tokens,
            pending,
            navigator: http.navigator().clone(),
            home_path: http.options().home_path.clone(),
            state,
            resolution: OnceCell::new(),
        });

        // Weak: `inner` already owns the client through `api`.
        let weak = Arc::downgrade(&inner);
        http.on_session_expired(move || {
            if let Some(inner) = weak.upgrade() {
                warn!("session expired, signing out");
                AuthContext { inner }.logout();
            }
        });

        Self { inner }
    }

    /// Endpoint wrappers, for calls the context has no opinion about
    pub fn api(&self) -> &AuthApi {
        &self.inner.api
    }

    pub(crate) fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Where a successful sign-in will send the user, if a deep link was interrupted
    pub fn pending_redirect(&self) -> &PendingRedirect {
        &self.inner.pending
    }

    /// Current session
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status()
    }

    /// Cached user; `None` unless authenticated
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Watch every session change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the session has left `Loading`
    ///
    /// Does not start resolution; something must call [`initialize`](Self::initialize).
    pub async fn wait_until_resolved(&self) -> SessionState {
        let mut rx = self.subscribe();
        let resolved = rx.wait_for(|state| !state.is_loading()).await;
        match resolved {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Resolve the startup session. Runs once per context; later calls
    /// return the current state without touching the network.
    pub async fn initialize(&self) -> SessionState {
        self.inner
            .resolution
            .get_or_init(|| async {
                let resolution = self.inner.resolver.resolve().await;
                let resolved = resolution.state.clone();
                // An explicit sign-in or logout that finished first wins.
                self.inner.state.send_if_modified(|state| {
                    if state.is_loading() {
                        *state = resolved;
                        true
                    } else {
                        false
                    }
                });
                resolution
            })
            .await;
        self.snapshot()
    }

    /// The steps taken by startup resolution, once it has run
    pub fn resolution(&self) -> Option<&Resolution> {
        self.inner.resolution.get()
    }

    /// Sign in and navigate to the pending redirect, or home
    ///
    /// On failure the stored tokens and the session are left as they were.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<SignInOutcome> {
        self.sign_in_then(credentials, None).await
    }

    /// Sign in, falling back to the `redirectTo`/`returnUrl`/`redirect`
    /// parameter of the login page's query string when no pending redirect
    /// is stored
    pub async fn sign_in_with_return(
        &self,
        credentials: &Credentials,
        query: &str,
    ) -> Result<SignInOutcome> {
        self.sign_in_then(credentials, destination_from_query(query))
            .await
    }

    async fn sign_in_then(
        &self,
        credentials: &Credentials,
        fallback: Option<String>,
    ) -> Result<SignInOutcome> {
        let payload = self.inner.api.login(credentials).await?;
        let user = self.establish(payload)?;
        info!("signed in as {}", user.id);

        let redirect_to = self
            .inner
            .pending
            .take()
            .or(fallback)
            .unwrap_or_else(|| self.inner.home_path.clone());
        self.inner
            .navigator
            .navigate(Navigation::Push(redirect_to.clone()));

        Ok(SignInOutcome { user, redirect_to })
    }

    /// Register and become authenticated as the new user
    pub async fn sign_up(&self, data: &SignUpData) -> Result<User> {
        let payload = self.inner.api.register(data).await?;
        let user = self.establish(payload)?;
        info!("registered user {}", user.id);
        Ok(user)
    }

    fn establish(&self, payload: AuthPayload) -> Result<User> {
        self.inner.tokens.save(&payload.tokens)?;
        let user = payload.user;
        self.inner
            .state
            .send_replace(SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Forget the session. Calling it again is harmless.
    pub fn logout(&self) {
        if let Err(err) = self.inner.tokens.clear() {
            warn!("failed to clear tokens on logout: {}", err);
        }
        let previous = self.inner.state.send_replace(SessionState::Unauthenticated);
        if let Some(user) = previous.user() {
            info!("signed out {}", user.id);
        }
    }

    /// Confirm the email address; marks the cached user verified when the
    /// confirmed account is the signed-in one
    pub async fn verify_email(&self, code: &str) -> Result<User> {
        let verified = self.inner.api.verify_email(code).await?;
        self.inner.state.send_if_modified(|state| match state {
            SessionState::Authenticated(current) if current.id == verified.id => {
                current.email_verified = true;
                true
            }
            _ => false,
        });
        Ok(verified)
    }

    pub async fn resend_verification_email(&self) -> Result<()> {
        self.inner.api.resend_verification().await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.inner.api.forgot_password(email).await
    }

    /// Set a new password. The caller still has to sign in afterwards.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<User> {
        self.inner.api.reset_password(token, new_password).await
    }

    /// Merge fields the caller already changed on the server into the
    /// cached user. Returns `false` (and does nothing) unless authenticated.
    /// An empty patch does not notify subscribers.
    pub fn update_user_info(&self, patch: UserPatch) -> bool {
        let mut authenticated = false;
        self.inner.state.send_if_modified(|state| match state {
            SessionState::Authenticated(user) => {
                authenticated = true;
                if patch.is_empty() {
                    return false;
                }
                user.apply(patch);
                true
            }
            _ => false,
        });
        authenticated
    }
}
