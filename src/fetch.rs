//! HTTP client for the Jamhub API
//!
//! Every request goes through [`HttpClient`], which attaches the stored
//! access token and recovers from a 401 by refreshing the token pair once.
//! Concurrent 401s share a single refresh: whoever takes the refresh lock
//! first talks to the server, the rest pick up the pair it stored.

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;

use crate::auth::{TokenPair, TokensEnvelope};
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::navigation::{Navigation, Navigator};
use crate::storage::TokenStore;

type ExpiryHook = Box<dyn Fn() + Send + Sync>;

struct Inner {
    client: reqwest::Client,
    options: ClientOptions,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    refresh_lock: Mutex<()>,
    expiry_hooks: RwLock<Vec<ExpiryHook>>,
}

/// Token-bearing request dispatcher, cheap to clone
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl HttpClient {
    /// Create a client that reads tokens from `tokens` and reports forced
    /// logouts to `navigator`
    pub fn new(
        options: ClientOptions,
        tokens: TokenStore,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        options.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                options,
                tokens,
                navigator,
                refresh_lock: Mutex::new(()),
                expiry_hooks: RwLock::new(Vec::new()),
            }),
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Run `hook` whenever a request's 401 could not be recovered by a
    /// refresh. Hooks run before the hard navigation to the login page.
    pub fn on_session_expired<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner
            .expiry_hooks
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(hook));
    }

    /// Create a GET request
    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::GET)
    }

    /// Create a POST request
    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::POST)
    }

    /// Create a PUT request
    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::PUT)
    }

    /// Create a PATCH request
    pub fn patch(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::PATCH)
    }

    /// Create a DELETE request
    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::DELETE)
    }

    /// Exchange the refresh token for a new pair
    ///
    /// `stale_access` is the access token the caller's failed request used.
    /// If storage already holds a different live access token, another
    /// caller refreshed while this one waited, and that pair is returned
    /// without a network call. Any failure clears the stored pair.
    pub async fn refresh_tokens(&self, stale_access: Option<&str>) -> Result<TokenPair> {
        let _guard = self.inner.refresh_lock.lock().await;

        if let Some(record) = self.tokens().record() {
            if let Some(current) = record.live_access_token(Utc::now()) {
                if Some(current) != stale_access {
                    debug!("token pair already refreshed by a concurrent request");
                    return Ok(TokenPair::new(current, record.refresh_token.clone()));
                }
            }
        }

        let result = self.exchange_refresh_token().await;
        match &result {
            Ok(_) => info!("access token refreshed"),
            Err(err) => {
                warn!("token refresh failed: {}", err);
                if let Err(err) = self.tokens().clear() {
                    warn!("failed to clear tokens after refresh failure: {}", err);
                }
            }
        }
        result
    }

    async fn exchange_refresh_token(&self) -> Result<TokenPair> {
        let refresh_token = self.tokens().refresh_token().ok_or(Error::MissingSession)?;

        // Dispatched directly: this request must never re-enter 401 handling.
        let path = self.options().auth_endpoint("/refresh-token");
        let request = self
            .post(&path)
            .json(&serde_json::json!({ "refreshToken": refresh_token }))?;
        let response = request.dispatch(None).await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let envelope = response.json::<TokensEnvelope>().await?;

        self.tokens().save(&envelope.tokens)?;
        Ok(envelope.tokens)
    }

    fn expire_session(&self) {
        {
            let hooks = self
                .inner
                .expiry_hooks
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for hook in hooks.iter() {
                hook();
            }
        }
        let login = self.options().login_path.clone();
        self.navigator().navigate(Navigation::Hard(login));
    }
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a HttpClient,
    path: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    auth_retry: bool,
}

impl<'a> FetchBuilder<'a> {
    fn new(client: &'a HttpClient, path: &str, method: Method) -> Self {
        Self {
            client,
            path: path.to_string(),
            method,
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            body: None,
            auth_retry: true,
        }
    }

    /// Add a header to the request; invalid names or values are skipped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add a query parameter
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query_params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self)
    }

    /// Return a 401 to the caller as-is instead of refreshing the session
    pub fn no_auth_retry(mut self) -> Self {
        self.auth_retry = false;
        self
    }

    async fn dispatch(&self, access_token: Option<&str>) -> Result<Response> {
        let url = format!("{}{}", self.client.options().api_url, self.path);
        debug!("{} {}", self.method, self.path);

        let mut req = self
            .client
            .inner
            .client
            .request(self.method.clone(), &url)
            .headers(self.headers.clone());

        if !self.query_params.is_empty() {
            req = req.query(&self.query_params);
        }
        if let Some(token) = access_token {
            req = req.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        Ok(req.send().await?)
    }

    async fn send(&self) -> Result<Response> {
        let token = self.client.tokens().access_token();
        let response = self.dispatch(token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.auth_retry {
            return Ok(response);
        }

        debug!("{} {} returned 401, refreshing session", self.method, self.path);
        match self.client.refresh_tokens(token.as_deref()).await {
            Ok(pair) => self.dispatch(Some(&pair.access_token)).await,
            Err(_) => {
                self.client.expire_session();
                Err(Error::SessionExpired)
            }
        }
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json::<T>().await?)
    }

    /// Execute the request, discarding any response body
    pub async fn execute_unit(&self) -> Result<()> {
        let response = self.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }

    /// Execute the request and return the raw response, whatever its status
    pub async fn execute_raw(&self) -> Result<Response> {
        self.send().await
    }
}

/// Turn a non-success response into an [`Error`]
pub(crate) async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(err) => return Error::Http(err),
    };
    let message = extract_message(&text).unwrap_or_else(|| {
        if text.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        } else {
            text
        }
    });

    if status == StatusCode::UNAUTHORIZED {
        Error::Unauthorized(message)
    } else {
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

/// Pull a human-readable message out of an error body
///
/// Accepts `{"message": "..."}`, `{"message": ["...", "..."]}` and
/// `{"error": "..."}`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message").or_else(|| value.get("error"))? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}
