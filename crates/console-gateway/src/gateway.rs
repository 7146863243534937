//! Single-flight token refresh around every API call
//!
//! State per gateway: `Idle -> RefreshInFlight -> Idle`. The refresh lock is a
//! tokio `Mutex<()>`; holding its guard is the `RefreshInFlight` state. The
//! guard is dropped on every exit path, including cancellation of the caller
//! that started the refresh, so the lock can never outlive a refresh.
//!
//! The refresh generation counter is bumped after each settled refresh (and
//! after login/logout), always after the credential store has been written.
//! A request records the generation before reading credentials. When its 401
//! reaches the lock, a changed generation means some refresh already settled
//! for it, so the request retries (or gives up) instead of refreshing again.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use console_auth::{
    CredentialStore, Credentials, LOGIN_PATH, LoginRequest, REFRESH_TOKEN_PATH, RefreshRequest,
    TokenPair,
};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{GatewayError, RefreshFailure, Result};
use crate::issuer::RequestIssuer;
use crate::request::{ApiRequest, ApiResponse};
use crate::telemetry;

/// Default bound on a refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

/// Gateway tuning.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upper bound on the refresh call. Expiry counts as a failed refresh.
    pub refresh_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

/// Which send this is for one `execute` call. A retry never refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Retry,
}

impl Attempt {
    fn label(self) -> &'static str {
        match self {
            Attempt::Initial => "initial",
            Attempt::Retry => "retry",
        }
    }
}

/// Authenticated request gateway.
///
/// Shared by every caller in the process (wrap in `Arc`). The issuer and the
/// credential store are injected so tests can replace both.
pub struct Gateway {
    issuer: Arc<dyn RequestIssuer>,
    store: Arc<dyn CredentialStore>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
    refresh_timeout: Duration,
}

impl Gateway {
    pub fn new(
        issuer: Arc<dyn RequestIssuer>,
        store: Arc<dyn CredentialStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            issuer,
            store,
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            refresh_timeout: config.refresh_timeout,
        }
    }

    pub fn credential_store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether a refresh call is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.store.get().await.is_logged_in()
    }

    /// Execute an API call with the current session attached.
    ///
    /// A 401 triggers at most one refresh across all concurrent callers and
    /// at most one retry of this request. Any other status is returned as-is.
    /// If the session cannot be refreshed it is cleared and the original 401
    /// comes back as `GatewayError::Unauthorized`.
    #[instrument(skip_all, fields(request_id = %new_request_id(), method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.wait_for_refresh().await;

        let observed = self.generation.load(Ordering::Acquire);
        let credentials = self.store.get().await;
        let response = self.send(request, &credentials, Attempt::Initial).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(generation = observed, "request unauthorized, recovering session");
        self.recover(request, response, observed).await
    }

    /// Log in with email and password and store the returned token pair.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post(LOGIN_PATH)
            .with_json(&LoginRequest { email, password })
            .map_err(|e| GatewayError::InvalidRequest(format!("encoding login body: {e}")))?;

        let response = self.issuer.issue(&request).await?;
        if !response.is_success() {
            warn!(status = %response.status, "login rejected");
            return Err(GatewayError::LoginRejected {
                status: response.status,
                message: login_rejection_message(response.status).into(),
            });
        }

        let pair = TokenPair::parse(&response.body)?;

        let _guard = self.refresh_lock.lock().await;
        self.store.set(pair.into_credentials()).await?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!("logged in");
        Ok(())
    }

    /// Clear the session.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.store.clear().await?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        info!("logged out");
        Ok(())
    }

    /// Wait out a refresh that is already in flight without taking the lock.
    async fn wait_for_refresh(&self) {
        if self.refresh_lock.try_lock().is_err() {
            debug!("refresh in flight, waiting before issuing");
            drop(self.refresh_lock.lock().await);
        }
    }

    async fn recover(
        &self,
        request: &ApiRequest,
        original: ApiResponse,
        observed: u64,
    ) -> Result<ApiResponse> {
        let guard = self.refresh_lock.lock().await;

        if self.generation.load(Ordering::Acquire) != observed {
            drop(guard);
            let credentials = self.store.get().await;
            if !credentials.is_logged_in() {
                debug!("session was cleared by a concurrent refresh");
                return Err(unauthorized(original, RefreshFailure::ConcurrentRefreshFailed));
            }
            debug!("session refreshed concurrently, retrying");
            return self.send(request, &credentials, Attempt::Retry).await;
        }

        let current = self.store.get().await;
        let outcome = self.refresh(&current).await;
        self.generation.fetch_add(1, Ordering::AcqRel);
        drop(guard);

        match outcome {
            Ok(fresh) => self.send(request, &fresh, Attempt::Retry).await,
            Err(cause) => Err(unauthorized(original, cause)),
        }
    }

    /// Run the refresh call and apply its outcome to the store.
    ///
    /// Must be called with the refresh lock held.
    async fn refresh(
        &self,
        current: &Credentials,
    ) -> std::result::Result<Credentials, RefreshFailure> {
        let outcome = self.call_refresh_endpoint(current).await;
        match outcome {
            Ok(fresh) => {
                if let Err(e) = self.store.set(fresh.clone()).await {
                    warn!(error = %e, "failed to persist refreshed session");
                }
                telemetry::record_refresh("success");
                info!("session refreshed");
                Ok(fresh)
            }
            Err(cause) => {
                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "failed to clear session after refresh failure");
                }
                if matches!(cause, RefreshFailure::NoRefreshToken) {
                    debug!("no refresh token, session cleared");
                } else {
                    telemetry::record_refresh("failure");
                    warn!(%cause, "session refresh failed, logged out");
                }
                Err(cause)
            }
        }
    }

    async fn call_refresh_endpoint(
        &self,
        current: &Credentials,
    ) -> std::result::Result<Credentials, RefreshFailure> {
        let refresh_token = current.refresh().ok_or(RefreshFailure::NoRefreshToken)?;
        let request = ApiRequest::post(REFRESH_TOKEN_PATH)
            .with_json(&RefreshRequest { refresh_token })
            .map_err(|e| RefreshFailure::Malformed(format!("encoding refresh body: {e}")))?;

        let issued = tokio::time::timeout(self.refresh_timeout, self.issuer.issue(&request)).await;
        let response = match issued {
            Err(_) => return Err(RefreshFailure::Timeout(self.refresh_timeout)),
            Ok(Err(e)) => return Err(RefreshFailure::Network(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(RefreshFailure::Status(response.status));
        }

        TokenPair::parse(&response.body)
            .map(TokenPair::into_credentials)
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))
    }

    async fn send(
        &self,
        request: &ApiRequest,
        credentials: &Credentials,
        attempt: Attempt,
    ) -> Result<ApiResponse> {
        let mut outbound = request.clone();
        attach_bearer(&mut outbound.headers, credentials.bearer())?;

        let response = self.issuer.issue(&outbound).await?;
        telemetry::record_response(response.status.as_u16(), attempt.label());
        debug!(status = %response.status, attempt = attempt.label(), "response received");
        Ok(response)
    }
}

/// Replace any caller-supplied Authorization header with the session's.
fn attach_bearer(headers: &mut HeaderMap, token: Option<&str>) -> Result<()> {
    headers.remove(AUTHORIZATION);
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| GatewayError::InvalidRequest(format!("invalid access token: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(())
}

fn unauthorized(original: ApiResponse, cause: RefreshFailure) -> GatewayError {
    telemetry::record_unauthorized();
    GatewayError::Unauthorized {
        response: Box::new(original),
        cause,
    }
}

fn login_rejection_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::NOT_FOUND => "incorrect email or password",
        StatusCode::BAD_REQUEST => "invalid login parameters",
        _ => "login failed, backend error",
    }
}

fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}
