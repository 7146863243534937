//! Authenticated request gateway for the SmartGas back-office API
//!
//! Every API call from the console goes through `Gateway::execute`, which
//! attaches the current bearer token and recovers from 401 responses with a
//! single shared token refresh. Concurrent callers that hit a 401 while a
//! refresh is in flight wait for it instead of starting their own, then retry
//! exactly once with whatever credentials the refresh left behind.
//!
//! Refresh lifecycle:
//! 1. First caller to observe a 401 takes the refresh lock
//! 2. Refresh token posted to `/api/v1/auth/refresh-token` (bounded by a timeout)
//! 3. Success stores the new pair; failure clears the session
//! 4. Lock released, refresh generation bumped, waiters retry or give up

pub mod error;
pub mod gateway;
pub mod issuer;
pub mod request;
pub mod telemetry;

pub use error::{GatewayError, NetworkError, RefreshFailure, Result};
pub use gateway::{Gateway, GatewayConfig};
pub use issuer::{HttpIssuer, IssueFuture, RequestIssuer};
pub use request::{ApiRequest, ApiResponse};
