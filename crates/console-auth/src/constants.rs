//! Back-office API paths and persisted session keys

/// Login endpoint, `{ email, password }` -> token pair
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Refresh endpoint, `{ refresh_token }` -> token pair
pub const REFRESH_TOKEN_PATH: &str = "/api/v1/auth/refresh-token";

/// Key of the access token in the persisted session document
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key of the refresh token in the persisted session document
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
