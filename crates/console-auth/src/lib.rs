//! Session credentials for the SmartGas back-office API
//!
//! Provides the credential store abstraction the request gateway reads and
//! writes, the file-backed store used by the console binary, and the wire
//! types of the login and refresh-token endpoints.
//!
//! Session flow:
//! 1. Console posts `LoginRequest` to `LOGIN_PATH`, receives a `TokenPair`
//! 2. Pair stored via `CredentialStore::set()`
//! 3. Gateway attaches `Credentials::bearer()` to every API call
//! 4. On 401 the gateway posts `RefreshRequest` to `REFRESH_TOKEN_PATH`
//! 5. New pair stored via `CredentialStore::set()`, or `clear()` on failure

pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use token::{LoginRequest, RefreshRequest, TokenPair};
