//! Session credential storage
//!
//! The gateway only talks to the `CredentialStore` trait, so tests can inject
//! `MemoryCredentialStore` while the console binary uses `FileCredentialStore`.
//!
//! The file store persists a flat JSON key-value document. The session lives
//! under the `access_token` and `refresh_token` keys; any other keys in the
//! document are preserved. All writes use atomic temp-file + rename and the
//! in-memory copy is guarded by a tokio `RwLock` so readers always see a
//! complete snapshot.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{Error, Result};

/// Boxed future returned by `CredentialStore` methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Current session tokens.
///
/// Logged-in state is derived: a session is logged in iff both tokens are
/// non-empty. `Default` is the logged-out session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub access_token: Secret<String>,
    #[serde(default)]
    pub refresh_token: Secret<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    /// Access token to send as `Authorization: Bearer`, if there is one.
    pub fn bearer(&self) -> Option<&str> {
        if self.access_token.is_empty() {
            None
        } else {
            Some(self.access_token.expose())
        }
    }

    /// Refresh token, if there is one.
    pub fn refresh(&self) -> Option<&str> {
        if self.refresh_token.is_empty() {
            None
        } else {
            Some(self.refresh_token.expose())
        }
    }
}

/// Shared, injectable session state.
///
/// Uses boxed futures so the gateway can hold an `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Snapshot of the current credentials.
    fn get(&self) -> StoreFuture<'_, Credentials>;

    /// Replace the session (login or successful refresh).
    fn set(&self, credentials: Credentials) -> StoreFuture<'_, Result<()>>;

    /// Remove the session (logout or failed refresh).
    fn clear(&self) -> StoreFuture<'_, Result<()>>;
}

/// Process-local store with no persistence.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: RwLock<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            state: RwLock::new(credentials),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> StoreFuture<'_, Credentials> {
        Box::pin(async move { self.state.read().await.clone() })
    }

    fn set(&self, credentials: Credentials) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.state.write().await = credentials;
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            *self.state.write().await = Credentials::default();
            Ok(())
        })
    }
}

/// Credential store persisted to a JSON key-value file.
pub struct FileCredentialStore {
    path: PathBuf,
    state: RwLock<Map<String, Value>>,
}

impl FileCredentialStore {
    /// Open the store at `path`.
    ///
    /// A missing file is a logged-out session; the file is created on the
    /// first write. If both token keys are present the session is considered
    /// logged in until a refresh failure clears it.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let document = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => serde_json::from_str::<Map<String, Value>>(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "credential file not found, starting logged out");
                Map::new()
            }
            Err(e) => return Err(Error::Io(format!("reading credential file: {e}"))),
        };

        let store = Self {
            path,
            state: RwLock::new(document),
        };
        let logged_in = store.get().await.is_logged_in();
        info!(path = %store.path.display(), logged_in, "opened credential store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> StoreFuture<'_, Credentials> {
        Box::pin(async move {
            let document = self.state.read().await;
            Credentials::new(
                string_key(&document, ACCESS_TOKEN_KEY),
                string_key(&document, REFRESH_TOKEN_KEY),
            )
        })
    }

    fn set(&self, credentials: Credentials) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut document = self.state.write().await;
            document.insert(
                ACCESS_TOKEN_KEY.into(),
                Value::String(credentials.access_token.expose().clone()),
            );
            document.insert(
                REFRESH_TOKEN_KEY.into(),
                Value::String(credentials.refresh_token.expose().clone()),
            );
            debug!("stored session tokens");
            write_atomic(&self.path, &document).await
        })
    }

    fn clear(&self) -> StoreFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut document = self.state.write().await;
            let had_access = document.remove(ACCESS_TOKEN_KEY).is_some();
            let had_refresh = document.remove(REFRESH_TOKEN_KEY).is_some();
            if !had_access && !had_refresh {
                return Ok(());
            }
            debug!("removed session tokens");
            write_atomic(&self.path, &document).await
        })
    }
}

fn string_key(document: &Map<String, Value>, key: &str) -> String {
    match document.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            warn!(key, kind = value_kind(other), "ignoring non-string session value");
            String::new()
        }
        None => String::new(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Write the session document atomically with 0600 permissions.
async fn write_atomic(path: &Path, document: &Map<String, Value>) -> Result<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        Some(_) => PathBuf::from("."),
        None => return Err(Error::Io("credential path has no parent directory".into())),
    };
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logged_in_requires_both_tokens() {
        assert!(Credentials::new("A1", "R1").is_logged_in());
        assert!(!Credentials::new("A1", "").is_logged_in());
        assert!(!Credentials::new("", "R1").is_logged_in());
        assert!(!Credentials::default().is_logged_in());
    }

    #[test]
    fn bearer_is_none_without_access_token() {
        assert_eq!(Credentials::new("A1", "R1").bearer(), Some("A1"));
        assert_eq!(Credentials::default().bearer(), None);
        assert_eq!(Credentials::new("A1", "").refresh(), None);
    }

    #[tokio::test]
    async fn memory_store_set_and_clear() {
        let store = MemoryCredentialStore::default();
        assert!(!store.get().await.is_logged_in());

        store.set(Credentials::new("A1", "R1")).await.unwrap();
        assert_eq!(store.get().await, Credentials::new("A1", "R1"));

        store.clear().await.unwrap();
        assert_eq!(store.get().await, Credentials::default());
    }

    #[tokio::test]
    async fn missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone()).await.unwrap();
        assert!(!store.get().await.is_logged_in());
        assert!(!path.exists(), "file is only created on first write");
    }

    #[tokio::test]
    async fn roundtrip_set_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = FileCredentialStore::open(path.clone()).await.unwrap();
        store.set(Credentials::new("A2", "R2")).await.unwrap();

        let reopened = FileCredentialStore::open(path.clone()).await.unwrap();
        let creds = reopened.get().await;
        assert!(creds.is_logged_in());
        assert_eq!(creds.access_token.expose(), "A2");
        assert_eq!(creds.refresh_token.expose(), "R2");

        let raw: Map<String, Value> =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert_eq!(raw[ACCESS_TOKEN_KEY], "A2");
        assert_eq!(raw[REFRESH_TOKEN_KEY], "R2");
    }

    #[tokio::test]
    async fn clear_removes_both_keys_and_keeps_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(
            &path,
            r#"{"access_token":"A1","refresh_token":"R1","theme":"dark"}"#,
        )
        .await
        .unwrap();

        let store = FileCredentialStore::open(path.clone()).await.unwrap();
        assert!(store.get().await.is_logged_in());

        store.clear().await.unwrap();
        assert!(!store.get().await.is_logged_in());

        let raw: Map<String, Value> =
            serde_json::from_str(&tokio::fs::read_to_string(&path).await.unwrap()).unwrap();
        assert!(!raw.contains_key(ACCESS_TOKEN_KEY));
        assert!(!raw.contains_key(REFRESH_TOKEN_KEY));
        assert_eq!(raw["theme"], "dark");
    }

    #[tokio::test]
    async fn single_key_is_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, r#"{"access_token":"A1"}"#)
            .await
            .unwrap();

        let store = FileCredentialStore::open(path).await.unwrap();
        let creds = store.get().await;
        assert!(!creds.is_logged_in());
        assert_eq!(creds.bearer(), Some("A1"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "not json {{").await.unwrap();

        let result = FileCredentialStore::open(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credentials.json");

        let store = FileCredentialStore::open(path.clone()).await.unwrap();
        store.set(Credentials::new("A1", "R1")).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }
}
