use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::ClientError;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Opaque key-value store holding the session credentials.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
    fn remove(&self, key: &str) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), ClientError> {
        (**self).clear()
    }
}

/// Route guard for everything behind the dashboard.
pub fn require_access_token(store: &dyn SessionStore) -> Result<String, ClientError> {
    store
        .get(ACCESS_TOKEN_KEY)
        .filter(|token| !token.is_empty())
        .ok_or(ClientError::Unauthenticated)
}

pub fn is_authenticated(store: &dyn SessionStore) -> bool {
    require_access_token(store).is_ok()
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.entries.lock().clear();
        Ok(())
    }
}

/// JSON object on disk, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    #[tracing::instrument(skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, ClientError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir).map_err(|err| {
                ClientError::Session(format!("failed to create {}: {err}", dir.display()))
            })?;
        }

        let entries = if path.exists() {
            load_entries(path)?
        } else {
            BTreeMap::new()
        };

        info!(
            path = %path.display(),
            keys = entries.len(),
            "opened session store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        save_entries_atomic(&self.path, &entries)
    }

    fn remove(&self, key: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            save_entries_atomic(&self.path, &entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self.entries.lock();
        entries.clear();
        save_entries_atomic(&self.path, &entries)
    }
}

#[tracing::instrument(skip(path))]
fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, ClientError> {
    debug!(file = %path.display(), "loading session entries");
    let raw = fs::read_to_string(path)
        .map_err(|err| ClientError::Session(format!("failed reading {}: {err}", path.display())))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw)
        .map_err(|err| ClientError::Session(format!("failed parsing {}: {err}", path.display())))
}

#[tracing::instrument(skip(path, entries))]
fn save_entries_atomic(
    path: &Path,
    entries: &BTreeMap<String, String>,
) -> Result<(), ClientError> {
    debug!(file = %path.display(), keys = entries.len(), "saving session atomically");
    let session_err = |err: &dyn std::fmt::Display| {
        ClientError::Session(format!("failed writing {}: {err}", path.display()))
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|e| session_err(&e))?;
    let serialized = serde_json::to_string_pretty(entries).map_err(|e| session_err(&e))?;
    writeln!(temp, "{serialized}").map_err(|e| session_err(&e))?;
    temp.flush().map_err(|e| session_err(&e))?;
    temp.persist(path).map_err(|e| session_err(&e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn guard_requires_access_token() {
        let store = MemorySessionStore::new();
        assert_eq!(require_access_token(&store), Err(ClientError::Unauthenticated));

        store.set(ACCESS_TOKEN_KEY, "").expect("set");
        assert!(!is_authenticated(&store));

        store.set(ACCESS_TOKEN_KEY, "abc").expect("set");
        assert_eq!(require_access_token(&store).as_deref(), Ok("abc"));

        store.clear().expect("clear");
        assert!(!is_authenticated(&store));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("session.json");

        let store = FileSessionStore::open(&path).expect("open");
        store.set(ACCESS_TOKEN_KEY, "acc").expect("set access");
        store.set(REFRESH_TOKEN_KEY, "ref").expect("set refresh");
        drop(store);

        let reopened = FileSessionStore::open(&path).expect("reopen");
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("acc"));
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).as_deref(), Some("ref"));

        reopened.remove(REFRESH_TOKEN_KEY).expect("remove");
        reopened.clear().expect("clear");
        drop(reopened);

        let cleared = FileSessionStore::open(&path).expect("reopen cleared");
        assert_eq!(cleared.get(ACCESS_TOKEN_KEY), None);
    }

    #[test]
    fn corrupt_session_file_is_reported() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("session.json");
        fs::write(&path, "not json").expect("write");
        let err = FileSessionStore::open(&path).expect_err("should fail");
        assert!(matches!(err, ClientError::Session(_)));
    }
}
