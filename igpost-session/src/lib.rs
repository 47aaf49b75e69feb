//! File-backed store for Instagram session tokens.
//!
//! The on-disk format is a flat JSON object mapping an account identifier
//! (normally the Instagram username) to its opaque session token. A missing
//! file means "no prior session" and is not an error; an unreadable or
//! unwritable path is surfaced to the caller.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors surfaced by session-file access.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session file io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

type SessionMap = BTreeMap<String, String>;

/// Store for session tokens keyed by account identifier.
///
/// Access to a given path is serialized within the process with a per-path
/// mutex, so concurrent requests cannot interleave a read-modify-write on
/// the same file. Writes are plain overwrites; cross-process access remains
/// unsynchronized.
#[derive(Debug, Default)]
pub struct SessionStore {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the saved token for `account`, or `None` when the file is
    /// missing or holds no record for that account.
    pub async fn load(
        &self,
        path: &Path,
        account: &str,
    ) -> Result<Option<String>, SessionStoreError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;
        let map = read_map(path)?;
        Ok(map.get(account).cloned())
    }

    /// When no account identifier is known, a file holding exactly one
    /// record is unambiguous and yields that record. Zero or multiple
    /// records yield `None` and the caller must supply credentials.
    pub async fn single_account(
        &self,
        path: &Path,
    ) -> Result<Option<(String, String)>, SessionStoreError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;
        let map = read_map(path)?;
        if map.len() == 1 {
            Ok(map.into_iter().next())
        } else {
            Ok(None)
        }
    }

    /// Persist `token` for `account`, overwriting any prior record.
    pub async fn save(
        &self,
        path: &Path,
        account: &str,
        token: &str,
    ) -> Result<(), SessionStoreError> {
        let lock = self.path_lock(path);
        let _guard = lock.lock().await;
        let mut map = read_map(path)?;
        map.insert(account.to_string(), token.to_string());
        write_map(path, &map)?;
        debug!(path = %path.display(), %account, "session token persisted");
        Ok(())
    }

    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn read_map(path: &Path) -> Result<SessionMap, SessionStoreError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        // A missing file, or a path under something that is not a directory,
        // means no prior session rather than an error.
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ) =>
        {
            Ok(SessionMap::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn write_map(path: &Path, map: &SessionMap) -> Result<(), SessionStoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_json::to_string_pretty(map)?;
    std::fs::write(path, contents)?;
    Ok(())
}
