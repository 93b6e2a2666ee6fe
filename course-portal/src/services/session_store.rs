//! Persisted session entries: access token, refresh token, user profile.
//!
//! Pure data access. Interpretation of the entries (hydration, what counts
//! as authenticated) belongs to [`crate::services::auth_session`].

use portal_core::AppError;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AccessToken,
    RefreshToken,
    User,
}

impl SessionKey {
    pub const ALL: [SessionKey; 3] = [
        SessionKey::AccessToken,
        SessionKey::RefreshToken,
        SessionKey::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "access_token",
            SessionKey::RefreshToken => "refresh_token",
            SessionKey::User => "user",
        }
    }
}

pub trait SessionStore: Send + Sync {
    fn get(&self, key: SessionKey) -> Option<String>;

    fn set(&self, key: SessionKey, value: &str) -> Result<(), AppError>;

    fn remove(&self, key: SessionKey) -> Result<(), AppError>;

    /// Remove all three entries together.
    fn clear(&self) -> Result<(), AppError> {
        for key in SessionKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// In-process store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<SessionKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), AppError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: SessionKey) -> Result<(), AppError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Store backed by a small JSON object on disk.
///
/// The file is rewritten whole on every change (write to a sibling temp
/// file, then rename). A missing file is an empty session; an unreadable
/// or corrupt one is treated the same way and replaced on the next write.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Session file is corrupt, starting with an empty session"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Session file is unreadable, starting with an empty session"
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.clone();
        change(&mut *entries);
        if let Err(e) = self.persist(&entries) {
            // Memory must keep matching what is on disk
            *entries = previous;
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: SessionKey) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .cloned()
    }

    fn set(&self, key: SessionKey, value: &str) -> Result<(), AppError> {
        self.update(|entries| {
            entries.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: SessionKey) -> Result<(), AppError> {
        self.update(|entries| {
            entries.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<(), AppError> {
        self.update(|entries| entries.clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_session_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("course-portal-{}", uuid::Uuid::new_v4()))
            .join("session.json")
    }

    #[test]
    fn test_memory_store_clear_removes_all_keys() {
        let store = MemorySessionStore::new();
        store.set(SessionKey::AccessToken, "A1").unwrap();
        store.set(SessionKey::RefreshToken, "R1").unwrap();
        store.set(SessionKey::User, "{}").unwrap();

        store.clear().unwrap();

        for key in SessionKey::ALL {
            assert!(store.get(key).is_none());
        }
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_session_path();
        {
            let store = FileSessionStore::open(&path);
            store.set(SessionKey::AccessToken, "A1").unwrap();
            store.set(SessionKey::RefreshToken, "R1").unwrap();
        }

        let reopened = FileSessionStore::open(&path);
        assert_eq!(reopened.get(SessionKey::AccessToken).as_deref(), Some("A1"));
        assert_eq!(reopened.get(SessionKey::RefreshToken).as_deref(), Some("R1"));
        assert!(reopened.get(SessionKey::User).is_none());

        reopened.clear().unwrap();
        let cleared = FileSessionStore::open(&path);
        assert!(cleared.get(SessionKey::AccessToken).is_none());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_corrupt_file_is_empty_session() {
        let path = temp_session_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let store = FileSessionStore::open(&path);
        assert!(store.get(SessionKey::AccessToken).is_none());

        store.set(SessionKey::AccessToken, "A2").unwrap();
        let reopened = FileSessionStore::open(&path);
        assert_eq!(reopened.get(SessionKey::AccessToken).as_deref(), Some("A2"));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_failed_write_leaves_entries_unchanged() {
        let dir = std::env::temp_dir().join(format!("course-portal-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        // A regular file where the session directory should be
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let store = FileSessionStore::open(blocker.join("session.json"));
        assert!(store.set(SessionKey::AccessToken, "A1").is_err());
        assert!(store.get(SessionKey::AccessToken).is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_session_path();
        let store = FileSessionStore::open(&path);
        store.set(SessionKey::AccessToken, "A1").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
