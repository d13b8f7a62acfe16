//! Cached auth session.
//!
//! The session (tokens + expiry, never the password) is persisted so a
//! restart resumes without re-login. Writes go through atomic replacement
//! with owner-only permissions; a corrupt or unreadable cache just means
//! logging in again.

use std::fs;
use std::path::PathBuf;

use finaptico_supabase::Session;
use finaptico_utils::{Sensitivity, atomic_write};

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Store at the default location (`~/.finaptico/session.json`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: finaptico_config::session_path(),
        }
    }

    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    #[must_use]
    pub fn load(&self) -> Option<Session> {
        let path = self.path.as_ref()?;
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read session cache: {e}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Discarding unreadable session cache: {e}");
                None
            }
        }
    }

    pub fn save(&self, session: &Session) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        if let Some(parent) = path.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), "Failed to create session dir: {e}");
            return;
        }

        match serde_json::to_vec_pretty(session) {
            Ok(bytes) => {
                if let Err(e) = atomic_write(path, &bytes, Sensitivity::OwnerOnly) {
                    tracing::warn!(path = %path.display(), "Failed to save session: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize session: {e}"),
        }
    }

    pub fn clear(&self) {
        if let Some(path) = self.path.as_ref()
            && let Err(e) = fs::remove_file(path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), "Failed to clear session cache: {e}");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use finaptico_supabase::Session;

    use super::SessionStore;

    fn session() -> Session {
        serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "refresh_token": "r",
            "expires_at": chrono::Utc::now(),
            "user_email": "ana@finaptico.example"
        }))
        .expect("session")
    }

    #[test]
    fn round_trips_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::at(dir.path().join("session.json"));

        assert!(store.load().is_none());

        store.save(&session());
        let loaded = store.load().expect("loaded");
        assert_eq!(loaded.email(), Some("ana@finaptico.example"));

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_cache_is_discarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").expect("write");

        let store = SessionStore::at(path);
        assert!(store.load().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        let store = SessionStore::at(path.clone());
        store.save(&session());

        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
