//! Durable persistence of the currently logged-in user.
//!
//! The authenticated user is written to one well-known TOML file and restored
//! on the next start; logout clears it. This is the only durable client-side
//! state the system keeps.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::config;
use crate::entities::user;
use crate::errors::{Error, Result};

/// File-backed store for the logged-in user.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// A session store over an explicit file path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// A session store at the configured default location.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(config::session_file())
    }

    /// Persists the logged-in user.
    pub fn save(&self, user: &user::Model) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(user).map_err(|e| Error::Session {
            message: e.to_string(),
        })?;
        fs::write(&self.path, body)?;
        debug!("session saved to {}", self.path.display());
        Ok(())
    }

    /// Restores the logged-in user, or `None` when no session is stored.
    pub fn load(&self) -> Result<Option<user::Model>> {
        match fs::read_to_string(&self.path) {
            Ok(body) => toml::from_str(&body).map(Some).map_err(|e| Error::Session {
                message: e.to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Logs out: removes the stored session if there is one.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::entities::user::Role;
    use chrono::Utc;

    fn temp_session_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("keytrack-session-{}-{tag}.toml", std::process::id()))
    }

    fn sample_user() -> user::Model {
        user::Model {
            id: "u1".to_string(),
            name: "Maria Santos".to_string(),
            email: "maria@imobiliaria.com".to_string(),
            secret_hash: "$argon2id$v=19$m=19456,t=2,p=1$abc$def".to_string(),
            role: Role::Admin,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn save_load_clear_round_trip() {
        let store = SessionStore::new(temp_session_path("roundtrip"));
        let user = sample_user();

        assert!(store.load().unwrap().is_none());

        store.save(&user).unwrap();
        let restored = store.load().unwrap().unwrap();
        assert_eq!(restored, user);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clearing_a_missing_session_is_fine() {
        let store = SessionStore::new(temp_session_path("missing"));
        store.clear().unwrap();
        store.clear().unwrap();
    }
}
