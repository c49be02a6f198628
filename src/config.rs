//! Configuration for `KeyTrack`.
//!
//! The remote store is addressed by a single `DATABASE_URL` environment
//! variable; when it is absent the system runs against the in-memory fallback
//! store. The session file location can be overridden with
//! `KEYTRACK_SESSION_FILE`.

use std::path::PathBuf;

/// Loads the `.env` file if present. Safe to call repeatedly; environment
/// variables set externally always win.
pub fn load_env() {
    dotenvy::dotenv().ok();
}

/// Returns the remote store URL, or `None` when the system should run in
/// fallback mode.
#[must_use]
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

/// Returns the path of the durable session file.
///
/// Defaults to `data/session.toml` next to the working directory.
#[must_use]
pub fn session_file() -> PathBuf {
    std::env::var("KEYTRACK_SESSION_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data/session.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_file_has_a_default() {
        // KEYTRACK_SESSION_FILE is not set in the test environment
        let path = session_file();
        assert!(path.as_os_str().to_string_lossy().ends_with("session.toml"));
    }
}
