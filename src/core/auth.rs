//! Authentication and authorization.
//!
//! Secrets are stored as Argon2id PHC-format hashes and verified on login.
//! Authorization is one predicate, [`can_manage`], consumed by every
//! management operation instead of being re-derived per screen.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::entities::user::{self, Role};
use crate::errors::{Error, Result};
use crate::store::DataStore;

/// Hashes a login secret with Argon2id for storage.
pub fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Crypto {
            message: format!("hashing failed: {e}"),
        })
}

/// Verifies a plaintext secret against a stored Argon2id hash.
///
/// Returns `Ok(false)` on mismatch; a malformed stored hash is an error.
pub fn verify_secret(secret: &str, hash: &str) -> Result<bool> {
    let parsed = argon2::PasswordHash::new(hash).map_err(|e| Error::Crypto {
        message: format!("invalid hash format: {e}"),
    })?;
    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Crypto {
            message: format!("verify error: {e}"),
        }),
    }
}

/// The centralized authorization predicate: may this user manage users and
/// keys?
#[must_use]
pub fn can_manage(user: &user::Model) -> bool {
    user.active && user.role == Role::Admin
}

/// Checks an email/secret pair against the current user set.
///
/// Wrong email, wrong secret, or an inactive account all answer `None`,
/// never an error; the read path underneath never fails visibly either.
pub async fn authenticate_user(
    store: &DataStore,
    email: &str,
    secret: &str,
) -> Result<Option<user::Model>> {
    let users = store.list_users().await.value;
    let Some(user) = users.into_iter().find(|u| u.email == email && u.active) else {
        return Ok(None);
    };
    if verify_secret(secret, &user.secret_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::UserPatch;
    use crate::test_utils::{local_store, remote_admin, remote_store};

    #[test]
    fn correct_secret_matches() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(verify_secret("hunter2", &hash).unwrap());
    }

    #[test]
    fn wrong_secret_does_not_match() {
        let hash = hash_secret("hunter2").unwrap();
        assert!(!verify_secret("wrong", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_secret("pw", "not-a-hash").is_err());
    }

    #[tokio::test]
    async fn fixture_users_authenticate_against_the_fallback_store() {
        let store = local_store().await;
        let user = store
            .authenticate_user("maria@imobiliaria.com", "123456")
            .await
            .unwrap();
        assert_eq!(user.unwrap().name, "Maria Santos");

        let wrong = store
            .authenticate_user("maria@imobiliaria.com", "654321")
            .await
            .unwrap();
        assert!(wrong.is_none());

        let unknown = store
            .authenticate_user("nobody@imobiliaria.com", "123456")
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn inactive_users_cannot_authenticate() -> crate::errors::Result<()> {
        let store = remote_store().await?;
        let admin = remote_admin(&store).await;
        let joao = store
            .authenticate_user("joao@imobiliaria.com", "123456")
            .await?
            .unwrap();

        let patch = UserPatch {
            active: Some(false),
            ..UserPatch::default()
        };
        assert!(store.update_user(&admin, &joao.id, patch).await?);

        let denied = store
            .authenticate_user("joao@imobiliaria.com", "123456")
            .await?;
        assert!(denied.is_none());
        Ok(())
    }

    #[test]
    fn only_active_admins_can_manage() {
        let hash = "unused".to_string();
        let mut user = user::Model {
            id: "u1".to_string(),
            name: "Teste".to_string(),
            email: "t@imobiliaria.com".to_string(),
            secret_hash: hash,
            role: Role::Admin,
            active: true,
            created_at: chrono::Utc::now(),
        };
        assert!(can_manage(&user));

        user.active = false;
        assert!(!can_manage(&user));

        user.active = true;
        user.role = Role::Broker;
        assert!(!can_manage(&user));
    }
}
