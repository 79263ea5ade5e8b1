//! `--seed` bootstrap: provision the default admin once.

use anyhow::{Context, Result};

use crate::error::AppError;
use crate::identity::{IdentityProvisioner, Provisioned, UserDraft};
use crate::model::{AccountType, Role};

pub const SEED_ADMIN_EMAIL: &str = "admin@mail.com";

/// Create the default admin unless its email is already registered. Returns `None`
/// when the admin already exists.
pub fn seed_admin(provisioner: &IdentityProvisioner, password: &str) -> Result<Option<Provisioned>> {
    let draft = UserDraft {
        email: SEED_ADMIN_EMAIL.to_string(),
        password: password.to_string(),
        first_name: "admin".to_string(),
        last_name: "admin".to_string(),
        phone_number: "1234567890".to_string(),
        referrer_id: None,
    };
    match provisioner.create_user(&draft, Role::Admin, AccountType::default(), 0) {
        Ok(out) => {
            tracing::info!(target: "startup", "seeded admin {} as {}", SEED_ADMIN_EMAIL, out.user.username);
            Ok(Some(out))
        }
        Err(AppError::Conflict { code, .. }) if code == "email_conflict" => {
            tracing::info!(target: "startup", "admin {} already present; seed skipped", SEED_ADMIN_EMAIL);
            Ok(None)
        }
        Err(e) => Err(e).context("seeding default admin"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::test_credentials;
    use crate::storage::{SqliteStore, StorageGateway};
    use std::sync::Arc;

    #[test]
    fn seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("seed.db"), 1).unwrap());
        let p = IdentityProvisioner::new(store.clone(), Arc::new(test_credentials()), 5);

        let first = seed_admin(&p, "Adminpassw0rd").unwrap().unwrap();
        assert_eq!(first.user.role, Role::Admin);
        assert!(first.account.is_none());
        assert!(first.user.username.starts_with("$admin.admin#"));
        assert!(seed_admin(&p, "Adminpassw0rd").unwrap().is_none());
        assert_eq!(store.get_by_email(SEED_ADMIN_EMAIL).unwrap().id, first.user.id);
    }

    #[test]
    fn weak_seed_password_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("seed.db"), 1).unwrap());
        let p = IdentityProvisioner::new(store, Arc::new(test_credentials()), 5);
        assert!(seed_admin(&p, "adminpassword").is_err());
    }
}
