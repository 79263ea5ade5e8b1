//! Validated, atomic creation of users and their accounts.

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;

use super::validation::{validate_balance, validate_draft, UserDraft};
use crate::error::{AppError, AppResult};
use crate::model::{Account, AccountType, NewAccount, NewUser, Role, User};
use crate::security::CredentialManager;
use crate::storage::{StorageGateway, StoreError, UniqueField};

pub const DISCRIMINATOR_RANGE: std::ops::RangeInclusive<u16> = 1000..=9999;
pub const ACCOUNT_NUMBER_RANGE: std::ops::RangeInclusive<i64> = 100_000..=999_999;

/// Source of the generated parts of a new identity.
pub trait IdentifierSource: Send + Sync {
    /// Four-digit username discriminator within `DISCRIMINATOR_RANGE`.
    fn discriminator(&self) -> u16;
    /// Account number within `ACCOUNT_NUMBER_RANGE`.
    fn account_number(&self) -> i64;
}

/// Uniform random identifiers from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifiers;

impl IdentifierSource for RandomIdentifiers {
    fn discriminator(&self) -> u16 { rand::thread_rng().gen_range(DISCRIMINATOR_RANGE) }
    fn account_number(&self) -> i64 { rand::thread_rng().gen_range(ACCOUNT_NUMBER_RANGE) }
}

pub fn format_username(first: &str, last: &str, discriminator: u16) -> String {
    format!("${}.{}#{}", first.trim(), last.trim(), discriminator)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub user: User,
    pub account: Option<Account>,
}

pub struct IdentityProvisioner {
    store: Arc<dyn StorageGateway>,
    credentials: Arc<CredentialManager>,
    ids: Arc<dyn IdentifierSource>,
    max_attempts: u32,
}

impl IdentityProvisioner {
    pub fn new(store: Arc<dyn StorageGateway>, credentials: Arc<CredentialManager>, max_attempts: u32) -> Self {
        Self::with_identifiers(store, credentials, Arc::new(RandomIdentifiers), max_attempts)
    }

    pub fn with_identifiers(
        store: Arc<dyn StorageGateway>,
        credentials: Arc<CredentialManager>,
        ids: Arc<dyn IdentifierSource>,
        max_attempts: u32,
    ) -> Self {
        Self { store, credentials, ids, max_attempts: max_attempts.max(1) }
    }

    /// Create a user and, for account-holding roles, its account. Nothing is written
    /// unless validation passes, and the two rows are written in one transaction.
    pub fn create_user(&self, draft: &UserDraft, role: Role, account_type: AccountType, initial_balance: i64) -> AppResult<Provisioned> {
        validate_draft(draft)?;
        validate_balance(initial_balance)?;
        if let Some(referrer) = draft.referrer_id {
            match self.store.get_by_id(referrer) {
                Ok(_) => {}
                Err(StoreError::NotFound) => return Err(StoreError::UnknownReferrer.into()),
                Err(e) => return Err(e.into()),
            }
        }

        let password_hash = self
            .credentials
            .hash(&draft.password)
            .map_err(|e| AppError::internal("hash_failed".to_string(), e.to_string()))?;
        let created_at = Utc::now();

        let mut attempt = 1;
        loop {
            let user = NewUser {
                email: draft.email.trim().to_string(),
                password_hash: password_hash.clone(),
                first_name: draft.first_name.trim().to_string(),
                last_name: draft.last_name.trim().to_string(),
                username: format_username(&draft.first_name, &draft.last_name, self.ids.discriminator()),
                phone_number: draft.phone_number.trim().to_string(),
                referrer_id: draft.referrer_id,
                created_at,
                role,
                is_active: true,
            };
            let account = role.owns_account().then(|| NewAccount {
                account_number: self.ids.account_number(),
                balance: initial_balance,
                created_at,
                account_type,
                is_active: true,
            });

            match self.store.create_user_and_account(&user, account.as_ref()) {
                Ok((user, account)) => {
                    tracing::info!(
                        target: "teller::provision",
                        "created {} user {} (account: {:?}) on attempt {}",
                        role.name(),
                        user.id,
                        account.as_ref().map(|a| a.id),
                        attempt
                    );
                    return Ok(Provisioned { user, account });
                }
                Err(StoreError::Conflict(field @ (UniqueField::Username | UniqueField::AccountNumber)))
                    if attempt < self.max_attempts =>
                {
                    tracing::warn!(target: "teller::provision", "generated {:?} collided; regenerating (attempt {})", field, attempt);
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
