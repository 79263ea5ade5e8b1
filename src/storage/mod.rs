//!
//! teller storage module
//! ---------------------
//! Persistence for users and accounts behind the `StorageGateway` trait. The shipped
//! implementation, `SqliteStore`, keeps a pool of SQLite connections and relies on
//! SQLite transactions and unique indexes for every cross-row guarantee:
//!
//! - registration inserts the user and (for non-admin roles) the account in one transaction;
//! - deactivation flips `is_active` on the user and its account in one transaction;
//! - reads exclude inactive rows, except `audit_user` and `update_user` which address rows by id.
//!
//! Uniqueness violations surface as `StoreError::Conflict` naming the offending field so
//! callers never have to inspect raw SQLite messages.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Account, NewAccount, NewUser, User};

pub mod schema;
mod sqlite;
mod update;

pub use sqlite::SqliteStore;
pub use update::{UpdatableField, UserUpdate};

/// Which unique constraint a write ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
    AccountNumber,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("unique constraint violated on {0:?}")]
    Conflict(UniqueField),
    #[error("referrer does not exist")]
    UnknownReferrer,
    #[error("update contains no fields")]
    EmptyUpdate,
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional persistence for users and accounts.
pub trait StorageGateway: Send + Sync {
    /// Insert a user and, when given, its account, atomically. Either both rows exist
    /// afterwards or neither does.
    fn create_user_and_account(&self, user: &NewUser, account: Option<&NewAccount>) -> StoreResult<(User, Option<Account>)>;

    fn get_by_id(&self, id: i64) -> StoreResult<User>;
    fn get_by_email(&self, email: &str) -> StoreResult<User>;
    fn get_by_username(&self, username: &str) -> StoreResult<User>;

    /// Apply a whitelisted update. Addresses the row by id whether or not it is active.
    fn update_user(&self, id: i64, update: &UserUpdate) -> StoreResult<User>;

    /// Soft-delete a user and the account it owns.
    fn deactivate(&self, user_id: i64) -> StoreResult<()>;

    fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()>;

    /// Fetch a user row regardless of its active flag.
    fn audit_user(&self, id: i64) -> StoreResult<User>;

    fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    fn get_account_by_id(&self, id: i64) -> StoreResult<Account>;
    fn get_account_for_user(&self, user_id: i64) -> StoreResult<Account>;
}
