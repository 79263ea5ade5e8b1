//! The authorization guard must stop a cross-account request before the protected
//! handler touches the store.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};

use common::{app_with, customer, open_store, register_and_login, send, test_config};
use teller::model::{Account, NewAccount, NewUser, User};
use teller::storage::{SqliteStore, StorageGateway, StoreResult, UserUpdate};

/// Delegates to SQLite and counts account-by-id reads and deactivations.
struct CountingStore {
    inner: SqliteStore,
    account_reads: AtomicUsize,
    deactivations: AtomicUsize,
}

impl StorageGateway for CountingStore {
    fn create_user_and_account(&self, user: &NewUser, account: Option<&NewAccount>) -> StoreResult<(User, Option<Account>)> {
        self.inner.create_user_and_account(user, account)
    }
    fn get_by_id(&self, id: i64) -> StoreResult<User> { self.inner.get_by_id(id) }
    fn get_by_email(&self, email: &str) -> StoreResult<User> { self.inner.get_by_email(email) }
    fn get_by_username(&self, username: &str) -> StoreResult<User> { self.inner.get_by_username(username) }
    fn update_user(&self, id: i64, update: &UserUpdate) -> StoreResult<User> { self.inner.update_user(id, update) }
    fn deactivate(&self, user_id: i64) -> StoreResult<()> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        self.inner.deactivate(user_id)
    }
    fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> StoreResult<()> { self.inner.record_login(user_id, at) }
    fn audit_user(&self, id: i64) -> StoreResult<User> { self.inner.audit_user(id) }
    fn list_accounts(&self) -> StoreResult<Vec<Account>> { self.inner.list_accounts() }
    fn get_account_by_id(&self, id: i64) -> StoreResult<Account> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_account_by_id(id)
    }
    fn get_account_for_user(&self, user_id: i64) -> StoreResult<Account> { self.inner.get_account_for_user(user_id) }
}

#[tokio::test]
async fn cross_account_request_never_reaches_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = test_config(dir.path());
    let store = Arc::new(CountingStore {
        inner: open_store(&cfg),
        account_reads: AtomicUsize::new(0),
        deactivations: AtomicUsize::new(0),
    });
    let app = app_with(&cfg, store.clone());

    let (id_a, token_a) = register_and_login(&app, customer("a@bank.com")).await;
    let (id_b, _) = register_and_login(&app, customer("b@bank.com")).await;
    assert_eq!(store.account_reads.load(Ordering::SeqCst), 0);

    // Authorized: one read by the guard, one by the handler
    let (status, _) = send(&app, "GET", &format!("/account/{id_a}"), Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.account_reads.load(Ordering::SeqCst), 2);

    // Denied: only the guard's lookup happens
    let (status, _) = send(&app, "GET", &format!("/account/{id_b}"), Some(&token_a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.account_reads.load(Ordering::SeqCst), 3);

    let (status, _) = send(&app, "DELETE", &format!("/account/{id_b}"), Some(&token_a), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.deactivations.load(Ordering::SeqCst), 0);
    assert_eq!(store.account_reads.load(Ordering::SeqCst), 4);

    // An invalid token is rejected before any lookup
    let (status, _) = send(&app, "GET", &format!("/account/{id_a}"), Some("x.y.z"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(store.account_reads.load(Ordering::SeqCst), 4);
}
