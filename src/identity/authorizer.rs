//! Authorization guard binding a session token to the one account it may act on.
//!
//! Evaluation walks `Unauthenticated -> TokenValid -> OwnershipVerified -> Authorized`,
//! dropping into `Denied` at the first failed check. Only `Authorized` lets the wrapped
//! handler run.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::principal::Claims;
use super::request_context::RequestContext;
use super::session::TokenService;
use crate::error::AppError;
use crate::model::Account;
use crate::storage::{StorageGateway, StoreError};

pub const TOKEN_HEADER: &str = "x-jwt-token";

/// Why a request was denied. Logged, never shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    InvalidToken,
    BadAccountId,
    AccountNotFound,
    StoreUnavailable,
    IdentityMismatch,
}

#[derive(Debug, Clone)]
pub enum GuardState {
    Unauthenticated,
    TokenValid(Claims),
    OwnershipVerified(Claims, Account),
    Authorized(RequestContext),
    Denied(DenyReason),
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GuardState::Authorized(_) | GuardState::Denied(_))
    }
}

pub struct AuthorizationGuard {
    tokens: Arc<TokenService>,
    store: Arc<dyn StorageGateway>,
}

impl AuthorizationGuard {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn StorageGateway>) -> Self {
        Self { tokens, store }
    }

    /// Run the guard to a terminal state. Blocking: may hit the store.
    pub fn evaluate(&self, token: Option<&str>, raw_account_id: &str) -> GuardState {
        let mut state = GuardState::Unauthenticated;
        while !state.is_terminal() {
            state = self.step(state, token, raw_account_id);
        }
        state
    }

    fn step(&self, state: GuardState, token: Option<&str>, raw_account_id: &str) -> GuardState {
        match state {
            GuardState::Unauthenticated => match token {
                None => GuardState::Denied(DenyReason::MissingToken),
                Some(t) => match self.tokens.verify(t) {
                    Ok(claims) => GuardState::TokenValid(claims),
                    Err(_) => GuardState::Denied(DenyReason::InvalidToken),
                },
            },
            GuardState::TokenValid(claims) => {
                let Ok(id) = raw_account_id.trim().parse::<i64>() else {
                    return GuardState::Denied(DenyReason::BadAccountId);
                };
                match self.store.get_account_by_id(id) {
                    Ok(account) => GuardState::OwnershipVerified(claims, account),
                    Err(StoreError::NotFound) => GuardState::Denied(DenyReason::AccountNotFound),
                    Err(e) => {
                        tracing::error!(target: "teller::auth", "guard lookup failed: {}", e);
                        GuardState::Denied(DenyReason::StoreUnavailable)
                    }
                }
            }
            GuardState::OwnershipVerified(claims, account) => {
                if claims.sub.matches_account(&account) {
                    GuardState::Authorized(RequestContext::new(claims, account))
                } else {
                    GuardState::Denied(DenyReason::IdentityMismatch)
                }
            }
            terminal => terminal,
        }
    }
}

/// axum middleware for `/account/{id}` routes. On success the handler finds a
/// `RequestContext` in the request extensions.
pub async fn require_account_owner(
    State(guard): State<Arc<AuthorizationGuard>>,
    Path(raw_id): Path<String>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req.headers().get(TOKEN_HEADER).and_then(|v| v.to_str().ok()).map(str::to_owned);
    let outcome = tokio::task::spawn_blocking(move || guard.evaluate(token.as_deref(), &raw_id)).await;
    match outcome {
        Ok(GuardState::Authorized(ctx)) => {
            tracing::debug!(target: "teller::auth", "request {} authorized for account {}", ctx.request_id, ctx.account.id);
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        Ok(GuardState::Denied(reason)) => {
            tracing::info!(target: "teller::auth", "denied {} {}: {:?}", req.method(), req.uri().path(), reason);
            AppError::permission_denied().into_response()
        }
        Ok(other) => {
            tracing::error!(target: "teller::auth", "guard stopped in non-terminal state {:?}", other);
            AppError::permission_denied().into_response()
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::identity::principal::IdentityRef;
    use crate::identity::provisioner::IdentityProvisioner;
    use crate::identity::validation::UserDraft;
    use crate::model::{AccountType, Role};
    use crate::security::test_credentials;
    use crate::storage::SqliteStore;

    fn draft(email: &str) -> UserDraft {
        UserDraft {
            email: email.into(),
            password: "Passw0rd".into(),
            first_name: "Alan".into(),
            last_name: "Turing".into(),
            phone_number: "5559998888".into(),
            referrer_id: None,
        }
    }

    fn denied(state: GuardState) -> DenyReason {
        match state {
            GuardState::Denied(r) => r,
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn walks_every_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("g.db"), 2).unwrap());
        let tokens = Arc::new(TokenService::new(&TokenConfig { secret: "k".repeat(40), ttl_secs: 600 }).unwrap());
        let provisioner = IdentityProvisioner::new(store.clone(), Arc::new(test_credentials()), 5);
        let guard = AuthorizationGuard::new(tokens.clone(), store.clone());

        let a = provisioner.create_user(&draft("a@bank.com"), Role::Customer, AccountType::Checking, 0).unwrap();
        let b = provisioner.create_user(&draft("b@bank.com"), Role::Employee, AccountType::Savings, 0).unwrap();
        let admin = provisioner.create_user(&draft("root@bank.com"), Role::Admin, AccountType::Checking, 0).unwrap();
        let (acct_a, acct_b) = (a.account.unwrap(), b.account.unwrap());

        let token_a = tokens.issue(&IdentityRef::AccountNumber(acct_a.account_number)).unwrap();
        let admin_token = tokens.issue(&IdentityRef::Username(admin.user.username.clone())).unwrap();

        match guard.evaluate(Some(token_a.as_str()), &acct_a.id.to_string()) {
            GuardState::Authorized(ctx) => {
                assert_eq!(ctx.account, acct_a);
                assert_eq!(ctx.claims.sub, IdentityRef::AccountNumber(acct_a.account_number));
                assert!(!ctx.request_id.is_empty());
            }
            other => panic!("expected authorization, got {other:?}"),
        }

        assert_eq!(denied(guard.evaluate(None, &acct_a.id.to_string())), DenyReason::MissingToken);
        assert_eq!(denied(guard.evaluate(Some("garbage"), &acct_a.id.to_string())), DenyReason::InvalidToken);
        assert_eq!(denied(guard.evaluate(Some(token_a.as_str()), "abc")), DenyReason::BadAccountId);
        assert_eq!(denied(guard.evaluate(Some(token_a.as_str()), "999999")), DenyReason::AccountNotFound);
        assert_eq!(denied(guard.evaluate(Some(token_a.as_str()), &acct_b.id.to_string())), DenyReason::IdentityMismatch);
        assert_eq!(denied(guard.evaluate(Some(admin_token.as_str()), &acct_a.id.to_string())), DenyReason::IdentityMismatch);

        store.deactivate(a.user.id).unwrap();
        assert_eq!(denied(guard.evaluate(Some(token_a.as_str()), &acct_a.id.to_string())), DenyReason::AccountNotFound);
    }

    #[test]
    fn expired_token_never_reaches_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(&dir.path().join("g.db"), 1).unwrap());
        let tokens = Arc::new(TokenService::new(&TokenConfig { secret: "k".repeat(40), ttl_secs: 0 }).unwrap());
        let guard = AuthorizationGuard::new(tokens.clone(), store);
        let token = tokens.issue(&IdentityRef::AccountNumber(123456)).unwrap();
        assert_eq!(denied(guard.evaluate(Some(token.as_str()), "1")), DenyReason::InvalidToken);
    }
}
