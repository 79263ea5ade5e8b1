use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::principal::IdentityRef;
use super::session::TokenService;
use crate::error::{AppError, AppResult};
use crate::security::CredentialManager;
use crate::storage::{StorageGateway, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub identity: IdentityRef,
    pub token: String,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse>;
}

/// Email + password login against the local user store.
pub struct LocalAuthProvider {
    store: Arc<dyn StorageGateway>,
    credentials: Arc<CredentialManager>,
    tokens: Arc<TokenService>,
}

impl LocalAuthProvider {
    pub fn new(store: Arc<dyn StorageGateway>, credentials: Arc<CredentialManager>, tokens: Arc<TokenService>) -> Self {
        Self { store, credentials, tokens }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> AppResult<LoginResponse> {
        let user = match self.store.get_by_email(req.email.trim()) {
            Ok(u) => u,
            Err(StoreError::NotFound) => {
                self.credentials.dummy_verify(&req.password);
                tracing::info!(target: "teller::auth", "login rejected: unknown email");
                return Err(AppError::bad_credentials());
            }
            Err(e) => return Err(e.into()),
        };
        if !self.credentials.verify(&user.password_hash, &req.password) {
            tracing::info!(target: "teller::auth", "login rejected for user {}", user.id);
            return Err(AppError::bad_credentials());
        }

        let account = if user.role.owns_account() { Some(self.store.get_account_for_user(user.id)?) } else { None };
        let identity = IdentityRef::for_user(&user, account.as_ref());
        let token = self
            .tokens
            .issue(&identity)
            .map_err(|e| AppError::internal("token_issue_failed".to_string(), e.to_string()))?;

        if let Err(e) = self.store.record_login(user.id, Utc::now()) {
            tracing::warn!(target: "teller::auth", "could not stamp last login for user {}: {}", user.id, e);
        }
        tracing::info!(target: "teller::auth", "login user={} identity={}", user.id, identity);
        Ok(LoginResponse { identity, token })
    }
}
