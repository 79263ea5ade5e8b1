use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use super::payloads::{CreateAccountRequest, DeletedResponse, TransferRequest, UpdateProfileRequest};
use super::AppState;
use crate::error::{AppError, AppResult};
use crate::identity::validation::{require_non_blank, validate_password};
use crate::identity::{LoginRequest, LoginResponse, Provisioned, RequestContext, UserDraft};
use crate::model::{Account, Role, User};
use crate::storage::UserUpdate;

/// Run store or hashing work on the blocking pool.
async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(v)| v)
        .map_err(|rej| AppError::validation("bad_request".to_string(), rej.body_text()))
}

pub async fn login(State(state): State<AppState>, payload: Result<Json<LoginRequest>, JsonRejection>) -> AppResult<Json<LoginResponse>> {
    let req = body(payload)?;
    let auth = state.auth.clone();
    let resp = blocking(move || auth.login(&req)).await?;
    Ok(Json(resp))
}

pub async fn list_accounts(State(state): State<AppState>) -> AppResult<Json<Vec<Account>>> {
    let store = state.store.clone();
    Ok(Json(blocking(move || Ok(store.list_accounts()?)).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> AppResult<Json<Provisioned>> {
    let req = body(payload)?;
    let role = req.role.unwrap_or(Role::Customer);
    let account_type = req.account_type.unwrap_or_default();
    let balance = req.balance.unwrap_or(0);
    let draft = UserDraft {
        email: req.email,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
        phone_number: req.phone_number,
        referrer_id: req.referrer_id,
    };
    let provisioner = state.provisioner.clone();
    let out = blocking(move || provisioner.create_user(&draft, role, account_type, balance)).await?;
    info!(target: "teller::http", "POST /account created user {}", out.user.id);
    Ok(Json(out))
}

pub async fn get_account(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> AppResult<Json<Account>> {
    let store = state.store.clone();
    let id = ctx.account.id;
    Ok(Json(blocking(move || Ok(store.get_account_by_id(id)?)).await?))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<DeletedResponse>> {
    let store = state.store.clone();
    let (id, owner) = (ctx.account.id, ctx.account.user_id);
    blocking(move || Ok(store.deactivate(owner)?)).await?;
    info!(target: "teller::http", "DELETE /account/{} deactivated user {} (request {})", id, owner, ctx.request_id);
    Ok(Json(DeletedResponse { deleted: id }))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let req = body(payload)?;
    let owner = ctx.account.user_id;
    let store = state.store.clone();
    let credentials = state.credentials.clone();
    let user = blocking(move || {
        let mut update = UserUpdate::new();
        if let Some(v) = req.first_name {
            require_non_blank("firstName", &v)?;
            update = update.first_name(v.trim());
        }
        if let Some(v) = req.last_name {
            require_non_blank("lastName", &v)?;
            update = update.last_name(v.trim());
        }
        if let Some(v) = req.phone_number {
            require_non_blank("phoneNumber", &v)?;
            update = update.phone_number(v.trim());
        }
        if let Some(pw) = req.password {
            validate_password(&pw)?;
            update = update.password_hash(credentials.hash(&pw)?);
        }
        Ok(store.update_user(owner, &update)?)
    })
    .await?;
    info!(target: "teller::http", "PATCH /account/{} updated user {}", ctx.account.id, owner);
    Ok(Json(user))
}

pub async fn transfer(payload: Result<Json<TransferRequest>, JsonRejection>) -> AppResult<Json<TransferRequest>> {
    let req = body(payload)?;
    info!(target: "teller::http", "POST /transfer to {} (not applied)", req.to_account);
    Ok(Json(req))
}
