use serde::{Deserialize, Serialize};

use crate::model::{AccountType, Role};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// Accepted for compatibility and ignored; usernames are always generated.
    #[serde(default)]
    pub user_name: Option<String>,
    pub phone_number: String,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub referrer_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

/// Money movement is not implemented; the request is validated for shape and echoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_account: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedResponse {
    pub deleted: i64,
}
