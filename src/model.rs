//! Core records: users, their accounts, and the closed enumerations that classify them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a user is to the bank. Admins own no account; everyone else owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    Customer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Employee, Role::Customer];

    /// Stable id used in the `roles` lookup table.
    pub fn id(self) -> i64 {
        match self {
            Role::Admin => 0,
            Role::Employee => 1,
            Role::Customer => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Customer => "customer",
        }
    }

    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            0 => Some(Role::Admin),
            1 => Some(Role::Employee),
            2 => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn owns_account(self) -> bool {
        match self {
            Role::Admin => false,
            Role::Employee | Role::Customer => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
}

impl AccountType {
    pub const ALL: [AccountType; 2] = [AccountType::Checking, AccountType::Savings];

    pub fn id(self) -> i64 {
        match self {
            AccountType::Checking => 0,
            AccountType::Savings => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
        }
    }

    pub fn from_id(id: i64) -> Option<AccountType> {
        match id {
            0 => Some(AccountType::Checking),
            1 => Some(AccountType::Savings),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub phone_number: String,
    pub referrer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub role: Role,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_number: i64,
    /// Minor currency units.
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub account_type: AccountType,
    pub is_active: bool,
}

/// A user row ready for insertion; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub phone_number: String,
    pub referrer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub role: Role,
    pub is_active: bool,
}

/// An account row ready for insertion; `user_id` is filled in inside the transaction.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub account_number: i64,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub account_type: AccountType,
    pub is_active: bool,
}
