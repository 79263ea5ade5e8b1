use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{Account, User};

/// The stable reference a session token carries. Account holders are referenced by
/// account number, admins (who own no account) by their generated username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IdentityRef {
    Username(String),
    AccountNumber(i64),
}

impl IdentityRef {
    pub fn for_user(user: &User, account: Option<&Account>) -> Self {
        match account {
            Some(a) => IdentityRef::AccountNumber(a.account_number),
            None => IdentityRef::Username(user.username.clone()),
        }
    }

    pub fn matches_account(&self, account: &Account) -> bool {
        matches!(self, IdentityRef::AccountNumber(n) if *n == account.account_number)
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityRef::Username(u) => f.write_str(u),
            IdentityRef::AccountNumber(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for IdentityRef {
    type Err = String;

    // Generated usernames always start with '$'; account numbers are plain digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('$') {
            return Ok(IdentityRef::Username(s.to_string()));
        }
        s.parse::<i64>()
            .map(IdentityRef::AccountNumber)
            .map_err(|_| format!("unrecognised identity reference '{s}'"))
    }
}

impl TryFrom<String> for IdentityRef {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<IdentityRef> for String {
    fn from(r: IdentityRef) -> Self { r.to_string() }
}

/// Session claims carried inside a token. Times are seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: IdentityRef,
    pub iat: i64,
    pub exp: i64,
}
