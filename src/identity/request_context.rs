use super::Claims;
use crate::model::Account;

/// What the authorization guard hands to a protected handler once it has bound the
/// request's token to exactly one account.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub claims: Claims,
    pub account: Account,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(claims: Claims, account: Account) -> Self {
        Self { claims, account, request_id: uuid::Uuid::new_v4().to_string() }
    }
}
