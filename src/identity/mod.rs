//! Identity, sessions and account authorization.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod session;
mod provider;
mod request_context;
mod authorizer;
pub mod provisioner;
pub mod validation;

pub use principal::{Claims, IdentityRef};
pub use session::{AuthError, TokenService};
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use provisioner::{IdentifierSource, IdentityProvisioner, Provisioned, RandomIdentifiers};
pub use request_context::RequestContext;
pub use authorizer::{require_account_owner, AuthorizationGuard, DenyReason, GuardState, TOKEN_HEADER};
pub use validation::UserDraft;
