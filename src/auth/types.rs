//! Authentication user types.

use crate::jwt::AccessClaims;

/// Identity attached to a request by the gate after access-token
/// verification.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token; `claims.sub` is the user uuid.
    pub claims: AccessClaims,
}
