//! Authentication user types.

use crate::jwt::Claims;

/// Identity resolved from a valid access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Database user ID
    pub subject_id: i64,
    /// JWT claims from the access token
    pub claims: Claims,
}
