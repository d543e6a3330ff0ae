//! Session lifecycle: issue a token pair, renew the access token, revoke the
//! refresh token.
//!
//! Access tokens are stateless and checked only by signature and expiry.
//! Refresh tokens are also recorded in the ledger, which has the final say:
//! a revoked refresh token is rejected even when it is otherwise valid.

mod issuer;
mod renewer;
mod revoker;

use std::sync::Arc;

use crate::db::Database;
use crate::jwt::{IssuedToken, JwtError, TokenKeys, VerificationError};

/// Token pair handed to a client after login or registration.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Orchestrates the token codecs and the refresh token ledger.
#[derive(Clone)]
pub struct Sessions {
    db: Database,
    keys: Arc<TokenKeys>,
}

impl Sessions {
    pub fn new(db: Database, keys: Arc<TokenKeys>) -> Self {
        Self { db, keys }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }
}

/// Why a session operation failed.
#[derive(Debug)]
pub enum SessionError {
    /// No refresh token was presented
    MissingToken,
    /// The token failed signature, structure or expiry checks
    InvalidToken(VerificationError),
    /// The ledger has no active record for the token
    Revoked,
    /// A freshly minted refresh token matched a revoked ledger entry
    RevokedConflict,
    /// Signing a token failed
    Signing(JwtError),
    /// The ledger could not be read or written
    Database(sqlx::Error),
}

impl SessionError {
    /// Whether the failure is the caller's fault (401) rather than ours (500).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            SessionError::MissingToken
                | SessionError::InvalidToken(_)
                | SessionError::Revoked
                | SessionError::RevokedConflict
        )
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::MissingToken => write!(f, "No refresh token"),
            SessionError::InvalidToken(e) => write!(f, "Invalid refresh token: {}", e),
            SessionError::Revoked => write!(f, "Refresh token has been revoked"),
            SessionError::RevokedConflict => {
                write!(f, "Issued refresh token collides with a revoked token")
            }
            SessionError::Signing(e) => write!(f, "{}", e),
            SessionError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<JwtError> for SessionError {
    fn from(e: JwtError) -> Self {
        SessionError::Signing(e)
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(e: sqlx::Error) -> Self {
        SessionError::Database(e)
    }
}
