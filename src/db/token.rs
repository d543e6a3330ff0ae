//! Refresh token ledger.
//!
//! Every issued refresh token is recorded here together with its revocation
//! state. Access tokens are stateless and never stored. Records are kept after
//! revocation so that a revoked token can never be accepted again.

use sqlx::sqlite::SqlitePool;

/// A refresh token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub token: String,
    pub user_id: i64,
    pub is_revoked: bool,
    pub created_at: String,
    pub revoked_at: Option<String>,
}

/// Result of recording a refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new, non-revoked record was inserted
    Inserted,
    /// The same token was already recorded and is still active
    AlreadyActive,
    /// The same token was already recorded and has been revoked
    RevokedConflict,
}

/// Result of revoking a refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The token was active and is now revoked
    RevokedNow,
    /// The token is unknown or was already revoked
    AlreadyUnauthorized,
}

/// Store for refresh token records.
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    ///
    /// The insert is conditional on the unique token key, so two requests racing
    /// with the same token string both succeed without a duplicate row.
    pub async fn record(&self, token: &str, user_id: i64) -> Result<RecordOutcome, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id) VALUES (?, ?) ON CONFLICT(token) DO NOTHING",
        )
        .bind(token)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(RecordOutcome::Inserted);
        }

        if self.is_revoked(token).await? {
            Ok(RecordOutcome::RevokedConflict)
        } else {
            Ok(RecordOutcome::AlreadyActive)
        }
    }

    /// Check whether a refresh token has been revoked.
    /// A token with no record yet is reported as not revoked.
    pub async fn is_revoked(&self, token: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT is_revoked FROM refresh_tokens WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some_and(|r| r.0))
    }

    /// Revoke a refresh token. Only an existing, active record can be revoked.
    pub async fn revoke(&self, token: &str) -> Result<RevokeOutcome, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, revoked_at = datetime('now') WHERE token = ? AND is_revoked = 0",
        )
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(RevokeOutcome::RevokedNow)
        } else {
            Ok(RevokeOutcome::AlreadyUnauthorized)
        }
    }

    /// Get the record for a refresh token.
    pub async fn get(&self, token: &str) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, token, user_id, is_revoked, created_at, revoked_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }
}
