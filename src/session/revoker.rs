use tracing::{info, warn};

use super::{SessionError, Sessions};
use crate::db::RevokeOutcome;

impl Sessions {
    /// Revoke the presented refresh token.
    ///
    /// Only the ledger decides: an unknown or already revoked token fails, an
    /// active record is flipped to revoked exactly once.
    pub async fn revoke(&self, refresh_token: Option<&str>) -> Result<(), SessionError> {
        let refresh_token = refresh_token.ok_or(SessionError::MissingToken)?;

        match self.db.refresh_tokens().revoke(refresh_token).await? {
            RevokeOutcome::RevokedNow => {
                let user_id = self
                    .keys
                    .refresh
                    .verify(refresh_token)
                    .ok()
                    .map(|c| c.subject_id);
                info!(user_id, "Refresh token revoked");
                Ok(())
            }
            RevokeOutcome::AlreadyUnauthorized => {
                warn!("Logout with unknown or already revoked refresh token");
                Err(SessionError::Revoked)
            }
        }
    }
}
