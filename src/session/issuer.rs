use tracing::{error, info};

use super::{IssuedSession, SessionError, Sessions};
use crate::db::RecordOutcome;

impl Sessions {
    /// Issue an access/refresh token pair for a verified user and record the
    /// refresh token in the ledger.
    ///
    /// Nothing is returned unless the ledger write succeeded, so every token a
    /// client holds can later be revoked.
    pub async fn issue(&self, user_id: i64) -> Result<IssuedSession, SessionError> {
        let access = self.keys.access.issue(user_id)?;
        let refresh = self.keys.refresh.issue(user_id)?;

        match self
            .db
            .refresh_tokens()
            .record(&refresh.token, user_id)
            .await?
        {
            RecordOutcome::Inserted | RecordOutcome::AlreadyActive => {}
            RecordOutcome::RevokedConflict => {
                error!(user_id, "Freshly issued refresh token matches a revoked entry");
                return Err(SessionError::RevokedConflict);
            }
        }

        info!(user_id, "Session issued");
        Ok(IssuedSession { access, refresh })
    }
}
