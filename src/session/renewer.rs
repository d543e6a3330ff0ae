use tracing::{debug, warn};

use super::{SessionError, Sessions};
use crate::jwt::IssuedToken;

impl Sessions {
    /// Exchange a valid, non-revoked refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated and the ledger is only read.
    pub async fn renew(&self, refresh_token: Option<&str>) -> Result<IssuedToken, SessionError> {
        let refresh_token = refresh_token.ok_or(SessionError::MissingToken)?;

        let claims = self.keys.refresh.verify(refresh_token).map_err(|e| {
            debug!(reason = %e, "Refresh token rejected");
            SessionError::InvalidToken(e)
        })?;

        if self.db.refresh_tokens().is_revoked(refresh_token).await? {
            warn!(user_id = claims.subject_id, "Revoked refresh token presented");
            return Err(SessionError::Revoked);
        }

        let access = self.keys.access.issue(claims.subject_id)?;
        debug!(user_id = claims.subject_id, "Access token renewed");
        Ok(access)
    }
}
