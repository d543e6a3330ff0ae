//! Access guard and cookie transport for bearer tokens.
//!
//! Access tokens travel in the `access_token` cookie on every path; refresh
//! tokens travel in the `refresh_token` cookie scoped to the token lifecycle
//! routes. The `Auth` extractor only checks the access token and never looks
//! at the refresh token ledger.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, access_cookie,
    clear_access_cookie, clear_refresh_cookie, get_cookie, refresh_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::Auth;
pub use ip::{HasHeadersAndExtensions, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
