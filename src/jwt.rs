//! JWT token generation and validation.
//!
//! Access and refresh tokens share one claim layout. They are told apart by the
//! secret that signs them: each `TokenCodec` owns exactly one secret and one
//! lifetime, so a token minted by one codec never verifies with the other.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (database user ID)
    #[serde(rename = "user_id")]
    pub subject_id: i64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// JWT ID, only set on refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Default refresh token lifetime: 30 days
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Claims embedded in the token
    pub claims: Claims,
    /// Token duration in seconds (used as cookie Max-Age)
    pub duration: u64,
}

/// Signs and verifies tokens with a single secret and lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
    with_jti: bool,
}

impl TokenCodec {
    /// Codec for stateless access tokens.
    pub fn access(secret: &[u8], ttl: Duration) -> Self {
        Self::new(secret, ttl, false)
    }

    /// Codec for refresh tokens. Each token gets a random JTI so that two
    /// tokens minted in the same second for the same user still differ.
    pub fn refresh(secret: &[u8], ttl: Duration) -> Self {
        Self::new(secret, ttl, true)
    }

    fn new(secret: &[u8], ttl: Duration, with_jti: bool) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs: ttl.as_secs().max(1),
            with_jti,
        }
    }

    /// Issue a token for a user, starting now.
    pub fn issue(&self, subject_id: i64) -> Result<IssuedToken, JwtError> {
        self.issue_at(subject_id, unix_now()?)
    }

    /// Issue a token for a user with an explicit issue time.
    pub fn issue_at(&self, subject_id: i64, issued_at: u64) -> Result<IssuedToken, JwtError> {
        let exp = issued_at
            .checked_add(self.ttl_secs)
            .ok_or(JwtError::ExpiryOverflow)?;

        let claims = Claims {
            subject_id,
            iat: issued_at,
            exp,
            jti: self.with_jti.then(|| uuid::Uuid::new_v4().to_string()),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            claims,
            duration: self.ttl_secs,
        })
    }

    /// Validate and decode a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims, VerificationError> {
        // A broken clock must not make tokens valid forever.
        let now = unix_now().map_err(|_| VerificationError::Expired)?;
        self.verify_at(token, now)
    }

    /// Validate and decode a token against an explicit time.
    /// A token is expired from the second `exp` is reached.
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, VerificationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below with a strict comparison.
        validation.validate_exp = false;

        let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(VerificationError::from)?
            .claims;

        if claims.exp <= claims.iat {
            return Err(VerificationError::Malformed);
        }

        if now >= claims.exp {
            return Err(VerificationError::Expired);
        }

        Ok(claims)
    }
}

/// The two codecs used by the service.
#[derive(Clone)]
pub struct TokenKeys {
    pub access: TokenCodec,
    pub refresh: TokenCodec,
}

impl TokenKeys {
    pub fn new(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: TokenCodec::access(access_secret, access_ttl),
            refresh: TokenCodec::refresh(refresh_secret, refresh_ttl),
        }
    }
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

/// Errors that can occur while issuing a token.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Issue time plus lifetime does not fit in a timestamp
    ExpiryOverflow,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::ExpiryOverflow => write!(f, "Token expiry overflows"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationError {
    /// The token's expiry has been reached
    Expired,
    /// The token is not a well-formed JWT with the expected claims
    Malformed,
    /// The token was not signed with this codec's secret
    SignatureMismatch,
}

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => VerificationError::SignatureMismatch,
            ErrorKind::ExpiredSignature => VerificationError::Expired,
            _ => VerificationError::Malformed,
        }
    }
}

impl std::fmt::Display for VerificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationError::Expired => write!(f, "Token expired"),
            VerificationError::Malformed => write!(f, "Malformed token"),
            VerificationError::SignatureMismatch => write!(f, "Token signature mismatch"),
        }
    }
}

impl std::error::Error for VerificationError {}
