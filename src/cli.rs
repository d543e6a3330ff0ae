//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL};
use crate::password::Argon2Verifier;
use crate::rate_limit::RateLimitSettings;
use clap::Parser;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Upper bound on the access token lifetime: one day.
const MAX_ACCESS_TOKEN_MINUTES: u64 = 24 * 60;

/// Upper bound on the refresh token lifetime: one year.
const MAX_REFRESH_TOKEN_DAYS: u64 = 365;

pub const ACCESS_SECRET_ENV: &str = "JWT_ACCESS_SECRET";
pub const REFRESH_SECRET_ENV: &str = "JWT_REFRESH_SECRET";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

/// Header set by a reverse proxy with the real client address.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientIpHeader {
    XForwardedFor,
    XRealIp,
    CfConnectingIp,
}

/// Reads the client IP from a proxy header.
#[derive(Clone, Debug)]
pub struct IpExtractor {
    pub header_name: &'static str,
    parse: fn(&str) -> Result<String, &'static str>,
}

impl IpExtractor {
    pub fn extract(&self, header_value: &str) -> Result<String, &'static str> {
        (self.parse)(header_value)
    }
}

impl From<ClientIpHeader> for IpExtractor {
    fn from(header: ClientIpHeader) -> Self {
        match header {
            ClientIpHeader::XForwardedFor => Self {
                header_name: "x-forwarded-for",
                parse: parse_forwarded_for,
            },
            ClientIpHeader::XRealIp => Self {
                header_name: "x-real-ip",
                parse: parse_single_ip,
            },
            ClientIpHeader::CfConnectingIp => Self {
                header_name: "cf-connecting-ip",
                parse: parse_single_ip,
            },
        }
    }
}

fn parse_single_ip(value: &str) -> Result<String, &'static str> {
    value
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| "IP header does not contain a valid address")
}

/// Each proxy appends the address it saw, so only the right-most entry was
/// written by our own proxy. Entries to its left are client-controlled.
fn parse_forwarded_for(value: &str) -> Result<String, &'static str> {
    parse_single_ip(value.rsplit(',').next().unwrap_or_default())
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokenward",
    about = "Access and refresh token lifecycle service"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tokenward.db")]
    pub database: String,

    /// Public origin of the service (full URL). HTTPS enables Secure cookies
    #[arg(long, env = "PUBLIC_ORIGIN", default_value = "http://localhost:7291")]
    pub origin: String,

    /// Access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_EXPIRES_MINUTES",
        default_value_t = DEFAULT_ACCESS_TOKEN_TTL.as_secs() / 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_ACCESS_TOKEN_MINUTES))]
    pub access_token_minutes: u64,

    /// Refresh token lifetime in days
    #[arg(long, env = "REFRESH_TOKEN_EXPIRES_DAYS",
        default_value_t = DEFAULT_REFRESH_TOKEN_TTL.as_secs() / (24 * 60 * 60),
        value_parser = clap::value_parser!(u64).range(1..=MAX_REFRESH_TOKEN_DAYS))]
    pub refresh_token_days: u64,

    /// Path to file containing the access token secret. Prefer JWT_ACCESS_SECRET
    #[arg(long)]
    pub access_secret_file: Option<String>,

    /// Path to file containing the refresh token secret. Prefer JWT_REFRESH_SECRET
    #[arg(long)]
    pub refresh_secret_file: Option<String>,

    /// Read the client IP from this proxy header instead of the socket address
    #[arg(long)]
    pub client_ip_header: Option<ClientIpHeader>,

    /// Login attempts allowed per client IP per minute
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub login_attempts_per_minute: u32,

    /// Registrations allowed per client IP per minute
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..))]
    pub signups_per_minute: u32,

    /// Disable rate limiting on login and registration
    #[arg(long)]
    pub no_rate_limit: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        secret
    } else if let Some(path) = secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read secret file");
                return None;
            }
        }
    } else {
        error!(
            env = env_var,
            "Secret is required. Set the environment variable (recommended) or pass the secret file option"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            env = env_var,
            "Secret is shorter than {} characters. Use a longer secret", MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Load both signing secrets. They must differ so that one token kind can
/// never pass as the other.
pub fn load_secrets(args: &Args) -> Option<(String, String)> {
    let access = load_secret(ACCESS_SECRET_ENV, args.access_secret_file.as_deref())?;
    let refresh = load_secret(REFRESH_SECRET_ENV, args.refresh_secret_file.as_deref())?;

    if access == refresh {
        error!("Access and refresh secrets must be different");
        return None;
    }

    Some((access, refresh))
}

/// Parse and validate the public origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_origin(origin: &str) -> Option<Url> {
    let url = match Url::parse(origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %origin, error = %e, "Invalid origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Token lifetimes from the arguments as (access, refresh).
/// Returns None and logs an error if they overflow or the access token would
/// not be the shorter lived one.
pub fn token_lifetimes(args: &Args) -> Option<(Duration, Duration)> {
    let access = args.access_token_minutes.checked_mul(60);
    let refresh = args.refresh_token_days.checked_mul(24 * 60 * 60);

    let (Some(access), Some(refresh)) = (access, refresh) else {
        error!("Token lifetime is too large");
        return None;
    };

    if access >= refresh {
        error!(
            access_secs = access,
            refresh_secs = refresh,
            "Access token lifetime must be shorter than the refresh token lifetime"
        );
        return None;
    }

    Some((Duration::from_secs(access), Duration::from_secs(refresh)))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    origin: &Url,
    (access_ttl, refresh_ttl): (Duration, Duration),
    access_secret: String,
    refresh_secret: String,
) -> ServerConfig {
    let secure_cookies = origin.scheme() == "https";

    let rate_limit = (!args.no_rate_limit).then_some(RateLimitSettings {
        login_per_minute: args.login_attempts_per_minute,
        register_per_minute: args.signups_per_minute,
    });

    ServerConfig {
        db,
        access_secret: access_secret.into_bytes(),
        refresh_secret: refresh_secret.into_bytes(),
        access_ttl,
        refresh_ttl,
        secure_cookies,
        credentials: Arc::new(Argon2Verifier::new()),
        rate_limit,
        ip_extractor: args.client_ip_header.map(IpExtractor::from),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["tokenward"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_rate_limit_flags() {
        let args = parse(&["--login-attempts-per-minute", "20", "--client-ip-header", "x-real-ip"]);
        assert_eq!(args.login_attempts_per_minute, 20);
        assert_eq!(args.signups_per_minute, 3);
        assert_eq!(args.client_ip_header, Some(ClientIpHeader::XRealIp));
        assert!(!args.no_rate_limit);
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let result = Args::try_parse_from(["tokenward", "--access-token-minutes", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_lifetime_rejected() {
        let result = Args::try_parse_from([
            "tokenward",
            "--access-token-minutes",
            "18446744073709551615",
        ]);
        assert!(result.is_err());

        let result = Args::try_parse_from(["tokenward", "--refresh-token-days", "366"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_lifetimes() {
        let args = parse(&[]);
        assert_eq!(
            token_lifetimes(&args),
            Some((DEFAULT_ACCESS_TOKEN_TTL, DEFAULT_REFRESH_TOKEN_TTL))
        );
    }

    #[test]
    fn test_access_lifetime_must_be_shorter() {
        let args = parse(&["--access-token-minutes", "1440", "--refresh-token-days", "1"]);
        assert!(token_lifetimes(&args).is_none());

        let args = parse(&["--access-token-minutes", "1439", "--refresh-token-days", "1"]);
        assert_eq!(
            token_lifetimes(&args),
            Some((Duration::from_secs(1439 * 60), Duration::from_secs(24 * 60 * 60)))
        );
    }

    #[test]
    fn test_validate_origin() {
        assert!(validate_origin("https://auth.example.com").is_some());
        assert!(validate_origin("http://localhost:7291").is_some());
        assert!(validate_origin("http://auth.example.com").is_none());
        assert!(validate_origin("not a url").is_none());
    }

    #[test]
    fn test_ip_extractors() {
        let xff = IpExtractor::from(ClientIpHeader::XForwardedFor);
        assert_eq!(xff.header_name, "x-forwarded-for");
        assert_eq!(xff.extract(" 198.51.100.4 , 10.0.0.1"), Ok("10.0.0.1".into()));
        assert_eq!(xff.extract("203.0.113.9"), Ok("203.0.113.9".into()));
        assert!(xff.extract("").is_err());

        let real = IpExtractor::from(ClientIpHeader::XRealIp);
        assert_eq!(real.extract("2001:db8::1"), Ok("2001:db8::1".into()));
        assert!(real.extract("198.51.100.4, 10.0.0.1").is_err());
    }

    #[test]
    fn test_load_secret_from_file() {
        let path = std::env::temp_dir().join(format!("tokenward-secret-{}", uuid::Uuid::new_v4()));

        std::fs::write(&path, "  a-very-long-secret-value-for-signing-tokens\n").unwrap();
        let secret = load_secret("TOKENWARD_TEST_UNSET_SECRET", path.to_str());
        assert_eq!(
            secret.as_deref(),
            Some("a-very-long-secret-value-for-signing-tokens")
        );

        std::fs::write(&path, "too-short").unwrap();
        assert!(load_secret("TOKENWARD_TEST_UNSET_SECRET", path.to_str()).is_none());

        std::fs::remove_file(&path).unwrap();
        assert!(load_secret("TOKENWARD_TEST_UNSET_SECRET", path.to_str()).is_none());
        assert!(load_secret("TOKENWARD_TEST_UNSET_SECRET", None).is_none());
    }

    #[tokio::test]
    async fn test_build_config() {
        let args = parse(&["--no-rate-limit", "--access-token-minutes", "5"]);
        let db = Database::open(":memory:").await.unwrap();
        let origin = Url::parse("https://auth.example.com").unwrap();

        let lifetimes = token_lifetimes(&args).unwrap();

        let config = build_config(
            &args,
            db,
            &origin,
            lifetimes,
            "a".repeat(32),
            "b".repeat(32),
        );
        assert!(config.secure_cookies);
        assert!(config.rate_limit.is_none());
        assert_eq!(config.access_ttl, Duration::from_secs(300));
        assert!(config.ip_extractor.is_none());
    }
}
