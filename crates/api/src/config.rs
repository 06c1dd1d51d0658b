//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `RAKUDA_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `RAKUDA_ADMIN_TOKEN` - Bootstrap bearer token used to mint operator sessions
//!   (min 32 chars, high entropy)
//!
//! ## Optional
//! - `RAKUDA_HOST` - Bind address (default: 127.0.0.1)
//! - `RAKUDA_PORT` - Listen port (default: 8080)
//! - `REDIS_URL` - Redis connection string (default: redis://127.0.0.1:6379)
//! - `RATES_BASE_URL` - Exchange-rate provider base URL (default: <https://api.exchangerate.host>)
//! - `RATES_API_KEY` - Provider API key, if the plan requires one
//! - `RATES_PAIRS` - Comma-separated pairs to track (default: USD/JPY)
//! - `RATES_REFRESH_SECS` - Background refresh interval (default: 3600)
//! - `JOBS_MAX_ATTEMPTS` - Shipment job attempts before parking as dead (default: 3)
//! - `JOBS_BACKOFF_BASE_SECS` - Exponential backoff base (default: 30)
//! - `JOBS_POLL_SECS` - Worker poll interval when the queue is idle (default: 5)
//! - `SESSION_TTL_HOURS` - Operator session lifetime (default: 720)
//! - `ALERTS_SCAN_SECS` - Low-stock scan interval (default: 21600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//!
//! ## Optional (eBay - enables marketplace price pushes and buyer messages)
//! - `EBAY_CLIENT_ID` - OAuth client ID
//! - `EBAY_CLIENT_SECRET` - OAuth client secret
//! - `EBAY_API_BASE` - API base URL (default: <https://api.ebay.com>)
//!
//! ## Optional (SMTP - enables low-stock digest emails)
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM` - Email sender address
//! - `ALERTS_EMAIL_TO` - Recipient for inventory digests
//!
//! ## Optional (TLS)
//! - `RAKUDA_TLS_CERT` - PEM-encoded certificate chain
//! - `RAKUDA_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rakuda_core::CurrencyPair;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ADMIN_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_RATES_BASE_URL: &str = "https://api.exchangerate.host";
const DEFAULT_EBAY_API_BASE: &str = "https://api.ebay.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Redis connection URL (may contain password)
    pub redis_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bootstrap bearer token for minting operator sessions
    pub admin_token: SecretString,
    /// eBay marketplace configuration (optional - local-only mode without it)
    pub ebay: Option<EbayConfig>,
    /// Exchange-rate provider configuration
    pub rates: RatesConfig,
    /// SMTP configuration for inventory digests (optional)
    pub smtp: Option<SmtpConfig>,
    /// Shipment job queue tuning
    pub jobs: JobsConfig,
    /// Operator session lifetime in hours
    pub session_ttl_hours: i64,
    /// Low-stock scan interval in seconds
    pub alerts_scan_secs: u64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// eBay API configuration.
///
/// Implements `Debug` manually to redact the OAuth client secret.
#[derive(Clone)]
pub struct EbayConfig {
    /// API base URL (production or sandbox)
    pub api_base: String,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: SecretString,
}

impl std::fmt::Debug for EbayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EbayConfig")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl EbayConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let client_id = get_optional_env("EBAY_CLIENT_ID");
        let client_secret = get_optional_env("EBAY_CLIENT_SECRET");

        match (client_id, client_secret) {
            (Some(id), Some(secret)) => {
                validate_secret_strength(&secret, "EBAY_CLIENT_SECRET")?;
                Ok(Some(Self {
                    api_base: validate_base_url(
                        "EBAY_API_BASE",
                        get_env_or_default("EBAY_API_BASE", DEFAULT_EBAY_API_BASE),
                    )?,
                    client_id: id,
                    client_secret: SecretString::from(secret),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "EBAY_*".to_string(),
                "Both EBAY_CLIENT_ID and EBAY_CLIENT_SECRET must be set together".to_string(),
            )),
        }
    }
}

/// Exchange-rate provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct RatesConfig {
    /// Provider base URL
    pub base_url: String,
    /// Provider API key (optional - free tiers work without one)
    pub api_key: Option<SecretString>,
    /// Currency pairs to track
    pub pairs: Vec<CurrencyPair>,
    /// Background refresh interval in seconds
    pub refresh_secs: u64,
}

impl std::fmt::Debug for RatesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatesConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("pairs", &self.pairs)
            .field("refresh_secs", &self.refresh_secs)
            .finish()
    }
}

impl RatesConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let pairs = get_env_or_default("RATES_PAIRS", "USD/JPY");
        let pairs = pairs
            .split(',')
            .map(|p| p.trim().parse::<CurrencyPair>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConfigError::InvalidEnvVar("RATES_PAIRS".to_string(), e.to_string()))?;

        let refresh_secs = get_env_or_default("RATES_REFRESH_SECS", "3600")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("RATES_REFRESH_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            base_url: validate_base_url(
                "RATES_BASE_URL",
                get_env_or_default("RATES_BASE_URL", DEFAULT_RATES_BASE_URL),
            )?,
            api_key: get_optional_env("RATES_API_KEY").map(SecretString::from),
            pairs,
            refresh_secs,
        })
    }
}

/// Email (SMTP) configuration for inventory digests.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP server hostname
    pub host: String,
    /// SMTP server port
    pub port: u16,
    /// SMTP authentication username
    pub username: String,
    /// SMTP authentication password
    pub password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
    /// Recipient for low-stock digests
    pub alerts_to: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("alerts_to", &self.alerts_to)
            .finish()
    }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            host,
            port,
            username: get_required_env("SMTP_USERNAME")?,
            password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
            alerts_to: get_required_env("ALERTS_EMAIL_TO")?,
        }))
    }
}

/// Shipment job queue tuning.
#[derive(Debug, Clone, Copy)]
pub struct JobsConfig {
    /// Attempts before a job is parked as dead
    pub max_attempts: i32,
    /// Exponential backoff base in seconds (`base * 2^attempt`)
    pub backoff_base_secs: u64,
    /// Worker poll interval when the queue is idle
    pub poll_secs: u64,
}

impl JobsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = get_env_or_default("JOBS_MAX_ATTEMPTS", "3")
            .parse::<i32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("JOBS_MAX_ATTEMPTS".to_string(), e.to_string())
            })?;
        let backoff_base_secs = get_env_or_default("JOBS_BACKOFF_BASE_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("JOBS_BACKOFF_BASE_SECS".to_string(), e.to_string())
            })?;
        let poll_secs = get_env_or_default("JOBS_POLL_SECS", "5")
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar("JOBS_POLL_SECS".to_string(), e.to_string()))?;

        if max_attempts < 1 {
            return Err(ConfigError::InvalidEnvVar(
                "JOBS_MAX_ATTEMPTS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_attempts,
            backoff_base_secs,
            poll_secs,
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("RAKUDA_TLS_CERT");
        let key_pem = get_optional_env("RAKUDA_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "RAKUDA_TLS_*".to_string(),
                "Both RAKUDA_TLS_CERT and RAKUDA_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("RAKUDA_DATABASE_URL")?;
        let redis_url = SecretString::from(get_env_or_default(
            "REDIS_URL",
            "redis://127.0.0.1:6379",
        ));
        let host = get_env_or_default("RAKUDA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("RAKUDA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("RAKUDA_PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("RAKUDA_PORT".to_string(), e.to_string()))?;
        let admin_token = get_validated_secret("RAKUDA_ADMIN_TOKEN")?;
        validate_token_length(&admin_token, "RAKUDA_ADMIN_TOKEN")?;

        let ebay = EbayConfig::from_env()?;
        let rates = RatesConfig::from_env()?;
        let smtp = SmtpConfig::from_env()?;
        let jobs = JobsConfig::from_env()?;
        let session_ttl_hours = get_env_or_default("SESSION_TTL_HOURS", "720")
            .parse::<i64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SESSION_TTL_HOURS".to_string(), e.to_string())
            })?;
        let alerts_scan_secs = get_env_or_default("ALERTS_SCAN_SECS", "21600")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ALERTS_SCAN_SECS".to_string(), e.to_string())
            })?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            redis_url,
            host,
            port,
            admin_token,
            ebay,
            rates,
            smtp,
            jobs,
            session_ttl_hours,
            alerts_scan_secs,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Returns a reference to the eBay configuration (if configured).
    ///
    /// Returns `None` when eBay variables are not set, which puts the
    /// repricer and messaging services in local-only mode.
    #[must_use]
    pub const fn ebay(&self) -> Option<&EbayConfig> {
        self.ebay.as_ref()
    }

    /// Returns a reference to the SMTP configuration (if configured).
    #[must_use]
    pub const fn smtp(&self) -> Option<&SmtpConfig> {
        self.smtp.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., RAKUDA_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL (set by Fly.io postgres attach)
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a configured base URL is absolute http(s) with a host.
///
/// Catches the classic `RATES_BASE_URL=api.exchangerate.host` mistake at
/// boot instead of as a request error hours later.
fn validate_base_url(var_name: &str, value: String) -> Result<String, ConfigError> {
    let parsed = Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("scheme must be http or https, got {}", parsed.scheme()),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "URL must have a host".to_string(),
        ));
    }

    Ok(value)
}

/// Validate that a bearer token meets minimum length requirements.
fn validate_token_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_TOKEN_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rakuda_core::Currency;

    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_base_url_accepts_https() {
        let result = validate_base_url("TEST_URL", "https://api.exchangerate.host".to_string());
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_base_url_rejects_bare_host() {
        // No scheme means no base to resolve against
        let result = validate_base_url("TEST_URL", "api.exchangerate.host".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_base_url_rejects_non_http_scheme() {
        let result = validate_base_url("TEST_URL", "ftp://api.exchangerate.host".to_string());
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_validate_token_length_too_short() {
        let secret = SecretString::from("short");
        let result = validate_token_length(&secret, "TEST_TOKEN");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_token_length_valid() {
        let secret = SecretString::from("a".repeat(32));
        let result = validate_token_length(&secret, "TEST_TOKEN");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            database_url: SecretString::from("postgres://localhost/test"),
            redis_url: SecretString::from("redis://127.0.0.1:6379"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8080,
            admin_token: SecretString::from("x".repeat(32)),
            ebay: None,
            rates: RatesConfig {
                base_url: DEFAULT_RATES_BASE_URL.to_string(),
                api_key: None,
                pairs: vec![CurrencyPair::new(Currency::USD, Currency::JPY)],
                refresh_secs: 3600,
            },
            smtp: None,
            jobs: JobsConfig {
                max_attempts: 3,
                backoff_base_secs: 30,
                poll_secs: 5,
            },
            session_ttl_hours: 720,
            alerts_scan_secs: 21_600,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_ebay_config_debug_redacts_secrets() {
        let config = EbayConfig {
            api_base: DEFAULT_EBAY_API_BASE.to_string(),
            client_id: "test_client_id".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
        };

        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("test_client_id"));
        assert!(debug_output.contains(DEFAULT_EBAY_API_BASE));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
    }

    #[test]
    fn test_smtp_config_debug_redacts_secrets() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "ops@example.com".to_string(),
            password: SecretString::from("super_secret_smtp_password"),
            from_address: "noreply@example.com".to_string(),
            alerts_to: "ops@example.com".to_string(),
        };

        let debug_output = format!("{config:?}");

        // Public fields should be visible
        assert!(debug_output.contains("smtp.example.com"));
        assert!(debug_output.contains("587"));
        assert!(debug_output.contains("noreply@example.com"));

        // Secret fields should be redacted
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_rates_config_debug_redacts_api_key() {
        let config = RatesConfig {
            base_url: DEFAULT_RATES_BASE_URL.to_string(),
            api_key: Some(SecretString::from("rates_api_key_value")),
            pairs: vec![CurrencyPair::new(Currency::USD, Currency::JPY)],
            refresh_secs: 3600,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("rates_api_key_value"));
    }
}
