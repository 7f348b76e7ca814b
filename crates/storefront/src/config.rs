//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITRINE_API_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `VITRINE_API_TOKEN` - Bearer token for `/customer/*` and `/orders` (high entropy)
//! - `VITRINE_DATA_DIR` - Durable storage directory (default: .vitrine)
//! - `VITRINE_ADD_DEBOUNCE_MS` - Add-to-cart guard window (default: 500)
//! - `VITRINE_REDIRECT_SECONDS` - Confirmation countdown ticks (default: 8)
//! - `VITRINE_CATALOG_CACHE_SECS` - Product cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Shortest API token accepted. Backend-issued tokens are 32+ characters.
const MIN_TOKEN_CHARS: usize = 20;

/// Tokens below this many bits of entropy per character are typed, not issued.
const MIN_TOKEN_ENTROPY: f64 = 3.0;

/// Fragments that only show up in copied `.env` templates (case-insensitive).
const TEMPLATE_MARKERS: &[&str] = &[
    "<", ">", "{{", "your-token", "your_token", "token-here", "token_here", "changeme",
    "placeholder", "xxxx",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Unusable API token in {0}: {1}")]
    InvalidToken(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Directory holding the persisted cart and last order
    pub data_dir: PathBuf,
    /// Window during which repeated add-to-cart requests are dropped
    pub add_debounce: Duration,
    /// Ticks of the confirmation countdown
    pub redirect_ticks: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of error events sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Backend API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against
    pub base_url: Url,
    /// Bearer token for customer and order endpoints
    pub token: Option<SecretString>,
    /// Time-to-live of cached catalog reads
    pub catalog_cache_ttl: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("catalog_cache_ttl", &self.catalog_cache_ttl)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token is malformed or looks like a template value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("VITRINE_DATA_DIR", ".vitrine"));
        let add_debounce =
            Duration::from_millis(get_parsed_or_default("VITRINE_ADD_DEBOUNCE_MS", 500)?);
        let redirect_ticks = get_parsed_or_default("VITRINE_REDIRECT_SECONDS", 8)?;

        Ok(Self {
            api,
            data_dir,
            add_debounce,
            redirect_ticks,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_required_env("VITRINE_API_URL")?;
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("VITRINE_API_URL".to_string(), e))?;

        let token = match get_optional_env("VITRINE_API_TOKEN") {
            Some(value) => {
                check_api_token(&value).map_err(|reason| {
                    ConfigError::InvalidToken("VITRINE_API_TOKEN".to_string(), reason)
                })?;
                Some(SecretString::from(value))
            }
            None => None,
        };

        let catalog_cache_ttl =
            Duration::from_secs(get_parsed_or_default("VITRINE_CATALOG_CACHE_SECS", 300)?);

        Ok(Self {
            base_url,
            token,
            catalog_cache_ttl,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional environment variable, falling back to `default`.
fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate in `0.0..=1.0`.
fn get_sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate = get_parsed_or_default(key, default)?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ))
    }
}

/// Accept only absolute http(s) URLs.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(format!("expected an http(s) URL with a host (got scheme '{scheme}')")),
    }
}

/// Shannon entropy of `token` in bits per character.
fn token_entropy(token: &str) -> f64 {
    let mut chars: Vec<char> = token.chars().collect();
    chars.sort_unstable();

    #[allow(clippy::cast_precision_loss)] // tokens are short
    let total = chars.len() as f64;
    chars
        .chunk_by(|a, b| a == b)
        .map(|run| {
            #[allow(clippy::cast_precision_loss)]
            let p = run.len() as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Check that a bearer token can be sent as-is and was issued by the
/// backend rather than left over from an `.env` template.
fn check_api_token(token: &str) -> Result<(), String> {
    if token.get(..7).is_some_and(|p| p.eq_ignore_ascii_case("bearer ")) {
        return Err("omit the 'Bearer ' prefix, it is added automatically".to_string());
    }
    if let Some(c) = token.chars().find(|c| !c.is_ascii_graphic()) {
        return Err(format!("contains {c:?}, which is not allowed in a header"));
    }

    let lower = token.to_ascii_lowercase();
    if let Some(marker) = TEMPLATE_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(format!("looks like a template value (contains '{marker}')"));
    }

    if token.len() < MIN_TOKEN_CHARS {
        return Err(format!(
            "too short ({} characters, need at least {MIN_TOKEN_CHARS})",
            token.len()
        ));
    }

    let entropy = token_entropy(token);
    if entropy < MIN_TOKEN_ENTROPY {
        return Err(format!(
            "too repetitive ({entropy:.2} bits/char, need {MIN_TOKEN_ENTROPY:.1}); copy the token issued by the backend"
        ));
    }
    Ok(())
}
