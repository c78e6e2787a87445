//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Backend services (optional; a missing URL disables the feature that uses it)
//! - `PRODUCTS_API_URL` - Products service base URL
//! - `STORES_API_URL` - Stores service base URL
//! - `USERS_API_URL` - Users service base URL (criticisms)
//! - `MONITORING_API_URL` - Monitoring service base URL (metrics, price history)
//! - `AI_API_URL` - AI agents service base URL (catalog intake, suggestions)
//! - `HEALTHCHECK_API_URL` - Health-check aggregator base URL
//!
//! ## Identity
//! - `FIREBASE_API_KEY` - Web API key for the identity provider
//! - `IDENTITY_TOOLKIT_URL` - Identity Toolkit endpoint (default: Google)
//! - `SECURE_TOKEN_URL` - Secure Token endpoint (default: Google)
//!
//! ## Behaviour
//! - `INTAKE_POLL_INTERVAL_MS` - Task status polling period (default: 3000)
//! - `INTAKE_MAX_IMAGE_BYTES` - Largest accepted intake photo upload (default: 20 MiB)
//! - `SIGN_OUT_POLICY` - `keep-on-failure` (default) or `force-local`
//! - `HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 30)
//!
//! ## Server
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::error::ConsoleError;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";
const DEFAULT_POLL_INTERVAL_MS: &str = "3000";
const DEFAULT_MAX_IMAGE_BYTES: &str = "20971520";
const DEFAULT_HTTP_TIMEOUT_SECS: &str = "30";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Console configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Backend service base URLs
    pub services: ServiceUrls,
    /// Identity provider settings
    pub identity: IdentityConfig,
    /// Catalog intake settings
    pub intake: IntakeConfig,
    /// What to do locally when the provider's sign-out fails
    pub sign_out_policy: SignOutPolicy,
    /// Timeout for every outbound HTTP request
    pub http_timeout: Duration,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
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

/// The backend services the console talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Products,
    Stores,
    Users,
    Monitoring,
    Agents,
    Healthcheck,
}

impl Service {
    /// Environment variable holding this service's base URL.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::Products => "PRODUCTS_API_URL",
            Self::Stores => "STORES_API_URL",
            Self::Users => "USERS_API_URL",
            Self::Monitoring => "MONITORING_API_URL",
            Self::Agents => "AI_API_URL",
            Self::Healthcheck => "HEALTHCHECK_API_URL",
        }
    }

    /// Operator-facing service name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Products => "Produtos",
            Self::Stores => "Lojas",
            Self::Users => "Usuários",
            Self::Monitoring => "Monitoramento",
            Self::Agents => "Agentes de IA",
            Self::Healthcheck => "Healthcheck",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base URLs of the backend services. Every entry is optional.
#[derive(Debug, Clone, Default)]
pub struct ServiceUrls {
    urls: HashMap<Service, Url>,
}

impl ServiceUrls {
    const ALL: [Service; 6] = [
        Service::Products,
        Service::Stores,
        Service::Users,
        Service::Monitoring,
        Service::Agents,
        Service::Healthcheck,
    ];

    /// Set or replace the base URL for `service`.
    #[must_use]
    pub fn with(mut self, service: Service, url: Url) -> Self {
        self.urls.insert(service, url);
        self
    }

    /// The configured base URL, if any.
    #[must_use]
    pub fn get(&self, service: Service) -> Option<&Url> {
        self.urls.get(&service)
    }

    /// The configured base URL or a `ConfigurationMissing` error.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::ConfigurationMissing`] when the URL is unset.
    pub fn require(&self, service: Service) -> Result<&Url, ConsoleError> {
        self.get(service)
            .ok_or_else(|| ConsoleError::missing_service(service))
    }

    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let mut urls = HashMap::new();
        for service in Self::ALL {
            if let Some(url) = env.url(service.env_var())? {
                urls.insert(service, url);
            }
        }
        Ok(Self { urls })
    }
}

/// Identity provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Web API key; `None` leaves the console without sign-in
    pub api_key: Option<SecretString>,
    /// Identity Toolkit base URL (`accounts:*` endpoints)
    pub identity_toolkit_url: Url,
    /// Secure Token base URL (token refresh)
    pub secure_token_url: Url,
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("identity_toolkit_url", &self.identity_toolkit_url.as_str())
            .field("secure_token_url", &self.secure_token_url.as_str())
            .finish()
    }
}

impl IdentityConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let api_key = env.optional("FIREBASE_API_KEY").map(|key| {
            if let Err(e) = validate_secret_strength(&key, "FIREBASE_API_KEY") {
                tracing::warn!("FIREBASE_API_KEY validation warning: {e}");
            }
            SecretString::from(key)
        });

        Ok(Self {
            api_key,
            identity_toolkit_url: env.url_or_default(
                "IDENTITY_TOOLKIT_URL",
                DEFAULT_IDENTITY_TOOLKIT_URL,
            )?,
            secure_token_url: env.url_or_default("SECURE_TOKEN_URL", DEFAULT_SECURE_TOKEN_URL)?,
        })
    }
}

/// Catalog intake settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeConfig {
    /// Delay between the end of one status poll and the start of the next
    pub poll_interval: Duration,
    /// Request body limit for the photo upload route
    pub max_image_bytes: usize,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_image_bytes: 20 * 1024 * 1024,
        }
    }
}

/// Local behaviour when the identity provider fails to sign out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutPolicy {
    /// Leave the session as the provider reports it.
    #[default]
    KeepOnFailure,
    /// Clear the local session regardless of the provider's answer.
    ForceLocal,
}

impl FromStr for SignOutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-on-failure" | "keep" => Ok(Self::KeepOnFailure),
            "force-local" | "force" => Ok(Self::ForceLocal),
            other => Err(format!(
                "expected 'keep-on-failure' or 'force-local', got '{other}'"
            )),
        }
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

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env(env: &Env<'_>) -> Result<Option<Self>, ConfigError> {
        let cert_pem = env.optional("ADMIN_TLS_CERT");
        let key_pem = env.optional("ADMIN_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but unparseable, or if
    /// only half of the TLS pair is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AdminConfig::from_env`].
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let host = env.parse::<IpAddr>("ADMIN_HOST", "127.0.0.1")?;
        let port = env.parse::<u16>("ADMIN_PORT", "3001")?;
        let services = ServiceUrls::from_env(&env)?;
        let identity = IdentityConfig::from_env(&env)?;
        let poll_ms = env.parse::<u64>("INTAKE_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "INTAKE_POLL_INTERVAL_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let max_image_bytes =
            env.parse::<usize>("INTAKE_MAX_IMAGE_BYTES", DEFAULT_MAX_IMAGE_BYTES)?;
        let sign_out_policy = env.parse::<SignOutPolicy>("SIGN_OUT_POLICY", "keep-on-failure")?;
        let timeout_secs = env.parse::<u64>("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let json_logs = env
            .optional("LOG_FORMAT")
            .is_some_and(|f| f.eq_ignore_ascii_case("json"));
        let sentry_dsn = env.optional("SENTRY_DSN");
        let sentry_environment = env.optional("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env(&env)?;

        Ok(Self {
            host,
            port,
            services,
            identity,
            intake: IntakeConfig {
                poll_interval: Duration::from_millis(poll_ms),
                max_image_bytes,
            },
            sign_out_policy,
            http_timeout: Duration::from_secs(timeout_secs),
            json_logs,
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

    /// Build the shared outbound HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.http_timeout).build()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup used while loading.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    fn url(&self, key: &str) -> Result<Option<Url>, ConfigError> {
        self.optional(key)
            .map(|raw| parse_base_url(key, &raw))
            .transpose()
    }

    fn url_or_default(&self, key: &str, default: &str) -> Result<Url, ConfigError> {
        parse_base_url(key, &self.or_default(key, default))
    }
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
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

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
