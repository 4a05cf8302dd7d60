//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Project URL of the hosted backend (e.g. `https://abc.supabase.co`)
//! - `SUPABASE_ANON_KEY` - Public anon key used for REST and auth calls
//!
//! ## Optional
//! - `ASAAS_API_KEY` - Billing provider API key
//! - `ASAAS_SANDBOX` - `true` to target the billing sandbox (default: false)
//! - `META_APP_ID` - Advertising app ID (requires `META_APP_SECRET`)
//! - `META_APP_SECRET` - Advertising app secret (requires `META_APP_ID`)
//! - `META_API_VERSION` - Graph API version (default: v18.0)
//! - `DASHBOARD_LOG_FORMAT` - `text` or `json` (default: text)
//! - `RUST_LOG` - Standard `tracing` filter directives

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_META_API_VERSION: &str = "v18.0";
const BILLING_PRODUCTION_URL: &str = "https://api.asaas.com/v3";
const BILLING_SANDBOX_URL: &str = "https://sandbox.asaas.com/api/v3";
const META_GRAPH_URL: &str = "https://graph.facebook.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Hosted backend connection settings.
    pub backend: BackendConfig,
    /// Billing provider settings.
    pub billing: BillingConfig,
    /// Advertising provider settings (optional).
    pub ads: Option<AdsConfig>,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Hosted backend (REST + auth) configuration.
///
/// Implements `Debug` manually to redact the anon key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project base URL.
    pub url: Url,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl BackendConfig {
    /// Base URL of the table REST endpoint.
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url.as_str().trim_end_matches('/'))
    }

    /// Base URL of the auth endpoint.
    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url.as_str().trim_end_matches('/'))
    }
}

/// Billing provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone, Default)]
pub struct BillingConfig {
    /// API key; absent while the provider is mocked.
    pub api_key: Option<SecretString>,
    /// Use the sandbox environment.
    pub sandbox: bool,
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl BillingConfig {
    /// Provider base URL for the selected environment.
    #[must_use]
    pub const fn base_url(&self) -> &'static str {
        if self.sandbox {
            BILLING_SANDBOX_URL
        } else {
            BILLING_PRODUCTION_URL
        }
    }
}

/// Advertising provider configuration.
///
/// Implements `Debug` manually to redact the app secret.
#[derive(Clone)]
pub struct AdsConfig {
    /// App ID.
    pub app_id: String,
    /// App secret.
    pub app_secret: SecretString,
    /// Graph API version, e.g. `v18.0`.
    pub api_version: String,
}

impl std::fmt::Debug for AdsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdsConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AdsConfig {
    /// Versioned Graph API base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{META_GRAPH_URL}/{}", self.api_version)
    }

    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let app_id = env("META_APP_ID");
        let app_secret = env("META_APP_SECRET");

        match (app_id, app_secret) {
            (Some(app_id), Some(secret)) => {
                validate_secret_strength(&secret, "META_APP_SECRET")?;
                Ok(Some(Self {
                    app_id,
                    app_secret: SecretString::from(secret),
                    api_version: env("META_API_VERSION")
                        .unwrap_or_else(|| DEFAULT_META_API_VERSION.to_string()),
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "META_*".to_string(),
                "Both META_APP_ID and META_APP_SECRET must be set together".to_string(),
            )),
        }
    }
}

impl BillingConfig {
    fn from_lookup(env: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = env("ASAAS_API_KEY")
            .map(|key| {
                validate_secret_strength(&key, "ASAAS_API_KEY")?;
                Ok(SecretString::from(key))
            })
            .transpose()?;
        let sandbox = env("ASAAS_SANDBOX")
            .map(|raw| parse_bool("ASAAS_SANDBOX", &raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self { api_key, sandbox })
    }
}

impl DashboardConfig {
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`DashboardConfig::from_env`].
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = required(&env, "SUPABASE_URL")?;
        let url = Url::parse(&url)
            .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "SUPABASE_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        let anon_key = required(&env, "SUPABASE_ANON_KEY")?;
        validate_secret_strength(&anon_key, "SUPABASE_ANON_KEY")?;

        let log_format = env("DASHBOARD_LOG_FORMAT")
            .map(|raw| {
                raw.parse()
                    .map_err(|e| ConfigError::InvalidEnvVar("DASHBOARD_LOG_FORMAT".to_string(), e))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            backend: BackendConfig {
                url,
                anon_key: SecretString::from(anon_key),
            },
            billing: BillingConfig::from_lookup(&env)?,
            ads: AdsConfig::from_lookup(&env)?,
            log_format,
        })
    }

    /// Load configuration from an in-memory map of variables.
    ///
    /// # Errors
    ///
    /// Same as [`DashboardConfig::from_env`].
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Returns the advertising configuration, if available.
    #[must_use]
    pub const fn ads(&self) -> Option<&AdsConfig> {
        self.ads.as_ref()
    }

    /// Whether a real billing key is configured.
    #[must_use]
    pub fn has_billing_key(&self) -> bool {
        self.billing
            .api_key
            .as_ref()
            .is_some_and(|key| !key.expose_secret().is_empty())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn required(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ANON_KEY: &str = "eyJhbGciOiJIUzI1NiJ9.eyJyb2xlIjoiYW5vbiJ9.Qm9GxR2k7";

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn minimal() -> HashMap<String, String> {
        vars(&[
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_ANON_KEY", ANON_KEY),
        ])
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = DashboardConfig::from_map(&minimal()).unwrap();
        assert_eq!(config.backend.rest_url(), "https://abc.supabase.co/rest/v1");
        assert_eq!(config.backend.auth_url(), "https://abc.supabase.co/auth/v1");
        assert!(!config.billing.sandbox);
        assert_eq!(config.billing.base_url(), "https://api.asaas.com/v3");
        assert!(!config.has_billing_key());
        assert!(config.ads().is_none());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_missing_url() {
        let mut env = minimal();
        env.remove("SUPABASE_URL");
        let err = DashboardConfig::from_map(&env).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SUPABASE_URL"));
    }

    #[test]
    fn test_rejects_placeholder_anon_key() {
        let mut env = minimal();
        env.insert("SUPABASE_ANON_KEY".into(), "your-anon-key".into());
        let err = DashboardConfig::from_map(&env).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut env = minimal();
        env.insert("SUPABASE_URL".into(), "ftp://abc.supabase.co".into());
        assert!(matches!(
            DashboardConfig::from_map(&env),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_sandbox_billing() {
        let mut env = minimal();
        env.insert("ASAAS_SANDBOX".into(), "true".into());
        let config = DashboardConfig::from_map(&env).unwrap();
        assert_eq!(config.billing.base_url(), "https://sandbox.asaas.com/api/v3");

        env.insert("ASAAS_SANDBOX".into(), "maybe".into());
        assert!(DashboardConfig::from_map(&env).is_err());
    }

    #[test]
    fn test_ads_requires_both_vars() {
        let mut env = minimal();
        env.insert("META_APP_ID".into(), "1234567890".into());
        assert!(matches!(
            DashboardConfig::from_map(&env),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));

        env.insert("META_APP_SECRET".into(), "f3A9kQ2mZ7xR1pL8".into());
        let config = DashboardConfig::from_map(&env).unwrap();
        let ads = config.ads().unwrap();
        assert_eq!(ads.api_version, "v18.0");
        assert_eq!(ads.base_url(), "https://graph.facebook.com/v18.0");
    }

    #[test]
    fn test_log_format() {
        let mut env = minimal();
        env.insert("DASHBOARD_LOG_FORMAT".into(), "JSON".into());
        assert_eq!(
            DashboardConfig::from_map(&env).unwrap().log_format,
            LogFormat::Json
        );
        env.insert("DASHBOARD_LOG_FORMAT".into(), "xml".into());
        assert!(DashboardConfig::from_map(&env).is_err());
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut env = minimal();
        env.insert("ASAAS_API_KEY".into(), "aact_9Zq2LmX7pR4tV1wK".into());
        env.insert("META_APP_ID".into(), "1234567890".into());
        env.insert("META_APP_SECRET".into(), "f3A9kQ2mZ7xR1pL8".into());
        let config = DashboardConfig::from_map(&env).unwrap();
        assert!(config.has_billing_key());

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("abc.supabase.co"));
        assert!(debug_output.contains("1234567890"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(ANON_KEY));
        assert!(!debug_output.contains("aact_9Zq2LmX7pR4tV1wK"));
        assert!(!debug_output.contains("f3A9kQ2mZ7xR1pL8"));
    }
}
