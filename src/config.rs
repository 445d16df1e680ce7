//! Configuration loading and secret resolution.
//!
//! `khata.toml` holds everything non-secret. Secrets are never written to
//! the config file: the file names the environment variable each secret
//! lives in, and [`Secrets::from_env`] resolves them once at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Webhook HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Postgres connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Language-model oracle settings.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// WhatsApp Cloud API settings.
    pub whatsapp: WhatsAppConfig,
}

/// Webhook HTTP server settings.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. "0.0.0.0:3000".
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Postgres connection settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL.
    #[serde(default = "default_database_url_env")]
    pub url_env: String,

    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection before failing.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: default_database_url_env(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

/// Language-model oracle settings.
#[derive(Debug, Deserialize)]
pub struct OracleConfig {
    /// Model identifier, e.g. "gemini-1.5-flash-latest".
    #[serde(default = "default_oracle_model")]
    pub model: String,

    /// API base URL (overridable for testing).
    #[serde(default = "default_oracle_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_oracle_key_env")]
    pub api_key_env: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds. An oracle call that exceeds this is
    /// a step failure, not a hang.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_oracle_model(),
            api_base: default_oracle_api_base(),
            api_key_env: default_oracle_key_env(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Deserialize)]
pub struct WhatsAppConfig {
    /// Business phone number id assigned by Meta.
    pub phone_number_id: String,

    /// API base URL (overridable for testing).
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// Environment variable holding the access token.
    #[serde(default = "default_whatsapp_token_env")]
    pub access_token_env: String,

    /// Environment variable holding the webhook verify token.
    #[serde(default = "default_verify_token_env")]
    pub verify_token_env: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds for outbound sends.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// Default value functions for serde

fn default_bind() -> String {
    "0.0.0.0:3000".to_owned()
}
fn default_database_url_env() -> String {
    "DATABASE_URL".to_owned()
}
fn default_max_connections() -> u32 {
    5
}
fn default_acquire_timeout_secs() -> u64 {
    5
}
fn default_oracle_model() -> String {
    "gemini-1.5-flash-latest".to_owned()
}
fn default_oracle_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_owned()
}
fn default_oracle_key_env() -> String {
    "GEMINI_API_KEY".to_owned()
}
fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_owned()
}
fn default_whatsapp_token_env() -> String {
    "WHATSAPP_TOKEN".to_owned()
}
fn default_verify_token_env() -> String {
    "WHATSAPP_VERIFY_TOKEN".to_owned()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}

/// Secrets resolved from the environment at startup.
///
/// Constructed once in `main` and passed by reference into component
/// constructors; no component reads the environment itself.
pub struct Secrets {
    /// Postgres connection URL.
    pub database_url: String,
    /// Oracle API key.
    pub oracle_api_key: String,
    /// WhatsApp Cloud API access token.
    pub whatsapp_token: String,
    /// Webhook verify token.
    pub verify_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets").finish_non_exhaustive()
    }
}

impl Secrets {
    /// Resolve all secrets from the environment variables named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing variable.
    pub fn from_env(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: require_env(&config.database.url_env)?,
            oracle_api_key: require_env(&config.oracle.api_key_env)?,
            whatsapp_token: require_env(&config.whatsapp.access_token_env)?,
            verify_token: require_env(&config.whatsapp.verify_token_env)?,
        })
    }
}

fn require_env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("environment variable {name} is not set"))
}

/// Load the configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.khata/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".khata"))
}
