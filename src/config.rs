/*!
 * Configuration types for the report gateway
 *
 * Connection parameters come from a TOML file and/or the process
 * environment and are passed explicitly into every operation.
 */

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Profile used when no `--server` is given
pub const DEFAULT_SERVER: &str = "default";

pub const ENV_URL: &str = "ODOO_URL";
pub const ENV_DATABASE: &str = "ODOO_DB";
pub const ENV_USERNAME: &str = "ODOO_USERNAME";
pub const ENV_PASSWORD: &str = "ODOO_PASSWORD";
pub const ENV_TIMEOUT: &str = "ODOO_TIMEOUT_SECS";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Directory for generated artifacts (None = `output/` next to the executable)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Shorthand for log_level = debug
    #[serde(default)]
    pub verbose: bool,

    /// Named Odoo servers
    #[serde(default)]
    pub servers: BTreeMap<String, ServerEntry>,
}

/// One `[servers.<name>]` table. Every field is optional here because the
/// environment may fill the gaps; `resolve` enforces completeness.
#[derive(Clone, Default, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub database: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ServerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerEntry")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|p| SecretString::new(p.into_boxed_str())))
}

/// Fully resolved connection parameters for one Odoo server
#[derive(Clone)]
pub struct ConnectionProfile {
    pub name: String,
    pub url: String,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ConnectionProfile {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into().trim_end_matches('/').to_string(),
            database: database.into(),
            username: username.into(),
            password: SecretString::new(password.into().into_boxed_str()),
            timeout: Duration::from_secs(default_timeout_secs()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl ServerEntry {
    /// Validate and turn this entry into a usable profile
    pub fn resolve(&self, name: &str) -> Result<ConnectionProfile> {
        let url = required(&self.url, name, "url", ENV_URL)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(GatewayError::Config(format!(
                "server '{}': url must start with http:// or https://, got '{}'",
                name, url
            )));
        }
        let database = required(&self.database, name, "database", ENV_DATABASE)?;
        let username = required(&self.username, name, "username", ENV_USERNAME)?;
        let password = match &self.password {
            Some(p) if !p.expose_secret().is_empty() => p.clone(),
            _ => return Err(missing(name, "password", ENV_PASSWORD)),
        };
        let timeout_secs = self.timeout_secs.unwrap_or_else(default_timeout_secs);
        if timeout_secs == 0 {
            return Err(GatewayError::Config(format!(
                "server '{}': timeout_secs must be greater than zero",
                name
            )));
        }

        Ok(ConnectionProfile {
            name: name.to_string(),
            url: url.trim_end_matches('/').to_string(),
            database,
            username,
            password,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.database.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.timeout_secs.is_none()
    }
}

fn required(value: &Option<String>, server: &str, field: &str, env: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(missing(server, field, env)),
    }
}

fn missing(server: &str, field: &str, env: &str) -> GatewayError {
    GatewayError::Config(format!(
        "server '{}' has no {} (set it in the config file or via {})",
        server, field, env
    ))
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
            .map_err(|e| GatewayError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load the file when one is given, otherwise start from defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Overlay `ODOO_*` variables from the process environment onto `server`
    pub fn apply_env(&mut self, server: &str) -> Result<()> {
        self.apply_env_from(server, |key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup` onto the named server. Set values win over
    /// the file; the profile is only created if at least one value is present.
    pub fn apply_env_from<F>(&mut self, server: &str, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut entry = self.servers.get(server).cloned().unwrap_or_default();
        if let Some(url) = get(ENV_URL) {
            entry.url = Some(url);
        }
        if let Some(db) = get(ENV_DATABASE) {
            entry.database = Some(db);
        }
        if let Some(user) = get(ENV_USERNAME) {
            entry.username = Some(user);
        }
        if let Some(pass) = get(ENV_PASSWORD) {
            entry.password = Some(SecretString::new(pass.into_boxed_str()));
        }
        if let Some(raw) = get(ENV_TIMEOUT) {
            let secs = raw.parse::<u64>().map_err(|_| {
                GatewayError::Config(format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT, raw))
            })?;
            entry.timeout_secs = Some(secs);
        }

        if !entry.is_empty() {
            self.servers.insert(server.to_string(), entry);
        }
        Ok(())
    }

    /// Resolve a named server into a connection profile
    pub fn profile(&self, name: &str) -> Result<ConnectionProfile> {
        let entry = self.servers.get(name).ok_or_else(|| {
            if self.servers.is_empty() {
                GatewayError::Config(format!(
                    "no Odoo server configured (pass --config or set {}, {}, {}, {})",
                    ENV_URL, ENV_DATABASE, ENV_USERNAME, ENV_PASSWORD
                ))
            } else {
                GatewayError::Config(format!(
                    "unknown server '{}' (configured: {})",
                    name,
                    self.server_names().join(", ")
                ))
            }
        })?;
        entry.resolve(name)
    }

    pub fn server_names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Effective tracing level
    pub fn effective_log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else {
            self.log_level.to_tracing_level()
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
