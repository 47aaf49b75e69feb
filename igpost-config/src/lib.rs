use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Pre-compiled regex for hostname validation (compiled once at first use)
static HOSTNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][-a-zA-Z0-9\.]*[a-zA-Z0-9]$").unwrap());

#[derive(Debug, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub logging: Option<LoggingSection>,
    #[serde(default)]
    pub gateway: Option<GatewaySection>,
    #[serde(default)]
    pub session: Option<SessionSection>,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GatewaySection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SessionSection {
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Load a RawConfigFile from a path. The format is inferred from the extension: .toml, .yaml/.yml, .json
pub fn load_raw_from_file<P: AsRef<Path>>(path: P) -> Result<RawConfigFile, ConfigError> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    parse_config_str(&s, ext.as_deref())
}

/// Parse configuration from a string with optional format hint
#[inline]
fn parse_config_str(s: &str, ext: Option<&str>) -> Result<RawConfigFile, ConfigError> {
    match ext {
        #[cfg(feature = "toml")]
        Some("toml") => toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        #[cfg(feature = "yaml")]
        Some("yaml" | "yml") => {
            serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        #[cfg(feature = "json")]
        Some("json") => serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => parse_config_auto(s),
    }
}

/// Try to parse config by attempting each enabled format
#[inline]
fn parse_config_auto(s: &str) -> Result<RawConfigFile, ConfigError> {
    #[cfg(feature = "yaml")]
    if let Ok(cfg) = serde_yaml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "toml")]
    if let Ok(cfg) = toml::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(feature = "json")]
    if let Ok(cfg) = serde_json::from_str(s) {
        return Ok(cfg);
    }

    #[cfg(any(feature = "yaml", feature = "toml", feature = "json"))]
    {
        Err(ConfigError::Parse(
            "failed to parse config as any supported format".into(),
        ))
    }

    #[cfg(not(any(feature = "yaml", feature = "toml", feature = "json")))]
    {
        let _ = s; // suppress unused warning
        Err(ConfigError::Parse("no config format enabled".into()))
    }
}

/// Concrete application configuration with defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionConfig {
    pub file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            gateway: GatewayConfig {
                base_url: "http://127.0.0.1:8100".to_string(),
                auth_token: None,
                timeout_secs: 300,
            },
            session: SessionConfig {
                file: PathBuf::from("session.json"),
            },
        }
    }
}

#[inline]
fn parse_bool(s: &str) -> Result<bool, ()> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(true),
        "0" | "false" | "no" | "n" => Ok(false),
        _ => Err(()),
    }
}

/// Helper macro to apply optional value if present
macro_rules! apply_opt {
    ($target:expr, $source:expr) => {
        if let Some(v) = $source {
            $target = v;
        }
    };
    ($target:expr, $source:expr, wrap) => {
        if let Some(v) = $source {
            $target = Some(v);
        }
    };
}

/// Load concrete `Config` from optional file and environment variables.
/// Environment variables take precedence over file values and defaults.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = path {
        let raw = load_raw_from_file(p)?;
        if let Some(server) = raw.server {
            apply_opt!(cfg.server.host, server.host);
            apply_opt!(cfg.server.port, server.port);
        }
        if let Some(logging) = raw.logging {
            apply_opt!(cfg.logging.level, logging.level);
            apply_opt!(cfg.logging.json, logging.json);
        }
        if let Some(gateway) = raw.gateway {
            apply_opt!(cfg.gateway.base_url, gateway.base_url);
            apply_opt!(cfg.gateway.auth_token, gateway.auth_token, wrap);
            apply_opt!(cfg.gateway.timeout_secs, gateway.timeout_secs);
        }
        if let Some(session) = raw.session {
            if let Some(file) = session.file {
                cfg.session.file = PathBuf::from(file);
            }
        }
    }

    // Apply environment variable overrides (env takes precedence)
    apply_env_overrides(&mut cfg)?;

    validate_config(&cfg)?;

    Ok(cfg)
}

/// Helper to parse env var as a specific type
#[inline]
fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Parse(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Helper to parse env var as bool
#[inline]
fn env_bool(key: &str) -> Result<Option<bool>, ConfigError> {
    match env::var(key) {
        Ok(v) => parse_bool(&v)
            .map(Some)
            .map_err(|_| ConfigError::Parse(format!("invalid {}", key))),
        Err(_) => Ok(None),
    }
}

/// Helper to get env var as string
#[inline]
fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Apply all environment variable overrides to config
fn apply_env_overrides(cfg: &mut Config) -> Result<(), ConfigError> {
    // Server
    if let Some(v) = env_str("IGPOST_HOST") {
        cfg.server.host = v;
    }
    if let Some(v) = env_parse::<u16>("IGPOST_PORT")? {
        cfg.server.port = v;
    }

    // Logging
    if let Some(v) = env_str("IGPOST_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    if let Some(v) = env_bool("IGPOST_LOG_JSON")? {
        cfg.logging.json = v;
    }

    // Gateway
    if let Some(v) = env_str("IGPOST_GATEWAY_URL") {
        cfg.gateway.base_url = v;
    }
    if let Some(v) = env_str("IGPOST_GATEWAY_TOKEN") {
        cfg.gateway.auth_token = Some(v);
    }
    if let Some(v) = env_parse::<u64>("IGPOST_GATEWAY_TIMEOUT_SECS")? {
        cfg.gateway.timeout_secs = v;
    }

    // Session file
    if let Some(v) = env_str("IGPOST_SESSION_FILE") {
        cfg.session.file = PathBuf::from(v);
    }

    Ok(())
}

/// Validate resolved configuration values.
fn validate_config(cfg: &Config) -> Result<(), ConfigError> {
    if !is_valid_host(&cfg.server.host) {
        return Err(ConfigError::Validation(format!(
            "invalid server host: {}",
            cfg.server.host
        )));
    }
    if cfg.gateway.base_url.is_empty() {
        return Err(ConfigError::Validation("gateway base_url is empty".into()));
    }
    if cfg.gateway.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "gateway timeout_secs must be at least 1".into(),
        ));
    }
    Ok(())
}

fn is_valid_host(host: &str) -> bool {
    if host.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    HOSTNAME_REGEX.is_match(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
        assert_eq!(cfg.session.file, PathBuf::from("session.json"));
        assert!(cfg.gateway.auth_token.is_none());
    }

    #[test]
    fn parse_toml() {
        let f = NamedTempFile::with_suffix(".toml").expect("tmpfile");
        std::fs::write(
            f.path(),
            r#"
[server]
host = "0.0.0.0"
port = 9000

[gateway]
base_url = "http://gateway:8100"
timeout_secs = 60

[session]
file = "/var/lib/igpost/session.json"
"#,
        )
        .unwrap();
        let cfg = load_config(Some(f.path())).expect("load");
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.gateway.base_url, "http://gateway:8100");
        assert_eq!(cfg.gateway.timeout_secs, 60);
        assert_eq!(
            cfg.session.file,
            PathBuf::from("/var/lib/igpost/session.json")
        );
    }

    #[test]
    fn parse_json() {
        let f = NamedTempFile::with_suffix(".json").expect("tmpfile");
        std::fs::write(
            f.path(),
            r#"{"logging": {"level": "debug", "json": true}}"#,
        )
        .unwrap();
        let cfg = load_config(Some(f.path())).expect("load");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
        // untouched sections keep their defaults
        assert_eq!(cfg.server.port, 8000);
    }

    #[test]
    fn invalid_host_rejected() {
        let f = NamedTempFile::with_suffix(".toml").expect("tmpfile");
        std::fs::write(f.path(), "[server]\nhost = \"not a host!\"\n").unwrap();
        let err = load_config(Some(f.path())).expect_err("validation");
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn env_overrides_take_precedence() {
        // Uses a variable no other test asserts on, since tests share the
        // process environment.
        let f = NamedTempFile::with_suffix(".toml").expect("tmpfile");
        std::fs::write(f.path(), "[gateway]\nbase_url = \"http://gw:8100\"\n").unwrap();
        std::env::set_var("IGPOST_GATEWAY_TOKEN", "gw-secret");
        let cfg = load_config(Some(f.path())).expect("load");
        std::env::remove_var("IGPOST_GATEWAY_TOKEN");
        assert_eq!(cfg.gateway.auth_token.as_deref(), Some("gw-secret"));
        assert_eq!(cfg.gateway.base_url, "http://gw:8100");
    }
}
