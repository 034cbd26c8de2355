//! Server configuration loaded from the environment.
//!
//! Every setting has a default, so an empty environment yields a working
//! local configuration:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `LUMEN_HOST` | `127.0.0.1` |
//! | `LUMEN_PORT` | `5000` |
//! | `LUMEN_DEFAULT_MODEL` | `qwen2.5vl:7b` |
//! | `LUMEN_SKIP_STARTUP_LOAD` | `false` |
//! | `LUMEN_BACKEND_URL` | `http://localhost:11434` |
//! | `LUMEN_BACKEND_TIMEOUT_SECS` | `600` |
//! | `LUMEN_DEVICE_MAP` | `auto` |
//! | `LUMEN_MAX_UPLOAD_BYTES` | `52428800` (50 MB) |
//! | `LUMEN_UPLOAD_DIR` | OS temp directory |
//!
//! # Example
//!
//! ```rust
//! use lumen_config::ServerConfig;
//!
//! let config = ServerConfig::from_lookup(|_| None).unwrap();
//! assert_eq!(config.port, 5000);
//! assert_eq!(config.bind_addr(), "127.0.0.1:5000");
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lumen_core::DevicePlacement;

/// Model loaded at startup when none is configured.
pub const DEFAULT_MODEL_ID: &str = "qwen2.5vl:7b";

/// Request body ceiling for uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors that can occur when reading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value for {var}: '{value}' ({message})")]
    Invalid {
        var: &'static str,
        value: String,
        message: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Runtime configuration for the server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Model id loaded implicitly at startup.
    pub default_model: String,
    /// Start with an empty slot instead of loading `default_model`.
    pub skip_startup_load: bool,
    /// Base URL of the Ollama-compatible model server.
    pub backend_url: String,
    pub backend_timeout: Duration,
    pub device_placement: DevicePlacement,
    pub max_upload_bytes: usize,
    /// Directory where uploaded images are staged during inference.
    pub upload_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            default_model: DEFAULT_MODEL_ID.into(),
            skip_startup_load: false,
            backend_url: "http://localhost:11434".into(),
            backend_timeout: Duration::from_secs(600),
            device_placement: DevicePlacement::Auto,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_dir: std::env::temp_dir(),
        }
    }
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset or blank variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let device_placement = match get("LUMEN_DEVICE_MAP") {
            Some(raw) => raw
                .parse::<DevicePlacement>()
                .map_err(|e| ConfigError::invalid("LUMEN_DEVICE_MAP", &raw, e))?,
            None => defaults.device_placement,
        };

        let backend_timeout = parse_or("LUMEN_BACKEND_TIMEOUT_SECS", get("LUMEN_BACKEND_TIMEOUT_SECS"), 600u64)?;

        Ok(Self {
            host: get("LUMEN_HOST").unwrap_or(defaults.host),
            port: parse_or("LUMEN_PORT", get("LUMEN_PORT"), defaults.port)?,
            default_model: get("LUMEN_DEFAULT_MODEL")
                .map(|m| m.trim().to_string())
                .unwrap_or(defaults.default_model),
            skip_startup_load: match get("LUMEN_SKIP_STARTUP_LOAD") {
                Some(raw) => parse_flag("LUMEN_SKIP_STARTUP_LOAD", &raw)?,
                None => defaults.skip_startup_load,
            },
            backend_url: get("LUMEN_BACKEND_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.backend_url),
            backend_timeout: Duration::from_secs(backend_timeout),
            device_placement,
            max_upload_bytes: parse_or("LUMEN_MAX_UPLOAD_BYTES", get("LUMEN_MAX_UPLOAD_BYTES"), defaults.max_upload_bytes)?,
            upload_dir: get("LUMEN_UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
        })
    }

    /// Address to bind, as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(var, raw, "expected a boolean")),
    }
}
