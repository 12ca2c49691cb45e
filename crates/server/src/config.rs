//! Server configuration.

use std::path::PathBuf;

use pipeline::{ModelMode, Result};

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the model, metadata and metrics files
    pub artifacts_dir: PathBuf,
    /// Which trained pipeline to serve
    pub mode: ModelMode,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Emit JSON log lines
    pub json_logs: bool,
    /// Bearer token for the admin routes; admin routes are not mounted without one
    pub admin_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            artifacts_dir: PathBuf::from("artifacts"),
            mode: ModelMode::Regression,
            cors_origins: vec!["*".to_string()],
            json_logs: false,
            admin_token: None,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let mode = match lookup("MOVIEMODEL_MODE") {
            Some(value) => value.parse()?,
            None => defaults.mode,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            artifacts_dir: lookup("MOVIEMODEL_ARTIFACTS")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifacts_dir),
            mode,
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            admin_token: lookup("MOVIEMODEL_ADMIN_TOKEN")
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        })
    }

    /// Address to bind, `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
