use vidgen_core::config::SettingsError;

/// HTTP server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local use.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body, uploads included.
    pub max_upload_bytes: usize,
    /// How long shutdown waits for in-flight generation runs.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `HOST`                  | `0.0.0.0`   |
    /// | `PORT`                  | `5001`      |
    /// | `CORS_ORIGINS`          | `*`         |
    /// | `MAX_UPLOAD_BYTES`      | `209715200` |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`        |
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &'static str, default: &str| -> Result<u64, SettingsError> {
            let raw = value(key, default);
            raw.parse().map_err(|e: std::num::ParseIntError| SettingsError {
                var: key,
                reason: e.to_string(),
                value: raw,
            })
        };

        let port = number("PORT", "5001")?;
        let port = u16::try_from(port).map_err(|_| SettingsError {
            var: "PORT",
            value: port.to_string(),
            reason: "port must be at most 65535".to_string(),
        })?;

        let cors_origins = value("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: value("HOST", "0.0.0.0"),
            port,
            cors_origins,
            max_upload_bytes: number("MAX_UPLOAD_BYTES", "209715200")? as usize,
            shutdown_timeout_secs: number("SHUTDOWN_TIMEOUT_SECS", "30")?,
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}
