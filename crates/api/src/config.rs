use pyexec_core::error::CoreError;
use pyexec_core::scripting::sandbox::SandboxConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Sandbox runner settings (see [`SandboxConfig::from_env`]).
    pub sandbox: SandboxConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default   |
    /// |------------------------|-----------|
    /// | `HOST`                 | `0.0.0.0` |
    /// | `PORT`                 | `8080`    |
    /// | `CORS_ORIGINS`         | (none)    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`      |
    pub fn from_env() -> Result<Self, CoreError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .map_err(|_| CoreError::Config("PORT must be a valid u16".into()))?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .map_err(|_| CoreError::Config("REQUEST_TIMEOUT_SECS must be a valid u64".into()))?;

        let sandbox = SandboxConfig::from_env()?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            sandbox,
        })
    }

    /// Reject combinations that would misbehave at request time.
    ///
    /// The HTTP timeout must outlast the execution timeout, otherwise the
    /// middleware would cut off every slow script with its own 408 before
    /// the sandbox result could be reported.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.sandbox.validate()?;

        if self.request_timeout_secs <= self.sandbox.timeout.as_secs() {
            return Err(CoreError::Config(format!(
                "REQUEST_TIMEOUT_SECS ({}) must exceed EXEC_TIMEOUT_SECS ({})",
                self.request_timeout_secs,
                self.sandbox.timeout.as_secs()
            )));
        }
        Ok(())
    }
}
