use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{engine, server};
use crate::engine::types::{InvokerConfig, Transport};
use crate::error::GatewayError;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// How the canonical payload reaches the engine process
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Env,
    #[default]
    Stdin,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_command")]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub transport: TransportKind,
    #[serde(default = "default_env_var")]
    pub env_var: String,
    /// Maximum engine processes running at once (0 = unbounded)
    #[serde(default)]
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_engine_command(),
            args: Vec::new(),
            working_dir: None,
            timeout_secs: default_timeout_secs(),
            transport: TransportKind::default(),
            env_var: default_env_var(),
            max_concurrent: 0,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn invoker_config(&self) -> InvokerConfig {
        let transport = match self.transport {
            TransportKind::Env => Transport::EnvVariable(self.env_var.clone()),
            TransportKind::Stdin => Transport::StdinPipe,
        };
        InvokerConfig {
            command: PathBuf::from(&self.command),
            args: self.args.clone(),
            working_dir: self.working_dir.clone(),
            timeout: self.timeout(),
            transport,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

fn default_host() -> String {
    server::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    server::DEFAULT_PORT
}

fn default_max_body_bytes() -> usize {
    server::DEFAULT_MAX_BODY_BYTES
}

fn default_max_upload_bytes() -> usize {
    server::DEFAULT_MAX_UPLOAD_BYTES
}

fn default_engine_command() -> String {
    "analysis-engine".to_string()
}

fn default_timeout_secs() -> u64 {
    engine::DEFAULT_TIMEOUT_SECS
}

fn default_env_var() -> String {
    engine::DEFAULT_ENV_VAR.to_string()
}

impl AppConfig {
    /// Load `config.yaml` (or `$GATEWAY_CONFIG`), then apply environment overrides.
    ///
    /// A missing file is not an error: every field has a default.
    pub fn load() -> Result<Self, GatewayError> {
        let path = std::env::var("GATEWAY_CONFIG")
            .unwrap_or_else(|_| server::DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            tracing::warn!("⚠️ Config file {} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, GatewayError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Override selected fields from the environment. `lookup` is injected so
    /// tests don't have to mutate process-wide state.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| GatewayError::Config(format!("PORT must be a valid number, got '{}'", port)))?;
        }
        if let Some(command) = lookup("ENGINE_COMMAND") {
            self.engine.command = command;
        }
        if let Some(secs) = lookup("ENGINE_TIMEOUT_SECS") {
            self.engine.timeout_secs = secs.parse().map_err(|_| {
                GatewayError::Config(format!("ENGINE_TIMEOUT_SECS must be a number, got '{}'", secs))
            })?;
        }
        if let Some(transport) = lookup("ENGINE_TRANSPORT") {
            self.engine.transport = match transport.to_lowercase().as_str() {
                "env" => TransportKind::Env,
                "stdin" => TransportKind::Stdin,
                other => {
                    return Err(GatewayError::Config(format!(
                        "Unknown ENGINE_TRANSPORT='{}' (expected env|stdin)",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.engine.command.trim().is_empty() {
            return Err("engine.command must not be empty".into());
        }
        if self.engine.timeout_secs == 0 {
            return Err("engine.timeout_secs must be greater than zero".into());
        }
        if self.engine.transport == TransportKind::Env && self.engine.env_var.trim().is_empty() {
            return Err("engine.env_var must be set when transport is 'env'".into());
        }
        if self.server.max_body_bytes == 0 || self.upload.max_upload_bytes == 0 {
            return Err("body and upload limits must be greater than zero".into());
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
