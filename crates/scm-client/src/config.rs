//! Host connection configuration
//!
//! [`ScmConfig`] is deserialized from the service configuration; missing
//! fields fall back to sensible defaults. [`connect`] turns it into a ready
//! gateway.

use crate::client::ScmClient;
use crate::gitlab_client::GitLabClient;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default GitLab host
pub const DEFAULT_HOST: &str = "https://gitlab.com";

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV_VAR: &str = "GITLAB_TOKEN";

/// Supported source-control hosts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScmKind {
    #[default]
    GitLab,
}

/// Connection settings for the source-control host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmConfig {
    #[serde(default)]
    pub kind: ScmKind,

    /// Base URL of the host, without the `/api/v4` suffix
    #[serde(default = "default_host")]
    pub host: String,

    /// API token of the bot user; empty means "resolve from the environment"
    #[serde(default)]
    pub token: String,

    /// Shared webhook secret
    #[serde(default)]
    pub secret: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            kind: ScmKind::default(),
            host: default_host(),
            token: String::new(),
            secret: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ScmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Resolves the API token for the bot user
///
/// Tries, in order:
/// 1. the token from [`ScmConfig::token`]
/// 2. the `GITLAB_TOKEN` environment variable
#[derive(Debug, Clone, Default)]
pub struct TokenResolver {
    env_token: Option<String>,
}

impl TokenResolver {
    pub fn new() -> Self {
        Self {
            env_token: std::env::var(TOKEN_ENV_VAR).ok(),
        }
    }

    /// Resolver with a fixed fallback instead of the process environment
    pub fn with_fallback(token: Option<String>) -> Self {
        Self { env_token: token }
    }

    pub fn resolve(&self, config: &ScmConfig) -> Result<String> {
        let configured = config.token.trim();
        if !configured.is_empty() {
            debug!("Using configured token for {}", config.host);
            return Ok(configured.to_string());
        }

        if let Some(token) = self.env_token.as_deref().map(str::trim) {
            if !token.is_empty() {
                debug!("Using token from {} for {}", TOKEN_ENV_VAR, config.host);
                return Ok(token.to_string());
            }
        }

        Err(anyhow::anyhow!(
            "No token found for host '{}'. Set `token` in the configuration or {}",
            config.host,
            TOKEN_ENV_VAR
        ))
    }
}

/// Build the gateway described by `config`
pub fn connect(config: &ScmConfig) -> Result<Arc<dyn ScmClient>> {
    connect_with(config, &TokenResolver::new())
}

pub fn connect_with(config: &ScmConfig, tokens: &TokenResolver) -> Result<Arc<dyn ScmClient>> {
    let token = tokens.resolve(config)?;
    match config.kind {
        ScmKind::GitLab => {
            let client = GitLabClient::with_timeout(&config.host, token, config.timeout())
                .with_context(|| format!("Failed to create GitLab client for {}", config.host))?;
            Ok(Arc::new(client))
        }
    }
}
