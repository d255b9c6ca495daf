//! Service configuration

use scm_client::ScmConfig;
use serde::{Deserialize, Serialize};

/// Upper bound on accepted webhook bodies
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10_000_000;

/// Review bot configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Source-control host connection
    #[serde(default)]
    pub scm: ScmConfig,

    /// Externally reachable base URL of the bot, used for links in comments
    #[serde(default = "default_public_url")]
    pub public_url: String,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

fn default_public_url() -> String {
    "http://localhost:2640".to_string()
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            scm: ScmConfig::default(),
            public_url: default_public_url(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl BotConfig {
    /// Link to the command reference posted in auto-comments
    pub fn help_url(&self) -> String {
        format!("{}/command-help", self.public_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BotConfig::default();
        assert_eq!(config.public_url, "http://localhost:2640");
        assert_eq!(config.max_payload_bytes, 10_000_000);
        assert_eq!(config.help_url(), "http://localhost:2640/command-help");
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            public_url = "https://bot.example.com/"

            [scm]
            host = "https://git.example.com"
            secret = "s3cret"
        "#;
        let config: BotConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.help_url(), "https://bot.example.com/command-help");
        assert_eq!(config.scm.host, "https://git.example.com");
        assert_eq!(config.scm.secret, "s3cret");
        // Defaults for the rest
        assert_eq!(config.scm.timeout_secs, 30);
        assert_eq!(config.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn test_config_deserialize_empty() {
        let config: BotConfig = toml::from_str("").unwrap();
        assert_eq!(config, BotConfig::default());
    }
}
