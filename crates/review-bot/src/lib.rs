//! ChatOps review bot for GitLab merge requests
//!
//! Reacts to merge request lifecycle events and review comments, turning
//! slash commands into label changes, a review build status and, once both
//! sign-offs are in, a squash merge.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   headers + body
//! │  WebhookHandler  │◄────────────────── HTTP server
//! │  auth, decoding  │
//! └────────┬─────────┘
//!          │ WebhookEvent
//!          ▼
//! ┌──────────────────┐         ┌─────────────────────┐
//! │   ReviewEngine   │────────►│  Arc<dyn ScmClient> │
//! │  labels, merge   │         │  + Arc<ScmCache>    │
//! └──────────────────┘         └─────────────────────┘
//! ```
//!
//! # Protocol
//!
//! - reviewers comment `/lgtm`, approvers comment `/approve`
//! - `lgtm` + `approved` without any `do-not-merge/*` label merges on the
//!   next update of the merge request
//! - approvers may `/force-merge` at any time
//! - anyone may `/wip`, `/hold` or classify the work with `/kind ...`
//!
//! # Example
//!
//! ```rust,no_run
//! use review_bot::{BotConfig, WebhookHandler};
//!
//! # async fn example(body: &[u8]) -> anyhow::Result<()> {
//! let config: BotConfig = toml::from_str(
//!     r#"
//!     public_url = "https://review-bot.example.com"
//!
//!     [scm]
//!     host = "https://gitlab.example.com"
//!     secret = "hook-secret"
//!     "#,
//! )?;
//! let handler = WebhookHandler::from_config(&config)?;
//!
//! if let Err(e) = handler
//!     .handle(Some("Note Hook"), Some("hook-secret"), body)
//!     .await
//! {
//!     eprintln!("{} -> {}", e, e.status_code());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod webhook;

#[cfg(test)]
mod testing;

pub use auth::{authenticate, issue_token, Credential, TokenError};
pub use config::BotConfig;
pub use engine::ReviewEngine;
pub use error::ReviewError;
pub use event::WebhookEvent;
pub use webhook::{WebhookError, WebhookHandler};
