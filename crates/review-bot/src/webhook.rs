//! Webhook boundary
//!
//! Takes the raw header values and body of a GitLab delivery, authenticates
//! it and hands the decoded event to the engine. The HTTP server in front of
//! this only has to turn [`WebhookError::status_code`] into a response.

use crate::auth::{authenticate, TokenError};
use crate::config::BotConfig;
use crate::engine::ReviewEngine;
use crate::error::ReviewError;
use crate::event::WebhookEvent;
use log::{debug, info, warn};
use scm_client::ScmCache;
use std::sync::Arc;
use thiserror::Error;

/// Header naming the event type
pub const EVENT_HEADER: &str = "X-Gitlab-Event";

/// Header carrying the shared secret or a repository token
pub const TOKEN_HEADER: &str = "X-Gitlab-Token";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing X-Gitlab-Token header")]
    MissingToken,

    /// The token could not be decoded
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid token signature")]
    InvalidSignature,

    /// A repository token was used for another repository
    #[error("token is bound to {expected}, delivery is for {actual}")]
    RepositoryMismatch { expected: String, actual: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Engine(#[from] ReviewError),
}

impl WebhookError {
    /// HTTP status for this error
    ///
    /// - Malformed token or payload, oversized body: 400
    /// - Missing or mismatched credentials: 401
    /// - Engine failures, permission violations included: 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidToken(_) | Self::InvalidPayload(_) | Self::PayloadTooLarge { .. } => 400,
            Self::MissingToken | Self::InvalidSignature | Self::RepositoryMismatch { .. } => 401,
            Self::Engine(_) => 500,
        }
    }

    /// Response body that reveals nothing about the secret or internal state
    pub const fn public_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "Missing token",
            Self::InvalidToken(_) => "Invalid token",
            Self::InvalidSignature | Self::RepositoryMismatch { .. } => "Unauthorized",
            Self::InvalidPayload(_) => "Invalid payload",
            Self::PayloadTooLarge { .. } => "Payload too large",
            Self::Engine(_) => "Internal server error",
        }
    }
}

impl From<TokenError> for WebhookError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed(reason) => Self::InvalidToken(reason),
            e @ TokenError::BlankSlug => Self::InvalidToken(e.to_string()),
            TokenError::InvalidSignature => Self::InvalidSignature,
        }
    }
}

/// Authenticates deliveries and feeds them to a [`ReviewEngine`]
pub struct WebhookHandler {
    engine: ReviewEngine,
    secret: String,
    max_payload_bytes: usize,
}

impl WebhookHandler {
    pub fn new(engine: ReviewEngine, secret: impl Into<String>, max_payload_bytes: usize) -> Self {
        Self {
            engine,
            secret: secret.into(),
            max_payload_bytes,
        }
    }

    /// Build the handler, its engine and the GitLab client from configuration
    pub fn from_config(config: &BotConfig) -> anyhow::Result<Self> {
        let client = scm_client::connect(&config.scm)?;
        let engine = ReviewEngine::new(client, Arc::new(ScmCache::new()), config.help_url());
        Ok(Self::new(engine, config.scm.secret.clone(), config.max_payload_bytes))
    }

    pub fn engine(&self) -> &ReviewEngine {
        &self.engine
    }

    /// Process one delivery
    ///
    /// `event_type` and `token` are the raw [`EVENT_HEADER`] and
    /// [`TOKEN_HEADER`] values. Unsupported event types succeed without
    /// doing anything, as do notes on anything but a merge request.
    pub async fn handle(
        &self,
        event_type: Option<&str>,
        token: Option<&str>,
        body: &[u8],
    ) -> Result<(), WebhookError> {
        if body.len() > self.max_payload_bytes {
            return Err(WebhookError::PayloadTooLarge {
                size: body.len(),
                limit: self.max_payload_bytes,
            });
        }

        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(WebhookError::MissingToken)?;
        let credential = authenticate(token, &self.secret).inspect_err(|e| {
            warn!("Rejected webhook delivery: {}", e);
        })?;

        let event_type = event_type.unwrap_or_default();
        let event = WebhookEvent::parse(event_type, body)
            .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;
        let Some(event) = event else {
            debug!("Ignoring {:?} delivery", event_type);
            return Ok(());
        };

        let project = &event.project().path_with_namespace;
        if !credential.allows(project) {
            return Err(WebhookError::RepositoryMismatch {
                expected: credential.slug().unwrap_or_default().to_string(),
                actual: project.clone(),
            });
        }

        info!("Handling {} for {}", event_type, project);
        self.engine.handle(&event).await?;
        Ok(())
    }
}
