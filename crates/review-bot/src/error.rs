//! Engine error type

use thiserror::Error;

/// Failure while processing a review event
#[derive(Debug, Error)]
pub enum ReviewError {
    /// The acting user lacks the role a command or action requires
    #[error("user '{user}' is not allowed to {action}")]
    PermissionDenied { user: String, action: String },

    /// A host call on the critical path failed
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

impl ReviewError {
    pub fn permission_denied(user: impl Into<String>, action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            user: user.into(),
            action: action.into(),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

pub type Result<T, E = ReviewError> = std::result::Result<T, E>;
