//! Source-control host gateway
//!
//! This crate provides the trait-based gateway the review engine talks to,
//! the data transfer objects that cross it, and the process-wide caches that
//! spare the host from redundant label and member listings.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                ScmClient trait                  │
//! │  - labels, merge requests, build status         │
//! │  - comments, approvals, members, review config  │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!               ┌─────────────────┐
//!               │  GitLabClient   │
//!               │  (REST v4)      │
//!               └─────────────────┘
//! ```
//!
//! Other hosts are supported by implementing [`ScmClient`]; the engine only
//! ever sees `Arc<dyn ScmClient>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use scm_client::{connect, ScmClient, ScmConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ScmConfig {
//!     host: "https://gitlab.example.com".to_string(),
//!     token: "glpat-secret".to_string(),
//!     ..ScmConfig::default()
//! };
//! let client = connect(&config)?;
//! let review = client.get_review_config("group/project", "main").await?;
//! println!("reviewers: {:?}", review.reviewers);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod gitlab_client;
pub mod types;

pub use cache::{MemberCache, RepoLabelCache, ScmCache};
pub use client::ScmClient;
pub use config::{connect, connect_with, ScmConfig, ScmKind, TokenResolver, DEFAULT_HOST};
pub use gitlab_client::{GitLabClient, BUILD_STATUS_NAME};
pub use types::{
    BuildState, MergePullRequest, ProjectMember, PullRequest, PullRequestConfig, ReviewConfig,
    UpdatePullRequest, REVIEW_CONFIG_PATH,
};

// Re-export the label type so consumers don't need to depend on review-labels directly
pub use review_labels::Label;
