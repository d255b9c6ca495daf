//! Merge request state processor
//!
//! The engine is stateless per event: every decision is re-derived from the
//! delivery, the repository's review configuration and the merge request's
//! current labels. The only state that outlives an event is the shared
//! [`ScmCache`].
//!
//! ```text
//! WebhookEvent ──► ReviewEngine::handle
//!                     ├─ MergeRequest ─► open | update | approved | unapproved
//!                     └─ Note ─────────► admin commands, common labels
//! ```

mod comment;
mod labels;
mod members;
mod merge;
mod merge_request;
pub mod tasks;

pub use labels::{resulting_labels, LabelDelta};
pub use members::{render_auto_comment, AUTO_COMMENT_MARKER};
pub use merge::{extract_title, merge_options, squash_message, title_prefix, TITLE_END, TITLE_START};
pub use merge_request::ready_to_merge;

use crate::error::Result;
use crate::event::WebhookEvent;
use anyhow::Context;
use log::debug;
use review_labels::Permission;
use scm_client::{PullRequest, ReviewConfig, ScmCache, ScmClient};
use std::sync::Arc;

/// Ref used for the review configuration when the delivery names no default branch
const FALLBACK_REF: &str = "HEAD";

/// Event interpreter and merge gate
pub struct ReviewEngine {
    client: Arc<dyn ScmClient>,
    cache: Arc<ScmCache>,
    help_url: String,
}

impl ReviewEngine {
    /// Create an engine
    ///
    /// `help_url` is linked from the auto-comment posted on new merge requests.
    pub fn new(
        client: Arc<dyn ScmClient>,
        cache: Arc<ScmCache>,
        help_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            cache,
            help_url: help_url.into(),
        }
    }

    pub fn cache(&self) -> &ScmCache {
        &self.cache
    }

    pub fn help_url(&self) -> &str {
        &self.help_url
    }

    /// Process one decoded delivery
    pub async fn handle(&self, event: &WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::MergeRequest(event) => self.handle_merge_request(event).await,
            WebhookEvent::Note(event) => self.handle_note(event).await,
        }
    }

    /// Fetch the review configuration and the merge request snapshot
    async fn load<'a>(
        &'a self,
        project: &'a str,
        default_branch: &str,
        iid: u64,
    ) -> Result<Review<'a>> {
        let git_ref = if default_branch.is_empty() {
            FALLBACK_REF
        } else {
            default_branch
        };
        debug!("Loading review state of {}!{} at {}", project, iid, git_ref);

        let config = self
            .client
            .get_review_config(project, git_ref)
            .await
            .with_context(|| format!("Failed to fetch review config of {}", project))?;
        let pr = self
            .client
            .get_pull_request(project, iid)
            .await
            .with_context(|| format!("Failed to fetch merge request {}!{}", project, iid))?;

        Ok(Review {
            engine: self,
            project,
            iid,
            config,
            pr,
        })
    }
}

/// Everything one event works with, read once up front
pub(crate) struct Review<'a> {
    engine: &'a ReviewEngine,
    project: &'a str,
    iid: u64,
    config: ReviewConfig,
    pr: PullRequest,
}

impl Review<'_> {
    fn client(&self) -> &dyn ScmClient {
        self.engine.client.as_ref()
    }

    /// Head commit, preferring the one named by the delivery
    fn head_sha<'s>(&'s self, from_event: Option<&'s str>) -> Option<&'s str> {
        from_event.or(self.pr.sha.as_deref()).filter(|sha| !sha.is_empty())
    }

    fn has_role(&self, username: &str, permission: Permission) -> bool {
        match permission {
            Permission::None => true,
            Permission::Reviewer => self.config.is_reviewer(username),
            Permission::Approver => self.config.is_approver(username),
        }
    }
}
