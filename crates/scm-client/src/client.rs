//! Gateway trait
//!
//! This module defines the `ScmClient` trait that every host adapter must
//! satisfy. The review engine is written against this trait only.

use crate::types::{
    BuildState, MergePullRequest, ProjectMember, PullRequest, ReviewConfig, UpdatePullRequest,
};
use async_trait::async_trait;
use review_labels::Label;

/// Source-control host API
///
/// `project` is the host's project identifier. For GitLab that is the
/// `path_with_namespace` (e.g. `group/subgroup/repo`) or the numeric id.
/// Merge requests are addressed by their project-local `iid`.
///
/// Every call may fail with a transport or host error. Implementations
/// never retry; the caller decides whether a failure is fatal for the event.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one client can serve concurrent
/// webhook deliveries.
///
/// # Example
///
/// ```rust,ignore
/// use scm_client::{BuildState, ScmClient};
///
/// async fn start_review(client: &dyn ScmClient, sha: &str) -> anyhow::Result<()> {
///     client.update_build_status("group/repo", sha, BuildState::Running).await
/// }
/// ```
#[async_trait]
pub trait ScmClient: Send + Sync {
    // === Labels ===

    /// List every label defined on the project
    ///
    /// Only `name`, `color` and `description` are meaningful on the result;
    /// the host knows nothing about commands.
    async fn list_labels(&self, project: &str) -> anyhow::Result<Vec<Label>>;

    /// Create a label on the project
    async fn create_label(&self, project: &str, label: &Label) -> anyhow::Result<()>;

    // === Merge requests ===

    /// Fetch a merge request by its project-local iid
    async fn get_pull_request(&self, project: &str, iid: u64) -> anyhow::Result<PullRequest>;

    /// Apply a label delta and/or field changes to a merge request
    async fn update_pull_request(
        &self,
        project: &str,
        iid: u64,
        update: &UpdatePullRequest,
    ) -> anyhow::Result<()>;

    /// Accept (merge) a merge request
    async fn merge_pull_request(
        &self,
        project: &str,
        iid: u64,
        options: &MergePullRequest,
    ) -> anyhow::Result<()>;

    /// Post a comment on a merge request
    ///
    /// An empty body is a no-op.
    async fn create_pull_request_comment(
        &self,
        project: &str,
        iid: u64,
        body: &str,
    ) -> anyhow::Result<()>;

    /// Approve or revoke the bot user's approval on a merge request
    async fn set_pull_request_approval(
        &self,
        project: &str,
        iid: u64,
        approved: bool,
    ) -> anyhow::Result<()>;

    // === Commits ===

    /// Set the review build status on a commit
    async fn update_build_status(
        &self,
        project: &str,
        sha: &str,
        state: BuildState,
    ) -> anyhow::Result<()>;

    // === Project ===

    /// List every member of the project, including inherited ones
    async fn list_project_members(&self, project: &str) -> anyhow::Result<Vec<ProjectMember>>;

    /// Fetch and parse the review configuration file at `git_ref`
    async fn get_review_config(&self, project: &str, git_ref: &str)
        -> anyhow::Result<ReviewConfig>;
}
