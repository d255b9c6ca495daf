//! Gateway data transfer objects
//!
//! These types are host-neutral. Adapters convert their wire formats into
//! them, so the engine never sees a GitLab-specific payload.

use review_labels::Label;
use serde::{Deserialize, Serialize};

/// Location of the per-repository review configuration file
pub const REVIEW_CONFIG_PATH: &str = ".gitlab/review.yml";

/// A merge request as seen by the host
///
/// Read once per processing unit and never mutated locally; all changes
/// travel to the host as an [`UpdatePullRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Project-local merge request number
    pub iid: u64,

    pub title: String,

    /// Description; empty when the host returns none
    pub description: String,

    /// Host state (`opened`, `merged`, `closed`, ...)
    pub state: String,

    pub source_branch: String,

    pub target_branch: String,

    /// HEAD commit SHA
    pub sha: Option<String>,

    /// Current label names
    pub labels: Vec<String>,

    pub author_id: Option<u64>,

    pub assignee_id: Option<u64>,

    pub assignee_ids: Vec<u64>,

    /// Whether the author asked for a squash merge
    pub squash: bool,

    /// Whether the author asked to delete the source branch on merge
    pub force_remove_source_branch: bool,

    pub merge_when_pipeline_succeeds: bool,

    pub web_url: String,
}

impl PullRequest {
    /// Whether the merge request currently carries `label`
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// Changes to apply to a merge request
///
/// `labels` holds the label set expected after the delta is applied. Adapters
/// send the delta when there is one and only fall back to replacing the whole
/// set when `add_labels` and `remove_labels` are both empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePullRequest {
    pub add_labels: Vec<String>,

    pub remove_labels: Vec<String>,

    /// Resulting label set, sorted
    pub labels: Option<Vec<String>>,

    pub assignee_id: Option<u64>,

    pub assignee_ids: Option<Vec<u64>>,

    pub title: Option<String>,

    pub description: Option<String>,

    pub target_branch: Option<String>,
}

impl UpdatePullRequest {
    /// Whether the update carries no label delta
    pub fn has_no_label_delta(&self) -> bool {
        self.add_labels.is_empty() && self.remove_labels.is_empty()
    }
}

/// Options for accepting a merge request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePullRequest {
    pub squash: bool,

    /// Commit message for the squashed commit; only honoured with `squash`
    pub squash_commit_message: Option<String>,

    pub should_remove_source_branch: bool,

    /// Defer the merge until the pipeline passed
    pub merge_when_pipeline_succeeds: bool,
}

/// Commit build status states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildState {
    Pending,
    Created,
    /// Review in progress
    Running,
    /// Review passed
    Success,
    Failed,
    Canceled,
    Skipped,
    Manual,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Pending => "pending",
            BuildState::Created => "created",
            BuildState::Running => "running",
            BuildState::Success => "success",
            BuildState::Failed => "failed",
            BuildState::Canceled => "canceled",
            BuildState::Skipped => "skipped",
            BuildState::Manual => "manual",
        }
    }
}

/// A member of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMember {
    pub id: u64,

    pub username: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Per-repository review configuration (`.gitlab/review.yml`)
///
/// Fetched fresh for every event because it is authoritative per ref.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Users allowed to `/lgtm`
    #[serde(default)]
    pub reviewers: Vec<String>,

    /// Users allowed to `/approve` and `/force-merge`
    #[serde(default)]
    pub approvers: Vec<String>,

    /// Repository specific classification labels
    #[serde(default, rename = "kinds", alias = "custom_labels")]
    pub custom_labels: Vec<Label>,

    #[serde(default, rename = "pullrequest")]
    pub pull_request: PullRequestConfig,
}

/// Merge request related review settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestConfig {
    /// Use the MR title as squash message instead of the
    /// `<!-- title -->...<!-- end title -->` region of the description
    #[serde(default)]
    pub squash_with_title: bool,
}

impl ReviewConfig {
    /// Parse the YAML configuration file; an empty file yields the defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn is_reviewer(&self, username: &str) -> bool {
        self.reviewers.iter().any(|r| r == username)
    }

    pub fn is_approver(&self, username: &str) -> bool {
        self.approvers.iter().any(|a| a == username)
    }
}
