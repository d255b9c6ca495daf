//! Recording gateway for engine tests

use async_trait::async_trait;
use review_labels::Label;
use scm_client::{
    BuildState, MergePullRequest, ProjectMember, PullRequest, ReviewConfig, ScmClient,
    UpdatePullRequest,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// One gateway call as observed by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListLabels,
    CreateLabel(String),
    GetPullRequest(u64),
    UpdatePullRequest(UpdatePullRequest),
    MergePullRequest(MergePullRequest),
    Comment(String),
    Approval(bool),
    BuildStatus(String, BuildState),
    ListMembers,
    GetReviewConfig(String),
}

/// Mock client for testing
///
/// Serves a fixed merge request, review configuration, label list and member
/// list. Methods named in `failing` return an error instead (the call is
/// still recorded).
#[derive(Debug, Clone, Default)]
pub struct MockScm {
    pub pull_request: PullRequest,
    pub config: ReviewConfig,
    pub labels: Vec<String>,
    pub members: Vec<ProjectMember>,
    failing: HashSet<&'static str>,
    calls: Arc<Mutex<Vec<Call>>>,
    created: Arc<Mutex<Vec<Label>>>,
}

impl MockScm {
    pub fn new(pull_request: PullRequest, config: ReviewConfig) -> Self {
        Self {
            pull_request,
            config,
            ..Self::default()
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_members(mut self, members: Vec<ProjectMember>) -> Self {
        self.members = members;
        self
    }

    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing.insert(method);
        self
    }

    /// Labels passed to successful `create_label` calls, colors included
    pub fn created_labels(&self) -> Vec<Label> {
        self.created.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn updates(&self) -> Vec<UpdatePullRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdatePullRequest(update) => Some(update),
                _ => None,
            })
            .collect()
    }

    pub fn merges(&self) -> Vec<MergePullRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::MergePullRequest(options) => Some(options),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<BuildState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::BuildStatus(_, state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Comment(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Whether any call other than the two initial reads happened
    pub fn has_mutations(&self) -> bool {
        self.calls().iter().any(|c| {
            matches!(
                c,
                Call::CreateLabel(_)
                    | Call::UpdatePullRequest(_)
                    | Call::MergePullRequest(_)
                    | Call::Comment(_)
                    | Call::Approval(_)
                    | Call::BuildStatus(..)
            )
        })
    }

    fn record(&self, method: &'static str, call: Call) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(method) {
            anyhow::bail!("{} failed", method);
        }
        Ok(())
    }
}

#[async_trait]
impl ScmClient for MockScm {
    async fn list_labels(&self, _project: &str) -> anyhow::Result<Vec<Label>> {
        self.record("list_labels", Call::ListLabels)?;
        Ok(self
            .labels
            .iter()
            .map(|name| Label::new("", name.clone()))
            .collect())
    }

    async fn create_label(&self, _project: &str, label: &Label) -> anyhow::Result<()> {
        self.record("create_label", Call::CreateLabel(label.name.to_string()))?;
        self.created.lock().unwrap().push(label.clone());
        Ok(())
    }

    async fn get_pull_request(&self, _project: &str, iid: u64) -> anyhow::Result<PullRequest> {
        self.record("get_pull_request", Call::GetPullRequest(iid))?;
        Ok(self.pull_request.clone())
    }

    async fn update_pull_request(
        &self,
        _project: &str,
        _iid: u64,
        update: &UpdatePullRequest,
    ) -> anyhow::Result<()> {
        self.record("update_pull_request", Call::UpdatePullRequest(update.clone()))
    }

    async fn merge_pull_request(
        &self,
        _project: &str,
        _iid: u64,
        options: &MergePullRequest,
    ) -> anyhow::Result<()> {
        self.record("merge_pull_request", Call::MergePullRequest(options.clone()))
    }

    async fn create_pull_request_comment(
        &self,
        _project: &str,
        _iid: u64,
        body: &str,
    ) -> anyhow::Result<()> {
        self.record("create_pull_request_comment", Call::Comment(body.to_string()))
    }

    async fn set_pull_request_approval(
        &self,
        _project: &str,
        _iid: u64,
        approved: bool,
    ) -> anyhow::Result<()> {
        self.record("set_pull_request_approval", Call::Approval(approved))
    }

    async fn update_build_status(
        &self,
        _project: &str,
        sha: &str,
        state: BuildState,
    ) -> anyhow::Result<()> {
        self.record("update_build_status", Call::BuildStatus(sha.to_string(), state))
    }

    async fn list_project_members(&self, _project: &str) -> anyhow::Result<Vec<ProjectMember>> {
        self.record("list_project_members", Call::ListMembers)?;
        Ok(self.members.clone())
    }

    async fn get_review_config(
        &self,
        _project: &str,
        git_ref: &str,
    ) -> anyhow::Result<ReviewConfig> {
        self.record("get_review_config", Call::GetReviewConfig(git_ref.to_string()))?;
        Ok(self.config.clone())
    }
}

pub fn member(id: u64, username: &str) -> ProjectMember {
    ProjectMember {
        id,
        username: username.to_string(),
        name: username.to_string(),
        email: None,
        avatar_url: None,
    }
}

pub fn config(reviewers: &[&str], approvers: &[&str]) -> ReviewConfig {
    ReviewConfig {
        reviewers: reviewers.iter().map(|s| s.to_string()).collect(),
        approvers: approvers.iter().map(|s| s.to_string()).collect(),
        ..ReviewConfig::default()
    }
}

pub fn pull_request(labels: &[&str]) -> PullRequest {
    PullRequest {
        iid: 7,
        title: "Add thing".to_string(),
        state: "opened".to_string(),
        target_branch: "main".to_string(),
        sha: Some("snapshot-sha".to_string()),
        labels: labels.iter().map(|s| s.to_string()).collect(),
        author_id: Some(1),
        ..PullRequest::default()
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
