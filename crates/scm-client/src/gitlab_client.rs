//! GitLab REST v4 client
//!
//! Direct implementation of the `ScmClient` trait on top of `reqwest`.
//! Every method is one or more plain HTTP calls; nothing is cached or retried
//! here.

use crate::client::ScmClient;
use crate::types::{
    BuildState, MergePullRequest, ProjectMember, PullRequest, ReviewConfig, UpdatePullRequest,
    REVIEW_CONFIG_PATH,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{Method, RequestBuilder, Response, Url};
use review_labels::Label;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the commit status the bot maintains
pub const BUILD_STATUS_NAME: &str = "Review Check";

const PER_PAGE: usize = 100;
const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// GitLab API client
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl GitLabClient {
    /// Create a client for `host` (e.g. `https://gitlab.com`) with the default timeout
    pub fn new(host: &str, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, token, Duration::from_secs(30))
    }

    pub fn with_timeout(host: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(host).with_context(|| format!("Invalid GitLab host URL '{}'", host))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid GitLab host URL '{}'", host);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// `<host>/api/v4/projects/<project>/<segments...>`
    ///
    /// The project path is a single segment, so `group/repo` is sent as
    /// `group%2Frepo` the way GitLab expects it.
    fn endpoint(&self, project: &str, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("GitLab host URL cannot be a base"))?
            .pop_if_empty()
            .extend(["api", "v4", "projects", project])
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(TOKEN_HEADER, &self.token)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .with_context(|| format!("GitLab request failed: {}", what))?;
        check_status(response, what).await
    }

    /// GET every page of a list endpoint
    async fn get_paged<T>(&self, url: Url, what: &str) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let request = self
                .request(Method::GET, url.clone())
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<T> = self
                .send(request, what)
                .await?
                .json()
                .await
                .with_context(|| format!("Invalid GitLab response: {}", what))?;

            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow::anyhow!(
        "GitLab API error {} ({}): {}",
        status,
        what,
        body
    ))
}

#[async_trait]
impl ScmClient for GitLabClient {
    async fn list_labels(&self, project: &str) -> Result<Vec<Label>> {
        debug!("Listing labels of {}", project);
        let url = self.endpoint(project, &["labels"])?;
        let labels: Vec<GitLabLabel> = self.get_paged(url, "list labels").await?;
        debug!("Found {} labels in {}", labels.len(), project);
        Ok(labels.into_iter().map(convert_label).collect())
    }

    async fn create_label(&self, project: &str, label: &Label) -> Result<()> {
        debug!("Creating label {} in {}", label.name, project);
        let url = self.endpoint(project, &["labels"])?;
        let body = CreateLabelBody {
            name: &label.name,
            color: &label.color,
            description: &label.description,
        };
        self.send(self.request(Method::POST, url).json(&body), "create label")
            .await?;
        Ok(())
    }

    async fn get_pull_request(&self, project: &str, iid: u64) -> Result<PullRequest> {
        debug!("Fetching MR !{} of {}", iid, project);
        let url = self.endpoint(project, &["merge_requests", &iid.to_string()])?;
        let mr: GitLabMergeRequest = self
            .send(self.request(Method::GET, url), "get merge request")
            .await?
            .json()
            .await
            .context("Invalid merge request payload")?;
        Ok(convert_merge_request(mr))
    }

    async fn update_pull_request(
        &self,
        project: &str,
        iid: u64,
        update: &UpdatePullRequest,
    ) -> Result<()> {
        debug!(
            "Updating MR !{} of {}: +{:?} -{:?}",
            iid, project, update.add_labels, update.remove_labels
        );
        let url = self.endpoint(project, &["merge_requests", &iid.to_string()])?;
        let body = UpdateMergeRequestBody::from(update);
        self.send(
            self.request(Method::PUT, url).json(&body),
            "update merge request",
        )
        .await?;
        Ok(())
    }

    async fn merge_pull_request(
        &self,
        project: &str,
        iid: u64,
        options: &MergePullRequest,
    ) -> Result<()> {
        debug!("Merging MR !{} of {}", iid, project);
        let url = self.endpoint(project, &["merge_requests", &iid.to_string(), "merge"])?;
        let body = AcceptMergeRequestBody::from(options);
        self.send(
            self.request(Method::PUT, url).json(&body),
            "accept merge request",
        )
        .await?;
        Ok(())
    }

    async fn create_pull_request_comment(&self, project: &str, iid: u64, body: &str) -> Result<()> {
        if body.is_empty() {
            return Ok(());
        }
        debug!("Commenting on MR !{} of {}", iid, project);
        let url = self.endpoint(project, &["merge_requests", &iid.to_string(), "notes"])?;
        self.send(
            self.request(Method::POST, url).json(&NoteBody { body }),
            "create note",
        )
        .await?;
        Ok(())
    }

    async fn set_pull_request_approval(
        &self,
        project: &str,
        iid: u64,
        approved: bool,
    ) -> Result<()> {
        let action = if approved { "approve" } else { "unapprove" };
        debug!("{} MR !{} of {}", action, iid, project);
        let url = self.endpoint(project, &["merge_requests", &iid.to_string(), action])?;
        self.send(self.request(Method::POST, url), action).await?;
        Ok(())
    }

    async fn update_build_status(&self, project: &str, sha: &str, state: BuildState) -> Result<()> {
        debug!("Setting {} on {}@{}", state.as_str(), project, sha);
        let url = self.endpoint(project, &["statuses", sha])?;
        let body = CommitStatusBody {
            state: state.as_str(),
            name: BUILD_STATUS_NAME,
            description: status_description(state),
        };
        self.send(
            self.request(Method::POST, url).json(&body),
            "set commit status",
        )
        .await?;
        Ok(())
    }

    async fn list_project_members(&self, project: &str) -> Result<Vec<ProjectMember>> {
        debug!("Listing members of {}", project);
        let url = self.endpoint(project, &["members", "all"])?;
        let members: Vec<GitLabMember> = self.get_paged(url, "list members").await?;
        Ok(members.into_iter().map(convert_member).collect())
    }

    async fn get_review_config(&self, project: &str, git_ref: &str) -> Result<ReviewConfig> {
        debug!("Fetching {} of {} at {}", REVIEW_CONFIG_PATH, project, git_ref);
        let url = self.endpoint(
            project,
            &["repository", "files", REVIEW_CONFIG_PATH, "raw"],
        )?;
        let content = self
            .send(
                self.request(Method::GET, url).query(&[("ref", git_ref)]),
                "get review config",
            )
            .await?
            .text()
            .await
            .context("Failed to read review config")?;
        ReviewConfig::from_yaml(&content)
            .with_context(|| format!("Invalid {} in {}", REVIEW_CONFIG_PATH, project))
    }
}

fn status_description(state: BuildState) -> &'static str {
    match state {
        BuildState::Running | BuildState::Pending | BuildState::Created => {
            "Waiting for /lgtm and /approve"
        }
        BuildState::Success => "Review passed",
        BuildState::Failed => "Review failed",
        BuildState::Canceled | BuildState::Skipped | BuildState::Manual => "Review stopped",
    }
}

// === Wire formats ===

#[derive(Debug, Deserialize)]
struct GitLabLabel {
    name: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabUser {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct GitLabMember {
    id: u64,
    username: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    source_branch: String,
    #[serde(default)]
    target_branch: String,
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    author: Option<GitLabUser>,
    #[serde(default)]
    assignee: Option<GitLabUser>,
    #[serde(default)]
    assignees: Vec<GitLabUser>,
    #[serde(default)]
    squash: bool,
    #[serde(default)]
    force_remove_source_branch: Option<bool>,
    #[serde(default)]
    merge_when_pipeline_succeeds: bool,
    #[serde(default)]
    web_url: String,
}

#[derive(Debug, Serialize)]
struct CreateLabelBody<'a> {
    name: &'a str,
    color: &'a str,
    description: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct UpdateMergeRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    add_labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remove_labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee_ids: Option<&'a [u64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_branch: Option<&'a str>,
}

impl<'a> From<&'a UpdatePullRequest> for UpdateMergeRequestBody<'a> {
    fn from(update: &'a UpdatePullRequest) -> Self {
        fn join(labels: &[String]) -> Option<String> {
            (!labels.is_empty()).then(|| labels.join(","))
        }

        // GitLab applies `labels` as a full replacement, so it is only sent
        // when there is no delta to apply.
        let labels = if update.has_no_label_delta() {
            update.labels.as_deref().map(|l| l.join(","))
        } else {
            None
        };

        Self {
            add_labels: join(&update.add_labels),
            remove_labels: join(&update.remove_labels),
            labels,
            assignee_id: update.assignee_id,
            assignee_ids: update.assignee_ids.as_deref(),
            title: update.title.as_deref().filter(|t| !t.is_empty()),
            description: update.description.as_deref().filter(|d| !d.is_empty()),
            target_branch: update.target_branch.as_deref().filter(|b| !b.is_empty()),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct AcceptMergeRequestBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    squash: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    squash_commit_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    should_remove_source_branch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_when_pipeline_succeeds: Option<bool>,
}

impl<'a> From<&'a MergePullRequest> for AcceptMergeRequestBody<'a> {
    fn from(options: &'a MergePullRequest) -> Self {
        // A squash without a message would fall back to GitLab's default
        // message, so it is not requested at all.
        let message = options
            .squash_commit_message
            .as_deref()
            .filter(|m| options.squash && !m.is_empty());

        Self {
            squash: message.map(|_| true),
            squash_commit_message: message,
            should_remove_source_branch: options.should_remove_source_branch.then_some(true),
            merge_when_pipeline_succeeds: options.merge_when_pipeline_succeeds.then_some(true),
        }
    }
}

#[derive(Debug, Serialize)]
struct NoteBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct CommitStatusBody<'a> {
    state: &'a str,
    name: &'a str,
    description: &'a str,
}

// === Conversions ===

fn convert_label(label: GitLabLabel) -> Label {
    let mut result = Label::new("", label.name);
    result.color = label.color.unwrap_or_default().into();
    result.description = label.description.unwrap_or_default().into();
    result
}

fn convert_member(member: GitLabMember) -> ProjectMember {
    ProjectMember {
        id: member.id,
        username: member.username,
        name: member.name.unwrap_or_default(),
        email: member.email,
        avatar_url: member.avatar_url,
    }
}

fn convert_merge_request(mr: GitLabMergeRequest) -> PullRequest {
    PullRequest {
        iid: mr.iid,
        title: mr.title,
        description: mr.description.unwrap_or_default(),
        state: mr.state,
        source_branch: mr.source_branch,
        target_branch: mr.target_branch,
        sha: mr.sha,
        labels: mr.labels,
        author_id: mr.author.map(|u| u.id),
        assignee_id: mr.assignee.map(|u| u.id),
        assignee_ids: mr.assignees.into_iter().map(|u| u.id).collect(),
        squash: mr.squash,
        force_remove_source_branch: mr.force_remove_source_branch.unwrap_or(false),
        merge_when_pipeline_succeeds: mr.merge_when_pipeline_succeeds,
        web_url: mr.web_url,
    }
}
