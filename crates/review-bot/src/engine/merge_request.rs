//! `Merge Request Hook` handling

use super::labels::LabelDelta;
use super::tasks::{Policy, TaskGroup};
use super::{Review, ReviewEngine};
use crate::error::{Result, ReviewError};
use crate::event::{MergeRequestAction, MergeRequestEvent};
use anyhow::Context;
use log::{debug, info, warn};
use review_labels::{is_do_not_merge, keys, LabelSet};
use scm_client::BuildState;

/// Whether the labels allow an automatic merge
///
/// Requires both sign-off labels and no do-not-merge marker.
pub fn ready_to_merge<'a>(labels: impl IntoIterator<Item = &'a str>) -> bool {
    let lgtm = LabelSet::Admin.label_by_key(keys::LGTM).map(|l| &*l.name);
    let approved = LabelSet::Admin.label_by_key(keys::APPROVE).map(|l| &*l.name);

    let (mut has_lgtm, mut has_approved) = (false, false);
    for label in labels {
        if is_do_not_merge(label) {
            return false;
        }
        has_lgtm |= Some(label) == lgtm;
        has_approved |= Some(label) == approved;
    }
    has_lgtm && has_approved
}

impl ReviewEngine {
    pub async fn handle_merge_request(&self, event: &MergeRequestEvent) -> Result<()> {
        let project = event.project.path_with_namespace.as_str();
        let iid = event.object_attributes.iid;
        let action = event.action();

        match action {
            MergeRequestAction::Merge | MergeRequestAction::Close | MergeRequestAction::Reopen => {
                debug!("Nothing to do for {:?} on {}!{}", action, project, iid);
                return Ok(());
            }
            MergeRequestAction::Other(ref other) => {
                debug!("Ignoring action '{}' on {}!{}", other, project, iid);
                return Ok(());
            }
            _ => {}
        }

        let review = self
            .load(project, &event.project.default_branch, iid)
            .await?;

        match action {
            MergeRequestAction::Open => review.open(event).await,
            MergeRequestAction::Update => review.update(event).await,
            MergeRequestAction::Approved => review.set_approved(event, true).await,
            MergeRequestAction::Unapproved => review.set_approved(event, false).await,
            _ => Ok(()),
        }
    }
}

impl Review<'_> {
    async fn open(&self, event: &MergeRequestEvent) -> Result<()> {
        info!("Merge request {}!{} opened", self.project, self.iid);
        self.engine.ensure_taxonomy(self.project).await;

        let mut group = TaskGroup::new();
        group.spawn("review check", Policy::Propagate, self.start_review_check(event));
        group.spawn("description labels", Policy::Propagate, self.apply_description_labels(event));
        group.spawn("auto comment", Policy::BestEffort, self.post_auto_comment(event));
        group.wait().await
    }

    async fn start_review_check(&self, event: &MergeRequestEvent) -> Result<()> {
        let Some(sha) = self.head_sha(event.last_commit_id()) else {
            warn!("No head commit for {}!{}, skipping review check", self.project, self.iid);
            return Ok(());
        };
        self.client()
            .update_build_status(self.project, sha, BuildState::Running)
            .await
            .with_context(|| format!("Failed to start review check on {}@{}", self.project, sha))?;
        Ok(())
    }

    async fn apply_description_labels(&self, event: &MergeRequestEvent) -> Result<()> {
        let delta = self
            .engine
            .scan_common_labels(self.project, &self.config, &event.object_attributes.description)
            .await;
        if delta.adds.is_empty() {
            return Ok(());
        }

        debug!("Labels from description of {}!{}: {:?}", self.project, self.iid, delta);
        let update = delta.into_update(
            &self.pr.labels,
            event.object_attributes.assignee_id,
            event.assignee_ids(),
        );
        self.client()
            .update_pull_request(self.project, self.iid, &update)
            .await
            .with_context(|| format!("Failed to label {}!{}", self.project, self.iid))?;
        Ok(())
    }

    async fn update(&self, event: &MergeRequestEvent) -> Result<()> {
        if ready_to_merge(event.label_names()) {
            info!("{}!{} is signed off, merging", self.project, self.iid);
            return self
                .merge(event.last_commit_id(), event.remove_source_branch())
                .await;
        }

        if let Some(sha) = self.head_sha(event.last_commit_id()) {
            if let Err(e) = self
                .client()
                .update_build_status(self.project, sha, BuildState::Running)
                .await
            {
                warn!("Failed to refresh review check on {}@{}: {:#}", self.project, sha, e);
            }
        }
        Ok(())
    }

    async fn set_approved(&self, event: &MergeRequestEvent, approved: bool) -> Result<()> {
        let user = &event.user.username;
        if !self.config.is_approver(user) {
            let action = if approved { "approve" } else { "unapprove" };
            return Err(ReviewError::permission_denied(user, action));
        }

        let label = LabelSet::Admin
            .label_by_key(keys::APPROVE)
            .map(|l| &*l.name)
            .unwrap_or("approved");
        let mut delta = LabelDelta::default();
        if approved {
            delta.add(label);
        } else {
            delta.remove(label);
        }

        let update = delta.into_update(
            &self.pr.labels,
            event.object_attributes.assignee_id,
            event.assignee_ids(),
        );
        self.client()
            .update_pull_request(self.project, self.iid, &update)
            .await
            .with_context(|| format!("Failed to update {}!{}", self.project, self.iid))?;
        Ok(())
    }
}
