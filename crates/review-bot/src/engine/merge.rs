//! Squash message derivation and the merge path

use super::Review;
use crate::error::Result;
use anyhow::Context;
use log::{info, warn};
use review_labels::{keys, Label, LabelSet};
use scm_client::{BuildState, MergePullRequest, PullRequest, ReviewConfig};

pub const TITLE_START: &str = "<!-- title -->";
pub const TITLE_END: &str = "<!-- end title -->";

/// Squash title embedded in a merge request description
///
/// Takes the text after the first [`TITLE_START`] up to [`TITLE_END`]. Without
/// an end marker the capture runs to the next start marker or the end of the
/// text. Quote markers (`>`) in front of the title are dropped.
pub fn extract_title(description: &str) -> Option<String> {
    let mut regions = description.split(TITLE_START);
    regions.next()?;
    let region = regions.next()?;
    let region = region.split(TITLE_END).next().unwrap_or(region);

    let title = region
        .strip_suffix('\n')
        .unwrap_or(region)
        .trim()
        .trim_start_matches('>')
        .trim();
    (!title.is_empty()).then(|| title.to_string())
}

/// Message for the squashed commit, before the classification prefix
pub fn squash_message(config: &ReviewConfig, pr: &PullRequest) -> Option<String> {
    if config.pull_request.squash_with_title {
        return (!pr.title.is_empty()).then(|| pr.title.clone());
    }
    extract_title(&pr.description)
}

/// `short:` of the first classification label on the merge request
///
/// Built-in classification labels win over repository ones; within each
/// group declaration order decides.
pub fn title_prefix(config: &ReviewConfig, pr: &PullRequest) -> Option<String> {
    fn prefix_of(label: &Label, pr: &PullRequest) -> Option<String> {
        if !pr.has_label(&label.name) {
            return None;
        }
        label.short_prefix().map(|short| format!("{}:", short))
    }

    LabelSet::Custom
        .labels()
        .find_map(|l| prefix_of(l, pr))
        .or_else(|| config.custom_labels.iter().find_map(|l| prefix_of(l, pr)))
}

/// Options for accepting the merge request
///
/// `kind/merge` asks for a plain merge, so no squash is requested then.
pub fn merge_options(config: &ReviewConfig, pr: &PullRequest) -> MergePullRequest {
    let mut options = MergePullRequest {
        merge_when_pipeline_succeeds: true,
        should_remove_source_branch: pr.force_remove_source_branch,
        ..MergePullRequest::default()
    };

    let plain_merge = LabelSet::Custom
        .label_by_key(keys::MERGE)
        .is_some_and(|l| pr.has_label(&l.name));
    if plain_merge {
        return options;
    }

    if let Some(message) = squash_message(config, pr) {
        let prefix = title_prefix(config, pr).unwrap_or_default();
        options.squash = true;
        options.squash_commit_message = Some(format!("{}{}", prefix, message));
    }
    options
}

impl Review<'_> {
    /// Close the review check and accept the merge request
    ///
    /// `remove_source_branch` overrides the snapshot's setting when the
    /// delivery carries one. A failing status update is logged; the merge
    /// itself is not.
    pub(crate) async fn merge(
        &self,
        head_sha: Option<&str>,
        remove_source_branch: Option<bool>,
    ) -> Result<()> {
        match self.head_sha(head_sha) {
            Some(sha) => {
                if let Err(e) = self
                    .client()
                    .update_build_status(self.project, sha, BuildState::Success)
                    .await
                {
                    warn!("Failed to close review check on {}@{}: {:#}", self.project, sha, e);
                }
            }
            None => warn!(
                "No head commit for {}!{}, skipping review check",
                self.project, self.iid
            ),
        }

        let mut options = merge_options(&self.config, &self.pr);
        if let Some(remove) = remove_source_branch {
            options.should_remove_source_branch = remove;
        }
        self.client()
            .merge_pull_request(self.project, self.iid, &options)
            .await
            .with_context(|| format!("Failed to merge {}!{}", self.project, self.iid))?;

        info!(
            "Merged {}!{} (squash: {})",
            self.project, self.iid, options.squash
        );
        Ok(())
    }
}
