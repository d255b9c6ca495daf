//! `Note Hook` handling: review commands left as merge request comments

use super::labels::LabelDelta;
use super::members::AUTO_COMMENT_MARKER;
use super::{Review, ReviewEngine};
use crate::error::{Result, ReviewError};
use crate::event::NoteEvent;
use anyhow::Context;
use log::{debug, info};
use review_labels::{keys, LabelSet};

/// Admin commands that add their label when issued by someone with the role
const SIGN_OFF_KEYS: [&str; 2] = [keys::APPROVE, keys::LGTM];

impl ReviewEngine {
    pub async fn handle_note(&self, event: &NoteEvent) -> Result<()> {
        let Some(mr) = event.merge_request.as_ref() else {
            debug!("Note without merge request on {}", event.project.path_with_namespace);
            return Ok(());
        };
        if event.note().contains(AUTO_COMMENT_MARKER) {
            debug!("Skipping own greeting on {}!{}", event.project.path_with_namespace, mr.iid);
            return Ok(());
        }

        let review = self
            .load(&event.project.path_with_namespace, &event.project.default_branch, mr.iid)
            .await?;
        review.apply_comment(event).await
    }
}

impl Review<'_> {
    async fn apply_comment(&self, event: &NoteEvent) -> Result<()> {
        let note = event.note();
        let user = event.user.username.as_str();

        // A force merge skips every other command in the note
        if let Some(label) = LabelSet::Admin.fuzzy_match_key(keys::FORCE_MERGE, note) {
            if !self.has_role(user, label.permission) {
                return Err(ReviewError::permission_denied(user, &*label.command));
            }
            info!("Force merge of {}!{} by {}", self.project, self.iid, user);
            return self.merge(event.last_commit_id(), None).await;
        }

        // Role checks come before any host call so a rejected command never
        // mutates anything
        let sign_offs: Vec<_> = SIGN_OFF_KEYS
            .iter()
            .filter_map(|key| LabelSet::Admin.fuzzy_match_key(key, note))
            .collect();
        if let Some(label) = sign_offs.iter().find(|l| !self.has_role(user, l.permission)) {
            return Err(ReviewError::permission_denied(user, &*label.command));
        }

        let mut delta = LabelDelta::default();
        sign_offs.iter().for_each(|label| delta.add(&label.name));
        delta.extend(
            self.engine
                .scan_common_labels(self.project, &self.config, note)
                .await,
        );

        if delta.is_empty() {
            debug!("No commands in note on {}!{}", self.project, self.iid);
            return Ok(());
        }

        let approved = LabelSet::Remove
            .label_by_key(keys::APPROVE)
            .is_some_and(|l| delta.removes_label(&l.name));
        if approved {
            // Revoking the host-side approval is not available on every plan
            if let Err(e) = self
                .client()
                .set_pull_request_approval(self.project, self.iid, false)
                .await
            {
                debug!("Failed to revoke approval on {}!{}: {:#}", self.project, self.iid, e);
            }
        }

        let mr = event.merge_request.as_ref();
        let update = delta.into_update(
            &self.pr.labels,
            mr.and_then(|mr| mr.assignee_id),
            mr.and_then(|mr| mr.assignee_ids.clone()),
        );
        self.client()
            .update_pull_request(self.project, self.iid, &update)
            .await
            .with_context(|| format!("Failed to update labels of {}!{}", self.project, self.iid))?;

        info!(
            "Applied +{:?} -{:?} to {}!{}",
            update.add_labels, update.remove_labels, self.project, self.iid
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::render_auto_comment;
    use crate::event::{Commit, NoteAttributes, NoteMergeRequest, Project, User};
    use crate::testing::{config, pull_request, Call, MockScm};
    use scm_client::{BuildState, PullRequest, ScmCache};
    use std::sync::Arc;

    fn engine(mock: &MockScm) -> ReviewEngine {
        ReviewEngine::new(Arc::new(mock.clone()), Arc::new(ScmCache::new()), "")
    }

    fn note(user: &str, text: &str) -> NoteEvent {
        NoteEvent {
            user: User {
                username: user.to_string(),
                ..User::default()
            },
            project: Project {
                path_with_namespace: "group/repo".to_string(),
                default_branch: "main".to_string(),
                ..Project::default()
            },
            object_attributes: NoteAttributes {
                note: text.to_string(),
                noteable_type: "MergeRequest".to_string(),
            },
            merge_request: Some(NoteMergeRequest {
                iid: 7,
                assignee_id: Some(5),
                assignee_ids: Some(vec![5, 6]),
                last_commit: Some(Commit {
                    id: "head".to_string(),
                }),
                ..NoteMergeRequest::default()
            }),
        }
    }

    #[tokio::test]
    async fn test_lgtm_from_reviewer() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &[]));
        engine(&mock).handle_note(&note("alice", "LGTM! /lgtm")).await.unwrap();

        let updates = mock.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].add_labels, ["lgtm"]);
        assert_eq!(updates[0].labels, Some(vec!["lgtm".to_string()]));
        assert_eq!(updates[0].assignee_id, Some(5));
        assert_eq!(updates[0].assignee_ids, Some(vec![5, 6]));
    }

    #[tokio::test]
    async fn test_lgtm_from_non_reviewer_changes_nothing() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &["carol"]));

        let err = engine(&mock)
            .handle_note(&note("mallory", "/lgtm"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(err.to_string().contains("/lgtm"));
        assert!(!mock.has_mutations());
    }

    #[tokio::test]
    async fn test_approver_is_not_implicitly_a_reviewer() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &["carol"]));

        let err = engine(&mock)
            .handle_note(&note("carol", "/approve /lgtm"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(mock.updates().is_empty());
    }

    #[tokio::test]
    async fn test_approve_and_common_labels_in_one_update() {
        let mock = MockScm::new(pull_request(&["do-not-merge/hold"]), config(&[], &["carol"]));
        engine(&mock)
            .handle_note(&note("carol", "/approve /remove-hold /kind docs"))
            .await
            .unwrap();

        let updates = mock.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].add_labels, ["approved", "kind/docs"]);
        assert_eq!(updates[0].remove_labels, ["do-not-merge/hold"]);
        assert_eq!(
            updates[0].labels,
            Some(vec!["approved".to_string(), "kind/docs".to_string()])
        );
    }

    #[tokio::test]
    async fn test_force_merge_from_approver_bypasses_gates() {
        let pr = PullRequest {
            description: "<!-- title -->hotfix<!-- end title -->".to_string(),
            ..pull_request(&["do-not-merge/hold", "kind/bugfix"])
        };
        let mock = MockScm::new(pr, config(&[], &["carol"]));
        engine(&mock)
            .handle_note(&note("carol", "/force-merge /hold"))
            .await
            .unwrap();

        let merges = mock.merges();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].squash_commit_message.as_deref(), Some("fix:hotfix"));
        assert_eq!(mock.statuses(), [BuildState::Success]);
        // Nothing else is applied once a force merge ran
        assert!(mock.updates().is_empty());
    }

    #[tokio::test]
    async fn test_force_merge_ignores_sign_offs_in_same_note() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &["carol"]));
        engine(&mock)
            .handle_note(&note("carol", "/force-merge, reviewers forgot to /lgtm"))
            .await
            .unwrap();

        assert_eq!(mock.merges().len(), 1);
        assert!(mock.updates().is_empty());
    }

    #[tokio::test]
    async fn test_force_merge_from_non_approver_is_denied() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &["carol"]));

        let err = engine(&mock)
            .handle_note(&note("alice", "/force-merge"))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(!mock.has_mutations());
    }

    #[tokio::test]
    async fn test_note_without_commands_does_nothing() {
        let mock = MockScm::new(pull_request(&[]), config(&["alice"], &[]));
        engine(&mock)
            .handle_note(&note("bob", "Looks reasonable, one question inline."))
            .await
            .unwrap();
        assert!(!mock.has_mutations());
    }

    #[tokio::test]
    async fn test_remove_approve_revokes_host_approval() {
        let mock = MockScm::new(pull_request(&["approved", "lgtm"]), config(&[], &[]));
        engine(&mock)
            .handle_note(&note("bob", "/remove-approve"))
            .await
            .unwrap();

        assert_eq!(mock.count(|c| *c == Call::Approval(false)), 1);
        let updates = mock.updates();
        assert_eq!(updates[0].remove_labels, ["approved"]);
        assert_eq!(updates[0].labels, Some(vec!["lgtm".to_string()]));
    }

    #[tokio::test]
    async fn test_revoke_failure_does_not_block_update() {
        let mock = MockScm::new(pull_request(&["approved"]), config(&[], &[]))
            .failing("set_pull_request_approval");
        engine(&mock)
            .handle_note(&note("bob", "/remove-approve"))
            .await
            .unwrap();
        assert_eq!(mock.updates().len(), 1);
    }

    #[tokio::test]
    async fn test_own_greeting_is_ignored() {
        let mock = MockScm::new(pull_request(&[]), config(&[], &[]));
        let greeting = render_auto_comment("dev", &[], false, "/command-help");

        engine(&mock).handle_note(&note("bot", &greeting)).await.unwrap();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_propagates() {
        let mock = MockScm::new(pull_request(&[]), config(&[], &[])).failing("update_pull_request");
        let err = engine(&mock)
            .handle_note(&note("bob", "/wip"))
            .await
            .unwrap_err();
        assert!(!err.is_permission_denied());
    }
}
