//! Label bookkeeping: taxonomy provisioning, the common-label scan and
//! resulting label sets

use super::ReviewEngine;
use log::{debug, warn};
use review_labels::{Label, LabelSet, REMOVE_PREFIX};
use scm_client::{ReviewConfig, UpdatePullRequest};
use std::collections::{BTreeSet, HashSet};

/// Sets whose labels must exist on every repository the bot serves
const PROVISIONED_SETS: [LabelSet; 3] = [LabelSet::Admin, LabelSet::Add, LabelSet::Custom];

/// Color for repository labels whose configuration names none
///
/// GitLab refuses to create a label without a color.
const DEFAULT_LABEL_COLOR: &str = "#428BCA";

/// Labels to add and remove, each without duplicates, in match order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelDelta {
    pub adds: Vec<String>,
    pub removes: Vec<String>,
}

impl LabelDelta {
    pub fn add(&mut self, name: &str) {
        if !self.adds.iter().any(|n| n == name) {
            self.adds.push(name.to_string());
        }
    }

    pub fn remove(&mut self, name: &str) {
        if !self.removes.iter().any(|n| n == name) {
            self.removes.push(name.to_string());
        }
    }

    pub fn extend(&mut self, other: LabelDelta) {
        other.adds.iter().for_each(|n| self.add(n));
        other.removes.iter().for_each(|n| self.remove(n));
    }

    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.removes.is_empty()
    }

    pub fn removes_label(&self, name: &str) -> bool {
        self.removes.iter().any(|n| n == name)
    }

    /// Turn the delta into the one update sent to the host
    pub fn into_update(
        self,
        current: &[String],
        assignee_id: Option<u64>,
        assignee_ids: Option<Vec<u64>>,
    ) -> UpdatePullRequest {
        let labels = resulting_labels(current, &self.adds, &self.removes);
        UpdatePullRequest {
            add_labels: self.adds,
            remove_labels: self.removes,
            labels: Some(labels),
            assignee_id,
            assignee_ids,
            ..UpdatePullRequest::default()
        }
    }
}

/// `(current ∪ adds) ∖ removes`, sorted
///
/// A label both added and removed ends up removed.
pub fn resulting_labels(current: &[String], adds: &[String], removes: &[String]) -> Vec<String> {
    let mut set: BTreeSet<&str> = current.iter().map(String::as_str).collect();
    set.extend(adds.iter().map(String::as_str));
    for name in removes {
        set.remove(name.as_str());
    }
    set.into_iter().map(str::to_string).collect()
}

impl ReviewEngine {
    /// Make sure every built-in label exists on `project`
    ///
    /// Runs at most once per repository and process. Failures are logged and
    /// never fail the event; a failed listing leaves the repository unmarked
    /// so the next event tries again.
    pub(crate) async fn ensure_taxonomy(&self, project: &str) {
        if self.cache.labels.is_ensured(project) {
            debug!("Labels of {} already ensured", project);
            return;
        }

        let existing: HashSet<String> = match self.client.list_labels(project).await {
            Ok(labels) => labels.into_iter().map(|l| l.name.into_owned()).collect(),
            Err(e) => {
                warn!("Failed to list labels of {}: {:#}", project, e);
                return;
            }
        };
        self.cache.labels.add(project, existing.iter().cloned());

        for label in PROVISIONED_SETS.into_iter().flat_map(LabelSet::labels) {
            if existing.contains(&*label.name) {
                continue;
            }
            match self.client.create_label(project, label).await {
                Ok(()) => {
                    debug!("Created label {} in {}", label.name, project);
                    self.cache.labels.add(project, [&*label.name]);
                }
                Err(e) => warn!("Failed to create label {} in {}: {:#}", label.name, project, e),
            }
        }

        self.cache.labels.mark_ensured(project);
    }

    /// Collect the non-admin label commands found in `text`
    ///
    /// Repository labels from the review configuration are created on the
    /// host the first time they are seen, whether or not `text` mentions them.
    pub(crate) async fn scan_common_labels(
        &self,
        project: &str,
        config: &ReviewConfig,
        text: &str,
    ) -> LabelDelta {
        let mut delta = LabelDelta::default();

        LabelSet::Add.fuzzy_match(text).iter().for_each(|l| delta.add(&l.name));
        LabelSet::Remove.fuzzy_match(text).iter().for_each(|l| delta.remove(&l.name));
        LabelSet::Custom.fuzzy_match(text).iter().for_each(|l| delta.add(&l.name));
        LabelSet::Custom
            .fuzzy_match_with_prefix(REMOVE_PREFIX, text)
            .iter()
            .for_each(|l| delta.remove(&l.name));

        let mut existing = RepoLabels::Unknown;
        for label in &config.custom_labels {
            if label.matches_with_prefix(REMOVE_PREFIX, text) {
                delta.remove(&label.name);
            }
            if label.matches(text) {
                delta.add(&label.name);
            }
            self.sync_repo_label(project, label, &mut existing).await;
        }

        delta
    }

    async fn sync_repo_label(&self, project: &str, label: &Label, existing: &mut RepoLabels) {
        if label.name.is_empty() || self.cache.labels.contains(project, &label.name) {
            return;
        }

        if let RepoLabels::Unknown = existing {
            *existing = match self.client.list_labels(project).await {
                Ok(labels) => RepoLabels::Listed(
                    labels.into_iter().map(|l| l.name.into_owned()).collect(),
                ),
                Err(e) => {
                    warn!("Failed to sync custom labels of {}: {:#}", project, e);
                    RepoLabels::Unavailable
                }
            };
        }

        let RepoLabels::Listed(names) = existing else {
            return;
        };
        if !names.contains(&*label.name) {
            let mut label = label.clone();
            if label.color.trim().is_empty() {
                label.color = DEFAULT_LABEL_COLOR.into();
            }
            if let Err(e) = self.client.create_label(project, &label).await {
                warn!("Failed to create label {} in {}: {:#}", label.name, project, e);
                return;
            }
            names.insert(label.name.to_string());
        }
        self.cache.labels.add(project, [&*label.name]);
    }
}

/// Host label listing, fetched at most once per scan
enum RepoLabels {
    Unknown,
    Listed(HashSet<String>),
    Unavailable,
}
