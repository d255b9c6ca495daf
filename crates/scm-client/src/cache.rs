//! Process-wide memoization of host lookups
//!
//! Two independent tables, both unbounded and without expiry:
//!
//! - [`RepoLabelCache`]: which repositories already had the built-in labels
//!   ensured, and which label names are known to exist per repository
//! - [`MemberCache`]: resolved project members by username
//!
//! Everything here can be rebuilt by listing from the host again, so losing
//! the cache only costs extra API calls.

use crate::types::ProjectMember;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Label existence per repository
#[derive(Debug, Default)]
pub struct RepoLabelCache {
    ensured: RwLock<HashSet<String>>,
    labels: RwLock<HashMap<String, HashSet<String>>>,
}

impl RepoLabelCache {
    /// Whether the built-in labels were already ensured for `repo`
    pub fn is_ensured(&self, repo: &str) -> bool {
        read(&self.ensured).contains(repo)
    }

    pub fn mark_ensured(&self, repo: &str) {
        write(&self.ensured).insert(repo.to_string());
    }

    /// Whether `label` is known to exist in `repo`
    pub fn contains(&self, repo: &str, label: &str) -> bool {
        read(&self.labels)
            .get(repo)
            .is_some_and(|names| names.contains(label))
    }

    /// Remember that the given labels exist in `repo`
    pub fn add<I, S>(&self, repo: &str, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = write(&self.labels);
        let names = guard.entry(repo.to_string()).or_default();
        names.extend(labels.into_iter().map(Into::into));
    }

    /// Forget everything about `repo`
    pub fn remove(&self, repo: &str) {
        write(&self.ensured).remove(repo);
        write(&self.labels).remove(repo);
    }
}

/// Project members by username
#[derive(Debug, Default)]
pub struct MemberCache {
    members: RwLock<HashMap<String, ProjectMember>>,
}

impl MemberCache {
    pub fn get(&self, username: &str) -> Option<ProjectMember> {
        read(&self.members).get(username).cloned()
    }

    pub fn add(&self, username: &str, member: ProjectMember) {
        write(&self.members).insert(username.to_string(), member);
    }

    /// Cache every member under its own username
    pub fn extend<I>(&self, members: I)
    where
        I: IntoIterator<Item = ProjectMember>,
    {
        let mut guard = write(&self.members);
        for member in members {
            guard.insert(member.username.clone(), member);
        }
    }

    pub fn remove(&self, username: &str) {
        write(&self.members).remove(username);
    }

    pub fn len(&self) -> usize {
        read(&self.members).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both caches, shared by every delivery through an `Arc`
#[derive(Debug, Default)]
pub struct ScmCache {
    pub labels: RepoLabelCache,
    pub members: MemberCache,
}

impl ScmCache {
    pub fn new() -> Self {
        Self::default()
    }
}
