//! Concurrent side effects with per-task error policy

use crate::error::{ReviewError, Result};
use futures::future::join_all;
use log::{debug, warn};
use std::future::Future;
use std::pin::Pin;

/// BoxFuture type alias for task bodies
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a failing task does to the group's outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// The failure becomes the group's result
    Propagate,
    /// The failure is logged and otherwise ignored
    BestEffort,
}

struct Task<'a> {
    name: &'static str,
    policy: Policy,
    future: BoxFuture<'a, Result<()>>,
}

/// Runs independent side effects concurrently
///
/// All tasks run to completion; nothing is cancelled when one fails. The
/// group resolves to the first propagated failure in the order the tasks
/// were added.
#[derive(Default)]
pub struct TaskGroup<'a> {
    tasks: Vec<Task<'a>>,
}

impl<'a> TaskGroup<'a> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn spawn<F>(&mut self, name: &'static str, policy: Policy, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        self.tasks.push(Task {
            name,
            policy,
            future: Box::pin(future),
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn wait(self) -> Result<()> {
        let (meta, futures): (Vec<_>, Vec<_>) = self
            .tasks
            .into_iter()
            .map(|task| ((task.name, task.policy), task.future))
            .unzip();

        let mut first: Option<ReviewError> = None;
        for ((name, policy), result) in meta.into_iter().zip(join_all(futures).await) {
            let Err(err) = result else {
                debug!("Task {} finished", name);
                continue;
            };
            match policy {
                Policy::BestEffort => warn!("Task {} failed: {:#}", name, err),
                Policy::Propagate => {
                    warn!("Task {} failed: {}", name, err);
                    first.get_or_insert(err);
                }
            }
        }

        first.map_or(Ok(()), Err)
    }
}
