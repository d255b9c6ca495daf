//! Reviewer lookup and the greeting posted on new merge requests

use super::{Review, ReviewEngine};
use crate::error::Result;
use crate::event::MergeRequestEvent;
use anyhow::Context;
use log::{debug, warn};
use scm_client::ProjectMember;

/// Hidden marker carried by every auto-comment
///
/// The greeting quotes the admin commands, so notes containing the marker
/// must never be interpreted as commands.
pub const AUTO_COMMENT_MARKER: &str = "<!-- review-bot:auto-comment -->";

/// Reviewers mentioned per greeting
const MAX_MENTIONS: usize = 2;

impl ReviewEngine {
    /// Resolve usernames to project members, in the order given
    ///
    /// Served from the member cache; the first miss lists every project
    /// member once and caches them all. Unknown names are skipped.
    pub(crate) async fn resolve_members(
        &self,
        project: &str,
        names: &[String],
    ) -> Vec<ProjectMember> {
        let mut listed = false;
        let mut members = Vec::with_capacity(names.len());

        for name in names {
            if let Some(member) = self.cache.members.get(name) {
                members.push(member);
                continue;
            }
            if !listed {
                listed = true;
                match self.client.list_project_members(project).await {
                    Ok(all) => {
                        debug!("Caching {} members of {}", all.len(), project);
                        self.cache.members.extend(all);
                    }
                    Err(e) => warn!("Failed to list members of {}: {:#}", project, e),
                }
            }
            match self.cache.members.get(name) {
                Some(member) => members.push(member),
                None => debug!("{} is not a member of {}", name, project),
            }
        }

        members
    }
}

impl Review<'_> {
    /// Greet the author and ping up to two reviewers
    pub(crate) async fn post_auto_comment(&self, event: &MergeRequestEvent) -> Result<()> {
        let author_id = event.object_attributes.author_id.or(self.pr.author_id);
        let members = self
            .engine
            .resolve_members(self.project, &self.config.reviewers)
            .await;
        let mentions: Vec<String> = members
            .iter()
            .filter(|m| Some(m.id) != author_id)
            .take(MAX_MENTIONS)
            .map(|m| format!("@{}", m.username))
            .collect();

        let body = render_auto_comment(
            &event.user.username,
            &mentions,
            self.config.pull_request.squash_with_title,
            &self.engine.help_url,
        );
        self.client()
            .create_pull_request_comment(self.project, self.iid, &body)
            .await
            .with_context(|| format!("Failed to comment on {}!{}", self.project, self.iid))?;
        Ok(())
    }
}

/// Text of the greeting posted when a merge request is opened
pub fn render_auto_comment(
    author: &str,
    mentions: &[String],
    squash_with_title: bool,
    help_url: &str,
) -> String {
    let mut body = format!(
        "{}\nHello @{}, thanks for opening this merge request!  \n",
        AUTO_COMMENT_MARKER, author
    );
    if !mentions.is_empty() {
        body.push_str(&format!("Waiting for {} to review.  \n", mentions.join(" ")));
    }

    let message_source = if squash_with_title {
        "the merge request title"
    } else {
        "the text between `<!-- title -->` and `<!-- end title -->` in the description"
    };
    body.push_str(&format!(
        "\nAll commits are squashed on merge; the commit message is {}.  \n",
        message_source
    ));
    body.push_str(&format!(
        "The full list of commands is available [here]({}).  \n\n",
        help_url
    ));
    body.push_str("Reviewers comment `/lgtm` to sign off the review.  \n");
    body.push_str("Approvers comment `/approve` to approve the merge.  \n");
    body.push_str("Approvers comment `/force-merge` to merge right away.  \n");
    body
}
