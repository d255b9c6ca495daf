//! Label definitions
//!
//! A [`Label`] ties a slash command to the label that gets applied on the
//! host. Built-in labels are `'static`; repository specific labels come from
//! the review configuration file, which is why the text fields are `Cow`.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Role a user needs before a command takes effect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Anyone may issue the command
    #[default]
    None,
    /// Listed in the repository's `reviewers`
    Reviewer,
    /// Listed in the repository's `approvers`
    Approver,
}

/// A command → label mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Literal trigger, e.g. `/lgtm` or `/kind feature`
    #[serde(rename = "order", alias = "command")]
    pub command: Cow<'static, str>,

    /// Canonical label name applied on the host
    pub name: Cow<'static, str>,

    /// Squash title prefix for classification labels (`feat`, `fix`, ...)
    #[serde(default)]
    pub short: Cow<'static, str>,

    /// Label color as `#RRGGBB`
    #[serde(default)]
    pub color: Cow<'static, str>,

    #[serde(default)]
    pub description: Cow<'static, str>,

    /// Never read from configuration: repository labels are always unrestricted
    #[serde(skip)]
    pub permission: Permission,
}

impl Label {
    /// Build a label from owned values, used for repository-defined labels
    pub fn new(command: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            command: Cow::Owned(command.into()),
            name: Cow::Owned(name.into()),
            short: Cow::Borrowed(""),
            color: Cow::Borrowed(""),
            description: Cow::Borrowed(""),
            permission: Permission::None,
        }
    }

    pub(crate) const fn builtin(
        command: &'static str,
        name: &'static str,
        short: &'static str,
        color: &'static str,
        description: &'static str,
        permission: Permission,
    ) -> Self {
        Self {
            command: Cow::Borrowed(command),
            name: Cow::Borrowed(name),
            short: Cow::Borrowed(short),
            color: Cow::Borrowed(color),
            description: Cow::Borrowed(description),
            permission,
        }
    }

    /// Whether the command occurs anywhere in `text`
    ///
    /// Plain substring containment, so a command embedded in prose still counts.
    pub fn matches(&self, text: &str) -> bool {
        !self.command.is_empty() && text.contains(&*self.command)
    }

    /// Derived command with `prefix-` inserted after the leading slash
    ///
    /// `/kind feature` with prefix `remove` becomes `/remove-kind feature`.
    pub fn prefixed_command(&self, prefix: &str) -> String {
        let bare = self.command.strip_prefix('/').unwrap_or(&self.command[..]);
        format!("/{}-{}", prefix, bare)
    }

    /// Whether the prefixed form of the command occurs in `text`
    pub fn matches_with_prefix(&self, prefix: &str, text: &str) -> bool {
        !self.command.is_empty() && text.contains(&self.prefixed_command(prefix))
    }

    /// Short prefix, if the label has a non-blank one
    pub fn short_prefix(&self) -> Option<&str> {
        let short = self.short.trim();
        (!short.is_empty()).then_some(short)
    }
}
