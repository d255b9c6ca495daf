//! GitLab webhook payloads
//!
//! Only the fields the engine reads are modelled; everything else in the
//! payload is ignored. Events are discriminated by the `X-Gitlab-Event`
//! header, not by the body.

use serde::{Deserialize, Deserializer};

pub const MERGE_REQUEST_HOOK: &str = "Merge Request Hook";
pub const NOTE_HOOK: &str = "Note Hook";

const NOTEABLE_MERGE_REQUEST: &str = "MergeRequest";

/// A webhook delivery the engine acts on
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEvent {
    MergeRequest(MergeRequestEvent),
    Note(NoteEvent),
}

impl WebhookEvent {
    /// Decode a delivery
    ///
    /// Returns `Ok(None)` for event types the bot does not handle and for
    /// notes on anything but a merge request.
    pub fn parse(event_type: &str, body: &[u8]) -> Result<Option<Self>, serde_json::Error> {
        match event_type.trim() {
            MERGE_REQUEST_HOOK => {
                let event: MergeRequestEvent = serde_json::from_slice(body)?;
                Ok(Some(Self::MergeRequest(event)))
            }
            NOTE_HOOK => {
                let event: NoteEvent = serde_json::from_slice(body)?;
                if event.is_merge_request_note() {
                    Ok(Some(Self::Note(event)))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    pub fn project(&self) -> &Project {
        match self {
            Self::MergeRequest(event) => &event.project,
            Self::Note(event) => &event.project,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: u64,
    pub username: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: u64,
    /// `group/subgroup/repo`
    pub path_with_namespace: String,
    #[serde(default, deserialize_with = "nullable")]
    pub default_branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Commit {
    pub id: String,
}

/// A label as embedded in hook payloads (`title`, `name` on older hosts)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventLabel {
    #[serde(alias = "name")]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MergeParams {
    /// Sent as `"1"`/`"0"`, `true`/`false` or a number depending on the host version
    #[serde(default, deserialize_with = "loose_bool")]
    pub force_remove_source_branch: bool,
}

/// `Merge Request Hook` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MergeRequestEvent {
    pub user: User,
    pub project: Project,
    pub object_attributes: MergeRequestAttributes,
    /// Labels currently on the merge request
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<EventLabel>,
    /// Absent on hosts that only send `assignee_id`
    #[serde(default)]
    pub assignees: Option<Vec<User>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MergeRequestAttributes {
    pub iid: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    /// `open`, `update`, `approved`, ...; missing on some system hooks
    #[serde(default, deserialize_with = "nullable")]
    pub action: String,
    #[serde(default)]
    pub author_id: Option<u64>,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub last_commit: Option<Commit>,
    #[serde(default)]
    pub merge_params: Option<MergeParams>,
}

impl MergeRequestEvent {
    pub fn action(&self) -> MergeRequestAction {
        MergeRequestAction::from(self.object_attributes.action.as_str())
    }

    pub fn last_commit_id(&self) -> Option<&str> {
        self.object_attributes
            .last_commit
            .as_ref()
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }

    /// Source branch removal requested in the delivery, if it says anything
    pub fn remove_source_branch(&self) -> Option<bool> {
        self.object_attributes
            .merge_params
            .as_ref()
            .map(|p| p.force_remove_source_branch)
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.title.as_str())
    }

    /// Assignees to carry over into a label update
    pub fn assignee_ids(&self) -> Option<Vec<u64>> {
        self.assignees
            .as_ref()
            .map(|users| users.iter().map(|u| u.id).collect())
    }
}

/// Merge request actions the engine distinguishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRequestAction {
    Open,
    Update,
    Approved,
    Unapproved,
    Merge,
    Close,
    Reopen,
    Other(String),
}

impl From<&str> for MergeRequestAction {
    fn from(action: &str) -> Self {
        match action {
            "open" => Self::Open,
            "update" => Self::Update,
            "approved" => Self::Approved,
            "unapproved" => Self::Unapproved,
            "merge" => Self::Merge,
            "close" => Self::Close,
            "reopen" => Self::Reopen,
            other => Self::Other(other.to_string()),
        }
    }
}

/// `Note Hook` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteEvent {
    pub user: User,
    pub project: Project,
    pub object_attributes: NoteAttributes,
    #[serde(default)]
    pub merge_request: Option<NoteMergeRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteAttributes {
    #[serde(default, deserialize_with = "nullable")]
    pub note: String,
    #[serde(default, deserialize_with = "nullable")]
    pub noteable_type: String,
}

/// The merge request a note was left on
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NoteMergeRequest {
    pub iid: u64,
    #[serde(default)]
    pub assignee_id: Option<u64>,
    #[serde(default)]
    pub assignee_ids: Option<Vec<u64>>,
    #[serde(default)]
    pub last_commit: Option<Commit>,
}

impl NoteEvent {
    pub fn is_merge_request_note(&self) -> bool {
        self.object_attributes.noteable_type == NOTEABLE_MERGE_REQUEST
            && self.merge_request.is_some()
    }

    pub fn note(&self) -> &str {
        &self.object_attributes.note
    }

    pub fn last_commit_id(&self) -> Option<&str> {
        self.merge_request
            .as_ref()
            .and_then(|mr| mr.last_commit.as_ref())
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

/// Treat an explicit `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        None => false,
        Some(Loose::Bool(b)) => b,
        Some(Loose::Int(i)) => i != 0,
        Some(Loose::Str(s)) => matches!(s.trim(), "1" | "true" | "TRUE" | "True"),
    })
}
