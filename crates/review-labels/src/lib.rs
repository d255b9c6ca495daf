//! Review command taxonomy
//!
//! This crate knows which slash commands the review bot understands and which
//! labels they map to. It performs no I/O: callers feed it comment bodies or
//! merge request descriptions and get back the label definitions that were
//! mentioned.
//!
//! # Sets
//!
//! ```text
//! Admin   /lgtm /approve /force-merge       (gated by reviewer/approver role)
//! Add     /wip /hold                        (blocking do-not-merge labels)
//! Remove  /remove-wip /remove-hold ...      (unblocking counterparts)
//! Custom  /kind feature /kind bug ...       (classification, with short prefix)
//! ```
//!
//! # Example
//!
//! ```rust
//! use review_labels::{keys, LabelSet};
//!
//! let note = "Looks fine to me /lgtm";
//! let lgtm = LabelSet::Admin.fuzzy_match_key(keys::LGTM, note);
//! assert_eq!(lgtm.map(|l| &*l.name), Some("lgtm"));
//!
//! let kinds = LabelSet::Custom.fuzzy_match("/kind feature");
//! assert_eq!(kinds[0].short, "feat");
//! ```

mod label;
mod set;

pub use label::{Label, Permission};
pub use set::{keys, Entry, LabelSet};

/// Infix that marks a label as blocking automatic merges
pub const DO_NOT_MERGE: &str = "do-not-merge";

/// Prefix inserted after the leading slash to turn an add command into a remove command
pub const REMOVE_PREFIX: &str = "remove";

/// Whether a label name is a do-not-merge marker
pub fn is_do_not_merge(label_name: &str) -> bool {
    label_name.contains(DO_NOT_MERGE)
}
