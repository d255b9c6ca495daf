//! Built-in label sets and the command matcher

use crate::label::{Label, Permission};

/// Lookup keys of the built-in labels
pub mod keys {
    pub const LGTM: &str = "LGTM";
    pub const APPROVE: &str = "APPROVE";
    pub const FORCE_MERGE: &str = "FORCE-MERGE";
    pub const WIP: &str = "WIP";
    pub const HOLD: &str = "HOLD";
    pub const MERGE: &str = "MERGE";
    pub const FEATURE: &str = "FEATURE";
    pub const BUGFIX: &str = "BUGFIX";
    pub const STYLE: &str = "STYLE";
    pub const DOCS: &str = "DOCS";
    pub const REFACTOR: &str = "REFACTOR";
    pub const PERF: &str = "PERF";
    pub const TEST: &str = "TEST";
    pub const CI: &str = "CI";
    pub const CLEANUP: &str = "CLEANUP";
}

/// A keyed label inside a set
#[derive(Debug)]
pub struct Entry {
    pub key: &'static str,
    pub label: Label,
}

const fn entry(key: &'static str, label: Label) -> Entry {
    Entry { key, label }
}

const GREEN: &str = "#5CB85C";
const RED: &str = "#FF0000";

static ADMIN: [Entry; 3] = [
    entry(
        keys::LGTM,
        Label::builtin(
            "/lgtm",
            "lgtm",
            "",
            GREEN,
            "Reviewed, looks good to merge",
            Permission::Reviewer,
        ),
    ),
    entry(
        keys::APPROVE,
        Label::builtin(
            "/approve",
            "approved",
            "",
            GREEN,
            "Approved for merging",
            Permission::Approver,
        ),
    ),
    entry(
        keys::FORCE_MERGE,
        Label::builtin(
            "/force-merge",
            "force-merge",
            "",
            GREEN,
            "Merge regardless of review state",
            Permission::Approver,
        ),
    ),
];

static ADD: [Entry; 2] = [
    entry(
        keys::WIP,
        Label::builtin(
            "/wip",
            "do-not-merge/work-in-progress",
            "",
            RED,
            "Work in progress, do not merge",
            Permission::None,
        ),
    ),
    entry(
        keys::HOLD,
        Label::builtin(
            "/hold",
            "do-not-merge/hold",
            "",
            RED,
            "On hold, do not merge",
            Permission::None,
        ),
    ),
];

static REMOVE: [Entry; 4] = [
    entry(
        keys::WIP,
        Label::builtin(
            "/remove-wip",
            "do-not-merge/work-in-progress",
            "",
            RED,
            "Work is done",
            Permission::None,
        ),
    ),
    entry(
        keys::HOLD,
        Label::builtin(
            "/remove-hold",
            "do-not-merge/hold",
            "",
            RED,
            "Hold released",
            Permission::None,
        ),
    ),
    entry(
        keys::LGTM,
        Label::builtin(
            "/remove-lgtm",
            "lgtm",
            "",
            GREEN,
            "Review sign-off withdrawn",
            Permission::None,
        ),
    ),
    entry(
        keys::APPROVE,
        Label::builtin(
            "/remove-approve",
            "approved",
            "",
            GREEN,
            "Approval withdrawn",
            Permission::None,
        ),
    ),
];

static CUSTOM: [Entry; 10] = [
    entry(
        keys::MERGE,
        Label::builtin(
            "/kind merge",
            "kind/merge",
            "merge",
            "#00F5FF",
            "Kind: merge without squashing",
            Permission::None,
        ),
    ),
    entry(
        keys::FEATURE,
        Label::builtin(
            "/kind feature",
            "kind/feature",
            "feat",
            "#428BCA",
            "Kind: new feature",
            Permission::None,
        ),
    ),
    entry(
        keys::BUGFIX,
        Label::builtin(
            "/kind bug",
            "kind/bugfix",
            "fix",
            "#F0AD4E",
            "Kind: bug fix",
            Permission::None,
        ),
    ),
    entry(
        keys::STYLE,
        Label::builtin(
            "/kind style",
            "kind/style",
            "style",
            "#43CD80",
            "Kind: code style",
            Permission::None,
        ),
    ),
    entry(
        keys::DOCS,
        Label::builtin(
            "/kind docs",
            "kind/docs",
            "docs",
            "#CAFF70",
            "Kind: documentation",
            Permission::None,
        ),
    ),
    entry(
        keys::REFACTOR,
        Label::builtin(
            "/kind refactor",
            "kind/refactor",
            "refactor",
            "#FF1493",
            "Kind: refactoring",
            Permission::None,
        ),
    ),
    entry(
        keys::PERF,
        Label::builtin(
            "/kind perf",
            "kind/perf",
            "perf",
            "#A020F0",
            "Kind: performance",
            Permission::None,
        ),
    ),
    entry(
        keys::TEST,
        Label::builtin(
            "/kind test",
            "kind/test",
            "test",
            "#8B0000",
            "Kind: tests",
            Permission::None,
        ),
    ),
    entry(
        keys::CI,
        Label::builtin(
            "/kind ci",
            "kind/ci",
            "ci",
            "#9AC0CD",
            "Kind: CI/CD",
            Permission::None,
        ),
    ),
    entry(
        keys::CLEANUP,
        Label::builtin(
            "/kind cleanup",
            "kind/cleanup",
            "cleanup",
            "#33a3dc",
            "Kind: cleanup",
            Permission::None,
        ),
    ),
];

/// One of the four built-in label sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelSet {
    /// Role-gated sign-off commands
    Admin,
    /// Blocking labels anyone can add
    Add,
    /// Commands that take labels away again
    Remove,
    /// Work classification
    Custom,
}

impl LabelSet {
    /// Keyed entries in declaration order
    pub fn entries(self) -> &'static [Entry] {
        match self {
            LabelSet::Admin => &ADMIN,
            LabelSet::Add => &ADD,
            LabelSet::Remove => &REMOVE,
            LabelSet::Custom => &CUSTOM,
        }
    }

    /// All labels of the set in declaration order
    pub fn labels(self) -> impl Iterator<Item = &'static Label> {
        self.entries().iter().map(|e| &e.label)
    }

    pub fn label_by_key(self, key: &str) -> Option<&'static Label> {
        self.entries()
            .iter()
            .find(|e| e.key == key)
            .map(|e| &e.label)
    }

    /// Look a label up by its canonical name
    pub fn label_by_name(self, name: &str) -> Option<&'static Label> {
        self.labels().find(|l| l.name == name)
    }

    /// Every label whose command occurs in `text`
    pub fn fuzzy_match(self, text: &str) -> Vec<&'static Label> {
        self.labels().filter(|l| l.matches(text)).collect()
    }

    /// The label stored under `key`, if its command occurs in `text`
    pub fn fuzzy_match_key(self, key: &str, text: &str) -> Option<&'static Label> {
        self.label_by_key(key).filter(|l| l.matches(text))
    }

    /// Every label whose `/prefix-` form occurs in `text`
    ///
    /// Used to find `/remove-kind feature` style removals of classification labels.
    pub fn fuzzy_match_with_prefix(self, prefix: &str, text: &str) -> Vec<&'static Label> {
        self.labels()
            .filter(|l| l.matches_with_prefix(prefix, text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REMOVE_PREFIX;
    use std::collections::HashSet;

    const ALL_SETS: [LabelSet; 4] = [
        LabelSet::Admin,
        LabelSet::Add,
        LabelSet::Remove,
        LabelSet::Custom,
    ];

    fn names(labels: &[&Label]) -> Vec<String> {
        labels.iter().map(|l| l.name.to_string()).collect()
    }

    #[test]
    fn test_commands_unique_within_set() {
        for set in ALL_SETS {
            let mut seen = HashSet::new();
            for label in set.labels() {
                assert!(
                    seen.insert(&*label.command),
                    "duplicate command {} in {:?}",
                    label.command,
                    set
                );
            }
            let keys: HashSet<_> = set.entries().iter().map(|e| e.key).collect();
            assert_eq!(keys.len(), set.entries().len(), "duplicate key in {:?}", set);
        }
    }

    #[test]
    fn test_label_by_key() {
        assert_eq!(LabelSet::Admin.label_by_key(keys::LGTM).unwrap().name, "lgtm");
        assert_eq!(
            LabelSet::Admin.label_by_key(keys::APPROVE).unwrap().name,
            "approved"
        );
        assert_eq!(
            LabelSet::Remove.label_by_key(keys::APPROVE).unwrap().command,
            "/remove-approve"
        );
        assert!(LabelSet::Add.label_by_key(keys::LGTM).is_none());
        assert!(LabelSet::Custom.label_by_key("NOPE").is_none());
    }

    #[test]
    fn test_label_by_name() {
        let label = LabelSet::Custom.label_by_name("kind/bugfix").unwrap();
        assert_eq!(label.short, "fix");
        assert!(LabelSet::Custom.label_by_name("lgtm").is_none());
    }

    #[test]
    fn test_admin_permissions() {
        assert_eq!(
            LabelSet::Admin.label_by_key(keys::LGTM).unwrap().permission,
            Permission::Reviewer
        );
        assert_eq!(
            LabelSet::Admin.label_by_key(keys::APPROVE).unwrap().permission,
            Permission::Approver
        );
        assert_eq!(
            LabelSet::Admin.label_by_key(keys::FORCE_MERGE).unwrap().permission,
            Permission::Approver
        );
        assert!(LabelSet::Custom
            .labels()
            .all(|l| l.permission == Permission::None));
    }

    #[test]
    fn test_fuzzy_match_finds_embedded_commands() {
        let text = "Nice work!\n/hold until the release is cut, then /kind feature";
        assert_eq!(names(&LabelSet::Add.fuzzy_match(text)), ["do-not-merge/hold"]);
        assert_eq!(names(&LabelSet::Custom.fuzzy_match(text)), ["kind/feature"]);
        assert!(LabelSet::Remove.fuzzy_match(text).is_empty());
    }

    #[test]
    fn test_fuzzy_match_multiple() {
        let text = "/wip /hold";
        assert_eq!(
            names(&LabelSet::Add.fuzzy_match(text)),
            ["do-not-merge/work-in-progress", "do-not-merge/hold"]
        );
    }

    #[test]
    fn test_remove_commands_do_not_trigger_add_commands() {
        let text = "/remove-wip /remove-lgtm /remove-approve";
        assert!(LabelSet::Add.fuzzy_match(text).is_empty());
        assert!(LabelSet::Admin.fuzzy_match(text).is_empty());
        assert_eq!(
            names(&LabelSet::Remove.fuzzy_match(text)),
            ["do-not-merge/work-in-progress", "lgtm", "approved"]
        );
    }

    #[test]
    fn test_fuzzy_match_key() {
        let text = "/lgtm /approve";
        assert!(LabelSet::Admin.fuzzy_match_key(keys::LGTM, text).is_some());
        assert!(LabelSet::Admin.fuzzy_match_key(keys::APPROVE, text).is_some());
        assert!(LabelSet::Admin
            .fuzzy_match_key(keys::FORCE_MERGE, text)
            .is_none());
        assert!(LabelSet::Admin.fuzzy_match_key("UNKNOWN", text).is_none());
    }

    #[test]
    fn test_fuzzy_match_with_prefix() {
        let text = "/remove-kind feature and /kind docs";
        assert_eq!(
            names(&LabelSet::Custom.fuzzy_match_with_prefix(REMOVE_PREFIX, text)),
            ["kind/feature"]
        );
        assert_eq!(names(&LabelSet::Custom.fuzzy_match(text)), ["kind/docs"]);
    }

    #[test]
    fn test_bug_command_maps_to_bugfix() {
        let matched = LabelSet::Custom.fuzzy_match("/kind bug");
        assert_eq!(names(&matched), ["kind/bugfix"]);
        assert_eq!(matched[0].short_prefix(), Some("fix"));
    }
}
