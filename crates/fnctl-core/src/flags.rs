//! Flag sets and composite command construction.
//!
//! Each stage command (build, push, deploy, ...) declares its flags as a
//! [`FlagSet`]. A composite command such as `up` is assembled by merging the
//! sets in order:
//!
//! ```text
//! CompositeCommand::new("up")
//!     .merge(&up_flags())?
//!     .merge(&build_flags())?
//!     .merge(&push_flags())?
//!     .merge(&deploy_flags())?
//! ```
//!
//! A flag declared identically by several sets is kept once (first
//! registration wins). A flag declared with the same name but a different
//! shape is rejected with [`Error::FlagConflict`] when the command is built,
//! so the argument parser never binds a value to the wrong type.

use std::fmt;

use crate::{Error, Result};

/// How a flag consumes its value on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Presence flag, `false` unless given.
    Switch,
    /// Boolean taking an explicit value (`--update=false`).
    Bool,
    /// Single string value.
    Value,
    /// String value that may be given several times.
    Repeated,
    /// Comma-separated list (`--platforms linux/amd64,linux/arm64`).
    List,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Switch => "switch",
            Self::Bool => "bool",
            Self::Value => "string",
            Self::Repeated => "repeated string",
            Self::List => "list",
        };
        f.write_str(s)
    }
}

/// A single flag definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub name: &'static str,
    pub short: Option<char>,
    pub kind: FlagKind,
    pub default: Option<&'static str>,
    pub help: &'static str,
}

impl FlagSpec {
    pub fn switch(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Switch, help)
    }

    pub fn boolean(name: &'static str, default: bool, help: &'static str) -> Self {
        let default = if default { "true" } else { "false" };
        Self::new(name, FlagKind::Bool, help).with_default(default)
    }

    pub fn value(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Value, help)
    }

    pub fn repeated(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::Repeated, help)
    }

    pub fn list(name: &'static str, help: &'static str) -> Self {
        Self::new(name, FlagKind::List, help)
    }

    fn new(name: &'static str, kind: FlagKind, help: &'static str) -> Self {
        Self {
            name,
            short: None,
            kind,
            default: None,
            help,
        }
    }

    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }

    /// Two specs are compatible when they parse the same way; help text may differ.
    pub fn is_compatible(&self, other: &FlagSpec) -> bool {
        self.name == other.name
            && self.short == other.short
            && self.kind == other.kind
            && self.default == other.default
    }

    fn signature(&self) -> String {
        let mut sig = self.kind.to_string();
        if let Some(short) = self.short {
            sig.push_str(&format!(" (-{short})"));
        }
        if let Some(default) = self.default {
            sig.push_str(&format!(" [default: {default}]"));
        }
        sig
    }
}

/// The flags one command declares, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSet {
    owner: String,
    flags: Vec<FlagSpec>,
}

impl FlagSet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            flags: Vec::new(),
        }
    }

    pub fn flag(mut self, spec: FlagSpec) -> Self {
        self.flags.push(spec);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter()
    }
}

/// A command whose flags are merged from several [`FlagSet`]s.
#[derive(Debug, Clone)]
pub struct CompositeCommand {
    name: String,
    flags: Vec<(String, FlagSpec)>,
}

impl CompositeCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merge a source flag set into this command.
    ///
    /// Flags already present with a compatible definition are skipped.
    /// A flag whose name or short alias is taken by an incompatible
    /// definition fails the merge.
    pub fn merge(mut self, source: &FlagSet) -> Result<Self> {
        for spec in source.iter() {
            if let Some((owner, existing)) = self.find(spec.name) {
                if existing.is_compatible(spec) {
                    continue;
                }
                return Err(conflict(spec.name, owner, existing, source.owner(), spec));
            }

            if let Some((owner, existing)) = spec
                .short
                .and_then(|short| self.flags.iter().find(|(_, f)| f.short == Some(short)))
            {
                return Err(conflict(spec.name, owner, existing, source.owner(), spec));
            }

            tracing::trace!(command = %self.name, flag = spec.name, owner = source.owner(), "merged flag");
            self.flags.push((source.owner().to_owned(), spec.clone()));
        }
        Ok(self)
    }

    pub fn find(&self, name: &str) -> Option<(&str, &FlagSpec)> {
        self.flags
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(owner, f)| (owner.as_str(), f))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn flags(&self) -> impl Iterator<Item = &FlagSpec> {
        self.flags.iter().map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

fn conflict(
    name: &str,
    existing_owner: &str,
    existing: &FlagSpec,
    incoming_owner: &str,
    incoming: &FlagSpec,
) -> Error {
    Error::FlagConflict {
        name: name.to_owned(),
        existing_owner: existing_owner.to_owned(),
        existing: format!("--{} {}", existing.name, existing.signature()),
        incoming_owner: incoming_owner.to_owned(),
        incoming: format!("--{} {}", incoming.name, incoming.signature()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_set() -> FlagSet {
        FlagSet::new("build")
            .flag(FlagSpec::value("yaml", "Path to YAML file").with_short('f'))
            .flag(FlagSpec::value("filter", "Wildcard to match function names"))
            .flag(FlagSpec::switch("no-cache", "Do not use the build cache"))
    }

    fn push_set() -> FlagSet {
        FlagSet::new("push")
            .flag(FlagSpec::value("yaml", "Path to the stack file").with_short('f'))
            .flag(FlagSpec::value("filter", "Wildcard to match function names"))
            .flag(FlagSpec::value("tag", "Tag format").with_default("latest"))
    }

    fn names(cmd: &CompositeCommand) -> Vec<&'static str> {
        cmd.flags().map(|f| f.name).collect()
    }

    #[test]
    fn merge_keeps_declaration_order_and_dedupes_shared_flags() {
        let cmd = CompositeCommand::new("up")
            .merge(&build_set())
            .unwrap()
            .merge(&push_set())
            .unwrap();

        assert_eq!(names(&cmd), vec!["yaml", "filter", "no-cache", "tag"]);
    }

    #[test]
    fn first_registration_wins_for_help_text() {
        let cmd = CompositeCommand::new("up")
            .merge(&build_set())
            .unwrap()
            .merge(&push_set())
            .unwrap();

        let (owner, yaml) = cmd.find("yaml").unwrap();
        assert_eq!(owner, "build");
        assert_eq!(yaml.help, "Path to YAML file");
    }

    #[test]
    fn merging_same_set_twice_is_idempotent() {
        let once = CompositeCommand::new("up").merge(&build_set()).unwrap();
        let twice = once.clone().merge(&build_set()).unwrap();

        assert_eq!(names(&once), names(&twice));
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn same_name_different_kind_is_rejected() {
        let bad = FlagSet::new("deploy").flag(FlagSpec::switch("filter", "Filter as a switch"));
        let err = CompositeCommand::new("up")
            .merge(&build_set())
            .unwrap()
            .merge(&bad)
            .unwrap_err();

        let msg = err.to_string();
        assert!(matches!(err, Error::FlagConflict { ref name, .. } if name == "filter"));
        assert!(msg.contains("build"), "got: {msg}");
        assert!(msg.contains("deploy"), "got: {msg}");
    }

    #[test]
    fn same_name_different_default_is_rejected() {
        let a = FlagSet::new("push").flag(FlagSpec::value("tag", "Tag").with_default("latest"));
        let b = FlagSet::new("deploy").flag(FlagSpec::value("tag", "Tag").with_default("sha"));

        let result = CompositeCommand::new("up").merge(&a).unwrap().merge(&b);
        assert!(matches!(result, Err(Error::FlagConflict { .. })));
    }

    #[test]
    fn short_alias_collision_is_rejected() {
        let a = FlagSet::new("build").flag(FlagSpec::value("yaml", "Stack file").with_short('f'));
        let b = FlagSet::new("deploy").flag(FlagSpec::switch("force", "Force").with_short('f'));

        let result = CompositeCommand::new("up").merge(&a).unwrap().merge(&b);
        assert!(matches!(result, Err(Error::FlagConflict { ref name, .. }) if name == "force"));
    }

    #[test]
    fn boolean_default_is_rendered_as_text() {
        let spec = FlagSpec::boolean("update", true, "Update in place");
        assert_eq!(spec.kind, FlagKind::Bool);
        assert_eq!(spec.default, Some("true"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const NAMES: &[&str] = &["yaml", "filter", "tag", "image", "name", "gateway"];

        fn spec() -> impl Strategy<Value = FlagSpec> {
            (0..NAMES.len(), 0..3usize).prop_map(|(i, k)| {
                let name = NAMES[i];
                match k {
                    0 => FlagSpec::switch(name, "switch"),
                    1 => FlagSpec::value(name, "value"),
                    _ => FlagSpec::repeated(name, "repeated"),
                }
            })
        }

        fn flag_set() -> impl Strategy<Value = FlagSet> {
            proptest::collection::vec(spec(), 0..6).prop_map(|specs| {
                specs
                    .into_iter()
                    .fold(FlagSet::new("source"), |set, s| set.flag(s))
            })
        }

        proptest! {
            #[test]
            fn merge_twice_equals_merge_once(set in flag_set()) {
                let once = CompositeCommand::new("up").merge(&set);
                let twice = CompositeCommand::new("up")
                    .merge(&set)
                    .and_then(|c| c.merge(&set));

                match (once, twice) {
                    (Ok(a), Ok(b)) => {
                        let a: Vec<_> = a.flags().cloned().collect();
                        let b: Vec<_> = b.flags().cloned().collect();
                        prop_assert_eq!(a, b);
                    }
                    (Err(_), Err(_)) => {}
                    (a, b) => prop_assert!(false, "diverged: {:?} vs {:?}", a.is_ok(), b.is_ok()),
                }
            }

            #[test]
            fn merged_names_are_unique(a in flag_set(), b in flag_set()) {
                if let Ok(cmd) = CompositeCommand::new("up").merge(&a).and_then(|c| c.merge(&b)) {
                    let mut names: Vec<_> = cmd.flags().map(|f| f.name).collect();
                    let total = names.len();
                    names.sort_unstable();
                    names.dedup();
                    prop_assert_eq!(names.len(), total);
                }
            }
        }
    }
}
