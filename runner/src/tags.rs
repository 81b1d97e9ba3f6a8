//! Tag-based migration selection.
//!
//! A migration carries zero or more tag groups; a run carries a set of
//! active tags. Untagged migrations always run. A tagged migration runs when
//! its `RequireAll` groups together cover every active tag, or when its
//! `RequireAny` groups together contain at least one of them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How the names of a [`TagGroup`] are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagBehavior {
    /// Every active tag must be among the names.
    #[default]
    RequireAll,
    /// At least one active tag must be among the names.
    RequireAny,
}

/// A set of tag names attached to a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroup {
    pub names: Vec<String>,
    #[serde(default)]
    pub behavior: TagBehavior,
}

impl TagGroup {
    /// A `RequireAll` group.
    pub fn all<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            behavior: TagBehavior::RequireAll,
        }
    }

    /// A `RequireAny` group.
    pub fn any<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            behavior: TagBehavior::RequireAny,
        }
    }
}

/// Decides whether a migration with `groups` runs under `active` tags.
///
/// # Examples
///
/// ```
/// use migrator_runner::{TagGroup, tags_match};
///
/// let both = [TagGroup::all(["TenantA", "TenantB"])];
/// assert!(tags_match(&both, &["TenantA".to_string()]));
/// assert!(tags_match(&both, &["TenantA".to_string(), "TenantB".to_string()]));
///
/// let only_a = [TagGroup::all(["TenantA"])];
/// assert!(!tags_match(&only_a, &["TenantA".to_string(), "TenantB".to_string()]));
///
/// // Untagged always runs, tagged never runs without active tags
/// assert!(tags_match(&[], &[]));
/// assert!(!tags_match(&only_a, &[]));
/// ```
pub fn tags_match(groups: &[TagGroup], active: &[String]) -> bool {
    if groups.iter().all(|g| g.names.is_empty()) {
        return true;
    }
    if active.is_empty() {
        return false;
    }

    let union = |behavior: TagBehavior| -> HashSet<&str> {
        groups
            .iter()
            .filter(|g| g.behavior == behavior)
            .flat_map(|g| g.names.iter().map(String::as_str))
            .collect()
    };

    let all = union(TagBehavior::RequireAll);
    if !all.is_empty() && active.iter().all(|tag| all.contains(tag.as_str())) {
        return true;
    }

    let any = union(TagBehavior::RequireAny);
    active.iter().any(|tag| any.contains(tag.as_str()))
}
