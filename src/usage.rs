//! Per-key resolution results.
//!
//! A [`KeyUsage`] is produced exactly once for every analyzed key and never
//! mutated after the classification pass. The scheduler writes each record
//! into its input-order slot, so the output order is always the key order
//! regardless of which worker finished first.

use std::fmt;

/// How a key was (or was not) found in the template corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageType {
    /// A literal `.Values.<key>` occurrence.
    Direct,
    /// Matched through one of the registered reference idioms, possibly via
    /// an ancestor of the key.
    Pattern,
    /// Never referenced itself, but at least one descendant key is used.
    Parent,
    /// No reference at any level.
    Unused,
}

impl fmt::Display for UsageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UsageType::Direct => "direct",
            UsageType::Pattern => "pattern",
            UsageType::Parent => "parent",
            UsageType::Unused => "unused",
        };
        f.write_str(s)
    }
}

/// The resolution result for one `values.yaml` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUsage {
    /// Dotted key path, e.g. `identityKeycloak.podSecurityContext.runAsUser`.
    pub key: String,
    pub is_used: bool,
    pub usage_type: UsageType,
    /// `file:line` locations of the matches, sorted for stable output.
    pub locations: Vec<String>,
    /// The (possibly shortened) key that actually matched a pattern.
    pub parent_key: Option<String>,
    /// Name of the idiom that matched, for `usage_type == Pattern`.
    pub pattern_name: Option<String>,
    /// Used descendants, filled in for `usage_type == Parent`.
    pub child_keys: Vec<String>,
}

impl KeyUsage {
    /// A record for a key with no match anywhere; the classifier may later
    /// promote it to [`UsageType::Parent`].
    pub fn unused(key: &str) -> Self {
        Self {
            key: key.to_string(),
            is_used: false,
            usage_type: UsageType::Unused,
            locations: Vec::new(),
            parent_key: None,
            pattern_name: None,
            child_keys: Vec::new(),
        }
    }

    pub fn direct(key: &str, locations: Vec<String>) -> Self {
        Self {
            is_used: true,
            usage_type: UsageType::Direct,
            locations,
            ..Self::unused(key)
        }
    }

    pub fn pattern(key: &str, pattern_name: &str, parent_key: String, locations: Vec<String>) -> Self {
        Self {
            is_used: true,
            usage_type: UsageType::Pattern,
            locations,
            parent_key: Some(parent_key),
            pattern_name: Some(pattern_name.to_string()),
            ..Self::unused(key)
        }
    }
}
