//! Aggregate classification: promoting structural parents.
//!
//! A key that is never referenced by its own path but has used descendants
//! is a namespacing container, not dead configuration. This pass reclassifies
//! such keys from `unused` to `parent` and records their used descendants.

use std::collections::HashSet;

use crate::usage::{KeyUsage, UsageType};

/// Promote unused keys with used descendants to [`UsageType::Parent`].
///
/// `used_keys` is the set of keys resolved as direct or pattern; a key is a
/// parent exactly when some used key has it as a strict path prefix (the
/// transitive definition bottoms out at a direct/pattern descendant). Keys
/// left `unused` afterwards are the ones reported as orphaned.
pub fn promote_parent_keys(usages: &mut [KeyUsage], used_keys: &HashSet<String>) {
    let mut used_leaves: Vec<&String> = used_keys.iter().collect();
    used_leaves.sort();

    for usage in usages.iter_mut() {
        if usage.usage_type != UsageType::Unused {
            continue;
        }
        let prefix = format!("{}.", usage.key);
        let children: Vec<String> = used_leaves
            .iter()
            .filter(|leaf| leaf.starts_with(&prefix))
            .map(|leaf| leaf.to_string())
            .collect();
        if !children.is_empty() {
            usage.usage_type = UsageType::Parent;
            usage.child_keys = children;
        }
    }
}
