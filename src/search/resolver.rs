//! Classification of a single key as direct / pattern / unused.
//!
//! The resolver first looks for a literal `.Values.<key>` reference. Failing
//! that, it walks the idiom registry in registration order; for each
//! applicable idiom it builds the idiom's regex for the key and, when the
//! exact key has no match, retries with the key progressively shortened by
//! one trailing segment. That fallback models a whole sub-object being
//! passed to a helper by an ancestor key, which makes every leaf beneath it
//! legitimately used.
//!
//! The "parent" classification is not decided here; it is derived from the
//! aggregate of all per-key results in [`crate::classify`].

use anyhow::Result;
use colored::Colorize;

use crate::patterns::{Patterns, escape_key};
use crate::search::backend::SearchBackend;
use crate::usage::KeyUsage;

/// Schema-to-template naming corrections. The values schema does not always
/// match the identifier templates use, for historical and compatibility
/// reasons; this is a finite lookup, not a general transform.
const IDENTITY_KEYCLOAK_SUBTREES: &[&str] = &[
    "identityKeycloak.postgresql",
    "identityKeycloak.resources",
    "identityKeycloak.containerSecurityContext",
    "identityKeycloak.podSecurityContext",
    "identityKeycloak.ingress",
];

pub fn rewrite_key(key: &str) -> String {
    if IDENTITY_KEYCLOAK_SUBTREES.iter().any(|prefix| key.contains(prefix)) {
        key.replace("identityKeycloak.", "identity.")
    } else if key.contains("zeebe-gateway.") {
        key.replace("zeebe-gateway.", "zeebeGateway.")
    } else if key.contains("serviceAccount.name") {
        key.replace("serviceAccount.name", "serviceAccountName")
    } else {
        key.to_string()
    }
}

/// Classifies keys against one corpus via one search backend.
pub struct Resolver<'a> {
    backend: &'a SearchBackend,
    patterns: &'a Patterns,
    debug: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(backend: &'a SearchBackend, patterns: &'a Patterns, debug: bool) -> Self {
        Self {
            backend,
            patterns,
            debug,
        }
    }

    /// Produce the [`KeyUsage`] record for one key.
    ///
    /// Errors only on a registry/resolver mismatch (unknown idiom name),
    /// which aborts the whole run; search failures never surface here.
    pub fn resolve(&self, key: &str) -> Result<KeyUsage> {
        let matches = self.direct_matches(key);
        if !matches.is_empty() {
            return Ok(KeyUsage::direct(key, matches));
        }

        for name in self.patterns.names() {
            if let Some((parent_key, locations)) = self.match_with_idiom(name, key)? {
                return Ok(KeyUsage::pattern(key, name, parent_key, locations));
            }
        }

        Ok(KeyUsage::unused(key))
    }

    /// Test one idiom against one key: applicability pre-filter, naming
    /// rewrite, then the fallback search. Returns the (possibly shortened)
    /// key that matched and the match locations.
    pub fn match_with_idiom(&self, name: &str, key: &str) -> Result<Option<(String, Vec<String>)>> {
        let pattern = self.patterns.get(name)?;
        if !pattern.applies_to(key) {
            return Ok(None);
        }
        let local_key = rewrite_key(key);
        // The rewrite can move the key out of an idiom's scope; re-check.
        if !pattern.applies_to(&local_key) {
            return Ok(None);
        }
        self.pattern_matches(name, &local_key)
    }

    /// Literal `.Values.<key>` search across the whole corpus.
    fn direct_matches(&self, key: &str) -> Vec<String> {
        let pattern = format!(r"\.Values\.{}", escape_key(key));
        self.backend.search(&pattern)
    }

    /// Try one idiom for the key, with hierarchical fallback: drop trailing
    /// path segments until a match is found or one segment remains. At most
    /// N attempts for an N-segment key.
    fn pattern_matches(&self, name: &str, key: &str) -> Result<Option<(String, Vec<String>)>> {
        let mut segments: Vec<&str> = key.split('.').collect();
        loop {
            let candidate = segments.join(".");
            let regex = self.patterns.regex_for(name, &candidate)?;
            let matches = self.backend.search(&regex);
            if self.debug {
                eprintln!(
                    "{} idiom={name} candidate={candidate} matches={}",
                    "resolve:".cyan().bold(),
                    matches.len()
                );
            }
            if !matches.is_empty() {
                return Ok(Some((candidate, matches)));
            }
            if segments.len() <= 1 {
                return Ok(None);
            }
            segments.pop();
        }
    }
}
