//! The registry of reference idioms.
//!
//! Besides a literal `.Values.<key>` occurrence (checked by the resolver
//! itself), Helm templates reference values through a handful of helper
//! idioms: `with` blocks, `toYaml | nindent` dumps, image helpers, and so
//! on. Each idiom is a named regex *prefix* plus a suffix rule; the resolver
//! completes the regex with the (escaped) key in between.
//!
//! Registration order is significant: the resolver tries idioms in order and
//! the first match wins, so more specific idioms are registered before the
//! generic `include` catch-all. Non-redundancy of the idioms is a design
//! assumption, not enforced at runtime.
//!
//! Every template must stay valid both for the `regex` crate (ripgrep) and
//! for GNU `grep -E`, which is why braces and parens are always escaped.

use anyhow::{Result, bail};

/// One named reference idiom.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: &'static str,
    /// Regex fragment placed before the escaped key.
    pub template: &'static str,
    /// Regex fragment placed after the escaped key.
    pub suffix: &'static str,
    /// Applicability pre-filter: the idiom is only tried for keys containing
    /// this substring. Skipping inapplicable keys avoids searches that can
    /// never match.
    pub requires: Option<&'static str>,
}

impl Pattern {
    pub fn applies_to(&self, key: &str) -> bool {
        match self.requires {
            Some(needle) => key.contains(needle),
            None => true,
        }
    }

    /// Complete the idiom's regex for one concrete key.
    pub fn build_regex(&self, key: &str) -> String {
        format!("{}{}{}", self.template, escape_key(key), self.suffix)
    }
}

/// Escape a dotted key path for use inside a regex. Dots are the common
/// case, but annotation keys can carry slashes and other metacharacters too.
pub fn escape_key(key: &str) -> String {
    regex::escape(key)
}

/// Ordered, read-only-after-construction idiom registry.
#[derive(Debug, Default)]
pub struct Patterns {
    entries: Vec<Pattern>,
}

impl Patterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in idioms, in matching priority order.
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        // Whole sub-object pulled into scope: `{{- with .Values.foo }}`.
        registry.register(Pattern {
            name: "with_context",
            template: r"\{\{-?\s*with\s+\.Values\.",
            suffix: r"\s*\}\}",
            requires: None,
        });
        // Sub-object dumped verbatim: `{{ toYaml .Values.foo | nindent 4 }}`.
        registry.register(Pattern {
            name: "toyaml",
            template: r"toYaml\s+\.Values\.",
            suffix: r"\s*\|\s*nindent",
            requires: None,
        });
        // Parametrized image helper taking the component as overlay:
        // `{{ include "camundaPlatform.imageByParams" (dict "base" .Values.global "overlay" .Values.connectors) }}`.
        registry.register(Pattern {
            name: "imageByParams",
            template: r#"imageByParams"\s+\(dict\s+"base"\s+\.Values\.global\s+"overlay"\s+\.Values\."#,
            suffix: r"\s*\)",
            requires: Some("image"),
        });
        // Sub-chart pull-secret composition grafting the component image
        // onto a values copy.
        registry.register(Pattern {
            name: "subChartImagePullSecrets",
            template: r#"subChartImagePullSecrets"\s+\(dict\s+"Values"\s+\(set\s+\(deepCopy\s+\.Values\)\s+"image"\s+\.Values\."#,
            suffix: r"\)\)\s*\}\}",
            requires: None,
        });
        // Security-context blocks rendered through the compatibility helper:
        // `{{ include "common.compatibility.renderSecurityContext" (dict "secContext" .Values.x "context" $) }}`.
        registry.register(Pattern {
            name: "security_context",
            template: r#"renderSecurityContext"\s+\(dict\s+"secContext"\s+\.Values\."#,
            suffix: r#".*"context""#,
            requires: Some("SecurityContext"),
        });
        // Generic named-template invocation, e.g. a serviceAccountName
        // helper included by its dotted name.
        registry.register(Pattern {
            name: "include_context",
            template: r#"include\s+""#,
            suffix: r#"""#,
            requires: Some("name"),
        });
        registry
    }

    pub fn register(&mut self, pattern: Pattern) {
        self.entries.push(pattern);
    }

    /// Idiom names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|p| p.name).collect()
    }

    /// Look up an idiom by name. An unknown name is a registry/resolver
    /// mismatch that no input data can cause, so it fails loudly.
    pub fn get(&self, name: &str) -> Result<&Pattern> {
        match self.entries.iter().find(|p| p.name == name) {
            Some(pattern) => Ok(pattern),
            None => bail!("unknown pattern name: {name}"),
        }
    }

    /// Build the full regex for `name` applied to `key`.
    pub fn regex_for(&self, name: &str, key: &str) -> Result<String> {
        Ok(self.get(name)?.build_regex(key))
    }
}
