//! End-to-end tests of the resolution engine over real template corpora.
//!
//! These tests drive the library through a real search subprocess (ripgrep
//! when available, grep otherwise) against fixture templates in a tempdir.
//! They are skipped when neither tool is installed.

use std::fs;
use std::path::Path;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};

use chartsweep::classify::promote_parent_keys;
use chartsweep::patterns::Patterns;
use chartsweep::search::backend::{SearchBackend, SearchTool, detect_ripgrep, tool_available};
use chartsweep::search::resolver::Resolver;
use chartsweep::search::scheduler::analyze_keys;
use chartsweep::usage::UsageType;

fn pick_tool() -> Option<SearchTool> {
    if detect_ripgrep() {
        Some(SearchTool::Ripgrep)
    } else if tool_available("grep") {
        Some(SearchTool::Grep)
    } else {
        eprintln!("neither rg nor grep available, skipping");
        None
    }
}

fn corpus(files: &[(&str, &str)]) -> TempDir {
    let dir = tempdir().expect("create tempdir");
    for (name, content) in files {
        fs::write(dir.path().join(name), content).expect("write fixture");
    }
    dir
}

fn backend(root: &Path, tool: SearchTool) -> SearchBackend {
    SearchBackend::new(root, tool, Duration::from_secs(10), false, false)
}

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

#[test]
fn direct_reference_and_unused_sibling() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[("config.yaml", "value: {{ .Values.foo.bar }}\n")]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let (usages, used) =
        analyze_keys(&keys(&["foo.bar", "foo.baz"]), &resolver, Some(1), false).unwrap();

    assert_eq!(usages.len(), 2);
    assert_eq!(usages[0].key, "foo.bar");
    assert_eq!(usages[0].usage_type, UsageType::Direct);
    assert!(!usages[0].locations.is_empty());
    assert_eq!(usages[1].key, "foo.baz");
    assert_eq!(usages[1].usage_type, UsageType::Unused);
    assert!(used.contains("foo.bar"));
    assert!(!used.contains("foo.baz"));
}

#[test]
fn security_context_idiom_with_hierarchical_fallback() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "deployment.yaml",
        r#"securityContext: {{ include "common.compatibility.renderSecurityContext" (dict "secContext" .Values.test.containerSecurityContext "context" $) }}"#,
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    // The leaf key never appears literally; the idiom matches after the
    // fallback shortens it to the ancestor object.
    let matched = resolver
        .match_with_idiom("security_context", "test.containerSecurityContext.capabilities.drop.0")
        .unwrap();
    let (parent, locations) = matched.expect("idiom should match after fallback");
    assert_eq!(parent, "test.containerSecurityContext");
    assert_eq!(locations.len(), 1);

    let usage = resolver
        .resolve("test.containerSecurityContext.capabilities.drop.0")
        .unwrap();
    assert_eq!(usage.usage_type, UsageType::Pattern);
    assert_eq!(usage.pattern_name.as_deref(), Some("security_context"));
    assert_eq!(usage.parent_key.as_deref(), Some("test.containerSecurityContext"));
}

#[test]
fn toyaml_idiom_matches_sub_object_dump() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "configmap.yaml",
        "data: {{ toYaml .Values.test.containerSecurityContext | nindent 4 }}\n",
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let usage = resolver
        .resolve("test.containerSecurityContext.capabilities.drop.0")
        .unwrap();
    assert_eq!(usage.usage_type, UsageType::Pattern);
    assert_eq!(usage.pattern_name.as_deref(), Some("toyaml"));
    assert_eq!(usage.parent_key.as_deref(), Some("test.containerSecurityContext"));
}

#[test]
fn keycloak_rewrite_resolves_through_template_name() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "keycloak.yaml",
        r#"podSecurityContext: {{ include "common.compatibility.renderSecurityContext" (dict "secContext" .Values.identity.podSecurityContext "context" $) }}"#,
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    // The schema says identityKeycloak but templates reference identity.
    let usage = resolver
        .resolve("identityKeycloak.podSecurityContext.runAsUser")
        .unwrap();
    assert_eq!(usage.usage_type, UsageType::Pattern);
    assert_eq!(usage.pattern_name.as_deref(), Some("security_context"));
    assert_eq!(usage.parent_key.as_deref(), Some("identity.podSecurityContext"));
}

#[test]
fn image_by_params_requires_image_segment() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "deployment.yaml",
        r#"image: {{ include "camundaPlatform.imageByParams" (dict "base" .Values.global "overlay" .Values.tasklist) }}"#,
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    // Pre-filter: the idiom only applies to keys containing "image".
    assert!(resolver.match_with_idiom("imageByParams", "tasklist").unwrap().is_none());

    let matched = resolver.match_with_idiom("imageByParams", "tasklist.image").unwrap();
    let (parent, _) = matched.expect("should match after fallback to the component key");
    assert_eq!(parent, "tasklist");
}

#[test]
fn sub_chart_image_pull_secrets_idiom() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "secrets.yaml",
        r#"imagePullSecrets: {{ include "camundaPlatform.subChartImagePullSecrets" (dict "Values" (set (deepCopy .Values) "image" .Values.connectors.image)) }}"#,
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let matched = resolver.match_with_idiom("subChartImagePullSecrets", "connectors.image").unwrap();
    let (parent, locations) = matched.expect("idiom should match");
    assert_eq!(parent, "connectors.image");
    assert_eq!(locations.len(), 1);
}

#[test]
fn include_context_idiom_via_service_account_rewrite() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[(
        "serviceaccount.yaml",
        r#"serviceAccountName: {{ include "tasklist.serviceAccountName" . }}"#,
    )]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let usage = resolver.resolve("tasklist.serviceAccount.name").unwrap();
    assert_eq!(usage.usage_type, UsageType::Pattern);
    assert_eq!(usage.pattern_name.as_deref(), Some("include_context"));
    assert_eq!(usage.parent_key.as_deref(), Some("tasklist.serviceAccountName"));
}

#[test]
fn parent_promotion_over_full_run() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[("app.yaml", "replicas: {{ .Values.a.b }}\n")]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let (mut usages, used) = analyze_keys(&keys(&["a.b", "a"]), &resolver, Some(2), false).unwrap();
    promote_parent_keys(&mut usages, &used);

    assert_eq!(usages[0].usage_type, UsageType::Direct);
    assert_eq!(usages[1].key, "a");
    assert_eq!(usages[1].usage_type, UsageType::Parent);
    assert_eq!(usages[1].child_keys, vec!["a.b"]);
}

#[test]
fn results_are_deterministic_across_pool_sizes() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[
        ("one.yaml", "a: {{ .Values.alpha.one }}\nb: {{ .Values.beta }}\n"),
        ("two.yaml", "c: {{ toYaml .Values.gamma | nindent 2 }}\n"),
    ]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let key_list = keys(&[
        "alpha.one",
        "alpha.two",
        "beta",
        "gamma.retention.days",
        "delta.unused",
        "alpha",
    ]);

    let (sequential, _) = analyze_keys(&key_list, &resolver, Some(1), false).unwrap();
    for pool_size in [2, 8] {
        let (parallel, _) = analyze_keys(&key_list, &resolver, Some(pool_size), false).unwrap();
        assert_eq!(sequential, parallel, "pool size {pool_size} changed the results");
    }

    // Order always follows input order, and nothing is dropped or duplicated.
    let result_keys: Vec<&str> = sequential.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(result_keys, vec!["alpha.one", "alpha.two", "beta", "gamma.retention.days", "delta.unused", "alpha"]);
}

#[test]
fn empty_keys_are_skipped_not_errors() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[("app.yaml", "x: {{ .Values.present }}\n")]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    let (usages, _) = analyze_keys(
        &keys(&["present", "", "absent"]),
        &resolver,
        Some(2),
        false,
    )
    .unwrap();
    let result_keys: Vec<&str> = usages.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(result_keys, vec!["present", "absent"]);
}

#[test]
fn unknown_idiom_name_aborts_the_run() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[("app.yaml", "x: 1\n")]);
    let patterns = Patterns::builtins();
    let backend = backend(dir.path(), tool);
    let resolver = Resolver::new(&backend, &patterns, false);

    // An unregistered idiom lookup is a registry/resolver mismatch and is
    // surfaced as an error, not a silent wrong regex.
    let err = resolver.match_with_idiom("bogus", "a.b").unwrap_err();
    assert!(err.to_string().contains("bogus"));
}

#[test]
fn timeout_degrades_to_no_match() {
    let Some(tool) = pick_tool() else { return };
    let dir = corpus(&[("app.yaml", "x: {{ .Values.slow }}\n")]);
    // A zero timeout forces every call onto the kill path.
    let backend = SearchBackend::new(dir.path(), tool, Duration::from_millis(0), false, false);
    assert!(backend.search(r"\.Values\.slow").is_empty());
}
