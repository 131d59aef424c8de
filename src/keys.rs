//! Key extraction from `values.yaml`.
//!
//! The schema is piped through `yq` (YAML to JSON) and `jq` (scalar path
//! flattening), each invoked as an external process. The engine treats this
//! pipeline as a black box producing deduplicated dot-path strings; any
//! failure here is fatal and surfaced before scheduling begins.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::search::backend::tool_available;

/// jq filter flattening every scalar leaf into its dotted path.
const JQ_SCALAR_PATHS: &str =
    r#"[paths(scalars) as $p | {($p | join(".")): getpath($p)}] | add | keys[]"#;

/// Fail fast if the extraction tools are missing from PATH.
pub fn check_dependencies() -> Result<()> {
    let mut missing = Vec::new();
    for tool in ["yq", "jq"] {
        if !tool_available(tool) {
            missing.push(tool);
        }
    }
    if !missing.is_empty() {
        bail!("missing required dependencies: {}", missing.join(", "));
    }
    Ok(())
}

pub fn validate_directory(dir: &Path) -> Result<()> {
    let meta = dir
        .metadata()
        .with_context(|| format!("directory {} not found", dir.display()))?;
    if !meta.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    Ok(())
}

pub fn validate_file(file: &Path) -> Result<()> {
    let meta = file
        .metadata()
        .with_context(|| format!("file {} not found", file.display()))?;
    if meta.is_dir() {
        bail!("{} is a directory, not a file", file.display());
    }
    Ok(())
}

/// Extracts and filters the leaf key paths of a values schema.
pub struct Extractor {
    debug: bool,
}

impl Extractor {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Extract every scalar leaf path from `values_file`.
    pub fn extract_keys(&self, values_file: &Path) -> Result<Vec<String>> {
        validate_file(values_file)?;

        let yq = Command::new("yq")
            .arg("eval")
            .arg(values_file)
            .args(["-o", "json"])
            .stdin(Stdio::null())
            .output()
            .context("failed to run yq")?;
        if !yq.status.success() {
            bail!(
                "yq failed on {}: {}",
                values_file.display(),
                String::from_utf8_lossy(&yq.stderr).trim()
            );
        }

        let mut jq = Command::new("jq")
            .arg(JQ_SCALAR_PATHS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("failed to run jq")?;
        jq.stdin
            .take()
            .context("jq stdin unavailable")?
            .write_all(&yq.stdout)
            .context("failed to feed jq")?;
        let jq = jq.wait_with_output().context("failed to wait for jq")?;
        if !jq.status.success() {
            bail!(
                "jq failed to flatten the schema: {}",
                String::from_utf8_lossy(&jq.stderr).trim()
            );
        }

        let keys = parse_key_lines(&String::from_utf8_lossy(&jq.stdout));
        if keys.is_empty() {
            bail!("no keys extracted from {}", values_file.display());
        }
        if self.debug {
            eprintln!("{}", format!("extracted {} keys", keys.len()).dimmed());
        }
        Ok(keys)
    }

    /// Keep only keys containing `pattern`.
    pub fn filter_keys(&self, keys: Vec<String>, pattern: &str) -> Vec<String> {
        if pattern.is_empty() {
            return keys;
        }
        let total = keys.len();
        let filtered: Vec<String> = keys.into_iter().filter(|k| k.contains(pattern)).collect();
        if self.debug {
            eprintln!(
                "{}",
                format!("filtered keys: {}/{} match '{}'", filtered.len(), total, pattern).dimmed()
            );
        }
        filtered
    }
}

/// One quoted key per jq output line; strip quotes, drop empties.
fn parse_key_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim().trim_matches('"'))
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}
