//! Rendering of analysis results.
//!
//! Two formats: a colored human-readable report and a JSON document with a
//! summary plus the unused key lists (for CI). Either can be written to
//! stdout or to a file.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::search::backend::SearchTool;
use crate::usage::{KeyUsage, UsageType};

/// Messaging helper honoring quiet mode. Results themselves are printed
/// unconditionally; these are the informational lines around them.
#[derive(Debug, Clone, Copy)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.cyan());
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.green());
        }
    }

    pub fn warning(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{}", msg.yellow());
        }
    }

    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red().bold());
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub total_keys: usize,
    pub used_keys: usize,
    pub unused_keys: usize,
    pub unused_parent_keys: usize,
    pub unused_completely_keys: usize,
}

impl ResultSummary {
    pub fn from_usages(usages: &[KeyUsage]) -> Self {
        let mut summary = Self {
            total_keys: usages.len(),
            ..Self::default()
        };
        for usage in usages {
            match usage.usage_type {
                UsageType::Direct | UsageType::Pattern => summary.used_keys += 1,
                UsageType::Parent => summary.unused_parent_keys += 1,
                UsageType::Unused => summary.unused_completely_keys += 1,
            }
        }
        summary.unused_keys = summary.unused_parent_keys + summary.unused_completely_keys;
        summary
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    timestamp: String,
    summary: ResultSummary,
    unused_parent_keys: &'a [String],
    unused_completely_keys: &'a [String],
}

#[derive(Debug, Serialize)]
struct AllKeysJsonReport<'a> {
    timestamp: String,
    summary: ResultSummary,
    directly_used_keys: &'a [String],
    pattern_used_keys: &'a [String],
    unused_parent_keys: &'a [String],
    unused_completely_keys: &'a [String],
}

pub fn keys_of_type(usages: &[KeyUsage], usage_type: UsageType) -> Vec<String> {
    usages
        .iter()
        .filter(|u| u.usage_type == usage_type)
        .map(|u| u.key.clone())
        .collect()
}

/// Renders the classified results in the configured format.
pub struct Reporter {
    json_output: bool,
    output_file: Option<PathBuf>,
    show_all_keys: bool,
    show_test_commands: bool,
    search_tool: SearchTool,
}

impl Reporter {
    pub fn new(
        json_output: bool,
        output_file: Option<PathBuf>,
        show_all_keys: bool,
        show_test_commands: bool,
        search_tool: SearchTool,
    ) -> Self {
        Self {
            json_output,
            output_file,
            show_all_keys,
            show_test_commands,
            search_tool,
        }
    }

    pub fn report(&self, usages: &[KeyUsage]) -> Result<()> {
        let summary = ResultSummary::from_usages(usages);
        let direct = keys_of_type(usages, UsageType::Direct);
        let pattern = keys_of_type(usages, UsageType::Pattern);
        let parent = keys_of_type(usages, UsageType::Parent);
        let unused = keys_of_type(usages, UsageType::Unused);

        if self.json_output {
            let json = if self.show_all_keys {
                serde_json::to_string_pretty(&AllKeysJsonReport {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    summary,
                    directly_used_keys: &direct,
                    pattern_used_keys: &pattern,
                    unused_parent_keys: &parent,
                    unused_completely_keys: &unused,
                })?
            } else {
                serde_json::to_string_pretty(&JsonReport {
                    timestamp: chrono::Utc::now().to_rfc3339(),
                    summary,
                    unused_parent_keys: &parent,
                    unused_completely_keys: &unused,
                })?
            };
            return self.emit(&json);
        }

        let usage_map: HashMap<&str, &KeyUsage> =
            usages.iter().map(|u| (u.key.as_str(), u)).collect();

        let mut out = String::new();
        if self.show_all_keys {
            self.render_all_keys(&mut out, &summary, &direct, &pattern, &parent, &unused, &usage_map);
        } else {
            self.render_unused(&mut out, &summary, &unused, &usage_map);
        }
        self.render_summary(&mut out, &summary);
        self.emit(&out)
    }

    fn emit(&self, body: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => fs::write(path, body)
                .with_context(|| format!("failed to write report to {}", path.display())),
            None => {
                println!("{body}");
                Ok(())
            }
        }
    }

    fn render_unused(
        &self,
        out: &mut String,
        summary: &ResultSummary,
        unused: &[String],
        usage_map: &HashMap<&str, &KeyUsage>,
    ) {
        if summary.unused_keys == 0 {
            out.push_str(&format!(
                "{}\n",
                "No unused keys found in values.yaml.".green()
            ));
            return;
        }
        out.push_str(&format!(
            "{}\n\n",
            "Unused keys found in values.yaml:".red().bold()
        ));

        let mut used: Vec<&str> = usage_map
            .values()
            .filter(|u| u.is_used)
            .map(|u| u.key.as_str())
            .collect();
        used.sort_unstable();
        if !used.is_empty() {
            out.push_str(&format!("{}\n", format!("Used keys ({}):", used.len()).bold()));
            for key in used {
                if let Some(usage) = usage_map.get(key) {
                    out.push_str(&format!("  {}\n", format_used_key(usage)));
                }
            }
            out.push('\n');
        }

        self.render_unused_section(out, summary, unused);
    }

    #[allow(clippy::too_many_arguments)]
    fn render_all_keys(
        &self,
        out: &mut String,
        summary: &ResultSummary,
        direct: &[String],
        pattern: &[String],
        parent: &[String],
        unused: &[String],
        usage_map: &HashMap<&str, &KeyUsage>,
    ) {
        out.push_str(&format!("{}\n\n", "All keys in values.yaml:".cyan()));

        if !direct.is_empty() {
            out.push_str(&format!(
                "{}\n",
                format!("Directly used keys ({}):", direct.len()).bold()
            ));
            for key in direct {
                if let Some(usage) = usage_map.get(key.as_str()) {
                    out.push_str(&format!("  {}\n", format_used_key(usage)));
                }
            }
            out.push('\n');
        }

        if !pattern.is_empty() {
            out.push_str(&format!(
                "{}\n",
                format!("Keys used via patterns ({}):", pattern.len()).bold()
            ));
            for key in pattern {
                if let Some(usage) = usage_map.get(key.as_str()) {
                    out.push_str(&format!("  {}\n", format_used_key(usage)));
                }
            }
            out.push('\n');
        }

        if !parent.is_empty() {
            out.push_str(&format!(
                "{}\n",
                format!("Parents of used keys ({}):", parent.len()).bold()
            ));
            for key in parent {
                let line = match usage_map.get(key.as_str()) {
                    Some(usage) if !usage.child_keys.is_empty() => format!(
                        "  {} {} e.g., {}",
                        format!(".Values.{key}").yellow(),
                        format!("(has {} child keys)", usage.child_keys.len()).cyan(),
                        format!(".Values.{}", usage.child_keys[0]).cyan()
                    ),
                    _ => format!("  {}", format!(".Values.{key}").yellow()),
                };
                out.push_str(&line);
                out.push('\n');
            }
            out.push('\n');
        }

        self.render_unused_section(out, summary, unused);
    }

    fn render_unused_section(&self, out: &mut String, summary: &ResultSummary, unused: &[String]) {
        if summary.unused_completely_keys == 0 {
            return;
        }
        out.push_str(&format!(
            "{}\n",
            format!("Completely unused keys ({}):", summary.unused_completely_keys).bold()
        ));
        for key in unused {
            if self.show_test_commands {
                out.push_str(&format!(
                    "  {}  {}\n",
                    format!(".Values.{key}").red(),
                    format!("(Test with: {})", self.test_command(key)).dimmed()
                ));
            } else {
                out.push_str(&format!("  {}\n", format!(".Values.{key}").red()));
            }
        }
        out.push('\n');
    }

    fn render_summary(&self, out: &mut String, summary: &ResultSummary) {
        out.push_str(&format!("{}\n", "Usage summary:".bold()));
        out.push_str(&format!(
            "  {}  |  {}  |  {}  |  {}\n",
            format!("Total keys: {}", summary.total_keys).cyan(),
            format!("Used: {}", summary.used_keys).green(),
            format!("Parent: {}", summary.unused_parent_keys).yellow(),
            format!("Unused: {}", summary.unused_completely_keys).red(),
        ));
    }

    /// A copy-pasteable command reproducing the direct check for one key.
    fn test_command(&self, key: &str) -> String {
        let pattern = format!(r"\.Values\.{}", crate::patterns::escape_key(key));
        match self.search_tool {
            SearchTool::Ripgrep => format!(
                "rg --no-heading --with-filename --line-number -e '{pattern}' templates/"
            ),
            SearchTool::Grep => format!("grep -r -n -E -e '{pattern}' templates/"),
        }
    }
}

/// `.Values.key (via pattern) → file:line (+N more)` for used keys.
fn format_used_key(usage: &KeyUsage) -> String {
    let mut line = format!(".Values.{}", usage.key).green().to_string();
    if usage.usage_type == UsageType::Pattern
        && let Some(name) = &usage.pattern_name
    {
        line.push_str(&format!(" {}", format!("(via {name})").cyan()));
    }
    if let Some(location) = usage.locations.first() {
        match location.rsplit_once(':') {
            Some((file, line_no)) => {
                line.push_str(&format!(" → {}{}", file.cyan(), format!(":{line_no}").bold()));
            }
            None => line.push_str(&format!(" → {location}")),
        }
        if usage.locations.len() > 1 {
            line.push_str(&format!(" (+{} more)", usage.locations.len() - 1));
        }
    }
    line
}
