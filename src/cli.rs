//! Command-line interface and run orchestration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use walkdir::WalkDir;

use crate::classify::promote_parent_keys;
use crate::config::{RunConfig, SearchToolChoice};
use crate::keys::{self, Extractor};
use crate::patterns::Patterns;
use crate::report::{Console, Reporter, ResultSummary};
use crate::search::backend::{SearchBackend, SearchTool};
use crate::search::resolver::Resolver;
use crate::search::scheduler::analyze_keys;

/// Check for unused values in Helm charts.
///
/// Identifies values.yaml keys that are never referenced in the chart's
/// templates, either literally or through the known helper idioms. If
/// ripgrep (rg) is installed it is used for faster searching.
#[derive(Debug, Parser)]
#[command(name = "chartsweep", version, about, long_about = None)]
pub struct Arguments {
    /// Chart templates directory (values.yaml is expected next to it)
    pub templates_dir: PathBuf,

    /// Disable colored output
    #[arg(long)]
    pub no_colors: bool,

    /// Show all keys (used and unused), not just unused ones
    #[arg(long)]
    pub show_all_keys: bool,

    /// Output results in JSON format (useful for CI)
    #[arg(long)]
    pub json: bool,

    /// Write results to the specified file
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Exit code to use when unused values are found (0 = never fail)
    #[arg(long, default_value_t = 0)]
    pub exit_code: u8,

    /// Suppress all output except results and errors
    #[arg(long)]
    pub quiet: bool,

    /// Only analyze keys containing the given substring
    #[arg(long)]
    pub filter: Option<String>,

    /// Enable verbose debug logging
    #[arg(long)]
    pub debug: bool,

    /// Timeout for a single grep/ripgrep call, in seconds
    #[arg(long, default_value_t = 5)]
    pub grep_timeout: u64,

    /// Search tool to use
    #[arg(long, value_enum, default_value_t = SearchToolChoice::Auto)]
    pub search_tool: SearchToolChoice,

    /// Run search commands through a shell (troubleshooting only)
    #[arg(long)]
    pub use_shell: bool,

    /// Show a verification command for each unused key
    #[arg(long)]
    pub show_test_commands: bool,

    /// Number of parallel workers (0 = auto based on CPU cores)
    #[arg(long, default_value_t = 0)]
    pub parallelism: usize,
}

impl Arguments {
    pub fn into_config(self) -> RunConfig {
        RunConfig {
            templates_dir: self.templates_dir,
            no_colors: self.no_colors,
            show_all_keys: self.show_all_keys,
            json_output: self.json,
            output_file: self.output_file,
            exit_code_on_unused: self.exit_code,
            quiet: self.quiet,
            filter: self.filter,
            debug: self.debug,
            search_timeout: Duration::from_secs(self.grep_timeout),
            search_tool: self.search_tool,
            use_shell: self.use_shell,
            show_test_commands: self.show_test_commands,
            parallelism: (self.parallelism > 0).then_some(self.parallelism),
        }
    }
}

/// Run the full analysis for a parsed command line.
pub fn run(args: Arguments) -> Result<ExitCode> {
    let config = args.into_config();
    if config.no_colors {
        colored::control::set_override(false);
    }
    let console = Console::new(config.quiet);

    keys::validate_directory(&config.templates_dir)
        .context("invalid templates directory")?;
    if let Err(err) = keys::check_dependencies() {
        console.error(&err.to_string());
        return Err(err);
    }

    let (tool, rg_missing) = SearchTool::select(config.search_tool);
    match (config.search_tool, tool) {
        _ if rg_missing => {
            console.warning("Ripgrep was specified but not found, falling back to grep")
        }
        (SearchToolChoice::Auto, SearchTool::Ripgrep) => {
            console.success("Using ripgrep for faster searching")
        }
        (SearchToolChoice::Auto, SearchTool::Grep) => {
            console.warning("Ripgrep not found, using grep instead")
        }
        (_, tool) => console.info(&format!("Using {} as specified", tool.name())),
    }

    if config.debug {
        let files = WalkDir::new(&config.templates_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        console.info(&format!(
            "Searching {} template files under {}",
            files,
            config.templates_dir.display()
        ));
    }

    let values_file = config.templates_dir.join("..").join("values.yaml");
    keys::validate_file(&values_file).context("invalid values file")?;

    console.info("Extracting keys from values.yaml...");
    let extractor = Extractor::new(config.debug);
    let mut keys = extractor
        .extract_keys(&values_file)
        .context("extract values keys")?;

    if let Some(filter) = &config.filter {
        console.info(&format!("Filtering keys matching: {filter}"));
        keys = extractor.filter_keys(keys, filter);
    }
    console.warning(&format!("Total keys found: {}", keys.len()));

    let patterns = Patterns::builtins();
    let backend = SearchBackend::new(
        &config.templates_dir,
        tool,
        config.search_timeout,
        config.use_shell,
        config.debug,
    );
    let resolver = Resolver::new(&backend, &patterns, config.debug);

    console.info("Analyzing key usage:");
    let (mut usages, used_keys) =
        analyze_keys(&keys, &resolver, config.parallelism, config.show_progress())
            .context("find unused keys")?;
    promote_parent_keys(&mut usages, &used_keys);

    let reporter = Reporter::new(
        config.json_output,
        config.output_file.clone(),
        config.show_all_keys,
        config.show_test_commands,
        tool,
    );
    reporter.report(&usages).context("report results")?;

    let summary = ResultSummary::from_usages(&usages);
    if summary.unused_keys > 0 && config.exit_code_on_unused != 0 {
        if config.debug {
            console.info(&format!(
                "Exiting with code {} (unused keys found)",
                config.exit_code_on_unused
            ));
        }
        return Ok(ExitCode::from(config.exit_code_on_unused));
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Arguments::command().debug_assert();
    }

    #[test]
    fn defaults_map_into_config() {
        let args = Arguments::parse_from(["chartsweep", "charts/camunda/templates"]);
        let config = args.into_config();
        assert_eq!(config.search_timeout, Duration::from_secs(5));
        assert_eq!(config.exit_code_on_unused, 0);
        assert_eq!(config.search_tool, SearchToolChoice::Auto);
        assert_eq!(config.parallelism, None);
        assert!(config.show_progress());
    }

    #[test]
    fn flags_map_into_config() {
        let args = Arguments::parse_from([
            "chartsweep",
            "templates",
            "--json",
            "--quiet",
            "--exit-code",
            "3",
            "--grep-timeout",
            "10",
            "--search-tool",
            "grep",
            "--parallelism",
            "4",
        ]);
        let config = args.into_config();
        assert!(config.json_output);
        assert!(config.quiet);
        assert_eq!(config.exit_code_on_unused, 3);
        assert_eq!(config.search_timeout, Duration::from_secs(10));
        assert_eq!(config.search_tool, SearchToolChoice::Grep);
        assert_eq!(config.parallelism, Some(4));
        assert!(!config.show_progress());
    }
}
