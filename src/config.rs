//! Runtime configuration assembled from the command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

/// Which external search tool to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchToolChoice {
    /// Use ripgrep if it is on PATH, otherwise grep.
    Auto,
    Ripgrep,
    Grep,
}

/// All the runtime settings for one analysis run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Chart templates directory; `values.yaml` is resolved as its sibling.
    pub templates_dir: PathBuf,
    pub no_colors: bool,
    pub show_all_keys: bool,
    pub json_output: bool,
    pub output_file: Option<PathBuf>,
    /// Process exit code when unused keys are found; 0 means never fail.
    pub exit_code_on_unused: u8,
    pub quiet: bool,
    /// Substring filter restricting which keys are analyzed.
    pub filter: Option<String>,
    pub debug: bool,
    /// Upper bound for a single search subprocess call.
    pub search_timeout: Duration,
    pub search_tool: SearchToolChoice,
    /// Run searches through `sh -c` instead of argv (troubleshooting only).
    pub use_shell: bool,
    /// Print a copy-pasteable verification command per unused key.
    pub show_test_commands: bool,
    /// Worker pool size; `None` picks a bound from the host parallelism.
    pub parallelism: Option<usize>,
}

impl RunConfig {
    /// Progress bars are rendered only for interactive text runs.
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json_output
    }
}
