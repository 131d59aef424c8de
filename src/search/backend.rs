//! Subprocess-backed text search over the template corpus.
//!
//! The backend runs one external search process per query and parses its
//! line-oriented output into `file:line` locations. Two interchangeable
//! tools are supported: ripgrep (faster, preferred when available) and grep
//! (universally available fallback).
//!
//! Failure policy: exit status 1 is the tools' "zero matches" signal and is
//! never an error. Any other failure (spawn error, nonzero exit, timeout) is
//! logged in debug mode and degrades to "zero matches" instead of aborting a
//! multi-thousand-key run.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::config::SearchToolChoice;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The concrete search tool picked for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTool {
    Ripgrep,
    Grep,
}

impl SearchTool {
    pub fn name(self) -> &'static str {
        match self {
            SearchTool::Ripgrep => "ripgrep",
            SearchTool::Grep => "grep",
        }
    }

    /// Resolve the user's choice against what is actually installed.
    /// Returns the tool plus whether a requested ripgrep was missing.
    pub fn select(choice: SearchToolChoice) -> (Self, bool) {
        match choice {
            SearchToolChoice::Grep => (SearchTool::Grep, false),
            SearchToolChoice::Ripgrep => {
                if detect_ripgrep() {
                    (SearchTool::Ripgrep, false)
                } else {
                    (SearchTool::Grep, true)
                }
            }
            SearchToolChoice::Auto => {
                if detect_ripgrep() {
                    (SearchTool::Ripgrep, false)
                } else {
                    (SearchTool::Grep, false)
                }
            }
        }
    }

    /// The argv for searching `pattern` under `root`.
    pub fn argv(self, pattern: &str, root: &Path) -> Vec<String> {
        let mut args: Vec<String> = match self {
            SearchTool::Ripgrep => ["rg", "--no-heading", "--with-filename", "--line-number", "-e"]
                .map(String::from)
                .to_vec(),
            SearchTool::Grep => ["grep", "-r", "-n", "-E", "-e"].map(String::from).to_vec(),
        };
        args.push(pattern.to_string());
        args.push(root.display().to_string());
        args
    }
}

/// Check whether an external tool is runnable from PATH.
pub fn tool_available(name: &str) -> bool {
    Command::new(name)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub fn detect_ripgrep() -> bool {
    tool_available("rg")
}

/// Executes searches over one corpus root with a fixed tool and timeout.
#[derive(Debug, Clone)]
pub struct SearchBackend {
    tool: SearchTool,
    root: PathBuf,
    timeout: Duration,
    use_shell: bool,
    debug: bool,
}

impl SearchBackend {
    pub fn new(root: &Path, tool: SearchTool, timeout: Duration, use_shell: bool, debug: bool) -> Self {
        Self {
            tool,
            root: root.to_path_buf(),
            timeout,
            use_shell,
            debug,
        }
    }

    pub fn tool(&self) -> SearchTool {
        self.tool
    }

    /// Search the corpus for a regex pattern, returning sorted `file:line`
    /// locations. Never fails: all subprocess trouble degrades to an empty
    /// result (see module docs).
    pub fn search(&self, pattern: &str) -> Vec<String> {
        if self.debug {
            eprintln!(
                "{} pattern={} tool={} root={}",
                "search:".cyan().bold(),
                pattern,
                self.tool.name(),
                self.root.display()
            );
        }

        let output = match self.run(pattern) {
            Some(output) => output,
            None => return Vec::new(),
        };

        let (status, stdout, stderr) = output;
        if !status.success() {
            // Exit status 1 means zero matches for both rg and grep.
            if status.code() == Some(1) {
                if self.debug {
                    eprintln!("{}", "search: no matches (exit 1)".dimmed());
                }
            } else if self.debug {
                eprintln!(
                    "{} status={:?} stderr={}",
                    "search: tool failure, treating as no match".red(),
                    status.code(),
                    stderr.trim()
                );
            }
            return Vec::new();
        }

        let mut matches = parse_matches(&stdout);
        matches.sort();
        if self.debug {
            eprintln!("{}", format!("search: {} matches", matches.len()).dimmed());
        }
        matches
    }

    fn command(&self, pattern: &str) -> Command {
        let argv = self.tool.argv(pattern, &self.root);
        if self.use_shell {
            // Troubleshooting mode only: reproduces the command a user would
            // paste into a terminal. Arguments are single-quoted to keep
            // key-derived regex metacharacters out of shell syntax.
            let line = argv.iter().map(|a| shell_quote(a)).collect::<Vec<_>>().join(" ");
            if self.debug {
                eprintln!("{} {}", "shell:".cyan().bold(), line);
            }
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(line);
            cmd
        } else {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            cmd
        }
    }

    /// Spawn the search process and wait for it, bounded by the timeout.
    /// Returns `None` on spawn failure or timeout.
    fn run(&self, pattern: &str) -> Option<(ExitStatus, String, String)> {
        let mut cmd = self.command(pattern);
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                if self.debug {
                    eprintln!("{} {err}", "search: failed to spawn".red());
                }
                return None;
            }
        };

        // Drain both pipes from separate threads so a chatty child can never
        // block on a full pipe while we poll for exit.
        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        kill_quietly(&mut child);
                        if self.debug {
                            eprintln!(
                                "{}",
                                format!("search: timed out after {:?}, treating as no match", self.timeout).red()
                            );
                        }
                        return None;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(err) => {
                    if self.debug {
                        eprintln!("{} {err}", "search: wait failed".red());
                    }
                    kill_quietly(&mut child);
                    return None;
                }
            }
        };

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();
        Some((status, stdout, stderr))
    }
}

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Reduce `file:line:content` output lines to `file:line` locations.
fn parse_matches(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut parts = line.splitn(3, ':');
            let file = parts.next()?;
            let line_no = parts.next()?;
            parts.next()?;
            Some(format!("{file}:{line_no}"))
        })
        .collect()
}

/// Single-quote an argument for `sh -c`.
fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
