//! Command line argument parsing and validation.
//!
//! Trigger values default to the CI host's `GITHUB_REF` / `GITHUB_SHA`, so a
//! workflow step can run `pyrelease run` with no arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build a Python package and publish it: staging for branches, production for tags
#[derive(Parser, Debug)]
#[command(
    name = "pyrelease",
    version,
    about = "Build a Python package and publish it to the registry its trigger selects",
    long_about = "Build sdist and wheel artifacts for a Python package and publish them.

Pushes of tag references (refs/tags/*) publish to the production registry;
every other push publishes to the staging registry.

Usage:
  pyrelease run                                 # trigger from GITHUB_REF/GITHUB_SHA
  pyrelease run --ref refs/tags/v1.2.3
  pyrelease run --ref refs/heads/main --source owner/repo
  pyrelease target --ref refs/heads/main        # show which registry a ref selects"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Show detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute one pipeline run: acquire, provision, build, publish
    Run(RunArgs),

    /// Print the publish target a reference selects, without side effects
    Target(TargetArgs),
}

/// Arguments for `pyrelease run`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Pushed reference, e.g. refs/heads/main or refs/tags/v1.2.3
    #[arg(long = "ref", value_name = "REF", env = "GITHUB_REF")]
    pub reference: Option<String>,

    /// Commit the reference pointed at when pushed
    #[arg(long, value_name = "SHA", env = "GITHUB_SHA")]
    pub sha: Option<String>,

    /// Repository source: local path, GitHub URL, or owner/repo
    #[arg(long, value_name = "SOURCE")]
    pub source: Option<String>,

    /// Config file (default: ./pyrelease.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Staging registry URL override
    #[arg(long, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Python version requirement, e.g. ">=3.8"
    #[arg(long, value_name = "REQ")]
    pub python: Option<String>,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Keep the working directory after the run
    #[arg(long)]
    pub keep_work_dir: bool,
}

/// Arguments for `pyrelease target`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Reference to classify
    #[arg(long = "ref", value_name = "REF", env = "GITHUB_REF")]
    pub reference: Option<String>,

    /// Config file (default: ./pyrelease.toml if present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Staging registry URL override
    #[arg(long, value_name = "URL")]
    pub registry_url: Option<String>,

    /// Print the target as JSON
    #[arg(long)]
    pub json: bool,
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Run(_) => "run",
            Command::Target(_) => "target",
        }
    }

    fn reference(&self) -> Option<&str> {
        match self {
            Command::Run(args) => args.reference.as_deref(),
            Command::Target(args) => args.reference.as_deref(),
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("--verbose and --quiet cannot be used together".to_string());
        }

        match self.command.reference() {
            None => Err("no trigger reference: pass --ref or set GITHUB_REF".to_string()),
            Some(reference) if reference.trim().is_empty() => {
                Err("trigger reference must not be empty".to_string())
            }
            Some(reference) if reference.chars().any(char::is_whitespace) => {
                Err(format!("invalid reference '{reference}': contains whitespace"))
            }
            Some(_) => Ok(()),
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Runtime configuration that prints nothing but errors
    pub fn quiet() -> Self {
        Self::new(false, true)
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print verbose message
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print progress message
    pub fn progress(&self, message: &str) {
        let _ = self.output.progress(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn run_accepts_explicit_trigger() {
        let args = parse(&["pyrelease", "run", "--ref", "refs/tags/v1.2.3", "--sha", "abc123"]);
        match args.command {
            Command::Run(ref run) => {
                assert_eq!(run.reference.as_deref(), Some("refs/tags/v1.2.3"));
                assert_eq!(run.sha.as_deref(), Some("abc123"));
            }
            _ => panic!("expected run"),
        }
        assert!(args.validate().is_ok());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let args = parse(&["pyrelease", "-v", "-q", "target", "--ref", "refs/heads/main"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn whitespace_reference_is_invalid() {
        let args = parse(&["pyrelease", "target", "--ref", "refs/heads/my branch"]);
        assert!(args.validate().unwrap_err().contains("whitespace"));
    }
}
