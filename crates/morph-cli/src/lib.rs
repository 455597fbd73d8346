//! CodeMorph CLI Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Command-line interface for migrating legacy code with CodeMorph.
//!
//! # Overview
//!
//! - **Discovery**: List what a zip archive (local or downloaded), a single
//!   file, or a public GitHub repository contributes (`morph scan`)
//! - **Migration**: Rewrite every file for a target stack and write the
//!   modern code, tests, docs, and security findings to disk (`morph migrate`)
//! - **Inspection**: Print one file, fetching it on demand (`morph show`)

pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use config::Config;
pub use error::{CliError, Result};
pub use output::OutputFormat;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CodeMorph - AI-assisted legacy code migration
#[derive(Parser, Debug)]
#[command(name = "morph")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Connection settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Gemini model id
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Gemini API base URL
    #[arg(long, global = true)]
    pub gemini_url: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, global = true)]
    pub github_api_url: Option<String>,

    /// Base URL for raw file content
    #[arg(long, global = true)]
    pub github_raw_url: Option<String>,

    /// GitHub token, raises the API rate limit
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub github_token: Option<String>,

    /// Per-file transformation timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the files a source contributes, without migrating them
    Scan {
        /// Zip archive (local path or URL), single source file, or GitHub repository URL
        source: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Migrate every file of a source to the target stack
    Migrate(MigrateArgs),

    /// Print the original content of one file from a source
    Show {
        /// Zip archive (local path or URL), single source file, or GitHub repository URL
        source: String,

        /// Project-relative path of the file
        path: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// Zip archive (local path or URL), single source file, or GitHub repository URL
    /// (defaults to the built-in Spring Security sample)
    pub source: Option<String>,

    /// Legacy stack, comma separated (e.g. "Java 8,Spring Boot 1.5")
    #[arg(long, value_delimiter = ',')]
    pub source_stack: Vec<String>,

    /// Target stack, comma separated (e.g. "Java 17,Spring Boot 3.2")
    #[arg(long, value_delimiter = ',')]
    pub target_stack: Vec<String>,

    /// Files transformed at the same time
    #[arg(short = 'j', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Batch runs; each extra pass retries the files that failed
    #[arg(long, default_value_t = 1)]
    pub passes: u32,

    /// Directory to write migrated files and reports into
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}
