//! Command line interface definition

use clap::{Parser, Subcommand};
use imgaudit_types::{ColorChoice, EditType};
use std::path::PathBuf;

/// imgaudit - integrity tracking for scientific image files
#[derive(Parser)]
#[command(name = "imgaudit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track original hashes, approved edits and tampering of image files")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write debug logs to the data directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Use alternate audit database
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Record the original hash of one or more files
    #[command(alias = "add")]
    Register {
        /// Files to register
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Operator name (defaults to audit.operator)
        #[arg(long = "by", value_name = "NAME")]
        registered_by: Option<String>,
    },

    /// Register every matching file under a directory
    RegisterDir {
        /// Directory to scan recursively
        dir: PathBuf,

        /// File extensions to include (defaults to scan.extensions)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,

        /// Operator name (defaults to audit.operator)
        #[arg(long = "by", value_name = "NAME")]
        registered_by: Option<String>,
    },

    /// Check files against their recorded hashes
    #[command(alias = "check")]
    Verify {
        /// Files to verify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Check every matching file under a directory
    VerifyDir {
        /// Directory to scan recursively
        dir: PathBuf,

        /// File extensions to include (defaults to scan.extensions)
        #[arg(long = "ext", value_name = "EXT")]
        extensions: Vec<String>,
    },

    /// Approve the file's present contents as a sanctioned edit
    Approve {
        /// Edited file
        path: PathBuf,

        /// Kind of adjustment made
        #[arg(long = "type", value_enum)]
        edit_type: EditType,

        /// What was changed and why
        #[arg(long, short)]
        description: String,

        /// Approving operator (defaults to audit.operator)
        #[arg(long = "by", value_name = "NAME")]
        approved_by: Option<String>,

        /// Software used for the edit (defaults to audit.software_used)
        #[arg(long)]
        software: Option<String>,
    },

    /// Show the approved edits of a file
    #[command(alias = "log")]
    History {
        /// Registered file
        path: PathBuf,

        /// List the first edit first
        #[arg(long)]
        oldest_first: bool,
    },

    /// Check that a file's edits form an unbroken hash chain
    Chain {
        /// Registered file
        path: PathBuf,
    },

    /// Stop tracking a file and discard its edit history
    #[command(alias = "rm")]
    Remove {
        /// Registered file
        path: PathBuf,
    },

    /// List registered files
    #[command(alias = "ls")]
    List,

    /// Write a plain-text audit report of every record
    Report {
        /// Destination file (defaults to audit.report_dir or stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
