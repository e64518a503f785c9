//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Explore regional statistics: province/district/sub-district tree and reconciled yearly series
#[derive(Parser, Debug)]
#[command(name = "regstat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath, env = "REGSTAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the statistics service (overrides config)
    #[arg(long, global = true, value_hint = ValueHint::Url)]
    pub base_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the region tree
    Tree {
        /// Codes to expand, in order (parents before children)
        #[arg(short, long, value_delimiter = ',')]
        expand: Vec<String>,

        /// Show every cached node, not only expanded branches
        #[arg(short, long)]
        all: bool,
    },

    /// Show details of one region
    Select {
        /// Region code
        code: String,

        /// Ancestor codes to expand first, province before district
        #[arg(short, long, value_delimiter = ',')]
        expand: Vec<String>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Show the reconciled yearly series of a sub-district
    Series {
        /// Sub-district code
        code: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Search fetched district and sub-district names
    Search {
        /// Case-insensitive substring
        query: String,

        /// Codes to expand before searching
        #[arg(short, long, value_delimiter = ',')]
        expand: Vec<String>,
    },

    /// List years with data
    Years,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}
