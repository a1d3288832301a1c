// src/cli/args.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Hide feed items carrying blocked tags
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Turn debugging information on
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long = "generate-config")]
    pub generate_config: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add tags to the blocked set
    Block {
        /// Tags to block, matched case-insensitively
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Remove tags from the blocked set
    Unblock {
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Show blocked tags in the order they were added
    List {
        #[arg(long = "json", help = "output as json array")]
        is_json: bool,
    },
    /// Remove all blocked tags
    Clear,
    /// Filter a saved feed page against the blocked set
    Apply {
        /// HTML file of the page
        file: PathBuf,

        #[arg(long = "url", help = "address the page was saved from")]
        url: Option<String>,

        #[arg(short = 'o', long = "output", help = "write result here instead of stdout")]
        output: Option<PathBuf>,
    },
    /// Check or change the site permission
    Permissions {
        #[command(subcommand)]
        action: PermissionAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    /// Whether the permitted origins are granted
    Status,
    /// Grant the permitted origins
    Grant,
    /// Withdraw the grant
    Revoke,
}
