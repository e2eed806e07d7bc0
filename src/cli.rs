//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tilgen static site generator CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Layout HTML file path (relative to project root)
    #[arg(short, long)]
    pub layout: Option<PathBuf>,

    /// Include a named HTML fragment into the layout, as `name=path`.
    ///
    /// Each `@@name@@` token in the layout file is replaced with the
    /// contents of the fragment file. May be repeated.
    #[arg(short = 'f', long = "fragment", value_name = "NAME=PATH")]
    pub fragments: Vec<String>,

    /// Config file name (default: til.toml)
    #[arg(short = 'C', long, default_value = "til.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Shared build arguments for Build and Watch commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Clean output directory completely before building
    #[arg(long)]
    pub clean: bool,

    /// Minify the html content
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Init a template site
    Init {
        /// the name(path) of site directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Generate the whole site once
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Regenerate on change, polling the content tree
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Poll interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[allow(unused)]
impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
}

/// Parse a `name=path` fragment spec from the command line.
pub fn parse_fragment(spec: &str) -> Result<(String, PathBuf)> {
    let Some((name, path)) = spec.split_once('=') else {
        bail!("Invalid fragment `{spec}`: expected `name=path`");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid fragment `{spec}`: name is empty");
    }
    Ok((name.to_owned(), PathBuf::from(path)))
}
