//! CLI module - Command-line interface for Mediabox

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Mediabox - personal media library with a torrent downloader
#[derive(Parser)]
#[command(name = "mediabox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search paths
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List a directory of the media root
    #[command(alias = "ls")]
    List {
        /// Path relative to the media root
        #[arg(default_value = "")]
        path: String,
    },

    /// Rename a file or directory inside the media root
    #[command(alias = "mv")]
    Rename {
        /// Current path relative to the media root
        old_path: String,
        /// New name, kept in the same directory
        new_name: String,
    },

    /// Create a default config file
    #[command(alias = "init")]
    InitConfig,
}

impl Cli {
    /// Resolves the config honouring `--config`, falling back to the
    /// search paths. Also returns the path settings are saved to.
    pub fn load_config(&self) -> anyhow::Result<(Config, PathBuf)> {
        match &self.config {
            Some(path) => Ok((Config::load_or_default(path)?, path.clone())),
            None => Config::load(),
        }
    }
}

pub use commands::*;
