// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Static analyzer for a PHP-flavored scripting language
#[derive(Parser)]
#[command(name = "civet")]
#[command(version = "0.1.0")]
#[command(about = "civet static analyzer", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze source files and print reports
    Check {
        /// Files or directories to analyze
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,

        /// Directory with stub declarations for builtin symbols
        #[arg(long, value_name = "DIR")]
        stubs: Option<PathBuf>,

        /// Per-file metadata cache directory
        #[arg(long, value_name = "DIR")]
        cache: Option<PathBuf>,

        /// Pattern rule file
        #[arg(long, value_name = "FILE")]
        rules: Option<PathBuf>,

        /// Worker count (default: available parallelism)
        #[arg(long, default_value_t = 0)]
        workers: usize,

        /// Also print reports from files with a disable marker
        #[arg(long)]
        include_disabled: bool,
    },
    /// Index source files into the metadata cache without analyzing
    Index {
        /// Files or directories to index
        #[arg(value_name = "PATHS", required = true)]
        paths: Vec<PathBuf>,

        /// Per-file metadata cache directory
        #[arg(long, value_name = "DIR", required = true)]
        cache: PathBuf,

        /// Worker count (default: available parallelism)
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },
    /// List all known checks
    Checks,
}
