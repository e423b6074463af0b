// src/commands/index.rs

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::driver::{run_index, DriverOptions};

/// Warm the per-file metadata cache without analyzing anything.
pub fn index_paths(paths: &[PathBuf], cache: &Path, workers: usize) -> ExitCode {
    let options = DriverOptions {
        workers,
        ..Default::default()
    };
    match run_index(paths, cache, &options) {
        Ok(count) => {
            println!("Indexed {count} files.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
