// src/commands/check.rs

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::cli::ColorMode;
use crate::driver::{run_check, DriverOptions};

pub struct CheckOptions {
    pub stubs: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub workers: usize,
    pub include_disabled: bool,
    pub color: ColorMode,
}

/// Whether report rendering should emit ANSI colors.
fn should_use_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Auto => std::io::stdout().is_terminal(),
        ColorMode::Always => true,
        ColorMode::Never => false,
    }
}

/// Analyze the given paths and print reports. The exit code fails
/// when any critical report survives the filters.
pub fn check_paths(paths: &[PathBuf], options: CheckOptions) -> ExitCode {
    let driver_options = DriverOptions {
        stubs_dir: options.stubs,
        cache_dir: options.cache,
        rules_file: options.rules,
        workers: options.workers,
    };
    let use_color = should_use_color(options.color);

    let reports = match run_check(paths, &driver_options) {
        Ok(reports) => reports,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut critical = 0usize;
    let mut printed = 0usize;
    for report in &reports {
        if report.is_disabled && !options.include_disabled {
            continue;
        }
        println!("{}\n", report.render(use_color));
        printed += 1;
        if report.is_critical() && !report.is_disabled {
            critical += 1;
        }
    }

    if printed == 0 {
        println!("No issues found.");
    } else {
        println!("{printed} issues found.");
    }

    if critical > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
