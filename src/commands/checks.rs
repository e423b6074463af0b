// src/commands/checks.rs

use std::process::ExitCode;

use civet_linter::all_checks;

/// Print the check registry: name, on/off by default, description.
pub fn list_checks() -> ExitCode {
    let checks = all_checks();
    let width = checks
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    for check in checks {
        let state = if check.default { "on " } else { "off" };
        println!("{:width$}  {}  {}", check.name, state, check.comment);
    }
    ExitCode::SUCCESS
}
