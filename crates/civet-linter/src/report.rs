// report.rs

use civet_frontend::Span;

/// Commit message marker that disables all checks for a changeset.
pub const IGNORE_LINTER_MESSAGE: &str = "@linter disable";

/// The conventional explicitly-unused variable name.
pub fn is_discard_var(name: &str) -> bool {
    name == "_"
}

pub const SUPER_GLOBALS: &[&str] = &[
    "GLOBALS",
    "_SERVER",
    "_GET",
    "_POST",
    "_FILES",
    "_COOKIE",
    "_SESSION",
    "_REQUEST",
    "_ENV",
];

pub fn is_super_global(name: &str) -> bool {
    SUPER_GLOBALS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Information,
    /// Advisory: reported, but should not fail a commit.
    DoNotReject,
    Unused,
}

impl Severity {
    pub fn name(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Information => "INFO",
            Severity::DoNotReject => "MAYBE",
            Severity::Unused => "UNUSED",
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone)]
pub struct Report {
    pub check_name: String,
    pub level: Severity,
    pub filename: String,
    pub line: u32,
    pub start_char: usize,
    pub end_char: usize,
    /// The source line the report points into.
    pub context_line: String,
    pub message: String,
    /// File opted out of linting (`@linter disable`).
    pub is_disabled: bool,
}

/// ANSI color for a severity tag.
fn severity_ansi(level: Severity) -> &'static str {
    match level {
        Severity::Error => "\x1b[31m",
        Severity::Warning => "\x1b[33m",
        Severity::Information => "\x1b[36m",
        Severity::DoNotReject => "\x1b[35m",
        Severity::Unused => "\x1b[90m",
    }
}

const ANSI_RESET: &str = "\x1b[0m";

impl Report {
    /// Whether this report should reject a commit.
    pub fn is_critical(&self) -> bool {
        self.level != Severity::DoNotReject
    }

    /// Render the report; `color` adds ANSI styling to the severity
    /// tag and the caret underline.
    pub fn render(&self, color: bool) -> String {
        let mut underline = String::new();
        for (i, ch) in self.context_line.chars().enumerate() {
            if i == self.start_char {
                break;
            }
            // Tabs must stay tabs for the caret line to align.
            underline.push(if ch == '\t' { '\t' } else { ' ' });
        }
        if self.end_char > self.start_char {
            underline.push_str(&"^".repeat(self.end_char - self.start_char));
        }
        let msg = if self.check_name.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.check_name, self.message)
        };
        let severity = if color {
            format!("{}{}{}", severity_ansi(self.level), self.level.name(), ANSI_RESET)
        } else {
            self.level.name().to_string()
        };
        let underline = if color && !underline.trim().is_empty() {
            format!("{}{}{}", severity_ansi(self.level), underline, ANSI_RESET)
        } else {
            underline
        };
        format!(
            "{} {} at {}:{}\n{}\n{}",
            severity, msg, self.filename, self.line, self.context_line, underline
        )
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

/// Positioning info computed from a span against the file contents.
/// Works on bytes so odd offsets cannot panic mid-codepoint.
pub fn locate(source: &str, span: Span) -> (u32, usize, usize, String) {
    let bytes = source.as_bytes();
    let clamped = span.start.min(bytes.len());
    let line_start = bytes[..clamped]
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let line_end = bytes[line_start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| line_start + i)
        .unwrap_or(bytes.len());
    let context = String::from_utf8_lossy(&bytes[line_start..line_end]).into_owned();
    let start_char = span.start.saturating_sub(line_start);
    let end_char = span.end.min(line_end).saturating_sub(line_start);
    (span.line, start_char, end_char.max(start_char), context)
}

/// Description of one check, for listings and enable/disable flags.
#[derive(Debug, Clone)]
pub struct CheckInfo {
    pub name: &'static str,
    pub default: bool,
    pub comment: &'static str,
}

/// Every check civet can emit.
pub fn all_checks() -> Vec<CheckInfo> {
    vec![
        CheckInfo {
            name: "accessLevel",
            default: true,
            comment: "Report erroneous member access.",
        },
        CheckInfo {
            name: "argCount",
            default: true,
            comment: "Report mismatching args count inside call expressions.",
        },
        CheckInfo {
            name: "arrayAccess",
            default: true,
            comment: "Report array access to non-array objects.",
        },
        CheckInfo {
            name: "arraySyntax",
            default: true,
            comment: "Report usages of old array() syntax.",
        },
        CheckInfo {
            name: "bareTry",
            default: true,
            comment: "Report try blocks without catch/finally.",
        },
        CheckInfo {
            name: "bitwiseOps",
            default: true,
            comment: "Report suspicious usage of bitwise operations.",
        },
        CheckInfo {
            name: "callStatic",
            default: true,
            comment: "Report static calls of instance methods and vice versa.",
        },
        CheckInfo {
            name: "caseBreak",
            default: true,
            comment: "Report switch cases without break.",
        },
        CheckInfo {
            name: "caseContinue",
            default: true,
            comment: "Report suspicious 'continue' usages inside switch cases.",
        },
        CheckInfo {
            name: "deadCode",
            default: true,
            comment: "Report potentially unreachable code.",
        },
        CheckInfo {
            name: "deprecated",
            default: false,
            comment: "Report usages of deprecated symbols.",
        },
        CheckInfo {
            name: "dupArrayKeys",
            default: true,
            comment: "Report duplicated keys in array literals.",
        },
        CheckInfo {
            name: "keywordCase",
            default: true,
            comment: "Report keywords that are not in the lower case.",
        },
        CheckInfo {
            name: "mixedArrayKeys",
            default: true,
            comment: "Report array literals that have both implicit and explicit keys.",
        },
        CheckInfo {
            name: "phpdocLint",
            default: true,
            comment: "Report malformed phpdoc comments.",
        },
        CheckInfo {
            name: "phpdocType",
            default: true,
            comment: "Report potential issues in phpdoc types.",
        },
        CheckInfo {
            name: "redundantCast",
            default: false,
            comment: "Report redundant type casts.",
        },
        CheckInfo {
            name: "syntax",
            default: true,
            comment: "Report syntax errors.",
        },
        CheckInfo {
            name: "undefined",
            default: true,
            comment: "Report usages of potentially undefined symbols.",
        },
        CheckInfo {
            name: "unused",
            default: true,
            comment: "Report potentially unused variables.",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_underlines_the_span() {
        let report = Report {
            check_name: "undefined".into(),
            level: Severity::Error,
            filename: "a.php".into(),
            line: 1,
            start_char: 5,
            end_char: 7,
            context_line: "$a = $b;".into(),
            message: "Undefined variable: b".into(),
            is_disabled: false,
        };
        let text = report.to_string();
        assert!(text.starts_with("ERROR undefined: Undefined variable: b at a.php:1"));
        assert!(text.ends_with("     ^^"));
    }

    #[test]
    fn colored_render_styles_the_severity() {
        let report = Report {
            check_name: "undefined".into(),
            level: Severity::Error,
            filename: "a.php".into(),
            line: 1,
            start_char: 5,
            end_char: 7,
            context_line: "$a = $b;".into(),
            message: "Undefined variable: b".into(),
            is_disabled: false,
        };
        let colored = report.render(true);
        assert!(colored.starts_with("\x1b[31mERROR\x1b[0m undefined:"));
        // Plain rendering stays byte-identical to Display.
        assert_eq!(report.render(false), report.to_string());
    }

    #[test]
    fn do_not_reject_is_not_critical() {
        let mut report = Report {
            check_name: "redundantCast".into(),
            level: Severity::DoNotReject,
            filename: "a.php".into(),
            line: 1,
            start_char: 0,
            end_char: 0,
            context_line: String::new(),
            message: String::new(),
            is_disabled: false,
        };
        assert!(!report.is_critical());
        report.level = Severity::Unused;
        assert!(report.is_critical());
    }

    #[test]
    fn locate_computes_line_context() {
        let src = "$a = 1;\n$b = $c;\n";
        let span = Span::new(13, 15, 2, 6);
        let (line, start, end, context) = locate(src, span);
        assert_eq!(line, 2);
        assert_eq!(context, "$b = $c;");
        assert_eq!(&context[start..end], "$c");
    }
}
