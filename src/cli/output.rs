//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically. Data meant for
//! pipes (prompts, JSON, TOML) goes to stdout uncoloured; diagnostics go to stderr.

use std::fmt::Display;

use colored::Colorize;

use crate::domain::AssembledPrompt;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print an error's source chain below it, one cause per line
///
/// Layers that only forward their inner message are skipped.
pub fn causes(err: &(dyn std::error::Error + 'static)) {
    let mut last = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if text != last {
            eprintln!("  {} {}", "caused by:".dimmed(), text);
        }
        last = text;
        source = cause.source();
    }
}

/// Print warning (yellow "warning:" prefix) to stderr
pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print one graph defect (red X, indented)
pub fn defect(msg: &(impl Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print a labelled line (green label)
pub fn field(label: &str, msg: &(impl Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color)
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}

/// Print a prompt pair as two labelled lines
pub fn prompt_pair(result: &AssembledPrompt) {
    field("prompt", &result.prompt);
    field("negative", &result.negative_prompt);
}

/// Preview shown during an interactive session, on stderr so stdout keeps only the result
pub fn preview(result: &AssembledPrompt) {
    eprintln!("{}", "preview".cyan().bold());
    eprintln!("  {}", result.prompt);
    eprintln!("  {} {}", "-".red(), result.negative_prompt);
}
