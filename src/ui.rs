//! Terminal output. Status lines go to stdout, errors to stderr.

use colored::{ColoredString, Colorize};
use inventory::{JobReport, JobState};
use std::fmt::Display;
use std::time::Duration;

pub fn info(msg: impl Display) {
    println!("{} {msg}", "ℹ".blue());
}

pub fn success(msg: impl Display) {
    println!("{} {msg}", "✓".green());
}

pub fn warn(msg: impl Display) {
    println!("{} {msg}", "⚠".yellow());
}

pub fn error(msg: impl Display) {
    eprintln!("{} {msg}", "✗".red());
}

/// Section title, underlined to its own width.
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Aligned `key: value` line under a header.
pub fn field(key: &str, value: impl Display) {
    println!("  {:<16} {value}", format!("{key}:").dimmed());
}

/// Job state colored by outcome.
pub fn state(state: JobState) -> ColoredString {
    let label = state.to_string();
    match state {
        JobState::Succeeded => label.green(),
        JobState::Failed => label.red(),
        _ => label.yellow(),
    }
}

/// One summary block for a finished job.
pub fn job(job: &JobReport) {
    field(
        job.content_type.name(),
        format!(
            "{} {} ({}, {} {})",
            state(job.state),
            job.destination,
            format_elapsed(job.elapsed),
            job.polls,
            if job.polls == 1 { "poll" } else { "polls" }
        ),
    );
    for detail in job.operation.iter().chain(job.error.iter()) {
        println!("  {:<16} {}", "", detail.dimmed());
    }
}

/// Short human-readable duration: `1.5s`, `2m05s`, `1h02m`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 3600 {
        format!("{}h{:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}
