// src/report/terminal.rs
use super::summary::Summary;
use crate::project::TestStatus;
use colored::{ColoredString, Colorize};

/// Prints a summary to stdout with colored status tags.
pub fn print_summary(summary: &Summary) {
    println!("{} {}", "PROJECT".cyan().bold(), summary.root.bold());
    println!("   {} {}", "=".blue(), summary.expected.join(", ").dimmed());

    for name in &summary.complete {
        println!("  {} {name}", "OK".green().bold());
    }
    for entry in &summary.partial {
        println!(
            "  {} {} {}",
            "~~".yellow().bold(),
            entry.client,
            format!("missing {}", entry.missing.join(", ")).dimmed()
        );
    }
    for name in &summary.absent {
        println!("  {} {name}", "--".red().bold());
    }

    if !summary.tests.is_empty() {
        println!();
        println!("{}", "TESTS".cyan().bold());
        for (status, names) in &summary.tests {
            println!("  {} {}", status_tag(*status), names.join(", "));
        }
    }

    println!();
    let line = format!(
        "{} {}, {} complete, {} partial, {} absent.",
        summary.total(),
        pluralize("client", summary.total()),
        summary.complete.len(),
        summary.partial.len(),
        summary.absent.len()
    );
    if summary.partial.is_empty() && summary.absent.is_empty() {
        println!("{} {line}", "OK".green().bold());
    } else {
        println!("{} {line}", "~".yellow().bold());
    }
}

fn status_tag(status: TestStatus) -> ColoredString {
    let label = format!("{:<13}", status.label());
    match status {
        TestStatus::Passed => label.green().bold(),
        TestStatus::Failed | TestStatus::CompileError => label.red().bold(),
        TestStatus::Timeout => label.yellow().bold(),
        TestStatus::MissingFile | TestStatus::Absent | TestStatus::Unset => label.dimmed(),
    }
}

fn pluralize(word: &str, n: usize) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
