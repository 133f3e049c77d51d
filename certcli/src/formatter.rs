//! Console output for batch events

use certcraft_core::pipeline::BatchEvent;
use colored::*;
use std::path::Path;

pub fn print_header(template: &Path, spreadsheet: &Path, output_dir: &Path) {
    println!(
        "{}",
        format!("Template:    {}", template.display()).bold()
    );
    println!(
        "{}",
        format!("Spreadsheet: {}", spreadsheet.display()).bold()
    );
    println!(
        "{}",
        format!("Output:      {}", output_dir.display()).bold()
    );
    println!();
}

pub fn print_event(event: &BatchEvent, quiet: bool) {
    match event {
        BatchEvent::Message(msg) => {
            if !quiet {
                println!("{msg}");
            }
        }
        BatchEvent::Warning(msg) => {
            eprintln!("{} {}", "warning:".yellow().bold(), msg);
        }
        BatchEvent::Progress(percent) => {
            if !quiet {
                println!("{}", format!("  [{percent:>3}%]").dimmed());
            }
        }
        BatchEvent::Finished { message, .. } => {
            println!();
            println!("{}", format!("✓ {message}").green().bold());
        }
        BatchEvent::Aborted(message) => {
            eprintln!();
            eprintln!("{}", format!("✗ {message}").red().bold());
        }
    }
}
