use anyhow::{Context, Result};
use certcraft_core::convert::SofficeConverter;
use certcraft_core::filter::FilterPolicy;
use certcraft_core::mail::{self, Mailer, NullMailer};
use certcraft_core::pipeline::{Batch, BatchConfig, BatchEvent, spawn};
use certcraft_core::runlog::RunLog;
use certcraft_core::FileConfig;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

mod formatter;

#[derive(Parser)]
#[command(name = "certgen")]
#[command(about = "Batch training-certificate generator: fills a pptx template per certified spreadsheet row, exports to PDF and emails the result", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the pptx certificate template
    #[arg(value_name = "TEMPLATE")]
    template: PathBuf,

    /// Path to the training-completion spreadsheet
    #[arg(value_name = "SPREADSHEET")]
    spreadsheet: PathBuf,

    /// Training title substituted into the template and output names
    #[arg(short, long)]
    title: String,

    /// Output directory for the generated documents
    #[arg(short, long, default_value = "certificates")]
    output_dir: PathBuf,

    /// Minimum passing score (defaults to 80, or the configured value)
    #[arg(long)]
    min_score: Option<f64>,

    /// Inclusive start of the training-date range (dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// Inclusive end of the training-date range (dd/mm/yyyy or yyyy-mm-dd)
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,

    /// Carbon-copy address for every certificate email
    #[arg(long)]
    cc: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Generate documents without sending any email
    #[arg(long)]
    no_email: bool,

    /// Run log file (append mode)
    #[arg(long, default_value = "certificates_generation.log")]
    log_file: PathBuf,

    /// Suppress transient progress output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| format!("invalid date '{s}', expected dd/mm/yyyy or yyyy-mm-dd"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let file_config = if let Some(config_path) = &cli.config {
        FileConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("certgen.toml");
        if default_config_path.exists() {
            FileConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            FileConfig::default()
        }
    };

    let policy = FilterPolicy {
        min_score: cli.min_score.or(file_config.min_score).unwrap_or(80.0),
        date_start: cli.from,
        date_end: cli.to,
    };

    let (mailer, send_email) = build_mailer(&file_config, cli.no_email)?;

    let log = RunLog::append(&cli.log_file)
        .with_context(|| format!("Failed to open log file: {}", cli.log_file.display()))?;

    let config = BatchConfig {
        template_path: cli.template.clone(),
        spreadsheet_path: cli.spreadsheet.clone(),
        title: cli.title,
        output_dir: cli.output_dir.clone(),
        policy,
        cc: cli.cc.or(file_config.cc.clone()),
        send_email,
        signature_dir: file_config.signature_dir.clone(),
        username: mail::current_username(),
    };

    formatter::print_header(&cli.template, &cli.spreadsheet, &cli.output_dir);

    let batch = Batch::new(config, Box::new(SofficeConverter::new()), mailer, log);
    let (handle, rx) = spawn(batch);

    let mut aborted = false;
    for event in rx {
        if matches!(event, BatchEvent::Aborted(_)) {
            aborted = true;
        }
        formatter::print_event(&event, cli.quiet);
    }
    let _ = handle.join();

    std::process::exit(if aborted { 1 } else { 0 });
}

#[cfg(feature = "smtp")]
fn build_mailer(config: &FileConfig, no_email: bool) -> Result<(Box<dyn Mailer + Send>, bool)> {
    if no_email {
        return Ok((Box::new(NullMailer), false));
    }
    match &config.smtp {
        Some(smtp) => {
            let mailer = certcraft_core::mail::SmtpMailer::new(smtp)
                .context("Failed to configure SMTP delivery")?;
            Ok((Box::new(mailer), true))
        }
        None => {
            eprintln!("note: no [smtp] section configured, certificates will not be emailed");
            Ok((Box::new(NullMailer), false))
        }
    }
}

#[cfg(not(feature = "smtp"))]
fn build_mailer(_config: &FileConfig, _no_email: bool) -> Result<(Box<dyn Mailer + Send>, bool)> {
    Ok((Box::new(NullMailer), false))
}
