//! Batch orchestrator
//!
//! Drives the per-row loop: filter → fill template → export → notify → log.
//! Row-level failures are caught at the row boundary and the loop continues;
//! only a missing/invalid template, an unreadable spreadsheet or an
//! uncreatable output directory aborts the batch.
//!
//! The batch runs on a single background worker publishing `BatchEvent`s
//! over a channel; the worker is the sole writer and shares no mutable
//! state with its consumer.

use crate::convert::Converter;
use crate::error::FatalError;
use crate::filter::{Exclusion, FilterPolicy, RowDecision};
use crate::job::CertificateJob;
use crate::mail::{Mailer, Notifier};
use crate::reader::{self, Record};
use crate::runlog::RunLog;
use crate::template::{self, DeckTemplate};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

/// Per-run inputs for one batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub template_path: PathBuf,
    pub spreadsheet_path: PathBuf,
    /// Training title, substituted into the template and the output names.
    pub title: String,
    pub output_dir: PathBuf,
    pub policy: FilterPolicy,
    /// Carbon-copy address for every certificate email.
    pub cc: Option<String>,
    pub send_email: bool,
    pub signature_dir: Option<PathBuf>,
    pub username: String,
}

/// Notifications published by the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    /// Transient status line.
    Message(String),
    /// Row-level problem; the batch continues.
    Warning(String),
    /// Percentage of rows processed so far.
    Progress(u8),
    /// Terminal: the batch ran to completion.
    Finished { generated: usize, message: String },
    /// Terminal: a fatal condition stopped the batch.
    Aborted(String),
}

/// Accumulated outcome of one run. Mutated only by the worker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub generated: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Strip characters that are illegal in filenames. Idempotent.
pub fn clean_filename(s: &str) -> String {
    s.chars().filter(|c| !r#"\/*?:"<>|"#.contains(*c)).collect()
}

pub struct Batch {
    config: BatchConfig,
    converter: Box<dyn Converter + Send>,
    mailer: Box<dyn Mailer + Send>,
    log: RunLog,
}

impl Batch {
    pub fn new(
        config: BatchConfig,
        converter: Box<dyn Converter + Send>,
        mailer: Box<dyn Mailer + Send>,
        log: RunLog,
    ) -> Self {
        Batch {
            config,
            converter,
            mailer,
            log,
        }
    }

    /// Run the batch to completion, publishing events through `emit`.
    /// Exactly one terminal event (`Finished` or `Aborted`) is published.
    pub fn run(&self, emit: &mut dyn FnMut(BatchEvent)) {
        match self.try_run(emit) {
            Ok(summary) => {
                let message = format!(
                    "{} certificates successfully generated.",
                    summary.generated
                );
                self.log.info(format!(
                    "{} certificates generated successfully.",
                    summary.generated
                ));
                emit(BatchEvent::Finished {
                    generated: summary.generated,
                    message,
                });
            }
            Err(fatal) => {
                let message = format!("General error: {fatal}");
                self.log.error(&message);
                emit(BatchEvent::Aborted(message));
            }
        }
    }

    fn try_run(&self, emit: &mut dyn FnMut(BatchEvent)) -> Result<RunSummary, FatalError> {
        let template = DeckTemplate::open(&self.config.template_path)?;
        let records = reader::read_records(&self.config.spreadsheet_path)?;

        if !self.config.output_dir.exists() {
            fs::create_dir_all(&self.config.output_dir).map_err(|e| {
                FatalError::OutputDirCreation {
                    path: self.config.output_dir.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.log.info(format!(
                "Output folder created: {}",
                self.config.output_dir.display()
            ));
        }

        emit(BatchEvent::Message("Generating certificates...".to_string()));

        let edition_date = Local::now().date_naive();
        let notifier = Notifier::new(
            &*self.mailer,
            self.config.signature_dir.clone(),
            self.config.username.clone(),
            self.log.clone(),
        );

        let total = records.len();
        let mut summary = RunSummary::default();
        for (index, record) in records.iter().enumerate() {
            self.process_row(record, &template, edition_date, &notifier, &mut summary, emit);
            let percent = ((index + 1) * 100 / total) as u8;
            emit(BatchEvent::Progress(percent));
        }

        Ok(summary)
    }

    fn process_row(
        &self,
        record: &Record,
        template: &DeckTemplate,
        edition_date: NaiveDate,
        notifier: &Notifier<'_>,
        summary: &mut RunSummary,
        emit: &mut dyn FnMut(BatchEvent),
    ) {
        let row = match self.config.policy.evaluate(record) {
            RowDecision::Certified(row) => row,
            RowDecision::Excluded(Exclusion::InvalidDate) => {
                let msg = format!(
                    "Row {}: invalid training date, certificate ignored.",
                    record.row
                );
                self.log.warning(&msg);
                summary.warnings += 1;
                emit(BatchEvent::Warning(msg));
                return;
            }
            RowDecision::Excluded(Exclusion::InvalidScore) => {
                let msg = format!("Row {}: invalid score, certificate ignored.", record.row);
                self.log.warning(&msg);
                summary.warnings += 1;
                emit(BatchEvent::Warning(msg));
                return;
            }
            RowDecision::Excluded(Exclusion::OutOfRange) => return,
            RowDecision::Excluded(Exclusion::BelowMinimum { name, score }) => {
                // A normal outcome, not worth a progress warning.
                self.log.info(format!(
                    "{} not certified (score {} < {})",
                    name, score, self.config.policy.min_score
                ));
                return;
            }
        };

        let job = CertificateJob::new(
            row.name,
            self.config.title.clone(),
            row.date,
            edition_date,
            row.org_id,
            row.email,
        );

        let base = format!(
            "{} - {}",
            clean_filename(&job.title),
            clean_filename(&job.name)
        );
        let deck_path = self.config.output_dir.join(format!("{base}.pptx"));
        let document_path = self.config.output_dir.join(format!("{base}.pdf"));

        if let Err(e) = template.render(&template::standard_replacements(&job), &deck_path) {
            let msg = format!("Deck save error for {}: {e:#}", job.name);
            self.log.error(&msg);
            summary.errors += 1;
            emit(BatchEvent::Warning(msg));
            return;
        }
        self.log.info(format!("Deck saved: {}", deck_path.display()));

        if let Err(e) = self.converter.convert(&deck_path, &document_path) {
            let msg = format!("Document conversion error for {}: {e:#}", job.name);
            self.log.error(&msg);
            summary.errors += 1;
            emit(BatchEvent::Warning(msg));
            return;
        }

        if !document_path.exists() {
            // Keep the deck around for diagnosis.
            let msg = format!("Document not generated for {}.", job.name);
            self.log.error(&msg);
            summary.errors += 1;
            emit(BatchEvent::Warning(msg));
            return;
        }

        // Delete the intermediate only once the destination is confirmed.
        match fs::remove_file(&deck_path) {
            Ok(()) => self.log.info(format!("Deck deleted: {}", deck_path.display())),
            Err(e) => {
                let msg = format!("Could not delete {}: {}", deck_path.display(), e);
                self.log.warning(&msg);
                summary.warnings += 1;
                emit(BatchEvent::Warning(msg));
            }
        }

        self.log.info(format!("Certificate generated for: {}", job.name));
        summary.generated += 1;

        if self.config.send_email {
            if let Some(email) = &job.email {
                let subject = format!(
                    "{}, {} - Training Certificate",
                    edition_date.format("%B %Y"),
                    self.config.title
                );
                let body = format!(
                    "Dears,\n\nI am pleased to share with you your {} certificate. \
                     Please find attached your certificate.\n\nBest regards",
                    self.config.title
                );
                let sent = notifier.deliver(
                    email,
                    self.config.cc.as_deref(),
                    &subject,
                    &body,
                    Some(&document_path),
                );
                if sent {
                    let cc_note = self
                        .config
                        .cc
                        .as_deref()
                        .map(|cc| format!(" (cc {cc})"))
                        .unwrap_or_default();
                    self.log.info(format!("Certificate sent to {email}{cc_note}"));
                    emit(BatchEvent::Message(format!("Certificate sent to {email}")));
                } else {
                    let msg = format!("Failed to send email to {email}");
                    self.log.error(&msg);
                    summary.errors += 1;
                    emit(BatchEvent::Warning(msg));
                }
            }
        }
    }
}

/// Run a batch on a background worker. The interactive surface consumes the
/// returned receiver; it never blocks the worker and never shares state
/// with it beyond the channel.
pub fn spawn(batch: Batch) -> (thread::JoinHandle<()>, mpsc::Receiver<BatchEvent>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        batch.run(&mut |event| {
            // A dropped receiver just means nobody is watching anymore.
            let _ = tx.send(event);
        });
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_filename_strips_illegal_characters() {
        assert_eq!(clean_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
        assert_eq!(clean_filename("Safety Level 3"), "Safety Level 3");
    }

    #[test]
    fn clean_filename_is_idempotent() {
        let once = clean_filename(r#"Lock/Out: "Tag" Out?"#);
        assert_eq!(clean_filename(&once), once);
        assert_eq!(once, "LockOut Tag Out");
    }
}
