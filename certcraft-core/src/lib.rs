//! Core library for batch training-certificate generation
//!
//! Reads training-completion records from a spreadsheet, fills a slide-deck
//! template per certified record, exports each filled deck to a portable
//! document through an external office converter and optionally emails the
//! result to the recipient, logging outcomes to a run log.
//!
//! The external office services (document conversion, mail delivery) sit
//! behind the [`convert::Converter`] and [`mail::Mailer`] seams so the
//! pipeline itself runs against fakes in tests.

pub mod config;
pub mod convert;
pub mod error;
pub mod filter;
pub mod job;
pub mod mail;
pub mod pipeline;
pub mod reader;
pub mod runlog;
pub mod template;

pub use config::FileConfig;
pub use convert::{Converter, SofficeConverter};
pub use error::FatalError;
pub use filter::{CertifiedRow, Exclusion, FilterPolicy, RowDecision};
pub use job::CertificateJob;
pub use mail::{Mailer, Notifier, NullMailer, OutgoingMail};
pub use pipeline::{Batch, BatchConfig, BatchEvent, RunSummary, clean_filename, spawn};
pub use reader::{Field, Record, read_records};
pub use runlog::RunLog;
pub use template::DeckTemplate;
