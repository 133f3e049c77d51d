//! Fatal error taxonomy for batch runs

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the whole batch. Row-level failures never use this
/// type; they are caught at the row boundary and the loop continues.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Template not found: {0}")]
    TemplateMissing(PathBuf),

    #[error("Cannot load template {path}: {reason}")]
    TemplateInvalid { path: PathBuf, reason: String },

    #[error("Cannot read spreadsheet {path}: {reason}")]
    SpreadsheetUnreadable { path: PathBuf, reason: String },

    #[error("Cannot create output directory {path}: {reason}")]
    OutputDirCreation { path: PathBuf, reason: String },
}
