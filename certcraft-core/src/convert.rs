//! Document export via an external office converter
//!
//! The converter is a narrow seam so the pipeline can run against fakes in
//! tests. The real implementation drives a headless LibreOffice process,
//! which is a stateful singleton: only one conversion may run at a time.

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::process::Command;
use std::sync::{Mutex, OnceLock};

/// Converts a saved deck file into a portable document.
///
/// Implementations report failure through `Err`; callers must also verify
/// that the destination exists afterwards, since external converters have
/// been seen to exit cleanly without producing output.
pub trait Converter {
    fn convert(&self, deck: &Path, document: &Path) -> Result<()>;
}

/// One office process at a time, across every pipeline instance.
fn conversion_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// LibreOffice headless converter.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: String,
}

impl SofficeConverter {
    pub fn new() -> Self {
        SofficeConverter {
            binary: "soffice".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        SofficeConverter {
            binary: binary.into(),
        }
    }
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for SofficeConverter {
    fn convert(&self, deck: &Path, document: &Path) -> Result<()> {
        let _guard = match conversion_lock().lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let out_dir = document
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(out_dir)
            .arg(deck)
            .output()
            .with_context(|| format!("Failed to run converter: {}", self.binary))?;

        if !output.status.success() {
            bail!(
                "Converter exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // soffice names the output after the input stem; align it with the
        // destination the caller asked for.
        let produced = out_dir.join(
            deck.file_stem()
                .map(|stem| format!("{}.pdf", stem.to_string_lossy()))
                .unwrap_or_else(|| "output.pdf".to_string()),
        );
        if produced != document && produced.exists() {
            std::fs::rename(&produced, document).with_context(|| {
                format!(
                    "Failed to move {} to {}",
                    produced.display(),
                    document.display()
                )
            })?;
        }

        Ok(())
    }
}
