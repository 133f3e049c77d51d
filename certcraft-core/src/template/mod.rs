//! Slide-deck template engine
//!
//! Fills a pptx template by replacing placeholder tokens inside text runs.
//! The deck is rewritten as a zip copy: slide parts go through a streaming
//! XML rewrite, every other entry is copied byte-for-byte.
//!
//! Tokens must match byte-for-byte within one `<a:t>` run. A token that
//! prior formatting split across two adjacent runs is not replaced; authors
//! keep each token in a single run of the template.

use crate::error::FatalError;
use crate::job::CertificateJob;
use anyhow::{Context, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::{ZipArchive, ZipWriter, write::FileOptions};

pub const TOKEN_NAME: &str = "{{NOM}}";
pub const TOKEN_ORG_ID: &str = "{{SSO}}";
pub const TOKEN_TITLE: &str = "{{FORMATION}}";
pub const TOKEN_TRAINING_DATE: &str = "{{DATE_FORMATION}}";
pub const TOKEN_EDITION_DATE: &str = "{{DATE_EDITION}}";

/// Token map for one certificate job.
pub fn standard_replacements(job: &CertificateJob) -> HashMap<String, String> {
    HashMap::from([
        (TOKEN_NAME.to_string(), job.name.clone()),
        (TOKEN_ORG_ID.to_string(), job.org_id.clone()),
        (TOKEN_TITLE.to_string(), job.title.clone()),
        (TOKEN_TRAINING_DATE.to_string(), job.training_date.clone()),
        (TOKEN_EDITION_DATE.to_string(), job.edition_date.clone()),
    ])
}

/// Validated handle to a pptx template on disk.
///
/// `render` re-reads the archive on every call, so consecutive certificates
/// never share mutated template state.
#[derive(Debug, Clone)]
pub struct DeckTemplate {
    path: PathBuf,
}

impl DeckTemplate {
    /// Open and validate a template. A missing file or an archive without
    /// slide parts aborts the whole batch.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FatalError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FatalError::TemplateMissing(path.to_path_buf()));
        }
        let invalid = |reason: String| FatalError::TemplateInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;
        let has_slides = archive.file_names().any(is_slide_part);
        if !has_slides {
            return Err(invalid("no slide parts found in archive".to_string()));
        }

        Ok(DeckTemplate {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fill the template and write the result to `output`.
    pub fn render(&self, replacements: &HashMap<String, String>, output: &Path) -> Result<()> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to reopen template: {}", self.path.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;

        let output_file = File::create(output)
            .with_context(|| format!("Failed to create deck file: {}", output.display()))?;
        let mut zip_writer = ZipWriter::new(output_file);

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if is_slide_part(&name) {
                let mut xml = String::new();
                entry.read_to_string(&mut xml)?;
                let rewritten = replace_in_slide_xml(&xml, replacements)
                    .with_context(|| format!("Failed to rewrite slide part: {name}"))?;
                zip_writer.start_file(&name, FileOptions::<()>::default())?;
                zip_writer.write_all(rewritten.as_bytes())?;
            } else {
                // Copy entry as is
                zip_writer.start_file(&name, FileOptions::<()>::default())?;
                let mut buffer = Vec::new();
                entry.read_to_end(&mut buffer)?;
                zip_writer.write_all(&buffer)?;
            }
        }

        zip_writer.finish()?;
        Ok(())
    }
}

/// Slide contents live in `ppt/slides/slideN.xml`; relationship parts do not
/// carry visible text.
fn is_slide_part(name: &str) -> bool {
    name.starts_with("ppt/slides/slide") && name.ends_with(".xml") && !name.contains("_rels")
}

/// Replace every occurrence of every token inside `<a:t>` runs.
fn replace_in_slide_xml(xml: &str, replacements: &HashMap<String, String>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"a:t" {
                    in_text_run = true;
                }
                writer.write_event(Event::Start(e))?;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"a:t" {
                    in_text_run = false;
                }
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Text(e)) if in_text_run => {
                let text = e.unescape()?.into_owned();
                let replaced = apply_replacements(&text, replacements);
                writer.write_event(Event::Text(BytesText::new(&replaced)))?;
            }
            Ok(Event::Eof) => break,
            Ok(event) => writer.write_event(event)?,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn apply_replacements(text: &str, replacements: &HashMap<String, String>) -> String {
    let mut result = text.to_string();
    for (token, value) in replacements {
        if result.contains(token.as_str()) {
            result = result.replace(token.as_str(), value);
        }
    }
    result
}
