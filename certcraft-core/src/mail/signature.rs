//! Mail signature discovery
//!
//! Signatures live as HTML files in a per-user directory; the file whose
//! name contains the current username is merged into outgoing mail. Images
//! referenced by the signature are rewritten to `cid:` references so they
//! render inline once attached with a matching content id.

use crate::runlog::RunLog;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A signature ready for embedding: rewritten HTML plus the inline images
/// to attach, as (file path, content id) pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub html: String,
    pub images: Vec<(PathBuf, String)>,
}

fn img_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<img[^>]+src="([^"]+)""#).expect("valid regex"))
}

/// Find the signature file for `username`: an `.htm`/`.html` file whose name
/// contains the username. Ties are broken lexicographically by file name so
/// the choice does not depend on directory enumeration order.
pub fn find_signature(dir: &Path, username: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("htm") | Some("html")
            )
        })
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(username))
        })
        .collect();

    matches.sort_by_key(|path| path.file_name().map(|n| n.to_os_string()));
    matches.into_iter().next()
}

/// Load a signature file and rewrite its image references to content ids.
/// Images that cannot be found on disk are logged and left untouched.
pub fn prepare_signature(dir: &Path, path: &Path, log: &RunLog) -> Result<Signature> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read signature: {}", path.display()))?;
    // Signature files come from mail clients with platform encodings; a
    // lossy decode keeps the markup usable either way.
    let mut html = String::from_utf8_lossy(&bytes).into_owned();

    let sources: Vec<String> = img_src_regex()
        .captures_iter(&html)
        .map(|caps| caps[1].to_string())
        .collect();

    let mut images = Vec::new();
    for src in sources {
        let relative = src.replace("%20", " ");
        let image_path = dir.join(&relative);
        if image_path.exists() {
            let cid = Path::new(&relative)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| relative.clone());
            html = html.replace(&format!("src=\"{src}\""), &format!("src=\"cid:{cid}\""));
            images.push((image_path, cid));
        } else {
            log.warning(format!("Signature image not found: {}", image_path.display()));
        }
    }

    Ok(Signature { html, images })
}
