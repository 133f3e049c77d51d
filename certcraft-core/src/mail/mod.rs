//! Certificate notification by email
//!
//! `Mailer` is the narrow seam to the external mail service; `Notifier`
//! composes the message (body, discovered signature, inline images,
//! attachment) and converts every delivery failure into a logged `false` —
//! nothing escapes this boundary.

use crate::runlog::RunLog;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub mod signature;
#[cfg(feature = "smtp")]
pub mod smtp;

#[cfg(feature = "smtp")]
pub use smtp::{SmtpConfig, SmtpMailer};

/// A composed message ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub html_body: String,
    /// Inline images as (file path, content id) pairs.
    pub inline_images: Vec<(PathBuf, String)>,
    pub attachment: Option<PathBuf>,
}

/// Delivery backend seam.
pub trait Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()>;
}

/// Mailer for runs without email delivery; always reports success.
pub struct NullMailer;

impl Mailer for NullMailer {
    fn send(&self, _mail: &OutgoingMail) -> Result<()> {
        Ok(())
    }
}

/// Build the HTML body from plain text and an optional signature block.
pub fn compose_html_body(body_text: &str, signature_html: Option<&str>) -> String {
    let message = body_text.trim().replace('\n', "<br>");
    match signature_html {
        Some(sig) => format!("<html><body>{message}<br><br>{sig}</body></html>"),
        None => format!("<html><body>{message}</body></html>"),
    }
}

/// The account name used to match signature files.
pub fn current_username() -> String {
    std::env::var("USERNAME")
        .or_else(|_| std::env::var("USER"))
        .unwrap_or_else(|_| "user".to_string())
}

pub struct Notifier<'a> {
    mailer: &'a dyn Mailer,
    signature_dir: Option<PathBuf>,
    username: String,
    log: RunLog,
}

impl<'a> Notifier<'a> {
    pub fn new(
        mailer: &'a dyn Mailer,
        signature_dir: Option<PathBuf>,
        username: String,
        log: RunLog,
    ) -> Self {
        Notifier {
            mailer,
            signature_dir,
            username,
            log,
        }
    }

    /// Compose and send one message. Returns whether delivery succeeded;
    /// a missing signature is tolerated and the mail goes out unsigned.
    pub fn deliver(
        &self,
        to: &str,
        cc: Option<&str>,
        subject: &str,
        body_text: &str,
        attachment: Option<&Path>,
    ) -> bool {
        let signature = self.lookup_signature();
        let html_body = compose_html_body(body_text, signature.as_ref().map(|s| s.html.as_str()));

        let mail = OutgoingMail {
            to: to.to_string(),
            cc: cc.map(str::to_string),
            subject: subject.to_string(),
            html_body,
            inline_images: signature.map(|s| s.images).unwrap_or_default(),
            attachment: attachment.map(Path::to_path_buf),
        };

        match self.mailer.send(&mail) {
            Ok(()) => true,
            Err(e) => {
                self.log.error(format!("Error sending email to {to}: {e:#}"));
                false
            }
        }
    }

    fn lookup_signature(&self) -> Option<signature::Signature> {
        let dir = self.signature_dir.as_deref()?;
        match signature::find_signature(dir, &self.username) {
            Some(path) => match signature::prepare_signature(dir, &path, &self.log) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    self.log.error(format!("Error reading signature: {e:#}"));
                    None
                }
            },
            None => {
                self.log.error(format!(
                    "No signature found for username '{}'",
                    self.username
                ));
                None
            }
        }
    }
}
