//! SMTP delivery backend (lettre)

use super::{Mailer, OutgoingMail};
use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// SMTP relay settings, loaded from the `[smtp]` section of the run
/// configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sender address, e.g. `"Training Team <training@example.com>"`.
    pub from: String,
}

pub struct SmtpMailer {
    from: String,
    transport: SmtpTransport,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = SmtpTransport::relay(&config.host)
            .with_context(|| format!("Failed to configure SMTP relay: {}", config.host))?;
        if let Some(port) = config.port {
            builder = builder.port(port);
        }
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(SmtpMailer {
            from: config.from.clone(),
            transport: builder.build(),
        })
    }
}

fn image_content_type(path: &Path) -> ContentType {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    };
    ContentType::parse(mime).expect("static mime type")
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.parse().context("Invalid sender address")?)
            .to(mail
                .to
                .parse()
                .with_context(|| format!("Invalid recipient address: {}", mail.to))?)
            .subject(mail.subject.clone());
        if let Some(cc) = &mail.cc {
            builder = builder.cc(cc
                .parse()
                .with_context(|| format!("Invalid cc address: {cc}"))?);
        }

        // multipart/related carries the HTML plus its inline images so cid
        // references resolve in the recipient's client.
        let mut related = MultiPart::related().singlepart(SinglePart::html(mail.html_body.clone()));
        for (path, cid) in &mail.inline_images {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read inline image: {}", path.display()))?;
            related = related.singlepart(
                Attachment::new_inline(cid.clone()).body(bytes, image_content_type(path)),
            );
        }

        let mut mixed = MultiPart::mixed().multipart(related);
        if let Some(attachment) = &mail.attachment {
            let bytes = fs::read(attachment)
                .with_context(|| format!("Failed to read attachment: {}", attachment.display()))?;
            let filename = attachment
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "certificate.pdf".to_string());
            mixed = mixed.singlepart(
                Attachment::new(filename)
                    .body(bytes, ContentType::parse("application/pdf").expect("static mime")),
            );
        }

        let message = builder.multipart(mixed).context("Failed to build message")?;
        self.transport
            .send(&message)
            .with_context(|| format!("SMTP delivery to {} failed", mail.to))?;
        Ok(())
    }
}
