//! File-backed run configuration
//!
//! Knobs that do not change per run (carbon-copy address, signature
//! directory, SMTP relay) live in a TOML file; per-run inputs come from the
//! caller.

use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Carbon-copy address added to every certificate email.
    #[serde(default)]
    pub cc: Option<String>,
    /// Directory holding the user's mail signature files.
    #[serde(default)]
    pub signature_dir: Option<PathBuf>,
    /// Default minimum score, overridable per run.
    #[serde(default)]
    pub min_score: Option<f64>,
    #[cfg(feature = "smtp")]
    #[serde(default)]
    pub smtp: Option<crate::mail::SmtpConfig>,
}

impl FileConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            cc = "training@example.com"
            signature_dir = "/home/jdoe/signatures"
            min_score = 75.0

            [smtp]
            host = "smtp.example.com"
            port = 587
            username = "jdoe"
            password = "secret"
            from = "Training Team <training@example.com>"
            "#,
        )
        .unwrap();

        assert_eq!(config.cc.as_deref(), Some("training@example.com"));
        assert_eq!(
            config.signature_dir.as_deref(),
            Some(Path::new("/home/jdoe/signatures"))
        );
        assert_eq!(config.min_score, Some(75.0));
        #[cfg(feature = "smtp")]
        {
            let smtp = config.smtp.unwrap();
            assert_eq!(smtp.host, "smtp.example.com");
            assert_eq!(smtp.port, Some(587));
        }
    }

    #[test]
    fn empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.cc.is_none());
        assert!(config.signature_dir.is_none());
        assert!(config.min_score.is_none());
    }
}
