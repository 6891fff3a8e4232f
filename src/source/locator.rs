//! Locator parsing

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Where a locator says the document bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Local filesystem path (plain or `file://`)
    Path(PathBuf),
    /// Remote document fetched over HTTP(S)
    Url(String),
    /// Inline `data:` URI payload, still base64 encoded
    Data(String),
}

impl Locator {
    /// Parse an opaque locator string.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::SourceResolution {
                reason: "Empty locator".to_string(),
            });
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Locator::Url(raw.to_string()));
        }

        if lower.starts_with("file://") {
            let parsed = url::Url::parse(raw).map_err(|e| Error::SourceResolution {
                reason: format!("Invalid file URL: {}", e),
            })?;
            let path = parsed.to_file_path().map_err(|_| Error::SourceResolution {
                reason: format!("File URL has no local path: {}", raw),
            })?;
            return Ok(Locator::Path(path));
        }

        if lower.starts_with("data:") {
            // data:[<mediatype>][;base64],<payload>
            let (header, payload) =
                raw[5..]
                    .split_once(',')
                    .ok_or_else(|| Error::SourceResolution {
                        reason: "Malformed data URI".to_string(),
                    })?;
            if !header.to_ascii_lowercase().ends_with(";base64") {
                return Err(Error::SourceResolution {
                    reason: "Only base64 data URIs are supported".to_string(),
                });
            }
            return Ok(Locator::Data(payload.to_string()));
        }

        Ok(Locator::Path(PathBuf::from(raw)))
    }

    /// Short name for logs; data payloads are never echoed.
    pub fn display_name(&self) -> String {
        match self {
            Locator::Path(path) => path.display().to_string(),
            Locator::Url(url) => url.clone(),
            Locator::Data(_) => "<data-uri>".to_string(),
        }
    }
}
