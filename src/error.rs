//! Error types for PDF Preview

use thiserror::Error;

/// Result type alias for PDF Preview
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users whenever a document fails to load, decode or paint.
pub const LOAD_FAILED_MESSAGE: &str = "Error loading document";

/// Error types for PDF Preview
#[derive(Error, Debug)]
pub enum Error {
    /// PDF file not found
    #[error("PDF not found: {path}")]
    PdfNotFound { path: String },

    /// Invalid PDF file
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// PDF is password protected
    #[error("PDF is password protected")]
    PasswordRequired,

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// Page could not be rasterized
    #[error("Failed to paint page {page}: {reason}")]
    Paint { page: u32, reason: String },

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDFium error
    #[error("PDFium error: {reason}")]
    Pdfium { reason: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },
}

/// Stage of the render pipeline an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The locator was unreachable or not a valid document
    Decode,
    /// The requested page does not exist
    Page,
    /// The rendering backend failed to rasterize
    Paint,
}

impl Error {
    /// Classify the error by the render stage it surfaces from.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::PageOutOfBounds { .. } => ErrorKind::Page,
            Error::Paint { .. } => ErrorKind::Paint,
            _ => ErrorKind::Decode,
        }
    }

    /// Return a sanitized error message safe to show to users.
    /// Internal details (paths, library errors, file sizes) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::PdfNotFound { .. } => "PDF not found".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PasswordRequired => "PDF is password protected".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::Paint { .. } => "Failed to render page".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve PDF source".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Pdfium { .. } => "PDF processing error".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
        }
    }
}
