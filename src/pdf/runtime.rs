//! One-time PDFium library initialization
//!
//! The library location is probed once per process. Every render job binds its
//! own `Pdfium` instance from that location because PDFium is not thread-safe.

use crate::error::{Error, Result};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static RUNTIME: OnceLock<PdfiumRuntime> = OnceLock::new();

/// Directories probed before any caller-supplied ones
const DEFAULT_SEARCH_DIRS: &[&str] = &["./", "/opt/pdfium/lib"];

/// Where the PDFium shared library was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryLocation {
    /// Explicit shared library file
    Path(PathBuf),
    /// The platform's system library search
    System,
}

/// Process-wide PDFium configuration
#[derive(Debug)]
pub struct PdfiumRuntime {
    location: LibraryLocation,
}

impl PdfiumRuntime {
    /// Locate the PDFium library and record it for the rest of the process.
    ///
    /// Later calls return the runtime chosen by the first successful call and
    /// ignore `extra_dirs`.
    pub fn init(extra_dirs: &[PathBuf]) -> Result<&'static PdfiumRuntime> {
        if let Some(runtime) = RUNTIME.get() {
            return Ok(runtime);
        }

        let location = Self::probe(extra_dirs)?;
        tracing::info!(location = ?location, "PDFium library located");

        Ok(RUNTIME.get_or_init(|| PdfiumRuntime { location }))
    }

    /// The runtime recorded by [`PdfiumRuntime::init`]
    pub fn get() -> Result<&'static PdfiumRuntime> {
        RUNTIME.get().ok_or_else(|| Error::Pdfium {
            reason: "PDFium runtime not initialized".to_string(),
        })
    }

    pub fn location(&self) -> &LibraryLocation {
        &self.location
    }

    /// Bind a fresh PDFium instance for one unit of blocking work
    pub fn pdfium(&self) -> Result<Pdfium> {
        let bindings = match &self.location {
            LibraryLocation::Path(path) => Pdfium::bind_to_library(path),
            LibraryLocation::System => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

        Ok(Pdfium::new(bindings))
    }

    fn probe(extra_dirs: &[PathBuf]) -> Result<LibraryLocation> {
        let candidates = DEFAULT_SEARCH_DIRS
            .iter()
            .map(|dir| Path::new(*dir))
            .chain(extra_dirs.iter().map(PathBuf::as_path))
            .map(|dir| Pdfium::pdfium_platform_library_name_at_path(dir));

        for candidate in candidates {
            if !candidate.exists() {
                continue;
            }
            match Pdfium::bind_to_library(&candidate) {
                Ok(_) => return Ok(LibraryLocation::Path(candidate)),
                Err(e) => {
                    tracing::debug!(path = %candidate.display(), error = %e, "PDFium bind failed");
                }
            }
        }

        Pdfium::bind_to_system_library()
            .map(|_| LibraryLocation::System)
            .map_err(|e| Error::Pdfium {
                reason: format!("Failed to initialize PDFium: {}", e),
            })
    }
}
