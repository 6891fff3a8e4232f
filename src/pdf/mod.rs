//! PDF rendering layer
//!
//! The rendering contract the preview controller depends on, and its PDFium implementation.

mod backend;
mod pdfium;
mod runtime;

pub use backend::{DocumentHandle, DocumentService, PageHandle, PageSize};
pub use pdfium::PdfiumService;
pub use runtime::{LibraryLocation, PdfiumRuntime};
