//! PDF Preview Library
//!
//! Previews the first page of each document in a list:
//! - `PreviewController`: selection, fit-to-container rendering, download action
//! - `PdfiumService`: PDFium-backed document rendering
//! - `SourceResolver`: fetching locators from paths, URLs and data URIs

pub mod error;
pub mod pdf;
pub mod preview;
pub mod source;

pub use error::{Error, ErrorKind, Result, LOAD_FAILED_MESSAGE};
pub use pdf::{DocumentHandle, DocumentService, PageHandle, PageSize, PdfiumRuntime, PdfiumService};
pub use preview::{
    fit_scale, Container, ContainerSize, Downloader, FileDownloader, PreviewConfig,
    PreviewController, PreviewSnapshot, RenderStatus, ResizableContainer, SaveAction,
    SelectionWatch, SharedSurface, TargetSurface,
};
pub use source::{SourceConfig, SourceResolver};
