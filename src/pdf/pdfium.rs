//! PDFium-backed document rendering service

use crate::error::{Error, Result};
use crate::pdf::backend::{DocumentHandle, DocumentService, PageHandle, PageSize};
use crate::pdf::runtime::PdfiumRuntime;
use crate::source::{SourceConfig, SourceResolver};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Map PDFium errors to our error type
fn map_pdfium_error(err: PdfiumError) -> Error {
    match err {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::PasswordRequired
        }
        _ => Error::Pdfium {
            reason: format!("{}", err),
        },
    }
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::Pdfium {
        reason: format!("Task join error: {}", err),
    }
}

fn page_index(number: u32, total: u32) -> Result<PdfPageIndex> {
    if number < 1 || number > total {
        return Err(Error::PageOutOfBounds {
            page: number,
            total,
        });
    }
    PdfPageIndex::try_from(number - 1).map_err(|_| Error::PageOutOfBounds {
        page: number,
        total,
    })
}

/// Renders documents with PDFium, fetching bytes through a [`SourceResolver`]
pub struct PdfiumService {
    runtime: &'static PdfiumRuntime,
    resolver: SourceResolver,
}

impl PdfiumService {
    /// Initialize the PDFium runtime (once per process) and build a service
    pub fn new(config: SourceConfig) -> Result<Self> {
        Self::with_search_dirs(config, &[])
    }

    /// Like [`PdfiumService::new`], probing extra library directories on first init
    pub fn with_search_dirs(config: SourceConfig, dirs: &[PathBuf]) -> Result<Self> {
        let runtime = PdfiumRuntime::init(dirs)?;
        Ok(Self {
            runtime,
            resolver: SourceResolver::new(config),
        })
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    async fn open_document(&self, locator: &str) -> Result<Box<dyn DocumentHandle>> {
        let data = self.resolver.resolve(locator).await?;
        let runtime = self.runtime;

        let page_count = {
            let data = Arc::clone(&data);
            tokio::task::spawn_blocking(move || {
                let pdfium = runtime.pdfium()?;
                let document = pdfium
                    .load_pdf_from_byte_slice(&data, None)
                    .map_err(map_pdfium_error)?;
                Ok::<_, Error>(document.pages().len() as u32)
            })
            .await
            .map_err(join_error)??
        };

        tracing::debug!(locator, page_count, "document opened");

        Ok(Box::new(PdfiumDocument {
            runtime,
            data,
            page_count,
        }))
    }
}

impl DocumentService for PdfiumService {
    fn open<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Box<dyn DocumentHandle>>> {
        self.open_document(locator).boxed()
    }
}

struct PdfiumDocument {
    runtime: &'static PdfiumRuntime,
    data: Arc<Vec<u8>>,
    page_count: u32,
}

impl PdfiumDocument {
    async fn load_page(&self, number: u32) -> Result<Box<dyn PageHandle>> {
        let index = page_index(number, self.page_count)?;
        let runtime = self.runtime;
        let data = Arc::clone(&self.data);

        let natural = tokio::task::spawn_blocking(move || {
            let pdfium = runtime.pdfium()?;
            let document = pdfium
                .load_pdf_from_byte_slice(&data, None)
                .map_err(map_pdfium_error)?;
            let page = document.pages().get(index).map_err(|e| Error::Pdfium {
                reason: format!("Failed to get page {}: {}", number, e),
            })?;
            Ok::<_, Error>(PageSize::new(page.width().value, page.height().value))
        })
        .await
        .map_err(join_error)??;

        Ok(Box::new(PdfiumPage {
            runtime,
            data: Arc::clone(&self.data),
            number,
            index,
            natural,
        }))
    }
}

impl DocumentHandle for PdfiumDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page(&self, number: u32) -> BoxFuture<'_, Result<Box<dyn PageHandle>>> {
        self.load_page(number).boxed()
    }
}

struct PdfiumPage {
    runtime: &'static PdfiumRuntime,
    data: Arc<Vec<u8>>,
    number: u32,
    index: PdfPageIndex,
    natural: PageSize,
}

impl PdfiumPage {
    async fn render(&self, scale: f32) -> Result<RgbaImage> {
        let runtime = self.runtime;
        let data = Arc::clone(&self.data);
        let number = self.number;
        let index = self.index;

        tokio::task::spawn_blocking(move || {
            let pdfium = runtime.pdfium()?;
            let document = pdfium
                .load_pdf_from_byte_slice(&data, None)
                .map_err(map_pdfium_error)?;
            let page = document.pages().get(index).map_err(|e| Error::Paint {
                page: number,
                reason: e.to_string(),
            })?;

            let config = PdfRenderConfig::new()
                .scale_page_by_factor(scale)
                .render_form_data(true)
                .render_annotations(true);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| Error::Paint {
                    page: number,
                    reason: e.to_string(),
                })?;

            Ok::<_, Error>(bitmap.as_image().to_rgba8())
        })
        .await
        .map_err(join_error)?
    }
}

impl PageHandle for PdfiumPage {
    fn number(&self) -> u32 {
        self.number
    }

    fn measure(&self, scale: f32) -> PageSize {
        self.natural.scaled(scale)
    }

    fn paint(&self, scale: f32) -> BoxFuture<'_, Result<RgbaImage>> {
        self.render(scale).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index_bounds() {
        assert_eq!(page_index(1, 3).unwrap(), 0);
        assert_eq!(page_index(3, 3).unwrap(), 2);
        assert!(matches!(
            page_index(0, 3),
            Err(Error::PageOutOfBounds { page: 0, total: 3 })
        ));
        assert!(matches!(
            page_index(1, 0),
            Err(Error::PageOutOfBounds { page: 1, total: 0 })
        ));
    }

    #[test]
    fn test_map_password_error() {
        let err = map_pdfium_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(err, Error::PasswordRequired));
    }
}
