//! Document rendering service contract
//!
//! The preview controller only talks to these traits. [`PdfiumService`] is the
//! production implementation; tests script their own.
//!
//! [`PdfiumService`]: crate::pdf::PdfiumService

use crate::error::Result;
use futures_util::future::BoxFuture;
use image::RgbaImage;

/// Page dimensions in PDF points (1 point = 1/72 inch) times a scale factor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn scaled(&self, scale: f32) -> Self {
        Self {
            width: self.width * scale,
            height: self.height * scale,
        }
    }

    /// Whole-pixel dimensions, truncated the way canvas sizes are
    pub fn to_pixels(&self) -> (u32, u32) {
        (
            self.width.max(0.0).floor() as u32,
            self.height.max(0.0).floor() as u32,
        )
    }
}

/// Opens documents from locators
pub trait DocumentService: Send + Sync + 'static {
    /// Decode the document a locator points at
    fn open<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Box<dyn DocumentHandle>>>;
}

/// A decoded document
pub trait DocumentHandle: Send + Sync {
    fn page_count(&self) -> u32;

    /// Load a page by 1-based number
    fn page(&self, number: u32) -> BoxFuture<'_, Result<Box<dyn PageHandle>>>;
}

/// A decoded page
pub trait PageHandle: Send + Sync {
    /// 1-based page number
    fn number(&self) -> u32;

    /// Page size at `scale` (1.0 is the natural size)
    fn measure(&self, scale: f32) -> PageSize;

    /// Rasterize the page at `scale`
    fn paint(&self, scale: f32) -> BoxFuture<'_, Result<RgbaImage>>;
}
