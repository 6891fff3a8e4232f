//! Target surface, its container, and fit-to-container scaling

use crate::error::{Error, Result};
use crate::pdf::PageSize;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Upper bound on the fit scale so small pages in large containers stay small
pub const DEFAULT_MAX_SCALE: f32 = 2.0;

/// Measured pixel size of a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerSize {
    pub width: u32,
    pub height: u32,
}

impl ContainerSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A container with a zero dimension has not been laid out yet
    pub fn is_laid_out(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// The host element a surface lives in
pub trait Container: Send + Sync {
    /// Current measured size; zero while layout is pending
    fn size(&self) -> ContainerSize;
}

impl Container for ContainerSize {
    fn size(&self) -> ContainerSize {
        *self
    }
}

/// Container whose size the host updates as layout changes
#[derive(Debug, Default)]
pub struct ResizableContainer {
    size: Mutex<ContainerSize>,
}

impl ResizableContainer {
    pub fn new(size: ContainerSize) -> Self {
        Self {
            size: Mutex::new(size),
        }
    }

    pub fn resize(&self, size: ContainerSize) {
        *self.size.lock() = size;
    }
}

impl Container for ResizableContainer {
    fn size(&self) -> ContainerSize {
        *self.size.lock()
    }
}

impl<C: Container + ?Sized> Container for Arc<C> {
    fn size(&self) -> ContainerSize {
        (**self).size()
    }
}

/// Scale that fits `page` inside `container`, capped at `max_scale`
pub fn fit_scale(container: ContainerSize, page: PageSize, max_scale: f32) -> f32 {
    let scale_x = container.width as f32 / page.width;
    let scale_y = container.height as f32 / page.height;
    scale_x.min(scale_y).min(max_scale)
}

/// Pixel surface a page is rasterized into, bound to its container
pub struct TargetSurface {
    container: Box<dyn Container>,
    raster: RgbaImage,
}

/// Surface shared between the host view and the controller.
///
/// Lock order is surface before controller state. The controller never waits on
/// this lock while holding its own, so a host may query the controller while
/// holding the surface.
pub type SharedSurface = Arc<Mutex<TargetSurface>>;

impl TargetSurface {
    /// Empty (0x0) surface inside `container`
    pub fn new(container: impl Container + 'static) -> Self {
        Self {
            container: Box::new(container),
            raster: RgbaImage::new(0, 0),
        }
    }

    pub fn shared(container: impl Container + 'static) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(container)))
    }

    pub fn container_size(&self) -> ContainerSize {
        self.container.size()
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn raster(&self) -> &RgbaImage {
        &self.raster
    }

    /// Resize to `width`x`height` and draw `painted` at the origin.
    /// Pixels outside `painted` are transparent; anything beyond the new size is clipped.
    pub(crate) fn commit(&mut self, width: u32, height: u32, painted: RgbaImage) {
        if painted.dimensions() == (width, height) {
            self.raster = painted;
            return;
        }

        tracing::debug!(
            target_width = width,
            target_height = height,
            painted_width = painted.width(),
            painted_height = painted.height(),
            "painted raster differs from surface size"
        );
        let mut raster = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        image::imageops::replace(&mut raster, &painted, 0, 0);
        self.raster = raster;
    }

    /// Write the current raster as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.raster
            .save_with_format(path.as_ref(), image::ImageFormat::Png)
            .map_err(|e| Error::Paint {
                page: 1,
                reason: format!("Failed to encode preview as PNG: {}", e),
            })
    }
}
