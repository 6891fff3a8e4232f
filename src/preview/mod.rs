//! Document preview: selection, render pipeline and save action

mod controller;
mod download;
mod state;
mod surface;

pub use controller::{PreviewConfig, PreviewController, SelectionWatch};
pub use download::{Downloader, FileDownloader, SaveAction};
pub use state::{PreviewSnapshot, RenderStatus};
pub use surface::{
    fit_scale, Container, ContainerSize, ResizableContainer, SharedSurface, TargetSurface,
    DEFAULT_MAX_SCALE,
};
