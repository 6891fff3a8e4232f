//! Locator parsing, resolution and caching

pub mod cache;
pub mod locator;
pub mod resolver;

pub use cache::DocumentCache;
pub use locator::Locator;
pub use resolver::{resolve_base64, resolve_path, resolve_url, SourceConfig, SourceResolver};
