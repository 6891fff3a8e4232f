//! Render status and the snapshot published to the presentation layer

use serde::Serialize;

/// Outcome of the most recent render attempt for the selected document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum RenderStatus {
    /// Nothing rendered for the current selection
    #[default]
    Idle,
    /// A render is in flight
    Loading,
    /// The first page is painted on the surface
    Ready,
    /// The last render failed; carries the user-facing message
    Errored(String),
}

impl RenderStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, RenderStatus::Loading)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RenderStatus::Errored(message) => Some(message),
            _ => None,
        }
    }
}

/// Everything the presentation layer binds to, captured at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewSnapshot {
    /// Selected index into the document list
    pub index: usize,
    /// Number of documents in the list
    pub document_count: usize,
    /// Locator of the selected document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: RenderStatus,
}
