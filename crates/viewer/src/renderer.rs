//! The seam between the viewer and whatever turns PDF pages into pixels.

use crate::error::Result;
use async_trait::async_trait;
use derive_more::Display;
use std::sync::Arc;

/// Where a document's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Bytes(Vec<u8>),
    Url(String),
}

/// Opaque reference into a document's internal structure.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct Destination(String);
impl Destination {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One entry of a document's embedded table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub title: String,
    pub destination: Option<Destination>,
    pub children: Vec<OutlineNode>,
}

/// RGBA pixels of a rendered page.
#[derive(Clone, PartialEq, Eq)]
pub struct Pixmap {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}
impl std::fmt::Debug for Pixmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pixmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Output of rendering one page: its pixels and the text runs on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub pixels: Pixmap,
    pub text: Vec<String>,
}

/// Renders the pages of one open document.
///
/// Page numbers are 1-based. Implementations must tolerate concurrent
/// `render_page` calls for different pages.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn page_count(&self) -> Result<u32>;

    /// Render `page` at `scale` (1.0 is 72 pixels per inch).
    async fn render_page(&self, page: u32, scale: f32) -> Result<RenderedPage>;

    async fn outline(&self) -> Result<Vec<OutlineNode>>;

    /// Page number a destination points at.
    async fn resolve_destination(&self, destination: &Destination) -> Result<u32>;
}

pub type RendererHandle = Arc<dyn DocumentRenderer + Send + Sync>;
