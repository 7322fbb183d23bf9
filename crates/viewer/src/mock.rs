//! In-memory document renderer for testing.

use crate::error::{ErrorKind, Result};
use crate::renderer::{Destination, DocumentRenderer, OutlineNode, Pixmap, RenderedPage};
use async_trait::async_trait;
use exn::ResultExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Page size in points. Kept tiny so pixel buffers stay small.
const PAGE_SIZE: (f32, f32) = (6.0, 8.0);

/// Renders pages from a list of text runs.
///
/// Pixels are a blank RGBA buffer sized by the requested scale. Renders can
/// be made to fail a number of times per page, or to yield to the executor
/// first so concurrent renders finish in a chosen order.
pub struct MockRenderer {
    pages: Vec<Vec<String>>,
    outline: Vec<OutlineNode>,
    destinations: HashMap<Destination, u32>,
    failures: Mutex<HashMap<u32, usize>>,
    yields: HashMap<u32, usize>,
    renders: Mutex<Vec<u32>>,
    resolutions: AtomicUsize,
}

#[derive(Deserialize)]
struct DocumentFile {
    pages: Vec<Vec<String>>,
    #[serde(default)]
    outline: Vec<OutlineFile>,
}

#[derive(Deserialize)]
struct OutlineFile {
    title: String,
    /// Page the entry points at, if any.
    page: Option<u32>,
    #[serde(default)]
    children: Vec<OutlineFile>,
}

impl MockRenderer {
    pub fn with_pages(pages: impl IntoIterator<Item = impl IntoIterator<Item = impl Into<String>>>) -> Self {
        Self {
            pages: pages.into_iter().map(|page| page.into_iter().map(Into::into).collect()).collect(),
            outline: Vec::new(),
            destinations: HashMap::new(),
            failures: Mutex::default(),
            yields: HashMap::new(),
            renders: Mutex::default(),
            resolutions: AtomicUsize::new(0),
        }
    }

    /// Parse a document description:
    /// `{"pages": [["text", ...], ...], "outline": [{"title": "...", "page": 2, "children": []}]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: DocumentFile = serde_json::from_str(json).or_raise(|| ErrorKind::InvalidDocument)?;
        let mut renderer = Self::with_pages(file.pages);
        let outline = renderer.outline_from(file.outline);
        renderer.outline = outline;
        Ok(renderer)
    }

    fn outline_from(&mut self, entries: Vec<OutlineFile>) -> Vec<OutlineNode> {
        entries
            .into_iter()
            .map(|entry| {
                let destination = entry.page.map(|page| {
                    let destination = Destination::new(format!("page-{page}"));
                    self.destinations.insert(destination.clone(), page);
                    destination
                });
                OutlineNode { title: entry.title, destination, children: self.outline_from(entry.children) }
            })
            .collect()
    }

    pub fn with_outline(mut self, outline: Vec<OutlineNode>) -> Self {
        self.outline = outline;
        self
    }

    /// `destination` resolves to `page`. Unregistered destinations fail.
    pub fn with_destination(mut self, destination: &str, page: u32) -> Self {
        self.destinations.insert(Destination::new(destination), page);
        self
    }

    /// The first `times` renders of `page` fail.
    pub fn failing_page(mut self, page: u32, times: usize) -> Self {
        self.failures.get_mut().insert(page, times);
        self
    }

    /// Rendering `page` yields to the executor `count` times first.
    pub fn with_yields(mut self, page: u32, count: usize) -> Self {
        self.yields.insert(page, count);
        self
    }

    /// Pages rendered so far, in completion order (failures excluded).
    pub async fn renders(&self) -> Vec<u32> {
        self.renders.lock().await.clone()
    }

    /// Number of destination resolutions performed so far.
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentRenderer for MockRenderer {
    async fn page_count(&self) -> Result<u32> {
        Ok(u32::try_from(self.pages.len()).unwrap_or(u32::MAX))
    }

    async fn render_page(&self, page: u32, scale: f32) -> Result<RenderedPage> {
        for _ in 0..self.yields.get(&page).copied().unwrap_or(0) {
            tokio::task::yield_now().await;
        }
        let text = usize::try_from(page)
            .ok()
            .and_then(|page| page.checked_sub(1))
            .and_then(|index| self.pages.get(index))
            .ok_or_else(|| exn::Exn::from(ErrorKind::Render(page)))?;
        if let Some(remaining) = self.failures.lock().await.get_mut(&page)
            && *remaining > 0
        {
            *remaining -= 1;
            exn::bail!(ErrorKind::Render(page));
        }
        let width = (PAGE_SIZE.0 * scale).ceil() as u32;
        let height = (PAGE_SIZE.1 * scale).ceil() as u32;
        let pixels = Pixmap { width, height, data: vec![0xFF; (width * height * 4) as usize] };
        self.renders.lock().await.push(page);
        Ok(RenderedPage { pixels, text: text.clone() })
    }

    async fn outline(&self) -> Result<Vec<OutlineNode>> {
        Ok(self.outline.clone())
    }

    async fn resolve_destination(&self, destination: &Destination) -> Result<u32> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        self.destinations.get(destination).copied().ok_or_else(|| exn::Exn::from(ErrorKind::Destination))
    }
}
