//! Table of contents navigation.

use crate::document::ScrollRequest;
use crate::error::{ErrorKind, Result};
use crate::renderer::{Destination, OutlineNode, RendererHandle};
use exn::ResultExt;

/// One outline entry, flattened with its nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineItem {
    pub title: String,
    pub destination: Option<Destination>,
    /// 0 for top-level entries.
    pub depth: usize,
    resolved_page: Option<u32>,
}
impl OutlineItem {
    /// Page number, once the item has been activated.
    pub fn resolved_page(&self) -> Option<u32> {
        self.resolved_page
    }
}

/// A document's outline, distinguishing "not loaded yet" from "has none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Outline {
    #[default]
    NotLoaded,
    Empty,
    Items(Vec<OutlineItem>),
}
impl Outline {
    pub fn items(&self) -> &[OutlineItem] {
        match self {
            Self::Items(items) => items,
            _ => &[],
        }
    }
}

/// Loads the outline and turns activations into scroll requests.
#[derive(Debug, Default)]
pub struct OutlineResolver {
    outline: Outline,
}

impl OutlineResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    /// Fetch and flatten the outline (depth first, parents before children).
    pub async fn load(&mut self, renderer: &RendererHandle) -> Result<&Outline> {
        let nodes = renderer.outline().await.or_raise(|| ErrorKind::Outline)?;
        let mut items = Vec::new();
        flatten(nodes, 0, &mut items);
        tracing::debug!(items = items.len(), "Outline loaded");
        self.outline = if items.is_empty() { Outline::Empty } else { Outline::Items(items) };
        Ok(&self.outline)
    }

    /// Resolve item `index` to a page of a `page_count` page document.
    ///
    /// The page is remembered on the item, so activating it again doesn't
    /// consult the renderer. Items without a destination, unknown indexes,
    /// failed resolutions and pages outside the document all give `None`.
    pub async fn activate(&mut self, renderer: &RendererHandle, index: usize, page_count: u32) -> Option<ScrollRequest> {
        let Outline::Items(items) = &mut self.outline else {
            return None;
        };
        let item = items.get_mut(index)?;
        if let Some(page) = item.resolved_page {
            return Some(ScrollRequest::smooth(page));
        }
        let Some(destination) = &item.destination else {
            tracing::debug!(index, title = %item.title, "Outline item has no destination");
            return None;
        };
        let resolved = renderer.resolve_destination(destination).await;
        match resolved {
            Ok(page) if !(1..=page_count).contains(&page) => {
                tracing::warn!(index, title = %item.title, page, page_count, "Outline destination is outside the document");
                None
            },
            Ok(page) => {
                item.resolved_page = Some(page);
                Some(ScrollRequest::smooth(page))
            },
            Err(error) => {
                tracing::warn!(index, title = %item.title, %error, "Outline destination could not be resolved");
                None
            },
        }
    }
}

fn flatten(nodes: Vec<OutlineNode>, depth: usize, items: &mut Vec<OutlineItem>) {
    for node in nodes {
        items.push(OutlineItem {
            title: node.title,
            destination: node.destination,
            depth,
            resolved_page: None,
        });
        flatten(node.children, depth + 1, items);
    }
}
