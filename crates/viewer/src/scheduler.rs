//! Decides when pages get rendered.

use crate::document::OpenDocument;
use crate::error::{ErrorKind, Result};
use crate::renderer::{RenderedPage, RendererHandle};
use crate::search::SearchEngine;
use exn::ResultExt;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::BTreeSet;

/// A page render in flight, resolving to its page number and output.
pub type RenderTask = BoxFuture<'static, (u32, Result<RenderedPage>)>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Render a page the first time it becomes visible.
    #[default]
    Lazy,
    /// Render every page as soon as the document is attached.
    Eager,
}

/// Turns visibility changes into render requests.
///
/// Each page is rendered at most once and never evicted. A failed render is
/// logged and the page is requested again the next time it becomes visible.
#[derive(Debug, Clone)]
pub struct PageScheduler {
    mode: RenderMode,
    scale: f32,
    visible: BTreeSet<u32>,
}

impl PageScheduler {
    /// Pages are rendered at `scale × device_pixel_ratio`.
    pub fn new(mode: RenderMode, scale: f32, device_pixel_ratio: f32) -> Self {
        Self { mode, scale: scale * device_pixel_ratio, visible: BTreeSet::new() }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_visible(&self, page: u32) -> bool {
        self.visible.contains(&page)
    }

    /// Pages to render right away: all of them in [`RenderMode::Eager`],
    /// none in [`RenderMode::Lazy`].
    pub fn attach(&mut self, document: &mut OpenDocument) -> Vec<u32> {
        self.visible.clear();
        match self.mode {
            RenderMode::Lazy => Vec::new(),
            RenderMode::Eager => document
                .pages_mut()
                .iter_mut()
                .filter_map(|page| page.request().then_some(page.page_number()))
                .collect(),
        }
    }

    /// Record that `page` became visible or hidden. Returns the page if it
    /// now needs rendering.
    pub fn on_visibility_change(&mut self, document: &mut OpenDocument, page: u32, visible: bool) -> Option<u32> {
        let Some(state) = document.page_mut(page) else {
            tracing::warn!(page, "Visibility change for a page that does not exist");
            return None;
        };
        if !visible {
            self.visible.remove(&page);
            return None;
        }
        self.visible.insert(page);
        state.request().then_some(page)
    }

    /// Start rendering `page`. The task owns everything it needs, so it can
    /// run alongside other renders.
    pub fn render(&self, renderer: &RendererHandle, page: u32) -> RenderTask {
        let renderer = renderer.clone();
        let scale = self.scale;
        async move {
            let result = renderer.render_page(page, scale).await.or_raise(|| ErrorKind::Render(page));
            (page, result)
        }
        .boxed()
    }

    /// Apply a finished render to the document and hand the new text to the
    /// search engine.
    ///
    /// Returns whether the page matches the active search.
    pub fn complete(
        &mut self,
        document: &mut OpenDocument,
        search: &mut SearchEngine,
        page: u32,
        result: Result<RenderedPage>,
    ) -> Result<bool> {
        let Some(state) = document.page_mut(page) else {
            exn::bail!(ErrorKind::Render(page));
        };
        match result {
            Ok(rendered) => {
                if !state.fill(rendered.pixels, rendered.text) {
                    tracing::debug!(page, "Page already rendered, dropping duplicate output");
                    return Ok(false);
                }
                tracing::trace!(page, spans = state.text_spans().len(), "Page rendered");
                Ok(search.register_page(state))
            },
            Err(error) => {
                state.fail();
                tracing::warn!(page, failures = state.failures(), %error, "Page render failed");
                Err(error)
            },
        }
    }

    /// Render `page` (if it still needs it) and wait for the result.
    ///
    /// Returns `Ok(false)` when there was nothing to do.
    pub async fn render_now(
        &mut self,
        renderer: &RendererHandle,
        document: &mut OpenDocument,
        search: &mut SearchEngine,
        page: u32,
    ) -> Result<bool> {
        let Some(state) = document.page_mut(page) else {
            exn::bail!(ErrorKind::Render(page));
        };
        if state.is_rendered() {
            return Ok(false);
        }
        // Eager attach has already marked every page as requested.
        state.request();
        let (page, result) = self.render(renderer, page).await;
        self.complete(document, search, page, result)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRenderer;
    use crate::renderer::DocumentSource;
    use std::sync::Arc;

    async fn open(renderer: &RendererHandle) -> OpenDocument {
        OpenDocument::open(DocumentSource::Bytes(b"%PDF-1.7".to_vec()), renderer).await.unwrap()
    }

    #[tokio::test]
    async fn test_lazy_renders_on_first_visibility_only() {
        let mock = Arc::new(MockRenderer::with_pages(vec![vec!["one"], vec!["two"], vec!["three"]]));
        let renderer: RendererHandle = mock.clone();
        let mut document = open(&renderer).await;
        let mut scheduler = PageScheduler::new(RenderMode::Lazy, 1.0, 2.0);
        let mut search = SearchEngine::default();
        assert!(scheduler.attach(&mut document).is_empty());
        assert_eq!(scheduler.scale(), 2.0);

        assert_eq!(scheduler.on_visibility_change(&mut document, 2, true), Some(2));
        assert_eq!(scheduler.on_visibility_change(&mut document, 2, true), None, "already in flight");
        let (page, result) = scheduler.render(&renderer, 2).await;
        assert!(!scheduler.complete(&mut document, &mut search, page, result).unwrap());

        assert_eq!(scheduler.on_visibility_change(&mut document, 2, false), None);
        assert_eq!(scheduler.on_visibility_change(&mut document, 2, true), None, "never re-rendered");
        assert_eq!(scheduler.on_visibility_change(&mut document, 9, true), None);
        assert_eq!(document.rendered_count(), 1);
        assert_eq!(mock.renders().await, vec![2]);
        assert_eq!(document.page(2).unwrap().pixels().map(|p| p.width), Some(12));
    }

    #[tokio::test]
    async fn test_eager_renders_every_page_once() {
        let mock = Arc::new(MockRenderer::with_pages(vec![vec!["one"], vec!["two"], vec!["three"]]));
        let renderer: RendererHandle = mock.clone();
        let mut document = open(&renderer).await;
        let mut scheduler = PageScheduler::new(RenderMode::Eager, 1.0, 1.0);
        let mut search = SearchEngine::default();
        let pages = scheduler.attach(&mut document);
        assert_eq!(pages, vec![1, 2, 3]);
        for page in pages {
            assert!(scheduler.render_now(&renderer, &mut document, &mut search, page).await.unwrap());
        }
        assert_eq!(scheduler.on_visibility_change(&mut document, 1, true), None);
        assert!(!scheduler.render_now(&renderer, &mut document, &mut search, 1).await.unwrap());
        assert_eq!(document.rendered_count(), 3);
        assert_eq!(mock.renders().await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_pages_complete_in_any_order() {
        use futures::StreamExt;
        use futures::stream::FuturesUnordered;

        let mock = Arc::new(MockRenderer::with_pages(vec![vec!["one"], vec!["two"]]).with_yields(1, 3));
        let renderer: RendererHandle = mock.clone();
        let mut document = open(&renderer).await;
        let mut scheduler = PageScheduler::new(RenderMode::Eager, 1.0, 1.0);
        let mut search = SearchEngine::default();
        let mut in_flight: FuturesUnordered<_> =
            scheduler.attach(&mut document).into_iter().map(|page| scheduler.render(&renderer, page)).collect();
        while let Some((page, result)) = in_flight.next().await {
            scheduler.complete(&mut document, &mut search, page, result).unwrap();
        }
        assert_eq!(mock.renders().await, vec![2, 1]);
        assert_eq!(document.rendered_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_is_isolated_and_retried() {
        let mock = Arc::new(MockRenderer::with_pages(vec![vec!["one"], vec!["two"]]).failing_page(1, 1));
        let renderer: RendererHandle = mock.clone();
        let mut document = open(&renderer).await;
        let mut scheduler = PageScheduler::new(RenderMode::Lazy, 1.0, 1.0);
        let mut search = SearchEngine::default();

        let err = scheduler.render_now(&renderer, &mut document, &mut search, 1).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Render(1)));
        assert!(scheduler.render_now(&renderer, &mut document, &mut search, 2).await.unwrap());
        assert!(!document.page(1).unwrap().is_rendered());
        assert!(document.page(2).unwrap().is_rendered());

        assert_eq!(scheduler.on_visibility_change(&mut document, 1, true), Some(1));
        let (page, result) = scheduler.render(&renderer, 1).await;
        scheduler.complete(&mut document, &mut search, page, result).unwrap();
        assert!(document.page(1).unwrap().is_rendered());
        assert_eq!(document.page(1).unwrap().failures(), 1);
    }
}
