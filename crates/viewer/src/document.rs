use crate::error::{ErrorKind, Result};
use crate::renderer::{DocumentSource, Pixmap, RendererHandle};
use exn::ResultExt;

/// How a scroll should be animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
}

/// Ask the host to bring a page into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub page: u32,
    pub behavior: ScrollBehavior,
}
impl ScrollRequest {
    pub fn smooth(page: u32) -> Self {
        Self { page, behavior: ScrollBehavior::Smooth }
    }
}

/// A run of searchable text on a rendered page.
///
/// The original text is fixed at creation; search only ever changes the
/// display text, and clearing a search copies the original back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    page_number: u32,
    original_text: String,
    display_text: String,
}
impl TextSpan {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        let original_text = text.into();
        Self { page_number, display_text: original_text.clone(), original_text }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn is_highlighted(&self) -> bool {
        self.display_text != self.original_text
    }

    pub(crate) fn set_display_text(&mut self, text: String) {
        self.display_text = text;
    }

    pub(crate) fn restore(&mut self) {
        if self.is_highlighted() {
            self.display_text.clone_from(&self.original_text);
        }
    }
}

/// Render state of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    page_number: u32,
    rendered: bool,
    pending: bool,
    failures: u32,
    pixels: Option<Pixmap>,
    text_spans: Vec<TextSpan>,
}
impl PageState {
    fn new(page_number: u32) -> Self {
        Self {
            page_number,
            rendered: false,
            pending: false,
            failures: 0,
            pixels: None,
            text_spans: Vec::new(),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    /// A render has been requested and not completed yet.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Number of failed render attempts.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn pixels(&self) -> Option<&Pixmap> {
        self.pixels.as_ref()
    }

    pub fn text_spans(&self) -> &[TextSpan] {
        &self.text_spans
    }

    pub(crate) fn text_spans_mut(&mut self) -> &mut [TextSpan] {
        &mut self.text_spans
    }

    /// Returns `false` if the page is already rendered or in flight.
    pub(crate) fn request(&mut self) -> bool {
        if self.rendered || self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub(crate) fn fail(&mut self) {
        self.pending = false;
        self.failures += 1;
    }

    /// Store the render output. `rendered` only ever flips once.
    pub(crate) fn fill(&mut self, pixels: Pixmap, text: Vec<String>) -> bool {
        if self.rendered {
            return false;
        }
        let page_number = self.page_number;
        self.pending = false;
        self.rendered = true;
        self.pixels = Some(pixels);
        self.text_spans = text.into_iter().map(|text| TextSpan::new(page_number, text)).collect();
        true
    }
}

/// A document opened in the viewer. Dropped when the viewer closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    source: DocumentSource,
    pages: Vec<PageState>,
}
impl OpenDocument {
    /// Ask the renderer for the page count and lay out unrendered pages.
    pub async fn open(source: DocumentSource, renderer: &RendererHandle) -> Result<Self> {
        let page_count = renderer.page_count().await.or_raise(|| ErrorKind::Open)?;
        tracing::debug!(page_count, "Document opened");
        Ok(Self { source, pages: (1..=page_count).map(PageState::new).collect() })
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn page_count(&self) -> u32 {
        u32::try_from(self.pages.len()).unwrap_or(u32::MAX)
    }

    pub fn pages(&self) -> &[PageState] {
        &self.pages
    }

    /// 1-based page lookup.
    pub fn page(&self, page_number: u32) -> Option<&PageState> {
        let index = usize::try_from(page_number).ok()?.checked_sub(1)?;
        self.pages.get(index)
    }

    pub(crate) fn page_mut(&mut self, page_number: u32) -> Option<&mut PageState> {
        let index = usize::try_from(page_number).ok()?.checked_sub(1)?;
        self.pages.get_mut(index)
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [PageState] {
        &mut self.pages
    }

    pub fn rendered_count(&self) -> usize {
        self.pages.iter().filter(|page| page.rendered).count()
    }
}
