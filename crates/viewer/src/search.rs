//! Full-text search over rendered page text.
//!
//! The query is matched literally (it is escaped before being compiled) and
//! case-insensitively, within each [`TextSpan`] and never across spans. Every
//! match is wrapped in the configured markers; clearing puts each span's
//! original text back.

use crate::document::{OpenDocument, PageState, ScrollRequest, TextSpan};
use ::regex::{Regex, RegexBuilder, escape as regex_escape};
use std::borrow::Cow;
use std::collections::BTreeSet;

/// Text inserted around each match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightMarkers {
    pub open: String,
    pub close: String,
}
impl Default for HighlightMarkers {
    fn default() -> Self {
        Self { open: "<mark>".to_string(), close: "</mark>".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub matched_pages: BTreeSet<u32>,
    pub first_match_page: Option<u32>,
}

/// Result of [`SearchEngine::set_query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub matched_pages: Vec<u32>,
    /// Set at most once per query: the first page with a match.
    pub scroll_to: Option<ScrollRequest>,
}

pub struct SearchEngine {
    markers: HighlightMarkers,
    state: SearchState,
    pattern: Option<Regex>,
}

impl SearchEngine {
    pub fn new(markers: HighlightMarkers) -> Self {
        Self { markers, state: SearchState::default(), pattern: None }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Highlight `query` on every rendered page.
    ///
    /// Previous highlights are removed first. An empty query is the same as
    /// [`clear`](Self::clear).
    pub fn set_query(&mut self, document: &mut OpenDocument, query: &str) -> SearchOutcome {
        self.clear(document);
        if query.is_empty() {
            return SearchOutcome::default();
        }
        self.state.query = query.to_string();
        self.pattern = compile(query);

        let Some(pattern) = &self.pattern else {
            return SearchOutcome::default();
        };
        let mut matches = 0;
        for page in document.pages_mut().iter_mut().filter(|page| page.is_rendered()) {
            let found = highlight_page(pattern, &self.markers, page);
            if found > 0 {
                self.state.matched_pages.insert(page.page_number());
                matches += found;
            }
        }
        self.state.first_match_page = self.state.matched_pages.first().copied();
        tracing::debug!(query, matches, pages = self.state.matched_pages.len(), "Search applied");
        SearchOutcome {
            matched_pages: self.state.matched_pages.iter().copied().collect(),
            scroll_to: self.state.first_match_page.map(ScrollRequest::smooth),
        }
    }

    /// Remove every highlight and forget the query.
    pub fn clear(&mut self, document: &mut OpenDocument) {
        for page in document.pages_mut() {
            page.text_spans_mut().iter_mut().for_each(TextSpan::restore);
        }
        self.pattern = None;
        self.state = SearchState::default();
    }

    /// Apply the active query to a page that has just been rendered.
    ///
    /// Returns `true` if the page has a match. Never scrolls.
    pub fn register_page(&mut self, page: &mut PageState) -> bool {
        let Some(pattern) = &self.pattern else {
            return false;
        };
        if highlight_page(pattern, &self.markers, page) == 0 {
            return false;
        }
        self.state.matched_pages.insert(page.page_number());
        self.state.first_match_page = self.state.matched_pages.first().copied();
        true
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(HighlightMarkers::default())
    }
}

fn compile(query: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex_escape(query)).case_insensitive(true).build() {
        Ok(pattern) => Some(pattern),
        Err(error) => {
            // Only reachable through size limits; the pattern itself is literal.
            tracing::warn!(query, %error, "Search query could not be compiled");
            None
        },
    }
}

/// Highlight every match on `page`, returning how many there were.
fn highlight_page(pattern: &Regex, markers: &HighlightMarkers, page: &mut PageState) -> usize {
    let mut found = 0;
    for span in page.text_spans_mut() {
        let count = pattern.find_iter(span.original_text()).count();
        if count == 0 {
            continue;
        }
        found += count;
        let highlighted = pattern.replace_all(span.original_text(), |caps: &::regex::Captures<'_>| {
            format!("{}{}{}", markers.open, &caps[0], markers.close)
        });
        if let Cow::Owned(text) = highlighted {
            span.set_display_text(text);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRenderer;
    use crate::renderer::{DocumentSource, RendererHandle};
    use crate::scheduler::{PageScheduler, RenderMode};
    use rstest::rstest;
    use std::sync::Arc;

    /// Open a document and render every page.
    async fn rendered(pages: Vec<Vec<&str>>) -> OpenDocument {
        let renderer: RendererHandle = Arc::new(MockRenderer::with_pages(pages));
        let mut document = OpenDocument::open(DocumentSource::Url("mock://manual.pdf".to_string()), &renderer).await.unwrap();
        let mut scheduler = PageScheduler::new(RenderMode::Eager, 1.0, 1.0);
        let mut search = SearchEngine::default();
        for page in scheduler.attach(&mut document) {
            scheduler.render_now(&renderer, &mut document, &mut search, page).await.unwrap();
        }
        document
    }

    fn display(document: &OpenDocument) -> Vec<Vec<String>> {
        document
            .pages()
            .iter()
            .map(|page| page.text_spans().iter().map(|span| span.display_text().to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_single_case_insensitive_match() {
        let mut document = rendered(vec![vec!["Error Code 42 List"]]).await;
        let mut search = SearchEngine::default();
        let outcome = search.set_query(&mut document, "error");
        assert_eq!(outcome.matched_pages, vec![1]);
        assert_eq!(outcome.scroll_to, Some(ScrollRequest::smooth(1)));
        assert_eq!(display(&document), vec![vec!["<mark>Error</mark> Code 42 List".to_string()]]);

        search.clear(&mut document);
        assert_eq!(document.pages()[0].text_spans()[0].display_text(), "Error Code 42 List");
        assert_eq!(search.state(), &SearchState::default());
    }

    #[rstest]
    #[case("A+B", "xA+By AAB", "x<mark>A+B</mark>y AAB")]
    #[case("(1)", "step (1) of 3", "step <mark>(1)</mark> of 3")]
    #[case(".", "v1.2", "v1<mark>.</mark>2")]
    #[case("a", "Banana", "B<mark>a</mark>n<mark>a</mark>n<mark>a</mark>")]
    #[case("ß", "STRASSE straße", "STRASSE stra<mark>ß</mark>e")]
    #[tokio::test]
    async fn test_literal_matching(#[case] query: &str, #[case] text: &str, #[case] expected: &str) {
        let mut document = rendered(vec![vec![text]]).await;
        let mut search = SearchEngine::default();
        search.set_query(&mut document, query);
        assert_eq!(document.pages()[0].text_spans()[0].display_text(), expected);
    }

    #[tokio::test]
    async fn test_matches_never_span_two_spans() {
        let mut document = rendered(vec![vec!["Parts ", "Book"]]).await;
        let mut search = SearchEngine::default();
        let outcome = search.set_query(&mut document, "parts book");
        assert!(outcome.matched_pages.is_empty());
        assert_eq!(outcome.scroll_to, None);
    }

    #[tokio::test]
    async fn test_scrolls_to_first_matching_page() {
        let mut document = rendered(vec![vec!["cover"], vec!["nothing"], vec!["thread tension"], vec!["Tension"]]).await;
        let mut search = SearchEngine::default();
        let outcome = search.set_query(&mut document, "tension");
        assert_eq!(outcome.matched_pages, vec![3, 4]);
        assert_eq!(outcome.scroll_to, Some(ScrollRequest::smooth(3)));
    }

    #[tokio::test]
    async fn test_clear_after_many_queries_restores_everything() {
        let pages = vec![vec!["Error Code 42 List", "<b>raw</b>"], vec!["mark", "Needle in a haystack"]];
        let mut document = rendered(pages).await;
        let original = display(&document);
        let mut search = SearchEngine::new(HighlightMarkers { open: "[".to_string(), close: "]".to_string() });
        for query in ["e", "mark", "[", "needle", "", "co", "E"] {
            search.set_query(&mut document, query);
        }
        assert_ne!(display(&document), original);
        search.clear(&mut document);
        assert_eq!(display(&document), original);
    }

    #[tokio::test]
    async fn test_new_query_replaces_old_highlights() {
        let mut document = rendered(vec![vec!["needle haystack"]]).await;
        let mut search = SearchEngine::default();
        search.set_query(&mut document, "needle");
        search.set_query(&mut document, "hay");
        assert_eq!(document.pages()[0].text_spans()[0].display_text(), "needle <mark>hay</mark>stack");
    }

    #[tokio::test]
    async fn test_unrendered_pages_are_highlighted_on_registration() {
        let renderer: RendererHandle = Arc::new(MockRenderer::with_pages(vec![vec!["alpha"], vec!["beta alpha"]]));
        let mut document = OpenDocument::open(DocumentSource::Bytes(Vec::new()), &renderer).await.unwrap();
        let mut scheduler = PageScheduler::new(RenderMode::Lazy, 1.0, 1.0);
        let mut search = SearchEngine::default();
        scheduler.attach(&mut document);

        let outcome = search.set_query(&mut document, "alpha");
        assert!(outcome.matched_pages.is_empty());
        assert_eq!(outcome.scroll_to, None);

        scheduler.render_now(&renderer, &mut document, &mut search, 2).await.unwrap();
        assert_eq!(document.page(2).unwrap().text_spans()[0].display_text(), "beta <mark>alpha</mark>");
        assert_eq!(search.state().first_match_page, Some(2));
        assert_eq!(search.state().matched_pages.iter().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_first_match_is_lowest_page_regardless_of_render_order() {
        let pages = vec![vec!["alpha"], vec!["beta"], vec!["alpha beta"]];
        let renderer: RendererHandle = Arc::new(MockRenderer::with_pages(pages));
        let mut document = OpenDocument::open(DocumentSource::Bytes(Vec::new()), &renderer).await.unwrap();
        let mut scheduler = PageScheduler::new(RenderMode::Lazy, 1.0, 1.0);
        let mut search = SearchEngine::default();
        scheduler.attach(&mut document);
        search.set_query(&mut document, "alpha");

        scheduler.render_now(&renderer, &mut document, &mut search, 3).await.unwrap();
        assert_eq!(search.state().first_match_page, Some(3));
        scheduler.render_now(&renderer, &mut document, &mut search, 1).await.unwrap();
        assert_eq!(search.state().first_match_page, Some(1));
        assert_eq!(search.state().matched_pages.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }
}
