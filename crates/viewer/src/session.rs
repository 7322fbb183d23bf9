//! Host ↔ viewer messaging.
//!
//! A [`ViewerSession`] owns everything about one open document. The host
//! talks to it through a [`ViewerHandle`] and listens for [`ViewerEvent`]s;
//! [`ViewerSession::run`] is the only place where state changes.

use crate::document::{OpenDocument, ScrollRequest};
use crate::error::{Error, ErrorKind, Result};
use crate::outline::{Outline, OutlineResolver};
use crate::renderer::{DocumentSource, RenderedPage, RendererHandle};
use crate::scheduler::{PageScheduler, RenderMode};
use crate::search::{HighlightMarkers, SearchEngine, SearchState};
use exn::ResultExt;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerOptions {
    pub mode: RenderMode,
    pub scale: f32,
    pub device_pixel_ratio: f32,
    pub markers: HighlightMarkers,
}
impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            mode: RenderMode::Lazy,
            scale: 1.0,
            device_pixel_ratio: 1.0,
            markers: HighlightMarkers::default(),
        }
    }
}

/// Messages from the host to the viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Visibility { page: u32, visible: bool },
    Search(String),
    ClearSearch,
    /// Index into the flattened outline.
    ActivateOutline(usize),
    FocusSearch,
    Close,
}

/// Parses the raw text commands a host can post.
impl FromStr for HostCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "focusSearch" => Ok(Self::FocusSearch),
            "clearSearch" => Ok(Self::ClearSearch),
            "close" => Ok(Self::Close),
            other => exn::bail!(ErrorKind::UnknownCommand(other.to_string())),
        }
    }
}

/// Messages from the viewer to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    Opened { page_count: u32 },
    OutlineLoaded(Outline),
    PageRendered(u32),
    PageFailed(u32),
    ScrollTo(ScrollRequest),
    SearchUpdated { query: String, matched_pages: Vec<u32> },
    FocusSearch,
    Closed,
}

/// The host's end of a session.
#[derive(Debug, Clone)]
pub struct ViewerHandle {
    commands: mpsc::Sender<HostCommand>,
    token: CancellationToken,
}

impl ViewerHandle {
    pub async fn send(&self, command: HostCommand) -> Result<()> {
        self.commands.send(command).await.or_raise(|| ErrorKind::Closed)
    }

    /// Parse and send a raw text command such as `"focusSearch"`.
    pub async fn send_text(&self, command: &str) -> Result<()> {
        self.send(command.parse()?).await
    }

    /// Stop the session without waiting for queued commands. Renders still in
    /// flight are dropped.
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled() || self.commands.is_closed()
    }
}

pub struct ViewerSession {
    renderer: RendererHandle,
    document: OpenDocument,
    scheduler: PageScheduler,
    outline: OutlineResolver,
    search: SearchEngine,
    events: mpsc::Sender<ViewerEvent>,
    token: CancellationToken,
}

impl ViewerSession {
    /// Open `source` and load its outline.
    ///
    /// Only a failure to open the document is an error. An outline that can't
    /// be loaded is logged and reported to the host as empty. Nothing is sent
    /// to the host until [`run`](Self::run) starts.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn open(
        source: DocumentSource,
        renderer: RendererHandle,
        options: ViewerOptions,
        events: mpsc::Sender<ViewerEvent>,
    ) -> Result<Self> {
        let document = OpenDocument::open(source, &renderer).await?;
        let mut outline = OutlineResolver::new();
        if let Err(error) = outline.load(&renderer).await {
            tracing::warn!(%error, "Outline could not be loaded");
        }
        Ok(Self {
            scheduler: PageScheduler::new(options.mode, options.scale, options.device_pixel_ratio),
            search: SearchEngine::new(options.markers),
            token: CancellationToken::new(),
            outline,
            renderer,
            document,
            events,
        })
    }

    /// A handle for the host, and the command queue to pass to [`run`](Self::run).
    pub fn handle(&self, buffer: usize) -> (ViewerHandle, mpsc::Receiver<HostCommand>) {
        let (commands, receiver) = mpsc::channel(buffer);
        (ViewerHandle { commands, token: self.token.clone() }, receiver)
    }

    pub fn document(&self) -> &OpenDocument {
        &self.document
    }

    pub fn outline(&self) -> &Outline {
        self.outline.outline()
    }

    pub fn search_state(&self) -> &SearchState {
        self.search.state()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    /// Process commands and finished renders until the host closes the
    /// session, drops every handle, or cancels the token.
    ///
    /// Returns the document as it was left. Once the session is cancelled,
    /// events the host has no room for are dropped instead of waited on.
    pub async fn run(mut self, mut commands: mpsc::Receiver<HostCommand>) -> OpenDocument {
        let token = self.token.clone();
        self.emit(ViewerEvent::Opened { page_count: self.document.page_count() }).await;
        let outline = match self.outline.outline() {
            // Loading failed in `open`.
            Outline::NotLoaded => Outline::Empty,
            outline => outline.clone(),
        };
        self.emit(ViewerEvent::OutlineLoaded(outline)).await;
        let mut in_flight = FuturesUnordered::new();
        for page in self.scheduler.attach(&mut self.document) {
            in_flight.push(self.scheduler.render(&self.renderer, page));
        }
        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                Some((page, result)) = in_flight.next(), if !in_flight.is_empty() => {
                    self.finish_render(page, result).await;
                },
                command = commands.recv() => match command {
                    None | Some(HostCommand::Close) => break,
                    Some(command) => {
                        if let Some(page) = self.apply(command).await {
                            in_flight.push(self.scheduler.render(&self.renderer, page));
                        }
                    },
                },
            }
        }
        if !in_flight.is_empty() {
            tracing::debug!(dropped = in_flight.len(), "Discarding renders still in flight");
        }
        drop(in_flight);
        self.emit(ViewerEvent::Closed).await;
        token.cancel();
        self.document
    }

    /// Returns a page that now needs rendering.
    async fn apply(&mut self, command: HostCommand) -> Option<u32> {
        tracing::trace!(?command, "Host command");
        match command {
            HostCommand::Visibility { page, visible } => {
                return self.scheduler.on_visibility_change(&mut self.document, page, visible);
            },
            HostCommand::Search(query) => {
                let outcome = self.search.set_query(&mut self.document, &query);
                self.emit(ViewerEvent::SearchUpdated { query, matched_pages: outcome.matched_pages }).await;
                if let Some(scroll) = outcome.scroll_to {
                    self.emit(ViewerEvent::ScrollTo(scroll)).await;
                }
            },
            HostCommand::ClearSearch => {
                self.search.clear(&mut self.document);
                self.emit(ViewerEvent::SearchUpdated { query: String::new(), matched_pages: Vec::new() }).await;
            },
            HostCommand::ActivateOutline(index) => {
                let page_count = self.document.page_count();
                if let Some(scroll) = self.outline.activate(&self.renderer, index, page_count).await {
                    self.emit(ViewerEvent::ScrollTo(scroll)).await;
                }
            },
            HostCommand::FocusSearch => self.emit(ViewerEvent::FocusSearch).await,
            // Ends the run loop before reaching here.
            HostCommand::Close => {},
        }
        None
    }

    async fn finish_render(&mut self, page: u32, result: Result<RenderedPage>) {
        match self.scheduler.complete(&mut self.document, &mut self.search, page, result) {
            Ok(matched) => {
                self.emit(ViewerEvent::PageRendered(page)).await;
                if matched {
                    let state = self.search.state();
                    let event = ViewerEvent::SearchUpdated {
                        query: state.query.clone(),
                        matched_pages: state.matched_pages.iter().copied().collect(),
                    };
                    self.emit(event).await;
                }
            },
            // Already logged by the scheduler.
            Err(_) => self.emit(ViewerEvent::PageFailed(page)).await,
        }
    }

    /// Wait for room in the event queue, unless the session is cancelled, in
    /// which case the event is only sent if there is room right away.
    async fn emit(&self, event: ViewerEvent) {
        let permit = tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            permit = self.events.reserve() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::trace!("Host is no longer listening for viewer events");
                    return;
                },
            },
        };
        match permit {
            Some(permit) => permit.send(event),
            None => {
                if let Err(error) = self.events.try_send(event) {
                    tracing::debug!(%error, "Dropping viewer event after close");
                }
            },
        }
    }
}
