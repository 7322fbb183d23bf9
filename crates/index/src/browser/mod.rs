//! Folder browser: screen state plus the controller that fills it.
//!
//! The controller is the only thing that talks to the indexer. Errors stop
//! here and turn into state ([`Load::Failed`] with a [`Notice`], or
//! [`Load::NoCachedData`]).

mod state;

pub use self::state::{BrowserState, Load, Notice, Toggle, VisibleFolder};

use crate::error::{ErrorKind, Result};
use crate::indexer::RepositoryIndexer;
use crate::models::DocumentEntry;
use exn::Exn;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Owns a [`BrowserState`] and drives it from a [`RepositoryIndexer`].
///
/// Fetches race against the controller's [`CancellationToken`]; once it is
/// cancelled, in-flight fetches are abandoned without touching the state.
pub struct BrowserController {
    indexer: RepositoryIndexer,
    state: BrowserState,
    model: Option<String>,
    token: CancellationToken,
}

impl BrowserController {
    pub fn new(indexer: RepositoryIndexer) -> Self {
        let state = BrowserState::new(indexer.connectivity().is_online());
        Self { indexer, state, model: None, token: CancellationToken::new() }
    }

    /// Only keep documents whose file name contains `model`.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    /// Handle for cancelling this controller's fetches from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Abandon in-flight fetches; later fetches are refused.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    async fn guarded<T>(&self, fetch: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Exn::from(ErrorKind::Cancelled)),
            result = fetch => result,
        }
    }

    /// Fetch the top-level folder list (live, or cached while offline).
    pub async fn load_root(&mut self) {
        self.state.begin_root();
        let result = self.guarded(self.indexer.top_level_folders()).await;
        self.state.apply_root(result);
    }

    /// Fetch the files of `name`.
    pub async fn expand(&mut self, name: &str) {
        self.state.begin_folder(name);
        let result = self.guarded(self.indexer.folder(name, self.model.as_deref())).await;
        self.state.apply_folder(name, result);
    }

    /// Expand or collapse `name`, fetching its files on first expansion.
    pub async fn toggle_folder(&mut self, name: &str) {
        if self.state.toggle_folder(name) == Toggle::NeedsFetch {
            self.expand(name).await;
        }
    }

    /// Record a connectivity change and reload the folder list if it changed.
    pub async fn set_online(&mut self, online: bool) {
        self.indexer.connectivity().set_online(online);
        if self.state.set_online(online) {
            self.load_root().await;
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.state.set_query(query);
    }

    pub fn dismiss_notice(&mut self) {
        self.state.dismiss_notice();
    }

    /// See [`BrowserState::open_document`].
    pub fn open_document(&mut self, entry: &DocumentEntry) -> Option<String> {
        self.state.open_document(entry)
    }

    pub fn visible_folders(&self) -> Vec<VisibleFolder<'_>> {
        self.state.visible_folders()
    }
}
