use crate::error::{Error, ErrorKind};
use crate::filter::filter_folders;
use crate::models::{DocumentEntry, Source, Sourced};
use std::collections::BTreeMap;

/// Loading state of one piece of browser data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Load<T> {
    #[default]
    NotLoaded,
    Loading,
    Loaded {
        value: T,
        source: Source,
    },
    /// Offline with nothing cached for this key.
    NoCachedData,
    /// The live fetch failed; a notice was raised.
    Failed,
}
impl<T> Load<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// A dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}
impl Notice {
    fn new(title: &str, message: impl Into<String>) -> Self {
        Self { title: title.to_string(), message: message.into() }
    }
}

/// What [`BrowserState::toggle_folder`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    Expanded,
    /// Expanded, but the folder's files still have to be fetched.
    NeedsFetch,
}

/// A folder row as it should be displayed for the current query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleFolder<'a> {
    pub name: &'a str,
    pub expanded: bool,
    pub files: &'a Load<Vec<DocumentEntry>>,
    /// Files that pass the query (all of them when the folder name matches).
    pub shown: Vec<&'a DocumentEntry>,
}

/// Everything the folder browser screen shows.
///
/// Transitions are plain methods; the async work that feeds them lives in
/// [`BrowserController`](super::BrowserController).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserState {
    pub online: bool,
    pub root: Load<Vec<String>>,
    pub folders: BTreeMap<String, Load<Vec<DocumentEntry>>>,
    pub expanded: Option<String>,
    pub query: String,
    pub notice: Option<Notice>,
}

impl BrowserState {
    pub fn new(online: bool) -> Self {
        Self { online, ..Self::default() }
    }

    /// Collapse the folder if it is expanded, otherwise expand it (and
    /// collapse any other).
    pub fn toggle_folder(&mut self, name: &str) -> Toggle {
        if self.expanded.as_deref() == Some(name) {
            self.expanded = None;
            return Toggle::Collapsed;
        }
        self.expanded = Some(name.to_string());
        match self.folders.get(name) {
            Some(Load::Loaded { .. } | Load::Loading) => Toggle::Expanded,
            _ => Toggle::NeedsFetch,
        }
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Returns `true` if the state changed.
    pub fn set_online(&mut self, online: bool) -> bool {
        let changed = self.online != online;
        self.online = online;
        changed
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Download URL of `entry`, or `None` (and a notice) while offline.
    pub fn open_document(&mut self, entry: &DocumentEntry) -> Option<String> {
        if !self.online {
            self.notice = Some(Notice::new("Offline", "Cannot view PDF offline."));
            return None;
        }
        Some(entry.url.clone())
    }

    /// Mark the folder list as being fetched. A list already on screen
    /// stays there until the new result arrives.
    pub fn begin_root(&mut self) {
        if !matches!(self.root, Load::Loaded { .. }) {
            self.root = Load::Loading;
        }
    }

    pub fn apply_root(&mut self, result: Result<Sourced<Vec<String>>, Error>) {
        self.root = match result {
            Ok(sourced) => Load::Loaded { value: sourced.value, source: sourced.source },
            Err(error) => match self.failure(&error, "Failed to fetch folders.") {
                Some(load) => load,
                None => return self.cancelled_root(),
            },
        };
    }

    fn cancelled_root(&mut self) {
        if self.root.is_loading() {
            self.root = Load::NotLoaded;
        }
    }

    /// Like [`begin_root`](Self::begin_root), for one folder's files.
    pub fn begin_folder(&mut self, name: &str) {
        let load = self.folders.entry(name.to_string()).or_default();
        if !matches!(load, Load::Loaded { .. }) {
            *load = Load::Loading;
        }
    }

    pub fn apply_folder(&mut self, name: &str, result: Result<Sourced<Vec<DocumentEntry>>, Error>) {
        let load = match result {
            Ok(sourced) => Load::Loaded { value: sourced.value, source: sourced.source },
            Err(error) => match self.failure(&error, format!("Failed to load files for {name}.")) {
                Some(Load::NoCachedData) => {
                    self.notice = Some(Notice::new("Offline", "No cached data for this folder."));
                    Load::NoCachedData
                },
                Some(load) => load,
                None => {
                    if self.folders.get(name).is_some_and(Load::is_loading) {
                        self.folders.remove(name);
                    }
                    return;
                },
            },
        };
        self.folders.insert(name.to_string(), load);
    }

    /// Map an error to the state it leaves behind, raising a notice for
    /// transport failures. `None` means the fetch was cancelled and nothing
    /// should change.
    fn failure<T>(&mut self, error: &Error, message: impl Into<String>) -> Option<Load<T>> {
        match &**error {
            ErrorKind::Cancelled => {
                tracing::debug!("Fetch cancelled, dropping result");
                None
            },
            ErrorKind::CacheMiss(key) => {
                tracing::debug!(%key, "Nothing cached");
                Some(Load::NoCachedData)
            },
            _ => {
                tracing::warn!(%error, "Fetch failed");
                self.notice = Some(Notice::new("Error", message));
                Some(Load::Failed)
            },
        }
    }

    /// Folders to display for the current query, in name order.
    pub fn visible_folders(&self) -> Vec<VisibleFolder<'_>> {
        const NOT_LOADED: &Load<Vec<DocumentEntry>> = &Load::NotLoaded;
        let Some(names) = self.root.value() else {
            return Vec::new();
        };
        let rows = names.iter().map(|name| {
            let files = self.folders.get(name).and_then(Load::value).map(Vec::as_slice).unwrap_or_default();
            (name.as_str(), files)
        });
        filter_folders(rows, &self.query)
            .into_iter()
            .map(|row| VisibleFolder {
                name: row.folder,
                expanded: self.expanded.as_deref() == Some(row.folder),
                files: self.folders.get(row.folder).unwrap_or(NOT_LOADED),
                shown: row.files,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::Exn;
    use folio_storage::ObjectRef;

    fn entry(path: &str) -> DocumentEntry {
        DocumentEntry::new(&ObjectRef::new(path), format!("mock://{path}"))
    }

    fn loaded_state() -> BrowserState {
        let mut state = BrowserState::new(true);
        state.apply_root(Ok(Sourced::live(vec!["BROTHER HSM".to_string(), "JUKI".to_string()])));
        state.apply_folder("JUKI", Ok(Sourced::live(vec![entry("JUKI/DDL-8700.pdf"), entry("JUKI/MO-6700.pdf")])));
        state
    }

    #[test]
    fn test_toggle_folder() {
        let mut state = loaded_state();
        assert_eq!(state.toggle_folder("BROTHER HSM"), Toggle::NeedsFetch);
        assert_eq!(state.toggle_folder("JUKI"), Toggle::Expanded);
        assert_eq!(state.expanded.as_deref(), Some("JUKI"));
        assert_eq!(state.toggle_folder("JUKI"), Toggle::Collapsed);
        assert_eq!(state.expanded, None);
    }

    #[test]
    fn test_visible_folders_with_query() {
        let mut state = loaded_state();
        assert_eq!(state.visible_folders().len(), 2);

        state.set_query("ddl");
        let visible = state.visible_folders();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "JUKI");
        assert_eq!(visible[0].shown.len(), 1);
        assert!(matches!(visible[0].files, Load::Loaded { .. }));

        state.set_query("brother");
        let visible = state.visible_folders();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].files, &Load::NotLoaded);
    }

    #[test]
    fn test_cache_miss_is_not_an_empty_folder() {
        let mut state = BrowserState::new(false);
        state.begin_folder("JUKI");
        state.apply_folder("JUKI", Err(Exn::from(ErrorKind::CacheMiss("@cachedSubfolder_JUKI".to_string()))));
        assert_eq!(state.folders["JUKI"], Load::NoCachedData);
        assert_eq!(state.notice.as_ref().map(|n| n.message.as_str()), Some("No cached data for this folder."));

        state.dismiss_notice();
        state.apply_folder("JUKI", Ok(Sourced::cached(Vec::new())));
        assert_eq!(state.folders["JUKI"], Load::Loaded { value: Vec::new(), source: Source::Cache });
        assert_eq!(state.notice, None);
    }

    #[test]
    fn test_transport_error_raises_notice() {
        let mut state = BrowserState::new(true);
        state.begin_root();
        state.apply_root(Err(Exn::from(ErrorKind::Transport)));
        assert_eq!(state.root, Load::Failed);
        assert_eq!(state.notice.as_ref().map(|n| n.title.as_str()), Some("Error"));
    }

    #[test]
    fn test_cancelled_fetch_leaves_no_trace() {
        let mut state = BrowserState::new(true);
        state.begin_root();
        state.apply_root(Err(Exn::from(ErrorKind::Cancelled)));
        assert_eq!(state.root, Load::NotLoaded);
        state.begin_folder("JUKI");
        state.apply_folder("JUKI", Err(Exn::from(ErrorKind::Cancelled)));
        assert!(!state.folders.contains_key("JUKI"));
        assert_eq!(state.notice, None);
    }

    #[test]
    fn test_cancelled_reload_keeps_loaded_data() {
        let mut state = loaded_state();
        let root = state.root.clone();
        let juki = state.folders["JUKI"].clone();

        state.begin_root();
        state.begin_folder("JUKI");
        assert_eq!(state.root, root);
        assert_eq!(state.folders["JUKI"], juki);

        state.apply_root(Err(Exn::from(ErrorKind::Cancelled)));
        state.apply_folder("JUKI", Err(Exn::from(ErrorKind::Cancelled)));
        assert_eq!(state.root, root);
        assert_eq!(state.folders["JUKI"], juki);
        assert_eq!(state.visible_folders()[1].shown.len(), 2);
    }

    #[test]
    fn test_open_document_offline_is_refused() {
        let mut state = BrowserState::new(true);
        let document = entry("JUKI/DDL-8700.pdf");
        assert_eq!(state.open_document(&document).as_deref(), Some("mock://JUKI/DDL-8700.pdf"));
        assert!(state.set_online(false));
        assert!(!state.set_online(false));
        assert_eq!(state.open_document(&document), None);
        assert_eq!(state.notice.as_ref().map(|n| n.title.as_str()), Some("Offline"));
    }
}
