//! Embedded Document Viewer
//!
//! Turns an opened PDF into pages that materialize as they scroll into view,
//! a navigable outline, and literal full-text search with highlighting over
//! whatever has been rendered so far. Turning pages into pixels is left to a
//! [`DocumentRenderer`] implementation.

mod document;
pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod outline;
mod renderer;
mod scheduler;
mod search;
mod session;

pub use crate::document::{OpenDocument, PageState, ScrollBehavior, ScrollRequest, TextSpan};
pub use crate::error::{Error, ErrorKind, Result};
#[cfg(any(test, feature = "mock"))]
pub use crate::mock::MockRenderer;
pub use crate::outline::{Outline, OutlineItem, OutlineResolver};
pub use crate::renderer::{
    Destination, DocumentRenderer, DocumentSource, OutlineNode, Pixmap, RenderedPage, RendererHandle,
};
pub use crate::scheduler::{PageScheduler, RenderMode, RenderTask};
pub use crate::search::{HighlightMarkers, SearchEngine, SearchOutcome, SearchState};
pub use crate::session::{HostCommand, ViewerEvent, ViewerHandle, ViewerOptions, ViewerSession};
