//! Substitute data for listings that come back empty.
//!
//! Disabled unless configured. The indexer logs every substitution at `warn`
//! and tags the result with [`Source::Fallback`](crate::Source::Fallback).

use crate::classify::Category;
use crate::models::DocumentEntry;
use std::collections::HashMap;
use std::path::Path;

pub const DEFAULT_SAMPLE_BASE_URL: &str = "https://example.com";

/// Which empty listings get substituted, and with what.
#[derive(Debug, Clone, Default)]
pub struct FallbackPolicy {
    enabled: bool,
    records: HashMap<String, Vec<DocumentEntry>>,
    sample_base_url: Option<String>,
}

impl FallbackPolicy {
    /// Never substitute anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Substitute registered records. Add some with
    /// [`with_record`](Self::with_record) or
    /// [`with_sample_manuals`](Self::with_sample_manuals).
    pub fn enabled() -> Self {
        Self { enabled: true, ..Self::default() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Entries to use when the folder `key` lists empty.
    pub fn with_record(mut self, key: impl Into<String>, entries: Vec<DocumentEntry>) -> Self {
        self.records.insert(key.into(), entries);
        self
    }

    /// Use the generated sample manual set when a manuals listing is empty.
    pub fn with_sample_manuals(mut self, base_url: impl Into<String>) -> Self {
        self.sample_base_url = Some(base_url.into());
        self
    }

    pub(crate) fn record(&self, key: &str) -> Option<Vec<DocumentEntry>> {
        self.enabled.then(|| self.records.get(key).cloned()).flatten()
    }

    pub(crate) fn manuals(&self, prefix: &Path, model: Option<&str>) -> Option<Vec<DocumentEntry>> {
        if !self.enabled {
            return None;
        }
        let key = prefix.to_string_lossy();
        self.records
            .get(key.as_ref())
            .cloned()
            .or_else(|| self.sample_base_url.as_deref().map(|base| sample_manuals(prefix, model, base)))
    }
}

/// One sample document per category (except [`Category::Uncategorized`]).
///
/// File names are built so they classify into the intended category and
/// render the usual display name for `model`.
pub fn sample_manuals(prefix: &Path, model: Option<&str>, base_url: &str) -> Vec<DocumentEntry> {
    let model = model.unwrap_or("Sample");
    let base_url = base_url.trim_end_matches('/');
    [
        ("catalogue", Category::Catalogue),
        ("error", Category::ErrorCode),
        ("instruction", Category::InstructionManual),
        ("notification", Category::Notification),
        ("parts", Category::PartsBook),
    ]
    .into_iter()
    .map(|(keyword, category)| {
        let name = format!("{model}_{keyword}.pdf");
        DocumentEntry {
            full_path: prefix.join(&name),
            url: format!("{base_url}/sample-{keyword}.pdf"),
            name,
            category,
        }
    })
    .collect()
}
