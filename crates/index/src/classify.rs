//! Filename-based document classification.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Kind of manual, derived from its file name.
///
/// Declaration order is the order categories are presented in.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[display("Catalogue")]
    Catalogue,
    #[display("Error code")]
    #[serde(rename = "Error code")]
    ErrorCode,
    #[display("Instruction manual")]
    #[serde(rename = "Instruction manual")]
    InstructionManual,
    #[display("Notification")]
    Notification,
    #[display("Parts book")]
    #[serde(rename = "Parts book")]
    PartsBook,
    #[display("Uncategorized")]
    Uncategorized,
}

impl Category {
    /// Every category, in presentation order.
    pub const ALL: [Category; 6] = [
        Category::Catalogue,
        Category::ErrorCode,
        Category::InstructionManual,
        Category::Notification,
        Category::PartsBook,
        Category::Uncategorized,
    ];

    /// Human-readable title for a document of this category.
    ///
    /// `model` defaults to the part of `file_name` before the first `_`.
    pub fn display_name(self, file_name: &str, model: Option<&str>) -> String {
        let model = model.unwrap_or_else(|| file_name.split('_').next().unwrap_or(file_name));
        match self {
            Self::Catalogue => format!("[Catalogue] {model}"),
            Self::ErrorCode => format!("{model} Error code"),
            Self::InstructionManual => format!("{model} Instruction manual"),
            Self::PartsBook => format!("{model} Parts book"),
            Self::Notification | Self::Uncategorized => file_name.to_string(),
        }
    }
}

/// Keyword rules, evaluated top to bottom. The first keyword found in the
/// lowercased file name decides the category.
const RULES: &[(&str, Category)] = &[
    ("catalogue", Category::Catalogue),
    ("error", Category::ErrorCode),
    ("instruction", Category::InstructionManual),
    ("notification", Category::Notification),
    ("parts", Category::PartsBook),
];

/// Classify a document by its file name.
pub fn classify(name: &str) -> Category {
    let name = name.to_lowercase();
    RULES
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map_or(Category::Uncategorized, |&(_, category)| category)
}
