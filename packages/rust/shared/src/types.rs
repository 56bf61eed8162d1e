//! Core domain types for vocabulary batches and their stored form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical header row of the vocabulary sheet, in column order.
pub const STORE_HEADERS: [&str; 8] = [
    "Date Added",
    "Word",
    "Translation",
    "Category",
    "Level",
    "Example Sentence",
    "Video Prompt",
    "Video Caption",
];

/// 1-based index of the word column in [`STORE_HEADERS`].
pub const WORD_COLUMN: usize = 2;

/// Date format used for the "Date Added" cell.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// VocabularyItem
// ---------------------------------------------------------------------------

/// A single vocabulary entry, as generated, enriched, and checkpointed.
///
/// The serialized field names are the checkpoint file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyItem {
    /// The word in the language being learned. Primary dedup key.
    pub word: String,
    /// Translation into the learner's language.
    #[serde(default)]
    pub translation: String,
    /// Free-form tag (part of speech or topic).
    #[serde(default)]
    pub category: String,
    /// Difficulty band, e.g. `A1`.
    #[serde(default)]
    pub level: String,
    /// Example sentence in the language being learned.
    #[serde(default)]
    pub example_source: String,
    /// The example sentence translated.
    #[serde(default)]
    pub example_target: String,
    /// Video-generation prompt. Empty until enriched.
    #[serde(default)]
    pub video_prompt: String,
    /// Social caption. Empty until enriched.
    #[serde(default)]
    pub video_caption: String,
}

/// An ordered batch of items produced within one run.
pub type Batch = Vec<VocabularyItem>;

impl VocabularyItem {
    /// Combined example cell: `"<source> (<target>)"`.
    pub fn example_sentence(&self) -> String {
        format!("{} ({})", self.example_source, self.example_target)
    }
}

// ---------------------------------------------------------------------------
// StoreRow
// ---------------------------------------------------------------------------

/// The persisted projection of a [`VocabularyItem`], one cell per header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRow(pub Vec<String>);

impl StoreRow {
    /// Project an item into a row stamped with `date_added`.
    pub fn from_item(item: &VocabularyItem, date_added: NaiveDate) -> Self {
        Self(vec![
            date_added.format(DATE_FORMAT).to_string(),
            item.word.clone(),
            item.translation.clone(),
            item.category.clone(),
            item.level.clone(),
            item.example_sentence(),
            item.video_prompt.clone(),
            item.video_caption.clone(),
        ])
    }

    /// Cell values in column order.
    pub fn cells(&self) -> &[String] {
        &self.0
    }
}

/// Canonical headers as owned strings.
pub fn canonical_headers() -> Vec<String> {
    STORE_HEADERS.iter().map(|h| (*h).to_string()).collect()
}
