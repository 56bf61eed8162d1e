//! Word normalization and the set of already-known words.

use std::collections::HashSet;

use tracing::{info, warn};

use dailyvocab_shared::{Result, VocabularyItem, WORD_COLUMN};
use dailyvocab_storage::TabularStore;

/// Dedup key for a word: surrounding whitespace trimmed, lowercased.
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Normalized words already stored or accepted this run.
///
/// Remembers insertion order so the most recent words can be sampled for the
/// exclusion hint.
#[derive(Debug, Clone, Default)]
pub struct ExistingKeySet {
    keys: HashSet<String>,
    order: Vec<String>,
}

impl ExistingKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `word` (normalized). Returns `false` if it was already known or is blank.
    pub fn insert(&mut self, word: &str) -> bool {
        let key = normalize(word);
        if key.is_empty() || !self.keys.insert(key.clone()) {
            return false;
        }
        self.order.push(key);
        true
    }

    pub fn contains(&self, word: &str) -> bool {
        self.keys.contains(&normalize(word))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Up to `n` of the most recently inserted keys, oldest first.
    pub fn recent(&self, n: usize) -> &[String] {
        &self.order[self.order.len().saturating_sub(n)..]
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExistingKeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for word in iter {
            set.insert(word.as_ref());
        }
        set
    }
}

/// `key` is already stored, or matches a word accepted into `batch`.
pub fn is_duplicate(key: &str, existing: &ExistingKeySet, batch: &[VocabularyItem]) -> bool {
    existing.contains(key) || batch.iter().any(|item| normalize(&item.word) == key)
}

/// Load the stored words from the word column, skipping the header row.
///
/// With `lenient`, a read failure yields an empty set and a warning instead of
/// an error.
pub async fn load_existing<S: TabularStore>(store: &S, lenient: bool) -> Result<ExistingKeySet> {
    match store.read_column(WORD_COLUMN).await {
        Ok(column) => {
            let set: ExistingKeySet = column.iter().skip(1).collect();
            info!(count = set.len(), "loaded existing words");
            Ok(set)
        }
        Err(e) if lenient => {
            warn!(error = %e, "could not read existing words, continuing without deduplication against the store");
            Ok(ExistingKeySet::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dailyvocab_storage::MemorySheet;

    fn item(word: &str) -> VocabularyItem {
        VocabularyItem {
            word: word.into(),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_trims_and_folds() {
        assert_eq!(normalize("  Kissa "), "kissa");
        assert_eq!(normalize("ÄITI"), "äiti");
        assert_eq!(normalize("\tkoira\n"), "koira");
    }

    #[test]
    fn insert_ignores_case_space_variants_and_blanks() {
        let mut set = ExistingKeySet::new();
        assert!(set.insert("Talo"));
        assert!(!set.insert(" talo "));
        assert!(!set.insert("   "));
        assert_eq!(set.len(), 1);
        assert!(set.contains("TALO"));
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let set: ExistingKeySet = ["a", "b", "c", "d"].into_iter().collect();
        assert_eq!(set.recent(2), ["c", "d"]);
        assert_eq!(set.recent(10).len(), 4);
        assert!(set.recent(0).is_empty());
    }

    #[test]
    fn duplicate_against_set_or_batch() {
        let set: ExistingKeySet = ["kissa"].into_iter().collect();
        let batch = vec![item("Talo")];
        assert!(is_duplicate("kissa", &set, &batch));
        assert!(is_duplicate("talo", &set, &batch));
        assert!(!is_duplicate("koira", &set, &batch));
    }

    #[tokio::test]
    async fn load_existing_skips_header_and_blanks() {
        let sheet = MemorySheet::with_words(&[" Kissa", "koira", ""]);
        let set = load_existing(&sheet, false).await.expect("load");
        assert_eq!(set.len(), 2);
        assert!(set.contains("kissa"));
        assert!(!set.contains("word"), "header is skipped");
    }

    #[tokio::test]
    async fn load_existing_strict_propagates_failure() {
        let sheet = MemorySheet::with_words(&["kissa"]);
        sheet.set_fail_reads(true);
        assert!(load_existing(&sheet, false).await.is_err());
    }

    #[tokio::test]
    async fn load_existing_lenient_returns_empty() {
        let sheet = MemorySheet::with_words(&["kissa"]);
        sheet.set_fail_reads(true);
        let set = load_existing(&sheet, true).await.expect("lenient");
        assert!(set.is_empty());
    }
}
