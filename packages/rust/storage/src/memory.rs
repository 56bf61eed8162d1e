//! In-process [`TabularStore`] with call counters and failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use dailyvocab_shared::{Result, StoreRow, VocabError, WORD_COLUMN, canonical_headers};

use crate::{TabularStore, cell_at, check_column};

/// A sheet held in memory.
#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    header_writes: AtomicUsize,
    append_calls: AtomicUsize,
    fail_reads: AtomicBool,
    fail_appends: AtomicBool,
}

impl MemorySheet {
    /// An empty sheet with no header row.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sheet pre-filled with `rows` (row 1 is the header).
    pub fn with_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// A sheet with canonical headers and one row per word.
    pub fn with_words(words: &[&str]) -> Self {
        let mut rows = vec![canonical_headers()];
        for word in words {
            let mut row = vec![String::new(); WORD_COLUMN];
            row[WORD_COLUMN - 1] = (*word).to_string();
            rows.push(row);
        }
        Self::with_rows(rows)
    }

    /// Make every read fail with a storage error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every append fail with a storage error.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Number of times the header row was written.
    pub fn header_writes(&self) -> usize {
        self.header_writes.load(Ordering::SeqCst)
    }

    /// Number of `append_rows` calls, including empty and failed ones.
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    /// Snapshot of all rows.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Vec<String>>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(VocabError::Storage("simulated read failure".into()));
        }
        Ok(())
    }
}

impl TabularStore for MemorySheet {
    async fn ensure_headers(&self, expected: &[String]) -> Result<()> {
        self.check_reads()?;
        let mut rows = self.lock();
        if rows.first().is_some_and(|first| first.as_slice() == expected) {
            return Ok(());
        }
        if rows.is_empty() {
            rows.push(expected.to_vec());
        } else {
            rows[0] = expected.to_vec();
        }
        self.header_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_column(&self, index: usize) -> Result<Vec<String>> {
        check_column(index)?;
        self.check_reads()?;
        Ok(self.lock().iter().map(|row| cell_at(row, index)).collect())
    }

    async fn append_rows(&self, rows: &[StoreRow]) -> Result<()> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        if rows.is_empty() {
            return Ok(());
        }
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(VocabError::Storage("simulated append failure".into()));
        }
        self.lock()
            .extend(rows.iter().map(|row| row.cells().to_vec()));
        Ok(())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        self.check_reads()?;
        Ok(self.rows())
    }
}
