//! Tabular store for vocabulary rows.
//!
//! [`TabularStore`] is the sheet-like contract the pipeline writes through:
//! a header row, column reads, and all-or-nothing appends.
//!
//! - [`SheetStore`] keeps one named sheet in a local libSQL database.
//! - [`MemorySheet`] keeps rows in process, with call counters and failure
//!   injection for pipeline tests.

mod memory;
mod migrations;

use std::future::Future;
use std::path::Path;

use chrono::Utc;
use dailyvocab_shared::{Result, StoreRow, VocabError};
use libsql::{Connection, Database, params};

pub use memory::MemorySheet;

/// Sheet-like persistence used by the pipeline.
///
/// Column and row indexes are 1-based, as in a spreadsheet.
pub trait TabularStore: Send + Sync {
    /// Make row 1 equal `expected`, writing only when it differs.
    fn ensure_headers(&self, expected: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// Every row's value in column `index`, header included. Missing cells are `""`.
    fn read_column(&self, index: usize) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Append all rows or none. Empty input succeeds without touching the store.
    fn append_rows(&self, rows: &[StoreRow]) -> impl Future<Output = Result<()>> + Send;

    /// All rows in order, header included.
    fn read_rows(&self) -> impl Future<Output = Result<Vec<Vec<String>>>> + Send;
}

fn storage_err(e: impl std::fmt::Display) -> VocabError {
    VocabError::Storage(e.to_string())
}

/// Pick column `index` (1-based) out of a row.
pub(crate) fn cell_at(row: &[String], index: usize) -> String {
    row.get(index - 1).cloned().unwrap_or_default()
}

pub(crate) fn check_column(index: usize) -> Result<()> {
    if index == 0 {
        return Err(VocabError::validation("column index is 1-based"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SheetStore
// ---------------------------------------------------------------------------

/// One named sheet inside a local libSQL database.
pub struct SheetStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    sheet: String,
}

impl SheetStore {
    /// Open or create the database at `path` and make sure `sheet` exists.
    pub async fn open(path: &Path, sheet: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| VocabError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let store = Self {
            db,
            conn,
            sheet: sheet.to_string(),
        };
        store.run_migrations().await?;
        store.create_sheet().await?;
        Ok(store)
    }

    /// Name of the sheet this handle reads and writes.
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        VocabError::Storage(format!("migration v{} failed: {e}", migration.version))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn create_sheet(&self) -> Result<()> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO sheets (name, created_at) VALUES (?1, ?2)",
                params![self.sheet.as_str(), Utc::now().to_rfc3339()],
            )
            .await
            .map_err(storage_err)?;
        if inserted > 0 {
            tracing::info!(sheet = %self.sheet, "created sheet");
        }
        Ok(())
    }

    /// Cells of row `row_index`, if the row exists.
    async fn row(&self, row_index: i64) -> Result<Option<Vec<String>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT cells_json FROM sheet_rows WHERE sheet = ?1 AND row_index = ?2",
                params![self.sheet.as_str(), row_index],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json = row.get::<String>(0).map_err(storage_err)?;
                Ok(Some(decode_cells(&json)?))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }
}

fn decode_cells(json: &str) -> Result<Vec<String>> {
    serde_json::from_str(json).map_err(|e| VocabError::Storage(format!("corrupt row: {e}")))
}

fn encode_cells(cells: &[String]) -> Result<String> {
    serde_json::to_string(cells).map_err(storage_err)
}

impl TabularStore for SheetStore {
    async fn ensure_headers(&self, expected: &[String]) -> Result<()> {
        self.create_sheet().await?;

        let current = self.row(1).await?.unwrap_or_default();
        if current.as_slice() == expected {
            tracing::debug!(sheet = %self.sheet, "headers already correct");
            return Ok(());
        }

        tracing::info!(
            sheet = %self.sheet,
            had_headers = !current.is_empty(),
            "writing header row"
        );
        let json = encode_cells(expected)?;
        self.conn
            .execute(
                "INSERT INTO sheet_rows (sheet, row_index, cells_json) VALUES (?1, 1, ?2)
                 ON CONFLICT(sheet, row_index) DO UPDATE SET cells_json = excluded.cells_json",
                params![self.sheet.as_str(), json],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn read_column(&self, index: usize) -> Result<Vec<String>> {
        check_column(index)?;
        let rows = self.read_rows().await?;
        Ok(rows.iter().map(|row| cell_at(row, index)).collect())
    }

    async fn append_rows(&self, rows: &[StoreRow]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction().await.map_err(storage_err)?;

        let mut result = tx
            .query(
                "SELECT COALESCE(MAX(row_index), 0) FROM sheet_rows WHERE sheet = ?1",
                params![self.sheet.as_str()],
            )
            .await
            .map_err(storage_err)?;
        let last = match result.next().await.map_err(storage_err)? {
            Some(row) => row.get::<i64>(0).map_err(storage_err)?,
            None => 0,
        };
        drop(result);

        for (offset, row) in rows.iter().enumerate() {
            let json = encode_cells(row.cells())?;
            tx.execute(
                "INSERT INTO sheet_rows (sheet, row_index, cells_json) VALUES (?1, ?2, ?3)",
                params![self.sheet.as_str(), last + 1 + offset as i64, json],
            )
            .await
            .map_err(storage_err)?;
        }

        // Dropping an uncommitted transaction rolls it back.
        tx.commit().await.map_err(storage_err)?;
        tracing::info!(sheet = %self.sheet, rows = rows.len(), "appended rows");
        Ok(())
    }

    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let mut rows = self
            .conn
            .query(
                "SELECT cells_json FROM sheet_rows WHERE sheet = ?1 ORDER BY row_index",
                params![self.sheet.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let json = row.get::<String>(0).map_err(storage_err)?;
            results.push(decode_cells(&json)?);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
