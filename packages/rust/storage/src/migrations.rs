//! SQL migration definitions for the vocabulary store.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: sheets, sheet_rows",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Named sheets
CREATE TABLE IF NOT EXISTS sheets (
    name       TEXT PRIMARY KEY,
    created_at TEXT NOT NULL
);

-- Rows of a sheet; row_index is 1-based and row 1 is the header
CREATE TABLE IF NOT EXISTS sheet_rows (
    sheet      TEXT NOT NULL REFERENCES sheets(name) ON DELETE CASCADE,
    row_index  INTEGER NOT NULL,
    cells_json TEXT NOT NULL,
    PRIMARY KEY (sheet, row_index)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
