//! libSQL-backed workbook

use std::future::Future;
use std::path::Path;

use libsql::{params, Connection};
use tokio::sync::Mutex;

use super::{into_data_range, Rows, Workbook};
use crate::db::Database;
use crate::error::{Error, Result};

/// Workbook persisted in a libSQL database.
///
/// Only non-empty cells are stored; writing an empty value deletes the cell.
/// Every operation runs on a single connection guarded by a mutex, so
/// multi-statement writes are atomic with respect to each other.
pub struct LibSqlWorkbook {
    db: Mutex<Database>,
}

impl LibSqlWorkbook {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open (and migrate) a database file
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

fn not_found(sheet: &str) -> Error {
    Error::NotFound(format!("sheet {sheet:?}"))
}

fn to_index(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value - 1)
        .map_err(|_| Error::Database(format!("stored {what} index {value} is not 1-based")))
}

async fn sheet_exists(conn: &Connection, sheet: &str) -> Result<bool> {
    let mut rows = conn
        .query("SELECT 1 FROM sheets WHERE name = ?", [sheet])
        .await?;
    Ok(rows.next().await?.is_some())
}

async fn ensure_sheet(conn: &Connection, sheet: &str) -> Result<()> {
    if sheet_exists(conn, sheet).await? {
        Ok(())
    } else {
        Err(not_found(sheet))
    }
}

async fn put_cell(conn: &Connection, sheet: &str, row: u32, column: u32, value: &str) -> Result<()> {
    if value.is_empty() {
        conn.execute(
            "DELETE FROM cells WHERE sheet = ? AND row_index = ? AND column_index = ?",
            params![sheet, i64::from(row), i64::from(column)],
        )
        .await?;
    } else {
        conn.execute(
            "INSERT INTO cells (sheet, row_index, column_index, value, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (sheet, row_index, column_index)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![
                sheet,
                i64::from(row),
                i64::from(column),
                value,
                chrono::Utc::now().timestamp_millis()
            ],
        )
        .await?;
    }
    Ok(())
}

async fn put_row(conn: &Connection, sheet: &str, row: u32, values: &[String]) -> Result<()> {
    for (column, value) in (1..).zip(values) {
        put_cell(conn, sheet, row, column, value).await?;
    }
    Ok(())
}

async fn next_row(conn: &Connection, sheet: &str) -> Result<u32> {
    let mut rows = conn
        .query(
            "SELECT COALESCE(MAX(row_index), 0) FROM cells WHERE sheet = ?",
            [sheet],
        )
        .await?;
    let last: i64 = match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    };
    u32::try_from(last + 1).map_err(|_| Error::InvalidInput("sheet row limit reached".into()))
}

/// Run `work` inside a transaction, rolling back if it fails
async fn in_transaction<T>(conn: &Connection, work: impl Future<Output = Result<T>>) -> Result<T> {
    conn.execute("BEGIN TRANSACTION", ()).await?;
    match work.await {
        Ok(value) => {
            if let Err(e) = conn.execute("COMMIT", ()).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e.into());
            }
            Ok(value)
        }
        Err(e) => {
            conn.execute("ROLLBACK", ()).await.ok();
            Err(e)
        }
    }
}

impl Workbook for LibSqlWorkbook {
    async fn sheet_exists(&self, sheet: &str) -> Result<bool> {
        let db = self.db.lock().await;
        sheet_exists(db.connection(), sheet).await
    }

    async fn insert_sheet(&self, sheet: &str) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        if sheet_exists(conn, sheet).await? {
            return Err(Error::InvalidInput(format!(
                "sheet {sheet:?} already exists"
            )));
        }
        conn.execute(
            "INSERT INTO sheets (name, hidden, created_at) VALUES (?, 0, ?)",
            params![sheet, chrono::Utc::now().timestamp_millis()],
        )
        .await?;
        tracing::debug!(sheet, "Inserted sheet");
        Ok(())
    }

    async fn set_sheet_hidden(&self, sheet: &str, hidden: bool) -> Result<()> {
        let db = self.db.lock().await;
        let updated = db
            .connection()
            .execute(
                "UPDATE sheets SET hidden = ? WHERE name = ?",
                params![i64::from(hidden), sheet],
            )
            .await?;
        if updated == 0 {
            return Err(not_found(sheet));
        }
        Ok(())
    }

    async fn is_sheet_hidden(&self, sheet: &str) -> Result<Option<bool>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT hidden FROM sheets WHERE name = ?", [sheet])
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get::<i64>(0)? != 0)),
            None => Ok(None),
        }
    }

    async fn cell_value(&self, sheet: &str, row: u32, column: u32) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        if !sheet_exists(conn, sheet).await? {
            return Ok(None);
        }
        let mut rows = conn
            .query(
                "SELECT value FROM cells WHERE sheet = ? AND row_index = ? AND column_index = ?",
                params![sheet, i64::from(row), i64::from(column)],
            )
            .await?;
        let value = match rows.next().await? {
            Some(found) => found.get::<String>(0)?,
            None => String::new(),
        };
        Ok(Some(value))
    }

    async fn set_cell_value(&self, sheet: &str, row: u32, column: u32, value: &str) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        ensure_sheet(conn, sheet).await?;
        put_cell(conn, sheet, row, column, value).await
    }

    async fn read_rows(&self, sheet: &str) -> Result<Option<Rows>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        if !sheet_exists(conn, sheet).await? {
            return Ok(None);
        }

        let mut stored = conn
            .query(
                "SELECT row_index, column_index, value FROM cells
                 WHERE sheet = ?
                 ORDER BY row_index, column_index",
                [sheet],
            )
            .await?;

        let mut rows = Rows::new();
        while let Some(cell) = stored.next().await? {
            let row_index = to_index(cell.get::<i64>(0)?, "row")?;
            let column_index = to_index(cell.get::<i64>(1)?, "column")?;
            if rows.len() <= row_index {
                rows.resize_with(row_index + 1, Vec::new);
            }
            let cells = &mut rows[row_index];
            if cells.len() <= column_index {
                cells.resize(column_index + 1, String::new());
            }
            cells[column_index] = cell.get::<String>(2)?;
        }

        Ok(Some(into_data_range(rows)))
    }

    async fn write_row(&self, sheet: &str, row: u32, values: &[String]) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        ensure_sheet(conn, sheet).await?;
        in_transaction(conn, put_row(conn, sheet, row, values)).await
    }

    async fn append_row(&self, sheet: &str, values: &[String]) -> Result<u32> {
        let db = self.db.lock().await;
        let conn = db.connection();
        ensure_sheet(conn, sheet).await?;
        in_transaction(conn, async {
            let row = next_row(conn, sheet).await?;
            put_row(conn, sheet, row, values).await?;
            Ok(row)
        })
        .await
    }

    async fn truncate_rows(&self, sheet: &str, keep: u32) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();
        ensure_sheet(conn, sheet).await?;
        let removed = conn
            .execute(
                "DELETE FROM cells WHERE sheet = ? AND row_index > ?",
                params![sheet, i64::from(keep)],
            )
            .await?;
        tracing::debug!(sheet, keep, removed, "Truncated sheet rows");
        Ok(())
    }
}
