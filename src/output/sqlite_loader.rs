//! SQLite batch loader
//!
//! Loads a run's batches into dated tables with full-replace semantics: every
//! load drops the target table, recreates it and inserts the whole batch in
//! one transaction, so a table always holds exactly one run's data.

use crate::config::validate_table_name;
use crate::crawler::VariantRecord;
use crate::output::traits::{BatchSink, OutputError, OutputResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;

/// Column definitions for the variant table
const VARIANT_COLUMNS_SQL: &str = "
    product_url TEXT NOT NULL,
    product_id INTEGER NOT NULL,
    product_sku TEXT,
    product_name TEXT NOT NULL,
    product_color TEXT,
    product_size TEXT,
    product_image TEXT,
    product_description TEXT NOT NULL,
    product_net_price TEXT,
    product_gross_price TEXT,
    product_stock_status INTEGER NOT NULL,
    product_barcode TEXT
";

/// Builds `<base>_<YYYY_MM_DD>`
pub fn dated_table_name(base: &str, date: NaiveDate) -> String {
    format!("{}_{}", base, date.format("%Y_%m_%d"))
}

/// SQLite sink for variant and URL batches
pub struct SqliteLoader {
    conn: Connection,
    table: String,
}

impl SqliteLoader {
    /// Opens (or creates) the database at `path`, loading into `table`
    pub fn open(path: &Path, table: &str) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        Self::with_connection(conn, table)
    }

    /// Creates an in-memory database (for testing)
    pub fn open_in_memory(table: &str) -> OutputResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> OutputResult<Self> {
        validate_table_name(table).map_err(|e| OutputError::InvalidTable(e.to_string()))?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    /// Name of the variant table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the URL table
    pub fn urls_table(&self) -> String {
        format!("{}_urls", self.table)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drops and recreates the variant table, then inserts `records`
    ///
    /// # Returns
    ///
    /// The number of rows inserted
    pub fn load_variants(&mut self, records: &[VariantRecord]) -> OutputResult<usize> {
        let tx = self.conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({columns});",
            table = self.table,
            columns = VARIANT_COLUMNS_SQL
        ))?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                self.table
            ))?;

            for record in records {
                let product_id =
                    i64::try_from(record.product_id).map_err(|_| OutputError::IdOutOfRange {
                        url: record.product_url.clone(),
                        id: record.product_id,
                    })?;

                stmt.execute(params![
                    record.product_url,
                    product_id,
                    record.product_sku,
                    record.product_name,
                    record.product_color,
                    record.product_size,
                    record.product_image,
                    record.product_description,
                    record.product_net_price.as_ref().map(|p| p.to_string()),
                    record.product_gross_price.as_ref().map(|p| p.to_string()),
                    record.product_stock_status,
                    record.product_barcode,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(table = %self.table, "Data injected into the table ({} rows)", records.len());
        Ok(records.len())
    }

    /// Drops and recreates the URL table, then inserts `urls` with their position
    pub fn load_product_urls(&mut self, urls: &[String]) -> OutputResult<usize> {
        let table = self.urls_table();
        let tx = self.conn.transaction()?;

        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} (position INTEGER NOT NULL, product_url TEXT NOT NULL);",
            table = table
        ))?;

        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {} VALUES (?1, ?2)", table))?;
            for (position, url) in urls.iter().enumerate() {
                stmt.execute(params![position as i64, url])?;
            }
        }

        tx.commit()?;
        tracing::info!(table = %table, "Data injected into the table ({} rows)", urls.len());
        Ok(urls.len())
    }

    /// Counts the rows of the variant table
    pub fn count_variants(&self) -> OutputResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl BatchSink for SqliteLoader {
    fn write_product_urls(&mut self, urls: &[String]) -> OutputResult<()> {
        self.load_product_urls(urls).map(|_| ())
    }

    fn write_variants(&mut self, records: &[VariantRecord]) -> OutputResult<()> {
        self.load_variants(records).map(|_| ())
    }
}
