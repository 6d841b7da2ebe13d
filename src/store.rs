use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use tracing::info;

use crate::model::{DocumentRecord, PickStatus, ProductDetail, ProductRecord};
use crate::util::{now_utc_string, wo_number_from_order_id};

const DB_SCHEMA_VERSION: &str = "0.1.0";

/// Result of an insert against the natural key (order_id, file_name).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    SkippedDuplicate,
}

/// A product record together with its store rowid, so that consumption can
/// be requested explicitly for the rows a listing returned.
#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub id: i64,
    pub record: ProductRecord,
}

pub struct Store {
    connection: Connection,
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            crate::util::ensure_directory(parent)?;
        }

        let connection = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        configure_connection(&connection)?;
        ensure_schema(&connection)?;

        Ok(Self { connection })
    }

    /// Begins one ingestion batch. Inserts are staged on the transaction and
    /// become visible only at commit; a failed record never aborts the rest.
    pub fn batch(&mut self) -> Result<Batch<'_>> {
        let tx = self
            .connection
            .transaction()
            .context("failed to begin ingest batch")?;
        Ok(Batch { tx })
    }

    pub fn list_documents(&self, filter: &str) -> Result<Vec<DocumentRecord>> {
        let mut statement = self.connection.prepare(
            "
            SELECT order_id, file_name, file_path, sha256, extracted_data
            FROM documents
            WHERE ?1 = '' OR instr(lower(file_name), lower(?1)) > 0
            ORDER BY order_id ASC, file_name ASC
            ",
        )?;

        let mut rows = statement.query(params![filter])?;
        let mut out = Vec::<DocumentRecord>::new();

        while let Some(row) = rows.next()? {
            out.push(DocumentRecord {
                order_id: row.get(0)?,
                file_name: row.get(1)?,
                file_path: row.get(2)?,
                sha256: row.get(3)?,
                extracted_data: row.get(4)?,
            });
        }

        Ok(out)
    }

    pub fn list_products(&self, filter: &str) -> Result<Vec<StoredProduct>> {
        let mut statement = self.connection.prepare(
            "
            SELECT id, order_id, file_name, file_path, details, status
            FROM products
            WHERE ?1 = '' OR instr(lower(file_name), lower(?1)) > 0
            ORDER BY order_id ASC, file_name ASC
            ",
        )?;

        let mut rows = statement.query(params![filter])?;
        let mut out = Vec::<StoredProduct>::new();

        while let Some(row) = rows.next()? {
            let details_json: String = row.get(4)?;
            let status_text: String = row.get(5)?;
            let details: Vec<ProductDetail> = serde_json::from_str(&details_json)
                .context("failed to parse stored product details")?;

            out.push(StoredProduct {
                id: row.get(0)?,
                record: ProductRecord {
                    order_id: row.get(1)?,
                    file_name: row.get(2)?,
                    file_path: row.get(3)?,
                    details,
                    status: PickStatus::from_str(&status_text),
                },
            });
        }

        Ok(out)
    }

    /// Explicit consumption: flips the given rows to Picked. Rows already
    /// Picked stay untouched, so the transition happens exactly once.
    pub fn mark_picked(&self, ids: &[i64]) -> Result<usize> {
        let mut statement = self.connection.prepare(
            "UPDATE products SET status = 'Picked' WHERE id = ?1 AND status != 'Picked'",
        )?;

        let mut updated = 0usize;
        for id in ids {
            updated += statement.execute(params![id])?;
        }

        Ok(updated)
    }

    /// Status-lookup capability for the reconciliation engine: work-order
    /// numbers whose pick-list has been consumed.
    pub fn picked_wo_numbers(&self) -> Result<HashSet<String>> {
        let mut statement = self
            .connection
            .prepare("SELECT order_id FROM products WHERE status = 'Picked'")?;

        let mut rows = statement.query([])?;
        let mut out = HashSet::<String>::new();

        while let Some(row) = rows.next()? {
            let order_id: String = row.get(0)?;
            if let Some(wo_number) = wo_number_from_order_id(&order_id) {
                out.insert(wo_number);
            }
        }

        Ok(out)
    }

    pub fn document_count(&self) -> Result<i64> {
        count_rows(&self.connection, "SELECT COUNT(*) FROM documents")
    }

    pub fn product_count(&self) -> Result<i64> {
        count_rows(&self.connection, "SELECT COUNT(*) FROM products")
    }

    pub fn picked_product_count(&self) -> Result<i64> {
        count_rows(
            &self.connection,
            "SELECT COUNT(*) FROM products WHERE status = 'Picked'",
        )
    }
}

pub struct Batch<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl Batch<'_> {
    pub fn insert_document_if_absent(&self, record: &DocumentRecord) -> Result<InsertOutcome> {
        let changed = self.tx.execute(
            "
            INSERT INTO documents(order_id, file_name, file_path, sha256, extracted_data, ingested_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(order_id, file_name) DO NOTHING
            ",
            params![
                record.order_id,
                record.file_name,
                record.file_path,
                record.sha256,
                record.extracted_data,
                now_utc_string(),
            ],
        )?;

        if changed == 0 {
            info!(
                order_id = %record.order_id,
                file_name = %record.file_name,
                "duplicate document entry, skipping insert"
            );
            return Ok(InsertOutcome::SkippedDuplicate);
        }

        Ok(InsertOutcome::Inserted)
    }

    pub fn insert_product_if_absent(&self, record: &ProductRecord) -> Result<InsertOutcome> {
        let details_json = serde_json::to_string(&record.details)
            .context("failed to serialize product details")?;

        let changed = self.tx.execute(
            "
            INSERT INTO products(order_id, file_name, file_path, details, status, ingested_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(order_id, file_name) DO NOTHING
            ",
            params![
                record.order_id,
                record.file_name,
                record.file_path,
                details_json,
                record.status.as_str(),
                now_utc_string(),
            ],
        )?;

        if changed == 0 {
            info!(
                order_id = %record.order_id,
                file_name = %record.file_name,
                "duplicate product entry, skipping insert"
            );
            return Ok(InsertOutcome::SkippedDuplicate);
        }

        Ok(InsertOutcome::Inserted)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("failed to commit ingest batch")
    }
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
          id INTEGER PRIMARY KEY,
          order_id TEXT NOT NULL,
          file_name TEXT NOT NULL,
          file_path TEXT NOT NULL,
          sha256 TEXT NOT NULL,
          extracted_data TEXT NOT NULL,
          ingested_at TEXT NOT NULL,
          UNIQUE(order_id, file_name)
        );

        CREATE TABLE IF NOT EXISTS products (
          id INTEGER PRIMARY KEY,
          order_id TEXT NOT NULL,
          file_name TEXT NOT NULL,
          file_path TEXT NOT NULL,
          details TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'Not Picked',
          ingested_at TEXT NOT NULL,
          UNIQUE(order_id, file_name)
        );

        CREATE INDEX IF NOT EXISTS idx_documents_file_name ON documents(file_name);
        CREATE INDEX IF NOT EXISTS idx_products_file_name ON products(file_name);
        CREATE INDEX IF NOT EXISTS idx_products_status ON products(status);
        ",
    )?;

    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now_utc_string()],
    )?;

    Ok(())
}

fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document(order_id: &str, file_name: &str) -> DocumentRecord {
        DocumentRecord {
            order_id: order_id.to_string(),
            file_name: file_name.to_string(),
            file_path: format!("/orders/{file_name}"),
            sha256: "deadbeef".to_string(),
            extracted_data: "PCB-100\t4\nCHASSIS-7\t1".to_string(),
        }
    }

    fn sample_product(order_id: &str, file_name: &str) -> ProductRecord {
        ProductRecord {
            order_id: order_id.to_string(),
            file_name: file_name.to_string(),
            file_path: format!("/picklists/{file_name}"),
            details: vec![ProductDetail {
                product_number: "P-1".to_string(),
                qty: "5".to_string(),
                serial_number: "SN-99".to_string(),
                notes: String::new(),
            }],
            status: PickStatus::NotPicked,
        }
    }

    fn open_temp_store(dir: &tempfile::TempDir) -> Store {
        Store::open(&dir.path().join("test.sqlite")).expect("store opens")
    }

    #[test]
    fn duplicate_document_insert_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_temp_store(&dir);

        let batch = store.batch().expect("batch");
        let first = batch
            .insert_document_if_absent(&sample_document("WO-1001", "a.pdf"))
            .expect("first insert");
        let second = batch
            .insert_document_if_absent(&sample_document("WO-1001", "a.pdf"))
            .expect("second insert");
        batch.commit().expect("commit");

        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::SkippedDuplicate);
        assert_eq!(store.document_count().expect("count"), 1);
    }

    #[test]
    fn reingesting_same_file_set_leaves_store_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_temp_store(&dir);

        for _ in 0..2 {
            let batch = store.batch().expect("batch");
            batch
                .insert_document_if_absent(&sample_document("WO-1001", "a.pdf"))
                .expect("document insert");
            batch
                .insert_product_if_absent(&sample_product("WO-1001-A", "a.docx"))
                .expect("product insert");
            batch.commit().expect("commit");
        }

        assert_eq!(store.document_count().expect("count"), 1);
        assert_eq!(store.product_count().expect("count"), 1);
    }

    #[test]
    fn listing_filters_file_names_case_insensitively() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_temp_store(&dir);

        let batch = store.batch().expect("batch");
        batch
            .insert_document_if_absent(&sample_document("WO-1001", "WO-1001.pdf"))
            .expect("insert");
        batch
            .insert_document_if_absent(&sample_document("WO-2002", "WO-2002.pdf"))
            .expect("insert");
        batch.commit().expect("commit");

        let hits = store.list_documents("wo-1001").expect("list");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_name, "WO-1001.pdf");

        let all = store.list_documents("").expect("list all");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn mark_picked_flips_status_once_and_feeds_wo_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = open_temp_store(&dir);

        let batch = store.batch().expect("batch");
        batch
            .insert_product_if_absent(&sample_product("WO-1001-A", "WO-1001-A.docx"))
            .expect("insert");
        batch.commit().expect("commit");

        let listed = store.list_products("").expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record.status, PickStatus::NotPicked);

        let ids = vec![listed[0].id];
        assert_eq!(store.mark_picked(&ids).expect("mark"), 1);
        assert_eq!(store.mark_picked(&ids).expect("mark again"), 0);

        let picked = store.picked_wo_numbers().expect("picked");
        assert!(picked.contains("1001"));
    }
}
