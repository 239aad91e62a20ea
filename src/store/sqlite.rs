//! SQLite-backed record store

use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info};
use rusqlite::types::{Type, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Row};

use crate::error::{Error, Result};
use crate::model::{CitationEdge, Work};
use crate::store::schema::{SCHEMA_SQL, WORK_COLUMNS};
use crate::store::{check_decade_start, DecadeRow, ExtraColumn, RecordStore, WorkFilter};

/// Maximum IDs bound into a single `IN (...)` clause
const ID_BATCH: usize = 500;

pub struct SqliteStore {
    conn: Connection,
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open the database, creating the file and schema if needed
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(|e| Error::Connection(e.to_string()))?;
        Self::init(conn, db_path)
    }

    /// Open an existing database; a missing file is a connection failure
    pub fn open_existing(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::Connection(format!("{}: {}", db_path.display(), e)))?;
        Self::init(conn, db_path)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Connection(e.to_string()))?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Connection(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Store(format!("schema init failed: {e}")))?;

        let store = Self { conn, db_path };
        info!(
            "SqliteStore opened: {} works, path={}",
            store.count_works()?,
            store.db_path.display()
        );
        Ok(store)
    }

    pub fn count_works(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM works", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_work(row: &Row<'_>) -> rusqlite::Result<Work> {
        Ok(Work {
            id: row.get(0)?,
            doi: row.get(1)?,
            title: row.get(2)?,
            publication_year: row.get(3)?,
            cited_by_count: row.get(4)?,
            abstract_text: row.get(5)?,
            referenced_works: json_list(row, 6)?,
            domain: row.get(7)?,
            field: row.get(8)?,
            topic: row.get(9)?,
            layer: row.get(10)?,
            in_decade_references: json_list(row, 11)?,
        })
    }

    fn query_works(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Work>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(values), Self::row_to_work)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn query_filtered(&self, filter: &WorkFilter, ids: Option<&[String]>) -> Result<Vec<Work>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(ids) = ids {
            clauses.push(format!(
                "oa_id IN ({})",
                std::iter::repeat("?").take(ids.len()).join(", ")
            ));
            values.extend(ids.iter().cloned().map(Value::Text));
        }
        if let Some(min) = filter.min_cited_by {
            clauses.push("cited_by_count >= ?".to_string());
            values.push(Value::Integer(min));
        }
        if let Some(year) = filter.published_after {
            clauses.push("publication_year > ?".to_string());
            values.push(Value::Integer(year.into()));
        }
        if let Some(decade) = filter.decade {
            clauses.push("publication_year BETWEEN ? AND ?".to_string());
            values.push(Value::Integer(decade.into()));
            values.push(Value::Integer((decade + 9).into()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {WORK_COLUMNS} FROM works{where_clause} ORDER BY oa_id");
        let mut works = self.query_works(&sql, values)?;
        // SQLite's LOWER only folds ASCII and LIKE treats `%`/`_` as wildcards,
        // so the search term is matched here with the same rule as `Work::matches_search`
        if let Some(term) = &filter.search {
            works.retain(|w| w.matches_search(term));
        }
        Ok(works)
    }
}

fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(Vec::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn write_work(conn: &Connection, work: &Work) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO works (oa_id, doi, title, publication_year, cited_by_count, abstract,
                            referenced_works, domain, field, topic, layer, in_decade_references)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(oa_id) DO UPDATE SET
            doi = excluded.doi,
            title = excluded.title,
            publication_year = excluded.publication_year,
            cited_by_count = excluded.cited_by_count,
            abstract = excluded.abstract,
            referenced_works = excluded.referenced_works,
            domain = excluded.domain,
            field = excluded.field,
            topic = excluded.topic,
            layer = excluded.layer,
            in_decade_references = excluded.in_decade_references",
    )?
    .execute(params![
        work.id,
        work.doi,
        work.title,
        work.publication_year,
        work.cited_by_count,
        work.abstract_text,
        serde_json::to_string(&work.referenced_works)?,
        work.domain,
        work.field,
        work.topic,
        work.layer,
        serde_json::to_string(&work.in_decade_references)?,
    ])?;

    conn.prepare_cached("DELETE FROM work_references WHERE from_id = ?1")?
        .execute(params![work.id])?;
    let mut insert_ref =
        conn.prepare_cached("INSERT OR IGNORE INTO work_references (from_id, to_id) VALUES (?1, ?2)")?;
    for r in &work.referenced_works {
        insert_ref.execute(params![work.id, r])?;
    }
    Ok(())
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl RecordStore for SqliteStore {
    fn fetch_by_filter(&self, filter: &WorkFilter) -> Result<Vec<Work>> {
        match &filter.ids {
            Some(ids) => {
                let mut works = Vec::with_capacity(ids.len());
                for chunk in ids.chunks(ID_BATCH) {
                    works.extend(self.query_filtered(filter, Some(chunk))?);
                }
                Ok(works)
            }
            None => self.query_filtered(filter, None),
        }
    }

    fn fetch_citing(&self, work_id: &str) -> Result<Vec<Work>> {
        let sql = format!(
            "SELECT {WORK_COLUMNS} FROM works
             WHERE oa_id IN (SELECT from_id FROM work_references WHERE to_id = ?1)
             ORDER BY oa_id"
        );
        self.query_works(&sql, vec![Value::Text(work_id.to_string())])
    }

    fn fetch_cited(&self, work_id: &str) -> Result<Vec<Work>> {
        let sql = format!(
            "SELECT {WORK_COLUMNS} FROM works
             WHERE oa_id IN (SELECT to_id FROM work_references WHERE from_id = ?1)
             ORDER BY oa_id"
        );
        self.query_works(&sql, vec![Value::Text(work_id.to_string())])
    }

    fn upsert(&mut self, work: &Work) -> Result<()> {
        let tx = self.conn.transaction()?;
        write_work(&tx, work)?;
        tx.commit()?;
        Ok(())
    }

    fn bulk_insert(&mut self, works: &[Work]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        for work in works {
            write_work(&tx, work)?;
        }
        tx.commit()?;
        debug!("Bulk inserted {} works", works.len());
        Ok(works.len())
    }

    fn update_in_decade_references(&mut self, updates: &[(String, Vec<String>)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare_cached("UPDATE works SET in_decade_references = ?1 WHERE oa_id = ?2")?;
            for (id, refs) in updates {
                stmt.execute(params![serde_json::to_string(refs)?, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn fetch_per_decade_data(
        &self,
        decade_start: i32,
        extra_columns: &[ExtraColumn],
    ) -> Result<Vec<DecadeRow>> {
        check_decade_start(decade_start)?;
        let filter = WorkFilter {
            decade: Some(decade_start),
            ..WorkFilter::default()
        };
        Ok(self
            .query_filtered(&filter, None)?
            .iter()
            .map(|w| DecadeRow::from_work(w, extra_columns))
            .collect())
    }

    fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO citation_edges (from_id, to_id, decade_start)
                 VALUES (?1, ?2, ?3)",
            )?;
            for edge in edges {
                inserted += stmt.execute(params![edge.from_id, edge.to_id, edge.decade_start])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn execute_query(&self, sql: &str) -> Result<Vec<Vec<String>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(render_value(row.get_ref(idx)?));
            }
            out.push(values);
        }
        Ok(out)
    }
}
