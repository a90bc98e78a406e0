//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! Every table stores the full record as a JSON blob in `data`, plus the
//! columns needed for lookups and constraints:
//!
//! - `document_types`: `type_name` is unique.
//! - `documents`: indexed by `document_type`; `updated_at` backs the
//!   compare-and-swap in [`Storage::update_document`].
//! - `graph_types`, `roles`: reference data, blob only.
//! - `graph_rules`: unique on `(document_type_source, document_type_target, graph_type)`.
//! - `graphs`: indexed by source and target document.
//! - `tags`: indexed by `parent_tag`.
//! - `document_tags`: unique on `(document, tag)`.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use yads::{
    Document, DocumentTag, DocumentType, Graph, GraphRule, GraphType, ResolutionError, Role, Tag,
};

use super::{DocumentFilter, DocumentTagFilter, GraphFilter, Page, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS document_types (
    id        TEXT PRIMARY KEY,
    type_name TEXT NOT NULL UNIQUE,
    data      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id            TEXT PRIMARY KEY,
    document_type TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    data          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_type ON documents(document_type);

CREATE TABLE IF NOT EXISTS graph_types (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS roles (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS graph_rules (
    id                   TEXT PRIMARY KEY,
    document_type_source TEXT NOT NULL,
    document_type_target TEXT NOT NULL,
    graph_type           TEXT NOT NULL,
    role                 TEXT,
    data                 TEXT NOT NULL,
    UNIQUE (document_type_source, document_type_target, graph_type)
);

CREATE TABLE IF NOT EXISTS graphs (
    id              TEXT PRIMARY KEY,
    document_source TEXT NOT NULL,
    document_target TEXT NOT NULL,
    graph_type      TEXT NOT NULL,
    role            TEXT,
    data            TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_graphs_source ON graphs(document_source);
CREATE INDEX IF NOT EXISTS idx_graphs_target ON graphs(document_target);

CREATE TABLE IF NOT EXISTS tags (
    id         TEXT PRIMARY KEY,
    parent_tag TEXT,
    data       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tags_parent ON tags(parent_tag);

CREATE TABLE IF NOT EXISTS document_tags (
    id       TEXT PRIMARY KEY,
    document TEXT NOT NULL,
    tag      TEXT NOT NULL,
    data     TEXT NOT NULL,
    UNIQUE (document, tag)
);
CREATE INDEX IF NOT EXISTS idx_document_tags_tag ON document_tags(tag);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread-pool.
    async fn run<R, F>(&self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StorageError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StorageError::Internal("connection mutex poisoned".into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Like [`map_err`], but a database without the rule table cannot answer
/// rule lookups at all.
fn map_rule_lookup_err(e: rusqlite::Error) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table") => {
            ResolutionError::MissingRuleTable.into()
        }
        other => map_err(other),
    }
}

fn map_json_err(e: serde_json::Error) -> StorageError {
    StorageError::Internal(format!("JSON error: {e}"))
}

/// Like [`map_err`], but a constraint violation becomes a conflict.
fn map_write_err(e: rusqlite::Error, conflict: impl FnOnce() -> String) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
            StorageError::Conflict(conflict())
        }
        other => map_err(other),
    }
}

// ---------------------------------------------------------------------------
// Dynamic query parameter helper
// ---------------------------------------------------------------------------

/// Typed SQL parameter for building dynamic WHERE clauses.
enum SqlParam {
    Text(String),
    Integer(i64),
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};
        match self {
            SqlParam::Text(s) => Ok(ToSqlOutput::Owned(Value::Text(s.clone()))),
            SqlParam::Integer(i) => Ok(ToSqlOutput::Owned(Value::Integer(*i))),
        }
    }
}

// --- helpers -----------------------------------------------------------------

fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(map_json_err)
}

fn decode<T: DeserializeOwned>(data: &str) -> Result<T, StorageError> {
    serde_json::from_str(data).map_err(map_json_err)
}

fn get_row<T: DeserializeOwned>(
    conn: &Connection,
    table: &str,
    id: &str,
) -> Result<Option<T>, StorageError> {
    conn.query_row(
        &format!("SELECT data FROM {table} WHERE id = ?1"),
        params![id],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(map_err)?
    .map(|data| decode(&data))
    .transpose()
}

/// One keyset page from `table`. `clauses` are ANDed, each consuming its
/// `?` placeholders from `values` in order.
fn page_rows<T: DeserializeOwned>(
    conn: &Connection,
    table: &str,
    clauses: &[&str],
    mut values: Vec<SqlParam>,
    page: &Page,
) -> Result<(Vec<T>, bool), StorageError> {
    let mut sql = format!("SELECT data FROM {table} WHERE 1=1");
    for clause in clauses {
        sql.push_str(" AND ");
        sql.push_str(clause);
    }
    if let Some(after) = &page.after {
        sql.push_str(" AND id > ?");
        values.push(SqlParam::Text(after.clone()));
    }
    sql.push_str(" ORDER BY id ASC LIMIT ?");
    values.push(SqlParam::Integer(page.limit as i64 + 1));

    let params_refs: Vec<&dyn rusqlite::ToSql> =
        values.iter().map(|p| p as &dyn rusqlite::ToSql).collect();

    let mut stmt = conn.prepare(&sql).map_err(map_err)?;
    let mut rows: Vec<String> = stmt
        .query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;

    let limit = page.limit as usize;
    let has_more = rows.len() > limit;
    rows.truncate(limit);

    let items = rows
        .iter()
        .map(|data| decode(data))
        .collect::<Result<Vec<T>, _>>()?;
    Ok((items, has_more))
}

fn all_rows<T: DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    values: &[&dyn rusqlite::ToSql],
) -> Result<Vec<T>, StorageError> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let rows: Vec<String> = stmt
        .query_map(values, |row| row.get::<_, String>(0))
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;
    rows.iter().map(|data| decode(data)).collect()
}

fn exists(conn: &Connection, sql: &str, id: &str) -> Result<bool, StorageError> {
    let n: i64 = conn
        .query_row(sql, params![id], |row| row.get(0))
        .map_err(map_err)?;
    Ok(n > 0)
}

/// `Ok` when exactly one row was written, `NotFound` when none was.
fn changed(rows: usize) -> Result<(), StorageError> {
    if rows == 0 {
        Err(StorageError::NotFound)
    } else {
        Ok(())
    }
}

fn delete_row(conn: &Connection, table: &str, id: &str) -> Result<(), StorageError> {
    let rows = conn
        .execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
        .map_err(map_err)?;
    changed(rows)
}

fn in_use(what: &str, id: &str, by: &str) -> StorageError {
    StorageError::Conflict(format!("{what} {id} is still referenced by {by}"))
}

fn duplicate_rule(rule: &GraphRule) -> impl FnOnce() -> String + '_ {
    move || {
        format!(
            "a graph rule for {} -> {} ({}) already exists",
            rule.document_type_source, rule.document_type_target, rule.graph_type
        )
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Document types ------------------------------------------------------

    async fn put_document_type(&self, document_type: &DocumentType) -> Result<(), StorageError> {
        let t = document_type.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO document_types (id, type_name, data) VALUES (?1, ?2, ?3)",
                params![t.id, t.type_name, encode(&t)?],
            )
            .map_err(|e| map_write_err(e, || format!("document type {} already exists", t.type_name)))?;
            Ok(())
        })
        .await
    }

    async fn get_document_type(&self, id: &str) -> Result<Option<DocumentType>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "document_types", &id)).await
    }

    async fn list_document_types(
        &self,
        page: &Page,
    ) -> Result<(Vec<DocumentType>, bool), StorageError> {
        let page = page.clone();
        self.run(move |conn| page_rows(conn, "document_types", &[], Vec::new(), &page))
            .await
    }

    async fn update_document_type(
        &self,
        document_type: &DocumentType,
    ) -> Result<(), StorageError> {
        let t = document_type.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE document_types SET type_name = ?2, data = ?3 WHERE id = ?1",
                    params![t.id, t.type_name, encode(&t)?],
                )
                .map_err(|e| {
                    map_write_err(e, || format!("document type {} already exists", t.type_name))
                })?;
            changed(rows)
        })
        .await
    }

    async fn delete_document_type(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            if !exists(conn, "SELECT COUNT(*) FROM document_types WHERE id = ?1", &id)? {
                return Err(StorageError::NotFound);
            }
            if exists(conn, "SELECT COUNT(*) FROM documents WHERE document_type = ?1", &id)? {
                return Err(in_use("document type", &id, "documents"));
            }
            if exists(
                conn,
                "SELECT COUNT(*) FROM graph_rules
                 WHERE document_type_source = ?1 OR document_type_target = ?1",
                &id,
            )? {
                return Err(in_use("document type", &id, "graph rules"));
            }
            delete_row(conn, "document_types", &id)
        })
        .await
    }

    // --- Documents -----------------------------------------------------------

    async fn put_document(&self, document: &Document) -> Result<(), StorageError> {
        let d = document.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO documents (id, document_type, updated_at, data)
                 VALUES (?1, ?2, ?3, ?4)",
                params![d.id, d.document_type, d.updated_at, encode(&d)?],
            )
            .map_err(|e| map_write_err(e, || format!("document {} already exists", d.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "documents", &id)).await
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, bool), StorageError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut clauses = Vec::new();
            let mut values = Vec::new();
            if let Some(t) = &filter.document_type {
                clauses.push("document_type = ?");
                values.push(SqlParam::Text(t.clone()));
            }
            page_rows(conn, "documents", &clauses, values, &filter.page)
        })
        .await
    }

    async fn update_document(
        &self,
        document: &Document,
        expected_updated_at: &str,
    ) -> Result<(), StorageError> {
        let d = document.clone();
        let expected = expected_updated_at.to_string();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE documents SET document_type = ?2, updated_at = ?3, data = ?4
                     WHERE id = ?1 AND updated_at = ?5",
                    params![d.id, d.document_type, d.updated_at, encode(&d)?, expected],
                )
                .map_err(map_err)?;
            if rows > 0 {
                return Ok(());
            }
            if exists(conn, "SELECT COUNT(*) FROM documents WHERE id = ?1", &d.id)? {
                Err(StorageError::Conflict(format!(
                    "document {} was modified concurrently",
                    d.id
                )))
            } else {
                Err(StorageError::NotFound)
            }
        })
        .await
    }

    async fn delete_document(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            tx.execute(
                "DELETE FROM graphs WHERE document_source = ?1 OR document_target = ?1",
                params![id],
            )
            .map_err(map_err)?;
            tx.execute("DELETE FROM document_tags WHERE document = ?1", params![id])
                .map_err(map_err)?;
            delete_row(&tx, "documents", &id)?;
            tx.commit().map_err(map_err)
        })
        .await
    }

    // --- Graph types ---------------------------------------------------------

    async fn put_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError> {
        let t = graph_type.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO graph_types (id, data) VALUES (?1, ?2)",
                params![t.id, encode(&t)?],
            )
            .map_err(|e| map_write_err(e, || format!("graph type {} already exists", t.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_graph_type(&self, id: &str) -> Result<Option<GraphType>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "graph_types", &id)).await
    }

    async fn list_graph_types(&self, page: &Page) -> Result<(Vec<GraphType>, bool), StorageError> {
        let page = page.clone();
        self.run(move |conn| page_rows(conn, "graph_types", &[], Vec::new(), &page))
            .await
    }

    async fn update_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError> {
        let t = graph_type.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE graph_types SET data = ?2 WHERE id = ?1",
                    params![t.id, encode(&t)?],
                )
                .map_err(map_err)?;
            changed(rows)
        })
        .await
    }

    async fn delete_graph_type(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            if !exists(conn, "SELECT COUNT(*) FROM graph_types WHERE id = ?1", &id)? {
                return Err(StorageError::NotFound);
            }
            if exists(conn, "SELECT COUNT(*) FROM graph_rules WHERE graph_type = ?1", &id)? {
                return Err(in_use("graph type", &id, "graph rules"));
            }
            if exists(conn, "SELECT COUNT(*) FROM graphs WHERE graph_type = ?1", &id)? {
                return Err(in_use("graph type", &id, "graphs"));
            }
            delete_row(conn, "graph_types", &id)
        })
        .await
    }

    // --- Roles ---------------------------------------------------------------

    async fn put_role(&self, role: &Role) -> Result<(), StorageError> {
        let r = role.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO roles (id, data) VALUES (?1, ?2)",
                params![r.id, encode(&r)?],
            )
            .map_err(|e| map_write_err(e, || format!("role {} already exists", r.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_role(&self, id: &str) -> Result<Option<Role>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "roles", &id)).await
    }

    async fn list_roles(&self, page: &Page) -> Result<(Vec<Role>, bool), StorageError> {
        let page = page.clone();
        self.run(move |conn| page_rows(conn, "roles", &[], Vec::new(), &page))
            .await
    }

    async fn update_role(&self, role: &Role) -> Result<(), StorageError> {
        let r = role.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE roles SET data = ?2 WHERE id = ?1",
                    params![r.id, encode(&r)?],
                )
                .map_err(map_err)?;
            changed(rows)
        })
        .await
    }

    async fn delete_role(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            if !exists(conn, "SELECT COUNT(*) FROM roles WHERE id = ?1", &id)? {
                return Err(StorageError::NotFound);
            }
            if exists(conn, "SELECT COUNT(*) FROM graph_rules WHERE role = ?1", &id)? {
                return Err(in_use("role", &id, "graph rules"));
            }
            if exists(conn, "SELECT COUNT(*) FROM graphs WHERE role = ?1", &id)? {
                return Err(in_use("role", &id, "graphs"));
            }
            delete_row(conn, "roles", &id)
        })
        .await
    }

    // --- Graph rules ---------------------------------------------------------

    async fn put_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError> {
        let r = rule.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO graph_rules
                    (id, document_type_source, document_type_target, graph_type, role, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    r.id,
                    r.document_type_source,
                    r.document_type_target,
                    r.graph_type,
                    r.role,
                    encode(&r)?,
                ],
            )
            .map_err(|e| map_write_err(e, duplicate_rule(&r)))?;
            Ok(())
        })
        .await
    }

    async fn get_graph_rule(&self, id: &str) -> Result<Option<GraphRule>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "graph_rules", &id)).await
    }

    async fn list_graph_rules(&self, page: &Page) -> Result<(Vec<GraphRule>, bool), StorageError> {
        let page = page.clone();
        self.run(move |conn| page_rows(conn, "graph_rules", &[], Vec::new(), &page))
            .await
    }

    async fn update_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError> {
        let r = rule.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE graph_rules
                     SET document_type_source = ?2, document_type_target = ?3,
                         graph_type = ?4, role = ?5, data = ?6
                     WHERE id = ?1",
                    params![
                        r.id,
                        r.document_type_source,
                        r.document_type_target,
                        r.graph_type,
                        r.role,
                        encode(&r)?,
                    ],
                )
                .map_err(|e| map_write_err(e, duplicate_rule(&r)))?;
            changed(rows)
        })
        .await
    }

    async fn delete_graph_rule(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| delete_row(conn, "graph_rules", &id)).await
    }

    async fn find_graph_rule(
        &self,
        document_type_source: &str,
        document_type_target: &str,
        graph_type: &str,
    ) -> Result<Option<GraphRule>, StorageError> {
        let source = document_type_source.to_string();
        let target = document_type_target.to_string();
        let graph_type = graph_type.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT data FROM graph_rules
                 WHERE document_type_source = ?1 AND document_type_target = ?2 AND graph_type = ?3",
                params![source, target, graph_type],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(map_rule_lookup_err)?
            .map(|data| decode(&data))
            .transpose()
        })
        .await
    }

    // --- Graphs --------------------------------------------------------------

    async fn put_graph(&self, graph: &Graph) -> Result<(), StorageError> {
        let g = graph.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO graphs (id, document_source, document_target, graph_type, role, data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    g.id,
                    g.document_source,
                    g.document_target,
                    g.graph_type,
                    g.role,
                    encode(&g)?,
                ],
            )
            .map_err(|e| map_write_err(e, || format!("graph {} already exists", g.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_graph(&self, id: &str) -> Result<Option<Graph>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "graphs", &id)).await
    }

    async fn list_graphs(&self, filter: &GraphFilter) -> Result<(Vec<Graph>, bool), StorageError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut clauses = Vec::new();
            let mut values = Vec::new();
            if let Some(d) = &filter.document {
                clauses.push("(document_source = ? OR document_target = ?)");
                values.push(SqlParam::Text(d.clone()));
                values.push(SqlParam::Text(d.clone()));
            }
            page_rows(conn, "graphs", &clauses, values, &filter.page)
        })
        .await
    }

    async fn update_graph(&self, graph: &Graph) -> Result<(), StorageError> {
        let g = graph.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE graphs
                     SET document_source = ?2, document_target = ?3, graph_type = ?4,
                         role = ?5, data = ?6
                     WHERE id = ?1",
                    params![
                        g.id,
                        g.document_source,
                        g.document_target,
                        g.graph_type,
                        g.role,
                        encode(&g)?,
                    ],
                )
                .map_err(map_err)?;
            changed(rows)
        })
        .await
    }

    async fn delete_graph(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| delete_row(conn, "graphs", &id)).await
    }

    async fn graphs_touching(&self, document: &str) -> Result<Vec<Graph>, StorageError> {
        let document = document.to_string();
        self.run(move |conn| {
            all_rows(
                conn,
                "SELECT data FROM graphs
                 WHERE document_source = ?1 OR document_target = ?1
                 ORDER BY id ASC",
                params![document],
            )
        })
        .await
    }

    // --- Tags ----------------------------------------------------------------

    async fn put_tag(&self, tag: &Tag) -> Result<(), StorageError> {
        let t = tag.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO tags (id, parent_tag, data) VALUES (?1, ?2, ?3)",
                params![t.id, t.parent_tag, encode(&t)?],
            )
            .map_err(|e| map_write_err(e, || format!("tag {} already exists", t.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "tags", &id)).await
    }

    async fn list_tags(&self, page: &Page) -> Result<(Vec<Tag>, bool), StorageError> {
        let page = page.clone();
        self.run(move |conn| page_rows(conn, "tags", &[], Vec::new(), &page))
            .await
    }

    async fn update_tag(&self, tag: &Tag) -> Result<(), StorageError> {
        let t = tag.clone();
        self.run(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE tags SET parent_tag = ?2, data = ?3 WHERE id = ?1",
                    params![t.id, t.parent_tag, encode(&t)?],
                )
                .map_err(map_err)?;
            changed(rows)
        })
        .await
    }

    async fn delete_tag(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            delete_row(&tx, "tags", &id)?;
            tx.execute("DELETE FROM document_tags WHERE tag = ?1", params![id])
                .map_err(map_err)?;
            let children: Vec<Tag> =
                all_rows(&tx, "SELECT data FROM tags WHERE parent_tag = ?1", params![id])?;
            for mut child in children {
                child.parent_tag = None;
                tx.execute(
                    "UPDATE tags SET parent_tag = NULL, data = ?2 WHERE id = ?1",
                    params![child.id, encode(&child)?],
                )
                .map_err(map_err)?;
            }
            tx.commit().map_err(map_err)
        })
        .await
    }

    // --- Document tags -------------------------------------------------------

    async fn put_document_tag(&self, document_tag: &DocumentTag) -> Result<(), StorageError> {
        let dt = document_tag.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO document_tags (id, document, tag, data) VALUES (?1, ?2, ?3, ?4)",
                params![dt.id, dt.document, dt.tag, encode(&dt)?],
            )
            .map_err(|e| {
                map_write_err(e, || {
                    format!("document {} is already tagged {}", dt.document, dt.tag)
                })
            })?;
            Ok(())
        })
        .await
    }

    async fn get_document_tag(&self, id: &str) -> Result<Option<DocumentTag>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| get_row(conn, "document_tags", &id)).await
    }

    async fn list_document_tags(
        &self,
        filter: &DocumentTagFilter,
    ) -> Result<(Vec<DocumentTag>, bool), StorageError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut clauses = Vec::new();
            let mut values = Vec::new();
            if let Some(d) = &filter.document {
                clauses.push("document = ?");
                values.push(SqlParam::Text(d.clone()));
            }
            if let Some(t) = &filter.tag {
                clauses.push("tag = ?");
                values.push(SqlParam::Text(t.clone()));
            }
            page_rows(conn, "document_tags", &clauses, values, &filter.page)
        })
        .await
    }

    async fn delete_document_tag(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| delete_row(conn, "document_tags", &id)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yads::GraphDirection;

    async fn note_type(s: &SqliteStorage) -> DocumentType {
        let t = DocumentType::new("note", json!({ "type": "object" }));
        s.put_document_type(&t).await.unwrap();
        t
    }

    #[tokio::test]
    async fn put_and_get_document() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({ "title": "T", "tags": [1, 2] }));
        s.put_document(&d).await.unwrap();
        let got = s.get_document(&d.id).await.unwrap().unwrap();
        assert_eq!(got, d);
    }

    #[tokio::test]
    async fn put_document_conflict() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({}));
        s.put_document(&d).await.unwrap();
        let err = s.put_document(&d).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn type_name_is_unique() {
        let s = SqliteStorage::open_in_memory().unwrap();
        note_type(&s).await;
        let err = s
            .put_document_type(&DocumentType::new("note", json!(true)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_documents_filters_and_paginates() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let note = note_type(&s).await;
        let task = DocumentType::new("task", json!(true));
        s.put_document_type(&task).await.unwrap();
        for i in 0..3 {
            let mut d = Document::new(&note.id, json!({}));
            d.id = format!("note-{i}");
            s.put_document(&d).await.unwrap();
        }
        s.put_document(&Document::new(&task.id, json!({}))).await.unwrap();

        let filter = DocumentFilter {
            document_type: Some(note.id.clone()),
            page: Page {
                after: None,
                limit: 2,
            },
        };
        let (items, more) = s.list_documents(&filter).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(more);

        let filter = DocumentFilter {
            document_type: Some(note.id.clone()),
            page: Page {
                after: Some("note-1".into()),
                limit: 2,
            },
        };
        let (items, more) = s.list_documents(&filter).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "note-2");
        assert!(!more);
    }

    #[tokio::test]
    async fn update_document_compare_and_swap() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({ "title": "A" }));
        s.put_document(&d).await.unwrap();

        let mut next = d.clone();
        next.data = json!({ "title": "B" });
        next.touch();
        s.update_document(&next, &d.updated_at).await.unwrap();

        let err = s.update_document(&next, &d.updated_at).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let mut ghost = Document::new(&t.id, json!({}));
        ghost.id = "ghost".into();
        let err = s.update_document(&ghost, &ghost.updated_at).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn delete_document_cascades_edges_and_tags() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let t = note_type(&s).await;
        let a = Document::new(&t.id, json!({}));
        let b = Document::new(&t.id, json!({}));
        s.put_document(&a).await.unwrap();
        s.put_document(&b).await.unwrap();
        let gt = GraphType::new("linked", GraphDirection::NotDirected);
        s.put_graph_type(&gt).await.unwrap();
        s.put_graph(&Graph::new(&b.id, &a.id, &gt.id)).await.unwrap();
        let tag = Tag::new("urgent");
        s.put_tag(&tag).await.unwrap();
        s.put_document_tag(&DocumentTag::new(&a.id, &tag.id)).await.unwrap();

        s.delete_document(&a.id).await.unwrap();
        assert!(s.get_document(&a.id).await.unwrap().is_none());
        assert!(s.graphs_touching(&b.id).await.unwrap().is_empty());
        let (tags, _) = s
            .list_document_tags(&DocumentTagFilter::default())
            .await
            .unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn graph_rule_triple_unique() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let rule = GraphRule::new("group", "notebook", "contains", None);
        s.put_graph_rule(&rule).await.unwrap();
        let err = s
            .put_graph_rule(&GraphRule::new("group", "notebook", "contains", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let found = s
            .find_graph_rule("group", "notebook", "contains")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, rule);
    }

    #[tokio::test]
    async fn graph_type_in_use_cannot_be_deleted() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let gt = GraphType::new("contains", GraphDirection::Unidirectional);
        s.put_graph_type(&gt).await.unwrap();
        s.put_graph_rule(&GraphRule::new("a", "b", &gt.id, None))
            .await
            .unwrap();
        let err = s.delete_graph_type(&gt.id).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(matches!(
            s.delete_graph_type("missing").await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn delete_tag_detaches_children() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let parent = Tag::new("work");
        let mut child = Tag::new("meetings");
        child.parent_tag = Some(parent.id.clone());
        s.put_tag(&parent).await.unwrap();
        s.put_tag(&child).await.unwrap();

        s.delete_tag(&parent.id).await.unwrap();
        let child = s.get_tag(&child.id).await.unwrap().unwrap();
        assert!(child.parent_tag.is_none());
    }

    #[tokio::test]
    async fn missing_rule_table_is_a_resolution_error() {
        let s = SqliteStorage::open_in_memory().unwrap();
        s.conn.lock().unwrap().execute_batch("DROP TABLE graph_rules").unwrap();
        let err = s.find_graph_rule("a", "b", "c").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Resolution(ResolutionError::MissingRuleTable)
        ));
    }
}
