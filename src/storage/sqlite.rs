//! SQLite storage backend for folio

use super::traits::{
    AdminStore, ClassificationStore, OpenStore, Route, StorageError, StorageResult,
};
use crate::taxonomy::{
    CanonicalSchema, GroupName, ItemId, NewTerm, RoutePattern, Term, TermRef,
};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed classification store
///
/// Uses a single SQLite database file with tables for groups, terms, item
/// tags, markers and the materialized route table. Thread-safe via an
/// internal mutex on the connection, so each trait call is atomic.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Taxonomies. Route patterns are only set for registered
            -- (canonical) groups.
            CREATE TABLE IF NOT EXISTS groups (
                name TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                rewrite_slug TEXT,
                routes_json TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS terms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_name TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                UNIQUE (group_name, name),
                FOREIGN KEY (group_name) REFERENCES groups(name) ON DELETE CASCADE
            );

            -- Primary key makes tagging a set union
            CREATE TABLE IF NOT EXISTS tags (
                item_id TEXT NOT NULL,
                group_name TEXT NOT NULL,
                term_id INTEGER NOT NULL,
                PRIMARY KEY (item_id, group_name, term_id),
                FOREIGN KEY (term_id) REFERENCES terms(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_tags_term
                ON tags(group_name, term_id);

            CREATE TABLE IF NOT EXISTS markers (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS routes (
                path TEXT PRIMARY KEY,
                query TEXT NOT NULL
            );

            PRAGMA foreign_keys = ON;

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection mutex poisoned".to_string()))
    }

    fn group_exists(conn: &Connection, group: &GroupName) -> StorageResult<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM groups WHERE name = ?1",
                params![group.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn row_to_term(row: &Row<'_>) -> rusqlite::Result<Term> {
        Ok(Term {
            id: TermRef::from_raw(row.get(0)?),
            group: GroupName::new(row.get::<_, String>(1)?),
            name: row.get(2)?,
            slug: row.get(3)?,
            description: row.get(4)?,
        })
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // Another process may be migrating the same file
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ClassificationStore for SqliteStore {
    // === Terms ===

    fn list_terms(&self, group: &GroupName) -> StorageResult<Vec<Term>> {
        let conn = self.conn()?;
        if !Self::group_exists(&conn, group)? {
            return Err(StorageError::NotFound(group.clone()));
        }

        let mut stmt = conn.prepare(
            "SELECT id, group_name, name, slug, description FROM terms
             WHERE group_name = ?1 ORDER BY id",
        )?;
        let terms = stmt
            .query_map(params![group.as_str()], Self::row_to_term)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(terms)
    }

    fn find_term_by_name(&self, group: &GroupName, name: &str) -> StorageResult<Option<Term>> {
        let conn = self.conn()?;
        let term = conn
            .query_row(
                "SELECT id, group_name, name, slug, description FROM terms
                 WHERE group_name = ?1 AND name = ?2",
                params![group.as_str(), name],
                Self::row_to_term,
            )
            .optional()?;
        Ok(term)
    }

    fn create_term(&self, group: &GroupName, term: &NewTerm) -> StorageResult<Term> {
        if term.name.is_empty() {
            return Err(StorageError::Invalid("term name must not be empty".to_string()));
        }

        let conn = self.conn()?;
        if !Self::group_exists(&conn, group)? {
            return Err(StorageError::NotFound(group.clone()));
        }

        let inserted = conn.execute(
            "INSERT INTO terms (group_name, name, slug, description) VALUES (?1, ?2, ?3, ?4)",
            params![group.as_str(), term.name, term.slug, term.description],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                return Err(StorageError::Conflict {
                    group: group.clone(),
                    name: term.name.clone(),
                });
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Term {
            id: TermRef::from_raw(conn.last_insert_rowid()),
            group: group.clone(),
            name: term.name.clone(),
            slug: term.slug.clone(),
            description: term.description.clone(),
        })
    }

    // === Tags ===

    fn list_items_tagged(&self, group: &GroupName, term: TermRef) -> StorageResult<Vec<ItemId>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id FROM tags WHERE group_name = ?1 AND term_id = ?2 ORDER BY item_id",
        )?;
        let items = stmt
            .query_map(params![group.as_str(), term.raw()], |row| {
                row.get::<_, String>(0).map(ItemId::new)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn add_tag(&self, item: &ItemId, group: &GroupName, term: TermRef) -> StorageResult<bool> {
        let conn = self.conn()?;
        let belongs: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM terms WHERE id = ?1 AND group_name = ?2",
                params![term.raw(), group.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if belongs.is_none() {
            return Err(StorageError::Invalid(format!("{} is not a term of {}", term, group)));
        }

        let changed = conn.execute(
            "INSERT OR IGNORE INTO tags (item_id, group_name, term_id) VALUES (?1, ?2, ?3)",
            params![item.as_str(), group.as_str(), term.raw()],
        )?;
        Ok(changed > 0)
    }

    // === Markers ===

    fn get_marker(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM markers WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_marker(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO markers (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // === Schema & routes ===

    fn register_schema(&self, schema: &CanonicalSchema) -> StorageResult<()> {
        let conn = self.conn()?;
        let routes_json = serde_json::to_string(&schema.routes)?;
        conn.execute(
            r#"
            INSERT INTO groups (name, label, rewrite_slug, routes_json)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET
                label = excluded.label,
                rewrite_slug = excluded.rewrite_slug,
                routes_json = excluded.routes_json
            "#,
            params![
                schema.group.as_str(),
                schema.label,
                schema.rewrite_slug,
                routes_json,
            ],
        )?;
        Ok(())
    }

    fn refresh_routes(&self) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        // Take the write lock before reading so a concurrent writer makes
        // this wait on the busy timeout instead of failing the upgrade
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let registered: Vec<(String, String)> = {
            let mut stmt = tx.prepare(
                "SELECT name, routes_json FROM groups WHERE rewrite_slug IS NOT NULL ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        tx.execute("DELETE FROM routes", [])?;

        for (group, routes_json) in registered {
            let patterns: Vec<RoutePattern> = serde_json::from_str(&routes_json)?;
            let slugs: Vec<String> = {
                let mut stmt =
                    tx.prepare("SELECT slug FROM terms WHERE group_name = ?1 ORDER BY id")?;
                let rows = stmt
                    .query_map(params![group], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };
            for slug in &slugs {
                for pattern in &patterns {
                    let (path, query) = pattern.expand(slug);
                    tx.execute(
                        "INSERT OR REPLACE INTO routes (path, query) VALUES (?1, ?2)",
                        params![path, query],
                    )?;
                }
            }
        }

        // Terms sharing a slug expand to the same paths
        let written: i64 = tx.query_row("SELECT COUNT(*) FROM routes", [], |row| row.get(0))?;
        tx.commit()?;
        Ok(written as usize)
    }
}

impl AdminStore for SqliteStore {
    fn ensure_group(&self, group: &GroupName, label: &str) -> StorageResult<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO groups (name, label) VALUES (?1, ?2)",
            params![group.as_str(), label],
        )?;
        Ok(changed > 0)
    }

    fn list_groups(&self) -> StorageResult<Vec<(GroupName, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, label FROM groups ORDER BY name")?;
        let groups = stmt
            .query_map([], |row| {
                Ok((GroupName::new(row.get::<_, String>(0)?), row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    fn tags_of(&self, item: &ItemId) -> StorageResult<Vec<(GroupName, Term)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.group_name, t.name, t.slug, t.description, g.group_name
            FROM tags g
            JOIN terms t ON t.id = g.term_id
            WHERE g.item_id = ?1
            ORDER BY g.group_name, t.name
            "#,
        )?;
        let tags = stmt
            .query_map(params![item.as_str()], |row| {
                let term = Self::row_to_term(row)?;
                let group = GroupName::new(row.get::<_, String>(5)?);
                Ok((group, term))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn list_routes(&self) -> StorageResult<Vec<Route>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT path, query FROM routes ORDER BY path")?;
        let routes = stmt
            .query_map([], |row| {
                Ok(Route {
                    path: row.get(0)?,
                    query: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(routes)
    }
}
