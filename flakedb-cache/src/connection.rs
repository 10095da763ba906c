// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Database connection management and the fingerprint-addressed lifecycle.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::debug;

use flakedb_core::Fingerprint;

use crate::error::{CacheError, Result};
use crate::schema::{
    TABLES_SQL, TABLES_VERSION, TABLES_VERSION_KEY, VIEWS_SQL, VIEWS_VERSION, VIEWS_VERSION_KEY,
};
use crate::types::LockedInput;

/// SQLite package cache for one locked input.
///
/// A `CacheDb` exclusively owns its file for writing; concurrent writers to
/// the same file must be prevented by the caller.
pub struct CacheDb {
    pub(crate) conn: Connection,
    path: PathBuf,
    fingerprint: Fingerprint,
}

impl std::fmt::Debug for CacheDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheDb")
            .field("path", &self.path)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl CacheDb {
    /// The database file path for `fingerprint` under `cache_root`.
    pub fn db_path(cache_root: &Path, fingerprint: &Fingerprint) -> PathBuf {
        cache_root.join(format!("{}.sqlite", fingerprint.to_hex()))
    }

    /// Open an existing database for reading and writing.
    ///
    /// Does not create the file: a missing database is
    /// [`CacheError::NoSuchDatabase`]. A stored tables-schema version other
    /// than [`TABLES_VERSION`] is [`CacheError::SchemaMismatch`]; the caller
    /// is expected to discard the file and recreate it.
    pub fn open(cache_root: &Path, fingerprint: Fingerprint) -> Result<Self> {
        let path = Self::db_path(cache_root, &fingerprint);
        if !path.exists() {
            return Err(CacheError::NoSuchDatabase { fingerprint, path });
        }

        let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_WRITE).map_err(
            |e| CacheError::DatabaseOpen {
                path: path.clone(),
                source: e,
            },
        )?;
        let db = Self {
            conn,
            path,
            fingerprint,
        };
        db.init()?;

        debug!("opened package cache at {}", db.path.display());
        Ok(db)
    }

    /// Open the database for a locked input, creating it if absent.
    ///
    /// The locked reference row is (re)written on every call.
    pub fn create(cache_root: &Path, input: &LockedInput) -> Result<Self> {
        let path = Self::db_path(cache_root, &input.fingerprint);
        let created = !path.exists();

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|e| CacheError::DatabaseOpen {
            path: path.clone(),
            source: e,
        })?;
        let db = Self {
            conn,
            path,
            fingerprint: input.fingerprint,
        };
        if created {
            db.configure_pragmas()?;
        }
        db.init()?;
        db.write_input(input)?;

        debug!(
            "{} package cache at {}",
            if created { "created" } else { "opened" },
            db.path.display()
        );
        Ok(db)
    }

    /// Create an in-memory database for a locked input (for testing).
    pub fn open_memory(input: &LockedInput) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            path: PathBuf::from(":memory:"),
            fingerprint: input.fingerprint,
        };
        db.configure_pragmas()?;
        db.init()?;
        db.write_input(input)?;
        debug!("created in-memory package cache");
        Ok(db)
    }

    /// Fingerprint identifying this database.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;
        Ok(())
    }

    /// Create or refresh the schema: tables if absent, views whenever their
    /// stored version differs, `DbVersions` defaults if absent.
    fn init(&self) -> Result<()> {
        self.init_tables()?;
        self.check_tables_version()?;
        self.update_views()?;
        Ok(())
    }

    fn init_tables(&self) -> Result<()> {
        self.conn.execute_batch(TABLES_SQL)?;
        // OR IGNORE: an existing database keeps its stored version, which
        // check_tables_version then compares against this build.
        self.conn.execute(
            "INSERT OR IGNORE INTO DbVersions (name, version) VALUES (?1, ?2)",
            params![TABLES_VERSION_KEY, TABLES_VERSION],
        )?;
        Ok(())
    }

    fn check_tables_version(&self) -> Result<()> {
        let found = self
            .stored_version(TABLES_VERSION_KEY)?
            .unwrap_or_default();
        if found != TABLES_VERSION {
            return Err(CacheError::SchemaMismatch {
                expected: TABLES_VERSION.to_string(),
                found,
            });
        }
        Ok(())
    }

    /// Drop and recreate every view when the stored views version differs.
    /// Table rows are untouched.
    fn update_views(&self) -> Result<()> {
        if self.stored_version(VIEWS_VERSION_KEY)?.as_deref() == Some(VIEWS_VERSION) {
            return Ok(());
        }
        debug!("refreshing views to schema version {VIEWS_VERSION}");

        let views: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT name FROM sqlite_master WHERE type = 'view'")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<std::result::Result<_, _>>()?
        };
        for view in views {
            // View names come from sqlite_master, not user input.
            self.conn
                .execute_batch(&format!("DROP VIEW IF EXISTS {view}"))?;
        }

        self.conn.execute_batch(VIEWS_SQL)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO DbVersions (name, version) VALUES (?1, ?2)",
            params![VIEWS_VERSION_KEY, VIEWS_VERSION],
        )?;
        Ok(())
    }

    pub(crate) fn stored_version(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT version FROM DbVersions WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }
}
