// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Read query operations for the package cache.
//!
//! This is the surface the (separate) resolution and search layer builds
//! on; nothing here inserts rows.

use rusqlite::{OptionalExtension, Row, params};

use flakedb_core::{AttrPath, Fingerprint};

use crate::connection::CacheDb;
use crate::error::Result;
use crate::types::{LockedInput, PackageRow, ROOT_ATTR_SET, RowId};

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<(PackageRow, String, String)> {
    Ok((
        PackageRow {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            attr_name: row.get(2)?,
            pname: row.get(3)?,
            version: row.get(4)?,
            outputs: Vec::new(),
            outputs_to_install: Vec::new(),
            system: row.get(7)?,
            license: row.get(8)?,
            broken: row.get::<_, Option<i64>>(9)?.map(|b| b != 0),
            unfree: row.get::<_, Option<i64>>(10)?.map(|b| b != 0),
            description: row.get(11)?,
        },
        row.get(5)?,
        row.get(6)?,
    ))
}

const PACKAGE_COLUMNS: &str = r#"
    p.id, p.parentId, p.attrName, p.pname, p.version,
    p.outputs, p.outputsToInstall, p.system, p.license, p.broken, p.unfree,
    d.description
"#;

impl CacheDb {
    /// Id of the attribute set addressed by `path`, without inserting.
    pub fn attr_set_id(&self, path: &AttrPath) -> Result<Option<RowId>> {
        let mut parent = ROOT_ATTR_SET;
        for segment in path.iter() {
            let id: Option<RowId> = self
                .conn
                .prepare_cached("SELECT id FROM AttrSets WHERE parent = ?1 AND attrName = ?2")?
                .query_row(params![parent, segment], |row| row.get(0))
                .optional()?;
            match id {
                Some(id) => parent = id,
                None => return Ok(None),
            }
        }
        Ok(Some(parent))
    }

    /// The `done` flag of the attribute set addressed by `path`, or `None`
    /// when no such row exists.
    pub fn is_done(&self, path: &AttrPath) -> Result<Option<bool>> {
        let Some(id) = self.attr_set_id(path)? else {
            return Ok(None);
        };
        let done: i64 = self.conn.query_row(
            "SELECT done FROM AttrSets WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(Some(done != 0))
    }

    /// The package at `attr_name` under the attribute set `parent`.
    pub fn get_package(&self, parent: RowId, attr_name: &str) -> Result<Option<PackageRow>> {
        let row = self
            .conn
            .prepare_cached(&format!(
                r#"
                SELECT {PACKAGE_COLUMNS}
                FROM Packages p
                LEFT JOIN Descriptions d ON p.descriptionId = d.id
                WHERE p.parentId = ?1 AND p.attrName = ?2
                "#
            ))?
            .query_row(params![parent, attr_name], package_from_row)
            .optional()?;
        row.map(finish_package).transpose()
    }

    /// Every package under the attribute set `prefix`, including nested
    /// subtrees, ordered by row id.
    pub fn list_packages(&self, prefix: RowId) -> Result<Vec<PackageRow>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            r#"
            WITH RECURSIVE Sub (id) AS (
                SELECT ?1
                UNION ALL
                SELECT a.id FROM AttrSets a JOIN Sub s ON a.parent = s.id
            )
            SELECT {PACKAGE_COLUMNS}
            FROM Packages p
            JOIN Sub s ON p.parentId = s.id
            LEFT JOIN Descriptions d ON p.descriptionId = d.id
            ORDER BY p.id
            "#
        ))?;
        let rows = stmt.query_map(params![prefix], package_from_row)?;
        let mut packages = Vec::new();
        for row in rows {
            packages.push(finish_package(row?)?);
        }
        Ok(packages)
    }

    /// Full dotted attribute paths of every package, from the denormalized
    /// view, ordered by path.
    pub fn package_attr_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT attrPath FROM v_Packages ORDER BY attrPath")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<_, _>>()?)
    }

    /// Number of package rows.
    pub fn count_packages(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Packages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Stored schema version under `name` in `DbVersions`.
    pub fn db_version(&self, name: &str) -> Result<Option<String>> {
        self.stored_version(name)
    }

    /// The locked input this database was created for.
    pub fn locked_input(&self) -> Result<Option<LockedInput>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT fingerprint, lockedRef, lockedRefAttrs FROM LockedFlake",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((fingerprint, locked_ref, attrs)) = row else {
            return Ok(None);
        };
        Ok(Some(LockedInput {
            fingerprint: fingerprint.parse::<Fingerprint>()?,
            locked_ref,
            locked_ref_attrs: serde_json::from_str(&attrs)?,
        }))
    }
}

fn finish_package(parts: (PackageRow, String, String)) -> Result<PackageRow> {
    let (mut package, outputs, outputs_to_install) = parts;
    package.outputs = serde_json::from_str(&outputs)?;
    package.outputs_to_install = serde_json::from_str(&outputs_to_install)?;
    Ok(package)
}
