// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Write operations for the package cache.
//!
//! All inserts are idempotent: attribute sets and descriptions are
//! insert-or-get, packages upsert on `(parentId, attrName)`. The scrape
//! engine is the only writer.

use rusqlite::{Connection, OptionalExtension, params};
use tracing::trace;

use flakedb_core::AttrPath;
use flakedb_eval::{Cursor, EvalError};

use crate::connection::CacheDb;
use crate::error::{CacheError, Result};
use crate::types::{LockedInput, ROOT_ATTR_SET, RowId};

/// Package fields read from a derivation cursor.
///
/// `meta` fields are optional and stay NULL when absent; everything else is
/// required.
#[derive(Debug, Clone)]
struct DerivationAttrs {
    pname: String,
    version: String,
    outputs: Vec<String>,
    outputs_to_install: Vec<String>,
    system: String,
    description: Option<String>,
    license: Option<String>,
    broken: Option<bool>,
    unfree: Option<bool>,
}

impl DerivationAttrs {
    fn read<C: Cursor>(attr_name: &str, cursor: &C) -> Result<Self> {
        let missing = |attr: &'static str| CacheError::MissingAttr {
            attr_name: attr_name.to_string(),
            attr,
        };

        let pname = cursor.get_string("pname")?.ok_or_else(|| missing("pname"))?;
        let version = cursor
            .get_string("version")?
            .ok_or_else(|| missing("version"))?;
        let outputs = cursor
            .get_string_list("outputs")?
            .ok_or_else(|| missing("outputs"))?;
        let outputs_to_install = cursor
            .get_string_list("outputsToInstall")?
            .ok_or_else(|| missing("outputsToInstall"))?;
        let system = cursor
            .get_string("system")?
            .ok_or_else(|| missing("system"))?;

        let (description, license, broken, unfree) = match cursor.child("meta")? {
            Some(meta) => (
                meta.get_string("description")?,
                read_license(&meta)?,
                meta.get_bool("broken")?,
                meta.get_bool("unfree")?,
            ),
            None => (None, None, None, None),
        };

        Ok(DerivationAttrs {
            pname,
            version,
            outputs,
            outputs_to_install,
            system,
            description,
            license,
            broken,
            unfree,
        })
    }
}

/// `meta.license` is either a plain string or an attribute set carrying an
/// `spdxId`.
fn read_license<C: Cursor>(meta: &C) -> Result<Option<String>> {
    match meta.get_string("license") {
        Ok(license) => Ok(license),
        Err(EvalError::TypeMismatch { .. }) => match meta.child("license")? {
            Some(license) => Ok(license.get_string("spdxId")?),
            None => Ok(None),
        },
        Err(err) => Err(err.into()),
    }
}

fn attr_set_id(conn: &Connection, attr_name: &str, parent: RowId) -> Result<RowId> {
    let existing: Option<RowId> = conn
        .prepare_cached("SELECT id FROM AttrSets WHERE parent = ?1 AND attrName = ?2")?
        .query_row(params![parent, attr_name], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.prepare_cached("INSERT INTO AttrSets (parent, attrName, done) VALUES (?1, ?2, 0)")?
        .execute(params![parent, attr_name])?;
    Ok(conn.last_insert_rowid())
}

fn description_id(conn: &Connection, description: &str) -> Result<RowId> {
    let existing: Option<RowId> = conn
        .prepare_cached("SELECT id FROM Descriptions WHERE description = ?1")?
        .query_row(params![description], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.prepare_cached("INSERT INTO Descriptions (description) VALUES (?1)")?
        .execute(params![description])?;
    Ok(conn.last_insert_rowid())
}

impl CacheDb {
    /// Id of the attribute set `attr_name` under `parent`, inserting a
    /// `done = 0` row when absent. [`ROOT_ATTR_SET`] means no parent.
    pub fn add_or_get_attr_set_id(&self, attr_name: &str, parent: RowId) -> Result<RowId> {
        attr_set_id(&self.conn, attr_name, parent)
    }

    /// Id of the attribute set addressed by `path`, inserting any missing
    /// rows along the way. The empty path is [`ROOT_ATTR_SET`].
    pub fn add_or_get_attr_set_path(&self, path: &AttrPath) -> Result<RowId> {
        let mut parent = ROOT_ATTR_SET;
        for segment in path.iter() {
            parent = attr_set_id(&self.conn, segment, parent)?;
        }
        Ok(parent)
    }

    /// Id of `description` in the interning table, inserting when absent.
    pub fn add_or_get_description_id(&self, description: &str) -> Result<RowId> {
        description_id(&self.conn, description)
    }

    /// Record the package at `attr_name` under the attribute set `parent`.
    ///
    /// With `check_drv`, a cursor that is not a derivation is
    /// [`CacheError::NotDerivation`]; skipping the check is a small
    /// optimization when the caller already knows. With an existing row and
    /// `replace = false` the stored id is returned unchanged; with
    /// `replace = true` every column is overwritten. The package insert and
    /// its description interning are one transaction.
    pub fn add_package<C: Cursor>(
        &mut self,
        parent: RowId,
        attr_name: &str,
        cursor: &C,
        replace: bool,
        check_drv: bool,
    ) -> Result<RowId> {
        if check_drv && !cursor.is_derivation()? {
            return Err(CacheError::NotDerivation {
                attr_name: attr_name.to_string(),
            });
        }
        let drv = DerivationAttrs::read(attr_name, cursor)?;

        let tx = self.conn.transaction()?;

        let existing: Option<RowId> = tx
            .prepare_cached("SELECT id FROM Packages WHERE parentId = ?1 AND attrName = ?2")?
            .query_row(params![parent, attr_name], |row| row.get(0))
            .optional()?;
        if let Some(id) = existing {
            if !replace {
                return Ok(id);
            }
        }

        let description_id = drv
            .description
            .as_deref()
            .map(|text| description_id(&tx, text))
            .transpose()?;
        let outputs = serde_json::to_string(&drv.outputs)?;
        let outputs_to_install = serde_json::to_string(&drv.outputs_to_install)?;

        let id = match existing {
            Some(id) => {
                tx.prepare_cached(
                    r#"
                    UPDATE Packages
                    SET pname = ?2, version = ?3, outputs = ?4, outputsToInstall = ?5,
                        system = ?6, license = ?7, broken = ?8, unfree = ?9,
                        descriptionId = ?10
                    WHERE id = ?1
                    "#,
                )?
                .execute(params![
                    id,
                    drv.pname,
                    drv.version,
                    outputs,
                    outputs_to_install,
                    drv.system,
                    drv.license,
                    drv.broken,
                    drv.unfree,
                    description_id,
                ])?;
                id
            }
            None => {
                tx.prepare_cached(
                    r#"
                    INSERT INTO Packages
                        (parentId, attrName, pname, version, outputs, outputsToInstall,
                         system, license, broken, unfree, descriptionId)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    "#,
                )?
                .execute(params![
                    parent,
                    attr_name,
                    drv.pname,
                    drv.version,
                    outputs,
                    outputs_to_install,
                    drv.system,
                    drv.license,
                    drv.broken,
                    drv.unfree,
                    description_id,
                ])?;
                tx.last_insert_rowid()
            }
        };

        tx.commit()?;
        trace!("recorded package '{attr_name}' under attrset {parent}");
        Ok(id)
    }

    /// Set the `done` flag on the attribute set `prefix` and every
    /// descendant, in one statement.
    pub fn set_prefix_done(&self, prefix: RowId, done: bool) -> Result<()> {
        self.conn
            .prepare_cached(
                r#"
                WITH RECURSIVE Sub (id) AS (
                    SELECT ?1
                    UNION ALL
                    SELECT a.id FROM AttrSets a JOIN Sub s ON a.parent = s.id
                )
                UPDATE AttrSets SET done = ?2 WHERE id IN (SELECT id FROM Sub)
                "#,
            )?
            .execute(params![prefix, done])?;
        Ok(())
    }

    /// Path form of [`set_prefix_done`]; resolves (and if necessary
    /// creates) the prefix row first.
    ///
    /// [`set_prefix_done`]: CacheDb::set_prefix_done
    pub fn set_prefix_done_path(&self, prefix: &AttrPath, done: bool) -> Result<()> {
        let id = self.add_or_get_attr_set_path(prefix)?;
        self.set_prefix_done(id, done)
    }

    /// Write the locked reference row. The previous row, if any, is
    /// replaced; a database only ever describes one locked input.
    pub(crate) fn write_input(&self, input: &LockedInput) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM LockedFlake", [])?;
        tx.execute(
            "INSERT INTO LockedFlake (fingerprint, lockedRef, lockedRefAttrs) VALUES (?1, ?2, ?3)",
            params![
                input.fingerprint.to_hex(),
                input.locked_ref,
                serde_json::to_string(&input.locked_ref_attrs)?,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }
}
