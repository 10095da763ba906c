// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Database schema definitions for the package cache.
//!
//! Tables and views are versioned separately under the `DbVersions` keys
//! `pkgdb_schema` and `pkgdb_views_schema`. Views are dropped and recreated
//! whenever their stored version differs from [`VIEWS_VERSION`]; a tables
//! mismatch is fatal and the caller discards the file.

/// Version of the tables schema. Bumping this invalidates every existing
/// database file.
pub const TABLES_VERSION: &str = "0.2.0";

/// Version of the views schema. Bumping this refreshes views in place on
/// the next open.
pub const VIEWS_VERSION: &str = "0.2.0";

/// `DbVersions` key for the tables schema.
pub(crate) const TABLES_VERSION_KEY: &str = "pkgdb_schema";

/// `DbVersions` key for the views schema.
pub(crate) const VIEWS_VERSION_KEY: &str = "pkgdb_views_schema";

/// Core tables (AttrSets, Descriptions, Packages, DbVersions, LockedFlake).
///
/// `AttrSets.parent = 0` marks a root entry, so `parent` carries no foreign
/// key. The `(parent, attrName)` and `(parentId, attrName)` unique keys are
/// part of the on-disk format: insert-or-get relies on them.
pub(crate) const TABLES_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS AttrSets (
    id       INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    parent   INTEGER NOT NULL DEFAULT 0,
    attrName TEXT    NOT NULL,
    done     INTEGER NOT NULL DEFAULT 0,
    UNIQUE (parent, attrName)
);

CREATE INDEX IF NOT EXISTS IndexAttrSetsParent ON AttrSets(parent);

CREATE TABLE IF NOT EXISTS Descriptions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    description TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS Packages (
    id               INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    parentId         INTEGER NOT NULL,
    attrName         TEXT    NOT NULL,
    pname            TEXT    NOT NULL,
    version          TEXT    NOT NULL,
    outputs          TEXT    NOT NULL,
    outputsToInstall TEXT    NOT NULL,
    system           TEXT    NOT NULL,
    license          TEXT,
    broken           INTEGER,
    unfree           INTEGER,
    descriptionId    INTEGER,
    UNIQUE (parentId, attrName),
    FOREIGN KEY (parentId) REFERENCES AttrSets(id),
    FOREIGN KEY (descriptionId) REFERENCES Descriptions(id)
);

CREATE INDEX IF NOT EXISTS IndexPackagesParent ON Packages(parentId);

CREATE TABLE IF NOT EXISTS DbVersions (
    name    TEXT PRIMARY KEY NOT NULL,
    version TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS LockedFlake (
    fingerprint    TEXT NOT NULL,
    lockedRef      TEXT NOT NULL,
    lockedRefAttrs TEXT NOT NULL
);
"#;

/// Denormalized views over the tables.
///
/// `v_AttrPaths` renders the full dotted path of every attribute set;
/// `v_Packages` joins packages with their path and interned description.
pub(crate) const VIEWS_SQL: &str = r#"
CREATE VIEW v_AttrPaths AS
WITH RECURSIVE Tree (id, attrPath) AS (
    SELECT id, attrName FROM AttrSets WHERE parent = 0
    UNION ALL
    SELECT a.id, t.attrPath || '.' || a.attrName
    FROM AttrSets a
    JOIN Tree t ON a.parent = t.id
)
SELECT id, attrPath FROM Tree;

CREATE VIEW v_Packages AS
SELECT p.id,
       t.attrPath || '.' || p.attrName AS attrPath,
       p.attrName,
       p.pname,
       p.version,
       p.outputs,
       p.outputsToInstall,
       p.system,
       p.license,
       p.broken,
       p.unfree,
       d.description
FROM Packages p
JOIN v_AttrPaths t ON p.parentId = t.id
LEFT JOIN Descriptions d ON p.descriptionId = d.id;
"#;
