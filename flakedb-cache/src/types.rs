// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Row types for the package cache.

use flakedb_core::Fingerprint;

/// A SQLite row id.
pub type RowId = i64;

/// Pseudo-id used as the `parent` of root attribute sets. No row carries
/// this id.
pub const ROOT_ATTR_SET: RowId = 0;

/// A locked source reference together with its fingerprint.
///
/// The fingerprint doubles as the database's identity: the file name is its
/// hex rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedInput {
    pub fingerprint: Fingerprint,
    /// URL form of the locked reference.
    pub locked_ref: String,
    /// Attribute form of the locked reference, stored as JSON.
    pub locked_ref_attrs: serde_json::Value,
}

impl LockedInput {
    /// A locked input whose fingerprint is the digest of its reference URL.
    pub fn new(locked_ref: impl Into<String>, locked_ref_attrs: serde_json::Value) -> Self {
        let locked_ref = locked_ref.into();
        LockedInput {
            fingerprint: Fingerprint::digest(&locked_ref),
            locked_ref,
            locked_ref_attrs,
        }
    }
}

/// One row of the `Packages` table, joined with its interned description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRow {
    pub id: RowId,
    pub parent_id: RowId,
    pub attr_name: String,
    pub pname: String,
    pub version: String,
    pub outputs: Vec<String>,
    pub outputs_to_install: Vec<String>,
    pub system: String,
    pub license: Option<String>,
    pub broken: Option<bool>,
    pub unfree: Option<bool>,
    pub description: Option<String>,
}
