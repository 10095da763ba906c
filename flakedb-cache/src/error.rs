// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Error types for cache operations.

use std::path::PathBuf;

use thiserror::Error;

use flakedb_core::Fingerprint;
use flakedb_eval::EvalError;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur while opening or writing a package cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open database with context
    #[error("failed to open database at '{path}': {source}")]
    DatabaseOpen {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Read-write open against a database that was never created
    #[error("no database for fingerprint {fingerprint} at '{path}'")]
    NoSuchDatabase {
        fingerprint: Fingerprint,
        path: PathBuf,
    },

    /// The stored tables schema disagrees with this build. The file must be
    /// discarded and recreated; tables are never migrated in place.
    #[error("tables schema version mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// `add_package` was asked to verify a cursor that is not a derivation
    #[error("attribute '{attr_name}' is not a derivation")]
    NotDerivation { attr_name: String },

    /// A derivation is missing an attribute the package row requires
    #[error("derivation '{attr_name}' is missing required attribute '{attr}'")]
    MissingAttr {
        attr_name: String,
        attr: &'static str,
    },

    /// The evaluator failed while reading derivation attributes
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// A JSON column failed to encode or decode
    #[error("invalid JSON column: {0}")]
    JsonColumn(#[from] serde_json::Error),

    /// The stored fingerprint is not a valid digest
    #[error("invalid fingerprint in database: {0}")]
    BadFingerprint(#[from] flakedb_core::FingerprintError),
}
