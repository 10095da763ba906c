// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! SQLite package cache for scraped attribute trees.
//!
//! One database caches the packages of one locked input; the file is named
//! after the input's content fingerprint, so a changed input is a different
//! database. Rows are written by the scrape engine and never deleted
//! individually; an out-of-date schema discards the file as a whole.
//!
//! # Key Features
//!
//! - Fingerprint-addressed database lifecycle (open existing, or create for
//!   a locked input)
//! - Idempotent insert-or-get operations for attribute sets, descriptions,
//!   and packages
//! - Recursive `done`-flag propagation over attribute-set subtrees
//! - Versioned tables and views; views are refreshed in place, tables are
//!   never migrated
//! - In-memory database for testing
//!
//! # Example
//!
//! ```ignore
//! use flakedb_cache::{CacheDb, LockedInput};
//!
//! let input = LockedInput::new(
//!     "github:NixOS/nixpkgs/9e2e9ef...",
//!     serde_json::json!({"type": "github", "owner": "NixOS", "repo": "nixpkgs"}),
//! );
//! let db = CacheDb::create(cache_root, &input)?;
//! ```

mod connection;
mod error;
mod query;
mod schema;
mod types;
mod write;

pub use connection::CacheDb;
pub use error::{CacheError, Result};
pub use schema::{TABLES_VERSION, VIEWS_VERSION};
pub use types::{LockedInput, PackageRow, RowId, ROOT_ATTR_SET};
