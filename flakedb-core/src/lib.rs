// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Core data model shared by the flakedb crates.
//!
//! This crate defines the vocabulary types of the package database:
//! attribute paths and path globs, the fixed set of target systems, and the
//! content fingerprint that identifies a database file.

pub mod attr_path;
pub mod fingerprint;
pub mod system;

pub use attr_path::{AttrPath, AttrPathGlob, GlobError, SYSTEM_POSITION};
pub use fingerprint::{Fingerprint, FingerprintError};
pub use system::{System, UnknownSystem};
