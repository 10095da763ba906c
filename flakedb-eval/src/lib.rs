// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Interface to the package-expression evaluator.
//!
//! The evaluator itself is an external collaborator; the scraper only needs
//! a handle into its lazily-evaluated attribute tree. [`Cursor`] is that
//! handle. The [`mem`] module provides an eagerly-built in-memory tree that
//! implements the same interface, which the other crates use in tests.

pub mod cursor;
pub mod mem;

pub use cursor::{Cursor, EvalError, Result};
