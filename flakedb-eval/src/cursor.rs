// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! The cursor trait implemented by evaluator bindings.

use thiserror::Error;

/// Result type for cursor operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors surfaced by the evaluator.
///
/// Cursor operations are the only calls in the scraper that may perform
/// arbitrary computation, so any evaluation failure funnels through here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The evaluator failed to produce a value.
    #[error("evaluation of '{path}' failed: {message}")]
    Eval { path: String, message: String },

    /// An attribute exists but has an unusable type.
    #[error("attribute '{name}' has unexpected type, expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

/// A handle to one node of the evaluator's lazy attribute tree.
///
/// Cursors are cheap to clone; cloning does not force evaluation. All
/// accessors may block while the evaluator computes, and any of them may
/// fail with an [`EvalError`].
pub trait Cursor: Clone {
    /// Whether this node is a derivation.
    fn is_derivation(&self) -> Result<bool>;

    /// Child attributes of this node, in deterministic (lexicographic)
    /// order. Empty for nodes that are not attribute sets.
    fn children(&self) -> Result<Vec<(String, Self)>>;

    /// Descend into the named attribute, or `None` when absent.
    fn child(&self, name: &str) -> Result<Option<Self>>;

    /// The named attribute as a JSON value, or `None` when absent.
    fn get_attr(&self, name: &str) -> Result<Option<serde_json::Value>>;

    /// The named attribute as a boolean, or `None` when absent.
    fn get_bool(&self, name: &str) -> Result<Option<bool>>;

    /// The named attribute as a string, or `None` when absent.
    fn get_string(&self, name: &str) -> Result<Option<String>>;

    /// The named attribute as a list of strings, or `None` when absent.
    fn get_string_list(&self, name: &str) -> Result<Option<Vec<String>>>;
}
