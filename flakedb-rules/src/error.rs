// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Error types for rules construction and application.

use thiserror::Error;

use flakedb_core::GlobError;

use crate::rule::ScrapeRule;

/// Result type for rules operations.
pub type Result<T> = std::result::Result<T, RulesError>;

#[derive(Debug, Error)]
pub enum RulesError {
    /// A rule was assigned twice to the same node.
    #[error(
        "attempted to overwrite existing rule for '{path}': \
         rule '{existing}' conflicts with new rule '{new}'"
    )]
    RuleConflict {
        path: String,
        existing: ScrapeRule,
        new: ScrapeRule,
    },

    /// A rules-document entry is not a valid attribute-path glob.
    #[error("invalid attribute-path glob: {0}")]
    InvalidGlob(#[from] GlobError),

    /// The rules document contains a top-level section outside the four
    /// recognized ones.
    #[error("unknown scrape rule section '{0}'")]
    UnknownSection(String),

    /// The rules document is not valid JSON, or a section has the wrong
    /// shape entirely.
    #[error("failed to parse rules document: {0}")]
    ParseRules(#[from] serde_json::Error),

    /// A rule name outside the recognized set.
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// A rule outside the enumerated set was found while applying rules.
    /// Indicates a bug or on-disk corruption.
    #[error("encountered unexpected rule '{rule}' at '{path}'")]
    CorruptRule { path: String, rule: ScrapeRule },
}
