// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Error type for the scrape engine.

use thiserror::Error;

use flakedb_cache::CacheError;
use flakedb_eval::EvalError;
use flakedb_rules::RulesError;

/// Result type for scrape operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Any failure that aborts a scrape.
///
/// Per-child recovery is limited to the not-a-derivation diagnostic, which
/// is logged and skipped inside the engine; everything else propagates and
/// leaves the scraped prefix not `done`.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
