// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Scrape engine: walks an evaluator's attribute tree under a set of scrape
//! rules and records packages in the cache.
//!
//! The engine is a breadth-first worklist over [`Target`]s. One target is
//! one attribute set: its children are classified by the rules tree (record
//! as package, descend, skip, or defer to the evaluator's
//! `recurseForDerivations` hint) and subtrees to descend into are pushed
//! onto the queue. When the queue drains, the scraped prefix is marked
//! `done` recursively.
//!
//! A single engine is the only writer of its database file. Cancellation is
//! cooperative at target boundaries: callers that need it drive
//! [`scrape_target`] themselves and simply stop between targets, leaving
//! every `done` flag conservative.

mod engine;
mod error;

pub use engine::{Target, Todos, scrape, scrape_target};
pub use error::{Result, ScrapeError};
