// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Scrape rules for the flakedb package database.
//!
//! A rules tree classifies every attribute path the scraper visits: record
//! the node as a package, descend into it, skip it, or fall back to the
//! evaluator's own hints. Rules are loaded from a JSON document with four
//! sections (`allowPackage`, `disallowPackage`, `allowRecursive`,
//! `disallowRecursive`), each a list of attribute-path globs.
//!
//! Decisions inherit downward: a rule set on `legacyPackages.x86_64-linux`
//! applies to everything below it unless a deeper node overrides. The only
//! wildcard is the system position, which expands to the fixed system set at
//! insertion time.

use std::sync::LazyLock;

pub mod error;
pub mod raw;
pub mod rule;
pub mod tree;

pub use error::{Result, RulesError};
pub use raw::ScrapeRulesRaw;
pub use rule::ScrapeRule;
pub use tree::RulesTreeNode;

/// The process-wide default rules, parsed once from the embedded document.
pub static DEFAULT_RULES: LazyLock<RulesTreeNode> = LazyLock::new(|| {
    let raw = ScrapeRulesRaw::from_json_str(include_str!("default-rules.json"))
        .expect("embedded default rules must parse");
    RulesTreeNode::try_from(raw).expect("embedded default rules must be consistent")
});
