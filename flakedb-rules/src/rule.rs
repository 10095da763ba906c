// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! The rule verdict attached to a node.

use std::fmt;
use std::str::FromStr;

use crate::error::RulesError;

/// Classification verdict for an attribute path.
///
/// `Unset` exists only so partially-populated trees survive a serialization
/// round-trip; it must never appear in a consistent tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScrapeRule {
    /// Serialization sentinel, never valid at runtime.
    Unset,
    /// Inherit from ancestors, or defer to evaluator hints.
    #[default]
    Default,
    /// Force a package entry for this exact path.
    AllowPackage,
    /// Force this subtree to be scraped.
    AllowRecursive,
    /// Never record a package at this exact path.
    DisallowPackage,
    /// Ignore this subtree unless a descendant overrides.
    DisallowRecursive,
}

impl ScrapeRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeRule::Unset => "UNSET",
            ScrapeRule::Default => "default",
            ScrapeRule::AllowPackage => "allowPackage",
            ScrapeRule::AllowRecursive => "allowRecursive",
            ScrapeRule::DisallowPackage => "disallowPackage",
            ScrapeRule::DisallowRecursive => "disallowRecursive",
        }
    }
}

impl fmt::Display for ScrapeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrapeRule {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNSET" => Ok(ScrapeRule::Unset),
            "default" => Ok(ScrapeRule::Default),
            "allowPackage" => Ok(ScrapeRule::AllowPackage),
            "allowRecursive" => Ok(ScrapeRule::AllowRecursive),
            "disallowPackage" => Ok(ScrapeRule::DisallowPackage),
            "disallowRecursive" => Ok(ScrapeRule::DisallowRecursive),
            other => Err(RulesError::UnknownRule(other.to_string())),
        }
    }
}
