// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! The path-indexed rules tree.

use std::collections::BTreeMap;

use data_encoding::HEXLOWER;
use ring::digest;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::trace;

use flakedb_core::{AttrPath, AttrPathGlob, System};

use crate::error::{Result, RulesError};
use crate::raw::ScrapeRulesRaw;
use crate::rule::ScrapeRule;

/// Key carrying a node's own rule in the serialized nested form.
const RULE_KEY: &str = "__rule";

/// One node of the rules tree.
///
/// The root carries an empty `attr_name`. Each child is keyed by its
/// attribute name; a node's rule is written at most once over its lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulesTreeNode {
    pub attr_name: String,
    pub rule: ScrapeRule,
    pub children: BTreeMap<String, RulesTreeNode>,
}

impl RulesTreeNode {
    fn named(attr_name: String) -> Self {
        RulesTreeNode {
            attr_name,
            rule: ScrapeRule::Default,
            children: BTreeMap::new(),
        }
    }

    /// Install `rule` at the node addressed by `glob`, creating intermediate
    /// nodes as needed.
    ///
    /// A wildcard in the system position expands into one insertion per
    /// member of [`System::ALL`], each carrying the same rule. Assigning to
    /// a node whose rule is already set is a [`RulesError::RuleConflict`].
    pub fn add_rule(&mut self, glob: &AttrPathGlob, rule: ScrapeRule) -> Result<()> {
        let mut abs = AttrPath::new();
        self.add_rule_at(&mut abs, glob.segments(), rule)
    }

    fn add_rule_at(
        &mut self,
        abs: &mut AttrPath,
        rel: &[Option<String>],
        rule: ScrapeRule,
    ) -> Result<()> {
        let Some((head, tail)) = rel.split_first() else {
            if self.rule != ScrapeRule::Default {
                return Err(RulesError::RuleConflict {
                    path: abs.to_string(),
                    existing: self.rule,
                    new: rule,
                });
            }
            trace!("assigning rule '{rule}' to '{abs}'");
            self.rule = rule;
            return Ok(());
        };

        match head {
            // System wildcard: one concrete insertion per system.
            None => {
                trace!("splitting system glob under '{abs}' into concrete systems");
                for system in System::ALL {
                    let mut expanded: Vec<Option<String>> = Vec::with_capacity(rel.len());
                    expanded.push(Some(system.as_str().to_string()));
                    expanded.extend(tail.iter().cloned());
                    self.add_rule_at(abs, &expanded, rule)?;
                }
                Ok(())
            }
            Some(name) => {
                abs.push(name.clone());
                let child = self
                    .children
                    .entry(name.clone())
                    .or_insert_with(|| RulesTreeNode::named(name.clone()));
                let result = child.add_rule_at(abs, tail, rule);
                abs.pop();
                result
            }
        }
    }

    /// The rule at exactly `path`, without ancestor inheritance.
    ///
    /// Returns `Default` as soon as a segment is missing from the tree.
    pub fn get_rule(&self, path: &AttrPath) -> ScrapeRule {
        let mut node = self;
        for segment in path.iter() {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return ScrapeRule::Default,
            }
        }
        node.rule
    }

    /// The decision for `path`: `Some(true)` to allow, `Some(false)` to
    /// disallow, `None` when no rule on the path or its ancestors decides.
    pub fn apply_rules(&self, path: &AttrPath) -> Result<Option<bool>> {
        let mut rule = self.get_rule(path);
        if rule == ScrapeRule::Default {
            let mut prefix = path.clone();
            while rule == ScrapeRule::Default && !prefix.is_empty() {
                prefix.pop();
                rule = self.get_rule(&prefix);
            }
        }

        match rule {
            ScrapeRule::AllowPackage | ScrapeRule::AllowRecursive => Ok(Some(true)),
            ScrapeRule::DisallowPackage | ScrapeRule::DisallowRecursive => Ok(Some(false)),
            ScrapeRule::Default => Ok(None),
            ScrapeRule::Unset => Err(RulesError::CorruptRule {
                path: path.to_string(),
                rule,
            }),
        }
    }

    /// Lowercase-hex SHA-256 of the canonical serialized form.
    ///
    /// Two documents with the same semantic content hash equal: children are
    /// kept sorted, and the compact rendering carries no whitespace.
    pub fn hash(&self) -> Result<String> {
        let raw = serde_json::to_string(self)?;
        let digest = digest::digest(&digest::SHA256, raw.as_bytes());
        Ok(HEXLOWER.encode(digest.as_ref()))
    }
}

impl TryFrom<ScrapeRulesRaw> for RulesTreeNode {
    type Error = RulesError;

    fn try_from(raw: ScrapeRulesRaw) -> Result<Self> {
        let mut tree = RulesTreeNode::default();
        for (globs, rule) in [
            (&raw.allow_package, ScrapeRule::AllowPackage),
            (&raw.disallow_package, ScrapeRule::DisallowPackage),
            (&raw.allow_recursive, ScrapeRule::AllowRecursive),
            (&raw.disallow_recursive, ScrapeRule::DisallowRecursive),
        ] {
            for glob in globs {
                tree.add_rule(glob, rule)?;
            }
        }
        Ok(tree)
    }
}

impl Serialize for RulesTreeNode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.children.len() + 1))?;
        map.serialize_entry(RULE_KEY, self.rule.as_str())?;
        for (name, child) in &self.children {
            map.serialize_entry(name, child)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RulesTreeNode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = RulesTreeNode;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a rules tree node object")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut node = RulesTreeNode::default();
                while let Some(key) = access.next_key::<String>()? {
                    if key == RULE_KEY {
                        let name: String = access.next_value()?;
                        node.rule = name.parse().map_err(de::Error::custom)?;
                    } else {
                        let mut child: RulesTreeNode = access.next_value()?;
                        child.attr_name.clone_from(&key);
                        node.children.insert(key, child);
                    }
                }
                Ok(node)
            }
        }

        deserializer.deserialize_map(NodeVisitor)
    }
}
