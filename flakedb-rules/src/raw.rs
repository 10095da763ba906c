// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! The raw rules document.

use serde_json::Value;

use flakedb_core::{AttrPathGlob, GlobError};

use crate::error::{Result, RulesError};

/// Scrape rules as they appear in the JSON document, before tree
/// construction. All four sections are optional; an unknown section or an
/// invalid glob is fatal.
#[derive(Debug, Clone, Default)]
pub struct ScrapeRulesRaw {
    pub allow_package: Vec<AttrPathGlob>,
    pub disallow_package: Vec<AttrPathGlob>,
    pub allow_recursive: Vec<AttrPathGlob>,
    pub disallow_recursive: Vec<AttrPathGlob>,
}

impl ScrapeRulesRaw {
    pub fn from_json_str(document: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(document)?)
    }

    /// Walk the top-level object key by key, so an unrecognized section is
    /// [`RulesError::UnknownSection`] and a bad entry is
    /// [`RulesError::InvalidGlob`], distinct from a document that is not
    /// JSON at all.
    pub fn from_json(document: Value) -> Result<Self> {
        let sections: serde_json::Map<String, Value> = serde_json::from_value(document)?;
        let mut raw = ScrapeRulesRaw::default();
        for (section, entries) in sections {
            let globs = match section.as_str() {
                "allowPackage" => &mut raw.allow_package,
                "disallowPackage" => &mut raw.disallow_package,
                "allowRecursive" => &mut raw.allow_recursive,
                "disallowRecursive" => &mut raw.disallow_recursive,
                _ => return Err(RulesError::UnknownSection(section)),
            };
            let entries: Vec<Value> = serde_json::from_value(entries)?;
            for entry in entries {
                globs.push(parse_glob(entry)?);
            }
        }
        Ok(raw)
    }
}

/// One glob entry: an array whose elements are attribute names, with `null`
/// as the wildcard marker.
fn parse_glob(entry: Value) -> Result<AttrPathGlob> {
    let items: Vec<Value> = serde_json::from_value(entry)?;
    let mut segments = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Null => segments.push(None),
            Value::String(name) => segments.push(Some(name.clone())),
            _ => {
                return Err(GlobError::NonStringSegment {
                    glob: display_entry(&items),
                    index,
                }
                .into());
            }
        }
    }
    Ok(AttrPathGlob::new(segments)?)
}

fn display_entry(items: &[Value]) -> String {
    let rendered: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Null => "*".to_string(),
            Value::String(name) => name.clone(),
            other => other.to_string(),
        })
        .collect();
    rendered.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let raw = ScrapeRulesRaw::from_json_str(
            r#"{
                "allowPackage": [["legacyPackages", "x86_64-linux", "hello"]],
                "disallowPackage": [],
                "allowRecursive": [["legacyPackages", null, "nodePackages"]],
                "disallowRecursive": [["legacyPackages", null, "tests"]]
            }"#,
        )
        .unwrap();
        assert_eq!(raw.allow_package.len(), 1);
        assert_eq!(raw.allow_recursive.len(), 1);
        assert_eq!(raw.disallow_recursive.len(), 1);
        assert!(raw.disallow_package.is_empty());
        assert_eq!(raw.allow_recursive[0].segments()[1], None);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let raw = ScrapeRulesRaw::from_json_str("{}").unwrap();
        assert!(raw.allow_package.is_empty());
        assert!(raw.disallow_recursive.is_empty());
    }

    #[test]
    fn unknown_section_is_fatal() {
        let err = ScrapeRulesRaw::from_json_str(r#"{"aliasRules": []}"#).unwrap_err();
        match err {
            RulesError::UnknownSection(section) => assert_eq!(section, "aliasRules"),
            other => panic!("expected UnknownSection, got {other:?}"),
        }
    }

    #[test]
    fn misplaced_wildcard_is_fatal() {
        let err = ScrapeRulesRaw::from_json_str(
            r#"{"allowPackage": [["legacyPackages", "x86_64-linux", null]]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RulesError::InvalidGlob(GlobError::WildcardPosition { index: 2, .. })
        ));
    }

    #[test]
    fn empty_segment_is_fatal() {
        let err = ScrapeRulesRaw::from_json_str(r#"{"disallowPackage": [["legacyPackages", ""]]}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            RulesError::InvalidGlob(GlobError::EmptySegment { index: 1, .. })
        ));
    }

    #[test]
    fn non_string_segment_is_fatal() {
        let err =
            ScrapeRulesRaw::from_json_str(r#"{"allowRecursive": [["legacyPackages", 42]]}"#)
                .unwrap_err();
        match err {
            RulesError::InvalidGlob(GlobError::NonStringSegment { glob, index }) => {
                assert_eq!(glob, "legacyPackages.42");
                assert_eq!(index, 1);
            }
            other => panic!("expected NonStringSegment, got {other:?}"),
        }
    }

    #[test]
    fn garbled_document_is_a_parse_error() {
        let err = ScrapeRulesRaw::from_json_str(r#"{"allowPackage": ["#).unwrap_err();
        assert!(matches!(err, RulesError::ParseRules(_)));

        // Structurally wrong shapes are parse errors too, not glob errors.
        let err = ScrapeRulesRaw::from_json_str(r#"{"allowPackage": 7}"#).unwrap_err();
        assert!(matches!(err, RulesError::ParseRules(_)));
    }
}
