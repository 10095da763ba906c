// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! Attribute paths and attribute-path globs.
//!
//! An attribute path addresses a node in the evaluator's attribute tree,
//! e.g. `legacyPackages.x86_64-linux.hello`. A glob is the same thing except
//! that the segment in the system position may be a wildcard, so one rule
//! entry can cover every target system.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of the segment that names a system in the conventional two-level
/// `<root>.<system>` prefixes (`packages`, `legacyPackages`).
pub const SYSTEM_POSITION: usize = 1;

/// An ordered sequence of non-empty attribute names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrPath(Vec<String>);

impl AttrPath {
    /// The empty path, addressing the root of the attribute tree.
    pub const fn new() -> Self {
        AttrPath(Vec::new())
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// A copy of this path extended by one segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for AttrPath {
    fn from(segments: Vec<String>) -> Self {
        AttrPath(segments)
    }
}

impl<const N: usize> From<[&str; N]> for AttrPath {
    fn from(segments: [&str; N]) -> Self {
        AttrPath(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl FromIterator<String> for AttrPath {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        AttrPath(iter.into_iter().collect())
    }
}

impl IntoIterator for AttrPath {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// True when `segment` can be written without quotes in attribute-path
/// display form.
fn is_bare_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\''))
}

fn write_segment(f: &mut fmt::Formatter<'_>, segment: &str) -> fmt::Result {
    if is_bare_identifier(segment) {
        f.write_str(segment)
    } else {
        write!(f, "\"{}\"", segment.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            if idx != 0 {
                f.write_str(".")?;
            }
            write_segment(f, segment)?;
        }
        Ok(())
    }
}

/// Error constructing an [`AttrPathGlob`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GlobError {
    /// A wildcard segment appeared somewhere other than the system position.
    #[error("wildcard at segment {index} of '{glob}': only the system position may be a wildcard")]
    WildcardPosition { glob: String, index: usize },

    /// A concrete segment was the empty string.
    #[error("empty attribute name at segment {index} of '{glob}'")]
    EmptySegment { glob: String, index: usize },

    /// A segment in a rules document was neither a string nor the wildcard
    /// marker.
    #[error("segment {index} of '{glob}' is not an attribute name or wildcard")]
    NonStringSegment { glob: String, index: usize },
}

/// An attribute path whose system-position segment may be a wildcard.
///
/// Wildcard segments are `None`; in the JSON rules document they are written
/// as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttrPathGlob(Vec<Option<String>>);

impl AttrPathGlob {
    pub fn new(segments: Vec<Option<String>>) -> Result<Self, GlobError> {
        for (index, segment) in segments.iter().enumerate() {
            match segment {
                None if index != SYSTEM_POSITION => {
                    return Err(GlobError::WildcardPosition {
                        glob: display_glob(&segments),
                        index,
                    });
                }
                Some(name) if name.is_empty() => {
                    return Err(GlobError::EmptySegment {
                        glob: display_glob(&segments),
                        index,
                    });
                }
                _ => {}
            }
        }
        Ok(AttrPathGlob(segments))
    }

    pub fn segments(&self) -> &[Option<String>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<AttrPath> for AttrPathGlob {
    fn from(path: AttrPath) -> Self {
        AttrPathGlob(path.into_iter().map(Some).collect())
    }
}

fn display_glob(segments: &[Option<String>]) -> String {
    let rendered: Vec<&str> = segments
        .iter()
        .map(|s| s.as_deref().unwrap_or("*"))
        .collect();
    rendered.join(".")
}

impl fmt::Display for AttrPathGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.0.iter().enumerate() {
            if idx != 0 {
                f.write_str(".")?;
            }
            match segment {
                Some(name) => write_segment(f, name)?,
                None => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for AttrPathGlob {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let segments = Vec::<Option<String>>::deserialize(deserializer)?;
        AttrPathGlob::new(segments).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain(&["legacyPackages", "x86_64-linux", "hello"], "legacyPackages.x86_64-linux.hello")]
    #[case::quoted(&["legacyPackages", "x86_64-linux", "7zip"], "legacyPackages.x86_64-linux.\"7zip\"")]
    #[case::prime(&["nodePackages", "socket.io"], "nodePackages.\"socket.io\"")]
    #[case::tick(&["haskellPackages", "ghc'"], "haskellPackages.ghc'")]
    fn display(#[case] segments: &[&str], #[case] expected: &str) {
        let path: AttrPath = segments.iter().map(|s| s.to_string()).collect();
        assert_eq!(path.to_string(), expected);
    }

    #[test]
    fn child_does_not_mutate() {
        let path = AttrPath::from(["legacyPackages", "x86_64-linux"]);
        let child = path.child("hello");
        assert_eq!(path.len(), 2);
        assert_eq!(child.last(), Some("hello"));
    }

    #[test]
    fn glob_wildcard_in_system_position() {
        let glob = AttrPathGlob::new(vec![
            Some("legacyPackages".into()),
            None,
            Some("hello".into()),
        ])
        .unwrap();
        assert_eq!(glob.to_string(), "legacyPackages.*.hello");
    }

    #[test]
    fn glob_rejects_misplaced_wildcard() {
        let err = AttrPathGlob::new(vec![Some("legacyPackages".into()), Some("x86_64-linux".into()), None])
            .unwrap_err();
        assert!(matches!(err, GlobError::WildcardPosition { index: 2, .. }));
    }

    #[test]
    fn glob_rejects_empty_segment() {
        let err = AttrPathGlob::new(vec![Some(String::new())]).unwrap_err();
        assert!(matches!(err, GlobError::EmptySegment { index: 0, .. }));
    }

    #[test]
    fn glob_from_json() {
        let glob: AttrPathGlob =
            serde_json::from_str(r#"["legacyPackages", null, "pythonPackages"]"#).unwrap();
        assert_eq!(glob.segments()[1], None);

        let bad: Result<AttrPathGlob, _> = serde_json::from_str(r#"[null, "x"]"#);
        assert!(bad.is_err());
    }
}
