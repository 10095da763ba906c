// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! An in-memory attribute tree implementing [`Cursor`].
//!
//! This is the evaluator stand-in used by the flakedb test suites. Values
//! are eager except for [`Value::Throw`], which fails evaluation when
//! visited, mimicking an expression that raises.

use std::collections::BTreeMap;
use std::sync::Arc;

use flakedb_core::{AttrPath, System};

use crate::cursor::{Cursor, EvalError, Result};

/// One node of the in-memory tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Attrs(BTreeMap<String, Value>),
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<Value>),
    /// Fails evaluation with the given message when visited.
    Throw(String),
}

impl Value {
    /// Insert `key` into an attribute set, builder style. Panics on
    /// non-attrs, which is fine for test fixtures.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        match &mut self {
            Value::Attrs(map) => {
                map.insert(key.into(), value);
            }
            other => panic!("Value::set on non-attrs value {other:?}"),
        }
        self
    }

    fn is_derivation(&self) -> bool {
        match self {
            Value::Attrs(map) => {
                matches!(map.get("type"), Some(Value::String(ty)) if ty == "derivation")
            }
            _ => false,
        }
    }
}

/// An empty attribute set.
pub fn attrs() -> Value {
    Value::Attrs(BTreeMap::new())
}

/// A list of strings.
pub fn string_list<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::List(items.into_iter().map(|s| Value::String(s.into())).collect())
}

/// A minimal derivation attribute set: `type`, `name`, `pname`, `version`,
/// `outputs`, `outputsToInstall`, `system`, and an empty `meta`. Extend with
/// [`Value::set`] as needed.
pub fn drv(pname: &str, version: &str, system: System) -> Value {
    attrs()
        .set("type", Value::String("derivation".into()))
        .set("name", Value::String(format!("{pname}-{version}")))
        .set("pname", Value::String(pname.into()))
        .set("version", Value::String(version.into()))
        .set("outputs", string_list(["out"]))
        .set("outputsToInstall", string_list(["out"]))
        .set("system", Value::String(system.as_str().into()))
        .set("meta", attrs())
}

/// A cursor into a [`Value`] tree.
///
/// Holds the tree root and an absolute path; nodes are resolved on access so
/// a [`Value::Throw`] anywhere on the path surfaces as an [`EvalError`].
#[derive(Debug, Clone)]
pub struct MemCursor {
    root: Arc<Value>,
    path: AttrPath,
}

impl MemCursor {
    pub fn root(value: Value) -> Self {
        MemCursor {
            root: Arc::new(value),
            path: AttrPath::new(),
        }
    }

    /// Absolute path of this cursor within the tree.
    pub fn path(&self) -> &AttrPath {
        &self.path
    }

    fn resolve(&self) -> Result<&Value> {
        let mut node: &Value = &self.root;
        let mut walked = AttrPath::new();
        for segment in self.path.iter() {
            walked.push(segment);
            node = match node {
                Value::Attrs(map) => map.get(segment).ok_or_else(|| EvalError::Eval {
                    path: walked.to_string(),
                    message: "attribute is missing".into(),
                })?,
                Value::Throw(message) => {
                    return Err(EvalError::Eval {
                        path: walked.to_string(),
                        message: message.clone(),
                    });
                }
                _ => {
                    return Err(EvalError::Eval {
                        path: walked.to_string(),
                        message: "value is not an attribute set".into(),
                    });
                }
            };
        }
        if let Value::Throw(message) = node {
            return Err(EvalError::Eval {
                path: self.path.to_string(),
                message: message.clone(),
            });
        }
        Ok(node)
    }

    fn lookup(&self, name: &str) -> Result<Option<&Value>> {
        match self.resolve()? {
            Value::Attrs(map) => match map.get(name) {
                Some(Value::Throw(message)) => Err(EvalError::Eval {
                    path: self.path.child(name).to_string(),
                    message: message.clone(),
                }),
                other => Ok(other),
            },
            _ => Ok(None),
        }
    }
}

fn to_json(name: &str, value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Attrs(map) => {
            let mut object = serde_json::Map::new();
            for (key, child) in map {
                object.insert(key.clone(), to_json(name, child)?);
            }
            serde_json::Value::Object(object)
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::List(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|item| to_json(name, item))
                .collect::<Result<_>>()?,
        ),
        Value::Throw(message) => {
            return Err(EvalError::Eval {
                path: name.to_string(),
                message: message.clone(),
            });
        }
    })
}

impl Cursor for MemCursor {
    fn is_derivation(&self) -> Result<bool> {
        Ok(self.resolve()?.is_derivation())
    }

    fn children(&self) -> Result<Vec<(String, Self)>> {
        match self.resolve()? {
            Value::Attrs(map) => Ok(map
                .keys()
                .map(|name| {
                    (
                        name.clone(),
                        MemCursor {
                            root: Arc::clone(&self.root),
                            path: self.path.child(name),
                        },
                    )
                })
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn child(&self, name: &str) -> Result<Option<Self>> {
        Ok(self.lookup(name)?.map(|_| MemCursor {
            root: Arc::clone(&self.root),
            path: self.path.child(name),
        }))
    }

    fn get_attr(&self, name: &str) -> Result<Option<serde_json::Value>> {
        self.lookup(name)?
            .map(|value| to_json(name, value))
            .transpose()
    }

    fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.lookup(name)? {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(EvalError::TypeMismatch {
                name: name.to_string(),
                expected: "bool",
            }),
        }
    }

    fn get_string(&self, name: &str) -> Result<Option<String>> {
        match self.lookup(name)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(EvalError::TypeMismatch {
                name: name.to_string(),
                expected: "string",
            }),
        }
    }

    fn get_string_list(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self.lookup(name)? {
            None => Ok(None),
            Some(Value::List(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(EvalError::TypeMismatch {
                        name: name.to_string(),
                        expected: "list of strings",
                    }),
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
            Some(_) => Err(EvalError::TypeMismatch {
                name: name.to_string(),
                expected: "list of strings",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemCursor {
        MemCursor::root(
            attrs().set(
                "legacyPackages",
                attrs().set(
                    "x86_64-linux",
                    attrs()
                        .set("hello", drv("hello", "2.12.1", System::X86_64Linux))
                        .set(
                            "utils",
                            attrs()
                                .set("recurseForDerivations", Value::Bool(true))
                                .set("jq", drv("jq", "1.7", System::X86_64Linux)),
                        )
                        .set("broken", Value::Throw("assertion failed".into())),
                ),
            ),
        )
    }

    #[test]
    fn children_are_sorted() {
        let cursor = sample();
        let prefix = cursor
            .child("legacyPackages")
            .unwrap()
            .unwrap()
            .child("x86_64-linux")
            .unwrap()
            .unwrap();
        let names: Vec<String> = prefix
            .children()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, ["broken", "hello", "utils"]);
    }

    #[test]
    fn derivation_detection() {
        let cursor = sample();
        let hello = cursor
            .child("legacyPackages")
            .unwrap()
            .unwrap()
            .child("x86_64-linux")
            .unwrap()
            .unwrap()
            .child("hello")
            .unwrap()
            .unwrap();
        assert!(hello.is_derivation().unwrap());
        assert_eq!(hello.get_string("pname").unwrap().as_deref(), Some("hello"));
        assert_eq!(
            hello.get_string_list("outputs").unwrap(),
            Some(vec!["out".to_string()])
        );
        assert!(!cursor.is_derivation().unwrap());
    }

    #[test]
    fn throw_surfaces_as_eval_error() {
        let cursor = sample();
        let prefix = cursor
            .child("legacyPackages")
            .unwrap()
            .unwrap()
            .child("x86_64-linux")
            .unwrap()
            .unwrap();
        let err = prefix.child("broken").unwrap_err();
        assert!(matches!(err, EvalError::Eval { .. }));
    }

    #[test]
    fn type_mismatch() {
        let cursor = MemCursor::root(attrs().set("flag", Value::String("yes".into())));
        assert!(matches!(
            cursor.get_bool("flag"),
            Err(EvalError::TypeMismatch { expected: "bool", .. })
        ));
        assert_eq!(cursor.get_bool("missing").unwrap(), None);
    }
}
