// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! The worklist traversal.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use flakedb_cache::{CacheDb, CacheError, RowId};
use flakedb_core::{AttrPath, SYSTEM_POSITION};
use flakedb_eval::{Cursor, Result as EvalResult};
use flakedb_rules::{RulesTreeNode, ScrapeRule};

use crate::error::Result;

/// One unit of work: an attribute set to process.
#[derive(Debug, Clone)]
pub struct Target<C> {
    /// Absolute attribute path of `cursor`.
    pub path: AttrPath,
    /// Cursor into the evaluator at `path`.
    pub cursor: C,
    /// `AttrSets` row id corresponding to `path`.
    pub parent_id: RowId,
}

/// FIFO queue of pending targets. Breadth-first order falls out of pushing
/// at the back and popping at the front, so partial caches observed by
/// readers are a coherent top-down slice.
pub type Todos<C> = VecDeque<Target<C>>;

/// Scrape the subtree rooted at `root_path`, then mark the prefix `done`.
///
/// The prefix is conventionally a fixed `<root>.<system>` pair such as
/// `legacyPackages.x86_64-linux`; system names are never enumerated here.
/// On error the queue is abandoned and every `done` flag stays as it was,
/// so an interrupted scrape is visible as such.
pub fn scrape<C: Cursor>(
    db: &mut CacheDb,
    rules: &RulesTreeNode,
    root_path: &AttrPath,
    root: C,
) -> Result<()> {
    let root_id = db.add_or_get_attr_set_path(root_path)?;
    debug!("scraping '{root_path}' (attrset {root_id})");

    let mut todo: Todos<C> = VecDeque::from([Target {
        path: root_path.clone(),
        cursor: root,
        parent_id: root_id,
    }]);
    while let Some(target) = todo.pop_front() {
        scrape_target(db, rules, &target, &mut todo)?;
    }

    // Rows are inserted with done = 0; a single recursive update closes the
    // whole prefix only after the queue drained without error.
    db.set_prefix_done(root_id, true)?;
    debug!("finished scraping '{root_path}'");
    Ok(())
}

/// Process the children of one target, enqueueing subtrees for later.
///
/// This is the cancellation granularity: a caller driving the queue itself
/// may stop between calls and the cache stays consistent.
pub fn scrape_target<C: Cursor>(
    db: &mut CacheDb,
    rules: &RulesTreeNode,
    target: &Target<C>,
    todo: &mut Todos<C>,
) -> Result<()> {
    for (attr_name, child) in target.cursor.children()? {
        let child_path = target.path.child(attr_name.clone());

        match rules.apply_rules(&child_path)? {
            Some(false) => {
                trace!("skipping '{child_path}': disallowed by rule");
            }
            Some(true) => {
                if child.is_derivation()? {
                    add_package(db, target.parent_id, &attr_name, &child_path, &child)?;
                } else if rules.get_rule(&child_path) == ScrapeRule::AllowPackage {
                    // A user allowed this exact path as a package, but it
                    // does not evaluate to a derivation.
                    warn!("'{child_path}' has rule allowPackage but is not a derivation, skipping");
                } else {
                    enqueue(db, todo, child_path, attr_name, child, target.parent_id)?;
                }
            }
            // No rule decides: fall back to the evaluator's hint. At the
            // root and system levels recursion is implicit.
            None => {
                if child.is_derivation()? {
                    add_package(db, target.parent_id, &attr_name, &child_path, &child)?;
                } else if child_path.len() <= SYSTEM_POSITION + 1 || recurse_hint(&child)? {
                    enqueue(db, todo, child_path, attr_name, child, target.parent_id)?;
                } else {
                    trace!("skipping '{child_path}': no recurse hint");
                }
            }
        }
    }
    Ok(())
}

fn add_package<C: Cursor>(
    db: &mut CacheDb,
    parent_id: RowId,
    attr_name: &str,
    child_path: &AttrPath,
    child: &C,
) -> Result<()> {
    // The derivation check already happened; existing rows win over
    // re-evaluation.
    match db.add_package(parent_id, attr_name, child, false, false) {
        Ok(_) => Ok(()),
        Err(CacheError::NotDerivation { .. }) => {
            warn!("'{child_path}' is not a derivation, skipping");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn enqueue<C: Cursor>(
    db: &mut CacheDb,
    todo: &mut Todos<C>,
    child_path: AttrPath,
    attr_name: String,
    child: C,
    parent_id: RowId,
) -> Result<()> {
    let child_id = db.add_or_get_attr_set_id(&attr_name, parent_id)?;
    trace!("queueing '{child_path}' (attrset {child_id})");
    todo.push_back(Target {
        path: child_path,
        cursor: child,
        parent_id: child_id,
    });
    Ok(())
}

/// The evaluator's recursion hint on a child attribute set.
///
/// Read from the attrset itself, falling back to `meta.recurseForDerivations`
/// for trees that publish it there. Absent means no.
fn recurse_hint<C: Cursor>(child: &C) -> EvalResult<bool> {
    if let Some(hint) = child.get_bool("recurseForDerivations")? {
        return Ok(hint);
    }
    match child.child("meta")? {
        Some(meta) => Ok(meta.get_bool("recurseForDerivations")?.unwrap_or(false)),
        None => Ok(false),
    }
}
