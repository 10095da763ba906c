// SPDX-FileCopyrightText: 2025 Jörg Thalheim
// SPDX-License-Identifier: MIT

//! End-to-end scrape scenarios against an in-memory evaluator and an
//! in-memory cache.

use flakedb_cache::{CacheDb, LockedInput};
use flakedb_core::{AttrPath, System};
use flakedb_eval::mem::{MemCursor, Value, attrs, drv};
use flakedb_eval::Cursor;
use flakedb_rules::{RulesTreeNode, ScrapeRulesRaw};
use flakedb_scrape::scrape;

fn rules(document: &str) -> RulesTreeNode {
    RulesTreeNode::try_from(ScrapeRulesRaw::from_json_str(document).unwrap()).unwrap()
}

fn no_rules() -> RulesTreeNode {
    RulesTreeNode::default()
}

fn cache() -> CacheDb {
    CacheDb::open_memory(&LockedInput::new(
        "github:NixOS/nixpkgs/fedcba9876543210fedcba9876543210fedcba98",
        serde_json::json!({"type": "github", "owner": "NixOS", "repo": "nixpkgs"}),
    ))
    .unwrap()
}

/// `legacyPackages.<system>` with a handful of packages and subtrees.
fn nixpkgs() -> MemCursor {
    let per_system = |system: System| {
        attrs()
            .set("hello", drv("hello", "2.12.1", system))
            .set("coreutils", drv("coreutils", "9.5", system))
            .set(
                "pythonPackages",
                attrs()
                    .set("recurseForDerivations", Value::Bool(true))
                    .set("requests", drv("python3.12-requests", "2.32.3", system)),
            )
            .set(
                "nodePackages",
                attrs()
                    .set("broken", attrs().set("left-pad", drv("left-pad", "1.3.0", system)))
                    .set("good", attrs().set("typescript", drv("typescript", "5.5.2", system))),
            )
            .set(
                "misc",
                attrs().set("hidden", drv("hidden", "1.0", system)),
            )
    };
    MemCursor::root(attrs().set(
        "legacyPackages",
        attrs()
            .set("x86_64-linux", per_system(System::X86_64Linux))
            .set("aarch64-darwin", per_system(System::Aarch64Darwin)),
    ))
}

fn cursor_at(root: &MemCursor, path: &AttrPath) -> MemCursor {
    let mut cursor = root.clone();
    for segment in path.iter() {
        cursor = cursor.child(segment).unwrap().unwrap();
    }
    cursor
}

fn scrape_prefix(db: &mut CacheDb, rules: &RulesTreeNode, prefix: &AttrPath) {
    let root = nixpkgs();
    let cursor = cursor_at(&root, prefix);
    scrape(db, rules, prefix, cursor).unwrap();
}

#[test]
fn deny_list_skips_single_package() {
    let rules = rules(r#"{"disallowPackage": [["legacyPackages", "x86_64-linux", "hello"]]}"#);
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &rules, &prefix);

    let paths = db.package_attr_paths().unwrap();
    assert!(paths.contains(&"legacyPackages.x86_64-linux.coreutils".to_string()));
    assert!(!paths.iter().any(|p| p.ends_with(".hello")));
}

#[test]
fn recursive_allow_with_nested_disallow() {
    let rules = rules(
        r#"{
            "allowRecursive": [["legacyPackages", "x86_64-linux", "nodePackages"]],
            "disallowRecursive": [["legacyPackages", "x86_64-linux", "nodePackages", "broken"]]
        }"#,
    );
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &rules, &prefix);

    let paths = db.package_attr_paths().unwrap();
    assert!(
        paths.contains(&"legacyPackages.x86_64-linux.nodePackages.good.typescript".to_string())
    );
    assert!(!paths.iter().any(|p| p.contains(".broken.")));
}

#[test]
fn wildcard_disallows_subtree_for_every_system() {
    let rules = rules(r#"{"disallowRecursive": [["legacyPackages", null, "pythonPackages"]]}"#);
    let mut db = cache();

    for system in ["x86_64-linux", "aarch64-darwin"] {
        let prefix = AttrPath::from(vec!["legacyPackages".to_string(), system.to_string()]);
        scrape_prefix(&mut db, &rules, &prefix);
    }

    let paths = db.package_attr_paths().unwrap();
    assert!(!paths.iter().any(|p| p.contains("pythonPackages")));
    // The disallow is scoped: ordinary packages of both systems are there.
    assert!(paths.contains(&"legacyPackages.x86_64-linux.hello".to_string()));
    assert!(paths.contains(&"legacyPackages.aarch64-darwin.hello".to_string()));
}

#[test]
fn undecided_defers_to_recurse_hint() {
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &no_rules(), &prefix);

    let paths = db.package_attr_paths().unwrap();
    // pythonPackages carries recurseForDerivations = true.
    assert!(paths.contains(&"legacyPackages.x86_64-linux.pythonPackages.requests".to_string()));
    // misc carries no hint: not descended, and no attrset row either.
    assert!(!paths.iter().any(|p| p.contains("misc")));
    assert_eq!(db.attr_set_id(&prefix.child("misc")).unwrap(), None);
    // nodePackages carries no hint either.
    assert!(!paths.iter().any(|p| p.contains("nodePackages")));
}

#[test]
fn meta_recurse_hint_is_accepted() {
    let tree = MemCursor::root(attrs().set(
        "legacyPackages",
        attrs().set(
            "x86_64-linux",
            attrs().set(
                "scope",
                attrs()
                    .set("meta", attrs().set("recurseForDerivations", Value::Bool(true)))
                    .set("inner", drv("inner", "1.0", System::X86_64Linux)),
            ),
        ),
    ));
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);
    scrape(&mut db, &no_rules(), &prefix, cursor_at(&tree, &prefix)).unwrap();

    assert_eq!(
        db.package_attr_paths().unwrap(),
        vec!["legacyPackages.x86_64-linux.scope.inner".to_string()]
    );
}

#[test]
fn recursion_is_implicit_at_system_level() {
    // Scraping the bare root descends through the system attrsets even
    // though they carry no recurseForDerivations hint.
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages"]);

    scrape_prefix(&mut db, &no_rules(), &prefix);

    let paths = db.package_attr_paths().unwrap();
    assert!(paths.contains(&"legacyPackages.x86_64-linux.hello".to_string()));
    assert!(paths.contains(&"legacyPackages.aarch64-darwin.hello".to_string()));
}

#[test]
fn allow_package_on_non_derivation_is_skipped() {
    // `misc` is an attrset, not a derivation: allowPackage on it is a user
    // error and must neither record a package nor descend.
    let rules = rules(r#"{"allowPackage": [["legacyPackages", "x86_64-linux", "misc"]]}"#);
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &rules, &prefix);

    let paths = db.package_attr_paths().unwrap();
    assert!(!paths.iter().any(|p| p.contains("misc")));
}

#[test]
fn allow_recursive_descends_without_hint() {
    let rules = rules(r#"{"allowRecursive": [["legacyPackages", "x86_64-linux", "misc"]]}"#);
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &rules, &prefix);

    assert!(
        db.package_attr_paths()
            .unwrap()
            .contains(&"legacyPackages.x86_64-linux.misc.hidden".to_string())
    );
}

#[test]
fn done_closes_over_the_scraped_prefix() {
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &no_rules(), &prefix);

    assert_eq!(db.is_done(&prefix).unwrap(), Some(true));
    assert_eq!(db.is_done(&prefix.child("pythonPackages")).unwrap(), Some(true));
    // The parent of the scraped prefix is not part of the closure.
    assert_eq!(
        db.is_done(&AttrPath::from(["legacyPackages"])).unwrap(),
        Some(false)
    );
}

#[test]
fn rescrape_is_idempotent() {
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &no_rules(), &prefix);
    let count = db.count_packages().unwrap();
    let paths = db.package_attr_paths().unwrap();

    scrape_prefix(&mut db, &no_rules(), &prefix);
    assert_eq!(db.count_packages().unwrap(), count);
    assert_eq!(db.package_attr_paths().unwrap(), paths);
    assert_eq!(db.is_done(&prefix).unwrap(), Some(true));
}

#[test]
fn breadth_first_assigns_shallow_ids_first() {
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    scrape_prefix(&mut db, &no_rules(), &prefix);

    let prefix_id = db.attr_set_id(&prefix).unwrap().unwrap();
    let packages = db.list_packages(prefix_id).unwrap();
    let hello = packages.iter().find(|p| p.attr_name == "hello").unwrap();
    let requests = packages.iter().find(|p| p.attr_name == "requests").unwrap();
    // Top-level packages are inserted before anything in a nested scope.
    assert!(hello.id < requests.id);
}

#[test]
fn evaluator_failure_aborts_and_leaves_prefix_not_done() {
    let tree = MemCursor::root(attrs().set(
        "legacyPackages",
        attrs().set(
            "x86_64-linux",
            attrs()
                .set("hello", drv("hello", "2.12.1", System::X86_64Linux))
                .set(
                    "zz-exploding",
                    attrs()
                        .set("recurseForDerivations", Value::Bool(true))
                        .set("boom", Value::Throw("evaluation failed".into())),
                ),
        ),
    ));
    let mut db = cache();
    let prefix = AttrPath::from(["legacyPackages", "x86_64-linux"]);

    let err = scrape(&mut db, &no_rules(), &prefix, cursor_at(&tree, &prefix));
    assert!(err.is_err());

    // Rows written before the failure are intact and valid, but nothing is
    // falsely marked done.
    assert!(
        db.package_attr_paths()
            .unwrap()
            .contains(&"legacyPackages.x86_64-linux.hello".to_string())
    );
    assert_eq!(db.is_done(&prefix).unwrap(), Some(false));
}
