//! Tests for the rule loader module.

use std::fs;

use tempfile::TempDir;

use super::core::Registry;
use super::watcher::{reload_path, remove_by_path};
use super::*;
use crate::schema::RuleKind;

const RULE_SET_YAML: &str = r#"
apiVersion: v1
kind: AutomationRuleSet
metadata:
  id: test-set
  name: Test Set
spec:
  rules:
    - id: lot_zoom_multiple
      when: { count: { event: zoom_lot, min: 2 } }
      reason: "Viewed {{ count }} lots"
      deltas: { leadScore: 10 }
"#;

const SCORING_YAML: &str = r#"
apiVersion: v1
kind: ScoringConfig
metadata:
  id: test-scoring
  name: Test Scoring
spec:
  weights:
    view_plan: 3
    schedule_tour: 10
"#;

fn temp_loader() -> (TempDir, RuleLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleLoader::new(dir.path().to_path_buf());
    (dir, loader)
}

#[test]
fn load_rule_set_from_file() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("test-set.yml");
    fs::write(&path, RULE_SET_YAML).unwrap();

    let doc = loader.load_file(&path).unwrap();
    assert_eq!(doc.metadata().id, "test-set");
    assert_eq!(doc.kind(), RuleKind::AutomationRuleSet);
    assert_eq!(doc.as_rule_set().unwrap().spec.rules.len(), 1);
    // load_file does not register
    assert!(loader.is_empty());
}

#[test]
fn load_all_skips_dotfiles_and_non_yaml() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("set.yml"), RULE_SET_YAML).unwrap();
    fs::write(dir.path().join(".hidden.yml"), RULE_SET_YAML).unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();

    let results = loader.load_all().unwrap();
    let loaded = results.iter().filter(|r| r.is_loaded()).count();
    let skipped = results
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();

    assert_eq!(loaded, 1);
    assert_eq!(skipped, 2);
    assert!(loader.document("test-set").is_some());
}

#[test]
fn load_all_recursive_multi_kind() {
    let (dir, loader) = temp_loader();
    fs::create_dir_all(dir.path().join("automation")).unwrap();
    fs::create_dir_all(dir.path().join("scoring")).unwrap();
    fs::write(dir.path().join("automation/set.yml"), RULE_SET_YAML).unwrap();
    fs::write(dir.path().join("scoring/scoring.yaml"), SCORING_YAML).unwrap();

    let results = loader.load_all().unwrap();
    assert!(results.iter().all(|r| r.is_loaded()));
    assert_eq!(loader.len(), 2);

    let set = loader.rule_set("test-set").unwrap();
    assert_eq!(set.len(), 1);

    let scoring = loader.scoring_config("test-scoring").unwrap();
    assert_eq!(scoring.weights["schedule_tour"], 10.0);
}

#[test]
fn lookup_by_wrong_kind_is_not_found() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("scoring.yml"), SCORING_YAML).unwrap();
    loader.load_all().unwrap();

    let err = loader.rule_set("test-scoring").unwrap_err();
    assert!(matches!(err, RuleError::NotFound { kind: "rule set", .. }));
    assert_eq!(err.to_string(), "rule set 'test-scoring' not found");
    assert!(loader.scoring_config("missing").is_err());
}

#[test]
fn invalid_yaml_produces_error_not_panic() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("bad.yml");
    fs::write(&path, "this is: [not: valid: yaml").unwrap();
    assert!(matches!(loader.load_file(&path), Err(RuleError::Parse(_))));
}

#[test]
fn validation_errors_reject_the_document() {
    let (dir, loader) = temp_loader();
    let bad = RULE_SET_YAML.replace("min: 2", "min: 2, within: { duration: fortnight }");
    fs::write(dir.path().join("bad.yml"), bad).unwrap();
    fs::write(dir.path().join("scoring.yml"), SCORING_YAML).unwrap();

    let results = loader.load_all().unwrap();
    let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
    assert_eq!(failed.len(), 1);
    match &failed[0].status {
        LoadStatus::Failed { error } => assert!(error.contains("fortnight"), "{error}"),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(loader.len(), 1);
}

#[test]
fn duplicate_document_ids_across_files_fail() {
    let (dir, loader) = temp_loader();
    fs::write(dir.path().join("a.yml"), RULE_SET_YAML).unwrap();
    fs::write(dir.path().join("b.yml"), RULE_SET_YAML).unwrap();

    let results = loader.load_all().unwrap();
    // sorted order: a.yml loads, b.yml collides
    assert!(results[0].is_loaded());
    assert!(results[1].is_failed());
    assert_eq!(loader.len(), 1);
}

#[test]
fn load_all_replaces_previous_contents() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("set.yml");
    fs::write(&path, RULE_SET_YAML).unwrap();
    loader.load_all().unwrap();
    assert_eq!(loader.len(), 1);

    fs::remove_file(&path).unwrap();
    loader.load_all().unwrap();
    assert!(loader.is_empty());
}

#[test]
fn hot_reload_upserts_and_keeps_previous_on_error() {
    let (_dir, loader) = temp_loader();
    let path = loader.rules_dir().join("set.yml");
    fs::write(&path, RULE_SET_YAML).unwrap();
    loader.load_all().unwrap();

    let registry = loader.registry();
    let edited = RULE_SET_YAML.replace("min: 2", "min: 5");
    fs::write(&path, edited).unwrap();
    reload_path(&registry, &path);
    let doc = loader.document("test-set").unwrap();
    let rules = &doc.as_rule_set().unwrap().spec.rules;
    assert!(matches!(
        &rules[0].when,
        crate::schema::Condition::Count { count } if count.min == 5
    ));

    fs::write(&path, "kind: [broken").unwrap();
    reload_path(&registry, &path);
    assert!(loader.document("test-set").is_some());

    fs::remove_file(&path).unwrap();
    remove_by_path(&registry, &path);
    assert!(loader.is_empty());
}

#[test]
fn registry_follows_id_changes_within_a_file() {
    let doc = |id: &str| {
        crate::schema::parse_document(&RULE_SET_YAML.replace("test-set", id)).unwrap()
    };
    let mut registry = Registry::default();
    let path = std::path::Path::new("/rules/set.yml");

    registry.upsert(path, doc("test-set")).unwrap();
    registry.upsert(path, doc("renamed-set")).unwrap();
    assert_eq!(registry.documents.keys().collect::<Vec<_>>(), vec!["renamed-set"]);

    let other = std::path::Path::new("/rules/other.yml");
    let err = registry.upsert(other, doc("renamed-set")).unwrap_err();
    assert!(err.contains("duplicate document id 'renamed-set'"));

    assert_eq!(registry.remove_path(path).as_deref(), Some("renamed-set"));
    assert!(registry.documents.is_empty());
}

#[test]
fn watch_starts_on_existing_directory() {
    let (_dir, mut loader) = temp_loader();
    loader.watch().unwrap();
    assert!(loader.is_watching());
}

#[test]
fn new_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b/rules");
    let loader = RuleLoader::new(nested.clone());
    assert!(nested.exists());
    assert!(loader.load_all().unwrap().is_empty());
}
