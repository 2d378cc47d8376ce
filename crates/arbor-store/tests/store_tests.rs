//! Loader and cache behavior against a real specification directory

use arbor_store::{LoadError, SpecStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const AUTH: &str = r"
id: auth
name: Authentication
version: '1.2.0'
metadata:
  dependencies: [database]
children:
  - id: login
    name: Login
  - id: tokens
    name: Tokens
    children:
      - id: signer
        name: Signer
";

fn spec_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[tokio::test]
async fn load_resolves_name_and_stamps_source() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path());

    let spec = store.load("auth").await.unwrap();
    assert_eq!(spec.id, "auth");
    assert_eq!(spec.version, "1.2.0");
    assert_eq!(spec.source.file, dir.path().join("auth.yaml"));
    assert_eq!(spec.component_count(), 4);

    let same = store.load("auth.yaml").await.unwrap();
    assert!(Arc::ptr_eq(&spec, &same));
}

#[tokio::test]
async fn same_stem_in_subdirectory_is_a_different_spec() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    std::fs::create_dir(dir.path().join("legacy")).unwrap();
    std::fs::write(
        dir.path().join("legacy/auth.yaml"),
        "id: legacy_auth\nname: Legacy Auth\nversion: '0.9'\n",
    )
    .unwrap();
    let store = SpecStore::new(dir.path());

    let current = store.load("auth").await.unwrap();
    let legacy = store.load("legacy/auth.yaml").await.unwrap();
    assert_eq!(current.id, "auth");
    assert_eq!(legacy.id, "legacy_auth");
    assert_eq!(legacy.source.file, dir.path().join("legacy/auth.yaml"));
    assert!(Arc::ptr_eq(&legacy, &store.load("legacy/auth").await.unwrap()));
}

#[tokio::test]
async fn oversized_file_is_rejected_before_reading() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path()).with_max_file_size(16);

    let err = store.load("auth").await.unwrap_err();
    let LoadError::TooLarge { size, max, .. } = err else {
        panic!("unexpected error {err}");
    };
    assert_eq!(size, AUTH.len());
    assert_eq!(max, 16);
    assert!(!store.is_cached("auth").await);
}

#[tokio::test]
async fn reload_of_unmodified_file_is_identical() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path());

    let first = store.load_fresh("auth").await.unwrap();
    let second = store.load_fresh("auth").await.unwrap();
    assert_eq!(first.checksum(), second.checksum());
    assert_eq!(first.root, second.root);
}

#[tokio::test]
async fn missing_version_does_not_populate_cache() {
    let dir = spec_dir(&[("broken.yaml", "id: broken\nname: Broken\n")]);
    let store = SpecStore::new(dir.path());

    let err = store.load("broken").await.unwrap_err();
    assert_eq!(err.missing_fields(), Some(&["version".to_string()][..]));
    assert!(!store.is_cached("broken").await);
    assert_eq!(store.cache_stats().entry_count, 0);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = spec_dir(&[]);
    let store = SpecStore::new(dir.path());
    assert!(matches!(
        store.load("ghost").await,
        Err(LoadError::NotFound { name, .. }) if name == "ghost"
    ));
}

#[tokio::test]
async fn cache_serves_stored_value_until_ttl_expires() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path()).with_cache(16, Duration::from_millis(150));

    let original = store.load("auth").await.unwrap();
    std::fs::write(
        dir.path().join("auth.yaml"),
        AUTH.replace("1.2.0", "1.3.0"),
    )
    .unwrap();

    let within_ttl = store.load("auth").await.unwrap();
    assert!(Arc::ptr_eq(&original, &within_ttl));
    assert_eq!(within_ttl.version, "1.2.0");

    tokio::time::sleep(Duration::from_millis(300)).await;
    let after_ttl = store.load("auth").await.unwrap();
    assert_eq!(after_ttl.version, "1.3.0");
    assert_ne!(original.checksum(), after_ttl.checksum());
}

#[tokio::test]
async fn invalidate_forces_fresh_load() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path());

    let first = store.load("auth").await.unwrap();
    store.invalidate("auth").await;
    let second = store.load("auth").await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.checksum(), second.checksum());
}

#[tokio::test]
async fn load_all_reports_failures_per_name() {
    let dir = spec_dir(&[("auth.yaml", AUTH), ("bad.yaml", "id: [oops\n")]);
    let store = SpecStore::new(dir.path());

    let results = store.load_all().await.unwrap();
    let names: Vec<_> = results.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["auth", "bad"]);
    assert!(results[0].1.is_ok());
    assert!(matches!(results[1].1, Err(LoadError::Syntax { .. })));
}

#[tokio::test]
async fn validate_reports_findings_for_loaded_spec() {
    let dir = spec_dir(&[(
        "svc.yaml",
        "id: svc\nname: Svc\nversion: '1'\ncode_ref: src/missing.rs:1-4\n",
    )]);
    let store = SpecStore::new(dir.path());

    let report = store.validate("svc").await.unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.spec_id, "svc");
}

#[tokio::test]
async fn checksum_tracks_file_content() {
    let dir = spec_dir(&[("auth.yaml", AUTH)]);
    let store = SpecStore::new(dir.path());

    let loaded = store.load("auth").await.unwrap();
    assert_eq!(store.checksum("auth").await.unwrap(), loaded.checksum());
}
