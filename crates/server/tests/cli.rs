//! Runs the `exam-registry` binary against a temporary database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::process::{Command, Output};

use exam_registry_storage::StorageEngine;
use exam_registry_test_utils::TestDir;
use exam_registry_types::config::{StorageConfig, ADVANCED_SECTION, PRIMARY_SECTION};

fn run(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_exam-registry"))
        .arg("--data")
        .arg(db)
        .args(["--log-format", "json"])
        .args(args)
        .env_remove("EXAM_REGISTRY_CONFIG")
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn exam-registry")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn test_allocations_persist_across_invocations() {
    let dir = TestDir::new();
    let db = dir.db_path();

    let first = run(&db, &["allocate", "--section", ADVANCED_SECTION]);
    assert!(first.status.success(), "{first:?}");
    assert_eq!(stdout(&first), "A250001\n");

    let second = run(&db, &["allocate", "--section", ADVANCED_SECTION]);
    assert_eq!(stdout(&second), "A250002\n");
}

#[test]
fn test_unknown_section_fails_with_hint() {
    let dir = TestDir::new();
    let output = run(&dir.db_path(), &["allocate", "--section", "kindergarten"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("[3000]"), "{stderr}");
    assert!(stderr.contains("hint:"), "{stderr}");
}

#[test]
fn test_import_init_enroll() {
    let dir = TestDir::new();
    let db = dir.db_path();
    let file = dir.join("legacy.json");
    std::fs::write(
        &file,
        format!(
            r#"[
  {{"registrationNumber": "I250001", "section": "{PRIMARY_SECTION}", "name": "A", "place": "P", "institutionId": 1}},
  {{"registrationNumber": "I250005", "section": "{PRIMARY_SECTION}", "name": "B", "place": "P", "institutionId": 1}},
  {{"registrationNumber": "old-17", "section": "{PRIMARY_SECTION}", "name": "C", "place": "P", "institutionId": 1}}
]"#
        ),
    )
    .unwrap();

    let imported = run(&db, &["import", file.to_str().unwrap()]);
    assert!(imported.status.success(), "{imported:?}");

    let init = run(&db, &["init"]);
    assert!(init.status.success(), "{init:?}");
    assert!(stdout(&init).contains("I250006"));

    let enrolled = run(
        &db,
        &[
            "enroll",
            "--section",
            PRIMARY_SECTION,
            "--name",
            "Fathima",
            "--place",
            "Tirur",
            "--institution",
            "9",
        ],
    );
    assert!(enrolled.status.success(), "{enrolled:?}");
    assert!(stdout(&enrolled).starts_with("I250006\tFathima"));

    let status = run(&db, &["status"]);
    assert!(stdout(&status).contains("I250007"));
}

#[test]
fn test_config_example_needs_no_database() {
    let dir = TestDir::new();
    let db = dir.db_path();
    let output = run(&db, &["config", "example"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("[[sequence.sections]]"));
    assert!(!db.exists());
}

#[test]
fn test_concurrent_invocation_fails_fast_and_succeeds_on_retry() {
    let dir = TestDir::new();
    let db = dir.db_path();
    let held =
        StorageEngine::open(&StorageConfig::builder().path(db.clone()).build().unwrap()).unwrap();

    let blocked = run(&db, &["allocate", "--section", ADVANCED_SECTION]);
    assert!(!blocked.status.success());
    let stderr = String::from_utf8(blocked.stderr).unwrap();
    assert!(stderr.contains("[1000]"), "{stderr}");
    assert!(stderr.contains("hint:"), "{stderr}");

    drop(held);
    let retried = run(&db, &["allocate", "--section", ADVANCED_SECTION]);
    assert!(retried.status.success(), "{retried:?}");
    assert_eq!(stdout(&retried), "A250001\n");
}
