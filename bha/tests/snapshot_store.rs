//! Snapshot store integration tests: round-trips, overwrite protection,
//! listing order, the baseline pointer and version gating.

use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use bha::config::AnalysisOptions;
use bha::models::error::BhaError;
use bha::models::suggestion::{Priority, Suggestion, SuggestionType};
use bha::models::trace::{
    BuildTrace, CompilationMetrics, CompilationUnit, IncludeRecord, TemplateRecord,
};
use bha::{run_full_analysis, AnalysisResult, SnapshotStore};

fn store() -> (TempDir, SnapshotStore) {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("snapshots"));
    (dir, store)
}

fn sample_analysis() -> AnalysisResult {
    let mut a = CompilationUnit {
        source_file: PathBuf::from("src/a.cpp"),
        metrics: CompilationMetrics {
            total_time: Duration::from_millis(1500),
            frontend_time: Duration::from_millis(1000),
            backend_time: Duration::from_millis(500),
            ..Default::default()
        },
        ..Default::default()
    };
    a.includes.push(IncludeRecord {
        header: PathBuf::from("include/core.h"),
        parse_time: Duration::from_millis(400),
        depth: 0,
    });
    a.templates.push(TemplateRecord {
        signature: "std::map<int, int>".into(),
        instantiation_count: 7,
        total_time: Duration::from_millis(120),
    });

    let b = CompilationUnit {
        source_file: PathBuf::from("src/b.cpp"),
        metrics: CompilationMetrics {
            total_time: Duration::from_millis(700),
            ..Default::default()
        },
        ..Default::default()
    };

    let trace = BuildTrace::new(vec![a, b], Duration::from_millis(2200));
    run_full_analysis(&trace, &AnalysisOptions::default()).unwrap()
}

fn sample_suggestion() -> Suggestion {
    let mut s = Suggestion::new(SuggestionType::Pch, Priority::High, "Precompile core.h");
    s.confidence = 0.8;
    s.estimated_savings = Duration::from_millis(320);
    s.description = "core.h is parsed often".into();
    s.target_file.path = PathBuf::from("include/core.h");
    s
}

#[test]
fn save_then_load_round_trips_the_analysis() {
    let (_dir, store) = store();
    let analysis = sample_analysis();
    let suggestions = vec![sample_suggestion()];

    store
        .save("v1", &analysis, &suggestions, "first cut", &["ci".into()], false)
        .unwrap();

    let loaded = store.load("v1").unwrap();
    assert_eq!(loaded.metadata.name, "v1");
    assert_eq!(loaded.metadata.description, "first cut");
    assert_eq!(loaded.metadata.tags, vec!["ci".to_string()]);
    assert_eq!(loaded.metadata.file_count, 2);
    assert_eq!(
        loaded.metadata.total_build_time,
        analysis.performance.total_build_time
    );

    // Performance figures survive the ms round-trip exactly.
    assert_eq!(loaded.analysis.performance, {
        let mut p = analysis.performance.clone();
        // Display-only fields are not part of the format.
        p.slowest_files = Vec::new();
        p.slowest_file_count = 0;
        p.critical_path = Vec::new();
        p.total_memory = Default::default();
        p.peak_memory = Default::default();
        p.average_memory = Default::default();
        p
    });

    assert_eq!(loaded.analysis.files.len(), analysis.files.len());
    for (loaded_file, original) in loaded.analysis.files.iter().zip(&analysis.files) {
        assert_eq!(loaded_file.file, original.file);
        assert_eq!(loaded_file.compile_time, original.compile_time);
        assert_eq!(loaded_file.rank, original.rank);
        assert_eq!(loaded_file.time_percent, original.time_percent);
    }

    assert_eq!(
        loaded.analysis.dependencies.headers[0].path,
        PathBuf::from("include/core.h")
    );
    assert_eq!(
        loaded.analysis.templates.templates[0].full_signature,
        "std::map<int, int>"
    );

    assert_eq!(loaded.suggestions.len(), 1);
    assert_eq!(loaded.suggestions[0].suggestion_type, SuggestionType::Pch);
    assert_eq!(loaded.suggestions[0].priority, Priority::High);
    assert_eq!(
        loaded.suggestions[0].estimated_savings,
        Duration::from_millis(320)
    );
}

#[test]
fn save_refuses_to_overwrite_without_force() {
    let (_dir, store) = store();
    let analysis = sample_analysis();

    store.save("v1", &analysis, &[], "", &[], false).unwrap();
    let err = store.save("v1", &analysis, &[], "", &[], false).unwrap_err();
    assert!(matches!(err, BhaError::AlreadyExists(_)));

    // Explicit overwrite is an allowed operation.
    store.save("v1", &analysis, &[], "second", &[], true).unwrap();
    assert_eq!(store.load("v1").unwrap().metadata.description, "second");
}

#[test]
fn traversal_names_are_rejected() {
    let (_dir, store) = store();
    let analysis = sample_analysis();

    for name in ["", "../escape", "a/b", ".hidden", "x..y"] {
        assert!(
            matches!(
                store.save(name, &analysis, &[], "", &[], false).unwrap_err(),
                BhaError::InvalidName(_)
            ),
            "name {name:?} should be rejected"
        );
        assert!(matches!(
            store.load(name).unwrap_err(),
            BhaError::InvalidName(_)
        ));
    }
}

#[test]
fn loading_a_missing_snapshot_is_not_found() {
    let (_dir, store) = store();
    assert!(matches!(
        store.load("ghost").unwrap_err(),
        BhaError::NotFound(_)
    ));
    assert!(matches!(
        store.remove("ghost").unwrap_err(),
        BhaError::NotFound(_)
    ));
}

#[test]
fn unsupported_version_is_rejected() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.root()).unwrap();
    std::fs::write(
        store.snapshot_path("future"),
        r#"{"version": "3.0", "name": "future"}"#,
    )
    .unwrap();

    assert!(matches!(
        store.load("future").unwrap_err(),
        BhaError::UnsupportedVersion(v) if v == "3.0"
    ));
}

#[test]
fn unknown_fields_are_ignored_and_missing_fields_default() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.root()).unwrap();
    std::fs::write(
        store.snapshot_path("sparse"),
        r#"{"version": "2.1", "total_build_time_ms": 1500.0, "novel_field": {"x": 1}}"#,
    )
    .unwrap();

    let snapshot = store.load("sparse").unwrap();
    assert_eq!(snapshot.metadata.name, "sparse");
    assert_eq!(
        snapshot.metadata.total_build_time,
        Duration::from_millis(1500)
    );
    assert!(snapshot.analysis.files.is_empty());
    assert!(snapshot.suggestions.is_empty());
}

#[test]
fn malformed_json_is_a_parse_error() {
    let (_dir, store) = store();
    std::fs::create_dir_all(store.root()).unwrap();
    std::fs::write(store.snapshot_path("broken"), "{not json").unwrap();

    assert!(matches!(
        store.load("broken").unwrap_err(),
        BhaError::Parse(_)
    ));
}

#[test]
fn list_sorts_newest_first_and_skips_unreadable() {
    let (_dir, store) = store();
    let analysis = sample_analysis();

    store.save("first", &analysis, &[], "", &[], false).unwrap();
    store.save("second", &analysis, &[], "", &[], false).unwrap();
    std::fs::write(store.snapshot_path("junk"), "not json").unwrap();

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].created_at >= listed[1].created_at);
    assert!(listed.iter().all(|m| m.name != "junk"));
}

#[test]
fn listing_an_absent_root_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("never-created"));
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn baseline_pointer_lifecycle() {
    let (_dir, store) = store();
    let analysis = sample_analysis();

    assert_eq!(store.get_baseline(), None);
    assert!(matches!(
        store.set_baseline("ghost").unwrap_err(),
        BhaError::NotFound(_)
    ));

    store.save("stable", &analysis, &[], "", &[], false).unwrap();
    store.set_baseline("stable").unwrap();
    assert_eq!(store.get_baseline().as_deref(), Some("stable"));

    // Deleting the baseline snapshot clears the pointer.
    store.remove("stable").unwrap();
    assert_eq!(store.get_baseline(), None);

    store.save("stable", &analysis, &[], "", &[], false).unwrap();
    store.set_baseline("stable").unwrap();
    store.clear_baseline().unwrap();
    assert_eq!(store.get_baseline(), None);
}

#[test]
fn compare_through_the_store_detects_regression() {
    let (_dir, store) = store();

    let fast = sample_analysis();
    let slow = {
        let mut trace_units = vec![CompilationUnit {
            source_file: PathBuf::from("src/a.cpp"),
            metrics: CompilationMetrics {
                total_time: Duration::from_millis(4000),
                ..Default::default()
            },
            ..Default::default()
        }];
        trace_units.push(CompilationUnit {
            source_file: PathBuf::from("src/b.cpp"),
            metrics: CompilationMetrics {
                total_time: Duration::from_millis(700),
                ..Default::default()
            },
            ..Default::default()
        });
        let trace = BuildTrace::new(trace_units, Duration::from_millis(4700));
        run_full_analysis(&trace, &AnalysisOptions::default()).unwrap()
    };

    store.save("fast", &fast, &[], "", &[], false).unwrap();
    store.save("slow", &slow, &[], "", &[], false).unwrap();

    let comparison = store.compare("fast", "slow").unwrap();
    assert!(comparison.is_regression());
    assert!(comparison.is_significant());
    assert_eq!(comparison.regressions.len(), 1);
    assert_eq!(comparison.regressions[0].file, PathBuf::from("src/a.cpp"));

    let reverse = store.compare("slow", "fast").unwrap();
    assert!(reverse.is_improvement());
    assert_eq!(
        reverse.build_time_delta_ns,
        -comparison.build_time_delta_ns
    );

    let with_current = store.compare_with_analysis("fast", &slow).unwrap();
    assert_eq!(with_current.build_time_delta_ns, comparison.build_time_delta_ns);
}
