//! End-to-end scenarios for the analysis pipeline.

use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;

use bha::config::AnalysisOptions;
use bha::models::trace::{
    BuildTrace, CompilationMetrics, CompilationUnit, IncludeRecord, TemplateRecord,
};
use bha::run_full_analysis;

fn unit(name: &str, ms: u64) -> CompilationUnit {
    CompilationUnit {
        source_file: PathBuf::from(name),
        metrics: CompilationMetrics {
            total_time: Duration::from_millis(ms),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn include(unit: &mut CompilationUnit, header: &str, ms: u64, depth: usize) {
    unit.includes.push(IncludeRecord {
        header: PathBuf::from(header),
        parse_time: Duration::from_millis(ms),
        depth,
    });
}

#[test]
fn empty_trace_produces_all_zero_result() {
    let trace = BuildTrace::new(Vec::new(), Duration::ZERO);
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    assert_eq!(result.performance.total_files, 0);
    assert_eq!(result.performance.sequential_time, Duration::ZERO);
    assert_eq!(result.performance.parallel_time, Duration::ZERO);
    assert!(result.performance.critical_path.is_empty());
    assert!(result.files.is_empty());
    assert_eq!(result.dependencies.total_includes, 0);
    assert_eq!(result.templates.total_instantiations, 0);
    assert!(result.bottlenecks.is_empty());
}

#[test]
fn single_unit_has_unit_efficiency_and_full_share() {
    let trace = BuildTrace::new(vec![unit("main.cpp", 1000)], Duration::from_millis(1000));
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    assert_eq!(result.performance.parallelism_efficiency, 1.0);
    assert_eq!(
        result.performance.median_file_time,
        Duration::from_millis(1000)
    );
    assert_eq!(result.performance.p90_file_time, Duration::from_millis(1000));
    assert_eq!(result.performance.p99_file_time, Duration::from_millis(1000));
    assert_eq!(result.files[0].time_percent, 100.0);
    assert_eq!(result.files[0].rank, 1);
}

#[test]
fn parallel_build_doubles_efficiency() {
    let trace = BuildTrace::new(
        vec![
            unit("a.cpp", 20_000),
            unit("b.cpp", 20_000),
            unit("c.cpp", 20_000),
        ],
        Duration::from_secs(30),
    );
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    assert_eq!(result.performance.sequential_time, Duration::from_secs(60));
    assert_eq!(result.performance.parallel_time, Duration::from_secs(30));
    assert_eq!(result.performance.parallelism_efficiency, 2.0);
}

#[test]
fn total_files_always_matches_unit_count() {
    for n in [0usize, 1, 7, 40] {
        let units: Vec<CompilationUnit> =
            (0..n).map(|i| unit(&format!("u{i}.cpp"), 10 + i as u64)).collect();
        let trace = BuildTrace::from_units(units);
        let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();
        assert_eq!(result.performance.total_files, n);
        assert_eq!(result.files.len(), n);
    }
}

#[test]
fn sequential_time_is_the_sum_of_unit_times() {
    let trace = BuildTrace::new(
        vec![unit("a.cpp", 123), unit("b.cpp", 456), unit("c.cpp", 789)],
        Duration::from_millis(800),
    );
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();
    assert_eq!(
        result.performance.sequential_time,
        Duration::from_millis(123 + 456 + 789)
    );
    // Efficiency is exactly sequential / parallel.
    assert_eq!(
        result.performance.parallelism_efficiency,
        result.performance.sequential_time.as_nanos() as f64
            / result.performance.parallel_time.as_nanos() as f64
    );
}

#[test]
fn ranks_are_dense_and_descending() {
    let trace = BuildTrace::from_units(vec![
        unit("a.cpp", 300),
        unit("b.cpp", 100),
        unit("c.cpp", 300),
        unit("d.cpp", 200),
    ]);
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    let ranks: Vec<usize> = result.files.iter().map(|f| f.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
    for pair in result.files.windows(2) {
        assert!(pair[0].compile_time >= pair[1].compile_time);
    }
    // Equal times keep insertion order: a.cpp before c.cpp.
    assert_eq!(result.files[0].file, PathBuf::from("a.cpp"));
    assert_eq!(result.files[1].file, PathBuf::from("c.cpp"));
}

#[test]
fn include_graph_drives_critical_path_and_headers() {
    let mut a = unit("a.cpp", 900);
    include(&mut a, "core.h", 350, 0);
    include(&mut a, "util.h", 40, 1);
    let mut b = unit("b.cpp", 250);
    include(&mut b, "core.h", 300, 0);

    let trace = BuildTrace::new(vec![a, b], Duration::from_millis(1200));
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    // core.h must be parsed before a.cpp; that chain dominates.
    assert_eq!(
        result.performance.critical_path,
        vec![PathBuf::from("core.h"), PathBuf::from("a.cpp")]
    );

    assert_eq!(result.dependencies.total_includes, 3);
    assert_eq!(result.dependencies.unique_headers, 2);
    assert_eq!(result.dependencies.max_include_depth, 1);
    let core = result
        .dependencies
        .headers
        .iter()
        .find(|h| h.path == PathBuf::from("core.h"))
        .unwrap();
    assert_eq!(core.total_parse_time, Duration::from_millis(650));
    assert_eq!(core.including_files, 2);
    assert_eq!(core.impact_score, 1.0);

    // The critical-path unit scores highest; the hub header carries its
    // fan-out into the score.
    assert_eq!(result.bottlenecks[0].file, PathBuf::from("a.cpp"));
    assert!(result.bottlenecks[0].on_critical_path);
    let hub = result
        .bottlenecks
        .iter()
        .find(|b| b.file == PathBuf::from("core.h"))
        .unwrap();
    assert_eq!(hub.dependent_count, 2);
    assert!(hub.on_critical_path);
}

#[test]
fn cyclic_trace_still_analyses_with_fallback_path() {
    let mut a = unit("a.h", 500);
    include(&mut a, "b.h", 20, 0);
    let mut b = unit("b.h", 300);
    include(&mut b, "a.h", 20, 0);

    let trace = BuildTrace::new(vec![a, b], Duration::from_millis(800));
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    // Cycle detected in the inclusion graph, analysis still completes.
    assert!(!result.dependencies.cycles.is_empty());
    assert_eq!(result.performance.critical_path, vec![PathBuf::from("a.h")]);
}

#[test]
fn template_aggregation_rolls_up_across_units() {
    let mut a = unit("a.cpp", 400);
    a.templates.push(TemplateRecord {
        signature: "std::vector<int>".into(),
        instantiation_count: 10,
        total_time: Duration::from_millis(100),
    });
    let mut b = unit("b.cpp", 400);
    b.templates.push(TemplateRecord {
        signature: "std::vector<int>".into(),
        instantiation_count: 5,
        total_time: Duration::from_millis(60),
    });
    b.templates.push(TemplateRecord {
        signature: "fmt::format<int>".into(),
        instantiation_count: 2,
        total_time: Duration::from_millis(200),
    });

    let trace = BuildTrace::new(vec![a, b], Duration::from_millis(800));
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    assert_eq!(result.templates.total_instantiations, 17);
    assert_eq!(
        result.templates.total_template_time,
        Duration::from_millis(360)
    );
    assert_eq!(result.templates.templates[0].full_signature, "fmt::format<int>");
    assert_eq!(result.templates.templates[0].name, "fmt::format");
    assert_eq!(result.templates.templates[1].instantiation_count, 15);
    assert_eq!(result.templates.template_time_percent, 45.0);
}

#[test]
fn time_percent_sum_stays_within_rounding_of_hundred() {
    let units: Vec<CompilationUnit> = (0..17)
        .map(|i| unit(&format!("u{i}.cpp"), 37 * (i as u64 + 1)))
        .collect();
    let trace = BuildTrace::from_units(units);
    let result = run_full_analysis(&trace, &AnalysisOptions::default()).unwrap();

    let sum: f64 = result.files.iter().map(|f| f.time_percent).sum();
    assert!(sum <= 100.0 + 1e-6, "sum was {sum}");
}

#[test]
fn analysis_is_deterministic() {
    let build = || {
        let mut a = unit("a.cpp", 500);
        include(&mut a, "x.h", 100, 0);
        include(&mut a, "y.h", 100, 0);
        let mut b = unit("b.cpp", 500);
        include(&mut b, "y.h", 100, 0);
        include(&mut b, "x.h", 100, 0);
        BuildTrace::new(vec![a, b], Duration::from_millis(1000))
    };

    let first = run_full_analysis(&build(), &AnalysisOptions::default()).unwrap();
    let second = run_full_analysis(&build(), &AnalysisOptions::default()).unwrap();
    assert_eq!(first, second);
}
