//! Per-build performance analysis: file rankings, percentiles, parallelism
//! figures and the critical path through the include graph.

use std::time::Duration;
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::models::analysis::{FileAnalysisResult, PerformanceAnalysis};
use crate::models::graph::{DirectedGraph, EdgeWeight};
use crate::models::trace::BuildTrace;
use crate::services::graph::find_critical_path;
use crate::utils::paths::file_id;

/// The performance analyser's share of the fused result, plus the graph it
/// built so downstream bottleneck scoring can reuse it.
#[derive(Debug, Clone, Default)]
pub struct PerformanceOutput {
    pub performance: PerformanceAnalysis,
    pub files: Vec<FileAnalysisResult>,
    pub graph: DirectedGraph,
    pub critical_path_nodes: Vec<String>,
}

/// Nearest-rank percentile over a sorted copy of the input: index
/// `⌊(n-1) * p / 100⌋`. Always returns an element of the multiset, or zero
/// for an empty input.
pub fn calculate_percentile(times: &[Duration], percentile: f64) -> Duration {
    if times.is_empty() {
        return Duration::ZERO;
    }
    let mut sorted = times.to_vec();
    sorted.sort();
    let index = ((sorted.len() - 1) as f64 * percentile / 100.0) as usize;
    sorted[index]
}

/// Builds the unit dependency graph from a trace.
///
/// Sources and headers are nodes weighted by compile/parse time; each edge
/// `header -> unit` models "the header must be parsed before the unit".
/// Units are added first, so a file that is both a unit and a header keeps
/// its compile time.
pub fn build_unit_graph(trace: &BuildTrace) -> DirectedGraph {
    let mut graph = DirectedGraph::new();

    for unit in &trace.units {
        let source = file_id(&unit.source_file);
        graph.add_node(&source, unit.metrics.total_time);
    }

    for unit in &trace.units {
        let source = file_id(&unit.source_file);
        for include in &unit.includes {
            let header = file_id(&include.header);
            if !graph.has_node(&header) {
                graph.add_node(&header, include.parse_time);
            }
            graph.add_edge(
                &header,
                &source,
                EdgeWeight {
                    time: include.parse_time,
                    count: 1,
                },
            );
        }
    }

    graph
}

/// Runs the performance analysis over a trace and a pre-built unit graph.
pub fn analyze(
    trace: &BuildTrace,
    graph: &DirectedGraph,
    options: &AnalysisOptions,
) -> PerformanceOutput {
    let mut out = PerformanceOutput::default();

    if trace.units.is_empty() {
        return out;
    }

    out.performance.total_build_time = trace.total_time;
    out.performance.total_files = trace.units.len();

    let mut compile_times = Vec::with_capacity(trace.units.len());
    let mut sequential_total = Duration::ZERO;

    for unit in &trace.units {
        let compile_time = unit.metrics.total_time;
        compile_times.push(compile_time);
        sequential_total += compile_time;

        out.files.push(FileAnalysisResult {
            file: unit.source_file.clone(),
            compile_time,
            frontend_time: unit.metrics.frontend_time,
            backend_time: unit.metrics.backend_time,
            breakdown: unit.metrics.breakdown,
            time_percent: 0.0,
            rank: 0,
            include_count: unit.includes.len(),
            template_count: unit.templates.len(),
            memory: unit.memory,
        });
    }

    out.performance.sequential_time = sequential_total;
    out.performance.parallel_time = trace.total_time;

    match find_critical_path(graph) {
        Ok(cp) => {
            for node in cp.critical_path.nodes {
                out.performance.critical_path.push(node.clone().into());
                out.critical_path_nodes.push(node);
            }
        }
        Err(err) => {
            // Cyclic include graph: degrade to the single most expensive
            // file so the path is still populated.
            debug!("critical path unavailable: {err}");
            if let Some(max) = out
                .files
                .iter()
                .max_by_key(|f| f.compile_time)
            {
                out.performance.critical_path.push(max.file.clone());
                out.critical_path_nodes.push(file_id(&max.file));
            }
        }
    }

    // Speedup factor: N means the build averaged N-way parallelism; exactly
    // 1.0 means it ran sequentially.
    if trace.total_time > Duration::ZERO {
        out.performance.parallelism_efficiency =
            sequential_total.as_nanos() as f64 / trace.total_time.as_nanos() as f64;
    } else {
        out.performance.parallelism_efficiency = 1.0;
    }

    out.performance.avg_file_time = sequential_total / compile_times.len() as u32;
    out.performance.median_file_time = calculate_percentile(&compile_times, 50.0);
    out.performance.p90_file_time = calculate_percentile(&compile_times, 90.0);
    out.performance.p99_file_time = calculate_percentile(&compile_times, 99.0);

    aggregate_memory(&mut out);

    // Descending by compile time; the stable sort preserves unit order for
    // ties, and ranks stay dense.
    out.files.sort_by(|a, b| b.compile_time.cmp(&a.compile_time));

    let slow_threshold = options.min_duration_threshold;
    for file in &out.files {
        if file.compile_time >= slow_threshold {
            out.performance.slowest_file_count += 1;
            if out.performance.slowest_files.len() < options.slowest_display_cap {
                out.performance.slowest_files.push(file.clone());
            }
        }
    }

    if trace.total_time > Duration::ZERO {
        let total = trace.total_time.as_nanos() as f64;
        for file in &mut out.files {
            file.time_percent = 100.0 * file.compile_time.as_nanos() as f64 / total;
        }
        for file in &mut out.performance.slowest_files {
            file.time_percent = 100.0 * file.compile_time.as_nanos() as f64 / total;
        }
    }

    for (i, file) in out.files.iter_mut().enumerate() {
        file.rank = i + 1;
    }
    for (i, file) in out.performance.slowest_files.iter_mut().enumerate() {
        file.rank = i + 1;
    }

    out
}

fn aggregate_memory(out: &mut PerformanceOutput) {
    let mut files_with_memory = 0u64;

    for file in &out.files {
        if file.memory.has_data() {
            let total = &mut out.performance.total_memory;
            total.peak_memory_bytes += file.memory.peak_memory_bytes;
            total.frontend_peak_bytes += file.memory.frontend_peak_bytes;
            total.backend_peak_bytes += file.memory.backend_peak_bytes;
            total.max_stack_bytes += file.memory.max_stack_bytes;

            if file.memory.peak_memory_bytes > out.performance.peak_memory.peak_memory_bytes {
                out.performance.peak_memory = file.memory;
            }

            files_with_memory += 1;
        }
    }

    if files_with_memory > 0 {
        let total = out.performance.total_memory;
        out.performance.average_memory.peak_memory_bytes =
            total.peak_memory_bytes / files_with_memory;
        out.performance.average_memory.frontend_peak_bytes =
            total.frontend_peak_bytes / files_with_memory;
        out.performance.average_memory.backend_peak_bytes =
            total.backend_peak_bytes / files_with_memory;
        out.performance.average_memory.max_stack_bytes = total.max_stack_bytes / files_with_memory;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trace::{
        CompilationMetrics, CompilationUnit, IncludeRecord, MemoryMetrics,
    };
    use std::path::PathBuf;

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

    fn analyze_trace(trace: &BuildTrace) -> PerformanceOutput {
        let graph = build_unit_graph(trace);
        analyze(trace, &graph, &AnalysisOptions::default())
    }

    #[test]
    fn empty_trace_yields_zeroed_result() {
        let trace = BuildTrace::new(Vec::new(), Duration::ZERO);
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.total_files, 0);
        assert_eq!(out.performance.sequential_time, Duration::ZERO);
        assert!(out.performance.critical_path.is_empty());
        assert!(out.files.is_empty());
    }

    #[test]
    fn single_unit_scenario() {
        let trace = BuildTrace::new(vec![unit("main.cpp", 1000)], Duration::from_millis(1000));
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.parallelism_efficiency, 1.0);
        assert_eq!(out.performance.median_file_time, Duration::from_millis(1000));
        assert_eq!(out.performance.p90_file_time, Duration::from_millis(1000));
        assert_eq!(out.performance.p99_file_time, Duration::from_millis(1000));
        assert_eq!(out.files[0].time_percent, 100.0);
        assert_eq!(out.files[0].rank, 1);
    }

    #[test]
    fn parallel_build_scenario() {
        let trace = BuildTrace::new(
            vec![unit("a.cpp", 20_000), unit("b.cpp", 20_000), unit("c.cpp", 20_000)],
            Duration::from_secs(30),
        );
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.sequential_time, Duration::from_secs(60));
        assert_eq!(out.performance.parallel_time, Duration::from_secs(30));
        assert_eq!(out.performance.parallelism_efficiency, 2.0);
    }

    #[test]
    fn percentile_scenario() {
        let times: Vec<Duration> = [100u64, 200, 300, 400, 500]
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect();

        assert_eq!(calculate_percentile(&times, 50.0), Duration::from_millis(300));
        assert!(calculate_percentile(&times, 90.0) >= Duration::from_millis(400));
        assert!(calculate_percentile(&times, 99.0) >= Duration::from_millis(400));
        assert_eq!(calculate_percentile(&[], 50.0), Duration::ZERO);
    }

    #[test]
    fn percentile_is_stable_under_duplicates() {
        let times = vec![Duration::from_millis(100); 7];
        assert_eq!(calculate_percentile(&times, 50.0), Duration::from_millis(100));
        assert_eq!(calculate_percentile(&times, 99.0), Duration::from_millis(100));
    }

    #[test]
    fn ranks_are_dense_with_insertion_order_ties() {
        let trace = BuildTrace::new(
            vec![unit("a.cpp", 100), unit("b.cpp", 300), unit("c.cpp", 100)],
            Duration::from_millis(500),
        );
        let out = analyze_trace(&trace);

        let ranked: Vec<(&str, usize)> = out
            .files
            .iter()
            .map(|f| (f.file.to_str().unwrap(), f.rank))
            .collect();
        // b first; a and c tie on time and keep their unit order.
        assert_eq!(ranked, vec![("b.cpp", 1), ("a.cpp", 2), ("c.cpp", 3)]);
    }

    #[test]
    fn time_percent_sums_to_at_most_hundred() {
        let trace = BuildTrace::new(
            vec![unit("a.cpp", 100), unit("b.cpp", 200), unit("c.cpp", 300)],
            Duration::from_millis(600),
        );
        let out = analyze_trace(&trace);
        let sum: f64 = out.files.iter().map(|f| f.time_percent).sum();
        assert!(sum <= 100.0 + 1e-9);
    }

    #[test]
    fn critical_path_spans_header_chains() {
        let mut main_unit = unit("main.cpp", 500);
        main_unit.includes.push(IncludeRecord {
            header: PathBuf::from("big.h"),
            parse_time: Duration::from_millis(400),
            depth: 0,
        });
        let trace = BuildTrace::new(
            vec![main_unit, unit("tiny.cpp", 10)],
            Duration::from_millis(510),
        );
        let out = analyze_trace(&trace);

        assert_eq!(
            out.critical_path_nodes,
            vec!["big.h".to_string(), "main.cpp".to_string()]
        );
    }

    #[test]
    fn cyclic_includes_fall_back_to_slowest_file() {
        // a.cpp includes b.cpp and vice versa; both are units, so the graph
        // has a cycle between them.
        let mut a = unit("a.cpp", 300);
        a.includes.push(IncludeRecord {
            header: PathBuf::from("b.cpp"),
            parse_time: Duration::from_millis(10),
            depth: 0,
        });
        let mut b = unit("b.cpp", 200);
        b.includes.push(IncludeRecord {
            header: PathBuf::from("a.cpp"),
            parse_time: Duration::from_millis(10),
            depth: 0,
        });

        let trace = BuildTrace::new(vec![a, b], Duration::from_millis(500));
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.critical_path, vec![PathBuf::from("a.cpp")]);
    }

    #[test]
    fn slowest_files_count_is_unbounded_but_list_is_capped() {
        let units: Vec<CompilationUnit> =
            (0..30).map(|i| unit(&format!("u{i}.cpp"), 100)).collect();
        let trace = BuildTrace::new(units, Duration::from_secs(3));
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.slowest_file_count, 30);
        assert_eq!(out.performance.slowest_files.len(), 20);
    }

    #[test]
    fn memory_aggregates_total_peak_average() {
        let mut a = unit("a.cpp", 100);
        a.memory = MemoryMetrics {
            peak_memory_bytes: 1000,
            frontend_peak_bytes: 600,
            backend_peak_bytes: 400,
            max_stack_bytes: 64,
        };
        let mut b = unit("b.cpp", 100);
        b.memory = MemoryMetrics {
            peak_memory_bytes: 3000,
            frontend_peak_bytes: 2000,
            backend_peak_bytes: 1000,
            max_stack_bytes: 128,
        };
        let trace = BuildTrace::new(vec![a, b, unit("c.cpp", 100)], Duration::from_millis(300));
        let out = analyze_trace(&trace);

        assert_eq!(out.performance.total_memory.peak_memory_bytes, 4000);
        assert_eq!(out.performance.peak_memory.peak_memory_bytes, 3000);
        assert_eq!(out.performance.average_memory.peak_memory_bytes, 2000);
        assert_eq!(out.performance.average_memory.max_stack_bytes, 96);
    }

    #[test]
    fn unit_compile_time_survives_being_included_elsewhere() {
        // a.cpp is also included by b.cpp; its node must keep the unit's
        // compile time rather than the include parse time.
        let a = unit("a.cpp", 300);
        let mut b = unit("b.cpp", 100);
        b.includes.push(IncludeRecord {
            header: PathBuf::from("a.cpp"),
            parse_time: Duration::from_millis(5),
            depth: 0,
        });

        let trace = BuildTrace::new(vec![a, b], Duration::from_millis(400));
        let graph = build_unit_graph(&trace);
        assert_eq!(graph.node_time("a.cpp"), Duration::from_millis(300));
    }
}
