//! Include dependency analysis: per-header cost aggregation, impact
//! scoring and include-cycle detection.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::config::AnalysisOptions;
use crate::models::analysis::{DependencyAnalysis, HeaderInfo};
use crate::models::graph::{DirectedGraph, EdgeWeight};
use crate::models::trace::BuildTrace;
use crate::services::graph::detect_cycles;
use crate::utils::duration::duration_to_ms;
use crate::utils::paths::file_id;

#[derive(Default)]
struct HeaderAccumulator {
    total_parse_time: Duration,
    inclusion_count: usize,
    including_files: FxHashSet<String>,
}

/// Aggregates every include observation in the trace.
///
/// Builds a `unit -> header` inclusion graph (distinct from the performance
/// analyser's parse-ordering graph) purely for cycle detection.
pub fn analyze(trace: &BuildTrace, options: &AnalysisOptions) -> DependencyAnalysis {
    let mut result = DependencyAnalysis::default();
    let mut accumulators: FxHashMap<String, HeaderAccumulator> = FxHashMap::default();
    // First-observation order, so normalisation output is deterministic.
    let mut header_order: Vec<String> = Vec::new();
    let mut inclusion_graph = DirectedGraph::new();

    for unit in &trace.units {
        let source = file_id(&unit.source_file);

        for include in &unit.includes {
            let header = file_id(&include.header);

            let entry = accumulators.entry(header.clone()).or_insert_with(|| {
                header_order.push(header.clone());
                HeaderAccumulator::default()
            });
            entry.total_parse_time += include.parse_time;
            entry.inclusion_count += 1;
            entry.including_files.insert(source.clone());

            result.total_includes += 1;
            result.total_include_time += include.parse_time;
            result.max_include_depth = result.max_include_depth.max(include.depth);

            inclusion_graph.add_edge(
                &source,
                &header,
                EdgeWeight {
                    time: include.parse_time,
                    count: 1,
                },
            );
        }
    }

    result.unique_headers = accumulators.len();

    for header in &header_order {
        let acc = &accumulators[header];
        let raw_score = duration_to_ms(acc.total_parse_time)
            * (1.0 + acc.including_files.len() as f64).ln();
        result.headers.push(HeaderInfo {
            path: PathBuf::from(header),
            total_parse_time: acc.total_parse_time,
            inclusion_count: acc.inclusion_count,
            including_files: acc.including_files.len(),
            impact_score: raw_score,
        });
    }

    // Normalise so the heaviest header scores 1.0; only the induced ranking
    // is meaningful.
    let max_score = result
        .headers
        .iter()
        .map(|h| h.impact_score)
        .fold(0.0f64, f64::max);
    if max_score > 0.0 {
        for header in &mut result.headers {
            header.impact_score /= max_score;
        }
    }

    result.headers.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });

    let detection = detect_cycles(&inclusion_graph, options.max_cycles);
    if detection.has_cycles {
        debug!(
            cycles = detection.cycles.len(),
            "include graph contains cycles"
        );
    }
    result.cycles = detection.cycles;

    result
}
