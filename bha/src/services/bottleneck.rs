//! Bottleneck scoring over the unit dependency graph.
//!
//! A bottleneck is a file that compiles slowly, has many dependents waiting
//! on it, or sits on the critical path. The score blends all three:
//! `ms(time) * (1 + ln(1 + dependents))`, scaled by 1.5 on the critical
//! path (the ClangBuildAnalyzer weighting).

use rustc_hash::FxHashSet;
use std::path::PathBuf;

use crate::models::analysis::Bottleneck;
use crate::models::graph::DirectedGraph;
use crate::utils::duration::duration_to_ms;

/// Scores every node with a positive score and returns the top
/// `max_results`, descending.
pub fn identify_bottlenecks(
    graph: &DirectedGraph,
    critical_path_nodes: &[String],
    max_results: usize,
) -> Vec<Bottleneck> {
    let cp_set: FxHashSet<&str> = critical_path_nodes.iter().map(String::as_str).collect();

    let mut bottlenecks: Vec<Bottleneck> = Vec::new();

    for node in graph.nodes() {
        let node_time = graph.node_time(node);
        let dependent_count = graph.out_degree(node);

        let time_ms = duration_to_ms(node_time);
        let dep_factor = 1.0 + (1.0 + dependent_count as f64).ln();
        let mut score = time_ms * dep_factor;

        let on_critical_path = cp_set.contains(node.as_str());
        if on_critical_path {
            score *= 1.5;
        }

        if score > 0.0 {
            bottlenecks.push(Bottleneck {
                file: PathBuf::from(node),
                compile_time: node_time,
                dependent_count,
                bottleneck_score: score,
                on_critical_path,
            });
        }
    }

    bottlenecks.sort_by(|a, b| {
        b.bottleneck_score
            .partial_cmp(&a.bottleneck_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.file.cmp(&b.file))
    });
    bottlenecks.truncate(max_results);
    bottlenecks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::graph::EdgeWeight;
    use std::time::Duration;

    fn graph_with_fanout() -> DirectedGraph {
        let mut g = DirectedGraph::new();
        g.add_node("hub.h", Duration::from_millis(100));
        g.add_node("solo.cpp", Duration::from_millis(100));
        for dependent in ["a.cpp", "b.cpp", "c.cpp"] {
            g.add_edge("hub.h", dependent, EdgeWeight::default());
        }
        g
    }

    #[test]
    fn fanout_outscores_equal_time_without_dependents() {
        let bottlenecks = identify_bottlenecks(&graph_with_fanout(), &[], 10);

        let hub = bottlenecks.iter().find(|b| b.file.ends_with("hub.h")).unwrap();
        let solo = bottlenecks.iter().find(|b| b.file.ends_with("solo.cpp")).unwrap();
        assert!(hub.bottleneck_score > solo.bottleneck_score);
        assert_eq!(hub.dependent_count, 3);
        assert_eq!(bottlenecks[0].file, PathBuf::from("hub.h"));
    }

    #[test]
    fn critical_path_membership_scales_score() {
        let off_cp = identify_bottlenecks(&graph_with_fanout(), &[], 10);
        let on_cp = identify_bottlenecks(&graph_with_fanout(), &["hub.h".to_string()], 10);

        let score_off = off_cp.iter().find(|b| b.file.ends_with("hub.h")).unwrap();
        let score_on = on_cp.iter().find(|b| b.file.ends_with("hub.h")).unwrap();
        assert!(score_on.on_critical_path);
        assert!((score_on.bottleneck_score - score_off.bottleneck_score * 1.5).abs() < 1e-9);
    }

    #[test]
    fn zero_score_nodes_are_excluded() {
        let mut g = DirectedGraph::new();
        g.add_node("free.h", Duration::ZERO);
        g.add_node("real.cpp", Duration::from_millis(10));

        let bottlenecks = identify_bottlenecks(&g, &[], 10);
        assert_eq!(bottlenecks.len(), 1);
        assert_eq!(bottlenecks[0].file, PathBuf::from("real.cpp"));
    }

    #[test]
    fn results_are_capped() {
        let mut g = DirectedGraph::new();
        for i in 0..50 {
            g.add_node(&format!("f{i}.cpp"), Duration::from_millis(10 + i));
        }
        assert_eq!(identify_bottlenecks(&g, &[], 20).len(), 20);
    }
}
