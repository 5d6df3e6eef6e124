//! Graph algorithms over the include dependency graph.
//!
//! Cycle detection with path reporting, topological ordering, critical path
//! calculation, reachability and cycle-breaker ranking. Every algorithm
//! walks nodes in insertion order, so results are deterministic within a
//! run.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::time::Duration;

use crate::models::error::{BhaError, Result};
use crate::models::graph::{
    Cycle, CycleDetectionResult, CriticalPathResult, DirectedGraph, GraphPath, NodeStats,
};

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Grey,
    Black,
}

/// Detects cycles with a three-colour DFS, reporting up to `max_cycles`
/// cycle paths. Each reported cycle lists the nodes from the re-entered
/// node around the loop, with the closing node appended. Self-loops are
/// reported.
pub fn detect_cycles(graph: &DirectedGraph, max_cycles: usize) -> CycleDetectionResult {
    let mut result = CycleDetectionResult::default();
    let mut color: FxHashMap<String, Color> = graph
        .nodes()
        .iter()
        .map(|n| (n.clone(), Color::White))
        .collect();

    fn dfs(
        graph: &DirectedGraph,
        node: &str,
        color: &mut FxHashMap<String, Color>,
        path: &mut Vec<String>,
        result: &mut CycleDetectionResult,
        max_cycles: usize,
    ) {
        if result.cycles.len() >= max_cycles {
            return;
        }

        color.insert(node.to_string(), Color::Grey);
        path.push(node.to_string());

        for succ in graph.successors(node) {
            match color.get(&succ).copied().unwrap_or(Color::White) {
                Color::Grey => {
                    let mut cycle = Cycle::default();
                    let mut in_cycle = false;
                    for n in path.iter() {
                        if *n == succ {
                            in_cycle = true;
                        }
                        if in_cycle {
                            cycle.nodes.push(n.clone());
                            cycle.total_time += graph.node_time(n);
                        }
                    }
                    cycle.nodes.push(succ);
                    result.cycles.push(cycle);
                    result.has_cycles = true;
                    if result.cycles.len() >= max_cycles {
                        break;
                    }
                }
                Color::White => {
                    dfs(graph, &succ, color, path, result, max_cycles);
                }
                Color::Black => {}
            }
        }

        path.pop();
        color.insert(node.to_string(), Color::Black);
    }

    for node in graph.nodes() {
        if result.cycles.len() >= max_cycles {
            break;
        }
        if color.get(node).copied() == Some(Color::White) {
            let mut path = Vec::new();
            dfs(graph, node, &mut color, &mut path, &mut result, max_cycles);
        }
    }

    result
}

/// Kahn's algorithm over in-degrees. Ready nodes are served FIFO in
/// insertion order. Fails with the offending cycle when one exists.
pub fn topological_sort(graph: &DirectedGraph) -> Result<Vec<String>> {
    let mut in_degree: FxHashMap<String, usize> = graph
        .nodes()
        .iter()
        .map(|n| (n.clone(), graph.in_degree(n)))
        .collect();

    let mut queue: VecDeque<String> = graph
        .nodes()
        .iter()
        .filter(|n| in_degree[*n] == 0)
        .cloned()
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(node) = queue.pop_front() {
        for succ in graph.successors(&node) {
            if let Some(degree) = in_degree.get_mut(&succ) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(succ);
                }
            }
        }
        order.push(node);
    }

    if order.len() != graph.node_count() {
        let detection = detect_cycles(graph, 1);
        let cycle = detection
            .cycles
            .into_iter()
            .next()
            .map(|c| c.nodes)
            .unwrap_or_default();
        return Err(BhaError::CircularDependency { cycle });
    }

    Ok(order)
}

/// Finds the longest time-weighted chain in a DAG.
///
/// Relaxation maximises `dist[pred] + node_time(pred) + edge_time`; the
/// reported `total_time` is the sum of node times along the chosen path
/// (edge times steer selection only). Fails with the offending cycle on a
/// cyclic graph.
pub fn find_critical_path(graph: &DirectedGraph) -> Result<CriticalPathResult> {
    let topo_order = topological_sort(graph)?;

    let mut dist: FxHashMap<&str, Duration> =
        topo_order.iter().map(|n| (n.as_str(), Duration::ZERO)).collect();
    let mut prev: FxHashMap<String, String> = FxHashMap::default();

    for node in &topo_order {
        let node_time = graph.node_time(node);
        let base = dist[node.as_str()];
        for succ in graph.successors(node) {
            let edge_time = graph
                .edge_weight(node, &succ)
                .map(|w| w.time)
                .unwrap_or(Duration::ZERO);
            let new_dist = base + node_time + edge_time;
            if let Some(current) = dist.get_mut(succ.as_str()) {
                if new_dist > *current {
                    *current = new_dist;
                    prev.insert(succ.clone(), node.clone());
                }
            }
        }
    }

    let mut end_node: Option<&str> = None;
    let mut max_dist = Duration::ZERO;
    for node in &topo_order {
        let total = dist[node.as_str()] + graph.node_time(node);
        if total > max_dist {
            max_dist = total;
            end_node = Some(node);
        }
    }

    let mut result = CriticalPathResult::default();
    if let Some(end) = end_node {
        let mut current = end.to_string();
        loop {
            result.critical_path.nodes.push(current.clone());
            result.critical_path.total_time += graph.node_time(&current);
            match prev.get(&current) {
                Some(p) => current = p.clone(),
                None => break,
            }
        }
        result.critical_path.nodes.reverse();
        result.total_time = result.critical_path.total_time;
    }

    Ok(result)
}

/// Enumerates simple paths from `from` to `to`, bounded by `max_paths`.
/// The visited set only covers the current path, so converging DAG routes
/// are each reported.
pub fn find_all_paths(
    graph: &DirectedGraph,
    from: &str,
    to: &str,
    max_paths: usize,
) -> Vec<GraphPath> {
    let mut result = Vec::new();
    if !graph.has_node(from) || !graph.has_node(to) {
        return result;
    }

    fn dfs(
        graph: &DirectedGraph,
        node: &str,
        to: &str,
        current: &mut GraphPath,
        visited: &mut FxHashSet<String>,
        result: &mut Vec<GraphPath>,
        max_paths: usize,
    ) {
        if result.len() >= max_paths {
            return;
        }

        current.nodes.push(node.to_string());
        current.total_time += graph.node_time(node);
        visited.insert(node.to_string());

        if node == to {
            result.push(current.clone());
        } else {
            for succ in graph.successors(node) {
                if !visited.contains(&succ) {
                    dfs(graph, &succ, to, current, visited, result, max_paths);
                }
            }
        }

        current.nodes.pop();
        current.total_time -= graph.node_time(node);
        visited.remove(node);
    }

    let mut current = GraphPath::default();
    let mut visited = FxHashSet::default();
    dfs(graph, from, to, &mut current, &mut visited, &mut result, max_paths);
    result
}

/// BFS-reachability from every node, emitted as `(from, to)` pairs.
pub fn transitive_closure(graph: &DirectedGraph) -> Vec<(String, String)> {
    let mut result = Vec::new();

    for start in graph.nodes() {
        let mut reachable: FxHashSet<String> = FxHashSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        reachable.insert(start.clone());

        while let Some(node) = queue.pop_front() {
            for succ in graph.successors(&node) {
                if reachable.insert(succ.clone()) {
                    queue.push_back(succ.clone());
                    result.push((start.clone(), succ));
                }
            }
        }
    }

    result
}

/// Ranks nodes by how many detected cycles they participate in. Detection
/// runs with a raised cap so participation counts are meaningful.
pub fn find_cycle_breakers(graph: &DirectedGraph, max_results: usize) -> Vec<(String, usize)> {
    let detection = detect_cycles(graph, 100);
    if !detection.has_cycles {
        return Vec::new();
    }

    let mut participation: FxHashMap<String, usize> = FxHashMap::default();
    for cycle in &detection.cycles {
        for node in &cycle.nodes {
            *participation.entry(node.clone()).or_insert(0) += 1;
        }
    }

    let mut result: Vec<(String, usize)> = participation.into_iter().collect();
    result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    result.truncate(max_results);
    result
}

/// Longest distance from any root to each node.
///
/// Relaxation is bounded by the node count so a cycle reachable from a root
/// cannot spin the queue forever; unreachable nodes are absent from the map.
pub fn compute_depths(graph: &DirectedGraph) -> FxHashMap<String, usize> {
    let mut depths: FxHashMap<String, usize> = FxHashMap::default();
    let node_count = graph.node_count();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for root in graph.roots() {
        depths.insert(root.clone(), 0);
        queue.push_back((root, 0));
    }

    while let Some((node, depth)) = queue.pop_front() {
        let new_depth = depth + 1;
        if new_depth >= node_count {
            continue;
        }
        for succ in graph.successors(&node) {
            let known = depths.get(&succ).copied();
            if known.map_or(true, |d| d < new_depth) {
                depths.insert(succ.clone(), new_depth);
                queue.push_back((succ, new_depth));
            }
        }
    }

    depths
}

/// Degree, depth and cumulative-time statistics for one node.
pub fn node_stats(graph: &DirectedGraph, node: &str) -> NodeStats {
    let mut stats = NodeStats {
        node: node.to_string(),
        in_degree: graph.in_degree(node),
        out_degree: graph.out_degree(node),
        ..Default::default()
    };

    if !graph.has_node(node) {
        return stats;
    }

    stats.depth = compute_depths(graph).get(node).copied().unwrap_or(0);

    let mut reachable: FxHashSet<String> = FxHashSet::default();
    let mut queue = VecDeque::new();
    reachable.insert(node.to_string());
    queue.push_back(node.to_string());
    while let Some(current) = queue.pop_front() {
        stats.cumulative_time += graph.node_time(&current);
        for succ in graph.successors(&current) {
            if reachable.insert(succ.clone()) {
                queue.push_back(succ);
            }
        }
    }

    stats
}
