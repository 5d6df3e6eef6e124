use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Weight on a directed edge. Duplicate insertions merge into the existing
/// edge by summing both fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub time: Duration,
    pub count: usize,
}

impl Default for EdgeWeight {
    fn default() -> Self {
        Self {
            time: Duration::ZERO,
            count: 1,
        }
    }
}

/// A cycle found in the graph. The node list carries the closing node again
/// at the end, so `a -> b -> a` is reported as `[a, b, a]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub total_time: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleDetectionResult {
    pub has_cycles: bool,
    pub cycles: Vec<Cycle>,
}

/// A path through the graph with the summed node time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub nodes: Vec<String>,
    pub total_time: Duration,
}

/// Critical path analysis result. `total_time` is the sum of node times on
/// the path; edge times steer path selection but are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathResult {
    pub critical_path: GraphPath,
    pub total_time: Duration,
}

/// Degree, depth and reachable-time statistics for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub node: String,
    pub in_degree: usize,
    pub out_degree: usize,
    /// Longest distance from any root (0 for roots and unreachable nodes).
    pub depth: usize,
    /// This node's time plus the time of every node reachable from it.
    pub cumulative_time: Duration,
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    time: Duration,
    successors: FxHashMap<String, EdgeWeight>,
}

/// Directed graph over string file identifiers with per-node durations and
/// weighted edges.
///
/// Adjacency is id-keyed; predecessors are a secondary index maintained on
/// every mutation. Node insertion order is recorded so that traversals are
/// deterministic within a run.
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    adjacency: FxHashMap<String, NodeData>,
    predecessors: FxHashMap<String, FxHashSet<String>>,
    insertion_order: Vec<String>,
    edge_count: usize,
}

impl DirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or updates its time if it already exists.
    pub fn add_node(&mut self, node: &str, time: Duration) {
        match self.adjacency.get_mut(node) {
            Some(data) => data.time = time,
            None => {
                self.adjacency.insert(
                    node.to_string(),
                    NodeData {
                        time,
                        successors: FxHashMap::default(),
                    },
                );
                self.predecessors.insert(node.to_string(), FxHashSet::default());
                self.insertion_order.push(node.to_string());
            }
        }
    }

    /// Creates a node with zero time only if it is absent. Used for edge
    /// endpoints so an explicitly recorded node time is never overwritten.
    fn ensure_node(&mut self, node: &str) {
        if !self.has_node(node) {
            self.add_node(node, Duration::ZERO);
        }
    }

    /// Adds a directed edge, creating missing endpoints with zero time.
    /// A duplicate edge merges its weight into the existing one and does
    /// not increase the edge count.
    pub fn add_edge(&mut self, from: &str, to: &str, weight: EdgeWeight) {
        self.ensure_node(from);
        self.ensure_node(to);

        let successors = &mut self
            .adjacency
            .get_mut(from)
            .expect("endpoint was just ensured")
            .successors;

        match successors.get_mut(to) {
            Some(existing) => {
                existing.count += weight.count;
                existing.time += weight.time;
            }
            None => {
                successors.insert(to.to_string(), weight);
                self.predecessors
                    .entry(to.to_string())
                    .or_default()
                    .insert(from.to_string());
                self.edge_count += 1;
            }
        }
    }

    pub fn has_node(&self, node: &str) -> bool {
        self.adjacency.contains_key(node)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|data| data.successors.contains_key(to))
    }

    /// All node ids in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.insertion_order
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Successor ids of a node; empty if the node is unknown.
    pub fn successors(&self, node: &str) -> Vec<String> {
        self.adjacency
            .get(node)
            .map(|data| data.successors.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Predecessor ids of a node; empty if the node is unknown.
    pub fn predecessors(&self, node: &str) -> Vec<String> {
        self.predecessors
            .get(node)
            .map(|preds| preds.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn edge_weight(&self, from: &str, to: &str) -> Option<EdgeWeight> {
        self.adjacency
            .get(from)
            .and_then(|data| data.successors.get(to))
            .copied()
    }

    pub fn node_time(&self, node: &str) -> Duration {
        self.adjacency
            .get(node)
            .map(|data| data.time)
            .unwrap_or(Duration::ZERO)
    }

    pub fn in_degree(&self, node: &str) -> usize {
        self.predecessors.get(node).map_or(0, FxHashSet::len)
    }

    pub fn out_degree(&self, node: &str) -> usize {
        self.adjacency.get(node).map_or(0, |d| d.successors.len())
    }

    /// Nodes with no incoming edges, in insertion order.
    pub fn roots(&self) -> Vec<String> {
        self.insertion_order
            .iter()
            .filter(|node| self.in_degree(node) == 0)
            .cloned()
            .collect()
    }

    /// Nodes with no outgoing edges, in insertion order.
    pub fn leaves(&self) -> Vec<String> {
        self.insertion_order
            .iter()
            .filter(|node| self.out_degree(node) == 0)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let g = DirectedGraph::new();
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
        assert!(g.nodes().is_empty());
    }

    #[test]
    fn add_node_records_time() {
        let mut g = DirectedGraph::new();
        g.add_node("A", Duration::from_millis(100));

        assert_eq!(g.node_count(), 1);
        assert!(g.has_node("A"));
        assert!(!g.has_node("B"));
        assert_eq!(g.node_time("A"), Duration::from_millis(100));
    }

    #[test]
    fn re_adding_a_node_updates_time() {
        let mut g = DirectedGraph::new();
        g.add_node("A", Duration::from_millis(100));
        g.add_node("A", Duration::from_millis(250));

        assert_eq!(g.node_count(), 1);
        assert_eq!(g.node_time("A"), Duration::from_millis(250));
    }

    #[test]
    fn add_edge_creates_endpoints() {
        let mut g = DirectedGraph::new();
        g.add_edge("A", "B", EdgeWeight::default());

        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge("A", "B"));
        assert!(!g.has_edge("B", "A"));
    }

    #[test]
    fn edge_endpoint_does_not_clobber_explicit_time() {
        let mut g = DirectedGraph::new();
        g.add_node("A", Duration::from_millis(500));
        g.add_edge("A", "B", EdgeWeight::default());

        assert_eq!(g.node_time("A"), Duration::from_millis(500));
        assert_eq!(g.node_time("B"), Duration::ZERO);
    }

    #[test]
    fn duplicate_edge_merges_weight() {
        let mut g = DirectedGraph::new();
        let w = EdgeWeight {
            time: Duration::from_millis(10),
            count: 1,
        };
        g.add_edge("A", "B", w);
        g.add_edge("A", "B", w);

        assert_eq!(g.edge_count(), 1);
        let merged = g.edge_weight("A", "B").unwrap();
        assert_eq!(merged.count, 2);
        assert_eq!(merged.time, Duration::from_millis(20));
    }

    #[test]
    fn successors_and_predecessors() {
        let mut g = DirectedGraph::new();
        g.add_edge("A", "B", EdgeWeight::default());
        g.add_edge("A", "C", EdgeWeight::default());
        g.add_edge("B", "C", EdgeWeight::default());

        assert_eq!(g.successors("A").len(), 2);
        assert_eq!(g.successors("B"), vec!["C".to_string()]);
        assert!(g.successors("C").is_empty());
        assert_eq!(g.predecessors("C").len(), 2);
        assert!(g.predecessors("A").is_empty());
        assert!(g.successors("missing").is_empty());
    }

    #[test]
    fn roots_and_leaves() {
        let mut g = DirectedGraph::new();
        g.add_edge("A", "B", EdgeWeight::default());
        g.add_edge("A", "C", EdgeWeight::default());
        g.add_edge("B", "D", EdgeWeight::default());
        g.add_edge("C", "D", EdgeWeight::default());

        assert_eq!(g.roots(), vec!["A".to_string()]);
        assert_eq!(g.leaves(), vec!["D".to_string()]);
    }

    #[test]
    fn self_loop_counts_as_edge() {
        let mut g = DirectedGraph::new();
        g.add_edge("A", "A", EdgeWeight::default());
        assert_eq!(g.edge_count(), 1);
        assert!(g.has_edge("A", "A"));
        assert_eq!(g.in_degree("A"), 1);
    }
}
