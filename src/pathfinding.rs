// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Path Planning

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use rand::Rng;

use crate::graph::{Graph, NodeId};

/// Multiplicative edge-cost perturbation bounds when jitter is requested.
const JITTER_MIN: f64 = 0.8;
const JITTER_MAX: f64 = 1.2;

/// Caps for the bounded all-simple-paths search. The original formulation
/// enumerated every simple path recursively, which blows up on dense
/// generated graphs.
pub const MAX_ENUMERATED_PATHS: usize = 16;
pub const MAX_ENUMERATION_DEPTH: usize = 24;

// ─── A* ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
struct OpenEntry {
    f: f64,
    id: NodeId,
}

impl Eq for OpenEntry {}

// Min-heap on f-score; equal f-scores break on lowest node id so repeated
// runs on the same graph expand in a fixed order.
impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* shortest path with Euclidean heuristic and Euclidean edge cost.
///
/// With `jitter` set, each edge cost is scaled by a uniform factor in
/// [0.8, 1.2] drawn from `rng` — deliberate non-determinism for path
/// diversity across repeated calls, not a correctness mechanism.
///
/// Returns an empty path when no route exists; `[start]` when
/// `start == goal`.
pub fn find_path<R: Rng>(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    jitter: bool,
    rng: &mut R,
) -> Vec<NodeId> {
    if !graph.contains(start) || !graph.contains(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let mut open = BinaryHeap::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();

    g_score.insert(start, 0.0);
    open.push(OpenEntry {
        f: graph.euclidean(start, goal),
        id: start,
    });

    while let Some(OpenEntry { id: current, .. }) = open.pop() {
        if current == goal {
            return reconstruct(&came_from, goal);
        }
        let current_g = match g_score.get(&current) {
            Some(&g) => g,
            None => continue,
        };

        for &next in graph.neighbors(current) {
            let mut cost = graph.euclidean(current, next);
            if jitter {
                cost *= rng.gen_range(JITTER_MIN..=JITTER_MAX);
            }
            let tentative = current_g + cost;
            let known = g_score.get(&next).copied().unwrap_or(f64::INFINITY);
            if tentative < known {
                came_from.insert(next, current);
                g_score.insert(next, tentative);
                open.push(OpenEntry {
                    f: tentative + graph.euclidean(next, goal),
                    id: next,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

// ─── Bounded path enumeration ────────────────────────────────────────────────

/// Enumerate up to `max_paths` simple paths from `start` to `goal`, none
/// longer than `max_depth` nodes. Iterative depth-first with explicit stack;
/// both caps bound the blow-up on meshed topologies.
pub fn enumerate_paths(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    max_paths: usize,
    max_depth: usize,
) -> Vec<Vec<NodeId>> {
    let mut out: Vec<Vec<NodeId>> = Vec::new();
    if !graph.contains(start) || !graph.contains(goal) || max_paths == 0 {
        return out;
    }

    let mut stack: Vec<Vec<NodeId>> = vec![vec![start]];
    while let Some(path) = stack.pop() {
        if out.len() >= max_paths {
            break;
        }
        let last = match path.last() {
            Some(&n) => n,
            None => continue,
        };
        if last == goal {
            out.push(path);
            continue;
        }
        if path.len() >= max_depth {
            continue;
        }
        let on_path: HashSet<NodeId> = path.iter().copied().collect();
        for &next in graph.neighbors(last) {
            if !on_path.contains(&next) {
                let mut extended = path.clone();
                extended.push(next);
                stack.push(extended);
            }
        }
    }
    out
}

// ─── Path metrics ────────────────────────────────────────────────────────────

/// Total Euclidean length of a path over `graph`.
pub fn path_length(graph: &Graph, path: &[NodeId]) -> f64 {
    path.windows(2).map(|w| graph.euclidean(w[0], w[1])).sum()
}

/// Mean Euclidean edge length over the whole graph; 0.0 for edgeless graphs.
pub fn average_edge_length(graph: &Graph) -> f64 {
    let edges = graph.edges();
    if edges.is_empty() {
        return 0.0;
    }
    let total: f64 = edges.iter().map(|e| graph.euclidean(e.0, e.1)).sum();
    total / edges.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, Node, NodeKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn node(id: NodeId, x: f64, y: f64) -> Node {
        Node { id, x, y, kind: NodeKind::Normal }
    }

    fn line_graph() -> Graph {
        Graph::new(
            vec![node(0, 0.0, 0.0), node(1, 10.0, 0.0), node(2, 20.0, 0.0)],
            vec![Edge(0, 1), Edge(1, 2)],
            vec![0],
            vec![2],
            vec![],
        )
    }

    fn diamond_graph() -> Graph {
        // Two routes 0->3: via 1 (short) and via 2 (long detour).
        Graph::new(
            vec![
                node(0, 0.0, 0.0),
                node(1, 10.0, 5.0),
                node(2, 10.0, 40.0),
                node(3, 20.0, 0.0),
            ],
            vec![Edge(0, 1), Edge(1, 3), Edge(0, 2), Edge(2, 3)],
            vec![0],
            vec![3],
            vec![],
        )
    }

    #[test]
    fn test_concrete_three_node_path() {
        let g = line_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(find_path(&g, 0, 2, false, &mut rng), vec![0, 1, 2]);
    }

    #[test]
    fn test_path_endpoints_and_edges() {
        let g = diamond_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let path = find_path(&g, 0, 3, false, &mut rng);
        assert_eq!(path.first(), Some(&0));
        assert_eq!(path.last(), Some(&3));
        for w in path.windows(2) {
            assert!(g.connects(w[0], w[1]), "non-edge step {:?}", w);
        }
        // Shorter detour wins without jitter.
        assert_eq!(path, vec![0, 1, 3]);
    }

    #[test]
    fn test_start_equals_goal() {
        let g = line_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(find_path(&g, 1, 1, false, &mut rng), vec![1]);
    }

    #[test]
    fn test_unreachable_returns_empty() {
        let g = Graph::new(
            vec![node(0, 0.0, 0.0), node(1, 10.0, 0.0)],
            vec![],
            vec![0],
            vec![1],
            vec![],
        );
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(find_path(&g, 0, 1, false, &mut rng).is_empty());
        assert!(find_path(&g, 0, 99, false, &mut rng).is_empty());
    }

    #[test]
    fn test_jitter_preserves_validity() {
        let g = diamond_graph();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..30 {
            let path = find_path(&g, 0, 3, true, &mut rng);
            assert_eq!(path.first(), Some(&0));
            assert_eq!(path.last(), Some(&3));
            for w in path.windows(2) {
                assert!(g.connects(w[0], w[1]));
            }
        }
    }

    #[test]
    fn test_enumerate_paths_capped() {
        let g = diamond_graph();
        let paths = enumerate_paths(&g, 0, 3, 10, 10);
        assert_eq!(paths.len(), 2);
        let capped = enumerate_paths(&g, 0, 3, 1, 10);
        assert_eq!(capped.len(), 1);
        // Depth cap of 2 nodes cannot fit any 0->3 route.
        assert!(enumerate_paths(&g, 0, 3, 10, 2).is_empty());
    }

    #[test]
    fn test_path_metrics() {
        let g = line_graph();
        assert!((path_length(&g, &[0, 1, 2]) - 20.0).abs() < 1e-9);
        assert!((average_edge_length(&g) - 10.0).abs() < 1e-9);
    }
}
