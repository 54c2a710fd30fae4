// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Chokepoint Analysis
//
// Empirical betweenness approximation: repeated randomized breadth-first
// searches between every source/goal pair, counting how often each interior
// node lands on a discovered path. Cheap and resampled by design; never an
// exact centrality computation.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::graph::{Graph, NodeId};

pub const DEFAULT_SAMPLE_COUNT: usize = 50;

/// Normalized visitation score a node must exceed to qualify.
const SCORE_THRESHOLD: f64 = 0.4;
/// Minimum graph degree for a junction to count as a chokepoint.
const MIN_DEGREE: usize = 3;

/// Classify high-traffic junction nodes.
///
/// For each of `sample_count` rounds, runs a randomized BFS (neighbor order
/// shuffled per expansion) from every source to every goal and increments a
/// visitation counter for every non-endpoint node on the found path.
/// Counters are normalized by the maximum; a node qualifies iff its
/// normalized score exceeds 0.4 and its degree is at least 3. Returns the
/// empty set when no path was found in any round.
pub fn classify<R: Rng>(
    graph: &Graph,
    sources: &[NodeId],
    goals: &[NodeId],
    sample_count: usize,
    rng: &mut R,
) -> HashSet<NodeId> {
    let mut visits: HashMap<NodeId, u32> = HashMap::new();

    for _ in 0..sample_count {
        for &source in sources {
            for &goal in goals {
                let path = randomized_bfs(graph, source, goal, rng);
                if path.len() <= 2 {
                    continue;
                }
                for &id in &path[1..path.len() - 1] {
                    *visits.entry(id).or_insert(0) += 1;
                }
            }
        }
    }

    let max_visits = visits.values().copied().max().unwrap_or(0);
    if max_visits == 0 {
        return HashSet::new();
    }

    visits
        .into_iter()
        .filter(|&(id, count)| {
            let score = count as f64 / max_visits as f64;
            score > SCORE_THRESHOLD && graph.degree(id) >= MIN_DEGREE
        })
        .map(|(id, _)| id)
        .collect()
}

/// BFS with shuffled neighbor expansion so repeated samples discover
/// different equal-length routes. Returns the empty path when `goal` is
/// unreachable from `start`.
fn randomized_bfs<R: Rng>(
    graph: &Graph,
    start: NodeId,
    goal: NodeId,
    rng: &mut R,
) -> Vec<NodeId> {
    if !graph.contains(start) || !graph.contains(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let mut order: Vec<NodeId> = graph.neighbors(current).to_vec();
        order.shuffle(rng);
        for next in order {
            if !seen.insert(next) {
                continue;
            }
            parent.insert(next, current);
            if next == goal {
                let mut path = vec![goal];
                let mut node = goal;
                while let Some(&p) = parent.get(&node) {
                    path.push(p);
                    node = p;
                }
                path.reverse();
                return path;
            }
            queue.push_back(next);
        }
    }

    Vec::new()
}
