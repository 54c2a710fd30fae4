// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Agent Routing
//
// Mid-traversal path splicing around attractor (honeypot) nodes. Reroute
// failures are explicit early returns that leave the agent's path untouched;
// an attractor an agent has already visited can never re-trigger.

use std::collections::HashSet;

use rand::Rng;
use serde::Serialize;

use crate::graph::{Graph, NodeId};
use crate::pathfinding::{average_edge_length, find_path};
use crate::types::EnemyType;

/// Bias toward reversal when comparing reroute costs.
const REVERSAL_BIAS: f64 = 1.1;

/// How long an attraction holds before expiring, in seconds.
pub const DEFAULT_ATTRACTION_SECS: f64 = 6.0;

// ─── Agent ───────────────────────────────────────────────────────────────────

/// A mobile packet traversing its path. `index` addresses the node the agent
/// is currently moving toward; `path[index - 1]` is the traversal anchor it
/// last departed.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: u64,
    pub enemy_type: EnemyType,
    pub path: Vec<NodeId>,
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub health: f64,
    pub attracted_to: Option<NodeId>,
    pub attraction_remaining: f64,
    pub visited_attractors: HashSet<NodeId>,
    pub saved_path: Option<Vec<NodeId>>,
}

/// What happened to an agent during one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moving,
    ReachedGoal,
}

impl Agent {
    pub fn new(id: u64, enemy_type: EnemyType, path: Vec<NodeId>, graph: &Graph) -> Self {
        let (x, y) = path
            .first()
            .and_then(|&n| graph.position(n))
            .unwrap_or((0.0, 0.0));
        Self {
            id,
            enemy_type,
            path,
            index: 0,
            x,
            y,
            health: enemy_type.max_health(),
            attracted_to: None,
            attraction_remaining: 0.0,
            visited_attractors: HashSet::new(),
            saved_path: None,
        }
    }

    /// The node last reached (traversal anchor).
    pub fn anchor(&self) -> Option<NodeId> {
        if self.index == 0 {
            self.path.first().copied()
        } else {
            self.path.get(self.index - 1).copied()
        }
    }

    /// The node currently being approached.
    pub fn target(&self) -> Option<NodeId> {
        self.path.get(self.index).copied()
    }

    pub fn goal(&self) -> Option<NodeId> {
        self.path.last().copied()
    }

    pub fn at_goal(&self) -> bool {
        self.index >= self.path.len()
    }

    /// Advance along the path by `speed * dt`, crossing at most one node per
    /// call. Handles attraction arrival and expiry bookkeeping.
    pub fn step(&mut self, graph: &Graph, dt: f64) -> StepOutcome {
        self.tick_attraction(dt);

        let Some(target) = self.target() else {
            return StepOutcome::ReachedGoal;
        };
        let Some((tx, ty)) = graph.position(target) else {
            // Target vanished with a topology change; nothing to walk toward.
            return StepOutcome::ReachedGoal;
        };

        let dx = tx - self.x;
        let dy = ty - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let travel = self.enemy_type.speed() * dt;

        if travel < dist {
            self.x += dx / dist * travel;
            self.y += dy / dist * travel;
            return StepOutcome::Moving;
        }

        // Node reached.
        self.x = tx;
        self.y = ty;
        self.index += 1;
        if self.attracted_to == Some(target) {
            // Departing the attractor: clear it and make it permanent.
            self.attracted_to = None;
            self.attraction_remaining = 0.0;
            self.visited_attractors.insert(target);
            self.saved_path = None;
        }
        if self.at_goal() {
            StepOutcome::ReachedGoal
        } else {
            StepOutcome::Moving
        }
    }

    fn tick_attraction(&mut self, dt: f64) {
        if self.attracted_to.is_none() {
            return;
        }
        self.attraction_remaining -= dt;
        if self.attraction_remaining > 0.0 {
            return;
        }
        // Expired before arrival: drop the pull and resume the saved path
        // when the anchor still lies on it.
        self.attracted_to = None;
        self.attraction_remaining = 0.0;
        if let (Some(saved), Some(anchor)) = (self.saved_path.take(), self.anchor()) {
            if let Some(pos) = saved.iter().position(|&n| n == anchor) {
                self.path = saved;
                self.index = pos + 1;
            }
            // Otherwise the spliced path stands; it still ends at a goal.
        }
    }
}

// ─── Attraction splicing ─────────────────────────────────────────────────────

/// Attempt to reroute `agent` toward attractor node `h`.
///
/// Returns `true` when a splice was applied. Early-returns without touching
/// the agent's path when the attractor was already visited, another
/// attractor is active, or no viable reroute exists.
pub fn apply_attraction<R: Rng>(
    agent: &mut Agent,
    h: NodeId,
    graph: &Graph,
    duration: f64,
    rng: &mut R,
) -> bool {
    if agent.visited_attractors.contains(&h) {
        return false;
    }
    if agent.attracted_to.is_some() {
        // No attractor hijacking.
        return false;
    }
    let Some(goal) = agent.goal() else {
        return false;
    };
    let Some(prev) = agent.anchor() else {
        return false;
    };
    let next = agent.target().unwrap_or(prev);

    let path_h_to_goal = find_path(graph, h, goal, false, rng);
    if path_h_to_goal.is_empty() {
        return false;
    }

    let path_from_prev = find_path(graph, prev, h, false, rng);
    let path_from_next = find_path(graph, next, h, false, rng);
    if path_from_prev.is_empty() && path_from_next.is_empty() {
        return false;
    }

    let avg_edge = average_edge_length(graph);
    let cost = |entry: NodeId, path: &[NodeId]| -> f64 {
        let (ex, ey) = graph.position(entry).unwrap_or((agent.x, agent.y));
        let physical = ((ex - agent.x).powi(2) + (ey - agent.y).powi(2)).sqrt();
        physical + path.len().saturating_sub(1) as f64 * avg_edge
    };

    let reverse = if path_from_prev.is_empty() {
        false
    } else if path_from_next.is_empty() || prev == h {
        // Physically leaving H already: turn back.
        true
    } else {
        cost(prev, &path_from_prev) < REVERSAL_BIAS * cost(next, &path_from_next)
    };

    let entry_path = if reverse { path_from_prev } else { path_from_next };

    // Splice entry path with H->goal, dropping the duplicated H.
    let mut spliced = entry_path;
    spliced.extend_from_slice(&path_h_to_goal[1..]);

    agent.saved_path = Some(std::mem::replace(&mut agent.path, spliced));
    agent.index = 0;
    agent.attracted_to = Some(h);
    agent.attraction_remaining = duration;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, Node, NodeKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn n(id: NodeId, x: f64, y: f64) -> Node {
        Node { id, x, y, kind: NodeKind::Normal }
    }

    /// 0 - 1 - 2 - 3 main line with honeypot spur 4 off node 1.
    fn spur_graph() -> Graph {
        Graph::new(
            vec![
                n(0, 0.0, 0.0),
                n(1, 100.0, 0.0),
                n(2, 200.0, 0.0),
                n(3, 300.0, 0.0),
                n(4, 100.0, 100.0),
            ],
            vec![Edge(0, 1), Edge(1, 2), Edge(2, 3), Edge(1, 4), Edge(4, 2)],
            vec![0],
            vec![3],
            vec![],
        )
    }

    fn mid_edge_agent(graph: &Graph) -> Agent {
        let mut agent = Agent::new(1, EnemyType::Trojan, vec![0, 1, 2, 3], graph);
        // Walk past node 1, partway to node 2.
        agent.index = 2;
        agent.x = 130.0;
        agent.y = 0.0;
        agent
    }

    #[test]
    fn test_splice_targets_attractor_then_goal() {
        let graph = spur_graph();
        let mut agent = mid_edge_agent(&graph);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(apply_attraction(&mut agent, 4, &graph, 5.0, &mut rng));

        assert_eq!(agent.attracted_to, Some(4));
        assert_eq!(agent.index, 0);
        assert!(agent.path.contains(&4));
        assert_eq!(agent.path.last(), Some(&3));
        // H appears exactly once despite the two concatenated legs.
        assert_eq!(agent.path.iter().filter(|&&id| id == 4).count(), 1);
        assert!(agent.saved_path.is_some());
    }

    #[test]
    fn test_visited_attractor_is_idempotent() {
        let graph = spur_graph();
        let mut agent = mid_edge_agent(&graph);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(apply_attraction(&mut agent, 4, &graph, 60.0, &mut rng));

        // Walk until the attractor is reached and marked visited.
        for _ in 0..500 {
            if agent.visited_attractors.contains(&4) {
                break;
            }
            agent.step(&graph, 0.05);
        }
        assert!(agent.visited_attractors.contains(&4));
        assert_eq!(agent.attracted_to, None);

        let frozen = agent.path.clone();
        assert!(!apply_attraction(&mut agent, 4, &graph, 60.0, &mut rng));
        assert_eq!(agent.path, frozen, "second event mutated the path");
    }

    #[test]
    fn test_no_hijack_while_attractor_active() {
        let graph = Graph::new(
            vec![
                n(0, 0.0, 0.0),
                n(1, 100.0, 0.0),
                n(2, 200.0, 0.0),
                n(3, 300.0, 0.0),
                n(4, 100.0, 100.0),
                n(5, 200.0, 100.0),
            ],
            vec![
                Edge(0, 1),
                Edge(1, 2),
                Edge(2, 3),
                Edge(1, 4),
                Edge(4, 2),
                Edge(2, 5),
                Edge(5, 3),
            ],
            vec![0],
            vec![3],
            vec![],
        );
        let mut agent = mid_edge_agent(&graph);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(apply_attraction(&mut agent, 4, &graph, 60.0, &mut rng));
        let committed = agent.path.clone();
        assert!(!apply_attraction(&mut agent, 5, &graph, 60.0, &mut rng));
        assert_eq!(agent.path, committed);
    }

    #[test]
    fn test_unreachable_goal_aborts_splice() {
        // Honeypot on an island: no H->goal route.
        let graph = Graph::new(
            vec![n(0, 0.0, 0.0), n(1, 100.0, 0.0), n(2, 200.0, 0.0), n(9, 500.0, 500.0)],
            vec![Edge(0, 1), Edge(1, 2)],
            vec![0],
            vec![2],
            vec![],
        );
        let mut agent = Agent::new(1, EnemyType::Worm, vec![0, 1, 2], &graph);
        agent.index = 1;
        let before = agent.path.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert!(!apply_attraction(&mut agent, 9, &graph, 5.0, &mut rng));
        assert_eq!(agent.path, before);
        assert_eq!(agent.attracted_to, None);
    }

    #[test]
    fn test_reversal_preferred_when_leaving_attractor() {
        let graph = spur_graph();
        // Agent just departed node 4 (the attractor) heading to 2.
        let mut agent = Agent::new(1, EnemyType::Swarm, vec![0, 1, 4, 2, 3], &graph);
        agent.index = 3;
        agent.x = 120.0;
        agent.y = 80.0;
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(apply_attraction(&mut agent, 4, &graph, 5.0, &mut rng));
        // Reversal entry: the new path starts at the departed anchor.
        assert_eq!(agent.path.first(), Some(&4));
    }

    #[test]
    fn test_expiry_resumes_saved_path() {
        let graph = spur_graph();
        let mut agent = mid_edge_agent(&graph);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        assert!(apply_attraction(&mut agent, 4, &graph, 0.01, &mut rng));
        // One long tick expires the pull before the agent reaches node 4.
        agent.step(&graph, 0.02);
        assert_eq!(agent.attracted_to, None);
        assert!(!agent.visited_attractors.contains(&4), "expiry must not mark visited");
    }

    #[test]
    fn test_step_reaches_goal() {
        let graph = spur_graph();
        let mut agent = Agent::new(7, EnemyType::Worm, vec![0, 1, 2, 3], &graph);
        let mut outcome = StepOutcome::Moving;
        for _ in 0..200 {
            outcome = agent.step(&graph, 0.1);
            if outcome == StepOutcome::ReachedGoal {
                break;
            }
        }
        assert_eq!(outcome, StepOutcome::ReachedGoal);
        assert_eq!(agent.anchor(), Some(3));
    }
}
