// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Graph Topology Model

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

pub type NodeId = u32;

// ─── Node ────────────────────────────────────────────────────────────────────

/// Node kind is derived from the owning graph's id sets, never assigned
/// freely. Source/goal take precedence over chokepoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Source,
    Normal,
    Chokepoint,
    Goal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub kind: NodeKind,
}

/// Unordered node pair; traversal is bidirectional. Serializes as `[a, b]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge(pub NodeId, pub NodeId);

// ─── Wire contract ───────────────────────────────────────────────────────────

/// Topology serialization contract:
/// `{nodes, edges, sources, goals, chokepoints}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub sources: Vec<NodeId>,
    pub goals: Vec<NodeId>,
    pub chokepoints: Vec<NodeId>,
}

// ─── Graph ───────────────────────────────────────────────────────────────────

/// Immutable-per-load topology: nodes, edges, role sets, and an adjacency
/// map built on construction. Duplicate and self edges are tolerated (they
/// are simply dropped from adjacency, never rejected).
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    sources: Vec<NodeId>,
    goals: Vec<NodeId>,
    chokepoints: Vec<NodeId>,
    adjacency: HashMap<NodeId, Vec<NodeId>>,
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn new(
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        sources: Vec<NodeId>,
        goals: Vec<NodeId>,
        chokepoints: Vec<NodeId>,
    ) -> Self {
        let index: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();

        let mut adjacency: HashMap<NodeId, Vec<NodeId>> =
            nodes.iter().map(|n| (n.id, Vec::new())).collect();
        for &Edge(a, b) in &edges {
            if a == b || !index.contains_key(&a) || !index.contains_key(&b) {
                continue;
            }
            if let Some(list) = adjacency.get_mut(&a) {
                if !list.contains(&b) {
                    list.push(b);
                }
            }
            if let Some(list) = adjacency.get_mut(&b) {
                if !list.contains(&a) {
                    list.push(a);
                }
            }
        }

        let mut graph = Self {
            nodes,
            edges,
            sources,
            goals,
            chokepoints,
            adjacency,
            index,
        };
        graph.derive_kinds();
        graph
    }

    pub fn from_spec(spec: GraphSpec) -> Self {
        Self::new(spec.nodes, spec.edges, spec.sources, spec.goals, spec.chokepoints)
    }

    pub fn to_spec(&self) -> GraphSpec {
        GraphSpec {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            sources: self.sources.clone(),
            goals: self.goals.clone(),
            chokepoints: self.chokepoints.clone(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_spec(serde_json::from_str::<GraphSpec>(json)?))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_spec())
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn sources(&self) -> &[NodeId] {
        &self.sources
    }

    pub fn goals(&self) -> &[NodeId] {
        &self.goals
    }

    pub fn chokepoints(&self) -> &[NodeId] {
        &self.chokepoints
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, id: NodeId) -> Option<(f64, f64)> {
        self.node(id).map(|n| (n.x, n.y))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.neighbors(id).len()
    }

    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn euclidean(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.position(a), self.position(b)) {
            (Some((ax, ay)), Some((bx, by))) => {
                ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
            }
            _ => 0.0,
        }
    }

    // ─── Classification ──────────────────────────────────────────────────────

    /// Replace the chokepoint set and re-derive every node kind. Used after
    /// generation, when generation-time kind hints are discarded in favor of
    /// sampled classification.
    pub fn set_chokepoints(&mut self, chokepoints: Vec<NodeId>) {
        self.chokepoints = chokepoints
            .into_iter()
            .filter(|id| self.index.contains_key(id))
            .collect();
        self.derive_kinds();
    }

    fn derive_kinds(&mut self) {
        let sources: HashSet<NodeId> = self.sources.iter().copied().collect();
        let goals: HashSet<NodeId> = self.goals.iter().copied().collect();
        let chokes: HashSet<NodeId> = self.chokepoints.iter().copied().collect();
        for node in &mut self.nodes {
            node.kind = if sources.contains(&node.id) {
                NodeKind::Source
            } else if goals.contains(&node.id) {
                NodeKind::Goal
            } else if chokes.contains(&node.id) {
                NodeKind::Chokepoint
            } else {
                NodeKind::Normal
            };
        }
    }

    // ─── Invariants ──────────────────────────────────────────────────────────

    /// Every source/goal/chokepoint id must index an existing node, and every
    /// source must reach at least one goal through the edge set.
    pub fn is_well_formed(&self) -> bool {
        let ids_exist = self
            .sources
            .iter()
            .chain(self.goals.iter())
            .chain(self.chokepoints.iter())
            .all(|id| self.index.contains_key(id));
        ids_exist && !self.sources.is_empty() && !self.goals.is_empty()
            && self.sources.iter().all(|&s| self.reaches_any_goal(s))
    }

    fn reaches_any_goal(&self, start: NodeId) -> bool {
        let goals: HashSet<NodeId> = self.goals.iter().copied().collect();
        if goals.contains(&start) {
            return true;
        }
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for &next in self.neighbors(current) {
                if goals.contains(&next) {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_graph() -> Graph {
        // 0(source) - 1 - 2(goal)
        Graph::new(
            vec![
                Node { id: 0, x: 0.0, y: 0.0, kind: NodeKind::Normal },
                Node { id: 1, x: 10.0, y: 0.0, kind: NodeKind::Normal },
                Node { id: 2, x: 20.0, y: 0.0, kind: NodeKind::Normal },
            ],
            vec![Edge(0, 1), Edge(1, 2)],
            vec![0],
            vec![2],
            vec![],
        )
    }

    #[test]
    fn test_kinds_derived_from_sets() {
        let g = line_graph();
        assert_eq!(g.node(0).map(|n| n.kind), Some(NodeKind::Source));
        assert_eq!(g.node(1).map(|n| n.kind), Some(NodeKind::Normal));
        assert_eq!(g.node(2).map(|n| n.kind), Some(NodeKind::Goal));
    }

    #[test]
    fn test_duplicate_and_self_edges_tolerated() {
        let g = Graph::new(
            vec![
                Node { id: 0, x: 0.0, y: 0.0, kind: NodeKind::Normal },
                Node { id: 1, x: 1.0, y: 0.0, kind: NodeKind::Normal },
            ],
            vec![Edge(0, 1), Edge(0, 1), Edge(1, 0), Edge(0, 0)],
            vec![0],
            vec![1],
            vec![],
        );
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.degree(0), 1);
        assert!(g.is_well_formed());
    }

    #[test]
    fn test_connectivity_invariant() {
        let g = line_graph();
        assert!(g.is_well_formed());

        let disconnected = Graph::new(
            vec![
                Node { id: 0, x: 0.0, y: 0.0, kind: NodeKind::Normal },
                Node { id: 1, x: 1.0, y: 0.0, kind: NodeKind::Normal },
            ],
            vec![],
            vec![0],
            vec![1],
            vec![],
        );
        assert!(!disconnected.is_well_formed());
    }

    #[test]
    fn test_wire_contract_round_trip() {
        let g = line_graph();
        let json = g.to_json().unwrap();
        // Contract field names, not internal representation.
        assert!(json.contains("\"nodes\""));
        assert!(json.contains("\"edges\""));
        assert!(json.contains("\"sources\""));
        assert!(json.contains("\"goals\""));
        assert!(json.contains("\"chokepoints\""));
        assert!(json.contains("\"kind\":\"source\""));
        assert!(json.contains("[0,1]"));

        let back = Graph::from_json(&json).unwrap();
        assert_eq!(back.nodes(), g.nodes());
        assert!(back.connects(0, 1));
    }

    #[test]
    fn test_set_chokepoints_rederives_kinds() {
        let mut g = line_graph();
        g.set_chokepoints(vec![1, 99]); // 99 does not exist, gets dropped
        assert_eq!(g.chokepoints(), &[1]);
        assert_eq!(g.node(1).map(|n| n.kind), Some(NodeKind::Chokepoint));
        // Source/goal precedence over chokepoint membership.
        g.set_chokepoints(vec![0]);
        assert_eq!(g.node(0).map(|n| n.kind), Some(NodeKind::Source));
    }
}
