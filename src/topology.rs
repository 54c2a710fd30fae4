// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Topology Generation
//
// Procedural graph synthesis. Generation-time role guesses are always
// discarded: after node/edge placement the finished graph is reclassified
// through the sampled chokepoint analysis, then re-centered into the
// canonical viewport. A graph that fails the source-to-goal connectivity
// invariant is regenerated, never installed.

use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chokepoints;
use crate::graph::{Edge, Graph, Node, NodeId, NodeKind};

// ─── Constants ───────────────────────────────────────────────────────────────

pub const VIEWPORT_WIDTH: f64 = 960.0;
pub const VIEWPORT_HEIGHT: f64 = 640.0;
const VIEWPORT_MARGIN: f64 = 60.0;

const MAX_GENERATION_ATTEMPTS: usize = 8;

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TopologyError {
    /// Requested name absent from the catalog; nothing is installed.
    #[error("topology '{0}' is not in the catalog")]
    MissingTopology(String),
    /// Every generation attempt violated the connectivity invariant.
    #[error("topology generation failed after {attempts} attempts")]
    GenerationFailed { attempts: usize },
}

// ─── Seeding ─────────────────────────────────────────────────────────────────

/// Play-through seed: wall-clock nanos mixed with a random salt. Never a
/// hardcoded constant; tests construct their own rng from a fixed seed.
pub fn seed_from_entropy() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ rand::random::<u64>()
}

// ─── Layered mesh ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayeredMeshConfig {
    pub lanes: usize,
    pub layers: usize,
    /// Positional jitter radius applied per node.
    pub position_jitter: f64,
    /// Probability of a cross-lane edge between adjacent lanes per layer.
    pub cross_lane_prob: f64,
    /// Probability of a long skip connection (layer l to l+2) per lane.
    pub skip_prob: f64,
}

impl Default for LayeredMeshConfig {
    fn default() -> Self {
        Self {
            lanes: 3,
            layers: 5,
            position_jitter: 18.0,
            cross_lane_prob: 0.35,
            skip_prob: 0.15,
        }
    }
}

/// Layered-mesh synthesis: one node per (lane, layer) with jittered
/// placement, lane-wise forward edges, probabilistic cross-lane mesh edges,
/// occasional skip connections, single source and goal.
pub fn generate_layered_mesh<R: Rng>(
    cfg: &LayeredMeshConfig,
    rng: &mut R,
) -> Result<Graph, TopologyError> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let graph = build_layered_mesh(cfg, rng);
        match finalize(graph, rng) {
            Some(g) => return Ok(g),
            None => warn!("layered-mesh attempt {attempt} violated connectivity, regenerating"),
        }
    }
    Err(TopologyError::GenerationFailed {
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}

fn build_layered_mesh<R: Rng>(cfg: &LayeredMeshConfig, rng: &mut R) -> Graph {
    let lanes = cfg.lanes.max(1);
    let layers = cfg.layers.max(2);

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    let source: NodeId = 0;
    let goal: NodeId = 1 + (lanes * layers) as NodeId;
    let grid_id = |lane: usize, layer: usize| -> NodeId { 1 + (layer * lanes + lane) as NodeId };

    let x_step = VIEWPORT_WIDTH / (layers + 1) as f64;
    let y_step = VIEWPORT_HEIGHT / (lanes + 1) as f64;

    nodes.push(Node {
        id: source,
        x: 0.0,
        y: VIEWPORT_HEIGHT / 2.0,
        kind: NodeKind::Normal,
    });
    for layer in 0..layers {
        for lane in 0..lanes {
            let jx = rng.gen_range(-cfg.position_jitter..=cfg.position_jitter);
            let jy = rng.gen_range(-cfg.position_jitter..=cfg.position_jitter);
            nodes.push(Node {
                id: grid_id(lane, layer),
                x: (layer + 1) as f64 * x_step + jx,
                y: (lane + 1) as f64 * y_step + jy,
                kind: NodeKind::Normal,
            });
        }
    }
    nodes.push(Node {
        id: goal,
        x: VIEWPORT_WIDTH,
        y: VIEWPORT_HEIGHT / 2.0,
        kind: NodeKind::Normal,
    });

    // Source fans out to the whole first layer; last layer converges on goal.
    for lane in 0..lanes {
        edges.push(Edge(source, grid_id(lane, 0)));
        edges.push(Edge(grid_id(lane, layers - 1), goal));
    }

    for layer in 0..layers {
        for lane in 0..lanes {
            // Lane-wise forward edge.
            if layer + 1 < layers {
                edges.push(Edge(grid_id(lane, layer), grid_id(lane, layer + 1)));
                // Diagonal cross-lane forward edges form the mesh.
                if lane + 1 < lanes && rng.gen_bool(cfg.cross_lane_prob) {
                    edges.push(Edge(grid_id(lane, layer), grid_id(lane + 1, layer + 1)));
                }
                if lane > 0 && rng.gen_bool(cfg.cross_lane_prob) {
                    edges.push(Edge(grid_id(lane, layer), grid_id(lane - 1, layer + 1)));
                }
            }
            // Within-layer rungs between adjacent lanes.
            if lane + 1 < lanes && rng.gen_bool(cfg.cross_lane_prob) {
                edges.push(Edge(grid_id(lane, layer), grid_id(lane + 1, layer)));
            }
            // Occasional long skip connection.
            if layer + 2 < layers && rng.gen_bool(cfg.skip_prob) {
                edges.push(Edge(grid_id(lane, layer), grid_id(lane, layer + 2)));
            }
        }
    }

    Graph::new(nodes, edges, vec![source], vec![goal], vec![])
}

// ─── Parametrized grid ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GridStyle {
    /// Few wide layers, fully connected: the shortest honest route.
    Direct,
    /// Many narrow layers, sparse fan-out, heavy jitter.
    Evasive,
    /// Wide layers with generous fan-out for lateral movement.
    Spread,
    /// Middle-of-the-road preset.
    Balanced,
}

struct GridPreset {
    layers: usize,
    nodes_per_layer: usize,
    randomness: f64,
}

impl GridStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "direct" => Some(Self::Direct),
            "evasive" => Some(Self::Evasive),
            "spread" => Some(Self::Spread),
            "balanced" => Some(Self::Balanced),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Evasive => "evasive",
            Self::Spread => "spread",
            Self::Balanced => "balanced",
        }
    }

    fn preset(&self) -> GridPreset {
        match self {
            Self::Direct => GridPreset { layers: 4, nodes_per_layer: 2, randomness: 0.2 },
            Self::Evasive => GridPreset { layers: 6, nodes_per_layer: 4, randomness: 0.8 },
            Self::Spread => GridPreset { layers: 5, nodes_per_layer: 5, randomness: 0.6 },
            Self::Balanced => GridPreset { layers: 5, nodes_per_layer: 3, randomness: 0.5 },
        }
    }
}

/// Parametrized-grid synthesis: layered grid whose edge density and
/// positional jitter scale with the style's randomness coefficient.
/// `direct` fully connects adjacent layers; the other styles use partial
/// random fan-out with guaranteed in-degree >= 1 per node.
pub fn generate_grid<R: Rng>(style: GridStyle, rng: &mut R) -> Result<Graph, TopologyError> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let graph = build_grid(style, rng);
        match finalize(graph, rng) {
            Some(g) => return Ok(g),
            None => warn!(
                "grid '{}' attempt {attempt} violated connectivity, regenerating",
                style.name()
            ),
        }
    }
    Err(TopologyError::GenerationFailed {
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}

fn build_grid<R: Rng>(style: GridStyle, rng: &mut R) -> Graph {
    let preset = style.preset();
    let layers = preset.layers;
    let per_layer = preset.nodes_per_layer;
    let jitter = 30.0 * preset.randomness;

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    let source: NodeId = 0;
    let goal: NodeId = 1 + (layers * per_layer) as NodeId;
    let grid_id = |layer: usize, slot: usize| -> NodeId { 1 + (layer * per_layer + slot) as NodeId };

    let x_step = VIEWPORT_WIDTH / (layers + 1) as f64;
    let y_step = VIEWPORT_HEIGHT / (per_layer + 1) as f64;

    nodes.push(Node { id: source, x: 0.0, y: VIEWPORT_HEIGHT / 2.0, kind: NodeKind::Normal });
    for layer in 0..layers {
        for slot in 0..per_layer {
            let jx = if jitter > 0.0 { rng.gen_range(-jitter..=jitter) } else { 0.0 };
            let jy = if jitter > 0.0 { rng.gen_range(-jitter..=jitter) } else { 0.0 };
            nodes.push(Node {
                id: grid_id(layer, slot),
                x: (layer + 1) as f64 * x_step + jx,
                y: (slot + 1) as f64 * y_step + jy,
                kind: NodeKind::Normal,
            });
        }
    }
    nodes.push(Node { id: goal, x: VIEWPORT_WIDTH, y: VIEWPORT_HEIGHT / 2.0, kind: NodeKind::Normal });

    for slot in 0..per_layer {
        edges.push(Edge(source, grid_id(0, slot)));
        edges.push(Edge(grid_id(layers - 1, slot), goal));
    }

    // Extra fan-out probability grows with the randomness coefficient.
    let fan_out_prob = (0.2 + 0.5 * preset.randomness).min(0.9);

    for layer in 0..layers.saturating_sub(1) {
        if style == GridStyle::Direct {
            // Fully connected layer to layer.
            for a in 0..per_layer {
                for b in 0..per_layer {
                    edges.push(Edge(grid_id(layer, a), grid_id(layer + 1, b)));
                }
            }
        } else {
            // Guaranteed in-degree >= 1 for every next-layer node.
            for b in 0..per_layer {
                let a = rng.gen_range(0..per_layer);
                edges.push(Edge(grid_id(layer, a), grid_id(layer + 1, b)));
            }
            // Guaranteed fan-out >= 1 for every current-layer node, plus
            // probabilistic extras.
            for a in 0..per_layer {
                let forced = rng.gen_range(0..per_layer);
                edges.push(Edge(grid_id(layer, a), grid_id(layer + 1, forced)));
                for extra in 0..per_layer {
                    if rng.gen_bool(fan_out_prob) {
                        edges.push(Edge(grid_id(layer, a), grid_id(layer + 1, extra)));
                    }
                }
            }
        }
    }

    Graph::new(nodes, edges, vec![source], vec![goal], vec![])
}

// ─── Finalization ────────────────────────────────────────────────────────────

/// Shared post-pass: reject disconnected graphs, reclassify chokepoints from
/// the finished topology, re-center into the canonical viewport.
fn finalize<R: Rng>(graph: Graph, rng: &mut R) -> Option<Graph> {
    if !graph.is_well_formed() {
        return None;
    }
    let spec = graph.to_spec();
    let mut nodes = spec.nodes;
    recenter(&mut nodes);
    let mut graph = Graph::new(nodes, spec.edges, spec.sources, spec.goals, vec![]);
    let sources = graph.sources().to_vec();
    let goals = graph.goals().to_vec();
    // Sorted install: set iteration order is per-instance, and the
    // serialized chokepoint list must be reproducible from the seed.
    let mut chokes: Vec<NodeId> =
        chokepoints::classify(&graph, &sources, &goals, chokepoints::DEFAULT_SAMPLE_COUNT, rng)
            .into_iter()
            .collect();
    chokes.sort_unstable();
    graph.set_chokepoints(chokes);
    Some(graph)
}

/// Scale and translate node coordinates into the canonical viewport,
/// preserving aspect inside the margin.
fn recenter(nodes: &mut [Node]) {
    if nodes.is_empty() {
        return;
    }
    let min_x = nodes.iter().map(|n| n.x).fold(f64::INFINITY, f64::min);
    let max_x = nodes.iter().map(|n| n.x).fold(f64::NEG_INFINITY, f64::max);
    let min_y = nodes.iter().map(|n| n.y).fold(f64::INFINITY, f64::min);
    let max_y = nodes.iter().map(|n| n.y).fold(f64::NEG_INFINITY, f64::max);

    let span_x = (max_x - min_x).max(1.0);
    let span_y = (max_y - min_y).max(1.0);
    let usable_w = VIEWPORT_WIDTH - 2.0 * VIEWPORT_MARGIN;
    let usable_h = VIEWPORT_HEIGHT - 2.0 * VIEWPORT_MARGIN;

    for node in nodes.iter_mut() {
        node.x = VIEWPORT_MARGIN + (node.x - min_x) / span_x * usable_w;
        node.y = VIEWPORT_MARGIN + (node.y - min_y) / span_y * usable_h;
    }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// Names resolvable through `load`.
pub fn catalog_names() -> &'static [&'static str] {
    &[
        "crossroads",
        "gauntlet",
        "mesh",
        "direct",
        "evasive",
        "spread",
        "balanced",
    ]
}

/// Resolve a catalog name into a finished, classified graph. A missing name
/// is a load failure; no partial graph is ever installed.
pub fn load<R: Rng>(name: &str, rng: &mut R) -> Result<Graph, TopologyError> {
    if let Some(style) = GridStyle::from_name(name) {
        return generate_grid(style, rng);
    }
    match name {
        "mesh" => generate_layered_mesh(&LayeredMeshConfig::default(), rng),
        "crossroads" => finalize(crossroads(), rng)
            .ok_or(TopologyError::GenerationFailed { attempts: 1 }),
        "gauntlet" => finalize(gauntlet(), rng)
            .ok_or(TopologyError::GenerationFailed { attempts: 1 }),
        other => Err(TopologyError::MissingTopology(other.to_string())),
    }
}

/// Hand-built classic: two sources funneled through a central hub toward two
/// goals, with a slow perimeter route around it.
fn crossroads() -> Graph {
    let n = |id: NodeId, x: f64, y: f64| Node { id, x, y, kind: NodeKind::Normal };
    Graph::new(
        vec![
            n(0, 0.0, 150.0),
            n(1, 0.0, 450.0),
            n(2, 250.0, 300.0),
            n(3, 480.0, 300.0), // hub
            n(4, 480.0, 80.0),  // perimeter north
            n(5, 480.0, 520.0), // perimeter south
            n(6, 710.0, 300.0),
            n(7, 960.0, 150.0),
            n(8, 960.0, 450.0),
        ],
        vec![
            Edge(0, 2),
            Edge(1, 2),
            Edge(2, 3),
            Edge(2, 4),
            Edge(2, 5),
            Edge(3, 6),
            Edge(4, 6),
            Edge(5, 6),
            Edge(6, 7),
            Edge(6, 8),
        ],
        vec![0, 1],
        vec![7, 8],
        vec![],
    )
}

/// Hand-built classic: a serpentine two-lane corridor.
fn gauntlet() -> Graph {
    let n = |id: NodeId, x: f64, y: f64| Node { id, x, y, kind: NodeKind::Normal };
    Graph::new(
        vec![
            n(0, 0.0, 300.0),
            n(1, 160.0, 140.0),
            n(2, 160.0, 460.0),
            n(3, 360.0, 140.0),
            n(4, 360.0, 460.0),
            n(5, 560.0, 300.0),
            n(6, 760.0, 140.0),
            n(7, 760.0, 460.0),
            n(8, 960.0, 300.0),
        ],
        vec![
            Edge(0, 1),
            Edge(0, 2),
            Edge(1, 3),
            Edge(2, 4),
            Edge(1, 2),
            Edge(3, 5),
            Edge(4, 5),
            Edge(5, 6),
            Edge(5, 7),
            Edge(6, 8),
            Edge(7, 8),
        ],
        vec![0],
        vec![8],
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_layered_mesh_is_well_formed() {
        let mut rng = ChaCha8Rng::seed_from_u64(100);
        let g = generate_layered_mesh(&LayeredMeshConfig::default(), &mut rng).unwrap();
        assert!(g.is_well_formed());
        assert_eq!(g.sources().len(), 1);
        assert_eq!(g.goals().len(), 1);
    }

    #[test]
    fn test_layered_mesh_reproducible_from_seed() {
        let cfg = LayeredMeshConfig::default();
        let mut a = ChaCha8Rng::seed_from_u64(77);
        let mut b = ChaCha8Rng::seed_from_u64(77);
        let g1 = generate_layered_mesh(&cfg, &mut a).unwrap();
        let g2 = generate_layered_mesh(&cfg, &mut b).unwrap();
        assert_eq!(g1.nodes(), g2.nodes());
        assert_eq!(g1.edges(), g2.edges());
        assert_eq!(g1.chokepoints(), g2.chokepoints());
    }

    #[test]
    fn test_same_seed_serializes_identically() {
        // Byte-for-byte wire equality, chokepoint ordering included.
        let cfg = LayeredMeshConfig::default();
        let mut a = ChaCha8Rng::seed_from_u64(31);
        let mut b = ChaCha8Rng::seed_from_u64(31);
        let g1 = generate_layered_mesh(&cfg, &mut a).unwrap();
        let g2 = generate_layered_mesh(&cfg, &mut b).unwrap();
        assert_eq!(g1.to_json().unwrap(), g2.to_json().unwrap());
    }

    #[test]
    fn test_every_grid_style_generates() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for style in [GridStyle::Direct, GridStyle::Evasive, GridStyle::Spread, GridStyle::Balanced] {
            let g = generate_grid(style, &mut rng).unwrap();
            assert!(g.is_well_formed(), "style {} not well formed", style.name());
        }
    }

    #[test]
    fn test_nodes_recentered_into_viewport() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let g = generate_grid(GridStyle::Evasive, &mut rng).unwrap();
        for node in g.nodes() {
            assert!(node.x >= 0.0 && node.x <= VIEWPORT_WIDTH, "x out of viewport: {}", node.x);
            assert!(node.y >= 0.0 && node.y <= VIEWPORT_HEIGHT, "y out of viewport: {}", node.y);
        }
    }

    #[test]
    fn test_missing_topology_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        match load("no-such-map", &mut rng) {
            Err(TopologyError::MissingTopology(name)) => assert_eq!(name, "no-such-map"),
            other => panic!("expected MissingTopology, got {:?}", other.map(|g| g.nodes().len())),
        }
    }

    #[test]
    fn test_catalog_names_all_load() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for name in catalog_names() {
            let g = load(name, &mut rng).unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(g.is_well_formed(), "{name} not well formed");
        }
    }

    #[test]
    fn test_crossroads_hub_classified_post_hoc() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let g = load("crossroads", &mut rng).unwrap();
        // The central funnel node 2 has degree 4 and sits on every route.
        assert!(g.chokepoints().contains(&2));
    }
}
