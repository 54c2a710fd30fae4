// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Attack Strategy Contract

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::graph::{Graph, NodeId};
use crate::types::{DefenseSnapshot, EnemyType, SiegeStats, TowerKind};

/// Tolerance for enemy-mix probability sums.
pub const MIX_EPSILON: f64 = 1e-6;

/// Ratio above which a single combat tower kind dominates the posture.
const POSTURE_DOMINANCE: f64 = 0.55;

// ─── Posture ─────────────────────────────────────────────────────────────────

/// Coarse classification of the defender's tower-type ratio; the "column"
/// of the payoff matrix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Posture {
    FwHeavy = 0,
    ScannerHeavy = 1,
    Balanced = 2,
}

impl Posture {
    pub fn key(&self) -> &'static str {
        match self {
            Self::FwHeavy => "FW_HEAVY",
            Self::ScannerHeavy => "SCANNER_HEAVY",
            Self::Balanced => "BALANCED",
        }
    }
}

pub fn classify_posture(snapshot: &DefenseSnapshot) -> Posture {
    let fw = snapshot.ratio_of(TowerKind::Firewall);
    let scan = snapshot.ratio_of(TowerKind::Scanner);
    if fw > POSTURE_DOMINANCE {
        Posture::FwHeavy
    } else if scan > POSTURE_DOMINANCE {
        Posture::ScannerHeavy
    } else {
        Posture::Balanced
    }
}

// ─── Payoff matrix ───────────────────────────────────────────────────────────

/// Attacker success probability per (enemy type, defender posture).
/// External configuration data with a canonical default table; never
/// derived, learned, or "corrected" at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoffMatrix {
    /// Indexed [FwHeavy, ScannerHeavy, Balanced].
    pub worm: [f64; 3],
    pub trojan: [f64; 3],
    pub swarm: [f64; 3],
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self {
            worm: [0.70, 0.40, 0.55],
            trojan: [0.60, 0.30, 0.50],
            swarm: [0.45, 0.60, 0.50],
        }
    }
}

impl PayoffMatrix {
    pub fn payoff(&self, enemy: EnemyType, posture: Posture) -> f64 {
        let row = match enemy {
            EnemyType::Worm => &self.worm,
            EnemyType::Trojan => &self.trojan,
            EnemyType::Swarm => &self.swarm,
        };
        row[posture as usize]
    }
}

// ─── Analysis ────────────────────────────────────────────────────────────────

/// Per-candidate-path defender exposure, as seen by a strategy.
#[derive(Debug, Clone, Serialize)]
pub struct PathReport {
    pub path_index: usize,
    pub total_dps: f64,
    pub node_dps: Vec<f64>,
    /// Node with the least covering DPS on the path (the defensive gap).
    pub weakest_node: Option<NodeId>,
    pub priority: f64,
    pub spawn_rate: f64,
    pub enemy_mix: Vec<(EnemyType, f64)>,
}

/// Result of one `observe` pass. Reactive and learning strategies fill the
/// coverage fields only; the equilibrium strategy fills everything.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub posture: Posture,
    pub path_reports: Vec<PathReport>,
    /// Capped sum of per-node DPS. A reporting heuristic, not a solved value.
    pub defense_value: f64,
    /// Capped weighted sum of per-path priority x spawn rate. Heuristic.
    pub attacker_value: f64,
    pub summary: String,
}

// ─── Spawn policy ────────────────────────────────────────────────────────────

/// What to send next: an enemy-type distribution (probabilities sum to
/// 1 ± MIX_EPSILON) and an ordered list of preferred candidate-path indices.
#[derive(Debug, Clone, Serialize)]
pub struct SpawnPolicy {
    pub enemy_mix: Vec<(EnemyType, f64)>,
    pub path_preferences: Vec<usize>,
}

impl SpawnPolicy {
    /// Uniform fallback policy.
    pub fn uniform() -> Self {
        let p = 1.0 / EnemyType::ALL.len() as f64;
        Self {
            enemy_mix: EnemyType::ALL.iter().map(|&t| (t, p)).collect(),
            path_preferences: Vec::new(),
        }
    }
}

/// Cumulative-probability weighted sampling over the policy's enemy mix.
pub fn sample_enemy_type<R: Rng>(policy: &SpawnPolicy, rng: &mut R) -> EnemyType {
    let total: f64 = policy.enemy_mix.iter().map(|(_, p)| p).sum();
    if total <= 0.0 || policy.enemy_mix.is_empty() {
        return EnemyType::Swarm;
    }
    let roll = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for &(ty, p) in &policy.enemy_mix {
        cumulative += p;
        if roll < cumulative {
            return ty;
        }
    }
    // Floating-point edge: the roll landed on the far boundary.
    policy.enemy_mix[policy.enemy_mix.len() - 1].0
}

/// Pick a spawn path. Preferred indices are sampled with a strong bias
/// toward the front of the preference list; with no usable preference the
/// choice is uniform over all available paths.
pub fn sample_spawn_path<'a, R: Rng>(
    policy: &SpawnPolicy,
    available: &'a [Vec<NodeId>],
    rng: &mut R,
) -> Option<&'a Vec<NodeId>> {
    if available.is_empty() {
        return None;
    }
    let usable: Vec<usize> = policy
        .path_preferences
        .iter()
        .copied()
        .filter(|&i| i < available.len())
        .collect();
    let index = match usable.len() {
        0 => rng.gen_range(0..available.len()),
        1 => usable[0],
        // 70/30 split between the top two preferences.
        _ => {
            if rng.gen_bool(0.7) {
                usable[0]
            } else {
                usable[1]
            }
        }
    };
    available.get(index)
}

// ─── Coverage ────────────────────────────────────────────────────────────────

/// Path coverage: the sum of every in-range tower's damage value over every
/// node on the path.
pub fn path_coverage(graph: &Graph, path: &[NodeId], snapshot: &DefenseSnapshot) -> f64 {
    path.iter()
        .filter_map(|&id| graph.position(id))
        .map(|(x, y)| snapshot.dps_at(x, y))
        .sum()
}

// ─── Strategy contract ───────────────────────────────────────────────────────

/// Everything a strategy may read during one observe/propose cycle. The
/// snapshot is read-only telemetry owned by the session.
pub struct StrategyContext<'a> {
    pub snapshot: &'a DefenseSnapshot,
    pub graph: &'a Graph,
    pub paths: &'a [Vec<NodeId>],
    pub stats: &'a SiegeStats,
}

pub trait AttackStrategy {
    fn name(&self) -> &'static str;

    /// Digest defender telemetry into an analysis.
    fn observe(&mut self, ctx: &StrategyContext<'_>, rng: &mut ChaCha8Rng) -> Analysis;

    /// Turn the latest analysis into a spawn policy.
    fn propose(&mut self, analysis: &Analysis, rng: &mut ChaCha8Rng) -> SpawnPolicy;

    /// End-of-wave feedback hook; only the learning strategy uses it.
    fn reinforce(&mut self, _ctx: &StrategyContext<'_>, _rng: &mut ChaCha8Rng) {}

    /// A pending request to rotate topology: `(target, reasoning)`.
    /// Only the reactive strategy ever produces one.
    fn take_topology_request(&mut self) -> Option<(String, String)> {
        None
    }

    /// Called by the session after a topology rotation lands.
    fn topology_changed(&mut self, _name: &str) {}
}
