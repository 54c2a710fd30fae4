// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Reactive Counter Strategy
//
// Heuristic counter-play: bucket the defender's tower ratios into an
// archetype, answer with a hardcoded counter-distribution, and aim spawns at
// the two least-covered candidate paths. Every few waves the strategy
// requests a topology rotation chosen uniformly at random — a discrete
// strategic shock, not a smooth adaptation.

use log::info;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::strategy::{
    classify_posture, path_coverage, Analysis, AttackStrategy, PathReport, SpawnPolicy,
    StrategyContext,
};
use crate::topology;
use crate::types::{DefenseSnapshot, EnemyType, TowerKind};

/// Rolling archetype history window.
const HISTORY_WINDOW: usize = 10;
/// Waves between topology-shock requests.
const DEFAULT_SWITCH_EVERY: u32 = 5;
/// Cap applied to the reported defense value.
const DEFENSE_VALUE_CAP: f64 = 1000.0;

// ─── Archetype ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Archetype {
    DominantFirewall,
    DominantScanner,
    Sparse,
    Balanced,
}

impl Archetype {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DominantFirewall => "dominant-firewall",
            Self::DominantScanner => "dominant-scanner",
            Self::Sparse => "sparse",
            Self::Balanced => "balanced",
        }
    }

    /// Hardcoded counter-distribution per archetype.
    pub fn counter_mix(&self) -> Vec<(EnemyType, f64)> {
        match self {
            // Firewalls melt slow targets; flood them with fast movers.
            Self::DominantFirewall => vec![
                (EnemyType::Worm, 0.6),
                (EnemyType::Trojan, 0.1),
                (EnemyType::Swarm, 0.3),
            ],
            // Scanners counter stealth; send raw numbers instead.
            Self::DominantScanner => vec![
                (EnemyType::Worm, 0.3),
                (EnemyType::Trojan, 0.1),
                (EnemyType::Swarm, 0.6),
            ],
            // Thin defense: armored units push straight through.
            Self::Sparse => vec![
                (EnemyType::Worm, 0.2),
                (EnemyType::Trojan, 0.6),
                (EnemyType::Swarm, 0.2),
            ],
            Self::Balanced => vec![
                (EnemyType::Worm, 0.34),
                (EnemyType::Trojan, 0.33),
                (EnemyType::Swarm, 0.33),
            ],
        }
    }
}

/// Ratio thresholds for archetype bucketing.
const DOMINANCE_RATIO: f64 = 0.6;
const SPARSE_TOWER_COUNT: usize = 3;
const SPARSE_TOTAL_DAMAGE: f64 = 20.0;

pub fn classify_archetype(snapshot: &DefenseSnapshot) -> Archetype {
    let combat = snapshot.count_of(TowerKind::Firewall) + snapshot.count_of(TowerKind::Scanner);
    if combat < SPARSE_TOWER_COUNT || snapshot.total_damage() < SPARSE_TOTAL_DAMAGE {
        return Archetype::Sparse;
    }
    let fw = snapshot.ratio_of(TowerKind::Firewall);
    let scan = snapshot.ratio_of(TowerKind::Scanner);
    if fw >= DOMINANCE_RATIO {
        Archetype::DominantFirewall
    } else if scan >= DOMINANCE_RATIO {
        Archetype::DominantScanner
    } else {
        Archetype::Balanced
    }
}

// ─── ReactiveCounterAI ───────────────────────────────────────────────────────

pub struct ReactiveCounterAI {
    history: Vec<Archetype>,
    waves_seen: u32,
    switch_every: u32,
    current_topology: String,
    pending_switch: Option<(String, String)>,
}

impl ReactiveCounterAI {
    pub fn new(current_topology: &str) -> Self {
        Self {
            history: Vec::with_capacity(HISTORY_WINDOW),
            waves_seen: 0,
            switch_every: DEFAULT_SWITCH_EVERY,
            current_topology: current_topology.to_string(),
            pending_switch: None,
        }
    }

    /// Most frequent archetype in the rolling window; falls back to the
    /// latest observation.
    fn consensus_archetype(&self) -> Archetype {
        let mut best = match self.history.last() {
            Some(&a) => a,
            None => Archetype::Balanced,
        };
        let mut best_count = 0;
        for &candidate in &self.history {
            let count = self.history.iter().filter(|&&a| a == candidate).count();
            if count > best_count {
                best_count = count;
                best = candidate;
            }
        }
        best
    }

    fn push_history(&mut self, archetype: Archetype) {
        self.history.push(archetype);
        if self.history.len() > HISTORY_WINDOW {
            self.history.remove(0);
        }
    }

    fn maybe_request_switch(&mut self, rng: &mut ChaCha8Rng) {
        if self.waves_seen == 0 || self.waves_seen % self.switch_every != 0 {
            return;
        }
        if self.pending_switch.is_some() {
            return;
        }
        let candidates: Vec<&&str> = topology::catalog_names()
            .iter()
            .filter(|&&n| n != self.current_topology)
            .collect();
        if let Some(&&target) = candidates.choose(rng) {
            let reasoning = format!(
                "rotating off '{}' after {} waves to reset defender positioning",
                self.current_topology, self.waves_seen
            );
            info!("reactive strategy requests topology switch to '{target}'");
            self.pending_switch = Some((target.to_string(), reasoning));
        }
    }
}

impl AttackStrategy for ReactiveCounterAI {
    fn name(&self) -> &'static str {
        "reactive-counter"
    }

    fn observe(&mut self, ctx: &StrategyContext<'_>, _rng: &mut ChaCha8Rng) -> Analysis {
        let archetype = classify_archetype(ctx.snapshot);
        self.push_history(archetype);

        let path_reports: Vec<PathReport> = ctx
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let node_dps: Vec<f64> = path
                    .iter()
                    .filter_map(|&id| ctx.graph.position(id))
                    .map(|(x, y)| ctx.snapshot.dps_at(x, y))
                    .collect();
                let weakest_node = node_dps
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .and_then(|(idx, _)| path.get(idx).copied());
                PathReport {
                    path_index: i,
                    total_dps: path_coverage(ctx.graph, path, ctx.snapshot),
                    node_dps,
                    weakest_node,
                    priority: 0.0,
                    spawn_rate: 1.0,
                    enemy_mix: Vec::new(),
                }
            })
            .collect();

        let defense_value: f64 = path_reports
            .iter()
            .map(|r| r.total_dps)
            .sum::<f64>()
            .min(DEFENSE_VALUE_CAP);

        Analysis {
            posture: classify_posture(ctx.snapshot),
            path_reports,
            defense_value,
            attacker_value: 0.0,
            summary: format!("archetype={}", archetype.label()),
        }
    }

    fn propose(&mut self, analysis: &Analysis, rng: &mut ChaCha8Rng) -> SpawnPolicy {
        self.waves_seen += 1;
        self.maybe_request_switch(rng);

        // The two lowest-coverage paths, least covered first.
        let mut ranked: Vec<(usize, f64)> = analysis
            .path_reports
            .iter()
            .map(|r| (r.path_index, r.total_dps))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let path_preferences: Vec<usize> = ranked.iter().take(2).map(|&(i, _)| i).collect();

        SpawnPolicy {
            enemy_mix: self.consensus_archetype().counter_mix(),
            path_preferences,
        }
    }

    fn take_topology_request(&mut self) -> Option<(String, String)> {
        self.pending_switch.take()
    }

    // Rotation landed: future shock requests exclude the new current map.
    fn topology_changed(&mut self, name: &str) {
        self.current_topology = name.to_string();
        self.waves_seen = 0;
    }
}
