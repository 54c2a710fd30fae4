// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Q-Learning Strategy
//
// Tabular Q-learning over a discretized composite state. The table persists
// across sessions through an external key-value store; a missing or corrupt
// blob falls back to a fresh table and is never surfaced as an error.

use std::collections::HashMap;

use log::{debug, warn};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::strategy::{
    classify_posture, path_coverage, Analysis, AttackStrategy, PathReport, SpawnPolicy,
    StrategyContext,
};
use crate::types::EnemyType;

pub const ALPHA: f64 = 0.1;
pub const GAMMA: f64 = 0.9;
pub const INITIAL_EXPLORATION: f64 = 0.3;
/// Multiplicative exploration decay applied on each successful reload.
const EXPLORATION_DECAY: f64 = 0.95;
const EXPLORATION_FLOOR: f64 = 0.05;
/// Upper bound for lazily-initialized optimistic Q values.
const OPTIMISTIC_INIT: f64 = 0.1;

// ─── State buckets ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBucket {
    Low,
    Medium,
    High,
}

impl ResourceBucket {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    pub fn from_resources(resources: f64) -> Self {
        if resources < 40.0 {
            Self::Low
        } else if resources < 120.0 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DensityBucket {
    Sparse,
    Moderate,
    Dense,
}

impl DensityBucket {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Sparse => "SPARSE",
            Self::Moderate => "MODERATE",
            Self::Dense => "DENSE",
        }
    }

    /// Chokepoint share of all nodes.
    pub fn from_graph(chokepoints: usize, nodes: usize) -> Self {
        if nodes == 0 {
            return Self::Sparse;
        }
        let density = chokepoints as f64 / nodes as f64;
        if density < 0.1 {
            Self::Sparse
        } else if density < 0.25 {
            Self::Moderate
        } else {
            Self::Dense
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceBucket {
    AttackerStrong,
    DefenderStrong,
    Even,
}

impl PerformanceBucket {
    pub fn key(&self) -> &'static str {
        match self {
            Self::AttackerStrong => "ATTACKER_STRONG",
            Self::DefenderStrong => "DEFENDER_STRONG",
            Self::Even => "EVEN",
        }
    }

    pub fn from_counts(leaked: u32, blocked: u32) -> Self {
        if leaked > blocked + 2 {
            Self::AttackerStrong
        } else if blocked > leaked + 2 {
            Self::DefenderStrong
        } else {
            Self::Even
        }
    }
}

/// Composite state key: the literal `_`-joined concatenation of the four
/// bucket keys (the tower-ratio bucket reuses the posture key).
pub fn composite_key(
    resources: ResourceBucket,
    density: DensityBucket,
    ratio_key: &str,
    performance: PerformanceBucket,
) -> String {
    format!(
        "{}_{}_{}_{}",
        resources.key(),
        density.key(),
        ratio_key,
        performance.key()
    )
}

// ─── Actions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Aggressive,
    Balanced,
    Defensive,
}

impl Action {
    pub const ALL: [Action; 3] = [Self::Aggressive, Self::Balanced, Self::Defensive];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Aggressive => "aggressive",
            Self::Balanced => "balanced",
            Self::Defensive => "defensive",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.key() == key)
    }

    /// Fixed enemy-type distribution bound to the action.
    pub fn mix(&self) -> Vec<(EnemyType, f64)> {
        match self {
            Self::Aggressive => vec![
                (EnemyType::Worm, 0.5),
                (EnemyType::Trojan, 0.3),
                (EnemyType::Swarm, 0.2),
            ],
            Self::Balanced => vec![
                (EnemyType::Worm, 0.34),
                (EnemyType::Trojan, 0.33),
                (EnemyType::Swarm, 0.33),
            ],
            Self::Defensive => vec![
                (EnemyType::Worm, 0.2),
                (EnemyType::Trojan, 0.2),
                (EnemyType::Swarm, 0.6),
            ],
        }
    }
}

// ─── Persistence ─────────────────────────────────────────────────────────────

/// External key-value collaborator for the persisted table.
pub trait LearningStore {
    fn save(&mut self, blob: &str);
    fn load(&self) -> Option<String>;
}

/// In-memory store; the production host wires a real one.
#[derive(Default)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl LearningStore for MemoryStore {
    fn save(&mut self, blob: &str) {
        self.blob = Some(blob.to_string());
    }

    fn load(&self) -> Option<String> {
        self.blob.clone()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct QTableBlob {
    table: HashMap<String, HashMap<String, f64>>,
    episode_count: u64,
    exploration_rate: f64,
}

// ─── LearningAI ──────────────────────────────────────────────────────────────

pub struct LearningAI {
    table: HashMap<String, HashMap<String, f64>>,
    pub alpha: f64,
    pub gamma: f64,
    exploration_rate: f64,
    episode_count: u64,
    last_state: Option<String>,
    last_action: Option<Action>,
    // Counters at the previous reinforce call, for delta rewards.
    seen_leaked: u32,
    seen_blocked: u32,
}

impl Default for LearningAI {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningAI {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
            alpha: ALPHA,
            gamma: GAMMA,
            exploration_rate: INITIAL_EXPLORATION,
            episode_count: 0,
            last_state: None,
            last_action: None,
            seen_leaked: 0,
            seen_blocked: 0,
        }
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn episode_count(&self) -> u64 {
        self.episode_count
    }

    pub fn q_value(&self, state: &str, action: Action) -> Option<f64> {
        self.table.get(state).and_then(|a| a.get(action.key())).copied()
    }

    /// Unseen states start with small random optimistic values.
    fn ensure_state<R: Rng>(&mut self, state: &str, rng: &mut R) {
        if self.table.contains_key(state) {
            return;
        }
        let actions = Action::ALL
            .iter()
            .map(|a| (a.key().to_string(), rng.gen_range(0.0..OPTIMISTIC_INIT)))
            .collect();
        self.table.insert(state.to_string(), actions);
    }

    fn best_value(&self, state: &str) -> f64 {
        self.table
            .get(state)
            .map(|actions| actions.values().copied().fold(f64::NEG_INFINITY, f64::max))
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    fn best_action(&self, state: &str) -> Action {
        self.table
            .get(state)
            .and_then(|actions| {
                actions
                    .iter()
                    .max_by(|a, b| a.1.total_cmp(b.1))
                    .and_then(|(key, _)| Action::from_key(key))
            })
            .unwrap_or(Action::Balanced)
    }

    /// ε-greedy selection.
    pub fn select_action<R: Rng>(&mut self, state: &str, rng: &mut R) -> Action {
        self.ensure_state(state, rng);
        if rng.gen_bool(self.exploration_rate.clamp(0.0, 1.0)) {
            Action::ALL[rng.gen_range(0..Action::ALL.len())]
        } else {
            self.best_action(state)
        }
    }

    /// `Q(s,a) <- Q(s,a) + alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))`.
    pub fn update<R: Rng>(
        &mut self,
        state: &str,
        action: Action,
        reward: f64,
        next_state: &str,
        rng: &mut R,
    ) {
        self.ensure_state(state, rng);
        self.ensure_state(next_state, rng);
        let next_best = self.best_value(next_state);
        if let Some(actions) = self.table.get_mut(state) {
            let q = actions.entry(action.key().to_string()).or_insert(0.0);
            *q += self.alpha * (reward + self.gamma * next_best - *q);
        }
    }

    /// Reward signal from wave deltas:
    /// `leaked*10 - blocked*5 + 25 if pool depleted - 15 if pool excessive`.
    pub fn reward(leaked: u32, blocked: u32, resources: f64) -> f64 {
        let mut r = leaked as f64 * 10.0 - blocked as f64 * 5.0;
        if resources <= 10.0 {
            r += 25.0;
        }
        if resources >= 200.0 {
            r -= 15.0;
        }
        r
    }

    // ─── Persistence ─────────────────────────────────────────────────────────

    pub fn save_to(&self, store: &mut dyn LearningStore) {
        let blob = QTableBlob {
            table: self.table.clone(),
            episode_count: self.episode_count,
            exploration_rate: self.exploration_rate,
        };
        match serde_json::to_string(&blob) {
            Ok(json) => store.save(&json),
            Err(err) => warn!("q-table serialization failed: {err}"),
        }
    }

    /// Restore from the store. Missing or malformed blobs fall back to a
    /// fresh table; exploration decays multiplicatively on a successful
    /// reload so long-lived tables exploit more.
    pub fn load_from(store: &dyn LearningStore) -> Self {
        let mut ai = Self::new();
        let Some(json) = store.load() else {
            return ai;
        };
        match serde_json::from_str::<QTableBlob>(&json) {
            Ok(blob) => {
                ai.table = blob.table;
                ai.episode_count = blob.episode_count;
                ai.exploration_rate =
                    (blob.exploration_rate * EXPLORATION_DECAY).max(EXPLORATION_FLOOR);
                debug!(
                    "q-table restored: {} states, exploration {:.3}",
                    ai.table.len(),
                    ai.exploration_rate
                );
            }
            Err(err) => {
                warn!("corrupt q-table blob, starting fresh: {err}");
            }
        }
        ai
    }

    fn state_key(&self, ctx: &StrategyContext<'_>) -> String {
        composite_key(
            ResourceBucket::from_resources(ctx.stats.resources),
            DensityBucket::from_graph(ctx.graph.chokepoints().len(), ctx.graph.nodes().len()),
            classify_posture(ctx.snapshot).key(),
            PerformanceBucket::from_counts(ctx.stats.leaked, ctx.stats.blocked),
        )
    }
}

impl AttackStrategy for LearningAI {
    fn name(&self) -> &'static str {
        "q-learning"
    }

    fn observe(&mut self, ctx: &StrategyContext<'_>, rng: &mut ChaCha8Rng) -> Analysis {
        let state = self.state_key(ctx);
        let action = self.select_action(&state, rng);
        self.last_state = Some(state.clone());
        self.last_action = Some(action);

        let path_reports: Vec<PathReport> = ctx
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| PathReport {
                path_index: i,
                total_dps: path_coverage(ctx.graph, path, ctx.snapshot),
                node_dps: Vec::new(),
                weakest_node: None,
                priority: 0.0,
                spawn_rate: 1.0,
                enemy_mix: Vec::new(),
            })
            .collect();

        Analysis {
            posture: classify_posture(ctx.snapshot),
            path_reports,
            defense_value: 0.0,
            attacker_value: 0.0,
            summary: format!("state={state} action={}", action.key()),
        }
    }

    fn propose(&mut self, analysis: &Analysis, _rng: &mut ChaCha8Rng) -> SpawnPolicy {
        let action = self.last_action.unwrap_or(Action::Balanced);
        let mut ranked: Vec<(usize, f64)> = analysis
            .path_reports
            .iter()
            .map(|r| (r.path_index, r.total_dps))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        SpawnPolicy {
            enemy_mix: action.mix(),
            path_preferences: ranked.iter().take(2).map(|&(i, _)| i).collect(),
        }
    }

    /// End-of-wave update: reward from the stats delta since the previous
    /// wave, transitioning toward the freshly observed state.
    fn reinforce(&mut self, ctx: &StrategyContext<'_>, rng: &mut ChaCha8Rng) {
        let leaked = ctx.stats.leaked.saturating_sub(self.seen_leaked);
        let blocked = ctx.stats.blocked.saturating_sub(self.seen_blocked);
        self.seen_leaked = ctx.stats.leaked;
        self.seen_blocked = ctx.stats.blocked;

        let next_state = self.state_key(ctx);
        if let (Some(state), Some(action)) = (self.last_state.clone(), self.last_action) {
            let r = Self::reward(leaked, blocked, ctx.stats.resources);
            self.update(&state, action, r, &next_state, rng);
            self.episode_count += 1;
        }
    }
}
