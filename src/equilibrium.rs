// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Equilibrium Approximation
//
// One-shot leader/follower game approximation over a locked defender
// snapshot. The defender commits first; the attacker best-responds through
// a fixed payoff table weighted by path exposure. The reported "defense
// value" and "attacker value" are capped scoring formulas, kept exactly as
// specified; they are not the output of a solved zero-sum game.

use rand_chacha::ChaCha8Rng;

use crate::strategy::{
    classify_posture, Analysis, AttackStrategy, PathReport, PayoffMatrix, SpawnPolicy,
    StrategyContext,
};
use crate::types::EnemyType;

/// Cap on the reported defense value.
const DEFENSE_VALUE_CAP: f64 = 1000.0;
/// Cap on the reported attacker value.
const ATTACKER_VALUE_CAP: f64 = 10.0;
/// Spawn-rate band; the weakest path gets the top of the band.
const SPAWN_RATE_MIN: f64 = 0.5;
const SPAWN_RATE_SPAN: f64 = 1.5;

pub struct EquilibriumAI {
    payoff: PayoffMatrix,
    last_analysis: Option<Analysis>,
}

impl EquilibriumAI {
    pub fn new(payoff: PayoffMatrix) -> Self {
        Self { payoff, last_analysis: None }
    }

    pub fn last_analysis(&self) -> Option<&Analysis> {
        self.last_analysis.as_ref()
    }

    /// Step 3: per-path enemy mix, each type weighted by
    /// `payoff(type, posture) x (100 / (path_total_dps + 1))`, normalized.
    fn path_mix(
        &self,
        posture: crate::strategy::Posture,
        total_dps: f64,
    ) -> Vec<(EnemyType, f64)> {
        let exposure = 100.0 / (total_dps + 1.0);
        let weights: Vec<(EnemyType, f64)> = EnemyType::ALL
            .iter()
            .map(|&ty| (ty, self.payoff.payoff(ty, posture) * exposure))
            .collect();
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return SpawnPolicy::uniform().enemy_mix;
        }
        weights.into_iter().map(|(ty, w)| (ty, w / total)).collect()
    }
}

impl AttackStrategy for EquilibriumAI {
    fn name(&self) -> &'static str {
        "equilibrium"
    }

    fn observe(&mut self, ctx: &StrategyContext<'_>, _rng: &mut ChaCha8Rng) -> Analysis {
        // Step 1: node-level DPS from the committed snapshot, overall posture.
        let posture = classify_posture(ctx.snapshot);
        let total_node_dps: f64 = ctx
            .graph
            .nodes()
            .iter()
            .map(|n| ctx.snapshot.dps_at(n.x, n.y))
            .sum();

        // Step 2: per-path totals, per-node DPS, weakest node, ranking.
        let mut path_reports: Vec<PathReport> = ctx
            .paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let node_dps: Vec<f64> = path
                    .iter()
                    .filter_map(|&id| ctx.graph.position(id))
                    .map(|(x, y)| ctx.snapshot.dps_at(x, y))
                    .collect();
                let total_dps: f64 = node_dps.iter().sum();
                let weakest_node = node_dps
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1.total_cmp(b.1))
                    .and_then(|(idx, _)| path.get(idx).copied());
                PathReport {
                    path_index: i,
                    total_dps,
                    node_dps,
                    weakest_node,
                    priority: 0.0,
                    spawn_rate: SPAWN_RATE_MIN,
                    enemy_mix: Vec::new(),
                }
            })
            .collect();

        // Step 3: priority and spawn rate scale inversely with path damage.
        let priority_total: f64 = path_reports
            .iter()
            .map(|r| 1.0 / (r.total_dps + 1.0))
            .sum();
        for report in path_reports.iter_mut() {
            let raw = 1.0 / (report.total_dps + 1.0);
            report.priority = if priority_total > 0.0 { raw / priority_total } else { 0.0 };
            let max_raw = 1.0; // raw is <= 1 since total_dps >= 0
            report.spawn_rate = SPAWN_RATE_MIN + SPAWN_RATE_SPAN * (raw / max_raw);
            report.enemy_mix = self.path_mix(posture, report.total_dps);
        }

        // Step 4: descriptive utilities, capped.
        let defense_value = total_node_dps.min(DEFENSE_VALUE_CAP);
        let attacker_value = path_reports
            .iter()
            .map(|r| r.priority * r.spawn_rate)
            .sum::<f64>()
            .min(ATTACKER_VALUE_CAP);

        let analysis = Analysis {
            posture,
            path_reports,
            defense_value,
            attacker_value,
            summary: format!("posture={} defense_value={defense_value:.1}", posture.key()),
        };
        self.last_analysis = Some(analysis.clone());
        analysis
    }

    fn propose(&mut self, analysis: &Analysis, _rng: &mut ChaCha8Rng) -> SpawnPolicy {
        // Full ranking, weakest (least defended) path first.
        let mut ranked: Vec<&PathReport> = analysis.path_reports.iter().collect();
        ranked.sort_by(|a, b| a.total_dps.total_cmp(&b.total_dps));

        let enemy_mix = ranked
            .first()
            .map(|r| r.enemy_mix.clone())
            .filter(|mix| !mix.is_empty())
            .unwrap_or_else(|| SpawnPolicy::uniform().enemy_mix);

        SpawnPolicy {
            enemy_mix,
            path_preferences: ranked.iter().map(|r| r.path_index).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Graph, Node, NodeKind};
    use crate::strategy::{Posture, MIX_EPSILON};
    use crate::types::{DefenseSnapshot, SiegeStats, TowerKind, TowerSnapshot};
    use rand::SeedableRng;

    fn line_graph() -> Graph {
        let n = |id, x| Node { id, x, y: 0.0, kind: NodeKind::Normal };
        Graph::new(
            vec![n(0, 0.0), n(1, 100.0), n(2, 200.0)],
            vec![Edge(0, 1), Edge(1, 2)],
            vec![0],
            vec![2],
            vec![],
        )
    }

    fn firewall_at(x: f64, damage: f64) -> TowerSnapshot {
        TowerSnapshot { x, y: 0.0, kind: TowerKind::Firewall, damage, range: 40.0, cooldown_remaining: 0.0 }
    }

    #[test]
    fn test_per_path_mix_sums_to_one() {
        let graph = line_graph();
        let snapshot = DefenseSnapshot::new(vec![firewall_at(100.0, 12.0)]);
        let paths = vec![vec![0, 1, 2]];
        let stats = SiegeStats::default();
        let ctx = StrategyContext { snapshot: &snapshot, graph: &graph, paths: &paths, stats: &stats };

        let mut ai = EquilibriumAI::new(PayoffMatrix::default());
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let analysis = ai.observe(&ctx, &mut rng);
        for report in &analysis.path_reports {
            let total: f64 = report.enemy_mix.iter().map(|(_, p)| p).sum();
            assert!((total - 1.0).abs() < MIX_EPSILON, "mix sums to {total}");
        }
    }

    #[test]
    fn test_blocker_heavy_scenario_weights() {
        // 3 firewalls, 0 scanners on a single-path graph with known total D.
        let graph = line_graph();
        let snapshot = DefenseSnapshot::new(vec![
            firewall_at(100.0, 10.0),
            firewall_at(100.0, 10.0),
            firewall_at(100.0, 10.0),
        ]);
        let paths = vec![vec![0, 1, 2]];
        let stats = SiegeStats::default();
        let ctx = StrategyContext { snapshot: &snapshot, graph: &graph, paths: &paths, stats: &stats };

        let mut ai = EquilibriumAI::new(PayoffMatrix::default());
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(2);
        let analysis = ai.observe(&ctx, &mut rng);

        assert_eq!(analysis.posture, Posture::FwHeavy);

        // Only node 1 is covered: D = 30.
        let d = 30.0;
        let report = &analysis.path_reports[0];
        assert!((report.total_dps - d).abs() < 1e-9);

        // Expected mix: payoff(type, FW_HEAVY) * (100/(D+1)), normalized.
        let matrix = PayoffMatrix::default();
        let exposure = 100.0 / (d + 1.0);
        let raw: Vec<f64> = EnemyType::ALL
            .iter()
            .map(|&t| matrix.payoff(t, Posture::FwHeavy) * exposure)
            .collect();
        let total: f64 = raw.iter().sum();
        for (i, &(ty, p)) in report.enemy_mix.iter().enumerate() {
            assert_eq!(ty, EnemyType::ALL[i]);
            assert!((p - raw[i] / total).abs() < MIX_EPSILON);
        }
    }

    #[test]
    fn test_weaker_path_gets_higher_priority() {
        let n = |id, x, y| Node { id, x, y, kind: NodeKind::Normal };
        let graph = Graph::new(
            vec![n(0, 0.0, 0.0), n(1, 100.0, -80.0), n(2, 100.0, 80.0), n(3, 200.0, 0.0)],
            vec![Edge(0, 1), Edge(1, 3), Edge(0, 2), Edge(2, 3)],
            vec![0],
            vec![3],
            vec![],
        );
        // Cover the upper lane only.
        let snapshot = DefenseSnapshot::new(vec![TowerSnapshot {
            x: 100.0,
            y: -80.0,
            kind: TowerKind::Firewall,
            damage: 20.0,
            range: 30.0,
            cooldown_remaining: 0.0,
        }]);
        let paths = vec![vec![0, 1, 3], vec![0, 2, 3]];
        let stats = SiegeStats::default();
        let ctx = StrategyContext { snapshot: &snapshot, graph: &graph, paths: &paths, stats: &stats };

        let mut ai = EquilibriumAI::new(PayoffMatrix::default());
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(3);
        let analysis = ai.observe(&ctx, &mut rng);
        assert!(analysis.path_reports[1].priority > analysis.path_reports[0].priority);
        assert!(analysis.path_reports[1].spawn_rate > analysis.path_reports[0].spawn_rate);

        let policy = ai.propose(&analysis, &mut rng);
        assert_eq!(policy.path_preferences.first(), Some(&1));

        // Weakest node on the covered path is an uncovered endpoint.
        assert_ne!(analysis.path_reports[0].weakest_node, Some(1));
    }

    #[test]
    fn test_values_are_capped() {
        let graph = line_graph();
        let towers: Vec<TowerSnapshot> = (0..50).map(|_| firewall_at(100.0, 100.0)).collect();
        let snapshot = DefenseSnapshot::new(towers);
        let paths = vec![vec![0, 1, 2]];
        let stats = SiegeStats::default();
        let ctx = StrategyContext { snapshot: &snapshot, graph: &graph, paths: &paths, stats: &stats };

        let mut ai = EquilibriumAI::new(PayoffMatrix::default());
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(4);
        let analysis = ai.observe(&ctx, &mut rng);
        assert!(analysis.defense_value <= 1000.0);
        assert!(analysis.attacker_value <= 10.0);
    }
}
