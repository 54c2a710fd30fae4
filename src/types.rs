// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Type Definitions

use serde::{Deserialize, Serialize};

// ─── Enemy Type ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EnemyType {
    /// Fast, fragile. Outruns slow-firing firewalls.
    Worm = 0,
    /// Slow, armored, low profile. Slips past scanner-light defenses.
    Trojan = 1,
    /// Numerous and cheap. Saturates single-target towers.
    Swarm = 2,
}

impl EnemyType {
    pub const ALL: [EnemyType; 3] = [Self::Worm, Self::Trojan, Self::Swarm];

    /// Movement speed in viewport units per second.
    pub fn speed(&self) -> f64 {
        match self {
            Self::Worm => 120.0,
            Self::Trojan => 55.0,
            Self::Swarm => 85.0,
        }
    }

    pub fn max_health(&self) -> f64 {
        match self {
            Self::Worm => 40.0,
            Self::Trojan => 160.0,
            Self::Swarm => 25.0,
        }
    }

    /// Flat damage reduction applied to incoming tower DPS.
    pub fn armor(&self) -> f64 {
        match self {
            Self::Worm => 0.0,
            Self::Trojan => 6.0,
            Self::Swarm => 0.0,
        }
    }

    /// Resource cost charged to the attacker pool per spawn.
    pub fn spawn_cost(&self) -> f64 {
        match self {
            Self::Worm => 12.0,
            Self::Trojan => 30.0,
            Self::Swarm => 6.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Worm => "worm",
            Self::Trojan => "trojan",
            Self::Swarm => "swarm",
        }
    }
}

// ─── Tower Kind ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TowerKind {
    /// Blocker: raw damage output.
    Firewall = 0,
    /// Detector: reveals and damages low-profile traffic.
    Scanner = 1,
    /// Attractor: pulls traversing agents toward itself for a bounded time.
    Honeypot = 2,
}

// ─── Defender Telemetry ──────────────────────────────────────────────────────

/// One placed defense as reported by the external placement system.
/// `damage` is damage-per-second while a target is in `range`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TowerSnapshot {
    pub x: f64,
    pub y: f64,
    pub kind: TowerKind,
    pub damage: f64,
    pub range: f64,
    pub cooldown_remaining: f64,
}

impl TowerSnapshot {
    pub fn in_range(&self, x: f64, y: f64) -> bool {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy <= self.range * self.range
    }
}

/// Read-only view of the defender's placements for one tick. Strategy code
/// never mutates this; only the owning session constructs a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefenseSnapshot {
    pub towers: Vec<TowerSnapshot>,
}

impl DefenseSnapshot {
    pub fn new(towers: Vec<TowerSnapshot>) -> Self {
        Self { towers }
    }

    pub fn count_of(&self, kind: TowerKind) -> usize {
        self.towers.iter().filter(|t| t.kind == kind).count()
    }

    /// Share of `kind` among damage-dealing towers (honeypots excluded).
    /// Returns 0.0 when no firewall or scanner is placed.
    pub fn ratio_of(&self, kind: TowerKind) -> f64 {
        let combat: usize = self
            .towers
            .iter()
            .filter(|t| t.kind != TowerKind::Honeypot)
            .count();
        if combat == 0 {
            return 0.0;
        }
        self.count_of(kind) as f64 / combat as f64
    }

    /// Aggregate DPS of every tower whose range covers (x, y).
    pub fn dps_at(&self, x: f64, y: f64) -> f64 {
        self.towers
            .iter()
            .filter(|t| t.kind != TowerKind::Honeypot && t.in_range(x, y))
            .map(|t| t.damage)
            .sum()
    }

    pub fn total_damage(&self) -> f64 {
        self.towers
            .iter()
            .filter(|t| t.kind != TowerKind::Honeypot)
            .map(|t| t.damage)
            .sum()
    }
}

// ─── SiegeStats ──────────────────────────────────────────────────────────────

/// Running session aggregates. Feeds the learning reward signal and the
/// terminal scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiegeStats {
    pub spawned: u32,
    /// Agents that reached a goal node.
    pub leaked: u32,
    /// Agents eliminated by defenses.
    pub blocked: u32,
    pub waves: u32,
    /// Attacker resource pool.
    pub resources: f64,
    pub current_tick: u64,
}

impl Default for SiegeStats {
    fn default() -> Self {
        Self {
            spawned: 0,
            leaked: 0,
            blocked: 0,
            waves: 0,
            resources: 100.0,
            current_tick: 0,
        }
    }
}

impl SiegeStats {
    /// Blocked share of all resolved agents; 0.0 before any resolution.
    pub fn success_rate(&self) -> f64 {
        let resolved = self.leaked + self.blocked;
        if resolved == 0 {
            return 0.0;
        }
        self.blocked as f64 / resolved as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tower_range_check() {
        let t = TowerSnapshot {
            x: 0.0,
            y: 0.0,
            kind: TowerKind::Firewall,
            damage: 10.0,
            range: 50.0,
            cooldown_remaining: 0.0,
        };
        assert!(t.in_range(30.0, 40.0)); // exactly on the radius
        assert!(!t.in_range(30.0, 40.1));
    }

    #[test]
    fn test_ratio_excludes_honeypots() {
        let snap = DefenseSnapshot::new(vec![
            TowerSnapshot { x: 0.0, y: 0.0, kind: TowerKind::Firewall, damage: 10.0, range: 40.0, cooldown_remaining: 0.0 },
            TowerSnapshot { x: 1.0, y: 0.0, kind: TowerKind::Honeypot, damage: 0.0, range: 60.0, cooldown_remaining: 0.0 },
        ]);
        assert!((snap.ratio_of(TowerKind::Firewall) - 1.0).abs() < f64::EPSILON);
        assert_eq!(snap.count_of(TowerKind::Honeypot), 1);
    }

    #[test]
    fn test_dps_at_sums_covering_towers() {
        let snap = DefenseSnapshot::new(vec![
            TowerSnapshot { x: 0.0, y: 0.0, kind: TowerKind::Firewall, damage: 10.0, range: 50.0, cooldown_remaining: 0.0 },
            TowerSnapshot { x: 100.0, y: 0.0, kind: TowerKind::Scanner, damage: 4.0, range: 50.0, cooldown_remaining: 0.0 },
            TowerSnapshot { x: 500.0, y: 0.0, kind: TowerKind::Firewall, damage: 99.0, range: 10.0, cooldown_remaining: 0.0 },
        ]);
        assert!((snap.dps_at(50.0, 0.0) - 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_empty() {
        let stats = SiegeStats::default();
        assert_eq!(stats.success_rate(), 0.0);
    }
}
