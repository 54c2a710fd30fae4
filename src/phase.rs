// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege") - Phase Controller
//
// Commitment -> Training -> Battle -> Scoring finite-state cycle used by the
// equilibrium session mode. Training runs the strategy analysis as a
// deferred computation while ticking continues; the transition to Battle
// waits on both the timer and the deferred result. Deferred results carry
// the session epoch so a computation outliving its session is discarded.

use log::{info, warn};
use serde::{Deserialize, Serialize};

// ─── Phase ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Commitment,
    Training,
    Battle,
    Scoring,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Commitment => "commitment",
            Self::Training => "training",
            Self::Battle => "battle",
            Self::Scoring => "scoring",
        }
    }

    /// Defense placement is only open during Commitment.
    pub fn can_place_defenses(&self) -> bool {
        matches!(self, Self::Commitment)
    }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Per-state durations in seconds. `training_secs` must cover
/// `analysis_delay_secs`; the Battle edge additionally waits on the result,
/// so a misconfigured shorter timer still cannot skip the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasePolicy {
    pub commitment_secs: f64,
    pub training_secs: f64,
    pub battle_secs: f64,
    pub scoring_secs: f64,
    pub analysis_delay_secs: f64,
}

impl Default for PhasePolicy {
    fn default() -> Self {
        Self {
            commitment_secs: 10.0,
            training_secs: 6.0,
            battle_secs: 45.0,
            scoring_secs: 5.0,
            analysis_delay_secs: 2.0,
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// What the controller reports per tick; the session maps these onto
/// outbound notifications and drives the strategy pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    Changed(Phase),
    TimerTick {
        phase: Phase,
        elapsed_seconds: f64,
        remaining_seconds: f64,
    },
    /// The deferred Training computation is due; the session must run the
    /// analysis and call `submit_analysis` with its epoch.
    AnalysisDue,
}

// ─── Controller ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PhaseController {
    policy: PhasePolicy,
    phase: Phase,
    elapsed: f64,
    active: bool,
    epoch: u64,
    deferred_remaining: Option<f64>,
    analysis_ready: bool,
}

impl PhaseController {
    pub fn new(policy: PhasePolicy, epoch: u64) -> Self {
        Self {
            policy,
            phase: Phase::Commitment,
            elapsed: 0.0,
            active: true,
            epoch,
            deferred_remaining: None,
            analysis_ready: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == Phase::Scoring && self.elapsed >= self.policy.scoring_secs
    }

    /// Explicit battle-activity flag; spawning requires it in addition to
    /// the phase itself.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Spawning is permitted only in an active Battle phase with the
    /// Training analysis in hand.
    pub fn can_spawn(&self) -> bool {
        self.phase == Phase::Battle && self.active && self.analysis_ready
    }

    /// Accept the deferred analysis result. Returns `false` and discards the
    /// result when it belongs to an earlier session epoch.
    pub fn submit_analysis(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            warn!("discarding stale training analysis from epoch {epoch} (current {})", self.epoch);
            return false;
        }
        self.analysis_ready = true;
        true
    }

    fn duration_of(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Commitment => self.policy.commitment_secs,
            Phase::Training => self.policy.training_secs,
            Phase::Battle => self.policy.battle_secs,
            Phase::Scoring => self.policy.scoring_secs,
        }
    }

    fn enter(&mut self, phase: Phase, events: &mut Vec<PhaseEvent>) {
        info!("phase transition {} -> {}", self.phase.label(), phase.label());
        self.phase = phase;
        self.elapsed = 0.0;
        if phase == Phase::Training {
            self.deferred_remaining = Some(self.policy.analysis_delay_secs);
        }
        events.push(PhaseEvent::Changed(phase));
    }

    /// Advance the controller by `dt` seconds. Scoring is terminal;
    /// re-entry happens only through an external restart constructing a new
    /// controller.
    pub fn tick(&mut self, dt: f64) -> Vec<PhaseEvent> {
        let mut events = Vec::new();
        if self.phase == Phase::Scoring && self.elapsed >= self.policy.scoring_secs {
            return events;
        }
        self.elapsed += dt;

        // Deferred computation countdown runs alongside the phase timer.
        if let Some(remaining) = self.deferred_remaining {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.deferred_remaining = None;
                events.push(PhaseEvent::AnalysisDue);
            } else {
                self.deferred_remaining = Some(remaining);
            }
        }

        let duration = self.duration_of(self.phase);
        events.push(PhaseEvent::TimerTick {
            phase: self.phase,
            elapsed_seconds: self.elapsed.min(duration),
            remaining_seconds: (duration - self.elapsed).max(0.0),
        });

        match self.phase {
            Phase::Commitment => {
                if self.elapsed >= duration {
                    // Locks placement; the session snapshots the defender
                    // state on this edge.
                    self.enter(Phase::Training, &mut events);
                }
            }
            Phase::Training => {
                // Both conditions: timer elapsed AND deferred result landed.
                if self.elapsed >= duration && self.analysis_ready {
                    self.enter(Phase::Battle, &mut events);
                }
            }
            Phase::Battle => {
                if self.elapsed >= duration {
                    self.enter(Phase::Scoring, &mut events);
                }
            }
            Phase::Scoring => {}
        }
        events
    }
}
