// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Network Siege Simulation Suite ("The Siege")
//
// Adversarial path-planning and attack-strategy engine for a tower-defense
// style network siege. The host owns the run loop and defender placement;
// this crate owns the graph model, pathfinding, chokepoint analysis,
// topology generation, the attack strategies, agent routing, and the
// phase-driven session controller.

pub mod types;
pub mod graph;
pub mod pathfinding;
pub mod chokepoints;
pub mod topology;
pub mod strategy;
pub mod reactive;
pub mod equilibrium;
pub mod learning;
pub mod router;
pub mod phase;
pub mod session;

pub use types::*;
pub use session::{Notification, SessionConfig, SiegeSession, StrategyKind, TickResult};
