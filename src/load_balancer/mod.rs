//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Service entry resolved
//!     → LoadBalancer (per service, owns the ordered target list)
//!     → Apply selection strategy:
//!         - round_robin.rs (cursor rotating through targets)
//!         - random.rs (uniform pick)
//!         - least_conn.rs (fewest active connections, reserves a slot)
//!     → target.rs (ConnectionGuard releases the slot when the forward ends)
//! ```
//!
//! # Design Decisions
//! - One lock per load balancer, held only while selecting or mutating
//! - A single target bypasses strategy logic and bookkeeping entirely
//! - Connection counters exist for exactly the current target set

pub mod least_conn;
pub mod random;
pub mod round_robin;
pub mod target;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{RouterError, RouterResult};

pub use target::{ConnectionGuard, Target};

/// Target selection policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    RoundRobin,
    Random,
    LeastConnections,
}

impl Strategy {
    fn selector(self) -> Box<dyn Selector> {
        match self {
            Strategy::RoundRobin => Box::new(round_robin::RoundRobin::new()),
            Strategy::Random => Box::new(random::Random::new()),
            Strategy::LeastConnections => Box::new(least_conn::LeastConnections::new()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::RoundRobin => "round-robin",
            Strategy::Random => "random",
            Strategy::LeastConnections => "least-connections",
        };
        f.write_str(name)
    }
}

/// Mutable state shared by the strategies.
#[derive(Debug, Default)]
pub struct TargetSet {
    /// Ordered, duplicate-free target list.
    pub targets: Vec<Target>,
    /// Index of the next round-robin candidate.
    pub cursor: usize,
    /// Active connections per target (least-connections only).
    pub connections: HashMap<Target, usize>,
    /// Membership generation per target, bumped on every (re-)add.
    generations: HashMap<Target, u64>,
    next_generation: u64,
}

impl TargetSet {
    fn new(targets: Vec<Target>) -> Self {
        let connections = targets.iter().map(|t| (t.clone(), 0)).collect();
        let generations = targets.iter().map(|t| (t.clone(), 0)).collect();
        Self {
            targets,
            cursor: 0,
            connections,
            generations,
            next_generation: 1,
        }
    }

    fn generation_of(&self, target: &Target) -> u64 {
        self.generations.get(target).copied().unwrap_or(0)
    }

    /// Current connection count of a target (0 when unknown).
    pub fn connections_of(&self, target: &Target) -> usize {
        self.connections.get(target).copied().unwrap_or(0)
    }
}

/// Strategy implementation.
///
/// Called with the set locked and at least two targets present; returns the
/// index of the chosen target and may update cursor or counters.
pub trait Selector: Send + Sync + fmt::Debug {
    fn select(&self, set: &mut TargetSet) -> usize;
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub target: Target,
    /// True when a connection slot was reserved and must be released.
    pub reserved: bool,
    /// Membership generation of the target at selection time.
    pub generation: u64,
}

/// Per-service load balancer.
#[derive(Debug)]
pub struct LoadBalancer {
    strategy: Strategy,
    selector: Box<dyn Selector>,
    state: Mutex<TargetSet>,
}

impl LoadBalancer {
    /// Create a load balancer over an ordered target list.
    pub fn new(targets: Vec<Target>, strategy: Strategy) -> Self {
        Self {
            strategy,
            selector: strategy.selector(),
            state: Mutex::new(TargetSet::new(targets)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TargetSet> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Choose the next target.
    ///
    /// A lone target is always returned as-is, without touching the cursor
    /// or connection counters.
    pub fn select_target(&self) -> RouterResult<Selection> {
        let mut set = self.lock();
        match set.targets.len() {
            0 => Err(RouterError::NoTargetsAvailable(String::new())),
            1 => Ok(Selection {
                target: set.targets[0].clone(),
                reserved: false,
                generation: set.generation_of(&set.targets[0]),
            }),
            _ => {
                let index = self.selector.select(&mut set);
                let target = set.targets[index].clone();
                Ok(Selection {
                    generation: set.generation_of(&target),
                    target,
                    reserved: self.strategy == Strategy::LeastConnections,
                })
            }
        }
    }

    /// Select a target and wrap it in a guard that releases any reserved
    /// connection slot on drop.
    pub fn acquire(self: &Arc<Self>) -> RouterResult<ConnectionGuard> {
        let selection = self.select_target()?;
        Ok(ConnectionGuard::new(
            self.clone(),
            selection.target,
            selection.reserved,
            selection.generation,
        ))
    }

    /// Decrement a target's connection counter, floored at zero.
    pub fn release_connection(&self, target: &Target) {
        let mut set = self.lock();
        if let Some(count) = set.connections.get_mut(target) {
            *count = count.saturating_sub(1);
        }
    }

    /// Release a slot reserved under `generation`. A slot taken before the
    /// target was removed and re-added no longer counts and is ignored.
    pub(crate) fn release_slot(&self, target: &Target, generation: u64) {
        let mut set = self.lock();
        if set.generations.get(target) != Some(&generation) {
            return;
        }
        if let Some(count) = set.connections.get_mut(target) {
            *count = count.saturating_sub(1);
        }
    }

    /// Append a target. Returns false when it was already present.
    pub fn add_target(&self, target: Target) -> bool {
        let mut set = self.lock();
        if set.targets.contains(&target) {
            return false;
        }
        let generation = set.next_generation;
        set.next_generation += 1;
        set.generations.insert(target.clone(), generation);
        set.connections.insert(target.clone(), 0);
        set.targets.push(target);
        true
    }

    /// Remove a target. Returns false when it was not present.
    pub fn remove_target(&self, target: &Target) -> bool {
        let mut set = self.lock();
        let Some(index) = set.targets.iter().position(|t| t == target) else {
            return false;
        };
        set.targets.remove(index);
        set.connections.remove(target);
        set.generations.remove(target);
        if set.cursor >= set.targets.len() {
            set.cursor = 0;
        }
        true
    }

    /// Snapshot copy of the ordered target list.
    pub fn list_targets(&self) -> Vec<Target> {
        self.lock().targets.clone()
    }

    /// Snapshot of the connection counters in list order.
    pub fn connection_counts(&self) -> Vec<(Target, usize)> {
        let set = self.lock();
        set.targets
            .iter()
            .map(|t| (t.clone(), set.connections_of(t)))
            .collect()
    }
}
