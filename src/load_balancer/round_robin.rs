//! Round-robin load balancing strategy.

use crate::load_balancer::{Selector, TargetSet};

/// Round-robin selector.
/// Returns the target under the cursor, then advances it modulo the list length.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for RoundRobin {
    fn select(&self, set: &mut TargetSet) -> usize {
        let len = set.targets.len();
        let index = set.cursor % len;
        set.cursor = (index + 1) % len;
        index
    }
}
