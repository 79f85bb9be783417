//! Random load balancing strategy.

use rand::Rng;

use crate::load_balancer::{Selector, TargetSet};

/// Uniform random selector. Carries no state between calls.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for Random {
    fn select(&self, set: &mut TargetSet) -> usize {
        rand::thread_rng().gen_range(0..set.targets.len())
    }
}
