//! Least Connections load balancing strategy.

use crate::load_balancer::{Selector, TargetSet};

/// Least connections selector.
/// Selects the target with the fewest active connections and reserves a
/// slot on it before the forward starts.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for LeastConnections {
    fn select(&self, set: &mut TargetSet) -> usize {
        // In case of tie, the first one is selected (stability)
        let index = set
            .targets
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| set.connections_of(t))
            .map(|(i, _)| i)
            .unwrap_or(0);

        let target = set.targets[index].clone();
        *set.connections.entry(target).or_insert(0) += 1;
        index
    }
}

#[cfg(test)]
mod tests {
    use crate::load_balancer::{LoadBalancer, Strategy, Target};

    fn targets(n: usize) -> Vec<Target> {
        (0..n)
            .map(|i| Target::parse(&format!("127.0.0.1:{}", 8080 + i)).unwrap())
            .collect()
    }

    #[test]
    fn test_least_conn() {
        let t = targets(2);
        let lb = LoadBalancer::new(t.clone(), Strategy::LeastConnections);

        // tie, first wins
        let s1 = lb.select_target().unwrap();
        assert_eq!(s1.target, t[0]);
        assert!(s1.reserved);

        // t[0] has 1, t[1] has 0
        let s2 = lb.select_target().unwrap();
        assert_eq!(s2.target, t[1]);

        // tie again at 1/1
        let s3 = lb.select_target().unwrap();
        assert_eq!(s3.target, t[0]);
    }

    #[test]
    fn test_moves_away_from_loaded_target() {
        let t = targets(3);
        let lb = LoadBalancer::new(t.clone(), Strategy::LeastConnections);
        for target in &t {
            assert_eq!(&lb.select_target().unwrap().target, target);
        }
        // 0/1/1: t[0] is the lone minimum
        lb.release_connection(&t[0]);

        assert_eq!(lb.select_target().unwrap().target, t[0]);
        // 1/1/1: tie, first in list wins
        assert_eq!(lb.select_target().unwrap().target, t[0]);
        // 2/1/1: t[0] now exceeds the rest
        assert_eq!(lb.select_target().unwrap().target, t[1]);

        let counts: Vec<usize> = lb.connection_counts().into_iter().map(|(_, c)| c).collect();
        assert_eq!(counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_release_allows_reselection() {
        let t = targets(2);
        let lb = LoadBalancer::new(t.clone(), Strategy::LeastConnections);
        let first = lb.select_target().unwrap().target;
        assert_eq!(first, t[0]);
        lb.release_connection(&first);
        assert_eq!(lb.select_target().unwrap().target, t[0]);
    }

    #[test]
    fn test_release_floors_at_zero() {
        let t = targets(2);
        let lb = LoadBalancer::new(t.clone(), Strategy::LeastConnections);
        lb.release_connection(&t[1]);
        lb.release_connection(&t[1]);
        assert_eq!(lb.connection_counts()[1].1, 0);
    }
}
