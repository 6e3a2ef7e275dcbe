//! Peer selection policies
//!
//! A policy picks one index out of the currently reachable peers. The
//! directory re-probes before every selection, so policies see a fresh
//! candidate list each call.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::config::PeerSelection;

pub trait SelectionPolicy: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    /// Index into `candidates`, `None` when empty
    fn select(&self, candidates: &[String]) -> Option<usize>;
}

/// Uniform random choice, seedable for tests
#[derive(Debug)]
pub struct RandomPolicy {
    rng: Mutex<StdRng>,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.rng.lock().gen_range(0..candidates.len()))
    }
}

/// Cycles through the candidate list
#[derive(Debug, Default)]
pub struct RoundRobinPolicy {
    next: AtomicUsize,
}

impl RoundRobinPolicy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionPolicy for RoundRobinPolicy {
    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn select(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(self.next.fetch_add(1, Ordering::Relaxed) % candidates.len())
    }
}

pub fn create_policy(selection: PeerSelection) -> Arc<dyn SelectionPolicy> {
    match selection {
        PeerSelection::Random => Arc::new(RandomPolicy::new()),
        PeerSelection::RoundRobin => Arc::new(RoundRobinPolicy::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://peer{i}")).collect()
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(RandomPolicy::with_seed(1).select(&[]), None);
        assert_eq!(RoundRobinPolicy::new().select(&[]), None);
    }

    #[test]
    fn test_round_robin_cycles() {
        let policy = RoundRobinPolicy::new();
        let candidates = peers(3);
        let picks: Vec<usize> = (0..6).filter_map(|_| policy.select(&candidates)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_random_same_seed_same_sequence() {
        let a = RandomPolicy::with_seed(42);
        let b = RandomPolicy::with_seed(42);
        let candidates = peers(5);

        let picks_a: Vec<Option<usize>> = (0..20).map(|_| a.select(&candidates)).collect();
        let picks_b: Vec<Option<usize>> = (0..20).map(|_| b.select(&candidates)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|p| matches!(p, Some(i) if *i < 5)));
    }

    #[test]
    fn test_create_policy_names() {
        assert_eq!(create_policy(PeerSelection::Random).name(), "random");
        assert_eq!(create_policy(PeerSelection::RoundRobin).name(), "round_robin");
    }
}
