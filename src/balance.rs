/// Replica selection policies for read routing.
use crate::node::PhysicalNode;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Balancer policy trait
pub trait Balancer: Send + Sync {
    /// Pick the replica serving the next read; `None` only for an empty
    /// list, which shard construction prevents structurally.
    fn next(&self, nodes: &[Arc<PhysicalNode>]) -> Option<usize>;
}

/// Round-robin selection with an atomic cursor, fair under concurrency.
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for RoundRobin {
    fn next(&self, nodes: &[Arc<PhysicalNode>]) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }

        Some(self.counter.fetch_add(1, Ordering::Relaxed) % nodes.len())
    }
}

/// Uniform random selection. The RNG is owned by the instance rather than
/// shared process-wide, so two balancers never contend on seed state.
pub struct Random {
    rng: Mutex<SmallRng>,
}

impl Random {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(SmallRng::from_entropy()),
        }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for Random {
    fn next(&self, nodes: &[Arc<PhysicalNode>]) -> Option<usize> {
        if nodes.is_empty() {
            return None;
        }

        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Some(rng.gen_range(0..nodes.len()))
    }
}
