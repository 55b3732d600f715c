use crate::domain::ports::ShotRng;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Returns a process-unique, monotonically increasing identifier.
///
/// Used for connection ids; two connections accepted in the same instant still get distinct
/// values.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(now_nanos()));
    counter.fetch_add(1, Ordering::Relaxed)
}

/// Per-shot randomness backed by PCG. Seed it to replay a session's launches exactly.
pub struct PcgShotRng {
    rng: Pcg32,
}

impl PcgShotRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn from_clock() -> Self {
        Self::seeded(now_nanos())
    }
}

impl ShotRng for PcgShotRng {
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if !low.is_finite() || !high.is_finite() || high <= low {
            return low;
        }
        self.rng.random_range(low..high)
    }
}
