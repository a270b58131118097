//! Injectable time and randomness.
//!
//! Per §9 ("Determinism in tests"), `now` and the RNG used by the stochastic
//! components (REM noise, seed sampling) are both injectable so that tests
//! can drive ticks and traversals deterministically.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Supplies the current time. The default implementation reads the system
/// clock; tests substitute a fixed or stepped value.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that always returns the same instant, advanced explicitly by
/// tests between calls.
#[derive(Debug, Clone)]
pub struct FixedClock {
    at: std::sync::Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            at: std::sync::Mutex::new(at),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.at.lock().expect("clock lock poisoned");
        *guard = *guard + delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.at.lock().expect("clock lock poisoned") = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.at.lock().expect("clock lock poisoned")
    }
}

/// Build a seeded RNG for the stochastic components. `None` seeds from OS
/// entropy (production); `Some(seed)` gives bit-for-bit reproducible traversal
/// order for tests.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
