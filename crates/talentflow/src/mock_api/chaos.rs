use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Latency and failure-injection settings for the simulated API.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosConfig {
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub read_failure_rate: f64,
    pub write_failure_rate: f64,
    pub reorder_failure_rate: f64,
    pub rng_seed: Option<u64>,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            latency_min_ms: 200,
            latency_max_ms: 1200,
            read_failure_rate: 0.0,
            write_failure_rate: 0.05,
            reorder_failure_rate: 0.10,
            rng_seed: None,
        }
    }
}

impl ChaosConfig {
    /// No latency and no injected failures.
    pub fn calm() -> Self {
        Self {
            latency_min_ms: 0,
            latency_max_ms: 0,
            read_failure_rate: 0.0,
            write_failure_rate: 0.0,
            reorder_failure_rate: 0.0,
            rng_seed: Some(0),
        }
    }

    /// No latency; every call fails.
    pub fn outage() -> Self {
        Self {
            read_failure_rate: 1.0,
            write_failure_rate: 1.0,
            reorder_failure_rate: 1.0,
            ..Self::calm()
        }
    }

    fn failure_rate(&self, class: OperationClass) -> f64 {
        match class {
            OperationClass::Read => self.read_failure_rate,
            OperationClass::Write => self.write_failure_rate,
            OperationClass::Reorder => self.reorder_failure_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    Read,
    Write,
    Reorder,
}

/// Outcome of one simulated round trip, before the store is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrip {
    pub latency: Duration,
    pub fail: bool,
}

pub struct FaultInjector {
    config: ChaosConfig,
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    pub fn new(config: ChaosConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Draws latency and failure for one call of the given class.
    pub fn plan(&self, class: OperationClass) -> RoundTrip {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let (min, max) = (self.config.latency_min_ms, self.config.latency_max_ms);
        let latency_ms = if max > min {
            rng.gen_range(min..=max)
        } else {
            min
        };

        let rate = self.config.failure_rate(class).clamp(0.0, 1.0);
        let fail = rate > 0.0 && rng.gen_bool(rate);

        RoundTrip {
            latency: Duration::from_millis(latency_ms),
            fail,
        }
    }
}
