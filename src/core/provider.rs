/// The metrics-provider seam used by the scheduler
///
/// Each provider is a stateful wrapper around OS queries for one domain. It keeps
/// whatever caches or deltas it needs to compute rates and hands out whole
/// snapshots; nothing downstream mutates a snapshot in place.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use crate::core::error::MonitorResult;

pub trait MetricsProvider: Send + 'static {
    type Snapshot: Send + Sync + 'static;

    /// Short domain name used in logs ("cpu", "network", ...)
    fn domain(&self) -> &'static str;

    /// Produce one snapshot. Transient OS errors should be recovered here and
    /// only unrecoverable ones returned.
    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<Self::Snapshot>>;
}

/// A provider shared across task groups so its smoothing state survives resizes
pub type SharedProvider<S> = Arc<Mutex<Box<dyn MetricsProvider<Snapshot = S>>>>;

pub fn share<P: MetricsProvider>(provider: P) -> SharedProvider<P::Snapshot> {
    Arc::new(Mutex::new(Box::new(provider)))
}

/// Rate limit for providers that must answer faster than they can resample
#[derive(Debug, Clone)]
pub struct SampleGate {
    min_interval: Duration,
    last: Option<Instant>,
}

impl SampleGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// True when a fresh sample may be taken at `now`
    pub fn ready(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn last(&self) -> Option<Instant> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_gate() {
        let start = Instant::now();
        let mut gate = SampleGate::new(Duration::from_millis(50));
        assert!(gate.ready(start));

        gate.mark(start);
        assert!(!gate.ready(start));
        assert!(!gate.ready(start + Duration::from_millis(49)));
        assert!(gate.ready(start + Duration::from_millis(50)));
        assert_eq!(gate.last(), Some(start));
    }
}
