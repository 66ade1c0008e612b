/// The fetch, hand off, sleep loop every metric domain runs
///
/// A failing or panicking cycle is logged and retried after a backoff. It never
/// ends the task, so one broken domain cannot take its siblings down.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, warn};

use crate::core::error::MonitorResult;
use crate::core::provider::SharedProvider;

pub struct DomainTask<S> {
    domain: &'static str,
    provider: SharedProvider<S>,
    cadence: Duration,
    retry: Duration,
}

impl<S: Send + Sync + 'static> DomainTask<S> {
    pub fn new(domain: &'static str, provider: SharedProvider<S>, cadence: Duration, retry: Duration) -> Self {
        Self {
            domain,
            provider,
            cadence,
            retry,
        }
    }

    /// Fetch one snapshot and pass it to `sink`; returns the delay before the next cycle
    async fn cycle<F>(&self, sink: &mut F) -> Duration
    where
        F: FnMut(S) -> MonitorResult<()> + Send,
    {
        let started = Instant::now();
        let step = AssertUnwindSafe(async {
            let fetched = self.provider.lock().await.fetch().await;
            fetched.map(|snapshot| sink(snapshot))
        })
        .catch_unwind()
        .await;

        match step {
            Ok(Ok(Ok(()))) => self.cadence.saturating_sub(started.elapsed()),
            Ok(Ok(Err(e))) => {
                // The snapshot was fine, only its hand-off failed
                debug!(domain = self.domain, error = %e, "snapshot dropped");
                self.cadence
            }
            Ok(Err(e)) => {
                if e.is_transient() {
                    debug!(domain = self.domain, error = %e, backoff = ?self.retry, "fetch failed");
                } else {
                    warn!(domain = self.domain, error = %e, backoff = ?self.retry, "fetch failed");
                }
                self.retry
            }
            Err(_) => {
                warn!(domain = self.domain, backoff = ?self.retry, "fetch cycle panicked");
                self.retry
            }
        }
    }

    /// Loop until the surrounding task is aborted
    pub async fn run<F>(self, mut sink: F)
    where
        F: FnMut(S) -> MonitorResult<()> + Send,
    {
        loop {
            let delay = self.cycle(&mut sink).await;
            tokio::time::sleep(delay).await;
        }
    }
}
