/// Network throughput with moving-window smoothing

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Serialize;
use sysinfo::Networks;

use crate::core::config::DashboardConfig;
use crate::core::error::MonitorResult;
use crate::core::provider::{MetricsProvider, SampleGate};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rates {
    /// Receive rate in KB/s
    pub recv_kbps: f64,
    /// Send rate in KB/s
    pub sent_kbps: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkSnapshot {
    pub rates: Rates,
    /// Interface name to IPv4 address
    pub interfaces: BTreeMap<String, String>,
}

/// Turns cumulative byte counters into smoothed per-second rates
#[derive(Debug, Clone)]
pub struct RateTracker {
    window: usize,
    gate: SampleGate,
    last_totals: Option<(u64, u64)>,
    recv: VecDeque<f64>,
    sent: VecDeque<f64>,
}

impl RateTracker {
    pub fn new(window: usize, min_interval: Duration) -> Self {
        let window = window.max(1);
        Self {
            window,
            gate: SampleGate::new(min_interval),
            last_totals: None,
            recv: VecDeque::with_capacity(window),
            sent: VecDeque::with_capacity(window),
        }
    }

    /// True when enough time has passed to take a new counter reading
    pub fn wants_sample(&self, now: Instant) -> bool {
        self.gate.ready(now)
    }

    /// Feed cumulative (received, sent) byte totals observed at `now`
    pub fn sample(&mut self, totals: (u64, u64), now: Instant) -> Rates {
        let (Some(last_at), Some((last_recv, last_sent))) = (self.gate.last(), self.last_totals) else {
            self.last_totals = Some(totals);
            self.gate.mark(now);
            return self.smoothed();
        };

        let elapsed = now.saturating_duration_since(last_at).as_secs_f64();
        if !self.gate.ready(now) || elapsed <= 0.0 {
            return self.smoothed();
        }

        // Counters can reset when an interface goes away; treat that as idle
        let recv_rate = totals.0.saturating_sub(last_recv) as f64 / elapsed / 1024.0;
        let sent_rate = totals.1.saturating_sub(last_sent) as f64 / elapsed / 1024.0;
        push_bounded(&mut self.recv, recv_rate, self.window);
        push_bounded(&mut self.sent, sent_rate, self.window);

        self.last_totals = Some(totals);
        self.gate.mark(now);
        self.smoothed()
    }

    pub fn smoothed(&self) -> Rates {
        Rates {
            recv_kbps: average(&self.recv),
            sent_kbps: average(&self.sent),
        }
    }
}

fn push_bounded(samples: &mut VecDeque<f64>, value: f64, window: usize) {
    if samples.len() == window {
        samples.pop_front();
    }
    samples.push_back(value);
}

fn average(samples: &VecDeque<f64>) -> f64 {
    if samples.is_empty() {
        0.0
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

pub struct NetworkMonitor {
    networks: Networks,
    tracker: RateTracker,
    interfaces: BTreeMap<String, String>,
    interface_gate: SampleGate,
}

impl NetworkMonitor {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            tracker: RateTracker::new(config.network_smoothing_window, config.network_min_interval),
            interfaces: BTreeMap::new(),
            interface_gate: SampleGate::new(config.interface_refresh),
        }
    }

    pub fn sample(&mut self) -> NetworkSnapshot {
        let now = Instant::now();

        if self.interface_gate.ready(now) {
            self.networks.refresh_list();
            self.interfaces = interface_addresses(&self.networks);
            self.interface_gate.mark(now);
        }

        let rates = if self.tracker.wants_sample(now) {
            self.networks.refresh();
            let totals = self
                .networks
                .iter()
                .fold((0u64, 0u64), |(recv, sent), (_, data)| {
                    (recv + data.total_received(), sent + data.total_transmitted())
                });
            self.tracker.sample(totals, now)
        } else {
            self.tracker.smoothed()
        };

        NetworkSnapshot {
            rates,
            interfaces: self.interfaces.clone(),
        }
    }
}

impl MetricsProvider for NetworkMonitor {
    type Snapshot = NetworkSnapshot;

    fn domain(&self) -> &'static str {
        "network"
    }

    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<NetworkSnapshot>> {
        Box::pin(async move { Ok(self.sample()) })
    }
}

#[cfg(unix)]
fn interface_addresses(_networks: &Networks) -> BTreeMap<String, String> {
    let mut interfaces = BTreeMap::new();
    let Ok(addrs) = nix::ifaddrs::getifaddrs() else {
        return interfaces;
    };

    for ifaddr in addrs {
        let Some(address) = ifaddr.address else { continue };
        if let Some(sin) = address.as_sockaddr_in() {
            let ip = std::net::SocketAddrV4::from(*sin).ip().to_string();
            // First IPv4 address per interface wins
            interfaces.entry(ifaddr.interface_name).or_insert(ip);
        }
    }
    interfaces
}

#[cfg(not(unix))]
fn interface_addresses(networks: &Networks) -> BTreeMap<String, String> {
    networks
        .iter()
        .map(|(name, _)| (name.clone(), "-".to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: Duration = Duration::from_millis(50);

    #[test]
    fn test_first_sample_reports_zero() {
        let mut tracker = RateTracker::new(3, MIN);
        let rates = tracker.sample((1_000_000, 500_000), Instant::now());
        assert_eq!(rates, Rates::default());
    }

    #[test]
    fn test_rate_over_one_second() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(3, MIN);
        tracker.sample((0, 0), start);

        let rates = tracker.sample((10 * 1024, 2 * 1024), start + Duration::from_secs(1));
        assert!((rates.recv_kbps - 10.0).abs() < 1e-9);
        assert!((rates.sent_kbps - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_interval_returns_last_smoothed_value() {
        let start = Instant::now();
        let later = start + Duration::from_secs(1);
        let mut tracker = RateTracker::new(3, MIN);
        tracker.sample((0, 0), start);
        let smoothed = tracker.sample((4096, 1024), later);

        // Same instant again: no division by a zero interval
        let again = tracker.sample((999_999, 999_999), later);
        assert_eq!(again, smoothed);
        assert!(again.recv_kbps.is_finite());
    }

    #[test]
    fn test_window_smooths_samples() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(2, MIN);
        tracker.sample((0, 0), start);
        tracker.sample((1024, 0), start + Duration::from_secs(1));
        tracker.sample((1024 + 3 * 1024, 0), start + Duration::from_secs(2));
        let rates = tracker.sample((4096 + 5 * 1024, 0), start + Duration::from_secs(3));

        // Window of two keeps 3.0 and 5.0
        assert!((rates.recv_kbps - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_counter_reset_is_not_negative() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(3, MIN);
        tracker.sample((10_000, 10_000), start);
        let rates = tracker.sample((0, 0), start + Duration::from_secs(1));
        assert_eq!(rates.recv_kbps, 0.0);
        assert_eq!(rates.sent_kbps, 0.0);
    }

    #[test]
    fn test_monitor_snapshot() {
        let mut monitor = NetworkMonitor::new(&DashboardConfig::default());
        let snapshot = monitor.sample();
        assert!(snapshot.rates.recv_kbps >= 0.0);
        assert!(snapshot.rates.sent_kbps >= 0.0);
    }
}
