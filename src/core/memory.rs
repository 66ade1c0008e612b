/// RAM and swap utilisation

use futures::future::BoxFuture;
use serde::Serialize;
use sysinfo::System;

use crate::core::error::MonitorResult;
use crate::core::provider::MetricsProvider;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemorySnapshot {
    pub ram_percent: f32,
    pub swap_percent: f32,
    pub ram_used: u64,
    pub ram_total: u64,
    pub swap_used: u64,
    pub swap_total: u64,
}

impl MemorySnapshot {
    pub fn from_bytes(ram_used: u64, ram_total: u64, swap_used: u64, swap_total: u64) -> Self {
        Self {
            ram_percent: percent_of(ram_used, ram_total),
            swap_percent: percent_of(swap_used, swap_total),
            ram_used,
            ram_total,
            swap_used,
            swap_total,
        }
    }
}

/// Percentage of `part` in `total`; 0 when nothing is configured
pub fn percent_of(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 100.0).clamp(0.0, 100.0) as f32
}

pub struct MemoryMonitor {
    sys: System,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    pub fn sample(&mut self) -> MemorySnapshot {
        self.sys.refresh_memory();
        MemorySnapshot::from_bytes(
            self.sys.used_memory(),
            self.sys.total_memory(),
            self.sys.used_swap(),
            self.sys.total_swap(),
        )
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProvider for MemoryMonitor {
    type Snapshot = MemorySnapshot;

    fn domain(&self) -> &'static str {
        "memory"
    }

    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<MemorySnapshot>> {
        Box::pin(async move { Ok(self.sample()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(50, 100), 50.0);
        assert_eq!(percent_of(0, 0), 0.0);
        assert_eq!(percent_of(200, 100), 100.0);
    }

    #[test]
    fn test_no_swap_reports_zero() {
        let snapshot = MemorySnapshot::from_bytes(4 << 30, 16 << 30, 0, 0);
        assert_eq!(snapshot.ram_percent, 25.0);
        assert_eq!(snapshot.swap_percent, 0.0);
    }

    #[test]
    fn test_sample_is_within_bounds() {
        let snapshot = MemoryMonitor::new().sample();
        assert!((0.0..=100.0).contains(&snapshot.ram_percent));
        assert!((0.0..=100.0).contains(&snapshot.swap_percent));
        assert!(snapshot.ram_used <= snapshot.ram_total);
    }
}
