/// CPU usage, frequency, temperature and load-average sampling

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Serialize;
use sysinfo::{Components, System};

use crate::core::config::DashboardConfig;
use crate::core::error::MonitorResult;
use crate::core::provider::{MetricsProvider, SampleGate};

/// Sensor labels that belong to the CPU package
const CPU_SENSOR_MARKERS: &[&str] = &["core", "cpu", "package", "tctl"];

#[derive(Debug, Clone, Serialize)]
pub struct Temperature {
    pub label: String,
    pub celsius: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuSnapshot {
    pub usage: f32,
    pub cores: Vec<f32>,
    pub frequency_mhz: u64,
    pub temperatures: Vec<Temperature>,
    pub load_avg: [f64; 3],
}

pub struct CpuMonitor {
    sys: System,
    components: Components,
    usage_gate: SampleGate,
    sensor_gate: SampleGate,
    last: Option<CpuSnapshot>,
    temperatures: Vec<Temperature>,
}

impl CpuMonitor {
    pub fn new(config: &DashboardConfig) -> Self {
        let mut sys = System::new();
        // Prime the usage counters so the next refresh has a baseline
        sys.refresh_cpu();

        Self {
            sys,
            components: Components::new_with_refreshed_list(),
            usage_gate: SampleGate::new(usage_interval(config.cpu_min_interval)),
            sensor_gate: SampleGate::new(config.sensor_interval),
            last: None,
            temperatures: Vec::new(),
        }
    }

    /// Number of logical cores, used for layout hints
    pub fn core_count(&self) -> usize {
        self.sys.cpus().len()
    }

    pub fn sample(&mut self) -> CpuSnapshot {
        let now = Instant::now();

        if !self.usage_gate.ready(now) {
            if let Some(last) = &self.last {
                return last.clone();
            }
        }

        self.sys.refresh_cpu();
        self.usage_gate.mark(now);

        if self.sensor_gate.ready(now) {
            self.components.refresh();
            self.temperatures = cpu_temperatures(&self.components);
            self.sensor_gate.mark(now);
        }

        let cpus = self.sys.cpus();
        let cores: Vec<f32> = cpus.iter().map(|cpu| cpu.cpu_usage()).collect();
        let frequency_mhz = if cpus.is_empty() {
            0
        } else {
            cpus.iter().map(|cpu| cpu.frequency()).sum::<u64>() / cpus.len() as u64
        };
        let load = System::load_average();

        let snapshot = CpuSnapshot {
            usage: self.sys.global_cpu_info().cpu_usage(),
            cores,
            frequency_mhz,
            temperatures: self.temperatures.clone(),
            load_avg: [load.one, load.five, load.fifteen],
        };

        self.last = Some(snapshot.clone());
        snapshot
    }
}

/// sysinfo needs this much time between refreshes for usage to be meaningful
fn usage_interval(configured: Duration) -> Duration {
    configured.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)
}

impl MetricsProvider for CpuMonitor {
    type Snapshot = CpuSnapshot;

    fn domain(&self) -> &'static str {
        "cpu"
    }

    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<CpuSnapshot>> {
        Box::pin(async move { Ok(self.sample()) })
    }
}

fn cpu_temperatures(components: &Components) -> Vec<Temperature> {
    components
        .list()
        .iter()
        .filter(|component| is_cpu_sensor(component.label()))
        .map(|component| Temperature {
            label: component.label().to_string(),
            celsius: component.temperature(),
        })
        .filter(|temp| temp.celsius.is_finite())
        .collect()
}

fn is_cpu_sensor(label: &str) -> bool {
    let label = label.to_lowercase();
    CPU_SENSOR_MARKERS.iter().any(|marker| label.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_cpu_sensor() {
        assert!(is_cpu_sensor("Core 0"));
        assert!(is_cpu_sensor("coretemp Package id 0"));
        assert!(is_cpu_sensor("k10temp Tctl"));
        assert!(!is_cpu_sensor("nvme Composite"));
        assert!(!is_cpu_sensor("acpitz temp1"));
    }

    #[test]
    fn test_rapid_samples_reuse_last_snapshot() {
        let config = DashboardConfig {
            cpu_min_interval: std::time::Duration::from_secs(60),
            ..DashboardConfig::default()
        };
        let mut monitor = CpuMonitor::new(&config);

        let first = monitor.sample();
        let second = monitor.sample();
        assert_eq!(first.cores.len(), second.cores.len());
        assert_eq!(first.usage, second.usage);
        assert_eq!(first.frequency_mhz, second.frequency_mhz);
    }

    #[test]
    fn test_usage_interval_respects_sysinfo_minimum() {
        let fast = Duration::from_millis(1);
        assert_eq!(usage_interval(fast), sysinfo::MINIMUM_CPU_UPDATE_INTERVAL.max(fast));
        assert_eq!(usage_interval(Duration::from_secs(5)), Duration::from_secs(5));

        // The default 50ms cadence still reuses the last refresh in between
        let mut monitor = CpuMonitor::new(&DashboardConfig::default());
        let first = monitor.sample();
        let second = monitor.sample();
        assert_eq!(first.usage, second.usage);
    }

    #[tokio::test]
    async fn test_fetch_reports_every_core() {
        let mut monitor = CpuMonitor::new(&DashboardConfig::default());
        let snapshot = monitor.fetch().await.unwrap();
        assert_eq!(snapshot.cores.len(), monitor.core_count());
        assert!(snapshot.usage >= 0.0);
    }
}
