/// Static host facts: OS, hostname, address, CPU model, memory and disk totals
///
/// Most of these never change, so the hostname and its resolved address are
/// cached once known. Name resolution runs on tokio's resolver with a timeout
/// so a slow DNS server cannot stall the panel.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::Serialize;
use sysinfo::{Disks, System};
use tracing::debug;

use crate::core::config::DashboardConfig;
use crate::core::error::{MonitorError, MonitorResult};
use crate::core::memory::percent_of;
use crate::core::provider::MetricsProvider;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskSummary {
    pub mount_point: String,
    pub used_percent: f32,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSnapshot {
    pub os: String,
    pub kernel: String,
    pub host: String,
    pub ip: Option<String>,
    pub cpu_model: String,
    pub cores: usize,
    pub ram_total: u64,
    pub ram_available: u64,
    pub disk: Option<DiskSummary>,
    pub uptime: Duration,
}

pub struct SystemInfoMonitor {
    sys: System,
    disks: Disks,
    dns_timeout: Duration,
    hostname: Option<String>,
    ip: Option<String>,
}

impl SystemInfoMonitor {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            sys: System::new(),
            disks: Disks::new(),
            dns_timeout: config.dns_timeout,
            hostname: None,
            ip: None,
        }
    }

    async fn collect(&mut self) -> MonitorResult<SystemSnapshot> {
        if self.hostname.is_none() {
            self.hostname = System::host_name();
        }
        let host = self
            .hostname
            .clone()
            .ok_or_else(|| MonitorError::unavailable("system", "hostname unavailable"))?;

        if self.ip.is_none() {
            self.ip = resolve_host(&host, self.dns_timeout).await;
        }

        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        self.disks.refresh_list();

        let cpu_model = self
            .sys
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| "Unknown CPU".to_string());

        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => std::env::consts::OS.to_string(),
        };

        Ok(SystemSnapshot {
            os,
            kernel: System::kernel_version().unwrap_or_else(|| "-".to_string()),
            host,
            ip: self.ip.clone(),
            cpu_model,
            cores: self.sys.cpus().len(),
            ram_total: self.sys.total_memory(),
            ram_available: self.sys.available_memory(),
            disk: root_disk(&self.disks),
            uptime: Duration::from_secs(System::uptime()),
        })
    }
}

impl MetricsProvider for SystemInfoMonitor {
    type Snapshot = SystemSnapshot;

    fn domain(&self) -> &'static str {
        "system"
    }

    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<SystemSnapshot>> {
        Box::pin(self.collect())
    }
}

/// Resolve the host's own address, preferring IPv4
async fn resolve_host(host: &str, timeout: Duration) -> Option<String> {
    let lookup = tokio::net::lookup_host((host, 0));
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(addrs)) => {
            let addrs: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
            addrs
                .iter()
                .find(|ip| ip.is_ipv4())
                .or_else(|| addrs.first())
                .map(|ip| ip.to_string())
        }
        Ok(Err(e)) => {
            debug!(host, error = %e, "host lookup failed");
            None
        }
        Err(_) => {
            debug!(host, "host lookup timed out");
            None
        }
    }
}

/// Usage of the disk mounted at `/`, or the first disk when there is none
fn root_disk(disks: &Disks) -> Option<DiskSummary> {
    let list = disks.list();
    let disk = list
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))
        .or_else(|| list.first())?;

    let total = disk.total_space();
    let free = disk.available_space();
    Some(DiskSummary {
        mount_point: disk.mount_point().to_string_lossy().to_string(),
        used_percent: percent_of(total.saturating_sub(free), total),
        free_bytes: free,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_localhost_resolves() {
        let ip = resolve_host("localhost", Duration::from_secs(2)).await;
        assert!(ip.is_some());
    }

    #[tokio::test]
    async fn test_unknown_host_yields_none() {
        let ip = resolve_host("no-such-host.invalid", Duration::from_secs(2)).await;
        assert!(ip.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_has_static_facts() {
        let mut monitor = SystemInfoMonitor::new(&DashboardConfig::default());
        let snapshot = monitor.fetch().await.unwrap();
        assert!(snapshot.cores > 0);
        assert!(snapshot.ram_total > 0);
        assert!(!snapshot.host.is_empty());
    }
}
