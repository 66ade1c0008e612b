/// Process enumeration and process control
///
/// `ProcessMonitor` produces ranked process lists; `ProcessController` terminates
/// a process, escalating from SIGTERM to SIGKILL after a bounded wait.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, Signal, System, UpdateKind, Users};
use tracing::{debug, info};

use crate::core::config::DashboardConfig;
use crate::core::error::MonitorResult;
use crate::core::provider::{MetricsProvider, SampleGate};

const USER_REFRESH: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub user: String,
    pub status: String,
    pub memory_percent: f32,
    pub cpu_percent: f32,
    /// Disk read rate in bytes/s
    pub read_rate: f64,
    /// Disk write rate in bytes/s
    pub write_rate: f64,
    pub connections: usize,
    pub threads: usize,
}

pub type ProcessList = Arc<Vec<ProcessRecord>>;

pub struct ProcessMonitor {
    sys: System,
    users: Users,
    user_gate: SampleGate,
    limit: usize,
    last_refresh: Option<Instant>,
}

impl ProcessMonitor {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            sys: System::new(),
            users: Users::new_with_refreshed_list(),
            user_gate: SampleGate::new(USER_REFRESH),
            limit: config.process_limit,
            last_refresh: None,
        }
    }

    /// Enumerate processes sorted by memory usage, keeping at most `limit`
    pub fn list_processes(&mut self, limit: usize) -> Vec<ProcessRecord> {
        let now = Instant::now();
        let elapsed = self
            .last_refresh
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);

        if self.user_gate.ready(now) {
            self.users.refresh_list();
            self.user_gate.mark(now);
        }

        self.sys.refresh_memory();
        // The plain refresh never loads owners
        self.sys.refresh_processes_specifics(
            ProcessRefreshKind::new()
                .with_memory()
                .with_cpu()
                .with_disk_usage()
                .with_user(UpdateKind::OnlyIfNotSet),
        );
        self.last_refresh = Some(now);

        let total_memory = self.sys.total_memory();
        let mut records: Vec<ProcessRecord> = self
            .sys
            .processes()
            .iter()
            // Linux reports every thread as a process entry of its own
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| {
                let disk = process.disk_usage();
                let user = process
                    .user_id()
                    .and_then(|uid| self.users.get_user_by_id(uid))
                    .map(|user| user.name().to_string())
                    .unwrap_or_else(|| "?".to_string());

                ProcessRecord {
                    pid: pid.as_u32(),
                    name: process.name().to_string(),
                    user,
                    status: process.status().to_string(),
                    memory_percent: crate::core::memory::percent_of(process.memory(), total_memory),
                    cpu_percent: process.cpu_usage(),
                    read_rate: per_second(disk.read_bytes, elapsed),
                    write_rate: per_second(disk.written_bytes, elapsed),
                    connections: 0,
                    threads: process.tasks().map(|tasks| tasks.len().max(1)).unwrap_or(1),
                }
            })
            .collect();

        sort_by_memory(&mut records);
        records.truncate(limit);

        // Only the kept rows pay for descriptor scanning
        for record in &mut records {
            record.connections = socket_count(record.pid);
        }

        records
    }
}

impl MetricsProvider for ProcessMonitor {
    type Snapshot = ProcessList;

    fn domain(&self) -> &'static str {
        "processes"
    }

    fn fetch(&mut self) -> BoxFuture<'_, MonitorResult<ProcessList>> {
        Box::pin(async move {
            let limit = self.limit;
            Ok(Arc::new(self.list_processes(limit)))
        })
    }
}

pub fn sort_by_memory(records: &mut [ProcessRecord]) {
    records.sort_by(|a, b| {
        b.memory_percent
            .total_cmp(&a.memory_percent)
            .then_with(|| a.pid.cmp(&b.pid))
    });
}

fn per_second(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        0.0
    } else {
        bytes as f64 / elapsed_secs
    }
}

/// Count socket descriptors; vanished or protected processes count as zero
#[cfg(target_os = "linux")]
fn socket_count(pid: u32) -> usize {
    let Ok(entries) = std::fs::read_dir(format!("/proc/{}/fd", pid)) else {
        return 0;
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| std::fs::read_link(entry.path()).ok())
        .filter(|target| target.to_string_lossy().starts_with("socket:"))
        .count()
}

#[cfg(not(target_os = "linux"))]
fn socket_count(_pid: u32) -> usize {
    0
}

/// Result of a termination request. Failures are values, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// Exited after the graceful signal
    Terminated,
    /// Needed the forced kill
    Killed,
    NotFound,
    Denied,
    Invalid,
}

impl KillOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, KillOutcome::Terminated | KillOutcome::Killed)
    }

    pub fn describe(&self, pid: u32) -> String {
        match self {
            KillOutcome::Terminated => format!("Process {} terminated", pid),
            KillOutcome::Killed => format!("Process {} killed after timeout", pid),
            KillOutcome::NotFound => format!("Process {} no longer exists", pid),
            KillOutcome::Denied => format!("Permission denied for process {}", pid),
            KillOutcome::Invalid => format!("Invalid pid {}", pid),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait ProcessControl: Send + Sync + 'static {
    fn terminate(&self, pid: u32) -> BoxFuture<'static, KillOutcome>;
}

#[derive(Debug, Clone)]
pub struct ProcessController {
    timeout: Duration,
    poll: Duration,
}

impl ProcessController {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self {
            timeout,
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(config.kill_timeout, config.kill_poll)
    }
}

impl ProcessControl for ProcessController {
    fn terminate(&self, pid: u32) -> BoxFuture<'static, KillOutcome> {
        let timeout = self.timeout;
        let poll = self.poll;

        Box::pin(async move {
            let outcome = terminate_process(pid, timeout, poll).await;
            info!(pid, ?outcome, "termination finished");
            outcome
        })
    }
}

async fn terminate_process(pid: u32, timeout: Duration, poll: Duration) -> KillOutcome {
    if pid == 0 || pid == std::process::id() {
        return KillOutcome::Invalid;
    }

    let target = Pid::from_u32(pid);
    let mut sys = System::new();
    if !sys.refresh_process(target) {
        return KillOutcome::NotFound;
    }

    let sent = match sys.process(target) {
        Some(process) => process.kill_with(Signal::Term).unwrap_or_else(|| process.kill()),
        None => return KillOutcome::NotFound,
    };
    if !sent {
        // The signal failed: either it vanished meanwhile or we lack rights
        return if sys.refresh_process(target) {
            KillOutcome::Denied
        } else {
            KillOutcome::NotFound
        };
    }

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        tokio::time::sleep(poll).await;
        if !sys.refresh_process(target) {
            return KillOutcome::Terminated;
        }
    }

    debug!(pid, "graceful termination timed out, escalating");
    let forced = match sys.process(target) {
        Some(process) => process.kill_with(Signal::Kill).unwrap_or_else(|| process.kill()),
        None => return KillOutcome::Terminated,
    };

    if forced {
        KillOutcome::Killed
    } else if sys.refresh_process(target) {
        KillOutcome::Denied
    } else {
        KillOutcome::Terminated
    }
}

#[cfg(test)]
pub(crate) fn record(pid: u32, name: &str, memory_percent: f32, cpu_percent: f32) -> ProcessRecord {
    ProcessRecord {
        pid,
        name: name.to_string(),
        user: "root".to_string(),
        status: "Sleeping".to_string(),
        memory_percent,
        cpu_percent,
        read_rate: 0.0,
        write_rate: 0.0,
        connections: 0,
        threads: 1,
    }
}
