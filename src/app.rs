/// Dashboard application: terminal setup, provider wiring and one-shot snapshots

use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::provider::{share, MetricsProvider};
use crate::core::{
    CpuMonitor, CpuSnapshot, DashboardConfig, MemoryMonitor, MemorySnapshot, NetworkMonitor, NetworkSnapshot,
    ProcessController, ProcessMonitor, ProcessRecord, SystemInfoMonitor, SystemSnapshot,
};
use crate::scheduler::{Coordinator, CrosstermEvents, ProviderSet};
use crate::screens::LayoutEngine;

/// Set while raw mode is on; the panic hook only restores when it is
static RAW_MODE_ACTIVE: AtomicBool = AtomicBool::new(false);

type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Send + Sync + 'static>;

/// Raw mode, alternate screen and hidden cursor for as long as the guard lives
pub struct TerminalGuard {
    previous_hook: Option<Arc<PanicHook>>,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        RAW_MODE_ACTIVE.store(true, Ordering::SeqCst);

        // From here on a failed step still restores through Drop
        let mut guard = Self { previous_hook: None };
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide).context("Failed to enter alternate screen")?;
        guard.previous_hook = Some(install_panic_hook());

        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous_hook.take() {
            reinstall_panic_hook(previous);
        }
        restore_terminal();
    }
}

/// Restore the terminal before the previous hook prints; returns that hook
fn install_panic_hook() -> Arc<PanicHook> {
    let owner = thread::current().id();
    let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
    let chained = previous.clone();
    panic::set_hook(Box::new(move |info| {
        if thread::current().id() == owner {
            restore_terminal();
            chained(info);
        } else {
            // Worker panics are contained by the scheduler; printing them would garble the screen
            error!(%info, "panic in worker thread");
        }
    }));
    previous
}

fn reinstall_panic_hook(previous: Arc<PanicHook>) {
    let _ = panic::take_hook();
    panic::set_hook(Box::new(move |info| previous(info)));
}

fn restore_terminal() {
    if RAW_MODE_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

pub struct App {
    config: DashboardConfig,
}

impl App {
    pub fn new(config: DashboardConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config;

        let cpu = CpuMonitor::new(&config);
        let engine = LayoutEngine::from_config(&config, cpu.core_count());
        let required = engine.minimum_size();
        info!(
            cores = cpu.core_count(),
            min_width = required.width,
            min_height = required.height,
            "starting dashboard"
        );

        let providers = ProviderSet {
            system: share(SystemInfoMonitor::new(&config)),
            cpu: share(cpu),
            memory: share(MemoryMonitor::new()),
            network: share(NetworkMonitor::new(&config)),
            processes: share(ProcessMonitor::new(&config)),
        };
        let control = Arc::new(ProcessController::from_config(&config));

        let guard = TerminalGuard::enter()?;
        let terminal =
            Terminal::new(CrosstermBackend::new(io::stdout())).context("Failed to initialise terminal")?;

        let coordinator =
            Coordinator::new(config, engine, providers, control, terminal, Box::new(CrosstermEvents));
        let result = coordinator.run().await;

        drop(guard);
        result
    }
}

/// Everything the dashboard shows, sampled once
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Local>,
    pub system: Option<SystemSnapshot>,
    pub cpu: CpuSnapshot,
    pub memory: MemorySnapshot,
    pub network: NetworkSnapshot,
    pub processes: Vec<ProcessRecord>,
}

/// Sample every provider; CPU and network are sampled twice so their rates mean something
pub async fn collect_snapshot(config: &DashboardConfig) -> Result<Snapshot> {
    let mut system = SystemInfoMonitor::new(config);
    let mut cpu = CpuMonitor::new(config);
    let mut memory = MemoryMonitor::new();
    let mut network = NetworkMonitor::new(config);
    let mut processes = ProcessMonitor::new(config);

    cpu.fetch().await.context("Failed to sample CPU")?;
    network.fetch().await.context("Failed to sample network")?;
    processes.fetch().await.context("Failed to list processes")?;

    let settle = config
        .cpu_min_interval
        .max(config.network_min_interval)
        .max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    tokio::time::sleep(settle).await;

    let system = match system.fetch().await {
        Ok(info) => Some(info),
        Err(e) => {
            warn!(error = %e, "system information unavailable");
            None
        }
    };

    Ok(Snapshot {
        taken_at: Local::now(),
        system,
        cpu: cpu.fetch().await.context("Failed to sample CPU")?,
        memory: memory.fetch().await.context("Failed to sample memory")?,
        network: network.fetch().await.context("Failed to sample network")?,
        processes: processes.fetch().await.context("Failed to list processes")?.to_vec(),
    })
}
