pub mod config;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod network;
pub mod processes;
pub mod provider;
pub mod system_info;

pub use config::DashboardConfig;
pub use cpu::{CpuMonitor, CpuSnapshot};
pub use error::{MonitorError, MonitorResult};
pub use memory::{MemoryMonitor, MemorySnapshot};
pub use network::{NetworkMonitor, NetworkSnapshot};
pub use processes::{KillOutcome, ProcessControl, ProcessController, ProcessList, ProcessMonitor, ProcessRecord};
pub use provider::{MetricsProvider, SharedProvider};
pub use system_info::{SystemInfoMonitor, SystemSnapshot};
