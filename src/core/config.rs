/// Compiled-in dashboard tunables
///
/// There is no configuration file. Everything the dashboard can tune lives in
/// [`DashboardConfig`], built from `Default` and optionally adjusted by CLI flags.

use std::time::Duration;

use ratatui::style::Color;
use serde::Serialize;

use crate::screens::layout::SectionId;

/// Minimum sleep between fetch cycles per domain
#[derive(Debug, Clone, Serialize)]
pub struct Cadences {
    pub system_info: Duration,
    pub system_info_retry: Duration,
    pub cpu: Duration,
    pub memory: Duration,
    pub network: Duration,
    pub processes: Duration,
    pub input: Duration,
    pub frame: Duration,
    pub size_warning_poll: Duration,
    pub resize_debounce: Duration,
    pub error_backoff: Duration,
}

impl Default for Cadences {
    fn default() -> Self {
        Self {
            system_info: Duration::from_secs(10),
            system_info_retry: Duration::from_secs(5),
            cpu: Duration::from_millis(50),
            memory: Duration::from_millis(100),
            network: Duration::from_millis(50),
            processes: Duration::from_millis(200),
            input: Duration::from_millis(16),
            frame: Duration::from_millis(16),
            size_warning_poll: Duration::from_millis(500),
            resize_debounce: Duration::from_millis(100),
            error_backoff: Duration::from_millis(100),
        }
    }
}

/// Declared minimum content size of a section, borders included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MinSize {
    pub min_h: u16,
    pub min_w: u16,
}

impl MinSize {
    pub const fn new(min_h: u16, min_w: u16) -> Self {
        Self { min_h, min_w }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentSizes {
    pub system: MinSize,
    pub cpu: MinSize,
    pub memory: MinSize,
    pub network: MinSize,
    pub processes: MinSize,
    pub instructions: MinSize,
}

impl ContentSizes {
    pub fn get(&self, id: SectionId) -> MinSize {
        match id {
            SectionId::System => self.system,
            SectionId::Cpu => self.cpu,
            SectionId::Memory => self.memory,
            SectionId::Network => self.network,
            SectionId::Processes => self.processes,
            SectionId::Instructions => self.instructions,
        }
    }
}

impl Default for ContentSizes {
    fn default() -> Self {
        Self {
            system: MinSize::new(8, 40),
            cpu: MinSize::new(5, 45),
            memory: MinSize::new(4, 30),
            network: MinSize::new(5, 30),
            processes: MinSize::new(7, 45),
            instructions: MinSize::new(5, 30),
        }
    }
}

/// Terminal size as (width, height) in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

impl TermSize {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn fits(&self, min: TermSize) -> bool {
        self.width >= min.width && self.height >= min.height
    }

    pub fn max(self, other: TermSize) -> TermSize {
        TermSize::new(self.width.max(other.width), self.height.max(other.height))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
}

impl UsageLevel {
    pub fn color(&self) -> Color {
        match self {
            UsageLevel::Normal => Color::Green,
            UsageLevel::Warning => Color::Yellow,
            UsageLevel::Critical => Color::Red,
        }
    }
}

/// Usage colour thresholds in percent
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UsageThresholds {
    pub normal: f32,
    pub warning: f32,
}

impl UsageThresholds {
    pub fn level(&self, percent: f32) -> UsageLevel {
        // NaN falls through to Normal, like an unreadable value would
        if percent.is_nan() || percent < self.normal {
            UsageLevel::Normal
        } else if percent < self.warning {
            UsageLevel::Warning
        } else {
            UsageLevel::Critical
        }
    }
}

impl Default for UsageThresholds {
    fn default() -> Self {
        Self {
            normal: 60.0,
            warning: 85.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardConfig {
    pub cadence: Cadences,
    pub content_sizes: ContentSizes,
    pub min_terminal: TermSize,
    pub margin: u16,
    pub thresholds: UsageThresholds,
    pub process_limit: usize,
    pub network_smoothing_window: usize,
    pub kill_timeout: Duration,
    pub kill_poll: Duration,
    pub cpu_min_interval: Duration,
    pub network_min_interval: Duration,
    pub sensor_interval: Duration,
    pub interface_refresh: Duration,
    pub dns_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            cadence: Cadences::default(),
            content_sizes: ContentSizes::default(),
            min_terminal: TermSize::new(80, 24),
            margin: 1,
            thresholds: UsageThresholds::default(),
            process_limit: 50,
            network_smoothing_window: 3,
            kill_timeout: Duration::from_secs(3),
            kill_poll: Duration::from_millis(100),
            cpu_min_interval: Duration::from_millis(50),
            network_min_interval: Duration::from_millis(50),
            sensor_interval: Duration::from_secs(1),
            interface_refresh: Duration::from_secs(30),
            dns_timeout: Duration::from_secs(2),
        }
    }
}

impl DashboardConfig {
    pub fn with_process_limit(mut self, limit: usize) -> Self {
        self.process_limit = limit.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_levels() {
        let thresholds = UsageThresholds::default();
        assert_eq!(thresholds.level(0.0), UsageLevel::Normal);
        assert_eq!(thresholds.level(59.9), UsageLevel::Normal);
        assert_eq!(thresholds.level(60.0), UsageLevel::Warning);
        assert_eq!(thresholds.level(84.9), UsageLevel::Warning);
        assert_eq!(thresholds.level(85.0), UsageLevel::Critical);
        assert_eq!(thresholds.level(f32::NAN), UsageLevel::Normal);
    }

    #[test]
    fn test_default_cadences() {
        let cadence = Cadences::default();
        assert_eq!(cadence.cpu, Duration::from_millis(50));
        assert_eq!(cadence.processes, Duration::from_millis(200));
        assert_eq!(cadence.system_info_retry, Duration::from_secs(5));
    }

    #[test]
    fn test_process_limit_never_zero() {
        let config = DashboardConfig::default().with_process_limit(0);
        assert_eq!(config.process_limit, 1);
    }

    #[test]
    fn test_term_size_fits() {
        let min = TermSize::new(80, 24);
        assert!(TermSize::new(80, 24).fits(min));
        assert!(!TermSize::new(79, 40).fits(min));
        assert_eq!(TermSize::new(90, 20).max(min), TermSize::new(90, 24));
    }
}
