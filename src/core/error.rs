/// Error types shared by the metric providers and the layout engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("process {0} no longer exists")]
    NoSuchProcess(u32),

    #[error("access denied to process {0}")]
    AccessDenied(u32),

    #[error("{domain} provider unavailable: {reason}")]
    Unavailable { domain: &'static str, reason: String },

    #[error("terminal {width}x{height} is below the {min_width}x{min_height} minimum")]
    InsufficientSpace {
        width: u16,
        height: u16,
        min_width: u16,
        min_height: u16,
    },

    #[error("draw area {0:?} lies outside the display surface")]
    OutOfBounds(ratatui::layout::Rect),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    pub fn unavailable(domain: &'static str, reason: impl Into<String>) -> Self {
        MonitorError::Unavailable {
            domain,
            reason: reason.into(),
        }
    }

    /// Transient errors are the ones a provider recovers from locally
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MonitorError::NoSuchProcess(_) | MonitorError::AccessDenied(_) | MonitorError::Unavailable { .. }
        )
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;
