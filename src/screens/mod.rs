pub mod dashboard;
pub mod layout;

// The dashboard is one screen of fixed panels:
// - System, CPU, memory and network panels fed by their own tasks
// - Process list with sort, search, details and kill
// - Key help
//
// A terminal below the minimum size shows a warning instead of panels.

pub use dashboard::DashboardRenderer;
pub use layout::{Layout, LayoutEngine, Section, SectionId};
