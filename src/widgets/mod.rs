// Reusable drawing primitives; panel layouts live in screens/dashboard.rs
pub mod usage_bar;

pub use usage_bar::UsageBar;
