/// sysdash: a concurrent terminal dashboard for CPU, memory, network and process metrics

pub mod app;
pub mod cli;
pub mod core;
pub mod input;
pub mod scheduler;
pub mod screens;
pub mod utils;
pub mod widgets;
