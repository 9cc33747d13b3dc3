//! Core - configuration, application state, background tasks

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::AppState;
pub use tasks::{BackgroundTasks, TaskKind};
