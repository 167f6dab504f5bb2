//! Server and session statistics

pub mod metrics;

pub use metrics::{ServerStats, ServerStatsSnapshot, SessionStats};
