//! Logging and trace export for funnelbot.

pub mod tracing_setup;
