//! Use cases wired on top of the ports.
//!
//! Services depend on the port traits only; concrete transports, stores and
//! issuers come from `funnelbot-infra`.

pub mod funnel;

pub use funnel::FunnelService;
