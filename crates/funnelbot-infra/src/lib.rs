//! Infrastructure layer for funnelbot.
//!
//! Implements the ports defined in `funnelbot-core`: the JSON contact store,
//! the local and panel credential issuers, the HTTP gateway transport, plus
//! `funnel.toml` loading and inbound webhook signature checks.

pub mod config;
pub mod contact;
pub mod issuer;
pub mod transport;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;
