//! Transport that only logs outbound messages.
//!
//! Used when no gateway is configured, so the HTTP surface can run without a
//! chat network attached.

use funnelbot_core::port::ChatTransport;
use funnelbot_types::error::TransportError;

#[derive(Debug, Default)]
pub struct LogTransport;

impl ChatTransport for LogTransport {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        tracing::info!(user_id, chars = text.chars().count(), "outbound message (no gateway configured)");
        tracing::debug!(user_id, text, "outbound message body");
        Ok(())
    }
}
