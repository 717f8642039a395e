//! Outbound side of the chat transport.

use funnelbot_types::error::TransportError;

/// Delivers text to a user on the chat network.
///
/// Implementations retry transient failures themselves; an `Err` means the
/// message was not delivered.
pub trait ChatTransport: Send + Sync {
    fn send(
        &self,
        user_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
