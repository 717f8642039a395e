//! Chat transports.

pub mod http_gateway;
pub mod log;

pub use http_gateway::HttpGatewayTransport;
pub use log::LogTransport;

use funnelbot_core::port::ChatTransport;
use funnelbot_types::config::TransportConfig;
use funnelbot_types::error::TransportError;

#[derive(Debug)]
pub enum AnyTransport {
    Gateway(HttpGatewayTransport),
    Log(LogTransport),
}

impl ChatTransport for AnyTransport {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        match self {
            AnyTransport::Gateway(transport) => transport.send(user_id, text).await,
            AnyTransport::Log(transport) => transport.send(user_id, text).await,
        }
    }
}

/// Gateway transport when `gateway_url` is set, log-only otherwise.
pub fn create_transport(config: &TransportConfig) -> Result<AnyTransport, TransportError> {
    match config.gateway_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            tracing::info!(gateway = url, "using HTTP gateway transport");
            Ok(AnyTransport::Gateway(HttpGatewayTransport::new(url, config)?))
        }
        _ => {
            tracing::info!("no gateway configured, outbound messages are logged only");
            Ok(AnyTransport::Log(LogTransport))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_gateway_falls_back_to_logging() {
        let transport = create_transport(&TransportConfig::default()).unwrap();
        assert!(matches!(transport, AnyTransport::Log(_)));
        transport.send("u", "oi").await.unwrap();
    }

    #[test]
    fn gateway_url_selects_http_transport() {
        let config = TransportConfig {
            gateway_url: Some("http://localhost:8080/send".into()),
            ..TransportConfig::default()
        };
        assert!(matches!(create_transport(&config).unwrap(), AnyTransport::Gateway(_)));
    }
}
