//! Credential issuers.
//!
//! `create_issuer` picks the implementation from `issuer.mode`.

pub mod local;
pub mod panel;

pub use local::LocalIssuer;
pub use panel::PanelIssuer;

use funnelbot_core::port::CredentialIssuer;
use funnelbot_types::config::{IssuerConfig, IssuerMode, Plan};
use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::IssuerError;
use secrecy::SecretString;

/// Issuer selected at startup.
#[derive(Debug)]
pub enum AnyIssuer {
    Local(LocalIssuer),
    Panel(PanelIssuer),
}

impl CredentialIssuer for AnyIssuer {
    async fn issue_trial(&self) -> Result<Credentials, IssuerError> {
        match self {
            AnyIssuer::Local(issuer) => issuer.issue_trial().await,
            AnyIssuer::Panel(issuer) => issuer.issue_trial().await,
        }
    }

    async fn issue_definitive(&self, plan: &Plan) -> Result<Credentials, IssuerError> {
        match self {
            AnyIssuer::Local(issuer) => issuer.issue_definitive(plan).await,
            AnyIssuer::Panel(issuer) => issuer.issue_definitive(plan).await,
        }
    }
}

/// Build the issuer for `config.mode`.
///
/// `api_key` is only used in panel mode.
pub fn create_issuer(config: &IssuerConfig, api_key: Option<SecretString>) -> Result<AnyIssuer, IssuerError> {
    match config.mode {
        IssuerMode::Local => Ok(AnyIssuer::Local(LocalIssuer::new(config.clone()))),
        IssuerMode::Panel => {
            if api_key.is_none() {
                tracing::warn!("panel issuer configured without an API key");
            }
            Ok(AnyIssuer::Panel(PanelIssuer::from_config(config, api_key)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_mode_builds_a_local_issuer() {
        let issuer = create_issuer(&IssuerConfig::default(), None).unwrap();
        assert!(matches!(issuer, AnyIssuer::Local(_)));
        assert!(issuer.issue_trial().await.unwrap().username.starts_with("TESTE_"));
    }

    #[test]
    fn panel_mode_builds_a_panel_issuer() {
        let config = IssuerConfig {
            mode: IssuerMode::Panel,
            panel_url: Some("https://panel.example/api/".into()),
            ..IssuerConfig::default()
        };
        let issuer = create_issuer(&config, Some(SecretString::from("k"))).unwrap();
        assert!(matches!(issuer, AnyIssuer::Panel(_)));
    }
}
