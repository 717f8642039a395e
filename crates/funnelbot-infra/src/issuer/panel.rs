//! Reseller panel issuer.
//!
//! Creates real trial and paid accounts through the panel's HTTP API:
//!
//! - `POST {panel_url}/teste/criar` with `{"hours": N}`
//! - `POST {panel_url}/conta/criar` with `{"plan": "...", "screens": N}`
//!
//! Both answer `{"username": "...", "password": "...", "url": "..."}`.

use std::time::Duration;

use funnelbot_core::port::CredentialIssuer;
use funnelbot_types::config::{IssuerConfig, Plan};
use funnelbot_types::credentials::Credentials;
use funnelbot_types::error::IssuerError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct PanelAccount {
    username: String,
    password: String,
    #[serde(default)]
    url: Option<String>,
}

pub struct PanelIssuer {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    server_url: String,
    trial_hours: u32,
}

impl std::fmt::Debug for PanelIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanelIssuer")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PanelIssuer {
    pub fn from_config(config: &IssuerConfig, api_key: Option<SecretString>) -> Result<Self, IssuerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.panel_timeout_secs))
            .build()
            .map_err(|e| IssuerError::Unavailable(e.to_string()))?;
        Self::with_http_client(config, api_key, client)
    }

    pub fn with_http_client(
        config: &IssuerConfig,
        api_key: Option<SecretString>,
        client: reqwest::Client,
    ) -> Result<Self, IssuerError> {
        let base_url = config
            .panel_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| IssuerError::Unavailable("issuer.panel_url is not configured".into()))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            server_url: config.server_url.clone(),
            trial_hours: config.trial_hours,
        })
    }

    async fn create(&self, path: &str, body: serde_json::Value) -> Result<Credentials, IssuerError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "panel request failed");
            IssuerError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "panel rejected account creation");
            return Err(IssuerError::Rejected(format!("{status}: {detail}")));
        }

        let account: PanelAccount = response
            .json()
            .await
            .map_err(|e| IssuerError::Rejected(format!("unexpected panel response: {e}")))?;
        let credentials = Credentials::new(
            account.username,
            account.password,
            account.url.unwrap_or_else(|| self.server_url.clone()),
        );
        if !credentials.is_complete() {
            return Err(IssuerError::Rejected("panel returned incomplete credentials".into()));
        }
        Ok(credentials)
    }
}

impl CredentialIssuer for PanelIssuer {
    async fn issue_trial(&self) -> Result<Credentials, IssuerError> {
        let credentials = self
            .create("/teste/criar", serde_json::json!({ "hours": self.trial_hours }))
            .await?;
        tracing::info!(username = %credentials.username, "panel trial created");
        Ok(credentials)
    }

    async fn issue_definitive(&self, plan: &Plan) -> Result<Credentials, IssuerError> {
        let credentials = self
            .create(
                "/conta/criar",
                serde_json::json!({ "plan": plan.key, "screens": plan.screens }),
            )
            .await?;
        tracing::info!(username = %credentials.username, plan = %plan.key, "panel account created");
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{direct_client, stub_server};
    use funnelbot_types::config::{IssuerMode, PricingConfig};

    fn config(panel_url: &str) -> IssuerConfig {
        IssuerConfig {
            mode: IssuerMode::Panel,
            panel_url: Some(panel_url.to_string()),
            ..IssuerConfig::default()
        }
    }

    fn issuer(url: &str) -> PanelIssuer {
        PanelIssuer::with_http_client(&config(url), Some(SecretString::from("panel-key")), direct_client()).unwrap()
    }

    #[tokio::test]
    async fn trial_posts_hours_with_bearer_key() {
        let server = stub_server(vec![(
            200,
            r#"{"username":"TESTE_123456","password":"ABCD2345","url":"http://panel.tv"}"#,
        )])
        .await;

        let creds = issuer(&server.url).issue_trial().await.unwrap();
        assert_eq!(creds.username, "TESTE_123456");
        assert_eq!(creds.url, "http://panel.tv");

        let requests = server.requests();
        assert!(requests[0].head.starts_with("POST /teste/criar"));
        assert!(requests[0].head.to_lowercase().contains("authorization: bearer panel-key"));
        assert_eq!(requests[0].body, r#"{"hours":2}"#);
    }

    #[tokio::test]
    async fn missing_url_falls_back_to_server_url() {
        let server = stub_server(vec![(200, r#"{"username":"hobtiv_000001","password":"PW12345678"}"#)]).await;

        let plan = PricingConfig::default().plans.remove(0);
        let creds = issuer(&server.url).issue_definitive(&plan).await.unwrap();
        assert_eq!(creds.url, "http://vip.hobtv.pro");
        assert!(server.requests()[0].head.starts_with("POST /conta/criar"));
        assert!(server.requests()[0].body.contains(r#""plan":"anual""#));
    }

    #[tokio::test]
    async fn error_status_is_rejected() {
        let server = stub_server(vec![(402, r#"{"error":"no credits"}"#)]).await;

        let err = issuer(&server.url).issue_trial().await.unwrap_err();
        assert!(matches!(err, IssuerError::Rejected(msg) if msg.contains("no credits")));
    }

    #[tokio::test]
    async fn unreachable_panel_is_unavailable() {
        let err = issuer("http://127.0.0.1:1").issue_trial().await.unwrap_err();
        assert!(matches!(err, IssuerError::Unavailable(_)));
    }

    #[test]
    fn panel_url_is_required() {
        let err = PanelIssuer::from_config(&IssuerConfig::default(), None).unwrap_err();
        assert!(matches!(err, IssuerError::Unavailable(_)));
    }
}
