//! Funnel configuration loader.
//!
//! Reads `funnel.toml` from the data directory (`~/.funnelbot/` in
//! production) and deserializes it into [`FunnelConfig`]. Falls back to the
//! built-in defaults when the file is missing, malformed or invalid.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use funnelbot_core::compose::TemplateCatalog;
use funnelbot_types::config::{FunnelConfig, IssuerMode};
use funnelbot_types::error::ConfigError;
use secrecy::SecretString;

pub const CONFIG_FILE: &str = "funnel.toml";

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "FUNNELBOT_DATA_DIR";
/// Bearer key for the reseller panel issuer.
pub const PANEL_API_KEY_ENV: &str = "FUNNELBOT_PANEL_API_KEY";
/// Shared secret for inbound webhook signatures.
pub const WEBHOOK_SECRET_ENV: &str = "FUNNELBOT_WEBHOOK_SECRET";

/// Resolve the data directory: explicit flag, then `FUNNELBOT_DATA_DIR`,
/// then `~/.funnelbot`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".funnelbot")
        })
}

/// Load `{data_dir}/funnel.toml`.
///
/// - Missing file: defaults, logged at debug.
/// - Unreadable, unparsable or invalid file: defaults, logged at warn.
pub async fn load_funnel_config(data_dir: &Path) -> FunnelConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return FunnelConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return FunnelConfig::default();
        }
    };

    match parse_funnel_config(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Rejected {}: {err}, using defaults", config_path.display());
            FunnelConfig::default()
        }
    }
}

/// Parse and validate a TOML document.
pub fn parse_funnel_config(content: &str) -> Result<FunnelConfig, ConfigError> {
    let config: FunnelConfig = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Render the effective configuration back to TOML.
pub fn render_funnel_config(config: &FunnelConfig) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Write the default configuration unless a file already exists.
///
/// Returns the path and whether a file was written.
pub async fn write_default_config(data_dir: &Path) -> Result<(PathBuf, bool), ConfigError> {
    let config_path = data_dir.join(CONFIG_FILE);
    if tokio::fs::try_exists(&config_path)
        .await
        .map_err(|e| ConfigError::Read(e.to_string()))?
    {
        return Ok((config_path, false));
    }

    tokio::fs::create_dir_all(data_dir)
        .await
        .map_err(|e| ConfigError::Read(e.to_string()))?;
    let rendered = render_funnel_config(&FunnelConfig::default())?;
    tokio::fs::write(&config_path, rendered)
        .await
        .map_err(|e| ConfigError::Read(e.to_string()))?;
    Ok((config_path, true))
}

/// Checks that serde defaults cannot express.
pub fn validate(config: &FunnelConfig) -> Result<(), ConfigError> {
    let plans = &config.pricing.plans;
    if plans.is_empty() {
        return Err(ConfigError::Invalid("pricing.plans must not be empty".into()));
    }
    let mut keys = HashSet::new();
    for plan in plans {
        if !keys.insert(plan.key.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate plan key '{}'", plan.key)));
        }
        if plan.keywords.is_empty() {
            return Err(ConfigError::Invalid(format!("plan '{}' has no keywords", plan.key)));
        }
    }

    if config.devices.is_empty() {
        return Err(ConfigError::Invalid("devices must not be empty".into()));
    }
    let mut keys = HashSet::new();
    for device in &config.devices {
        if !keys.insert(device.key.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate device key '{}'", device.key)));
        }
        if device.keywords.is_empty() {
            return Err(ConfigError::Invalid(format!("device '{}' has no keywords", device.key)));
        }
    }

    if config.issuer.mode == IssuerMode::Panel && config.issuer.panel_url.is_none() {
        return Err(ConfigError::Invalid("issuer.mode = \"panel\" requires issuer.panel_url".into()));
    }

    TemplateCatalog::with_overrides(&config.templates).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}

/// Panel API key from the environment, if set and non-empty.
pub fn panel_api_key() -> Option<SecretString> {
    secret_from_env(PANEL_API_KEY_ENV)
}

/// Webhook signing secret from the environment, if set and non-empty.
pub fn webhook_secret() -> Option<SecretString> {
    secret_from_env(WEBHOOK_SECRET_ENV)
}

fn secret_from_env(name: &str) -> Option<SecretString> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_funnel_config(tmp.path()).await;
        assert_eq!(config.timing.offer_cooldown_hours, 24);
        assert_eq!(config.pricing.plans.len(), 3);
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
[brand]
name = "StreamMax"
pix_key = "pix@streammax.tv"

[timing]
max_reprompts = 5

[escalation]
attendant_id = "5511900000000@s.whatsapp.net"

[templates]
"greeting_pitch" = ["Olá {name}, conheça a {brand}!"]
"#,
        )
        .await
        .unwrap();

        let config = load_funnel_config(tmp.path()).await;
        assert_eq!(config.brand.name, "StreamMax");
        assert_eq!(config.brand.assistant_name, "Pedro");
        assert_eq!(config.timing.max_reprompts, 5);
        assert_eq!(config.timing.history_limit, 20);
        assert_eq!(config.escalation.attendant_id.as_deref(), Some("5511900000000@s.whatsapp.net"));
        assert_eq!(config.templates["greeting_pitch"].len(), 1);
    }

    #[tokio::test]
    async fn invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_funnel_config(tmp.path()).await;
        assert_eq!(config.brand.name, "HOBTiv");
    }

    #[test]
    fn unknown_template_key_is_rejected() {
        let err = parse_funnel_config("[templates]\n\"no_such_key\" = [\"x\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn empty_plan_table_is_rejected() {
        let err = parse_funnel_config("[pricing]\nplans = []\n").unwrap_err();
        assert!(err.to_string().contains("plans"));
    }

    #[test]
    fn panel_mode_needs_a_url() {
        let err = parse_funnel_config("[issuer]\nmode = \"panel\"\n").unwrap_err();
        assert!(err.to_string().contains("panel_url"));
    }

    #[test]
    fn defaults_render_and_parse_back() {
        let rendered = render_funnel_config(&FunnelConfig::default()).unwrap();
        let parsed = parse_funnel_config(&rendered).unwrap();
        assert_eq!(parsed.pricing.plans.len(), 3);
        assert_eq!(parsed.devices[0].key, "smart_tv");
    }

    #[tokio::test]
    async fn default_config_is_written_once() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data");

        let (path, written) = write_default_config(&dir).await.unwrap();
        assert!(written);
        assert!(path.exists());

        let (_, written) = write_default_config(&dir).await.unwrap();
        assert!(!written);
    }

    #[test]
    fn explicit_data_dir_wins() {
        let dir = resolve_data_dir(Some(PathBuf::from("/tmp/funnelbot-test")));
        assert_eq!(dir, PathBuf::from("/tmp/funnelbot-test"));
    }
}
