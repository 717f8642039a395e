//! Funnel configuration types.
//!
//! `FunnelConfig` is the top-level `funnel.toml`. Every difference between
//! bot deployments (brand, payment details, plans, device-to-app mapping,
//! template text, timings) is data in this struct. All fields have defaults,
//! so an empty file yields the stock HOBTiv funnel.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default)]
    pub brand: BrandConfig,

    #[serde(default)]
    pub pricing: PricingConfig,

    /// Device families offered in DEVICE_SELECTION, in menu order.
    #[serde(default = "default_devices")]
    pub devices: Vec<DeviceProfile>,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub escalation: EscalationConfig,

    #[serde(default)]
    pub issuer: IssuerConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    /// Phrasing overrides keyed by `"<template_key>"` or
    /// `"<template_key>.<audience>"`.
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<String>>,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            brand: BrandConfig::default(),
            pricing: PricingConfig::default(),
            devices: default_devices(),
            timing: TimingConfig::default(),
            escalation: EscalationConfig::default(),
            issuer: IssuerConfig::default(),
            transport: TransportConfig::default(),
            templates: BTreeMap::new(),
        }
    }
}

impl FunnelConfig {
    pub fn plan(&self, key: &str) -> Option<&Plan> {
        self.pricing.plans.iter().find(|p| p.key == key)
    }

    pub fn device(&self, key: &str) -> Option<&DeviceProfile> {
        self.devices.iter().find(|d| d.key == key)
    }
}

/// Brand and payment details rendered into messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    #[serde(default = "default_brand_name")]
    pub name: String,
    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
    #[serde(default = "default_pix_key")]
    pub pix_key: String,
    #[serde(default = "default_pix_receiver")]
    pub pix_receiver: String,
    #[serde(default = "default_support_group")]
    pub support_group: String,
}

fn default_brand_name() -> String {
    "HOBTiv".to_string()
}

fn default_assistant_name() -> String {
    "Pedro".to_string()
}

fn default_pix_key() -> String {
    "hobtiv1@gmail.com".to_string()
}

fn default_pix_receiver() -> String {
    "Diogo Martins".to_string()
}

fn default_support_group() -> String {
    "https://chat.whatsapp.com/KPt32Gfvsi5J8HLTRMvRUU".to_string()
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            assistant_name: default_assistant_name(),
            pix_key: default_pix_key(),
            pix_receiver: default_pix_receiver(),
            support_group: default_support_group(),
        }
    }
}

/// Prices are kept in cents to avoid float rounding in messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    /// Promotional one-off price pitched in START.
    #[serde(default = "default_promo_price_cents")]
    pub promo_price_cents: u32,
    /// Crossed-out regular price shown next to the promo.
    #[serde(default = "default_regular_price_cents")]
    pub regular_price_cents: u32,
    /// Monthly maintenance fee.
    #[serde(default = "default_maintenance_fee_cents")]
    pub maintenance_fee_cents: u32,
    /// Plan table shown after a working trial, in display order.
    #[serde(default = "default_plans")]
    pub plans: Vec<Plan>,
}

fn default_currency_symbol() -> String {
    "R$".to_string()
}

fn default_promo_price_cents() -> u32 {
    3499
}

fn default_regular_price_cents() -> u32 {
    6999
}

fn default_maintenance_fee_cents() -> u32 {
    699
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            promo_price_cents: default_promo_price_cents(),
            regular_price_cents: default_regular_price_cents(),
            maintenance_fee_cents: default_maintenance_fee_cents(),
            plans: default_plans(),
        }
    }
}

impl PricingConfig {
    /// Format cents as `R$ 89,99`.
    pub fn format(&self, cents: u32) -> String {
        format!("{} {},{:02}", self.currency_symbol, cents / 100, cents % 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub key: String,
    pub name: String,
    pub price_cents: u32,
    pub screens: u8,
    /// Human wording of the billing period ("por ano", "pagamento único").
    pub period: String,
    /// Words that select this plan in PLAN_PRESENTED.
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_plans() -> Vec<Plan> {
    vec![
        Plan {
            key: "anual".to_string(),
            name: "ANUAL VIP".to_string(),
            price_cents: 8999,
            screens: 2,
            period: "por ano".to_string(),
            keywords: vec!["anual".into(), "89".into(), "ano".into()],
        },
        Plan {
            key: "vitalicio".to_string(),
            name: "VITALÍCIO".to_string(),
            price_cents: 19900,
            screens: 3,
            period: "pagamento único".to_string(),
            keywords: vec![
                "vitalicio".into(),
                "vitalício".into(),
                "199".into(),
                "vida".into(),
                "definitivo".into(),
            ],
        },
        Plan {
            key: "trimestral".to_string(),
            name: "3 MESES".to_string(),
            price_cents: 4999,
            screens: 1,
            period: "a cada 3 meses".to_string(),
            keywords: vec![
                "trimestral".into(),
                "3 meses".into(),
                "49".into(),
                "meses".into(),
            ],
        },
    ]
}

/// A device family and the app recommended for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    pub key: String,
    /// Label used in messages and as the device slot when the user only
    /// answered with the menu number.
    pub label: String,
    /// Menu number and words that select this device family.
    pub keywords: Vec<String>,
    pub primary_app: String,
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Where to find the app ("Play Store", "loja da TV").
    pub store_hint: String,
}

fn default_devices() -> Vec<DeviceProfile> {
    vec![
        DeviceProfile {
            key: "smart_tv".to_string(),
            label: "Smart TV".to_string(),
            keywords: vec![
                "1".into(),
                "tv".into(),
                "smart".into(),
                "samsung".into(),
                "lg".into(),
                "tv android".into(),
            ],
            primary_app: "ABSOLUTO PLAYER".to_string(),
            alternatives: vec!["CANALPLAY".into(), "9XTREAM PLAYER".into(), "IPTV SMARTERS".into()],
            store_hint: "loja de aplicativos da TV".to_string(),
        },
        DeviceProfile {
            key: "mobile".to_string(),
            label: "Celular".to_string(),
            keywords: vec![
                "2".into(),
                "celular".into(),
                "android".into(),
                "phone".into(),
                "iphone".into(),
                "tablet".into(),
            ],
            primary_app: "CANALPLAY".to_string(),
            alternatives: vec!["ABSOLUTO PLAYER".into(), "IPTV SMARTERS LITE".into(), "VU IPTV".into()],
            store_hint: "Play Store ou App Store".to_string(),
        },
        DeviceProfile {
            key: "tv_box".to_string(),
            label: "TV Box".to_string(),
            keywords: vec![
                "3".into(),
                "box".into(),
                "roku".into(),
                "chrome".into(),
                "chromecast".into(),
                "fire stick".into(),
                "firestick".into(),
            ],
            primary_app: "XTREAM PLAYER".to_string(),
            alternatives: vec!["VU IPTV".into(), "IPTV SMARTERS".into()],
            store_hint: "loja de aplicativos do aparelho".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_offer_cooldown_hours")]
    pub offer_cooldown_hours: u32,
    /// Delay between the two parts of a multi-part reply.
    #[serde(default = "default_follow_up_delay_ms")]
    pub follow_up_delay_ms: u64,
    /// Delay of the teaser sent after trial credentials.
    #[serde(default = "default_teaser_delay_minutes")]
    pub teaser_delay_minutes: u64,
    /// Unrecognized answers tolerated in one stage before escalating.
    #[serde(default = "default_max_reprompts")]
    pub max_reprompts: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Confidence floor applied when the current stage recognizes the answer.
    #[serde(default = "default_stage_match_confidence")]
    pub stage_match_confidence: u8,
}

fn default_offer_cooldown_hours() -> u32 {
    24
}

fn default_follow_up_delay_ms() -> u64 {
    3000
}

fn default_teaser_delay_minutes() -> u64 {
    30
}

fn default_max_reprompts() -> u32 {
    3
}

fn default_history_limit() -> usize {
    20
}

fn default_stage_match_confidence() -> u8 {
    70
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            offer_cooldown_hours: default_offer_cooldown_hours(),
            follow_up_delay_ms: default_follow_up_delay_ms(),
            teaser_delay_minutes: default_teaser_delay_minutes(),
            max_reprompts: default_max_reprompts(),
            history_limit: default_history_limit(),
            stage_match_confidence: default_stage_match_confidence(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Chat id of the human attendant who receives handover summaries.
    #[serde(default)]
    pub attendant_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuerMode {
    /// Pseudo-random credentials generated in-process.
    Local,
    /// Accounts created on the reseller panel API.
    Panel,
}

impl Default for IssuerMode {
    fn default() -> Self {
        IssuerMode::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    #[serde(default)]
    pub mode: IssuerMode,
    /// Server URL handed out with credentials.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_trial_prefix")]
    pub trial_prefix: String,
    #[serde(default = "default_account_prefix")]
    pub account_prefix: String,
    #[serde(default = "default_trial_hours")]
    pub trial_hours: u32,
    /// Base URL of the reseller panel API (panel mode only). The bearer key
    /// comes from `FUNNELBOT_PANEL_API_KEY`.
    #[serde(default)]
    pub panel_url: Option<String>,
    #[serde(default = "default_panel_timeout_secs")]
    pub panel_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://vip.hobtv.pro".to_string()
}

fn default_trial_prefix() -> String {
    "TESTE_".to_string()
}

fn default_account_prefix() -> String {
    "hobtiv_".to_string()
}

fn default_trial_hours() -> u32 {
    2
}

fn default_panel_timeout_secs() -> u64 {
    10
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            mode: IssuerMode::default(),
            server_url: default_server_url(),
            trial_prefix: default_trial_prefix(),
            account_prefix: default_account_prefix(),
            trial_hours: default_trial_hours(),
            panel_url: None,
            panel_timeout_secs: default_panel_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// HTTP gateway that relays outbound messages to the chat network. When
    /// unset, outbound messages are only logged.
    #[serde(default)]
    pub gateway_url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            bind: default_bind(),
        }
    }
}
