//! Slot extraction: device, app, problem and intent mentioned in a message.

use funnelbot_types::classification::ExtractedSlots;

use crate::text::{first_match, fold};

/// Devices, most specific first.
pub const DEVICES: &[&str] = &[
    "fire stick",
    "firestick",
    "tv box",
    "tv android",
    "smart tv",
    "chromecast",
    "roku",
    "samsung",
    "lg",
    "iphone",
    "android",
    "celular",
    "tablet",
    "pc",
    "computador",
    "tv",
];

/// Third-party player apps.
pub const APPS: &[&str] = &[
    "9xtream",
    "xpiptv",
    "vu iptv",
    "smart iptv",
    "ss iptv",
    "iptv smarters",
    "xciptv",
    "canalplay",
    "smart one",
    "absoluto player",
    "xtream player",
];

pub const PROBLEMS: &[&str] = &[
    "não abre",
    "não carrega",
    "travando",
    "lento",
    "erro",
    "não conecta",
    "sem som",
    "sem imagem",
    "bufferando",
    "não funciona",
];

pub const INTENTS: &[&str] = &[
    "comprar",
    "renovar",
    "upgrade",
    "cancelar",
    "suporte",
    "testar",
    "ativar",
    "problema",
    "dúvida",
];

/// Stateless slot extractor. Running it twice on the same text yields the
/// same slots; merging into the conversation is the caller's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataExtractor;

impl DataExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedSlots {
        let folded = fold(text);
        ExtractedSlots {
            device: first_match(&folded, DEVICES).map(str::to_string),
            app: first_match(&folded, APPS).map(str::to_string),
            problem: first_match(&folded, PROBLEMS).map(str::to_string),
            intent: first_match(&folded, INTENTS).map(str::to_string),
        }
    }
}
