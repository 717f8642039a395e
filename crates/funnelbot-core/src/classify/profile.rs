//! Five-way behavioural profile classifier.

use funnelbot_types::classification::{CustomerProfile, ProfileResult};

use crate::text::{contains_term, fold};

/// Score added per matched keyword.
pub const KEYWORD_WEIGHT: u32 = 2;
/// Confidence reported when no profile keyword matched.
pub const DEFAULT_CONFIDENCE: u8 = 30;
/// Confidence at or above which a profile tag is worth storing.
pub const TAG_THRESHOLD: u8 = 60;

fn keywords(profile: CustomerProfile) -> &'static [&'static str] {
    match profile {
        CustomerProfile::Loyal => &["quero renovar", "filho quer", "vou indicar", "manda o pix", "renova ai"],
        CustomerProfile::Negotiator => &["muito caro", "desconto", "promoção", "valor", "barato", "ta caro"],
        CustomerProfile::Cautious => &["testar", "experimentar", "como funciona", "depois decido", "vou pensar"],
        CustomerProfile::Questioner => &["duas telas", "como é", "vai lembrar", "funciona como", "explica"],
        CustomerProfile::Technical => &["url mudou", "travando", "não ta pegando", "reinstalar", "app", "login"],
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileClassifier;

impl ProfileClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Pick the highest-scoring profile. Ties go to the profile listed first
    /// in `CustomerProfile::ALL`; no match at all means a cautious lead.
    pub fn classify(&self, text: &str) -> ProfileResult {
        let folded = fold(text);

        let mut best = (CustomerProfile::Cautious, 0u32);
        for profile in CustomerProfile::ALL {
            let score = keywords(profile)
                .iter()
                .filter(|kw| contains_term(&folded, kw))
                .count() as u32
                * KEYWORD_WEIGHT;
            if score > best.1 {
                best = (profile, score);
            }
        }

        match best {
            (_, 0) => ProfileResult {
                profile: CustomerProfile::Cautious,
                confidence: DEFAULT_CONFIDENCE,
            },
            (profile, score) => ProfileResult {
                profile,
                confidence: (score * 20).min(100) as u8,
            },
        }
    }
}
