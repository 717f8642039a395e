//! Rule-based lead classification (BUYER / CUSTOMER / UNDEFINED).
//!
//! Every rule is a set of keyword groups; a rule fires when each of its
//! groups has at least one word-bounded match in the message. Customer rules
//! weigh more than buyer rules so that an existing subscriber's complaint is
//! not mistaken for a fresh sales lead.

use funnelbot_types::classification::{ClassificationResult, LeadCategory, Priority};
use funnelbot_types::contact::tags;
use funnelbot_types::conversation::HistoryEntry;
use tracing::debug;

use super::extractor::{APPS, DataExtractor, PROBLEMS};
use crate::text::{contains_any, fold};

/// Weight of one fired customer rule.
pub const CUSTOMER_WEIGHT: u32 = 2;
/// Weight of one fired buyer rule.
pub const BUYER_WEIGHT: u32 = 1;

/// Confidence for an empty message.
pub const EMPTY_CONFIDENCE: u8 = 10;
/// Confidence when nothing matched and the user has no history.
pub const UNDEFINED_CONFIDENCE: u8 = 30;
/// Confidence when nothing matched but the user talked to us before.
pub const RETURNING_CONFIDENCE: u8 = 40;
/// Floor applied when a named app and a problem appear together.
pub const APP_PROBLEM_CONFIDENCE: u8 = 90;

const CUSTOMER_CAP: u32 = 95;
const BUYER_CAP: u32 = 85;

/// A keyword rule. Every group must match for the rule to fire.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub id: &'static str,
    pub groups: &'static [&'static [&'static str]],
}

impl KeywordRule {
    pub fn matches(&self, folded: &str) -> bool {
        self.groups.iter().all(|group| contains_any(folded, group))
    }
}

const NEGATION_OR_PROBLEM: &[&str] = &["não", "problema", "funciona"];

pub const CUSTOMER_RULES: &[KeywordRule] = &[
    KeywordRule {
        id: "customer.not_working",
        groups: &[&["não funciona", "não está funcionando", "não abre", "não carrega"]],
    },
    KeywordRule {
        id: "customer.malfunction",
        groups: &[&["parou", "travando", "lento", "erro", "problema"]],
    },
    KeywordRule {
        id: "customer.working_app",
        groups: &[&["tem algum aplicativo que funciona", "aplicativo que funciona"]],
    },
    KeywordRule {
        id: "customer.device_issue",
        groups: &[&["fire stick", "tv", "celular"], NEGATION_OR_PROBLEM],
    },
    KeywordRule {
        id: "customer.app_issue",
        groups: &[&["aplicativo", "app"], &["não", "problema", "funciona", "abre"]],
    },
    KeywordRule {
        id: "customer.support",
        groups: &[&["suporte", "ajuda", "técnico", "atendimento"]],
    },
    KeywordRule {
        id: "customer.renewal",
        groups: &[&["renovar", "renovação", "vencendo", "venceu"]],
    },
    KeywordRule {
        id: "customer.billing",
        groups: &[&["pagar", "pagamento", "mensalidade", "taxa"]],
    },
    KeywordRule {
        id: "customer.own_plan",
        groups: &[&["plano", "upgrade", "mudar"], &["meu", "minha"]],
    },
    KeywordRule {
        id: "customer.account",
        groups: &[&["meu acesso", "minha conta", "já paguei", "cliente"]],
    },
    KeywordRule {
        id: "customer.used_to_work",
        groups: &[&["antes funcionava", "funcionava", "estava funcionando"]],
    },
    KeywordRule {
        id: "customer.named_app_issue",
        groups: &[&["9xtream", "xpiptv", "vu iptv", "smart iptv"], &["não", "problema"]],
    },
];

pub const BUYER_RULES: &[KeywordRule] = &[
    KeywordRule {
        id: "buyer.want",
        groups: &[&["eu quero", "quero"]],
    },
    KeywordRule {
        id: "buyer.price",
        groups: &[&["preço", "valor", "quanto custa", "promoção", "desconto"]],
    },
    KeywordRule {
        id: "buyer.how_it_works",
        groups: &[&["como funciona"]],
    },
    KeywordRule {
        id: "buyer.catalog",
        groups: &[&["planos", "pacote", "sky", "netflix", "interesse", "testar", "teste"]],
    },
    KeywordRule {
        id: "buyer.first_time",
        groups: &[&["primeira vez", "novo", "começar", "ativar"]],
    },
    KeywordRule {
        id: "buyer.campaign",
        groups: &[&["vi sua mensagem", "recebi", "campanha"]],
    },
    KeywordRule {
        id: "buyer.referred",
        groups: &[&["indicação", "indicaram", "recomendaram"]],
    },
    // Answers to the sales funnel's own questions.
    KeywordRule {
        id: "buyer.affirmative",
        groups: &[&["sim", "interessado", "aceito", "vamos", "bora"]],
    },
    KeywordRule {
        id: "buyer.installed",
        groups: &[&["instalei", "pronto", "baixei"]],
    },
    KeywordRule {
        id: "buyer.trial_worked",
        groups: &[&["funcionou", "carregou", "perfeito", "show", "ótimo"]],
    },
    KeywordRule {
        id: "buyer.plan_choice",
        groups: &[&["anual", "vitalício", "trimestral", "3 meses"]],
    },
    KeywordRule {
        id: "buyer.paid",
        groups: &[&["paguei", "comprovante", "transferi", "pix"]],
    },
];

/// Words in the user's earlier messages that show they already bought.
const PURCHASE_MARKERS: &[&str] = &["pagamento", "ativado", "comprovante"];

/// Extra customer score when the user already bought.
const PURCHASE_BONUS: u32 = 3;
/// Extra customer score for a named app plus a problem keyword.
const APP_PROBLEM_BONUS: u32 = 3;
/// Extra customer score for asking which app works.
const WORKING_APP_BONUS: u32 = 4;
/// Extra buyer score for a new contact showing buyer signals.
const NEW_CONTACT_BONUS: u32 = 1;

const HIGH_PRIORITY: &[&str] = &[
    "urgente",
    "parou",
    "não funciona",
    "problema sério",
    "quero cancelar",
    "não paguei",
    "venceu",
];

const LOW_PRIORITY: &[&str] = &[
    "curiosidade",
    "talvez",
    "depois",
    "futuramente",
    "só queria saber",
    "informação",
];

/// Keyword-table lead classifier.
#[derive(Debug, Clone, Default)]
pub struct LeadClassifier {
    extractor: DataExtractor,
}

impl LeadClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one message.
    ///
    /// `history` is the conversation before this message; `contact_tags`
    /// are the tags the CRM already holds for the user.
    pub fn classify(
        &self,
        text: &str,
        history: &[HistoryEntry],
        contact_tags: &[String],
    ) -> ClassificationResult {
        let folded = fold(text.trim());
        let extracted_slots = self.extractor.extract(text);

        if folded.is_empty() {
            return ClassificationResult {
                category: LeadCategory::Undefined,
                confidence: EMPTY_CONFIDENCE,
                priority: Priority::Medium,
                extracted_slots,
                matched_rules: Vec::new(),
            };
        }

        let mut matched_rules = Vec::new();
        let mut customer_score = 0;
        for rule in CUSTOMER_RULES.iter().filter(|r| r.matches(&folded)) {
            customer_score += CUSTOMER_WEIGHT;
            matched_rules.push(rule.id.to_string());
        }

        let mut buyer_score = 0;
        for rule in BUYER_RULES.iter().filter(|r| r.matches(&folded)) {
            buyer_score += BUYER_WEIGHT;
            matched_rules.push(rule.id.to_string());
        }

        let has_history = !history.is_empty();
        if already_bought(history, contact_tags) {
            customer_score += PURCHASE_BONUS;
            matched_rules.push("customer.already_bought".to_string());
        }

        if !has_history && customer_score == 0 && buyer_score > 0 {
            buyer_score += NEW_CONTACT_BONUS;
        }

        let app_with_problem = contains_any(&folded, APPS) && contains_any(&folded, PROBLEMS);
        if app_with_problem {
            customer_score += APP_PROBLEM_BONUS;
            matched_rules.push("customer.app_with_problem".to_string());
        }

        if folded.contains("tem algum aplicativo que funciona") {
            customer_score += WORKING_APP_BONUS;
        }

        let (category, confidence) = if customer_score > buyer_score {
            let mut confidence = (customer_score * 15 + 30).min(CUSTOMER_CAP) as u8;
            if app_with_problem {
                confidence = confidence.max(APP_PROBLEM_CONFIDENCE);
            }
            (LeadCategory::Customer, confidence)
        } else if buyer_score > 0 {
            (LeadCategory::Buyer, (buyer_score * 20 + 30).min(BUYER_CAP) as u8)
        } else if has_history {
            (LeadCategory::Customer, RETURNING_CONFIDENCE)
        } else {
            (LeadCategory::Undefined, UNDEFINED_CONFIDENCE)
        };

        let priority = priority_for(&folded, category);

        debug!(
            %category,
            confidence,
            customer_score,
            buyer_score,
            rules = matched_rules.len(),
            "classified message"
        );

        ClassificationResult {
            category,
            confidence,
            priority,
            extracted_slots,
            matched_rules,
        }
    }
}

fn already_bought(history: &[HistoryEntry], contact_tags: &[String]) -> bool {
    let tagged = contact_tags.iter().any(|t| t == tags::ACTIVE_CUSTOMER);
    tagged
        || history
            .iter()
            .filter(|entry| !entry.automated)
            .any(|entry| contains_any(&fold(&entry.text), PURCHASE_MARKERS))
}

/// High-priority words win, then low-priority words, then existing
/// customers are high, everyone else medium.
pub fn priority_for(folded: &str, category: LeadCategory) -> Priority {
    if contains_any(folded, HIGH_PRIORITY) {
        Priority::High
    } else if contains_any(folded, LOW_PRIORITY) {
        Priority::Low
    } else if category == LeadCategory::Customer {
        Priority::High
    } else {
        Priority::Medium
    }
}
