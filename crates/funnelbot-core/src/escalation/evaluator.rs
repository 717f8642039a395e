//! Decide whether a message must be routed to a human.

use funnelbot_types::classification::ClassificationResult;
use funnelbot_types::escalation::{EscalationDecision, EscalationKind, Urgency};

use crate::text::{first_match, fold};

/// Cancellation, legal threats, strong dissatisfaction and explicit requests
/// for a person. Fire regardless of how far the conversation got.
pub const IMMEDIATE_KEYWORDS: &[&str] = &[
    "quero cancelar",
    "não gostei",
    "quero reclamação",
    "reclamação",
    "processo judicial",
    "procon",
    "advogado",
    "problema sério",
    "muito insatisfeito",
    "humano",
    "atendente",
];

/// "Still not working" after the bot already tried.
pub const COMPLEX_SUPPORT_KEYWORDS: &[&str] = &[
    "já tentei tudo",
    "nada funciona",
    "continua sem funcionar",
    "não resolve",
    "não resolveu",
    "mesma coisa",
    "ainda não funciona",
];

/// Bulk, business or custom-pricing requests.
pub const SPECIAL_SALES_KEYWORDS: &[&str] = &[
    "desconto especial",
    "proposta comercial",
    "plano customizado",
    "empresa",
    "revenda",
    "revender",
    "muitas telas",
];

/// Automated turns required before COMPLEX_SUPPORT may fire.
pub const COMPLEX_SUPPORT_MIN_TURNS: u32 = 2;
/// Automated turns required before LOW_CONFIDENCE may fire.
pub const LOW_CONFIDENCE_MIN_TURNS: u32 = 3;
/// Classification confidence below which the bot is considered lost.
pub const LOW_CONFIDENCE_THRESHOLD: u8 = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationEvaluator;

impl EscalationEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate one message. `automated_turn_count` is the number of bot
    /// replies sent before this message.
    pub fn evaluate(
        &self,
        text: &str,
        automated_turn_count: u32,
        classification: &ClassificationResult,
    ) -> EscalationDecision {
        let folded = fold(text);

        if let Some(keyword) = first_match(&folded, IMMEDIATE_KEYWORDS) {
            return EscalationDecision::escalate(
                EscalationKind::Immediate,
                Urgency::High,
                format!("Cliente mencionou: \"{keyword}\""),
            );
        }

        if automated_turn_count >= COMPLEX_SUPPORT_MIN_TURNS
            && first_match(&folded, COMPLEX_SUPPORT_KEYWORDS).is_some()
        {
            return EscalationDecision::escalate(
                EscalationKind::ComplexSupport,
                Urgency::High,
                format!("Problema persiste após {automated_turn_count} tentativas automáticas"),
            );
        }

        if let Some(keyword) = first_match(&folded, SPECIAL_SALES_KEYWORDS) {
            return EscalationDecision::escalate(
                EscalationKind::SpecialSales,
                Urgency::Medium,
                format!("Solicitação comercial específica: \"{keyword}\""),
            );
        }

        if automated_turn_count >= LOW_CONFIDENCE_MIN_TURNS
            && classification.confidence < LOW_CONFIDENCE_THRESHOLD
        {
            return EscalationDecision::escalate(
                EscalationKind::LowConfidence,
                Urgency::Medium,
                "Atendimento automático não identificou a necessidade do cliente",
            );
        }

        EscalationDecision::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnelbot_types::classification::{ExtractedSlots, LeadCategory, Priority};

    fn classification(confidence: u8) -> ClassificationResult {
        ClassificationResult {
            category: LeadCategory::Undefined,
            confidence,
            priority: Priority::Medium,
            extracted_slots: ExtractedSlots::default(),
            matched_rules: Vec::new(),
        }
    }

    #[test]
    fn immediate_keywords_escalate_at_any_turn() {
        let evaluator = EscalationEvaluator::new();
        for keyword in IMMEDIATE_KEYWORDS {
            for turn in [0, 1, 5, 40] {
                let text = format!("olha, {keyword}!");
                let decision = evaluator.evaluate(&text, turn, &classification(95));
                assert!(decision.must_escalate, "{keyword} at turn {turn}");
                assert_eq!(decision.kind, Some(EscalationKind::Immediate));
                assert_eq!(decision.urgency, Urgency::High);
            }
        }
    }

    #[test]
    fn immediate_matches_unaccented_input() {
        let decision = EscalationEvaluator::new().evaluate("nao gostei do servico", 0, &classification(80));
        assert_eq!(decision.kind, Some(EscalationKind::Immediate));
    }

    #[test]
    fn complex_support_waits_for_second_turn() {
        let evaluator = EscalationEvaluator::new();
        let text = "já tentei tudo e nada funciona";

        assert!(!evaluator.evaluate(text, 0, &classification(80)).must_escalate);
        assert!(!evaluator.evaluate(text, 1, &classification(80)).must_escalate);

        let decision = evaluator.evaluate(text, 2, &classification(80));
        assert!(decision.must_escalate);
        assert_eq!(decision.kind, Some(EscalationKind::ComplexSupport));
        assert_eq!(decision.urgency, Urgency::High);
    }

    #[test]
    fn special_sales_is_medium_urgency() {
        let decision = EscalationEvaluator::new().evaluate("preciso para minha empresa", 0, &classification(80));
        assert_eq!(decision.kind, Some(EscalationKind::SpecialSales));
        assert_eq!(decision.urgency, Urgency::Medium);
        assert!(decision.reason.contains("empresa"));
    }

    #[test]
    fn low_confidence_needs_three_turns() {
        let evaluator = EscalationEvaluator::new();
        assert!(!evaluator.evaluate("hmm", 2, &classification(30)).must_escalate);
        assert!(!evaluator.evaluate("hmm", 3, &classification(50)).must_escalate);

        let decision = evaluator.evaluate("hmm", 3, &classification(49));
        assert_eq!(decision.kind, Some(EscalationKind::LowConfidence));
    }

    #[test]
    fn ordinary_message_does_not_escalate() {
        let decision = EscalationEvaluator::new().evaluate("quero o teste", 1, &classification(70));
        assert!(!decision.must_escalate);
        assert!(decision.kind.is_none());
    }
}
