//! Handover sub-dialogue: a few questions asked before a human takes over,
//! then a summary block for the attendant.
//!
//! Progress lives in `ConversationState::handover`, so the dialogue resumes
//! correctly across messages.

use chrono::{DateTime, Utc};
use funnelbot_types::classification::{ClassificationResult, LeadCategory};
use funnelbot_types::conversation::ConversationState;
use funnelbot_types::escalation::{
    EscalationDecision, EscalationKind, HandoverAnswers, HandoverFlow, HandoverProgress, HandoverStep, Urgency,
};

use crate::compose::{TemplateKey, TemplateVars};
use crate::text::truncate_chars;

/// Placeholder for summary fields the user never provided.
pub const NOT_INFORMED: &str = "Não informado";
/// History entries quoted in the summary.
pub const RECENT_MESSAGES: usize = 3;
/// Characters kept per quoted message.
pub const RECENT_MESSAGE_CHARS: usize = 50;

const DEVICE_CHOICES: [&str; 4] = [
    "Smart TV",
    "Celular/Tablet",
    "Fire Stick/Chromecast",
    "Vários dispositivos",
];

const INTEREST_CHOICES: [&str; 4] = [
    "Canais de esporte",
    "Filmes e séries",
    "Canais infantis",
    "Pacote completo",
];

/// Result of feeding one answer to the sub-dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverTurn {
    /// Ask the next question.
    Prompt(TemplateKey),
    /// All answers collected.
    Complete { closing: TemplateKey, summary: TemplateKey },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HandoverDialogue;

impl HandoverDialogue {
    pub fn new() -> Self {
        Self
    }

    /// Begin collection for an escalation. IMMEDIATE skips collection and
    /// returns `None`.
    pub fn start(
        &self,
        decision: &EscalationDecision,
        category: LeadCategory,
        now: DateTime<Utc>,
    ) -> Option<(HandoverProgress, TemplateKey)> {
        let kind = decision.kind?;
        let flow = match kind {
            EscalationKind::Immediate => return None,
            EscalationKind::SpecialSales => HandoverFlow::Sales,
            EscalationKind::ComplexSupport => HandoverFlow::Support,
            EscalationKind::LowConfidence => match category {
                LeadCategory::Customer => HandoverFlow::Support,
                _ => HandoverFlow::Sales,
            },
        };

        let (step, prompt) = match flow {
            HandoverFlow::Sales => (HandoverStep::AwaitName, TemplateKey::HandoverAskName),
            HandoverFlow::Support => (HandoverStep::AwaitTechnicalDetails, TemplateKey::HandoverAskTechnical),
        };

        let progress = HandoverProgress {
            kind,
            urgency: decision.urgency,
            reason: decision.reason.clone(),
            flow,
            step,
            answers: HandoverAnswers::default(),
            started_at: now,
        };
        Some((progress, prompt))
    }

    /// Record `answer` for the current step and move on.
    pub fn advance(&self, progress: &mut HandoverProgress, answer: &str) -> HandoverTurn {
        let answer = answer.trim();
        match progress.step {
            HandoverStep::AwaitName => {
                progress.answers.name = non_empty(answer);
                progress.step = HandoverStep::AwaitDevice;
                HandoverTurn::Prompt(TemplateKey::HandoverAskDevice)
            }
            HandoverStep::AwaitDevice => {
                progress.answers.device = non_empty(&numbered_choice(answer, &DEVICE_CHOICES));
                progress.step = HandoverStep::AwaitInterest;
                HandoverTurn::Prompt(TemplateKey::HandoverAskInterest)
            }
            HandoverStep::AwaitInterest => {
                progress.answers.interest = non_empty(&numbered_choice(answer, &INTEREST_CHOICES));
                HandoverTurn::Complete {
                    closing: TemplateKey::HandoverDoneSales,
                    summary: TemplateKey::HandoverSummarySales,
                }
            }
            HandoverStep::AwaitTechnicalDetails => {
                progress.answers.technical_details = non_empty(answer);
                progress.step = HandoverStep::AwaitLastWorking;
                HandoverTurn::Prompt(TemplateKey::HandoverAskLastWorking)
            }
            HandoverStep::AwaitLastWorking => {
                progress.answers.last_working = non_empty(answer);
                HandoverTurn::Complete {
                    closing: TemplateKey::HandoverDoneSupport,
                    summary: TemplateKey::HandoverSummarySupport,
                }
            }
        }
    }

    /// Values for the prompts asked during collection.
    pub fn prompt_vars(&self, progress: &HandoverProgress) -> TemplateVars {
        let mut vars = TemplateVars::new();
        if let Some(name) = &progress.answers.name {
            vars.set("name", name.clone());
        }
        vars
    }

    /// Values for the attendant summary. Every field has a value, falling
    /// back to what the conversation already collected and then to
    /// `NOT_INFORMED`.
    pub fn summary_vars(
        &self,
        state: &ConversationState,
        progress: Option<&HandoverProgress>,
        contact_name: Option<&str>,
        classification: &ClassificationResult,
        urgency: Urgency,
        reason: &str,
    ) -> TemplateVars {
        let answers = progress.map(|p| &p.answers);
        let slots = &state.collected_slots;

        let pick = |answer: Option<&String>, fallback: Option<&String>| -> String {
            answer
                .or(fallback)
                .cloned()
                .unwrap_or_else(|| NOT_INFORMED.to_string())
        };

        let customer_name = answers
            .and_then(|a| a.name.clone())
            .or_else(|| contact_name.map(str::to_string))
            .unwrap_or_else(|| NOT_INFORMED.to_string());

        let mut vars = TemplateVars::new();
        vars.set("customerName", customer_name)
            .set("phone", phone_from_user_id(&state.user_id))
            .set("interest", pick(answers.and_then(|a| a.interest.as_ref()), slots.intent.as_ref()))
            .set("device", pick(answers.and_then(|a| a.device.as_ref()), slots.device.as_ref()))
            .set("app", pick(None, slots.app.as_ref()))
            .set(
                "problem",
                pick(
                    answers.and_then(|a| a.technical_details.as_ref()),
                    slots.declared_problem.as_ref(),
                ),
            )
            .set("lastWorking", pick(answers.and_then(|a| a.last_working.as_ref()), None))
            .set("category", classification.category.to_string())
            .set("priority", classification.priority.to_string())
            .set("urgency", urgency.to_string())
            .set("reason", reason.to_string())
            .set("recentMessages", recent_messages(state));
        vars
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Map a bare menu number ("2", "2️⃣") to its label; anything else is kept
/// as written.
fn numbered_choice(answer: &str, choices: &[&str; 4]) -> String {
    let digits: String = answer.chars().filter(char::is_ascii_digit).collect();
    let rest_is_decoration = answer
        .chars()
        .all(|c| c.is_ascii_digit() || !c.is_alphanumeric());

    if rest_is_decoration && digits.len() == 1 {
        if let Some(label) = digits
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| choices.get(i))
        {
            return (*label).to_string();
        }
    }
    answer.to_string()
}

/// Strip the chat-network suffix from a user id.
pub fn phone_from_user_id(user_id: &str) -> String {
    user_id.split('@').next().unwrap_or(user_id).to_string()
}

fn recent_messages(state: &ConversationState) -> String {
    let start = state.history.len().saturating_sub(RECENT_MESSAGES);
    let lines: Vec<String> = state.history[start..]
        .iter()
        .map(|entry| format!("{}: {}", entry.direction, truncate_chars(&entry.text, RECENT_MESSAGE_CHARS)))
        .collect();
    if lines.is_empty() {
        NOT_INFORMED.to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use funnelbot_types::classification::{ExtractedSlots, Priority};
    use funnelbot_types::conversation::{Direction, HistoryEntry};

    fn decision(kind: EscalationKind) -> EscalationDecision {
        EscalationDecision::escalate(kind, Urgency::Medium, "motivo")
    }

    fn classification(category: LeadCategory) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence: 60,
            priority: Priority::High,
            extracted_slots: ExtractedSlots::default(),
            matched_rules: Vec::new(),
        }
    }

    #[test]
    fn immediate_has_no_collection() {
        let dialogue = HandoverDialogue::new();
        assert!(dialogue
            .start(&decision(EscalationKind::Immediate), LeadCategory::Buyer, Utc::now())
            .is_none());
    }

    #[test]
    fn low_confidence_flow_follows_category() {
        let dialogue = HandoverDialogue::new();
        let (progress, prompt) = dialogue
            .start(&decision(EscalationKind::LowConfidence), LeadCategory::Customer, Utc::now())
            .unwrap();
        assert_eq!(progress.flow, HandoverFlow::Support);
        assert_eq!(prompt, TemplateKey::HandoverAskTechnical);

        let (progress, prompt) = dialogue
            .start(&decision(EscalationKind::LowConfidence), LeadCategory::Undefined, Utc::now())
            .unwrap();
        assert_eq!(progress.flow, HandoverFlow::Sales);
        assert_eq!(prompt, TemplateKey::HandoverAskName);
    }

    #[test]
    fn sales_flow_collects_three_answers() {
        let dialogue = HandoverDialogue::new();
        let (mut progress, _) = dialogue
            .start(&decision(EscalationKind::SpecialSales), LeadCategory::Buyer, Utc::now())
            .unwrap();

        assert_eq!(
            dialogue.advance(&mut progress, "Maria Souza"),
            HandoverTurn::Prompt(TemplateKey::HandoverAskDevice)
        );
        assert_eq!(dialogue.prompt_vars(&progress).get("name"), Some("Maria Souza"));

        assert_eq!(
            dialogue.advance(&mut progress, "1"),
            HandoverTurn::Prompt(TemplateKey::HandoverAskInterest)
        );
        assert_eq!(progress.answers.device.as_deref(), Some("Smart TV"));

        assert_eq!(
            dialogue.advance(&mut progress, "futebol e filmes"),
            HandoverTurn::Complete {
                closing: TemplateKey::HandoverDoneSales,
                summary: TemplateKey::HandoverSummarySales,
            }
        );
        assert_eq!(progress.answers.interest.as_deref(), Some("futebol e filmes"));
    }

    #[test]
    fn support_flow_collects_two_answers() {
        let dialogue = HandoverDialogue::new();
        let (mut progress, _) = dialogue
            .start(&decision(EscalationKind::ComplexSupport), LeadCategory::Customer, Utc::now())
            .unwrap();

        assert_eq!(
            dialogue.advance(&mut progress, "xciptv na tv, tela preta"),
            HandoverTurn::Prompt(TemplateKey::HandoverAskLastWorking)
        );
        assert!(matches!(
            dialogue.advance(&mut progress, "ontem"),
            HandoverTurn::Complete { summary: TemplateKey::HandoverSummarySupport, .. }
        ));
        assert_eq!(progress.answers.last_working.as_deref(), Some("ontem"));
    }

    #[test]
    fn numbered_choices_map_to_labels() {
        assert_eq!(numbered_choice("2", &INTEREST_CHOICES), "Filmes e séries");
        assert_eq!(numbered_choice("4️⃣", &DEVICE_CHOICES), "Vários dispositivos");
        assert_eq!(numbered_choice("7", &DEVICE_CHOICES), "7");
        assert_eq!(numbered_choice("tv da sala", &DEVICE_CHOICES), "tv da sala");
    }

    #[test]
    fn summary_vars_fill_every_field() {
        let dialogue = HandoverDialogue::new();
        let mut state = ConversationState::new("5511999990000@c.us", Utc::now());
        state.collected_slots.app = Some("9xtream".to_string());
        for text in ["oi", "já tentei tudo e nada funciona no meu aparelho da sala de estar", "ok"] {
            state.push_history(
                HistoryEntry {
                    direction: Direction::Inbound,
                    text: text.to_string(),
                    automated: false,
                    at: Utc::now(),
                },
                20,
            );
        }
        state.push_history(
            HistoryEntry {
                direction: Direction::Outbound,
                text: "Vou verificar".to_string(),
                automated: true,
                at: Utc::now(),
            },
            20,
        );

        let vars = dialogue.summary_vars(
            &state,
            None,
            Some("João"),
            &classification(LeadCategory::Customer),
            Urgency::High,
            "Problema persiste",
        );
        assert_eq!(vars.get("customerName"), Some("João"));
        assert_eq!(vars.get("phone"), Some("5511999990000"));
        assert_eq!(vars.get("app"), Some("9xtream"));
        assert_eq!(vars.get("lastWorking"), Some(NOT_INFORMED));
        assert_eq!(vars.get("urgency"), Some("ALTA"));

        let recent = vars.get("recentMessages").unwrap();
        assert_eq!(recent.lines().count(), 3);
        assert!(recent.starts_with("cliente: já tentei"));
        assert!(recent.contains("..."));
        assert!(recent.ends_with("bot: Vou verificar"));
    }
}
