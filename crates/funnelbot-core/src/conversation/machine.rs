//! The funnel state machine.
//!
//! `FunnelMachine::step` is pure: given the conversation as it stands and the
//! classified message, it decides the next stage, what to say and which side
//! effects the dispatcher must carry out (issuing credentials, recording a
//! plan, scheduling the teaser). It never touches collaborators.

use std::sync::Arc;

use funnelbot_types::classification::{ClassificationResult, LeadCategory};
use funnelbot_types::config::{DeviceProfile, FunnelConfig, Plan};
use funnelbot_types::conversation::{CollectedSlots, ConversationState, Stage};

use crate::compose::{ReplyPlan, TemplateKey};
use crate::text::{contains_any, find_digit_run, fold, longest_match};

const PRICE_OBJECTION: &[&str] = &["caro", "barato"];
const REFERRAL_REQUEST: &[&str] = &["indicar", "indicação", "indicacao", "amigo"];

const NEGATIVE: &[&str] = &["não", "nunca", "sem interesse", "dispenso"];
const AFFIRMATIVE: &[&str] = &[
    "sim", "quero", "interessado", "interessada", "ok", "vamos", "aceito", "bora", "claro", "pode",
];

const INSTALL_TROUBLE: &[&str] = &["não", "problema", "erro", "dificuldade", "ajuda"];
const INSTALL_READY: &[&str] = &["pronto", "instalei", "ok", "consegui", "feito", "sim", "baixei", "instalado"];

const TRIAL_FAILED: &[&str] = &["não", "erro", "problema", "travou"];
const TRIAL_WORKED: &[&str] = &[
    "funcionou", "carregou", "ok", "consegui", "perfeito", "show", "ótimo", "legal", "sim", "deu certo", "top",
];

const PAYMENT_SENT: &[&str] = &["paguei", "pix", "enviei", "comprovante", "transferi", "pago", "fiz o pagamento"];

const SUPPORT_REQUEST: &[&str] = &["problema", "suporte", "ajuda", "não funciona", "parou", "erro", "travando"];
const RENEWAL: &[&str] = &[
    "renovar", "renovação", "renova", "vencendo", "venceu", "vencimento", "expirou", "expirado", "expirando",
];
const RESOLVED: &[&str] = &["resolveu", "resolvido", "funcionou", "voltou", "deu certo"];

/// Longest free-text answer accepted as an app name.
const MAX_APP_ANSWER_CHARS: usize = 40;
/// Referral numbers: area code plus 8 or 9 digits.
const REFERRAL_DIGITS: (usize, usize) = (10, 11);

/// The message as the state machine sees it.
#[derive(Debug, Clone, Copy)]
pub struct TurnInput<'a> {
    pub text: &'a str,
    /// `text` after `text::fold`.
    pub folded: &'a str,
    pub has_media: bool,
    pub classification: &'a ClassificationResult,
}

/// Side effects requested by a step, applied by the dispatcher in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CountPersuasion,
    /// Device family chosen in DEVICE_SELECTION.
    SelectDevice { device: String, app: String },
    SetDevice(String),
    SetApp(String),
    /// Issue trial credentials unless the user already has some.
    IssueTrial,
    ScheduleTeaser,
    ChoosePlan(String),
    IssueDefinitive,
    Convert,
    CaptureReferral(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub next_stage: Stage,
    pub reply: Option<ReplyPlan>,
    pub effects: Vec<Effect>,
    /// Whether the message was one of the answers the stage expects.
    pub recognized: bool,
}

impl StepOutcome {
    fn go(next_stage: Stage, reply: ReplyPlan) -> Self {
        Self {
            next_stage,
            reply: Some(reply),
            effects: Vec::new(),
            recognized: true,
        }
    }

    /// No automated reply; the escalation path owns the conversation.
    fn silent(stage: Stage) -> Self {
        Self {
            next_stage: stage,
            reply: None,
            effects: Vec::new(),
            recognized: true,
        }
    }

    fn stay(stage: Stage, key: TemplateKey) -> Self {
        Self::go(stage, ReplyPlan::single(key))
    }

    fn unrecognized(mut self) -> Self {
        self.recognized = false;
        self
    }

    fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FunnelMachine {
    config: Arc<FunnelConfig>,
}

impl FunnelMachine {
    pub fn new(config: Arc<FunnelConfig>) -> Self {
        Self { config }
    }

    pub fn step(&self, state: &ConversationState, input: &TurnInput<'_>) -> StepOutcome {
        let stage = state.stage;

        if matches!(stage, Stage::HandoverCollection | Stage::HumanTakeover) {
            return StepOutcome::silent(stage);
        }

        let media_only = input.text.trim().is_empty();
        if media_only && stage != Stage::PaymentPending {
            return StepOutcome::stay(stage, TemplateKey::MediaOnly);
        }

        if stage != Stage::ReferralCollection {
            if contains_any(input.folded, PRICE_OBJECTION) {
                return StepOutcome::stay(Stage::PlanPresented, TemplateKey::PriceObjection);
            }
            if contains_any(input.folded, REFERRAL_REQUEST) {
                return StepOutcome::stay(Stage::ReferralCollection, TemplateKey::ReferralPrompt);
            }
        }

        match stage {
            Stage::Start => self.start(state, input),
            Stage::Qualifying => self.qualifying(state, input),
            Stage::DeviceSelection => self.device_selection(input),
            Stage::AppInstallWait => self.app_install_wait(input),
            Stage::TrialIssued => self.trial_issued(input),
            Stage::PlanPresented => self.plan_presented(input),
            Stage::PaymentPending => self.payment_pending(input),
            Stage::ActiveCustomer => self.active_customer(state, input),
            Stage::Support => self.support(state, input),
            Stage::ReferralCollection => self.referral_collection(input),
            Stage::HandoverCollection | Stage::HumanTakeover => StepOutcome::silent(stage),
        }
    }

    // ----- START -----

    fn start(&self, state: &ConversationState, input: &TurnInput<'_>) -> StepOutcome {
        match input.classification.category {
            LeadCategory::Customer => {
                let next = self.support(state, input);
                let follow_up = next.reply.map(|r| r.key).filter(|k| *k != TemplateKey::SupportResolved);
                StepOutcome {
                    next_stage: Stage::Support,
                    reply: Some(ReplyPlan {
                        key: TemplateKey::SupportGreeting,
                        follow_up,
                    }),
                    effects: next.effects,
                    recognized: true,
                }
            }
            LeadCategory::Undefined if state.has_history() => StepOutcome::stay(Stage::Start, TemplateKey::Qualification),
            _ => StepOutcome::go(
                Stage::Qualifying,
                ReplyPlan::with_follow_up(TemplateKey::GreetingPitch, TemplateKey::GreetingPitchFollowUp),
            ),
        }
    }

    // ----- QUALIFYING -----

    fn qualifying(&self, state: &ConversationState, input: &TurnInput<'_>) -> StepOutcome {
        if contains_any(input.folded, NEGATIVE) {
            return if state.persuasion_attempts == 0 {
                StepOutcome::stay(Stage::Qualifying, TemplateKey::QualifyingPersuade).with(Effect::CountPersuasion)
            } else {
                StepOutcome::stay(Stage::Qualifying, TemplateKey::QualifyingDecline)
            };
        }

        if contains_any(input.folded, AFFIRMATIVE) {
            return StepOutcome::stay(Stage::DeviceSelection, TemplateKey::QualifyingAccept);
        }

        StepOutcome::stay(Stage::Qualifying, TemplateKey::QualifyingReprompt).unrecognized()
    }

    // ----- DEVICE_SELECTION -----

    fn device_selection(&self, input: &TurnInput<'_>) -> StepOutcome {
        let Some(profile) = match_device(&self.config.devices, input.folded) else {
            return StepOutcome::stay(Stage::DeviceSelection, TemplateKey::DeviceReprompt).unrecognized();
        };

        let device = input
            .classification
            .extracted_slots
            .device
            .clone()
            .unwrap_or_else(|| profile.label.clone());

        StepOutcome::go(
            Stage::AppInstallWait,
            ReplyPlan::with_follow_up(TemplateKey::DeviceInstructions, TemplateKey::DeviceInstallFollowUp),
        )
        .with(Effect::SelectDevice {
            device,
            app: profile.primary_app.clone(),
        })
    }

    // ----- APP_INSTALL_WAIT -----

    fn app_install_wait(&self, input: &TurnInput<'_>) -> StepOutcome {
        if contains_any(input.folded, INSTALL_TROUBLE) {
            return StepOutcome::stay(Stage::AppInstallWait, TemplateKey::InstallTrouble);
        }

        if contains_any(input.folded, INSTALL_READY) {
            return StepOutcome::go(
                Stage::TrialIssued,
                ReplyPlan::with_follow_up(TemplateKey::TrialCredentials, TemplateKey::TrialChannelsFollowUp),
            )
            .with(Effect::IssueTrial)
            .with(Effect::ScheduleTeaser);
        }

        StepOutcome::stay(Stage::AppInstallWait, TemplateKey::InstallReprompt).unrecognized()
    }

    // ----- TRIAL_ISSUED -----

    fn trial_issued(&self, input: &TurnInput<'_>) -> StepOutcome {
        if contains_any(input.folded, TRIAL_FAILED) {
            return StepOutcome::stay(Stage::AppInstallWait, TemplateKey::TrialTroubleshoot);
        }

        if contains_any(input.folded, TRIAL_WORKED) {
            return StepOutcome::go(
                Stage::PlanPresented,
                ReplyPlan::with_follow_up(TemplateKey::TrialSuccess, TemplateKey::PlanTable),
            );
        }

        StepOutcome::stay(Stage::TrialIssued, TemplateKey::TrialReprompt).unrecognized()
    }

    // ----- PLAN_PRESENTED -----

    fn plan_presented(&self, input: &TurnInput<'_>) -> StepOutcome {
        if let Some(plan) = match_plan(&self.config.pricing.plans, input.folded) {
            return StepOutcome::stay(Stage::PaymentPending, TemplateKey::PlanChosen)
                .with(Effect::ChoosePlan(plan.key.clone()));
        }

        let reprompt = StepOutcome::stay(Stage::PlanPresented, TemplateKey::PlanReprompt);
        if contains_any(input.folded, AFFIRMATIVE) {
            reprompt
        } else {
            reprompt.unrecognized()
        }
    }

    // ----- PAYMENT_PENDING -----

    fn payment_pending(&self, input: &TurnInput<'_>) -> StepOutcome {
        if input.has_media || contains_any(input.folded, PAYMENT_SENT) {
            return StepOutcome::go(
                Stage::ActiveCustomer,
                ReplyPlan::with_follow_up(TemplateKey::PaymentConfirmed, TemplateKey::PaymentBonusFollowUp),
            )
            .with(Effect::IssueDefinitive)
            .with(Effect::Convert);
        }

        StepOutcome::stay(Stage::PaymentPending, TemplateKey::PaymentReminder).unrecognized()
    }

    // ----- ACTIVE_CUSTOMER -----

    fn active_customer(&self, state: &ConversationState, input: &TurnInput<'_>) -> StepOutcome {
        let wants_support = input.classification.extracted_slots.problem.is_some()
            || contains_any(input.folded, SUPPORT_REQUEST)
            || contains_any(input.folded, RENEWAL);

        if wants_support {
            let mut outcome = self.support(state, input);
            if outcome.next_stage == Stage::ActiveCustomer {
                outcome.next_stage = Stage::Support;
            }
            outcome.recognized = true;
            return outcome;
        }

        StepOutcome::stay(Stage::ActiveCustomer, TemplateKey::ActiveCustomerMenu)
    }

    // ----- SUPPORT -----

    fn support(&self, state: &ConversationState, input: &TurnInput<'_>) -> StepOutcome {
        let folded = input.folded;
        let extracted = &input.classification.extracted_slots;
        let slots = &state.collected_slots;

        if contains_any(folded, RESOLVED) && !contains_any(folded, NEGATIVE) {
            return StepOutcome::stay(Stage::ActiveCustomer, TemplateKey::SupportResolved);
        }

        if contains_any(folded, RENEWAL) {
            return StepOutcome::stay(Stage::Support, TemplateKey::SupportRenewal);
        }

        let has_problem = extracted.problem.is_some() || slots.declared_problem.is_some();
        if has_problem && is_app(slots, "9xtream") {
            return StepOutcome::stay(Stage::Support, TemplateKey::SupportXtreamFix);
        }
        if has_problem && is_fire_stick(slots) {
            return StepOutcome::stay(Stage::Support, TemplateKey::SupportFireStickFix);
        }

        let mut effects = Vec::new();
        let mut answered = !extracted.is_empty();

        if slots.device.is_none() {
            match match_device(&self.config.devices, folded) {
                Some(profile) => {
                    effects.push(Effect::SetDevice(profile.label.clone()));
                    answered = true;
                }
                None => {
                    let mut ask = StepOutcome::stay(Stage::Support, TemplateKey::SupportAskDevice);
                    ask.recognized = answered;
                    return ask;
                }
            }
        }

        if slots.app.is_none() {
            let text = input.text.trim();
            let consumable = effects.is_empty()
                && extracted.device.is_none()
                && !text.is_empty()
                && text.chars().count() <= MAX_APP_ANSWER_CHARS;
            if consumable {
                effects.push(Effect::SetApp(text.to_string()));
            } else {
                let mut ask = StepOutcome::stay(Stage::Support, TemplateKey::SupportAskApp);
                ask.effects = effects;
                ask.recognized = answered;
                return ask;
            }
        }

        let mut outcome = StepOutcome::stay(Stage::Support, TemplateKey::SupportGenericFix);
        outcome.recognized = answered || has_problem || !effects.is_empty();
        outcome.effects = effects;
        outcome
    }

    // ----- REFERRAL_COLLECTION -----

    fn referral_collection(&self, input: &TurnInput<'_>) -> StepOutcome {
        match find_digit_run(input.text, REFERRAL_DIGITS.0, REFERRAL_DIGITS.1) {
            Some(number) => StepOutcome::stay(Stage::Start, TemplateKey::ReferralCaptured)
                .with(Effect::CaptureReferral(number.to_string())),
            None => StepOutcome::stay(Stage::ReferralCollection, TemplateKey::ReferralInvalid),
        }
    }
}

fn is_app(slots: &CollectedSlots, app: &str) -> bool {
    slots.app.as_deref().is_some_and(|a| fold(a) == app)
}

fn is_fire_stick(slots: &CollectedSlots) -> bool {
    slots
        .device
        .as_deref()
        .is_some_and(|d| matches!(fold(d).as_str(), "fire stick" | "firestick"))
}

/// Device family with the longest matching keyword. Earlier families win ties.
pub fn match_device<'a>(devices: &'a [DeviceProfile], folded: &str) -> Option<&'a DeviceProfile> {
    best_by_keyword(devices, folded, |d| d.keywords.as_slice())
}

/// Plan with the longest matching keyword. Earlier plans win ties.
pub fn match_plan<'a>(plans: &'a [Plan], folded: &str) -> Option<&'a Plan> {
    best_by_keyword(plans, folded, |p| p.keywords.as_slice())
}

fn best_by_keyword<'a, T>(items: &'a [T], folded: &str, keywords: impl Fn(&T) -> &[String]) -> Option<&'a T> {
    let mut best: Option<(&T, usize)> = None;
    for item in items {
        if let Some(len) = longest_match(folded, keywords(item)) {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((item, len));
            }
        }
    }
    best.map(|(item, _)| item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use funnelbot_types::classification::{ExtractedSlots, Priority};
    use funnelbot_types::conversation::{Direction, HistoryEntry};

    use crate::classify::DataExtractor;

    fn machine() -> FunnelMachine {
        FunnelMachine::new(Arc::new(FunnelConfig::default()))
    }

    fn state_at(stage: Stage) -> ConversationState {
        let mut state = ConversationState::new("5511999990000@c.us", Utc::now());
        state.stage = stage;
        state
    }

    fn classification(category: LeadCategory, text: &str) -> ClassificationResult {
        ClassificationResult {
            category,
            confidence: 60,
            priority: Priority::Medium,
            extracted_slots: DataExtractor::new().extract(text),
            matched_rules: Vec::new(),
        }
    }

    fn step_as(state: &ConversationState, category: LeadCategory, text: &str) -> StepOutcome {
        let folded = fold(text);
        let classification = classification(category, text);
        let input = TurnInput {
            text,
            folded: &folded,
            has_media: false,
            classification: &classification,
        };
        machine().step(state, &input)
    }

    fn step(state: &ConversationState, text: &str) -> StepOutcome {
        step_as(state, LeadCategory::Buyer, text)
    }

    fn key(outcome: &StepOutcome) -> TemplateKey {
        outcome.reply.map(|r| r.key).unwrap()
    }

    #[test]
    fn start_pitches_new_leads() {
        let outcome = step_as(&state_at(Stage::Start), LeadCategory::Undefined, "oi");
        assert_eq!(outcome.next_stage, Stage::Qualifying);
        assert_eq!(
            outcome.reply,
            Some(ReplyPlan::with_follow_up(
                TemplateKey::GreetingPitch,
                TemplateKey::GreetingPitchFollowUp
            ))
        );
    }

    #[test]
    fn start_qualifies_returning_undefined_users() {
        let mut state = state_at(Stage::Start);
        state.push_history(
            HistoryEntry {
                direction: Direction::Inbound,
                text: "oi".to_string(),
                automated: false,
                at: Utc::now(),
            },
            20,
        );
        let outcome = step_as(&state, LeadCategory::Undefined, "bom dia");
        assert_eq!(outcome.next_stage, Stage::Start);
        assert_eq!(key(&outcome), TemplateKey::Qualification);
    }

    #[test]
    fn start_routes_customers_to_support() {
        let outcome = step_as(&state_at(Stage::Start), LeadCategory::Customer, "meu app parou");
        assert_eq!(outcome.next_stage, Stage::Support);
        assert_eq!(
            outcome.reply,
            Some(ReplyPlan::with_follow_up(
                TemplateKey::SupportGreeting,
                TemplateKey::SupportAskDevice
            ))
        );
    }

    #[test]
    fn qualifying_persuades_once_then_declines() {
        let mut state = state_at(Stage::Qualifying);
        let first = step(&state, "não quero");
        assert_eq!(key(&first), TemplateKey::QualifyingPersuade);
        assert_eq!(first.effects, vec![Effect::CountPersuasion]);
        assert_eq!(first.next_stage, Stage::Qualifying);

        state.persuasion_attempts = 1;
        let second = step(&state, "nao");
        assert_eq!(key(&second), TemplateKey::QualifyingDecline);
        assert_eq!(second.next_stage, Stage::Qualifying);
        assert!(second.recognized);
    }

    #[test]
    fn qualifying_accepts_and_reprompts() {
        let state = state_at(Stage::Qualifying);
        let yes = step(&state, "SIM");
        assert_eq!(yes.next_stage, Stage::DeviceSelection);
        assert_eq!(key(&yes), TemplateKey::QualifyingAccept);

        let other = step(&state, "hmm");
        assert_eq!(other.next_stage, Stage::Qualifying);
        assert!(!other.recognized);
    }

    #[test]
    fn device_selection_keeps_the_named_device() {
        let outcome = step(&state_at(Stage::DeviceSelection), "samsung");
        assert_eq!(outcome.next_stage, Stage::AppInstallWait);
        assert_eq!(
            outcome.effects,
            vec![Effect::SelectDevice {
                device: "samsung".to_string(),
                app: "ABSOLUTO PLAYER".to_string(),
            }]
        );
    }

    #[test]
    fn device_selection_by_menu_number_uses_label() {
        let outcome = step(&state_at(Stage::DeviceSelection), "2");
        assert_eq!(
            outcome.effects,
            vec![Effect::SelectDevice {
                device: "Celular".to_string(),
                app: "CANALPLAY".to_string(),
            }]
        );
    }

    #[test]
    fn most_specific_device_keyword_wins() {
        let devices = FunnelConfig::default().devices;
        assert_eq!(match_device(&devices, "tenho um fire stick").unwrap().key, "tv_box");
        assert_eq!(match_device(&devices, "tv android da lg").unwrap().key, "smart_tv");
        assert!(match_device(&devices, "computador").is_none());
    }

    #[test]
    fn unknown_device_reprompts() {
        let outcome = step(&state_at(Stage::DeviceSelection), "sei la");
        assert_eq!(outcome.next_stage, Stage::DeviceSelection);
        assert_eq!(key(&outcome), TemplateKey::DeviceReprompt);
        assert!(!outcome.recognized);
    }

    #[test]
    fn install_trouble_is_checked_before_ready() {
        let state = state_at(Stage::AppInstallWait);
        let trouble = step(&state, "não consegui instalar");
        assert_eq!(trouble.next_stage, Stage::AppInstallWait);
        assert_eq!(key(&trouble), TemplateKey::InstallTrouble);

        let ready = step(&state, "instalei");
        assert_eq!(ready.next_stage, Stage::TrialIssued);
        assert_eq!(ready.effects, vec![Effect::IssueTrial, Effect::ScheduleTeaser]);
    }

    #[test]
    fn trial_failure_goes_back_to_install() {
        let state = state_at(Stage::TrialIssued);
        let failed = step(&state, "não funcionou");
        assert_eq!(failed.next_stage, Stage::AppInstallWait);
        assert_eq!(key(&failed), TemplateKey::TrialTroubleshoot);

        let worked = step(&state, "funcionou!");
        assert_eq!(worked.next_stage, Stage::PlanPresented);
        assert_eq!(
            worked.reply,
            Some(ReplyPlan::with_follow_up(TemplateKey::TrialSuccess, TemplateKey::PlanTable))
        );
    }

    #[test]
    fn plan_choice_by_keyword() {
        let state = state_at(Stage::PlanPresented);
        let outcome = step(&state, "vou de 3 meses");
        assert_eq!(outcome.next_stage, Stage::PaymentPending);
        assert_eq!(outcome.effects, vec![Effect::ChoosePlan("trimestral".to_string())]);

        let lifetime = step(&state, "quero o vitalício");
        assert_eq!(lifetime.effects, vec![Effect::ChoosePlan("vitalicio".to_string())]);

        let yes = step(&state, "sim");
        assert_eq!(yes.next_stage, Stage::PlanPresented);
        assert!(yes.recognized);
    }

    #[test]
    fn price_objection_is_global() {
        for stage in [Stage::Qualifying, Stage::PlanPresented, Stage::PaymentPending] {
            let outcome = step(&state_at(stage), "achei caro");
            assert_eq!(outcome.next_stage, Stage::PlanPresented);
            assert_eq!(key(&outcome), TemplateKey::PriceObjection);
        }
    }

    #[test]
    fn payment_by_text_or_media() {
        let state = state_at(Stage::PaymentPending);
        let paid = step(&state, "paguei");
        assert_eq!(paid.next_stage, Stage::ActiveCustomer);
        assert_eq!(paid.effects, vec![Effect::IssueDefinitive, Effect::Convert]);

        let classification = classification(LeadCategory::Buyer, "");
        let receipt = machine().step(
            &state,
            &TurnInput {
                text: "",
                folded: "",
                has_media: true,
                classification: &classification,
            },
        );
        assert_eq!(receipt.next_stage, Stage::ActiveCustomer);

        let waiting = step(&state, "ainda vou ver");
        assert_eq!(key(&waiting), TemplateKey::PaymentReminder);
        assert!(!waiting.recognized);
    }

    #[test]
    fn media_only_outside_payment() {
        let state = state_at(Stage::Qualifying);
        let classification = classification(LeadCategory::Undefined, "");
        let outcome = machine().step(
            &state,
            &TurnInput {
                text: "  ",
                folded: "  ",
                has_media: true,
                classification: &classification,
            },
        );
        assert_eq!(outcome.next_stage, Stage::Qualifying);
        assert_eq!(key(&outcome), TemplateKey::MediaOnly);
    }

    #[test]
    fn referral_capture_and_rejection() {
        let state = state_at(Stage::ReferralCollection);
        let captured = step(&state, "pode ser 11999887766");
        assert_eq!(captured.next_stage, Stage::Start);
        assert_eq!(captured.effects, vec![Effect::CaptureReferral("11999887766".to_string())]);

        let rejected = step(&state, "manda pro meu amigo");
        assert_eq!(rejected.next_stage, Stage::ReferralCollection);
        assert_eq!(key(&rejected), TemplateKey::ReferralInvalid);
        assert!(rejected.effects.is_empty());
    }

    #[test]
    fn referral_request_from_active_customer() {
        let outcome = step(&state_at(Stage::ActiveCustomer), "quero indicar");
        assert_eq!(outcome.next_stage, Stage::ReferralCollection);
        assert_eq!(key(&outcome), TemplateKey::ReferralPrompt);
    }

    #[test]
    fn support_collects_device_then_app() {
        let mut state = state_at(Stage::Support);
        let ask_device = step_as(&state, LeadCategory::Customer, "me ajuda");
        assert_eq!(key(&ask_device), TemplateKey::SupportAskDevice);

        let device = step_as(&state, LeadCategory::Customer, "1");
        assert_eq!(key(&device), TemplateKey::SupportAskApp);
        assert_eq!(device.effects, vec![Effect::SetDevice("Smart TV".to_string())]);

        state.collected_slots.device = Some("Smart TV".to_string());
        let app = step_as(&state, LeadCategory::Customer, "Bob Player");
        assert_eq!(key(&app), TemplateKey::SupportGenericFix);
        assert_eq!(app.effects, vec![Effect::SetApp("Bob Player".to_string())]);
    }

    #[test]
    fn support_app_specific_fixes() {
        let mut state = state_at(Stage::Support);
        state.collected_slots.app = Some("9xtream".to_string());
        state.collected_slots.declared_problem = Some("travando".to_string());
        assert_eq!(key(&step(&state, "e agora?")), TemplateKey::SupportXtreamFix);

        let mut state = state_at(Stage::Support);
        state.collected_slots.device = Some("fire stick".to_string());
        assert_eq!(key(&step(&state, "está travando")), TemplateKey::SupportFireStickFix);
    }

    #[test]
    fn support_resolved_and_renewal() {
        let state = state_at(Stage::Support);
        let resolved = step(&state, "resolveu, obrigado");
        assert_eq!(resolved.next_stage, Stage::ActiveCustomer);

        let not_resolved = step(&state, "não resolveu");
        assert_ne!(not_resolved.next_stage, Stage::ActiveCustomer);

        assert_eq!(key(&step(&state, "quero renovar")), TemplateKey::SupportRenewal);
    }

    #[test]
    fn expired_plan_asks_for_renewal() {
        let outcome = step(&state_at(Stage::ActiveCustomer), "meu plano expirou");
        assert_eq!(key(&outcome), TemplateKey::SupportRenewal);
        assert_eq!(outcome.next_stage, Stage::Support);

        let support = step(&state_at(Stage::Support), "acesso expirado");
        assert_eq!(key(&support), TemplateKey::SupportRenewal);
    }

    #[test]
    fn takeover_stages_produce_nothing() {
        for stage in [Stage::HandoverCollection, Stage::HumanTakeover] {
            let outcome = step(&state_at(stage), "oi");
            assert!(outcome.reply.is_none());
            assert_eq!(outcome.next_stage, stage);
        }
    }

    #[test]
    fn slots_from_classification_are_not_required() {
        let outcome = machine().step(
            &state_at(Stage::DeviceSelection),
            &TurnInput {
                text: "3",
                folded: "3",
                has_media: false,
                classification: &ClassificationResult {
                    category: LeadCategory::Buyer,
                    confidence: 50,
                    priority: Priority::Medium,
                    extracted_slots: ExtractedSlots::default(),
                    matched_rules: Vec::new(),
                },
            },
        );
        assert!(matches!(
            outcome.effects.as_slice(),
            [Effect::SelectDevice { device, .. }] if device == "TV Box"
        ));
    }
}
