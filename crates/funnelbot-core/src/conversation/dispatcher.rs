//! The per-message pipeline.
//!
//! One call to [`Dispatcher::dispatch`] is one turn: lock the user's state,
//! classify, run the escalation check, step the funnel machine, apply its
//! effects, compose the reply and commit. Work happens on a copy of the
//! state; a failing turn leaves the committed state as it was and hands the
//! conversation to a human instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use funnelbot_types::classification::{ClassificationResult, LeadCategory, ProfileResult};
use funnelbot_types::config::FunnelConfig;
use funnelbot_types::contact::{ContactRecord, tags};
use funnelbot_types::conversation::{ConversationState, Direction, HistoryEntry, Stage};
use funnelbot_types::credentials::CredentialKind;
use funnelbot_types::error::DispatchError;
use funnelbot_types::escalation::{EscalationDecision, EscalationKind, Urgency};
use funnelbot_types::event::FunnelEvent;
use funnelbot_types::message::{InboundMessage, OutboundMessage};
use tracing::{debug, error, info, warn};

use crate::classify::{LeadClassifier, ProfileClassifier};
use crate::classify::profile::TAG_THRESHOLD;
use crate::compose::{Audience, ResponseComposer, TemplateKey, TemplateVars};
use crate::conversation::machine::{Effect, FunnelMachine, StepOutcome, TurnInput, match_device};
use crate::conversation::store::ConversationStore;
use crate::escalation::handover::phone_from_user_id;
use crate::escalation::{EscalationEvaluator, HandoverDialogue, HandoverTurn};
use crate::event::EventBus;
use crate::metrics::FunnelMetrics;
use crate::port::{ContactStore, CredentialIssuer};
use crate::text::fold;

/// Sent when a turn fails; the conversation is handed to a human.
pub const APOLOGY_TEXT: &str = "Desculpe, tive um probleminha aqui do meu lado. 🙏\n\n\
Já chamei um atendente humano, ele continua seu atendimento em instantes!";

/// Name used when neither the CRM nor the chat network knows one.
const DEFAULT_NAME: &str = "amigo(a)";
/// Apps suggested when the user's device family is unknown.
const GENERIC_ALTERNATIVES: &str = "IPTV SMARTERS, VU IPTV, 9XTREAM PLAYER";
const GENERIC_STORE_HINT: &str = "loja de aplicativos do seu aparelho";

/// Classification confidence needed before a category tag is written.
const CATEGORY_TAG_CONFIDENCE: u8 = 50;
/// Buyer confidence that marks a hot lead.
const HOT_LEAD_CONFIDENCE: u8 = 70;

/// What one turn asks the caller to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Replies, follow-ups and attendant handoffs, in send order.
    pub messages: Vec<OutboundMessage>,
    /// Scheduled messages, cancelled by the user's next inbound message.
    pub deferred: Vec<OutboundMessage>,
}

impl DispatchOutcome {
    pub fn is_silent(&self) -> bool {
        self.messages.is_empty() && self.deferred.is_empty()
    }
}

/// Side effects collected during a turn and released only on commit.
#[derive(Debug, Default)]
struct Turn {
    messages: Vec<OutboundMessage>,
    deferred: Vec<OutboundMessage>,
    events: Vec<FunnelEvent>,
    tags: Vec<String>,
    offer_suppressed: bool,
    /// Turn number of a fresh promotional pitch, claimed on commit.
    offer_turn: Option<u32>,
}

impl Turn {
    fn tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

pub struct Dispatcher<C, I> {
    config: Arc<FunnelConfig>,
    store: Arc<ConversationStore>,
    composer: Arc<ResponseComposer>,
    contacts: Arc<C>,
    issuer: Arc<I>,
    events: EventBus,
    metrics: Arc<FunnelMetrics>,
    classifier: LeadClassifier,
    profiler: ProfileClassifier,
    evaluator: EscalationEvaluator,
    handover: HandoverDialogue,
    machine: FunnelMachine,
}

impl<C, I> Dispatcher<C, I>
where
    C: ContactStore,
    I: CredentialIssuer,
{
    pub fn new(
        config: Arc<FunnelConfig>,
        store: Arc<ConversationStore>,
        composer: Arc<ResponseComposer>,
        contacts: Arc<C>,
        issuer: Arc<I>,
        events: EventBus,
        metrics: Arc<FunnelMetrics>,
    ) -> Self {
        Self {
            machine: FunnelMachine::new(Arc::clone(&config)),
            config,
            store,
            composer,
            contacts,
            issuer,
            events,
            metrics,
            classifier: LeadClassifier::new(),
            profiler: ProfileClassifier::new(),
            evaluator: EscalationEvaluator::new(),
            handover: HandoverDialogue::new(),
        }
    }

    pub fn config(&self) -> &FunnelConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn metrics(&self) -> &Arc<FunnelMetrics> {
        &self.metrics
    }

    /// Handle one inbound message and return what to send.
    ///
    /// Holds the user's lock for the whole turn. A conversation under human
    /// takeover produces nothing.
    #[tracing::instrument(
        name = "funnel.turn",
        skip_all,
        fields(funnel.user_id = %message.user_id, funnel.stage = tracing::field::Empty)
    )]
    pub async fn dispatch(&self, message: &InboundMessage, now: DateTime<Utc>) -> DispatchOutcome {
        let user_id = message.user_id.as_str();
        let mut state = self.store.lock(user_id, now).await;
        tracing::Span::current().record("funnel.stage", tracing::field::display(&state.stage));

        if state.human_takeover {
            debug!(user_id, "conversation under human takeover, staying silent");
            return DispatchOutcome::default();
        }

        let contact = match self.contacts.get_or_create(user_id).await {
            Ok(contact) => Some(contact),
            Err(err) => {
                warn!(user_id, error = %err, "contact lookup failed, continuing without tags");
                None
            }
        };

        let mut working = state.clone();
        match self.run_turn(&mut working, message, contact.as_ref(), now).await {
            Ok(turn) => {
                working.updated_at = now;
                *state = working;
                if let Some(number) = turn.offer_turn {
                    self.composer.cooldown().claim(user_id, now, number);
                }
                drop(state);
                self.commit(user_id, turn).await
            }
            Err(err) => {
                error!(user_id, stage = %state.stage, error = %err, "turn failed, handing conversation to a human");
                let number = state.automated_turn_count + 1;
                state.automated_turn_count = number;
                state.enter_takeover(number);
                state.updated_at = now;
                drop(state);
                self.fail_safe(user_id, &err, number).await
            }
        }
    }

    /// Undo `turn` after its primary reply was not delivered: the turn
    /// counter goes back and an offer claimed by that turn is released.
    pub async fn revert_turn(&self, user_id: &str, turn: u32) -> bool {
        if !self.store.revert_turn(user_id, turn).await {
            return false;
        }
        if self.composer.cooldown().release(user_id, turn) {
            debug!(user_id, turn, "offer claim released after failed delivery");
        }
        true
    }

    // ----- turn -----

    async fn run_turn(
        &self,
        state: &mut ConversationState,
        message: &InboundMessage,
        contact: Option<&ContactRecord>,
        now: DateTime<Utc>,
    ) -> Result<Turn, DispatchError> {
        let text = message.text.trim();
        let folded = fold(text);
        let contact_tags = contact.map(|c| c.tags.as_slice()).unwrap_or(&[]);
        let contact_name = contact
            .and_then(|c| c.name.as_deref())
            .or(message.sender_name.as_deref());

        let mut classification = self.classifier.classify(text, &state.history, contact_tags);
        let profile = self.profiler.classify(text);
        state.collected_slots.merge(&classification.extracted_slots);

        let mut turn = Turn::default();
        classification_tags(&mut turn, &classification, &profile);

        let prior_turns = state.automated_turn_count;
        let from = state.stage;

        if from == Stage::HandoverCollection {
            self.record_inbound(state, text, now);
            let decision = self.evaluator.evaluate(text, prior_turns, &classification);
            if decision.kind == Some(EscalationKind::Immediate) {
                self.take_over(state, &decision, &classification, contact_name, now, &mut turn)?;
            } else {
                self.continue_handover(state, text, &classification, contact_name, now, &mut turn)?;
            }
        } else {
            let outcome = self.machine.step(
                state,
                &TurnInput {
                    text,
                    folded: &folded,
                    has_media: message.has_media,
                    classification: &classification,
                },
            );

            let timing = &self.config.timing;
            if outcome.recognized {
                classification.confidence = classification.confidence.max(timing.stage_match_confidence);
                state.reprompt_count = 0;
            } else {
                state.reprompt_count += 1;
            }
            self.record_inbound(state, text, now);

            let mut decision = self.evaluator.evaluate(text, prior_turns, &classification);
            if !decision.must_escalate && timing.max_reprompts > 0 && state.reprompt_count >= timing.max_reprompts {
                decision = EscalationDecision::escalate(
                    EscalationKind::LowConfidence,
                    Urgency::Medium,
                    format!("{} respostas não reconhecidas em {}", state.reprompt_count, from),
                );
            }

            if decision.must_escalate {
                state.reprompt_count = 0;
                self.escalate(state, &decision, &classification, contact_name, now, &mut turn)?;
            } else {
                self.advance_funnel(state, outcome, &classification, contact_name, now, &mut turn)
                    .await?;
            }
        }

        if state.stage != from {
            info!(user_id = %state.user_id, from = %from, to = %state.stage, "stage changed");
            turn.events.push(FunnelEvent::StageChanged {
                user_id: state.user_id.clone(),
                from,
                to: state.stage,
                category: classification.category,
            });
        }
        Ok(turn)
    }

    async fn advance_funnel(
        &self,
        state: &mut ConversationState,
        outcome: StepOutcome,
        classification: &ClassificationResult,
        contact_name: Option<&str>,
        now: DateTime<Utc>,
        turn: &mut Turn,
    ) -> Result<(), DispatchError> {
        let user_id = state.user_id.clone();
        let mut teaser = false;

        for effect in outcome.effects {
            match effect {
                Effect::CountPersuasion => state.persuasion_attempts += 1,
                Effect::SelectDevice { device, app } => {
                    state.collected_slots.device = Some(device);
                    state.collected_slots.app = Some(app);
                }
                Effect::SetDevice(device) => state.collected_slots.device = Some(device),
                Effect::SetApp(app) => state.collected_slots.app = Some(app),
                Effect::IssueTrial => {
                    if state.trial_credentials.is_some() {
                        debug!(%user_id, "reusing trial credentials");
                        continue;
                    }
                    let credentials = self.issuer.issue_trial().await?;
                    info!(%user_id, username = %credentials.username, "trial credentials issued");
                    state.trial_credentials = Some(credentials);
                    turn.events.push(FunnelEvent::TrialIssued {
                        user_id: user_id.clone(),
                        kind: CredentialKind::Trial,
                    });
                }
                Effect::ScheduleTeaser => teaser = true,
                Effect::ChoosePlan(key) => {
                    if self.config.plan(&key).is_none() {
                        return Err(DispatchError::UnknownPlan(key));
                    }
                    state.collected_slots.chosen_plan = Some(key);
                }
                Effect::IssueDefinitive => {
                    if state.account_credentials.is_some() {
                        debug!(%user_id, "reusing account credentials");
                        continue;
                    }
                    let key = state.collected_slots.chosen_plan.clone().unwrap_or_default();
                    let plan = self
                        .config
                        .plan(&key)
                        .ok_or_else(|| DispatchError::UnknownPlan(key.clone()))?;
                    let credentials = self.issuer.issue_definitive(plan).await?;
                    info!(%user_id, plan = %key, username = %credentials.username, "account credentials issued");
                    state.account_credentials = Some(credentials);
                    turn.events.push(FunnelEvent::TrialIssued {
                        user_id: user_id.clone(),
                        kind: CredentialKind::Definitive,
                    });
                }
                Effect::Convert => {
                    info!(%user_id, plan = ?state.collected_slots.chosen_plan, "payment confirmed");
                    turn.events.push(FunnelEvent::Converted {
                        user_id: user_id.clone(),
                        plan: state.collected_slots.chosen_plan.clone(),
                    });
                    turn.tag(tags::ACTIVE_CUSTOMER);
                }
                Effect::CaptureReferral(number) => {
                    info!(%user_id, referral = %number, "referral captured");
                    state.collected_slots.referral_number = Some(number.clone());
                    turn.events.push(FunnelEvent::ReferralCaptured {
                        user_id: user_id.clone(),
                        referral: number,
                    });
                    turn.tag(tags::REFERRED_FRIEND);
                }
            }
        }

        state.stage = outcome.next_stage;

        let Some(plan) = outcome.reply else {
            return Ok(());
        };

        let vars = self.vars(state, contact_name);
        let audience = Audience::from(classification.category);
        let teaser = if teaser {
            Some(self.composer.render(TemplateKey::TrialTeaser, audience, &vars)?)
        } else {
            None
        };

        let composed = self
            .composer
            .compose(&user_id, &plan, classification.category, &vars, now)?;
        turn.offer_suppressed |= composed.offer_suppressed;

        let number = self.emit_reply(state, turn, composed.text, composed.follow_up, now);
        if composed.offer_made {
            turn.offer_turn = Some(number);
        }
        if let Some(text) = teaser {
            let delay_ms = self.config.timing.teaser_delay_minutes.saturating_mul(60_000);
            turn.deferred
                .push(OutboundMessage::deferred(&user_id, text, delay_ms, number));
        }
        Ok(())
    }

    // ----- escalation -----

    /// Enter the handover sub-dialogue, or take over directly for IMMEDIATE.
    fn escalate(
        &self,
        state: &mut ConversationState,
        decision: &EscalationDecision,
        classification: &ClassificationResult,
        contact_name: Option<&str>,
        now: DateTime<Utc>,
        turn: &mut Turn,
    ) -> Result<(), DispatchError> {
        let Some((progress, prompt)) = self.handover.start(decision, classification.category, now) else {
            return self.take_over(state, decision, classification, contact_name, now, turn);
        };

        info!(
            user_id = %state.user_id,
            kind = %progress.kind,
            urgency = %progress.urgency,
            reason = %progress.reason,
            "escalating, collecting handover details"
        );

        let mut vars = self.vars(state, contact_name);
        vars.extend(&self.handover.prompt_vars(&progress));
        let text = self
            .composer
            .render(prompt, Audience::from(classification.category), &vars)?;

        turn.events.push(FunnelEvent::Escalated {
            user_id: state.user_id.clone(),
            kind: progress.kind,
            urgency: progress.urgency,
            reason: progress.reason.clone(),
        });
        turn.tag(tags::HUMAN_SUPPORT);

        if !state.stage.is_escalation() {
            state.resume_stage = Some(state.stage);
        }
        state.stage = Stage::HandoverCollection;
        state.handover = Some(progress);
        self.emit_reply(state, turn, text, None, now);
        Ok(())
    }

    /// Feed one answer to the handover sub-dialogue.
    fn continue_handover(
        &self,
        state: &mut ConversationState,
        answer: &str,
        classification: &ClassificationResult,
        contact_name: Option<&str>,
        now: DateTime<Utc>,
        turn: &mut Turn,
    ) -> Result<(), DispatchError> {
        let Some(mut progress) = state.handover.take() else {
            warn!(user_id = %state.user_id, "handover stage without progress, taking over directly");
            let decision = EscalationDecision::escalate(
                EscalationKind::LowConfidence,
                Urgency::Medium,
                "Coleta de dados interrompida",
            );
            return self.take_over(state, &decision, classification, contact_name, now, turn);
        };

        let audience = Audience::from(classification.category);
        let mut vars = self.vars(state, contact_name);
        let step = self.handover.advance(&mut progress, answer);
        vars.extend(&self.handover.prompt_vars(&progress));

        match step {
            HandoverTurn::Prompt(key) => {
                let text = self.composer.render(key, audience, &vars)?;
                state.handover = Some(progress);
                self.emit_reply(state, turn, text, None, now);
            }
            HandoverTurn::Complete { closing, summary } => {
                let text = self.composer.render(closing, audience, &vars)?;
                vars.extend(&self.handover.summary_vars(
                    state,
                    Some(&progress),
                    contact_name,
                    classification,
                    progress.urgency,
                    &progress.reason,
                ));
                let summary = self.composer.render(summary, Audience::Any, &vars)?;

                let number = self.emit_reply(state, turn, text, None, now);
                state.enter_takeover(number);
                self.hand_off(state, turn, progress.kind, summary, number);
            }
        }
        Ok(())
    }

    /// Immediate takeover: acknowledge, summarize and go silent.
    fn take_over(
        &self,
        state: &mut ConversationState,
        decision: &EscalationDecision,
        classification: &ClassificationResult,
        contact_name: Option<&str>,
        now: DateTime<Utc>,
        turn: &mut Turn,
    ) -> Result<(), DispatchError> {
        let kind = decision.kind.unwrap_or(EscalationKind::Immediate);
        warn!(
            user_id = %state.user_id,
            kind = %kind,
            reason = %decision.reason,
            "handing conversation to a human"
        );

        let mut vars = self.vars(state, contact_name);
        let text = self.composer.render(
            TemplateKey::HandoverImmediate,
            Audience::from(classification.category),
            &vars,
        )?;
        vars.extend(&self.handover.summary_vars(
            state,
            state.handover.as_ref(),
            contact_name,
            classification,
            decision.urgency,
            &decision.reason,
        ));
        let summary = self
            .composer
            .render(TemplateKey::HandoverSummaryCancellation, Audience::Any, &vars)?;

        turn.events.push(FunnelEvent::Escalated {
            user_id: state.user_id.clone(),
            kind,
            urgency: decision.urgency,
            reason: decision.reason.clone(),
        });

        let number = self.emit_reply(state, turn, text, None, now);
        state.enter_takeover(number);
        self.hand_off(state, turn, kind, summary, number);
        Ok(())
    }

    fn hand_off(&self, state: &mut ConversationState, turn: &mut Turn, kind: EscalationKind, summary: String, number: u32) {
        match &self.config.escalation.attendant_id {
            Some(attendant) => turn
                .messages
                .push(OutboundMessage::handoff(attendant, summary.clone(), number)),
            None => warn!(user_id = %state.user_id, "no attendant configured, summary kept in conversation state"),
        }
        turn.events.push(FunnelEvent::HandoverCompleted {
            user_id: state.user_id.clone(),
            kind,
            summary: summary.clone(),
        });
        turn.tag(tags::HUMAN_SUPPORT);
        state.handover_summary = Some(summary);
    }

    // ----- helpers -----

    fn record_inbound(&self, state: &mut ConversationState, text: &str, now: DateTime<Utc>) {
        let limit = self.config.timing.history_limit;
        state.push_history(
            HistoryEntry {
                direction: Direction::Inbound,
                text: text.to_string(),
                automated: false,
                at: now,
            },
            limit,
        );
    }

    /// Record a bot reply (and its follow-up) as the next automated turn.
    fn emit_reply(
        &self,
        state: &mut ConversationState,
        turn: &mut Turn,
        text: String,
        follow_up: Option<String>,
        now: DateTime<Utc>,
    ) -> u32 {
        let number = state.automated_turn_count + 1;
        state.automated_turn_count = number;
        let limit = self.config.timing.history_limit;

        for part in std::iter::once(&text).chain(follow_up.as_ref()) {
            state.push_history(
                HistoryEntry {
                    direction: Direction::Outbound,
                    text: part.clone(),
                    automated: true,
                    at: now,
                },
                limit,
            );
        }

        turn.messages
            .push(OutboundMessage::reply(&state.user_id, text, number));
        if let Some(follow_up) = follow_up {
            turn.messages.push(OutboundMessage::follow_up(
                &state.user_id,
                follow_up,
                self.config.timing.follow_up_delay_ms,
                number,
            ));
        }
        number
    }

    /// Placeholder values available to every template, plus whatever the
    /// conversation has collected so far.
    fn vars(&self, state: &ConversationState, contact_name: Option<&str>) -> TemplateVars {
        let config = &self.config;
        let pricing = &config.pricing;
        let slots = &state.collected_slots;

        let name = contact_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NAME);

        let mut vars = TemplateVars::new();
        vars.set("name", name)
            .set("brand", config.brand.name.clone())
            .set("assistant", config.brand.assistant_name.clone())
            .set("pixKey", config.brand.pix_key.clone())
            .set("receiver", config.brand.pix_receiver.clone())
            .set("supportGroup", config.brand.support_group.clone())
            .set("promoPrice", pricing.format(pricing.promo_price_cents))
            .set("regularPrice", pricing.format(pricing.regular_price_cents))
            .set("maintenanceFee", pricing.format(pricing.maintenance_fee_cents))
            .set("planList", plan_list(config))
            .set("planOptions", plan_options(config))
            .set("serverUrl", config.issuer.server_url.clone())
            .set("trialHours", config.issuer.trial_hours.to_string())
            .set("deviceMenu", device_menu(config));

        let profile = slots
            .device
            .as_deref()
            .and_then(|device| match_device(&config.devices, &fold(device)));

        match profile {
            Some(profile) => {
                vars.set("alternatives", profile.alternatives.join(", "))
                    .set("deviceLabel", profile.label.clone())
                    .set("storeHint", profile.store_hint.clone());
            }
            None => {
                vars.set("alternatives", GENERIC_ALTERNATIVES);
                if let Some(device) = &slots.device {
                    vars.set("deviceLabel", device.clone())
                        .set("storeHint", GENERIC_STORE_HINT);
                }
            }
        }
        if let Some(device) = &slots.device {
            vars.set("device", device.clone());
        }
        if let Some(app) = slots.app.clone().or_else(|| profile.map(|p| p.primary_app.clone())) {
            vars.set("app", app);
        }

        if let Some(plan) = slots.chosen_plan.as_deref().and_then(|key| config.plan(key)) {
            vars.set("planName", plan.name.clone())
                .set("price", pricing.format(plan.price_cents))
                .set("planPeriod", plan.period.clone())
                .set("planScreens", plan.screens.to_string());
        }

        if let Some(credentials) = &state.trial_credentials {
            vars.set_credentials(credentials);
        }
        if let Some(credentials) = &state.account_credentials {
            vars.set_credentials(credentials);
        }
        if let Some(referral) = &slots.referral_number {
            vars.set("referral", referral.clone());
        }
        vars
    }

    // ----- commit -----

    async fn commit(&self, user_id: &str, turn: Turn) -> DispatchOutcome {
        if turn.offer_suppressed {
            self.metrics.record_offer_suppressed();
        }
        for event in &turn.events {
            match event {
                FunnelEvent::StageChanged { to, .. } => self.metrics.record_transition(*to),
                FunnelEvent::Escalated { kind, .. } => self.metrics.record_escalation(*kind),
                FunnelEvent::HandoverCompleted { .. } => self.metrics.record_handover_completed(),
                FunnelEvent::TrialIssued {
                    kind: CredentialKind::Trial,
                    ..
                } => self.metrics.record_trial(),
                FunnelEvent::Converted { .. } => self.metrics.record_conversion(),
                FunnelEvent::ReferralCaptured { .. } => self.metrics.record_referral(),
                FunnelEvent::TrialIssued { .. } | FunnelEvent::TakeoverReleased { .. } => {}
            }
        }

        self.add_tags(user_id, &turn.tags).await;
        for event in turn.events {
            self.events.publish(event);
        }

        DispatchOutcome {
            messages: turn.messages,
            deferred: turn.deferred,
        }
    }

    /// Apology to the user, alert to the attendant. The conversation state
    /// has already been flagged for takeover by the caller.
    async fn fail_safe(&self, user_id: &str, err: &DispatchError, number: u32) -> DispatchOutcome {
        self.metrics.record_dispatch_failure();
        self.metrics.record_escalation(EscalationKind::Immediate);

        let mut messages = vec![OutboundMessage::reply(user_id, APOLOGY_TEXT, number)];
        if let Some(attendant) = &self.config.escalation.attendant_id {
            let alert = format!(
                "⚠️ *FALHA NO ATENDIMENTO AUTOMÁTICO*\n\n📱 Telefone: {}\n❌ Erro: {}\n\nO bot foi pausado para este contato.",
                phone_from_user_id(user_id),
                err
            );
            messages.push(OutboundMessage::handoff(attendant, alert, number));
        }

        self.add_tags(user_id, &[tags::HUMAN_SUPPORT.to_string()]).await;
        self.events.publish(FunnelEvent::Escalated {
            user_id: user_id.to_string(),
            kind: EscalationKind::Immediate,
            urgency: Urgency::High,
            reason: "internal_error".to_string(),
        });

        DispatchOutcome {
            messages,
            deferred: Vec::new(),
        }
    }

    async fn add_tags(&self, user_id: &str, tags: &[String]) {
        for tag in tags {
            match self.contacts.add_tag(user_id, tag).await {
                Ok(true) => debug!(user_id, tag = %tag, "contact tagged"),
                Ok(false) => {}
                Err(err) => warn!(user_id, tag = %tag, error = %err, "failed to tag contact"),
            }
        }
    }
}

impl<C, I> std::fmt::Debug for Dispatcher<C, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("conversations", &self.store.len())
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}

fn classification_tags(turn: &mut Turn, classification: &ClassificationResult, profile: &ProfileResult) {
    if classification.confidence >= CATEGORY_TAG_CONFIDENCE {
        match classification.category {
            LeadCategory::Buyer => {
                turn.tag(tags::BUYER);
                if classification.confidence >= HOT_LEAD_CONFIDENCE {
                    turn.tag(tags::HOT_LEAD);
                }
            }
            LeadCategory::Customer => turn.tag(tags::CUSTOMER),
            LeadCategory::Undefined => {}
        }
    }
    if profile.confidence >= TAG_THRESHOLD {
        turn.tag(profile.profile.tag());
    }
}

fn plan_list(config: &FunnelConfig) -> String {
    config
        .pricing
        .plans
        .iter()
        .map(|plan| {
            let screens = if plan.screens == 1 { "tela" } else { "telas" };
            format!(
                "✅ *{}*: {} ({}, {} {})",
                plan.name,
                config.pricing.format(plan.price_cents),
                plan.period,
                plan.screens,
                screens
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// "*ANUAL*, *VITALICIO* ou *TRIMESTRAL*"
fn plan_options(config: &FunnelConfig) -> String {
    let options: Vec<String> = config
        .pricing
        .plans
        .iter()
        .map(|plan| format!("*{}*", plan.key.to_uppercase()))
        .collect();
    match options.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} ou {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

fn device_menu(config: &FunnelConfig) -> String {
    config
        .devices
        .iter()
        .enumerate()
        .map(|(i, device)| format!("*{}* - {}", i + 1, device.label))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{FixedIndex, OfferCooldown, TemplateCatalog};
    use crate::testing::{MemoryContacts, SequenceIssuer};
    use chrono::{Duration, TimeZone};
    use funnelbot_types::message::OutboundKind;

    const USER: &str = "5511988887777@s.whatsapp.net";
    const ATTENDANT: &str = "5511900000000@s.whatsapp.net";

    struct Harness {
        dispatcher: Dispatcher<MemoryContacts, SequenceIssuer>,
        contacts: Arc<MemoryContacts>,
        store: Arc<ConversationStore>,
        metrics: Arc<FunnelMetrics>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn harness_with(issuer: SequenceIssuer) -> Harness {
        let mut config = FunnelConfig::default();
        config.escalation.attendant_id = Some(ATTENDANT.to_string());
        let config = Arc::new(config);

        let composer = Arc::new(ResponseComposer::new(
            TemplateCatalog::builtin(),
            Arc::new(FixedIndex(0)),
            Arc::new(OfferCooldown::new(config.timing.offer_cooldown_hours)),
        ));
        let store = Arc::new(ConversationStore::new());
        let contacts = Arc::new(MemoryContacts::default());
        let metrics = Arc::new(FunnelMetrics::new());

        Harness {
            dispatcher: Dispatcher::new(
                config,
                Arc::clone(&store),
                composer,
                Arc::clone(&contacts),
                Arc::new(issuer),
                EventBus::default(),
                Arc::clone(&metrics),
            ),
            contacts,
            store,
            metrics,
        }
    }

    fn harness() -> Harness {
        harness_with(SequenceIssuer::default())
    }

    impl Harness {
        async fn say_at(&self, text: &str, at: DateTime<Utc>) -> DispatchOutcome {
            self.dispatcher.dispatch(&InboundMessage::text(USER, text), at).await
        }

        async fn say(&self, text: &str) -> DispatchOutcome {
            self.say_at(text, t0()).await
        }

        async fn say_as(&self, user_id: &str, text: &str) -> DispatchOutcome {
            self.dispatcher.dispatch(&InboundMessage::text(user_id, text), t0()).await
        }

        async fn state(&self) -> ConversationState {
            self.store.snapshot(USER).await.unwrap()
        }

        async fn put_at(&self, stage: Stage) {
            let mut state = self.store.lock(USER, t0()).await;
            state.stage = stage;
        }
    }

    #[tokio::test]
    async fn sale_runs_from_greeting_to_active_customer() {
        let h = harness();

        let greeting = h.say("oi, quero conhecer").await;
        assert_eq!(greeting.messages.len(), 2);
        assert_eq!(greeting.messages[0].kind, OutboundKind::Reply);
        assert_eq!(greeting.messages[1].kind, OutboundKind::FollowUp);
        assert_eq!(greeting.messages[1].delay_ms, 3000);
        assert_eq!(h.state().await.stage, Stage::Qualifying);

        h.say("sim").await;
        assert_eq!(h.state().await.stage, Stage::DeviceSelection);

        h.say("tenho uma tv samsung").await;
        let state = h.state().await;
        assert_eq!(state.stage, Stage::AppInstallWait);
        assert_eq!(state.collected_slots.device.as_deref(), Some("samsung"));
        assert_eq!(state.collected_slots.app.as_deref(), Some("ABSOLUTO PLAYER"));

        let trial = h.say("instalei").await;
        assert!(trial.messages[0].text.contains("TESTE_000001"));
        assert_eq!(trial.deferred.len(), 1);
        assert_eq!(trial.deferred[0].kind, OutboundKind::Deferred);
        assert_eq!(trial.deferred[0].delay_ms, 30 * 60_000);
        assert_eq!(h.state().await.stage, Stage::TrialIssued);

        h.say("funcionou").await;
        assert_eq!(h.state().await.stage, Stage::PlanPresented);

        let chosen = h.say("quero o anual").await;
        assert!(chosen.messages[0].text.contains("R$ 89,99"));
        assert_eq!(h.state().await.collected_slots.chosen_plan.as_deref(), Some("anual"));

        let paid = h.say("paguei").await;
        assert!(paid.messages[0].text.contains("anual_000002"));

        let state = h.state().await;
        assert_eq!(state.stage, Stage::ActiveCustomer);
        assert_eq!(state.automated_turn_count, 7);
        assert_eq!(state.collected_slots.device.as_deref(), Some("samsung"));
        assert!(state.trial_credentials.is_some());
        assert!(state.account_credentials.is_some());
        assert!(!state.human_takeover);

        assert!(h.contacts.tags(USER).contains(&tags::ACTIVE_CUSTOMER.to_string()));
        let metrics = h.metrics.snapshot();
        assert_eq!(metrics.trials_issued, 1);
        assert_eq!(metrics.conversions, 1);
        assert_eq!(metrics.total_escalations(), 0);
    }

    #[tokio::test]
    async fn stage_changes_are_published() {
        let h = harness();
        let mut events = h.dispatcher.events().subscribe();

        h.say("oi, quero conhecer").await;

        let mut saw_change = false;
        while let Ok(event) = events.try_recv() {
            if let FunnelEvent::StageChanged { from, to, .. } = event {
                assert_eq!((from, to), (Stage::Start, Stage::Qualifying));
                saw_change = true;
            }
        }
        assert!(saw_change);
        assert_eq!(h.metrics.snapshot().stage_transitions, 1);
    }

    #[tokio::test]
    async fn trial_credentials_are_reused() {
        let h = harness();
        h.put_at(Stage::AppInstallWait).await;
        h.say("instalei").await;
        let first = h.state().await.trial_credentials.unwrap();

        h.put_at(Stage::AppInstallWait).await;
        h.say("instalei").await;
        assert_eq!(h.state().await.trial_credentials.unwrap(), first);
        assert_eq!(h.metrics.snapshot().trials_issued, 1);
    }

    #[tokio::test]
    async fn pitch_is_not_repeated_inside_the_cooldown() {
        let h = harness();
        let first = h.say("oi, quero conhecer").await;
        assert_eq!(first.messages.len(), 2);

        h.put_at(Stage::Start).await;
        let again = h.say_at("oi, quero conhecer", t0() + Duration::hours(1)).await;
        assert_eq!(again.messages.len(), 1);
        assert!(again.messages[0].text.contains("já recebeu nossa oferta"));
        assert_eq!(h.metrics.snapshot().offers_suppressed, 1);

        h.put_at(Stage::Start).await;
        let later = h.say_at("oi, quero conhecer", t0() + Duration::hours(25)).await;
        assert_eq!(later.messages.len(), 2);
    }

    #[tokio::test]
    async fn referral_is_reprompted_then_captured() {
        let h = harness();
        h.put_at(Stage::ActiveCustomer).await;

        h.say("quero indicar um amigo").await;
        assert_eq!(h.state().await.stage, Stage::ReferralCollection);

        h.say("manda pro meu amigo").await;
        assert_eq!(h.state().await.stage, Stage::ReferralCollection);

        let captured = h.say("pode ser 11999887766").await;
        assert!(captured.messages[0].text.contains("11999887766"));

        let state = h.state().await;
        assert_eq!(state.stage, Stage::Start);
        assert_eq!(state.collected_slots.referral_number.as_deref(), Some("11999887766"));
        assert!(h.contacts.tags(USER).contains(&tags::REFERRED_FRIEND.to_string()));
        assert_eq!(h.metrics.snapshot().referrals, 1);
    }

    #[tokio::test]
    async fn complex_support_waits_for_prior_attempts() {
        let h = harness();

        h.say("meu canalplay está travando").await;
        assert_eq!(h.state().await.stage, Stage::Support);

        h.say("já tentei tudo").await;
        assert_eq!(h.state().await.stage, Stage::Support);

        h.say("já tentei tudo").await;
        let state = h.state().await;
        assert_eq!(state.stage, Stage::HandoverCollection);
        assert_eq!(state.resume_stage, Some(Stage::Support));
        assert!(state.handover.is_some());

        h.say("a imagem congela").await;
        let done = h.say("funcionava ontem").await;
        let handoff = done
            .messages
            .iter()
            .find(|m| m.kind == OutboundKind::Handoff)
            .unwrap();
        assert_eq!(handoff.user_id, ATTENDANT);
        assert!(handoff.text.contains("5511988887777"));
        assert!(handoff.text.contains("a imagem congela"));

        let state = h.state().await;
        assert_eq!(state.stage, Stage::HumanTakeover);
        assert!(state.human_takeover);
        assert!(state.handover_summary.is_some());
        assert_eq!(h.metrics.snapshot().handovers_completed, 1);

        assert!(h.say("alô?").await.is_silent());
    }

    #[tokio::test]
    async fn cancellation_hands_over_immediately() {
        let h = harness();
        let outcome = h.say("quero cancelar essa assinatura").await;

        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0].user_id, USER);
        assert_eq!(outcome.messages[1].kind, OutboundKind::Handoff);
        assert!(outcome.messages[1].text.contains("5511988887777"));

        let state = h.state().await;
        assert!(state.human_takeover);
        assert_eq!(state.takeover_turn, Some(1));
        assert_eq!(state.resume_stage, Some(Stage::Start));
        assert!(h.contacts.tags(USER).contains(&tags::HUMAN_SUPPORT.to_string()));

        let metrics = h.metrics.snapshot();
        assert_eq!(metrics.escalations.get("IMMEDIATE"), Some(&1));
        assert_eq!(metrics.handovers_completed, 1);

        assert!(h.say("oi").await.is_silent());
    }

    #[tokio::test]
    async fn repeated_unrecognized_answers_escalate() {
        let h = harness();
        h.put_at(Stage::DeviceSelection).await;

        h.say("xyz").await;
        h.say("xyz").await;
        assert_eq!(h.state().await.stage, Stage::DeviceSelection);
        assert_eq!(h.state().await.reprompt_count, 2);

        h.say("xyz").await;
        let state = h.state().await;
        assert_eq!(state.stage, Stage::HandoverCollection);
        assert_eq!(state.resume_stage, Some(Stage::DeviceSelection));
        assert_eq!(state.reprompt_count, 0);
        assert_eq!(h.metrics.snapshot().escalations.get("LOW_CONFIDENCE"), Some(&1));
    }

    #[tokio::test]
    async fn failing_issuer_apologizes_and_takes_over() {
        let h = harness_with(SequenceIssuer::failing());
        h.put_at(Stage::AppInstallWait).await;

        let outcome = h.say("instalei").await;
        assert_eq!(outcome.messages[0].text, APOLOGY_TEXT);
        assert_eq!(outcome.messages[1].user_id, ATTENDANT);
        assert!(outcome.deferred.is_empty());

        let state = h.state().await;
        assert!(state.human_takeover);
        assert!(state.trial_credentials.is_none());
        assert_eq!(state.resume_stage, Some(Stage::AppInstallWait));
        assert!(state.history.is_empty());
        assert!(h.contacts.tags(USER).contains(&tags::HUMAN_SUPPORT.to_string()));
        assert_eq!(h.metrics.snapshot().dispatch_failures, 1);

        assert!(h.say("oi?").await.is_silent());
    }

    #[tokio::test]
    async fn failed_turn_leaves_other_users_untouched() {
        const OTHER: &str = "5511977776666@s.whatsapp.net";
        let h = harness_with(SequenceIssuer::failing());

        let greeting = h.say_as(OTHER, "oi, quero conhecer").await;
        assert_eq!(greeting.messages.len(), 2);
        let before = h.store.snapshot(OTHER).await.unwrap();
        assert_eq!(before.stage, Stage::Qualifying);

        h.put_at(Stage::AppInstallWait).await;
        let failed = h.say("instalei").await;
        assert_eq!(failed.messages[0].text, APOLOGY_TEXT);
        assert!(failed.messages.iter().all(|m| m.user_id != OTHER));
        assert!(h.state().await.human_takeover);

        let after = h.store.snapshot(OTHER).await.unwrap();
        assert_eq!(after.stage, before.stage);
        assert_eq!(after.automated_turn_count, before.automated_turn_count);
        assert_eq!(after.history.len(), before.history.len());
        assert!(!after.human_takeover);
        assert!(!h.contacts.tags(OTHER).contains(&tags::HUMAN_SUPPORT.to_string()));

        let next = h.say_as(OTHER, "sim").await;
        assert_eq!(next.messages[0].user_id, OTHER);
        assert_ne!(next.messages[0].text, APOLOGY_TEXT);
        let state = h.store.snapshot(OTHER).await.unwrap();
        assert_eq!(state.stage, Stage::DeviceSelection);
        assert_eq!(state.automated_turn_count, before.automated_turn_count + 1);
        assert_eq!(h.metrics.snapshot().dispatch_failures, 1);
    }

    #[tokio::test]
    async fn offer_is_claimed_only_by_a_committed_turn() {
        let h = harness();
        h.say("oi, quero conhecer").await;
        let turn = h.state().await.automated_turn_count;
        assert!(!h.dispatcher.composer.cooldown().is_open(USER, t0()));

        assert!(h.dispatcher.revert_turn(USER, turn).await);
        assert!(h.dispatcher.composer.cooldown().is_open(USER, t0()));
        assert_eq!(h.state().await.automated_turn_count, turn - 1);

        h.put_at(Stage::Start).await;
        let again = h.say("oi, quero conhecer").await;
        assert_eq!(again.messages.len(), 2);
        assert!(!again.messages[0].text.contains("já recebeu nossa oferta"));
    }

    #[test]
    fn plan_options_read_naturally() {
        let config = FunnelConfig::default();
        assert_eq!(plan_options(&config), "*ANUAL*, *VITALICIO* ou *TRIMESTRAL*");
        assert!(device_menu(&config).starts_with("*1* - Smart TV"));
    }
}
