//! Turns a reply plan into message text.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use funnelbot_types::classification::LeadCategory;
use funnelbot_types::error::ComposeError;
use tracing::debug;

use super::catalog::{Audience, TemplateCatalog, TemplateKey};
use super::cooldown::OfferCooldown;
use super::random::RandomSource;
use super::template::{TemplateVars, render};

/// What the state machine wants said this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyPlan {
    pub key: TemplateKey,
    pub follow_up: Option<TemplateKey>,
}

impl ReplyPlan {
    pub fn single(key: TemplateKey) -> Self {
        Self { key, follow_up: None }
    }

    pub fn with_follow_up(key: TemplateKey, follow_up: TemplateKey) -> Self {
        Self {
            key,
            follow_up: Some(follow_up),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedReply {
    pub text: String,
    pub follow_up: Option<String>,
    /// The promotional pitch was replaced by the cooldown fallback.
    pub offer_suppressed: bool,
    /// A fresh pitch went out; the caller claims the cooldown on commit.
    pub offer_made: bool,
}

pub struct ResponseComposer {
    catalog: TemplateCatalog,
    random: Arc<dyn RandomSource>,
    cooldown: Arc<OfferCooldown>,
}

impl ResponseComposer {
    pub fn new(catalog: TemplateCatalog, random: Arc<dyn RandomSource>, cooldown: Arc<OfferCooldown>) -> Self {
        Self {
            catalog,
            random,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> &OfferCooldown {
        &self.cooldown
    }

    /// Compose the reply and optional follow-up for `plan`.
    ///
    /// A promotional key is checked against the user's offer cooldown; inside
    /// the window the fallback is sent instead and the follow-up is dropped.
    /// Nothing is claimed here.
    pub fn compose(
        &self,
        user_id: &str,
        plan: &ReplyPlan,
        category: LeadCategory,
        vars: &TemplateVars,
        now: DateTime<Utc>,
    ) -> Result<ComposedReply, ComposeError> {
        let audience = Audience::from(category);

        let promotional = plan.key.is_promotional();
        let offer_suppressed = promotional && !self.cooldown.is_open(user_id, now);
        let (key, follow_up) = if offer_suppressed {
            debug!(user_id, template = %plan.key, "offer cooldown active, using fallback");
            (TemplateKey::OfferFallback, None)
        } else {
            (plan.key, plan.follow_up)
        };

        let text = self.render(key, audience, vars)?;
        let follow_up = follow_up
            .map(|key| self.render(key, audience, vars))
            .transpose()?;

        Ok(ComposedReply {
            text,
            follow_up,
            offer_suppressed,
            offer_made: promotional && !offer_suppressed,
        })
    }

    /// Render one phrasing of `key` for `audience`.
    pub fn render(&self, key: TemplateKey, audience: Audience, vars: &TemplateVars) -> Result<String, ComposeError> {
        let pool = self.catalog.pool(key, audience)?;
        let phrasing = &pool[self.random.pick(pool.len())];
        render(key.as_str(), phrasing, vars)
    }
}

impl std::fmt::Debug for ResponseComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseComposer")
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}
