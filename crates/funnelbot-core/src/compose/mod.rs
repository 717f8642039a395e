//! Response composition: template pools, placeholder rendering, phrasing
//! choice and the promotional offer cooldown.

pub mod catalog;
pub mod composer;
pub mod cooldown;
pub mod random;
pub mod template;

pub use catalog::{Audience, TemplateCatalog, TemplateKey};
pub use composer::{ComposedReply, ReplyPlan, ResponseComposer};
pub use cooldown::OfferCooldown;
pub use random::{FixedIndex, RandomSource, SeededRandom, ThreadRandom};
pub use template::TemplateVars;
