//! Conversation state, the funnel state machine and the per-message
//! dispatcher that drives them.

pub mod dispatcher;
pub mod followup;
pub mod lanes;
pub mod machine;
pub mod store;

pub use dispatcher::{APOLOGY_TEXT, DispatchOutcome, Dispatcher};
pub use followup::FollowUpScheduler;
pub use lanes::{InboundHandler, LaneError, UserLanes};
pub use machine::{Effect, FunnelMachine, StepOutcome, TurnInput};
pub use store::ConversationStore;
