//! Escalation to a human: the per-message evaluator and the handover
//! sub-dialogue that collects details for the attendant.

pub mod evaluator;
pub mod handover;

pub use evaluator::EscalationEvaluator;
pub use handover::{HandoverDialogue, HandoverTurn};
