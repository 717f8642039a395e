//! Message classification: lead category, behavioural profile and slots.

pub mod extractor;
pub mod lead;
pub mod profile;

pub use extractor::DataExtractor;
pub use lead::LeadClassifier;
pub use profile::ProfileClassifier;
