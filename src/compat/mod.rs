//! Breaking change detection between two schema images
//!
//! The pipeline indexes both images, correlates their declarations by
//! stable identity, runs the enabled rules over the resulting tree and
//! collects the violations into a deterministic report.

pub mod categories;
pub mod collector;
pub mod correlate;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod index;
pub mod policy;
pub mod rule_registry;
pub mod types;

pub mod enum_rules;
pub mod extension_rules;
pub mod field_rules;
pub mod file_rules;
pub mod message_rules;
pub mod package_rules;
pub mod reserved_rules;
pub mod service_rules;

pub use categories::BreakingCategory;
pub use engine::{BreakingEngine, Cancellation, RunOutcome, check};
pub use error::BreakingError;
pub use policy::{BreakingConfig, Policy};
pub use rule_registry::{RULES, Rule};
pub use types::{BreakingSeverity, Outcome, Violation};
