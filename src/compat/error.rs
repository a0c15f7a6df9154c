//! Errors that stop a comparison before a verdict is reached.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BreakingError {
    /// The same declaration identity appears twice in one image.
    #[error("duplicate declaration {key} in {file}")]
    DuplicateIdentity { key: String, file: String },

    /// A field or method refers to a type that is not in the image.
    #[error("{from} refers to unknown type \"{target}\"")]
    UnresolvedReference { from: String, target: String },

    #[error("unknown breaking category \"{0}\"")]
    UnknownCategory(String),

    #[error("unknown breaking rule \"{0}\"")]
    UnknownRule(String),

    #[error("no breaking categories selected")]
    EmptyCategories,

    #[error("invalid glob \"{pattern}\": {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// A rule met a node it cannot evaluate. This is a defect in the rule.
    #[error("rule {rule} failed on {symbol}: {reason}")]
    RuleFault {
        rule: &'static str,
        symbol: String,
        reason: String,
    },
}
