//! Core types for breaking change detection

use crate::canonical::Span;
use crate::compat::categories::BreakingCategory;
use serde::{Deserialize, Serialize};

/// Kind of declaration a correspondence node wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    File,
    Message,
    Field,
    Enum,
    EnumValue,
    Service,
    Method,
    Extension,
    Oneof,
}

impl NodeKind {
    pub const COUNT: usize = 9;

    pub const ALL: [NodeKind; NodeKind::COUNT] = [
        NodeKind::File,
        NodeKind::Message,
        NodeKind::Field,
        NodeKind::Enum,
        NodeKind::EnumValue,
        NodeKind::Service,
        NodeKind::Method,
        NodeKind::Extension,
        NodeKind::Oneof,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            NodeKind::File => "FILE",
            NodeKind::Message => "MESSAGE",
            NodeKind::Field => "FIELD",
            NodeKind::Enum => "ENUM",
            NodeKind::EnumValue => "ENUM_VALUE",
            NodeKind::Service => "SERVICE",
            NodeKind::Method => "METHOD",
            NodeKind::Extension => "EXTENSION",
            NodeKind::Oneof => "ONEOF",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Severity of a violation. This engine has no warning tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakingSeverity {
    #[default]
    Breaking,
}

/// Where a finding is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub file: String,
    pub span: Span,
}

impl SourceRef {
    pub fn new(file: impl Into<String>, span: Span) -> Self {
        Self {
            file: file.into(),
            span,
        }
    }
}

/// What a rule reports. The runner turns findings into [`Violation`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub location: SourceRef,
    pub message: String,
}

/// A rule could not make sense of the node it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFault {
    pub reason: String,
}

impl RuleFault {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result of a single rule check
pub type RuleResult = Result<Vec<Finding>, RuleFault>;

/// One reported incompatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub rule_name: String,
    pub category: BreakingCategory,
    pub severity: BreakingSeverity,
    pub message: String,
    /// Fully-qualified name of the declaration the rule ran on.
    pub symbol: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}:{} ({})",
            self.file, self.line, self.column, self.message, self.rule_name
        )
    }
}

/// Final verdict of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Compatible,
    Incompatible { violations: Vec<Violation> },
    Cancelled,
}

impl Outcome {
    pub fn violations(&self) -> &[Violation] {
        match self {
            Outcome::Incompatible { violations } => violations,
            _ => &[],
        }
    }

    pub fn is_compatible(&self) -> bool {
        matches!(self, Outcome::Compatible)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}
