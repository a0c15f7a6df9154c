//! Violation collector: filters, orders and deduplicates what the engine
//! produced, and turns it into an [`Outcome`].

use crate::compat::policy::Policy;
use crate::compat::types::{Outcome, Violation};

pub struct ViolationCollector<'p> {
    policy: &'p Policy,
    violations: Vec<Violation>,
}

impl<'p> ViolationCollector<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self {
            policy,
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        if self.policy.is_file_ignored(&violation.file)
            || self.policy.is_symbol_ignored(&violation.symbol)
        {
            return;
        }
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        for violation in violations {
            self.push(violation);
        }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Sorted by location and rule, then category, message and symbol.
    /// Identical records are reported once; two findings of one rule at one
    /// location stay apart when their messages differ.
    pub fn finish(mut self) -> Outcome {
        self.violations.sort_by(|a, b| {
            (&a.file, a.line, a.column, &a.rule_name, a.category, &a.message, &a.symbol).cmp(&(
                &b.file,
                b.line,
                b.column,
                &b.rule_name,
                b.category,
                &b.message,
                &b.symbol,
            ))
        });
        self.violations.dedup();
        if self.violations.is_empty() {
            Outcome::Compatible
        } else {
            Outcome::Incompatible {
                violations: self.violations,
            }
        }
    }
}
