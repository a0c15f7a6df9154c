//! Breaking change engine: walks the correspondence tree and runs the
//! enabled rules on every node.
//!
//! Top-level file subtrees are independent, so they are spread over scoped
//! worker threads. Each worker fills its own buffer and the buffers are
//! merged back in file order, which keeps the output identical for any
//! number of jobs.

use crate::canonical::Image;
use crate::compat::collector::ViolationCollector;
use crate::compat::correlate::{Correspondence, CorrespondenceNode, correlate};
use crate::compat::error::BreakingError;
use crate::compat::handlers::RuleInput;
use crate::compat::index::DeclarationIndex;
use crate::compat::policy::{BreakingConfig, Policy};
use crate::compat::rule_registry::RuleSet;
use crate::compat::types::{BreakingSeverity, Outcome, Violation};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation for a run: a shared flag plus an optional
/// deadline. Checked before each top-level file.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Raw result of a walk, before filtering and ordering.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(Vec<Violation>),
    Cancelled,
}

/// What one worker produced: violations per file index.
#[derive(Default)]
struct WorkerOutput {
    files: Vec<(usize, Vec<Violation>)>,
    cancelled: bool,
}

pub struct BreakingEngine<'p> {
    policy: &'p Policy,
    rules: RuleSet,
    jobs: usize,
}

impl<'p> BreakingEngine<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self {
            policy,
            rules: RuleSet::new(policy),
            jobs: 1,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Number of (rule, node kind) pairs enabled for this run.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn run<'a>(
        &self,
        tree: &Correspondence<'a>,
        old: &DeclarationIndex<'a>,
        new: &DeclarationIndex<'a>,
        cancel: &Cancellation,
    ) -> Result<RunOutcome, BreakingError> {
        let jobs = self.jobs.min(tree.files.len()).max(1);
        debug!(files = tree.files.len(), jobs, "evaluating file subtrees");

        let next = &AtomicUsize::new(0);
        let abort = &AtomicBool::new(false);
        let outputs = if jobs == 1 {
            vec![self.work(tree, old, new, cancel, next, abort)]
        } else {
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..jobs)
                    .map(|_| scope.spawn(move || self.work(tree, old, new, cancel, next, abort)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| match handle.join() {
                        Ok(output) => output,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect::<Vec<_>>()
            })
        };

        let mut per_file: Vec<(usize, Vec<Violation>)> = Vec::with_capacity(tree.files.len());
        let mut cancelled = false;
        for output in outputs {
            let output = output?;
            cancelled |= output.cancelled;
            per_file.extend(output.files);
        }
        if cancelled {
            return Ok(RunOutcome::Cancelled);
        }
        per_file.sort_by_key(|(index, _)| *index);
        Ok(RunOutcome::Completed(
            per_file.into_iter().flat_map(|(_, v)| v).collect(),
        ))
    }

    /// Pulls file indexes until none are left, the run is cancelled or
    /// another worker failed.
    fn work<'a>(
        &self,
        tree: &Correspondence<'a>,
        old: &DeclarationIndex<'a>,
        new: &DeclarationIndex<'a>,
        cancel: &Cancellation,
        next: &AtomicUsize,
        abort: &AtomicBool,
    ) -> Result<WorkerOutput, BreakingError> {
        let mut output = WorkerOutput::default();
        loop {
            if abort.load(Ordering::Relaxed) {
                return Ok(output);
            }
            if cancel.is_cancelled() {
                output.cancelled = true;
                return Ok(output);
            }
            let index = next.fetch_add(1, Ordering::Relaxed);
            let Some(file) = tree.files.get(index) else {
                return Ok(output);
            };
            let mut violations = Vec::new();
            if let Err(err) = self.visit(file, &mut Vec::new(), old, new, &mut violations) {
                abort.store(true, Ordering::Relaxed);
                return Err(err);
            }
            output.files.push((index, violations));
        }
    }

    fn visit<'t, 'a>(
        &self,
        node: &'t CorrespondenceNode<'a>,
        ancestors: &mut Vec<&'t CorrespondenceNode<'a>>,
        old: &DeclarationIndex<'a>,
        new: &DeclarationIndex<'a>,
        out: &mut Vec<Violation>,
    ) -> Result<(), BreakingError> {
        if self.policy.skips(node) {
            return Ok(());
        }

        let input = RuleInput {
            node,
            ancestors: ancestors.as_slice(),
            old,
            new,
            policy: self.policy,
        };
        for rule in self.rules.for_kind(node.kind) {
            if self.policy.is_rule_ignored_for(rule.name, node.file_path()) {
                continue;
            }
            let findings = (rule.check)(&input).map_err(|fault| BreakingError::RuleFault {
                rule: rule.name,
                symbol: node.symbol(),
                reason: fault.reason,
            })?;
            let categories: Vec<_> = self.policy.categories().active_in(rule.categories).collect();
            for finding in findings {
                for &category in &categories {
                    out.push(Violation {
                        file: finding.location.file.clone(),
                        line: finding.location.span.line,
                        column: finding.location.span.column,
                        rule_name: rule.name.to_string(),
                        category,
                        severity: BreakingSeverity::Breaking,
                        message: finding.message.clone(),
                        symbol: node.symbol(),
                    });
                }
            }
        }

        ancestors.push(node);
        for child in &node.children {
            self.visit(child, ancestors, old, new, out)?;
        }
        ancestors.pop();
        Ok(())
    }
}

/// Compare two images under `config`.
///
/// Policy and structural errors are returned before any rule runs.
pub fn check(
    old: &Image,
    new: &Image,
    config: &BreakingConfig,
    cancel: &Cancellation,
    jobs: usize,
) -> Result<Outcome, BreakingError> {
    let policy = Policy::compile(config)?;
    let old_index = DeclarationIndex::build(old)?;
    let new_index = DeclarationIndex::build(new)?;
    debug!(
        old_declarations = old_index.len(),
        new_declarations = new_index.len(),
        "indexed images"
    );

    let tree = correlate(&old_index, &new_index, policy.correlate_options());
    debug!(nodes = tree.node_count(), "correlated declarations");

    let engine = BreakingEngine::new(&policy).with_jobs(jobs);
    debug!(rules = engine.rule_count(), "resolved rule set");
    match engine.run(&tree, &old_index, &new_index, cancel)? {
        RunOutcome::Cancelled => {
            warn!("breaking check cancelled before completion");
            Ok(Outcome::Cancelled)
        }
        RunOutcome::Completed(violations) => {
            let mut collector = ViolationCollector::new(&policy);
            collector.extend(violations);
            let outcome = collector.finish();
            info!(
                violations = outcome.violations().len(),
                compatible = outcome.is_compatible(),
                "breaking check finished"
            );
            Ok(outcome)
        }
    }
}
