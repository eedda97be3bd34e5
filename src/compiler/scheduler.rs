//! Pass scheduler for orchestrating condensation pass execution.
//!
//! The `PassScheduler` runs an ordered list of passes over each method body
//! until the body stops changing, and runs independent method bodies in
//! parallel.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::{
    analysis::MethodBody,
    compiler::{
        context::{AnalysisContext, MethodId},
        events::EventKind,
        pass::CondensePass,
        passes::{ConditionalCondensationPass, ConstructionCondensationPass, InliningPass},
    },
    Error, Result,
};

/// Orchestrates condensation pass execution.
///
/// Every iteration runs each registered pass once, in order, on the method
/// body. The passes are repeated until `stable_iterations` consecutive
/// iterations change nothing, or `max_iterations` is reached.
///
/// The standard schedule is:
///
/// 1. **Inlining**: single-use stack values are substituted into their reader
/// 2. **Construction**: allocations are fused with their initializer calls
/// 3. **Conditionals**: chains of conditional jumps are folded
///
/// Inlining runs first since it is what brings the operands of a conditional
/// chain together; construction condensation in turn leaves single-use
/// constructor results for the next inlining round.
pub struct PassScheduler {
    /// Maximum iterations per method.
    max_iterations: usize,
    /// Number of stable iterations before stopping.
    stable_iterations: usize,
    /// Fail a method that is still changing after `max_iterations`.
    strict: bool,
    /// The passes, in execution order.
    passes: Vec<Box<dyn CondensePass>>,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::new(16, 1)
    }
}

impl PassScheduler {
    /// Creates a scheduler with the standard pass schedule.
    ///
    /// # Arguments
    ///
    /// * `max_iterations` - Maximum iterations per method before stopping.
    /// * `stable_iterations` - Stop early after this many iterations without changes.
    ///
    /// # Returns
    ///
    /// A new `PassScheduler`.
    #[must_use]
    pub fn new(max_iterations: usize, stable_iterations: usize) -> Self {
        let mut scheduler = Self::empty(max_iterations, stable_iterations);
        scheduler.add_pass(Box::new(InliningPass::new()));
        scheduler.add_pass(Box::new(ConstructionCondensationPass::new()));
        scheduler.add_pass(Box::new(ConditionalCondensationPass::new()));
        scheduler
    }

    /// Creates a scheduler without any passes.
    #[must_use]
    pub fn empty(max_iterations: usize, stable_iterations: usize) -> Self {
        Self {
            max_iterations,
            stable_iterations: stable_iterations.max(1),
            strict: false,
            passes: Vec::new(),
        }
    }

    /// Appends a pass to the schedule.
    pub fn add_pass(&mut self, pass: Box<dyn CondensePass>) {
        self.passes.push(pass);
    }

    /// Sets whether hitting the iteration limit while still changing is an error.
    ///
    /// A lenient scheduler (the default) keeps the partially condensed body
    /// and logs a warning.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Names of the scheduled passes, in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Runs every pass once over `body`.
    ///
    /// Returns `true` if any pass made changes, `false` otherwise.
    fn run_passes_once(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<bool> {
        let mut changed = false;

        for pass in &self.passes {
            if !pass.should_run(body, ctx) {
                continue;
            }
            if pass.run_on_method(body, method, ctx)? {
                log::debug!("{}: pass {} changed the body", body.name(), pass.name());
                changed = true;
            }
        }

        Ok(changed)
    }

    /// Runs the schedule on one method body until it stops changing.
    ///
    /// Use counts are recomputed before the first iteration, so bodies coming
    /// from a lifter that does not maintain them are handled as well.
    ///
    /// # Arguments
    ///
    /// * `body` - The method body to condense in place.
    /// * `method` - The identifier events are recorded under.
    /// * `ctx` - The analysis context.
    ///
    /// # Returns
    ///
    /// The number of iterations completed.
    ///
    /// # Errors
    ///
    /// Returns the first error a pass reports, or [`Error::IterationLimit`] if
    /// the scheduler is strict and the body was still changing in its last
    /// iteration. `body` may be partially rewritten in either case.
    pub fn run_method(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<usize> {
        body.recount_usages();
        ctx.events
            .record(EventKind::PassStarted)
            .method(method)
            .message(body.name().to_string());

        let mut stable_count = 0;
        let mut iterations = 0;
        let mut last_changed = false;

        for iteration in 0..self.max_iterations {
            iterations = iteration + 1;
            last_changed = self.run_passes_once(body, method, ctx)?;

            if last_changed {
                stable_count = 0;
            } else {
                stable_count += 1;
                if stable_count >= self.stable_iterations {
                    break;
                }
            }
        }

        if last_changed {
            if self.strict {
                return Err(Error::IterationLimit(self.max_iterations));
            }
            log::warn!(
                "{}: still changing after {} iterations",
                body.name(),
                self.max_iterations
            );
            ctx.events
                .record(EventKind::Warning)
                .method(method)
                .message(format!("iteration limit {} reached", self.max_iterations));
        }

        ctx.add_iterations(iterations);
        ctx.events
            .record(EventKind::PassCompleted)
            .method(method)
            .message(format!("{iterations} iterations"));
        Ok(iterations)
    }

    /// Runs the schedule on a batch of independent method bodies.
    ///
    /// Bodies are processed in parallel using rayon. Each body is condensed on
    /// a copy; if any pass reports an internal fault for a method, the fault
    /// is recorded in `ctx.failed_methods` and the method's original body is
    /// returned untouched. One failing method never affects the others.
    ///
    /// A method counts as processed only if one of its statements or links
    /// changed; recomputed use counts alone do not mark it.
    ///
    /// Method `i` of the batch is identified as `MethodId::new(i)`, and the
    /// result preserves the input order.
    ///
    /// # Returns
    ///
    /// The condensed bodies.
    pub fn run_batch(&self, bodies: Vec<MethodBody>, ctx: &AnalysisContext) -> Vec<MethodBody> {
        let any_changed = AtomicBool::new(false);

        let results: Vec<MethodBody> = bodies
            .into_par_iter()
            .enumerate()
            .map(|(index, original)| {
                let method = MethodId::new(index);
                let mut body = original.clone();

                match self.run_method(&mut body, method, ctx) {
                    Ok(_) => {
                        if body.iter().ne(original.iter()) {
                            ctx.mark_processed(method);
                            any_changed.store(true, Ordering::Relaxed);
                        }
                        body
                    }
                    Err(error) => {
                        log::warn!("{}: abandoned: {}", original.name(), error);
                        ctx.events
                            .record(EventKind::MethodFailed)
                            .method(method)
                            .message(error.to_string());
                        ctx.mark_failed(method, error);
                        original
                    }
                }
            })
            .collect();

        if any_changed.load(Ordering::Relaxed) {
            log::info!(
                "condensed {} of {} methods: {}",
                ctx.processed_methods.len(),
                results.len(),
                ctx.stats()
            );
        }

        results
    }
}
