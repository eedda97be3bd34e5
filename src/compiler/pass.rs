//! The pass trait.
//!
//! This module defines the `CondensePass` trait that all condensation passes
//! implement.

use crate::{
    analysis::MethodBody,
    compiler::context::{AnalysisContext, MethodId},
    Result,
};

/// A condensation pass over one method body.
///
/// All passes must be thread-safe (Send + Sync) so that the scheduler can
/// run them on several methods in parallel. Passes receive exclusive access to
/// the method body and shared access to the analysis context.
///
/// A pass must be deterministic with respect to statement position and must
/// never re-introduce a statement it or another pass erased, so that running
/// it repeatedly converges.
pub trait CondensePass: Send + Sync {
    /// Unique name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Should this pass run on a specific method?
    ///
    /// Called before `run_on_method`. Override to skip bodies the pass has
    /// nothing to do for.
    fn should_run(&self, _body: &MethodBody, _ctx: &AnalysisContext) -> bool {
        true
    }

    /// Run the pass on a single method body.
    ///
    /// Returns `true` if any changes were made, `false` otherwise.
    /// Events should be recorded directly to `ctx.events`.
    ///
    /// # Arguments
    ///
    /// * `body` - The method body to transform.
    /// * `method` - The identifier of the method within its batch.
    /// * `ctx` - The analysis context (thread-safe, uses shared reference).
    ///
    /// # Errors
    ///
    /// Returns an error if the body violates an invariant the pass relies on.
    /// The scheduler then abandons the method.
    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<bool>;

    /// Get a description of what this pass does.
    fn description(&self) -> &'static str {
        "No description available"
    }
}
