//! Built-in condensation passes.
//!
//! Each pass rewrites one [`MethodBody`](crate::analysis::MethodBody) in place
//! and records what it did in the [`EventLog`](crate::compiler::EventLog) of
//! the shared context.
//!
//! # Standard Schedule
//!
//! The [`PassScheduler`](crate::compiler::PassScheduler) runs the passes in this
//! order, repeating the sequence until the body stops changing.
//!
//! | Pass | Description |
//! |------|-------------|
//! | [`InliningPass`] | Substitutes single-use stack values into their reader |
//! | [`ConstructionCondensationPass`] | Fuses `new T` with the following `<init>` call |
//! | [`ConditionalCondensationPass`] | Folds chains of conditional jumps into `&&`/`||` |
//!
//! # Building Blocks
//!
//! The primitives the passes are made of are public as well, for callers that
//! drive their own structuring:
//!
//! - [`condense_with_next_conditional`], [`condense_with_prior_conditional`]
//! - [`replace_with_while_loop_start`], [`replace_with_while_loop_end`]
//! - [`structured_statement`], [`structure_method`]
//! - [`CreationCollector`]

mod conditionals;
mod creation;
mod inlining;

pub use conditionals::{
    condense_with_next_conditional, condense_with_prior_conditional,
    replace_with_while_loop_end, replace_with_while_loop_start, structure_method,
    structured_statement, ConditionalCondensationPass,
};
pub use creation::{ConstructionCondensationPass, CreationCollector};
pub use inlining::InliningPass;
