//! Shared helpers for unit tests.
//!
//! - [`factories`] - Builders for method bodies and conditions
//! - [`helpers`] - An interpreter for comparing bodies before and after a rewrite

pub mod helpers;

pub use factories::{flag, BodyBuilder};
pub use helpers::{evaluate, evaluate_condition};
