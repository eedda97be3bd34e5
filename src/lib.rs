// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # refold
//!
//! Structured control-flow and expression recovery for jump-based stack bytecode.
//!
//! A lifter that turns stack bytecode into statements produces a flat list of
//! tiny assignments to stack slots, separate allocation and initialization
//! steps, and chains of conditional jumps where the source had `&&` and `||`.
//! `refold` condenses such method bodies back towards source-shaped code:
//!
//! - **Single-use inlining** - `v0 = a.f(); return v0 + 1;` becomes `return a.f() + 1;`
//! - **Construction condensation** - `v1 = new T; v1.<init>(x);` becomes `v1 = new T(x);`
//! - **Conditional condensation** - `if (a) goto L; if (b) goto L;` becomes `if (a || b) goto L;`
//! - **Jump classification** - tagged jumps become `break`, `continue` or structured ifs
//!
//! All rewrites preserve the observable behaviour of the method: evaluation
//! order of side effects, short-circuit semantics and exception behaviour.
//!
//! ## Quick Start
//!
//! ```rust
//! use refold::prelude::*;
//!
//! // v0 = Util.f(); return v0;
//! let mut body = MethodBody::new("demo");
//! let v0 = body.new_stack_value(ValueType::Int);
//! let call = Expression::StaticInvocation {
//!     method: MethodRef::new(TypeRef::new("pkg.Util"), "f", ValueType::Int),
//!     args: Vec::new(),
//! };
//! let def = body.push(Statement::assignment(LValue::StackValue(v0.clone()), call));
//! let ret = body.push(Statement::ReturnValue(Expression::stack(v0)));
//! body.set_targets(def, vec![ret])?;
//!
//! let ctx = AnalysisContext::new();
//! let bodies = PassScheduler::default().run_batch(vec![body], &ctx);
//! assert!(bodies[0].dump().contains("return Util.f();"));
//! # Ok::<(), refold::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`analysis`] - The statement model: expressions, conditions, statements and
//!   the per-method container arena
//! - [`compiler`] - The condensation passes, their scheduler and the event log
//!
//! Method bodies are independent of each other, so batches are condensed in
//! parallel. A method whose graph turns out to be inconsistent is returned
//! untouched and reported in the [`compiler::AnalysisContext`]; it never
//! affects other methods.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use refold::prelude::*;
///
/// let scheduler = PassScheduler::default();
/// let ctx = AnalysisContext::new();
/// let bodies = scheduler.run_batch(vec![MethodBody::new("empty")], &ctx);
/// assert_eq!(bodies.len(), 1);
/// ```
pub mod prelude;

/// Statement and expression model.
///
/// # Key Types
///
/// - [`analysis::MethodBody`] - The container arena of one method
/// - [`analysis::Statement`] - A single program point
/// - [`analysis::Expression`] - Value-producing expression trees
/// - [`analysis::ConditionalExpression`] - Boolean conditions
/// - [`analysis::StructuredStatement`] - Classified jump forms
pub mod analysis;

/// Condensation passes and their scheduling.
///
/// # Key Types
///
/// - [`compiler::PassScheduler`] - Runs passes to a fixpoint, per method and per batch
/// - [`compiler::CondensePass`] - The pass interface
/// - [`compiler::AnalysisContext`] - Shared state, events and failure records
pub mod compiler;

/// `refold` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `refold` Error type
///
/// The error type for all operations in this crate. Every variant describes an
/// internal-consistency fault scoped to a single method body.
///
/// # Examples
///
/// ```rust
/// use refold::{analysis::{ContainerId, MethodBody}, Error};
///
/// let body = MethodBody::new("empty");
/// match body.target(ContainerId::new(0), 0) {
///     Err(Error::InvalidContainer(id)) => println!("{id} is not part of the body"),
///     Err(e) => println!("Error: {e}"),
///     Ok(target) => println!("Jumps to {target}"),
/// }
/// ```
pub use error::Error;
