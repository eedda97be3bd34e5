//! Condensation passes and their scheduling.
//!
//! This module is the transformation layer on top of the statement model:
//!
//! - [`crate::analysis`] - Expressions, statements, the container arena
//! - [`compiler`](self) - Passes that rewrite method bodies, and their scheduler
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Condensation Pipeline                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  AnalysisContext              Shared state of one run            │
//! │    ├─ EventLog                (every rewrite, per method)        │
//! │    ├─ failed_methods          (abandoned methods and why)        │
//! │    └─ processed_methods       (methods that changed)             │
//! │                                                                  │
//! │  PassScheduler               Per-method fixpoint execution       │
//! │    ├─ run_method()            one body, passes until stable      │
//! │    └─ run_batch()             many bodies in parallel (rayon),   │
//! │                               failed bodies fall back untouched  │
//! │                                                                  │
//! │  CondensePass trait          Interface for all passes            │
//! │    ├─ should_run()            Cheap applicability check          │
//! │    └─ run_on_method()         Per-method transformation          │
//! │                                                                  │
//! │  Passes (3 built-in)                                             │
//! │    ├─ InliningPass            single-use stack values            │
//! │    ├─ ConstructionCondensation new T + <init> → new T(..)        │
//! │    └─ ConditionalCondensation if-chains → && / ||                │
//! │                                                                  │
//! │  Structuring primitives      Jump classification, loop headers   │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use refold::analysis::{
//!     ConditionalExpression, Expression, Literal, LocalVariable, MethodBody, Statement,
//!     ValueType,
//! };
//! use refold::compiler::{AnalysisContext, PassScheduler};
//!
//! let flag = |name: &str| {
//!     ConditionalExpression::Value(Expression::local(LocalVariable::new(0, name, ValueType::Boolean)))
//! };
//!
//! // if (a) goto lbl3; if (b) goto lbl3; return 0; return 1;
//! let mut body = MethodBody::new("either");
//! let first = body.push(Statement::if_jump(flag("a")));
//! let second = body.push(Statement::if_jump(flag("b")));
//! let miss = body.push(Statement::ReturnValue(Expression::literal(Literal::Int(0))));
//! let hit = body.push(Statement::ReturnValue(Expression::literal(Literal::Int(1))));
//! body.set_targets(first, vec![second, hit])?;
//! body.set_targets(second, vec![miss, hit])?;
//!
//! let ctx = AnalysisContext::new();
//! let bodies = PassScheduler::default().run_batch(vec![body], &ctx);
//! assert!(bodies[0].dump().contains("if (a || b) goto lbl3;"));
//! # Ok::<(), refold::Error>(())
//! ```

mod context;
mod events;
mod pass;
mod passes;
mod scheduler;

pub use context::{AnalysisContext, MethodId};
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::CondensePass;
pub use passes::{
    condense_with_next_conditional, condense_with_prior_conditional,
    replace_with_while_loop_end, replace_with_while_loop_start, structure_method,
    structured_statement, ConditionalCondensationPass, ConstructionCondensationPass,
    CreationCollector, InliningPass,
};
pub use scheduler::PassScheduler;
