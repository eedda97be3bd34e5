//! Statement and expression model for condensation.
//!
//! This module holds the object model the condensation passes in
//! [`crate::compiler`] rewrite: expression and condition trees, statements, and
//! the per-method container arena that gives every statement a stable
//! identity.
//!
//! # Architecture
//!
//! The model is organized into focused sub-modules:
//!
//! - [`value`] - Stack value identities, value types and use counts
//! - [`literal`] - Typed constants
//! - [`expression`] - The [`Expression`] sum type and the inlining hook
//! - [`conditional`] - The [`ConditionalExpression`] sum type and its normalizer
//! - [`statement`] - The [`Statement`] sum type
//! - [`container`] - [`MethodBody`], the arena of [`StatementContainer`]s
//! - [`block`] - Block identifiers and jump classification tags
//! - [`exception`] - Exception tables and the exception-interest predicate
//! - [`structured`] - Classified output nodes
//! - [`dumper`] - Text rendering
//!
//! # Usage
//!
//! ```rust
//! use refold::analysis::{
//!     CompOp, ConditionalExpression, Expression, Literal, LocalVariable, MethodBody, Statement,
//!     ValueType,
//! };
//!
//! let mut body = MethodBody::new("sign");
//! let x = Expression::local(LocalVariable::new(1, "x", ValueType::Int));
//! let test = body.push(Statement::if_jump(ConditionalExpression::comparison(
//!     CompOp::Lt,
//!     x,
//!     Expression::literal(Literal::Int(0)),
//! )));
//! let positive = body.push(Statement::ReturnValue(Expression::literal(Literal::Int(1))));
//! let negative = body.push(Statement::ReturnValue(Expression::literal(Literal::Int(-1))));
//! body.set_targets(test, vec![positive, negative])?;
//!
//! assert!(body.dump().contains("if (x < 0) goto lbl2;"));
//! # Ok::<(), refold::Error>(())
//! ```

pub mod block;
pub mod conditional;
pub mod container;
pub mod dumper;
pub mod exception;
pub mod expression;
pub mod literal;
pub mod statement;
pub mod structured;
pub mod value;

// Re-export primary types at module level
pub use block::{BlockIdentifier, BlockType, JumpType};
pub use conditional::{BoolOp, CompOp, ConditionalExpression};
pub use container::{ContainerId, MethodBody, StatementContainer};
pub use dumper::{Dumpable, Dumper};
pub use exception::{faults, ExceptionCheck, ExceptionTableEntry};
pub use expression::{precedence, ArithOp, Expression, LocalVariable, ValueRewriter};
pub use literal::Literal;
pub use statement::{GotoStatement, IfStatement, LValue, Statement, WhileStatement};
pub use structured::StructuredStatement;
pub use value::{MethodRef, StackValue, StackValueId, TypeRef, UsageTable, ValueType};
