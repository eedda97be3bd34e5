//! # refold Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the refold library. Import this module to get quick access to the essential
//! types for building method bodies and condensing them.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all refold operations
pub use crate::Error;

/// The result type used throughout refold
pub use crate::Result;

// ================================================================================================
// Statement Model
// ================================================================================================

/// The container arena and its handles
pub use crate::analysis::{ContainerId, MethodBody, StatementContainer};

/// Statements and their jump forms
pub use crate::analysis::{GotoStatement, IfStatement, LValue, Statement, WhileStatement};

/// Expression and condition trees
pub use crate::analysis::{
    ArithOp, BoolOp, CompOp, ConditionalExpression, Expression, Literal, LocalVariable,
};

/// Values, types and member references
pub use crate::analysis::{MethodRef, StackValue, StackValueId, TypeRef, UsageTable, ValueType};

/// Exception analysis inputs
pub use crate::analysis::{ExceptionCheck, ExceptionTableEntry};

// ================================================================================================
// Structuring
// ================================================================================================

/// Block identities, jump tags and classified output
pub use crate::analysis::{BlockIdentifier, BlockType, JumpType, StructuredStatement};

/// Text rendering
pub use crate::analysis::{Dumpable, Dumper};

// ================================================================================================
// Passes and Scheduling
// ================================================================================================

/// Scheduling and shared state
pub use crate::compiler::{AnalysisContext, CondensePass, MethodId, PassScheduler};

/// Built-in passes
pub use crate::compiler::{
    ConditionalCondensationPass, ConstructionCondensationPass, CreationCollector, InliningPass,
};

/// Event tracking
pub use crate::compiler::{DerivedStats, EventKind, EventLog};
