//! Statements.
//!
//! A [`Statement`] is a closed sum type over everything the lifter emits for a
//! single program point. Statements never exist on their own: each one is held
//! by a [`crate::analysis::StatementContainer`] inside a
//! [`crate::analysis::MethodBody`], and all jump targets are resolved through
//! the container graph rather than stored in the statement.

use std::fmt;

use crate::{
    analysis::{
        block::{BlockIdentifier, JumpType},
        conditional::ConditionalExpression,
        container::ContainerId,
        dumper::Dumper,
        exception::ExceptionCheck,
        expression::{Expression, LocalVariable, ValueRewriter},
        value::{StackValue, StackValueId, ValueType},
    },
    Error, Result,
};

/// The target of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LValue {
    /// A stack value being defined.
    StackValue(StackValue),
    /// A local variable being written.
    Local(LocalVariable),
}

impl LValue {
    /// The stack value this l-value defines, if any.
    #[must_use]
    pub fn as_stack_value(&self) -> Option<&StackValue> {
        match self {
            Self::StackValue(value) => Some(value),
            Self::Local(_) => None,
        }
    }

    /// The declared type of the target.
    #[must_use]
    pub fn value_type(&self) -> &ValueType {
        match self {
            Self::StackValue(value) => &value.ty,
            Self::Local(local) => &local.ty,
        }
    }
}

impl fmt::Display for LValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackValue(value) => write!(f, "{value}"),
            Self::Local(local) => write!(f, "{local}"),
        }
    }
}

/// A conditional jump.
///
/// The container holding an `IfStatement` always has exactly two successors:
/// [`IfStatement::JUMP_NOT_TAKEN`] (fall-through) and
/// [`IfStatement::JUMP_TAKEN`].
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    condition: ConditionalExpression,
    jump_type: JumpType,
    known_if_block: Option<BlockIdentifier>,
    known_else_block: Option<BlockIdentifier>,
}

impl IfStatement {
    /// Successor offset of the fall-through path.
    pub const JUMP_NOT_TAKEN: usize = 0;
    /// Successor offset of the taken path.
    pub const JUMP_TAKEN: usize = 1;

    /// Creates a plain conditional jump on `condition`.
    #[must_use]
    pub fn new(condition: ConditionalExpression) -> Self {
        Self {
            condition,
            jump_type: JumpType::Goto,
            known_if_block: None,
            known_else_block: None,
        }
    }

    /// The tested condition.
    #[must_use]
    pub fn condition(&self) -> &ConditionalExpression {
        &self.condition
    }

    /// Replaces the tested condition.
    pub fn set_condition(&mut self, condition: ConditionalExpression) {
        self.condition = condition;
    }

    /// Runs the condition through the boolean normalizer.
    pub fn simplify_condition(&mut self) {
        let condition = std::mem::replace(&mut self.condition, ConditionalExpression::Constant(true));
        self.condition = condition.simplify();
    }

    /// Replaces the condition with its simplified negation.
    pub fn negate_condition(&mut self) {
        let condition = std::mem::replace(&mut self.condition, ConditionalExpression::Constant(true));
        self.condition = condition.negated();
    }

    /// Rewrites integer tests of boolean values into direct boolean tests.
    pub fn optimise_for_types(&mut self) {
        let condition = std::mem::replace(&mut self.condition, ConditionalExpression::Constant(true));
        self.condition = condition.optimise_for_types();
    }

    /// How this jump relates to the surrounding blocks.
    #[must_use]
    pub fn jump_type(&self) -> JumpType {
        self.jump_type
    }

    /// Sets the jump classification.
    pub fn set_jump_type(&mut self, jump_type: JumpType) {
        self.jump_type = jump_type;
    }

    /// Records the then/else blocks found by block-boundary analysis.
    pub fn set_known_blocks(
        &mut self,
        if_block: Option<BlockIdentifier>,
        else_block: Option<BlockIdentifier>,
    ) {
        self.known_if_block = if_block;
        self.known_else_block = else_block;
    }

    /// The then/else blocks, if known.
    #[must_use]
    pub fn blocks(&self) -> (Option<BlockIdentifier>, Option<BlockIdentifier>) {
        (self.known_if_block, self.known_else_block)
    }

    /// Returns `true` if evaluating the condition can raise a fault observed by `check`.
    #[must_use]
    pub fn can_throw(&self, check: &ExceptionCheck) -> bool {
        self.condition.can_throw(check)
    }
}

/// An unconditional jump; the container's only successor is its target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GotoStatement {
    jump_type: JumpType,
}

impl GotoStatement {
    /// Creates a plain goto.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a goto with the given classification.
    #[must_use]
    pub fn with_jump_type(jump_type: JumpType) -> Self {
        Self { jump_type }
    }

    /// How this jump relates to the surrounding blocks.
    #[must_use]
    pub fn jump_type(&self) -> JumpType {
        self.jump_type
    }

    /// Sets the jump classification.
    pub fn set_jump_type(&mut self, jump_type: JumpType) {
        self.jump_type = jump_type;
    }
}

/// A loop header produced from a conditional jump.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    /// Loop condition; `None` loops forever.
    pub condition: Option<ConditionalExpression>,
    /// The loop body block.
    pub block: BlockIdentifier,
}

impl WhileStatement {
    /// Creates a loop header.
    #[must_use]
    pub fn new(condition: Option<ConditionalExpression>, block: BlockIdentifier) -> Self {
        Self { condition, block }
    }
}

/// A single program point.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `lvalue = rvalue;`
    Assignment {
        /// The assigned target.
        lvalue: LValue,
        /// The assigned value.
        rvalue: Expression,
    },

    /// An expression evaluated for its effect (typically an invocation).
    Expression(Expression),

    /// A conditional jump.
    If(IfStatement),

    /// An unconditional jump.
    Goto(GotoStatement),

    /// A loop header.
    While(WhileStatement),

    /// `return value;`
    ReturnValue(Expression),

    /// `return;`
    ReturnVoid,

    /// Position just after an anonymous block; target of anonymous breaks.
    AnonBreakTarget(BlockIdentifier),

    /// No effect; keeps the position of an erased statement.
    Nop,
}

impl Statement {
    /// Shorthand for an assignment.
    #[must_use]
    pub fn assignment(lvalue: LValue, rvalue: Expression) -> Self {
        Self::Assignment { lvalue, rvalue }
    }

    /// Shorthand for a plain conditional jump.
    #[must_use]
    pub fn if_jump(condition: ConditionalExpression) -> Self {
        Self::If(IfStatement::new(condition))
    }

    /// Shorthand for a plain goto.
    #[must_use]
    pub fn goto() -> Self {
        Self::Goto(GotoStatement::new())
    }

    /// The single value this statement defines, if any.
    #[must_use]
    pub fn created_lvalue(&self) -> Option<&LValue> {
        match self {
            Self::Assignment { lvalue, .. } => Some(lvalue),
            _ => None,
        }
    }

    /// The value-producing expression of this statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAppropriate`] for statement kinds without one.
    pub fn rvalue(&self) -> Result<&Expression> {
        match self {
            Self::Assignment { rvalue, .. } | Self::Expression(rvalue) | Self::ReturnValue(rvalue) => {
                Ok(rvalue)
            }
            _ => Err(Error::NotAppropriate("statement has no r-value")),
        }
    }

    /// The conditional jump held by this statement, if it is one.
    #[must_use]
    pub fn as_if(&self) -> Option<&IfStatement> {
        match self {
            Self::If(stmt) => Some(stmt),
            _ => None,
        }
    }

    /// Mutable access to the conditional jump held by this statement.
    pub fn as_if_mut(&mut self) -> Option<&mut IfStatement> {
        match self {
            Self::If(stmt) => Some(stmt),
            _ => None,
        }
    }

    /// Returns `true` for conditional jumps.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::If(_))
    }

    /// Returns `true` for erased statements.
    #[must_use]
    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Nop)
    }

    /// The jump classification, for statements that jump.
    #[must_use]
    pub fn jump_type(&self) -> Option<JumpType> {
        match self {
            Self::If(stmt) => Some(stmt.jump_type()),
            Self::Goto(stmt) => Some(stmt.jump_type()),
            _ => None,
        }
    }

    /// The successor offset of this statement's jump target, for statements that jump.
    #[must_use]
    pub fn jump_target_offset(&self) -> Option<usize> {
        match self {
            Self::If(_) => Some(IfStatement::JUMP_TAKEN),
            Self::Goto(_) => Some(0),
            _ => None,
        }
    }

    /// Returns `true` if executing the statement can raise a fault observed by `check`.
    #[must_use]
    pub fn can_throw(&self, check: &ExceptionCheck) -> bool {
        match self {
            Self::Assignment { rvalue, .. } | Self::Expression(rvalue) | Self::ReturnValue(rvalue) => {
                rvalue.can_throw(check)
            }
            Self::If(stmt) => stmt.can_throw(check),
            Self::While(stmt) => stmt
                .condition
                .as_ref()
                .is_some_and(|condition| condition.can_throw(check)),
            Self::Goto(_) | Self::ReturnVoid | Self::AnonBreakTarget(_) | Self::Nop => false,
        }
    }

    /// Appends every stack value read by this statement, in evaluation order.
    ///
    /// The value defined by an assignment is not a read.
    pub fn collect_used_values(&self, used: &mut Vec<StackValueId>) {
        match self {
            Self::Assignment { rvalue, .. } | Self::Expression(rvalue) | Self::ReturnValue(rvalue) => {
                rvalue.collect_used_values(used);
            }
            Self::If(stmt) => stmt.condition.collect_used_values(used),
            Self::While(stmt) => {
                if let Some(condition) = &stmt.condition {
                    condition.collect_used_values(used);
                }
            }
            Self::Goto(_) | Self::ReturnVoid | Self::AnonBreakTarget(_) | Self::Nop => {}
        }
    }

    /// Replaces reads of single-use stack values with their definitions.
    ///
    /// Delegates to the contained expressions; conditions stay conditions.
    ///
    /// # Returns
    ///
    /// `true` if anything in the statement was replaced.
    pub fn replace_single_usage_values(&mut self, rewriter: &mut dyn ValueRewriter) -> bool {
        match self {
            Self::Assignment { rvalue, .. } | Self::Expression(rvalue) | Self::ReturnValue(rvalue) => {
                rvalue.replace_single_usage_values(rewriter)
            }
            Self::If(stmt) => stmt.condition.replace_single_usage_values(rewriter),
            Self::While(stmt) => stmt
                .condition
                .as_mut()
                .is_some_and(|condition| condition.replace_single_usage_values(rewriter)),
            Self::Goto(_) | Self::ReturnVoid | Self::AnonBreakTarget(_) | Self::Nop => false,
        }
    }

    /// Renders the statement; `jump_target` names the target of jumps.
    pub fn dump(&self, dumper: &mut Dumper, jump_target: Option<ContainerId>) {
        let target = |dumper: &mut Dumper| {
            match jump_target {
                Some(target) => dumper.print(format_args!("goto {target};")),
                None => dumper.print("goto ?;"),
            };
        };

        match self {
            Self::Assignment { lvalue, rvalue } => {
                dumper.print(format_args!("{lvalue} = {rvalue};"));
            }
            Self::Expression(expr) => {
                dumper.print(format_args!("{expr};"));
            }
            Self::If(stmt) => {
                dumper.print(format_args!("if ({}) ", stmt.condition));
                target(dumper);
            }
            Self::Goto(_) => {
                target(dumper);
            }
            Self::While(stmt) => match &stmt.condition {
                Some(condition) => {
                    dumper.print(format_args!("while ({condition}) // {}", stmt.block));
                }
                None => {
                    dumper.print(format_args!("while (true) // {}", stmt.block));
                }
            },
            Self::ReturnValue(expr) => {
                dumper.print(format_args!("return {expr};"));
            }
            Self::ReturnVoid => {
                dumper.print("return;");
            }
            Self::AnonBreakTarget(block) => {
                dumper.print(format_args!("// end of {}", block.label()));
            }
            Self::Nop => {
                dumper.print("// nop");
            }
        }
        dumper.newline();
    }
}
