//! Expression trees.
//!
//! An [`Expression`] is a closed sum type over every value-producing construct
//! the lifter can emit. All per-kind behaviour (rendering, the "simple"
//! predicate, fault analysis, single-use inlining) is dispatched by exhaustive
//! `match`, so adding a variant forces every analysis to decide what to do with
//! it.
//!
//! Boolean-valued conditions live in their own type,
//! [`ConditionalExpression`], which embeds expressions as operands and can be
//! embedded back into an expression through [`Expression::Conditional`].
//!
//! # Rendering
//!
//! `Display` renders source text with the minimum parentheses needed for the
//! operator precedence of the tree, see [`precedence`].

use std::fmt;

use strum::Display;

use crate::analysis::{
    conditional::ConditionalExpression,
    exception::{faults, ExceptionCheck},
    literal::Literal,
    value::{MethodRef, StackValue, StackValueId, TypeRef, ValueType},
};

/// Binding strength of rendered operators; higher binds tighter.
pub mod precedence {
    /// `||`
    pub const LOGICAL_OR: u8 = 3;
    /// `&&`
    pub const LOGICAL_AND: u8 = 4;
    /// `|`
    pub const BIT_OR: u8 = 5;
    /// `^`
    pub const BIT_XOR: u8 = 6;
    /// `&`
    pub const BIT_AND: u8 = 7;
    /// `==`, `!=`
    pub const EQUALITY: u8 = 8;
    /// `<`, `<=`, `>`, `>=`
    pub const RELATIONAL: u8 = 9;
    /// `<<`, `>>`, `>>>`
    pub const SHIFT: u8 = 10;
    /// `+`, `-`
    pub const ADDITIVE: u8 = 11;
    /// `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 12;
    /// `!`, unary minus
    pub const UNARY: u8 = 14;
    /// Literals, names, calls and allocations.
    pub const ATOM: u8 = 16;
}

/// Writes `value`, wrapped in parentheses when `parens` is set.
pub(crate) fn write_operand<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    value: &T,
    parens: bool,
) -> fmt::Result {
    if parens {
        write!(f, "({value})")
    } else {
        write!(f, "{value}")
    }
}

/// Supplies definitions of single-use stack values to the inliner.
///
/// The rewriter owns every decision about *whether* a value may be inlined
/// (use count, ordering against side effects); the expression tree only
/// decides *where* a definition may land.
pub trait ValueRewriter {
    /// Returns the definition of `value` if it may be inlined at the current site.
    fn peek(&self, value: StackValueId) -> Option<&Expression>;

    /// Removes and returns the definition of `value`, consuming its single use.
    fn take(&mut self, value: StackValueId) -> Option<Expression>;

    /// Called once `expression` has been evaluated in place at the current
    /// site, after all of its operands.
    fn evaluated(&mut self, _expression: &Expression) {}
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ArithOp {
    /// Addition.
    #[strum(serialize = "+")]
    Add,
    /// Subtraction.
    #[strum(serialize = "-")]
    Sub,
    /// Multiplication.
    #[strum(serialize = "*")]
    Mul,
    /// Division.
    #[strum(serialize = "/")]
    Div,
    /// Remainder.
    #[strum(serialize = "%")]
    Rem,
    /// Bitwise and.
    #[strum(serialize = "&")]
    And,
    /// Bitwise or.
    #[strum(serialize = "|")]
    Or,
    /// Bitwise exclusive or.
    #[strum(serialize = "^")]
    Xor,
    /// Left shift.
    #[strum(serialize = "<<")]
    Shl,
    /// Arithmetic right shift.
    #[strum(serialize = ">>")]
    Shr,
    /// Logical right shift.
    #[strum(serialize = ">>>")]
    Ushr,
}

impl ArithOp {
    /// Binding strength of this operator.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Rem => precedence::MULTIPLICATIVE,
            Self::Add | Self::Sub => precedence::ADDITIVE,
            Self::Shl | Self::Shr | Self::Ushr => precedence::SHIFT,
            Self::And => precedence::BIT_AND,
            Self::Xor => precedence::BIT_XOR,
            Self::Or => precedence::BIT_OR,
        }
    }

    /// Returns `true` for operators that fault on a zero integral divisor.
    #[must_use]
    pub const fn is_division(self) -> bool {
        matches!(self, Self::Div | Self::Rem)
    }
}

/// A method-local variable slot with its recovered name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// Slot index in the local variable array.
    pub slot: u16,
    /// Name to render.
    pub name: String,
    /// Declared type.
    pub ty: ValueType,
}

impl LocalVariable {
    /// Creates a local variable.
    #[must_use]
    pub fn new(slot: u16, name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            slot,
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for LocalVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A value-producing expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A constant.
    Literal(Literal),

    /// A read of a stack value.
    StackValue(StackValue),

    /// A read of a local variable.
    Local(LocalVariable),

    /// A binary arithmetic or bitwise operation.
    Arithmetic {
        /// The operator.
        op: ArithOp,
        /// Left operand.
        lhs: Box<Expression>,
        /// Right operand.
        rhs: Box<Expression>,
        /// Result type.
        ty: ValueType,
    },

    /// A boolean condition used as a value.
    Conditional(Box<ConditionalExpression>),

    /// An allocated but not yet initialized object (`new T` without a call).
    NewObject(TypeRef),

    /// A virtual or special call on a receiver; initializer calls use `<init>`.
    MemberInvocation {
        /// The receiver.
        object: Box<Expression>,
        /// The called method.
        method: MethodRef,
        /// Arguments in evaluation order.
        args: Vec<Expression>,
    },

    /// A static call.
    StaticInvocation {
        /// The called method.
        method: MethodRef,
        /// Arguments in evaluation order.
        args: Vec<Expression>,
    },

    /// Allocation fused with its initializer call (`new T(args)`).
    ConstructorInvocation {
        /// The constructed class.
        ty: TypeRef,
        /// The initializer that was invoked.
        method: MethodRef,
        /// Arguments in evaluation order.
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Shorthand for a literal expression.
    #[must_use]
    pub fn literal(literal: Literal) -> Self {
        Self::Literal(literal)
    }

    /// Shorthand for a stack value read.
    #[must_use]
    pub fn stack(value: StackValue) -> Self {
        Self::StackValue(value)
    }

    /// Shorthand for a local variable read.
    #[must_use]
    pub fn local(local: LocalVariable) -> Self {
        Self::Local(local)
    }

    /// Shorthand for a binary arithmetic expression.
    #[must_use]
    pub fn arithmetic(op: ArithOp, lhs: Expression, rhs: Expression, ty: ValueType) -> Self {
        Self::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            ty,
        }
    }

    /// Wraps a condition as a boolean value.
    #[must_use]
    pub fn conditional(condition: ConditionalExpression) -> Self {
        Self::Conditional(Box::new(condition))
    }

    /// The stack value this expression reads directly, if it is a bare read.
    #[must_use]
    pub fn as_stack_value(&self) -> Option<&StackValue> {
        match self {
            Self::StackValue(value) => Some(value),
            _ => None,
        }
    }

    /// The type of the value this expression produces.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Literal(literal) => literal.value_type(),
            Self::StackValue(value) => value.ty.clone(),
            Self::Local(local) => local.ty.clone(),
            Self::Arithmetic { ty, .. } => ty.clone(),
            Self::Conditional(_) => ValueType::Boolean,
            Self::NewObject(ty) | Self::ConstructorInvocation { ty, .. } => {
                ValueType::Reference(ty.clone())
            }
            Self::MemberInvocation { method, .. } | Self::StaticInvocation { method, .. } => {
                method.returns.clone()
            }
        }
    }

    /// Returns `true` if the expression can safely be evaluated more than once
    /// or moved: it has no side effects, is cheap and cannot fault.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        match self {
            Self::Literal(_) | Self::StackValue(_) | Self::Local(_) => true,
            Self::Arithmetic { op, lhs, rhs, ty } => {
                !(op.is_division() && ty.is_integral()) && lhs.is_simple() && rhs.is_simple()
            }
            Self::Conditional(condition) => condition.is_simple(),
            Self::NewObject(_)
            | Self::MemberInvocation { .. }
            | Self::StaticInvocation { .. }
            | Self::ConstructorInvocation { .. } => false,
        }
    }

    /// Returns `true` if evaluating this expression can raise a fault that a
    /// handler described by `check` would observe.
    #[must_use]
    pub fn can_throw(&self, check: &ExceptionCheck) -> bool {
        match self {
            Self::Literal(_) | Self::StackValue(_) | Self::Local(_) => false,
            Self::Arithmetic { op, lhs, rhs, ty } => {
                (op.is_division() && ty.is_integral() && check.might_catch(faults::ARITHMETIC))
                    || lhs.can_throw(check)
                    || rhs.can_throw(check)
            }
            Self::Conditional(condition) => condition.can_throw(check),
            Self::NewObject(_) => check.might_catch(faults::OUT_OF_MEMORY),
            Self::MemberInvocation { .. }
            | Self::StaticInvocation { .. }
            | Self::ConstructorInvocation { .. } => check.might_catch_any(),
        }
    }

    /// Binding strength of the outermost operator.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Arithmetic { op, .. } => op.precedence(),
            Self::Conditional(condition) => condition.precedence(),
            _ => precedence::ATOM,
        }
    }

    /// Appends every stack value read by this expression, in evaluation order.
    pub fn collect_used_values(&self, used: &mut Vec<StackValueId>) {
        match self {
            Self::Literal(_) | Self::Local(_) | Self::NewObject(_) => {}
            Self::StackValue(value) => used.push(value.id),
            Self::Arithmetic { lhs, rhs, .. } => {
                lhs.collect_used_values(used);
                rhs.collect_used_values(used);
            }
            Self::Conditional(condition) => condition.collect_used_values(used),
            Self::MemberInvocation { object, args, .. } => {
                object.collect_used_values(used);
                for arg in args {
                    arg.collect_used_values(used);
                }
            }
            Self::StaticInvocation { args, .. } | Self::ConstructorInvocation { args, .. } => {
                for arg in args {
                    arg.collect_used_values(used);
                }
            }
        }
    }

    /// Replaces reads of single-use stack values with their definitions.
    ///
    /// Sub-expressions are rewritten first, in evaluation order. Nodes that do
    /// not change are left untouched, so running this again on a rewritten
    /// tree is a no-op.
    ///
    /// # Returns
    ///
    /// `true` if anything in the tree was replaced.
    pub fn replace_single_usage_values(&mut self, rewriter: &mut dyn ValueRewriter) -> bool {
        self.replace_values(rewriter, false)
    }

    /// Inlining worker. `guarded` is set below the right operand of `&&`/`||`,
    /// where only simple definitions may land since the operand is evaluated
    /// conditionally.
    pub(crate) fn replace_values(&mut self, rewriter: &mut dyn ValueRewriter, guarded: bool) -> bool {
        let changed = match self {
            Self::Literal(_) | Self::Local(_) | Self::NewObject(_) => false,
            Self::StackValue(value) => {
                let id = value.id;
                let allowed = rewriter
                    .peek(id)
                    .is_some_and(|definition| !guarded || definition.is_simple());
                if !allowed {
                    return false;
                }
                return match rewriter.take(id) {
                    Some(definition) => {
                        *self = definition;
                        true
                    }
                    None => false,
                };
            }
            Self::Arithmetic { lhs, rhs, .. } => {
                let left = lhs.replace_values(rewriter, guarded);
                let right = rhs.replace_values(rewriter, guarded);
                left || right
            }
            Self::Conditional(condition) => condition.replace_values(rewriter, guarded),
            Self::MemberInvocation { object, args, .. } => {
                let mut changed = object.replace_values(rewriter, guarded);
                for arg in args {
                    changed |= arg.replace_values(rewriter, guarded);
                }
                changed
            }
            Self::StaticInvocation { args, .. } | Self::ConstructorInvocation { args, .. } => {
                let mut changed = false;
                for arg in args {
                    changed |= arg.replace_values(rewriter, guarded);
                }
                changed
            }
        };
        rewriter.evaluated(self);
        changed
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    f.write_str("(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::StackValue(value) => write!(f, "{value}"),
            Self::Local(local) => write!(f, "{local}"),
            Self::Arithmetic { op, lhs, rhs, .. } => {
                let prec = op.precedence();
                write_operand(f, lhs.as_ref(), lhs.precedence() < prec)?;
                write!(f, " {op} ")?;
                write_operand(f, rhs.as_ref(), rhs.precedence() <= prec)
            }
            Self::Conditional(condition) => write!(f, "{condition}"),
            Self::NewObject(ty) => write!(f, "new {ty}"),
            Self::MemberInvocation {
                object,
                method,
                args,
            } => {
                write_operand(f, object.as_ref(), object.precedence() < precedence::ATOM)?;
                write!(f, ".{}", method.name)?;
                write_args(f, args)
            }
            Self::StaticInvocation { method, args } => {
                write!(f, "{}.{}", method.owner, method.name)?;
                write_args(f, args)
            }
            Self::ConstructorInvocation { ty, args, .. } => {
                write!(f, "new {ty}")?;
                write_args(f, args)
            }
        }
    }
}
