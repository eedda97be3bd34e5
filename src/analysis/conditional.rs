//! Boolean conditions.
//!
//! A [`ConditionalExpression`] is what an `if` tests. Keeping conditions in
//! their own type (rather than as boolean-typed [`Expression`]s) gives the
//! condensation passes a guarantee they rely on: whatever is done to a
//! condition, including inlining stack values into it, the result is still a
//! condition.
//!
//! # Simplification
//!
//! [`ConditionalExpression::simplify`] is the normalizer run after every fold.
//! It removes double negations, pushes negation into comparisons and folds
//! trivially constant `&&`/`||` operands, so that later folds keep matching on
//! structurally minimal conditions.

use std::fmt;

use strum::Display;

use crate::analysis::{
    exception::ExceptionCheck,
    expression::{precedence, write_operand, Expression, ValueRewriter},
    literal::Literal,
    value::StackValueId,
};

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CompOp {
    /// Equal.
    #[strum(serialize = "==")]
    Eq,
    /// Not equal.
    #[strum(serialize = "!=")]
    Ne,
    /// Less than.
    #[strum(serialize = "<")]
    Lt,
    /// Less than or equal.
    #[strum(serialize = "<=")]
    Le,
    /// Greater than.
    #[strum(serialize = ">")]
    Gt,
    /// Greater than or equal.
    #[strum(serialize = ">=")]
    Ge,
}

impl CompOp {
    /// The operator testing the opposite outcome.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    /// Binding strength of this operator.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Eq | Self::Ne => precedence::EQUALITY,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => precedence::RELATIONAL,
        }
    }
}

/// Short-circuit boolean operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BoolOp {
    /// `&&`
    #[strum(serialize = "&&")]
    And,
    /// `||`
    #[strum(serialize = "||")]
    Or,
}

impl BoolOp {
    /// Binding strength of this operator.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::And => precedence::LOGICAL_AND,
            Self::Or => precedence::LOGICAL_OR,
        }
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalExpression {
    /// `lhs op rhs`
    Comparison {
        /// The operator.
        op: CompOp,
        /// Left operand.
        lhs: Expression,
        /// Right operand.
        rhs: Expression,
    },

    /// `lhs && rhs` or `lhs || rhs`; `rhs` is only evaluated when needed.
    Boolean {
        /// The operator.
        op: BoolOp,
        /// Left operand, always evaluated.
        lhs: Box<ConditionalExpression>,
        /// Right operand, conditionally evaluated.
        rhs: Box<ConditionalExpression>,
    },

    /// `!inner`
    Not(Box<ConditionalExpression>),

    /// A boolean-typed value tested directly (`if (flag)`).
    Value(Expression),

    /// A constant outcome.
    Constant(bool),
}

impl ConditionalExpression {
    /// Shorthand for a comparison.
    #[must_use]
    pub fn comparison(op: CompOp, lhs: Expression, rhs: Expression) -> Self {
        Self::Comparison { op, lhs, rhs }
    }

    /// Shorthand for `lhs && rhs`.
    #[must_use]
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::Boolean {
            op: BoolOp::And,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Shorthand for `lhs || rhs`.
    #[must_use]
    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::Boolean {
            op: BoolOp::Or,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Wraps `inner` in a negation without simplifying.
    #[must_use]
    pub fn not(inner: Self) -> Self {
        Self::Not(Box::new(inner))
    }

    /// The simplified logical negation of this condition.
    #[must_use]
    pub fn negated(self) -> Self {
        Self::not(self).simplify()
    }

    /// Normalizes the condition bottom-up.
    ///
    /// * `!!c` becomes `c`; `!(a < b)` becomes `a >= b`; `!true` becomes `false`
    /// * `true && c`, `c && true` become `c`; `false && c` becomes `false`
    /// * `false || c`, `c || false` become `c`; `true || c` becomes `true`
    /// * `c && false` and `c || true` fold only when `c` is simple, so that an
    ///   evaluation with side effects is never dropped
    /// * a boolean literal or an embedded condition used as a value is unwrapped
    #[must_use]
    pub fn simplify(self) -> Self {
        match self {
            Self::Not(inner) => match (*inner).simplify() {
                Self::Not(twice) => *twice,
                Self::Constant(value) => Self::Constant(!value),
                Self::Comparison { op, lhs, rhs } => Self::Comparison {
                    op: op.negated(),
                    lhs,
                    rhs,
                },
                other => Self::not(other),
            },
            Self::Boolean { op, lhs, rhs } => {
                let lhs = (*lhs).simplify();
                let rhs = (*rhs).simplify();
                match (op, lhs, rhs) {
                    (BoolOp::And, Self::Constant(true), other)
                    | (BoolOp::And, other, Self::Constant(true))
                    | (BoolOp::Or, Self::Constant(false), other)
                    | (BoolOp::Or, other, Self::Constant(false)) => other,
                    (BoolOp::And, Self::Constant(false), _) => Self::Constant(false),
                    (BoolOp::Or, Self::Constant(true), _) => Self::Constant(true),
                    (BoolOp::And, lhs, Self::Constant(false)) if lhs.is_simple() => {
                        Self::Constant(false)
                    }
                    (BoolOp::Or, lhs, Self::Constant(true)) if lhs.is_simple() => {
                        Self::Constant(true)
                    }
                    (op, lhs, rhs) => Self::Boolean {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                }
            }
            Self::Value(Expression::Conditional(inner)) => (*inner).simplify(),
            Self::Value(Expression::Literal(Literal::Boolean(value))) => Self::Constant(value),
            other => other,
        }
    }

    /// Rewrites integer comparisons of boolean values into direct tests.
    ///
    /// The bytecode has no boolean type: `if (flag)` is emitted as a
    /// comparison of `flag` against `0`. Once types are known, `b != 0` and
    /// `b == 1` become `b`, while `b == 0` and `b != 1` become `!b`.
    #[must_use]
    pub fn optimise_for_types(self) -> Self {
        match self {
            Self::Comparison { op, lhs, rhs } => {
                let lhs_test = boolean_test(op, &lhs, &rhs);
                let rhs_test = boolean_test(op, &rhs, &lhs);
                let (value, positive) = match (lhs_test, rhs_test) {
                    (Some(positive), _) => (lhs, positive),
                    (None, Some(positive)) => (rhs, positive),
                    (None, None) => return Self::Comparison { op, lhs, rhs },
                };
                if positive {
                    Self::Value(value)
                } else {
                    Self::not(Self::Value(value))
                }
            }
            Self::Boolean { op, lhs, rhs } => Self::Boolean {
                op,
                lhs: Box::new((*lhs).optimise_for_types()),
                rhs: Box::new((*rhs).optimise_for_types()),
            },
            Self::Not(inner) => Self::not((*inner).optimise_for_types()),
            other => other,
        }
    }

    /// Returns `true` if the condition can be evaluated more than once or
    /// moved without changing behaviour.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        match self {
            Self::Comparison { lhs, rhs, .. } => lhs.is_simple() && rhs.is_simple(),
            Self::Boolean { lhs, rhs, .. } => lhs.is_simple() && rhs.is_simple(),
            Self::Not(inner) => inner.is_simple(),
            Self::Value(value) => value.is_simple(),
            Self::Constant(_) => true,
        }
    }

    /// Returns `true` if evaluating the condition can raise a fault observed
    /// by `check`.
    #[must_use]
    pub fn can_throw(&self, check: &ExceptionCheck) -> bool {
        match self {
            Self::Comparison { lhs, rhs, .. } => lhs.can_throw(check) || rhs.can_throw(check),
            Self::Boolean { lhs, rhs, .. } => lhs.can_throw(check) || rhs.can_throw(check),
            Self::Not(inner) => inner.can_throw(check),
            Self::Value(value) => value.can_throw(check),
            Self::Constant(_) => false,
        }
    }

    /// Binding strength of the outermost operator.
    #[must_use]
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Comparison { op, .. } => op.precedence(),
            Self::Boolean { op, .. } => op.precedence(),
            Self::Not(_) => precedence::UNARY,
            Self::Value(value) => value.precedence(),
            Self::Constant(_) => precedence::ATOM,
        }
    }

    /// Appends every stack value read by the condition, in evaluation order.
    pub fn collect_used_values(&self, used: &mut Vec<StackValueId>) {
        match self {
            Self::Comparison { lhs, rhs, .. } => {
                lhs.collect_used_values(used);
                rhs.collect_used_values(used);
            }
            Self::Boolean { lhs, rhs, .. } => {
                lhs.collect_used_values(used);
                rhs.collect_used_values(used);
            }
            Self::Not(inner) => inner.collect_used_values(used),
            Self::Value(value) => value.collect_used_values(used),
            Self::Constant(_) => {}
        }
    }

    /// Replaces reads of single-use stack values with their definitions.
    ///
    /// A stack value tested directly as a condition is only replaced by a
    /// definition that is itself boolean: an embedded condition is unwrapped
    /// back into this type, a boolean-typed expression is kept as a value
    /// test, and anything else is left as it is.
    ///
    /// # Returns
    ///
    /// `true` if anything in the condition was replaced.
    pub fn replace_single_usage_values(&mut self, rewriter: &mut dyn ValueRewriter) -> bool {
        self.replace_values(rewriter, false)
    }

    pub(crate) fn replace_values(&mut self, rewriter: &mut dyn ValueRewriter, guarded: bool) -> bool {
        match self {
            Self::Comparison { lhs, rhs, .. } => {
                let left = lhs.replace_values(rewriter, guarded);
                let right = rhs.replace_values(rewriter, guarded);
                left || right
            }
            Self::Boolean { lhs, rhs, .. } => {
                let left = lhs.replace_values(rewriter, guarded);
                let right = rhs.replace_values(rewriter, true);
                left || right
            }
            Self::Not(inner) => inner.replace_values(rewriter, guarded),
            Self::Value(Expression::StackValue(value)) => {
                let id = value.id;
                let allowed = rewriter.peek(id).is_some_and(|definition| {
                    (!guarded || definition.is_simple())
                        && (matches!(definition, Expression::Conditional(_))
                            || definition.value_type().is_boolean())
                });
                if !allowed {
                    return false;
                }
                match rewriter.take(id) {
                    Some(Expression::Conditional(condition)) => {
                        *self = *condition;
                        true
                    }
                    Some(definition) => {
                        *self = Self::Value(definition);
                        true
                    }
                    None => false,
                }
            }
            Self::Value(value) => value.replace_values(rewriter, guarded),
            Self::Constant(_) => false,
        }
    }
}

/// Classifies `value op constant` as a direct boolean test.
///
/// Returns `Some(true)` when the comparison holds exactly when `value` is
/// true, `Some(false)` when it holds exactly when `value` is false, and `None`
/// if `value` is not boolean or `constant` is not `0`/`1`.
fn boolean_test(op: CompOp, value: &Expression, constant: &Expression) -> Option<bool> {
    if !value.value_type().is_boolean() {
        return None;
    }
    let Expression::Literal(literal) = constant else {
        return None;
    };
    match (op, literal.as_i64()?) {
        (CompOp::Ne, 0) | (CompOp::Eq, 1) => Some(true),
        (CompOp::Eq, 0) | (CompOp::Ne, 1) => Some(false),
        _ => None,
    }
}

impl fmt::Display for ConditionalExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison { op, lhs, rhs } => {
                let prec = op.precedence();
                write_operand(f, lhs, lhs.precedence() < prec)?;
                write!(f, " {op} ")?;
                write_operand(f, rhs, rhs.precedence() <= prec)
            }
            Self::Boolean { op, lhs, rhs } => {
                let prec = op.precedence();
                write_operand(f, lhs.as_ref(), lhs.precedence() < prec)?;
                write!(f, " {op} ")?;
                write_operand(f, rhs.as_ref(), rhs.precedence() < prec)
            }
            Self::Not(inner) => {
                f.write_str("!")?;
                write_operand(f, inner.as_ref(), inner.precedence() < precedence::UNARY)
            }
            Self::Value(value) => write!(f, "{value}"),
            Self::Constant(value) => write!(f, "{value}"),
        }
    }
}
