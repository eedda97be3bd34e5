//! A tiny interpreter over boolean conditions and jump graphs.

use crate::analysis::{
    BoolOp, CompOp, ConditionalExpression, ContainerId, Expression, MethodBody, Statement,
};

fn lookup(env: &[(&str, bool)], name: &str) -> bool {
    env.iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .unwrap_or_else(|| panic!("unbound variable {name}"))
}

fn evaluate_value(expression: &Expression, env: &[(&str, bool)]) -> i64 {
    match expression {
        Expression::Literal(literal) => literal
            .as_i64()
            .unwrap_or_else(|| panic!("not an integer: {literal}")),
        Expression::Local(local) => i64::from(lookup(env, &local.name)),
        Expression::Conditional(condition) => i64::from(evaluate_condition(condition, env)),
        other => panic!("cannot evaluate {other}"),
    }
}

/// Evaluates `condition` with boolean locals bound by `env`.
pub fn evaluate_condition(condition: &ConditionalExpression, env: &[(&str, bool)]) -> bool {
    match condition {
        ConditionalExpression::Constant(value) => *value,
        ConditionalExpression::Not(inner) => !evaluate_condition(inner, env),
        ConditionalExpression::Boolean { op, lhs, rhs } => match op {
            BoolOp::And => evaluate_condition(lhs, env) && evaluate_condition(rhs, env),
            BoolOp::Or => evaluate_condition(lhs, env) || evaluate_condition(rhs, env),
        },
        ConditionalExpression::Value(value) => evaluate_value(value, env) != 0,
        ConditionalExpression::Comparison { op, lhs, rhs } => {
            let (lhs, rhs) = (evaluate_value(lhs, env), evaluate_value(rhs, env));
            match op {
                CompOp::Eq => lhs == rhs,
                CompOp::Ne => lhs != rhs,
                CompOp::Lt => lhs < rhs,
                CompOp::Le => lhs <= rhs,
                CompOp::Gt => lhs > rhs,
                CompOp::Ge => lhs >= rhs,
            }
        }
    }
}

/// Runs `body` from its first container and returns the integer it returns.
///
/// Conditionals follow their taken successor when the condition holds and
/// their fall-through otherwise; every other statement follows its first
/// successor. Returns `None` for `return;`, a dead end, or a walk that does
/// not terminate.
pub fn evaluate(body: &MethodBody, env: &[(&str, bool)]) -> Option<i64> {
    let mut id = ContainerId::new(0);

    for _ in 0..=body.len() * 4 {
        let container = body.container(id).ok()?;
        let next = match container.statement() {
            Statement::ReturnValue(Expression::Literal(literal)) => return literal.as_i64(),
            Statement::ReturnValue(_) | Statement::ReturnVoid => return None,
            Statement::If(stmt) => {
                let offset = usize::from(evaluate_condition(stmt.condition(), env));
                container.targets().get(offset)
            }
            _ => container.targets().first(),
        };
        id = *next?;
    }

    None
}
