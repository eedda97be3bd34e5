//! Single-use value inlining.
//!
//! The lifter gives every intermediate stack slot its own [`StackValue`],
//! producing code such as:
//!
//! ```text
//! v0 = a.length();
//! v1 = v0 + 1;
//! if (v1 < n) goto lbl7;
//! ```
//!
//! A value defined once and read exactly once can be substituted into its
//! single reader, and its defining statement erased:
//!
//! ```text
//! if (a.length() + 1 < n) goto lbl7;
//! ```
//!
//! # Ordering
//!
//! Moving a definition to its use must not reorder it against anything it
//! could observe or be observed by. A definition with side effects (or one that
//! can fault into a handler of this method) only moves across erased
//! statements. A simple definition may also move across stack assignments and
//! expression statements, but never across an assignment to a local it could
//! read, a jump, or a join point.
//!
//! The same holds inside the reader: in `return v1 - v0;` the operand `v1` is
//! evaluated first, so once a call has landed in its place a definition of
//! `v0` with side effects stays where it is.
//!
//! Definitions of uninitialized objects (`new T`) are never inlined; they are
//! left for construction condensation.
//!
//! [`StackValue`]: crate::analysis::StackValue

use std::collections::{HashMap, HashSet};

use crate::{
    analysis::{
        ContainerId, ExceptionCheck, Expression, LValue, MethodBody, Statement, StackValueId,
        ValueRewriter,
    },
    compiler::{
        context::{AnalysisContext, MethodId},
        events::EventKind,
        pass::CondensePass,
    },
    Result,
};

/// A pending definition of a single-use stack value.
struct Definition {
    expression: Expression,
    container: ContainerId,
}

/// Hands out the definitions that may land at one use site.
///
/// The site is walked in evaluation order. Once anything with side effects
/// has been evaluated there, only simple definitions may land.
struct SiteRewriter<'a> {
    definitions: &'a mut HashMap<StackValueId, Definition>,
    movable: HashSet<StackValueId>,
    taken: Vec<(StackValueId, ContainerId)>,
    effects_seen: bool,
}

impl ValueRewriter for SiteRewriter<'_> {
    fn peek(&self, value: StackValueId) -> Option<&Expression> {
        if !self.movable.contains(&value) {
            return None;
        }
        self.definitions
            .get(&value)
            .map(|definition| &definition.expression)
            .filter(|expression| !self.effects_seen || expression.is_simple())
    }

    fn take(&mut self, value: StackValueId) -> Option<Expression> {
        if self.peek(value).is_none() {
            return None;
        }
        self.movable.remove(&value);
        let definition = self.definitions.remove(&value)?;
        self.effects_seen |= !definition.expression.is_simple();
        self.taken.push((value, definition.container));
        Some(definition.expression)
    }

    fn evaluated(&mut self, expression: &Expression) {
        self.effects_seen |= !expression.is_simple();
    }
}

/// Inlines stack values that are defined once and used once.
#[derive(Debug, Default)]
pub struct InliningPass;

impl InliningPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CondensePass for InliningPass {
    fn name(&self) -> &'static str {
        "inlining"
    }

    fn description(&self) -> &'static str {
        "Substitutes single-use stack values into their reader"
    }

    fn should_run(&self, body: &MethodBody, _ctx: &AnalysisContext) -> bool {
        !body.usages().is_empty()
    }

    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<bool> {
        let check = body.exception_check().clone();
        let joins = join_points(body);
        let mut definitions: HashMap<StackValueId, Definition> = HashMap::new();
        let mut changed = false;
        let ids: Vec<_> = body.ids().collect();

        for site in ids {
            let mut used = Vec::new();
            body.statement(site)?.collect_used_values(&mut used);

            let mut movable = HashSet::new();
            for value in used {
                if body.usages().uses(value) != 1 {
                    continue;
                }
                let Some(definition) = definitions.get(&value) else {
                    continue;
                };
                if can_move(body, &joins, &check, definition, site)? {
                    movable.insert(value);
                }
            }

            if !movable.is_empty() {
                let mut rewriter = SiteRewriter {
                    definitions: &mut definitions,
                    movable,
                    taken: Vec::new(),
                    effects_seen: false,
                };
                body.statement_mut(site)?
                    .replace_single_usage_values(&mut rewriter);

                for (value, container) in rewriter.taken {
                    body.nop_out(container)?;
                    body.usages_mut().set_uses(value, 0);
                    log::debug!("{}: inlined {} from {} into {}", body.name(), value, container, site);
                    ctx.events
                        .record(EventKind::ValueInlined)
                        .at(method, site.index())
                        .pass(self.name())
                        .message(format!("{value} from {container}"));
                    ctx.events
                        .record(EventKind::StatementErased)
                        .at(method, container.index())
                        .pass(self.name());
                    changed = true;
                }
            }

            if let Statement::Assignment {
                lvalue: LValue::StackValue(value),
                rvalue,
            } = body.statement(site)?
            {
                if body.usages().uses(value.id) == 1 && !matches!(rvalue, Expression::NewObject(_)) {
                    definitions.insert(
                        value.id,
                        Definition {
                            expression: rvalue.clone(),
                            container: site,
                        },
                    );
                }
            }
        }

        Ok(changed)
    }
}

/// Marks every container that is entered other than by falling through from
/// the container before it.
fn join_points(body: &MethodBody) -> Vec<bool> {
    let mut incoming: Vec<Vec<ContainerId>> = vec![Vec::new(); body.len()];
    for container in body.iter() {
        for target in container.targets() {
            if let Some(sources) = incoming.get_mut(target.index()) {
                if !sources.contains(&container.id()) {
                    sources.push(container.id());
                }
            }
        }
    }

    incoming
        .iter()
        .enumerate()
        .map(|(index, sources)| match sources.as_slice() {
            [single] => single.index() + 1 != index,
            _ => true,
        })
        .collect()
}

/// Checks whether `definition` can be moved down to `site`.
fn can_move(
    body: &MethodBody,
    joins: &[bool],
    check: &ExceptionCheck,
    definition: &Definition,
    site: ContainerId,
) -> Result<bool> {
    let start = definition.container.index() + 1;
    if start > site.index() {
        return Ok(false);
    }
    let simple = definition.expression.is_simple() && !definition.expression.can_throw(check);

    for index in start..=site.index() {
        if joins.get(index).copied().unwrap_or(true) {
            return Ok(false);
        }
        if index == site.index() {
            break;
        }
        let crossable = match body.statement(ContainerId::new(index))? {
            Statement::Nop => true,
            Statement::Assignment {
                lvalue: LValue::StackValue(_),
                ..
            }
            | Statement::Expression(_) => simple,
            _ => false,
        };
        if !crossable {
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{
            ArithOp, CompOp, ConditionalExpression, Literal, LocalVariable, MethodRef, TypeRef,
            ValueType,
        },
        test::BodyBuilder,
    };

    fn call(name: &str, returns: ValueType) -> Expression {
        Expression::StaticInvocation {
            method: MethodRef::new(TypeRef::new("pkg.Util"), name, returns),
            args: Vec::new(),
        }
    }

    fn run(body: &mut MethodBody) -> Result<bool> {
        body.recount_usages();
        InliningPass::new().run_on_method(body, MethodId::new(0), &AnalysisContext::new())
    }

    #[test]
    fn test_inline_chain() -> Result<()> {
        // v0 = f(); v1 = v0 + 1; return v1;
        let mut b = BodyBuilder::new("chain");
        let v0 = b.value(ValueType::Int);
        let v1 = b.value(ValueType::Int);
        let def0 = b.assign(&v0, call("f", ValueType::Int));
        let def1 = b.assign(
            &v1,
            Expression::arithmetic(
                ArithOp::Add,
                Expression::stack(v0.clone()),
                Expression::literal(Literal::Int(1)),
                ValueType::Int,
            ),
        );
        let ret = b.push(Statement::ReturnValue(Expression::stack(v1.clone())));
        let mut body = b.build()?;

        assert!(run(&mut body)?);
        assert!(body.statement(def0)?.is_nop());
        assert!(body.statement(def1)?.is_nop());
        assert_eq!(body.container(ret)?.to_string(), "lbl2: return Util.f() + 1;");
        assert_eq!(body.usages().uses(v0.id), 0);
        assert_eq!(body.usages().uses(v1.id), 0);

        assert!(!run(&mut body)?);
        Ok(())
    }

    #[test]
    fn test_multi_use_value_kept() -> Result<()> {
        let mut b = BodyBuilder::new("twice");
        let v0 = b.value(ValueType::Int);
        let def = b.assign(&v0, call("f", ValueType::Int));
        b.push(Statement::ReturnValue(Expression::arithmetic(
            ArithOp::Mul,
            Expression::stack(v0.clone()),
            Expression::stack(v0.clone()),
            ValueType::Int,
        )));
        let mut body = b.build()?;
        let original = body.clone();

        assert!(!run(&mut body)?);
        assert!(!body.statement(def)?.is_nop());
        assert_eq!(body.usages().uses(v0.id), 2);
        assert_eq!(body.dump(), original.dump());
        Ok(())
    }

    #[test]
    fn test_side_effect_not_moved_past_statement() -> Result<()> {
        // v0 = f(); g(); return v0;
        let mut b = BodyBuilder::new("effects");
        let v0 = b.value(ValueType::Int);
        let def = b.assign(&v0, call("f", ValueType::Int));
        b.push(Statement::Expression(call("g", ValueType::Void)));
        b.push(Statement::ReturnValue(Expression::stack(v0.clone())));
        let mut body = b.build()?;

        assert!(!run(&mut body)?);
        assert!(!body.statement(def)?.is_nop());
        Ok(())
    }

    #[test]
    fn test_simple_value_moved_past_call() -> Result<()> {
        // v0 = 7; g(); return v0;
        let mut b = BodyBuilder::new("simple");
        let v0 = b.value(ValueType::Int);
        let def = b.assign(&v0, Expression::literal(Literal::Int(7)));
        b.push(Statement::Expression(call("g", ValueType::Void)));
        let ret = b.push(Statement::ReturnValue(Expression::stack(v0.clone())));
        let mut body = b.build()?;

        assert!(run(&mut body)?);
        assert!(body.statement(def)?.is_nop());
        assert_eq!(body.container(ret)?.to_string(), "lbl2: return 7;");
        Ok(())
    }

    #[test]
    fn test_side_effects_keep_evaluation_order() -> Result<()> {
        // v0 = f(); v1 = g(); return v1 - v0;
        let mut b = BodyBuilder::new("order");
        let v0 = b.value(ValueType::Int);
        let v1 = b.value(ValueType::Int);
        let def0 = b.assign(&v0, call("f", ValueType::Int));
        let def1 = b.assign(&v1, call("g", ValueType::Int));
        let ret = b.push(Statement::ReturnValue(Expression::arithmetic(
            ArithOp::Sub,
            Expression::stack(v1.clone()),
            Expression::stack(v0.clone()),
            ValueType::Int,
        )));
        let mut body = b.build()?;

        assert!(run(&mut body)?);
        assert!(!body.statement(def0)?.is_nop());
        assert!(body.statement(def1)?.is_nop());
        assert_eq!(body.container(ret)?.to_string(), "lbl2: return Util.g() - v0;");

        assert!(!run(&mut body)?);
        assert_eq!(body.usages().uses(v0.id), 1);
        Ok(())
    }

    #[test]
    fn test_side_effect_not_moved_after_call_in_site() -> Result<()> {
        // v0 = f(); return g() + v0;
        let mut b = BodyBuilder::new("inner");
        let v0 = b.value(ValueType::Int);
        let def = b.assign(&v0, call("f", ValueType::Int));
        b.push(Statement::ReturnValue(Expression::arithmetic(
            ArithOp::Add,
            call("g", ValueType::Int),
            Expression::stack(v0),
            ValueType::Int,
        )));
        let mut body = b.build()?;

        assert!(!run(&mut body)?);
        assert!(!body.statement(def)?.is_nop());
        Ok(())
    }

    #[test]
    fn test_simple_value_lands_after_call_in_site() -> Result<()> {
        // v0 = 2; return g() + v0;
        let mut b = BodyBuilder::new("inner_simple");
        let v0 = b.value(ValueType::Int);
        b.assign(&v0, Expression::literal(Literal::Int(2)));
        let ret = b.push(Statement::ReturnValue(Expression::arithmetic(
            ArithOp::Add,
            call("g", ValueType::Int),
            Expression::stack(v0),
            ValueType::Int,
        )));
        let mut body = b.build()?;

        assert!(run(&mut body)?);
        assert_eq!(body.container(ret)?.to_string(), "lbl1: return Util.g() + 2;");
        Ok(())
    }

    #[test]
    fn test_local_read_not_moved_past_store() -> Result<()> {
        // v0 = x; x = 1; return v0;
        let x = LocalVariable::new(1, "x", ValueType::Int);
        let mut b = BodyBuilder::new("postfix");
        let v0 = b.value(ValueType::Int);
        b.assign(&v0, Expression::local(x.clone()));
        b.push(Statement::assignment(
            LValue::Local(x),
            Expression::literal(Literal::Int(1)),
        ));
        b.push(Statement::ReturnValue(Expression::stack(v0)));
        let mut body = b.build()?;

        assert!(!run(&mut body)?);
        Ok(())
    }

    #[test]
    fn test_not_moved_across_join() -> Result<()> {
        // v0 = f(); lbl1: return v0; with a jump landing on lbl1
        let mut b = BodyBuilder::new("join");
        let v0 = b.value(ValueType::Int);
        b.assign(&v0, call("f", ValueType::Int));
        let ret = b.push(Statement::ReturnValue(Expression::stack(v0)));
        let jump = b.push(Statement::goto());
        let mut body = b.build()?;
        body.set_targets(jump, vec![ret])?;

        assert!(!run(&mut body)?);
        Ok(())
    }

    #[test]
    fn test_condition_keeps_non_boolean_value() -> Result<()> {
        // v0 = f(); if (v0) goto lbl3; with v0 an int
        let mut b = BodyBuilder::new("typed");
        let v0 = b.value(ValueType::Int);
        let def = b.assign(&v0, call("f", ValueType::Int));
        let test = b.if_jump(ConditionalExpression::Value(Expression::stack(v0.clone())));
        b.ret_int(0);
        let taken = b.ret_int(1);
        b.branch(test, taken)?;
        let mut body = b.build()?;

        assert!(!run(&mut body)?);
        assert!(!body.statement(def)?.is_nop());
        assert_eq!(body.usages().uses(v0.id), 1);
        Ok(())
    }

    #[test]
    fn test_condition_takes_boolean_value() -> Result<()> {
        // v0 = f() < 3; if (v0) goto lbl3;
        let mut b = BodyBuilder::new("bool");
        let v0 = b.value(ValueType::Boolean);
        b.assign(
            &v0,
            Expression::conditional(ConditionalExpression::comparison(
                CompOp::Lt,
                call("f", ValueType::Int),
                Expression::literal(Literal::Int(3)),
            )),
        );
        let test = b.if_jump(ConditionalExpression::Value(Expression::stack(v0)));
        b.ret_int(0);
        let taken = b.ret_int(1);
        b.branch(test, taken)?;
        let mut body = b.build()?;

        assert!(run(&mut body)?);
        let condition = body
            .statement(test)?
            .as_if()
            .map(|stmt| stmt.condition().clone().simplify().to_string());
        assert_eq!(condition.as_deref(), Some("Util.f() < 3"));
        Ok(())
    }

    #[test]
    fn test_allocation_left_for_construction() -> Result<()> {
        let ty = TypeRef::new("pkg.Point");
        let mut b = BodyBuilder::new("alloc");
        let v0 = b.value(ValueType::Reference(ty.clone()));
        b.assign(&v0, Expression::NewObject(ty.clone()));
        b.push(Statement::Expression(Expression::MemberInvocation {
            object: Box::new(Expression::stack(v0)),
            method: MethodRef::initializer(ty),
            args: Vec::new(),
        }));
        b.push(Statement::ReturnVoid);
        let mut body = b.build()?;

        assert!(!run(&mut body)?);
        Ok(())
    }

    #[test]
    fn test_events_recorded() -> Result<()> {
        let mut b = BodyBuilder::new("events");
        let v0 = b.value(ValueType::Int);
        b.assign(&v0, call("f", ValueType::Int));
        b.push(Statement::ReturnValue(Expression::stack(v0)));
        let mut body = b.build()?;
        body.recount_usages();

        let ctx = AnalysisContext::new();
        assert!(InliningPass::new().run_on_method(&mut body, MethodId::new(3), &ctx)?);
        assert_eq!(ctx.events.count_kind(EventKind::ValueInlined), 1);
        assert_eq!(ctx.events.count_kind(EventKind::StatementErased), 1);
        assert_eq!(ctx.events.filter_method(MethodId::new(3)).count(), 2);
        Ok(())
    }
}
