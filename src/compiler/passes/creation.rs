//! Construction condensation.
//!
//! Object construction compiles to an allocation followed, some statements
//! later, by a call to the initializer on the allocated reference:
//!
//! ```text
//! v3 = new StringBuilder;
//! v3.<init>(v1);
//! ```
//!
//! When a stack value is allocated exactly once and initialized exactly once,
//! the pair is fused into a single constructor invocation at the position of
//! the initializer call:
//!
//! ```text
//! // nop
//! v3 = new StringBuilder(v1);
//! ```
//!
//! Values seen allocated or initialized more than once are ambiguous and are
//! left alone.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    analysis::{
        ContainerId, Expression, LValue, MethodBody, MethodRef, StackValue, StackValueId,
        Statement, TypeRef,
    },
    compiler::{
        context::{AnalysisContext, MethodId},
        events::EventKind,
        pass::CondensePass,
    },
    Result,
};

/// What was recorded for one stack value.
#[derive(Debug, Clone)]
enum Slot<T> {
    Unique(T, ContainerId),
    Ambiguous,
}

/// Records a sighting; a second sighting of the same key is ambiguous for good.
fn mark<T>(slots: &mut BTreeMap<StackValueId, Slot<T>>, key: StackValueId, value: T, container: ContainerId) {
    match slots.entry(key) {
        Entry::Occupied(mut entry) => {
            entry.insert(Slot::Ambiguous);
        }
        Entry::Vacant(entry) => {
            entry.insert(Slot::Unique(value, container));
        }
    }
}

#[derive(Debug, Clone)]
struct Creation {
    value: StackValue,
    ty: TypeRef,
}

#[derive(Debug, Clone)]
struct Construction {
    method: MethodRef,
    args: Vec<Expression>,
}

/// Pairs allocations with initializer calls.
///
/// Feed every statement of a body through [`collect_creation`] and
/// [`collect_construction`] (or call [`collect`] once), then apply the
/// unambiguous pairs with [`condense_constructions`].
///
/// [`collect_creation`]: CreationCollector::collect_creation
/// [`collect_construction`]: CreationCollector::collect_construction
/// [`collect`]: CreationCollector::collect
/// [`condense_constructions`]: CreationCollector::condense_constructions
#[derive(Debug, Default)]
pub struct CreationCollector {
    creations: BTreeMap<StackValueId, Slot<Creation>>,
    constructions: BTreeMap<StackValueId, Slot<Construction>>,
}

impl CreationCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `lvalue = rvalue` at `container` if it allocates into a stack value.
    pub fn collect_creation(&mut self, lvalue: &LValue, rvalue: &Expression, container: ContainerId) {
        if let (LValue::StackValue(value), Expression::NewObject(ty)) = (lvalue, rvalue) {
            let creation = Creation {
                value: value.clone(),
                ty: ty.clone(),
            };
            mark(&mut self.creations, value.id, creation, container);
        }
    }

    /// Records `expression` at `container` if it initializes a stack value.
    pub fn collect_construction(&mut self, expression: &Expression, container: ContainerId) {
        let Expression::MemberInvocation {
            object,
            method,
            args,
        } = expression
        else {
            return;
        };
        let Some(receiver) = object.as_stack_value() else {
            return;
        };
        if !method.is_initializer() {
            return;
        }
        let construction = Construction {
            method: method.clone(),
            args: args.clone(),
        };
        mark(&mut self.constructions, receiver.id, construction, container);
    }

    /// Feeds every statement of `body` to the collector.
    pub fn collect(&mut self, body: &MethodBody) {
        for container in body.iter() {
            match container.statement() {
                Statement::Assignment { lvalue, rvalue } => {
                    self.collect_creation(lvalue, rvalue, container.id());
                }
                Statement::Expression(expression) => {
                    self.collect_construction(expression, container.id());
                }
                _ => {}
            }
        }
    }

    /// Values that were allocated or initialized more than once.
    #[must_use]
    pub fn ambiguous(&self) -> Vec<StackValueId> {
        let creations = self
            .creations
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ambiguous))
            .map(|(id, _)| *id);
        let constructions = self
            .constructions
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ambiguous))
            .map(|(id, _)| *id);

        let mut ids: Vec<_> = creations.chain(constructions).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Fuses every unambiguous allocation/initializer pair.
    ///
    /// The initializer call is replaced by an assignment of the constructor
    /// invocation, the allocation is erased, and the value's use count drops by
    /// the use the initializer call consumed. Pairs whose initializer does not
    /// follow the allocation are skipped.
    ///
    /// # Returns
    ///
    /// The condensed values with the container now holding the construction,
    /// in value order.
    ///
    /// # Errors
    ///
    /// Returns an error if a recorded container is not part of `body`.
    pub fn condense_constructions(
        self,
        body: &mut MethodBody,
    ) -> Result<Vec<(StackValueId, ContainerId)>> {
        let mut condensed = Vec::new();

        for (id, slot) in self.constructions {
            let Slot::Unique(construction, construct_at) = slot else {
                continue;
            };
            let Some(Slot::Unique(creation, create_at)) = self.creations.get(&id) else {
                continue;
            };
            if create_at.index() >= construct_at.index() {
                continue;
            }

            let rvalue = Expression::ConstructorInvocation {
                ty: creation.ty.clone(),
                method: construction.method,
                args: construction.args,
            };
            body.replace_statement(
                construct_at,
                Statement::assignment(LValue::StackValue(creation.value.clone()), rvalue),
            )?;
            body.nop_out(*create_at)?;
            body.usages_mut().decrement(id);
            condensed.push((id, construct_at));
        }

        Ok(condensed)
    }
}

/// Fuses allocations with their initializer calls.
#[derive(Debug, Default)]
pub struct ConstructionCondensationPass;

impl ConstructionCondensationPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CondensePass for ConstructionCondensationPass {
    fn name(&self) -> &'static str {
        "construction"
    }

    fn description(&self) -> &'static str {
        "Fuses object allocations with their initializer calls"
    }

    fn should_run(&self, body: &MethodBody, _ctx: &AnalysisContext) -> bool {
        body.iter().any(|container| {
            matches!(
                container.statement(),
                Statement::Assignment {
                    rvalue: Expression::NewObject(_),
                    ..
                }
            )
        })
    }

    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<bool> {
        let mut collector = CreationCollector::new();
        collector.collect(body);

        // Ambiguous values have no single container, so they are named in the
        // message and reported once per method.
        for id in collector.ambiguous() {
            let message = format!("{id} allocated or initialized more than once");
            let reported = ctx.events.filter_method(method).any(|event| {
                event.kind == EventKind::ConstructionAmbiguous && event.message == message
            });
            if reported {
                continue;
            }
            log::debug!("{}: construction of {} is ambiguous", body.name(), id);
            ctx.events
                .record(EventKind::ConstructionAmbiguous)
                .method(method)
                .pass(self.name())
                .message(message);
        }

        let condensed = collector.condense_constructions(body)?;
        for (id, container) in &condensed {
            log::debug!("{}: condensed construction of {} at {}", body.name(), id, container);
            ctx.events
                .record(EventKind::ConstructionCondensed)
                .at(method, container.index())
                .pass(self.name())
                .message(id.to_string());
        }

        Ok(!condensed.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{Literal, ValueType},
        test::BodyBuilder,
    };

    fn point() -> TypeRef {
        TypeRef::new("pkg.Point")
    }

    fn init(value: &StackValue, args: Vec<Expression>) -> Statement {
        Statement::Expression(Expression::MemberInvocation {
            object: Box::new(Expression::stack(value.clone())),
            method: MethodRef::initializer(point()),
            args,
        })
    }

    #[test]
    fn test_condense_single_construction() -> Result<()> {
        // v0 = new Point; v0.<init>(1, 2); return v0;
        let mut b = BodyBuilder::new("construct");
        let v0 = b.value(ValueType::Reference(point()));
        let create = b.assign(&v0, Expression::NewObject(point()));
        let construct = b.push(init(
            &v0,
            vec![Expression::literal(Literal::Int(1)), Expression::literal(Literal::Int(2))],
        ));
        b.push(Statement::ReturnValue(Expression::stack(v0.clone())));
        let mut body = b.build()?;
        body.recount_usages();
        assert_eq!(body.usages().uses(v0.id), 2);

        let mut collector = CreationCollector::new();
        collector.collect(&body);
        assert!(collector.ambiguous().is_empty());
        let condensed = collector.condense_constructions(&mut body)?;

        assert_eq!(condensed, vec![(v0.id, construct)]);
        assert!(body.statement(create)?.is_nop());
        assert_eq!(body.container(construct)?.to_string(), "lbl1: v0 = new Point(1, 2);");
        assert_eq!(body.usages().uses(v0.id), 1);
        Ok(())
    }

    #[test]
    fn test_double_allocation_is_ambiguous() -> Result<()> {
        let mut b = BodyBuilder::new("twice");
        let v0 = b.value(ValueType::Reference(point()));
        b.assign(&v0, Expression::NewObject(point()));
        b.assign(&v0, Expression::NewObject(point()));
        b.push(init(&v0, Vec::new()));
        b.push(Statement::ReturnVoid);
        let mut body = b.build()?;
        let original = body.clone();

        let ctx = AnalysisContext::new();
        let pass = ConstructionCondensationPass::new();
        assert!(pass.should_run(&body, &ctx));
        assert!(!pass.run_on_method(&mut body, MethodId::new(0), &ctx)?);
        assert_eq!(body, original);
        assert_eq!(ctx.events.count_kind(EventKind::ConstructionAmbiguous), 1);
        let event = ctx.events.iter().find(|e| e.kind == EventKind::ConstructionAmbiguous);
        assert!(event.is_some_and(|e| e.location.is_none() && e.message.starts_with("v0 ")));

        // Reported once per value, however often the pass runs.
        assert!(!pass.run_on_method(&mut body, MethodId::new(0), &ctx)?);
        assert_eq!(ctx.events.count_kind(EventKind::ConstructionAmbiguous), 1);
        Ok(())
    }

    #[test]
    fn test_double_initialization_is_ambiguous() -> Result<()> {
        let mut b = BodyBuilder::new("reinit");
        let v0 = b.value(ValueType::Reference(point()));
        b.assign(&v0, Expression::NewObject(point()));
        b.push(init(&v0, Vec::new()));
        b.push(init(&v0, Vec::new()));
        let body = b.build()?;

        let mut collector = CreationCollector::new();
        collector.collect(&body);
        assert_eq!(collector.ambiguous(), vec![v0.id]);
        Ok(())
    }

    #[test]
    fn test_ignores_non_initializer_calls() -> Result<()> {
        let mut b = BodyBuilder::new("plain");
        let v0 = b.value(ValueType::Reference(point()));
        b.assign(&v0, Expression::NewObject(point()));
        b.push(Statement::Expression(Expression::MemberInvocation {
            object: Box::new(Expression::stack(v0.clone())),
            method: MethodRef::new(point(), "reset", ValueType::Void),
            args: Vec::new(),
        }));
        let mut body = b.build()?;
        let original = body.clone();

        let mut collector = CreationCollector::new();
        collector.collect(&body);
        assert!(collector.condense_constructions(&mut body)?.is_empty());
        assert_eq!(body, original);
        Ok(())
    }

    #[test]
    fn test_pass_records_condensation() -> Result<()> {
        let mut b = BodyBuilder::new("pass");
        let v0 = b.value(ValueType::Reference(point()));
        b.assign(&v0, Expression::NewObject(point()));
        b.push(init(&v0, Vec::new()));
        b.push(Statement::ReturnValue(Expression::stack(v0)));
        let mut body = b.build()?;
        body.recount_usages();

        let ctx = AnalysisContext::new();
        let pass = ConstructionCondensationPass::new();
        assert!(pass.run_on_method(&mut body, MethodId::new(1), &ctx)?);
        assert_eq!(ctx.events.count_kind(EventKind::ConstructionCondensed), 1);
        assert!(!pass.should_run(&body, &ctx));
        Ok(())
    }
}
