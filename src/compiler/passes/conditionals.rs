//! Conditional condensation and jump classification.
//!
//! Short-circuit boolean operators compile to chains of conditional jumps. This
//! pass folds adjacent conditionals back into a single compound condition:
//!
//! ```text
//! if (c1) goto a;          if (c1) goto a;
//! if (c2) goto b;          if (c2) goto a;
//! a:                       b:
//!     ->                       ->
//! if (!c1 && c2) goto b;   if (c1 || c2) goto a;
//! ```
//!
//! The AND rule is tested first: when both rules would apply (the taken and
//! fall-through successors of the second conditional coincide), AND wins.
//!
//! Classification of the surviving jumps into [`StructuredStatement`] forms is
//! driven by the jump tags assigned upstream, see [`structured_statement`].

use crate::{
    analysis::{
        BlockIdentifier, ConditionalExpression, ContainerId, IfStatement, JumpType, MethodBody,
        Statement, StructuredStatement, WhileStatement,
    },
    compiler::{
        context::{AnalysisContext, MethodId},
        events::EventKind,
        pass::CondensePass,
    },
    Error, Result,
};

/// Folds each conditional with the conditional that follows it.
#[derive(Debug, Default)]
pub struct ConditionalCondensationPass;

impl ConditionalCondensationPass {
    /// Creates the pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl CondensePass for ConditionalCondensationPass {
    fn name(&self) -> &'static str {
        "conditionals"
    }

    fn description(&self) -> &'static str {
        "Folds chains of conditional jumps into compound conditions"
    }

    fn should_run(&self, body: &MethodBody, _ctx: &AnalysisContext) -> bool {
        body.iter()
            .filter(|container| container.statement().is_conditional())
            .nth(1)
            .is_some()
    }

    fn run_on_method(
        &self,
        body: &mut MethodBody,
        method: MethodId,
        ctx: &AnalysisContext,
    ) -> Result<bool> {
        let mut changed = false;
        let ids: Vec<_> = body.ids().collect();

        for id in ids {
            if !body.statement(id)?.is_conditional() {
                continue;
            }
            let Some(survivor) = fold_with_next(body, id)? else {
                continue;
            };

            let condition = body
                .statement(survivor)?
                .as_if()
                .map(|stmt| stmt.condition().to_string())
                .unwrap_or_default();
            log::debug!("{}: folded {} into {}: {}", body.name(), id, survivor, condition);
            ctx.events
                .record(EventKind::ConditionalsFolded)
                .at(method, survivor.index())
                .pass(self.name())
                .message(format!("{id} into {survivor}: {condition}"));
            changed = true;
        }

        Ok(changed)
    }
}

/// Folds the conditional at `prior` into the conditional that follows it.
///
/// # Returns
///
/// `true` if the pair was folded; `prior` is then erased. `false` if the next
/// statement is not a foldable conditional, in which case nothing changed.
///
/// # Errors
///
/// Returns an error if the container graph is inconsistent.
pub fn condense_with_next_conditional(body: &mut MethodBody, prior: ContainerId) -> Result<bool> {
    Ok(fold_with_next(body, prior)?.is_some())
}

/// Folds the conditional at `prior` into the conditional at `current`.
///
/// `current` must be the conditional reached from `prior` by falling through;
/// any other pair is left alone.
///
/// # Errors
///
/// Returns an error if the container graph is inconsistent.
pub fn condense_with_prior_conditional(
    body: &mut MethodBody,
    current: ContainerId,
    prior: ContainerId,
) -> Result<bool> {
    if !body.statement(prior)?.is_conditional() {
        return Ok(false);
    }
    if next_conditional(body, prior)? != Some(current) {
        return Ok(false);
    }
    fold(body, current, prior)
}

fn fold_with_next(body: &mut MethodBody, prior: ContainerId) -> Result<Option<ContainerId>> {
    if !body.statement(prior)?.is_conditional() {
        return Ok(None);
    }
    let Some(current) = next_conditional(body, prior)? else {
        return Ok(None);
    };
    Ok(fold(body, current, prior)?.then_some(current))
}

/// Finds the conditional reached from `prior` by falling through no-ops.
///
/// Every container on the way, the conditional included, must be reachable
/// only from the container before it; otherwise a jump from elsewhere would
/// observe the folded condition.
fn next_conditional(body: &MethodBody, prior: ContainerId) -> Result<Option<ContainerId>> {
    let mut previous = prior;
    let mut id = body.target(prior, IfStatement::JUMP_NOT_TAKEN)?;

    for _ in 0..body.len() {
        if id == prior || body.sources(id) != [previous] {
            return Ok(None);
        }
        let container = body.container(id)?;
        match container.statement() {
            Statement::If(_) => return Ok(Some(id)),
            Statement::Nop => match container.targets().first() {
                Some(&next) => {
                    previous = id;
                    id = next;
                }
                None => return Ok(None),
            },
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Resolves `id` through any chain of no-ops to the first effective container.
fn follow_nops(body: &MethodBody, mut id: ContainerId) -> ContainerId {
    for _ in 0..body.len() {
        match body.container(id) {
            Ok(container) if container.statement().is_nop() => match container.targets().first() {
                Some(&next) => id = next,
                None => break,
            },
            _ => break,
        }
    }
    id
}

fn fold(body: &mut MethodBody, current: ContainerId, prior: ContainerId) -> Result<bool> {
    let (Some(prior_if), Some(current_if)) = (
        body.statement(prior)?.as_if(),
        body.statement(current)?.as_if(),
    ) else {
        return Ok(false);
    };
    let prior_condition = prior_if.condition().clone();
    let current_condition = current_if.condition().clone();

    let prior_taken = follow_nops(body, body.target(prior, IfStatement::JUMP_TAKEN)?);
    let current_fall = follow_nops(body, body.target(current, IfStatement::JUMP_NOT_TAKEN)?);
    let current_taken = follow_nops(body, body.target(current, IfStatement::JUMP_TAKEN)?);

    let combined = if current_fall == prior_taken {
        ConditionalExpression::and(ConditionalExpression::not(prior_condition), current_condition)
    } else if current_taken == prior_taken {
        ConditionalExpression::or(prior_condition, current_condition)
    } else {
        return Ok(false);
    };

    match body.statement_mut(current)?.as_if_mut() {
        Some(stmt) => stmt.set_condition(combined.simplify()),
        None => return Err(confused_error!("{} stopped being a conditional", current)),
    }
    body.nop_out_conditional(prior)?;
    Ok(true)
}

fn if_condition(body: &MethodBody, id: ContainerId) -> Result<&ConditionalExpression> {
    body.statement(id)?
        .as_if()
        .map(IfStatement::condition)
        .ok_or_else(|| confused_error!("{} does not hold a conditional", id))
}

/// Replaces the loop-exit conditional at `id` with a head-tested loop header.
///
/// The conditional jumps out of the loop when its condition holds, so the loop
/// runs while the negated condition holds.
///
/// # Errors
///
/// Returns [`Error::Confused`] if `id` does not hold a conditional.
pub fn replace_with_while_loop_start(
    body: &mut MethodBody,
    id: ContainerId,
    block: BlockIdentifier,
) -> Result<()> {
    let condition = if_condition(body, id)?.clone().negated();
    body.replace_statement(id, Statement::While(WhileStatement::new(Some(condition), block)))?;
    Ok(())
}

/// Replaces the loop-back conditional at `id` with a tail-tested loop header.
///
/// # Errors
///
/// Returns [`Error::Confused`] if `id` does not hold a conditional.
pub fn replace_with_while_loop_end(
    body: &mut MethodBody,
    id: ContainerId,
    block: BlockIdentifier,
) -> Result<()> {
    let condition = if_condition(body, id)?.clone().simplify();
    body.replace_statement(id, Statement::While(WhileStatement::new(Some(condition), block)))?;
    Ok(())
}

/// Classifies the statement at `id` into its structured form.
///
/// Jumps are classified by their jump tag:
///
/// | tag                                     | conditional             | goto              |
/// |-----------------------------------------|-------------------------|-------------------|
/// | `Goto`, `GotoOutOfIf`, `GotoOutOfTry`   | unstructured if         | unstructured goto |
/// | `Continue`                              | if wrapping continue    | continue          |
/// | `Break`                                 | if wrapping break       | break             |
/// | `BreakAnonymous`                        | if wrapping anon. break | anonymous break   |
/// | `EndBlock`                              | error                   | nothing           |
///
/// # Errors
///
/// Returns [`Error::UnexpectedJumpType`] for a conditional tagged `EndBlock`,
/// and [`Error::Confused`] if the jump target does not carry the block
/// information the tag requires.
pub fn structured_statement(body: &MethodBody, id: ContainerId) -> Result<StructuredStatement> {
    match body.statement(id)? {
        Statement::If(stmt) => match stmt.jump_type() {
            JumpType::Goto | JumpType::GotoOutOfIf | JumpType::GotoOutOfTry => {
                let (if_block, else_block) = stmt.blocks();
                Ok(StructuredStatement::UnstructuredIf {
                    condition: stmt.condition().clone(),
                    if_block,
                    else_block,
                })
            }
            JumpType::EndBlock => Err(Error::UnexpectedJumpType {
                jump_type: JumpType::EndBlock,
                container: id,
            }),
            jump_type => {
                let jump = structured_jump(body, id, IfStatement::JUMP_TAKEN, jump_type)?;
                Ok(StructuredStatement::guarded(stmt.condition().clone(), jump))
            }
        },
        Statement::Goto(stmt) => structured_jump(body, id, 0, stmt.jump_type()),
        Statement::While(stmt) => Ok(StructuredStatement::UnstructuredWhile {
            condition: stmt.condition.clone(),
            block: stmt.block,
        }),
        Statement::Nop => Ok(StructuredStatement::Empty),
        other => Ok(StructuredStatement::Simple(other.clone())),
    }
}

/// Classifies every container of `body`, in program order.
///
/// # Errors
///
/// Returns the first classification error, see [`structured_statement`].
pub fn structure_method(body: &MethodBody) -> Result<Vec<StructuredStatement>> {
    body.ids().map(|id| structured_statement(body, id)).collect()
}

fn structured_jump(
    body: &MethodBody,
    id: ContainerId,
    offset: usize,
    jump_type: JumpType,
) -> Result<StructuredStatement> {
    let target = body.target(id, offset)?;
    match jump_type {
        JumpType::Goto | JumpType::GotoOutOfIf | JumpType::GotoOutOfTry => {
            Ok(StructuredStatement::UnstructuredGoto(target))
        }
        JumpType::Continue => body
            .block_started(target)?
            .map(StructuredStatement::UnstructuredContinue)
            .ok_or_else(|| confused_error!("continue at {} targets {}, which starts no block", id, target)),
        JumpType::Break => {
            let ended = body.blocks_ended(target)?;
            if ended.is_empty() {
                return Err(confused_error!("break at {} targets {}, which ends no block", id, target));
            }
            Ok(StructuredStatement::UnstructuredBreak(ended.to_vec()))
        }
        JumpType::BreakAnonymous => match body.statement(target)? {
            Statement::AnonBreakTarget(block) => {
                Ok(StructuredStatement::UnstructuredAnonymousBreak(*block))
            }
            _ => Err(confused_error!("target of anonymous break at {} unexpected", id)),
        },
        JumpType::EndBlock => Ok(StructuredStatement::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis::{BlockType, Expression, GotoStatement, Literal},
        test::{evaluate, flag, BodyBuilder},
    };

    /// `if (c1) goto a; if (c2) goto b; a: return 0; b: return 1;`
    fn and_layout() -> Result<(MethodBody, ContainerId, ContainerId)> {
        let mut b = BodyBuilder::new("and");
        let p = b.if_jump(flag("c1"));
        let s = b.if_jump(flag("c2"));
        let a = b.ret_int(0);
        let t = b.ret_int(1);
        b.branch(p, a)?;
        b.branch(s, t)?;
        Ok((b.build()?, p, s))
    }

    /// `if (c1) goto a; if (c2) goto a; return 0; a: return 1;`
    fn or_layout() -> Result<(MethodBody, ContainerId, ContainerId)> {
        let mut b = BodyBuilder::new("or");
        let p = b.if_jump(flag("c1"));
        let s = b.if_jump(flag("c2"));
        b.ret_int(0);
        let a = b.ret_int(1);
        b.branch(p, a)?;
        b.branch(s, a)?;
        Ok((b.build()?, p, s))
    }

    fn assert_equivalent(before: &MethodBody, after: &MethodBody) {
        for c1 in [false, true] {
            for c2 in [false, true] {
                let env = [("c1", c1), ("c2", c2)];
                assert_eq!(
                    evaluate(before, &env),
                    evaluate(after, &env),
                    "c1={c1} c2={c2}"
                );
            }
        }
    }

    #[test]
    fn test_and_fold() -> Result<()> {
        let (mut body, p, s) = and_layout()?;
        let original = body.clone();

        assert!(condense_with_next_conditional(&mut body, p)?);
        assert!(body.statement(p)?.is_nop());
        assert_eq!(if_condition(&body, s)?.to_string(), "!c1 && c2");
        assert_equivalent(&original, &body);
        Ok(())
    }

    #[test]
    fn test_or_fold() -> Result<()> {
        let (mut body, p, s) = or_layout()?;
        let original = body.clone();

        assert!(condense_with_prior_conditional(&mut body, s, p)?);
        assert!(body.statement(p)?.is_nop());
        assert_eq!(if_condition(&body, s)?.to_string(), "c1 || c2");
        assert_equivalent(&original, &body);
        Ok(())
    }

    #[test]
    fn test_no_fold_leaves_body_untouched() -> Result<()> {
        // if (c1) goto a; if (c2) goto b; return 0; a: return 1; b: return 2;
        let mut b = BodyBuilder::new("none");
        let p = b.if_jump(flag("c1"));
        let s = b.if_jump(flag("c2"));
        b.ret_int(0);
        let a = b.ret_int(1);
        let t = b.ret_int(2);
        b.branch(p, a)?;
        b.branch(s, t)?;
        let mut body = b.build()?;
        let original = body.clone();

        assert!(!condense_with_next_conditional(&mut body, p)?);
        assert!(!condense_with_next_conditional(&mut body, p)?);
        assert!(!condense_with_prior_conditional(&mut body, s, p)?);
        assert_eq!(body, original);
        Ok(())
    }

    #[test]
    fn test_fold_requires_sole_predecessor() -> Result<()> {
        // A goto lands on the second conditional, so it cannot absorb the first.
        let mut b = BodyBuilder::new("joined");
        let p = b.if_jump(flag("c1"));
        let s = b.if_jump(flag("c2"));
        let a = b.ret_int(0);
        let t = b.ret_int(1);
        let back = b.push(Statement::Goto(GotoStatement::new()));
        b.branch(p, a)?;
        b.branch(s, t)?;
        let mut body = b.build()?;
        body.set_targets(back, vec![s])?;

        assert!(!condense_with_next_conditional(&mut body, p)?);
        Ok(())
    }

    #[test]
    fn test_and_wins_when_both_rules_apply() -> Result<()> {
        // Both successors of the second conditional are the prior's target.
        let mut b = BodyBuilder::new("both");
        let p = b.if_jump(flag("c1"));
        let s = b.if_jump(flag("c2"));
        let a = b.ret_int(0);
        b.branch(p, a)?;
        b.branch(s, a)?;
        let mut body = b.build()?;

        assert!(condense_with_next_conditional(&mut body, p)?);
        assert_eq!(if_condition(&body, s)?.to_string(), "!c1 && c2");
        Ok(())
    }

    #[test]
    fn test_fold_through_nops() -> Result<()> {
        let mut b = BodyBuilder::new("nops");
        let p = b.if_jump(flag("c1"));
        b.push(Statement::Nop);
        let s = b.if_jump(flag("c2"));
        b.ret_int(0);
        let a = b.ret_int(1);
        b.branch(p, a)?;
        b.branch(s, a)?;
        let mut body = b.build()?;
        let original = body.clone();

        assert!(condense_with_next_conditional(&mut body, p)?);
        assert_eq!(if_condition(&body, s)?.to_string(), "c1 || c2");
        assert_equivalent(&original, &body);
        Ok(())
    }

    #[test]
    fn test_pass_folds_chain() -> Result<()> {
        // if (c1) goto a; if (c2) goto a; if (c3) goto a; return 0; a: return 1;
        let mut b = BodyBuilder::new("chain");
        let p1 = b.if_jump(flag("c1"));
        let p2 = b.if_jump(flag("c2"));
        let p3 = b.if_jump(flag("c3"));
        b.ret_int(0);
        let a = b.ret_int(1);
        for p in [p1, p2, p3] {
            b.branch(p, a)?;
        }
        let mut body = b.build()?;

        let ctx = AnalysisContext::new();
        let pass = ConditionalCondensationPass::new();
        assert!(pass.should_run(&body, &ctx));
        assert!(pass.run_on_method(&mut body, MethodId::new(0), &ctx)?);
        assert_eq!(if_condition(&body, p3)?.to_string(), "c1 || c2 || c3");
        assert_eq!(ctx.events.count_kind(EventKind::ConditionalsFolded), 2);

        assert!(!pass.run_on_method(&mut body, MethodId::new(0), &ctx)?);
        Ok(())
    }

    #[test]
    fn test_classify_conditional() -> Result<()> {
        let loop_block = BlockIdentifier::new(1, BlockType::WhileLoop);
        let anon = BlockIdentifier::new(2, BlockType::Anonymous);

        let mut b = BodyBuilder::new("classify");
        let head = b.ret_int(0);
        let jump = b.if_jump(flag("c"));
        let after = b.push(Statement::AnonBreakTarget(anon));
        let mut body = b.build()?;
        body.set_targets(jump, vec![after, head])?;
        body.set_block_started(head, loop_block)?;
        body.set_blocks_ended(after, vec![anon])?;

        assert!(matches!(
            structured_statement(&body, jump)?,
            StructuredStatement::UnstructuredIf { .. }
        ));

        let tag = |body: &mut MethodBody, jump_type| -> Result<()> {
            if let Some(stmt) = body.statement_mut(jump)?.as_if_mut() {
                stmt.set_jump_type(jump_type);
            }
            Ok(())
        };

        tag(&mut body, JumpType::Continue)?;
        body.set_targets(jump, vec![after, head])?;
        assert_eq!(
            structured_statement(&body, jump)?,
            StructuredStatement::guarded(
                flag("c"),
                StructuredStatement::UnstructuredContinue(loop_block)
            )
        );

        body.set_targets(jump, vec![head, after])?;
        tag(&mut body, JumpType::Break)?;
        assert_eq!(
            structured_statement(&body, jump)?,
            StructuredStatement::guarded(flag("c"), StructuredStatement::UnstructuredBreak(vec![anon]))
        );

        tag(&mut body, JumpType::BreakAnonymous)?;
        assert_eq!(
            structured_statement(&body, jump)?,
            StructuredStatement::guarded(flag("c"), StructuredStatement::UnstructuredAnonymousBreak(anon))
        );

        tag(&mut body, JumpType::EndBlock)?;
        assert_eq!(
            structured_statement(&body, jump),
            Err(Error::UnexpectedJumpType {
                jump_type: JumpType::EndBlock,
                container: jump
            })
        );
        Ok(())
    }

    #[test]
    fn test_classify_bad_targets() -> Result<()> {
        let mut b = BodyBuilder::new("bad");
        let jump = b.if_jump(flag("c"));
        let plain = b.ret_int(0);
        let mut body = b.build()?;
        body.set_targets(jump, vec![plain, plain])?;

        for jump_type in [JumpType::Continue, JumpType::Break, JumpType::BreakAnonymous] {
            if let Some(stmt) = body.statement_mut(jump)?.as_if_mut() {
                stmt.set_jump_type(jump_type);
            }
            assert!(matches!(
                structured_statement(&body, jump),
                Err(Error::Confused { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn test_classify_goto() -> Result<()> {
        let mut b = BodyBuilder::new("goto");
        let jump = b.push(Statement::Goto(GotoStatement::with_jump_type(JumpType::EndBlock)));
        let end = b.ret_int(0);
        let mut body = b.build()?;
        body.set_targets(jump, vec![end])?;

        assert_eq!(structured_statement(&body, jump)?, StructuredStatement::Empty);

        body.replace_statement(jump, Statement::goto())?;
        assert_eq!(
            structured_statement(&body, jump)?,
            StructuredStatement::UnstructuredGoto(end)
        );
        assert_eq!(
            structured_statement(&body, end)?,
            StructuredStatement::Simple(Statement::ReturnValue(Expression::literal(Literal::Int(0))))
        );
        Ok(())
    }

    #[test]
    fn test_while_loop_headers() -> Result<()> {
        let block = BlockIdentifier::new(5, BlockType::WhileLoop);
        let mut b = BodyBuilder::new("loops");
        let start = b.if_jump(flag("done"));
        let end = b.if_jump(flag("more"));
        let mut body = b.build()?;

        replace_with_while_loop_start(&mut body, start, block)?;
        replace_with_while_loop_end(&mut body, end, block)?;

        assert_eq!(
            body.statement(start)?,
            &Statement::While(WhileStatement::new(Some(flag("done").negated()), block))
        );
        assert_eq!(
            body.statement(end)?,
            &Statement::While(WhileStatement::new(Some(flag("more")), block))
        );
        assert!(matches!(
            replace_with_while_loop_start(&mut body, start, block),
            Err(Error::Confused { .. })
        ));
        Ok(())
    }
}
