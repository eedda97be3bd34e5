//! Statement containers and the per-method container arena.
//!
//! Every statement lives in exactly one [`StatementContainer`]. Containers are
//! owned by their [`MethodBody`] and addressed by [`ContainerId`], a stable
//! index into the body's arena. Jumps are successor links between container
//! ids, so replacing or erasing the statement inside a container never
//! invalidates a jump that points at it.
//!
//! # Successor Offsets
//!
//! Successors are looked up by small fixed offsets:
//!
//! | Statement      | offset 0              | offset 1    |
//! |----------------|-----------------------|-------------|
//! | conditional    | fall-through          | jump taken  |
//! | goto           | jump target           |             |
//! | anything else  | fall-through (if any) |             |
//!
//! # Examples
//!
//! ```rust
//! use refold::analysis::{ConditionalExpression, MethodBody, Statement};
//!
//! let mut body = MethodBody::new("example");
//! let jump = body.push(Statement::if_jump(ConditionalExpression::Constant(true)));
//! let next = body.push(Statement::ReturnVoid);
//! let exit = body.push(Statement::ReturnVoid);
//! body.set_targets(jump, vec![next, exit])?;
//!
//! body.nop_out(jump)?;
//! assert!(body.statement(jump)?.is_nop());
//! assert_eq!(body.target(jump, 1)?, exit);
//! # Ok::<(), refold::Error>(())
//! ```

use std::fmt;

use crate::{
    analysis::{
        block::BlockIdentifier,
        dumper::{Dumpable, Dumper},
        exception::ExceptionCheck,
        statement::Statement,
        value::{StackValue, UsageTable, ValueType},
    },
    Error, Result,
};

/// Stable handle of a container within one [`MethodBody`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

impl ContainerId {
    /// Creates a container handle from its arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lbl{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lbl{}", self.0)
    }
}

/// A statement together with its identity and successor links.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementContainer {
    id: ContainerId,
    statement: Statement,
    targets: Vec<ContainerId>,
    block_started: Option<BlockIdentifier>,
    blocks_ended: Vec<BlockIdentifier>,
}

impl StatementContainer {
    fn new(id: ContainerId, statement: Statement) -> Self {
        Self {
            id,
            statement,
            targets: Vec::new(),
            block_started: None,
            blocks_ended: Vec::new(),
        }
    }

    /// The container's identity.
    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    /// The held statement.
    #[must_use]
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Successor links, indexed by offset.
    #[must_use]
    pub fn targets(&self) -> &[ContainerId] {
        &self.targets
    }

    /// The block that begins at this container, if any.
    #[must_use]
    pub fn block_started(&self) -> Option<BlockIdentifier> {
        self.block_started
    }

    /// The blocks that end just before this container, innermost first.
    #[must_use]
    pub fn blocks_ended(&self) -> &[BlockIdentifier] {
        &self.blocks_ended
    }
}

impl Dumpable for StatementContainer {
    fn dump(&self, dumper: &mut Dumper) {
        for block in &self.blocks_ended {
            dumper.print(format_args!("// }} {block}")).newline();
        }
        if let Some(block) = self.block_started {
            dumper.print(format_args!("// {block} {{")).newline();
        }
        let jump_target = self
            .statement
            .jump_target_offset()
            .and_then(|offset| self.targets.get(offset).copied());
        dumper.print(format_args!("{}: ", self.id));
        self.statement.dump(dumper, jump_target);
    }
}

impl fmt::Display for StatementContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dump_to_string().trim_end())
    }
}

/// The statement graph of one method.
///
/// Containers are stored in program order and never removed; erased
/// statements become [`Statement::Nop`] in place. The body also carries the
/// per-method inputs the passes consult: the stack-value [`UsageTable`] and
/// the [`ExceptionCheck`] derived from the method's exception table.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    name: String,
    containers: Vec<StatementContainer>,
    values: UsageTable,
    exception_check: ExceptionCheck,
}

impl MethodBody {
    /// Creates an empty body for the named method.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
            values: UsageTable::new(),
            exception_check: ExceptionCheck::none(),
        }
    }

    /// Sets the exception-interest predicate of the method.
    #[must_use]
    pub fn with_exception_check(mut self, check: ExceptionCheck) -> Self {
        self.exception_check = check;
        self
    }

    /// The method name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of containers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    /// Returns `true` if the body holds no containers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Container ids in program order.
    pub fn ids(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.containers.iter().map(StatementContainer::id)
    }

    /// Containers in program order.
    pub fn iter(&self) -> impl Iterator<Item = &StatementContainer> {
        self.containers.iter()
    }

    /// Appends a container holding `statement` and returns its id.
    ///
    /// The new container has no successors until [`MethodBody::set_targets`]
    /// is called.
    pub fn push(&mut self, statement: Statement) -> ContainerId {
        let id = ContainerId::new(self.containers.len());
        self.containers.push(StatementContainer::new(id, statement));
        id
    }

    /// Allocates a fresh stack value in this body's usage table.
    pub fn new_stack_value(&mut self, ty: ValueType) -> StackValue {
        self.values.allocate(ty)
    }

    /// The stack-value usage table.
    #[must_use]
    pub fn usages(&self) -> &UsageTable {
        &self.values
    }

    /// Mutable access to the stack-value usage table.
    pub fn usages_mut(&mut self) -> &mut UsageTable {
        &mut self.values
    }

    /// The exception-interest predicate of the method.
    #[must_use]
    pub fn exception_check(&self) -> &ExceptionCheck {
        &self.exception_check
    }

    /// Looks up a container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn container(&self, id: ContainerId) -> Result<&StatementContainer> {
        self.containers
            .get(id.index())
            .ok_or(Error::InvalidContainer(id))
    }

    fn container_mut(&mut self, id: ContainerId) -> Result<&mut StatementContainer> {
        self.containers
            .get_mut(id.index())
            .ok_or(Error::InvalidContainer(id))
    }

    /// The statement held by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn statement(&self, id: ContainerId) -> Result<&Statement> {
        self.container(id).map(StatementContainer::statement)
    }

    /// Mutable access to the statement held by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn statement_mut(&mut self, id: ContainerId) -> Result<&mut Statement> {
        self.container_mut(id).map(|container| &mut container.statement)
    }

    /// Swaps the statement held by `id`, keeping its identity and successors.
    ///
    /// # Returns
    ///
    /// The statement previously held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn replace_statement(&mut self, id: ContainerId, statement: Statement) -> Result<Statement> {
        let container = self.container_mut(id)?;
        Ok(std::mem::replace(&mut container.statement, statement))
    }

    /// Erases the statement held by `id`, leaving a no-op in its place.
    ///
    /// Successor links are kept, so control passing through the container
    /// still reaches the same place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn nop_out(&mut self, id: ContainerId) -> Result<Statement> {
        self.replace_statement(id, Statement::Nop)
    }

    /// Erases a conditional, keeping only its fall-through successor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body, or
    /// [`Error::Confused`] if it does not hold a conditional.
    pub fn nop_out_conditional(&mut self, id: ContainerId) -> Result<Statement> {
        let container = self.container_mut(id)?;
        if !container.statement.is_conditional() {
            return Err(confused_error!("{} does not hold a conditional", id));
        }
        container.targets.truncate(1);
        Ok(std::mem::replace(&mut container.statement, Statement::Nop))
    }

    /// Sets the successor links of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` or any target is not part of
    /// this body.
    pub fn set_targets(&mut self, id: ContainerId, targets: Vec<ContainerId>) -> Result<()> {
        if let Some(invalid) = targets.iter().find(|t| t.index() >= self.containers.len()) {
            return Err(Error::InvalidContainer(*invalid));
        }
        self.container_mut(id)?.targets = targets;
        Ok(())
    }

    /// The successor of `id` at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body, or
    /// [`Error::MissingTarget`] if it has no successor at `offset`.
    pub fn target(&self, id: ContainerId, offset: usize) -> Result<ContainerId> {
        self.container(id)?
            .targets
            .get(offset)
            .copied()
            .ok_or(Error::MissingTarget {
                container: id,
                index: offset,
            })
    }

    /// The statement held by the successor of `id` at `offset`.
    ///
    /// # Errors
    ///
    /// Same as [`MethodBody::target`].
    pub fn target_statement(&self, id: ContainerId, offset: usize) -> Result<&Statement> {
        let target = self.target(id, offset)?;
        self.statement(target)
    }

    /// Containers with a successor link to `id`.
    #[must_use]
    pub fn sources(&self, id: ContainerId) -> Vec<ContainerId> {
        self.containers
            .iter()
            .filter(|container| container.targets.contains(&id))
            .map(StatementContainer::id)
            .collect()
    }

    /// The block beginning at `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn block_started(&self, id: ContainerId) -> Result<Option<BlockIdentifier>> {
        self.container(id).map(StatementContainer::block_started)
    }

    /// Records that `block` begins at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn set_block_started(&mut self, id: ContainerId, block: BlockIdentifier) -> Result<()> {
        self.container_mut(id)?.block_started = Some(block);
        Ok(())
    }

    /// The blocks ending just before `id`, innermost first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn blocks_ended(&self, id: ContainerId) -> Result<&[BlockIdentifier]> {
        self.container(id).map(StatementContainer::blocks_ended)
    }

    /// Records that `blocks` end just before `id`, innermost first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `id` is not part of this body.
    pub fn set_blocks_ended(&mut self, id: ContainerId, blocks: Vec<BlockIdentifier>) -> Result<()> {
        self.container_mut(id)?.blocks_ended = blocks;
        Ok(())
    }

    /// Rebuilds every use count from the statements currently in the body.
    pub fn recount_usages(&mut self) {
        self.values.clear_uses();
        let mut used = Vec::new();
        for container in &self.containers {
            container.statement.collect_used_values(&mut used);
        }
        for id in used {
            self.values.increment(id);
        }
    }

    /// Renders the whole body, one container per line.
    #[must_use]
    pub fn dump(&self) -> String {
        self.dump_to_string()
    }
}

impl Dumpable for MethodBody {
    fn dump(&self, dumper: &mut Dumper) {
        dumper.print(format_args!("// {}", self.name)).newline();
        for container in &self.containers {
            dumper.dump(container);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        conditional::ConditionalExpression,
        expression::Expression,
        block::BlockType,
        literal::Literal,
        statement::LValue,
    };

    fn diamond() -> Result<(MethodBody, [ContainerId; 3])> {
        let mut body = MethodBody::new("diamond");
        let jump = body.push(Statement::if_jump(ConditionalExpression::Constant(true)));
        let next = body.push(Statement::ReturnVoid);
        let exit = body.push(Statement::ReturnVoid);
        body.set_targets(jump, vec![next, exit])?;
        Ok((body, [jump, next, exit]))
    }

    #[test]
    fn test_replace_keeps_identity() -> Result<()> {
        let (mut body, [jump, next, exit]) = diamond()?;
        let old = body.replace_statement(exit, Statement::ReturnValue(Expression::literal(Literal::Int(1))))?;

        assert_eq!(old, Statement::ReturnVoid);
        assert_eq!(body.target(jump, 1)?, exit);
        assert_eq!(
            body.target_statement(jump, 1)?,
            &Statement::ReturnValue(Expression::literal(Literal::Int(1)))
        );
        assert_eq!(body.target(jump, 0)?, next);
        Ok(())
    }

    #[test]
    fn test_nop_out_keeps_links() -> Result<()> {
        let (mut body, [jump, _, exit]) = diamond()?;
        body.nop_out(exit)?;
        assert_eq!(body.target(jump, 1)?, exit);
        assert!(body.target_statement(jump, 1)?.is_nop());
        Ok(())
    }

    #[test]
    fn test_nop_out_conditional_drops_taken_edge() -> Result<()> {
        let (mut body, [jump, next, _]) = diamond()?;
        body.nop_out_conditional(jump)?;

        assert!(body.statement(jump)?.is_nop());
        assert_eq!(body.target(jump, 0)?, next);
        assert!(matches!(
            body.target(jump, 1),
            Err(Error::MissingTarget { index: 1, .. })
        ));
        assert!(matches!(
            body.nop_out_conditional(jump),
            Err(Error::Confused { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_invalid_container() {
        let mut body = MethodBody::new("empty");
        let id = ContainerId::new(3);
        assert_eq!(body.statement(id), Err(Error::InvalidContainer(id)));
        assert_eq!(body.nop_out(id), Err(Error::InvalidContainer(id)));

        let first = body.push(Statement::ReturnVoid);
        assert_eq!(
            body.set_targets(first, vec![id]),
            Err(Error::InvalidContainer(id))
        );
    }

    #[test]
    fn test_sources() -> Result<()> {
        let (body, [jump, next, exit]) = diamond()?;
        assert_eq!(body.sources(exit), vec![jump]);
        assert_eq!(body.sources(next), vec![jump]);
        assert!(body.sources(jump).is_empty());
        Ok(())
    }

    #[test]
    fn test_recount_usages() {
        let mut body = MethodBody::new("uses");
        let v = body.new_stack_value(ValueType::Int);
        body.push(Statement::assignment(
            LValue::StackValue(v.clone()),
            Expression::literal(Literal::Int(5)),
        ));
        body.push(Statement::ReturnValue(Expression::stack(v.clone())));
        body.usages_mut().set_uses(v.id, 9);

        body.recount_usages();
        assert_eq!(body.usages().uses(v.id), 1);
    }

    #[test]
    fn test_dump() -> Result<()> {
        let (body, _) = diamond()?;
        assert_eq!(
            body.dump(),
            "// diamond\nlbl0: if (true) goto lbl2;\nlbl1: return;\nlbl2: return;\n"
        );
        Ok(())
    }

    #[test]
    fn test_dump_block_markers() -> Result<()> {
        let (mut body, [_, next, exit]) = diamond()?;
        let block = BlockIdentifier::new(1, BlockType::WhileLoop);
        body.set_block_started(next, block)?;
        body.set_blocks_ended(exit, vec![block])?;

        assert_eq!(
            body.dump(),
            "// diamond\nlbl0: if (true) goto lbl2;\n// block1:while {\nlbl1: return;\n// } block1:while\nlbl2: return;\n"
        );
        Ok(())
    }
}
