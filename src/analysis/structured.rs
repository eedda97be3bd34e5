//! Structured statement nodes handed to the block builder.
//!
//! Once condensation has settled, every jump is classified into one of the
//! [`StructuredStatement`] forms. Jumps that map directly onto `continue` or
//! `break` come out structured; the rest stay unstructured (rendered with a
//! leading `**`) until the block builder nests them.

use crate::analysis::{
    block::BlockIdentifier,
    conditional::ConditionalExpression,
    container::ContainerId,
    dumper::{Dumpable, Dumper},
    statement::Statement,
};

/// A statement after jump classification.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredStatement {
    /// A conditional jump still to be nested by the block builder.
    UnstructuredIf {
        /// The tested condition.
        condition: ConditionalExpression,
        /// Then-block, if block analysis identified one.
        if_block: Option<BlockIdentifier>,
        /// Paired else-block, if block analysis identified one.
        else_block: Option<BlockIdentifier>,
    },

    /// `if (condition) body`
    StructuredIf {
        /// The tested condition.
        condition: ConditionalExpression,
        /// The guarded statement.
        body: Box<StructuredStatement>,
    },

    /// An unconditional jump still to be structured.
    UnstructuredGoto(ContainerId),

    /// A loop header still to be nested.
    UnstructuredWhile {
        /// Loop condition; `None` loops forever.
        condition: Option<ConditionalExpression>,
        /// The loop body block.
        block: BlockIdentifier,
    },

    /// `continue` to the start of a loop.
    UnstructuredContinue(BlockIdentifier),

    /// `break` out of the listed blocks, innermost first.
    UnstructuredBreak(Vec<BlockIdentifier>),

    /// `break` out of a synthetic anonymous block.
    UnstructuredAnonymousBreak(BlockIdentifier),

    /// A non-jump statement, unchanged.
    Simple(Statement),

    /// Nothing; the jump is implied by the block structure.
    Empty,
}

impl StructuredStatement {
    /// Wraps `body` in `if (condition)`.
    #[must_use]
    pub fn guarded(condition: ConditionalExpression, body: Self) -> Self {
        Self::StructuredIf {
            condition,
            body: Box::new(body),
        }
    }

    /// Returns `true` for forms the block builder still has to nest.
    #[must_use]
    pub fn is_unstructured(&self) -> bool {
        matches!(
            self,
            Self::UnstructuredIf { .. } | Self::UnstructuredGoto(_) | Self::UnstructuredWhile { .. }
        )
    }
}

impl Dumpable for StructuredStatement {
    fn dump(&self, dumper: &mut Dumper) {
        match self {
            Self::UnstructuredIf {
                condition,
                if_block,
                else_block,
            } => {
                dumper.print(format_args!("** if ({condition})"));
                if let Some(block) = if_block {
                    dumper.print(format_args!(" // then {block}"));
                    if let Some(block) = else_block {
                        dumper.print(format_args!(", else {block}"));
                    }
                }
                dumper.newline();
            }
            Self::StructuredIf { condition, body } => {
                dumper.print(format_args!("if ({condition}) {{")).newline();
                dumper.indent().dump(body.as_ref()).outdent();
                dumper.print("}").newline();
            }
            Self::UnstructuredGoto(target) => {
                dumper.print(format_args!("** goto {target};")).newline();
            }
            Self::UnstructuredWhile { condition, block } => {
                match condition {
                    Some(condition) => dumper.print(format_args!("** while ({condition})")),
                    None => dumper.print("** while (true)"),
                };
                dumper.print(format_args!(" // {block}")).newline();
            }
            Self::UnstructuredContinue(block) => {
                dumper.print(format_args!("continue {};", block.label())).newline();
            }
            Self::UnstructuredBreak(blocks) => {
                match blocks.as_slice() {
                    [_] | [] => dumper.print("break;"),
                    [.., outermost] => dumper.print(format_args!("break {};", outermost.label())),
                };
                dumper.newline();
            }
            Self::UnstructuredAnonymousBreak(block) => {
                dumper.print(format_args!("break {};", block.label())).newline();
            }
            Self::Simple(statement) => statement.dump(dumper, None),
            Self::Empty => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::block::BlockType;

    #[test]
    fn test_render_guarded_break() {
        let inner = BlockIdentifier::new(1, BlockType::SimpleIf);
        let outer = BlockIdentifier::new(2, BlockType::WhileLoop);

        let single = StructuredStatement::guarded(
            ConditionalExpression::Constant(true),
            StructuredStatement::UnstructuredBreak(vec![outer]),
        );
        assert_eq!(single.dump_to_string(), "if (true) {\n    break;\n}\n");

        let nested = StructuredStatement::UnstructuredBreak(vec![inner, outer]);
        assert_eq!(nested.dump_to_string(), "break block2;\n");
    }

    #[test]
    fn test_render_unstructured() {
        let block = BlockIdentifier::new(3, BlockType::SimpleIf);
        let stmt = StructuredStatement::UnstructuredIf {
            condition: ConditionalExpression::Constant(false),
            if_block: Some(block),
            else_block: None,
        };
        assert!(stmt.is_unstructured());
        assert_eq!(stmt.dump_to_string(), "** if (false) // then block3:if\n");
        assert_eq!(StructuredStatement::Empty.dump_to_string(), "");
    }
}
