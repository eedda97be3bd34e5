//! Block identifiers and jump classification.
//!
//! The block-structuring stage names every lexical region it discovers (loop
//! bodies, if/else arms, synthetic blocks introduced to give a forward jump a
//! `break` target) with a [`BlockIdentifier`], and tags every jump with a
//! [`JumpType`] describing how it relates to those regions. This crate only
//! compares identifiers for equality; it never inspects their extent.

use std::fmt;

use strum::{Display, EnumIter};

/// The kind of lexical region a [`BlockIdentifier`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum BlockType {
    /// Body of a head-tested loop.
    #[strum(serialize = "while")]
    WhileLoop,
    /// Body of a tail-tested loop.
    #[strum(serialize = "do")]
    DoLoop,
    /// Then-arm of an if.
    #[strum(serialize = "if")]
    SimpleIf,
    /// Else-arm of an if.
    #[strum(serialize = "else")]
    SimpleElse,
    /// Protected region of a try.
    #[strum(serialize = "try")]
    TryBlock,
    /// Synthetic labelled block, only used as an anonymous break target.
    #[strum(serialize = "block")]
    Anonymous,
}

/// Opaque name of a lexical region.
///
/// Identifiers are only meaningful for equality: two identifiers denote the
/// same region exactly when their indices match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIdentifier {
    index: u32,
    kind: BlockType,
}

impl BlockIdentifier {
    /// Creates a block identifier.
    #[must_use]
    pub const fn new(index: u32, kind: BlockType) -> Self {
        Self { index, kind }
    }

    /// The unique index of this block within its method.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// The kind of region.
    #[must_use]
    pub const fn kind(self) -> BlockType {
        self.kind
    }

    /// Returns `true` for loop bodies (valid `continue` targets).
    #[must_use]
    pub const fn is_loop(self) -> bool {
        matches!(self.kind, BlockType::WhileLoop | BlockType::DoLoop)
    }

    /// The label this block renders with when a jump must name it.
    #[must_use]
    pub fn label(self) -> String {
        format!("block{}", self.index)
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label(), self.kind)
    }
}

/// How a jump relates to the surrounding lexical structure.
///
/// Assigned upstream before classification runs. Conditional jumps accept
/// every tag except [`JumpType::EndBlock`]; unconditional jumps accept all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter)]
pub enum JumpType {
    /// Plain jump, not yet related to any structure.
    #[default]
    #[strum(serialize = "goto")]
    Goto,
    /// Jump out of the current if nesting.
    #[strum(serialize = "goto-out-of-if")]
    GotoOutOfIf,
    /// Jump out of the current try nesting.
    #[strum(serialize = "goto-out-of-try")]
    GotoOutOfTry,
    /// Jump back to the start of an enclosing loop.
    #[strum(serialize = "continue")]
    Continue,
    /// Jump past the end of one or more enclosing blocks.
    #[strum(serialize = "break")]
    Break,
    /// Jump past the end of a synthetic anonymous block.
    #[strum(serialize = "break-anonymous")]
    BreakAnonymous,
    /// Jump from the end of a block to the code following it; implied by the
    /// block structure and never rendered.
    #[strum(serialize = "end-block")]
    EndBlock,
}

impl JumpType {
    /// Returns `true` for tags that leave the jump to be structured later.
    #[must_use]
    pub const fn is_unstructured(self) -> bool {
        matches!(self, Self::Goto | Self::GotoOutOfIf | Self::GotoOutOfTry)
    }
}
