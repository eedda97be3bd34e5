use thiserror::Error;

use crate::analysis::{ContainerId, JumpType};

macro_rules! confused_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Confused {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Confused {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every variant describes an internal-consistency fault scoped to a single method body.
/// Conditions that are expected during normal operation (a conditional pair that does not
/// fold, a stack value that is allocated twice) are never reported through this type; they
/// surface as plain `bool`/`Option` results from the passes.
///
/// # Error Categories
///
/// ## Graph Consistency Errors
/// - [`Error::InvalidContainer`] - A container handle not attached to the body it is used on
/// - [`Error::MissingTarget`] - A successor lookup by offset failed
/// - [`Error::Confused`] - Any other broken invariant of the statement graph
///
/// ## Classification Errors
/// - [`Error::UnexpectedJumpType`] - A jump tag outside what the statement kind can structure
/// - [`Error::NotAppropriate`] - An operation queried on a statement kind that lacks it
///
/// ## Scheduling Errors
/// - [`Error::IterationLimit`] - A strict scheduler failed to reach a fixpoint
///
/// # Examples
///
/// ```rust
/// use refold::{analysis::MethodBody, Error};
///
/// let body = MethodBody::new("empty");
/// match body.statement(refold::analysis::ContainerId::new(3)) {
///     Err(Error::InvalidContainer(id)) => println!("{id} is not part of this body"),
///     Err(e) => eprintln!("Other error: {e}"),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The statement graph is in a state the analysis cannot make sense of.
    ///
    /// This is the catch-all internal-consistency fault. It includes the source location
    /// where the problem was detected so that a failed method can be traced back to the
    /// check that rejected it.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the broken invariant
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Confused - {file}:{line}: {message}")]
    Confused {
        /// The message to be printed for the Confused error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A statement carries a jump classification it cannot be structured with.
    ///
    /// Classification of jumps is total over the tags each statement kind accepts; any
    /// other tag means the upstream block analysis produced inconsistent data.
    #[error("Unexpected jump type {jump_type} at {container}")]
    UnexpectedJumpType {
        /// The offending jump classification
        jump_type: JumpType,
        /// The container holding the jump
        container: ContainerId,
    },

    /// A container handle was used against a body it does not belong to.
    ///
    /// Raised when a container's identity is queried before it was attached to a
    /// containing sequence.
    #[error("Container {0} is not attached to this method body")]
    InvalidContainer(ContainerId),

    /// A successor lookup by relative offset did not resolve.
    #[error("Container {container} has no target at offset {index}")]
    MissingTarget {
        /// The container whose successor was requested
        container: ContainerId,
        /// The requested successor offset
        index: usize,
    },

    /// An operation was requested from a statement kind that does not support it.
    #[error("Not appropriate here - {0}")]
    NotAppropriate(&'static str),

    /// The pass scheduler did not reach a fixpoint within its iteration budget.
    ///
    /// Only raised by schedulers configured as strict; the associated value is the
    /// iteration limit that was exhausted.
    #[error("No fixpoint reached within {0} iterations")]
    IterationLimit(usize),
}
