//! Exception table entries and the exception-interest predicate.
//!
//! Try/catch regions are detected upstream. What reaches this crate is the raw
//! exception table of a method and, derived from it, an [`ExceptionCheck`]: the
//! set of exception classes some handler in the method is interested in. The
//! condensation passes consult it through [`crate::analysis::Expression::can_throw`]
//! so that no rewrite moves or drops an evaluation whose fault a handler would
//! observe.

use crate::analysis::value::TypeRef;

/// Well-known runtime fault classes raised by the JVM itself.
pub mod faults {
    /// Integer division or remainder by zero.
    pub const ARITHMETIC: &str = "java.lang.ArithmeticException";
    /// Dereference of a null receiver.
    pub const NULL_POINTER: &str = "java.lang.NullPointerException";
    /// Allocation failure.
    pub const OUT_OF_MEMORY: &str = "java.lang.OutOfMemoryError";
    /// Root of all throwables.
    pub const THROWABLE: &str = "java.lang.Throwable";
}

/// Superclass chains of the fault classes raised by the JVM itself.
///
/// Only these chains are needed: user-defined exception classes are raised by
/// invocations, which are treated as able to throw anything.
const FAULT_HIERARCHY: &[(&str, &[&str])] = &[
    (
        faults::ARITHMETIC,
        &[
            "java.lang.RuntimeException",
            "java.lang.Exception",
            faults::THROWABLE,
        ],
    ),
    (
        faults::NULL_POINTER,
        &[
            "java.lang.RuntimeException",
            "java.lang.Exception",
            faults::THROWABLE,
        ],
    ),
    (
        faults::OUT_OF_MEMORY,
        &[
            "java.lang.VirtualMachineError",
            "java.lang.Error",
            faults::THROWABLE,
        ],
    ),
];

/// One row of a method's exception table.
///
/// The protected range is half-open: `from <= offset < to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    /// First protected bytecode offset.
    pub from: u16,
    /// First bytecode offset after the protected range.
    pub to: u16,
    /// Offset of the handler code.
    pub handler: u16,
    /// Class caught by the handler; `None` catches everything (`finally`).
    pub catch_type: Option<TypeRef>,
}

impl ExceptionTableEntry {
    /// Creates a table entry.
    #[must_use]
    pub fn new(from: u16, to: u16, handler: u16, catch_type: Option<TypeRef>) -> Self {
        Self {
            from,
            to,
            handler,
            catch_type,
        }
    }

    /// Returns `true` if `offset` lies inside the protected range.
    #[must_use]
    pub fn covers(&self, offset: u16) -> bool {
        self.from <= offset && offset < self.to
    }

    /// Returns `true` if this handler catches every throwable.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.catch_type
            .as_ref()
            .map_or(true, |ty| ty.name() == faults::THROWABLE)
    }
}

/// The set of exception classes handlers in a method are interested in.
///
/// An empty check means nothing is caught: no evaluation can raise a fault that
/// is observable inside the method, so every expression is free to move.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionCheck {
    caught: Vec<TypeRef>,
    catch_all: bool,
}

impl ExceptionCheck {
    /// A check that catches nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// A check that catches every throwable.
    #[must_use]
    pub fn all() -> Self {
        Self {
            caught: Vec::new(),
            catch_all: true,
        }
    }

    /// Builds a check from the classes caught by the given table entries.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ExceptionTableEntry>) -> Self {
        let mut check = Self::none();
        for entry in entries {
            match &entry.catch_type {
                _ if entry.is_catch_all() => check.catch_all = true,
                Some(ty) if !check.caught.contains(ty) => check.caught.push(ty.clone()),
                _ => {}
            }
        }
        check
    }

    /// Adds a caught class.
    #[must_use]
    pub fn with_caught(mut self, ty: TypeRef) -> Self {
        if ty.name() == faults::THROWABLE {
            self.catch_all = true;
        } else if !self.caught.contains(&ty) {
            self.caught.push(ty);
        }
        self
    }

    /// Returns `true` if any handler is interested in anything at all.
    #[must_use]
    pub fn might_catch_any(&self) -> bool {
        self.catch_all || !self.caught.is_empty()
    }

    /// Returns `true` if a handler would observe the JVM raising `fault`.
    ///
    /// `fault` is a dotted class name, normally one of [`faults`]. A handler
    /// for the class itself or any of its known superclasses matches.
    #[must_use]
    pub fn might_catch(&self, fault: &str) -> bool {
        if self.catch_all {
            return true;
        }

        let supers = FAULT_HIERARCHY
            .iter()
            .find(|(name, _)| *name == fault)
            .map_or(&[][..], |(_, supers)| *supers);

        self.caught
            .iter()
            .any(|ty| ty.name() == fault || supers.contains(&ty.name()))
    }
}
