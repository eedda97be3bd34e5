//! Stack values, value types and usage tracking.
//!
//! The lifter turns every push onto the operand stack into a single-assignment
//! *stack value*. Each stack value is identified by a [`StackValueId`], a plain
//! index assigned when the value is created. The identity is explicit, comparable
//! and hashable, which lets the passes key their bookkeeping maps on it directly.
//!
//! # Usage Counts
//!
//! Every read of a stack value is a *use*. The [`UsageTable`] records how many
//! uses each value has; the single-use inliner only folds values with exactly
//! one use, and the construction condensation retires the use absorbed by a
//! fused constructor call.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

/// Unique identifier for a stack value.
///
/// This is a lightweight handle into the [`UsageTable`] of one method body. The
/// identifier is unique within a single [`crate::analysis::MethodBody`] but not
/// across bodies.
///
/// # Examples
///
/// ```rust
/// use refold::analysis::StackValueId;
///
/// let id = StackValueId::new(4);
/// assert_eq!(id.index(), 4);
/// assert_eq!(id.to_string(), "v4");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackValueId(usize);

impl StackValueId {
    /// Creates a new stack value identifier.
    ///
    /// # Arguments
    ///
    /// * `index` - The index into the usage table
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for StackValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for StackValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A reference to a named class, as resolved by the class-file layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    name: String,
}

impl TypeRef {
    /// Creates a type reference from a dotted class name (`java.lang.String`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The fully qualified, dotted name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without its package prefix.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_name())
    }
}

/// A reference to a method on a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Class declaring the method.
    pub owner: TypeRef,
    /// Method name; initializers use `<init>`.
    pub name: String,
    /// Type of the value the call produces.
    pub returns: ValueType,
}

impl MethodRef {
    /// Name the bytecode gives to instance initializers.
    pub const INITIALIZER: &'static str = "<init>";

    /// Creates a method reference.
    #[must_use]
    pub fn new(owner: TypeRef, name: impl Into<String>, returns: ValueType) -> Self {
        Self {
            owner,
            name: name.into(),
            returns,
        }
    }

    /// Creates a reference to the initializer of `owner`.
    #[must_use]
    pub fn initializer(owner: TypeRef) -> Self {
        Self::new(owner, Self::INITIALIZER, ValueType::Void)
    }

    /// Returns `true` if this method is an instance initializer.
    #[must_use]
    pub fn is_initializer(&self) -> bool {
        self.name == Self::INITIALIZER
    }
}

/// The computational type of a value.
///
/// This is deliberately coarse: it distinguishes what the condensation passes
/// need to know (is this a boolean, can it be compared against zero) rather
/// than modelling the full class hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// `boolean`.
    Boolean,
    /// `byte`, `char`, `short` and `int` all compute as int.
    Int,
    /// `long`.
    Long,
    /// `float`.
    Float,
    /// `double`.
    Double,
    /// An object reference of a known class.
    Reference(TypeRef),
    /// The null type.
    Null,
    /// No value (void method results).
    Void,
    /// Not known yet.
    #[default]
    Unknown,
}

impl ValueType {
    /// Returns `true` if this is the boolean type.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }

    /// Returns `true` for the integral types that can raise division faults.
    #[must_use]
    pub const fn is_integral(&self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Int => f.write_str("int"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Reference(ty) => write!(f, "{ty}"),
            Self::Null => f.write_str("null"),
            Self::Void => f.write_str("void"),
            Self::Unknown => f.write_str("?"),
        }
    }
}

/// A typed reference to a stack value, as it appears inside expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackValue {
    /// Identity of the value.
    pub id: StackValueId,
    /// Type assigned by the lifter.
    pub ty: ValueType,
}

impl StackValue {
    /// Creates a typed stack value reference.
    #[must_use]
    pub const fn new(id: StackValueId, ty: ValueType) -> Self {
        Self { id, ty }
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Per-method table of stack values and their use counts.
///
/// Values are allocated sequentially, so a [`StackValueId`] doubles as an index
/// into the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageTable {
    entries: Vec<UsageEntry>,
}

#[derive(Debug, Clone, PartialEq)]
struct UsageEntry {
    ty: ValueType,
    uses: usize,
}

impl UsageTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh stack value with no recorded uses.
    pub fn allocate(&mut self, ty: ValueType) -> StackValue {
        let id = StackValueId::new(self.entries.len());
        self.entries.push(UsageEntry {
            ty: ty.clone(),
            uses: 0,
        });
        StackValue::new(id, ty)
    }

    /// Number of values allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no values were allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The type recorded for `id`, if the value exists.
    #[must_use]
    pub fn value_type(&self, id: StackValueId) -> Option<&ValueType> {
        self.entries.get(id.index()).map(|e| &e.ty)
    }

    /// Current use count of `id`; unknown values count as zero.
    #[must_use]
    pub fn uses(&self, id: StackValueId) -> usize {
        self.entries.get(id.index()).map_or(0, |e| e.uses)
    }

    /// Records one more use of `id`.
    pub fn increment(&mut self, id: StackValueId) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.uses += 1;
        }
    }

    /// Retires one use of `id`. Saturates at zero.
    pub fn decrement(&mut self, id: StackValueId) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.uses = entry.uses.saturating_sub(1);
        }
    }

    /// Overwrites the use count of `id`.
    pub fn set_uses(&mut self, id: StackValueId, uses: usize) {
        if let Some(entry) = self.entries.get_mut(id.index()) {
            entry.uses = uses;
        }
    }

    /// Resets every use count to zero, keeping the allocated values.
    pub fn clear_uses(&mut self) {
        for entry in &mut self.entries {
            entry.uses = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_sequential() {
        let mut table = UsageTable::new();
        let a = table.allocate(ValueType::Int);
        let b = table.allocate(ValueType::Boolean);

        assert_eq!(a.id.index(), 0);
        assert_eq!(b.id.index(), 1);
        assert_eq!(table.value_type(b.id), Some(&ValueType::Boolean));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_use_counts() {
        let mut table = UsageTable::new();
        let v = table.allocate(ValueType::Int);

        table.increment(v.id);
        table.increment(v.id);
        assert_eq!(table.uses(v.id), 2);

        table.decrement(v.id);
        table.decrement(v.id);
        table.decrement(v.id);
        assert_eq!(table.uses(v.id), 0);
    }

    #[test]
    fn test_unknown_value_has_no_uses() {
        let mut table = UsageTable::new();
        table.increment(StackValueId::new(7));
        assert_eq!(table.uses(StackValueId::new(7)), 0);
        assert!(table.value_type(StackValueId::new(7)).is_none());
    }

    #[test]
    fn test_type_ref_names() {
        let ty = TypeRef::new("java.lang.StringBuilder");
        assert_eq!(ty.simple_name(), "StringBuilder");
        assert_eq!(ty.to_string(), "StringBuilder");
        assert_eq!(TypeRef::new("Plain").simple_name(), "Plain");
    }

    #[test]
    fn test_initializer_ref() {
        let init = MethodRef::initializer(TypeRef::new("a.B"));
        assert!(init.is_initializer());
        assert_eq!(init.returns, ValueType::Void);
    }
}
