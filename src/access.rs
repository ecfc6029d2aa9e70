//! Slot descriptors and the write guard.
//!
//! Every way of touching a slot (compiled field access, reflective fields,
//! setter handles and variable handles) funnels through [`checked_load`] and
//! [`checked_store`], which consult [`SlotDescriptor::check_read`] and
//! [`SlotDescriptor::check_write`]. The record-owned flag lives on the
//! descriptor itself, so no handle or visibility override can reach a record
//! slot without passing the guard.

use crate::{
    annotations::Annotations, exceptions::Condition, symbols::Symbol, value::{Value, ValueType},
};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const FINAL = 0x0010;
    }
}

/// The route by which a slot is being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// Field access compiled into the program.
    Direct,
    /// A reflective field or a setter/getter handle unreflected from one.
    /// `accessible` is true when visibility checks have been suppressed.
    Reflective { accessible: bool },
    /// A variable handle from a privileged lookup.
    Handle,
}

/// The storage form of a record component or class field.
#[derive(Clone, Debug)]
pub struct SlotDescriptor {
    pub(crate) name: Symbol,
    pub(crate) ty: ValueType,
    pub(crate) modifiers: Modifiers,
    pub(crate) annotations: Annotations,
    pub(crate) index: usize,
    pub(crate) record_owned: bool,
}

impl SlotDescriptor {
    pub(crate) fn record_component(
        name: Symbol,
        ty: ValueType,
        annotations: Annotations,
        index: usize,
    ) -> Self {
        Self {
            name,
            ty,
            modifiers: Modifiers::PRIVATE | Modifiers::FINAL,
            annotations,
            index,
            record_owned: true,
        }
    }

    pub(crate) fn class_field(
        name: Symbol,
        ty: ValueType,
        modifiers: Modifiers,
        annotations: Annotations,
        index: usize,
    ) -> Self {
        Self {
            name,
            ty,
            modifiers,
            annotations,
            index,
            record_owned: false,
        }
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }

    pub fn is_public(&self) -> bool {
        self.modifiers.contains(Modifiers::PUBLIC)
    }

    /// Whether this slot stores a record component.
    pub fn is_record_owned(&self) -> bool {
        self.record_owned
    }

    pub fn check_read(&self, path: AccessPath) -> Result<(), Condition> {
        match path {
            AccessPath::Reflective { accessible: false } if !self.is_public() => {
                Err(Condition::illegal_access(format!(
                    "cannot read non-public field `{}` without access",
                    self.name
                )))
            }
            _ => Ok(()),
        }
    }

    /// The write policy. Record components refuse every path and are checked
    /// first, so nothing below can relax them. Ordinary final fields give way
    /// to an accessible reflective write but never to a variable handle.
    pub fn check_write(&self, path: AccessPath) -> Result<(), Condition> {
        let denied = if self.record_owned {
            match path {
                AccessPath::Handle => Some(Condition::unsupported(format!(
                    "record component `{}` cannot be written through a variable handle",
                    self.name
                ))),
                _ => Some(Condition::illegal_access(format!(
                    "cannot assign record component `{}`",
                    self.name
                ))),
            }
        } else if self.is_final() {
            match path {
                AccessPath::Reflective { accessible: true } => None,
                AccessPath::Handle => Some(Condition::unsupported(format!(
                    "final field `{}` cannot be written through a variable handle",
                    self.name
                ))),
                _ => Some(Condition::illegal_access(format!(
                    "cannot assign final field `{}`",
                    self.name
                ))),
            }
        } else {
            match path {
                AccessPath::Reflective { accessible: false } if !self.is_public() => {
                    Some(Condition::illegal_access(format!(
                        "cannot write non-public field `{}` without access",
                        self.name
                    )))
                }
                _ => None,
            }
        };

        match denied {
            Some(condition) => {
                tracing::trace!(slot = %self.name, ?path, %condition, "write denied");
                Err(condition)
            }
            None => Ok(()),
        }
    }

    pub(crate) fn check_type(&self, value: &Value) -> Result<(), Condition> {
        if self.ty.accepts(value) {
            Ok(())
        } else {
            Err(Condition::type_error(self.name, &self.ty, &value.type_name()))
        }
    }
}

/// Raw slot storage of an instance. Implementations perform no access
/// checks; go through [`checked_load`] and [`checked_store`] instead.
pub(crate) trait SlotStore {
    fn owner(&self) -> Symbol;

    fn layout(&self) -> &[SlotDescriptor];

    fn load(&self, index: usize) -> Value;

    fn store(&self, index: usize, value: Value) -> Result<(), Condition>;

    /// Swap in `new` only if the slot currently holds `expected`, atomically.
    /// Returns the previous value.
    fn compare_exchange(
        &self,
        index: usize,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<Result<Value, Value>, Condition>;
}

pub(crate) fn find_slot(store: &dyn SlotStore, name: &str) -> Result<usize, Condition> {
    Symbol::lookup(name)
        .and_then(|symbol| store.layout().iter().position(|slot| slot.name == symbol))
        .ok_or_else(|| Condition::no_such_field(store.owner(), name))
}

pub(crate) fn checked_load(
    store: &dyn SlotStore,
    index: usize,
    path: AccessPath,
) -> Result<Value, Condition> {
    store.layout()[index].check_read(path)?;
    Ok(store.load(index))
}

pub(crate) fn checked_store(
    store: &dyn SlotStore,
    index: usize,
    value: Value,
    path: AccessPath,
) -> Result<(), Condition> {
    let slot = &store.layout()[index];
    slot.check_write(path)?;
    slot.check_type(&value)?;
    store.store(index, value)
}

/// Checked compare-and-exchange. `expected` of `None` swaps unconditionally.
pub(crate) fn checked_exchange(
    store: &dyn SlotStore,
    index: usize,
    expected: Option<&Value>,
    value: Value,
    path: AccessPath,
) -> Result<Result<Value, Value>, Condition> {
    let slot = &store.layout()[index];
    slot.check_write(path)?;
    slot.check_type(&value)?;
    store.compare_exchange(index, expected, value)
}
