//! Handles: lower-level accessors produced by a lookup.
//!
//! A privileged [`Lookup`] sees private fields without any visibility
//! override. Its variable handles can read any slot, but they never write a
//! final field, ordinary or record-owned. Setter handles unreflected from a
//! [`Field`] inherit that field's access and are refused outright for record
//! components.

use crate::{
    access::{self, AccessPath},
    exceptions::Condition,
    reflect::{Field, TypeRef},
    value::{Value, ValueType},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    privileged: bool,
}

impl Lookup {
    /// A lookup that can only see public fields.
    pub fn public() -> Self {
        Self { privileged: false }
    }

    /// A lookup with full private access, as if declared inside the type.
    pub fn privileged() -> Self {
        Self { privileged: true }
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    fn check_visible(&self, field: &Field) -> Result<(), Condition> {
        if self.privileged || field.descriptor().is_public() {
            Ok(())
        } else {
            Err(Condition::illegal_access(format!(
                "field `{}` of `{}` is not visible to this lookup",
                field.name(),
                field.owner().name()
            )))
        }
    }

    /// Find the variable handle for a field by name and type.
    pub fn find_var_handle(
        &self,
        owner: &TypeRef,
        name: &str,
        ty: &ValueType,
    ) -> Result<VarHandle, Condition> {
        let field = owner.declared_field(name)?;
        if field.ty() != ty {
            return Err(Condition::type_error(field.name(), field.ty(), &ty.to_string()));
        }
        self.unreflect_var_handle(&field)
    }

    pub fn unreflect_var_handle(&self, field: &Field) -> Result<VarHandle, Condition> {
        self.check_visible(field)?;
        Ok(VarHandle {
            owner: field.owner().clone(),
            index: field.index(),
        })
    }

    /// A getter for the field. Allowed whenever the field itself may be read.
    pub fn unreflect_getter(&self, field: &Field) -> Result<Getter, Condition> {
        if !field.is_accessible() {
            self.check_visible(field)?;
        }
        Ok(Getter {
            owner: field.owner().clone(),
            index: field.index(),
        })
    }

    /// A setter for the field. Checked once here, against the field's own
    /// accessibility; record components are refused even when accessible.
    pub fn unreflect_setter(&self, field: &Field) -> Result<Setter, Condition> {
        let path = AccessPath::Reflective {
            accessible: field.is_accessible() || (self.privileged && !field.is_final()),
        };
        field.descriptor().check_write(path)?;
        Ok(Setter {
            owner: field.owner().clone(),
            index: field.index(),
            path,
        })
    }
}

/// A variable handle on one field of a type.
#[derive(Clone, Debug)]
pub struct VarHandle {
    owner: TypeRef,
    index: usize,
}

impl VarHandle {
    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    pub fn var_type(&self) -> &ValueType {
        self.owner.layout()[self.index].ty()
    }

    pub fn get(&self, target: &Value) -> Result<Value, Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_load(store, self.index, AccessPath::Handle)
    }

    pub fn set(&self, target: &Value, value: impl Into<Value>) -> Result<(), Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_store(store, self.index, value.into(), AccessPath::Handle)
    }

    /// Atomically set the slot to `new` if it currently equals `expected`.
    pub fn compare_and_set(
        &self,
        target: &Value,
        expected: &Value,
        new: impl Into<Value>,
    ) -> Result<bool, Condition> {
        let store = self.owner.receiver(target)?;
        let exchanged = access::checked_exchange(
            store,
            self.index,
            Some(expected),
            new.into(),
            AccessPath::Handle,
        )?;
        Ok(exchanged.is_ok())
    }

    /// Atomically replace the slot, returning the previous value.
    pub fn get_and_set(&self, target: &Value, new: impl Into<Value>) -> Result<Value, Condition> {
        let store = self.owner.receiver(target)?;
        let exchanged =
            access::checked_exchange(store, self.index, None, new.into(), AccessPath::Handle)?;
        Ok(exchanged.unwrap_or_else(|current| current))
    }
}

#[derive(Clone, Debug)]
pub struct Getter {
    owner: TypeRef,
    index: usize,
}

impl Getter {
    pub fn invoke(&self, target: &Value) -> Result<Value, Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_load(store, self.index, AccessPath::Reflective { accessible: true })
    }
}

#[derive(Clone, Debug)]
pub struct Setter {
    owner: TypeRef,
    index: usize,
    path: AccessPath,
}

impl Setter {
    pub fn invoke(&self, target: &Value, value: impl Into<Value>) -> Result<(), Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_store(store, self.index, value.into(), self.path)
    }
}
