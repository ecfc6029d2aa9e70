//! Ordinary compound types.
//!
//! Classes have the same slot machinery as records but none of the record
//! guarantees: their fields may be mutable, `final` is an ordinary modifier
//! that accessible reflection can override, and instances compare by
//! identity.

use std::{fmt, sync::Arc};

use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::{
    access::{self, AccessPath, Modifiers, SlotDescriptor, SlotStore},
    annotations::{Annotation, Annotations},
    exceptions::Condition,
    symbols::Symbol,
    value::{Value, ValueType},
};

#[derive(Debug)]
pub struct Class {
    name: Symbol,
    fields: Box<[SlotDescriptor]>,
    annotations: Annotations,
}

impl Class {
    pub fn builder(name: impl Into<Symbol>) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            fields: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn fields(&self) -> &[SlotDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SlotDescriptor> {
        let name = Symbol::lookup(name)?;
        self.fields.iter().find(|slot| slot.name == name)
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// The class's single constructor. It assigns every field, in
    /// declaration order.
    pub fn instantiate(self: &Arc<Self>, values: Vec<Value>) -> Result<Object, Condition> {
        if values.len() != self.fields.len() {
            return Err(Condition::wrong_num_of_args(self.fields.len(), values.len()));
        }
        for (slot, value) in self.fields.iter().zip(&values) {
            slot.check_type(value)?;
        }
        Ok(Object(Arc::new(ObjectInner {
            class: self.clone(),
            slots: values.into_iter().map(RwLock::new).collect(),
        })))
    }

    /// An instance with every field at its type's default value.
    pub fn instantiate_default(self: &Arc<Self>) -> Object {
        Object(Arc::new(ObjectInner {
            class: self.clone(),
            slots: self
                .fields
                .iter()
                .map(|slot| RwLock::new(slot.ty.default_value()))
                .collect(),
        }))
    }
}

pub struct ClassBuilder {
    name: Symbol,
    fields: Vec<(Symbol, ValueType, Modifiers, Vec<Annotation>)>,
    annotations: Vec<Annotation>,
}

impl ClassBuilder {
    pub fn field(self, name: impl Into<Symbol>, ty: ValueType, modifiers: Modifiers) -> Self {
        self.annotated_field(name, ty, modifiers, Vec::new())
    }

    pub fn annotated_field(
        mut self,
        name: impl Into<Symbol>,
        ty: ValueType,
        modifiers: Modifiers,
        annotations: Vec<Annotation>,
    ) -> Self {
        self.fields.push((name.into(), ty, modifiers, annotations));
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn build(self) -> Result<Arc<Class>, Condition> {
        let mut seen = IndexSet::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());
        for (index, (name, ty, modifiers, annotations)) in self.fields.into_iter().enumerate() {
            if !seen.insert(name) {
                return Err(Condition::duplicate_component(self.name, name));
            }
            fields.push(SlotDescriptor::class_field(
                name,
                ty,
                modifiers,
                annotations.into(),
                index,
            ));
        }

        tracing::debug!(class = %self.name, fields = fields.len(), "declared class");

        Ok(Arc::new(Class {
            name: self.name,
            fields: fields.into_boxed_slice(),
            annotations: Annotations::from(self.annotations),
        }))
    }
}

struct ObjectInner {
    class: Arc<Class>,
    slots: Box<[RwLock<Value>]>,
}

/// An instance of a class. Cloning shares the instance.
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

impl Object {
    pub fn class(&self) -> &Arc<Class> {
        &self.0.class
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Compiled field read.
    pub fn get(&self, name: &str) -> Result<Value, Condition> {
        let index = access::find_slot(self, name)?;
        access::checked_load(self, index, AccessPath::Direct)
    }

    /// Compiled field assignment. Final fields refuse.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), Condition> {
        let index = access::find_slot(self, name)?;
        access::checked_store(self, index, value.into(), AccessPath::Direct)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.name, self.addr())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl SlotStore for Object {
    fn owner(&self) -> Symbol {
        self.0.class.name
    }

    fn layout(&self) -> &[SlotDescriptor] {
        &self.0.class.fields
    }

    fn load(&self, index: usize) -> Value {
        self.0.slots[index].read().clone()
    }

    fn store(&self, index: usize, value: Value) -> Result<(), Condition> {
        *self.0.slots[index].write() = value;
        Ok(())
    }

    fn compare_exchange(
        &self,
        index: usize,
        expected: Option<&Value>,
        new: Value,
    ) -> Result<Result<Value, Value>, Condition> {
        let mut slot = self.0.slots[index].write();
        match expected {
            Some(expected) if *slot != *expected => Ok(Err(slot.clone())),
            _ => Ok(Ok(std::mem::replace(&mut *slot, new))),
        }
    }
}
