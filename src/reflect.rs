//! Reflective introspection.
//!
//! Reflection hands out descriptors for the fields, constructor and (for
//! records) components of a type. Reflective reads and writes go through the
//! same slot guard as compiled code; suppressing visibility checks with
//! [`Field::set_accessible`] relaxes ordinary fields only.

use std::sync::Arc;

use crate::{
    access::{self, AccessPath, Modifiers, SlotDescriptor, SlotStore},
    annotations::Annotations,
    classes::Class,
    exceptions::Condition,
    records::{RecordComponent, RecordType},
    symbols::Symbol,
    value::{Value, ValueType},
};

/// A reference to a declared type.
#[derive(Clone, Debug)]
pub enum TypeRef {
    Record(Arc<RecordType>),
    Class(Arc<Class>),
}

impl TypeRef {
    /// The type of a record or object value.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Record(record) => Some(Self::Record(record.rtd().clone())),
            Value::Object(object) => Some(Self::Class(object.class().clone())),
            _ => None,
        }
    }

    pub fn name(&self) -> Symbol {
        match self {
            Self::Record(rtd) => rtd.name(),
            Self::Class(class) => class.name(),
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub fn annotations(&self) -> &Annotations {
        match self {
            Self::Record(rtd) => rtd.annotations(),
            Self::Class(class) => class.annotations(),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Record(a), Self::Record(b)) => Arc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The slot type that holds instances of this type.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Record(rtd) => ValueType::record(rtd),
            Self::Class(class) => ValueType::object(class),
        }
    }

    pub(crate) fn layout(&self) -> &[SlotDescriptor] {
        match self {
            Self::Record(rtd) => rtd.slots(),
            Self::Class(class) => class.fields(),
        }
    }

    pub(crate) fn slot_index(&self, name: &str) -> Result<usize, Condition> {
        Symbol::lookup(name)
            .and_then(|symbol| self.layout().iter().position(|slot| slot.name() == symbol))
            .ok_or_else(|| Condition::no_such_field(self.name(), name))
    }

    /// The slot storage of `target`, provided it is an instance of this type.
    pub(crate) fn receiver<'a>(&self, target: &'a Value) -> Result<&'a dyn SlotStore, Condition> {
        match (self, target) {
            (Self::Record(rtd), Value::Record(record)) if record.is_instance_of(rtd) => {
                Ok(record as &dyn SlotStore)
            }
            (Self::Class(class), Value::Object(object)) if Arc::ptr_eq(class, object.class()) => {
                Ok(object as &dyn SlotStore)
            }
            _ => Err(Condition::illegal_argument(format!(
                "{} is not an instance of {}",
                target.type_name(),
                self.name()
            ))),
        }
    }

    pub fn declared_fields(&self) -> Vec<Field> {
        (0..self.layout().len())
            .map(|index| Field::new(self.clone(), index))
            .collect()
    }

    pub fn declared_field(&self, name: &str) -> Result<Field, Condition> {
        Ok(Field::new(self.clone(), self.slot_index(name)?))
    }

    /// Both records and classes declare exactly one constructor.
    pub fn declared_constructors(&self) -> Vec<Constructor> {
        vec![Constructor::new(self.clone())]
    }

    /// The record components, or `None` if this is not a record type.
    pub fn record_components(&self) -> Option<Vec<Component>> {
        match self {
            Self::Record(rtd) => Some(
                rtd.components()
                    .map(|component| Component {
                        owner: rtd.clone(),
                        component: component.clone(),
                    })
                    .collect(),
            ),
            Self::Class(_) => None,
        }
    }
}

impl From<Arc<RecordType>> for TypeRef {
    fn from(rtd: Arc<RecordType>) -> Self {
        Self::Record(rtd)
    }
}

impl From<Arc<Class>> for TypeRef {
    fn from(class: Arc<Class>) -> Self {
        Self::Class(class)
    }
}

/// A reflective view of one declared field.
#[derive(Clone, Debug)]
pub struct Field {
    owner: TypeRef,
    index: usize,
    accessible: bool,
}

impl Field {
    fn new(owner: TypeRef, index: usize) -> Self {
        Self {
            owner,
            index,
            accessible: false,
        }
    }

    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    pub fn descriptor(&self) -> &SlotDescriptor {
        &self.owner.layout()[self.index]
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Symbol {
        self.descriptor().name()
    }

    pub fn ty(&self) -> &ValueType {
        self.descriptor().ty()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.descriptor().modifiers()
    }

    pub fn annotations(&self) -> &Annotations {
        self.descriptor().annotations()
    }

    pub fn is_final(&self) -> bool {
        self.descriptor().is_final()
    }

    pub fn is_accessible(&self) -> bool {
        self.accessible
    }

    /// Suppress (or restore) visibility checks for this field object. Has no
    /// bearing on record components.
    pub fn set_accessible(&mut self, flag: bool) {
        self.accessible = flag;
    }

    fn path(&self) -> AccessPath {
        AccessPath::Reflective {
            accessible: self.accessible,
        }
    }

    pub fn get(&self, target: &Value) -> Result<Value, Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_load(store, self.index, self.path())
    }

    pub fn set(&self, target: &Value, value: impl Into<Value>) -> Result<(), Condition> {
        let store = self.owner.receiver(target)?;
        access::checked_store(store, self.index, value.into(), self.path())
    }
}

/// A constructor parameter.
#[derive(Clone, Debug)]
pub struct Parameter {
    name: Symbol,
    ty: ValueType,
    name_present: bool,
    annotations: Annotations,
}

impl Parameter {
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    /// Whether [`Parameter::name`] is the declared name rather than a
    /// synthesized `argN`. Only record constructors guarantee it.
    pub fn is_name_present(&self) -> bool {
        self.name_present
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

/// A reflective view of a type's constructor.
#[derive(Clone, Debug)]
pub struct Constructor {
    owner: TypeRef,
    parameters: Vec<Parameter>,
}

impl Constructor {
    fn new(owner: TypeRef) -> Self {
        let parameters = match &owner {
            TypeRef::Record(rtd) => rtd
                .components()
                .map(|component| Parameter {
                    name: component.name(),
                    ty: component.ty().clone(),
                    name_present: true,
                    annotations: component.annotations().clone(),
                })
                .collect(),
            TypeRef::Class(class) => class
                .fields()
                .iter()
                .enumerate()
                .map(|(i, slot)| Parameter {
                    name: Symbol::intern(&format!("arg{i}")),
                    ty: slot.ty().clone(),
                    name_present: false,
                    annotations: Annotations::default(),
                })
                .collect(),
        };
        Self { owner, parameters }
    }

    pub fn owner(&self) -> &TypeRef {
        &self.owner
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn new_instance(&self, args: Vec<Value>) -> Result<Value, Condition> {
        match &self.owner {
            TypeRef::Record(rtd) => Ok(Value::from(rtd.construct(args)?)),
            TypeRef::Class(class) => Ok(Value::from(class.instantiate(args)?)),
        }
    }
}

/// A reflective view of one record component, with its accessor.
#[derive(Clone, Debug)]
pub struct Component {
    owner: Arc<RecordType>,
    component: RecordComponent,
}

impl Component {
    pub fn declaring_record(&self) -> &Arc<RecordType> {
        &self.owner
    }

    pub fn name(&self) -> Symbol {
        self.component.name()
    }

    pub fn ty(&self) -> &ValueType {
        self.component.ty()
    }

    pub fn annotations(&self) -> &Annotations {
        self.component.annotations()
    }

    pub fn index(&self) -> usize {
        self.component.index()
    }

    /// Invoke the public accessor of this component on `target`.
    pub fn access(&self, target: &Value) -> Result<Value, Condition> {
        let store = TypeRef::Record(self.owner.clone()).receiver(target)?;
        access::checked_load(store, self.component.index(), AccessPath::Direct)
    }
}

/// Everything reflection knows about a type, in declaration order.
#[derive(Clone, Debug)]
pub struct Introspection {
    /// `None` for classes.
    pub components: Option<Vec<Component>>,
    pub constructor: Constructor,
    pub fields: Vec<Field>,
}

pub fn introspect(ty: &TypeRef) -> Introspection {
    Introspection {
        components: ty.record_components(),
        constructor: Constructor::new(ty.clone()),
        fields: ty.declared_fields(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotations::{Annotation, AnnotationValue, VALUE_ELEMENT},
        records::ComponentSpec,
    };

    fn point() -> Arc<RecordType> {
        RecordType::builder("Point")
            .component_spec(
                ComponentSpec::new("x", ValueType::Integer)
                    .annotated(Annotation::new("Positive")),
            )
            .component_spec(
                ComponentSpec::new("y", ValueType::Integer).annotated(
                    Annotation::new("Bounds").with("limit", Annotation::new("Max").with(VALUE_ELEMENT, 10)),
                ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn constructor_mirrors_components() {
        let ty = TypeRef::from(point());
        let view = introspect(&ty);
        let components = view.components.unwrap();
        let names: Vec<_> = components.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["x", "y"]);

        let parameters = view.constructor.parameters();
        assert_eq!(parameters.len(), components.len());
        for (parameter, component) in parameters.iter().zip(&components) {
            assert!(parameter.is_name_present());
            assert_eq!(parameter.name(), component.name());
            assert_eq!(parameter.ty(), component.ty());
        }

        let fields: Vec<_> = view.fields.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(fields, ["x", "y"]);
        assert!(view.fields.iter().all(|f| f.is_final()));
    }

    #[test]
    fn metadata_is_propagated() {
        let ty = TypeRef::from(point());
        let components = ty.record_components().unwrap();
        assert!(components[0].annotations().contains("Positive"));
        let limit = components[1]
            .annotations()
            .get("Bounds")
            .and_then(|a| a.element("limit"))
            .and_then(AnnotationValue::as_annotation)
            .and_then(|a| a.value())
            .and_then(AnnotationValue::as_integer);
        assert_eq!(limit, Some(10));

        let field = ty.declared_field("x").unwrap();
        assert!(field.annotations().contains("Positive"));
        let constructor = &ty.declared_constructors()[0];
        assert!(constructor.parameters()[1].annotations().contains("Bounds"));
    }

    #[test]
    fn reflective_construction_and_access() {
        let rtd = point();
        let ty = TypeRef::from(rtd.clone());
        let constructor = &ty.declared_constructors()[0];
        let reflected = constructor
            .new_instance(vec![Value::from(1), Value::from(2)])
            .unwrap();
        let direct = Value::from(rtd.construct(vec![Value::from(1), Value::from(2)]).unwrap());
        assert_eq!(reflected, direct);

        let components = ty.record_components().unwrap();
        assert_eq!(components[1].access(&direct).unwrap(), Value::from(2));
    }

    #[test]
    fn reflective_writes_on_records_are_refused() {
        let rtd = point();
        let ty = TypeRef::from(rtd.clone());
        let target = Value::from(rtd.construct(vec![Value::from(8), Value::from(0)]).unwrap());

        let mut field = ty.declared_field("x").unwrap();
        assert!(field.get(&target).unwrap_err().is_illegal_access());
        assert!(field.set(&target, 7).unwrap_err().is_illegal_access());

        field.set_accessible(true);
        assert_eq!(field.get(&target).unwrap(), Value::from(8));
        assert!(field.set(&target, 7).unwrap_err().is_illegal_access());
        assert_eq!(field.get(&target).unwrap(), Value::from(8));
    }

    #[test]
    fn class_constructors_hide_parameter_names() {
        let class = Class::builder("Holder")
            .field("x", ValueType::Integer, Modifiers::PRIVATE | Modifiers::FINAL)
            .build()
            .unwrap();
        let ty = TypeRef::from(class);
        assert!(ty.record_components().is_none());
        let constructor = &ty.declared_constructors()[0];
        assert_eq!(constructor.parameter_count(), 1);
        assert!(!constructor.parameters()[0].is_name_present());
        assert_eq!(constructor.parameters()[0].name(), "arg0");
    }

    #[test]
    fn wrong_receiver() {
        let ty = TypeRef::from(point());
        let other = RecordType::declare("Other", [("x", ValueType::Integer)]).unwrap();
        let target = Value::from(other.construct(vec![Value::from(1)]).unwrap());
        let mut field = ty.declared_field("x").unwrap();
        field.set_accessible(true);
        assert!(matches!(field.get(&target), Err(Condition::IllegalArgument(_))));
        assert!(matches!(ty.declared_field("z"), Err(Condition::NoSuchField { .. })));
    }
}
