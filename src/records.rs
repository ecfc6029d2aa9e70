//! Record types.
//!
//! A record type is a named, ordered list of components. Declaring one
//! derives everything else from that list: one private final storage slot per
//! component, the canonical constructor, and the canonical equality, hash and
//! string form of its instances. Instances are frozen at construction.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    access::{SlotDescriptor, SlotStore},
    annotations::{Annotation, Annotations},
    exceptions::Condition,
    symbols::Symbol,
    value::{Value, ValueType},
};

/// Multiplier of the canonical hash: `hash = hash * 31 + slot_hash`, over the
/// slots in component order, starting from zero.
pub const HASH_MULTIPLIER: u64 = 31;

/// The body of a compact canonical constructor. Runs after arity and type
/// checks, before the slots are frozen, and may reject or normalize the
/// arguments.
pub type Validator = Arc<dyn Fn(&mut [Value]) -> Result<(), Condition> + Send + Sync>;

/// One declared component of a record type.
#[derive(Clone, Debug)]
pub struct RecordComponent {
    name: Symbol,
    ty: ValueType,
    annotations: Annotations,
    index: usize,
}

impl RecordComponent {
    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn ty(&self) -> &ValueType {
        &self.ty
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// A component as written in a declaration.
#[derive(Clone, Debug)]
pub struct ComponentSpec {
    name: Symbol,
    ty: ValueType,
    annotations: Vec<Annotation>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<Symbol>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

impl<N: Into<Symbol>> From<(N, ValueType)> for ComponentSpec {
    fn from((name, ty): (N, ValueType)) -> Self {
        Self::new(name, ty)
    }
}

/// Type declaration for a record.
#[derive(derive_more::Debug)]
pub struct RecordType {
    name: Symbol,
    components: IndexMap<Symbol, RecordComponent>,
    slots: Box<[SlotDescriptor]>,
    annotations: Annotations,
    #[debug(skip)]
    validator: Option<Validator>,
}

impl RecordType {
    pub fn builder(name: impl Into<Symbol>) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.into(),
            components: Vec::new(),
            annotations: Vec::new(),
            validator: None,
        }
    }

    /// Declare a record type from its ordered components.
    pub fn declare<C>(
        name: impl Into<Symbol>,
        components: impl IntoIterator<Item = C>,
    ) -> Result<Arc<Self>, Condition>
    where
        C: Into<ComponentSpec>,
    {
        let mut builder = Self::builder(name);
        builder.components = components.into_iter().map(Into::into).collect();
        builder.build()
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Components in declaration order.
    pub fn components(&self) -> impl ExactSizeIterator<Item = &RecordComponent> {
        self.components.values()
    }

    pub fn component(&self, name: &str) -> Option<&RecordComponent> {
        self.components.get(&Symbol::lookup(name)?)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Storage slots, one per component and in the same order.
    pub fn slots(&self) -> &[SlotDescriptor] {
        &self.slots
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    /// The canonical constructor.
    pub fn construct(self: &Arc<Self>, mut values: Vec<Value>) -> Result<Record, Condition> {
        if values.len() != self.components.len() {
            return Err(Condition::wrong_num_of_args(
                self.components.len(),
                values.len(),
            ));
        }
        self.check_types(&values)?;
        if let Some(validator) = &self.validator {
            validator(values.as_mut_slice())?;
            // Normalized arguments must still fit their components.
            self.check_types(&values)?;
        }
        Ok(Record::from_parts_unchecked(self.clone(), values))
    }

    fn check_types(&self, values: &[Value]) -> Result<(), Condition> {
        for (slot, value) in self.slots.iter().zip(values) {
            slot.check_type(value)?;
        }
        Ok(())
    }

    pub fn is_subtype_of(lhs: &Arc<Self>, rhs: &Arc<Self>) -> bool {
        // Records are implicitly final, so subtyping is identity.
        Arc::ptr_eq(lhs, rhs)
    }
}

pub struct RecordTypeBuilder {
    name: Symbol,
    components: Vec<ComponentSpec>,
    annotations: Vec<Annotation>,
    validator: Option<Validator>,
}

impl RecordTypeBuilder {
    pub fn component(mut self, name: impl Into<Symbol>, ty: ValueType) -> Self {
        self.components.push(ComponentSpec::new(name, ty));
        self
    }

    pub fn component_spec(mut self, spec: ComponentSpec) -> Self {
        self.components.push(spec);
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&mut [Value]) -> Result<(), Condition> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn build(self) -> Result<Arc<RecordType>, Condition> {
        let mut components = IndexMap::with_capacity(self.components.len());
        let mut slots = Vec::with_capacity(self.components.len());
        for (index, spec) in self.components.into_iter().enumerate() {
            if components.contains_key(&spec.name) {
                return Err(Condition::duplicate_component(self.name, spec.name));
            }
            let annotations = Annotations::from(spec.annotations);
            slots.push(SlotDescriptor::record_component(
                spec.name,
                spec.ty.clone(),
                annotations.clone(),
                index,
            ));
            components.insert(
                spec.name,
                RecordComponent {
                    name: spec.name,
                    ty: spec.ty,
                    annotations,
                    index,
                },
            );
        }

        tracing::debug!(
            record = %self.name,
            components = components.len(),
            "declared record type"
        );

        Ok(Arc::new(RecordType {
            name: self.name,
            components,
            slots: slots.into_boxed_slice(),
            annotations: Annotations::from(self.annotations),
            validator: self.validator,
        }))
    }
}

struct RecordInner {
    rtd: Arc<RecordType>,
    slots: Box<[Value]>,
}

/// An instance of a record type. Cloning shares the frozen slots.
#[derive(Clone)]
pub struct Record(Arc<RecordInner>);

impl Record {
    /// Only called once the canonical constructor has checked `slots`.
    fn from_parts_unchecked(rtd: Arc<RecordType>, slots: Vec<Value>) -> Self {
        Self(Arc::new(RecordInner {
            rtd,
            slots: slots.into_boxed_slice(),
        }))
    }

    pub fn from_rust_type<T: RecordCompatible>(t: T) -> Self {
        t.into_record()
    }

    pub fn cast_to_rust_type<T: RecordCompatible>(&self) -> Option<T> {
        T::try_from_record(self).ok()
    }

    pub fn rtd(&self) -> &Arc<RecordType> {
        &self.0.rtd
    }

    pub fn is_instance_of(&self, rtd: &Arc<RecordType>) -> bool {
        Arc::ptr_eq(&self.0.rtd, rtd)
    }

    /// The component accessor.
    pub fn get(&self, name: &str) -> Result<&Value, Condition> {
        self.component_index(name)
            .and_then(|index| self.0.slots.get(index))
            .ok_or_else(|| Condition::no_such_field(self.0.rtd.name, name))
    }

    fn component_index(&self, name: &str) -> Option<usize> {
        self.0.rtd.components.get_index_of(&Symbol::lookup(name)?)
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.0.slots.get(index)
    }

    pub fn slots(&self) -> &[Value] {
        &self.0.slots
    }

    /// A new instance with one component replaced, built through the
    /// canonical constructor. `self` is untouched.
    pub fn with(&self, name: &str, value: impl Into<Value>) -> Result<Record, Condition> {
        let index = self
            .component_index(name)
            .ok_or_else(|| Condition::no_such_field(self.0.rtd.name, name))?;
        let mut values = self.0.slots.to_vec();
        values[index] = value.into();
        self.0.rtd.construct(values)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The canonical hash code.
    pub fn hash_code(&self) -> u64 {
        self.0.slots.iter().fold(0, |hash: u64, slot| {
            hash.wrapping_mul(HASH_MULTIPLIER)
                .wrapping_add(slot.hash_code())
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (Arc::ptr_eq(&self.0.rtd, &other.0.rtd) && self.0.slots == other.0.slots)
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.0.rtd.name)?;
        for (i, (component, value)) in self.0.rtd.components().zip(self.0.slots.iter()).enumerate()
        {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={value}", component.name)?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.0.rtd.name.to_str();
        let mut debug = f.debug_struct(&name);
        for (component, value) in self.0.rtd.components().zip(self.0.slots.iter()) {
            debug.field(&component.name.to_str(), value);
        }
        debug.finish()
    }
}

impl SlotStore for Record {
    fn owner(&self) -> Symbol {
        self.0.rtd.name
    }

    fn layout(&self) -> &[SlotDescriptor] {
        &self.0.rtd.slots
    }

    fn load(&self, index: usize) -> Value {
        self.0.slots[index].clone()
    }

    fn store(&self, index: usize, _value: Value) -> Result<(), Condition> {
        Err(Condition::unsupported(format!(
            "storage of `{}` is frozen (slot {index})",
            self.0.rtd.name
        )))
    }

    fn compare_exchange(
        &self,
        index: usize,
        _expected: Option<&Value>,
        _new: Value,
    ) -> Result<Result<Value, Value>, Condition> {
        Err(Condition::unsupported(format!(
            "storage of `{}` is frozen (slot {index})",
            self.0.rtd.name
        )))
    }
}

/// Rust types that correspond to a record type.
///
/// Usually derived with `#[derive(Record)]`.
pub trait RecordCompatible: Sized {
    fn rtd() -> Arc<RecordType>;

    fn into_record(self) -> Record;

    fn try_from_record(record: &Record) -> Result<Self, Condition>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_integer() -> Arc<RecordType> {
        RecordType::declare("RecordInteger", [("x", ValueType::Integer)]).unwrap()
    }

    #[test]
    fn canonical_methods() {
        let rtd = record_integer();
        let a = rtd.construct(vec![Value::from(9)]).unwrap();
        let b = rtd.construct(vec![Value::from(9)]).unwrap();
        let c = rtd.construct(vec![Value::from(0)]).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
        assert_ne!(a, c);
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a.to_string(), c.to_string());
        assert_eq!(a.to_string(), "RecordInteger[x=9]");
    }

    #[test]
    fn same_name_is_not_same_type() {
        let first = record_integer();
        let second = record_integer();
        let a = first.construct(vec![Value::from(1)]).unwrap();
        let b = second.construct(vec![Value::from(1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_record() {
        let rtd = RecordType::declare("Unit", Vec::<ComponentSpec>::new()).unwrap();
        let a = rtd.construct(vec![]).unwrap();
        let b = rtd.construct(vec![]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), 0);
        assert_eq!(a.to_string(), "Unit[]");
    }

    #[test]
    fn declaration_errors() {
        let err = RecordType::declare(
            "Point",
            [("x", ValueType::Integer), ("x", ValueType::Integer)],
        )
        .unwrap_err();
        assert!(matches!(err, Condition::DuplicateComponent { .. }));
    }

    #[test]
    fn construction_errors() {
        let rtd = RecordType::declare(
            "Point",
            [("x", ValueType::Integer), ("y", ValueType::Integer)],
        )
        .unwrap();
        assert_eq!(
            rtd.construct(vec![Value::from(1)]).unwrap_err(),
            Condition::wrong_num_of_args(2, 1)
        );
        assert!(matches!(
            rtd.construct(vec![Value::from(1), Value::from("2")]),
            Err(Condition::TypeMismatch { .. })
        ));
        assert!(matches!(
            rtd.construct(vec![Value::from(1), Value::Null]),
            Err(Condition::TypeMismatch { .. })
        ));
    }

    #[test]
    fn nested_records_compare_structurally() {
        let point = RecordType::declare(
            "Point",
            [("x", ValueType::Integer), ("y", ValueType::Integer)],
        )
        .unwrap();
        let line = RecordType::declare(
            "Line",
            [
                ("from", ValueType::record(&point)),
                ("to", ValueType::record(&point)),
            ],
        )
        .unwrap();
        let p = |x: i64, y: i64| Value::from(point.construct(vec![x.into(), y.into()]).unwrap());

        let a = line.construct(vec![p(0, 0), p(1, 1)]).unwrap();
        let b = line.construct(vec![p(0, 0), p(1, 1)]).unwrap();
        let c = line.construct(vec![p(0, 0), p(1, 2)]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_code(), b.hash_code());
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "Line[from=Point[x=0, y=0], to=Point[x=1, y=1]]");
    }

    #[test]
    fn validator_normalizes_and_rejects() {
        let rtd = RecordType::builder("Range")
            .component("lo", ValueType::Integer)
            .component("hi", ValueType::Integer)
            .validator(|args| {
                let lo = i64::try_from(args[0].clone())?;
                let hi = i64::try_from(args[1].clone())?;
                if lo > hi {
                    return Err(Condition::validation(Symbol::intern("Range"), "lo > hi"));
                }
                if lo < 0 {
                    args[0] = Value::from(0);
                }
                Ok(())
            })
            .build()
            .unwrap();

        let r = rtd.construct(vec![Value::from(-5), Value::from(3)]).unwrap();
        assert_eq!(r.get("lo").unwrap(), &Value::from(0));
        assert!(matches!(
            rtd.construct(vec![Value::from(4), Value::from(3)]),
            Err(Condition::Validation { .. })
        ));
    }

    #[test]
    fn with_builds_a_new_instance() {
        let rtd = record_integer();
        let a = rtd.construct(vec![Value::from(8)]).unwrap();
        let b = a.with("x", 7).unwrap();
        assert_eq!(a.get("x").unwrap(), &Value::from(8));
        assert_eq!(b.get("x").unwrap(), &Value::from(7));
        assert!(matches!(a.with("y", 1), Err(Condition::NoSuchField { .. })));
        assert!(matches!(a.with("x", "seven"), Err(Condition::TypeMismatch { .. })));
    }

    #[test]
    fn direct_writes_are_refused() {
        let rtd = record_integer();
        let b = Value::from(rtd.construct(vec![Value::from(8)]).unwrap());
        assert!(b.set_field("x", Value::from(7)).unwrap_err().is_illegal_access());
        assert_eq!(b.get_field("x").unwrap(), Value::from(8));
    }
}
