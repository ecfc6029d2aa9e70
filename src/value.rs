//! Dynamically typed values and their semantic types.

use std::{
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use by_address::ByAddress;
use ordered_float::OrderedFloat;

use crate::{
    access::{self, AccessPath, SlotStore},
    classes::{Class, Object},
    exceptions::Condition,
    records::{Record, RecordType},
    symbols::Symbol,
};

/// A value that can occupy a slot.
///
/// Primitive values compare by value, strings by content, records
/// structurally and objects by identity.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(OrderedFloat<f64>),
    Character(char),
    String(Arc<str>),
    Symbol(Symbol),
    Record(Record),
    Object(Object),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_name(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Boolean(_) => "boolean".to_string(),
            Self::Integer(_) => "int".to_string(),
            Self::Real(_) => "double".to_string(),
            Self::Character(_) => "char".to_string(),
            Self::String(_) => "String".to_string(),
            Self::Symbol(_) => "Symbol".to_string(),
            Self::Record(record) => record.rtd().name().to_string(),
            Self::Object(object) => object.class().name().to_string(),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The hash code consistent with `==`. Records combine their slots,
    /// everything else hashes its content (or its address, for objects).
    pub fn hash_code(&self) -> u64 {
        match self {
            Self::Null => 0,
            Self::Record(record) => record.hash_code(),
            _ => {
                let mut hasher = DefaultHasher::new();
                self.hash(&mut hasher);
                hasher.finish()
            }
        }
    }

    pub(crate) fn as_slot_store(&self) -> Option<&dyn SlotStore> {
        match self {
            Self::Record(record) => Some(record as &dyn SlotStore),
            Self::Object(object) => Some(object as &dyn SlotStore),
            _ => None,
        }
    }

    /// Read a field of a record or object by name, as compiled code would.
    pub fn get_field(&self, name: &str) -> Result<Value, Condition> {
        let store = self.as_slot_store().ok_or_else(|| {
            Condition::illegal_argument(format!("{} has no fields", self.type_name()))
        })?;
        let index = access::find_slot(store, name)?;
        access::checked_load(store, index, AccessPath::Direct)
    }

    /// Assign a field of a record or object by name, as compiled code would.
    /// Record components and final fields refuse.
    pub fn set_field(&self, name: &str, value: Value) -> Result<(), Condition> {
        let store = self.as_slot_store().ok_or_else(|| {
            Condition::illegal_argument(format!("{} has no fields", self.type_name()))
        })?;
        let index = access::find_slot(store, name)?;
        access::checked_store(store, index, value, AccessPath::Direct)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Character(a), Self::Character(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => (),
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Real(r) => r.hash(state),
            Self::Character(c) => c.hash(state),
            Self::String(s) => s.hash(state),
            Self::Symbol(s) => s.hash(state),
            Self::Record(record) => state.write_u64(record.hash_code()),
            Self::Object(object) => object.addr().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            // Debug formatting keeps the decimal point, so 1.0 and 1 differ.
            // Adding zero folds -0.0 into 0.0, which it equals.
            Self::Real(r) => write!(f, "{:?}", r.0 + 0.0),
            Self::Character(c) => write!(f, "{c:?}"),
            Self::String(s) => write!(f, "{:?}", s.as_ref()),
            Self::Symbol(s) => write!(f, "'{s}"),
            Self::Record(record) => write!(f, "{record}"),
            Self::Object(object) => write!(f, "{object}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Self::Real(OrderedFloat(r))
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Self::Character(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::String(s)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Self::Symbol(s)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Self::Object(object)
    }
}

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Value::from)
    }
}

macro_rules! impl_try_from_value {
    ( $ty:ty, $expected:literal, $( $pat:pat => $out:expr ),+ $(,)? ) => {
        impl TryFrom<Value> for $ty {
            type Error = Condition;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    $( $pat => Ok($out), )+
                    other => Err(Condition::conversion_error($expected, &other.type_name())),
                }
            }
        }
    };
}

impl_try_from_value!(bool, "boolean", Value::Boolean(b) => b);
impl_try_from_value!(i64, "int", Value::Integer(i) => i);
impl_try_from_value!(f64, "double", Value::Real(r) => r.0);
impl_try_from_value!(char, "char", Value::Character(c) => c);
impl_try_from_value!(String, "String", Value::String(s) => s.to_string());
impl_try_from_value!(Arc<str>, "String", Value::String(s) => s);
impl_try_from_value!(Symbol, "Symbol", Value::Symbol(s) => s);
impl_try_from_value!(Record, "record", Value::Record(r) => r);
impl_try_from_value!(Object, "object", Value::Object(o) => o);

impl TryFrom<Value> for i32 {
    type Error = Condition;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let i = i64::try_from(value)?;
        i32::try_from(i).map_err(|_| Condition::conversion_error("int", &format!("{i}")))
    }
}

/// The semantic type of a slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Any,
    Boolean,
    Integer,
    Real,
    Character,
    String,
    Symbol,
    Record(ByAddress<Arc<RecordType>>),
    Object(ByAddress<Arc<Class>>),
}

impl ValueType {
    pub fn record(rtd: &Arc<RecordType>) -> Self {
        Self::Record(ByAddress(rtd.clone()))
    }

    pub fn object(class: &Arc<Class>) -> Self {
        Self::Object(ByAddress(class.clone()))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Self::Boolean | Self::Integer | Self::Real | Self::Character
        )
    }

    /// Whether a value may be stored in a slot of this type. Reference types
    /// admit null, primitives do not.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (ty, Value::Null) => !ty.is_primitive(),
            (Self::Boolean, Value::Boolean(_))
            | (Self::Integer, Value::Integer(_))
            | (Self::Real, Value::Real(_))
            | (Self::Character, Value::Character(_))
            | (Self::String, Value::String(_))
            | (Self::Symbol, Value::Symbol(_)) => true,
            (Self::Record(rtd), Value::Record(record)) => Arc::ptr_eq(rtd, record.rtd()),
            (Self::Object(class), Value::Object(object)) => Arc::ptr_eq(class, object.class()),
            _ => false,
        }
    }

    /// The value a slot of this type holds before it is assigned.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Boolean => Value::Boolean(false),
            Self::Integer => Value::Integer(0),
            Self::Real => Value::Real(OrderedFloat(0.0)),
            Self::Character => Value::Character('\0'),
            _ => Value::Null,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "int"),
            Self::Real => write!(f, "double"),
            Self::Character => write!(f, "char"),
            Self::String => write!(f, "String"),
            Self::Symbol => write!(f, "Symbol"),
            Self::Record(rtd) => write!(f, "{}", rtd.name()),
            Self::Object(class) => write!(f, "{}", class.name()),
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

/// Rust types with a fixed slot type.
pub trait Typed {
    fn value_type() -> ValueType;
}

macro_rules! impl_typed {
    ( $( $ty:ty => $vt:expr ),+ $(,)? ) => {
        $(
            impl Typed for $ty {
                fn value_type() -> ValueType {
                    $vt
                }
            }
        )+
    };
}

impl_typed! {
    bool => ValueType::Boolean,
    i64 => ValueType::Integer,
    i32 => ValueType::Integer,
    f64 => ValueType::Real,
    char => ValueType::Character,
    String => ValueType::String,
    Arc<str> => ValueType::String,
    Symbol => ValueType::Symbol,
    Record => ValueType::Any,
    Object => ValueType::Any,
    Value => ValueType::Any,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals_use_total_equality() {
        let nan = Value::from(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(nan.hash_code(), Value::from(f64::NAN).hash_code());
        assert_eq!(Value::from(0.0), Value::from(-0.0));
        assert_eq!(Value::from(0.0).hash_code(), Value::from(-0.0).hash_code());
    }

    #[test]
    fn display_keeps_kinds_apart() {
        assert_eq!(Value::from(1).to_string(), "1");
        assert_eq!(Value::from(1.0).to_string(), "1.0");
        assert_eq!(Value::from("1").to_string(), "\"1\"");
        assert_eq!(Value::from('1').to_string(), "'1'");
        assert_eq!(Value::from(Symbol::intern("null")).to_string(), "'null");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(-0.0).to_string(), "0.0");
    }

    #[test]
    fn primitives_reject_null() {
        assert!(!ValueType::Integer.accepts(&Value::Null));
        assert!(ValueType::String.accepts(&Value::Null));
        assert!(ValueType::Any.accepts(&Value::from(3)));
        assert!(!ValueType::Integer.accepts(&Value::from("3")));
    }

    #[test]
    fn conversions() {
        assert_eq!(i64::try_from(Value::from(7)), Ok(7));
        assert_eq!(i32::try_from(Value::from(i64::MAX)).map_err(|_| ()), Err(()));
        assert!(bool::try_from(Value::from(1)).is_err());
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }
}
