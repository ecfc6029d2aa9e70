//! Metadata tags attached to types, components, fields and parameters.
//!
//! The record model carries annotations and hands them back on request. It
//! never interprets them.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::symbols::Symbol;

/// Name of the element a bare annotation argument is bound to, as in
/// `@Tag("a")`.
pub const VALUE_ELEMENT: &str = "value";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationValue {
    Boolean(bool),
    Integer(i64),
    String(Arc<str>),
    Annotation(Annotation),
    Array(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn as_annotation(&self) -> Option<&Annotation> {
        match self {
            Self::Annotation(annotation) => Some(annotation),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AnnotationValue]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for AnnotationValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for AnnotationValue {
    fn from(i: i32) -> Self {
        Self::Integer(i as i64)
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        Self::String(Arc::from(s))
    }
}

impl From<Annotation> for AnnotationValue {
    fn from(annotation: Annotation) -> Self {
        Self::Annotation(annotation)
    }
}

impl From<Vec<AnnotationValue>> for AnnotationValue {
    fn from(values: Vec<AnnotationValue>) -> Self {
        Self::Array(values)
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::String(s) => write!(f, "{:?}", s.as_ref()),
            Self::Annotation(a) => write!(f, "{a}"),
            Self::Array(values) => {
                write!(f, "{{")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A single tag: a name plus named elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    name: Symbol,
    elements: IndexMap<Symbol, AnnotationValue>,
}

impl Annotation {
    pub fn new(name: impl Into<Symbol>) -> Self {
        Self {
            name: name.into(),
            elements: IndexMap::new(),
        }
    }

    /// Builder style element insertion. A later element with the same name
    /// replaces an earlier one.
    pub fn with(mut self, element: impl Into<Symbol>, value: impl Into<AnnotationValue>) -> Self {
        self.elements.insert(element.into(), value.into());
        self
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    pub fn element(&self, name: &str) -> Option<&AnnotationValue> {
        self.elements.get(&Symbol::lookup(name)?)
    }

    /// The element bound by a bare argument.
    pub fn value(&self) -> Option<&AnnotationValue> {
        self.element(VALUE_ELEMENT)
    }

    pub fn elements(&self) -> impl Iterator<Item = (Symbol, &AnnotationValue)> {
        self.elements.iter().map(|(k, v)| (*k, v))
    }

    /// The annotations held by this one when it is a container, i.e. its
    /// `value` element is an array of annotations.
    pub fn contained(&self) -> impl Iterator<Item = &Annotation> {
        self.value()
            .and_then(AnnotationValue::as_array)
            .unwrap_or_default()
            .iter()
            .filter_map(AnnotationValue::as_annotation)
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if self.elements.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, (name, value)) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, ")")
    }
}

/// An immutable, cheaply clonable list of annotations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Annotations(Arc<[Annotation]>);

impl Annotations {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self(Arc::from(annotations))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    /// The directly present annotation with the given name.
    pub fn get(&self, name: &str) -> Option<&Annotation> {
        let name = Symbol::lookup(name)?;
        self.0.iter().find(|a| a.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every annotation of the given name, whether directly present or held
    /// by a container annotation.
    pub fn by_type(&self, name: &str) -> Vec<&Annotation> {
        let Some(name) = Symbol::lookup(name) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        for annotation in self.0.iter() {
            if annotation.name == name {
                found.push(annotation);
            } else {
                found.extend(annotation.contained().filter(|a| a.name == name));
            }
        }
        found
    }
}

impl From<Vec<Annotation>> for Annotations {
    fn from(annotations: Vec<Annotation>) -> Self {
        Self::new(annotations)
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_and_repeated_tags() {
        let annotations = Annotations::new(vec![
            Annotation::new("Single").with(VALUE_ELEMENT, "s"),
            Annotation::new("Tags").with(
                VALUE_ELEMENT,
                vec![
                    AnnotationValue::from(Annotation::new("Tag").with(VALUE_ELEMENT, "a")),
                    AnnotationValue::from(Annotation::new("Tag").with(VALUE_ELEMENT, "b")),
                ],
            ),
            Annotation::new("Outer").with("inner", Annotation::new("Inner").with("level", 2)),
        ]);

        assert_eq!(annotations.len(), 3);
        assert_eq!(
            annotations.get("Single").and_then(|a| a.value()).and_then(|v| v.as_str()),
            Some("s")
        );

        let tags = annotations.by_type("Tag");
        let values: Vec<_> = tags
            .iter()
            .filter_map(|t| t.value().and_then(AnnotationValue::as_str))
            .collect();
        assert_eq!(values, ["a", "b"]);
        assert!(annotations.get("Tag").is_none());

        let inner = annotations
            .get("Outer")
            .and_then(|a| a.element("inner"))
            .and_then(AnnotationValue::as_annotation)
            .unwrap();
        assert_eq!(inner.name(), "Inner");
        assert_eq!(inner.element("level").and_then(|v| v.as_integer()), Some(2));
    }

    #[test]
    fn display() {
        let annotation = Annotation::new("Range").with("min", 0).with("max", 10);
        assert_eq!(annotation.to_string(), "@Range(min=0, max=10)");
    }
}
