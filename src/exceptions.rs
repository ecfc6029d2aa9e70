//! Exceptional situations and conditions.

use crate::symbols::Symbol;

/// A signal of some sort of erroneous condition.
///
/// Every failure raised by the record model is a condition. Declaration and
/// construction conditions are raised before any instance exists; access
/// conditions are raised before any slot is touched, so a failed write never
/// leaves partial state behind.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    #[error("component `{component}` declared more than once in `{owner}`")]
    DuplicateComponent { owner: Symbol, component: Symbol },
    #[error("type `{0}` is already declared")]
    DuplicateType(Symbol),
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("expected {expected} arguments, provided {provided}")]
    ArityMismatch { expected: usize, provided: usize },
    #[error("expected value of type {expected} for `{slot}`, provided {provided}")]
    TypeMismatch {
        slot: Symbol,
        expected: String,
        provided: String,
    },
    #[error("no field `{field}` in `{owner}`")]
    NoSuchField { owner: Symbol, field: String },
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
    #[error("illegal access: {0}")]
    IllegalAccess(String),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("validation failed for `{owner}`: {message}")]
    Validation { owner: Symbol, message: String },
}

impl Condition {
    pub fn duplicate_component(owner: Symbol, component: Symbol) -> Self {
        Self::DuplicateComponent { owner, component }
    }

    pub fn duplicate_type(name: Symbol) -> Self {
        Self::DuplicateType(name)
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType(name.into())
    }

    pub fn wrong_num_of_args(expected: usize, provided: usize) -> Self {
        Self::ArityMismatch { expected, provided }
    }

    pub fn type_error(slot: Symbol, expected: impl ToString, provided: &str) -> Self {
        Self::TypeMismatch {
            slot,
            expected: expected.to_string(),
            provided: provided.to_string(),
        }
    }

    /// For when a value cannot be converted into the requested Rust type.
    pub fn conversion_error(expected: &str, provided: &str) -> Self {
        Self::IllegalArgument(format!("could not convert {provided} into {expected}"))
    }

    pub fn no_such_field(owner: Symbol, field: &str) -> Self {
        Self::NoSuchField {
            owner,
            field: field.to_string(),
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub fn illegal_access(message: impl Into<String>) -> Self {
        Self::IllegalAccess(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    /// For use inside record validators.
    pub fn validation(owner: Symbol, message: impl Into<String>) -> Self {
        Self::Validation {
            owner,
            message: message.into(),
        }
    }

    pub fn is_illegal_access(&self) -> bool {
        matches!(self, Self::IllegalAccess(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedOperation(_))
    }
}

impl From<std::convert::Infallible> for Condition {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}
