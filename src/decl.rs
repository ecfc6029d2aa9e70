//! Textual type declarations.
//!
//! ```text
//! @Since("1.0") record Point(@Positive int x, int y)
//! class Holder(private final int x, public String label)
//! ```
//!
//! Component and field types are the builtin names (`boolean`, `int`,
//! `long`, `double`, `char`, `String`, `Symbol`, `Object`) or the name of a
//! type already in the registry the declaration is resolved against.
//! `int` and `long` both name the 64-bit integer slot type.

use std::sync::Arc;

use nom::{
    IResult, Finish,
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{
        alpha1, alphanumeric1, char as match_char, digit1, multispace0, satisfy,
    },
    combinator::{all_consuming, map, map_res, not, opt, peek, recognize, value},
    error::{ErrorKind, ParseError},
    multi::{many0, many0_count, many1, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
};

use crate::{
    access::Modifiers,
    annotations::{Annotation, AnnotationValue, VALUE_ELEMENT},
    classes::Class,
    exceptions::Condition,
    records::{ComponentSpec, RecordType},
    reflect::TypeRef,
    registry::Registry,
    value::ValueType,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseDeclError {
    #[error("syntax error at offset {offset} ({kind:?})")]
    Syntax { offset: usize, kind: ErrorKind },
}

#[derive(derive_more::From, thiserror::Error, Debug)]
pub enum DeclError {
    #[error(transparent)]
    Syntax(ParseDeclError),
    #[error(transparent)]
    Condition(Condition),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeclKind {
    Record,
    Class,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    pub annotations: Vec<Annotation>,
    pub modifiers: Modifiers,
    pub ty: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub annotations: Vec<Annotation>,
    pub kind: DeclKind,
    pub name: String,
    pub members: Vec<Member>,
}

/// Parse exactly one declaration.
pub fn parse(src: &str) -> Result<Declaration, ParseDeclError> {
    all_consuming(ws(declaration))(src)
        .finish()
        .map(|(_, decl)| decl)
        .map_err(|e| syntax_error(src, e))
}

/// Parse one or more declarations, optionally separated by `;`.
pub fn parse_all(src: &str) -> Result<Vec<Declaration>, ParseDeclError> {
    all_consuming(many1(terminated(ws(declaration), opt(ws(match_char(';'))))))(src)
        .finish()
        .map(|(_, decls)| decls)
        .map_err(|e| syntax_error(src, e))
}

fn syntax_error(src: &str, error: nom::error::Error<&str>) -> ParseDeclError {
    ParseDeclError::Syntax {
        offset: src.len() - error.input.len(),
        kind: error.code,
    }
}

fn ws<'a, F, O, E>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
    E: ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(i: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(i)
}

fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(peek(satisfy(|c| c.is_alphanumeric() || c == '_'))))
}

fn integer(i: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(match_char('-')), digit1)), str::parse)(i)
}

fn string(i: &str) -> IResult<&str, String> {
    delimited(
        match_char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((
                    value("\\", tag("\\")),
                    value("\"", tag("\"")),
                    value("\n", tag("n")),
                    value("\t", tag("t")),
                )),
            )),
            Option::unwrap_or_default,
        ),
        match_char('"'),
    )(i)
}

fn annotation_value(i: &str) -> IResult<&str, AnnotationValue> {
    alt((
        map(integer, AnnotationValue::Integer),
        map(string, |s| AnnotationValue::String(Arc::from(s))),
        value(AnnotationValue::Boolean(true), keyword("true")),
        value(AnnotationValue::Boolean(false), keyword("false")),
        map(annotation, AnnotationValue::Annotation),
        map(
            delimited(
                ws(match_char('{')),
                separated_list0(ws(match_char(',')), ws(annotation_value)),
                ws(match_char('}')),
            ),
            AnnotationValue::Array,
        ),
    ))(i)
}

fn element(i: &str) -> IResult<&str, (&str, AnnotationValue)> {
    alt((
        separated_pair(ws(identifier), match_char('='), ws(annotation_value)),
        map(ws(annotation_value), |v| (VALUE_ELEMENT, v)),
    ))(i)
}

fn annotation(start: &str) -> IResult<&str, Annotation> {
    let (i, name) = preceded(match_char('@'), identifier)(start)?;
    let (i, elements) = opt(delimited(
        ws(match_char('(')),
        separated_list0(match_char(','), element),
        match_char(')'),
    ))(i)?;
    let mut annotation = Annotation::new(name);
    for (element, value) in elements.unwrap_or_default() {
        if annotation.element(element).is_some() {
            // Element names are unique within one annotation.
            return Err(nom::Err::Failure(nom::error::Error::new(
                start,
                ErrorKind::Verify,
            )));
        }
        annotation = annotation.with(element, value);
    }
    Ok((i, annotation))
}

fn modifier(i: &str) -> IResult<&str, Modifiers> {
    alt((
        value(Modifiers::PUBLIC, keyword("public")),
        value(Modifiers::PRIVATE, keyword("private")),
        value(Modifiers::FINAL, keyword("final")),
    ))(i)
}

enum Prefix {
    Annotation(Annotation),
    Modifier(Modifiers),
}

fn member(i: &str) -> IResult<&str, Member> {
    map(
        tuple((
            many0(ws(alt((
                map(annotation, Prefix::Annotation),
                map(modifier, Prefix::Modifier),
            )))),
            ws(identifier),
            ws(identifier),
        )),
        |(prefixes, ty, name)| {
            let mut annotations = Vec::new();
            let mut modifiers = Modifiers::empty();
            for prefix in prefixes {
                match prefix {
                    Prefix::Annotation(annotation) => annotations.push(annotation),
                    Prefix::Modifier(modifier) => modifiers |= modifier,
                }
            }
            Member {
                annotations,
                modifiers,
                ty: ty.to_string(),
                name: name.to_string(),
            }
        },
    )(i)
}

fn declaration(i: &str) -> IResult<&str, Declaration> {
    map(
        tuple((
            many0(ws(annotation)),
            ws(alt((
                value(DeclKind::Record, keyword("record")),
                value(DeclKind::Class, keyword("class")),
            ))),
            ws(identifier),
            delimited(
                ws(match_char('(')),
                separated_list0(match_char(','), member),
                ws(match_char(')')),
            ),
        )),
        |(annotations, kind, name, members)| Declaration {
            annotations,
            kind,
            name: name.to_string(),
            members,
        },
    )(i)
}

/// Map a type name to a slot type.
pub fn resolve_type(registry: &Registry, name: &str) -> Result<ValueType, Condition> {
    Ok(match name {
        "boolean" => ValueType::Boolean,
        "int" | "long" => ValueType::Integer,
        "double" => ValueType::Real,
        "char" => ValueType::Character,
        "String" => ValueType::String,
        "Symbol" => ValueType::Symbol,
        "Object" => ValueType::Any,
        other => registry
            .lookup(other)
            .map(|ty| ty.value_type())
            .ok_or_else(|| Condition::unknown_type(other))?,
    })
}

impl Declaration {
    /// Build the declared type. Named types are resolved against `registry`,
    /// but the new type is not added to it.
    pub fn resolve(&self, registry: &Registry) -> Result<TypeRef, Condition> {
        match self.kind {
            DeclKind::Record => {
                let mut builder = RecordType::builder(self.name.as_str());
                for annotation in &self.annotations {
                    builder = builder.annotation(annotation.clone());
                }
                for member in &self.members {
                    if !member.modifiers.is_empty() {
                        return Err(Condition::illegal_argument(format!(
                            "record component `{}` cannot carry modifiers",
                            member.name
                        )));
                    }
                    let spec = member.annotations.iter().cloned().fold(
                        ComponentSpec::new(member.name.as_str(), resolve_type(registry, &member.ty)?),
                        ComponentSpec::annotated,
                    );
                    builder = builder.component_spec(spec);
                }
                Ok(TypeRef::Record(builder.build()?))
            }
            DeclKind::Class => {
                let mut builder = Class::builder(self.name.as_str());
                for annotation in &self.annotations {
                    builder = builder.annotation(annotation.clone());
                }
                for member in &self.members {
                    builder = builder.annotated_field(
                        member.name.as_str(),
                        resolve_type(registry, &member.ty)?,
                        member.modifiers,
                        member.annotations.clone(),
                    );
                }
                Ok(TypeRef::Class(builder.build()?))
            }
        }
    }
}

impl Registry {
    /// Parse, build and register one declaration.
    pub fn declare(&self, src: &str) -> Result<TypeRef, DeclError> {
        let decl = parse(src)?;
        Ok(self.declare_parsed(&decl)?)
    }

    /// Parse, build and register several declarations in order, so later
    /// ones may name earlier ones.
    pub fn declare_all(&self, src: &str) -> Result<Vec<TypeRef>, DeclError> {
        parse_all(src)?
            .iter()
            .map(|decl| self.declare_parsed(decl).map_err(DeclError::from))
            .collect()
    }

    fn declare_parsed(&self, decl: &Declaration) -> Result<TypeRef, Condition> {
        if self.contains(&decl.name) {
            return Err(Condition::duplicate_type(decl.name.as_str().into()));
        }
        let ty = decl.resolve(self)?;
        self.register(ty.clone())?;
        Ok(ty)
    }
}
