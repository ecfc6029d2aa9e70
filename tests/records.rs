use std::sync::Arc;

use records_rs::{
    annotations::{Annotation, AnnotationValue},
    exceptions::Condition,
    records::{Record, RecordCompatible, RecordType},
    reflect::{TypeRef, introspect},
    registry::Registry,
    symbols::Symbol,
    value::{Typed, Value, ValueType},
};

mod common;

#[derive(records_rs::Record, Clone, Debug, PartialEq)]
struct RecordInteger {
    x: i64,
}

#[derive(records_rs::Record, Clone, Debug, PartialEq)]
#[record(name = "Line")]
struct Segment {
    from: Point,
    to: Point,
    label: String,
}

#[derive(records_rs::Record, Clone, Debug, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

fn record_integer() -> Arc<RecordType> {
    RecordType::declare("RecordInteger", [("x", ValueType::Integer)]).unwrap()
}

#[test]
fn canonical_methods_on_equal_and_unequal_instances() {
    common::init_tracing();

    let rtd = record_integer();
    let a = rtd.construct(vec![Value::from(9)]).unwrap();
    let b = rtd.construct(vec![Value::from(9)]).unwrap();
    let c = rtd.construct(vec![Value::from(0)]).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.hash_code(), b.hash_code());
    assert_ne!(a, c);
    assert_ne!(a.hash_code(), c.hash_code());
    assert_eq!(a.to_string(), b.to_string());
    assert_ne!(a.to_string(), c.to_string());
    assert_eq!(a.to_string(), "RecordInteger[x=9]");
}

#[test]
fn introspected_constructor_matches_direct_construction() {
    let rtd = record_integer();
    let ty = TypeRef::from(rtd.clone());
    assert!(ty.is_record());
    let info = introspect(&ty);

    let params = info.constructor.parameters();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name(), Symbol::intern("x"));
    assert!(params[0].is_name_present());

    let reflected = info.constructor.new_instance(vec![Value::from(9)]).unwrap();
    let direct = Value::from(rtd.construct(vec![Value::from(9)]).unwrap());
    assert_eq!(reflected, direct);
    assert!(TypeRef::of(&reflected).unwrap().is_record());
    assert!(!TypeRef::of(&Value::from(9)).is_some_and(|ty| ty.is_record()));
}

#[test]
fn reflective_write_is_denied_and_value_kept() {
    let rtd = record_integer();
    let b = Value::from(rtd.construct(vec![Value::from(8)]).unwrap());

    let mut field = TypeRef::from(rtd).declared_field("x").unwrap();
    field.set_accessible(true);
    assert!(field.set(&b, 7).unwrap_err().is_illegal_access());
    assert_eq!(field.get(&b).unwrap(), Value::from(8));
    assert!(b.set_field("x", Value::from(7)).unwrap_err().is_illegal_access());
    assert_eq!(b.get_field("x").unwrap(), Value::from(8));
}

#[test]
fn component_metadata_reaches_fields_and_parameters() {
    let registry = Registry::empty();
    let ty = registry
        .declare(
            r#"record Annotated(@Positive @Tags({@Tag("a"), @Tag("b")}) int x, @Doc(text = "why") String why)"#,
        )
        .unwrap();
    let info = introspect(&ty);

    let components = info.components.unwrap();
    assert_eq!(components.len(), 2);
    let x = &components[0];
    assert!(x.annotations().contains("Positive"));
    let tags: Vec<_> = x
        .annotations()
        .by_type("Tag")
        .into_iter()
        .filter_map(Annotation::value)
        .cloned()
        .collect();
    assert_eq!(tags, vec![AnnotationValue::from("a"), AnnotationValue::from("b")]);

    assert!(info.fields[0].annotations().contains("Positive"));
    assert!(info.constructor.parameters()[0].annotations().contains("Positive"));
    assert_eq!(
        info.fields[1]
            .annotations()
            .get("Doc")
            .and_then(|doc| doc.element("text"))
            .and_then(AnnotationValue::as_str),
        Some("why")
    );
}

#[test]
fn construction_errors() {
    let rtd = record_integer();
    assert_eq!(
        rtd.construct(vec![]).unwrap_err(),
        Condition::wrong_num_of_args(1, 0)
    );
    assert!(matches!(
        rtd.construct(vec![Value::from("nine")]),
        Err(Condition::TypeMismatch { .. })
    ));
    assert!(matches!(
        RecordType::declare("Twice", [("x", ValueType::Integer), ("x", ValueType::Real)]),
        Err(Condition::DuplicateComponent { .. })
    ));
}

#[test]
fn with_returns_a_new_instance() {
    let rtd = record_integer();
    let original = rtd.construct(vec![Value::from(1)]).unwrap();
    let updated = original.with("x", 2).unwrap();
    assert_eq!(original.get("x").unwrap(), &Value::from(1));
    assert_eq!(updated.get("x").unwrap(), &Value::from(2));
    assert!(updated.is_instance_of(&rtd));
    assert!(original.with("y", 2).is_err());
}

#[test]
fn derived_records_round_trip() {
    let segment = Segment {
        from: Point { x: 0, y: 0 },
        to: Point { x: 3, y: 4 },
        label: "diagonal".to_string(),
    };
    let record = Record::from_rust_type(segment.clone());
    assert_eq!(record.rtd().name(), Symbol::intern("Line"));
    assert_eq!(
        record.to_string(),
        r#"Line[from=Point[x=0, y=0], to=Point[x=3, y=4], label="diagonal"]"#
    );
    assert_eq!(record.cast_to_rust_type::<Segment>(), Some(segment.clone()));
    assert_eq!(record.cast_to_rust_type::<Point>(), None);

    assert_eq!(
        Segment::value_type(),
        ValueType::record(&<Segment as RecordCompatible>::rtd())
    );
    assert!(Arc::ptr_eq(
        &<Point as RecordCompatible>::rtd(),
        &<Point as RecordCompatible>::rtd()
    ));

    let value = Value::from(segment.clone());
    assert_eq!(Segment::try_from(value).unwrap(), segment);
    assert!(Segment::try_from(Value::from(1)).is_err());
}

#[test]
fn derived_records_pass_through_the_canonical_constructor() {
    let record = Record::from_rust_type(Point { x: 1, y: 2 });
    assert_eq!(record.slots().len(), 2);
    assert_eq!(record.get("y").unwrap(), &Value::from(2));
    assert!(matches!(
        <Point as RecordCompatible>::rtd().construct(vec![Value::from(1)]),
        Err(Condition::ArityMismatch { expected: 2, provided: 1 })
    ));
    assert!(matches!(record.get("z"), Err(Condition::NoSuchField { .. })));
}

#[test]
fn derived_records_are_typed_by_their_fields() {
    let rtd = <Segment as RecordCompatible>::rtd();
    let from = rtd.component("from").unwrap();
    assert_eq!(from.ty(), &Point::value_type());

    let wrong = rtd.construct(vec![
        Value::from(RecordInteger { x: 1 }),
        Value::from(Point { x: 1, y: 1 }),
        Value::from("label"),
    ]);
    assert!(matches!(wrong, Err(Condition::TypeMismatch { .. })));
}

#[test]
fn validators_normalize_and_reject() {
    let range = RecordType::builder("Range")
        .component("lo", ValueType::Integer)
        .component("hi", ValueType::Integer)
        .validator(|slots| {
            let (lo, hi) = (i64::try_from(slots[0].clone())?, i64::try_from(slots[1].clone())?);
            if lo > hi {
                return Err(Condition::validation(Symbol::intern("Range"), "lo > hi"));
            }
            Ok(())
        })
        .build()
        .unwrap();

    assert!(range.construct(vec![Value::from(1), Value::from(2)]).is_ok());
    assert!(matches!(
        range.construct(vec![Value::from(3), Value::from(2)]),
        Err(Condition::Validation { .. })
    ));
}
