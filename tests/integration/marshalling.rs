#![allow(clippy::all)]

use std::sync::Arc;

use bindrow::error::BindrowError;
use bindrow::mapping::{Deserializer, Serializer};
use bindrow::types::{EnumDef, ObjectSchema, Payload, Tagged, Type, TypeResolver};
use bindrow::wire::mock::{MockConnection, MockResultSet, MockValue};
use bindrow::wire::{BindParam, ColumnBinding, ColumnMeta, WireType};
use bindrow::{Executor, Params};

// Serializes a value, replays the descriptor into a column binding the way
// the transport would, and deserializes it back as `target`.
fn roundtrip(value: &Tagged, target: &Arc<Type>) -> Tagged {
    let resolver = TypeResolver::new();
    let mut serializer = Serializer::new();
    serializer.serialize(0, value, &resolver).expect("serialize");
    let param: BindParam = serializer.slots()[0].clone().expect("descriptor");

    let length = match param.wire_type {
        WireType::String => param.length,
        _ => 0,
    };
    let mut column = ColumnBinding::for_column(&ColumnMeta::new("c", param.wire_type, length));
    match &param.value {
        Some(bytes) => column.buffer[..bytes.len()].copy_from_slice(bytes),
        None => column.is_null = true,
    }

    Deserializer::new()
        .deserialize(&mut column, target, &resolver)
        .expect("deserialize")
}

#[test]
fn every_scalar_kind_round_trips() {
    let cases: Vec<(Tagged, Arc<Type>)> = vec![
        (Tagged::text("marshal me"), Type::text()),
        (Tagged::boolean(true), Type::boolean()),
        (Tagged::int8(-8), Type::int8()),
        (Tagged::uint8(8), Type::uint8()),
        (Tagged::int16(-1600), Type::int16()),
        (Tagged::uint16(1600), Type::uint16()),
        (Tagged::int32(-320_000), Type::int32()),
        (Tagged::uint32(320_000), Type::uint32()),
        (Tagged::int64(-64_000_000_000), Type::int64()),
        (Tagged::uint64(u64::MAX), Type::uint64()),
        (Tagged::float32(1.25), Type::float32()),
        (Tagged::float64(-2.5e10), Type::float64()),
    ];

    for (value, target) in cases {
        let back = roundtrip(&value, &target);
        assert_eq!(back.payload(), value.payload(), "round trip of {value:?}");
    }
}

#[test]
fn null_round_trips_as_no_value_never_zero() {
    let types = [
        Type::text(),
        Type::boolean(),
        Type::int8(),
        Type::uint8(),
        Type::int16(),
        Type::uint16(),
        Type::int32(),
        Type::uint32(),
        Type::int64(),
        Type::uint64(),
        Type::float32(),
        Type::float64(),
    ];
    for ty in types {
        let back = roundtrip(&Tagged::null(ty.clone()), &ty);
        assert!(back.is_null(), "null {} must stay null", ty.name());
    }
}

#[test]
fn enum_round_trips_through_its_interpretation() {
    let status = Type::enumeration(
        EnumDef::new("Status", Type::int32())
            .entry("ACTIVE", Tagged::int32(0))
            .entry("RETIRED", Tagged::int32(1)),
    );
    let back = roundtrip(&Tagged::enum_entry(status.clone(), "RETIRED"), &status);
    assert_eq!(back.payload(), Some(&Payload::Enum("RETIRED".to_string())));
}

#[test]
fn bound_descriptor_bytes_match_the_parameters() {
    let template = Executor::<MockConnection>::parse_query_template(
        "insert_user",
        "INSERT INTO users (id, name) VALUES (:id, :name);",
        true,
    )
    .expect("parse");

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        bindrow::wire::mock::MockScript::no_result_set(),
    );
    let log_handle = connection.log_handle();
    let mut executor = Executor::new(connection);

    let params = Params::new().with("id", 42i32).with("name", "ada");
    executor.execute(&template, &params).expect("execute");

    let log = log_handle.lock().unwrap().clone();
    assert_eq!(log.prepared.len(), 1);
    assert_eq!(log.bound.len(), 1);

    let bound = &log.bound[0];
    assert_eq!(bound.len(), 2);

    let id = bound[0].as_ref().expect("id bound");
    assert_eq!(id.wire_type, WireType::Long);
    assert_eq!(id.value.as_deref(), Some(42i32.to_le_bytes().as_slice()));

    let name = bound[1].as_ref().expect("name bound");
    assert_eq!(name.wire_type, WireType::String);
    assert_eq!(name.value.as_deref(), Some(b"ada".as_slice()));
    assert_eq!(name.length, 3);
}

#[test]
fn dotted_parameters_resolve_through_nested_objects() {
    let name_ty = Type::object(ObjectSchema::new("Name").field("first", Type::text()));
    let user_ty = Type::object(
        ObjectSchema::new("User")
            .field("id", Type::int32())
            .field("name", name_ty.clone()),
    );

    let mut name = bindrow::types::ObjectValue::new();
    name.set("first", Tagged::text("Ada"));
    let mut user = bindrow::types::ObjectValue::new();
    user.set("id", Tagged::int32(7));
    user.set("name", Tagged::new(name_ty, Payload::Object(name)));
    let user = Tagged::new(user_ty, Payload::Object(user));

    let template = Executor::<MockConnection>::parse_query_template(
        "by_first_name",
        "SELECT id FROM users WHERE first = :user.name.first;",
        true,
    )
    .expect("parse");

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        bindrow::wire::mock::MockScript::no_result_set(),
    );
    let log_handle = connection.log_handle();
    let mut executor = Executor::new(connection);

    let params = Params::new().with("user", user);
    executor.execute(&template, &params).expect("execute");

    let log = log_handle.lock().unwrap().clone();
    let bound = &log.bound[0];
    let first = bound[0].as_ref().expect("resolved parameter bound");
    assert_eq!(first.wire_type, WireType::String);
    assert_eq!(first.value.as_deref(), Some(b"Ada".as_slice()));
}

#[test]
fn unresolved_property_path_is_fatal() {
    let user_ty = Type::object(ObjectSchema::new("User").field("id", Type::int32()));
    let mut user = bindrow::types::ObjectValue::new();
    user.set("id", Tagged::int32(7));
    let user = Tagged::new(user_ty, Payload::Object(user));

    let template = Executor::<MockConnection>::parse_query_template(
        "bad_path",
        "SELECT 1 WHERE x = :user.missing;",
        true,
    )
    .expect("parse");

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        bindrow::wire::mock::MockScript::no_result_set(),
    );
    let mut executor = Executor::new(connection);

    let err = executor
        .execute(&template, &Params::new().with("user", user))
        .unwrap_err();
    match err {
        BindrowError::UnresolvedParameter { name } => assert_eq!(name, "user.missing"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_root_segment_is_malformed() {
    let template =
        Executor::<MockConnection>::parse_query_template("dot", "SELECT :.oops;", true)
            .expect("parse");

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        bindrow::wire::mock::MockScript::no_result_set(),
    );
    let mut executor = Executor::new(connection);

    let err = executor.execute(&template, &Params::new()).unwrap_err();
    assert!(matches!(err, BindrowError::MalformedParameterName { .. }));
}

#[test]
fn any_target_infers_from_wire_tags_end_to_end() {
    let template =
        Executor::<MockConnection>::parse_query_template("mixed", "SELECT mixed;", true)
            .expect("parse");

    let result_set = MockResultSet::new(vec![
        ColumnMeta::new("a", WireType::Tiny, 0),
        ColumnMeta::new("b", WireType::Double, 0),
        ColumnMeta::new("c", WireType::String, 16),
    ])
    .row(vec![
        MockValue::I8(3),
        MockValue::F64(0.5),
        MockValue::from("txt"),
    ]);

    let connection = MockConnection::new().with_result(template.prepared_text(), result_set);
    let mut executor = Executor::new(connection);

    let mut result = executor.execute(&template, &Params::new()).expect("execute");
    let rows = result
        .fetch_all(&Type::vector(Type::vector(Type::any())))
        .expect("fetch");

    let rows = rows.as_collection().expect("outer collection");
    assert_eq!(rows.len(), 1);
    let cells = rows[0].as_collection().expect("inner collection");
    assert_eq!(
        cells[0].as_any().expect("tiny").payload(),
        Some(&Payload::Int8(3))
    );
    assert_eq!(
        cells[1].as_any().expect("double").payload(),
        Some(&Payload::Float64(0.5))
    );
    assert_eq!(
        cells[2].as_any().expect("string").payload(),
        Some(&Payload::Text("txt".to_string()))
    );
}
