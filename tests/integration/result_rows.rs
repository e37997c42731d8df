#![allow(clippy::all)]

use std::sync::Arc;

use bindrow::error::BindrowError;
use bindrow::types::{ObjectSchema, Payload, Type};
use bindrow::wire::mock::{MockConnection, MockResultSet, MockScript, MockValue};
use bindrow::wire::{ColumnMeta, WireType};
use bindrow::{BinderOptions, Executor, Params, QueryResult};

fn users_result_set() -> MockResultSet {
    MockResultSet::new(vec![
        ColumnMeta::new("id", WireType::Long, 0),
        ColumnMeta::new("name", WireType::String, 32),
    ])
    .row(vec![MockValue::I32(1), MockValue::from("ada")])
    .row(vec![MockValue::I32(2), MockValue::from("grace")])
    .row(vec![MockValue::I32(3), MockValue::Null])
}

fn user_type() -> Arc<Type> {
    Type::object(
        ObjectSchema::new("User")
            .field("id", Type::int32())
            .field("name", Type::text()),
    )
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

fn select_users(
    script: MockScript,
) -> (
    bindrow::StringTemplate,
    std::sync::Arc<std::sync::Mutex<bindrow::wire::mock::MockLog>>,
    Executor<MockConnection>,
) {
    init_tracing();
    let template =
        Executor::<MockConnection>::parse_query_template("select_users", "SELECT * FROM users;", true)
            .expect("parse");
    let connection = MockConnection::new().with_script(template.prepared_text(), script);
    let log = connection.log_handle();
    (template, log, Executor::new(connection))
}

fn run(script: MockScript) -> (QueryResult<bindrow::wire::mock::MockStatement>, std::sync::Arc<std::sync::Mutex<bindrow::wire::mock::MockLog>>) {
    let (template, log, mut executor) = select_users(script);
    let result = executor.execute(&template, &Params::new()).expect("execute");
    (result, log)
}

#[test]
fn rows_materialize_as_objects() {
    let (mut result, _) = run(MockScript::returning(users_result_set()));
    assert!(result.is_success());

    let rows = result.fetch_all(&Type::vector(user_type())).expect("fetch");
    let rows = rows.as_collection().expect("collection");
    assert_eq!(rows.len(), 3);

    let first = rows[0].as_object().expect("object");
    assert_eq!(first.get("id").unwrap().payload(), Some(&Payload::Int32(1)));
    assert_eq!(first.get("name").unwrap().as_text(), Some("ada"));

    // null column stays null, not empty text
    let third = rows[2].as_object().expect("object");
    assert!(third.get("name").unwrap().is_null());
}

#[test]
fn rows_materialize_as_maps_keyed_by_column_name() {
    let (mut result, _) = run(MockScript::returning(users_result_set()));
    let rows = result
        .fetch(&Type::vector(Type::pair_list(Type::text(), Type::any())), 1)
        .expect("fetch");
    let rows = rows.as_collection().expect("collection");
    assert_eq!(rows.len(), 1);

    let entries = rows[0].as_map().expect("map entries");
    assert_eq!(entries[0].0, "id");
    assert_eq!(
        entries[0].1.as_any().expect("id cell").payload(),
        Some(&Payload::Int32(1))
    );
    assert_eq!(entries[1].0, "name");
    assert_eq!(
        entries[1].1.as_any().expect("name cell").as_text(),
        Some("ada")
    );
}

#[test]
fn non_text_map_keys_are_rejected() {
    let (mut result, _) = run(MockScript::returning(users_result_set()));
    let err = result
        .fetch_all(&Type::vector(Type::pair_list(Type::int32(), Type::any())))
        .unwrap_err();
    match err {
        BindrowError::InvalidKeyType { type_name } => assert_eq!(type_name, "Int32"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn rows_materialize_as_homogeneous_collections() {
    let result_set = MockResultSet::new(vec![
        ColumnMeta::new("a", WireType::Long, 0),
        ColumnMeta::new("b", WireType::Long, 0),
    ])
    .row(vec![MockValue::I32(10), MockValue::I32(20)]);

    let (mut result, _) = run(MockScript::returning(result_set));
    let rows = result
        .fetch_all(&Type::vector(Type::list(Type::int32())))
        .expect("fetch");
    let rows = rows.as_collection().expect("outer");
    let cells = rows[0].as_collection().expect("inner");
    assert_eq!(cells[0].payload(), Some(&Payload::Int32(10)));
    assert_eq!(cells[1].payload(), Some(&Payload::Int32(20)));
}

#[test]
fn unknown_column_names_both_type_and_column() {
    let result_set = MockResultSet::new(vec![
        ColumnMeta::new("id", WireType::Long, 0),
        ColumnMeta::new("surprise", WireType::Long, 0),
    ])
    .row(vec![MockValue::I32(1), MockValue::I32(2)]);

    let (mut result, _) = run(MockScript::returning(result_set));
    let err = result.fetch_all(&Type::vector(user_type())).unwrap_err();
    match err {
        BindrowError::SchemaMismatch { type_name, column } => {
            assert_eq!(type_name, "User");
            assert_eq!(column, "surprise");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn polymorphic_fields_resolve_after_concrete_siblings() {
    // payload is declared before kind, so resolution must be deferred
    let event_ty = Type::object(
        ObjectSchema::new("Event")
            .polymorphic(
                "payload",
                Arc::new(|fields| {
                    let kind = fields
                        .get("kind")
                        .and_then(|k| k.as_text())
                        .unwrap_or_default();
                    Ok(match kind {
                        "count" => Type::int64(),
                        _ => Type::text(),
                    })
                }),
            )
            .field("kind", Type::text()),
    );

    let result_set = MockResultSet::new(vec![
        ColumnMeta::new("payload", WireType::LongLong, 0),
        ColumnMeta::new("kind", WireType::String, 16),
    ])
    .row(vec![MockValue::I64(99), MockValue::from("count")]);

    let (mut result, _) = run(MockScript::returning(result_set));
    let rows = result.fetch_all(&Type::vector(event_ty)).expect("fetch");
    let rows = rows.as_collection().expect("collection");
    let event = rows[0].as_object().expect("object");

    assert_eq!(event.get("kind").unwrap().as_text(), Some("count"));
    let payload = event.get("payload").unwrap().as_any().expect("selected");
    assert_eq!(payload.payload(), Some(&Payload::Int64(99)));
}

#[test]
fn zero_count_reads_nothing_and_fetches_nothing() {
    let (mut result, log) = run(MockScript::returning(users_result_set()));
    let fetches_after_init = log.lock().unwrap().fetches;
    assert_eq!(fetches_after_init, 1);

    let rows = result.fetch(&Type::vector(user_type()), 0).expect("fetch");
    assert_eq!(rows.as_collection().map(|r| r.len()), Some(0));
    assert_eq!(log.lock().unwrap().fetches, fetches_after_init);
    assert!(result.has_more_to_fetch());
}

#[test]
fn negative_count_exhausts_exactly_once() {
    let (mut result, log) = run(MockScript::returning(users_result_set()));
    let rows = result.fetch_all(&Type::vector(user_type())).expect("fetch");
    assert_eq!(rows.as_collection().map(|r| r.len()), Some(3));

    // init + one per row + the terminal no-data fetch
    assert_eq!(log.lock().unwrap().fetches, 4);
    assert!(!result.has_more_to_fetch());
    assert!(result.is_success());
    assert_eq!(result.position(), 3);

    // a second exhaustive read performs no further fetches
    let rows = result.fetch_all(&Type::vector(user_type())).expect("fetch");
    assert_eq!(rows.as_collection().map(|r| r.len()), Some(0));
    assert_eq!(log.lock().unwrap().fetches, 4);
}

#[test]
fn positive_count_stops_early() {
    let (mut result, log) = run(MockScript::returning(users_result_set()));
    let rows = result.fetch(&Type::vector(user_type()), 2).expect("fetch");
    assert_eq!(rows.as_collection().map(|r| r.len()), Some(2));
    assert!(result.has_more_to_fetch());
    assert_eq!(result.position(), 2);
    assert_eq!(log.lock().unwrap().fetches, 3);

    let rest = result.fetch_all(&Type::vector(user_type())).expect("fetch");
    assert_eq!(rest.as_collection().map(|r| r.len()), Some(1));
    assert!(!result.has_more_to_fetch());
}

#[test]
fn requesting_more_rows_than_exist_stops_at_exhaustion() {
    let (mut result, _) = run(MockScript::returning(users_result_set()));
    let rows = result.fetch(&Type::vector(user_type()), 50).expect("fetch");
    assert_eq!(rows.as_collection().map(|r| r.len()), Some(3));
    assert!(!result.has_more_to_fetch());
    assert!(result.is_success());
}

#[test]
fn fetch_error_mid_stream_is_failure_not_exhaustion() {
    let (mut result, _) = run(MockScript::returning(users_result_set()).failing_fetch_at(1));
    assert!(result.is_success(), "first row fetched fine");

    let err = result.fetch_all(&Type::vector(user_type())).unwrap_err();
    assert!(matches!(err, BindrowError::Fetch(_)));
    assert!(!result.is_success());
    assert!(!result.has_more_to_fetch());
}

#[test]
fn fetch_error_on_first_row_is_visible_before_reading() {
    let (result, _) = run(MockScript::returning(users_result_set()).failing_fetch_at(0));
    assert!(!result.is_success());
    assert!(!result.has_more_to_fetch());
    assert_eq!(result.error_message(), "injected fetch failure");

    let mut result = result;
    let err = result.fetch_all(&Type::vector(user_type())).unwrap_err();
    assert!(matches!(err, BindrowError::Fetch(_)));
}

#[test]
fn statements_without_result_sets_are_immediately_exhausted() {
    let (result, log) = run(MockScript::no_result_set());
    assert!(result.is_success());
    assert!(!result.has_more_to_fetch());
    assert_eq!(result.position(), 0);
    // no columns were bound, so not even the initial fetch happened
    assert_eq!(log.lock().unwrap().fetches, 0);
}

#[test]
fn truncated_text_still_counts_as_a_row() {
    let result_set = MockResultSet::new(vec![ColumnMeta::new("name", WireType::String, 4)])
        .row(vec![MockValue::from("much longer than four")]);

    let (mut result, _) = run(MockScript::returning(result_set));
    assert!(result.is_success());
    let rows = result
        .fetch_all(&Type::vector(Type::list(Type::text())))
        .expect("fetch");
    let rows = rows.as_collection().expect("outer");
    let cells = rows[0].as_collection().expect("inner");
    assert_eq!(cells[0].as_text(), Some("much"));
}

#[test]
fn scalar_result_target_is_rejected() {
    let (mut result, _) = run(MockScript::returning(users_result_set()));
    let err = result.fetch_all(&Type::int32()).unwrap_err();
    assert!(matches!(
        err,
        BindrowError::UnsupportedType {
            direction: "rows read",
            ..
        }
    ));
}

#[test]
fn missing_parameter_is_skipped_by_default() {
    let template =
        Executor::<MockConnection>::parse_query_template("q", "SELECT :present, :absent;", true)
            .expect("parse");
    let connection =
        MockConnection::new().with_script(template.prepared_text(), MockScript::no_result_set());
    let log = connection.log_handle();
    let mut executor = Executor::new(connection);

    executor
        .execute(&template, &Params::new().with("present", 1i32))
        .expect("execute");

    let bound = log.lock().unwrap().bound[0].clone();
    assert_eq!(bound.len(), 2);
    assert!(bound[0].is_some());
    assert!(bound[1].is_none(), "absent parameter leaves its position unset");
}

#[test]
fn missing_parameter_fails_fast_in_strict_mode() {
    let template =
        Executor::<MockConnection>::parse_query_template("q", "SELECT :present, :absent;", true)
            .expect("parse");
    let connection =
        MockConnection::new().with_script(template.prepared_text(), MockScript::no_result_set());
    let mut executor = Executor::with_options(connection, BinderOptions::strict());

    let err = executor
        .execute(&template, &Params::new().with("present", 1i32))
        .unwrap_err();
    match err {
        BindrowError::MissingParameter { name } => assert_eq!(name, "absent"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn transport_rejections_carry_their_messages() {
    let template = Executor::<MockConnection>::parse_query_template("q", "SELECT 1;", true)
        .expect("parse");

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        MockScript::no_result_set().rejecting_bind("too many placeholders"),
    );
    let mut executor = Executor::new(connection);
    match executor.execute(&template, &Params::new()).unwrap_err() {
        BindrowError::Bind(message) => assert_eq!(message, "too many placeholders"),
        other => panic!("unexpected error: {other:?}"),
    }

    let connection = MockConnection::new().with_script(
        template.prepared_text(),
        MockScript::no_result_set().failing_execute("deadlock"),
    );
    let mut executor = Executor::new(connection);
    match executor.execute(&template, &Params::new()).unwrap_err() {
        BindrowError::Execute(message) => assert_eq!(message, "deadlock"),
        other => panic!("unexpected error: {other:?}"),
    }

    let mut executor = Executor::new(MockConnection::new());
    match executor.execute(&template, &Params::new()).unwrap_err() {
        BindrowError::Prepare(message) => assert!(message.contains("no script")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn last_insert_id_surfaces_from_the_connection() {
    let executor = Executor::new(MockConnection::new().with_last_insert_id(99));
    assert_eq!(executor.last_insert_id(), 99);
}
