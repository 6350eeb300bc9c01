use std::sync::Arc;

use connect_api::config::{ConfigValues, ParamValue};
use connect_api::error::ErrorKind;
use connect_api::record::Record;
use connect_api::schema::{Schema, SchemaBuilder};
use connect_api::transform::Transformation;
use connect_api::value::{Struct, Value};
use connect_transform_full_name::{FULL_NAME_FIELD, FullNameTransform};
use proptest::prelude::*;

fn configured() -> FullNameTransform {
    let mut transform = FullNameTransform::new();
    transform.configure(&ConfigValues::new()).unwrap();
    transform
}

fn record(schema: Arc<Schema>, value: Struct) -> Arc<Record> {
    Arc::new(Record::new("test-topic", Some(schema), value).with_partition(0))
}

fn full_name_of(record: &Record) -> String {
    let value = record.value.as_struct().expect("struct value");
    value
        .get_string(FULL_NAME_FIELD)
        .unwrap()
        .expect("full_name set")
        .to_string()
}

#[test]
fn adds_full_name_from_both_fields() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::string())
        .field("last_name", Schema::string())
        .field("email", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("first_name", "Alice")
        .unwrap()
        .put("last_name", "Smith")
        .unwrap()
        .put("email", "alice.smith@example.com")
        .unwrap();

    let transformed = configured().apply(record(schema, value)).unwrap();

    assert_eq!(full_name_of(&transformed), "Alice Smith");
}

#[test]
fn missing_last_name_field_leaves_trailing_space() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::string())
        .field("email", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("first_name", "Alice")
        .unwrap()
        .put("email", "alice.smith@example.com")
        .unwrap();

    let transformed = configured().apply(record(schema, value)).unwrap();

    assert_eq!(full_name_of(&transformed), "Alice ");
}

#[test]
fn null_names_yield_single_space() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::optional_string())
        .field("last_name", Schema::optional_string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("first_name", Value::Null)
        .unwrap()
        .put("last_name", Value::Null)
        .unwrap();

    let transformed = configured().apply(record(schema, value)).unwrap();

    assert_eq!(full_name_of(&transformed), " ");
    let out = transformed.value.as_struct().unwrap();
    assert_eq!(out.get("first_name").unwrap(), &Value::Null);
    assert_eq!(out.get("last_name").unwrap(), &Value::Null);
}

#[test]
fn non_struct_value_is_returned_as_is() {
    let input = Arc::new(Record::new("test-topic", Some(Schema::string()), "Alice Smith"));
    let output = configured().apply(input.clone()).unwrap();
    assert!(Arc::ptr_eq(&input, &output));
}

#[test]
fn struct_without_value_schema_is_returned_as_is() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema).unwrap().put("first_name", "Alice").unwrap();
    let input = Arc::new(Record::new("test-topic", None, value));

    let output = configured().apply(input.clone()).unwrap();
    assert!(Arc::ptr_eq(&input, &output));
}

#[test]
fn schema_without_name_fields_is_returned_as_is() {
    let schema = SchemaBuilder::structure()
        .field("email", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone()).unwrap().put("email", "a@b.com").unwrap();
    let input = record(schema, value);

    let output = configured().apply(input.clone()).unwrap();
    assert!(Arc::ptr_eq(&input, &output));
}

#[test]
fn record_metadata_and_schema_identity_are_preserved() {
    let schema = SchemaBuilder::structure()
        .name("com.example.Customer")
        .version(2)
        .field("id", Schema::int64())
        .field("last_name", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("id", 7i64)
        .unwrap()
        .put("last_name", "Smith")
        .unwrap();
    let input = Arc::new(
        Record::new("customers", Some(schema.clone()), value.clone())
            .with_partition(4)
            .with_key(Some(Schema::int64()), 7i64)
            .with_timestamp(1_700_000_000_123),
    );

    let output = configured().apply(input.clone()).unwrap();

    assert!(!Arc::ptr_eq(&input, &output));
    assert_eq!(output.topic, "customers");
    assert_eq!(output.partition, Some(4));
    assert_eq!(output.key_schema, input.key_schema);
    assert_eq!(output.key, Value::Int64(7));
    assert_eq!(output.timestamp, Some(1_700_000_000_123));

    let new_schema = output.value_schema.as_ref().unwrap();
    assert_eq!(new_schema.name(), Some("com.example.Customer"));
    assert_eq!(new_schema.version(), Some(2));
    assert_eq!(full_name_of(&output), " Smith");

    // Input left untouched.
    assert_eq!(input.value_schema.as_deref(), Some(schema.as_ref()));
    assert_eq!(input.value, Value::Struct(value));
}

#[test]
fn optional_struct_schema_stays_optional() {
    let schema = SchemaBuilder::structure()
        .name("com.example.Customer")
        .optional()
        .field("first_name", Schema::string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("first_name", "Alice")
        .unwrap();

    let output = configured().apply(record(schema, value)).unwrap();

    let new_schema = output.value_schema.as_ref().unwrap();
    assert!(new_schema.is_optional());
    assert_eq!(new_schema.name(), Some("com.example.Customer"));
    assert_eq!(full_name_of(&output), "Alice ");
}

#[test]
fn reapplying_overwrites_full_name() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::string())
        .field("last_name", Schema::optional_string())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone())
        .unwrap()
        .put("first_name", "Alice")
        .unwrap();
    let transform = configured();

    let once = transform.apply(record(schema, value)).unwrap();
    let twice = transform.apply(once.clone()).unwrap();

    let schema = twice.value_schema.as_ref().unwrap();
    let names: Vec<_> = schema.fields().iter().map(|f| f.name()).collect();
    assert_eq!(names, ["first_name", "last_name", FULL_NAME_FIELD]);
    assert_eq!(full_name_of(&twice), "Alice ");
    assert_eq!(twice.value, once.value);
}

#[test]
fn non_string_name_is_a_data_error() {
    let schema = SchemaBuilder::structure()
        .field("first_name", Schema::int32())
        .build()
        .unwrap();
    let value = Struct::new(schema.clone()).unwrap().put("first_name", 12).unwrap();

    let err = configured().apply(record(schema, value)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Data);
}

#[test]
fn lifecycle_hooks_are_inert() {
    let mut transform = FullNameTransform::new();
    let mut options = ConfigValues::new();
    options.set("anything", ParamValue::Str("goes".into()));

    transform.configure(&options).unwrap();
    assert!(transform.config().is_empty());
    assert_eq!(transform.name(), "full-name");
    transform.close().unwrap();
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum NameField {
    Absent,
    Mandatory(String),
    Optional(Option<String>),
}

impl NameField {
    fn expected(&self) -> &str {
        match self {
            NameField::Mandatory(s) => s,
            NameField::Optional(Some(s)) => s,
            _ => "",
        }
    }
}

fn name_field() -> impl Strategy<Value = NameField> {
    prop_oneof![
        Just(NameField::Absent),
        "[A-Za-z ]{0,8}".prop_map(NameField::Mandatory),
        proptest::option::of("[A-Za-z]{0,8}").prop_map(NameField::Optional),
    ]
}

fn add_name(
    builder: SchemaBuilder,
    values: &mut Vec<(&'static str, Value)>,
    name: &'static str,
    field: &NameField,
) -> SchemaBuilder {
    match field {
        NameField::Absent => builder,
        NameField::Mandatory(s) => {
            values.push((name, Value::String(s.clone())));
            builder.field(name, Schema::string())
        }
        NameField::Optional(s) => {
            values.push((name, s.clone().into()));
            builder.field(name, Schema::optional_string())
        }
    }
}

fn build_record(
    first: &NameField,
    last: &NameField,
    age: Option<i32>,
    partition: i32,
    timestamp: i64,
) -> Arc<Record> {
    let mut values = vec![("email", Value::String("x@example.com".into()))];
    let mut builder = SchemaBuilder::structure().field("email", Schema::string());
    builder = add_name(builder, &mut values, "first_name", first);
    builder = add_name(builder, &mut values, "last_name", last);
    builder = builder.field("age", Schema::optional_int32());
    values.push(("age", age.into()));

    let schema = builder.build().unwrap();
    let mut value = Struct::new(schema.clone()).unwrap();
    for (name, v) in values {
        value = value.put(name, v).unwrap();
    }
    Arc::new(
        Record::new("people", Some(schema), value)
            .with_partition(partition)
            .with_key(Some(Schema::string()), "k")
            .with_timestamp(timestamp),
    )
}

proptest! {
    #[test]
    fn applicable_records_gain_exactly_one_trailing_field(
        first in name_field(),
        last in name_field(),
        age in proptest::option::of(any::<i32>()),
        partition in any::<i32>(),
        timestamp in any::<i64>(),
    ) {
        let input = build_record(&first, &last, age, partition, timestamp);
        let output = configured().apply(input.clone()).unwrap();

        let applicable = !matches!(first, NameField::Absent) || !matches!(last, NameField::Absent);
        if !applicable {
            prop_assert!(Arc::ptr_eq(&input, &output));
            return Ok(());
        }

        let in_schema = input.value_schema.as_ref().unwrap();
        let out_schema = output.value_schema.as_ref().unwrap();
        prop_assert_eq!(out_schema.fields().len(), in_schema.fields().len() + 1);
        for (a, b) in in_schema.fields().iter().zip(out_schema.fields()) {
            prop_assert_eq!(a.name(), b.name());
            prop_assert_eq!(a.schema(), b.schema());
        }
        let last_field = &out_schema.fields()[in_schema.fields().len()];
        prop_assert_eq!(last_field.name(), FULL_NAME_FIELD);
        prop_assert!(!last_field.schema().is_optional());

        let in_value = input.value.as_struct().unwrap();
        let out_value = output.value.as_struct().unwrap();
        for (field, v) in in_value.iter() {
            prop_assert_eq!(out_value.get(field.name()).unwrap(), v);
        }
        let expected = format!("{} {}", first.expected(), last.expected());
        prop_assert_eq!(out_value.get_string(FULL_NAME_FIELD).unwrap(), Some(expected.as_str()));

        prop_assert_eq!(&output.topic, &input.topic);
        prop_assert_eq!(output.partition, input.partition);
        prop_assert_eq!(&output.key_schema, &input.key_schema);
        prop_assert_eq!(&output.key, &input.key);
        prop_assert_eq!(output.timestamp, input.timestamp);
    }

    #[test]
    fn non_struct_values_pass_through(text in ".*", n in any::<i64>()) {
        let transform = configured();

        let string_record = Arc::new(Record::new("t", Some(Schema::string()), text));
        let out = transform.apply(string_record.clone()).unwrap();
        prop_assert!(Arc::ptr_eq(&string_record, &out));

        let int_record = Arc::new(Record::new("t", Some(Schema::int64()), n));
        let out = transform.apply(int_record.clone()).unwrap();
        prop_assert!(Arc::ptr_eq(&int_record, &out));
    }
}
