//! Bridges `serde_json::Value` and the well-known `google.protobuf.Struct`
//! / `google.protobuf.Value` types that carry free-form JSON across the
//! gRPC surface (tool arguments, schemas, capabilities).

use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value as PbValue};
use serde_json::{Map, Value};

pub fn json_to_struct(value: &Value) -> Struct {
    match value {
        Value::Object(map) => Struct {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_pb_value(v)))
                .collect(),
        },
        _ => Struct::default(),
    }
}

pub fn struct_to_json(s: &Struct) -> Value {
    let map: Map<String, Value> = s
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), pb_value_to_json(v)))
        .collect();
    Value::Object(map)
}

pub fn json_to_pb_value(value: &Value) -> PbValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_pb_value).collect(),
        }),
        Value::Object(_) => Kind::StructValue(json_to_struct(value)),
    };
    PbValue { kind: Some(kind) }
}

pub fn pb_value_to_json(value: &PbValue) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => {
            serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)
        }
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.iter().map(pb_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_nested_objects() {
        let original = json!({"a": 1, "b": [true, null, "x"], "c": {"d": 2.5}});
        let s = json_to_struct(&original);
        assert_eq!(struct_to_json(&s), original);
    }

    #[test]
    fn non_object_becomes_empty_struct() {
        let s = json_to_struct(&json!("not an object"));
        assert!(s.fields.is_empty());
    }
}
