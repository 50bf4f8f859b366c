//! Seed data for the in-memory store.
//!
//! The file is a JSON object mapping entity names to arrays of records:
//! `{ "Customer": [{ "id": 1, "name": "Ada" }] }`.

use crate::error::CliError;
use morph::prelude::{MemoryStore, Record, Value};
use serde_json::Value as Json;
use std::path::Path;

pub fn load_store(path: &Path) -> Result<MemoryStore, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let json: Json = serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    store_from_json(json)
}

pub fn store_from_json(json: Json) -> Result<MemoryStore, CliError> {
    let Json::Object(entities) = json else {
        return Err(CliError::Data("top level must be an object".to_string()));
    };

    let store = MemoryStore::new();
    for (entity, rows) in entities {
        let Json::Array(rows) = rows else {
            return Err(CliError::Data(format!("'{entity}' must map to an array")));
        };

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| record(&entity, i, row))
            .collect::<Result<Vec<_>, _>>()?;
        store.extend(entity, records);
    }

    Ok(store)
}

fn record(entity: &str, index: usize, row: Json) -> Result<Record, CliError> {
    let Json::Object(fields) = row else {
        return Err(CliError::Data(format!("'{entity}'[{index}] is not an object")));
    };

    fields
        .into_iter()
        .map(|(name, json)| {
            let value = value(&json).ok_or_else(|| {
                CliError::Data(format!(
                    "'{entity}'[{index}].{name}: nested objects are not supported"
                ))
            })?;

            Ok((name, value))
        })
        .collect()
}

fn value(json: &Json) -> Option<Value> {
    Some(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64()?),
        },
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(value).collect::<Option<_>>()?),
        Json::Object(_) => return None,
    })
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_are_grouped_by_entity() {
        let store = store_from_json(json!({
            "Customer": [
                { "id": 1, "name": "Ada", "score": 1.5, "tags": ["a", "b"] },
                { "id": 2, "name": null }
            ],
            "Order": []
        }))
        .expect("store");

        assert_eq!(store.len("Customer"), 2);
        assert_eq!(store.len("Order"), 0);
    }

    #[test]
    fn scalar_conversion() {
        assert_eq!(value(&json!(7)), Some(Value::Int(7)));
        assert_eq!(value(&json!(2.5)), Some(Value::Float(2.5)));
        assert_eq!(value(&json!("x")), Some(Value::from("x")));
        assert_eq!(value(&json!(null)), Some(Value::Null));
        assert_eq!(
            value(&json!([1, true])),
            Some(Value::List(vec![Value::Int(1), Value::Bool(true)]))
        );
        assert_eq!(value(&json!({ "a": 1 })), None);
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        let err = store_from_json(json!([])).expect_err("array");
        assert!(err.to_string().contains("top level"), "{err}");

        let err = store_from_json(json!({ "Customer": {} })).expect_err("object");
        assert!(err.to_string().contains("'Customer'"), "{err}");

        let err = store_from_json(json!({ "Customer": [{ "addr": { "city": "x" } }] }))
            .expect_err("nested");
        assert!(err.to_string().contains("'Customer'[0].addr"), "{err}");
    }
}
