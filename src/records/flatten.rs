use serde_json::Value as JsonValue;

use super::{Record, RecordError};

const SEPARATOR: char = '.';

/// Flatten nested objects into dotted keys, e.g.
/// `{"a":{"b":1},"c":2}` becomes `{"a.b":1,"c":2}`.
///
/// Keys keep the order in which they are encountered. Arrays are leaves and
/// are not descended into. An empty nested object is kept as a leaf.
///
/// Fails when two fields end up under the same dotted key, e.g. a literal
/// `"a.b"` next to `{"a":{"b":..}}`.
pub fn flatten_record(record: Record) -> Result<Record, RecordError> {
    let mut out = Record::new();
    for (key, value) in record {
        flatten_into(&mut out, key, value)?;
    }
    Ok(out)
}

fn flatten_into(out: &mut Record, path: String, value: JsonValue) -> Result<(), RecordError> {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let mut child_path = String::with_capacity(path.len() + key.len() + 1);
                child_path.push_str(&path);
                child_path.push(SEPARATOR);
                child_path.push_str(&key);
                flatten_into(out, child_path, child)?;
            }
        }
        leaf => {
            if out.contains_key(&path) {
                return Err(RecordError::NotTabular(format!(
                    "duplicate flattened key {}",
                    path
                )));
            }
            out.insert(path, leaf);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: JsonValue) -> Record {
        match value {
            JsonValue::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_flat_record_unchanged() {
        let input = record(json!({"id": 1, "status": "delivered"}));
        assert_eq!(flatten_record(input.clone()).unwrap(), input);
    }

    #[test]
    fn test_nested_paths() {
        let input = record(json!({
            "id": 7,
            "customer": {"name": "Asha", "address": {"city": "Pune", "zip": "411001"}},
            "status": "delivered"
        }));

        let keys: Vec<String> = flatten_record(input).unwrap().keys().cloned().collect();
        assert_eq!(
            keys,
            vec![
                "id",
                "customer.name",
                "customer.address.city",
                "customer.address.zip",
                "status"
            ]
        );
    }

    #[test]
    fn test_arrays_and_empty_objects_are_leaves() {
        let input = record(json!({
            "items": [{"sku": "a"}, {"sku": "b"}],
            "meta": {},
            "extra": {"tags": ["x"], "note": null}
        }));

        let out = flatten_record(input).unwrap();
        assert_eq!(out["items"], json!([{"sku": "a"}, {"sku": "b"}]));
        assert_eq!(out["meta"], json!({}));
        assert_eq!(out["extra.tags"], json!(["x"]));
        assert_eq!(out["extra.note"], JsonValue::Null);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_colliding_paths_rejected() {
        let input = record(json!({"a.b": 1, "a": {"b": 2}, "status": "delivered"}));

        let err = flatten_record(input).unwrap_err();
        assert!(matches!(err, RecordError::NotTabular(_)));
        assert_eq!(
            err.to_string(),
            "Document is not tabular: duplicate flattened key a.b"
        );
    }
}
