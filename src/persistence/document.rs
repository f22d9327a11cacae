//! Wire document.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Self-describing snapshot of an engine.
///
/// ```json
/// {
///   "$type": "heater",
///   "state": "heating",
///   "blackboard": { "heating": { "target": 3 } }
/// }
/// ```
///
/// `blackboard` only holds entries that differ from their kind's reference
/// baseline; the current state is one of them when it has diverged. Keys are
/// kept sorted so serializing the same engine twice yields identical bytes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$type")]
    pub owner: String,
    pub state: String,
    pub blackboard: BTreeMap<String, Value>,
}

impl Document {
    /// Parse and validate a JSON document.
    pub fn parse(json: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate the shape of an already parsed JSON value.
    ///
    /// Missing fields, non-string identifiers, a non-object blackboard and
    /// `null` entries are all reported as [`Error::MalformedDocument`].
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let Value::Object(mut object) = value else {
            return Err(Error::malformed("document is not an object"));
        };

        let owner = take_string(&mut object, "$type")?;
        let state = take_string(&mut object, "state")?;
        let blackboard = match object.remove("blackboard") {
            Some(Value::Object(entries)) => entries,
            Some(Value::Null) | None => return Err(Error::malformed("missing 'blackboard'")),
            Some(_) => return Err(Error::malformed("'blackboard' is not an object")),
        };

        let mut entries = BTreeMap::new();
        for (id, entry) in blackboard {
            if entry.is_null() {
                return Err(Error::malformed(format!("blackboard entry '{id}' is null")));
            }
            entries.insert(id, entry);
        }

        Ok(Self {
            owner,
            state,
            blackboard: entries,
        })
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn take_string(object: &mut serde_json::Map<String, Value>, field: &str) -> Result<String, Error> {
    match object.remove(field) {
        Some(Value::String(value)) => Ok(value),
        Some(Value::Null) | None => Err(Error::malformed(format!("missing '{field}'"))),
        Some(_) => Err(Error::malformed(format!("'{field}' is not a string"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn malformed(value: Value) -> String {
        match Document::from_value(value) {
            Err(Error::MalformedDocument { reason }) => reason,
            other => panic!("expected malformed document, got {other:?}"),
        }
    }

    #[test]
    fn parses_well_formed_document() {
        let doc = Document::parse(
            r#"{"$type":"heater","state":"idle","blackboard":{"settings":{"unit":"F"}}}"#,
        )
        .unwrap();

        assert_eq!(doc.owner, "heater");
        assert_eq!(doc.state, "idle");
        assert_eq!(doc.blackboard["settings"], json!({ "unit": "F" }));
    }

    #[test]
    fn serializes_owner_as_type_field() {
        let doc = Document {
            owner: "heater".to_string(),
            state: "off".to_string(),
            blackboard: BTreeMap::new(),
        };
        assert_eq!(
            doc.to_json().unwrap(),
            r#"{"$type":"heater","state":"off","blackboard":{}}"#
        );
    }

    #[test]
    fn blackboard_keys_are_sorted() {
        let doc = Document::from_value(json!({
            "$type": "heater",
            "state": "off",
            "blackboard": { "zeta": 1, "alpha": 2 }
        }))
        .unwrap();
        assert_eq!(
            doc.to_json().unwrap(),
            r#"{"$type":"heater","state":"off","blackboard":{"alpha":2,"zeta":1}}"#
        );
    }

    #[test]
    fn missing_fields_are_malformed() {
        assert!(malformed(json!({ "state": "off", "blackboard": {} })).contains("$type"));
        assert!(malformed(json!({ "$type": "heater", "blackboard": {} })).contains("state"));
        assert!(malformed(json!({ "$type": "heater", "state": "off" })).contains("blackboard"));
    }

    #[test]
    fn null_values_are_malformed() {
        assert!(malformed(json!({ "$type": null, "state": "off", "blackboard": {} }))
            .contains("$type"));
        assert!(malformed(json!({
            "$type": "heater",
            "state": "off",
            "blackboard": { "settings": null }
        }))
        .contains("settings"));
    }

    #[test]
    fn wrong_shapes_are_malformed() {
        malformed(json!([1, 2, 3]));
        malformed(json!({ "$type": 7, "state": "off", "blackboard": {} }));
        malformed(json!({ "$type": "heater", "state": "off", "blackboard": [] }));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            Document::parse("{ not json"),
            Err(Error::MalformedDocument { .. })
        ));
    }
}
