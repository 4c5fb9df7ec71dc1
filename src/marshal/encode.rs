use super::value::Decoded;
use crate::presence::Presence;
use base64::Engine;
use serde_json::{json, Map, Number, Value};

/// Encode a typed value back to wire JSON. Mirrors [`super::decode`] and
/// never fails: the one runtime value JSON cannot represent (a non-finite
/// float) falls back to the single-key wrapper `{"response": "<value>"}`.
pub fn encode(value: &Decoded) -> Value {
    match value {
        Decoded::Null => Value::Null,
        Decoded::Binary(bytes) => {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        Decoded::Bool(b) => Value::Bool(*b),
        Decoded::Double(d) => encode_float(*d),
        Decoded::Float(f) => encode_float(f64::from(*f)),
        Decoded::Timestamp(ts) => Value::String(ts.to_rfc3339()),
        Decoded::Int(n) => Value::Number(Number::from(*n)),
        Decoded::Long(n) => Value::Number(Number::from(*n)),
        Decoded::Str(s) => Value::String(s.clone()),
        Decoded::List(items) => Value::Array(items.iter().map(encode).collect()),
        Decoded::Map(entries) => {
            let mut out = Map::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode(item));
            }
            Value::Object(out)
        }
        Decoded::Record(fields) => {
            let mut out = Map::new();
            for (name, field) in fields {
                match field {
                    // Absent presence fields are omitted from the object
                    // entirely; present-null emits an explicit null.
                    Decoded::Presence(Presence::Absent) => {}
                    Decoded::Presence(Presence::Null) => {
                        out.insert(name.clone(), Value::Null);
                    }
                    Decoded::Presence(Presence::Value(inner)) => {
                        out.insert(name.clone(), encode(inner));
                    }
                    other => {
                        out.insert(name.clone(), encode(other));
                    }
                }
            }
            Value::Object(out)
        }
        // A bare presence value only exists inside records; encode the
        // conservative equivalent rather than failing.
        Decoded::Presence(Presence::Value(inner)) => encode(inner),
        Decoded::Presence(_) => Value::Null,
    }
}

fn encode_float(v: f64) -> Value {
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        None => json!({ "response": v.to_string() }),
    }
}
