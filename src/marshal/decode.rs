use super::target::{MarshalTarget, ScalarKind};
use super::value::Decoded;
use crate::errors::DispatchError;
use crate::presence::Presence;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decode a JSON value into the typed shape described by `target`.
///
/// Recursive over the target, not the runtime value. JSON `null` decodes to
/// [`Decoded::Null`] under any non-presence target; an incompatible
/// representation fails with a binding error (400) and aborts the whole
/// decode; a list with one malformed element yields no partial result.
/// A presence target reaching this entry point directly is an unsupported
/// shape (500): presence only means something relative to an enclosing
/// record key.
pub fn decode(value: &Value, target: &MarshalTarget) -> Result<Decoded, DispatchError> {
    match target {
        MarshalTarget::Scalar(kind) => decode_scalar(value, *kind),
        MarshalTarget::List(element) => decode_list(value, element),
        MarshalTarget::Map(element) => decode_map(value, element),
        MarshalTarget::Record(fields) => decode_record(value, fields),
        MarshalTarget::Presence(_) => Err(DispatchError::marshal(
            "presence target is only supported as a record field",
        )),
    }
}

fn decode_scalar(value: &Value, kind: ScalarKind) -> Result<Decoded, DispatchError> {
    if value.is_null() {
        return Ok(Decoded::Null);
    }
    match kind {
        ScalarKind::Binary => {
            let s = expect_str(value, kind)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(s)
                .map_err(|e| mismatch(kind, &format!("invalid base64: {e}")))?;
            Ok(Decoded::Binary(bytes))
        }
        ScalarKind::Bool => match value {
            Value::Bool(b) => Ok(Decoded::Bool(*b)),
            other => Err(mismatch(kind, &type_name(other))),
        },
        ScalarKind::Double => value
            .as_f64()
            .map(Decoded::Double)
            .ok_or_else(|| mismatch(kind, &type_name(value))),
        ScalarKind::Float => value
            .as_f64()
            .map(|v| Decoded::Float(v as f32))
            .ok_or_else(|| mismatch(kind, &type_name(value))),
        ScalarKind::Timestamp => {
            let s = expect_str(value, kind)?;
            let ts = DateTime::parse_from_rfc3339(s)
                .map_err(|e| mismatch(kind, &format!("invalid RFC 3339 timestamp: {e}")))?;
            Ok(Decoded::Timestamp(ts.with_timezone(&Utc)))
        }
        ScalarKind::Int => {
            let n = value
                .as_i64()
                .ok_or_else(|| mismatch(kind, &type_name(value)))?;
            let n = i32::try_from(n).map_err(|_| mismatch(kind, "integer out of int range"))?;
            Ok(Decoded::Int(n))
        }
        ScalarKind::Long => value
            .as_i64()
            .map(Decoded::Long)
            .ok_or_else(|| mismatch(kind, &type_name(value))),
        ScalarKind::Str => Ok(Decoded::Str(expect_str(value, kind)?.to_string())),
    }
}

fn decode_list(value: &Value, element: &MarshalTarget) -> Result<Decoded, DispatchError> {
    match value {
        Value::Null => Ok(Decoded::Null),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(decode_element(item, element)?);
            }
            Ok(Decoded::List(out))
        }
        other => Err(DispatchError::binding(format!(
            "expected array, got {}",
            type_name(other)
        ))),
    }
}

fn decode_map(value: &Value, element: &MarshalTarget) -> Result<Decoded, DispatchError> {
    match value {
        Value::Null => Ok(Decoded::Null),
        Value::Object(map) => {
            let mut out = BTreeMap::new();
            for (key, item) in map {
                out.insert(key.clone(), decode_element(item, element)?);
            }
            Ok(Decoded::Map(out))
        }
        other => Err(DispatchError::binding(format!(
            "expected object, got {}",
            type_name(other)
        ))),
    }
}

fn decode_record(
    value: &Value,
    fields: &[super::target::FieldTarget],
) -> Result<Decoded, DispatchError> {
    match value {
        Value::Null => Ok(Decoded::Null),
        Value::Object(map) => {
            let mut out = Vec::with_capacity(fields.len());
            // Every declared field resolves, possibly to Null or an absent
            // presence marker. There is no partial construction.
            for field in fields {
                let decoded = match &field.target {
                    MarshalTarget::Presence(inner) => {
                        decode_presence_field(map, &field.name, inner)?
                    }
                    other => match map.get(&field.name) {
                        Some(v) => decode(v, other)?,
                        None => Decoded::Null,
                    },
                };
                out.push((field.name.clone(), decoded));
            }
            Ok(Decoded::Record(out))
        }
        other => Err(DispatchError::binding(format!(
            "expected object, got {}",
            type_name(other)
        ))),
    }
}

/// Presence is decided by key membership in the enclosing object, not by the
/// decoded value: an explicit null is present-null.
fn decode_presence_field(
    map: &serde_json::Map<String, Value>,
    name: &str,
    inner: &MarshalTarget,
) -> Result<Decoded, DispatchError> {
    match map.get(name) {
        None => Ok(Decoded::Presence(Presence::Absent)),
        Some(Value::Null) => Ok(Decoded::Presence(Presence::Null)),
        Some(raw) => {
            let value = decode(raw, inner)?;
            Ok(Decoded::Presence(Presence::Value(Box::new(value))))
        }
    }
}

/// Element decode for lists and maps; presence elements were already rejected
/// at target validation, so surface them as an unsupported shape here too.
fn decode_element(item: &Value, element: &MarshalTarget) -> Result<Decoded, DispatchError> {
    match element {
        MarshalTarget::Presence(_) => Err(DispatchError::marshal(
            "presence target is only supported as a record field",
        )),
        other => decode(item, other),
    }
}

fn expect_str<'a>(value: &'a Value, kind: ScalarKind) -> Result<&'a str, DispatchError> {
    value
        .as_str()
        .ok_or_else(|| mismatch(kind, &type_name(value)))
}

fn mismatch(kind: ScalarKind, got: &str) -> DispatchError {
    DispatchError::binding(format!("expected {kind}, got {got}"))
}

fn type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
