use crate::presence::Presence;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Typed in-memory value produced and consumed by the codec.
///
/// Scalar variants correspond one-to-one with [`super::ScalarKind`]; the
/// container variants mirror the container targets. `Record` keeps declared
/// field order; `Map` keeps the original JSON object keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Null,
    Binary(Vec<u8>),
    Bool(bool),
    Double(f64),
    Float(f32),
    Timestamp(DateTime<Utc>),
    Int(i32),
    Long(i64),
    Str(String),
    List(Vec<Decoded>),
    Map(BTreeMap<String, Decoded>),
    Record(Vec<(String, Decoded)>),
    Presence(Presence<Box<Decoded>>),
}

impl Decoded {
    pub fn str(s: impl Into<String>) -> Self {
        Decoded::Str(s.into())
    }

    /// Record constructor preserving field order.
    pub fn record(fields: Vec<(&str, Decoded)>) -> Self {
        Decoded::Record(
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }

    /// Look up a record field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Decoded> {
        match self {
            Decoded::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Decoded::Null)
    }
}
