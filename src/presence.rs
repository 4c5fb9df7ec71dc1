//! Tri-state field wrapper for partial-update payloads.
//!
//! A PATCH body needs to distinguish "the client did not mention this field"
//! from "the client explicitly set it to null". `Option<T>` collapses those
//! two cases, so patch record fields use [`Presence<T>`] instead: the decoder
//! records whether the enclosing JSON object contained the key at all,
//! independently of the decoded value.

/// A record field value that tracks whether it appeared in the source object.
///
/// Three states: absent, present-null, and present-value. A `Presence` is
/// never nested inside another `Presence`; target registration rejects that
/// shape before any request is served.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence<T> {
    /// The key was not in the enclosing object.
    Absent,
    /// The key was present with an explicit JSON null.
    Null,
    /// The key was present with a decodable value.
    Value(T),
}

impl<T> Presence<T> {
    /// Whether the key appeared in the source object (null counts as present).
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Presence::Absent)
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Presence::Absent)
    }

    /// The carried value, if this is the present-value state.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Presence::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Presence<U> {
        match self {
            Presence::Absent => Presence::Absent,
            Presence::Null => Presence::Null,
            Presence::Value(v) => Presence::Value(f(v)),
        }
    }

    /// Collapse to an `Option`, losing the absent/null distinction.
    pub fn flatten(self) -> Option<T> {
        self.into_value()
    }
}

impl<T> From<Option<T>> for Presence<T> {
    /// `Some` becomes present-value, `None` becomes present-null.
    ///
    /// There is deliberately no conversion producing `Absent`: absence is a
    /// property of the source object, only the decoder asserts it.
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Presence::Value(v),
            None => Presence::Null,
        }
    }
}
