use crate::errors::DispatchError;

/// Scalar wire representations the codec can extract directly: binary
/// (base64 string), bool, double, float, timestamp (RFC 3339 string), int,
/// long, string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Binary,
    Bool,
    Double,
    Float,
    Timestamp,
    Int,
    Long,
    Str,
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ScalarKind::Binary => "binary",
            ScalarKind::Bool => "bool",
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Int => "int",
            ScalarKind::Long => "long",
            ScalarKind::Str => "string",
        };
        write!(f, "{}", s)
    }
}

/// One named field of a record target, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTarget {
    pub name: String,
    pub target: MarshalTarget,
}

/// Type descriptor driving both directions of the codec.
///
/// Resolved once per declared payload shape (at handler registration) and
/// shared read-only across requests. Presence wrappers are only legal as
/// immediate record field targets and never nest; [`MarshalTarget::validate`]
/// enforces both before the first request.
#[derive(Debug, Clone, PartialEq)]
pub enum MarshalTarget {
    Scalar(ScalarKind),
    List(Box<MarshalTarget>),
    Map(Box<MarshalTarget>),
    Record(Vec<FieldTarget>),
    Presence(Box<MarshalTarget>),
}

impl MarshalTarget {
    pub fn scalar(kind: ScalarKind) -> Self {
        MarshalTarget::Scalar(kind)
    }

    pub fn list(element: MarshalTarget) -> Self {
        MarshalTarget::List(Box::new(element))
    }

    pub fn map(value: MarshalTarget) -> Self {
        MarshalTarget::Map(Box::new(value))
    }

    pub fn record(fields: Vec<(&str, MarshalTarget)>) -> Self {
        MarshalTarget::Record(
            fields
                .into_iter()
                .map(|(name, target)| FieldTarget {
                    name: name.to_string(),
                    target,
                })
                .collect(),
        )
    }

    pub fn presence(inner: MarshalTarget) -> Self {
        MarshalTarget::Presence(Box::new(inner))
    }

    /// Reject shapes the codec cannot honor.
    ///
    /// Run at handler registration so a bad declaration fails startup, and
    /// again defensively per request where it maps to a 500 for that request
    /// only.
    pub fn validate(&self) -> Result<(), DispatchError> {
        self.validate_at(false)
    }

    fn validate_at(&self, record_field: bool) -> Result<(), DispatchError> {
        match self {
            MarshalTarget::Scalar(_) => Ok(()),
            MarshalTarget::List(elem) | MarshalTarget::Map(elem) => elem.validate_at(false),
            MarshalTarget::Record(fields) => {
                for field in fields {
                    field.target.validate_at(true)?;
                }
                Ok(())
            }
            MarshalTarget::Presence(inner) => {
                if !record_field {
                    return Err(DispatchError::marshal(
                        "presence target is only supported as a record field",
                    ));
                }
                if matches!(inner.as_ref(), MarshalTarget::Presence(_)) {
                    return Err(DispatchError::marshal(
                        "presence target cannot nest inside another presence target",
                    ));
                }
                inner.validate_at(false)
            }
        }
    }
}
