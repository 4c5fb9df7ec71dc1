//! Role-based authorization predicates.
//!
//! An operation may carry up to three independent role buckets. Each bucket
//! present in the requirement must pass against the caller's resolved role
//! set; absent buckets are vacuously satisfied. The bucket semantics are
//! deliberate and differ from the usual reading of their names:
//!
//! - `one_of`: the caller matches **exactly one** required role; matching two
//!   or more is a failure.
//! - `any_of`: the caller matches at least one required role.
//! - `all_of`: the caller's role set is **set-equal** to the required set; a
//!   strict superset fails.

use crate::errors::DispatchError;
use serde::Deserialize;
use std::collections::HashSet;

/// Role predicate attached to an operation via the `x-auth-roles` vendor
/// extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RoleRequirement {
    #[serde(default, rename = "oneOf")]
    pub one_of: Option<Vec<String>>,
    #[serde(default, rename = "anyOf")]
    pub any_of: Option<Vec<String>>,
    #[serde(default, rename = "allOf")]
    pub all_of: Option<Vec<String>>,
}

impl RoleRequirement {
    /// Whether any bucket is present at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.one_of.is_none() && self.any_of.is_none() && self.all_of.is_none()
    }

    /// Evaluate every present bucket against the caller's roles.
    ///
    /// All present buckets must pass; the first failing bucket terminates the
    /// request with an authorization error.
    pub fn evaluate(&self, caller_roles: &[String]) -> Result<(), DispatchError> {
        if let Some(required) = &self.one_of {
            if !matches_exactly_one(caller_roles, required) {
                return Err(DispatchError::authorization(
                    "caller roles must match exactly one required role",
                ));
            }
        }
        if let Some(required) = &self.any_of {
            if !matches_any(caller_roles, required) {
                return Err(DispatchError::authorization(
                    "caller roles match none of the required roles",
                ));
            }
        }
        if let Some(required) = &self.all_of {
            if !matches_all(caller_roles, required) {
                return Err(DispatchError::authorization(
                    "caller roles must equal the required role set",
                ));
            }
        }
        Ok(())
    }
}

fn matches_exactly_one(caller: &[String], required: &[String]) -> bool {
    let caller: HashSet<&str> = caller.iter().map(String::as_str).collect();
    let mut hits = 0;
    for role in required {
        if caller.contains(role.as_str()) {
            hits += 1;
            if hits > 1 {
                return false;
            }
        }
    }
    hits == 1
}

fn matches_any(caller: &[String], required: &[String]) -> bool {
    let caller: HashSet<&str> = caller.iter().map(String::as_str).collect();
    required.iter().any(|role| caller.contains(role.as_str()))
}

// Set equality, not subset containment.
fn matches_all(caller: &[String], required: &[String]) -> bool {
    let caller: HashSet<&str> = caller.iter().map(String::as_str).collect();
    let required: HashSet<&str> = required.iter().map(String::as_str).collect();
    caller == required
}
