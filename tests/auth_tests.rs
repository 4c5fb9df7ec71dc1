//! Tests for role-requirement evaluation.
//!
//! The bucket semantics are deliberate: `anyOf` is at-least-one, `oneOf` is
//! exactly-one, and `allOf` is set equality of the caller's roles against
//! the required roles.

use specbind::auth::RoleRequirement;
use specbind::errors::DispatchError;

fn roles(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn requirement(json: serde_json::Value) -> RoleRequirement {
    serde_json::from_value(json).expect("parse role requirement")
}

#[test]
fn test_any_of_passes_on_single_match() {
    let req = requirement(serde_json::json!({ "anyOf": ["admin", "auditor"] }));
    assert!(req.evaluate(&roles(&["auditor", "user"])).is_ok());
}

#[test]
fn test_any_of_fails_on_no_match() {
    let req = requirement(serde_json::json!({ "anyOf": ["admin", "auditor"] }));
    let err = req.evaluate(&roles(&["user"])).unwrap_err();
    assert!(matches!(err, DispatchError::Authorization(_)));
    assert_eq!(err.status(), 403);
}

#[test]
fn test_one_of_passes_on_exactly_one_match() {
    let req = requirement(serde_json::json!({ "oneOf": ["admin", "owner"] }));
    assert!(req.evaluate(&roles(&["owner", "user"])).is_ok());
}

#[test]
fn test_one_of_fails_on_two_matches() {
    let req = requirement(serde_json::json!({ "oneOf": ["admin", "owner"] }));
    let err = req.evaluate(&roles(&["admin", "owner"])).unwrap_err();
    assert_eq!(err.status(), 403);
}

#[test]
fn test_one_of_fails_on_no_match() {
    let req = requirement(serde_json::json!({ "oneOf": ["admin", "owner"] }));
    assert!(req.evaluate(&roles(&["user"])).is_err());
}

#[test]
fn test_all_of_requires_set_equality() {
    let req = requirement(serde_json::json!({ "allOf": ["reader", "writer"] }));
    assert!(req.evaluate(&roles(&["writer", "reader"])).is_ok());
}

#[test]
fn test_all_of_rejects_strict_superset() {
    let req = requirement(serde_json::json!({ "allOf": ["reader", "writer"] }));
    let err = req.evaluate(&roles(&["reader", "writer", "admin"])).unwrap_err();
    assert_eq!(err.status(), 403);
}

#[test]
fn test_all_of_rejects_subset() {
    let req = requirement(serde_json::json!({ "allOf": ["reader", "writer"] }));
    assert!(req.evaluate(&roles(&["reader"])).is_err());
}

#[test]
fn test_all_buckets_must_pass() {
    let req = requirement(serde_json::json!({
        "anyOf": ["staff"],
        "allOf": ["staff"]
    }));
    assert!(req.evaluate(&roles(&["staff"])).is_ok());
    // anyOf passes but allOf sees an extra role.
    assert!(req.evaluate(&roles(&["staff", "admin"])).is_err());
}

#[test]
fn test_empty_requirement_is_vacuous() {
    let req = RoleRequirement::default();
    assert!(req.is_empty());
    assert!(req.evaluate(&roles(&[])).is_ok());
    assert!(req.evaluate(&roles(&["anything"])).is_ok());
}
