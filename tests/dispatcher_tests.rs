//! Tests for the phased dispatch pipeline.
//!
//! Covers handler invocation with decoded bodies, the per-operation deadline
//! race, role enforcement, panic recovery, and the error-to-status mapping.

mod tracing_util;

use http::Method;
use serde_json::json;
use specbind::auth::RoleRequirement;
use specbind::dispatcher::Dispatcher;
use specbind::marshal::{Decoded, MarshalTarget, ScalarKind};
use specbind::registry::HandlerRegistry;
use specbind::spec::{OperationDescriptor, ParamKind, ParameterDescriptor, ParameterLocation};
use std::collections::HashMap;
use std::time::Duration;
use tracing_util::TestTracing;

fn init() -> TestTracing {
    let size = std::env::var("SPECBIND_STACK_SIZE")
        .ok()
        .and_then(|v| {
            if let Some(hex) = v.strip_prefix("0x") {
                usize::from_str_radix(hex, 16).ok()
            } else {
                v.parse().ok()
            }
        })
        .unwrap_or(0x10000);
    may::config().set_stack_size(size);
    TestTracing::init()
}

fn operation(
    id: &str,
    method: Method,
    path: &str,
    parameters: Vec<ParameterDescriptor>,
    roles: Option<RoleRequirement>,
    timeout_ms: u64,
) -> OperationDescriptor {
    let (group, handler_method) = id.split_once('.').expect("two-segment id");
    OperationDescriptor {
        method,
        path_pattern: path.to_string(),
        route_pattern: path.replace('{', ":").replace('}', ""),
        operation_id: id.to_string(),
        group: group.to_string(),
        handler_method: handler_method.to_string(),
        parameters,
        roles,
        timeout: Duration::from_millis(timeout_ms),
    }
}

fn item_target() -> MarshalTarget {
    MarshalTarget::record(vec![
        ("id", MarshalTarget::scalar(ScalarKind::Int)),
        ("name", MarshalTarget::scalar(ScalarKind::Str)),
    ])
}

#[test]
fn test_dispatch_returns_encoded_handler_result() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.add",
        Method::POST,
        "/inventory",
        vec![],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "add", Some(item_target()), |inv| {
            let body = inv.body.expect("decoded body");
            assert_eq!(body.field("name"), Some(&Decoded::str("widget")));
            Ok(Some(Decoded::record(vec![
                ("id", Decoded::Int(7)),
                ("name", Decoded::str("widget")),
            ])))
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.add",
        HashMap::new(),
        Vec::new(),
        Some(json!({ "id": 7, "name": "widget" })),
        Vec::new(),
    );

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, Some(json!({ "id": 7, "name": "widget" })));
}

#[test]
fn test_handler_returning_nothing_gives_empty_200() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.remove",
        Method::DELETE,
        "/inventory/{id}",
        vec![ParameterDescriptor {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            kind: ParamKind::Int,
        }],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "remove", None, |inv| {
            assert_eq!(inv.args.get_i64("id"), Some(3));
            Ok(None)
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.remove",
        HashMap::from([("id".to_string(), "3".to_string())]),
        Vec::new(),
        None,
        Vec::new(),
    );

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, None);
}

#[test]
fn test_missing_role_is_403_and_handler_never_runs() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.add",
        Method::POST,
        "/inventory",
        vec![],
        Some(RoleRequirement {
            any_of: Some(vec!["admin".to_string()]),
            ..Default::default()
        }),
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "add", None, |_inv| {
            panic!("handler must not run for an unauthorized caller");
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.add",
        HashMap::new(),
        Vec::new(),
        None,
        vec!["user".to_string()],
    );

    assert_eq!(reply.status, 403);
}

#[test]
fn test_unknown_operation_is_404() {
    let _tracing = init();
    let dispatcher = Dispatcher::new(Vec::new(), HandlerRegistry::new()).unwrap();
    let reply = dispatcher.dispatch(
        "Nowhere.noop",
        HashMap::new(),
        Vec::new(),
        None,
        Vec::new(),
    );
    assert_eq!(reply.status, 404);
    let body = reply.body.expect("error body");
    assert!(body["error"].as_str().unwrap().contains("Nowhere.noop"));
}

#[test]
fn test_bad_path_parameter_is_400() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.get",
        Method::GET,
        "/inventory/{id}",
        vec![ParameterDescriptor {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            kind: ParamKind::Int,
        }],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry.register("Inventory", "get", None, |_inv| Ok(None)).unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.get",
        HashMap::from([("id".to_string(), "not-a-number".to_string())]),
        Vec::new(),
        None,
        Vec::new(),
    );
    assert_eq!(reply.status, 400);
}

#[test]
fn test_undecodable_body_is_400() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.add",
        Method::POST,
        "/inventory",
        vec![],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "add", Some(item_target()), |_inv| Ok(None))
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.add",
        HashMap::new(),
        Vec::new(),
        Some(json!({ "id": "seven", "name": "widget" })),
        Vec::new(),
    );
    assert_eq!(reply.status, 400);
}

#[test]
fn test_deadline_exceeded_is_504() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.slow",
        Method::GET,
        "/inventory/slow",
        vec![],
        None,
        50,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "slow", None, |_inv| {
            may::coroutine::sleep(Duration::from_secs(10));
            Ok(None)
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.slow",
        HashMap::new(),
        Vec::new(),
        None,
        Vec::new(),
    );

    assert_eq!(reply.status, 504);
    let body = reply.body.expect("error body");
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Inventory.slow"));
    assert!(message.contains("50"));
}

#[test]
fn test_handler_error_maps_through_status() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.get",
        Method::GET,
        "/inventory/{id}",
        vec![],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "get", None, |_inv| {
            Err(specbind::DispatchError::not_found("no such item"))
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.get",
        HashMap::new(),
        Vec::new(),
        None,
        Vec::new(),
    );
    assert_eq!(reply.status, 404);
}

#[test]
fn test_handler_panic_is_500() {
    let _tracing = init();
    let ops = vec![operation(
        "Inventory.get",
        Method::GET,
        "/inventory/{id}",
        vec![],
        None,
        5000,
    )];

    let mut registry = HandlerRegistry::new();
    registry
        .register("Inventory", "get", None, |_inv| -> Result<Option<Decoded>, specbind::DispatchError> {
            panic!("boom");
        })
        .unwrap();

    let dispatcher = Dispatcher::new(ops, registry).unwrap();
    let reply = dispatcher.dispatch(
        "Inventory.get",
        HashMap::new(),
        Vec::new(),
        None,
        Vec::new(),
    );
    assert_eq!(reply.status, 500);
}

#[test]
fn test_unregistered_operation_fails_construction() {
    let _tracing = init();
    let ops = vec![
        operation("Inventory.get", Method::GET, "/inventory/{id}", vec![], None, 5000),
        operation("Inventory.list", Method::GET, "/inventory", vec![], None, 5000),
    ];

    let mut registry = HandlerRegistry::new();
    registry.register("Inventory", "get", None, |_inv| Ok(None)).unwrap();

    let Err(err) = Dispatcher::new(ops, registry) else {
        panic!("construction must fail with an unregistered operation");
    };
    let report = err.to_string();
    assert!(report.contains("Inventory.list"));
}
