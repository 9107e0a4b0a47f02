/// Unit tests for DiError and DiResult types
/// These tests pin the rendered messages and the classification helpers

use ferrous_adapters::{
    DiError, DiResult, DiscoveryError, Key, LifecycleAction, LifecycleState, key_of_type,
};
use std::error::Error;

#[test]
fn test_error_display_not_found() {
    let error = DiError::NotFound(Key::named("TestService"));
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Component not found: TestService");
    assert!(display_str.contains("not found"));
}

#[test]
fn test_error_display_unsatisfied() {
    let error = DiError::UnsatisfiedDependency {
        component: Key::named("OrderService"),
        dependency: key_of_type::<u32>(),
    };
    assert_eq!(
        error.to_string(),
        "Unsatisfied dependency: OrderService requires u32, which is not registered"
    );
    assert!(error.is_unsatisfied());
    assert!(!error.is_cyclic());
}

#[test]
fn test_error_display_circular() {
    let path = vec![Key::named("ServiceA"), Key::named("ServiceB"), Key::named("ServiceA")];
    let error = DiError::Circular(path);
    assert_eq!(error.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
    assert!(error.is_cyclic());
}

#[test]
fn test_error_display_depth_exceeded() {
    let error = DiError::DepthExceeded(1024);
    assert_eq!(error.to_string(), "Max depth 1024 exceeded");
}

#[test]
fn test_error_display_lifecycle_transition() {
    let error = DiError::LifecycleTransition {
        subject: "container".into(),
        from: LifecycleState::Stopped,
        action: LifecycleAction::Start,
    };
    assert_eq!(
        error.to_string(),
        "Invalid lifecycle transition for container: cannot start when stopped"
    );
    assert!(error.is_lifecycle_transition());
}

#[test]
fn test_error_display_lifecycle_hook() {
    let error = DiError::LifecycleHook {
        key: Key::named("pool"),
        action: LifecycleAction::Dispose,
        message: "connection reset".into(),
    };
    assert_eq!(error.to_string(), "Lifecycle dispose failed for pool: connection reset");
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch {
        key: Key::named("port"),
        expected: "alloc::string::String",
    };
    assert_eq!(error.to_string(), "Type mismatch for port: expected alloc::string::String");
}

#[test]
fn test_error_display_registration() {
    assert_eq!(
        DiError::DuplicateKey(Key::named("x")).to_string(),
        "Duplicate registration for key: x"
    );
    assert_eq!(
        DiError::InvalidRegistration {
            key: Key::named("x"),
            reason: "bad arity".into(),
        }
        .to_string(),
        "Invalid registration for x: bad arity"
    );
}

#[test]
fn test_error_display_disposal_lists_every_error() {
    let error = DiError::Disposal(vec![
        DiError::ContainerDisposed,
        DiError::Config("oops".into()),
    ]);
    assert_eq!(
        error.to_string(),
        "2 error(s) during disposal: Container has been disposed; Configuration error: oops"
    );
}

#[test]
fn test_discovery_error_is_transparent() {
    let discovery = DiscoveryError::WrongType {
        archive: None,
        name: "Composer".into(),
        expected: "Composition".into(),
    };
    let error: DiError = discovery.clone().into();
    assert_eq!(error.to_string(), discovery.to_string());
    assert!(matches!(error, DiError::CompositionDiscovery(_)));
}

#[test]
fn test_same_kind_compares_variants_only() {
    let a = DiError::NotFound(Key::named("a"));
    let b = DiError::NotFound(Key::named("b"));
    let c = DiError::DepthExceeded(3);
    assert!(a.same_kind(&b));
    assert!(!a.same_kind(&c));
}

#[test]
fn test_error_trait_implementation() {
    let error = DiError::NotFound(Key::named("TestService"));
    let _: &dyn Error = &error;
    assert!(error.source().is_none());
}

#[test]
fn test_di_result_propagation() {
    fn inner() -> DiResult<u8> {
        Err(DiError::ContainerDisposed)
    }

    fn outer() -> DiResult<u8> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert!(matches!(outer(), Err(DiError::ContainerDisposed)));
}
