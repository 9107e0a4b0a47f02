#![cfg(feature = "snapshot")]
/// Snapshot and restore tests
///
/// A snapshot carries keys, implementation names, explicit parameters and
/// behavior chains. Restoring it must yield containers whose chains are
/// indistinguishable from freshly registered ones.

use ferrous_adapters::{
    behavior_chain, describe_chain, AdapterSnapshot, Automating, BehaviorKind, Caching,
    ConstantValue, Container, ContainerConfig, ContainerSnapshot, DiError, Implementation,
    ImplementationCatalog, KeySnapshot, Key, LoggingMonitor, NullLifecycleStrategy, NullMonitor,
    Parameter, ReferenceScope, ThreadLocalProxy, ThreadLocalizing, key_of_type,
};
use std::sync::Arc;

struct Settings {
    name: String,
}

struct Gateway {
    settings: Arc<Settings>,
    retries: Arc<i64>,
}

struct Buffer;

fn settings_impl() -> Implementation {
    Implementation::of(|_| Ok(Settings { name: "prod".into() }))
}

fn gateway_impl() -> Implementation {
    Implementation::of(|args| {
        Ok(Gateway {
            settings: args.take::<Settings>()?,
            retries: args.take::<i64>()?,
        })
    })
    .depends_on::<Settings>()
    .depends_on_key("retries")
}

fn catalog() -> ImplementationCatalog {
    ImplementationCatalog::new()
        .register(settings_impl())
        .register(gateway_impl())
        .register(Implementation::of(|_| Ok(Buffer)))
        .register_key::<Settings>()
        .register_key::<Gateway>()
}

fn populated() -> Container {
    let container = Container::builder()
        .factory(Automating::new().wrap(Caching::new()))
        .config(ContainerConfig::default().with_max_depth(32))
        .build();
    container
        .add_component(key_of_type::<Settings>(), settings_impl(), vec![])
        .unwrap();
    container
        .add_component(
            key_of_type::<Gateway>(),
            gateway_impl(),
            vec![
                Parameter::component(key_of_type::<Settings>()),
                Parameter::constant(ConstantValue::Int(3)),
            ],
        )
        .unwrap();
    container
}

#[test]
fn test_snapshot_roundtrip_through_json() {
    let original = populated();
    let snapshot = original.snapshot().unwrap();
    assert_eq!(snapshot.components.len(), 2);
    assert_eq!(snapshot.config.max_depth, 32);
    assert_eq!(
        snapshot.components[0].behaviors,
        vec![BehaviorKind::Automated, BehaviorKind::Cached(ReferenceScope::Process)]
    );

    let json = snapshot.to_json().unwrap();
    let parsed = ContainerSnapshot::from_json(&json).unwrap();
    assert_eq!(parsed, snapshot);

    let restored = Container::restore(
        parsed,
        &catalog(),
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap();

    assert_eq!(restored.config().max_depth, 32);
    assert_eq!(restored.keys(), original.keys());
    for key in original.keys() {
        let before = original.adapter(&key).unwrap();
        let after = restored.adapter(&key).unwrap();
        assert_eq!(describe_chain(before.as_ref()), describe_chain(after.as_ref()));
        assert_eq!(after.parameters(), before.parameters());
    }

    let gateway = restored.get::<Gateway>(&key_of_type::<Gateway>()).unwrap();
    assert_eq!(gateway.settings.name, "prod");
    assert_eq!(*gateway.retries, 3);
    let again = restored.get::<Gateway>(&key_of_type::<Gateway>()).unwrap();
    assert!(Arc::ptr_eq(&gateway, &again));
}

#[test]
fn test_snapshot_keeps_thread_scopes() {
    let container = Container::builder().factory(ThreadLocalizing::new()).build();
    container
        .add_component("buffer", Implementation::of(|_| Ok(Buffer)), vec![])
        .unwrap();

    let json = container.snapshot().unwrap().to_json().unwrap();
    assert!(json.contains("thread_localized"), "{}", json);

    let restored = Container::restore(
        ContainerSnapshot::from_json(&json).unwrap(),
        &catalog(),
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap();
    let adapter = restored.adapter(&Key::named("buffer")).unwrap();
    assert_eq!(behavior_chain(adapter.as_ref()), vec![BehaviorKind::ThreadLocalized]);
    assert!(restored
        .get::<ThreadLocalProxy<Buffer>>(&Key::named("buffer"))
        .unwrap()
        .try_target()
        .is_ok());
}

#[test]
fn test_restore_rejects_custom_behaviors() {
    let snapshot = ContainerSnapshot {
        config: ContainerConfig::default(),
        components: vec![AdapterSnapshot {
            key: KeySnapshot::Named("buffer".into()),
            implementation: std::any::type_name::<Buffer>().to_string(),
            parameters: vec![],
            behaviors: vec![BehaviorKind::Custom("Timed".into())],
        }],
    };

    let err = Container::restore(
        snapshot,
        &catalog(),
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap_err();
    match err {
        DiError::Snapshot(message) => assert!(message.contains("Timed"), "{}", message),
        other => panic!("unexpected: {}", other),
    }
}

#[test]
fn test_restore_requires_catalog_entries() {
    let snapshot = populated().snapshot().unwrap();

    let err = Container::restore(
        snapshot.clone(),
        &ImplementationCatalog::new(),
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap_err();
    assert!(matches!(err, DiError::Snapshot(_)));

    // Implementations alone are not enough for type keys
    let without_keys = ImplementationCatalog::new()
        .register(settings_impl())
        .register(gateway_impl());
    let err = Container::restore(
        snapshot,
        &without_keys,
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap_err();
    assert!(err.to_string().contains("type key"), "{}", err);
}

#[test]
fn test_malformed_json_is_a_snapshot_error() {
    assert!(matches!(
        ContainerSnapshot::from_json("{ not json"),
        Err(DiError::Snapshot(_))
    ));
}

#[test]
fn test_logging_monitor_serde_keeps_prefix_only() {
    let monitor = LoggingMonitor::with_prefix("[billing]");
    let json = serde_json::to_string(&monitor).unwrap();
    assert_eq!(json, r#"{"prefix":"[billing]"}"#);

    let restored: LoggingMonitor = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.prefix(), "[billing]");

    // The restored monitor is fully usable as a sink
    let container = Container::builder().monitor(Arc::new(restored)).build();
    container.add_component("n", Implementation::of(|_| Ok(1u8)), vec![]).unwrap();
    assert!(container.get_instance(&Key::named("n")).is_ok());
}
