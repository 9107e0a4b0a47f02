/// Environment-driven configuration tests
///
/// These mutate process environment variables, so every test that touches
/// them runs serially.

use ferrous_adapters::config::{ENV_MAX_DEPTH, ENV_SCOPE_ISOLATION};
use ferrous_adapters::{
    describe_chain, Container, ContainerConfig, DiError, Implementation, ScopeIsolation,
    DEFAULT_MAX_DEPTH,
};
use serial_test::serial;
use std::env;

fn clear_env() {
    env::remove_var(ENV_SCOPE_ISOLATION);
    env::remove_var(ENV_MAX_DEPTH);
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = ContainerConfig::from_env().unwrap();
    assert_eq!(config, ContainerConfig::default());
    assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    assert_eq!(config.scope_isolation, ScopeIsolation::AlwaysIsolate);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    env::set_var(ENV_SCOPE_ISOLATION, "scope-ensures-isolation");
    env::set_var(ENV_MAX_DEPTH, "64");

    let config = ContainerConfig::from_env().unwrap();
    assert_eq!(config.scope_isolation, ScopeIsolation::ScopeEnsuresIsolation);
    assert_eq!(config.max_depth, 64);

    // The thread-localizing default factory follows the configured mode
    let container = Container::builder().config(config).thread_localizing().build();
    let adapter = container
        .add_component("buffer", Implementation::of(|_| Ok(Vec::<u8>::new())), vec![])
        .unwrap();
    assert_eq!(describe_chain(adapter.as_ref()), "ThreadCached+ConstructorInjector");
    clear_env();
}

#[test]
#[serial]
fn test_env_accepts_boolean_isolation() {
    clear_env();
    env::set_var(ENV_SCOPE_ISOLATION, "false");
    assert_eq!(
        ContainerConfig::from_env().unwrap().scope_isolation,
        ScopeIsolation::ScopeEnsuresIsolation
    );
    env::set_var(ENV_SCOPE_ISOLATION, "TRUE");
    assert_eq!(
        ContainerConfig::from_env().unwrap().scope_isolation,
        ScopeIsolation::AlwaysIsolate
    );
    clear_env();
}

#[test]
#[serial]
fn test_env_rejects_invalid_values() {
    clear_env();
    env::set_var(ENV_MAX_DEPTH, "0");
    assert!(matches!(ContainerConfig::from_env(), Err(DiError::Config(_))));

    env::set_var(ENV_MAX_DEPTH, "deep");
    assert!(matches!(ContainerConfig::from_env(), Err(DiError::Config(_))));

    env::remove_var(ENV_MAX_DEPTH);
    env::set_var(ENV_SCOPE_ISOLATION, "sometimes");
    assert!(matches!(ContainerConfig::from_env(), Err(DiError::Config(_))));
    clear_env();
}

#[test]
#[serial]
fn test_env_override_keeps_explicit_values() {
    clear_env();
    env::set_var(ENV_MAX_DEPTH, "12");
    let config = ContainerConfig::default()
        .with_scope_isolation(false)
        .with_env_override()
        .unwrap();
    assert_eq!(config.max_depth, 12);
    assert_eq!(config.scope_isolation, ScopeIsolation::ScopeEnsuresIsolation);
    clear_env();
}

#[cfg(feature = "snapshot")]
#[test]
fn test_config_serde_defaults_missing_fields() {
    let config: ContainerConfig = serde_json::from_str(r#"{ "max_depth": 8 }"#).unwrap();
    assert_eq!(config.max_depth, 8);
    assert_eq!(config.scope_isolation, ScopeIsolation::AlwaysIsolate);

    let json = serde_json::to_string(&config.with_scope_isolation(false)).unwrap();
    assert!(json.contains("\"scope-ensures-isolation\""), "{}", json);
}
