/// Thread isolation tests for both scope isolation modes.
///
/// Components resolved per thread carry a unique id so that tests can tell
/// instances apart across threads.
use ferrous_adapters::{
    AnyArc, Caching, ComponentAdapter, ComponentFactory, ComponentMonitor, Container, DiResult,
    Implementation, Key, LifecycleStrategy, Parameter, Properties, ScopeIsolation, ThreadLocalProxy,
    ThreadLocalizing,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug)]
struct Session {
    id: usize,
}

struct Holder {
    session: Arc<Session>,
}

struct ProxyHolder {
    session: Arc<ThreadLocalProxy<Session>>,
}

fn session_impl() -> Implementation {
    static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
    Implementation::of(|_| Ok(Session { id: NEXT_ID.fetch_add(1, Ordering::SeqCst) }))
}

/// Thread-isolates the listed keys and caches everything else process-wide.
struct Routing {
    isolated: HashSet<Key>,
    localizing: ThreadLocalizing,
    caching: Caching,
}

impl ComponentFactory for Routing {
    fn create_component_adapter(
        &self,
        monitor: &Arc<dyn ComponentMonitor>,
        lifecycle: &Arc<dyn LifecycleStrategy>,
        properties: &mut Properties,
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
    ) -> DiResult<Arc<dyn ComponentAdapter>> {
        if self.isolated.contains(&key) {
            self.localizing
                .create_component_adapter(monitor, lifecycle, properties, key, implementation, parameters)
        } else {
            self.caching
                .create_component_adapter(monitor, lifecycle, properties, key, implementation, parameters)
        }
    }
}

fn routed(isolation: ScopeIsolation) -> Container {
    Container::builder()
        .factory(Routing {
            isolated: [Key::named("session")].into_iter().collect(),
            localizing: ThreadLocalizing::with_isolation(isolation),
            caching: Caching::new(),
        })
        .build()
}

// ===== Scope ensures isolation (thread-local cache) =====

#[test]
fn test_thread_cache_distinct_per_thread() {
    let container = routed(ScopeIsolation::ScopeEnsuresIsolation);
    container.add_component("session", session_impl(), vec![]).unwrap();
    let key = Key::named("session");

    let here_1 = container.get::<Session>(&key).unwrap();
    let here_2 = container.get::<Session>(&key).unwrap();
    assert!(Arc::ptr_eq(&here_1, &here_2));

    let remote = container.clone();
    let there_id = thread::spawn(move || {
        let a = remote.get::<Session>(&Key::named("session")).unwrap();
        let b = remote.get::<Session>(&Key::named("session")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        a.id
    })
    .join()
    .unwrap();

    assert_ne!(here_1.id, there_id);
}

#[test]
fn test_thread_cache_freezes_into_process_cache() {
    // Holder is cached process-wide and captures the session of the thread
    // that first built it. Every other thread keeps seeing that session
    // through Holder even though a direct lookup yields its own.
    let container = routed(ScopeIsolation::ScopeEnsuresIsolation);
    container.add_component("session", session_impl(), vec![]).unwrap();
    container
        .add_component(
            "holder",
            Implementation::of(|args| Ok(Holder { session: args.take::<Session>()? }))
                .depends_on_key("session"),
            vec![],
        )
        .unwrap();

    let holder = container.get::<Holder>(&Key::named("holder")).unwrap();
    let captured = holder.session.id;

    let remote = container.clone();
    let (through_holder, direct) = thread::spawn(move || {
        let holder = remote.get::<Holder>(&Key::named("holder")).unwrap();
        let direct = remote.get::<Session>(&Key::named("session")).unwrap();
        (holder.session.id, direct.id)
    })
    .join()
    .unwrap();

    assert_eq!(through_holder, captured);
    assert_ne!(direct, captured);
}

// ===== Always isolate (proxy) =====

#[test]
fn test_proxy_routes_each_thread_to_its_own_instance() {
    let container = routed(ScopeIsolation::AlwaysIsolate);
    container.add_component("session", session_impl(), vec![]).unwrap();

    let proxy = container
        .get::<ThreadLocalProxy<Session>>(&Key::named("session"))
        .unwrap();
    let again = container
        .get::<ThreadLocalProxy<Session>>(&Key::named("session"))
        .unwrap();
    assert!(Arc::ptr_eq(&proxy, &again)); // One shared handle

    let t1 = proxy.with(|s| s.id).unwrap();
    assert_eq!(proxy.with(|s| s.id).unwrap(), t1);

    let shared = proxy.clone();
    let t2 = thread::spawn(move || shared.with(|s| s.id).unwrap()).join().unwrap();
    assert_ne!(t1, t2);
}

#[test]
fn test_proxy_isolates_indirect_dependencies() {
    let container = routed(ScopeIsolation::AlwaysIsolate);
    container.add_component("session", session_impl(), vec![]).unwrap();
    container
        .add_component(
            "holder",
            Implementation::of(|args| {
                Ok(ProxyHolder {
                    session: args.take::<ThreadLocalProxy<Session>>()?,
                })
            })
            .depends_on_key("session"),
            vec![],
        )
        .unwrap();

    let holder = container.get::<ProxyHolder>(&Key::named("holder")).unwrap();
    let here = holder.session.with(|s| s.id).unwrap();

    let remote = container.clone();
    let there = thread::spawn(move || {
        let holder = remote.get::<ProxyHolder>(&Key::named("holder")).unwrap();
        holder.session.with(|s| s.id).unwrap()
    })
    .join()
    .unwrap();

    assert_ne!(here, there);
}

#[test]
fn test_proxy_reset_affects_only_calling_thread() {
    let container = routed(ScopeIsolation::AlwaysIsolate);
    container.add_component("session", session_impl(), vec![]).unwrap();
    let proxy = container
        .get::<ThreadLocalProxy<Session>>(&Key::named("session"))
        .unwrap();

    let barrier = Barrier::new(2);
    thread::scope(|s| {
        let t2 = s.spawn(|| {
            let before = proxy.with(|s| s.id).unwrap();
            barrier.wait(); // T2 has its instance
            barrier.wait(); // T1 has reset and rebuilt
            let after = proxy.with(|s| s.id).unwrap();
            (before, after)
        });

        let t1_before = proxy.with(|s| s.id).unwrap();
        barrier.wait();
        let old: AnyArc = proxy.reset().unwrap();
        container.release(&old).unwrap();
        let t1_after = proxy.with(|s| s.id).unwrap();
        barrier.wait();

        let (t2_before, t2_after) = t2.join().unwrap();
        assert_ne!(t1_before, t1_after);
        assert_eq!(t2_before, t2_after);
        assert_ne!(t1_after, t2_after);
    });
}

#[test]
fn test_scope_isolation_from_bool() {
    assert_eq!(ScopeIsolation::from(true), ScopeIsolation::AlwaysIsolate);
    assert_eq!(ScopeIsolation::from(false), ScopeIsolation::ScopeEnsuresIsolation);
    assert_eq!(ScopeIsolation::default(), ScopeIsolation::AlwaysIsolate);
    assert_eq!(ThreadLocalizing::new().isolation(), ScopeIsolation::AlwaysIsolate);
}

#[test]
fn test_container_thread_localizing_follows_config() {
    use ferrous_adapters::{describe_chain, ContainerConfig};

    let mode_a = Container::builder()
        .config(ContainerConfig::default().with_scope_isolation(false))
        .thread_localizing()
        .build();
    let adapter = mode_a.add_component("session", session_impl(), vec![]).unwrap();
    assert_eq!(describe_chain(adapter.as_ref()), "ThreadCached+ConstructorInjector");

    let mode_b = Container::builder().thread_localizing().build();
    let adapter = mode_b.add_component("session", session_impl(), vec![]).unwrap();
    assert_eq!(describe_chain(adapter.as_ref()), "ThreadLocalized+ConstructorInjector");
}

#[test]
fn test_thread_localized_flush_rebuilds_for_calling_thread() {
    use ferrous_adapters::{ConstructorInjector, NullLifecycleStrategy, NullMonitor, ThreadLocalized};

    let leaf = ConstructorInjector::new(
        Key::named("session"),
        session_impl(),
        vec![],
        Arc::new(NullLifecycleStrategy),
        Arc::new(NullMonitor),
    )
    .unwrap();
    let localized = Arc::new(ThreadLocalized::new(Arc::new(leaf)));

    // Registered as a finished chain through a factory that adds nothing
    let container = Container::builder()
        .factory(ferrous_adapters::ConstructorInjection)
        .build();
    container.add_adapter(localized.clone()).unwrap();

    let proxy = container
        .get::<ThreadLocalProxy<Session>>(&Key::named("session"))
        .unwrap();
    let before = proxy.with(|s| s.id).unwrap();
    assert!(localized.flush().is_some());
    assert!(localized.flush().is_none());
    let after = proxy.with(|s| s.id).unwrap();
    assert_ne!(before, after);
}
