use ferrous_adapters::{Container, ContainerConfig, DiError, Implementation, Key};

fn unit(name: &'static str) -> Implementation {
    Implementation::of(move |_| Ok(name))
}

fn node(deps: &[&'static str]) -> Implementation {
    deps.iter().fold(
        Implementation::of(|args| Ok(args.len())),
        |implementation, dep| implementation.depends_on_key(*dep),
    )
}

#[test]
fn test_two_node_cycle_reports_path() {
    let container = Container::new();
    container.add_component("A", node(&["B"]), vec![]).unwrap();
    container.add_component("B", node(&["A"]), vec![]).unwrap();

    match container.get_instance(&Key::named("A")) {
        Err(DiError::Circular(path)) => {
            let names: Vec<&str> = path.iter().map(Key::display_name).collect();
            assert_eq!(names, vec!["A", "B", "A"]);
        }
        other => panic!("expected circular error, got {:?}", other.map(|_| ())),
    }

    let err = container.get_instance(&Key::named("A")).unwrap_err();
    assert_eq!(err.to_string(), "Circular dependency: A -> B -> A");
}

#[test]
fn test_acyclic_part_still_resolves() {
    let container = Container::new();
    container.add_component("A", node(&["B"]), vec![]).unwrap();
    container.add_component("B", node(&["A"]), vec![]).unwrap();
    container.add_component("C", node(&["D"]), vec![]).unwrap();
    container.add_component("D", unit("d"), vec![]).unwrap();

    assert!(container.get_instance(&Key::named("A")).unwrap_err().is_cyclic());
    assert!(container.get_instance(&Key::named("B")).unwrap_err().is_cyclic());

    let c = container.get::<usize>(&Key::named("C")).unwrap();
    assert_eq!(*c, 1);
    let d = container.get::<&'static str>(&Key::named("D")).unwrap();
    assert_eq!(*d, "d");
}

#[test]
fn test_self_dependency() {
    let container = Container::new();
    container.add_component("Self", node(&["Self"]), vec![]).unwrap();

    match container.get_instance(&Key::named("Self")) {
        Err(DiError::Circular(path)) => assert_eq!(path.len(), 2),
        other => panic!("expected circular error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_cycle_entered_midway() {
    // Entry -> A -> B -> C -> A
    let container = Container::new();
    container.add_component("Entry", node(&["A"]), vec![]).unwrap();
    container.add_component("A", node(&["B"]), vec![]).unwrap();
    container.add_component("B", node(&["C"]), vec![]).unwrap();
    container.add_component("C", node(&["A"]), vec![]).unwrap();

    match container.get_instance(&Key::named("Entry")) {
        Err(DiError::Circular(path)) => {
            let names: Vec<&str> = path.iter().map(Key::display_name).collect();
            assert_eq!(names, vec!["A", "B", "C", "A"]);
        }
        other => panic!("expected circular error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_failed_cycle_leaves_no_cached_state() {
    let container = Container::new();
    container.add_component("A", node(&["B"]), vec![]).unwrap();
    container.add_component("B", node(&["A"]), vec![]).unwrap();

    for _ in 0..3 {
        assert!(container.get_instance(&Key::named("A")).unwrap_err().is_cyclic());
    }
}

#[test]
fn test_depth_limit() {
    let container = Container::builder()
        .config(ContainerConfig::default().with_max_depth(4))
        .build();

    let names = ["L0", "L1", "L2", "L3", "L4", "L5"];
    for pair in names.windows(2) {
        container.add_component(pair[0], node(&[pair[1]]), vec![]).unwrap();
    }
    container.add_component("L5", unit("leaf"), vec![]).unwrap();

    assert!(matches!(
        container.get_instance(&Key::named("L0")),
        Err(DiError::DepthExceeded(4))
    ));
    // Short enough chains still work
    assert!(container.get_instance(&Key::named("L3")).is_ok());
}
