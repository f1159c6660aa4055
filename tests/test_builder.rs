use demes_parser::{DemeHistory, GraphBuilder, TimeUnits, UnresolvedEpoch};

fn constant_epoch(size: f64) -> UnresolvedEpoch {
    UnresolvedEpoch {
        start_size: Some(size),
        ..Default::default()
    }
}

#[test]
fn builder_without_demes_fails() {
    let b = GraphBuilder::new_generations();
    assert!(b.resolve().is_err());
}

#[test]
fn non_generation_units_require_generation_time() {
    let mut b = GraphBuilder::new(TimeUnits::Years, None);
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    assert!(b.resolve().is_err());

    let mut b = GraphBuilder::new(TimeUnits::Years, Some(25.0));
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    assert!(b.resolve().is_ok());
}

#[test]
fn ancestry_through_the_builder() {
    let mut b = GraphBuilder::new_generations();
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    b.add_deme(
        "B",
        vec![constant_epoch(50.0)],
        DemeHistory {
            ancestors: vec!["A".to_string()],
            start_time: Some(100.0),
            ..Default::default()
        },
        Some("a derived deme"),
    );
    let graph = b.resolve().unwrap();
    let b_deme = graph.get_deme_from_name("B").unwrap();
    assert_eq!(b_deme.start_time(), 100.0);
    assert_eq!(b_deme.num_ancestors(), 1);
    assert_eq!(b_deme.proportions()[0], 1.0);
    assert_eq!(b_deme.description(), "a derived deme");
}

#[test]
fn builder_enforces_declaration_order() {
    let mut b = GraphBuilder::new_generations();
    b.add_deme(
        "B",
        vec![constant_epoch(50.0)],
        DemeHistory {
            ancestors: vec!["A".to_string()],
            start_time: Some(100.0),
            ..Default::default()
        },
        None,
    );
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    assert!(matches!(
        b.resolve(),
        Err(demes_parser::DemesError::UnknownReference { .. })
    ));
}

#[test]
fn symmetric_migration_expansion() {
    let mut b = GraphBuilder::new_generations();
    for name in ["A", "B", "C"] {
        b.add_deme(name, vec![constant_epoch(100.0)], DemeHistory::default(), None);
    }
    b.add_symmetric_migration(&["A", "B", "C"], 0.01, None, None);
    let graph = b.resolve().unwrap();
    assert_eq!(graph.migrations().len(), 6);
}

#[test]
fn metadata_from_a_serializable_type() {
    #[derive(serde::Serialize)]
    struct Meta {
        simulator: String,
        replicates: u32,
    }
    let mut b = GraphBuilder::new_generations();
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    b.set_toplevel_metadata(&Meta {
        simulator: "example".to_string(),
        replicates: 7,
    })
    .unwrap();
    let graph = b.resolve().unwrap();
    assert_eq!(
        graph
            .metadata()
            .get(&serde_yaml::Value::from("replicates"))
            .and_then(serde_yaml::Value::as_u64),
        Some(7)
    );
}

#[test]
fn scalar_metadata_is_rejected() {
    let mut b = GraphBuilder::new_generations();
    b.add_deme("A", vec![constant_epoch(100.0)], DemeHistory::default(), None);
    assert!(b.set_toplevel_metadata(&"just a string").is_err());
}
