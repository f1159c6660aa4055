use demes_parser::{DemesError, SizeFunction};

#[test]
fn minimal_graph() {
    let yaml = "
time_units: generations
demes:
 - name: a
   epochs:
    - start_size: 100
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.num_demes(), 1);
    assert_eq!(graph.generation_time(), 1.0);
    let deme = graph.get_deme_from_name("a").unwrap();
    assert!(deme.start_time().is_infinite());
    let epoch = deme.get_epoch(0).unwrap();
    assert_eq!(epoch.end_time(), 0.0);
    assert_eq!(epoch.start_size(), 100.0);
    assert_eq!(epoch.end_size(), 100.0);
    assert!(matches!(epoch.size_function(), SizeFunction::Constant));
    assert_eq!(epoch.selfing_rate(), 0.0);
    assert_eq!(epoch.cloning_rate(), 0.0);
}

#[test]
fn toplevel_fields_are_preserved() {
    let yaml = "
description: A model with everything filled in.
time_units: years
generation_time: 25
doi:
 - \"https://doi.org/10.0000/0000\"
metadata:
  sampled_individuals: 10
demes:
 - name: X
   description: the only deme
   epochs:
    - start_size: 1000
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.description(), "A model with everything filled in.");
    assert_eq!(graph.time_units().to_string(), "years");
    assert_eq!(graph.generation_time(), 25.0);
    assert_eq!(graph.doi().count(), 1);
    assert!(!graph.metadata().is_empty());
    assert_eq!(
        graph.get_deme_from_name("X").unwrap().description(),
        "the only deme"
    );
}

#[test]
fn custom_time_units() {
    let yaml = "
time_units: kiloyears
generation_time: 0.03
demes:
 - name: a
   epochs:
    - start_size: 100
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.time_units().to_string(), "kiloyears");
}

#[test]
fn epoch_sizes_carry_forward() {
    let yaml = "
time_units: generations
demes:
 - name: deme
   epochs:
    - start_size: 50
      end_time: 100
    - end_size: 200
      end_time: 10
    - {}
";
    let graph = demes_parser::loads(yaml).unwrap();
    let deme = graph.get_deme_from_name("deme").unwrap();
    assert_eq!(deme.num_epochs(), 3);
    // second epoch inherits the previous end_size as its start_size
    let second = deme.get_epoch(1).unwrap();
    assert_eq!(second.start_size(), 50.0);
    assert_eq!(second.end_size(), 200.0);
    assert!(matches!(second.size_function(), SizeFunction::Exponential));
    // third epoch inherits 200 for both sizes
    let third = deme.get_epoch(2).unwrap();
    assert_eq!(third.start_size(), 200.0);
    assert_eq!(third.end_size(), 200.0);
    assert!(matches!(third.size_function(), SizeFunction::Constant));
    assert_eq!(third.end_time(), 0.0);
}

#[test]
fn explicit_linear_size_function_is_accepted() {
    let yaml = "
time_units: generations
demes:
 - name: deme
   epochs:
    - start_size: 50
      end_time: 100
    - start_size: 50
      end_size: 100
      size_function: linear
";
    let graph = demes_parser::loads(yaml).unwrap();
    let epoch = graph.deme(0).unwrap().get_epoch(1).unwrap();
    assert!(matches!(epoch.size_function(), SizeFunction::Linear));
}

#[test]
fn explicit_exponential_with_equal_sizes_is_accepted() {
    let yaml = "
time_units: generations
demes:
 - name: deme
   epochs:
    - start_size: 50
      end_time: 100
    - start_size: 50
      end_size: 50
      size_function: exponential
";
    let graph = demes_parser::loads(yaml).unwrap();
    let epoch = graph.deme(0).unwrap().get_epoch(1).unwrap();
    assert!(matches!(epoch.size_function(), SizeFunction::Exponential));
}

#[test]
fn multiple_ancestors_with_explicit_proportions() {
    let yaml = "
time_units: generations
demes:
 - name: ancestor1
   epochs:
    - start_size: 50
      end_time: 100
 - name: ancestor2
   epochs:
    - start_size: 50
      end_time: 100
 - name: admixed
   ancestors: [ancestor1, ancestor2]
   proportions: [0.9, 0.1]
   start_time: 100
   epochs:
    - start_size: 200
";
    let graph = demes_parser::loads(yaml).unwrap();
    let admixed = graph.get_deme_from_name("admixed").unwrap();
    assert_eq!(admixed.num_ancestors(), 2);
    assert_eq!(admixed.proportions()[0], 0.9);
    assert_eq!(admixed.proportions()[1], 0.1);
    assert_eq!(admixed.start_time(), 100.0);
}

#[test]
fn deme_defaults_provide_ancestors() {
    let yaml = "
time_units: generations
defaults:
  deme:
    ancestors: [root]
    start_time: 100
  epoch:
    start_size: 50
demes:
 - name: root
   ancestors: []
   start_time: Infinity
 - name: A
 - name: B
";
    let graph = demes_parser::loads(yaml).unwrap();
    for name in ["A", "B"] {
        let deme = graph.get_deme_from_name(name).unwrap();
        assert_eq!(deme.ancestor_names(), ["root".to_string()]);
        assert_eq!(deme.start_time(), 100.0);
    }
    assert!(graph
        .get_deme_from_name("root")
        .unwrap()
        .start_time()
        .is_infinite());
}

#[test]
fn migration_defaults_provide_the_rate() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
  migration:
    rate: 0.125
demes:
 - name: a
 - name: b
migrations:
 - source: a
   dest: b
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.migrations().len(), 1);
    assert_eq!(graph.migrations()[0].rate(), 0.125);
    assert!(graph.migrations()[0].start_time().is_infinite());
    assert_eq!(graph.migrations()[0].end_time(), 0.0);
}

#[test]
fn pulse_defaults_satisfy_required_fields() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
  pulse:
    sources: [a]
    proportions: [0.25]
    time: 5
demes:
 - name: a
 - name: b
pulses:
 - dest: b
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.pulses().len(), 1);
    assert_eq!(graph.pulses()[0].sources(), ["a".to_string()]);
    assert_eq!(graph.pulses()[0].proportions()[0], 0.25);
    assert_eq!(graph.pulses()[0].time(), 5.0);
}

#[test]
fn symmetric_migration_expansion_count() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
 - name: b
 - name: c
 - name: d
migrations:
 - demes: [a, b, c, d]
   rate: 0.01
";
    let graph = demes_parser::loads(yaml).unwrap();
    // n(n-1) ordered pairs
    assert_eq!(graph.migrations().len(), 12);
}

#[test]
fn pulse_may_coincide_with_source_end_time() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
   epochs:
    - end_time: 10
 - name: b
pulses:
 - sources: [a]
   dest: b
   time: 10
   proportions: [0.5]
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.pulses().len(), 1);
}

#[test]
fn pulse_may_coincide_with_dest_start_time() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: deme0
 - name: deme1
   ancestors: [deme0]
   start_time: 10
 - name: deme2
pulses:
 - sources: [deme2]
   dest: deme1
   time: 10
   proportions: [0.5]
";
    assert!(demes_parser::loads(yaml).is_ok());
}

#[test]
fn pulse_may_not_coincide_with_source_start_time() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: deme0
 - name: deme1
   ancestors: [deme0]
   start_time: 10
 - name: deme2
pulses:
 - sources: [deme1]
   dest: deme2
   time: 10
   proportions: [0.5]
";
    assert!(matches!(
        demes_parser::loads(yaml),
        Err(DemesError::ValidationError { .. })
    ));
}

#[test]
fn multi_sourced_pulse() {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
 - name: b
 - name: c
pulses:
 - sources: [a, b]
   dest: c
   time: 7
   proportions: [0.4, 0.5]
";
    let graph = demes_parser::loads(yaml).unwrap();
    assert_eq!(graph.pulses()[0].sources().len(), 2);
}
