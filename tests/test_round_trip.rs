use anyhow::Result;
use demes_parser::Graph;

fn round_trip_equality(yaml: &str) -> Result<Graph> {
    let graph = demes_parser::loads(yaml)?;
    // through the canonical mapping
    let from_value = demes_parser::parse(&graph.to_value())?;
    assert_eq!(graph, from_value);
    // through the canonical string form
    let from_string = demes_parser::loads(&graph.as_string()?)?;
    assert_eq!(graph, from_string);
    Ok(graph)
}

#[test]
fn minimal() -> Result<()> {
    round_trip_equality(
        "
time_units: generations
demes:
 - name: a
   epochs:
    - start_size: 100
",
    )?;
    Ok(())
}

#[test]
fn every_toplevel_field() -> Result<()> {
    round_trip_equality(
        "
description: a model with all top-level fields
time_units: years
generation_time: 25
doi:
 - \"https://doi.org/10.0000/0000\"
metadata:
  individuals: 10
  nested:
    key: value
demes:
 - name: a
   epochs:
    - start_size: 100
",
    )?;
    Ok(())
}

#[test]
fn ancestry_and_multiple_epochs() -> Result<()> {
    let graph = round_trip_equality(
        "
time_units: generations
demes:
 - name: ancestral
   epochs:
    - start_size: 7300
 - name: modern
   ancestors: [ancestral]
   start_time: 5920
   epochs:
    - start_size: 1000
      end_time: 2040
    - start_size: 1000
      end_size: 29725
",
    )?;
    assert_eq!(graph.num_demes(), 2);
    Ok(())
}

#[test]
fn symmetric_migrations_round_trip_in_expanded_form() -> Result<()> {
    let graph = round_trip_equality(
        "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
 - name: b
 - name: c
migrations:
 - demes: [a, b, c]
   rate: 0.01
",
    )?;
    assert_eq!(graph.migrations().len(), 6);
    // the canonical form carries no defaults block and no symmetric form
    let canonical = graph.as_string()?;
    assert!(!canonical.contains("defaults"));
    let reparsed = demes_parser::loads(&canonical)?;
    assert_eq!(reparsed.migrations().len(), 6);
    Ok(())
}

#[test]
fn unsorted_pulses_round_trip_sorted() -> Result<()> {
    let graph = round_trip_equality(
        "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
 - name: b
pulses:
 - sources: [a]
   dest: b
   time: 1
   proportions: [0.1]
 - sources: [a]
   dest: b
   time: 1.2
   proportions: [0.2]
",
    )?;
    let times: Vec<f64> = graph.pulses().iter().map(|p| f64::from(p.time())).collect();
    assert_eq!(times, vec![1.2, 1.0]);
    Ok(())
}

#[test]
fn defaults_heavy_document() -> Result<()> {
    round_trip_equality(
        "
time_units: generations
defaults:
  deme:
    description: generic deme
  epoch:
    start_size: 100
    selfing_rate: 0.1
  migration:
    rate: 0.01
  pulse:
    sources: [alpha]
    proportions: [0.2]
demes:
 - name: alpha
 - name: beta
   defaults:
     epoch:
       start_size: 250
migrations:
 - source: alpha
   dest: beta
pulses:
 - dest: beta
   time: 12
",
    )?;
    Ok(())
}

#[test]
fn builder_output_round_trips() -> Result<()> {
    let mut b = demes_parser::GraphBuilder::new_generations();
    let epoch = demes_parser::UnresolvedEpoch {
        start_size: Some(100.0),
        ..Default::default()
    };
    b.add_deme("A", vec![epoch], demes_parser::DemeHistory::default(), None);
    b.add_deme("B", vec![epoch], demes_parser::DemeHistory::default(), None);
    b.add_symmetric_migration(&["A", "B"], 1e-4, None, None);
    b.add_pulse(&["A"], "B", 50.0, &[0.5]);
    let graph = b.resolve()?;
    let round_trip = demes_parser::loads(&graph.as_string()?)?;
    assert_eq!(graph, round_trip);
    Ok(())
}
