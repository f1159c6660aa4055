#![cfg(feature = "json")]

use anyhow::Result;

#[test]
fn json_and_yaml_inputs_agree() -> Result<()> {
    let yaml = "
time_units: generations
demes:
 - name: ancestor
   epochs:
    - start_size: 100
 - name: derived
   ancestors: [ancestor]
   start_time: 50
   epochs:
    - start_size: 10
";
    let json = r#"
{
  "time_units": "generations",
  "demes": [
    {"name": "ancestor", "epochs": [{"start_size": 100}]},
    {
      "name": "derived",
      "ancestors": ["ancestor"],
      "start_time": 50,
      "epochs": [{"start_size": 10}]
    }
  ]
}
"#;
    let from_yaml = demes_parser::loads(yaml)?;
    let from_json = demes_parser::loads_json(json)?;
    assert_eq!(from_yaml, from_json);
    Ok(())
}

#[test]
fn infinity_string_in_json() -> Result<()> {
    let json = r#"
{
  "time_units": "generations",
  "demes": [
    {
      "name": "a",
      "start_time": "Infinity",
      "epochs": [{"start_size": 100}]
    }
  ]
}
"#;
    let graph = demes_parser::loads_json(json)?;
    assert!(graph.deme(0).unwrap().start_time().is_infinite());
    Ok(())
}

#[test]
fn json_round_trip() -> Result<()> {
    let yaml = "
time_units: generations
defaults:
  epoch:
    start_size: 100
demes:
 - name: a
 - name: b
migrations:
 - demes: [a, b]
   rate: 0.01
pulses:
 - sources: [a]
   dest: b
   time: 10
   proportions: [0.25]
";
    let graph = demes_parser::loads(yaml)?;
    // infinite times must encode as the string "Infinity" for JSON
    let json = graph.as_json_string()?;
    let round_trip = demes_parser::loads_json(&json)?;
    assert_eq!(graph, round_trip);

    // and via a reader
    let from_reader = demes_parser::load_json(json.as_bytes())?;
    assert_eq!(graph, from_reader);
    Ok(())
}
