//! Build a graph from code instead of a document.

use crate::error::DemesError;
use crate::specification::{Graph, SizeFunction};
use crate::time::TimeUnits;
use serde_yaml::{Mapping, Value};

fn insert(map: &mut Mapping, key: &str, value: Value) {
    map.insert(Value::from(key), value);
}

fn insert_number(map: &mut Mapping, key: &str, value: Option<f64>) {
    if let Some(value) = value {
        insert(map, key, Value::from(value));
    }
}

fn name_sequence(names: &[&str]) -> Value {
    Value::Sequence(names.iter().map(|name| Value::from(*name)).collect())
}

fn number_sequence(values: &[f64]) -> Value {
    Value::Sequence(values.iter().map(|value| Value::from(*value)).collect())
}

/// Epoch fields for [`GraphBuilder::add_deme`].
///
/// Any field left as `None` is imputed during resolution, exactly as if
/// the field had been omitted from a document.
///
/// # Examples
///
/// ```
/// let _ = demes_parser::UnresolvedEpoch {
///     start_size: Some(1e6),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct UnresolvedEpoch {
    #[allow(missing_docs)]
    pub end_time: Option<f64>,
    #[allow(missing_docs)]
    pub start_size: Option<f64>,
    #[allow(missing_docs)]
    pub end_size: Option<f64>,
    #[allow(missing_docs)]
    pub size_function: Option<SizeFunction>,
    #[allow(missing_docs)]
    pub selfing_rate: Option<f64>,
    #[allow(missing_docs)]
    pub cloning_rate: Option<f64>,
}

impl UnresolvedEpoch {
    fn to_value(self) -> Value {
        let mut map = Mapping::new();
        insert_number(&mut map, "end_time", self.end_time);
        insert_number(&mut map, "start_size", self.start_size);
        insert_number(&mut map, "end_size", self.end_size);
        if let Some(size_function) = self.size_function {
            insert(&mut map, "size_function", Value::from(size_function.to_string()));
        }
        insert_number(&mut map, "selfing_rate", self.selfing_rate);
        insert_number(&mut map, "cloning_rate", self.cloning_rate);
        Value::Mapping(map)
    }
}

/// Ancestry fields for [`GraphBuilder::add_deme`].
///
/// # Examples
///
/// ```
/// let _ = demes_parser::DemeHistory {
///     ancestors: vec!["ancestor".to_string()],
///     start_time: Some(100.0),
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default)]
pub struct DemeHistory {
    /// `None` means the start time is imputed during resolution.
    /// Use [`f64::INFINITY`] for an explicitly infinite start time.
    pub start_time: Option<f64>,
    #[allow(missing_docs)]
    pub ancestors: Vec<String>,
    /// One entry per ancestor. Empty means imputed during resolution.
    pub proportions: Vec<f64>,
}

/// This type allows building a [`Graph`] using code rather than text input.
///
/// The builder assembles a regular human-data-model document in memory, so
/// builder input follows the same defaulting and validation rules as text
/// input, and all error checks are delayed until [`GraphBuilder::resolve`].
///
/// # Examples
///
/// ```
/// let mut b = demes_parser::GraphBuilder::new_generations();
/// let epoch = demes_parser::UnresolvedEpoch {
///     start_size: Some(100.0),
///     ..Default::default()
/// };
/// b.add_deme(
///     "A",
///     vec![epoch],
///     demes_parser::DemeHistory::default(),
///     Some("this is deme A"),
/// );
/// let graph = b.resolve().unwrap();
/// assert_eq!(graph.num_demes(), 1);
/// ```
pub struct GraphBuilder {
    time_units: TimeUnits,
    generation_time: Option<f64>,
    metadata: Option<Mapping>,
    demes: Vec<Value>,
    migrations: Vec<Value>,
    pulses: Vec<Value>,
}

impl GraphBuilder {
    /// Constructor.
    pub fn new(time_units: TimeUnits, generation_time: Option<f64>) -> Self {
        Self {
            time_units,
            generation_time,
            metadata: None,
            demes: vec![],
            migrations: vec![],
            pulses: vec![],
        }
    }

    /// Construct a builder with time units in generations.
    pub fn new_generations() -> Self {
        Self::new(TimeUnits::Generations, None)
    }

    /// Add a deme to the graph.
    ///
    /// Demes must be added ancestors-first, as in a document.
    pub fn add_deme(
        &mut self,
        name: &str,
        epochs: Vec<UnresolvedEpoch>,
        history: DemeHistory,
        description: Option<&str>,
    ) {
        let mut map = Mapping::new();
        insert(&mut map, "name", Value::from(name));
        if let Some(description) = description {
            insert(&mut map, "description", Value::from(description));
        }
        insert_number(&mut map, "start_time", history.start_time);
        if !history.ancestors.is_empty() {
            insert(
                &mut map,
                "ancestors",
                Value::Sequence(
                    history
                        .ancestors
                        .iter()
                        .map(|ancestor| Value::from(ancestor.as_str()))
                        .collect(),
                ),
            );
        }
        if !history.proportions.is_empty() {
            insert(&mut map, "proportions", number_sequence(&history.proportions));
        }
        if !epochs.is_empty() {
            insert(
                &mut map,
                "epochs",
                Value::Sequence(epochs.into_iter().map(UnresolvedEpoch::to_value).collect()),
            );
        }
        self.demes.push(Value::Mapping(map));
    }

    /// Add an asymmetric migration.
    ///
    /// Using `None` for the times will mean continuous migration for the
    /// entire period for which the two demes coexist.
    ///
    /// # Examples
    ///
    /// ```
    /// let epoch = demes_parser::UnresolvedEpoch {
    ///     start_size: Some(100.0),
    ///     ..Default::default()
    /// };
    /// let mut b = demes_parser::GraphBuilder::new_generations();
    /// b.add_deme("A", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_deme("B", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_asymmetric_migration("A", "B", 1e-4, None, None);
    /// b.resolve().unwrap();
    /// ```
    pub fn add_asymmetric_migration(
        &mut self,
        source: &str,
        dest: &str,
        rate: f64,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) {
        let mut map = Mapping::new();
        insert(&mut map, "source", Value::from(source));
        insert(&mut map, "dest", Value::from(dest));
        insert(&mut map, "rate", Value::from(rate));
        insert_number(&mut map, "start_time", start_time);
        insert_number(&mut map, "end_time", end_time);
        self.migrations.push(Value::Mapping(map));
    }

    /// Add a symmetric migration among two or more demes.
    ///
    /// # Examples
    ///
    /// ```
    /// let epoch = demes_parser::UnresolvedEpoch {
    ///     start_size: Some(100.0),
    ///     ..Default::default()
    /// };
    /// let mut b = demes_parser::GraphBuilder::new_generations();
    /// b.add_deme("A", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_deme("B", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_symmetric_migration(&["A", "B"], 1e-4, None, None);
    /// let graph = b.resolve().unwrap();
    /// assert_eq!(graph.migrations().len(), 2);
    /// ```
    pub fn add_symmetric_migration(
        &mut self,
        demes: &[&str],
        rate: f64,
        start_time: Option<f64>,
        end_time: Option<f64>,
    ) {
        let mut map = Mapping::new();
        insert(&mut map, "demes", name_sequence(demes));
        insert(&mut map, "rate", Value::from(rate));
        insert_number(&mut map, "start_time", start_time);
        insert_number(&mut map, "end_time", end_time);
        self.migrations.push(Value::Mapping(map));
    }

    /// Add a pulse.
    ///
    /// # Examples
    ///
    /// ```
    /// let epoch = demes_parser::UnresolvedEpoch {
    ///     start_size: Some(100.0),
    ///     ..Default::default()
    /// };
    /// let mut b = demes_parser::GraphBuilder::new_generations();
    /// b.add_deme("A", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_deme("B", vec![epoch], demes_parser::DemeHistory::default(), None);
    /// b.add_pulse(&["A"], "B", 50.0, &[0.5]);
    /// b.resolve().unwrap();
    /// ```
    pub fn add_pulse(&mut self, sources: &[&str], dest: &str, time: f64, proportions: &[f64]) {
        let mut map = Mapping::new();
        insert(&mut map, "sources", name_sequence(sources));
        insert(&mut map, "dest", Value::from(dest));
        insert(&mut map, "time", Value::from(time));
        insert(&mut map, "proportions", number_sequence(proportions));
        self.pulses.push(Value::Mapping(map));
    }

    /// Set top-level metadata.
    ///
    /// Repeated calls overwrite existing metadata.
    ///
    /// # Errors
    ///
    /// Returns [`DemesError`] if `metadata` does not serialize to a mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// #[derive(serde::Serialize)]
    /// struct MyMetaData {
    ///     foo: i32,
    ///     bar: String,
    /// }
    /// # let mut builder = demes_parser::GraphBuilder::new_generations();
    /// builder
    ///     .set_toplevel_metadata(&MyMetaData {
    ///         foo: 3,
    ///         bar: "string".to_owned(),
    ///     })
    ///     .unwrap();
    /// ```
    pub fn set_toplevel_metadata<T: serde::Serialize>(
        &mut self,
        metadata: &T,
    ) -> Result<(), DemesError> {
        match serde_yaml::to_value(metadata)? {
            Value::Mapping(mapping) => {
                self.metadata = Some(mapping);
                Ok(())
            }
            other => Err(DemesError::TypeMismatch {
                path: "graph".to_string(),
                field: "metadata".to_string(),
                message: format!("metadata must serialize to a mapping, got: {other:?}"),
            }),
        }
    }

    /// Generate and return a resolved [`Graph`].
    ///
    /// # Errors
    ///
    /// Returns [`DemesError`] if any of the data are invalid.
    pub fn resolve(self) -> Result<Graph, DemesError> {
        let mut map = Mapping::new();
        insert(&mut map, "time_units", Value::from(self.time_units.to_string()));
        insert_number(&mut map, "generation_time", self.generation_time);
        if let Some(metadata) = self.metadata {
            insert(&mut map, "metadata", Value::Mapping(metadata));
        }
        insert(&mut map, "demes", Value::Sequence(self.demes));
        if !self.migrations.is_empty() {
            insert(&mut map, "migrations", Value::Sequence(self.migrations));
        }
        if !self.pulses.is_empty() {
            insert(&mut map, "pulses", Value::Sequence(self.pulses));
        }
        Graph::new_resolved_from_value(&Value::Mapping(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_builder_does_not_resolve() {
        let b = GraphBuilder::new(TimeUnits::Generations, None);
        assert!(b.resolve().is_err());
    }

    #[test]
    fn add_deme_with_epochs() {
        let mut b = GraphBuilder::new_generations();
        let edata = UnresolvedEpoch {
            start_size: Some(100.0),
            ..Default::default()
        };
        b.add_deme("CEU", vec![edata], DemeHistory::default(), None);
        let graph = b.resolve().unwrap();
        assert!(graph.get_deme_from_name("CEU").is_some());
    }

    #[test]
    fn builder_matches_text_input() {
        let mut b = GraphBuilder::new_generations();
        let epoch = UnresolvedEpoch {
            start_size: Some(100.0),
            ..Default::default()
        };
        b.add_deme("ancestor", vec![epoch], DemeHistory::default(), None);
        b.add_deme(
            "derived",
            vec![UnresolvedEpoch {
                start_size: Some(10.0),
                ..Default::default()
            }],
            DemeHistory {
                ancestors: vec!["ancestor".to_string()],
                start_time: Some(50.0),
                ..Default::default()
            },
            None,
        );
        let graph = b.resolve().unwrap();

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
        assert_eq!(graph, crate::loads(yaml).unwrap());
    }

    #[test]
    fn explicitly_infinite_start_time() {
        let mut b = GraphBuilder::new_generations();
        b.add_deme(
            "A",
            vec![UnresolvedEpoch {
                start_size: Some(100.0),
                ..Default::default()
            }],
            DemeHistory {
                start_time: Some(f64::INFINITY),
                ..Default::default()
            },
            None,
        );
        let graph = b.resolve().unwrap();
        assert!(graph.deme(0).unwrap().start_time().is_infinite());
    }
}
