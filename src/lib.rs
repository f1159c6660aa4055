//! Parser for the
//! [demes](https://popsim-consortium.github.io/demes-spec-docs)
//! demographic model interchange format.
//!
//! # Introduction
//!
//! A demes document describes a demographic history: populations (demes),
//! their sizes through time, continuous migrations between them, and
//! discrete admixture pulses. Authors write the compact human data model
//! (HDM), leaving out anything implied by context. This crate fills in
//! every implied value, checks all structural and semantic rules, and
//! produces the fully-qualified machine data model (MDM) as a [`Graph`].
//!
//! This crate provides:
//!
//! * [`parse`] for decoded documents (nested [`serde_yaml::Value`]
//!   mappings), plus the [`loads`] and [`load`] conveniences for `YAML`
//!   text.
//! * [`GraphBuilder`] for building a model from `rust` code.
//! * [`Graph::to_value`] and [`Graph::as_string`] to emit the
//!   fully-qualified form, which parses back to an equal graph.
//!
//! # Technical details
//!
//! * Parsing is a pure transformation: no I/O, no global state, and the
//!   first error encountered aborts the parse.
//! * Positive infinity (the indefinite past) is written as the string
//!   `"Infinity"` in documents, because `JSON` has no infinity literal.
//!
//! # Features
//!
//! The following [cargo features](https://doc.rust-lang.org/cargo/reference/features.html)
//! are available:
//!
//! * `json`: enables reading/writing a [`Graph`] in `JSON` format.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod macros;

mod builder;
mod cloning_rate;
mod defaults;
mod deme_size;
mod error;
mod migration_rate;
mod proportion;
mod reader;
mod selfing_rate;
mod specification;
mod time;

use std::io::Read;

pub use builder::{DemeHistory, GraphBuilder, UnresolvedEpoch};
pub use cloning_rate::CloningRate;
pub use deme_size::DemeSize;
pub use error::DemesError;
pub use migration_rate::MigrationRate;
pub use proportion::Proportion;
pub use selfing_rate::SelfingRate;
pub use specification::{AsymmetricMigration, Deme, Epoch, Graph, Pulse, SizeFunction};
pub use time::{GenerationTime, Time, TimeInterval, TimeUnits};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a [`Graph`] from a decoded document.
///
/// Decoding text into the nested mapping is the caller's concern;
/// see [`loads`] and [`load`] for `YAML` input.
///
/// # Errors
///
/// Returns [`DemesError`] in the event of invalid input.
///
/// # Examples
///
/// ```
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: ancestor
///    epochs:
///     - start_size: 100
/// ";
/// let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
/// let graph = demes_parser::parse(&value).unwrap();
/// assert_eq!(graph.num_demes(), 1);
/// ```
pub fn parse(data: &serde_yaml::Value) -> Result<Graph, DemesError> {
    Graph::new_resolved_from_value(data)
}

/// Build a [`Graph`] from an in-memory `YAML` [`str`].
///
/// # Errors
///
/// Returns [`DemesError`] in the event of invalid input.
///
/// # Examples
///
/// ```
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: ancestor
///    epochs:
///     - start_size: 100
///  - name: derived
///    start_time: 50
///    ancestors: [ancestor]
///    epochs:
///     - start_size: 10
/// ";
///
/// let graph = demes_parser::loads(yaml).unwrap();
/// ```
pub fn loads(yaml: &str) -> Result<Graph, DemesError> {
    Graph::new_resolved_from_str(yaml)
}

/// Build a [`Graph`] from a `JSON` string.
#[cfg(feature = "json")]
pub fn loads_json(json: &str) -> Result<Graph, DemesError> {
    Graph::new_resolved_from_json_str(json)
}

/// Build a [`Graph`] from a type implementing [`std::io::Read`],
/// assuming `YAML` format.
///
/// # Errors
///
/// Returns [`DemesError`] in the event of invalid input.
///
/// # Examples
///
/// ```
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: ancestor
///    epochs:
///     - start_size: 100
/// ";
/// // A slice of raw bytes implements std::io::Read
/// let raw_bytes: &[u8] = yaml.as_bytes();
/// let graph = demes_parser::load(raw_bytes).unwrap();
/// # assert_eq!(graph, demes_parser::loads(yaml).unwrap());
/// ```
pub fn load<T: Read>(reader: T) -> Result<Graph, DemesError> {
    Graph::new_resolved_from_reader(reader)
}

/// Build a [`Graph`] from a `JSON` reader.
#[cfg(feature = "json")]
pub fn load_json<T: Read>(reader: T) -> Result<Graph, DemesError> {
    Graph::new_resolved_from_json_reader(reader)
}

/// Return the package version given in the `Cargo.toml` file of this crate.
///
/// # Examples
///
/// ```
/// let _ = demes_parser::version();
/// ```
pub fn version() -> &'static str {
    VERSION
}
