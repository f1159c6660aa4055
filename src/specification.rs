//! Implement the demes data model in terms of rust structs.
//!
//! The types here come in two layers. The `*Record` types mirror the
//! human data model: fields that a document may omit are `Option` and are
//! filled in by resolution. The public types ([`Graph`], [`Deme`],
//! [`Epoch`], [`AsymmetricMigration`], [`Pulse`]) are the machine data
//! model: fully qualified, frozen, and validated.

use crate::cloning_rate::CloningRate;
use crate::defaults::{self, Defaults};
use crate::deme_size::DemeSize;
use crate::error::DemesError;
use crate::migration_rate::MigrationRate;
use crate::proportion::Proportion;
use crate::reader::{FieldKind, Record, INFINITY_STR};
use crate::selfing_rate::SelfingRate;
use crate::time::{GenerationTime, Time, TimeInterval, TimeUnits};
use serde_yaml::{Mapping, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::io::Read;

// Numerical wiggle room for sums of rates and proportions.
const EPSILON: f64 = 1e-6;

// Relative-tolerance comparison for sums that must be ~1.
fn approximately_one(sum: f64) -> bool {
    (sum - 1.0).abs() <= EPSILON * sum.abs().max(1.0)
}

fn encode_time(time: Time) -> Value {
    if time.is_infinite() {
        Value::String(INFINITY_STR.to_string())
    } else {
        number(f64::from(time))
    }
}

fn number(value: f64) -> Value {
    Value::Number(serde_yaml::Number::from(value))
}

fn string(value: &str) -> Value {
    Value::String(value.to_string())
}

/// Specify how deme sizes change during an [`Epoch`].
///
/// When a document leaves the size function out, resolution assigns
/// `Constant` if the epoch's sizes are equal and `Exponential` otherwise.
/// `Linear` is never assigned automatically; it must be given explicitly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SizeFunction {
    #[allow(missing_docs)]
    Constant,
    #[allow(missing_docs)]
    Exponential,
    #[allow(missing_docs)]
    Linear,
}

impl Display for SizeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            SizeFunction::Constant => "constant",
            SizeFunction::Exponential => "exponential",
            SizeFunction::Linear => "linear",
        };
        write!(f, "{value}")
    }
}

impl std::str::FromStr for SizeFunction {
    type Err = DemesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(Self::Constant),
            "exponential" => Ok(Self::Exponential),
            "linear" => Ok(Self::Linear),
            _ => Err(DemesError::PredicateViolation {
                path: "epoch".to_string(),
                field: "size_function".to_string(),
                message: format!("unknown size_function '{s}'"),
            }),
        }
    }
}

type DemeMap = HashMap<String, usize>;

#[derive(Clone, Copy, Debug)]
struct EpochRecord {
    end_time: Option<Time>,
    start_size: Option<DemeSize>,
    end_size: Option<DemeSize>,
    size_function: Option<SizeFunction>,
    selfing_rate: SelfingRate,
    cloning_rate: CloningRate,
}

impl EpochRecord {
    fn read(mut record: Record) -> Result<Self, DemesError> {
        let end_time = match record.optional_number("end_time", FieldKind::NonNegativeFinite)? {
            Some(value) => Some(Time::try_from(value)?),
            None => None,
        };
        let start_size = match record.optional_number("start_size", FieldKind::PositiveFinite)? {
            Some(value) => Some(DemeSize::try_from(value)?),
            None => None,
        };
        let end_size = match record.optional_number("end_size", FieldKind::PositiveFinite)? {
            Some(value) => Some(DemeSize::try_from(value)?),
            None => None,
        };
        let selfing_rate =
            SelfingRate::try_from(record.number_or("selfing_rate", 0.0, FieldKind::Fraction)?)?;
        let cloning_rate =
            CloningRate::try_from(record.number_or("cloning_rate", 0.0, FieldKind::Fraction)?)?;
        let size_function =
            match record.optional_string("size_function", FieldKind::SizeFunctionName)? {
                Some(name) => Some(name.parse()?),
                None => None,
            };
        record.finish()?;
        Ok(Self {
            end_time,
            start_size,
            end_size,
            size_function,
            selfing_rate,
            cloning_rate,
        })
    }

    fn resolve_size_function(&mut self) {
        if self.size_function.is_none() {
            self.size_function = if self.start_size == self.end_size {
                Some(SizeFunction::Constant)
            } else {
                Some(SizeFunction::Exponential)
            };
        }
    }
}

#[derive(Clone, Debug)]
struct DemeRecord {
    name: String,
    description: String,
    start_time: Option<Time>,
    ancestors: Vec<String>,
    proportions: Option<Vec<Proportion>>,
    epochs: Vec<EpochRecord>,
}

impl DemeRecord {
    fn path(&self) -> String {
        format!("deme '{}'", self.name)
    }

    fn start_time_or_err(&self) -> Result<Time, DemesError> {
        self.start_time
            .ok_or_else(|| DemesError::resolution(self.path(), "start_time is unresolved"))
    }

    fn end_time(&self) -> Result<Time, DemesError> {
        self.epochs
            .last()
            .and_then(|epoch| epoch.end_time)
            .ok_or_else(|| DemesError::resolution(self.path(), "end_time is unresolved"))
    }

    fn time_interval(&self) -> Result<TimeInterval, DemesError> {
        Ok(TimeInterval::new(
            self.start_time_or_err()?,
            self.end_time()?,
        ))
    }

    fn ancestor_record<'a>(
        &self,
        name: &str,
        resolved: &'a [DemeRecord],
        deme_map: &DemeMap,
    ) -> Result<&'a DemeRecord, DemesError> {
        deme_map
            .get(name)
            .and_then(|index| resolved.get(*index))
            .ok_or_else(|| {
                DemesError::resolution(
                    self.path(),
                    format!("ancestor '{name}' has not been resolved"),
                )
            })
    }

    fn resolve_times(
        &mut self,
        resolved: &[DemeRecord],
        deme_map: &DemeMap,
    ) -> Result<(), DemesError> {
        let path = self.path();

        let start_time = match self.start_time {
            Some(time) => time,
            None => match self.ancestors.as_slice() {
                [] => Time::infinity(),
                [ancestor] => self.ancestor_record(ancestor, resolved, deme_map)?.end_time()?,
                _ => {
                    return Err(DemesError::resolution(
                        &path,
                        "start_time must be explicitly set when there is more than one ancestor",
                    ))
                }
            },
        };
        if !start_time.is_valid_deme_start_time() {
            return Err(DemesError::resolution(
                &path,
                format!("start_time must be > 0, got: {start_time}"),
            ));
        }
        if self.ancestors.is_empty() && !start_time.is_infinite() {
            return Err(DemesError::resolution(
                &path,
                format!("finite start_time ({start_time}) requires one or more ancestors"),
            ));
        }
        for ancestor in &self.ancestors {
            let interval = self
                .ancestor_record(ancestor, resolved, deme_map)?
                .time_interval()?;
            if !interval.contains_exclusive_start_inclusive_end(start_time) {
                return Err(DemesError::resolution(
                    &path,
                    format!("ancestor '{ancestor}' {interval} does not exist at start_time {start_time}"),
                ));
            }
        }
        self.start_time = Some(start_time);

        // The last epoch has a default end_time of 0.
        if let Some(last) = self.epochs.last_mut() {
            if last.end_time.is_none() {
                last.end_time = Some(Time::default_epoch_end_time());
            }
        }
        let mut last_time = start_time;
        for (index, epoch) in self.epochs.iter().enumerate() {
            let end_time = epoch.end_time.ok_or_else(|| {
                DemesError::resolution(
                    format!("{path}.epochs[{index}]"),
                    "end_time must be specified",
                )
            })?;
            if !end_time.is_valid_epoch_end_time() || end_time >= last_time {
                return Err(DemesError::resolution(
                    format!("{path}.epochs[{index}]"),
                    "epoch end_times must be finite and listed in decreasing order",
                ));
            }
            last_time = end_time;
        }
        Ok(())
    }

    fn resolve_sizes(&mut self) -> Result<(), DemesError> {
        let path = self.path();
        let start_time = self.start_time_or_err()?;
        let first = self
            .epochs
            .first_mut()
            .ok_or_else(|| DemesError::resolution(&path, "deme has no epochs"))?;
        if first.start_size.is_none() && first.end_size.is_none() {
            return Err(DemesError::resolution(
                format!("{path}.epochs[0]"),
                "at least one of start_size and end_size must be specified for the first epoch",
            ));
        }
        if first.start_size.is_none() {
            first.start_size = first.end_size;
        }
        if first.end_size.is_none() {
            first.end_size = first.start_size;
        }
        if start_time.is_infinite() && first.start_size != first.end_size {
            return Err(DemesError::resolution(
                format!("{path}.epochs[0]"),
                "the first epoch of a deme with infinite start_time cannot change size",
            ));
        }
        let mut last_end_size = first.end_size;
        for epoch in self.epochs.iter_mut().skip(1) {
            if epoch.start_size.is_none() {
                epoch.start_size = last_end_size;
            }
            if epoch.end_size.is_none() {
                epoch.end_size = epoch.start_size;
            }
            last_end_size = epoch.end_size;
        }
        Ok(())
    }

    fn resolve_proportions(&mut self) -> Result<(), DemesError> {
        if self.proportions.is_none() {
            self.proportions = match self.ancestors.len() {
                0 => Some(vec![]),
                1 => Some(vec![Proportion::try_from(1.0)?]),
                _ => {
                    return Err(DemesError::resolution(
                        self.path(),
                        "proportions must be explicitly set when there is more than one ancestor",
                    ))
                }
            };
        }
        Ok(())
    }

    fn resolve(&mut self, resolved: &[DemeRecord], deme_map: &DemeMap) -> Result<(), DemesError> {
        self.resolve_times(resolved, deme_map)?;
        self.resolve_sizes()?;
        self.resolve_proportions()?;
        self.epochs
            .iter_mut()
            .for_each(EpochRecord::resolve_size_function);
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct MigrationRecord {
    rate: MigrationRate,
    start_time: Option<Time>,
    end_time: Option<Time>,
    source: String,
    dest: String,
}

/// The graph in its human-data-model form: read from a document, not yet
/// resolved.
#[derive(Clone, Debug)]
pub(crate) struct UnresolvedGraph {
    description: String,
    doi: Vec<String>,
    metadata: Mapping,
    time_units: TimeUnits,
    generation_time: Option<GenerationTime>,
    demes: Vec<DemeRecord>,
    migrations: Vec<MigrationRecord>,
    pulses: Vec<Pulse>,
    deme_map: DemeMap,
}

impl UnresolvedGraph {
    pub(crate) fn from_value(data: &Value) -> Result<Self, DemesError> {
        let mut top = Record::from_value("graph".to_string(), data.clone())?;
        let graph_defaults = Defaults::extract(&mut top)?;

        let description = top.string_or("description", "", FieldKind::String)?;
        let time_units =
            TimeUnits::from(top.required_string("time_units", FieldKind::NonEmptyString)?);
        let doi = top.string_list_or_empty("doi", FieldKind::NonEmptyStringList)?;
        let generation_time =
            match top.optional_number("generation_time", FieldKind::PositiveFinite)? {
                Some(value) => Some(GenerationTime::try_from(value)?),
                None => None,
            };
        let metadata = top.mapping_or_empty("metadata")?;

        let deme_records = top.required_record_list("demes")?;
        let migration_records = top.optional_record_list("migrations")?.unwrap_or_default();
        let pulse_records = top.optional_record_list("pulses")?.unwrap_or_default();
        top.finish()?;

        let mut graph = Self {
            description,
            doi,
            metadata,
            time_units,
            generation_time,
            demes: vec![],
            migrations: vec![],
            pulses: vec![],
            deme_map: DemeMap::default(),
        };
        for record in deme_records {
            graph.add_deme_record(record, &graph_defaults)?;
        }
        for record in migration_records {
            graph.add_migration_record(record, &graph_defaults)?;
        }
        for record in pulse_records {
            graph.add_pulse_record(record, &graph_defaults)?;
        }
        Ok(graph)
    }

    fn add_deme_record(
        &mut self,
        mut record: Record,
        graph_defaults: &Defaults,
    ) -> Result<(), DemesError> {
        record.apply_defaults(&graph_defaults.deme);
        let path = record.path().to_string();

        let name = record.required_string("name", FieldKind::Identifier)?;
        let description = record.string_or("description", "", FieldKind::String)?;
        let start_time = match record.optional_unbounded_time("start_time")? {
            Some(value) => Some(Time::try_from(value)?),
            None => None,
        };
        let ancestors = record.string_list_or_empty("ancestors", FieldKind::IdentifierList)?;
        let proportions = match record.optional_number_list("proportions", FieldKind::FractionList)?
        {
            Some(values) => {
                let mut proportions = Vec::with_capacity(values.len());
                for value in values {
                    proportions.push(Proportion::try_from(value)?);
                }
                Some(proportions)
            }
            None => None,
        };

        // A deme-local defaults block may only cover the epoch scope and
        // overrides the graph-level block key by key.
        let mut local_defaults = record.record_or_empty("defaults")?;
        let local_epoch = local_defaults.mapping_or_empty("epoch")?;
        local_defaults.finish()?;
        defaults::check_default_block(
            &format!("{path}.defaults.epoch"),
            &local_epoch,
            defaults::EPOCH_FIELDS,
        )?;
        let epoch_defaults = defaults::merge_epoch_defaults(&graph_defaults.epoch, local_epoch);

        // There is always at least one epoch, defined by the defaults if
        // the document does not list any.
        let epoch_records = match record.optional_record_list("epochs")? {
            Some(records) => records,
            None => vec![Record::empty(format!("{path}.epochs[0]"))],
        };
        record.finish()?;

        if epoch_records.is_empty() {
            return Err(DemesError::resolution(
                &path,
                "a deme must have at least one epoch",
            ));
        }
        let mut epochs = Vec::with_capacity(epoch_records.len());
        for mut epoch_record in epoch_records {
            epoch_record.apply_defaults(&epoch_defaults);
            epochs.push(EpochRecord::read(epoch_record)?);
        }

        if self.deme_map.contains_key(&name) {
            return Err(DemesError::DuplicateName(name));
        }
        for ancestor in &ancestors {
            if !self.deme_map.contains_key(ancestor) {
                return Err(DemesError::UnknownReference {
                    path,
                    name: ancestor.clone(),
                });
            }
        }
        self.deme_map.insert(name.clone(), self.demes.len());
        self.demes.push(DemeRecord {
            name,
            description,
            start_time,
            ancestors,
            proportions,
            epochs,
        });
        Ok(())
    }

    fn add_migration_record(
        &mut self,
        mut record: Record,
        graph_defaults: &Defaults,
    ) -> Result<(), DemesError> {
        record.apply_defaults(&graph_defaults.migration);
        let path = record.path().to_string();

        let rate = MigrationRate::try_from(record.required_number("rate", FieldKind::Fraction)?)?;
        let start_time = match record.optional_unbounded_time("start_time")? {
            Some(value) => Some(Time::try_from(value)?),
            None => None,
        };
        let end_time = match record.optional_number("end_time", FieldKind::NonNegativeFinite)? {
            Some(value) => Some(Time::try_from(value)?),
            None => None,
        };
        let source = record.optional_string("source", FieldKind::Identifier)?;
        let dest = record.optional_string("dest", FieldKind::Identifier)?;
        let demes = record.optional_string_list("demes", FieldKind::IdentifierList)?;
        record.finish()?;

        match (source, dest, demes) {
            (Some(source), Some(dest), None) => {
                self.push_migration(&path, source, dest, rate, start_time, end_time)?;
            }
            (None, None, Some(demes)) => {
                if demes.len() < 2 {
                    return Err(DemesError::resolution(
                        &path,
                        "a symmetric migration must name two or more demes",
                    ));
                }
                // Each unordered pair expands to both ordered pairs.
                for (index, a) in demes.iter().enumerate() {
                    for b in demes.iter().skip(index + 1) {
                        self.push_migration(
                            &path,
                            a.clone(),
                            b.clone(),
                            rate,
                            start_time,
                            end_time,
                        )?;
                        self.push_migration(
                            &path,
                            b.clone(),
                            a.clone(),
                            rate,
                            start_time,
                            end_time,
                        )?;
                    }
                }
            }
            _ => {
                return Err(DemesError::resolution(
                    &path,
                    "either source and dest, or demes, must be specified",
                ))
            }
        }
        Ok(())
    }

    fn push_migration(
        &mut self,
        path: &str,
        source: String,
        dest: String,
        rate: MigrationRate,
        start_time: Option<Time>,
        end_time: Option<Time>,
    ) -> Result<(), DemesError> {
        for name in [source.as_str(), dest.as_str()] {
            if !self.deme_map.contains_key(name) {
                return Err(DemesError::UnknownReference {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
        }
        self.migrations.push(MigrationRecord {
            rate,
            start_time,
            end_time,
            source,
            dest,
        });
        Ok(())
    }

    fn add_pulse_record(
        &mut self,
        mut record: Record,
        graph_defaults: &Defaults,
    ) -> Result<(), DemesError> {
        record.apply_defaults(&graph_defaults.pulse);
        let path = record.path().to_string();

        let sources = record.required_string_list("sources", FieldKind::NonEmptyIdentifierList)?;
        let dest = record.required_string("dest", FieldKind::Identifier)?;
        let time = Time::try_from(record.required_number("time", FieldKind::PositiveFinite)?)?;
        let proportion_values =
            record.required_number_list("proportions", FieldKind::FractionList)?;
        record.finish()?;

        let mut proportions = Vec::with_capacity(proportion_values.len());
        for value in proportion_values {
            proportions.push(Proportion::try_from(value)?);
        }
        for name in sources.iter().chain(std::iter::once(&dest)) {
            if !self.deme_map.contains_key(name) {
                return Err(DemesError::UnknownReference {
                    path,
                    name: name.clone(),
                });
            }
        }
        self.pulses.push(Pulse {
            sources,
            dest,
            time,
            proportions,
        });
        Ok(())
    }

    fn resolve_migrations(&mut self) -> Result<(), DemesError> {
        for migration in &mut self.migrations {
            let source = self
                .deme_map
                .get(&migration.source)
                .and_then(|index| self.demes.get(*index))
                .ok_or_else(|| {
                    DemesError::resolution(
                        "migrations",
                        format!("unknown source deme '{}'", migration.source),
                    )
                })?;
            let dest = self
                .deme_map
                .get(&migration.dest)
                .and_then(|index| self.demes.get(*index))
                .ok_or_else(|| {
                    DemesError::resolution(
                        "migrations",
                        format!("unknown dest deme '{}'", migration.dest),
                    )
                })?;
            if migration.start_time.is_none() {
                migration.start_time = Some(std::cmp::min(
                    source.start_time_or_err()?,
                    dest.start_time_or_err()?,
                ));
            }
            if migration.end_time.is_none() {
                migration.end_time = Some(std::cmp::max(source.end_time()?, dest.end_time()?));
            }
        }
        Ok(())
    }

    pub(crate) fn resolve(&mut self) -> Result<(), DemesError> {
        // Ancestors are declared before their descendants, so resolving in
        // declaration order only ever looks at already-resolved demes.
        for index in 0..self.demes.len() {
            let (resolved, remaining) = self.demes.split_at_mut(index);
            match remaining.first_mut() {
                Some(deme) => deme.resolve(resolved, &self.deme_map)?,
                None => {
                    return Err(DemesError::resolution("graph", "deme index out of range"))
                }
            }
        }
        self.resolve_migrations()?;

        // Sort pulses so that the most ancient events come first. The sort
        // is stable: pulses with equal times keep their input order. A
        // consumer that rounds times to discrete units sees the same event
        // order as a continuous-time consumer this way.
        self.pulses.sort_by(|a, b| b.time.cmp(&a.time));

        if self.generation_time.is_none() && matches!(self.time_units, TimeUnits::Generations) {
            self.generation_time = Some(GenerationTime::try_from(1.0)?);
        }
        Ok(())
    }
}

/// A resolved epoch.
///
/// The time interval of an epoch runs from its (implied) start time, which
/// is the previous epoch's end time or the deme's start time, down to its
/// own end time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Epoch {
    start_time: Time,
    end_time: Time,
    start_size: DemeSize,
    end_size: DemeSize,
    size_function: SizeFunction,
    selfing_rate: SelfingRate,
    cloning_rate: CloningRate,
}

impl Epoch {
    /// The start time: the previous epoch's end time, or the deme's
    /// start time for the first epoch.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The resolved end time.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// The resolved start size.
    pub fn start_size(&self) -> DemeSize {
        self.start_size
    }

    /// The resolved end size.
    pub fn end_size(&self) -> DemeSize {
        self.end_size
    }

    /// The resolved size function.
    pub fn size_function(&self) -> SizeFunction {
        self.size_function
    }

    /// The resolved selfing rate.
    pub fn selfing_rate(&self) -> SelfingRate {
        self.selfing_rate
    }

    /// The resolved cloning rate.
    pub fn cloning_rate(&self) -> CloningRate {
        self.cloning_rate
    }

    /// The resolved time interval.
    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }

    fn validate(&self, path: &str) -> Result<(), DemesError> {
        if f64::from(self.selfing_rate) + f64::from(self.cloning_rate) > 1.0 {
            return Err(DemesError::validation(
                path,
                format!(
                    "selfing_rate ({}) + cloning_rate ({}) must be <= 1",
                    self.selfing_rate, self.cloning_rate
                ),
            ));
        }
        if matches!(self.size_function, SizeFunction::Constant)
            && self.start_size != self.end_size
        {
            return Err(DemesError::validation(
                path,
                format!(
                    "size_function is constant but start_size ({}) != end_size ({})",
                    self.start_size, self.end_size
                ),
            ));
        }
        Ok(())
    }

    fn to_value(self) -> Value {
        let mut map = Mapping::new();
        map.insert(string("end_time"), number(f64::from(self.end_time)));
        map.insert(string("start_size"), number(f64::from(self.start_size)));
        map.insert(string("end_size"), number(f64::from(self.end_size)));
        map.insert(string("size_function"), string(&self.size_function.to_string()));
        map.insert(string("selfing_rate"), number(f64::from(self.selfing_rate)));
        map.insert(string("cloning_rate"), number(f64::from(self.cloning_rate)));
        Value::Mapping(map)
    }
}

/// A resolved deme.
///
/// A deme exists over the half-open time interval
/// `(start_time, end_time]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Deme {
    name: String,
    description: String,
    start_time: Time,
    ancestors: Vec<String>,
    proportions: Vec<Proportion>,
    epochs: Vec<Epoch>,
}

impl TryFrom<DemeRecord> for Deme {
    type Error = DemesError;

    fn try_from(record: DemeRecord) -> Result<Self, Self::Error> {
        let path = record.path();
        let start_time = record
            .start_time
            .ok_or_else(|| DemesError::resolution(&path, "start_time is unresolved"))?;
        let proportions = record
            .proportions
            .ok_or_else(|| DemesError::resolution(&path, "proportions are unresolved"))?;
        let mut epochs = Vec::with_capacity(record.epochs.len());
        let mut epoch_start = start_time;
        for (index, epoch) in record.epochs.into_iter().enumerate() {
            let epoch_path = format!("{path}.epochs[{index}]");
            let unresolved =
                |field: &str| DemesError::resolution(&epoch_path, format!("{field} is unresolved"));
            let end_time = epoch.end_time.ok_or_else(|| unresolved("end_time"))?;
            epochs.push(Epoch {
                start_time: epoch_start,
                end_time,
                start_size: epoch.start_size.ok_or_else(|| unresolved("start_size"))?,
                end_size: epoch.end_size.ok_or_else(|| unresolved("end_size"))?,
                size_function: epoch
                    .size_function
                    .ok_or_else(|| unresolved("size_function"))?,
                selfing_rate: epoch.selfing_rate,
                cloning_rate: epoch.cloning_rate,
            });
            epoch_start = end_time;
        }
        Ok(Self {
            name: record.name,
            description: record.description,
            start_time,
            ancestors: record.ancestors,
            proportions,
            epochs,
        })
    }
}

impl Deme {
    /// The name of the deme.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The description of the deme. Empty if none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The resolved start time.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The resolved end time: the end time of the last epoch.
    pub fn end_time(&self) -> Time {
        match self.epochs.last() {
            Some(epoch) => epoch.end_time,
            None => Time::default_epoch_end_time(),
        }
    }

    /// The existence interval `(start_time, end_time]`.
    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time(), self.end_time())
    }

    /// Names of the deme's ancestors, in declaration order.
    pub fn ancestor_names(&self) -> &[String] {
        &self.ancestors
    }

    /// The number of ancestors.
    pub fn num_ancestors(&self) -> usize {
        self.ancestors.len()
    }

    /// Ancestry proportions, one per ancestor.
    pub fn proportions(&self) -> &[Proportion] {
        &self.proportions
    }

    /// The resolved epochs, oldest first.
    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    /// The number of epochs.
    pub fn num_epochs(&self) -> usize {
        self.epochs.len()
    }

    /// Obtain an epoch by its index.
    pub fn get_epoch(&self, index: usize) -> Option<&Epoch> {
        self.epochs.get(index)
    }

    fn validate(&self) -> Result<(), DemesError> {
        let path = format!("deme '{}'", self.name);
        let mut seen = HashSet::new();
        for ancestor in &self.ancestors {
            if !seen.insert(ancestor.as_str()) {
                return Err(DemesError::validation(
                    &path,
                    format!("ancestor '{ancestor}' is listed multiple times"),
                ));
            }
        }
        if self.proportions.len() != self.ancestors.len() {
            return Err(DemesError::validation(
                &path,
                format!(
                    "{} ancestors but {} proportions",
                    self.ancestors.len(),
                    self.proportions.len()
                ),
            ));
        }
        if !self.ancestors.is_empty() {
            let sum: f64 = self.proportions.iter().map(|p| f64::from(*p)).sum();
            if !approximately_one(sum) {
                return Err(DemesError::validation(
                    &path,
                    format!("proportions must sum to approximately 1, got: {sum}"),
                ));
            }
        }
        for (index, epoch) in self.epochs.iter().enumerate() {
            epoch.validate(&format!("{path}.epochs[{index}]"))?;
        }
        Ok(())
    }

    fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(string("name"), string(&self.name));
        map.insert(string("description"), string(&self.description));
        map.insert(string("start_time"), encode_time(self.start_time));
        map.insert(
            string("epochs"),
            Value::Sequence(self.epochs.iter().map(|e| e.to_value()).collect()),
        );
        map.insert(
            string("proportions"),
            Value::Sequence(
                self.proportions
                    .iter()
                    .map(|p| number(f64::from(*p)))
                    .collect(),
            ),
        );
        map.insert(
            string("ancestors"),
            Value::Sequence(self.ancestors.iter().map(|a| string(a)).collect()),
        );
        Value::Mapping(map)
    }
}

/// A resolved migration epoch.
///
/// All migrations are asymmetric once resolved; symmetric document input
/// expands into one instance per ordered pair of demes.
#[derive(Clone, Debug, PartialEq)]
pub struct AsymmetricMigration {
    rate: MigrationRate,
    start_time: Time,
    end_time: Time,
    source: String,
    dest: String,
}

impl TryFrom<MigrationRecord> for AsymmetricMigration {
    type Error = DemesError;

    fn try_from(record: MigrationRecord) -> Result<Self, Self::Error> {
        let path = format!("migration from '{}' to '{}'", record.source, record.dest);
        Ok(Self {
            rate: record.rate,
            start_time: record
                .start_time
                .ok_or_else(|| DemesError::resolution(&path, "start_time is unresolved"))?,
            end_time: record
                .end_time
                .ok_or_else(|| DemesError::resolution(&path, "end_time is unresolved"))?,
            source: record.source,
            dest: record.dest,
        })
    }
}

impl AsymmetricMigration {
    /// Name of the source deme.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the destination deme.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// The resolved migration rate.
    pub fn rate(&self) -> MigrationRate {
        self.rate
    }

    /// The resolved start time.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// The resolved end time.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// The resolved time interval.
    pub fn time_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start_time, self.end_time)
    }

    fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(string("rate"), number(f64::from(self.rate)));
        map.insert(string("start_time"), encode_time(self.start_time));
        map.insert(string("end_time"), number(f64::from(self.end_time)));
        map.insert(string("source"), string(&self.source));
        map.insert(string("dest"), string(&self.dest));
        Value::Mapping(map)
    }
}

/// A resolved pulse: an instantaneous transfer of ancestry from one or
/// more source demes into a destination deme.
#[derive(Clone, Debug, PartialEq)]
pub struct Pulse {
    sources: Vec<String>,
    dest: String,
    time: Time,
    proportions: Vec<Proportion>,
}

impl Pulse {
    /// Names of the source demes.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Name of the destination deme.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// The time of the pulse.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Proportions, one per source.
    pub fn proportions(&self) -> &[Proportion] {
        &self.proportions
    }

    fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(
            string("sources"),
            Value::Sequence(self.sources.iter().map(|s| string(s)).collect()),
        );
        map.insert(string("dest"), string(&self.dest));
        map.insert(string("time"), number(f64::from(self.time)));
        map.insert(
            string("proportions"),
            Value::Sequence(
                self.proportions
                    .iter()
                    .map(|p| number(f64::from(*p)))
                    .collect(),
            ),
        );
        Value::Mapping(map)
    }
}

/// A fully-resolved demes graph: the machine data model.
///
/// A graph cannot be constructed directly. See:
///
/// * [`parse`](crate::parse)
/// * [`loads`](crate::loads)
/// * [`load`](crate::load)
/// * [`GraphBuilder`](crate::GraphBuilder)
#[derive(Clone, Debug)]
pub struct Graph {
    description: String,
    doi: Vec<String>,
    metadata: Mapping,
    time_units: TimeUnits,
    generation_time: GenerationTime,
    demes: Vec<Deme>,
    migrations: Vec<AsymmetricMigration>,
    pulses: Vec<Pulse>,
    deme_map: DemeMap,
}

// The deme map is a lookup cache, not part of the data model.
impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
            && self.doi == other.doi
            && self.metadata == other.metadata
            && self.time_units == other.time_units
            && self.generation_time == other.generation_time
            && self.demes == other.demes
            && self.migrations == other.migrations
            && self.pulses == other.pulses
    }
}

impl std::fmt::Display for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_string().unwrap())
    }
}

impl TryFrom<UnresolvedGraph> for Graph {
    type Error = DemesError;

    fn try_from(value: UnresolvedGraph) -> Result<Self, Self::Error> {
        let generation_time = value.generation_time.ok_or_else(|| {
            DemesError::validation(
                "graph",
                "generation_time must be specified when time_units are not generations",
            )
        })?;
        let mut demes = Vec::with_capacity(value.demes.len());
        for record in value.demes {
            demes.push(Deme::try_from(record)?);
        }
        let mut migrations = Vec::with_capacity(value.migrations.len());
        for record in value.migrations {
            migrations.push(AsymmetricMigration::try_from(record)?);
        }
        Ok(Self {
            description: value.description,
            doi: value.doi,
            metadata: value.metadata,
            time_units: value.time_units,
            generation_time,
            demes,
            migrations,
            pulses: value.pulses,
            deme_map: value.deme_map,
        })
    }
}

impl Graph {
    pub(crate) fn new_resolved_from_value(data: &Value) -> Result<Self, DemesError> {
        let mut unresolved = UnresolvedGraph::from_value(data)?;
        unresolved.resolve()?;
        let graph = Graph::try_from(unresolved)?;
        graph.validate()?;
        Ok(graph)
    }

    pub(crate) fn new_resolved_from_str(yaml: &str) -> Result<Self, DemesError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::new_resolved_from_value(&value)
    }

    pub(crate) fn new_resolved_from_reader<T: Read>(reader: T) -> Result<Self, DemesError> {
        let value: Value = serde_yaml::from_reader(reader)?;
        Self::new_resolved_from_value(&value)
    }

    #[cfg(feature = "json")]
    pub(crate) fn new_resolved_from_json_str(json: &str) -> Result<Self, DemesError> {
        let value: Value = serde_json::from_str(json)?;
        Self::new_resolved_from_value(&value)
    }

    #[cfg(feature = "json")]
    pub(crate) fn new_resolved_from_json_reader<T: Read>(reader: T) -> Result<Self, DemesError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::new_resolved_from_value(&value)
    }

    fn validate_generation_time(&self) -> Result<(), DemesError> {
        if matches!(self.time_units, TimeUnits::Generations)
            && self.generation_time != 1.0
        {
            return Err(DemesError::validation(
                "graph",
                "time_units are generations but generation_time != 1",
            ));
        }
        Ok(())
    }

    fn validate_migrations(&self) -> Result<(), DemesError> {
        for (index, migration) in self.migrations.iter().enumerate() {
            let path = format!("migrations[{index}]");
            let interval = migration.time_interval();
            if !interval.duration_greater_than_zero() {
                return Err(DemesError::validation(
                    &path,
                    format!("start_time must be > end_time, got: {interval}"),
                ));
            }
            if migration.source == migration.dest {
                return Err(DemesError::validation(
                    &path,
                    format!("cannot migrate from a deme to itself ('{}')", migration.source),
                ));
            }
            for name in [migration.source(), migration.dest()] {
                let deme = self.get_deme_from_name(name).ok_or_else(|| {
                    DemesError::validation(&path, format!("unknown deme '{name}'"))
                })?;
                if !interval.is_subinterval_of(&deme.time_interval()) {
                    return Err(DemesError::validation(
                        &path,
                        format!(
                            "interval {interval} is not contained in the existence interval of deme '{name}'"
                        ),
                    ));
                }
            }
        }

        // Migrations with the same source and dest must not overlap in time.
        for (index, a) in self.migrations.iter().enumerate() {
            for b in self.migrations.iter().skip(index + 1) {
                if a.source == b.source
                    && a.dest == b.dest
                    && a.time_interval().intersects(&b.time_interval())
                {
                    return Err(DemesError::validation(
                        format!("migrations[{index}]"),
                        format!(
                            "competing migrations from '{}' to '{}' during {}",
                            a.source,
                            a.dest,
                            a.time_interval()
                        ),
                    ));
                }
            }
        }
        self.validate_ingress_rates()
    }

    // The total rate of migration entering any deme must stay <= 1 in
    // every interval of the time partition induced by the migration
    // endpoints.
    fn validate_ingress_rates(&self) -> Result<(), DemesError> {
        let mut boundaries: Vec<Time> = vec![];
        for migration in &self.migrations {
            if !migration.start_time.is_infinite() {
                boundaries.push(migration.start_time);
            }
            boundaries.push(migration.end_time);
        }
        boundaries.sort_by(|a, b| b.cmp(a));
        boundaries.dedup();

        let mut ingress: HashMap<&str, Vec<f64>> = self
            .demes
            .iter()
            .map(|deme| (deme.name(), vec![0.0; boundaries.len()]))
            .collect();
        let mut interval_start = Time::infinity();
        for (slot, end_time) in boundaries.iter().enumerate() {
            let interval = TimeInterval::new(interval_start, *end_time);
            for migration in &self.migrations {
                if interval.intersects(&migration.time_interval()) {
                    let rates = ingress.get_mut(migration.dest()).ok_or_else(|| {
                        DemesError::validation(
                            "migrations",
                            format!("unknown dest deme '{}'", migration.dest()),
                        )
                    })?;
                    let rate = rates[slot] + f64::from(migration.rate());
                    if rate > 1.0 + EPSILON {
                        return Err(DemesError::validation(
                            format!("deme '{}'", migration.dest()),
                            format!("migration rates into the deme sum to more than 1 during {interval}"),
                        ));
                    }
                    rates[slot] = rate;
                }
            }
            interval_start = *end_time;
        }
        Ok(())
    }

    fn validate_pulses(&self) -> Result<(), DemesError> {
        for (index, pulse) in self.pulses.iter().enumerate() {
            let path = format!("pulses[{index}]");
            let mut seen = HashSet::new();
            for source in &pulse.sources {
                if !seen.insert(source.as_str()) {
                    return Err(DemesError::validation(
                        &path,
                        format!("source '{source}' is listed multiple times"),
                    ));
                }
            }
            if pulse.sources.iter().any(|source| source == &pulse.dest) {
                return Err(DemesError::validation(
                    &path,
                    format!("'{}' is both a source and the dest", pulse.dest),
                ));
            }
            if pulse.proportions.len() != pulse.sources.len() {
                return Err(DemesError::validation(
                    &path,
                    format!(
                        "{} sources but {} proportions",
                        pulse.sources.len(),
                        pulse.proportions.len()
                    ),
                ));
            }
            // Material leaves a source before the pulse instant, so the
            // pulse may coincide with the source's end_time but not with
            // its start_time. The dest is affected immediately after the
            // instant, so the opposite boundaries apply.
            for source in &pulse.sources {
                let deme = self.get_deme_from_name(source).ok_or_else(|| {
                    DemesError::validation(&path, format!("unknown deme '{source}'"))
                })?;
                if !deme
                    .time_interval()
                    .contains_exclusive_start_inclusive_end(pulse.time)
                {
                    return Err(DemesError::validation(
                        &path,
                        format!("source deme '{source}' does not exist at time {}", pulse.time),
                    ));
                }
            }
            let dest = self.get_deme_from_name(&pulse.dest).ok_or_else(|| {
                DemesError::validation(&path, format!("unknown deme '{}'", pulse.dest))
            })?;
            if !dest
                .time_interval()
                .contains_inclusive_start_exclusive_end(pulse.time)
            {
                return Err(DemesError::validation(
                    &path,
                    format!("dest deme '{}' does not exist at time {}", pulse.dest, pulse.time),
                ));
            }
            let sum: f64 = pulse.proportions.iter().map(|p| f64::from(*p)).sum();
            if sum > 1.0 + EPSILON {
                return Err(DemesError::validation(
                    &path,
                    format!("proportions sum to more than 1, got: {sum}"),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<(), DemesError> {
        if self.demes.is_empty() {
            return Err(DemesError::validation(
                "graph",
                "at least one deme is required",
            ));
        }
        self.validate_generation_time()?;
        self.demes.iter().try_for_each(Deme::validate)?;
        self.validate_migrations()?;
        self.validate_pulses()?;
        Ok(())
    }

    /// The number of demes in the graph.
    pub fn num_demes(&self) -> usize {
        self.demes.len()
    }

    /// Obtain a deme by name.
    pub fn get_deme_from_name<N: AsRef<str>>(&self, name: N) -> Option<&Deme> {
        self.deme_map
            .get(name.as_ref())
            .and_then(|index| self.demes.get(*index))
    }

    /// Obtain a deme by its declaration index.
    pub fn deme(&self, index: usize) -> Option<&Deme> {
        self.demes.get(index)
    }

    /// The resolved demes, in declaration order.
    pub fn demes(&self) -> &[Deme] {
        &self.demes
    }

    /// The resolved, asymmetric migrations.
    pub fn migrations(&self) -> &[AsymmetricMigration] {
        &self.migrations
    }

    /// The resolved pulses, oldest first.
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// The graph description. Empty if none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Iterate over the DOI entries.
    pub fn doi(&self) -> impl Iterator<Item = &str> {
        self.doi.iter().map(|doi| doi.as_str())
    }

    /// The top-level metadata mapping. Empty if none was given.
    pub fn metadata(&self) -> &Mapping {
        &self.metadata
    }

    /// The time units of the graph.
    pub fn time_units(&self) -> TimeUnits {
        self.time_units.clone()
    }

    /// The resolved generation time.
    pub fn generation_time(&self) -> GenerationTime {
        self.generation_time
    }

    /// Emit the graph as a fully-qualified nested mapping.
    ///
    /// Infinite times are encoded as the string `"Infinity"`; deme
    /// references are encoded as names. Feeding the output back to
    /// [`parse`](crate::parse) produces an equal graph.
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert(string("time_units"), string(&self.time_units.to_string()));
        map.insert(
            string("generation_time"),
            number(f64::from(self.generation_time)),
        );
        map.insert(
            string("doi"),
            Value::Sequence(self.doi.iter().map(|doi| string(doi)).collect()),
        );
        map.insert(string("description"), string(&self.description));
        map.insert(string("metadata"), Value::Mapping(self.metadata.clone()));
        map.insert(
            string("demes"),
            Value::Sequence(self.demes.iter().map(Deme::to_value).collect()),
        );
        map.insert(
            string("migrations"),
            Value::Sequence(
                self.migrations
                    .iter()
                    .map(AsymmetricMigration::to_value)
                    .collect(),
            ),
        );
        map.insert(
            string("pulses"),
            Value::Sequence(self.pulses.iter().map(Pulse::to_value).collect()),
        );
        Value::Mapping(map)
    }

    /// The fully-qualified graph as a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`DemesError`] if YAML serialization fails.
    pub fn as_string(&self) -> Result<String, DemesError> {
        Ok(serde_yaml::to_string(&self.to_value())?)
    }

    /// The fully-qualified graph as a JSON string.
    #[cfg(feature = "json")]
    pub fn as_json_string(&self) -> Result<String, DemesError> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}
