//! Scoped default blocks.
//!
//! A document may carry a top-level `defaults` mapping with `deme`,
//! `epoch`, `migration`, and `pulse` scopes, and each deme record may carry
//! its own `defaults.epoch` block. Defaults are a key-by-key overlay applied
//! to each literal record before its fields are read; they are checked
//! against the same per-field kinds as the literal fields.

use crate::error::DemesError;
use crate::reader::{check_value, FieldKind, Record};
use serde_yaml::{Mapping, Value};

pub(crate) const DEME_DEFAULT_FIELDS: &[(&str, FieldKind)] = &[
    ("description", FieldKind::String),
    ("start_time", FieldKind::PositiveOrInfinity),
    ("ancestors", FieldKind::IdentifierList),
    ("proportions", FieldKind::FractionList),
];

pub(crate) const EPOCH_FIELDS: &[(&str, FieldKind)] = &[
    ("end_time", FieldKind::NonNegativeFinite),
    ("start_size", FieldKind::PositiveFinite),
    ("end_size", FieldKind::PositiveFinite),
    ("selfing_rate", FieldKind::Fraction),
    ("cloning_rate", FieldKind::Fraction),
    ("size_function", FieldKind::SizeFunctionName),
];

pub(crate) const MIGRATION_DEFAULT_FIELDS: &[(&str, FieldKind)] = &[
    ("rate", FieldKind::Fraction),
    ("start_time", FieldKind::PositiveOrInfinity),
    ("end_time", FieldKind::NonNegativeFinite),
    ("source", FieldKind::Identifier),
    ("dest", FieldKind::Identifier),
    ("demes", FieldKind::IdentifierList),
];

pub(crate) const PULSE_DEFAULT_FIELDS: &[(&str, FieldKind)] = &[
    ("sources", FieldKind::NonEmptyIdentifierList),
    ("dest", FieldKind::Identifier),
    ("time", FieldKind::PositiveFinite),
    ("proportions", FieldKind::BoundedProportionList),
];

/// Check one defaults block against the permitted keys of its scope.
pub(crate) fn check_default_block(
    path: &str,
    block: &Mapping,
    allowed: &[(&str, FieldKind)],
) -> Result<(), DemesError> {
    for (key, value) in block {
        let name = match key {
            Value::String(s) => s.as_str(),
            other => {
                return Err(DemesError::ExtraField {
                    path: path.to_string(),
                    fields: vec![format!("{other:?}")],
                })
            }
        };
        match allowed.iter().find(|(field, _)| *field == name) {
            Some((field, kind)) => check_value(path, field, *kind, value)?,
            None => {
                return Err(DemesError::ExtraField {
                    path: path.to_string(),
                    fields: vec![name.to_string()],
                })
            }
        }
    }
    Ok(())
}

/// The top-level defaults, one block per scope.
#[derive(Clone, Debug, Default)]
pub(crate) struct Defaults {
    pub(crate) deme: Mapping,
    pub(crate) epoch: Mapping,
    pub(crate) migration: Mapping,
    pub(crate) pulse: Mapping,
}

impl Defaults {
    /// Pop the `defaults` block off the top-level record and validate
    /// every scope.
    pub(crate) fn extract(top: &mut Record) -> Result<Self, DemesError> {
        let mut block = top.record_or_empty("defaults")?;
        let deme = block.mapping_or_empty("deme")?;
        let epoch = block.mapping_or_empty("epoch")?;
        let migration = block.mapping_or_empty("migration")?;
        let pulse = block.mapping_or_empty("pulse")?;
        block.finish()?;

        check_default_block("defaults.deme", &deme, DEME_DEFAULT_FIELDS)?;
        check_default_block("defaults.epoch", &epoch, EPOCH_FIELDS)?;
        check_default_block("defaults.migration", &migration, MIGRATION_DEFAULT_FIELDS)?;
        check_default_block("defaults.pulse", &pulse, PULSE_DEFAULT_FIELDS)?;

        Ok(Self {
            deme,
            epoch,
            migration,
            pulse,
        })
    }
}

/// Epoch defaults local to a deme override the graph-level block key by key.
pub(crate) fn merge_epoch_defaults(global: &Mapping, local: Mapping) -> Mapping {
    let mut merged = global.clone();
    for (key, value) in local {
        merged.insert(key, value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn unknown_default_keys_are_rejected() {
        let block = mapping("{start_size: 100, name: oops}");
        assert!(matches!(
            check_default_block("defaults.epoch", &block, EPOCH_FIELDS),
            Err(DemesError::ExtraField { .. })
        ));
    }

    #[test]
    fn default_values_are_range_checked() {
        let block = mapping("{end_time: -1}");
        assert!(matches!(
            check_default_block("defaults.epoch", &block, EPOCH_FIELDS),
            Err(DemesError::PredicateViolation { .. })
        ));
    }

    #[test]
    fn local_defaults_override_global_defaults() {
        let merged = merge_epoch_defaults(
            &mapping("{start_size: 1, end_time: 10}"),
            mapping("{start_size: 2}"),
        );
        assert_eq!(merged, mapping("{start_size: 2, end_time: 10}"));
    }
}
