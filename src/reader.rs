//! Typed, key-consuming extraction of fields from decoded document mappings.
//!
//! Every read removes the key from the record, so that a record with
//! unrecognized keys left over can be rejected. The same per-field kind
//! checks drive both literal field reads and defaults-block validation.

use crate::error::DemesError;
use serde_yaml::{Mapping, Value};

/// Encoding of positive infinity in documents, since JSON has no
/// infinity literal.
pub(crate) const INFINITY_STR: &str = "Infinity";

const IDENTIFIER_PATTERN: &str = r"^[^\d\W]\w*$";

const SIZE_FUNCTION_NAMES: &[&str] = &["constant", "exponential", "linear"];

fn is_identifier(value: &str) -> Result<bool, DemesError> {
    let pattern = regex::Regex::new(IDENTIFIER_PATTERN).map_err(|_| {
        DemesError::validation("identifier", "failed to build identifier pattern")
    })?;
    Ok(pattern.is_match(value))
}

/// The type-and-range contract of a single field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum FieldKind {
    String,
    NonEmptyString,
    Identifier,
    PositiveFinite,
    NonNegativeFinite,
    Fraction,
    PositiveOrInfinity,
    SizeFunctionName,
    NonEmptyStringList,
    IdentifierList,
    NonEmptyIdentifierList,
    FractionList,
    BoundedProportionList,
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn type_mismatch(path: &str, field: &str, expected: &str, value: &Value) -> DemesError {
    DemesError::TypeMismatch {
        path: path.to_string(),
        field: field.to_string(),
        message: format!("must be {expected}, not {}", describe(value)),
    }
}

fn predicate_violation<M: ToString>(path: &str, field: &str, message: M) -> DemesError {
    DemesError::PredicateViolation {
        path: path.to_string(),
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn expect_string<'v>(
    path: &str,
    field: &str,
    value: &'v Value,
) -> Result<&'v str, DemesError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_mismatch(path, field, "a string", other)),
    }
}

fn expect_number(path: &str, field: &str, value: &Value) -> Result<f64, DemesError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| type_mismatch(path, field, "a number", value)),
        other => Err(type_mismatch(path, field, "a number", other)),
    }
}

fn expect_sequence<'v>(
    path: &str,
    field: &str,
    value: &'v Value,
) -> Result<&'v [Value], DemesError> {
    match value {
        Value::Sequence(items) => Ok(items),
        other => Err(type_mismatch(path, field, "a sequence", other)),
    }
}

fn check_identifier(path: &str, field: &str, value: &Value) -> Result<(), DemesError> {
    let s = expect_string(path, field, value)?;
    if is_identifier(s)? {
        Ok(())
    } else {
        Err(predicate_violation(
            path,
            field,
            format!("'{s}' is not a valid identifier"),
        ))
    }
}

fn check_fraction(path: &str, field: &str, value: &Value) -> Result<(), DemesError> {
    let x = expect_number(path, field, value)?;
    if (0.0..=1.0).contains(&x) {
        Ok(())
    } else {
        Err(predicate_violation(
            path,
            field,
            format!("must be in [0, 1], got: {x}"),
        ))
    }
}

/// Check a single value against a [`FieldKind`].
///
/// Type errors and range errors are reported as distinct variants.
pub(crate) fn check_value(
    path: &str,
    field: &str,
    kind: FieldKind,
    value: &Value,
) -> Result<(), DemesError> {
    match kind {
        FieldKind::String => expect_string(path, field, value).map(|_| ()),
        FieldKind::NonEmptyString => {
            let s = expect_string(path, field, value)?;
            if s.is_empty() {
                Err(predicate_violation(path, field, "must be a non-empty string"))
            } else {
                Ok(())
            }
        }
        FieldKind::Identifier => check_identifier(path, field, value),
        FieldKind::PositiveFinite => {
            let x = expect_number(path, field, value)?;
            if x > 0.0 && x.is_finite() {
                Ok(())
            } else {
                Err(predicate_violation(
                    path,
                    field,
                    format!("must be 0 < x < Infinity, got: {x}"),
                ))
            }
        }
        FieldKind::NonNegativeFinite => {
            let x = expect_number(path, field, value)?;
            if x >= 0.0 && x.is_finite() {
                Ok(())
            } else {
                Err(predicate_violation(
                    path,
                    field,
                    format!("must be 0 <= x < Infinity, got: {x}"),
                ))
            }
        }
        FieldKind::Fraction => check_fraction(path, field, value),
        FieldKind::PositiveOrInfinity => match value {
            Value::String(s) if s == INFINITY_STR => Ok(()),
            Value::String(_) => Err(type_mismatch(
                path,
                field,
                "a number or the string \"Infinity\"",
                value,
            )),
            Value::Number(_) => {
                let x = expect_number(path, field, value)?;
                if x > 0.0 {
                    Ok(())
                } else {
                    Err(predicate_violation(
                        path,
                        field,
                        format!("must be 0 < x <= Infinity, got: {x}"),
                    ))
                }
            }
            other => Err(type_mismatch(
                path,
                field,
                "a number or the string \"Infinity\"",
                other,
            )),
        },
        FieldKind::SizeFunctionName => {
            let s = expect_string(path, field, value)?;
            if SIZE_FUNCTION_NAMES.contains(&s) {
                Ok(())
            } else {
                Err(predicate_violation(
                    path,
                    field,
                    format!("unknown size_function '{s}'"),
                ))
            }
        }
        FieldKind::NonEmptyStringList => {
            for item in expect_sequence(path, field, value)? {
                check_value(path, field, FieldKind::NonEmptyString, item)?;
            }
            Ok(())
        }
        FieldKind::IdentifierList => {
            for item in expect_sequence(path, field, value)? {
                check_identifier(path, field, item)?;
            }
            Ok(())
        }
        FieldKind::NonEmptyIdentifierList => {
            let items = expect_sequence(path, field, value)?;
            if items.is_empty() {
                return Err(predicate_violation(path, field, "must not be empty"));
            }
            for item in items {
                check_identifier(path, field, item)?;
            }
            Ok(())
        }
        FieldKind::FractionList => {
            for item in expect_sequence(path, field, value)? {
                check_fraction(path, field, item)?;
            }
            Ok(())
        }
        FieldKind::BoundedProportionList => {
            let items = expect_sequence(path, field, value)?;
            if items.is_empty() {
                return Err(predicate_violation(path, field, "must not be empty"));
            }
            let mut sum = 0.0;
            for item in items {
                check_fraction(path, field, item)?;
                sum += expect_number(path, field, item)?;
            }
            if sum > 1.0 {
                Err(predicate_violation(
                    path,
                    field,
                    format!("must sum to at most 1, got: {sum}"),
                ))
            } else {
                Ok(())
            }
        }
    }
}

/// One record of the input document, consumed field by field.
#[derive(Clone, Debug)]
pub(crate) struct Record {
    path: String,
    fields: Mapping,
}

impl Record {
    pub(crate) fn from_value(path: String, value: Value) -> Result<Self, DemesError> {
        match value {
            Value::Mapping(fields) => Ok(Self { path, fields }),
            other => Err(DemesError::TypeMismatch {
                field: "record".to_string(),
                message: format!("must be a mapping, not {}", describe(&other)),
                path,
            }),
        }
    }

    pub(crate) fn empty(path: String) -> Self {
        Self {
            path,
            fields: Mapping::new(),
        }
    }

    pub(crate) fn path(&self) -> &str {
        &self.path
    }

    fn child_path(&self, name: &str) -> String {
        if self.path == "graph" {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        let key = Value::from(name);
        self.fields.remove(&key)
    }

    fn missing(&self, name: &str) -> DemesError {
        DemesError::MissingKey {
            path: self.path.clone(),
            field: name.to_string(),
        }
    }

    /// Overlay a defaults block: insert every defaulted key that the
    /// record does not already define.
    pub(crate) fn apply_defaults(&mut self, defaults: &Mapping) {
        for (key, value) in defaults {
            if !self.fields.contains_key(key) {
                self.fields.insert(key.clone(), value.clone());
            }
        }
    }

    pub(crate) fn optional_string(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Option<String>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(value) => {
                check_value(&self.path, name, kind, &value)?;
                match value {
                    Value::String(s) => Ok(Some(s)),
                    other => Err(type_mismatch(&self.path, name, "a string", &other)),
                }
            }
        }
    }

    pub(crate) fn required_string(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<String, DemesError> {
        self.optional_string(name, kind)?
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn string_or(
        &mut self,
        name: &str,
        default: &str,
        kind: FieldKind,
    ) -> Result<String, DemesError> {
        Ok(self
            .optional_string(name, kind)?
            .unwrap_or_else(|| default.to_string()))
    }

    pub(crate) fn optional_number(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Option<f64>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(value) => {
                check_value(&self.path, name, kind, &value)?;
                Ok(Some(expect_number(&self.path, name, &value)?))
            }
        }
    }

    pub(crate) fn required_number(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<f64, DemesError> {
        self.optional_number(name, kind)?
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn number_or(
        &mut self,
        name: &str,
        default: f64,
        kind: FieldKind,
    ) -> Result<f64, DemesError> {
        Ok(self.optional_number(name, kind)?.unwrap_or(default))
    }

    /// A time that may be given as a positive number, numeric infinity,
    /// or the string `"Infinity"`.
    pub(crate) fn optional_unbounded_time(
        &mut self,
        name: &str,
    ) -> Result<Option<f64>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(value) => {
                check_value(&self.path, name, FieldKind::PositiveOrInfinity, &value)?;
                match value {
                    Value::String(_) => Ok(Some(f64::INFINITY)),
                    other => Ok(Some(expect_number(&self.path, name, &other)?)),
                }
            }
        }
    }

    pub(crate) fn optional_string_list(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Option<Vec<String>>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(value) => {
                check_value(&self.path, name, kind, &value)?;
                let items = expect_sequence(&self.path, name, &value)?;
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    strings.push(expect_string(&self.path, name, item)?.to_string());
                }
                Ok(Some(strings))
            }
        }
    }

    pub(crate) fn required_string_list(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Vec<String>, DemesError> {
        self.optional_string_list(name, kind)?
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn string_list_or_empty(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Vec<String>, DemesError> {
        Ok(self.optional_string_list(name, kind)?.unwrap_or_default())
    }

    pub(crate) fn optional_number_list(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Option<Vec<f64>>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(value) => {
                check_value(&self.path, name, kind, &value)?;
                let items = expect_sequence(&self.path, name, &value)?;
                let mut numbers = Vec::with_capacity(items.len());
                for item in items {
                    numbers.push(expect_number(&self.path, name, item)?);
                }
                Ok(Some(numbers))
            }
        }
    }

    pub(crate) fn required_number_list(
        &mut self,
        name: &str,
        kind: FieldKind,
    ) -> Result<Vec<f64>, DemesError> {
        self.optional_number_list(name, kind)?
            .ok_or_else(|| self.missing(name))
    }

    pub(crate) fn mapping_or_empty(&mut self, name: &str) -> Result<Mapping, DemesError> {
        match self.take(name) {
            None => Ok(Mapping::new()),
            Some(Value::Mapping(mapping)) => Ok(mapping),
            Some(other) => Err(type_mismatch(&self.path, name, "a mapping", &other)),
        }
    }

    pub(crate) fn record_or_empty(&mut self, name: &str) -> Result<Record, DemesError> {
        let path = self.child_path(name);
        let fields = self.mapping_or_empty(name)?;
        Ok(Record { path, fields })
    }

    pub(crate) fn optional_record_list(
        &mut self,
        name: &str,
    ) -> Result<Option<Vec<Record>>, DemesError> {
        match self.take(name) {
            None => Ok(None),
            Some(Value::Sequence(items)) => {
                let mut records = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    let path = format!("{}[{index}]", self.child_path(name));
                    records.push(Record::from_value(path, item)?);
                }
                Ok(Some(records))
            }
            Some(other) => Err(type_mismatch(&self.path, name, "a sequence", &other)),
        }
    }

    pub(crate) fn required_record_list(
        &mut self,
        name: &str,
    ) -> Result<Vec<Record>, DemesError> {
        self.optional_record_list(name)?
            .ok_or_else(|| self.missing(name))
    }

    /// Reject any fields that were never consumed.
    pub(crate) fn finish(self) -> Result<(), DemesError> {
        if self.fields.is_empty() {
            return Ok(());
        }
        let mut leftovers = self
            .fields
            .iter()
            .map(|(key, _)| match key {
                Value::String(s) => s.clone(),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>();
        leftovers.sort();
        Err(DemesError::ExtraField {
            path: self.path,
            fields: leftovers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(yaml: &str) -> Record {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Record::from_value("graph".to_string(), value).unwrap()
    }

    #[test]
    fn reads_consume_keys() {
        let mut r = record("{a: 1, b: two}");
        assert_eq!(
            r.required_number("a", FieldKind::PositiveFinite).unwrap(),
            1.0
        );
        assert_eq!(
            r.required_string("b", FieldKind::NonEmptyString).unwrap(),
            "two"
        );
        r.finish().unwrap();
    }

    #[test]
    fn leftover_keys_are_extra_fields() {
        let r = record("{a: 1, z: 2}");
        match r.finish() {
            Err(DemesError::ExtraField { fields, .. }) => {
                assert_eq!(fields, vec!["a".to_string(), "z".to_string()]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn infinity_string_and_numeric_infinity() {
        let mut r = record("{a: Infinity, b: .inf}");
        assert!(r.optional_unbounded_time("a").unwrap().unwrap().is_infinite());
        assert!(r.optional_unbounded_time("b").unwrap().unwrap().is_infinite());
        assert!(r.optional_unbounded_time("c").unwrap().is_none());
    }

    #[test]
    fn infinity_rejected_where_finite_required() {
        let mut r = record("{a: .inf}");
        assert!(matches!(
            r.optional_number("a", FieldKind::NonNegativeFinite),
            Err(DemesError::PredicateViolation { .. })
        ));
    }

    #[test]
    fn arbitrary_strings_are_not_infinity() {
        let mut r = record("{a: '100'}");
        assert!(matches!(
            r.optional_unbounded_time("a"),
            Err(DemesError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn identifier_rule() {
        for good in ["a", "_x", "deme1", "X_y_2"] {
            assert!(is_identifier(good).unwrap(), "{good}");
        }
        for bad in ["", "1a", "a-b", "a b", "a.b"] {
            assert!(!is_identifier(bad).unwrap(), "{bad}");
        }
    }

    #[test]
    fn missing_required_field() {
        let mut r = record("{}");
        assert!(matches!(
            r.required_string("name", FieldKind::Identifier),
            Err(DemesError::MissingKey { .. })
        ));
    }

    #[test]
    fn null_is_a_type_error() {
        let mut r = record("{a: null}");
        assert!(matches!(
            r.optional_number("a", FieldKind::PositiveFinite),
            Err(DemesError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn defaults_do_not_override_literal_fields() {
        let mut r = record("{a: 1}");
        let defaults: Mapping = serde_yaml::from_str("{a: 2, b: 3}").unwrap();
        r.apply_defaults(&defaults);
        assert_eq!(
            r.required_number("a", FieldKind::PositiveFinite).unwrap(),
            1.0
        );
        assert_eq!(
            r.required_number("b", FieldKind::PositiveFinite).unwrap(),
            3.0
        );
    }

    #[test]
    fn bounded_proportion_list() {
        let value: Value = serde_yaml::from_str("[0.5, 0.6]").unwrap();
        assert!(matches!(
            check_value("p", "proportions", FieldKind::BoundedProportionList, &value),
            Err(DemesError::PredicateViolation { .. })
        ));
        let value: Value = serde_yaml::from_str("[0.5, 0.5]").unwrap();
        assert!(check_value("p", "proportions", FieldKind::BoundedProportionList, &value).is_ok());
    }
}
