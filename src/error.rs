use thiserror::Error;

/// Error type for this crate.
///
/// Every failure mode of the parsing pipeline maps onto one variant.
/// Variants produced while reading the input document carry the path of the
/// offending record (e.g. `demes[1].epochs[0]`) so that the error can be
/// located in the source document.
///
/// # Example
///
/// This input is incorrect because the epoch fails to define `start_size`
/// or `end_size`:
///
/// ```
/// let yaml = "
/// time_units: generations
/// demes:
///  - name: A
///    epochs:
///     - end_time: 100
/// ";
/// assert!(matches!(
///     demes_parser::loads(yaml),
///     Err(demes_parser::DemesError::ResolutionError { .. })
/// ));
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DemesError {
    /// A required field is absent from a record.
    #[error("{path}: required field '{field}' is missing")]
    MissingKey {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        field: String,
    },
    /// A field holds a value of the wrong type.
    #[error("{path}: field '{field}': {message}")]
    TypeMismatch {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        field: String,
        #[allow(missing_docs)]
        message: String,
    },
    /// A field holds a value of the right type but outside its permitted range.
    #[error("{path}: field '{field}': {message}")]
    PredicateViolation {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        field: String,
        #[allow(missing_docs)]
        message: String,
    },
    /// A record contains fields that are not part of its schema.
    #[error("{path}: extra fields are not permitted: {fields:?}")]
    ExtraField {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        fields: Vec<String>,
    },
    /// Two demes share a name.
    #[error("duplicate deme name '{0}'")]
    DuplicateName(String),
    /// A deme reference names a deme that has not been declared yet.
    #[error("{path}: unknown deme '{name}'")]
    UnknownReference {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        name: String,
    },
    /// The graph cannot be resolved into its fully-qualified form.
    #[error("{path}: {message}")]
    ResolutionError {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        message: String,
    },
    /// The resolved graph violates a cross-entity invariant.
    #[error("{path}: {message}")]
    ValidationError {
        #[allow(missing_docs)]
        path: String,
        #[allow(missing_docs)]
        message: String,
    },
    /// Errors coming from `serde_yaml`.
    #[error("yaml error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    /// Errors coming from `serde_json`.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// IO errors from the rust standard library.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DemesError {
    pub(crate) fn resolution<P: ToString, M: ToString>(path: P, message: M) -> Self {
        Self::ResolutionError {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn validation<P: ToString, M: ToString>(path: P, message: M) -> Self {
        Self::ValidationError {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}
