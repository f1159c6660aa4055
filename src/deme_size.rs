use crate::error::DemesError;

/// The size of a deme at a given [`Time`](crate::Time).
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * The size may take on non-integer values.
/// * Sizes must be greater than zero and finite.
///
/// # Examples
///
/// ```
/// let s = demes_parser::DemeSize::try_from(50.0).unwrap();
/// assert_eq!(s, 50.0);
/// assert!(demes_parser::DemeSize::try_from(0.0).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct DemeSize(f64);

impl_newtype_traits!(DemeSize);

impl TryFrom<f64> for DemeSize {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_nan() || value.is_infinite() || value <= 0.0 {
            Err(DemesError::PredicateViolation {
                path: "epoch".to_string(),
                field: "size".to_string(),
                message: format!("deme sizes must be 0 < s < Infinity, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}
