use crate::error::DemesError;

/// An ancestry proportion.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Interpretation
///
/// With respect to a deme in an *offspring* time step, a proportion is the
/// fraction of ancestry from a given parental deme. Proportions appear in
/// two places: the ancestry split of a deme with multiple ancestors, and the
/// per-source fractions of a pulse.
///
/// A proportion is a value in `[0, 1]`. Sums of proportions are constrained
/// separately, during graph validation.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Proportion(f64);

impl_newtype_traits!(Proportion);

impl TryFrom<f64> for Proportion {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(DemesError::PredicateViolation {
                path: "proportions".to_string(),
                field: "value".to_string(),
                message: format!("proportions must be 0 <= p <= 1, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}
