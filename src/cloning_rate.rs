use crate::error::DemesError;

/// The cloning rate of an [`Epoch`](crate::Epoch).
///
/// Defaults to zero when a document leaves it out.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct CloningRate(f64);

impl_newtype_traits!(CloningRate);

impl Default for CloningRate {
    fn default() -> Self {
        Self(0.0)
    }
}

impl TryFrom<f64> for CloningRate {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(DemesError::PredicateViolation {
                path: "epoch".to_string(),
                field: "cloning_rate".to_string(),
                message: format!("cloning rate must be 0 <= c <= 1, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}
