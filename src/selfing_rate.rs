use crate::error::DemesError;

/// The selfing rate of an [`Epoch`](crate::Epoch).
///
/// Defaults to zero when a document leaves it out.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct SelfingRate(f64);

impl_newtype_traits!(SelfingRate);

impl Default for SelfingRate {
    fn default() -> Self {
        Self(0.0)
    }
}

impl TryFrom<f64> for SelfingRate {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(DemesError::PredicateViolation {
                path: "epoch".to_string(),
                field: "selfing_rate".to_string(),
                message: format!("selfing rate must be 0 <= s <= 1, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}
