use crate::error::DemesError;

/// A migration rate: the per-time-unit fraction of a destination deme made
/// up of migrants from the source deme.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct MigrationRate(f64);

impl_newtype_traits!(MigrationRate);

impl TryFrom<f64> for MigrationRate {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            Err(DemesError::PredicateViolation {
                path: "migration".to_string(),
                field: "rate".to_string(),
                message: format!("migration rate must be 0 <= m <= 1, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}
