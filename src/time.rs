use crate::error::DemesError;

/// Store time values.
///
/// This is a newtype wrapper for [`f64`](std::primitive::f64).
///
/// # Notes
///
/// * The units are the [`TimeUnits`] of the graph.
/// * Time runs backwards from the present: larger values are further in the
///   past, zero is "now", and positive infinity marks the indefinite past.
/// * A `Time` is never negative and never NaN. Where a document may use the
///   string `"Infinity"` (deme and migration `start_time`), the parser maps
///   it to [`f64::INFINITY`] before constructing the `Time`.
///
/// # Examples
///
/// ```
/// let t = demes_parser::Time::try_from(0.0).unwrap();
/// assert_eq!(t, 0.0);
/// assert!(demes_parser::Time::try_from(-1.0).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct Time(f64);

impl_newtype_traits!(Time);

impl TryFrom<f64> for Time {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_nan() || value.is_sign_negative() {
            Err(DemesError::PredicateViolation {
                path: "time".to_string(),
                field: "value".to_string(),
                message: format!("invalid time value: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}

impl Time {
    pub(crate) fn infinity() -> Self {
        Self(f64::INFINITY)
    }

    pub(crate) fn default_epoch_end_time() -> Self {
        Self(0.0)
    }

    /// `true` if the value is positive infinity.
    pub fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }

    pub(crate) fn is_valid_deme_start_time(&self) -> bool {
        self.0 > 0.0
    }

    pub(crate) fn is_valid_epoch_end_time(&self) -> bool {
        self.0.is_finite()
    }
}

/// Generation time.
///
/// If [`TimeUnits`] are in generations, this value must be 1.
#[derive(Clone, Copy, Debug)]
#[repr(transparent)]
pub struct GenerationTime(f64);

impl_newtype_traits!(GenerationTime);

impl TryFrom<f64> for GenerationTime {
    type Error = DemesError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value <= 0.0 {
            Err(DemesError::PredicateViolation {
                path: "graph".to_string(),
                field: "generation_time".to_string(),
                message: format!("generation time must be 0 < g < Infinity, got: {value}"),
            })
        } else {
            Ok(Self(value))
        }
    }
}

/// The time units of a graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TimeUnits {
    #[allow(missing_docs)]
    Generations,
    #[allow(missing_docs)]
    Years,
    /// A "custom" time unit.  It is assumed
    /// that client code knows what to do with this.
    Custom(String),
}

impl From<String> for TimeUnits {
    fn from(value: String) -> Self {
        if &value == "generations" {
            Self::Generations
        } else if &value == "years" {
            Self::Years
        } else {
            Self::Custom(value)
        }
    }
}

impl From<TimeUnits> for String {
    fn from(value: TimeUnits) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeUnits::Generations => write!(f, "generations"),
            TimeUnits::Years => write!(f, "years"),
            TimeUnits::Custom(custom) => write!(f, "{}", &custom),
        }
    }
}

/// A half-open time interval `(start_time, end_time]`.
///
/// The interval covers the instants `start_time > t >= end_time`;
/// membership at the boundaries differs between the entities that
/// use it, so the containment methods spell the boundaries out.
#[derive(Clone, Copy, Debug)]
pub struct TimeInterval {
    start_time: Time,
    end_time: Time,
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}]", self.start_time, self.end_time)
    }
}

impl TimeInterval {
    pub(crate) fn new(start_time: Time, end_time: Time) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    // true if time is in [start_time, end_time)
    pub(crate) fn contains_inclusive_start_exclusive_end<F>(&self, time: F) -> bool
    where
        F: Into<f64>,
    {
        let time = time.into();
        time > self.end_time && time <= self.start_time
    }

    // true if time is in (start_time, end_time]
    pub(crate) fn contains_exclusive_start_inclusive_end<F>(&self, time: F) -> bool
    where
        F: Into<f64>,
    {
        let time = time.into();
        time >= self.end_time && time < self.start_time
    }

    pub(crate) fn duration_greater_than_zero(&self) -> bool {
        self.start_time() > self.end_time()
    }

    /// Return the resolved start time (past) of the interval.
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Return the resolved end time (present) of the interval.
    pub fn end_time(&self) -> Time {
        self.end_time
    }

    pub(crate) fn intersects(&self, other: &Self) -> bool {
        !(self.end_time >= other.start_time || other.end_time >= self.start_time)
    }

    pub(crate) fn is_subinterval_of(&self, other: &Self) -> bool {
        self.start_time <= other.start_time && self.end_time >= other.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_nan_and_negative_times() {
        assert!(Time::try_from(f64::NAN).is_err());
        assert!(Time::try_from(-1e-3).is_err());
        assert!(Time::try_from(f64::INFINITY).is_ok());
    }

    #[test]
    fn interval_boundaries() {
        let interval = TimeInterval::new(
            Time::try_from(10.0).unwrap(),
            Time::try_from(2.0).unwrap(),
        );
        // start excluded, end included
        assert!(!interval.contains_exclusive_start_inclusive_end(10.0));
        assert!(interval.contains_exclusive_start_inclusive_end(2.0));
        // start included, end excluded
        assert!(interval.contains_inclusive_start_exclusive_end(10.0));
        assert!(!interval.contains_inclusive_start_exclusive_end(2.0));
    }

    #[test]
    fn interval_intersection() {
        let make = |s: f64, e: f64| {
            TimeInterval::new(Time::try_from(s).unwrap(), Time::try_from(e).unwrap())
        };
        assert!(make(20.0, 11.0).intersects(&make(12.0, 1.0)));
        assert!(!make(20.0, 11.0).intersects(&make(11.0, 1.0)));
        assert!(make(5.0, 0.0).is_subinterval_of(&make(f64::INFINITY, 0.0)));
        assert!(!make(5.0, 0.0).is_subinterval_of(&make(4.0, 0.0)));
    }

    #[test]
    fn time_units_round_trip() {
        for units in ["generations", "years", "kiloyears"] {
            let tu = TimeUnits::from(units.to_string());
            assert_eq!(tu.to_string(), units);
        }
    }
}
