//! Exact time values used by measure trees, dtrees and rhythms.

use num_traits::ToPrimitive;

// -------------------------------------------------------------------------------------------------

/// Exact rational time value. Durations of nested prime subdivisions are never rounded.
pub type Fraction = num_rational::Rational64;

/// A timed note event as `(onset, length)`.
pub type Event = (Fraction, Fraction);

// -------------------------------------------------------------------------------------------------

/// Convert a fraction to a float, e.g. for display or comparison with performed onsets.
pub fn fraction_to_f64(value: Fraction) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert a list of exact events to floats.
pub fn events_to_f64(events: &[Event]) -> Vec<(f64, f64)> {
    events
        .iter()
        .map(|(start, length)| (fraction_to_f64(*start), fraction_to_f64(*length)))
        .collect()
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn conversion() {
        assert_eq!(fraction_to_f64(Fraction::new(3, 4)), 0.75);
        assert_eq!(
            events_to_f64(&[(Fraction::new(1, 2), Fraction::new(1, 4))]),
            vec![(0.5, 0.25)]
        );
    }
}
