//! Separation oracles for the two expected-value dose constraints.
//!
//! For the OAR side the constraint reads, for every threshold t,
//!
//! `Σ_{i∈X} max(0, D_i - t) <= |X| · u.int_to_inf(t - z)`
//!
//! and the oracle returns the largest left-minus-right gap found over a
//! finite set of candidate thresholds. The PTV side mirrors it with
//! `max(0, t - D_i)` and `v.int_to(t + s)`.

use crate::distribution::Distribution;

/// The most violated candidate found by an oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub violation: f64,
    pub threshold: f64,
}

impl Separation {
    fn none() -> Self {
        Self {
            violation: f64::NEG_INFINITY,
            threshold: f64::NAN,
        }
    }

    pub fn is_violated(&self) -> bool {
        self.violation > 0.0
    }
}

/// Keeps the first maximizer, so equal gaps resolve to the lowest
/// candidate index.
fn maximize(
    thresholds: &[f64],
    gap: impl Fn(f64) -> f64,
) -> Separation {
    let mut best = Separation::none();
    for &t in thresholds.iter() {
        let value = gap(t);
        if value > best.violation {
            best = Separation {
                violation: value,
                threshold: t,
            };
        }
    }
    best
}

pub fn delta_x(
    doses: &[f64],
    cardinality: usize,
    u: &dyn Distribution,
    z: f64,
    thresholds: &[f64],
) -> Separation {
    maximize(thresholds, |t| {
        let excess: f64 = doses.iter().map(|d| (d - t).max(0.0)).sum();
        excess - cardinality as f64 * u.int_to_inf(t - z)
    })
}

pub fn delta_y(
    doses: &[f64],
    cardinality: usize,
    v: &dyn Distribution,
    s: f64,
    thresholds: &[f64],
) -> Separation {
    maximize(thresholds, |t| {
        let shortfall: f64 = doses.iter().map(|d| (t - d).max(0.0)).sum();
        shortfall - cardinality as f64 * v.int_to(t + s)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{Jump, Uniform};

    #[test]
    fn test_delta_x_finds_violated_threshold() {
        let u = Uniform::new(8.0, 12.0).unwrap();
        let thresholds = u.threshold_range(10);
        // a dose of 12 with t = 8 gives 4 - 2 = 2, the largest gap
        let separation = delta_x(&[12.0], 1, &u, 0.0, &thresholds);
        assert!(separation.is_violated());
        assert_eq!(separation.threshold, 8.0);
        assert!((separation.violation - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_delta_x_without_violation() {
        let u = Uniform::new(8.0, 12.0).unwrap();
        let thresholds = u.threshold_range(10);
        let separation = delta_x(&[1.5], 1, &u, 0.0, &thresholds);
        assert!(separation.violation.abs() < 1e-12);
        assert!((separation.threshold - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_delta_y_on_toy_problem() {
        let v = Uniform::new(0.0, 4.0).unwrap();
        let thresholds = v.threshold_range(10);
        // g(t) = t - 1.5 - t²/8 peaks at the right end of the range
        let separation = delta_y(&[1.5], 1, &v, 0.0, &thresholds);
        assert!((separation.violation - 0.5).abs() < 1e-12);
        assert!((separation.threshold - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_first_threshold() {
        let v = Jump::new(2.0).unwrap();
        let thresholds = [0.0, 1.0, 2.0, 3.0, 4.0];
        // g(t) = 0 on every candidate
        let separation = delta_y(&[2.0], 1, &v, 0.0, &thresholds);
        assert_eq!(separation.threshold, 0.0);
        assert_eq!(separation.violation, 0.0);
    }

    #[test]
    fn test_shift_moves_the_tolerance() {
        let u = Jump::new(10.0).unwrap();
        let thresholds = [10.0];
        let unshifted = delta_x(&[11.0], 1, &u, 0.0, &thresholds);
        let shifted = delta_x(&[11.0], 1, &u, 2.0, &thresholds);
        assert_eq!(unshifted.violation, 1.0);
        assert_eq!(shifted.violation, -1.0);
    }

    #[test]
    fn test_repeated_calls_are_deterministic() {
        let u = Uniform::new(8.0, 12.0).unwrap();
        let thresholds = u.threshold_range(10);
        let doses = [9.3, 11.7, 4.2, 13.0];
        let first = delta_x(&doses, 6, &u, 0.0, &thresholds);
        for _ in 0..10 {
            let again = delta_x(&doses, 6, &u, 0.0, &thresholds);
            assert_eq!(again.violation, first.violation);
            assert_eq!(again.threshold, first.threshold);
        }
    }

    #[test]
    fn test_empty_threshold_range_never_violates() {
        let u = Uniform::new(8.0, 12.0).unwrap();
        let separation = delta_x(&[20.0], 1, &u, 0.0, &[]);
        assert!(!separation.is_violated());
        assert!(separation.threshold.is_nan());
    }
}
