/// Helper function for generating `n` evenly spaced values between `low`
/// and `high`, both included. A single value collapses to `low` and zero
/// values give an empty vector.
///
/// ## Example
///
/// ```
/// let range = beamcut::utils::linspace(0.0, 1.0, 5);
/// assert_eq!(range, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
/// ```
pub fn linspace(low: f64, high: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![low],
        _ => {
            let spacing = (high - low) / (n as f64 - 1.0);
            (0..n).map(|i| low + spacing * i as f64).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints_and_spacing() {
        let range = linspace(8.0, 12.0, 10);
        assert_eq!(range.len(), 10);
        assert_eq!(range[0], 8.0);
        assert!((range[9] - 12.0).abs() < 1e-12);
        for pair in range.windows(2) {
            assert!((pair[1] - pair[0] - 4.0 / 9.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_linspace_degenerate_sizes() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 7.0, 1), vec![3.0]);
    }
}
