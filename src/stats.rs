//! Null-aware aggregation helpers
//!
//! Means follow the usual statistical convention for missing data: `None`
//! values are skipped, and an empty (or all-missing) input has no mean.

/// Running mean over present values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    pub fn value(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl FromIterator<Option<f64>> for Mean {
    fn from_iter<I: IntoIterator<Item = Option<f64>>>(iter: I) -> Self {
        let mut mean = Mean::default();
        for v in iter {
            mean.push(v);
        }
        mean
    }
}

/// Mean of the present values in `values`
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().collect::<Mean>().value()
}

/// `numerator / denominator`, or `None` when either is missing or the
/// denominator is zero
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => {
            let r = n / d;
            r.is_finite().then_some(r)
        }
        _ => None,
    }
}

/// `a - b`, or `None` when either is missing
pub fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? - b?)
}

/// Round to `places` decimal places for display
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_skips_missing() {
        assert_eq!(mean([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean([None, None]), None);
        assert_eq!(mean(std::iter::empty()), None);
    }

    #[test]
    fn test_mean_ignores_non_finite() {
        assert_eq!(mean([Some(2.0), Some(f64::INFINITY), Some(f64::NAN)]), Some(2.0));
    }

    #[test]
    fn test_ratio_sentinel() {
        assert_eq!(ratio(Some(200.0), Some(1000.0)), Some(0.2));
        assert_eq!(ratio(Some(200.0), Some(0.0)), None);
        assert_eq!(ratio(Some(200.0), Some(-0.0)), None);
        assert_eq!(ratio(None, Some(1000.0)), None);
        assert_eq!(ratio(Some(200.0), None), None);
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(Some(5.0), Some(3.0)), Some(2.0));
        assert_eq!(difference(Some(3.0), Some(5.0)), Some(-2.0));
        assert_eq!(difference(None, Some(5.0)), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 2), 0.12);
        assert_eq!(round_to(12.5, 0), 13.0);
    }
}
