//! Indicator trait definitions.

/// Trait for technical indicators.
///
/// Indicators process price data and produce derived values
/// useful for trading decisions.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output: Copy;

    /// Calculate indicator values for the given data.
    ///
    /// The first value corresponds to input index `period() - 1`; the result
    /// is empty when there is not enough data.
    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Get the minimum data points required.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;

    /// Calculate values padded to the input length.
    ///
    /// Index `i` holds the value computed over `data[..=i]`, or `None` during
    /// the warmup of `period() - 1` bars.
    fn calculate_aligned(&self, data: &[f64]) -> Vec<Option<Self::Output>> {
        let values = self.calculate(data);
        let warmup = data.len() - values.len();
        std::iter::repeat(None)
            .take(warmup)
            .chain(values.into_iter().map(Some))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestIndicator {
        period: usize,
    }

    impl Indicator for TestIndicator {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            if data.len() < self.period {
                return vec![];
            }
            // Simple sum indicator for testing
            data.windows(self.period)
                .map(|w| w.iter().sum())
                .collect()
        }

        fn period(&self) -> usize {
            self.period
        }

        fn name(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_calculate_aligned() {
        let indicator = TestIndicator { period: 3 };
        let aligned = indicator.calculate_aligned(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        assert_eq!(aligned, vec![None, None, Some(6.0), Some(9.0), Some(12.0)]);

        // not enough data: all warmup
        assert_eq!(indicator.calculate_aligned(&[1.0, 2.0]), vec![None, None]);
    }
}
