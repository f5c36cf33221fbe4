//! Trend estimators.
//!
//! Each estimator reads one numeric column and returns a [`TrendTable`] with
//! the same rows, in the same order, tagged with how the derivative was
//! obtained.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::{BoundaryMode, FilterConfig, SavitzkyGolayFilter};
use crate::spline::SmoothingSpline;
use crate::table::{DerivativeMethod, TimeSeriesTable, TrendTable};

/// Parameters of the spline estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplineConfig {
    /// Spline degree (1..=5)
    pub function_order: usize,
    pub derivative_order: usize,
    /// Upper bound on the residual sum of squares of the fit
    pub smoothing: f64,
}

impl Default for SplineConfig {
    fn default() -> Self {
        Self {
            function_order: 3,
            derivative_order: 1,
            smoothing: 3.0,
        }
    }
}

impl SplineConfig {
    pub fn with_function_order(mut self, function_order: usize) -> Self {
        self.function_order = function_order;
        self
    }

    pub fn with_derivative_order(mut self, derivative_order: usize) -> Self {
        self.derivative_order = derivative_order;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing = smoothing;
        self
    }
}

/// Parameters of the Savitzky-Golay estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SgolayConfig {
    /// Polynomial order, must be below `window_length`
    pub function_order: usize,
    pub derivative_order: usize,
    /// Odd window size, at most the series length
    pub window_length: usize,
    pub mode: BoundaryMode,
}

impl Default for SgolayConfig {
    fn default() -> Self {
        Self {
            function_order: 3,
            derivative_order: 1,
            window_length: 15,
            mode: BoundaryMode::Interp,
        }
    }
}

impl SgolayConfig {
    pub fn with_function_order(mut self, function_order: usize) -> Self {
        self.function_order = function_order;
        self
    }

    pub fn with_derivative_order(mut self, derivative_order: usize) -> Self {
        self.derivative_order = derivative_order;
        self
    }

    pub fn with_window_length(mut self, window_length: usize) -> Self {
        self.window_length = window_length;
        self
    }

    pub fn with_mode(mut self, mode: BoundaryMode) -> Self {
        self.mode = mode;
        self
    }
}

/// A trend estimation method with its parameters.
///
/// # Example
///
/// ```rust
/// use incline::{Estimator, SgolayConfig, TimeSeriesTable};
///
/// let table = TimeSeriesTable::from_values((0..20).map(|i| i as f64).collect());
/// let estimator = Estimator::Sgolay(SgolayConfig::default().with_window_length(7));
/// let trend = estimator.estimate(&table, "value").unwrap();
/// assert_eq!(trend.len(), 20);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum Estimator {
    Naive,
    Spline(SplineConfig),
    Sgolay(SgolayConfig),
}

impl Estimator {
    pub fn estimate(&self, table: &TimeSeriesTable, column: &str) -> Result<TrendTable> {
        match self {
            Estimator::Naive => naive(table, column),
            Estimator::Spline(config) => spline(table, column, config),
            Estimator::Sgolay(config) => sgolay(table, column, config),
        }
    }

    pub fn method(&self) -> DerivativeMethod {
        match self {
            Estimator::Naive => DerivativeMethod::Naive,
            Estimator::Spline(_) => DerivativeMethod::Spline,
            Estimator::Sgolay(_) => DerivativeMethod::Sgolay,
        }
    }
}

/// Central first difference: the mean of the backward and forward
/// differences, one-sided at the ends. A single row has no neighbour and
/// yields `NaN`.
pub fn naive(table: &TimeSeriesTable, column: &str) -> Result<TrendTable> {
    let y = table.column(column)?;
    debug!("naive trend over '{column}' ({} rows)", y.len());

    let derivative = (0..y.len())
        .map(|i| {
            let backward = i.checked_sub(1).map(|prev| y[i] - y[prev]);
            let forward = y.get(i + 1).map(|next| next - y[i]);
            match (backward, forward) {
                (Some(b), Some(f)) => 0.5 * (b + f),
                (Some(d), None) | (None, Some(d)) => d,
                (None, None) => f64::NAN,
            }
        })
        .collect();

    Ok(TrendTable::new(table, derivative, DerivativeMethod::Naive, None, 1))
}

/// Smoothing spline fitted against row positions `0, 1, ..., n - 1`.
pub fn spline(table: &TimeSeriesTable, column: &str, config: &SplineConfig) -> Result<TrendTable> {
    let y = table.column(column)?;
    debug!(
        "spline trend over '{column}' ({} rows): k = {}, nu = {}, s = {}",
        y.len(),
        config.function_order,
        config.derivative_order,
        config.smoothing
    );

    let x: Vec<f64> = (0..y.len()).map(|i| i as f64).collect();
    let fitted = SmoothingSpline::fit(&x, y, config.function_order, config.smoothing)?;
    let derivative = fitted.evaluate_derivative(&x, config.derivative_order)?;

    Ok(TrendTable::new(
        table,
        derivative,
        DerivativeMethod::Spline,
        Some(config.function_order),
        config.derivative_order,
    )
    .with_smoothed_value(fitted.evaluate(&x)))
}

/// Savitzky-Golay smoothing and differentiation with unit row spacing.
pub fn sgolay(table: &TimeSeriesTable, column: &str, config: &SgolayConfig) -> Result<TrendTable> {
    let y = table.column(column)?;
    debug!(
        "sgolay trend over '{column}' ({} rows): window = {}, order = {}, nu = {}",
        y.len(),
        config.window_length,
        config.function_order,
        config.derivative_order
    );

    let filter_config = FilterConfig::new(config.window_length, config.function_order)?
        .with_boundary_mode(config.mode);
    let mut filter = SavitzkyGolayFilter::with_config(filter_config);
    let smoothed = filter.apply(y)?;
    let derivative = filter.apply_derivative(y, config.derivative_order)?;

    Ok(TrendTable::new(
        table,
        derivative,
        DerivativeMethod::Sgolay,
        Some(config.function_order),
        config.derivative_order,
    )
    .with_smoothed_value(smoothed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrendError;
    use approx::assert_abs_diff_eq;

    fn series(values: &[f64]) -> TimeSeriesTable {
        TimeSeriesTable::from_values(values.to_vec())
    }

    #[test]
    fn test_naive_central_and_one_sided() {
        let trend = naive(&series(&[1.0, 2.0, 4.0, 8.0]), "value").unwrap();
        assert_eq!(trend.derivative_value(), &[1.0, 1.5, 3.0, 4.0]);
        assert_eq!(trend.derivative_method(), DerivativeMethod::Naive);
        assert_eq!(trend.function_order(), None);
        assert_eq!(trend.derivative_order(), 1);
        assert!(trend.smoothed_value().is_none());
    }

    #[test]
    fn test_naive_degenerate_lengths() {
        assert!(naive(&series(&[]), "value").unwrap().is_empty());
        let single = naive(&series(&[7.0]), "value").unwrap();
        assert!(single.derivative_value()[0].is_nan());
    }

    #[test]
    fn test_naive_reads_named_column() {
        let table = series(&[0.0, 0.0, 0.0])
            .with_column("price", vec![3.0, 2.0, 1.0])
            .unwrap();
        let trend = naive(&table, "price").unwrap();
        assert_eq!(trend.derivative_value(), &[-1.0, -1.0, -1.0]);
        assert_eq!(
            naive(&table, "volume").unwrap_err(),
            TrendError::ColumnNotFound("volume".into())
        );
    }

    #[test]
    fn test_spline_tags_and_values() {
        let values: Vec<f64> = (0..12).map(|i| 0.5 * (i as f64).powi(2)).collect();
        let config = SplineConfig::default()
            .with_function_order(2)
            .with_derivative_order(1)
            .with_smoothing(0.5);
        let trend = spline(&series(&values), "value", &config).unwrap();

        assert_eq!(trend.derivative_method(), DerivativeMethod::Spline);
        assert_eq!(trend.function_order(), Some(2));
        assert_eq!(trend.derivative_order(), 1);
        for (i, (smoothed, slope)) in trend
            .smoothed_value()
            .unwrap()
            .iter()
            .zip(trend.derivative_value())
            .enumerate()
        {
            assert_abs_diff_eq!(*smoothed, values[i], epsilon = 1e-8);
            assert_abs_diff_eq!(*slope, i as f64, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_spline_rejects_short_or_non_finite_series() {
        let config = SplineConfig::default();
        assert!(matches!(
            spline(&series(&[1.0, 2.0, 3.0]), "value", &config),
            Err(TrendError::InsufficientData { found: 3, required: 4 })
        ));
        assert!(matches!(
            spline(&series(&[1.0, 2.0, f64::INFINITY, 4.0, 5.0]), "value", &config),
            Err(TrendError::NonFiniteValue { row: 2, .. })
        ));
    }

    #[test]
    fn test_sgolay_tags_and_values() {
        let values: Vec<f64> = (0..20).map(|i| 3.0 * i as f64 - 1.0).collect();
        let config = SgolayConfig::default().with_window_length(5).with_function_order(2);
        let trend = sgolay(&series(&values), "value", &config).unwrap();

        assert_eq!(trend.derivative_method(), DerivativeMethod::Sgolay);
        assert_eq!(trend.function_order(), Some(2));
        assert_eq!(trend.derivative_order(), 1);
        for slope in trend.derivative_value() {
            assert_abs_diff_eq!(*slope, 3.0, epsilon = 1e-9);
        }
        for (smoothed, original) in trend.smoothed_value().unwrap().iter().zip(&values) {
            assert_abs_diff_eq!(smoothed, original, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_sgolay_window_longer_than_series() {
        let err = sgolay(&series(&[1.0; 10]), "value", &SgolayConfig::default()).unwrap_err();
        assert_eq!(err, TrendError::InsufficientData { found: 10, required: 15 });
    }

    #[test]
    fn test_sgolay_invalid_window() {
        let values = vec![1.0; 20];
        let even = SgolayConfig::default().with_window_length(6);
        assert_eq!(
            sgolay(&series(&values), "value", &even).unwrap_err(),
            TrendError::InvalidWindowSize(6)
        );
        let too_high = SgolayConfig::default().with_window_length(5).with_function_order(5);
        assert_eq!(
            sgolay(&series(&values), "value", &too_high).unwrap_err(),
            TrendError::InvalidPolynomialOrder(5, 5)
        );
    }

    #[test]
    fn test_estimator_dispatch() {
        let table = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let estimators = [
            Estimator::Naive,
            Estimator::Spline(SplineConfig::default()),
            Estimator::Sgolay(SgolayConfig::default().with_window_length(5)),
        ];
        for estimator in &estimators {
            let trend = estimator.estimate(&table, "value").unwrap();
            assert_eq!(trend.derivative_method(), estimator.method());
            assert_eq!(trend.index(), table.index());
            for slope in trend.derivative_value() {
                assert_abs_diff_eq!(*slope, 1.0, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_estimator_from_json() {
        let estimator: Estimator =
            serde_json::from_str(r#"{"method": "sgolay", "window_length": 7}"#).unwrap();
        assert_eq!(
            estimator,
            Estimator::Sgolay(SgolayConfig::default().with_window_length(7))
        );
        let naive: Estimator = serde_json::from_str(r#"{"method": "naive"}"#).unwrap();
        assert_eq!(naive, Estimator::Naive);
    }
}
