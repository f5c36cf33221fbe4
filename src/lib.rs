//! # incline
//!
//! Smoothed trends and derivatives of time series, and ranking of several
//! series by how steeply they have been moving lately.
//!
//! Three interchangeable estimators turn a [`TimeSeriesTable`] into a
//! [`TrendTable`]:
//!
//! - **naive**: central first differences, one-sided at the ends
//! - **spline**: a smoothing B-spline fitted against row positions
//! - **sgolay**: a Savitzky-Golay filter (local least-squares polynomials)
//!
//! [`trending`] then scores each series by the maximum or average of its
//! last `k` derivative values.
//!
//! ## Example
//!
//! ```rust
//! use incline::{naive_trend, sgolay_trend, trending, Aggregation, TimeSeriesTable};
//!
//! let a = TimeSeriesTable::from_values(vec![1.0, 2.0, 3.0, 4.0, 5.0]).with_id("A");
//! let b = TimeSeriesTable::from_values(vec![5.0, 4.0, 3.0, 2.0, 1.0]).with_id("B");
//!
//! let trends = vec![naive_trend(&a, "value")?, naive_trend(&b, "value")?];
//! let ranking = trending(&trends, 1, Aggregation::Max, 2)?;
//! assert_eq!(ranking[0].id, "A");
//! assert_eq!(ranking[0].max_or_avg, 1.0);
//!
//! let smooth = sgolay_trend(&a, "value", 2, 1, 5)?;
//! assert_eq!(smooth.len(), 5);
//! # Ok::<(), incline::TrendError>(())
//! ```

mod banded;
mod coefficients;
mod error;
mod filter;
mod nullable;
mod ranking;
mod spline;
mod table;
mod trend;

pub use coefficients::{compute_coefficients, compute_coefficients_for_offsets};
pub use error::{Result, TrendError};
pub use filter::{BoundaryMode, FilterConfig, SavitzkyGolayFilter};
pub use ranking::{rank, Aggregation, TrendScore, TrendingConfig};
pub use spline::{SmoothingSpline, MAX_DEGREE};
pub use table::{DerivativeMethod, TimeSeriesTable, TrendRow, TrendTable, DEFAULT_VALUE_COLUMN};
pub use trend::{Estimator, SgolayConfig, SplineConfig};

/// Naive slope: the average of the change to the previous and to the next
/// row, one-sided at the first and last rows.
///
/// Tags the output `naive`, derivative order 1, no function order.
pub fn naive_trend(table: &TimeSeriesTable, column_value: &str) -> Result<TrendTable> {
    trend::naive(table, column_value)
}

/// Fits a smoothing spline of degree `function_order` (1..=5) whose residual
/// sum of squares does not exceed `s`, and evaluates it and its
/// `derivative_order`-th derivative at every row.
///
/// # Arguments
///
/// * `table` - The input series
/// * `column_value` - Column to fit (conventionally `"value"`)
/// * `function_order` - Spline degree (default 3)
/// * `derivative_order` - 0, 1, 2, ... up to `function_order` (default 1)
/// * `s` - Smoothing factor (default 3.0); 0 interpolates
pub fn spline_trend(
    table: &TimeSeriesTable,
    column_value: &str,
    function_order: usize,
    derivative_order: usize,
    s: f64,
) -> Result<TrendTable> {
    let config = SplineConfig {
        function_order,
        derivative_order,
        smoothing: s,
    };
    trend::spline(table, column_value, &config)
}

/// Savitzky-Golay smoothing and differentiation.
///
/// # Arguments
///
/// * `table` - The input series
/// * `column_value` - Column to filter (conventionally `"value"`)
/// * `function_order` - Polynomial order, below `window_length` (default 3)
/// * `derivative_order` - 0, 1, 2, ... (default 1)
/// * `window_length` - Odd window size, at most the series length (default 15)
pub fn sgolay_trend(
    table: &TimeSeriesTable,
    column_value: &str,
    function_order: usize,
    derivative_order: usize,
    window_length: usize,
) -> Result<TrendTable> {
    let config = SgolayConfig {
        function_order,
        derivative_order,
        window_length,
        ..SgolayConfig::default()
    };
    trend::sgolay(table, column_value, &config)
}

/// Ranks series by the maximum or average of their last `k` derivative
/// values of the given order, highest first. See [`rank`].
pub fn trending(
    tables: &[TrendTable],
    derivative_order: usize,
    max_or_avg: Aggregation,
    k: usize,
) -> Result<Vec<TrendScore>> {
    let config = TrendingConfig {
        derivative_order,
        aggregation: max_or_avg,
        k,
    };
    rank(tables, &config)
}
