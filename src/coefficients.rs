use ahash::AHashMap;
use nalgebra::{DMatrix, DVector};

use crate::error::{Result, TrendError};

/// Computes Savitzky-Golay filter coefficients using least squares polynomial fitting.
///
/// The Savitzky-Golay filter works by fitting a polynomial of degree `poly_order`
/// to a moving window of `window_size` data points, then using the polynomial to
/// estimate the value (or derivative) at the center point.
///
/// # Arguments
///
/// * `window_size` - Size of the moving window (must be odd)
/// * `poly_order` - Degree of the polynomial to fit (must be < window_size)
/// * `derivative` - Order of derivative to compute (0 for smoothing, 1 for first derivative, etc.)
///
/// # Returns
///
/// A vector of weights; `weights[j]` multiplies the sample at `center + j - window_size / 2`
pub fn compute_coefficients(
    window_size: usize,
    poly_order: usize,
    derivative: usize,
) -> Result<Vec<f64>> {
    validate_window(window_size, poly_order)?;

    let half_window = (window_size / 2) as isize;
    let offsets: Vec<isize> = (0..window_size as isize).map(|i| i - half_window).collect();
    least_squares_weights(&offsets, poly_order, derivative)
}

/// Computes weights for an arbitrary set of sample offsets relative to the
/// evaluation point. Used near the edges, where the window cannot be centered.
pub fn compute_coefficients_for_offsets(
    offsets: &[isize],
    poly_order: usize,
    derivative: usize,
) -> Result<Vec<f64>> {
    if offsets.is_empty() {
        return Err(TrendError::InvalidWindowSize(0));
    }
    if poly_order >= offsets.len() {
        return Err(TrendError::InvalidPolynomialOrder(poly_order, offsets.len()));
    }
    least_squares_weights(offsets, poly_order, derivative)
}

pub(crate) fn validate_window(window_size: usize, poly_order: usize) -> Result<()> {
    if window_size % 2 == 0 || window_size == 0 {
        return Err(TrendError::InvalidWindowSize(window_size));
    }
    if poly_order >= window_size {
        return Err(TrendError::InvalidPolynomialOrder(poly_order, window_size));
    }
    Ok(())
}

fn least_squares_weights(offsets: &[isize], poly_order: usize, derivative: usize) -> Result<Vec<f64>> {
    let window_size = offsets.len();

    // A polynomial of degree poly_order has no term to differentiate this far
    if derivative > poly_order {
        return Ok(vec![0.0; window_size]);
    }

    // Vandermonde matrix: one row per sample, one column per polynomial power
    let mut vandermonde = DMatrix::<f64>::zeros(window_size, poly_order + 1);
    for (i, &off) in offsets.iter().enumerate() {
        let x = off as f64;
        for j in 0..=poly_order {
            vandermonde[(i, j)] = x.powi(j as i32);
        }
    }

    // Solve A^T A c = d! e_d, then weights = A c
    let ata = vandermonde.transpose() * &vandermonde;
    let mut rhs = DVector::<f64>::zeros(poly_order + 1);
    rhs[derivative] = (1..=derivative).fold(1.0, |acc, x| acc * x as f64);

    let coeffs_poly = ata.lu().solve(&rhs).ok_or_else(|| {
        TrendError::Computation("Failed to solve least squares system".to_string())
    })?;

    Ok((&vandermonde * coeffs_poly).iter().copied().collect())
}

/// Memoised coefficient sets, keyed by filter shape.
#[derive(Debug, Default)]
pub struct CoefficientCache {
    centered: AHashMap<(usize, usize, usize), Vec<f64>>,
    // key: (window_size, poly_order, derivative, position of the evaluation point in the window)
    edge: AHashMap<(usize, usize, usize, usize), Vec<f64>>,
}

impl CoefficientCache {
    /// Creates a new coefficient cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets centered coefficients from cache or computes them if not cached
    pub fn get_coefficients(
        &mut self,
        window_size: usize,
        poly_order: usize,
        derivative: usize,
    ) -> Result<&[f64]> {
        let key = (window_size, poly_order, derivative);
        if !self.centered.contains_key(&key) {
            let coeffs = compute_coefficients(window_size, poly_order, derivative)?;
            self.centered.insert(key, coeffs);
        }
        Ok(self.centered[&key].as_slice())
    }

    /// Gets coefficients for evaluating at `position` inside a full window
    /// whose first sample is offset `-position` from the evaluation point.
    pub fn get_edge_coefficients(
        &mut self,
        window_size: usize,
        poly_order: usize,
        derivative: usize,
        position: usize,
    ) -> Result<&[f64]> {
        let key = (window_size, poly_order, derivative, position);
        if !self.edge.contains_key(&key) {
            let offsets: Vec<isize> = (0..window_size)
                .map(|j| j as isize - position as isize)
                .collect();
            let coeffs = compute_coefficients_for_offsets(&offsets, poly_order, derivative)?;
            self.edge.insert(key, coeffs);
        }
        Ok(self.edge[&key].as_slice())
    }

    /// Number of cached coefficient sets
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.centered.len() + self.edge.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
