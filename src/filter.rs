use serde::{Deserialize, Serialize};

use crate::coefficients::{validate_window, CoefficientCache};
use crate::error::{Result, TrendError};

/// Boundary handling strategies for the Savitzky-Golay filter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Fit a polynomial to the first/last full window and evaluate it at the edge samples
    #[default]
    Interp,
    /// Pad with values mirrored about the edge sample (edge not repeated)
    Mirror,
    /// Repeat the edge sample
    Nearest,
    /// Wrap around (circular boundary)
    Wrap,
    /// Pad with a fixed value
    Constant(f64),
}

/// Configuration for the Savitzky-Golay filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Size of the filter window (must be odd)
    pub window_size: usize,
    /// Order of the polynomial to fit
    pub poly_order: usize,
    /// Boundary handling strategy
    pub boundary_mode: BoundaryMode,
}

impl FilterConfig {
    /// Creates a new filter configuration with validation
    pub fn new(window_size: usize, poly_order: usize) -> Result<Self> {
        validate_window(window_size, poly_order)?;
        Ok(Self {
            window_size,
            poly_order,
            boundary_mode: BoundaryMode::Interp,
        })
    }

    /// Sets the boundary handling mode
    pub fn with_boundary_mode(mut self, mode: BoundaryMode) -> Self {
        self.boundary_mode = mode;
        self
    }
}

/// A Savitzky-Golay filter for signal smoothing and differentiation.
///
/// Samples are assumed to be evenly spaced one unit apart, so derivatives are
/// per row.
#[derive(Debug)]
pub struct SavitzkyGolayFilter {
    config: FilterConfig,
    cache: CoefficientCache,
}

impl SavitzkyGolayFilter {
    /// Creates a new Savitzky-Golay filter with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `window_size` - Size of the filter window (must be odd)
    /// * `poly_order` - Order of the polynomial to fit (must be < window_size)
    ///
    /// # Example
    ///
    /// ```rust
    /// use incline::SavitzkyGolayFilter;
    ///
    /// let filter = SavitzkyGolayFilter::new(5, 2).expect("Valid parameters");
    /// ```
    pub fn new(window_size: usize, poly_order: usize) -> Result<Self> {
        let config = FilterConfig::new(window_size, poly_order)?;
        Ok(Self::with_config(config))
    }

    /// Creates a filter with custom configuration
    pub fn with_config(config: FilterConfig) -> Self {
        Self {
            config,
            cache: CoefficientCache::new(),
        }
    }

    /// Sets the boundary handling mode
    pub fn with_boundary_mode(mut self, mode: BoundaryMode) -> Self {
        self.config.boundary_mode = mode;
        self
    }

    /// Applies the Savitzky-Golay filter to smooth the input data.
    ///
    /// Fails with [`TrendError::InsufficientData`] when the data is shorter
    /// than the window.
    ///
    /// # Example
    ///
    /// ```rust
    /// use incline::SavitzkyGolayFilter;
    ///
    /// let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
    /// let mut filter = SavitzkyGolayFilter::new(5, 2).expect("Valid parameters");
    /// let smoothed = filter.apply(&data).expect("Enough data");
    /// assert_eq!(smoothed.len(), data.len());
    /// ```
    pub fn apply(&mut self, data: &[f64]) -> Result<Vec<f64>> {
        self.apply_derivative(data, 0)
    }

    /// Applies the Savitzky-Golay filter to compute derivatives of the input data.
    ///
    /// # Arguments
    ///
    /// * `data` - The input signal data
    /// * `derivative_order` - Order of derivative to compute (0 smooths, 1 for first derivative, etc.)
    pub fn apply_derivative(&mut self, data: &[f64], derivative_order: usize) -> Result<Vec<f64>> {
        let window_size = self.config.window_size;
        if data.len() < window_size {
            return Err(TrendError::InsufficientData {
                found: data.len(),
                required: window_size,
            });
        }

        let coeffs = self
            .cache
            .get_coefficients(window_size, self.config.poly_order, derivative_order)?
            .to_vec();

        match self.config.boundary_mode {
            BoundaryMode::Interp => self.apply_interp(data, &coeffs, derivative_order),
            mode => Ok(correlate_padded(data, &coeffs, mode)),
        }
    }

    /// Centered weights in the interior, edge-fitted weights for the first and
    /// last `window_size / 2` samples.
    fn apply_interp(&mut self, data: &[f64], coeffs: &[f64], derivative_order: usize) -> Result<Vec<f64>> {
        let n = data.len();
        let window_size = self.config.window_size;
        let half_window = window_size / 2;
        let mut result = vec![0.0; n];

        for center in half_window..n - half_window {
            let window = &data[center - half_window..=center + half_window];
            result[center] = dot(coeffs, window);
        }

        let head = &data[..window_size];
        let tail = &data[n - window_size..];
        for position in 0..half_window {
            let weights = self.cache.get_edge_coefficients(
                window_size,
                self.config.poly_order,
                derivative_order,
                position,
            )?;
            result[position] = dot(weights, head);

            // Mirror position counted from the right edge
            let right = window_size - 1 - position;
            let weights = self.cache.get_edge_coefficients(
                window_size,
                self.config.poly_order,
                derivative_order,
                right,
            )?;
            result[n - window_size + right] = dot(weights, tail);
        }

        Ok(result)
    }

    /// Returns the filter configuration
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

fn dot(weights: &[f64], samples: &[f64]) -> f64 {
    weights.iter().zip(samples).map(|(w, y)| w * y).sum()
}

/// Extends the signal by `window_size / 2` on each side and correlates it
/// with the centered weights. Requires `signal.len() > window_size / 2`.
fn correlate_padded(signal: &[f64], coeffs: &[f64], mode: BoundaryMode) -> Vec<f64> {
    let n = signal.len();
    let half_window = coeffs.len() / 2;
    let mut padded = Vec::with_capacity(n + 2 * half_window);

    for i in (1..=half_window).rev() {
        // i is the distance to the left of sample 0
        padded.push(match mode {
            BoundaryMode::Mirror => signal[i],
            BoundaryMode::Nearest | BoundaryMode::Interp => signal[0],
            BoundaryMode::Wrap => signal[n - i],
            BoundaryMode::Constant(value) => value,
        });
    }
    padded.extend_from_slice(signal);
    for i in 1..=half_window {
        // i is the distance to the right of sample n - 1
        padded.push(match mode {
            BoundaryMode::Mirror => signal[n - 1 - i],
            BoundaryMode::Nearest | BoundaryMode::Interp => signal[n - 1],
            BoundaryMode::Wrap => signal[i - 1],
            BoundaryMode::Constant(value) => value,
        });
    }

    padded.windows(coeffs.len()).map(|window| dot(coeffs, window)).collect()
}
