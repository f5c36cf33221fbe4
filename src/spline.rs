//! Smoothing B-splines.
//!
//! [`SmoothingSpline::fit`] returns the smoothest spline of a given degree
//! whose residual sum of squares stays within the smoothing factor `s`:
//!
//! 1. The least-squares polynomial (a spline without interior knots) is tried
//!    first and kept when its residual is already `<= s`.
//! 2. Otherwise the interpolation knot set is used and the squared jumps of
//!    the `k`-th derivative at the interior knots are penalised. The penalty
//!    weight is bisected until the residual matches `s`. With `s == 0` the
//!    result interpolates the data.

use log::{trace, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::banded::BandMatrix;
use crate::error::{Result, TrendError};

/// Highest supported spline degree.
pub const MAX_DEGREE: usize = 5;

// Accept |fp - s| <= TOLERANCE * s
const TOLERANCE: f64 = 1e-3;
const MAX_ITERATIONS: usize = 64;
// Bisection range for log10 of the relative penalty weight
const LOG_WEIGHT_RANGE: (f64, f64) = (-10.0, 10.0);

/// A fitted spline in B-spline form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    degree: usize,
    residual: f64,
}

impl SmoothingSpline {
    /// Fits a smoothing spline of `degree` to the points `(x, y)`.
    ///
    /// `x` must be strictly increasing. Requires more points than `degree`
    /// and finite inputs. Every linear system is banded, so the cost grows
    /// linearly with the number of points.
    ///
    /// # Example
    ///
    /// ```rust
    /// use incline::SmoothingSpline;
    ///
    /// let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
    /// let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    /// let spline = SmoothingSpline::fit(&x, &y, 3, 3.0).expect("valid input");
    /// let slope = spline.evaluate_derivative(&[4.5], 1).expect("order <= degree");
    /// assert!((slope[0] - 2.0).abs() < 1e-8);
    /// ```
    pub fn fit(x: &[f64], y: &[f64], degree: usize, smoothing: f64) -> Result<Self> {
        validate_inputs(x, y, degree, smoothing)?;
        let m = x.len();

        let poly_knots = clamped_knots(x[0], x[m - 1], degree, &[]);
        let poly_rows = design_rows(x, &poly_knots, degree);
        let poly_coefs = solve_normal_equations(
            &gram(&poly_rows, degree + 1, degree),
            &project(&poly_rows, y, degree + 1),
        )?;
        let poly_fp = sum_of_squares(&poly_rows, &poly_coefs, y);
        trace!("polynomial fit of degree {degree}: fp = {poly_fp}, s = {smoothing}");

        if poly_fp <= smoothing {
            return Ok(Self {
                knots: poly_knots,
                coefficients: poly_coefs.iter().copied().collect(),
                degree,
                residual: poly_fp,
            });
        }

        let interior = interior_knots(x, degree);
        let knots = clamped_knots(x[0], x[m - 1], degree, &interior);
        let ncoef = knots.len() - degree - 1;
        let rows = design_rows(x, &knots, degree);
        // Wide enough for the jump penalty, which spans degree + 2 coefficients
        let btb = gram(&rows, ncoef, degree + 1);
        let bty = project(&rows, y, ncoef);

        let coefs = if smoothing == 0.0 {
            solve_normal_equations(&btb, &bty)?
        } else {
            let ptp = gram(&jump_rows(&knots, degree, ncoef), ncoef, degree + 1);
            penalized_fit(&rows, &btb, &bty, &ptp, y, smoothing)?
        };
        let residual = sum_of_squares(&rows, &coefs, y);

        Ok(Self {
            knots,
            coefficients: coefs.iter().copied().collect(),
            degree,
            residual,
        })
    }

    /// Evaluates the spline at each of `x`. Points outside the knot range are
    /// extrapolated from the first/last polynomial piece.
    pub fn evaluate(&self, x: &[f64]) -> Vec<f64> {
        let ncoef = self.coefficients.len();
        x.iter()
            .map(|&xi| {
                let span = find_span(&self.knots, self.degree, ncoef, xi);
                basis_functions(&self.knots, self.degree, span, xi)
                    .iter()
                    .enumerate()
                    .map(|(r, b)| b * self.coefficients[span - self.degree + r])
                    .sum::<f64>()
            })
            .collect()
    }

    /// Returns the `order`-th derivative as a spline of degree `degree - order`.
    pub fn derivative(&self, order: usize) -> Result<Self> {
        if order > self.degree {
            return Err(TrendError::InvalidDerivativeOrder {
                derivative_order: order,
                function_order: self.degree,
            });
        }
        let coefficients: Vec<f64> = (0..self.coefficients.len() - order)
            .map(|i| {
                derivative_weights(&self.knots, self.degree, order, i)
                    .iter()
                    .zip(&self.coefficients[i..])
                    .map(|(w, c)| w * c)
                    .sum::<f64>()
            })
            .collect();

        Ok(Self {
            knots: self.knots[order..self.knots.len() - order].to_vec(),
            coefficients,
            degree: self.degree - order,
            residual: self.residual,
        })
    }

    /// Evaluates the `order`-th derivative at each of `x`.
    pub fn evaluate_derivative(&self, x: &[f64], order: usize) -> Result<Vec<f64>> {
        Ok(self.derivative(order)?.evaluate(x))
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Sum of squared residuals at the fitted points.
    pub fn residual(&self) -> f64 {
        self.residual
    }
}

/// The non-zero stretch of one row of a banded operator.
#[derive(Debug, Clone, PartialEq)]
struct SparseRow {
    first: usize,
    values: Vec<f64>,
}

impl SparseRow {
    fn dot(&self, coefs: &DVector<f64>) -> f64 {
        self.values
            .iter()
            .enumerate()
            .map(|(r, v)| v * coefs[self.first + r])
            .sum()
    }
}

fn validate_inputs(x: &[f64], y: &[f64], degree: usize, smoothing: f64) -> Result<()> {
    if degree == 0 || degree > MAX_DEGREE {
        return Err(TrendError::InvalidSplineDegree(degree));
    }
    if x.len() != y.len() {
        return Err(TrendError::LengthMismatch {
            column: "y".to_string(),
            found: y.len(),
            expected: x.len(),
        });
    }
    if x.len() <= degree {
        return Err(TrendError::InsufficientData {
            found: x.len(),
            required: degree + 1,
        });
    }
    if !smoothing.is_finite() || smoothing < 0.0 {
        return Err(TrendError::InvalidSmoothingFactor(smoothing));
    }
    if let Some((row, &value)) = x.iter().chain(y).enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(TrendError::NonFiniteValue {
            row: row % x.len(),
            value,
        });
    }
    if x.windows(2).any(|w| w[1] <= w[0]) {
        return Err(TrendError::Computation("x must be strictly increasing".to_string()));
    }
    Ok(())
}

/// Boundary knots repeated `degree + 1` times around `interior`.
fn clamped_knots(start: f64, end: f64, degree: usize, interior: &[f64]) -> Vec<f64> {
    let mut knots = Vec::with_capacity(interior.len() + 2 * (degree + 1));
    knots.extend(std::iter::repeat(start).take(degree + 1));
    knots.extend_from_slice(interior);
    knots.extend(std::iter::repeat(end).take(degree + 1));
    knots
}

/// Interior knots giving one coefficient per data point: data points for odd
/// degree, midpoints for even degree, dropping `degree / 2 + 1` points per side.
fn interior_knots(x: &[f64], degree: usize) -> Vec<f64> {
    let half = degree / 2;
    (0..x.len() - degree - 1)
        .map(|l| {
            if degree % 2 == 1 {
                x[half + 1 + l]
            } else {
                0.5 * (x[half + 1 + l] + x[half + l])
            }
        })
        .collect()
}

/// Index `l` with `knots[l] <= x < knots[l + 1]`, clamped to the valid spans.
fn find_span(knots: &[f64], degree: usize, ncoef: usize, x: f64) -> usize {
    if x >= knots[ncoef] {
        return ncoef - 1;
    }
    if x <= knots[degree] {
        return degree;
    }
    let (mut lo, mut hi) = (degree, ncoef);
    while hi - lo > 1 {
        let mid = (lo + hi) / 2;
        if x < knots[mid] {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    lo
}

/// Cox-de Boor recursion for the `degree + 1` basis functions that are
/// non-zero on `span`. Entry `r` belongs to basis function `span - degree + r`.
fn basis_functions(knots: &[f64], degree: usize, span: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;

    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = values[r] / (right[r + 1] + left[j - r]);
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }
    values
}

/// One row per point holding its `degree + 1` non-zero basis values.
fn design_rows(x: &[f64], knots: &[f64], degree: usize) -> Vec<SparseRow> {
    let ncoef = knots.len() - degree - 1;
    x.iter()
        .map(|&xi| {
            let span = find_span(knots, degree, ncoef, xi);
            SparseRow {
                first: span - degree,
                values: basis_functions(knots, degree, span, xi),
            }
        })
        .collect()
}

/// Weights of coefficients `i..=i + order` in the `i`-th coefficient of the
/// `order`-th derivative (knots `knots[order..len - order]`).
fn derivative_weights(knots: &[f64], degree: usize, order: usize, i: usize) -> Vec<f64> {
    let mut rows: Vec<Vec<f64>> = (0..=order)
        .map(|r| {
            let mut unit = vec![0.0; order + 1];
            unit[r] = 1.0;
            unit
        })
        .collect();

    for j in 0..order {
        let p = degree - j;
        let tau = &knots[j..];
        let next: Vec<Vec<f64>> = (0..rows.len() - 1)
            .map(|r| {
                let width = tau[i + r + p + 1] - tau[i + r + 1];
                if width > 0.0 {
                    let factor = p as f64 / width;
                    rows[r + 1].iter().zip(&rows[r]).map(|(a, b)| factor * (a - b)).collect()
                } else {
                    vec![0.0; order + 1]
                }
            })
            .collect();
        rows = next;
    }
    rows.swap_remove(0)
}

/// Jumps of the (piecewise constant) `degree`-th derivative at each interior
/// knot, each spanning `degree + 2` coefficients.
fn jump_rows(knots: &[f64], degree: usize, ncoef: usize) -> Vec<SparseRow> {
    let pieces: Vec<Vec<f64>> = (0..ncoef - degree)
        .map(|i| derivative_weights(knots, degree, degree, i))
        .collect();
    pieces
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let mut values = vec![0.0; degree + 2];
            for (r, w) in pair[0].iter().enumerate() {
                values[r] -= w;
            }
            for (r, w) in pair[1].iter().enumerate() {
                values[r + 1] += w;
            }
            SparseRow { first: i, values }
        })
        .collect()
}

/// `R^T R` for the operator with the given rows.
fn gram(rows: &[SparseRow], ncoef: usize, bandwidth: usize) -> BandMatrix {
    let mut gram = BandMatrix::zeros(ncoef, bandwidth);
    for row in rows {
        gram.add_outer(row.first, &row.values, 1.0);
    }
    gram
}

/// `R^T y`.
fn project(rows: &[SparseRow], y: &[f64], ncoef: usize) -> DVector<f64> {
    let mut projected = DVector::<f64>::zeros(ncoef);
    for (row, &yi) in rows.iter().zip(y) {
        for (r, v) in row.values.iter().enumerate() {
            projected[row.first + r] += v * yi;
        }
    }
    projected
}

fn penalized_fit(
    rows: &[SparseRow],
    btb: &BandMatrix,
    bty: &DVector<f64>,
    ptp: &BandMatrix,
    y: &[f64],
    smoothing: f64,
) -> Result<DVector<f64>> {
    let penalty_trace = ptp.trace();
    if penalty_trace <= 0.0 {
        return solve_normal_equations(btb, bty);
    }
    let scale = btb.trace() / penalty_trace;

    let fit_at = |log_weight: f64| -> Result<(DVector<f64>, f64)> {
        let weight = scale * 10f64.powf(log_weight);
        let coefs = solve_normal_equations(&btb.add_scaled(ptp, weight), bty)?;
        let fp = sum_of_squares(rows, &coefs, y);
        Ok((coefs, fp))
    };

    let (mut lo, mut hi) = LOG_WEIGHT_RANGE;
    let (hi_coefs, hi_fp) = fit_at(hi)?;
    if hi_fp <= smoothing {
        trace!("penalty saturated: fp = {hi_fp}, s = {smoothing}");
        return Ok(hi_coefs);
    }
    let (mut best, mut best_fp) = fit_at(lo)?;

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        let (coefs, fp) = fit_at(mid)?;
        if (fp - smoothing).abs() <= TOLERANCE * smoothing {
            trace!("penalty weight 10^{mid:.4} gives fp = {fp}, s = {smoothing}");
            return Ok(coefs);
        }
        if fp < smoothing {
            lo = mid;
            best = coefs;
            best_fp = fp;
        } else {
            hi = mid;
        }
    }

    warn!(
        "smoothing spline did not reach s = {smoothing} within {MAX_ITERATIONS} iterations; using fp = {best_fp}"
    );
    Ok(best)
}

fn solve_normal_equations(lhs: &BandMatrix, rhs: &DVector<f64>) -> Result<DVector<f64>> {
    lhs.cholesky()
        .map(|factor| factor.solve(rhs))
        .ok_or_else(|| TrendError::Computation("Smoothing system is not positive definite".to_string()))
}

fn sum_of_squares(rows: &[SparseRow], coefs: &DVector<f64>, y: &[f64]) -> f64 {
    rows.iter()
        .zip(y)
        .map(|(row, &yi)| (yi - row.dot(coefs)).powi(2))
        .sum()
}
