//! Symmetric positive definite band matrices.
//!
//! Normal equations of a B-spline fit only couple coefficients whose basis
//! functions overlap, so they are stored as a lower band and factored in
//! `O(n * bandwidth^2)`.

use nalgebra::{DMatrix, DVector};

/// Lower band of a symmetric matrix: entry `(i, d)` holds `A[i][i - d]`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BandMatrix {
    band: DMatrix<f64>,
}

impl BandMatrix {
    pub fn zeros(size: usize, bandwidth: usize) -> Self {
        Self {
            band: DMatrix::zeros(size, bandwidth + 1),
        }
    }

    pub fn size(&self) -> usize {
        self.band.nrows()
    }

    pub fn bandwidth(&self) -> usize {
        self.band.ncols() - 1
    }

    /// Adds `scale * w * w^T` with `w` occupying rows `start..start + w.len()`.
    pub fn add_outer(&mut self, start: usize, weights: &[f64], scale: f64) {
        debug_assert!(weights.len() <= self.band.ncols());
        for (a, wa) in weights.iter().enumerate() {
            for (b, wb) in weights[..=a].iter().enumerate() {
                self.band[(start + a, a - b)] += scale * wa * wb;
            }
        }
    }

    pub fn trace(&self) -> f64 {
        self.band.column(0).sum()
    }

    /// `self + weight * other`; both must share size and bandwidth.
    pub fn add_scaled(&self, other: &Self, weight: f64) -> Self {
        Self {
            band: &self.band + &other.band * weight,
        }
    }

    /// Banded Cholesky factor `L` with `A = L L^T`, or `None` when the
    /// matrix is not numerically positive definite.
    pub fn cholesky(&self) -> Option<BandCholesky> {
        let n = self.size();
        let bw = self.bandwidth();
        let mut lower = DMatrix::<f64>::zeros(n, bw + 1);

        for i in 0..n {
            let first = i.saturating_sub(bw);
            for j in first..=i {
                let mut sum = self.band[(i, i - j)];
                for k in first..j {
                    sum -= lower[(i, i - k)] * lower[(j, j - k)];
                }
                if i == j {
                    if sum <= 0.0 || !sum.is_finite() {
                        return None;
                    }
                    lower[(i, 0)] = sum.sqrt();
                } else {
                    lower[(i, i - j)] = sum / lower[(j, 0)];
                }
            }
        }
        Some(BandCholesky { lower })
    }
}

/// Cholesky factor in the same band layout as [`BandMatrix`].
#[derive(Debug, Clone)]
pub(crate) struct BandCholesky {
    lower: DMatrix<f64>,
}

impl BandCholesky {
    pub fn solve(&self, rhs: &DVector<f64>) -> DVector<f64> {
        let n = self.lower.nrows();
        let bw = self.lower.ncols() - 1;
        let mut x = rhs.clone();

        // L z = b
        for i in 0..n {
            let mut sum = x[i];
            for k in i.saturating_sub(bw)..i {
                sum -= self.lower[(i, i - k)] * x[k];
            }
            x[i] = sum / self.lower[(i, 0)];
        }
        // L^T x = z
        for i in (0..n).rev() {
            let mut sum = x[i];
            for k in i + 1..n.min(i + bw + 1) {
                sum -= self.lower[(k, k - i)] * x[k];
            }
            x[i] = sum / self.lower[(i, 0)];
        }
        x
    }
}
