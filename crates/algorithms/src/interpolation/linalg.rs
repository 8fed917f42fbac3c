//! Dense LU factorisation for the small systems behind kriging and splines.

use stpgis_core::{Error, Result};

/// Relative pivot size below which a system is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Row-major LU factors with partial pivoting, reusable across right-hand sides.
#[derive(Debug, Clone)]
pub(crate) struct LuFactor {
    n: usize,
    lu: Vec<f64>,
    perm: Vec<usize>,
}

impl LuFactor {
    /// Factor the `n x n` row-major matrix `mat`.
    ///
    /// Returns `SingularSystem` when a pivot vanishes relative to the
    /// largest entry of the matrix.
    pub(crate) fn new(n: usize, mut mat: Vec<f64>) -> Result<Self> {
        debug_assert_eq!(mat.len(), n * n);
        let scale = mat.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
        let mut perm: Vec<usize> = (0..n).collect();

        for col in 0..n {
            let (pivot_row, pivot_abs) = (col..n)
                .map(|r| (r, mat[r * n + col].abs()))
                .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });

            if !(pivot_abs > PIVOT_TOLERANCE * scale) {
                return Err(Error::SingularSystem(format!(
                    "pivot {:.3e} in column {} of a {}x{} system",
                    pivot_abs, col, n, n
                )));
            }

            if pivot_row != col {
                for j in 0..n {
                    mat.swap(col * n + j, pivot_row * n + j);
                }
                perm.swap(col, pivot_row);
            }

            let pivot = mat[col * n + col];
            for row in (col + 1)..n {
                let factor = mat[row * n + col] / pivot;
                mat[row * n + col] = factor;
                for j in (col + 1)..n {
                    mat[row * n + j] -= factor * mat[col * n + j];
                }
            }
        }

        Ok(Self { n, lu: mat, perm })
    }

    /// Solve `A x = b` with the stored factors.
    pub(crate) fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut x: Vec<f64> = self.perm.iter().map(|&p| b[p]).collect();

        for i in 0..n {
            let mut sum = x[i];
            for j in 0..i {
                sum -= self.lu[i * n + j] * x[j];
            }
            x[i] = sum;
        }
        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in (i + 1)..n {
                sum -= self.lu[i * n + j] * x[j];
            }
            x[i] = sum / self.lu[i * n + i];
        }
        x
    }
}
