//! Small dense linear algebra for normal equations.
//!
//! The normal matrix `X'X` has one row per regressor, so a plain Cholesky
//! factorization is enough. A pivot that collapses relative to its diagonal
//! entry marks the regressor that is a linear combination of earlier ones.

use ndarray::Array2;
use thiserror::Error;

/// Relative pivot tolerance for [`cholesky`].
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// Failures of the symmetric positive definite routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinalgError {
    /// Input is not square
    #[error("Matrix is {rows}x{cols}, expected square")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// Pivot at this index is not positive
    #[error("Matrix is singular at pivot {pivot}")]
    Singular {
        /// Index of the first redundant column
        pivot: usize,
    },
}

/// Lower-triangular Cholesky factor `L` with `A = L L'`.
///
/// A pivot is rejected when the remaining diagonal falls below `tolerance`
/// times the original diagonal entry.
pub fn cholesky(a: &Array2<f64>, tolerance: f64) -> Result<Array2<f64>, LinalgError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LinalgError::NotSquare {
            rows: n,
            cols: a.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let diag = a[[j, j]];
        let mut d = diag;
        for k in 0..j {
            d -= l[[j, k]] * l[[j, k]];
        }
        if !d.is_finite() || diag <= 0.0 || d <= tolerance * diag {
            return Err(LinalgError::Singular { pivot: j });
        }
        let pivot = d.sqrt();
        l[[j, j]] = pivot;

        for i in (j + 1)..n {
            let mut s = a[[i, j]];
            for k in 0..j {
                s -= l[[i, k]] * l[[j, k]];
            }
            l[[i, j]] = s / pivot;
        }
    }
    Ok(l)
}

/// Inverse of a lower-triangular matrix by forward substitution.
fn invert_lower(l: &Array2<f64>) -> Array2<f64> {
    let n = l.nrows();
    let mut inv = Array2::<f64>::zeros((n, n));
    for col in 0..n {
        for i in col..n {
            let mut s = if i == col { 1.0 } else { 0.0 };
            for k in col..i {
                s -= l[[i, k]] * inv[[k, col]];
            }
            inv[[i, col]] = s / l[[i, i]];
        }
    }
    inv
}

/// Inverse of a symmetric positive definite matrix.
///
/// # Errors
///
/// Returns [`LinalgError::Singular`] with the first redundant column when the
/// matrix is not positive definite to within `tolerance`.
pub fn invert_spd(a: &Array2<f64>, tolerance: f64) -> Result<Array2<f64>, LinalgError> {
    let l = cholesky(a, tolerance)?;
    let l_inv = invert_lower(&l);
    // A^-1 = L^-T L^-1
    Ok(l_inv.t().dot(&l_inv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_cholesky_reconstructs() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let l = cholesky(&a, DEFAULT_PIVOT_TOLERANCE).unwrap();
        let rebuilt = l.dot(&l.t());
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
        assert_relative_eq!(l[[0, 1]], 0.0);
    }

    #[test]
    fn test_inverse_is_identity() {
        let a = array![[4.0, 2.0, 0.4], [2.0, 5.0, 1.0], [0.4, 1.0, 3.0]];
        let inv = invert_spd(&a, DEFAULT_PIVOT_TOLERANCE).unwrap();
        let product = a.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_singular_reports_pivot() {
        // third column is the sum of the first two
        let x = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0], [1.0, 1.0, 2.0], [2.0, -1.0, 1.0]];
        let xtx = x.t().dot(&x);
        let err = invert_spd(&xtx, DEFAULT_PIVOT_TOLERANCE).unwrap_err();
        assert_eq!(err, LinalgError::Singular { pivot: 2 });
    }

    #[test]
    fn test_not_square() {
        let a = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            cholesky(&a, DEFAULT_PIVOT_TOLERANCE),
            Err(LinalgError::NotSquare { rows: 2, cols: 3 })
        ));
    }
}
