//! Single-threaded Gaussian elimination. Reference implementation and the
//! correctness oracle for the multi-process engine.
use crate::matrix::Matrix;
use crate::solver::EPSILON;
use crate::solver::error::GaussError;

pub(crate) fn validate_augmented(m: &Matrix) -> Result<(), GaussError> {
    if m.rows == 0 || m.cols != m.rows + 1 {
        return Err(GaussError::InvalidShape {
            rows: m.rows,
            cols: m.cols,
        });
    }
    Ok(())
}

/// Forward elimination in natural pivot order followed by back substitution,
/// on a private copy of the input. Deterministic for identical input.
pub fn solve_sequential(augmented: &Matrix) -> Result<Vec<f64>, GaussError> {
    validate_augmented(augmented)?;
    let n = augmented.rows;
    let width = augmented.cols;
    let mut data = augmented.data.clone();

    for col in 0..n {
        let pivot = data[col * width + col];
        if pivot.abs() < EPSILON {
            return Err(GaussError::SingularMatrix { column: col });
        }
        for row in col + 1..n {
            let factor = data[row * width + col] / pivot;
            for k in col..width {
                data[row * width + k] -= factor * data[col * width + k];
            }
        }
    }

    back_substitute(&data, n, width)
}

/// Recovers `x` from an upper-triangular augmented buffer. Shared with the
/// parallel engine, which runs it against the shared mapping after the last
/// elimination round.
pub(crate) fn back_substitute(
    data: &[f64],
    n: usize,
    width: usize,
) -> Result<Vec<f64>, GaussError> {
    let mut solution = vec![0.0; n];
    for i in (0..n).rev() {
        let mut rhs = data[i * width + (width - 1)];
        for j in i + 1..n {
            rhs -= data[i * width + j] * solution[j];
        }
        let pivot = data[i * width + i];
        if pivot.abs() < EPSILON {
            return Err(GaussError::SingularMatrix { column: i });
        }
        solution[i] = rhs / pivot;
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_three_by_four_known_system() {
        let m = Matrix::new(
            3,
            4,
            vec![
                2.0, 1.0, -1.0, 8.0, //
                -3.0, -1.0, 2.0, -11.0, //
                -2.0, 1.0, 2.0, -3.0,
            ],
        );
        let x = solve_sequential(&m).unwrap();
        let expected = [2.0, 3.0, -1.0];
        for (xi, ei) in x.iter().zip(&expected) {
            assert_abs_diff_eq!(*xi, *ei, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_single_equation() {
        let m = Matrix::new(1, 2, vec![5.0, 10.0]);
        let x = solve_sequential(&m).unwrap();
        assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_augmented_shape() {
        let m = Matrix::zeros(2, 2);
        assert_eq!(
            solve_sequential(&m),
            Err(GaussError::InvalidShape { rows: 2, cols: 2 })
        );
        let m = Matrix::zeros(3, 5);
        assert!(matches!(
            solve_sequential(&m),
            Err(GaussError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_zero_rows_is_invalid_shape() {
        let m = Matrix::new(0, 1, Vec::new());
        assert_eq!(
            solve_sequential(&m),
            Err(GaussError::InvalidShape { rows: 0, cols: 1 })
        );
    }

    #[test]
    fn test_zero_pivot_is_singular() {
        // first pivot is exactly zero, no pivoting repairs it
        let m = Matrix::new(2, 3, vec![0.0, 1.0, 2.0, 1.0, 1.0, 3.0]);
        assert_eq!(
            solve_sequential(&m),
            Err(GaussError::SingularMatrix { column: 0 })
        );
    }

    #[test]
    fn test_dependent_rows_are_singular() {
        // second row is twice the first; pivot vanishes at column 1
        let m = Matrix::new(2, 3, vec![1.0, 2.0, 3.0, 2.0, 4.0, 6.0]);
        assert_eq!(
            solve_sequential(&m),
            Err(GaussError::SingularMatrix { column: 1 })
        );
    }

    #[test]
    fn test_diagonally_dominant_residual_is_small() {
        let m = Matrix::random_diagonally_dominant(20);
        let x = solve_sequential(&m).unwrap();
        for i in 0..m.rows {
            let lhs: f64 = (0..m.rows).map(|j| m.get(i, j) * x[j]).sum();
            assert_abs_diff_eq!(lhs, m.get(i, m.rows), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_back_substitute_rechecks_diagonal() {
        // upper triangular with a zero on the diagonal
        let data = vec![1.0, 2.0, 3.0, 0.0, 0.0, 4.0];
        assert_eq!(
            back_substitute(&data, 2, 3),
            Err(GaussError::SingularMatrix { column: 1 })
        );
    }
}
