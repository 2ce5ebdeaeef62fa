//! Row-major dense matrix value object shared by both elimination engines,
//! with constructors for the test/demo matrices and a plain-text wire format.
use nalgebra::DMatrix;
use rand::Rng;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Dense row-major matrix of `f64`.
///
/// For elimination input the matrix is augmented: `cols == rows + 1`, the last
/// column holding the right-hand side `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    /// Degenerate shapes (zero rows or columns) are representable; the
    /// elimination engines reject them with `InvalidShape` rather than this
    /// constructor panicking.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Matrix {
        assert_eq!(
            data.len(),
            rows * cols,
            "data length must equal rows * cols"
        );
        Matrix { rows, cols, data }
    }

    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix::new(rows, cols, vec![0.0; rows * cols])
    }

    /// Matrix filled with uniform samples from `[-100, 100]`.
    pub fn random(rows: usize, cols: usize) -> Matrix {
        assert!(rows > 0 && cols > 0, "matrix dimensions must be positive");
        let mut rng = rand::rng();
        let data = (0..rows * cols)
            .map(|_| rng.random_range(-100.0..100.0))
            .collect();
        Matrix::new(rows, cols, data)
    }

    /// Random augmented `n x (n + 1)` system whose coefficient part is strictly
    /// diagonally dominant, so elimination without pivoting never meets a small
    /// pivot.
    pub fn random_diagonally_dominant(n: usize) -> Matrix {
        assert!(n > 0, "system order must be positive");
        let mut rng = rand::rng();
        let cols = n + 1;
        let mut m = Matrix::zeros(n, cols);
        for i in 0..n {
            let mut off_diag_sum = 0.0;
            for j in 0..n {
                if i == j {
                    continue;
                }
                let value: f64 = rng.random_range(-10.0..10.0);
                off_diag_sum += value.abs();
                m[(i, j)] = value;
            }
            let sign = if rng.random_range(0.0..1.0) < 0.5 {
                -1.0
            } else {
                1.0
            };
            m[(i, i)] = sign * (off_diag_sum + rng.random_range(1.0..10.0));
            m[(i, n)] = rng.random_range(-100.0..100.0);
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// `true` when the shape is a valid elimination input.
    pub fn is_augmented(&self) -> bool {
        self.rows >= 1 && self.cols == self.rows + 1
    }

    /// Text form `"rows cols v0 v1 ... vk"` understood by [`Matrix::from_text`].
    pub fn to_text(&self) -> String {
        let mut out = format!("{} {}", self.rows, self.cols);
        for value in &self.data {
            out.push(' ');
            out.push_str(&value.to_string());
        }
        out.push('\n');
        out
    }

    pub fn from_text(payload: &str) -> Result<Matrix, String> {
        let mut tokens = payload.split_whitespace();
        let rows: usize = tokens
            .next()
            .ok_or("missing matrix header")?
            .parse()
            .map_err(|e| format!("bad row count: {}", e))?;
        let cols: usize = tokens
            .next()
            .ok_or("missing matrix header")?
            .parse()
            .map_err(|e| format!("bad column count: {}", e))?;
        if rows == 0 || cols == 0 {
            return Err("matrix dimensions must be positive".to_string());
        }
        let mut data = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            let token = tokens.next().ok_or("unexpected end of matrix data")?;
            let value: f64 = token
                .parse()
                .map_err(|e| format!("bad matrix element '{}': {}", token, e))?;
            data.push(value);
        }
        Ok(Matrix::new(rows, cols, data))
    }

    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.rows, self.cols, &self.data)
    }

    pub fn from_dmatrix(m: &DMatrix<f64>) -> Matrix {
        let (rows, cols) = m.shape();
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(m[(i, j)]);
            }
        }
        Matrix::new(rows, cols, data)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    /// Renders the matrix row per line; for augmented shapes a `:` separates
    /// the coefficients from the right-hand side.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Matrix {}x{}", self.rows, self.cols)?;
        for r in 0..self.rows {
            write!(f, "|")?;
            for c in 0..self.cols {
                if self.is_augmented() && c + 1 == self.cols {
                    write!(f, " :")?;
                }
                write!(f, "{:10.4}", self.get(r, c))?;
            }
            writeln!(f, " |")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_indexing_round_trip() {
        let mut m = Matrix::zeros(2, 3);
        m.set(1, 2, 7.5);
        m[(0, 0)] = -1.0;
        assert_eq!(m.get(1, 2), 7.5);
        assert_eq!(m[(0, 0)], -1.0);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    #[should_panic(expected = "data length must equal rows * cols")]
    fn test_new_rejects_wrong_data_length() {
        Matrix::new(2, 2, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_augmented_shape_check() {
        assert!(Matrix::zeros(3, 4).is_augmented());
        assert!(!Matrix::zeros(2, 2).is_augmented());
        assert!(!Matrix::zeros(3, 3).is_augmented());
    }

    #[test]
    fn test_zero_row_matrix_is_constructible() {
        // the engines reject this shape with InvalidShape; construction
        // itself must not panic
        let m = Matrix::new(0, 1, Vec::new());
        assert!(!m.is_augmented());
    }

    #[test]
    fn test_random_shape_and_range() {
        let m = Matrix::random(4, 6);
        assert_eq!(m.rows, 4);
        assert_eq!(m.cols, 6);
        assert_eq!(m.data.len(), 24);
        assert!(m.data.iter().all(|v| (-100.0..100.0).contains(v)));
    }

    #[test]
    #[should_panic(expected = "dimensions must be positive")]
    fn test_random_rejects_zero_dimensions() {
        Matrix::random(0, 3);
    }

    #[test]
    fn test_text_round_trip() {
        let m = Matrix::new(2, 3, vec![1.0, -2.5, 3.0, 0.0, 4.25, -6.0]);
        let restored = Matrix::from_text(&m.to_text()).unwrap();
        assert_eq!(restored.rows, 2);
        assert_eq!(restored.cols, 3);
        for (a, b) in m.data.iter().zip(&restored.data) {
            assert_relative_eq!(*a, *b);
        }
    }

    #[test]
    fn test_from_text_rejects_garbage() {
        assert!(Matrix::from_text("").is_err());
        assert!(Matrix::from_text("0 3 1 2 3").is_err());
        assert!(Matrix::from_text("2 2 1.0 2.0 3.0").is_err());
        assert!(Matrix::from_text("2 2 1.0 2.0 x 4.0").is_err());
    }

    #[test]
    fn test_dmatrix_round_trip() {
        let m = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let dm = m.to_dmatrix();
        assert_eq!(dm[(1, 0)], 3.0);
        assert_eq!(Matrix::from_dmatrix(&dm), m);
    }

    #[test]
    fn test_diagonal_dominance() {
        let m = Matrix::random_diagonally_dominant(12);
        assert_eq!(m.rows, 12);
        assert_eq!(m.cols, 13);
        for i in 0..m.rows {
            let off_diag: f64 = (0..m.rows)
                .filter(|&j| j != i)
                .map(|j| m.get(i, j).abs())
                .sum();
            assert!(m.get(i, i).abs() > off_diag);
        }
    }
}
