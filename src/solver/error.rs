use std::fmt;

/// Failure modes of the elimination engines.
#[derive(Debug, Clone, PartialEq)]
pub enum GaussError {
    /// zero rows, or not exactly one more column than rows
    InvalidShape { rows: usize, cols: usize },
    /// pivot magnitude below [`crate::solver::EPSILON`] at the given column
    SingularMatrix { column: usize },
    /// a worker process died, reported a nonzero status, or a pool syscall failed
    WorkerFailure(String),
}

impl fmt::Display for GaussError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GaussError::InvalidShape { rows, cols } => write!(
                f,
                "augmented matrix must be n x (n+1) with n >= 1, got {}x{}",
                rows, cols
            ),
            GaussError::SingularMatrix { column } => write!(
                f,
                "matrix is singular or ill-conditioned (pivot at column {})",
                column
            ),
            GaussError::WorkerFailure(msg) => write!(f, "worker failure: {}", msg),
        }
    }
}

impl std::error::Error for GaussError {}

/// `"<prefix>: <strerror of the current errno>"`, for syscall failure paths.
pub(crate) fn errno_message(prefix: &str) -> String {
    format!("{}: {}", prefix, std::io::Error::last_os_error())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_offending_shape() {
        let err = GaussError::InvalidShape { rows: 2, cols: 2 };
        assert!(err.to_string().contains("2x2"));
        let err = GaussError::SingularMatrix { column: 3 };
        assert!(err.to_string().contains("column 3"));
    }
}
