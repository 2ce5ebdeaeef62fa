//! Anonymous shared mapping holding the augmented matrix while worker
//! processes reduce it in place.
use crate::matrix::Matrix;
use crate::solver::error::{GaussError, errno_message};
use std::ptr;

/// `MAP_SHARED | MAP_ANONYMOUS` region sized for one augmented matrix.
///
/// The orchestrator allocates it before forking and is the sole owner: the
/// mapping is released in `Drop`, which runs on every exit path of a solve.
/// Forked workers inherit the mapping and only ever hold the raw view from
/// [`SharedRegion::as_mut_ptr`]; they never manage its lifetime.
pub struct SharedRegion {
    ptr: *mut f64,
    len: usize,
}

impl SharedRegion {
    /// Maps a region of `rows * cols` elements and copies the matrix in.
    pub fn from_matrix(matrix: &Matrix) -> Result<SharedRegion, GaussError> {
        let len = matrix.rows * matrix.cols;
        let bytes = len * size_of::<f64>();
        // SAFETY: anonymous mapping with no backing fd; bytes is nonzero for
        // any constructed Matrix.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(GaussError::WorkerFailure(errno_message("mmap failed")));
        }
        let data = raw as *mut f64;
        // SAFETY: the mapping holds len elements and nothing else references
        // it yet; mmap returns page-aligned memory, so f64 alignment holds.
        unsafe { ptr::copy_nonoverlapping(matrix.data.as_ptr(), data, len) };
        Ok(SharedRegion { ptr: data, len })
    }

    /// Raw view handed to forked workers.
    pub fn as_mut_ptr(&self) -> *mut f64 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Single element read, used by the orchestrator for pivot checks between
    /// rounds, when no worker holds a task.
    pub fn read(&self, idx: usize) -> f64 {
        assert!(idx < self.len, "shared region read out of bounds");
        // SAFETY: idx is in bounds of the live mapping, and the ack barrier
        // excludes concurrent worker writes between rounds.
        unsafe { *self.ptr.add(idx) }
    }

    /// Whole-region view for back substitution after every worker has exited.
    pub fn as_slice(&self) -> &[f64] {
        // SAFETY: ptr is a live mapping of len elements; callers only use this
        // once no worker process can write (after the final barrier).
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr and byte length are exactly what mmap returned.
        unsafe {
            libc::munmap(self.ptr as *mut libc::c_void, self.len * size_of::<f64>());
        }
    }
}
