//! Body of a forked worker process: a two-state loop (ready, terminated)
//! serving row-range elimination tasks against the shared mapping.
use crate::solver::ipc::{self, Ack, Command};
use std::os::unix::io::RawFd;

/// Serves tasks until told to exit. Runs only in the forked child and leaves
/// through `_exit`, so no parent-side destructors or test-harness state run
/// twice.
///
/// The loop allocates nothing: the parent may be multithreaded (the test
/// harness is), and after `fork` only the calling thread exists in the child,
/// so touching the allocator could deadlock on a lock another parent thread
/// held at fork time.
///
/// Pivot magnitude is not validated here; the orchestrator checks it once per
/// column before issuing any task for that column.
pub fn worker_loop(task_fd: RawFd, ack_fd: RawFd, data: *mut f64, width: usize) -> ! {
    loop {
        let task = match ipc::recv_task(task_fd) {
            Ok(task) => task,
            // closed or garbled task channel: no way to report, die loudly and
            // let the orchestrator see the abnormal exit
            Err(_) => unsafe { libc::_exit(1) },
        };

        if task.command == Command::Exit {
            let _ = ipc::send_ack(ack_fd, Ack { status: 0 });
            unsafe { libc::_exit(0) };
        }

        if task.start_row < task.end_row {
            eliminate_rows(data, width, task.column, task.start_row, task.end_row);
        }

        if ipc::send_ack(ack_fd, Ack { status: 0 }).is_err() {
            unsafe { libc::_exit(1) };
        }
    }
}

/// Subtracts `factor * pivot_row` from every row in `[start_row, end_row)`
/// over columns `[column, width)`, in place on the shared mapping.
///
/// Soundness rests on the orchestrator's protocol: assigned row ranges within
/// a round are disjoint, the pivot row lies outside every assigned range, and
/// the ack barrier keeps rounds from overlapping. At any instant at most one
/// process writes a given row.
fn eliminate_rows(data: *mut f64, width: usize, column: usize, start_row: usize, end_row: usize) {
    // SAFETY: data maps at least end_row * width elements (orchestrator sized
    // the region from the validated matrix and clamps end_row to n); see the
    // aliasing argument above.
    unsafe {
        let pivot = *data.add(column * width + column);
        let pivot_row = data.add(column * width);
        for row in start_row..end_row {
            let row_ptr = data.add(row * width);
            let factor = *row_ptr.add(column) / pivot;
            for k in column..width {
                *row_ptr.add(k) -= factor * *pivot_row.add(k);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use crate::solver::shm::SharedRegion;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_eliminate_rows_matches_hand_reduction() {
        let m = Matrix::new(
            3,
            4,
            vec![
                2.0, 1.0, -1.0, 8.0, //
                -3.0, -1.0, 2.0, -11.0, //
                -2.0, 1.0, 2.0, -3.0,
            ],
        );
        let region = SharedRegion::from_matrix(&m).unwrap();
        eliminate_rows(region.as_mut_ptr(), 4, 0, 1, 3);

        // row1 += 1.5 * row0, row2 += row0
        let data = region.as_slice();
        assert_abs_diff_eq!(data[4], 0.0);
        assert_abs_diff_eq!(data[5], 0.5);
        assert_abs_diff_eq!(data[6], 0.5);
        assert_abs_diff_eq!(data[7], 1.0);
        assert_abs_diff_eq!(data[8], 0.0);
        assert_abs_diff_eq!(data[9], 2.0);
        assert_abs_diff_eq!(data[10], 1.0);
        assert_abs_diff_eq!(data[11], 5.0);
    }

    #[test]
    fn test_eliminate_partial_range_leaves_other_rows() {
        let m = Matrix::new(
            3,
            4,
            vec![
                1.0, 0.0, 0.0, 1.0, //
                2.0, 1.0, 0.0, 2.0, //
                3.0, 0.0, 1.0, 3.0,
            ],
        );
        let region = SharedRegion::from_matrix(&m).unwrap();
        eliminate_rows(region.as_mut_ptr(), 4, 0, 1, 2);
        let data = region.as_slice();
        // row 1 reduced, row 2 untouched
        assert_abs_diff_eq!(data[4], 0.0);
        assert_abs_diff_eq!(data[7], 0.0);
        assert_abs_diff_eq!(data[8], 3.0);
        assert_abs_diff_eq!(data[11], 3.0);
    }
}
