//! Multi-process Gaussian elimination. The orchestrator forks a pool of
//! workers sharing the matrix through one anonymous mapping, then drives
//! column-by-column row reduction with a blocking-ack barrier per pivot
//! column: tasks for column `c + 1` are never issued before every ack for
//! column `c` has arrived. Disjoint row ranges plus that barrier are the whole
//! synchronization story; there are no locks.
use crate::matrix::Matrix;
use crate::solver::EPSILON;
use crate::solver::error::{GaussError, errno_message};
use crate::solver::ipc::{self, ChannelError, Task};
use crate::solver::sequential::{back_substitute, solve_sequential, validate_augmented};
use crate::solver::shm::SharedRegion;
use crate::solver::worker::worker_loop;
use log::debug;
use std::os::unix::io::RawFd;

fn channel_err(what: &str, e: ChannelError) -> GaussError {
    GaussError::WorkerFailure(format!("{}: {}", what, e))
}

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn pipe_pair() -> Result<(RawFd, RawFd), GaussError> {
    let mut fds = [0 as libc::c_int; 2];
    // SAFETY: fds is a valid out-array of two ints.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } == -1 {
        return Err(GaussError::WorkerFailure(errno_message("pipe failed")));
    }
    Ok((fds[0], fds[1]))
}

/// What the orchestrator keeps per forked worker: its pid, the write end of
/// the task pipe and the read end of the ack pipe.
struct WorkerHandle {
    pid: libc::pid_t,
    task_fd: RawFd,
    ack_fd: RawFd,
    reaped: bool,
}

impl WorkerHandle {
    fn send(&self, task: &Task) -> Result<(), GaussError> {
        ipc::send_task(self.task_fd, task).map_err(|e| channel_err("task dispatch failed", e))
    }

    /// Blocks for one ack; a nonzero status fails the whole solve.
    fn wait_ack(&self) -> Result<(), GaussError> {
        let ack = ipc::recv_ack(self.ack_fd).map_err(|e| channel_err("ack wait failed", e))?;
        if ack.status != 0 {
            return Err(GaussError::WorkerFailure(format!(
                "worker pid {} reported status {}",
                self.pid, ack.status
            )));
        }
        Ok(())
    }

    /// Blocking `waitpid`, retried on `EINTR`. Abnormal exit fails the solve.
    fn reap(&mut self) -> Result<(), GaussError> {
        if self.reaped {
            return Ok(());
        }
        let mut status: libc::c_int = 0;
        loop {
            // SAFETY: waits on a pid this pool forked and has not reaped yet.
            let ret = unsafe { libc::waitpid(self.pid, &mut status, 0) };
            if ret == self.pid {
                break;
            }
            if ret == -1 && last_errno() == libc::EINTR {
                continue;
            }
            return Err(GaussError::WorkerFailure(errno_message("waitpid failed")));
        }
        self.reaped = true;
        if !libc::WIFEXITED(status) || libc::WEXITSTATUS(status) != 0 {
            return Err(GaussError::WorkerFailure(format!(
                "worker pid {} exited abnormally (status {})",
                self.pid, status
            )));
        }
        Ok(())
    }
}

impl Drop for WorkerHandle {
    /// Failure-path cleanup. Best effort: ask the worker to exit, close both
    /// channels (EOF on the task pipe drives it off a blocking read even if
    /// the exit message was lost), then reap the pid so no zombie outlives the
    /// solve.
    fn drop(&mut self) {
        if !self.reaped {
            let _ = ipc::send_task(self.task_fd, &Task::exit());
        }
        // SAFETY: closing fds this handle owns; Drop runs once.
        unsafe {
            libc::close(self.task_fd);
            libc::close(self.ack_fd);
        }
        if !self.reaped {
            let mut status: libc::c_int = 0;
            // SAFETY: same pid as in reap; errors here are unreportable.
            while unsafe { libc::waitpid(self.pid, &mut status, 0) } == -1 {
                if last_errno() != libc::EINTR {
                    break;
                }
            }
        }
    }
}

struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

impl WorkerPool {
    fn spawn(budget: usize, data: *mut f64, width: usize) -> Result<WorkerPool, GaussError> {
        let mut pool = WorkerPool {
            workers: Vec::with_capacity(budget),
        };
        for _ in 0..budget {
            pool.spawn_one(data, width)?;
        }
        Ok(pool)
    }

    fn spawn_one(&mut self, data: *mut f64, width: usize) -> Result<(), GaussError> {
        let (task_rx, task_tx) = pipe_pair()?;
        let (ack_rx, ack_tx) = match pipe_pair() {
            Ok(pair) => pair,
            Err(e) => {
                unsafe {
                    libc::close(task_rx);
                    libc::close(task_tx);
                }
                return Err(e);
            }
        };

        // SAFETY: the child runs only the allocation-free worker loop over raw
        // fds and the shared mapping, and leaves via _exit, so forking from a
        // threaded parent is sound.
        let pid = unsafe { libc::fork() };
        if pid == -1 {
            let err = GaussError::WorkerFailure(errno_message("fork failed"));
            unsafe {
                libc::close(task_rx);
                libc::close(task_tx);
                libc::close(ack_rx);
                libc::close(ack_tx);
            }
            return Err(err);
        }
        if pid == 0 {
            // child: keep only its ends of the two pipes
            unsafe {
                libc::close(task_tx);
                libc::close(ack_rx);
            }
            worker_loop(task_rx, ack_tx, data, width);
        }
        unsafe {
            libc::close(task_rx);
            libc::close(ack_tx);
        }
        self.workers.push(WorkerHandle {
            pid,
            task_fd: task_tx,
            ack_fd: ack_rx,
            reaped: false,
        });
        Ok(())
    }

    /// Orderly teardown: exit task to every spawned worker (used in the last
    /// round or not), one final ack each, then reap every process.
    fn shutdown(&mut self) -> Result<(), GaussError> {
        for worker in &self.workers {
            worker.send(&Task::exit())?;
        }
        for worker in &self.workers {
            worker.wait_ack()?;
        }
        for worker in &mut self.workers {
            worker.reap()?;
        }
        Ok(())
    }
}

/// Picks the pool size: the caller's cap if positive, else one worker per
/// online CPU, clamped so there is never more than one worker per row below
/// the first pivot.
fn worker_budget(max_workers: usize, n: usize) -> usize {
    let budget = if max_workers > 0 {
        max_workers
    } else {
        sys_info::cpu_num().map(|c| c as usize).unwrap_or(1)
    };
    budget.clamp(1, n - 1)
}

/// Contiguous row ranges below the pivot for one elimination round: at most
/// `budget` ranges of `ceil(remaining / active)` rows, together covering
/// `[column + 1, n)` exactly, pairwise disjoint.
fn partition_rows(column: usize, n: usize, budget: usize) -> Vec<(usize, usize)> {
    let remaining = n - column - 1;
    let active = budget.min(remaining);
    let chunk = remaining.div_ceil(active);
    let mut ranges = Vec::with_capacity(active);
    for k in 0..active {
        let start = column + 1 + k * chunk;
        if start >= n {
            break;
        }
        ranges.push((start, (start + chunk).min(n)));
    }
    ranges
}

fn run_rounds(
    region: &SharedRegion,
    pool: &WorkerPool,
    n: usize,
    width: usize,
    budget: usize,
) -> Result<(), GaussError> {
    for column in 0..n {
        let pivot = region.read(column * width + column);
        if pivot.abs() < EPSILON {
            return Err(GaussError::SingularMatrix { column });
        }
        if n - column - 1 == 0 {
            continue;
        }

        let ranges = partition_rows(column, n, budget);
        // disjointness of the writes is a checked precondition of the
        // shared-memory reasoning, not a convention
        assert!(
            ranges.windows(2).all(|pair| pair[0].1 <= pair[1].0),
            "row ranges for column {} overlap",
            column
        );
        assert!(
            ranges.first().is_some_and(|r| r.0 > column),
            "row range for column {} covers the pivot row",
            column
        );

        for (worker, &(start, end)) in pool.workers.iter().zip(&ranges) {
            worker.send(&Task::work(column, start, end))?;
        }
        // fork-join barrier: one ack per task issued this round
        for worker in pool.workers.iter().take(ranges.len()) {
            worker.wait_ack()?;
        }
    }
    Ok(())
}

/// Multi-process Gaussian elimination over a shared mapping.
///
/// `max_workers == 0` means one worker per online CPU. Systems with fewer than
/// two rows are delegated to [`solve_sequential`]; splitting them buys
/// nothing. On every exit path the mapping is unmapped, the pipes are closed
/// and every forked process is reaped.
pub fn solve_parallel(augmented: &Matrix, max_workers: usize) -> Result<Vec<f64>, GaussError> {
    validate_augmented(augmented)?;
    let n = augmented.rows;
    if n < 2 {
        return solve_sequential(augmented);
    }
    let width = augmented.cols;

    let region = SharedRegion::from_matrix(augmented)?;
    let budget = worker_budget(max_workers, n);
    debug!("spawning {} workers for a {}x{} system", budget, n, width);
    let mut pool = WorkerPool::spawn(budget, region.as_mut_ptr(), width)?;

    match run_rounds(&region, &pool, n, width, budget) {
        Ok(()) => {
            pool.shutdown()?;
            debug!("all {} workers exited, running back substitution", budget);
            back_substitute(region.as_slice(), n, width)
        }
        Err(err) => {
            // workers must still be told to exit and reaped before the error
            // propagates; anything shutdown cannot finish is covered by the
            // handles' Drop
            if let Err(teardown) = pool.shutdown() {
                debug!("worker teardown after failure: {}", teardown);
            }
            Err(err)
        }
    }
}
