//! Gaussian elimination engines and the process-pool machinery behind the
//! parallel one.
pub mod error;
/// fixed-size task/ack messages with full-read/full-write pipe semantics
pub mod ipc;
pub mod parallel;
pub mod sequential;
/// anonymous shared mapping holding the augmented matrix during a parallel solve
pub mod shm;
pub mod worker;

/// A pivot whose magnitude falls below this is treated as zero; no row
/// exchange is attempted to repair it.
pub const EPSILON: f64 = 1e-12;
