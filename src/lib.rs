//MIT License
//! Dense `Ax = b` solving by Gaussian elimination in natural pivot order,
//! in two renditions: a single-threaded reference engine and a multi-process
//! engine that spreads every elimination round over forked workers writing
//! into one shared memory mapping.
pub mod matrix;
pub mod solver;
