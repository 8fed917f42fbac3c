//! # STPGIS Parallel
//!
//! Execution modes for independent per-layer work (reprojection of
//! criterion and constraint layers). Results always come back in input
//! order, whatever the mode.

pub mod strategy;

pub use strategy::{num_cpus, ParallelStrategy, ProcessingMode};
