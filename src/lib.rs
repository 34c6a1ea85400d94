//! A small distributed MapReduce execution system.
//!
//! See [`mr`] for the coordinator/worker implementation.

pub mod mr;
