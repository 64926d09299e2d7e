//! Loader metrics.

pub mod events;
