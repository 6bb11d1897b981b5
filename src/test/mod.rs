//! Utilities for testing
#![doc(hidden)]

pub mod adt;

pub use rand::RandGen;
