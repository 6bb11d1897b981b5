//! Testing utilities for abstract data types.

pub mod set;
