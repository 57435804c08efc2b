//! Code for reading the input files.

pub mod counts;
pub mod panel;
