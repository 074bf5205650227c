//! Shared test helpers

#![allow(dead_code)]

pub mod fixtures;
pub mod mock_runner;

pub use fixtures::*;
pub use mock_runner::*;
