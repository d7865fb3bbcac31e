// src/testing/mod.rs
//! Unit-test harness: splice a test into each client's code and run it.

pub mod outcome;
pub mod runner;
pub mod synth;
pub mod unit;

pub use self::outcome::{TestOutcome, TestReport};
pub use self::runner::{run, RunOptions};
pub use self::unit::UnitTest;
