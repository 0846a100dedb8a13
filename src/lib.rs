//! Headless driver for the fauna population engine.

pub mod headless;

pub use headless::{HeadlessRunner, RunSummary};
