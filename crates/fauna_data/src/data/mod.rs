//! Core data structures for the fauna simulation.

pub mod agent;
pub mod event;
pub mod food;
