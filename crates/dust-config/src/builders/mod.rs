//! Builders for assembling configurations in tests.

pub mod config;
