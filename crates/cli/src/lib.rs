//! h2ll CLI library surface.
//!
//! Command implementations live here (rather than in `main.rs`) so they can
//! be exercised directly from tests.

pub mod commands;
