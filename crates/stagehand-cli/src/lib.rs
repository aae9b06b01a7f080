//! Command-line drivers for the Stagehand test suites
//!
//! - `stagehand-integration-tests` runs every Godot test scene headlessly
//! - `stagehand-unit-tests` builds and runs the native unit test binary

pub mod commands;
pub mod interrupt;
pub mod logging;
