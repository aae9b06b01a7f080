//! Command implementations

pub mod integration;
pub mod unit;
