//! CLI command implementations.

pub mod config;
pub mod elements;
pub mod render;
