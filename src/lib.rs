//! Logo plots of site-level amino-acid preferences, differential selection,
//! fraction surviving, differential preferences, and mutational effects.

pub mod alphabet;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod render;
