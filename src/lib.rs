//! War story library
//!
//! Dataset queries, the shared filter broadcast, chart view models and the
//! scroll-driven narrative used by the `war_story` binary.

pub mod config;
pub mod data;
pub mod export;
pub mod filters;
pub mod logging;
pub mod narrative;
pub mod scales;
pub mod tui;
pub mod views;
