//! pri: a plugin-driven scaffolder and build orchestrator for single-page
//! web applications.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod plugins;
pub mod project;
pub mod state;
pub mod system;
