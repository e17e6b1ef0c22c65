// src/core/mod.rs

//! The extension mechanism: command and lifecycle registries, plugin loading,
//! and command dispatch.

pub mod commands;
pub mod dispatcher;
pub mod lifecycle;
pub mod options;
pub mod plugin;
