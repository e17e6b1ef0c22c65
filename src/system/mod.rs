//! # System Interaction Layer
//!
//! The boundary between the host and the operating system.
//!
//! - **`executor`**: spawns external tools (bundler, test runner) with inherited
//!   stdio, platform fallbacks (`cmd /C` on Windows) and Ctrl+C handling.

pub mod executor;
