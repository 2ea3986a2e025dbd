//! Pipeline driver for the shellfish splashback-shell toolchain.
//!
//! An invocation names a mode, resolves a global and a mode configuration,
//! checks the memoization directory against the global configuration,
//! activates the data backends and finally runs the mode on its stdin catalog.

pub mod backend;
pub mod cli;
pub mod constants;
pub mod core;
pub mod dev_utils;
pub mod models;
pub mod modes;
pub mod state;
