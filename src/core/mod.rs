// src/core/mod.rs

pub mod arg_parser;
pub mod cache;
pub mod config_loader;
pub mod config_resolver;
pub mod format;
pub mod memo;
pub mod paths;
