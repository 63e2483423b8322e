//! Shared types and utilities for the ScriptBox post-processor.
//!
//! This crate provides functionality used across all ScriptBox crates:
//! - The `<hash>--[[<catalogID>]]<.ext>` naming token and its parse chain
//! - Path helpers for base names, hidden entries and category segments
//! - Shared constants and error types

pub mod constants;
pub mod error;
pub mod naming;
pub mod path_utils;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{NamingError, PathError};
pub use naming::{parse_naming, NamingInput, NamingStrategy, NamingToken, ParsedName};
pub use path_utils::{base_name, capitalize_first, is_hidden, split_extension};
