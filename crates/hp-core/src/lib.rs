//! Core infrastructure shared by every huprobe crate
//!
//! This crate provides:
//! - Configuration loading and saving (TOML)
//! - The common error type
//! - Logging initialization and component log macros
//! - The debugger nesting counter used to tell probing accesses from genuine ones

pub mod config;
pub mod depth;
pub mod error;
pub mod logging;

pub use config::Config;
pub use depth::{DebugDepth, DepthGuard};
pub use error::{Error, Result};
