//! Configuration module for Encore
//!
//! This module provides configuration management including:
//! - Data, backup and log path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::EncorePaths;
pub use settings::{LogFormat, Settings};
