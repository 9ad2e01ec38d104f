//! # Core Module
//!
//! Shared configuration types used by the renderer and the viewer binary.

pub mod config;

pub use config::{BloomConfig, Config, ConfigError, RendererConfig, ViewerConfig};
