//! # Viewer Configuration
//!
//! Serializable settings for the renderer and the viewer process that hosts
//! it. Every structure has sensible defaults, `with_*` builder setters and a
//! `validate()` check, and the top-level [`ViewerConfig`] loads from TOML or
//! RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Renderer Config**: clear color, toggles, bloom mode, initial viewport
//! - **Bloom Config**: downscale chain and fake-glow color
//! - **Viewer Config**: log level plus the renderer section

use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;
use crate::render::options::{BloomMode, RenderOptions};

pub use crate::config::{Config, ConfigError};

/// # Bloom Configuration
///
/// Sizes of the three bloom targets as fractions of the viewport, and the
/// color used by the cheap uniform glow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Per-target scale relative to the viewport, largest first
    pub target_scales: [f32; 3],
    /// Smallest width/height any bloom target is allowed to shrink to
    pub min_target_size: u32,
    /// Glow color added by [`BloomMode::FakeBloom`]
    pub fake_glow: Color,
}

impl BloomConfig {
    /// Set the per-target scales
    pub fn with_target_scales(mut self, scales: [f32; 3]) -> Self {
        self.target_scales = scales;
        self
    }

    /// Set the minimum target size
    pub fn with_min_target_size(mut self, size: u32) -> Self {
        self.min_target_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for scale in self.target_scales {
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(format!("Bloom target scale {scale} must be in (0, 1]"));
            }
        }

        if self.target_scales.windows(2).any(|w| w[1] >= w[0]) {
            return Err("Bloom target scales must be strictly decreasing".to_string());
        }

        if self.min_target_size == 0 {
            return Err("Minimum bloom target size must be at least 1".to_string());
        }

        Ok(())
    }
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            target_scales: [0.5, 0.25, 0.125],
            min_target_size: 16,
            fake_glow: Color::new(0.15, 0.15, 0.15, 1.0),
        }
    }
}

/// # Renderer Configuration
///
/// Initial state for a [`Renderer`](crate::render::Renderer). Everything
/// here can also be changed at runtime through the renderer's setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Color the scene target is cleared to each frame
    pub clear_color: Color,
    /// Post-process glow mode
    pub bloom_mode: BloomMode,
    /// Initial feature toggles
    pub render_options: RenderOptions,
    /// Bloom target chain
    pub bloom: BloomConfig,
    /// Initial viewport width in pixels
    pub viewport_width: u32,
    /// Initial viewport height in pixels
    pub viewport_height: u32,
}

impl RendererConfig {
    /// Create a renderer configuration for the given viewport
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_width,
            viewport_height,
            ..Self::default()
        }
    }

    /// Set the clear color
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the bloom mode
    pub fn with_bloom_mode(mut self, mode: BloomMode) -> Self {
        self.bloom_mode = mode;
        self
    }

    /// Set the initial render toggles
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render_options = options;
        self
    }

    /// Set the bloom target chain
    pub fn with_bloom(mut self, bloom: BloomConfig) -> Self {
        self.bloom = bloom;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(format!(
                "Viewport must be non-zero, got {}x{}",
                self.viewport_width, self.viewport_height
            ));
        }

        self.bloom.validate()?;

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            bloom_mode: BloomMode::None,
            render_options: RenderOptions::default(),
            bloom: BloomConfig::default(),
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// # Viewer Configuration
///
/// Top-level configuration loaded by the viewer binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Renderer section
    pub renderer: RendererConfig,
}

impl ViewerConfig {
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.log_level.is_empty() {
            return Err("Log level cannot be empty".to_string());
        }
        self.renderer.validate()
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Config for ViewerConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ViewerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_viewport_rejected() {
        let config = RendererConfig::new(0, 720);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bloom_scales_must_decrease() {
        let bloom = BloomConfig::default().with_target_scales([0.5, 0.5, 0.25]);
        assert!(bloom.validate().is_err());

        let bloom = BloomConfig::default().with_target_scales([1.5, 0.5, 0.25]);
        assert!(bloom.validate().is_err());

        let bloom = BloomConfig::default().with_min_target_size(0);
        assert!(bloom.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ViewerConfig = toml::from_str(
            r#"
            log_level = "debug"

            [renderer]
            bloom_mode = "FakeBloom"
            viewport_width = 640
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.renderer.bloom_mode, BloomMode::FakeBloom);
        assert_eq!(config.renderer.viewport_width, 640);
        assert_eq!(config.renderer.viewport_height, 720);
        assert_eq!(config.renderer.bloom, BloomConfig::default());
    }
}
