//! Fixed-function pipeline state
//!
//! Describes the depth, culling and blending setup the renderer establishes
//! before each bucket entry or post-process pass.

/// Blending modes for the different passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// No blending, source replaces destination
    #[default]
    Opaque,
    /// Standard alpha blending
    AlphaBlend,
    /// Additive blending (glow, bloom composite)
    Additive,
    /// Source color scaled by source alpha, destination discarded
    AlphaMask,
}

/// Depth, culling and blend state for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    /// Enable depth testing
    pub depth_test: bool,
    /// Enable depth writing
    pub depth_write: bool,
    /// Cull back faces
    pub cull_backfaces: bool,
    /// Blend mode
    pub blend: BlendMode,
}

impl PipelineState {
    /// Opaque geometry: depth test and write, back faces culled
    pub fn opaque() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            cull_backfaces: true,
            blend: BlendMode::Opaque,
        }
    }

    /// Transparent geometry: depth tested but not written, alpha blended
    pub fn transparent(cull_backfaces: bool) -> Self {
        Self {
            depth_test: true,
            depth_write: false,
            cull_backfaces,
            blend: BlendMode::AlphaBlend,
        }
    }

    /// Screen-space passes: no depth, no culling
    pub fn fullscreen(blend: BlendMode) -> Self {
        Self {
            depth_test: false,
            depth_write: false,
            cull_backfaces: false,
            blend,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::opaque()
    }
}
