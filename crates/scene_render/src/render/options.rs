//! Global render toggles, bloom modes and bucket command tags

use serde::{Deserialize, Serialize};

use crate::render::pipeline::{BlendMode, PipelineState};

bitflags::bitflags! {
    /// Feature toggles consulted during collection and drawing
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RenderOptions: u32 {
        /// Static world geometry
        const DRAW_WORLD = 1 << 0;
        /// World collision overlay
        const DRAW_WORLD_COLLISION = 1 << 1;
        /// Scripted objects
        const DRAW_OBJECTS = 1 << 2;
        /// Object collision overlay
        const DRAW_OBJECT_COLLISION = 1 << 3;
        /// Light nodes
        const DRAW_LIGHTS = 1 << 4;
        /// Skybox
        const DRAW_SKY = 1 << 5;
        /// Cull back faces (also makes picking ignore back faces)
        const ENABLE_BACKFACE_CULL = 1 << 6;
        /// Animate texture coordinates
        const ENABLE_UV_SCROLL = 1 << 7;
        /// Editor ground grid
        const DRAW_GRID = 1 << 8;
        /// Visibility occluder meshes
        const DRAW_OCCLUDERS = 1 << 9;
        /// Draw every material as opaque
        const ALPHA_DISABLED = 1 << 10;
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::DRAW_WORLD
            | Self::DRAW_OBJECTS
            | Self::DRAW_LIGHTS
            | Self::DRAW_SKY
            | Self::ENABLE_BACKFACE_CULL
            | Self::ENABLE_UV_SCROLL
    }
}

/// Post-process glow mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BloomMode {
    /// No bloom pass
    #[default]
    None,
    /// Extract, blur and composite from scene luminance
    Bloom,
    /// Composite precomputed bloom maps
    BloomMaps,
    /// Single uniform glow quad
    FakeBloom,
}

/// What a bucket entry asks its renderable to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderCommand {
    /// Regular geometry
    DrawMesh,
    /// Wireframe selection overlay
    DrawSelection,
    /// Editor decorations such as light radii
    DrawExtras,
}

impl RenderCommand {
    /// GPU state for this command, derived from the owning bucket's base state.
    ///
    /// Overlays are tested against depth but never write it, never cull, and
    /// blend over whatever was drawn before them.
    pub fn pipeline_state(self, base: PipelineState) -> PipelineState {
        match self {
            Self::DrawMesh => base,
            Self::DrawSelection | Self::DrawExtras => PipelineState {
                depth_test: true,
                depth_write: false,
                cull_backfaces: false,
                blend: BlendMode::AlphaBlend,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert!(options.contains(RenderOptions::DRAW_WORLD | RenderOptions::ENABLE_BACKFACE_CULL));
        assert!(!options.contains(RenderOptions::DRAW_GRID));
        assert!(!options.contains(RenderOptions::ALPHA_DISABLED));
    }

    #[test]
    fn test_mesh_command_keeps_bucket_state() {
        let base = PipelineState::opaque();
        assert_eq!(RenderCommand::DrawMesh.pipeline_state(base), base);
        let overlay = RenderCommand::DrawSelection.pipeline_state(base);
        assert!(!overlay.depth_write);
        assert!(overlay.depth_test);
    }

    #[test]
    fn test_options_round_trip_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            options: RenderOptions,
        }
        let text = toml::to_string(&Holder { options: RenderOptions::DRAW_SKY | RenderOptions::DRAW_GRID })
            .unwrap();
        let back: Holder = toml::from_str(&text).unwrap();
        assert_eq!(back.options, RenderOptions::DRAW_SKY | RenderOptions::DRAW_GRID);
    }
}
