//! Backend abstraction for the rendering system
//!
//! This module defines the trait a graphics API layer must implement for the
//! [`Renderer`](crate::render::Renderer) to drive it. The renderer only ever
//! talks to the GPU through this seam: framebuffer management, fixed-function
//! state, camera/light uploads and draw submission.

use crate::foundation::math::{Color, Mat4, Vec2};
use crate::model::ModelId;
use crate::render::lighting::Light;
use crate::render::options::RenderOptions;
use crate::render::pipeline::PipelineState;
use crate::render::RenderResult;

/// Handle to an offscreen framebuffer owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Handle to a texture owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Where draws land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    /// The window/system framebuffer
    Default,
    /// An offscreen framebuffer
    Offscreen(FramebufferId),
}

/// Texture bound for a screen-space quad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    /// Color attachment of a framebuffer
    Framebuffer(FramebufferId),
    /// A standalone texture
    Texture(TextureId),
}

/// What a [`DrawCall`] draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    /// One surface of a model
    Surface {
        /// Owning model
        model: ModelId,
        /// Surface index within the model
        surface: usize,
        /// Material index within the material set
        material: usize,
        /// Material set in use
        material_set: usize,
    },
    /// Every surface of a model (wireframes)
    Model {
        /// Model to draw
        model: ModelId,
    },
    /// Camera-facing quad (light icons)
    Billboard,
    /// Light radius sphere outline
    LightRadius,
    /// Editor ground grid
    Grid,
}

/// Per-draw state snapshot, replacing process-wide lighting globals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawState {
    /// Model-to-world matrix
    pub model_matrix: Mat4,
    /// Ambient color applied to the vertex color
    pub ambient: Color,
    /// Number of dynamic lights enabled for this draw
    pub light_count: usize,
    /// Tint multiplied into the final color
    pub tint: Color,
    /// Lightmap intensity multiplier
    pub lightmap_multiplier: f32,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            model_matrix: Mat4::identity(),
            ambient: Color::BLACK,
            light_count: 0,
            tint: Color::WHITE,
            lightmap_multiplier: 1.0,
        }
    }
}

/// A single geometry draw submitted to the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    /// What to draw
    pub geometry: Geometry,
    /// State it is drawn with
    pub state: DrawState,
    /// Render toggles in effect
    pub options: RenderOptions,
    /// Flat wireframe color, `None` for shaded geometry
    pub wireframe: Option<Color>,
}

/// A screen-space quad covering the bound render target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadDraw {
    /// Texture sampled by the quad, or `None` for a flat color
    pub source: Option<TextureSource>,
    /// Color multiplied into the sample
    pub tint: Color,
    /// Offset in normalized device coordinates
    pub offset: Vec2,
}

impl QuadDraw {
    /// Quad sampling `source` with no tint or offset
    pub fn textured(source: TextureSource) -> Self {
        Self {
            source: Some(source),
            tint: Color::WHITE,
            offset: Vec2::zeros(),
        }
    }
}

/// Main rendering backend trait
///
/// Implementations execute each call synchronously in submission order.
pub trait GraphicsBackend {
    /// Allocate an offscreen framebuffer with color and depth attachments
    fn create_framebuffer(&mut self, width: u32, height: u32) -> RenderResult<FramebufferId>;

    /// Resize an existing framebuffer's attachments
    fn resize_framebuffer(&mut self, id: FramebufferId, width: u32, height: u32) -> RenderResult<()>;

    /// Select the framebuffer subsequent draws land in
    fn bind_render_target(&mut self, target: RenderTarget);

    /// Set the viewport size in pixels
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clear color (if given) and/or depth of the bound target
    fn clear(&mut self, color: Option<Color>, depth: bool);

    /// Establish depth, culling and blend state
    fn set_pipeline_state(&mut self, state: &PipelineState);

    /// Upload view and projection matrices
    fn set_camera(&mut self, view: &Mat4, projection: &Mat4);

    /// Upload ambient color and dynamic lights
    fn set_lights(&mut self, ambient: Color, lights: &[Light]);

    /// Submit a geometry draw
    fn draw(&mut self, call: &DrawCall);

    /// Submit a screen-space quad
    fn draw_quad(&mut self, quad: &QuadDraw);
}
