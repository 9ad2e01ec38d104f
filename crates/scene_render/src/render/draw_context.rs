//! Explicit per-draw state
//!
//! Renderables never touch global lighting or material state. They receive a
//! [`DrawContext`] that wraps the backend for the duration of one bucket
//! draw, set what they need on it (model matrix, lighting, tint) and submit
//! geometry through it. Every submitted [`DrawCall`] carries a snapshot of
//! the state it was drawn with, so a node that disables lighting cannot
//! inherit lights left behind by the previous node.

use crate::foundation::math::{Color, Mat4};
use crate::render::backend::{DrawCall, DrawState, Geometry, GraphicsBackend, QuadDraw};
use crate::render::lighting::LightingEnvironment;
use crate::render::options::RenderOptions;
use crate::render::pipeline::PipelineState;

/// Scoped draw state handed to renderables
pub struct DrawContext<'a> {
    backend: &'a mut dyn GraphicsBackend,
    lighting: &'a LightingEnvironment,
    state: DrawState,
    draw_count: u32,
}

impl<'a> DrawContext<'a> {
    /// Wrap a backend with the lighting environment lit nodes will use
    pub fn new(backend: &'a mut dyn GraphicsBackend, lighting: &'a LightingEnvironment) -> Self {
        Self {
            backend,
            lighting,
            state: DrawState::default(),
            draw_count: 0,
        }
    }

    /// Upload the environment's ambient color and dynamic lights
    pub fn use_default_lighting(&mut self) {
        let lighting = self.lighting;
        let lights = lighting.active_lights();
        self.backend.set_lights(lighting.ambient, lights);
        self.state.ambient = lighting.ambient;
        self.state.light_count = lights.len();
    }

    /// Zero every light and the ambient term
    pub fn disable_lighting(&mut self) {
        self.backend.set_lights(Color::BLACK, &[]);
        self.state.ambient = Color::BLACK;
        self.state.light_count = 0;
    }

    /// Set the model-to-world matrix for following draws
    pub fn set_model_matrix(&mut self, matrix: Mat4) {
        self.state.model_matrix = matrix;
    }

    /// Set the tint color for following draws
    pub fn set_tint(&mut self, tint: Color) {
        self.state.tint = tint;
    }

    /// Set the lightmap multiplier for following draws
    pub fn set_lightmap_multiplier(&mut self, multiplier: f32) {
        self.state.lightmap_multiplier = multiplier;
    }

    /// Establish fixed-function state
    pub fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.backend.set_pipeline_state(state);
    }

    /// Upload camera matrices
    pub fn set_camera(&mut self, view: &Mat4, projection: &Mat4) {
        self.backend.set_camera(view, projection);
    }

    /// Current state
    pub fn state(&self) -> &DrawState {
        &self.state
    }

    /// Submit shaded geometry with the current state
    pub fn draw(&mut self, geometry: Geometry, options: RenderOptions) {
        self.submit(DrawCall {
            geometry,
            state: self.state,
            options,
            wireframe: None,
        });
    }

    /// Submit geometry as a flat-colored wireframe
    pub fn draw_wireframe(&mut self, geometry: Geometry, color: Color) {
        self.submit(DrawCall {
            geometry,
            state: self.state,
            options: RenderOptions::empty(),
            wireframe: Some(color),
        });
    }

    /// Submit a screen-space quad
    pub fn draw_quad(&mut self, quad: &QuadDraw) {
        self.backend.draw_quad(quad);
        self.draw_count += 1;
    }

    fn submit(&mut self, call: DrawCall) {
        self.backend.draw(&call);
        self.draw_count += 1;
    }

    /// Draw calls issued through this context
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{GpuCommand, RecordingBackend};

    #[test]
    fn test_disable_lighting_zeroes_state() {
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        let lighting = LightingEnvironment::default_editor();
        let mut ctx = DrawContext::new(&mut backend, &lighting);

        ctx.use_default_lighting();
        ctx.draw(Geometry::Billboard, RenderOptions::default());
        ctx.disable_lighting();
        ctx.draw(Geometry::Billboard, RenderOptions::default());
        assert_eq!(ctx.draw_count(), 2);

        let calls = log.draw_calls();
        assert_eq!(calls[0].state.light_count, 2);
        assert_eq!(calls[1].state.light_count, 0);
        assert_eq!(calls[1].state.ambient, Color::BLACK);
        assert!(log
            .commands()
            .contains(&GpuCommand::Lights { ambient: Color::BLACK, count: 0 }));
    }
}
