//! Per-view state shared by collection, drawing and picking

use crate::render::camera::Camera;
use crate::render::options::RenderOptions;
use crate::scene::bounds::Frustum;

/// What the current view can see and how it wants things drawn
#[derive(Debug, Clone, PartialEq)]
pub struct ViewInfo {
    /// World-space view frustum used for culling
    pub frustum: Frustum,
    /// Game simulation mode hides editor-only nodes and hover feedback
    pub game_mode: bool,
    /// Render toggles in effect for this view
    pub render_options: RenderOptions,
}

impl ViewInfo {
    /// View for `camera` with the given toggles, in editor mode
    pub fn from_camera(camera: &Camera, render_options: RenderOptions) -> Self {
        Self {
            frustum: camera.frustum(),
            game_mode: false,
            render_options,
        }
    }

    /// Switch game simulation mode on or off
    pub fn with_game_mode(mut self, game_mode: bool) -> Self {
        self.game_mode = game_mode;
        self
    }
}

impl Default for ViewInfo {
    fn default() -> Self {
        Self {
            frustum: Frustum::everything(),
            game_mode: false,
            render_options: RenderOptions::default(),
        }
    }
}
