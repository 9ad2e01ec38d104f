//! Headless command recorder
//!
//! [`RecordingBackend`] implements [`GraphicsBackend`] by appending every call
//! to a shared log instead of talking to a GPU. It backs the test suite and
//! the headless demo, and is handy for diffing the command stream of two
//! frames when chasing ordering bugs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::math::{Color, Mat4};
use crate::render::backend::{
    DrawCall, FramebufferId, GraphicsBackend, QuadDraw, RenderTarget,
};
use crate::render::lighting::Light;
use crate::render::pipeline::PipelineState;
use crate::render::{RenderError, RenderResult};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    /// Framebuffer allocated
    CreateFramebuffer {
        /// New handle
        id: FramebufferId,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Framebuffer resized
    ResizeFramebuffer {
        /// Handle
        id: FramebufferId,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Render target bound
    BindTarget(RenderTarget),
    /// Viewport set
    Viewport(u32, u32),
    /// Target cleared
    Clear {
        /// Clear color, if the color buffer was cleared
        color: Option<Color>,
        /// Whether depth was cleared
        depth: bool,
    },
    /// Pipeline state established
    PipelineState(PipelineState),
    /// Camera matrices uploaded
    Camera {
        /// View matrix
        view: Mat4,
        /// Projection matrix
        projection: Mat4,
    },
    /// Light block uploaded
    Lights {
        /// Ambient color
        ambient: Color,
        /// Number of lights
        count: usize,
    },
    /// Geometry drawn
    Draw(DrawCall),
    /// Screen-space quad drawn
    Quad(QuadDraw),
}

#[derive(Debug, Default)]
struct RecordingState {
    commands: Vec<GpuCommand>,
    framebuffers: Vec<(u32, u32)>,
    fail_framebuffer_creation: bool,
    resizes_left: Option<usize>,
}

/// Shared read handle onto a [`RecordingBackend`]'s log
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    state: Rc<RefCell<RecordingState>>,
}

impl CommandLog {
    /// Snapshot of every recorded command
    pub fn commands(&self) -> Vec<GpuCommand> {
        self.state.borrow().commands.clone()
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.state.borrow().commands.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Geometry draws in submission order
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    /// Screen-space quads in submission order
    pub fn quads(&self) -> Vec<QuadDraw> {
        self.state
            .borrow()
            .commands
            .iter()
            .filter_map(|c| match c {
                GpuCommand::Quad(quad) => Some(*quad),
                _ => None,
            })
            .collect()
    }

    /// Current size of a framebuffer
    pub fn framebuffer_size(&self, id: FramebufferId) -> Option<(u32, u32)> {
        self.state.borrow().framebuffers.get(id.0 as usize).copied()
    }

    /// Forget recorded commands (framebuffers are kept)
    pub fn clear(&self) {
        self.state.borrow_mut().commands.clear();
    }
}

/// Backend that records calls instead of executing them
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: CommandLog,
}

impl RecordingBackend {
    /// Create a recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder whose framebuffer allocations fail
    pub fn failing() -> Self {
        let backend = Self::default();
        backend.log.state.borrow_mut().fail_framebuffer_creation = true;
        backend
    }

    /// Create a recorder that accepts `count` framebuffer resizes and fails the rest
    pub fn failing_resizes_after(count: usize) -> Self {
        let backend = Self::default();
        backend.log.state.borrow_mut().resizes_left = Some(count);
        backend
    }

    /// Handle for reading the log after the backend is moved into a renderer
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn push(&self, command: GpuCommand) {
        self.log.state.borrow_mut().commands.push(command);
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_framebuffer(&mut self, width: u32, height: u32) -> RenderResult<FramebufferId> {
        let id = {
            let mut state = self.log.state.borrow_mut();
            if state.fail_framebuffer_creation {
                return Err(RenderError::ResourceCreationFailed(format!(
                    "framebuffer {width}x{height}"
                )));
            }
            state.framebuffers.push((width, height));
            FramebufferId(u32::try_from(state.framebuffers.len() - 1).map_err(|e| {
                RenderError::ResourceCreationFailed(e.to_string())
            })?)
        };
        self.push(GpuCommand::CreateFramebuffer { id, width, height });
        Ok(id)
    }

    fn resize_framebuffer(&mut self, id: FramebufferId, width: u32, height: u32) -> RenderResult<()> {
        {
            let mut state = self.log.state.borrow_mut();
            match state.resizes_left {
                Some(0) => {
                    return Err(RenderError::BackendError(format!("resize of framebuffer {} rejected", id.0)));
                }
                Some(n) => state.resizes_left = Some(n - 1),
                None => {}
            }
            let slot = state
                .framebuffers
                .get_mut(id.0 as usize)
                .ok_or_else(|| RenderError::BackendError(format!("unknown framebuffer {}", id.0)))?;
            *slot = (width, height);
        }
        self.push(GpuCommand::ResizeFramebuffer { id, width, height });
        Ok(())
    }

    fn bind_render_target(&mut self, target: RenderTarget) {
        self.push(GpuCommand::BindTarget(target));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.push(GpuCommand::Viewport(width, height));
    }

    fn clear(&mut self, color: Option<Color>, depth: bool) {
        self.push(GpuCommand::Clear { color, depth });
    }

    fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.push(GpuCommand::PipelineState(*state));
    }

    fn set_camera(&mut self, view: &Mat4, projection: &Mat4) {
        self.push(GpuCommand::Camera {
            view: *view,
            projection: *projection,
        });
    }

    fn set_lights(&mut self, ambient: Color, lights: &[Light]) {
        self.push(GpuCommand::Lights {
            ambient,
            count: lights.len(),
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        self.push(GpuCommand::Draw(*call));
    }

    fn draw_quad(&mut self, quad: &QuadDraw) {
        self.push(GpuCommand::Quad(*quad));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_survives_move() {
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        let id = backend.create_framebuffer(64, 32).unwrap();
        let mut boxed: Box<dyn GraphicsBackend> = Box::new(backend);
        boxed.resize_framebuffer(id, 128, 64).unwrap();
        assert_eq!(log.framebuffer_size(id), Some((128, 64)));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_failing_backend_reports_resource_error() {
        let mut backend = RecordingBackend::failing();
        assert!(matches!(
            backend.create_framebuffer(8, 8),
            Err(RenderError::ResourceCreationFailed(_))
        ));
        assert!(backend.log().is_empty());
    }

    #[test]
    fn test_resize_budget_runs_out() {
        let mut backend = RecordingBackend::failing_resizes_after(1);
        let id = backend.create_framebuffer(8, 8).unwrap();
        assert!(backend.resize_framebuffer(id, 16, 16).is_ok());
        assert!(matches!(
            backend.resize_framebuffer(id, 32, 32),
            Err(RenderError::BackendError(_))
        ));
        assert_eq!(backend.log().framebuffer_size(id), Some((16, 16)));
    }

    #[test]
    fn test_resize_unknown_framebuffer_fails() {
        let mut backend = RecordingBackend::new();
        assert!(backend.resize_framebuffer(FramebufferId(3), 1, 1).is_err());
    }
}
