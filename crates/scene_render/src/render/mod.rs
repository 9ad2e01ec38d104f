//! # Rendering System
//!
//! Bucketed, ordered drawing of scene content plus the bloom post-process.
//!
//! ## Architecture
//!
//! - **Renderer**: frame orchestrator owning the buckets and offscreen targets
//! - **RenderBucket**: per-frame list of entries for one blend category
//! - **DrawContext**: explicit draw state handed to each renderable
//! - **GraphicsBackend**: the only seam to the GPU; [`RecordingBackend`]
//!   implements it headlessly
//! - **Camera / Lighting**: view matrices and the light environment
//!
//! ## Frame Flow
//!
//! ```text
//! Scene traversal ─► add_opaque_mesh / add_transparent_mesh
//!                            │
//!                 render_buckets(camera)
//!          opaque (front-to-back) ─► transparent (back-to-front)
//!                            │
//!                     render_bloom ─► end_frame
//! ```

pub mod backend;
pub mod bloom;
pub mod bucket;
pub mod camera;
pub mod draw_context;
pub mod lighting;
pub mod options;
pub mod pipeline;
pub mod recording;
pub mod renderable;
pub mod renderer;

pub use backend::{DrawCall, DrawState, FramebufferId, Geometry, GraphicsBackend, QuadDraw, RenderTarget, TextureId};
pub use bucket::{RenderBucket, RenderEntry, SortOrder};
pub use camera::Camera;
pub use draw_context::DrawContext;
pub use lighting::{Light, LightType, LightingEnvironment};
pub use options::{BloomMode, RenderCommand, RenderOptions};
pub use pipeline::{BlendMode, PipelineState};
pub use recording::{CommandLog, GpuCommand, RecordingBackend};
pub use renderable::{ComponentId, Renderable, WHOLE_NODE};
pub use renderer::{FramePhase, Renderer};

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Raised for invalid configuration before any GPU resource is touched.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when a framebuffer or texture cannot be allocated. Reported
    /// once and never retried.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
