//! # Frame Renderer
//!
//! Orchestrates one frame at a time through a strictly ordered sequence:
//!
//! ```text
//! begin_frame ─► collection ─► render_buckets ─► render_bloom ─► end_frame
//!                (add_*_mesh,                     (optional)
//!                 render_sky)
//! ```
//!
//! Each step is legal once per frame and only after the previous one.
//! Calling them out of order is a caller bug and panics.
//!
//! The renderer owns its buckets and framebuffers. It never owns scene
//! nodes: bucket entries hold weak references that only live for one frame.

use std::rc::Weak;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::core::config::RendererConfig;
use crate::foundation::math::{Color, Mat4};
use crate::model::Model;
use crate::render::backend::{
    FramebufferId, Geometry, GraphicsBackend, QuadDraw, RenderTarget, TextureId, TextureSource,
};
use crate::render::bloom::BloomChain;
use crate::render::bucket::{RenderBucket, RenderEntry, SortOrder};
use crate::render::camera::Camera;
use crate::render::draw_context::DrawContext;
use crate::render::lighting::LightingEnvironment;
use crate::render::options::{BloomMode, RenderCommand, RenderOptions};
use crate::render::pipeline::{BlendMode, PipelineState};
use crate::render::renderable::{ComponentId, Renderable};
use crate::render::{RenderError, RenderResult};
use crate::scene::bounds::AABox;
use crate::scene::view_info::ViewInfo;

/// Renderer instances currently alive in the process
static LIVE_RENDERERS: AtomicU32 = AtomicU32::new(0);

/// Where the renderer is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Between frames
    Idle,
    /// Frame begun, accepting bucket entries
    Collecting,
    /// Buckets sorted and drawn
    BucketsRendered,
    /// Bloom composited
    BloomRendered,
}

/// Frame orchestrator owning buckets, offscreen targets and render toggles
pub struct Renderer {
    backend: Box<dyn GraphicsBackend>,
    opaque: RenderBucket,
    transparent: RenderBucket,
    scene_target: FramebufferId,
    bloom: BloomChain,
    options: RenderOptions,
    bloom_mode: BloomMode,
    bloom_maps: Vec<TextureId>,
    clear_color: Color,
    viewport: (u32, u32),
    lighting: LightingEnvironment,
    draw_count: u32,
    phase: FramePhase,
}

impl Renderer {
    /// Create a renderer and allocate its offscreen targets.
    ///
    /// A framebuffer allocation failure is logged and returned; it is not
    /// retried.
    pub fn new(mut backend: Box<dyn GraphicsBackend>, config: &RendererConfig) -> RenderResult<Self> {
        config.validate().map_err(RenderError::InitializationFailed)?;
        let (width, height) = (config.viewport_width, config.viewport_height);

        let scene_target = backend.create_framebuffer(width, height).map_err(|e| {
            log::error!("Failed to create scene framebuffer: {}", e);
            e
        })?;
        let bloom = BloomChain::create(backend.as_mut(), width, height, config.bloom.clone()).map_err(|e| {
            log::error!("Failed to create bloom framebuffers: {}", e);
            e
        })?;

        let live = LIVE_RENDERERS.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Renderer initialized at {}x{} ({} live)", width, height, live);

        Ok(Self {
            backend,
            opaque: RenderBucket::new(SortOrder::FrontToBack),
            transparent: RenderBucket::new(SortOrder::BackToFront),
            scene_target,
            bloom,
            options: config.render_options,
            bloom_mode: config.bloom_mode,
            bloom_maps: Vec::new(),
            clear_color: config.clear_color,
            viewport: (width, height),
            lighting: LightingEnvironment::default(),
            draw_count: 0,
            phase: FramePhase::Idle,
        })
    }

    /// Number of renderer instances alive in the process
    pub fn live_count() -> u32 {
        LIVE_RENDERERS.load(Ordering::SeqCst)
    }

    fn expect_phase(&self, expected: FramePhase, operation: &str) {
        assert!(
            self.phase == expected,
            "{operation} called in phase {:?}, expected {:?}",
            self.phase,
            expected
        );
    }

    // ---- Frame phases ----

    /// Bind and clear the scene target, empty both buckets and reset the draw counter
    pub fn begin_frame(&mut self) {
        self.expect_phase(FramePhase::Idle, "begin_frame");

        self.backend.bind_render_target(RenderTarget::Offscreen(self.scene_target));
        self.backend.set_viewport(self.viewport.0, self.viewport.1);
        self.backend.clear(Some(self.clear_color), true);

        self.opaque.clear();
        self.transparent.clear();
        self.draw_count = 0;
        self.phase = FramePhase::Collecting;
    }

    /// Queue an entry in the opaque bucket
    pub fn add_opaque_mesh(
        &mut self,
        renderable: Weak<dyn Renderable>,
        component: ComponentId,
        aabox: AABox,
        command: RenderCommand,
    ) {
        self.expect_phase(FramePhase::Collecting, "add_opaque_mesh");
        self.opaque.add(RenderEntry::new(renderable, component, aabox, command));
    }

    /// Queue an entry in the transparent bucket
    pub fn add_transparent_mesh(
        &mut self,
        renderable: Weak<dyn Renderable>,
        component: ComponentId,
        aabox: AABox,
        command: RenderCommand,
    ) {
        self.expect_phase(FramePhase::Collecting, "add_transparent_mesh");
        self.transparent.add(RenderEntry::new(renderable, component, aabox, command));
    }

    /// Draw a skybox behind everything else.
    ///
    /// Uses the camera's rotation only, so the sky never moves with the
    /// viewer, and leaves the depth buffer untouched.
    pub fn render_sky(&mut self, sky: &Model, camera: &Camera) {
        self.expect_phase(FramePhase::Collecting, "render_sky");
        if !self.options.contains(RenderOptions::DRAW_SKY) {
            return;
        }

        let mut ctx = DrawContext::new(self.backend.as_mut(), &self.lighting);
        ctx.set_pipeline_state(&PipelineState {
            depth_test: false,
            depth_write: false,
            cull_backfaces: true,
            blend: BlendMode::Opaque,
        });
        ctx.set_camera(&camera.rotation_only_view(), &camera.projection_matrix());
        ctx.disable_lighting();
        ctx.set_model_matrix(Mat4::identity());
        sky.draw(&mut ctx, self.options, 0);
        self.draw_count += ctx.draw_count();
    }

    /// Clear the depth buffer of the bound target
    pub fn clear_depth_buffer(&mut self) {
        assert!(self.phase != FramePhase::Idle, "clear_depth_buffer called outside a frame");
        self.backend.clear(None, true);
    }

    /// Sort both buckets against `camera` and draw them, opaque first
    pub fn render_buckets(&mut self, camera: &Camera, view: &ViewInfo) {
        self.expect_phase(FramePhase::Collecting, "render_buckets");

        self.opaque.sort(camera);
        self.transparent.sort(camera);

        let options = self.options;
        let mut ctx = DrawContext::new(self.backend.as_mut(), &self.lighting);
        ctx.set_camera(&camera.view_matrix(), &camera.projection_matrix());

        if options.contains(RenderOptions::DRAW_GRID) {
            ctx.set_pipeline_state(&PipelineState::opaque());
            ctx.disable_lighting();
            ctx.set_model_matrix(Mat4::identity());
            ctx.draw(Geometry::Grid, options);
        }

        self.opaque.draw(&mut ctx, PipelineState::opaque(), options, view);
        let cull = options.contains(RenderOptions::ENABLE_BACKFACE_CULL);
        self.transparent.draw(&mut ctx, PipelineState::transparent(cull), options, view);

        self.draw_count += ctx.draw_count();
        log::trace!(
            "Rendered {} opaque and {} transparent entries",
            self.opaque.len(),
            self.transparent.len()
        );
        self.phase = FramePhase::BucketsRendered;
    }

    /// Run the bloom post-process; a no-op for [`BloomMode::None`]
    pub fn render_bloom(&mut self) {
        self.expect_phase(FramePhase::BucketsRendered, "render_bloom");
        self.draw_count += self.bloom.render(
            self.backend.as_mut(),
            self.bloom_mode,
            self.scene_target,
            self.viewport,
            &self.bloom_maps,
        );
        self.phase = FramePhase::BloomRendered;
    }

    /// Present the scene target on the default framebuffer and finish the frame
    pub fn end_frame(&mut self) {
        assert!(
            matches!(self.phase, FramePhase::BucketsRendered | FramePhase::BloomRendered),
            "end_frame called in phase {:?}",
            self.phase
        );

        self.backend.bind_render_target(RenderTarget::Default);
        self.backend.set_viewport(self.viewport.0, self.viewport.1);
        self.backend.set_pipeline_state(&PipelineState::fullscreen(BlendMode::Opaque));
        self.backend.draw_quad(&QuadDraw::textured(TextureSource::Framebuffer(self.scene_target)));
        self.draw_count += 1;

        log::trace!("Frame finished with {} draw calls", self.draw_count);
        self.phase = FramePhase::Idle;
    }

    // ---- Viewport ----

    /// Resize the scene target and recompute the bloom chain.
    ///
    /// # Panics
    /// When called while a frame is in progress.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        assert!(self.phase == FramePhase::Idle, "set_viewport_size called mid-frame");
        if (width, height) == self.viewport {
            return Ok(());
        }

        self.backend.resize_framebuffer(self.scene_target, width, height)?;
        log::debug!(
            "Viewport resized {}x{} -> {}x{}",
            self.viewport.0,
            self.viewport.1,
            width,
            height
        );
        self.viewport = (width, height);
        self.bloom.resize(self.backend.as_mut(), width, height)
    }

    /// Current viewport size
    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport
    }

    /// Size of bloom target `index` (0..3)
    pub fn bloom_target_size(&self, index: usize) -> Option<(u32, u32)> {
        self.bloom.target_size(index)
    }

    // ---- Toggles ----

    fn set_option(&mut self, flag: RenderOptions, enabled: bool) {
        self.options.set(flag, enabled);
        log::debug!("Render option {:?} -> {}", flag, enabled);
    }

    /// Show or hide world geometry
    pub fn toggle_world(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_WORLD, enabled);
    }

    /// Show or hide the world collision overlay
    pub fn toggle_world_collision(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_WORLD_COLLISION, enabled);
    }

    /// Show or hide objects
    pub fn toggle_objects(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_OBJECTS, enabled);
    }

    /// Show or hide the object collision overlay
    pub fn toggle_object_collision(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_OBJECT_COLLISION, enabled);
    }

    /// Show or hide lights
    pub fn toggle_lights(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_LIGHTS, enabled);
    }

    /// Show or hide the skybox
    pub fn toggle_sky(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_SKY, enabled);
    }

    /// Enable or disable back-face culling
    pub fn toggle_backface_cull(&mut self, enabled: bool) {
        self.set_option(RenderOptions::ENABLE_BACKFACE_CULL, enabled);
    }

    /// Enable or disable texture coordinate animation
    pub fn toggle_uv_animation(&mut self, enabled: bool) {
        self.set_option(RenderOptions::ENABLE_UV_SCROLL, enabled);
    }

    /// Show or hide the ground grid
    pub fn toggle_grid(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_GRID, enabled);
    }

    /// Show or hide occluder meshes
    pub fn toggle_occluders(&mut self, enabled: bool) {
        self.set_option(RenderOptions::DRAW_OCCLUDERS, enabled);
    }

    /// Draw every material as opaque
    pub fn toggle_alpha_disabled(&mut self, enabled: bool) {
        self.set_option(RenderOptions::ALPHA_DISABLED, enabled);
    }

    /// Select the post-process glow mode
    pub fn set_bloom(&mut self, mode: BloomMode) {
        if mode != self.bloom_mode {
            log::debug!("Bloom mode {:?} -> {:?}", self.bloom_mode, mode);
        }
        self.bloom_mode = mode;
    }

    /// Register the textures composited by [`BloomMode::BloomMaps`]
    pub fn set_bloom_maps(&mut self, maps: Vec<TextureId>) {
        self.bloom_maps = maps;
    }

    /// Set the color the scene target is cleared to
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Replace the lighting used by lit nodes
    pub fn set_lighting(&mut self, lighting: LightingEnvironment) {
        self.lighting = lighting;
    }

    // ---- Queries ----

    /// Current render toggles
    pub fn render_options(&self) -> RenderOptions {
        self.options
    }

    /// Current bloom mode
    pub fn bloom_mode(&self) -> BloomMode {
        self.bloom_mode
    }

    /// Draw calls issued so far this frame
    pub fn draw_count(&self) -> u32 {
        self.draw_count
    }

    /// Current frame phase
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Opaque bucket
    pub fn opaque_bucket(&self) -> &RenderBucket {
        &self.opaque
    }

    /// Transparent bucket
    pub fn transparent_bucket(&self) -> &RenderBucket {
        &self.transparent
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let remaining = LIVE_RENDERERS.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        log::debug!("Renderer dropped ({} live)", remaining);
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("options", &self.options)
            .field("bloom_mode", &self.bloom_mode)
            .field("viewport", &self.viewport)
            .field("phase", &self.phase)
            .field("draw_count", &self.draw_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::model::tests::opaque_cube;
    use crate::render::recording::{CommandLog, GpuCommand, RecordingBackend};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Counter {
        draws: Cell<u32>,
    }

    impl Renderable for Counter {
        fn draw(&self, ctx: &mut DrawContext<'_>, options: RenderOptions, _component: ComponentId, _view: &ViewInfo) {
            self.draws.set(self.draws.get() + 1);
            ctx.draw(Geometry::Billboard, options);
        }

        fn draw_selection(&self, _ctx: &mut DrawContext<'_>) {}
    }

    fn renderer() -> (Renderer, CommandLog) {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let renderer = Renderer::new(Box::new(backend), &RendererConfig::new(640, 480)).unwrap();
        (renderer, log)
    }

    fn camera() -> Camera {
        Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 4.0 / 3.0, 0.1, 100.0)
    }

    fn weak(counter: &Rc<Counter>) -> Weak<dyn Renderable> {
        Rc::downgrade(counter) as Weak<dyn Renderable>
    }

    #[test]
    fn test_full_frame_draws_both_buckets() {
        let (mut renderer, _log) = renderer();
        let counter = Rc::new(Counter::default());
        let aabox = AABox::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        renderer.begin_frame();
        renderer.add_opaque_mesh(weak(&counter), -1, aabox, RenderCommand::DrawMesh);
        renderer.add_transparent_mesh(weak(&counter), 0, aabox, RenderCommand::DrawMesh);
        renderer.render_buckets(&camera(), &ViewInfo::default());
        renderer.render_bloom();
        renderer.end_frame();

        assert_eq!(counter.draws.get(), 2);
        // Two bucket draws plus the present quad
        assert_eq!(renderer.draw_count(), 3);
        assert_eq!(renderer.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_begin_frame_resets_buckets_and_counter() {
        let (mut renderer, _log) = renderer();
        let counter = Rc::new(Counter::default());
        let aabox = AABox::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        renderer.begin_frame();
        renderer.add_opaque_mesh(weak(&counter), -1, aabox, RenderCommand::DrawMesh);
        renderer.render_buckets(&camera(), &ViewInfo::default());
        renderer.end_frame();
        assert!(renderer.draw_count() > 0);

        renderer.begin_frame();
        assert!(renderer.opaque_bucket().is_empty());
        assert!(renderer.opaque_bucket().capacity() >= 1);
        assert_eq!(renderer.draw_count(), 0);
    }

    #[test]
    fn test_bloom_none_is_noop() {
        let (mut renderer, log) = renderer();
        renderer.set_bloom(BloomMode::None);
        renderer.begin_frame();
        renderer.render_buckets(&camera(), &ViewInfo::default());
        let before = log.len();
        let draws = renderer.draw_count();

        renderer.render_bloom();

        assert_eq!(log.len(), before);
        assert_eq!(renderer.draw_count(), draws);
    }

    #[test]
    fn test_bloom_composites_onto_scene_target() {
        let (mut renderer, log) = renderer();
        renderer.set_bloom(BloomMode::Bloom);
        renderer.begin_frame();
        renderer.render_buckets(&camera(), &ViewInfo::default());
        log.clear();
        renderer.render_bloom();
        assert_eq!(log.quads().len(), 14);
        assert_eq!(renderer.draw_count(), 14);
    }

    #[test]
    #[should_panic(expected = "add_opaque_mesh")]
    fn test_collection_outside_frame_panics() {
        let (mut renderer, _log) = renderer();
        let counter = Rc::new(Counter::default());
        renderer.add_opaque_mesh(weak(&counter), -1, AABox::EMPTY, RenderCommand::DrawMesh);
    }

    #[test]
    #[should_panic(expected = "render_buckets")]
    fn test_render_buckets_twice_panics() {
        let (mut renderer, _log) = renderer();
        renderer.begin_frame();
        renderer.render_buckets(&camera(), &ViewInfo::default());
        renderer.render_buckets(&camera(), &ViewInfo::default());
    }

    #[test]
    #[should_panic(expected = "mid-frame")]
    fn test_resize_mid_frame_panics() {
        let (mut renderer, _log) = renderer();
        renderer.begin_frame();
        let _ = renderer.set_viewport_size(800, 600);
    }

    #[test]
    fn test_viewport_resize_recomputes_bloom_targets() {
        let (mut renderer, log) = renderer();
        assert_eq!(renderer.bloom_target_size(0), Some((320, 240)));
        renderer.set_viewport_size(1024, 768).unwrap();
        assert_eq!(renderer.viewport_size(), (1024, 768));
        assert_eq!(renderer.bloom_target_size(0), Some((512, 384)));
        assert_eq!(renderer.bloom_target_size(2), Some((128, 96)));
        assert!(log
            .commands()
            .iter()
            .any(|c| matches!(c, GpuCommand::ResizeFramebuffer { width: 1024, height: 768, .. })));
    }

    #[test]
    fn test_framebuffer_failure_is_reported() {
        let result = Renderer::new(Box::new(RecordingBackend::failing()), &RendererConfig::default());
        assert!(matches!(result, Err(RenderError::ResourceCreationFailed(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Renderer::new(Box::new(RecordingBackend::new()), &RendererConfig::new(0, 0));
        assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
    }

    #[test]
    fn test_toggles_update_options() {
        let (mut renderer, _log) = renderer();
        renderer.toggle_grid(true);
        renderer.toggle_world(false);
        renderer.toggle_alpha_disabled(true);
        let options = renderer.render_options();
        assert!(options.contains(RenderOptions::DRAW_GRID | RenderOptions::ALPHA_DISABLED));
        assert!(!options.contains(RenderOptions::DRAW_WORLD));
    }

    #[test]
    fn test_grid_drawn_before_buckets() {
        let (mut renderer, log) = renderer();
        let counter = Rc::new(Counter::default());
        renderer.toggle_grid(true);
        renderer.begin_frame();
        renderer.add_opaque_mesh(weak(&counter), -1, AABox::EMPTY, RenderCommand::DrawMesh);
        renderer.render_buckets(&camera(), &ViewInfo::default());

        let calls = log.draw_calls();
        assert_eq!(calls[0].geometry, Geometry::Grid);
        assert_eq!(calls[1].geometry, Geometry::Billboard);
    }

    #[test]
    fn test_sky_respects_toggle() {
        let (mut renderer, log) = renderer();
        let sky = opaque_cube(42);

        renderer.toggle_sky(false);
        renderer.begin_frame();
        let before = log.len();
        renderer.render_sky(&sky, &camera());
        assert_eq!(log.len(), before);
        renderer.render_buckets(&camera(), &ViewInfo::default());
        renderer.end_frame();

        renderer.toggle_sky(true);
        renderer.begin_frame();
        renderer.render_sky(&sky, &camera());
        let calls = log.draw_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].state.light_count, 0);
    }

    #[test]
    fn test_bloom_resize_failure_keeps_viewport_in_sync() {
        let backend = RecordingBackend::failing_resizes_after(1);
        let log = backend.log();
        let mut renderer = Renderer::new(Box::new(backend), &RendererConfig::new(640, 480)).unwrap();

        assert!(matches!(
            renderer.set_viewport_size(1024, 768),
            Err(RenderError::BackendError(_))
        ));
        assert_eq!(renderer.viewport_size(), (1024, 768));
        assert_eq!(log.framebuffer_size(FramebufferId(0)), Some((1024, 768)));

        log.clear();
        renderer.begin_frame();
        assert!(log.commands().contains(&GpuCommand::Viewport(1024, 768)));
    }

    #[test]
    fn test_end_frame_presents_scene_target() {
        let (mut renderer, log) = renderer();
        renderer.begin_frame();
        renderer.render_buckets(&camera(), &ViewInfo::default());
        renderer.end_frame();

        let commands = log.commands();
        let present = commands
            .iter()
            .rposition(|c| matches!(c, GpuCommand::BindTarget(RenderTarget::Default)))
            .unwrap();
        assert!(matches!(commands[present + 1..].last(), Some(GpuCommand::Quad(_))));
    }
}
