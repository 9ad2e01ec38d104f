//! # Bloom Post-Process
//!
//! Glow is produced from a chain of three progressively smaller offscreen
//! targets:
//!
//! 1. **Extract**: the scene target is drawn into target 0 with the
//!    alpha-mask blend, keeping only pixels whose alpha marks them as
//!    emissive.
//! 2. **Horizontal blur**: target 0 is drawn into target 1 six times with
//!    horizontal offsets and falloff tints, additively.
//! 3. **Vertical blur**: target 1 is drawn into target 2 the same way with
//!    vertical offsets.
//! 4. **Composite**: target 2 is added back onto the scene target.
//!
//! Fake bloom and bloom maps skip the chain entirely.

use crate::core::config::BloomConfig;
use crate::foundation::math::{Color, Vec2};
use crate::render::backend::{
    FramebufferId, GraphicsBackend, QuadDraw, RenderTarget, TextureId, TextureSource,
};
use crate::render::options::BloomMode;
use crate::render::pipeline::{BlendMode, PipelineState};
use crate::render::RenderResult;

/// Number of targets in the bloom chain
pub const BLOOM_TARGET_COUNT: usize = 3;

/// Horizontal blur tap offsets in normalized device coordinates
pub const HORIZONTAL_OFFSETS: [f32; 6] = [-0.008595, -0.005470, -0.002345, 0.002345, 0.005470, 0.008595];

/// Vertical blur tap offsets in normalized device coordinates
pub const VERTICAL_OFFSETS: [f32; 6] = [-0.012275, -0.007815, -0.003350, 0.003350, 0.007815, 0.012275];

/// Falloff tint for each blur tap, outermost taps darkest
pub fn blur_tints() -> [Color; 6] {
    let outer = Color::from_rgb8(17, 17, 17);
    let middle = Color::from_rgb8(53, 53, 53);
    let inner = Color::from_rgb8(89, 89, 89);
    [outer, middle, inner, inner, middle, outer]
}

/// Size of bloom target `index` for a viewport, clamped to the configured minimum
pub fn target_size(width: u32, height: u32, index: usize, config: &BloomConfig) -> (u32, u32) {
    let scale = config.target_scales[index.min(BLOOM_TARGET_COUNT - 1)];
    let scaled = |extent: u32| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let value = (extent as f32 * scale).floor() as u32;
        value.max(config.min_target_size)
    };
    (scaled(width), scaled(height))
}

/// The three bloom framebuffers and their current sizes
#[derive(Debug, Clone)]
pub struct BloomChain {
    framebuffers: [FramebufferId; BLOOM_TARGET_COUNT],
    sizes: [(u32, u32); BLOOM_TARGET_COUNT],
    config: BloomConfig,
}

impl BloomChain {
    /// Allocate the chain for a viewport
    pub fn create(
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
        config: BloomConfig,
    ) -> RenderResult<Self> {
        let sizes = std::array::from_fn(|i| target_size(width, height, i, &config));
        let mut framebuffers = [FramebufferId(0); BLOOM_TARGET_COUNT];
        for (slot, &(w, h)) in framebuffers.iter_mut().zip(sizes.iter()) {
            *slot = backend.create_framebuffer(w, h)?;
            log::debug!("Created bloom target {:?} at {}x{}", slot, w, h);
        }
        Ok(Self {
            framebuffers,
            sizes,
            config,
        })
    }

    /// Recompute target sizes for a new viewport and resize the framebuffers
    pub fn resize(&mut self, backend: &mut dyn GraphicsBackend, width: u32, height: u32) -> RenderResult<()> {
        for i in 0..BLOOM_TARGET_COUNT {
            let size = target_size(width, height, i, &self.config);
            if size != self.sizes[i] {
                backend.resize_framebuffer(self.framebuffers[i], size.0, size.1)?;
                log::debug!("Resized bloom target {} to {}x{}", i, size.0, size.1);
                self.sizes[i] = size;
            }
        }
        Ok(())
    }

    /// Current size of target `index`
    pub fn target_size(&self, index: usize) -> Option<(u32, u32)> {
        self.sizes.get(index).copied()
    }

    /// Framebuffer handle of target `index`
    pub fn framebuffer(&self, index: usize) -> Option<FramebufferId> {
        self.framebuffers.get(index).copied()
    }

    /// Run the post-process for `mode` and leave the scene target bound.
    ///
    /// Returns the number of quads drawn. [`BloomMode::None`] touches nothing.
    pub fn render(
        &self,
        backend: &mut dyn GraphicsBackend,
        mode: BloomMode,
        scene: FramebufferId,
        viewport: (u32, u32),
        bloom_maps: &[TextureId],
    ) -> u32 {
        match mode {
            BloomMode::None => 0,
            BloomMode::Bloom => self.render_blur_chain(backend, scene, viewport),
            BloomMode::FakeBloom => {
                bind_scene(backend, scene, viewport, BlendMode::Additive);
                backend.draw_quad(&QuadDraw {
                    source: None,
                    tint: self.config.fake_glow,
                    offset: Vec2::zeros(),
                });
                1
            }
            BloomMode::BloomMaps => {
                if bloom_maps.is_empty() {
                    log::trace!("Bloom maps mode with no maps registered");
                    return 0;
                }
                bind_scene(backend, scene, viewport, BlendMode::Additive);
                for &map in bloom_maps {
                    backend.draw_quad(&QuadDraw::textured(TextureSource::Texture(map)));
                }
                u32::try_from(bloom_maps.len()).unwrap_or(u32::MAX)
            }
        }
    }

    fn render_blur_chain(&self, backend: &mut dyn GraphicsBackend, scene: FramebufferId, viewport: (u32, u32)) -> u32 {
        let mut quads = 0;

        // Extract
        self.bind_target(backend, 0, BlendMode::AlphaMask);
        backend.draw_quad(&QuadDraw::textured(TextureSource::Framebuffer(scene)));
        quads += 1;

        // Separable blur
        let tints = blur_tints();
        let passes = [
            (1, 0, HORIZONTAL_OFFSETS.map(|x| Vec2::new(x, 0.0))),
            (2, 1, VERTICAL_OFFSETS.map(|y| Vec2::new(0.0, y))),
        ];
        for (target, source, offsets) in passes {
            self.bind_target(backend, target, BlendMode::Additive);
            for (offset, tint) in offsets.into_iter().zip(tints) {
                backend.draw_quad(&QuadDraw {
                    source: Some(TextureSource::Framebuffer(self.framebuffers[source])),
                    tint,
                    offset,
                });
                quads += 1;
            }
        }

        // Composite
        bind_scene(backend, scene, viewport, BlendMode::Additive);
        backend.draw_quad(&QuadDraw::textured(TextureSource::Framebuffer(
            self.framebuffers[BLOOM_TARGET_COUNT - 1],
        )));
        quads + 1
    }

    fn bind_target(&self, backend: &mut dyn GraphicsBackend, index: usize, blend: BlendMode) {
        let (w, h) = self.sizes[index];
        backend.bind_render_target(RenderTarget::Offscreen(self.framebuffers[index]));
        backend.set_viewport(w, h);
        backend.clear(Some(Color::TRANSPARENT), false);
        backend.set_pipeline_state(&PipelineState::fullscreen(blend));
    }
}

fn bind_scene(backend: &mut dyn GraphicsBackend, scene: FramebufferId, (w, h): (u32, u32), blend: BlendMode) {
    backend.bind_render_target(RenderTarget::Offscreen(scene));
    backend.set_viewport(w, h);
    backend.set_pipeline_state(&PipelineState::fullscreen(blend));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{GpuCommand, RecordingBackend};

    #[test]
    fn test_target_sizes_scale_and_clamp() {
        let config = BloomConfig::default();
        assert_eq!(target_size(1280, 720, 0, &config), (640, 360));
        assert_eq!(target_size(1280, 720, 2, &config), (160, 90));
        assert_eq!(target_size(64, 48, 2, &config), (16, 16));
    }

    #[test]
    fn test_none_mode_records_nothing() {
        let mut backend = RecordingBackend::new();
        let chain = BloomChain::create(&mut backend, 640, 480, BloomConfig::default()).unwrap();
        let log = backend.log();
        log.clear();
        let quads = chain.render(&mut backend, BloomMode::None, FramebufferId(9), (640, 480), &[]);
        assert_eq!(quads, 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_blur_chain_passes() {
        let mut backend = RecordingBackend::new();
        let scene = backend.create_framebuffer(640, 480).unwrap();
        let chain = BloomChain::create(&mut backend, 640, 480, BloomConfig::default()).unwrap();
        let log = backend.log();
        log.clear();

        let quads = chain.render(&mut backend, BloomMode::Bloom, scene, (640, 480), &[]);
        assert_eq!(quads, 14);

        let binds: Vec<_> = log
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                GpuCommand::BindTarget(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(
            binds,
            vec![
                RenderTarget::Offscreen(chain.framebuffer(0).unwrap()),
                RenderTarget::Offscreen(chain.framebuffer(1).unwrap()),
                RenderTarget::Offscreen(chain.framebuffer(2).unwrap()),
                RenderTarget::Offscreen(scene),
            ]
        );

        let recorded = log.quads();
        assert_eq!(recorded[0].source, Some(TextureSource::Framebuffer(scene)));
        assert_eq!(recorded[1].offset, Vec2::new(HORIZONTAL_OFFSETS[0], 0.0));
        assert_eq!(recorded[7].offset, Vec2::new(0.0, VERTICAL_OFFSETS[0]));
        assert_eq!(recorded[3].tint, Color::from_rgb8(89, 89, 89));
    }

    #[test]
    fn test_fake_bloom_is_single_glow_quad() {
        let mut backend = RecordingBackend::new();
        let scene = backend.create_framebuffer(320, 240).unwrap();
        let config = BloomConfig::default();
        let chain = BloomChain::create(&mut backend, 320, 240, config.clone()).unwrap();
        let log = backend.log();
        log.clear();

        assert_eq!(chain.render(&mut backend, BloomMode::FakeBloom, scene, (320, 240), &[]), 1);
        let quads = log.quads();
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].source, None);
        assert_eq!(quads[0].tint, config.fake_glow);
    }

    #[test]
    fn test_resize_only_touches_changed_targets() {
        let mut backend = RecordingBackend::new();
        let log = backend.log();
        let mut chain = BloomChain::create(&mut backend, 64, 64, BloomConfig::default()).unwrap();
        log.clear();

        // Target 2 stays clamped at the minimum
        chain.resize(&mut backend, 96, 96).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(chain.target_size(0), Some((48, 48)));
        assert_eq!(chain.target_size(2), Some((16, 16)));
    }
}
