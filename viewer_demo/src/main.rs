//! Headless viewer demo
//!
//! Builds a small room, renders a few frames through the recording backend
//! with each bloom mode, then picks through the middle of the screen and
//! reports what was hit.
//!
//! Usage: `viewer_demo [config.toml|config.ron]`

mod geometry;

use std::rc::Rc;

use scene_render::foundation::logging;
use scene_render::prelude::*;
use scene_render::render::{CommandLog, GpuCommand};

/// Demo failures
#[derive(thiserror::Error, Debug)]
enum DemoError {
    /// Configuration could not be loaded
    #[error("config: {0}")]
    Config(#[from] scene_render::config::ConfigError),

    /// Configuration failed validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Renderer could not be created
    #[error("render: {0}")]
    Render(#[from] RenderError),
}

struct ViewerApp {
    config: ViewerConfig,
    scene: Scene,
    sky: Model,
    camera: Camera,
}

impl ViewerApp {
    fn new(config: ViewerConfig) -> Self {
        let scene = Scene::new();

        let floor = scene.add_node(
            None,
            SceneNode::new_model("floor", Some(Rc::new(geometry::floor(1))), ModelLayer::World),
        );
        floor.set_position(Vec3::new(0.0, -0.1, 0.0));

        let props = scene.add_node(None, SceneNode::new_root("props"));
        for (i, x) in [-6.0_f32, 6.0].into_iter().enumerate() {
            let pillar = SceneNode::new_model(
                format!("pillar_{i}"),
                Some(Rc::new(geometry::pillar(10))),
                ModelLayer::Object,
            );
            pillar.set_position(Vec3::new(x, 3.0, -4.0));
            scene.add_node(Some(&props), pillar);
        }

        let window = scene.add_node(
            Some(&props),
            SceneNode::new_model("window", Some(Rc::new(geometry::window(20))), ModelLayer::Object),
        );
        window.set_position(Vec3::new(0.0, 2.0, 0.0));
        window.set_selected(true);

        let lamp = scene.add_node(
            None,
            SceneNode::new_light("lamp", Light::point(Vec3::zeros(), Color::new(1.0, 0.8, 0.5, 1.0), 8.0)),
        );
        lamp.set_position(Vec3::new(0.0, 5.0, 3.0));

        let aspect = config.renderer.viewport_width as f32 / config.renderer.viewport_height as f32;
        let mut camera = Camera::perspective(Vec3::new(0.0, 2.0, 12.0), 55.0, aspect, 0.1, 1000.0);
        camera.set_target(Vec3::new(0.0, 2.0, 0.0));

        log::info!("Scene built with {} nodes", scene.node_count());
        Self {
            config,
            scene,
            sky: geometry::sky(99),
            camera,
        }
    }

    fn render_frame(&self, renderer: &mut Renderer) {
        let view = ViewInfo::from_camera(&self.camera, renderer.render_options());

        renderer.begin_frame();
        renderer.render_sky(&self.sky, &self.camera);
        renderer.clear_depth_buffer();
        self.scene.add_to_renderer(renderer, &view);
        log::debug!(
            "Collected {} opaque / {} transparent entries",
            renderer.opaque_bucket().len(),
            renderer.transparent_bucket().len()
        );
        renderer.render_buckets(&self.camera, &view);
        renderer.render_bloom();
        renderer.end_frame();
    }

    fn run(&mut self) -> Result<(), DemoError> {
        let backend = RecordingBackend::new();
        let commands = backend.log();
        let mut renderer = Renderer::new(Box::new(backend), &self.config.renderer)?;

        let lights: Vec<Light> = {
            let mut lights = Vec::new();
            self.scene.traverse(|node| {
                if let Some(light) = node.light_node() {
                    lights.push(light.world_light(node));
                }
            });
            lights
        };
        renderer.set_lighting(
            lights
                .into_iter()
                .fold(LightingEnvironment::default_editor(), LightingEnvironment::add_light),
        );

        for mode in [BloomMode::None, BloomMode::Bloom, BloomMode::FakeBloom] {
            renderer.set_bloom(mode);
            commands.clear();
            self.render_frame(&mut renderer);
            report_frame(mode, renderer.draw_count(), &commands);
        }

        // Shutter the window: its pane moves to the opaque bucket
        if let Some(window) = self.scene.find_by_name("window") {
            if let Some(mut content) = window.model_node_mut() {
                content.set_active_material_set(1);
            }
        }
        renderer.toggle_grid(true);
        commands.clear();
        self.render_frame(&mut renderer);
        report_frame(renderer.bloom_mode(), renderer.draw_count(), &commands);

        self.pick(renderer.render_options(), 0.0, 0.0);
        self.pick(renderer.render_options(), 0.9, 0.9);

        renderer.set_viewport_size(self.config.renderer.viewport_width / 2, self.config.renderer.viewport_height / 2)?;
        log::info!("Bloom target 0 after resize: {:?}", renderer.bloom_target_size(0));
        Ok(())
    }

    fn pick(&self, options: RenderOptions, ndc_x: f32, ndc_y: f32) {
        let Some(ray) = self.camera.ray_from_ndc(ndc_x, ndc_y) else {
            log::warn!("Camera matrix is singular, cannot pick");
            return;
        };
        let view = ViewInfo::from_camera(&self.camera, options);
        let result = self.scene.ray_cast(&ray, &view);
        match result.node.filter(|_| result.hit) {
            Some(node) => log::info!(
                "Pick ({ndc_x:.2}, {ndc_y:.2}): '{}' component {} at {:.2}",
                node.name(),
                result.component,
                result.distance
            ),
            None => log::info!("Pick ({ndc_x:.2}, {ndc_y:.2}): nothing"),
        }
    }
}

fn report_frame(mode: BloomMode, draw_count: u32, commands: &CommandLog) {
    let binds = commands
        .commands()
        .iter()
        .filter(|c| matches!(c, GpuCommand::BindTarget(_)))
        .count();
    log::info!(
        "{:?}: {} draw calls, {} geometry, {} quads, {} target binds",
        mode,
        draw_count,
        commands.draw_calls().len(),
        commands.quads().len(),
        binds
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "viewer.toml".to_string());
    let config = ViewerConfig::load_or_default(&path).map_err(DemoError::from)?;

    logging::init_with_level(&config.log_level);
    config.validate().map_err(DemoError::InvalidConfig)?;
    log::info!("Starting headless viewer demo ({} live renderers)", Renderer::live_count());

    let mut app = ViewerApp::new(config);
    match app.run() {
        Ok(()) => {
            log::info!("Viewer demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Viewer demo failed: {}", e);
            Err(e.into())
        }
    }
}
