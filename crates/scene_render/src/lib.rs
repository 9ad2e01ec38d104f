//! # Scene Render
//!
//! Rendering and scene-traversal core for an interactive 3D viewer/editor.
//!
//! ## Features
//!
//! - **Scene Graph**: lazily transformed nodes with model and light content
//! - **Render Buckets**: opaque front-to-back, transparent back-to-front
//! - **Frame Orchestration**: strictly ordered frame phases with asserted misuse
//! - **Bloom**: extract/blur/composite chain, fake glow, precomputed bloom maps
//! - **Picking**: two-phase bounding-box then exact surface ray tests
//! - **Headless**: every GPU call goes through a backend trait with a recorder
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_render::prelude::*;
//! use std::rc::Rc;
//!
//! # fn cube() -> Model { unimplemented!() }
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RendererConfig::default();
//!     let mut renderer = Renderer::new(Box::new(RecordingBackend::new()), &config)?;
//!
//!     let scene = Scene::new();
//!     scene.add_node(None, SceneNode::new_model("cube", Some(Rc::new(cube())), ModelLayer::World));
//!
//!     let camera = Camera::default();
//!     let view = ViewInfo::from_camera(&camera, renderer.render_options());
//!
//!     renderer.begin_frame();
//!     scene.add_to_renderer(&mut renderer, &view);
//!     renderer.render_buckets(&camera, &view);
//!     renderer.render_bloom();
//!     renderer.end_frame();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Configuration
pub mod config;
pub mod core;

// Shared types
pub mod foundation;
pub mod model;

// Scene, rendering and picking
pub mod picking;
pub mod render;
pub mod scene;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        core::config::{BloomConfig, Config, RendererConfig, ViewerConfig},
        foundation::math::{Color, Mat4, Quat, Ray, Transform, Vec3},
        model::{Material, MaterialBlend, MaterialSet, Model, ModelId, Surface},
        picking::{RayCollisionTester, RayIntersection},
        render::{
            BloomMode, Camera, GraphicsBackend, Light, LightingEnvironment, RecordingBackend, RenderError,
            RenderOptions, RenderResult, Renderer,
        },
        scene::{ModelLayer, NodeFlags, Scene, SceneNode, ViewInfo},
    };
}
