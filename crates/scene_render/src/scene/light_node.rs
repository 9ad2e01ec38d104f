//! Editor light nodes
//!
//! Lights are editor-only: they are drawn as billboards, hidden in game
//! mode, and show their radius when selected.

use crate::foundation::math::{Color, Mat4, Ray, Vec3};
use crate::picking::ray_tester::{RayCollisionTester, RayIntersection};
use crate::render::backend::Geometry;
use crate::render::draw_context::DrawContext;
use crate::render::lighting::{Light, LightType};
use crate::render::options::{RenderCommand, RenderOptions};
use crate::render::renderable::{ComponentId, WHOLE_NODE};
use crate::render::renderer::Renderer;
use crate::scene::bounds::AABox;
use crate::scene::node::SceneNode;
use crate::scene::view_info::ViewInfo;

/// Half extent of a light's billboard in local space
const BILLBOARD_HALF_EXTENT: f32 = 0.5;

/// Light content of a scene node
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    light: Light,
}

impl LightNode {
    /// Wrap a light
    pub fn new(light: Light) -> Self {
        Self { light }
    }

    /// The light as authored (local space)
    pub fn light(&self) -> &Light {
        &self.light
    }

    /// The light positioned by its node's world transform
    pub fn world_light(&self, node: &SceneNode) -> Light {
        let world = node.transform();
        Light {
            position: node.world_position(),
            direction: world
                .transform_vector(&self.light.direction)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::zeros),
            ..self.light
        }
    }

    pub(crate) fn local_aabox() -> AABox {
        AABox::from_center_extents(Vec3::zeros(), Vec3::repeat(BILLBOARD_HALF_EXTENT))
    }

    fn visible(view: &ViewInfo, options: RenderOptions) -> bool {
        !view.game_mode && options.contains(RenderOptions::DRAW_LIGHTS)
    }

    pub(crate) fn add_to_renderer(&self, node: &SceneNode, renderer: &mut Renderer, view: &ViewInfo) {
        if !Self::visible(view, renderer.render_options()) {
            return;
        }
        let world_aabox = node.world_aabox();
        if !view.frustum.box_in_frustum(&world_aabox) {
            return;
        }

        renderer.add_opaque_mesh(node.renderable(), WHOLE_NODE, world_aabox, RenderCommand::DrawMesh);
        if node.is_selected() {
            renderer.add_opaque_mesh(node.renderable(), WHOLE_NODE, world_aabox, RenderCommand::DrawSelection);
            renderer.add_opaque_mesh(node.renderable(), WHOLE_NODE, world_aabox, RenderCommand::DrawExtras);
        }
    }

    pub(crate) fn draw(&self, node: &SceneNode, ctx: &mut DrawContext<'_>, options: RenderOptions, view: &ViewInfo) {
        ctx.disable_lighting();
        ctx.set_model_matrix(Mat4::new_translation(&node.world_position()));
        let tint = node.tint_color(view);
        ctx.set_tint(Color::new(
            self.light.color.r * tint.r,
            self.light.color.g * tint.g,
            self.light.color.b * tint.b,
            1.0,
        ));
        ctx.draw(Geometry::Billboard, options);
    }

    pub(crate) fn draw_selection(node: &SceneNode, ctx: &mut DrawContext<'_>) {
        ctx.disable_lighting();
        ctx.set_model_matrix(node.transform());
        ctx.draw_wireframe(Geometry::Billboard, node.wireframe_color());
    }

    pub(crate) fn draw_extras(&self, node: &SceneNode, ctx: &mut DrawContext<'_>) {
        if self.light.light_type == LightType::Directional {
            return;
        }
        ctx.disable_lighting();
        ctx.set_model_matrix(
            Mat4::new_translation(&node.world_position()) * Mat4::new_scaling(self.light.range),
        );
        ctx.draw_wireframe(Geometry::LightRadius, self.light.color);
    }

    pub(crate) fn ray_aabox_intersect_test(&self, node: &SceneNode, tester: &mut RayCollisionTester, view: &ViewInfo) {
        if !Self::visible(view, view.render_options) {
            return;
        }
        if node.world_aabox().intersect_ray(tester.ray()).is_none() {
            return;
        }
        if let Some(handle) = node.handle() {
            tester.add_node(handle, WHOLE_NODE);
        }
    }

    pub(crate) fn ray_node_intersect_test(node: &SceneNode, ray: &Ray, component: ComponentId) -> RayIntersection {
        let Some(t) = node.world_aabox().intersect_ray(ray) else {
            return RayIntersection::miss();
        };
        let distance = t * ray.direction.norm();
        match node.handle() {
            Some(handle) => RayIntersection::hit(distance, handle, component),
            None => RayIntersection::miss(),
        }
    }
}
