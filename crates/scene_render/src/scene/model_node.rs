//! Model instances in the scene
//!
//! A model node decides at collection time how its model reaches the
//! buckets. Fully opaque content goes in as one entry; anything with a
//! transparent material in the active set is split per surface so each
//! blended surface is depth-sorted against the whole scene.

use std::rc::Rc;

use crate::foundation::math::{Point3, Ray};
use crate::model::Model;
use crate::picking::ray_tester::{RayCollisionTester, RayIntersection};
use crate::render::draw_context::DrawContext;
use crate::render::options::{RenderCommand, RenderOptions};
use crate::render::renderable::{ComponentId, WHOLE_NODE};
use crate::render::renderer::Renderer;
use crate::scene::bounds::AABox;
use crate::scene::node::SceneNode;
use crate::scene::view_info::ViewInfo;

/// Which toggle governs a model's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelLayer {
    /// Static world geometry
    #[default]
    World,
    /// Scripted object
    Object,
    /// World collision mesh
    WorldCollision,
    /// Object collision mesh
    ObjectCollision,
    /// Visibility occluder
    Occluder,
}

impl ModelLayer {
    /// Toggle that must be on for this layer to be drawn or picked
    pub fn required_option(self) -> RenderOptions {
        match self {
            Self::World => RenderOptions::DRAW_WORLD,
            Self::Object => RenderOptions::DRAW_OBJECTS,
            Self::WorldCollision => RenderOptions::DRAW_WORLD_COLLISION,
            Self::ObjectCollision => RenderOptions::DRAW_OBJECT_COLLISION,
            Self::Occluder => RenderOptions::DRAW_OCCLUDERS,
        }
    }
}

/// Model content of a scene node
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    model: Option<Rc<Model>>,
    active_material_set: usize,
    layer: ModelLayer,
}

impl ModelNode {
    /// Create model content
    pub fn new(model: Option<Rc<Model>>, layer: ModelLayer) -> Self {
        Self {
            model,
            active_material_set: 0,
            layer,
        }
    }

    /// Referenced model
    pub fn model(&self) -> Option<&Rc<Model>> {
        self.model.as_ref()
    }

    /// Replace the model; the owning node must refresh its bounds
    pub(crate) fn set_model(&mut self, model: Option<Rc<Model>>) {
        if let Some(model) = &model {
            log::trace!("Model node now references {}", model.source());
        }
        self.model = model;
    }

    /// Material set used for drawing and transparency classification
    pub fn active_material_set(&self) -> usize {
        self.active_material_set
    }

    /// Select the material set
    pub fn set_active_material_set(&mut self, set: usize) {
        self.active_material_set = set;
    }

    /// Visibility layer
    pub fn layer(&self) -> ModelLayer {
        self.layer
    }

    /// Move to another visibility layer
    pub fn set_layer(&mut self, layer: ModelLayer) {
        self.layer = layer;
    }

    pub(crate) fn local_aabox(&self) -> AABox {
        self.model.as_ref().map_or(AABox::EMPTY, |m| m.aabox())
    }

    pub(crate) fn add_to_renderer(&self, node: &SceneNode, renderer: &mut Renderer, view: &ViewInfo) {
        let Some(model) = &self.model else {
            return;
        };
        let options = renderer.render_options();
        if !options.contains(self.layer.required_option()) {
            return;
        }
        let world_aabox = node.world_aabox();
        if !view.frustum.box_in_frustum(&world_aabox) || view.game_mode {
            return;
        }

        let alpha_disabled = options.contains(RenderOptions::ALPHA_DISABLED) && !node.force_alpha_enabled();
        let set = self.active_material_set;

        if alpha_disabled || !model.has_transparency(set) {
            renderer.add_opaque_mesh(node.renderable(), WHOLE_NODE, world_aabox, RenderCommand::DrawMesh);
        } else {
            let world = node.transform();
            for (index, surface) in model.surfaces().iter().enumerate() {
                let Ok(component) = ComponentId::try_from(index) else {
                    break;
                };
                let surface_box = surface.aabox().transformed(&world);
                if !view.frustum.box_in_frustum(&surface_box) {
                    continue;
                }
                if model.surface_is_transparent(set, index) {
                    renderer.add_transparent_mesh(node.renderable(), component, surface_box, RenderCommand::DrawMesh);
                } else {
                    renderer.add_opaque_mesh(node.renderable(), component, surface_box, RenderCommand::DrawMesh);
                }
            }
        }

        if node.is_selected() {
            renderer.add_opaque_mesh(node.renderable(), WHOLE_NODE, world_aabox, RenderCommand::DrawSelection);
        }
    }

    pub(crate) fn draw(
        &self,
        node: &SceneNode,
        ctx: &mut DrawContext<'_>,
        mut options: RenderOptions,
        component: ComponentId,
        view: &ViewInfo,
    ) {
        let Some(model) = &self.model else {
            return;
        };
        if node.force_alpha_enabled() {
            options.remove(RenderOptions::ALPHA_DISABLED);
        }

        if node.lighting_enabled() {
            ctx.use_default_lighting();
        } else {
            ctx.disable_lighting();
        }
        ctx.set_model_matrix(node.transform());
        ctx.set_tint(node.tint_color(view));
        ctx.set_lightmap_multiplier(1.0);

        match usize::try_from(component) {
            Ok(index) => model.draw_surface(ctx, options, index, self.active_material_set),
            Err(_) => model.draw(ctx, options, self.active_material_set),
        }
    }

    pub(crate) fn draw_selection(&self, node: &SceneNode, ctx: &mut DrawContext<'_>) {
        let Some(model) = &self.model else {
            return;
        };
        ctx.disable_lighting();
        ctx.set_model_matrix(node.transform());
        model.draw_wireframe(ctx, node.wireframe_color());
    }

    pub(crate) fn ray_aabox_intersect_test(&self, node: &SceneNode, tester: &mut RayCollisionTester, view: &ViewInfo) {
        let Some(model) = &self.model else {
            return;
        };
        if !view.render_options.contains(self.layer.required_option()) {
            return;
        }
        if node.world_aabox().intersect_ray(tester.ray()).is_none() {
            return;
        }
        if let Some(handle) = node.handle() {
            tester.add_node_model(&handle, model);
        }
    }

    pub(crate) fn ray_node_intersect_test(
        &self,
        node: &SceneNode,
        ray: &Ray,
        component: ComponentId,
        view: &ViewInfo,
    ) -> RayIntersection {
        let Some(model) = &self.model else {
            return RayIntersection::miss();
        };
        let world = node.transform();
        let Some(inverse) = world.try_inverse() else {
            return RayIntersection::miss();
        };

        let local_ray = ray.transformed(&inverse);
        let allow_backfaces = !view.render_options.contains(RenderOptions::ENABLE_BACKFACE_CULL);

        let local_t = match usize::try_from(component) {
            Ok(index) => model
                .surface(index)
                .and_then(|surface| surface.intersects_ray(&local_ray, allow_backfaces)),
            Err(_) => model
                .surfaces()
                .iter()
                .filter_map(|surface| surface.intersects_ray(&local_ray, allow_backfaces))
                .min_by(f32::total_cmp),
        };
        let Some(t) = local_t else {
            return RayIntersection::miss();
        };

        let local_hit = Point3::from(local_ray.point_at(t));
        let world_hit = world.transform_point(&local_hit).coords;
        let distance = (world_hit - ray.origin).norm();

        match node.handle() {
            Some(handle) => RayIntersection::hit(distance, handle, component),
            None => RayIntersection::miss(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RendererConfig;
    use crate::foundation::math::{Quat, Vec3};
    use crate::model::tests::{glass_plane, opaque_cube, quad_surface};
    use crate::model::{Material, MaterialSet, ModelId};
    use crate::render::recording::RecordingBackend;
    use approx::assert_relative_eq;

    fn renderer() -> Renderer {
        Renderer::new(Box::new(RecordingBackend::new()), &RendererConfig::new(320, 240)).unwrap()
    }

    fn mixed_model() -> Model {
        Model::new(
            ModelId(7),
            "window.cmdl",
            vec![quad_surface(0), quad_surface(1)],
            vec![MaterialSet::new(vec![Material::opaque("frame"), Material::transparent("pane")])],
        )
    }

    #[test]
    fn test_opaque_model_submits_single_entry() {
        let node = SceneNode::new_model("cube", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        let mut renderer = renderer();
        renderer.begin_frame();
        node.add_to_renderer(&mut renderer, &ViewInfo::default());

        let entries = renderer.opaque_bucket().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].component, WHOLE_NODE);
        assert_eq!(entries[0].aabox, node.world_aabox());
        assert!(renderer.transparent_bucket().is_empty());
    }

    #[test]
    fn test_transparent_model_split_per_surface() {
        let node = SceneNode::new_model("window", Some(Rc::new(mixed_model())), ModelLayer::World);
        node.set_position(Vec3::new(3.0, 0.0, 0.0));
        node.set_scale(Vec3::new(2.0, 1.0, 1.0));
        let mut renderer = renderer();
        renderer.begin_frame();
        node.add_to_renderer(&mut renderer, &ViewInfo::default());

        let opaque = renderer.opaque_bucket().entries();
        let transparent = renderer.transparent_bucket().entries();
        assert_eq!(opaque.len(), 1);
        assert_eq!(opaque[0].component, 0);
        assert_eq!(transparent.len(), 1);
        assert_eq!(transparent[0].component, 1);

        let expected = quad_surface(1).aabox().transformed(&node.transform());
        assert_eq!(transparent[0].aabox, expected);
    }

    #[test]
    fn test_selected_node_adds_overlay() {
        let node = SceneNode::new_model("glass", Some(Rc::new(glass_plane(2))), ModelLayer::World);
        node.set_selected(true);
        let mut renderer = renderer();
        renderer.begin_frame();
        node.add_to_renderer(&mut renderer, &ViewInfo::default());

        let opaque = renderer.opaque_bucket().entries();
        assert_eq!(opaque.len(), 1);
        assert_eq!(opaque[0].command, RenderCommand::DrawSelection);
        assert_eq!(renderer.transparent_bucket().len(), 1);
    }

    #[test]
    fn test_game_mode_submits_nothing() {
        let node = SceneNode::new_model("cube", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        node.set_selected(true);
        let mut renderer = renderer();
        renderer.begin_frame();
        node.add_to_renderer(&mut renderer, &ViewInfo::default().with_game_mode(true));

        assert!(renderer.opaque_bucket().is_empty());
        assert!(renderer.transparent_bucket().is_empty());
    }

    #[test]
    fn test_layer_toggle_and_missing_model_skip_collection() {
        let mut renderer = renderer();
        renderer.toggle_objects(false);
        renderer.begin_frame();

        let object = SceneNode::new_model("obj", Some(Rc::new(opaque_cube(1))), ModelLayer::Object);
        object.add_to_renderer(&mut renderer, &ViewInfo::default());
        let empty = SceneNode::new_model("empty", None, ModelLayer::World);
        empty.add_to_renderer(&mut renderer, &ViewInfo::default());

        assert!(renderer.opaque_bucket().is_empty());
    }

    #[test]
    fn test_alpha_disabled_unless_forced() {
        let mut renderer = renderer();
        renderer.toggle_alpha_disabled(true);
        renderer.begin_frame();

        let plain = SceneNode::new_model("a", Some(Rc::new(glass_plane(1))), ModelLayer::World);
        plain.add_to_renderer(&mut renderer, &ViewInfo::default());
        assert_eq!(renderer.opaque_bucket().len(), 1);
        assert!(renderer.transparent_bucket().is_empty());

        let forced = SceneNode::new_model("b", Some(Rc::new(glass_plane(2))), ModelLayer::World);
        forced.set_force_alpha(true);
        forced.add_to_renderer(&mut renderer, &ViewInfo::default());
        assert_eq!(renderer.transparent_bucket().len(), 1);
    }

    #[test]
    fn test_frustum_culls_offscreen_node() {
        let camera = crate::render::camera::Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
        let view = ViewInfo::from_camera(&camera, RenderOptions::default());
        let node = SceneNode::new_model("behind", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        node.set_position(Vec3::new(0.0, 0.0, 50.0));

        let mut renderer = renderer();
        renderer.begin_frame();
        node.add_to_renderer(&mut renderer, &view);
        assert!(renderer.opaque_bucket().is_empty());
    }

    #[test]
    fn test_exact_hit_reports_world_distance_under_scale() {
        let node = SceneNode::new_model("cube", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        node.set_scale(Vec3::new(1.0, 1.0, 3.0));
        node.set_rotation(Quat::identity());
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));

        let hit = node.ray_node_intersect_test(&ray, 0, &ViewInfo::default());
        assert!(hit.hit);
        assert_relative_eq!(hit.distance, 7.0, epsilon = 1e-4);
        assert_eq!(hit.component, 0);
    }

    #[test]
    fn test_exact_miss_after_box_hit() {
        // Ray crosses the quad's bounds edge-on but misses the triangles
        let node = SceneNode::new_model("glass", Some(Rc::new(glass_plane(1))), ModelLayer::World);
        node.set_position(Vec3::new(0.0, 0.0, 0.0));
        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(node.world_aabox().intersect_ray(&ray).is_some());

        let hit = node.ray_node_intersect_test(&ray, 0, &ViewInfo::default());
        assert!(!hit.hit);
    }

    #[test]
    fn test_backface_hit_depends_on_culling() {
        let node = SceneNode::new_model("glass", Some(Rc::new(glass_plane(1))), ModelLayer::World);
        let from_behind = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));

        let culled = ViewInfo::default();
        assert!(!node.ray_node_intersect_test(&from_behind, 0, &culled).hit);

        let mut open = ViewInfo::default();
        open.render_options.remove(RenderOptions::ENABLE_BACKFACE_CULL);
        assert!(node.ray_node_intersect_test(&from_behind, 0, &open).hit);
    }
}
