//! # Two-Phase Ray Picking
//!
//! Picking runs in two passes over the scene:
//!
//! 1. **Broad**: every node tests the ray against its world bounds and, on
//!    a hit, registers one or more candidates (node + component).
//! 2. **Narrow**: only the candidates run the exact geometry test; the
//!    closest hit wins.
//!
//! Candidates are kept in registration order (scene traversal order). Only
//! a strictly smaller distance replaces the current best, so on a tie the
//! first candidate encountered is returned. No epsilon is applied beyond
//! the geometry test's own precision.

use std::rc::Rc;

use crate::foundation::math::Ray;
use crate::model::Model;
use crate::render::renderable::ComponentId;
use crate::scene::node::SceneNode;
use crate::scene::view_info::ViewInfo;

/// Result of a ray query
#[derive(Debug, Clone)]
pub struct RayIntersection {
    /// Whether anything was hit
    pub hit: bool,
    /// World-space distance from the ray origin (infinite on a miss)
    pub distance: f32,
    /// Node that was hit
    pub node: Option<Rc<SceneNode>>,
    /// Component of the node that was hit
    pub component: ComponentId,
}

impl RayIntersection {
    /// A miss
    pub fn miss() -> Self {
        Self {
            hit: false,
            distance: f32::INFINITY,
            node: None,
            component: -1,
        }
    }

    /// A hit on `component` of `node` at world distance `distance`
    pub fn hit(distance: f32, node: Rc<SceneNode>, component: ComponentId) -> Self {
        Self {
            hit: true,
            distance,
            node: Some(node),
            component,
        }
    }
}

/// A node (or one of its surfaces) whose bounds the ray crossed
#[derive(Debug, Clone)]
struct Candidate {
    node: Rc<SceneNode>,
    component: ComponentId,
}

/// Collects broad-phase candidates for one ray and resolves the closest exact hit
#[derive(Debug)]
pub struct RayCollisionTester {
    ray: Ray,
    candidates: Vec<Candidate>,
}

impl RayCollisionTester {
    /// Start a query for `ray`
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            candidates: Vec::new(),
        }
    }

    /// The world-space ray being tested
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    /// Register one candidate
    pub fn add_node(&mut self, node: Rc<SceneNode>, component: ComponentId) {
        self.candidates.push(Candidate { node, component });
    }

    /// Register each surface of `model` whose world bounds the ray crosses
    pub fn add_node_model(&mut self, node: &Rc<SceneNode>, model: &Model) {
        let world = node.transform();
        for (index, surface) in model.surfaces().iter().enumerate() {
            let Ok(component) = ComponentId::try_from(index) else {
                break;
            };
            if surface.aabox().transformed(&world).intersect_ray(&self.ray).is_some() {
                self.add_node(Rc::clone(node), component);
            }
        }
    }

    /// Number of registered candidates
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Run the exact test on every candidate and return the closest hit
    pub fn test_nodes(&self, view: &ViewInfo) -> RayIntersection {
        let mut best = RayIntersection::miss();
        for candidate in &self.candidates {
            let result = candidate
                .node
                .ray_node_intersect_test(&self.ray, candidate.component, view);
            if result.hit && (!best.hit || result.distance < best.distance) {
                best = result;
            }
        }

        if best.hit {
            log::trace!(
                "Ray hit {:?} component {} at {:.3}",
                best.node.as_ref().map(|n| n.name()),
                best.component,
                best.distance
            );
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::model::tests::{glass_plane, opaque_cube};
    use crate::model::{Material, MaterialSet, ModelId, Surface};
    use crate::scene::model_node::ModelLayer;
    use approx::assert_relative_eq;

    fn down_z() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_empty_tester_misses() {
        let tester = RayCollisionTester::new(down_z());
        let result = tester.test_nodes(&ViewInfo::default());
        assert!(!result.hit);
        assert!(result.node.is_none());
    }

    #[test]
    fn test_closest_candidate_wins() {
        let far = SceneNode::new_model("far", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        let near = SceneNode::new_model("near", Some(Rc::new(opaque_cube(2))), ModelLayer::World);
        near.set_position(Vec3::new(0.0, 0.0, 4.0));

        let mut tester = RayCollisionTester::new(down_z());
        tester.add_node(far.clone(), 0);
        tester.add_node(near.clone(), 0);
        let result = tester.test_nodes(&ViewInfo::default());

        assert!(result.hit);
        assert!(Rc::ptr_eq(result.node.as_ref().unwrap(), &near));
        assert_relative_eq!(result.distance, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_equal_distance_keeps_first_in_traversal_order() {
        let first = SceneNode::new_model("first", Some(Rc::new(glass_plane(1))), ModelLayer::World);
        let second = SceneNode::new_model("second", Some(Rc::new(glass_plane(2))), ModelLayer::World);

        let mut tester = RayCollisionTester::new(down_z());
        tester.add_node(first.clone(), 0);
        tester.add_node(second.clone(), 0);
        let result = tester.test_nodes(&ViewInfo::default());
        assert!(Rc::ptr_eq(result.node.as_ref().unwrap(), &first));

        let mut reversed = RayCollisionTester::new(down_z());
        reversed.add_node(second.clone(), 0);
        reversed.add_node(first, 0);
        let result = reversed.test_nodes(&ViewInfo::default());
        assert!(Rc::ptr_eq(result.node.as_ref().unwrap(), &second));
    }

    #[test]
    fn test_broad_hit_exact_miss_reports_no_hit() {
        // A single triangle only fills half of its bounding square
        let triangle = Surface::new(
            vec![[Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]],
            0,
        );
        let model = Model::new(
            ModelId(5),
            "wedge.cmdl",
            vec![triangle],
            vec![MaterialSet::new(vec![Material::opaque("metal")])],
        );
        let node = SceneNode::new_model("wedge", Some(Rc::new(model)), ModelLayer::World);
        let ray = Ray::new(Vec3::new(0.8, 0.8, 10.0), Vec3::new(0.0, 0.0, -1.0));

        let mut tester = RayCollisionTester::new(ray);
        node.ray_aabox_intersect_test(&mut tester, &ViewInfo::default());
        assert_eq!(tester.candidate_count(), 1);

        let result = tester.test_nodes(&ViewInfo::default());
        assert!(!result.hit);
        assert!(result.node.is_none());
    }

    #[test]
    fn test_add_node_model_registers_hit_surfaces_only() {
        let node = SceneNode::new_model("cube", Some(Rc::new(opaque_cube(1))), ModelLayer::World);
        let model = Rc::new(opaque_cube(1));

        let mut tester = RayCollisionTester::new(down_z());
        tester.add_node_model(&node, &model);
        assert_eq!(tester.candidate_count(), 1);

        let mut off_axis = RayCollisionTester::new(Ray::new(Vec3::new(5.0, 5.0, 10.0), Vec3::new(0.0, 0.0, -1.0)));
        off_axis.add_node_model(&node, &model);
        assert_eq!(off_axis.candidate_count(), 0);
    }
}
