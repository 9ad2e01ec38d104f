//! Scene graph container and traversal
//!
//! [`Scene`] owns the root node and walks the graph in pre-order for the
//! two per-frame passes: collection into the renderer's buckets and ray
//! picking. Hidden nodes prune their whole subtree from both passes.

use std::rc::Rc;

use crate::foundation::math::Ray;
use crate::picking::ray_tester::{RayCollisionTester, RayIntersection};
use crate::render::renderer::Renderer;
use crate::scene::node::SceneNode;
use crate::scene::view_info::ViewInfo;

/// A scene graph rooted at a single content-less node
#[derive(Debug)]
pub struct Scene {
    root: Rc<SceneNode>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self {
            root: SceneNode::new_root("Root"),
        }
    }

    /// Root node
    pub fn root(&self) -> &Rc<SceneNode> {
        &self.root
    }

    /// Attach `node` under `parent` (the root when `None`) and return it
    pub fn add_node(&self, parent: Option<&Rc<SceneNode>>, node: Rc<SceneNode>) -> Rc<SceneNode> {
        let parent = parent.unwrap_or(&self.root);
        log::debug!("Adding node '{}' under '{}'", node.name(), parent.name());
        parent.add_child(Rc::clone(&node));
        node
    }

    /// Detach `node` (and its subtree) from the scene
    pub fn remove_node(&self, node: &Rc<SceneNode>) -> bool {
        match node.parent() {
            Some(parent) => parent.remove_child(node),
            None => false,
        }
    }

    /// First node in traversal order with the given name
    pub fn find_by_name(&self, name: &str) -> Option<Rc<SceneNode>> {
        let mut found = None;
        self.traverse(|node| {
            if found.is_none() && node.name() == name {
                found = Some(Rc::clone(node));
            }
        });
        found
    }

    /// Visit every node in pre-order, root first
    pub fn traverse(&self, mut visit: impl FnMut(&Rc<SceneNode>)) {
        fn walk(node: &Rc<SceneNode>, visit: &mut dyn FnMut(&Rc<SceneNode>)) {
            visit(node);
            for child in node.children() {
                walk(&child, visit);
            }
        }
        walk(&self.root, &mut visit);
    }

    /// Visit visible nodes in pre-order, skipping hidden subtrees
    fn traverse_visible(&self, mut visit: impl FnMut(&Rc<SceneNode>)) {
        fn walk(node: &Rc<SceneNode>, visit: &mut dyn FnMut(&Rc<SceneNode>)) {
            if !node.is_visible() {
                return;
            }
            visit(node);
            for child in node.children() {
                walk(&child, visit);
            }
        }
        walk(&self.root, &mut visit);
    }

    /// Number of nodes including the root
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        self.traverse(|_| count += 1);
        count
    }

    /// Queue every visible node's entries for the current frame
    pub fn add_to_renderer(&self, renderer: &mut Renderer, view: &ViewInfo) {
        self.traverse_visible(|node| node.add_to_renderer(renderer, view));
    }

    /// Closest node hit by `ray`
    pub fn ray_cast(&self, ray: &Ray, view: &ViewInfo) -> RayIntersection {
        let mut tester = RayCollisionTester::new(*ray);
        self.traverse_visible(|node| node.ray_aabox_intersect_test(&mut tester, view));
        log::trace!("Ray cast with {} candidates", tester.candidate_count());
        tester.test_nodes(view)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
