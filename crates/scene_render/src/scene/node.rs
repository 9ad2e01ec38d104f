//! # Scene Nodes
//!
//! A [`SceneNode`] is a named graph node with a local transform, flags and
//! a closed set of content kinds. Nodes are shared as `Rc<SceneNode>`:
//! children are owned by their parent, parents are weak back-references,
//! and render buckets only hold weak references for one frame.
//!
//! ## Lazy world transform
//!
//! Mutating a node's position, rotation or scale marks it and every
//! descendant dirty. The world matrix and world bounds are recomputed from
//! the parent chain on the next read, never eagerly.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::foundation::math::{Color, Mat4, Quat, Ray, Transform, Vec3};
use crate::model::Model;
use crate::picking::ray_tester::{RayCollisionTester, RayIntersection};
use crate::render::draw_context::DrawContext;
use crate::render::lighting::Light;
use crate::render::options::RenderOptions;
use crate::render::renderable::{ComponentId, Renderable};
use crate::render::renderer::Renderer;
use crate::scene::bounds::AABox;
use crate::scene::light_node::LightNode;
use crate::scene::model_node::{ModelLayer, ModelNode};
use crate::scene::view_info::ViewInfo;

bitflags::bitflags! {
    /// Per-node state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        /// Selected in the editor
        const SELECTED = 1 << 0;
        /// Drawn and pickable (hiding a node hides its subtree)
        const VISIBLE = 1 << 1;
        /// Lit by the scene lighting environment
        const LIGHTING_ENABLED = 1 << 2;
        /// Keep blending even when the renderer disables alpha
        const FORCE_ALPHA = 1 << 3;
        /// Under the mouse cursor
        const HOVERED = 1 << 4;
        /// Selected but protected from editing
        const LOCKED = 1 << 5;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::LIGHTING_ENABLED
    }
}

/// What a node contains
#[derive(Debug)]
pub enum NodeKind {
    /// Grouping node without content
    Root,
    /// Model instance
    Model(ModelNode),
    /// Editor light
    Light(LightNode),
}

/// A node in the scene graph
pub struct SceneNode {
    name: RefCell<String>,
    this: Weak<SceneNode>,
    parent: RefCell<Weak<SceneNode>>,
    children: RefCell<Vec<Rc<SceneNode>>>,
    local: Cell<Transform>,
    world: Cell<Mat4>,
    world_aabox: Cell<AABox>,
    dirty: Cell<bool>,
    flags: Cell<NodeFlags>,
    kind: RefCell<NodeKind>,
}

impl SceneNode {
    /// Create a detached node
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|this| Self {
            name: RefCell::new(name),
            this: this.clone(),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            local: Cell::new(Transform::identity()),
            world: Cell::new(Mat4::identity()),
            world_aabox: Cell::new(AABox::EMPTY),
            dirty: Cell::new(true),
            flags: Cell::new(NodeFlags::default()),
            kind: RefCell::new(kind),
        })
    }

    /// Create a grouping node
    pub fn new_root(name: impl Into<String>) -> Rc<Self> {
        Self::new(name, NodeKind::Root)
    }

    /// Create a model node on the given layer
    pub fn new_model(name: impl Into<String>, model: Option<Rc<Model>>, layer: ModelLayer) -> Rc<Self> {
        Self::new(name, NodeKind::Model(ModelNode::new(model, layer)))
    }

    /// Create a light node
    pub fn new_light(name: impl Into<String>, light: Light) -> Rc<Self> {
        let node = Self::new(name, NodeKind::Light(LightNode::new(light)));
        node.set_flag(NodeFlags::LIGHTING_ENABLED, false);
        node
    }

    /// Strong handle to this node
    ///
    /// Nodes only exist behind an `Rc`, so this is `None` only while the
    /// node is being dropped.
    pub fn handle(&self) -> Option<Rc<Self>> {
        self.this.upgrade()
    }

    pub(crate) fn renderable(&self) -> Weak<dyn Renderable> {
        self.this.clone()
    }

    // ---- Identity and hierarchy ----

    /// Node name
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    /// Rename the node
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = name.into();
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<Rc<Self>> {
        self.parent.borrow().upgrade()
    }

    /// Snapshot of the children in order
    pub fn children(&self) -> Vec<Rc<Self>> {
        self.children.borrow().clone()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    /// Attach `child` as the last child, detaching it from any previous parent
    pub fn add_child(&self, child: Rc<Self>) {
        if let Some(old) = child.parent() {
            old.remove_child(&child);
        }
        *child.parent.borrow_mut() = self.this.clone();
        child.mark_dirty();
        self.children.borrow_mut().push(child);
    }

    /// Detach `child`; returns whether it was a child of this node
    pub fn remove_child(&self, child: &Rc<Self>) -> bool {
        let mut children = self.children.borrow_mut();
        let before = children.len();
        children.retain(|c| !Rc::ptr_eq(c, child));
        let removed = children.len() != before;
        drop(children);

        if removed {
            *child.parent.borrow_mut() = Weak::new();
            child.mark_dirty();
        }
        removed
    }

    // ---- Transform ----

    /// Local transform
    pub fn local_transform(&self) -> Transform {
        self.local.get()
    }

    /// Replace the local transform
    pub fn set_local_transform(&self, transform: Transform) {
        self.local.set(transform);
        self.mark_dirty();
    }

    /// Set the local position
    pub fn set_position(&self, position: Vec3) {
        let mut local = self.local.get();
        local.position = position;
        self.set_local_transform(local);
    }

    /// Set the local rotation
    pub fn set_rotation(&self, rotation: Quat) {
        let mut local = self.local.get();
        local.rotation = rotation;
        self.set_local_transform(local);
    }

    /// Set the local scale
    pub fn set_scale(&self, scale: Vec3) {
        let mut local = self.local.get();
        local.scale = scale;
        self.set_local_transform(local);
    }

    fn mark_dirty(&self) {
        self.dirty.set(true);
        for child in self.children.borrow().iter() {
            child.mark_dirty();
        }
    }

    fn refresh(&self) {
        if !self.dirty.get() {
            return;
        }
        let parent_world = self.parent().map_or_else(Mat4::identity, |p| p.transform());
        let world = parent_world * self.local.get().to_matrix();
        self.world.set(world);
        self.world_aabox.set(self.local_aabox().transformed(&world));
        self.dirty.set(false);
    }

    /// World transform, recomputed if this node or an ancestor changed
    pub fn transform(&self) -> Mat4 {
        self.refresh();
        self.world.get()
    }

    /// World position
    pub fn world_position(&self) -> Vec3 {
        self.transform().fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Bounds of the node's own content in local space
    pub fn local_aabox(&self) -> AABox {
        match &*self.kind.borrow() {
            NodeKind::Root => AABox::EMPTY,
            NodeKind::Model(model) => model.local_aabox(),
            NodeKind::Light(_) => LightNode::local_aabox(),
        }
    }

    /// Local bounds transformed into world space
    pub fn world_aabox(&self) -> AABox {
        self.refresh();
        self.world_aabox.get()
    }

    // ---- Flags ----

    /// All flags
    pub fn flags(&self) -> NodeFlags {
        self.flags.get()
    }

    /// Set or clear a flag
    pub fn set_flag(&self, flag: NodeFlags, enabled: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, enabled);
        self.flags.set(flags);
    }

    /// Whether the node is selected
    pub fn is_selected(&self) -> bool {
        self.flags().contains(NodeFlags::SELECTED)
    }

    /// Select or deselect
    pub fn set_selected(&self, selected: bool) {
        self.set_flag(NodeFlags::SELECTED, selected);
    }

    /// Whether the node (and therefore its subtree) is shown
    pub fn is_visible(&self) -> bool {
        self.flags().contains(NodeFlags::VISIBLE)
    }

    /// Show or hide the node
    pub fn set_visible(&self, visible: bool) {
        self.set_flag(NodeFlags::VISIBLE, visible);
    }

    /// Whether scene lighting applies
    pub fn lighting_enabled(&self) -> bool {
        self.flags().contains(NodeFlags::LIGHTING_ENABLED)
    }

    /// Enable or disable scene lighting
    pub fn set_lighting_enabled(&self, enabled: bool) {
        self.set_flag(NodeFlags::LIGHTING_ENABLED, enabled);
    }

    /// Whether blending survives the renderer's alpha-disabled toggle
    pub fn force_alpha_enabled(&self) -> bool {
        self.flags().contains(NodeFlags::FORCE_ALPHA)
    }

    /// Keep blending when the renderer disables alpha
    pub fn set_force_alpha(&self, enabled: bool) {
        self.set_flag(NodeFlags::FORCE_ALPHA, enabled);
    }

    /// Mark as hovered
    pub fn set_hovered(&self, hovered: bool) {
        self.set_flag(NodeFlags::HOVERED, hovered);
    }

    /// Lock against editing
    pub fn set_locked(&self, locked: bool) {
        self.set_flag(NodeFlags::LOCKED, locked);
    }

    /// Tint multiplied into the node's color
    pub fn tint_color(&self, view: &ViewInfo) -> Color {
        if !view.game_mode && self.flags().contains(NodeFlags::HOVERED) {
            Color::HOVER
        } else {
            Color::WHITE
        }
    }

    /// Wireframe color for the selection overlay
    pub fn wireframe_color(&self) -> Color {
        if self.flags().contains(NodeFlags::LOCKED) {
            Color::LOCKED
        } else {
            Color::SELECTION
        }
    }

    // ---- Content ----

    /// Content kind
    pub fn kind(&self) -> Ref<'_, NodeKind> {
        self.kind.borrow()
    }

    /// Model content, if this is a model node
    pub fn model_node(&self) -> Option<Ref<'_, ModelNode>> {
        Ref::filter_map(self.kind.borrow(), |kind| match kind {
            NodeKind::Model(model) => Some(model),
            _ => None,
        })
        .ok()
    }

    /// Mutable model content, if this is a model node
    pub fn model_node_mut(&self) -> Option<RefMut<'_, ModelNode>> {
        RefMut::filter_map(self.kind.borrow_mut(), |kind| match kind {
            NodeKind::Model(model) => Some(model),
            _ => None,
        })
        .ok()
    }

    /// Light content, if this is a light node
    pub fn light_node(&self) -> Option<Ref<'_, LightNode>> {
        Ref::filter_map(self.kind.borrow(), |kind| match kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        })
        .ok()
    }

    /// Replace the model of a model node; returns `false` for other kinds
    pub fn set_model(&self, model: Option<Rc<Model>>) -> bool {
        let Some(mut node) = self.model_node_mut() else {
            return false;
        };
        node.set_model(model);
        drop(node);
        self.mark_dirty();
        true
    }

    // ---- Frame and picking contract ----

    /// Queue this node's entries for the current frame
    pub fn add_to_renderer(&self, renderer: &mut Renderer, view: &ViewInfo) {
        match &*self.kind.borrow() {
            NodeKind::Root => {}
            NodeKind::Model(model) => model.add_to_renderer(self, renderer, view),
            NodeKind::Light(light) => light.add_to_renderer(self, renderer, view),
        }
    }

    /// Broad-phase ray test; registers candidates with the tester on a hit
    pub fn ray_aabox_intersect_test(&self, tester: &mut RayCollisionTester, view: &ViewInfo) {
        match &*self.kind.borrow() {
            NodeKind::Root => {}
            NodeKind::Model(model) => model.ray_aabox_intersect_test(self, tester, view),
            NodeKind::Light(light) => light.ray_aabox_intersect_test(self, tester, view),
        }
    }

    /// Exact ray test against one component of this node
    pub fn ray_node_intersect_test(&self, ray: &Ray, component: ComponentId, view: &ViewInfo) -> RayIntersection {
        match &*self.kind.borrow() {
            NodeKind::Root => RayIntersection::miss(),
            NodeKind::Model(model) => model.ray_node_intersect_test(self, ray, component, view),
            NodeKind::Light(_) => LightNode::ray_node_intersect_test(self, ray, component),
        }
    }
}

impl Renderable for SceneNode {
    fn draw(&self, ctx: &mut DrawContext<'_>, options: RenderOptions, component: ComponentId, view: &ViewInfo) {
        match &*self.kind.borrow() {
            NodeKind::Root => {}
            NodeKind::Model(model) => model.draw(self, ctx, options, component, view),
            NodeKind::Light(light) => light.draw(self, ctx, options, view),
        }
    }

    fn draw_selection(&self, ctx: &mut DrawContext<'_>) {
        match &*self.kind.borrow() {
            NodeKind::Root => {}
            NodeKind::Model(model) => model.draw_selection(self, ctx),
            NodeKind::Light(_) => LightNode::draw_selection(self, ctx),
        }
    }

    fn draw_extras(&self, ctx: &mut DrawContext<'_>, _view: &ViewInfo) {
        if let NodeKind::Light(light) = &*self.kind.borrow() {
            light.draw_extras(self, ctx);
        }
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &*self.name.borrow())
            .field("flags", &self.flags.get())
            .field("local", &self.local.get())
            .field("children", &self.children.borrow().len())
            .finish_non_exhaustive()
    }
}
