//! # Render Buckets
//!
//! A bucket collects the draw entries of one blend category for a single
//! frame. The renderer owns two: opaque entries sorted front-to-back so
//! early depth rejection discards hidden pixels, and transparent entries
//! sorted back-to-front so blending composites in painter's order.
//!
//! ## Lifecycle
//!
//! - **clear** at frame start (capacity is kept, so steady-state frames do
//!   not allocate)
//! - **add** during scene traversal
//! - **sort** against the camera before drawing
//! - **draw** once, establishing per-command GPU state for each entry

use std::rc::Weak;

use crate::foundation::math::Vec3;
use crate::render::camera::Camera;
use crate::render::draw_context::DrawContext;
use crate::render::options::{RenderCommand, RenderOptions};
use crate::render::pipeline::PipelineState;
use crate::render::renderable::{ComponentId, Renderable};
use crate::scene::bounds::AABox;
use crate::scene::view_info::ViewInfo;

/// A pending draw for one renderable (or one of its sub-surfaces)
#[derive(Clone)]
pub struct RenderEntry {
    /// Renderable to draw; the bucket never keeps it alive
    pub renderable: Weak<dyn Renderable>,

    /// Owner-defined sub-component (`-1` for the whole renderable)
    pub component: ComponentId,

    /// World-space bounds used for depth ordering
    pub aabox: AABox,

    /// What to draw and which GPU state it implies
    pub command: RenderCommand,
}

impl RenderEntry {
    /// Create an entry
    pub fn new(
        renderable: Weak<dyn Renderable>,
        component: ComponentId,
        aabox: AABox,
        command: RenderCommand,
    ) -> Self {
        Self {
            renderable,
            component,
            aabox,
            command,
        }
    }

    /// Distance of the box's nearest corner along the camera's view direction.
    ///
    /// Unbounded boxes can produce NaN; those count as infinitely far.
    fn depth(&self, camera_position: &Vec3, direction: &Vec3) -> f32 {
        let closest = self.aabox.closest_point_along(direction);
        let depth = (closest - camera_position).dot(direction);
        if depth.is_nan() {
            f32::INFINITY
        } else {
            depth
        }
    }

    fn is_overlay(&self) -> bool {
        self.command != RenderCommand::DrawMesh
    }
}

impl std::fmt::Debug for RenderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEntry")
            .field("alive", &(self.renderable.strong_count() > 0))
            .field("component", &self.component)
            .field("aabox", &self.aabox)
            .field("command", &self.command)
            .finish()
    }
}

/// Sort policy fixed per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Nearest first (opaque geometry)
    FrontToBack,
    /// Farthest first (blended geometry)
    BackToFront,
}

/// Per-frame ordered list of draw entries for one blend category
#[derive(Debug)]
pub struct RenderBucket {
    entries: Vec<RenderEntry>,
    order: SortOrder,
}

impl RenderBucket {
    /// Create an empty bucket with the given sort policy
    pub fn new(order: SortOrder) -> Self {
        Self {
            entries: Vec::new(),
            order,
        }
    }

    /// Sort policy of this bucket
    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Append an entry
    pub fn add(&mut self, entry: RenderEntry) {
        self.entries.push(entry);
    }

    /// Order entries by depth from `camera` according to the bucket's policy.
    ///
    /// Selection and extras overlays always follow every mesh entry. The sort
    /// is stable: entries at equal depth keep submission order.
    pub fn sort(&mut self, camera: &Camera) {
        let position = camera.position;
        let direction = camera.direction();
        let order = self.order;

        self.entries.sort_by(|a, b| {
            let da = a.depth(&position, &direction);
            let db = b.depth(&position, &direction);
            let by_depth = match order {
                SortOrder::FrontToBack => da.total_cmp(&db),
                SortOrder::BackToFront => db.total_cmp(&da),
            };
            a.is_overlay().cmp(&b.is_overlay()).then(by_depth)
        });
    }

    /// Remove every entry, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Draw every entry in its current order.
    ///
    /// `base` is the bucket's GPU state; each entry's command derives its own
    /// state from it before the renderable is invoked.
    pub fn draw(&self, ctx: &mut DrawContext<'_>, base: PipelineState, options: RenderOptions, view: &ViewInfo) {
        for entry in &self.entries {
            let Some(renderable) = entry.renderable.upgrade() else {
                log::trace!("Skipping dropped renderable (component {})", entry.component);
                continue;
            };

            ctx.set_pipeline_state(&entry.command.pipeline_state(base));
            match entry.command {
                RenderCommand::DrawMesh => renderable.draw(ctx, options, entry.component, view),
                RenderCommand::DrawSelection => renderable.draw_selection(ctx),
                RenderCommand::DrawExtras => renderable.draw_extras(ctx, view),
            }
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in their current order
    pub fn entries(&self) -> &[RenderEntry] {
        &self.entries
    }

    /// Allocated capacity
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }
}
