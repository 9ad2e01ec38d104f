//! Renderable trait
//!
//! Anything that can sit in a [`RenderBucket`](crate::render::bucket::RenderBucket)
//! implements [`Renderable`]. The bucket stores weak references, so a
//! renderable dropped between collection and drawing is simply skipped.

use crate::render::draw_context::DrawContext;
use crate::render::options::RenderOptions;
use crate::scene::view_info::ViewInfo;

/// Owner-defined sub-component identifier carried by bucket entries
pub type ComponentId = i32;

/// Component id meaning "everything the renderable owns"
pub const WHOLE_NODE: ComponentId = -1;

/// Something a bucket entry can draw
pub trait Renderable {
    /// Draw one entry.
    ///
    /// A negative `component` draws everything; otherwise only that
    /// sub-surface is drawn.
    fn draw(&self, ctx: &mut DrawContext<'_>, options: RenderOptions, component: ComponentId, view: &ViewInfo);

    /// Draw the selection wireframe overlay
    fn draw_selection(&self, ctx: &mut DrawContext<'_>);

    /// Draw editor decorations (light radii and similar)
    fn draw_extras(&self, _ctx: &mut DrawContext<'_>, _view: &ViewInfo) {}
}
