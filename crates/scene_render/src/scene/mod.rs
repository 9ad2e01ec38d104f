//! Scene graph
//!
//! Nodes, bounds and the per-view state consulted while walking the graph.
//!
//! ## Architecture
//!
//! ```text
//! Scene (owns root)
//!   └─ SceneNode ── NodeKind::{Root, Model, Light}
//!        │  add_to_renderer ─► Renderer buckets
//!        │  ray_*_intersect_test ─► RayCollisionTester
//!        └─ children…
//! ```

pub mod bounds;
pub mod light_node;
pub mod model_node;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod view_info;

pub use bounds::{AABox, Frustum, Plane};
pub use light_node::LightNode;
pub use model_node::{ModelLayer, ModelNode};
pub use node::{NodeFlags, NodeKind, SceneNode};
pub use scene::Scene;
pub use view_info::ViewInfo;
