//! Procedural models for the demo scene

use scene_render::prelude::*;

/// Axis-aligned box spanning `[-half, half]` with outward-facing triangles
pub fn box_surface(half: Vec3, material: usize) -> Surface {
    let v = |x: f32, y: f32, z: f32| Vec3::new(x * half.x, y * half.y, z * half.z);
    let faces = [
        [v(-1., -1., 1.), v(1., -1., 1.), v(1., 1., 1.), v(-1., 1., 1.)],
        [v(1., -1., -1.), v(-1., -1., -1.), v(-1., 1., -1.), v(1., 1., -1.)],
        [v(1., -1., 1.), v(1., -1., -1.), v(1., 1., -1.), v(1., 1., 1.)],
        [v(-1., -1., -1.), v(-1., -1., 1.), v(-1., 1., 1.), v(-1., 1., -1.)],
        [v(-1., 1., 1.), v(1., 1., 1.), v(1., 1., -1.), v(-1., 1., -1.)],
        [v(-1., -1., -1.), v(1., -1., -1.), v(1., -1., 1.), v(-1., -1., 1.)],
    ];
    let triangles = faces
        .iter()
        .flat_map(|[a, b, c, d]| [[*a, *b, *c], [*a, *c, *d]])
        .collect();
    Surface::new(triangles, material)
}

/// Square in the XY plane facing +Z
pub fn quad_surface(half: f32, material: usize) -> Surface {
    let a = Vec3::new(-half, -half, 0.0);
    let b = Vec3::new(half, -half, 0.0);
    let c = Vec3::new(half, half, 0.0);
    let d = Vec3::new(-half, half, 0.0);
    Surface::new(vec![[a, b, c], [a, c, d]], material)
}

/// Stone pillar: one opaque surface
pub fn pillar(id: u32) -> Model {
    Model::new(
        ModelId(id),
        "pillar.cmdl",
        vec![box_surface(Vec3::new(1.0, 3.0, 1.0), 0)],
        vec![MaterialSet::new(vec![Material::opaque("stone")])],
    )
}

/// Framed window: opaque frame plus a glass pane, with a second material
/// set where the pane is shuttered
pub fn window(id: u32) -> Model {
    Model::new(
        ModelId(id),
        "window.cmdl",
        vec![box_surface(Vec3::new(2.0, 2.0, 0.1), 0), quad_surface(1.8, 1)],
        vec![
            MaterialSet::new(vec![Material::opaque("frame"), Material::transparent("glass")]),
            MaterialSet::new(vec![Material::opaque("frame"), Material::opaque("shutter")]),
        ],
    )
}

/// Large flat floor
pub fn floor(id: u32) -> Model {
    Model::new(
        ModelId(id),
        "floor.cmdl",
        vec![box_surface(Vec3::new(20.0, 0.1, 20.0), 0)],
        vec![MaterialSet::new(vec![Material::opaque("tiles")])],
    )
}

/// Inverted sky box
pub fn sky(id: u32) -> Model {
    Model::new(
        ModelId(id),
        "sky.cmdl",
        vec![box_surface(Vec3::new(500.0, 500.0, 500.0), 0)],
        vec![MaterialSet::new(vec![Material::opaque("sky")])],
    )
}
