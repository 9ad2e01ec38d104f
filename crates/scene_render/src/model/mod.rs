//! Model data consumed by the scene
//!
//! Models, surfaces and materials are produced by the asset loader, which
//! lives outside this crate. The scene only relies on the capability set
//! exposed here: transparency queries per material set, per-surface access,
//! exact ray intersection and drawing through a [`DrawContext`].

use crate::foundation::math::{Color, Ray, Vec3};
use crate::render::backend::Geometry;
use crate::render::draw_context::DrawContext;
use crate::render::options::RenderOptions;
use crate::scene::bounds::AABox;

/// Identifier the graphics backend uses to locate a model's GPU buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

/// How a material combines with what is already in the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialBlend {
    /// Writes color and depth, no blending
    #[default]
    Opaque,
    /// Standard `src_alpha, 1 - src_alpha` blending
    AlphaBlend,
    /// `one, one` additive blending
    Additive,
}

impl MaterialBlend {
    /// Whether surfaces using this blend need back-to-front ordering
    pub fn is_transparent(self) -> bool {
        !matches!(self, Self::Opaque)
    }
}

/// A single material
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Name for debugging
    pub name: String,
    /// Blend mode
    pub blend: MaterialBlend,
}

impl Material {
    /// Create an opaque material
    pub fn opaque(name: impl Into<String>) -> Self {
        Self { name: name.into(), blend: MaterialBlend::Opaque }
    }

    /// Create an alpha-blended material
    pub fn transparent(name: impl Into<String>) -> Self {
        Self { name: name.into(), blend: MaterialBlend::AlphaBlend }
    }
}

/// One alternative set of materials for a model (e.g. damage states)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialSet {
    /// Materials indexed by [`Surface::material`]
    pub materials: Vec<Material>,
}

impl MaterialSet {
    /// Create a material set
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials }
    }
}

/// A drawable part of a model with a single material
#[derive(Debug, Clone)]
pub struct Surface {
    triangles: Vec<[Vec3; 3]>,
    material: usize,
    aabox: AABox,
}

impl Surface {
    /// Create a surface from counter-clockwise triangles
    pub fn new(triangles: Vec<[Vec3; 3]>, material: usize) -> Self {
        let aabox = AABox::from_points(triangles.iter().flatten());
        Self { triangles, material, aabox }
    }

    /// Material index into the active [`MaterialSet`]
    pub fn material(&self) -> usize {
        self.material
    }

    /// Local-space bounds
    pub fn aabox(&self) -> AABox {
        self.aabox
    }

    /// Triangles in local space
    pub fn triangles(&self) -> &[[Vec3; 3]] {
        &self.triangles
    }

    /// Closest ray parameter at which the ray hits this surface.
    ///
    /// Back-facing triangles are ignored unless `allow_backfaces` is set.
    pub fn intersects_ray(&self, ray: &Ray, allow_backfaces: bool) -> Option<f32> {
        if self.aabox.intersect_ray(ray).is_none() {
            return None;
        }
        self.triangles
            .iter()
            .filter_map(|tri| intersect_triangle(ray, tri, allow_backfaces))
            .min_by(f32::total_cmp)
    }
}

/// Möller-Trumbore ray-triangle intersection, returning `t` on a hit
fn intersect_triangle(ray: &Ray, [v0, v1, v2]: &[Vec3; 3], allow_backfaces: bool) -> Option<f32> {
    const EPSILON: f32 = 0.000_001;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Parallel, or facing away while culling
    if a.abs() < EPSILON || (!allow_backfaces && a < 0.0) {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t >= 0.0).then_some(t)
}

/// A loaded model: surfaces plus one or more material sets
#[derive(Debug, Clone)]
pub struct Model {
    id: ModelId,
    source: String,
    surfaces: Vec<Surface>,
    material_sets: Vec<MaterialSet>,
    aabox: AABox,
}

impl Model {
    /// Create a model
    pub fn new(
        id: ModelId,
        source: impl Into<String>,
        surfaces: Vec<Surface>,
        material_sets: Vec<MaterialSet>,
    ) -> Self {
        let aabox = surfaces
            .iter()
            .fold(AABox::EMPTY, |acc, s| acc.union(&s.aabox()));
        Self {
            id,
            source: source.into(),
            surfaces,
            material_sets,
            aabox,
        }
    }

    /// Backend identifier
    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Name of the file this model came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Local-space bounds of all surfaces
    pub fn aabox(&self) -> AABox {
        self.aabox
    }

    /// Number of surfaces
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Number of material sets
    pub fn material_set_count(&self) -> usize {
        self.material_sets.len()
    }

    /// Surface by index
    pub fn surface(&self, index: usize) -> Option<&Surface> {
        self.surfaces.get(index)
    }

    /// All surfaces
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Out-of-range set indices fall back to the last set
    fn material_set(&self, set: usize) -> Option<&MaterialSet> {
        self.material_sets
            .get(set)
            .or_else(|| self.material_sets.last())
    }

    fn material(&self, set: usize, surface: &Surface) -> Option<&Material> {
        self.material_set(set)
            .and_then(|s| s.materials.get(surface.material))
    }

    /// Whether the surface uses a transparent material in `set`
    pub fn surface_is_transparent(&self, set: usize, index: usize) -> bool {
        self.surface(index)
            .and_then(|surface| self.material(set, surface))
            .is_some_and(|m| m.blend.is_transparent())
    }

    /// Whether any surface uses a transparent material in `set`
    pub fn has_transparency(&self, set: usize) -> bool {
        (0..self.surfaces.len()).any(|i| self.surface_is_transparent(set, i))
    }

    /// Draw every surface
    pub fn draw(&self, ctx: &mut DrawContext<'_>, options: RenderOptions, set: usize) {
        for index in 0..self.surfaces.len() {
            self.draw_surface(ctx, options, index, set);
        }
    }

    /// Draw a single surface; unknown indices are ignored
    pub fn draw_surface(&self, ctx: &mut DrawContext<'_>, options: RenderOptions, index: usize, set: usize) {
        let Some(surface) = self.surface(index) else {
            log::trace!("{}: no surface {}", self.source, index);
            return;
        };
        ctx.draw(
            Geometry::Surface {
                model: self.id,
                surface: index,
                material: surface.material,
                material_set: set.min(self.material_sets.len().saturating_sub(1)),
            },
            options,
        );
    }

    /// Draw all surfaces as a flat-colored wireframe
    pub fn draw_wireframe(&self, ctx: &mut DrawContext<'_>, color: Color) {
        ctx.draw_wireframe(Geometry::Model { model: self.id }, color);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit quad in the XY plane at z = 0, facing +Z
    pub(crate) fn quad_surface(material: usize) -> Surface {
        let a = Vec3::new(-1.0, -1.0, 0.0);
        let b = Vec3::new(1.0, -1.0, 0.0);
        let c = Vec3::new(1.0, 1.0, 0.0);
        let d = Vec3::new(-1.0, 1.0, 0.0);
        Surface::new(vec![[a, b, c], [a, c, d]], material)
    }

    /// Axis-aligned cube spanning [-1, 1] with outward-facing triangles
    pub(crate) fn cube_surface(material: usize) -> Surface {
        let v = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
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

    pub(crate) fn opaque_cube(id: u32) -> Model {
        Model::new(
            ModelId(id),
            "cube.cmdl",
            vec![cube_surface(0)],
            vec![MaterialSet::new(vec![Material::opaque("stone")])],
        )
    }

    pub(crate) fn glass_plane(id: u32) -> Model {
        Model::new(
            ModelId(id),
            "glass.cmdl",
            vec![quad_surface(0)],
            vec![MaterialSet::new(vec![Material::transparent("glass")])],
        )
    }

    #[test]
    fn test_surface_front_face_hit_distance() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let t = quad_surface(0).intersects_ray(&ray, false).unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_surface_backface_respects_culling() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(quad_surface(0).intersects_ray(&ray, false).is_none());
        assert!(quad_surface(0).intersects_ray(&ray, true).is_some());
    }

    #[test]
    fn test_cube_reports_nearest_face() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, -1.0));
        let t = cube_surface(0).intersects_ray(&ray, true).unwrap();
        assert_relative_eq!(t, 9.0, epsilon = 1e-5);
    }

    #[test]
    fn test_has_transparency_per_material_set() {
        let model = Model::new(
            ModelId(1),
            "door.cmdl",
            vec![quad_surface(0), quad_surface(1)],
            vec![
                MaterialSet::new(vec![Material::opaque("frame"), Material::opaque("panel")]),
                MaterialSet::new(vec![Material::opaque("frame"), Material::transparent("shield")]),
            ],
        );
        assert!(!model.has_transparency(0));
        assert!(model.has_transparency(1));
        assert!(model.surface_is_transparent(1, 1));
        assert!(!model.surface_is_transparent(1, 0));
        // Out-of-range sets fall back to the last one
        assert!(model.has_transparency(7));
    }

    #[test]
    fn test_model_without_material_sets_is_opaque() {
        let model = Model::new(ModelId(2), "bare.cmdl", vec![quad_surface(0)], Vec::new());
        assert!(!model.has_transparency(0));
        assert!(model.aabox().is_valid());
    }
}
