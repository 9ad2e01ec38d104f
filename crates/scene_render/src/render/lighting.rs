//! Lighting system
//!
//! Lights are plain data; nodes opt in or out of them per draw through
//! [`DrawContext`](crate::render::draw_context::DrawContext).

use crate::foundation::math::{Color, Vec3};

/// Maximum number of dynamic lights uploaded for a single draw
pub const MAX_LIGHTS: usize = 8;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight)
    Directional,
    /// Point light (like a lightbulb)
    Point,
    /// Spot light (like a flashlight)
    Spot,
}

/// Light source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light position (for point/spot lights)
    pub position: Vec3,
    /// Light direction (for directional/spot lights)
    pub direction: Vec3,
    /// Light color
    pub color: Color,
    /// Light range (for point/spot lights)
    pub range: f32,
    /// Cone angle for spot lights (in radians)
    pub cone_angle: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, color: Color) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.normalize(),
            color,
            range: 0.0,
            cone_angle: 0.0,
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, color: Color, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::zeros(),
            color,
            range,
            cone_angle: 0.0,
        }
    }

    /// Create a spot light
    pub fn spot(position: Vec3, direction: Vec3, color: Color, range: f32, cone_angle: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            color,
            range,
            cone_angle,
        }
    }
}

/// Ambient color plus dynamic lights applied to lit nodes
#[derive(Debug, Clone, PartialEq)]
pub struct LightingEnvironment {
    /// List of lights
    pub lights: Vec<Light>,
    /// Ambient light color
    pub ambient: Color,
}

impl LightingEnvironment {
    /// Create a new environment with no lights and black ambient
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            ambient: Color::BLACK,
        }
    }

    /// Add a light to the environment
    pub fn add_light(mut self, light: Light) -> Self {
        self.lights.push(light);
        self
    }

    /// Set ambient lighting
    pub fn with_ambient(mut self, ambient: Color) -> Self {
        self.ambient = ambient;
        self
    }

    /// Editor default: gray ambient and a key/fill directional pair
    pub fn default_editor() -> Self {
        Self::new()
            .with_ambient(Color::new(0.5, 0.5, 0.5, 1.0))
            .add_light(Light::directional(
                Vec3::new(0.0, -0.866, -0.5),
                Color::new(0.3, 0.3, 0.3, 1.0),
            ))
            .add_light(Light::directional(
                Vec3::new(0.0, 0.866, 0.5),
                Color::new(0.3, 0.3, 0.3, 1.0),
            ))
    }

    /// Lights actually uploaded; extras beyond [`MAX_LIGHTS`] are dropped
    pub fn active_lights(&self) -> &[Light] {
        &self.lights[..self.lights.len().min(MAX_LIGHTS)]
    }
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self::default_editor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_lights_are_capped() {
        let mut env = LightingEnvironment::new();
        for i in 0..12 {
            env = env.add_light(Light::point(Vec3::new(i as f32, 0.0, 0.0), Color::WHITE, 5.0));
        }
        assert_eq!(env.active_lights().len(), MAX_LIGHTS);
    }

    #[test]
    fn test_default_editor_lighting() {
        let env = LightingEnvironment::default();
        assert_eq!(env.lights.len(), 2);
        assert_eq!(env.ambient, Color::new(0.5, 0.5, 0.5, 1.0));
    }
}
