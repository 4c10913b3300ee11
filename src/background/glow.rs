use bevy::prelude::*;
use bevy::render::render_resource::AsBindGroup;
use bevy::shader::ShaderRef;

use super::GlowSettings;

/// Additive glow plane drawn just above the grid base.
///
/// `params = (pointer.x, pointer.y, time, radius)` in world space; the plane
/// moves with the grid, but the pointer stays unshifted because the shader
/// works from world positions. `tuning = (flow_speed, fade, 0, 0)`.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct GlowMaterial {
    /// Pointer xy, elapsed seconds, glow radius.
    #[uniform(0)]
    pub params: Vec4,
    /// Flow speed, fade-in factor.
    #[uniform(1)]
    pub tuning: Vec4,
    /// Linear colour under the pointer.
    #[uniform(2)]
    pub hover_color: Vec4,
    /// Linear colour of the ambient flow.
    #[uniform(3)]
    pub flow_color: Vec4,
}

fn linear_vec4(color: Color) -> Vec4 {
    let c = color.to_linear();
    Vec4::new(c.red, c.green, c.blue, c.alpha)
}

impl GlowMaterial {
    /// Glow with the pointer far away and the fade at zero.
    pub fn from_settings(g: &GlowSettings) -> Self {
        let pointer = crate::math::FAR_POINTER;
        Self {
            params: Vec4::new(pointer.x, pointer.y, 0.0, g.radius),
            tuning: Vec4::new(g.flow_speed, 0.0, 0.0, 0.0),
            hover_color: linear_vec4(g.hover_color),
            flow_color: linear_vec4(g.flow_color),
        }
    }

    /// Pushes this frame's pointer, clock and fade.
    pub fn set_frame(&mut self, world_pointer: Vec2, time: f32, fade: f32) {
        self.params.x = world_pointer.x;
        self.params.y = world_pointer.y;
        self.params.z = time;
        self.tuning.y = fade.clamp(0.0, 1.0);
    }
}

impl Material for GlowMaterial {
    fn fragment_shader() -> ShaderRef {
        "shaders/glow.wgsl".into()
    }

    fn alpha_mode(&self) -> AlphaMode {
        AlphaMode::Add
    }
}
