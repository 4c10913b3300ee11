//! Pure computation helpers extracted for testability.
//!
//! All functions in this module are free of Bevy ECS dependencies and operate
//! on plain numeric / `Vec2` / `Vec3` inputs, making them straightforward to
//! unit-test. The glow helpers mirror `assets/shaders/glow.wgsl` line for line.

use bevy::prelude::{Vec2, Vec3};

/// Pointer position used before any pointer movement and after the pointer
/// leaves the window. Far enough from the grid that every hover term is zero.
pub const FAR_POINTER: Vec2 = Vec2::new(999.0, 999.0);

/// Maps a noise value from the standard `[-1, 1]` range into `[min, max]`.
///
/// Noise generators (e.g. `Fbm<Perlin>`) produce values centred around zero.
/// This linearly rescales to an arbitrary output range.
///
/// # Examples
/// ```
/// # use hex_backdrop::math::map_noise_to_range;
/// assert_eq!(map_noise_to_range(-1.0, 0.0, 10.0), 0.0);
/// assert_eq!(map_noise_to_range( 1.0, 0.0, 10.0), 10.0);
/// assert_eq!(map_noise_to_range( 0.0, 2.0, 6.0),  4.0);
/// ```
pub fn map_noise_to_range(noise_val: f64, min: f32, max: f32) -> f32 {
    min + ((noise_val as f32 + 1.0) / 2.0) * (max - min)
}

/// Cubic ease-out curve: fast start, gentle deceleration.
///
/// `t` should be in `[0, 1]`. Returns `1 - (1 - t)^3`.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Computes the face normal of a triangle defined by three vertices.
///
/// Uses the cross product of edges `(v1 - v0)` and `(v2 - v0)`.
/// Returns `Vec3::ZERO` if the triangle is degenerate (collinear points).
pub fn compute_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    edge1.cross(edge2).normalize_or_zero()
}

/// Hermite interpolation between two edges, with shader semantics.
///
/// Reversed edges (`edge0 > edge1`) produce a falling curve, which is how the
/// hover and glow falloffs are written. Equal edges act as a step.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation `a + (b - a) * t`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Hover intensity for a cell at `distance` from the pointer.
///
/// `1.0` at distance zero, falling smoothly to exactly `0.0` at `hover_radius`
/// and staying there beyond it.
pub fn pointer_effect(distance: f32, hover_radius: f32) -> f32 {
    smoothstep(hover_radius, 0.0, distance)
}

/// One frame of exponential interpolation toward `target`.
///
/// With `factor` in `(0, 1]` the result never overshoots.
pub fn exp_smooth(current: f32, target: f32, factor: f32) -> f32 {
    current + (target - current) * factor
}

/// [`exp_smooth`] applied component-wise.
pub fn exp_smooth_vec2(current: Vec2, target: Vec2, factor: f32) -> Vec2 {
    current + (target - current) * factor
}

/// Vertical world-space translation for a page scrolled by `scroll_px`.
///
/// Pixels map to world units through `frustum_size / viewport_height`, then
/// slow down by `speed` so the background trails the foreground.
pub fn parallax_shift(scroll_px: f32, frustum_size: f32, viewport_height: f32, speed: f32) -> f32 {
    if viewport_height <= 0.0 {
        return 0.0;
    }
    scroll_px * (frustum_size / viewport_height) * speed
}

/// Converts a world-space pointer into the shifted grid's local space.
pub fn grid_local_pointer(world_pointer: Vec2, shift: f32) -> Vec2 {
    Vec2::new(world_pointer.x, world_pointer.y - shift)
}

// ── Glow noise ──────────────────────────────────────────────────────

fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// Pseudo-random value in `[0, 1)` for a lattice point.
pub fn hash2(p: Vec2) -> f32 {
    fract((p.dot(Vec2::new(12.9898, 78.233))).sin() * 43_758.547)
}

/// Smoothly interpolated value noise in `[0, 1]`.
pub fn value_noise(p: Vec2) -> f32 {
    let i = p.floor();
    let f = p - i;
    let u = f * f * (Vec2::splat(3.0) - 2.0 * f);

    let a = hash2(i);
    let b = hash2(i + Vec2::new(1.0, 0.0));
    let c = hash2(i + Vec2::new(0.0, 1.0));
    let d = hash2(i + Vec2::new(1.0, 1.0));

    lerp(lerp(a, b, u.x), lerp(c, d, u.x), u.y)
}

/// Per-pixel glow terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowSample {
    /// Radial pointer glow in `[0, 1]`; also the colour blend factor.
    pub hover: f32,
    /// Ambient flow contribution, clamped to `[0, 1]`.
    pub flow: f32,
    /// Final opacity, `clamp(hover * 0.85 + flow)`.
    pub alpha: f32,
}

/// Glow intensity at `world` for a pointer at `pointer` after `time` seconds.
pub fn glow_sample(world: Vec2, pointer: Vec2, time: f32, radius: f32, flow_speed: f32) -> GlowSample {
    let dist = world.distance(pointer);
    let hover = smoothstep(radius, 0.0, dist).powi(2);

    let time_speed = time * flow_speed;
    let uv1 = world * 0.15 + Vec2::new(time * 0.2, time_speed);
    let uv2 = world * 0.3 - Vec2::new(time * 0.1, time_speed * 1.5);
    let combined = value_noise(uv1) * 0.7 + value_noise(uv2) * 0.3;

    let distorted_y = world.y + combined * 8.0;
    let mut wave = ((distorted_y * 0.8 + time * 3.0).sin() + 1.0) * 0.5;
    wave *= smoothstep(0.35, 0.85, combined);
    let flow = (smoothstep(0.1, 0.9, wave) * 2.0).clamp(0.0, 1.0);

    let hover_term = (hover * 0.85).clamp(0.0, 1.0);
    GlowSample {
        hover,
        flow,
        alpha: (hover_term + flow).clamp(0.0, 1.0),
    }
}

// ── Face shading ────────────────────────────────────────────────────

/// Directions for the static per-face brightness terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceLights {
    /// Faces pointing this way get the full top term.
    pub top: Vec3,
    /// Warm upper-side highlight direction.
    pub upper: Vec3,
    /// Shadowed lower-side direction.
    pub lower: Vec3,
    /// Rim light from above the grid.
    pub rim: Vec3,
}

impl Default for FaceLights {
    fn default() -> Self {
        Self {
            top: Vec3::Z,
            upper: Vec3::new(0.0, 0.8, 0.6).normalize(),
            lower: Vec3::NEG_Y,
            rim: Vec3::new(0.0, 0.9, 0.4).normalize(),
        }
    }
}

/// Brightness multiplier for a face with unit `normal`, in `[0.15, 1.3]`.
///
/// Depends only on the face orientation: faces turned toward the upper and
/// rim lights come out brighter than faces turned away from them.
pub fn face_shade(normal: Vec3, lights: &FaceLights) -> f32 {
    let facing = |dir: Vec3| normal.dot(dir).max(0.0);

    let top = facing(lights.top).powf(0.8);
    let upper = facing(lights.upper).powf(1.5) * 0.5;
    let lower = facing(lights.lower).powf(1.2) * 0.4;
    let rim = facing(lights.rim).powi(2) * 0.35;
    let fresnel = (1.0 - normal.dot(lights.top).abs()).powi(3) * 0.15;

    (0.2 + top * 0.8 + upper - lower + rim + fresnel).clamp(0.15, 1.3)
}
