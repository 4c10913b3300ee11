//! Per-cell elevation and colour rule.
//!
//! Three layers, from static to per-frame:
//! - per-face brightness, baked into the prism mesh's vertex colours;
//! - one material per hover blend step, built once;
//! - per-frame depth scale and palette step from [`shade_cell`].

use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;

use super::ShadingSettings;
use crate::math::{self, FaceLights};

/// Shading result for one cell in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellShade {
    /// Hover intensity in `[0, 1]`.
    pub pointer_effect: f32,
    /// Prism depth scale along the view axis.
    pub scale: f32,
    /// Colour blend between flat (0) and hover (1).
    pub hover_blend: f32,
    /// Palette material for `hover_blend`.
    pub palette_index: usize,
}

/// Depth scale of a fully hovered cell.
pub fn rise_height(base_elevation: f32, s: &ShadingSettings) -> f32 {
    s.rise_base + base_elevation * s.rise_range
}

/// Computes a cell's scale and colour step from its static elevation and the
/// grid-local pointer.
pub fn shade_cell(
    cell_pos: Vec2,
    base_elevation: f32,
    local_pointer: Vec2,
    s: &ShadingSettings,
) -> CellShade {
    let pointer_effect = math::pointer_effect(cell_pos.distance(local_pointer), s.hover_radius);
    let scale = math::lerp(s.flat_height, rise_height(base_elevation, s), pointer_effect);
    let hover_blend = math::smoothstep(s.flat_height, s.rise_base, scale);
    CellShade {
        pointer_effect,
        scale,
        hover_blend,
        palette_index: palette_index(hover_blend, s.blend_steps),
    }
}

/// Quantises a blend factor onto `steps` palette entries.
pub fn palette_index(blend: f32, steps: u32) -> usize {
    if steps <= 1 {
        return 0;
    }
    (blend.clamp(0.0, 1.0) * (steps - 1) as f32).round() as usize
}

fn mix_linear(a: LinearRgba, b: LinearRgba, t: f32) -> LinearRgba {
    LinearRgba::new(
        math::lerp(a.red, b.red, t),
        math::lerp(a.green, b.green, t),
        math::lerp(a.blue, b.blue, t),
        math::lerp(a.alpha, b.alpha, t),
    )
}

/// Linear colour (with alpha) of palette entry `step`.
///
/// Flat cells are dark and mostly transparent; hovered cells take the hover
/// colour plus the elevation boost and become nearly opaque.
pub fn palette_color(step: usize, s: &ShadingSettings) -> LinearRgba {
    let blend = if s.blend_steps <= 1 {
        0.0
    } else {
        (step as f32 / (s.blend_steps - 1) as f32).clamp(0.0, 1.0)
    };
    let boost = s.elevation_boost.to_linear();
    let mut hover = s.hover_color.to_linear();
    hover.red += boost.red * blend;
    hover.green += boost.green * blend;
    hover.blue += boost.blue * blend;

    let mut color = mix_linear(s.flat_color.to_linear(), hover, blend);
    color.alpha = math::lerp(0.35, 0.85, blend);
    color
}

/// Material for palette entry `step`, tiled with the face pattern.
pub fn palette_material(step: usize, s: &ShadingSettings, pattern: Handle<Image>) -> StandardMaterial {
    let color = palette_color(step, s);
    let glow = color.alpha - 0.35;
    StandardMaterial {
        base_color: Color::LinearRgba(color),
        base_color_texture: Some(pattern),
        emissive: LinearRgba::rgb(color.red * glow, color.green * glow, color.blue * glow),
        perceptual_roughness: 0.08,
        metallic: 0.1,
        alpha_mode: AlphaMode::Blend,
        ..default()
    }
}

/// Unit-depth hexagonal prism standing on the grid plane (z = 0 to z = 1),
/// pointy side up, with per-face brightness in the vertex colours.
pub fn build_prism_mesh(radius: f32, pattern_scale: f32) -> Mesh {
    let lights = FaceLights::default();
    let corners: Vec<Vec2> = (0..6)
        .map(|i| {
            let angle = std::f32::consts::FRAC_PI_3 * i as f32 - std::f32::consts::FRAC_PI_2;
            Vec2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect();

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(31);
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(31);
    let mut colors: Vec<[f32; 4]> = Vec::with_capacity(31);
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(31);
    let mut indices: Vec<u16> = Vec::with_capacity(54);

    let mut push = |p: Vec3, n: Vec3| {
        let shade = math::face_shade(n, &lights);
        positions.push(p.to_array());
        normals.push(n.to_array());
        colors.push([shade, shade, shade, 1.0]);
        uvs.push([p.x * pattern_scale, p.y * pattern_scale]);
    };

    // Top face: fan around the centre.
    push(Vec3::Z, Vec3::Z);
    for c in &corners {
        push(c.extend(1.0), Vec3::Z);
    }
    for i in 0..6u16 {
        indices.extend_from_slice(&[0, 1 + i, 1 + (i + 1) % 6]);
    }

    // Side walls: one quad per edge with a flat outward normal.
    for i in 0..6 {
        let a = corners[i].extend(0.0);
        let b = corners[(i + 1) % 6].extend(0.0);
        let c = corners[(i + 1) % 6].extend(1.0);
        let d = corners[i].extend(1.0);
        let normal = math::compute_normal(a, b, d);
        let base = 7 + 4 * i as u16;
        for v in [a, b, c, d] {
            push(v, normal);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colors)
    .with_inserted_indices(Indices::U16(indices))
}
