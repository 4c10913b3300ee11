use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::{CursorLeft, WindowResized};

use super::BackgroundConfig;
use super::entities::{
    BackgroundAssets, BackgroundCamera, BackgroundRoot, BackgroundScene, GlowPlane, HexCell,
    HexPalette, HostClearColor, HoverStep, PointerState, ScrollState,
};
use super::glow::GlowMaterial;
use super::shading::shade_cell;
use crate::math;

// ── Listeners ───────────────────────────────────────────────────────

/// Records the latest cursor position, or clears it when the cursor leaves.
pub fn record_pointer(
    mut moved: MessageReader<CursorMoved>,
    mut left: MessageReader<CursorLeft>,
    mut pointer: ResMut<PointerState>,
) {
    if let Some(ev) = moved.read().last() {
        pointer.raw = Some(ev.position);
    }
    if left.read().count() > 0 {
        pointer.raw = None;
    }
}

/// Converts wheel input into a scroll target in pixels. Wheel up scrolls
/// toward the top of the page.
pub fn record_scroll(
    mut wheel: MessageReader<MouseWheel>,
    cfg: Res<BackgroundConfig>,
    mut scroll: ResMut<ScrollState>,
) {
    let m = &cfg.motion;
    for ev in wheel.read() {
        scroll.scroll_by(wheel_delta_px(ev.unit, ev.y, m.scroll_line_pixels), m.max_scroll);
    }
}

/// Page pixels scrolled by one wheel message.
pub fn wheel_delta_px(unit: MouseScrollUnit, y: f32, line_pixels: f32) -> f32 {
    match unit {
        MouseScrollUnit::Line => -y * line_pixels,
        MouseScrollUnit::Pixel => -y,
    }
}

/// Tracks the window height used to convert pixels into world units.
pub fn record_resize(mut resized: MessageReader<WindowResized>, mut scroll: ResMut<ScrollState>) {
    if let Some(ev) = resized.read().last() {
        scroll.viewport_height = ev.height;
    }
}

// ── Frame chain ─────────────────────────────────────────────────────

/// Eases the displayed scroll offset toward the target.
pub fn smooth_scroll(cfg: Res<BackgroundConfig>, mut scroll: ResMut<ScrollState>) {
    let m = &cfg.motion;
    scroll.step(m.scroll_lerp, m.frustum_size, m.parallax_speed);
}

/// Projects the cursor onto the grid plane and eases the pointer toward it.
pub fn smooth_pointer(
    cfg: Res<BackgroundConfig>,
    scroll: Res<ScrollState>,
    mut pointer: ResMut<PointerState>,
    camera_q: Query<(&Camera, &GlobalTransform), With<BackgroundCamera>>,
) {
    let target = match (pointer.raw, camera_q.single()) {
        (Some(cursor), Ok((camera, cam_gt))) => world_on_grid_plane(camera, cam_gt, cursor),
        _ => None,
    };
    pointer.step(target, cfg.motion.pointer_lerp, scroll.shift);
}

fn world_on_grid_plane(camera: &Camera, cam_gt: &GlobalTransform, cursor: Vec2) -> Option<Vec2> {
    let ray = camera.viewport_to_world(cam_gt, cursor).ok()?;
    let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Z))?;
    Some(ray.get_point(distance).truncate())
}

/// Moves the whole grid by the current parallax shift.
pub fn apply_parallax(scroll: Res<ScrollState>, mut root_q: Query<&mut Transform, With<BackgroundRoot>>) {
    for mut transform in &mut root_q {
        if transform.translation.y != scroll.shift {
            transform.translation.y = scroll.shift;
        }
    }
}

/// Applies the elevation rule to every cell: depth scale, plus a material
/// swap when the palette step changes.
pub fn shade_cells(
    cfg: Res<BackgroundConfig>,
    pointer: Res<PointerState>,
    palette: Option<Res<HexPalette>>,
    mut cells: Query<(
        &HexCell,
        &mut Transform,
        &mut HoverStep,
        &mut MeshMaterial3d<StandardMaterial>,
    )>,
) {
    let Some(palette) = palette else { return };

    for (cell, mut transform, mut step, mut material) in &mut cells {
        let shade = shade_cell(cell.position, cell.base_elevation, pointer.local, &cfg.shading);
        if transform.scale.z != shade.scale {
            transform.scale.z = shade.scale;
        }
        if step.0 != shade.palette_index
            && let Some(handle) = palette.materials.get(shade.palette_index)
        {
            material.0 = handle.clone();
            step.0 = shade.palette_index;
        }
    }
}

/// Feeds the glow shader this frame's pointer, clock and fade-in.
pub fn update_glow(
    cfg: Res<BackgroundConfig>,
    time: Res<Time>,
    pointer: Res<PointerState>,
    root_q: Query<&BackgroundRoot>,
    glow_q: Query<&MeshMaterial3d<GlowMaterial>, With<GlowPlane>>,
    mut materials: ResMut<Assets<GlowMaterial>>,
) {
    let Ok(root) = root_q.single() else { return };
    let now = time.elapsed_secs();
    let fade_in = cfg.glow.fade_in;
    let fade = if fade_in > 0.0 {
        math::ease_out_cubic(((now - root.started_at) / fade_in).clamp(0.0, 1.0))
    } else {
        1.0
    };

    for handle in &glow_q {
        if let Some(mat) = materials.get_mut(&handle.0) {
            mat.set_frame(pointer.smoothed, now, fade);
        }
    }
}

// ── Teardown ────────────────────────────────────────────────────────

/// Releases everything the engine spawned: the grid root, camera and lights,
/// and hands the clear colour back to the host. Listeners and the frame chain
/// have already stopped by the time this runs.
pub fn teardown(
    mut commands: Commands,
    owned_q: Query<Entity, Or<(With<BackgroundRoot>, With<BackgroundScene>)>>,
    host_clear: Option<Res<HostClearColor>>,
) {
    let mut released = 0;
    for entity in &owned_q {
        commands.entity(entity).despawn();
        released += 1;
    }
    commands.remove_resource::<HexPalette>();
    commands.remove_resource::<BackgroundAssets>();
    if let Some(host) = host_clear {
        commands.insert_resource(ClearColor(host.0));
    }
    info!("background: disposed ({released} entities released)");
}
