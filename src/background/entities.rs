use bevy::prelude::*;
use hexx::Hex;

use super::hex_grid_layout::HexGridLayout;
use crate::math;

/// Parent of every background entity spawned at grid build.
///
/// Its translation carries the parallax shift; children never move on their
/// own.
#[derive(Component)]
pub struct BackgroundRoot {
    /// Cell positions and elevations, fixed after build.
    pub layout: HexGridLayout,
    /// Elapsed seconds when the grid started running.
    pub started_at: f32,
}

/// Orthographic camera looking at the grid plane.
#[derive(Component)]
pub struct BackgroundCamera;

/// Camera and lights spawned at startup; released with the grid.
#[derive(Component)]
pub struct BackgroundScene;

/// Clear colour the host had before the engine replaced it.
#[derive(Resource, Debug, Clone, Copy)]
pub struct HostClearColor(pub Color);

/// One hex prism instance.
#[derive(Component, Reflect, Debug, Clone)]
pub struct HexCell {
    /// Axial coordinate.
    pub hex: Hex,
    /// Grid-plane centre relative to [`BackgroundRoot`].
    pub position: Vec2,
    /// Static terrain value in `[0, 1]`.
    pub base_elevation: f32,
}

/// Index of the palette material currently assigned to a cell.
#[derive(Component, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverStep(pub usize);

/// Marker on the additive glow plane.
#[derive(Component)]
pub struct GlowPlane;

/// Marker on the colour-map plane drawn behind the grid.
#[derive(Component)]
pub struct Backdrop;

/// Pre-built cell materials from flat (index 0) to fully hovered (last).
#[derive(Resource)]
pub struct HexPalette {
    /// One material per blend step.
    pub materials: Vec<Handle<StandardMaterial>>,
}

/// Handles requested when entering `Loading`.
#[derive(Resource)]
pub struct BackgroundAssets {
    /// Backdrop colour map.
    pub color_map: Handle<Image>,
    /// Height map; `None` when elevation comes from noise.
    pub height_map: Option<Handle<Image>>,
    /// Tiling face pattern.
    pub pattern: Handle<Image>,
    /// Mount generation these loads were issued for.
    pub generation: u32,
}

/// Latest pointer target and its smoothed world position.
///
/// Listeners write only `raw`; the frame chain owns the other fields.
#[derive(Resource, Reflect, Debug, Clone)]
pub struct PointerState {
    /// Last cursor position in viewport pixels, `None` before the first move
    /// or after the cursor leaves the window.
    pub raw: Option<Vec2>,
    /// World-space point under `raw` on the grid plane.
    pub target: Vec2,
    /// Exponentially smoothed world position.
    pub smoothed: Vec2,
    /// `smoothed` expressed in the shifted grid's local space.
    pub local: Vec2,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            raw: None,
            target: math::FAR_POINTER,
            smoothed: math::FAR_POINTER,
            local: math::FAR_POINTER,
        }
    }
}

impl PointerState {
    /// Advances one frame toward `target_world` (far away when `None`), then
    /// corrects for the grid's current vertical `shift`.
    pub fn step(&mut self, target_world: Option<Vec2>, factor: f32, shift: f32) {
        self.target = target_world.unwrap_or(math::FAR_POINTER);
        self.smoothed = math::exp_smooth_vec2(self.smoothed, self.target, factor);
        self.local = math::grid_local_pointer(self.smoothed, shift);
    }
}

/// Page scroll target and the smoothed offset actually displayed.
///
/// Listeners write `target_px` and `viewport_height`; the frame chain owns
/// the other fields.
#[derive(Resource, Reflect, Debug, Clone, Default)]
pub struct ScrollState {
    /// Requested scroll offset in pixels.
    pub target_px: f32,
    /// Smoothed scroll offset in pixels.
    pub displayed_px: f32,
    /// Current window height in logical pixels.
    pub viewport_height: f32,
    /// World-space vertical translation applied to the grid.
    pub shift: f32,
}

impl ScrollState {
    /// Moves the target by `delta_px`, staying within `[0, max]`.
    pub fn scroll_by(&mut self, delta_px: f32, max: f32) {
        self.target_px = (self.target_px + delta_px).clamp(0.0, max.max(0.0));
    }

    /// Advances the displayed offset one frame and recomputes the shift.
    pub fn step(&mut self, factor: f32, frustum_size: f32, parallax_speed: f32) {
        self.displayed_px = math::exp_smooth(self.displayed_px, self.target_px, factor);
        self.shift = math::parallax_shift(
            self.displayed_px,
            frustum_size,
            self.viewport_height,
            parallax_speed,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_starts_far_away() {
        let p = PointerState::default();
        assert!(p.raw.is_none());
        assert_eq!(p.smoothed, math::FAR_POINTER);
        assert_eq!(p.local, math::FAR_POINTER);
    }

    #[test]
    fn pointer_without_target_stays_far() {
        let mut p = PointerState::default();
        for _ in 0..10 {
            p.step(None, 0.1, 0.0);
        }
        assert_eq!(p.smoothed, math::FAR_POINTER);
    }

    #[test]
    fn pointer_distance_shrinks_every_frame() {
        let mut p = PointerState::default();
        let target = Vec2::new(2.0, -6.0);
        let mut gap = p.smoothed.distance(target);
        let mut frames = 0;
        while gap > 1e-3 {
            p.step(Some(target), 0.1, 0.0);
            let next = p.smoothed.distance(target);
            assert!(next < gap);
            gap = next;
            frames += 1;
            assert!(frames < 300);
        }
    }

    #[test]
    fn local_pointer_moves_opposite_to_shift() {
        let mut p = PointerState::default();
        let target = Vec2::new(1.0, 4.0);
        // Settle on the target first.
        for _ in 0..400 {
            p.step(Some(target), 0.1, 0.0);
        }
        let settled = p.local;

        let mut scroll = ScrollState {
            viewport_height: 800.0,
            ..default()
        };
        scroll.scroll_by(2000.0, 6000.0);
        for _ in 0..30 {
            scroll.step(0.08, 40.0, 0.3);
            p.step(Some(target), 0.1, scroll.shift);
            assert!((p.local.y - (settled.y - scroll.shift)).abs() < 1e-3);
            assert!((p.local.x - settled.x).abs() < 1e-3);
        }
    }

    #[test]
    fn scroll_target_is_clamped() {
        let mut s = ScrollState::default();
        s.scroll_by(-50.0, 1000.0);
        assert_eq!(s.target_px, 0.0);
        s.scroll_by(5000.0, 1000.0);
        assert_eq!(s.target_px, 1000.0);
    }

    #[test]
    fn scroll_shift_lags_behind_target() {
        let mut s = ScrollState {
            viewport_height: 800.0,
            ..default()
        };
        s.scroll_by(800.0, 6000.0);
        s.step(0.08, 40.0, 0.3);
        let full = math::parallax_shift(800.0, 40.0, 800.0, 0.3);
        assert!(s.shift > 0.0 && s.shift < full);
        for _ in 0..300 {
            s.step(0.08, 40.0, 0.3);
        }
        assert!((s.shift - full).abs() < 1e-3);
    }
}
