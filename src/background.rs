//! Decorative hex background: instanced prism grid, pointer hover, scroll
//! parallax and an animated glow plane.
//!
//! The plugin owns a single [`BackgroundRoot`] entity and everything under it.
//! It never consumes input meant for foreground UI: pointer, wheel and resize
//! messages are only read.

mod entities;
mod glow;
mod hex_grid_layout;
mod lifecycle;
mod shading;
mod startup_systems;
mod systems;

pub use entities::{
    BackgroundRoot, BackgroundScene, HexCell, HostClearColor, PointerState, ScrollState,
};
pub use glow::GlowMaterial;
pub use hex_grid_layout::{CellSlot, HeightSampler, HexGridLayout, ImageHeights, NoiseHeights};
pub use lifecycle::{
    BackgroundState, DisposeReason, LifecycleEvent, MountGeneration, unmount_requested,
};
pub use shading::{CellShade, shade_cell};

use bevy::prelude::*;

/// Frame ordering for background systems.
///
/// Listeners only record raw targets; the frame chain reads them afterwards.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BackgroundSet {
    /// Pointer, wheel and resize listeners.
    Listen,
    /// Lifecycle bookkeeping (asset polling, transitions).
    Lifecycle,
    /// Per-frame smoothing, shading and glow updates.
    Frame,
}

/// Nested configuration for the background engine.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct BackgroundConfig {
    /// Grid layout.
    pub grid: GridSettings,
    /// Per-cell elevation and colour rule.
    pub shading: ShadingSettings,
    /// Glow plane parameters.
    pub glow: GlowSettings,
    /// Pointer and scroll smoothing.
    pub motion: MotionSettings,
    /// Asset paths, relative to the asset root.
    pub assets: AssetPaths,
    /// Where per-cell base elevation comes from.
    pub height_source: HeightSource,
    /// Background clear color.
    pub clear_color: Color,
}

/// Offset-row hex grid dimensions.
#[derive(Clone, Debug, Reflect)]
pub struct GridSettings {
    /// Corner radius of one hex prism.
    pub hex_radius: f32,
    /// Extra spacing between neighbouring cells.
    pub gap: f32,
    /// Cells per row.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
    /// World y of the top row; the grid extends downward for parallax room.
    pub top_edge: f32,
}

/// Elevation and colour rule applied to every cell each frame.
#[derive(Clone, Debug, Reflect)]
pub struct ShadingSettings {
    /// Distance at which the pointer stops affecting a cell.
    pub hover_radius: f32,
    /// Prism depth scale with no hover.
    pub flat_height: f32,
    /// Depth scale of a fully hovered cell with zero base elevation.
    pub rise_base: f32,
    /// Extra depth scale per unit of base elevation when hovered.
    pub rise_range: f32,
    /// Ambient cell colour.
    pub flat_color: Color,
    /// Fully hovered cell colour.
    pub hover_color: Color,
    /// Added to hovered cells as they rise.
    pub elevation_boost: Color,
    /// Number of pre-built blend materials between flat and hover.
    pub blend_steps: u32,
    /// UV tiling of the pattern texture across a cell face.
    pub pattern_scale: f32,
}

/// Glow plane parameters.
#[derive(Clone, Debug, Reflect)]
pub struct GlowSettings {
    /// Radius of the pointer glow in world units.
    pub radius: f32,
    /// Time multiplier for the flowing noise.
    pub flow_speed: f32,
    /// Colour under the pointer.
    pub hover_color: Color,
    /// Colour of the ambient flow.
    pub flow_color: Color,
    /// Plane size relative to the grid size.
    pub oversize: f32,
    /// Plane height above the grid base.
    pub z: f32,
    /// Seconds for the glow to fade in once the grid is running.
    pub fade_in: f32,
}

/// Pointer and scroll smoothing.
#[derive(Clone, Debug, Reflect)]
pub struct MotionSettings {
    /// Per-frame interpolation factor for the pointer.
    pub pointer_lerp: f32,
    /// Per-frame interpolation factor for the scroll offset.
    pub scroll_lerp: f32,
    /// Fraction of the real scroll speed applied to the background.
    pub parallax_speed: f32,
    /// Vertical extent of the orthographic view in world units.
    pub frustum_size: f32,
    /// Pixels scrolled per wheel line.
    pub scroll_line_pixels: f32,
    /// Largest scroll offset in pixels.
    pub max_scroll: f32,
}

/// Asset paths, relative to the asset root.
#[derive(Clone, Debug, Reflect)]
pub struct AssetPaths {
    /// Backdrop colour map.
    pub color_map: String,
    /// Height map; the red channel drives base elevation.
    pub height_map: String,
    /// Tiling pattern applied to cell faces.
    pub pattern: String,
}

/// Source of per-cell base elevation.
#[derive(Clone, Debug, PartialEq, Reflect)]
pub enum HeightSource {
    /// Sample the red channel of [`AssetPaths::height_map`].
    Image,
    /// Procedural fractal noise; the height map is not loaded.
    Noise {
        /// Noise seed.
        seed: u32,
        /// Fractal octaves.
        octaves: usize,
        /// Spatial divisor applied to normalized grid coordinates.
        scale: f64,
    },
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            grid: GridSettings {
                hex_radius: 3.0,
                gap: 0.6,
                columns: 40,
                rows: 90,
                top_edge: 30.0,
            },
            shading: ShadingSettings {
                hover_radius: 7.0,
                flat_height: 1.2,
                rise_base: 2.5,
                rise_range: 3.5,
                flat_color: Color::linear_rgb(0.025, 0.015, 0.01),
                hover_color: Color::linear_rgb(0.8, 0.4, 0.1),
                elevation_boost: Color::linear_rgb(0.15, 0.08, 0.01),
                blend_steps: 16,
                pattern_scale: 0.15,
            },
            glow: GlowSettings {
                radius: 15.0,
                flow_speed: 0.8,
                hover_color: Color::linear_rgb(0.831, 0.725, 0.588),
                flow_color: Color::linear_rgb(1.2, 1.0, 0.7),
                oversize: 1.5,
                z: 0.2,
                fade_in: 1.2,
            },
            motion: MotionSettings {
                pointer_lerp: 0.1,
                scroll_lerp: 0.08,
                parallax_speed: 0.3,
                frustum_size: 40.0,
                scroll_line_pixels: 40.0,
                max_scroll: 6000.0,
            },
            assets: AssetPaths {
                color_map: "images/hex_bg.png".into(),
                height_map: "images/hex_height.png".into(),
                pattern: "textures/carbon.png".into(),
            },
            height_source: HeightSource::Image,
            clear_color: Color::srgb_u8(0x1C, 0x13, 0x10),
        }
    }
}

/// Background plugin: camera and lights at startup, asset loading, grid build
/// on entering [`BackgroundState::Running`] and teardown on
/// [`BackgroundState::Disposed`].
pub struct BackgroundPlugin(pub BackgroundConfig);

impl Plugin for BackgroundPlugin {
    fn build(&self, app: &mut App) {
        let host_clear = app
            .world()
            .get_resource::<ClearColor>()
            .map_or(Color::BLACK, |c| c.0);
        app.insert_resource(HostClearColor(host_clear));

        app.register_type::<BackgroundConfig>()
            .register_type::<BackgroundState>()
            .register_type::<HexCell>()
            .register_type::<PointerState>()
            .register_type::<ScrollState>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color))
            .init_resource::<PointerState>()
            .init_resource::<ScrollState>()
            .add_plugins(MaterialPlugin::<GlowMaterial>::default())
            .add_plugins(lifecycle::LifecyclePlugin)
            .configure_sets(
                Update,
                (
                    BackgroundSet::Listen,
                    BackgroundSet::Lifecycle,
                    BackgroundSet::Frame,
                )
                    .chain(),
            )
            .add_systems(
                Startup,
                (startup_systems::spawn_scene, startup_systems::request_mount).chain(),
            )
            .add_systems(OnEnter(BackgroundState::Loading), startup_systems::begin_loading)
            .add_systems(
                Update,
                startup_systems::poll_assets
                    .in_set(BackgroundSet::Lifecycle)
                    .before(lifecycle::apply_lifecycle_events)
                    .run_if(in_state(BackgroundState::Loading)),
            )
            .add_systems(OnEnter(BackgroundState::Running), startup_systems::build_grid)
            .add_systems(OnEnter(BackgroundState::Disposed), systems::teardown)
            .add_systems(
                Update,
                (
                    systems::record_pointer,
                    systems::record_scroll,
                    systems::record_resize,
                )
                    .in_set(BackgroundSet::Listen)
                    .run_if(
                        in_state(BackgroundState::Loading).or(in_state(BackgroundState::Running)),
                    ),
            )
            .add_systems(
                Update,
                (
                    systems::smooth_scroll,
                    systems::smooth_pointer,
                    systems::apply_parallax,
                    systems::shade_cells,
                    systems::update_glow,
                )
                    .chain()
                    .in_set(BackgroundSet::Frame)
                    .run_if(in_state(BackgroundState::Running)),
            );
    }
}
