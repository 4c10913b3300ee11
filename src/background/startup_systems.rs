use bevy::asset::LoadState;
use bevy::camera::ScalingMode;
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::image::{ImageAddressMode, ImageLoaderSettings, ImageSampler, ImageSamplerDescriptor};
use bevy::post_process::bloom::{Bloom, BloomCompositeMode};
use bevy::prelude::*;
use bevy::render::view::Hdr;
use bevy::window::PrimaryWindow;

use super::entities::{
    Backdrop, BackgroundAssets, BackgroundCamera, BackgroundRoot, BackgroundScene, GlowPlane,
    HexCell, HexPalette, HoverStep, ScrollState,
};
use super::glow::GlowMaterial;
use super::hex_grid_layout::{HexGridLayout, ImageHeights, NoiseHeights};
use super::lifecycle::{LifecycleEvent, MountGeneration};
use super::shading::{build_prism_mesh, palette_material};
use super::{BackgroundConfig, HeightSource};

// ── Startup ─────────────────────────────────────────────────────────

/// Spawns the orthographic camera and scene lights, and seeds the viewport
/// height used by the parallax shift.
pub fn spawn_scene(
    mut commands: Commands,
    cfg: Res<BackgroundConfig>,
    mut scroll: ResMut<ScrollState>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    commands.spawn((
        Name::new("BackgroundCamera"),
        Camera3d::default(),
        Projection::from(OrthographicProjection {
            scaling_mode: ScalingMode::FixedVertical {
                viewport_height: cfg.motion.frustum_size,
            },
            ..OrthographicProjection::default_3d()
        }),
        Hdr,
        Tonemapping::TonyMcMapface,
        Bloom {
            intensity: 0.12,
            composite_mode: BloomCompositeMode::Additive,
            ..Bloom::NATURAL
        },
        AmbientLight {
            color: Color::srgb(0.96, 0.9, 0.82),
            brightness: 350.0,
            ..default()
        },
        Transform::from_xyz(0.0, -8.0, 50.0).looking_at(Vec3::ZERO, Vec3::Y),
        BackgroundCamera,
        BackgroundScene,
    ));

    commands.spawn((
        Name::new("KeyLight"),
        DirectionalLight {
            color: Color::srgb(1.0, 0.93, 0.85),
            illuminance: 4_000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-20.0, 30.0, 40.0).looking_at(Vec3::ZERO, Vec3::Y),
        BackgroundScene,
    ));

    commands.spawn((
        Name::new("WarmSpot"),
        SpotLight {
            color: Color::srgb(1.0, 0.55, 0.2),
            intensity: 2_000_000.0,
            range: 120.0,
            outer_angle: 0.9,
            inner_angle: 0.4,
            ..default()
        },
        Transform::from_xyz(15.0, 10.0, 45.0).looking_at(Vec3::ZERO, Vec3::Y),
        BackgroundScene,
    ));

    if let Ok(window) = windows.single() {
        scroll.viewport_height = window.height();
    }
}

/// Asks the lifecycle to start loading.
pub fn request_mount(mut events: MessageWriter<LifecycleEvent>) {
    events.write(LifecycleEvent::Mount);
}

// ── Loading ─────────────────────────────────────────────────────────

/// Requests every asset the grid needs and records the generation they
/// belong to.
pub fn begin_loading(
    mut commands: Commands,
    server: Res<AssetServer>,
    cfg: Res<BackgroundConfig>,
    generation: Res<MountGeneration>,
) {
    let paths = &cfg.assets;
    let color_map = server.load(paths.color_map.clone());
    let height_map = match cfg.height_source {
        HeightSource::Image => Some(server.load(paths.height_map.clone())),
        HeightSource::Noise { .. } => None,
    };
    let pattern = server.load_with_settings(paths.pattern.clone(), |s: &mut ImageLoaderSettings| {
        s.sampler = ImageSampler::Descriptor(ImageSamplerDescriptor {
            address_mode_u: ImageAddressMode::Repeat,
            address_mode_v: ImageAddressMode::Repeat,
            ..ImageSamplerDescriptor::linear()
        });
    });

    debug!(
        "background: loading assets for generation {}",
        generation.0
    );
    commands.insert_resource(BackgroundAssets {
        color_map,
        height_map,
        pattern,
        generation: generation.0,
    });
}

/// Load progress of one asset, stripped of the loader's error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetProgress {
    /// Not loaded yet.
    Pending,
    /// Loaded and usable.
    Ready,
    /// The loader gave up.
    Failed,
}

impl From<&LoadState> for AssetProgress {
    fn from(state: &LoadState) -> Self {
        match state {
            LoadState::Loaded => AssetProgress::Ready,
            LoadState::Failed(_) => AssetProgress::Failed,
            _ => AssetProgress::Pending,
        }
    }
}

/// Combined outcome of a set of loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// At least one asset is still loading and none failed.
    Pending,
    /// Every asset loaded.
    Resolved,
    /// The first asset that failed.
    Failed(String),
}

/// Folds per-asset progress into one outcome. A failure wins over pending
/// loads.
pub fn load_outcome<'a>(progress: impl IntoIterator<Item = (&'a str, AssetProgress)>) -> LoadOutcome {
    let mut pending = false;
    for (path, p) in progress {
        match p {
            AssetProgress::Failed => return LoadOutcome::Failed(path.to_owned()),
            AssetProgress::Pending => pending = true,
            AssetProgress::Ready => {}
        }
    }
    if pending {
        LoadOutcome::Pending
    } else {
        LoadOutcome::Resolved
    }
}

/// Reports resolution or failure of the requested assets to the lifecycle.
pub fn poll_assets(
    server: Res<AssetServer>,
    assets: Option<Res<BackgroundAssets>>,
    cfg: Res<BackgroundConfig>,
    mut events: MessageWriter<LifecycleEvent>,
) {
    let Some(assets) = assets else { return };
    let paths = &cfg.assets;

    let mut tracked = vec![
        (paths.color_map.as_str(), assets.color_map.id()),
        (paths.pattern.as_str(), assets.pattern.id()),
    ];
    if let Some(height_map) = &assets.height_map {
        tracked.push((paths.height_map.as_str(), height_map.id()));
    }

    let progress = tracked
        .into_iter()
        .map(|(path, id)| (path, AssetProgress::from(&server.load_state(id))));

    match load_outcome(progress) {
        LoadOutcome::Pending => {}
        LoadOutcome::Resolved => {
            events.write(LifecycleEvent::AssetsResolved {
                generation: assets.generation,
            });
        }
        LoadOutcome::Failed(path) => {
            events.write(LifecycleEvent::AssetsFailed { path });
        }
    }
}

// ── Build ───────────────────────────────────────────────────────────

/// Builds the cell grid, palette, glow plane and backdrop under one
/// [`BackgroundRoot`].
#[allow(clippy::too_many_arguments)]
pub fn build_grid(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut glow_materials: ResMut<Assets<GlowMaterial>>,
    images: Res<Assets<Image>>,
    assets: Option<Res<BackgroundAssets>>,
    cfg: Res<BackgroundConfig>,
    time: Res<Time>,
) {
    let Some(assets) = assets else {
        warn!("background: running without loaded assets; nothing to build");
        return;
    };

    let mut layout = HexGridLayout::build(&cfg.grid);
    let sampled = match (&cfg.height_source, &assets.height_map) {
        (HeightSource::Noise { seed, octaves, scale }, _) => {
            layout.sample_elevations(&NoiseHeights::new(*seed, *octaves, *scale))
        }
        (HeightSource::Image, Some(handle)) => match images.get(handle) {
            Some(image) => layout.sample_elevations(&ImageHeights::new(image)),
            None => {
                warn!("background: height map missing at build; cells stay flat");
                false
            }
        },
        (HeightSource::Image, None) => false,
    };

    let s = &cfg.shading;
    let palette: Vec<Handle<StandardMaterial>> = (0..s.blend_steps.max(1) as usize)
        .map(|step| materials.add(palette_material(step, s, assets.pattern.clone())))
        .collect();
    let flat_material = palette[0].clone();
    let prism = meshes.add(build_prism_mesh(cfg.grid.hex_radius, s.pattern_scale));

    let root = commands
        .spawn((
            Name::new("HexBackground"),
            Transform::default(),
            Visibility::default(),
        ))
        .id();

    for slot in layout.slots() {
        let cell = commands
            .spawn((
                HexCell {
                    hex: slot.hex,
                    position: slot.position,
                    base_elevation: slot.base_elevation,
                },
                HoverStep(0),
                Name::new(format!("HexCell({},{})", slot.hex.x, slot.hex.y)),
                Mesh3d(prism.clone()),
                MeshMaterial3d(flat_material.clone()),
                Transform::from_xyz(slot.position.x, slot.position.y, 0.0)
                    .with_scale(Vec3::new(1.0, 1.0, s.flat_height)),
            ))
            .id();
        commands.entity(root).add_child(cell);
    }

    let center = layout.center();
    let size = layout.size();
    let g = &cfg.glow;

    let glow = commands
        .spawn((
            GlowPlane,
            Name::new("GlowPlane"),
            Mesh3d(meshes.add(Rectangle::new(size.x * g.oversize, size.y * g.oversize))),
            MeshMaterial3d(glow_materials.add(GlowMaterial::from_settings(g))),
            Transform::from_xyz(center.x, center.y, g.z),
        ))
        .id();
    commands.entity(root).add_child(glow);

    let backdrop_material = materials.add(StandardMaterial {
        base_color: Color::srgba(1.0, 1.0, 1.0, 0.35),
        base_color_texture: Some(assets.color_map.clone()),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });
    let backdrop = commands
        .spawn((
            Backdrop,
            Name::new("Backdrop"),
            Mesh3d(meshes.add(Rectangle::new(size.x * g.oversize, size.y * g.oversize))),
            MeshMaterial3d(backdrop_material),
            Transform::from_xyz(center.x, center.y, -0.5),
        ))
        .id();
    commands.entity(root).add_child(backdrop);

    let (min, max) = layout.bounds();
    info!(
        "background: built {} cells ({}) spanning {min} to {max}, palette of {}",
        layout.len(),
        if sampled { "sampled" } else { "flat" },
        palette.len()
    );

    commands.entity(root).insert(BackgroundRoot {
        layout,
        started_at: time.elapsed_secs(),
    });
    commands.insert_resource(HexPalette { materials: palette });
}
