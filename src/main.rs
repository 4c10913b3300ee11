//! Hex backdrop viewer.
//!
//! Runs the background engine in a window. Wheel scrolls the virtual page,
//! Escape unmounts the background and quits, Tab toggles the inspector.
//! If the background fails to load, the window stays open without it.

use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_egui::egui;
use bevy_inspector_egui::quick::WorldInspectorPlugin;
use hex_backdrop::background::{
    BackgroundConfig, BackgroundPlugin, BackgroundRoot, BackgroundState, LifecycleEvent,
    PointerState, ScrollState, unmount_requested,
};

/// Whether the debug overlay is open.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
enum ViewMode {
    #[default]
    Normal,
    Inspecting,
}

#[cfg(feature = "native")]
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Cells per row.
    #[arg(long, value_name = "COUNT")]
    columns: Option<u32>,
    /// Number of rows.
    #[arg(long, value_name = "COUNT")]
    rows: Option<u32>,
    /// Distance at which the pointer stops raising cells, in world units.
    #[arg(long, value_name = "UNITS")]
    hover_radius: Option<f32>,
    /// Radius of the pointer glow, in world units.
    #[arg(long, value_name = "UNITS")]
    glow_radius: Option<f32>,
    /// Fraction of the page scroll speed applied to the grid.
    #[arg(long, value_name = "FACTOR")]
    parallax_speed: Option<f32>,
    /// Use procedural elevation with this seed instead of the height map.
    #[arg(long, value_name = "SEED")]
    noise_seed: Option<u32>,
    /// Start with the inspector open.
    #[arg(long)]
    inspector: bool,
}

#[cfg(feature = "native")]
impl CliArgs {
    fn apply(&self, cfg: &mut BackgroundConfig) {
        if let Some(columns) = self.columns {
            cfg.grid.columns = columns;
        }
        if let Some(rows) = self.rows {
            cfg.grid.rows = rows;
        }
        if let Some(radius) = self.hover_radius {
            cfg.shading.hover_radius = radius;
        }
        if let Some(radius) = self.glow_radius {
            cfg.glow.radius = radius;
        }
        if let Some(speed) = self.parallax_speed {
            cfg.motion.parallax_speed = speed;
        }
        if let Some(seed) = self.noise_seed {
            cfg.height_source = hex_backdrop::background::HeightSource::Noise {
                seed,
                octaves: 4,
                scale: 0.35,
            };
        }
    }
}

/// Applies command-line overrides and picks the starting view.
#[cfg(feature = "native")]
fn initial_view(cfg: &mut BackgroundConfig) -> ViewMode {
    use clap::Parser;
    let args = CliArgs::parse();
    args.apply(cfg);
    if args.inspector {
        ViewMode::Inspecting
    } else {
        ViewMode::Normal
    }
}

#[cfg(not(feature = "native"))]
fn initial_view(_cfg: &mut BackgroundConfig) -> ViewMode {
    ViewMode::Normal
}

fn main() {
    let mut cfg = BackgroundConfig::default();
    let view = initial_view(&mut cfg);

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Backdrop".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<ViewMode>()
    .insert_state(view)
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(BackgroundPlugin(cfg))
    .add_systems(Update, (unmount_on_esc, toggle_inspector))
    .add_systems(
        OnEnter(BackgroundState::Disposed),
        (
            exit_when_disposed.run_if(unmount_requested),
            keep_window_clear.run_if(not(unmount_requested)),
        ),
    )
    .add_systems(Update, draw_status.run_if(in_state(ViewMode::Inspecting)))
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(ViewMode::Inspecting)));

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<ViewMode>>,
    mut next: ResMut<NextState<ViewMode>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            ViewMode::Normal => ViewMode::Inspecting,
            ViewMode::Inspecting => ViewMode::Normal,
        });
    }
}

fn unmount_on_esc(keys: Res<ButtonInput<KeyCode>>, mut events: MessageWriter<LifecycleEvent>) {
    if keys.just_pressed(KeyCode::Escape) {
        events.write(LifecycleEvent::Unmount);
    }
}

fn exit_when_disposed(mut exit: MessageWriter<AppExit>) {
    exit.write(AppExit::Success);
}

/// The engine took its camera with it; a plain one keeps the window clearing.
fn keep_window_clear(mut commands: Commands) {
    commands.spawn((Name::new("HostCamera"), Camera3d::default()));
}

/// Small egui window with lifecycle state, pointer, shift and hovered cell.
fn draw_status(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    state: Res<State<BackgroundState>>,
    pointer: Res<PointerState>,
    scroll: Res<ScrollState>,
    root_q: Query<&BackgroundRoot>,
    mut ready: Local<bool>,
) {
    if !*ready {
        *ready = true;
        return;
    }
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };

    egui::Window::new("Background")
        .default_pos(egui::pos2(12.0, 12.0))
        .resizable(false)
        .show(ctx.get_mut(), |ui| {
            ui.label(format!("state: {:?}", state.get()));
            ui.label(format!(
                "pointer: ({:.2}, {:.2})",
                pointer.smoothed.x, pointer.smoothed.y
            ));
            ui.label(format!("local: ({:.2}, {:.2})", pointer.local.x, pointer.local.y));
            ui.label(format!(
                "scroll: {:.0}px -> {:.0}px, shift {:.2}",
                scroll.displayed_px, scroll.target_px, scroll.shift
            ));
            let hovered = root_q
                .single()
                .ok()
                .and_then(|root| root.layout.nearest_cell(pointer.local));
            match hovered {
                Some(cell) => ui.label(format!(
                    "cell: ({},{}) elevation {:.2}",
                    cell.hex.x, cell.hex.y, cell.base_elevation
                )),
                None => ui.label("cell: none"),
            };
        });
}
