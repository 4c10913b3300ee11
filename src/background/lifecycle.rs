//! Mount lifecycle: `Uninitialized → Loading → Running → Disposed`.
//!
//! Every listener and frame system is gated on this state, so entering
//! `Disposed` stops them before [`super::systems::teardown`] releases the
//! scene. Asset resolutions carry the mount generation they were issued for;
//! a resolution for an older generation is ignored.

use bevy::prelude::*;

use super::BackgroundSet;

/// Lifecycle of the background engine.
#[derive(States, Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum BackgroundState {
    /// Nothing requested yet.
    #[default]
    Uninitialized,
    /// Assets requested, grid not built.
    Loading,
    /// Grid built; the frame chain runs every frame.
    Running,
    /// Torn down. Terminal: a new mount needs a new app.
    Disposed,
}

/// Requests and notifications that drive [`BackgroundState`].
#[derive(Message, Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// Host asks for the background to start loading.
    Mount,
    /// Every required asset finished loading for `generation`.
    AssetsResolved {
        /// Mount generation the loads were issued for.
        generation: u32,
    },
    /// A required asset failed to load.
    AssetsFailed {
        /// Asset path that failed.
        path: String,
    },
    /// Host asks for the background to go away.
    Unmount,
}

/// Current mount generation. Bumped on mount and again on disposal, so any
/// resolution issued before disposal no longer matches.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountGeneration(pub u32);

/// Why the engine reached [`BackgroundState::Disposed`]. Inserted on the
/// transition; absent before.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub enum DisposeReason {
    /// The host asked for it.
    Unmounted,
    /// A required asset failed; the host keeps running without a background.
    AssetFailed {
        /// Asset path that failed.
        path: String,
    },
}

/// Run condition: the engine was disposed because the host unmounted it.
pub fn unmount_requested(reason: Option<Res<DisposeReason>>) -> bool {
    matches!(reason.as_deref(), Some(DisposeReason::Unmounted))
}

impl BackgroundState {
    /// Next state for `event`, or `None` when the event does not apply.
    pub fn transition(self, event: &LifecycleEvent, live_generation: u32) -> Option<Self> {
        use BackgroundState::*;
        match (self, event) {
            (Uninitialized, LifecycleEvent::Mount) => Some(Loading),
            (Loading, LifecycleEvent::AssetsResolved { generation })
                if *generation == live_generation =>
            {
                Some(Running)
            }
            (Loading, LifecycleEvent::AssetsFailed { .. }) => Some(Disposed),
            (Uninitialized | Loading | Running, LifecycleEvent::Unmount) => Some(Disposed),
            _ => None,
        }
    }
}

/// State, message and generation bookkeeping; no rendering.
pub struct LifecyclePlugin;

impl Plugin for LifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<BackgroundState>()
            .add_message::<LifecycleEvent>()
            .init_resource::<MountGeneration>()
            .add_systems(
                Update,
                apply_lifecycle_events.in_set(BackgroundSet::Lifecycle),
            );
    }
}

/// Folds this frame's lifecycle messages into the next state.
pub fn apply_lifecycle_events(
    mut commands: Commands,
    mut events: MessageReader<LifecycleEvent>,
    state: Res<State<BackgroundState>>,
    mut next: ResMut<NextState<BackgroundState>>,
    mut generation: ResMut<MountGeneration>,
) {
    let start = *state.get();
    let mut current = start;

    for event in events.read() {
        let Some(to) = current.transition(event, generation.0) else {
            debug!("background: ignoring {event:?} while {current:?}");
            continue;
        };
        match event {
            LifecycleEvent::AssetsFailed { path } => {
                error!("background: failed to load {path}; rendering nothing");
                commands.insert_resource(DisposeReason::AssetFailed { path: path.clone() });
            }
            LifecycleEvent::Unmount => {
                info!("background: {current:?} -> {to:?}");
                commands.insert_resource(DisposeReason::Unmounted);
            }
            _ => info!("background: {current:?} -> {to:?}"),
        }
        if matches!(to, BackgroundState::Loading | BackgroundState::Disposed) {
            generation.0 = generation.0.wrapping_add(1);
        }
        current = to;
    }

    if current != start {
        next.set(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::state::app::StatesPlugin;

    #[derive(Resource, Default)]
    struct GridBuilds(u32);

    fn count_build(mut builds: ResMut<GridBuilds>) {
        builds.0 += 1;
    }

    #[derive(Resource, Default)]
    struct HostExits(u32);

    fn count_exit(mut exits: ResMut<HostExits>) {
        exits.0 += 1;
    }

    fn headless() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin, LifecyclePlugin))
            .init_resource::<GridBuilds>()
            .init_resource::<HostExits>()
            .add_systems(OnEnter(BackgroundState::Running), count_build)
            .add_systems(
                OnEnter(BackgroundState::Disposed),
                count_exit.run_if(unmount_requested),
            );
        app
    }

    fn exits(app: &App) -> u32 {
        app.world().resource::<HostExits>().0
    }

    /// Delivers `event` and runs until the resulting state change applies.
    fn send(app: &mut App, event: LifecycleEvent) {
        app.world_mut().write_message(event);
        app.update();
        app.update();
    }

    fn state(app: &App) -> BackgroundState {
        *app.world().resource::<State<BackgroundState>>().get()
    }

    fn generation(app: &App) -> u32 {
        app.world().resource::<MountGeneration>().0
    }

    // ── transition table ────────────────────────────────────────────

    #[test]
    fn mount_only_from_uninitialized() {
        use BackgroundState::*;
        assert_eq!(Uninitialized.transition(&LifecycleEvent::Mount, 0), Some(Loading));
        assert_eq!(Loading.transition(&LifecycleEvent::Mount, 0), None);
        assert_eq!(Running.transition(&LifecycleEvent::Mount, 0), None);
        assert_eq!(Disposed.transition(&LifecycleEvent::Mount, 0), None);
    }

    #[test]
    fn resolution_needs_loading_and_live_generation() {
        use BackgroundState::*;
        let ok = LifecycleEvent::AssetsResolved { generation: 3 };
        assert_eq!(Loading.transition(&ok, 3), Some(Running));
        assert_eq!(Loading.transition(&ok, 4), None);
        assert_eq!(Running.transition(&ok, 3), None);
        assert_eq!(Disposed.transition(&ok, 3), None);
    }

    #[test]
    fn disposed_is_terminal() {
        use BackgroundState::*;
        for event in [
            LifecycleEvent::Mount,
            LifecycleEvent::Unmount,
            LifecycleEvent::AssetsResolved { generation: 0 },
            LifecycleEvent::AssetsFailed { path: "x.png".into() },
        ] {
            assert_eq!(Disposed.transition(&event, 0), None);
        }
    }

    #[test]
    fn failure_disposes_while_loading() {
        let failed = LifecycleEvent::AssetsFailed {
            path: "images/hex_height.png".into(),
        };
        assert_eq!(
            BackgroundState::Loading.transition(&failed, 1),
            Some(BackgroundState::Disposed)
        );
        assert_eq!(BackgroundState::Running.transition(&failed, 1), None);
    }

    // ── headless app ────────────────────────────────────────────────

    #[test]
    fn mount_then_resolve_builds_once() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        assert_eq!(state(&app), BackgroundState::Loading);

        let live = generation(&app);
        send(&mut app, LifecycleEvent::AssetsResolved { generation: live });
        assert_eq!(state(&app), BackgroundState::Running);

        send(&mut app, LifecycleEvent::AssetsResolved { generation: live });
        assert_eq!(app.world().resource::<GridBuilds>().0, 1);
    }

    #[test]
    fn unmount_while_loading_ignores_late_assets() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        let issued_for = generation(&app);

        send(&mut app, LifecycleEvent::Unmount);
        assert_eq!(state(&app), BackgroundState::Disposed);
        assert_ne!(generation(&app), issued_for);

        send(&mut app, LifecycleEvent::AssetsResolved {
            generation: issued_for,
        });
        assert_eq!(state(&app), BackgroundState::Disposed);
        assert_eq!(app.world().resource::<GridBuilds>().0, 0);
    }

    #[test]
    fn stale_generation_keeps_loading() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        let live = generation(&app);
        send(&mut app, LifecycleEvent::AssetsResolved {
            generation: live.wrapping_sub(1),
        });
        assert_eq!(state(&app), BackgroundState::Loading);
        assert_eq!(app.world().resource::<GridBuilds>().0, 0);
    }

    #[test]
    fn asset_failure_leaves_host_running() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        send(&mut app, LifecycleEvent::AssetsFailed {
            path: "images/hex_height.png".into(),
        });
        assert_eq!(state(&app), BackgroundState::Disposed);
        assert_eq!(
            app.world().get_resource::<DisposeReason>(),
            Some(&DisposeReason::AssetFailed {
                path: "images/hex_height.png".into()
            })
        );
        assert_eq!(exits(&app), 0);

        send(&mut app, LifecycleEvent::Unmount);
        assert_eq!(exits(&app), 0);
    }

    #[test]
    fn requested_unmount_reaches_host_exit() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        send(&mut app, LifecycleEvent::Unmount);
        assert_eq!(
            app.world().get_resource::<DisposeReason>(),
            Some(&DisposeReason::Unmounted)
        );
        assert_eq!(exits(&app), 1);
    }

    #[test]
    fn unmount_while_running_disposes() {
        let mut app = headless();
        send(&mut app, LifecycleEvent::Mount);
        let live = generation(&app);
        send(&mut app, LifecycleEvent::AssetsResolved { generation: live });
        send(&mut app, LifecycleEvent::Unmount);
        assert_eq!(state(&app), BackgroundState::Disposed);

        send(&mut app, LifecycleEvent::Mount);
        assert_eq!(state(&app), BackgroundState::Disposed);
    }
}
