//! Show controller (L4): sequences scenes and merges the four per-scene
//! streams into one control output.
//!
//! Holds a cursor over an ordered sequence of scenes, caches the state
//! derived from the last query, and short-circuits when asked for a time
//! it already evaluated.

use std::rc::Rc;

use crate::error::Result;
use crate::events::{EventList, ShowEvent};
use crate::geom::{RgbColor, Vector3WithYaw};
use crate::light::LightPlayer;
use crate::scene::Screenplay;
use crate::trajectory::TrajectoryPlayer;
use crate::yaw::YawPlayer;

/// `position` is valid in the output.
pub const MASK_POSITION: u8 = 1 << 0;
/// `velocity` is valid in the output.
pub const MASK_VELOCITY: u8 = 1 << 1;
/// `color` is valid in the output.
pub const MASK_LIGHTS: u8 = 1 << 2;
/// `position.yaw` is valid in the output.
pub const MASK_YAW: u8 = 1 << 3;
/// `velocity.yaw` (yaw rate) is valid in the output.
pub const MASK_YAW_RATE: u8 = 1 << 4;

/// Named clamp constants for `update_time_msec`'s light-query quantization,
/// gathered into one small, cached struct instead of scattering magic
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    /// Upper bound, in milliseconds, that a warped time is clamped to
    /// before being handed to the light player.
    pub light_query_clamp_ms: u32,
}

impl PlaybackConfig {
    /// 24 hours in milliseconds.
    pub const DEFAULT_LIGHT_QUERY_CLAMP_MS: u32 = 86_400_000;
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            light_query_clamp_ms: Self::DEFAULT_LIGHT_QUERY_CLAMP_MS,
        }
    }
}

/// The merged per-tick output of a [`ShowController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    /// Bitfield over `MASK_*`, indicating which fields were set this tick.
    pub mask: u8,
    /// Position; `yaw` carries the craft's target yaw in degrees.
    pub position: Vector3WithYaw,
    /// Velocity; `yaw` carries the target yaw rate in degrees/second.
    pub velocity: Vector3WithYaw,
    /// Target light color.
    pub color: RgbColor,
}

impl ControlOutput {
    /// Zero velocity, zero yaw-rate, nothing else set — the value used
    /// whenever `wall_ms` has no active scene.
    pub const DEFAULT: Self = Self {
        mask: 0,
        position: Vector3WithYaw::ZERO,
        velocity: Vector3WithYaw::ZERO,
        color: RgbColor::BLACK,
    };

    /// Whether `bit` (one of the `MASK_*` constants) is set.
    #[must_use]
    pub const fn has(&self, bit: u8) -> bool {
        self.mask & bit != 0
    }
}

impl Default for ControlOutput {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sentinel `scene_index` meaning "no active scene".
pub const NO_ACTIVE_SCENE: i32 = -1;

/// Sentinel `time_msec` meaning "the cached output is not valid".
pub const INVALID_TIME_MSEC: u32 = u32::MAX;

/// The wall-clock/scene/warped-time bookkeeping cached alongside a
/// [`ControlOutput`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutputTime {
    /// The wall-clock millisecond this output was computed for.
    pub time_msec: u32,
    /// Index of the active scene, or `NO_ACTIVE_SCENE`.
    pub scene_index: i32,
    /// Elapsed time within the active scene, milliseconds.
    pub time_in_scene_msec: u32,
    /// Warped (show) time within the active scene, seconds.
    pub warped_time_in_scene_sec: f32,
}

impl ControlOutputTime {
    /// The not-yet-computed / invalidated state.
    pub const INVALID: Self = Self {
        time_msec: INVALID_TIME_MSEC,
        scene_index: NO_ACTIVE_SCENE,
        time_in_scene_msec: 0,
        warped_time_in_scene_sec: 0.0,
    };
}

impl Default for ControlOutputTime {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Sequences a [`Screenplay`]'s scenes and merges their players' output
/// into one [`ControlOutput`] per wall-clock millisecond.
pub struct ShowController {
    screenplay: Screenplay,
    config: PlaybackConfig,
    active_scene_index: Option<usize>,
    trajectory_player: Option<TrajectoryPlayer<'static>>,
    yaw_player: Option<YawPlayer<'static>>,
    light_player: Option<LightPlayer<'static>>,
    active_event_list: Option<Rc<EventList>>,
    event_cursor: usize,
    output: ControlOutput,
    output_time: ControlOutputTime,
}

impl ShowController {
    /// Builds a controller over `screenplay`, with no scene active yet.
    #[must_use]
    pub fn new(screenplay: Screenplay) -> Self {
        Self::with_config(screenplay, PlaybackConfig::default())
    }

    /// Builds a controller with an explicit [`PlaybackConfig`].
    #[must_use]
    pub fn with_config(screenplay: Screenplay, config: PlaybackConfig) -> Self {
        Self {
            screenplay,
            config,
            active_scene_index: None,
            trajectory_player: None,
            yaw_player: None,
            light_player: None,
            active_event_list: None,
            event_cursor: 0,
            output: ControlOutput::DEFAULT,
            output_time: ControlOutputTime::INVALID,
        }
    }

    /// The most recently computed output.
    #[must_use]
    pub const fn current_output(&self) -> &ControlOutput {
        &self.output
    }

    /// The cached time bookkeeping for the current output.
    #[must_use]
    pub const fn output_time(&self) -> &ControlOutputTime {
        &self.output_time
    }

    /// Resets the output to its default and invalidates the cache, forcing
    /// the next `update_time_msec` to recompute from scratch.
    pub fn invalidate_output(&mut self) {
        self.output = ControlOutput::DEFAULT;
        self.output_time = ControlOutputTime::INVALID;
    }

    fn teardown_players(&mut self) {
        self.trajectory_player = None;
        self.yaw_player = None;
        self.light_player = None;
        self.active_event_list = None;
        self.event_cursor = 0;
    }

    fn instantiate_players_for_scene(&mut self, scene_index: usize) {
        self.teardown_players();
        let Some(scene) = self.screenplay.get_scene(scene_index) else {
            return;
        };
        if let Some(traj) = scene.trajectory() {
            self.trajectory_player = Some(TrajectoryPlayer::new((**traj).clone()));
        }
        if let Some(yaw) = scene.yaw_control() {
            self.yaw_player = Some(YawPlayer::new((**yaw).clone()));
        }
        if let Some(light) = scene.light_program() {
            self.light_player = Some(LightPlayer::new((**light).clone()));
        }
        if let Some(events) = scene.event_list() {
            self.active_event_list = Some(Rc::clone(events));
        }
    }

    /// Recomputes the output for `wall_ms`. A no-op if `wall_ms` matches
    /// the last cached time.
    ///
    /// Any downstream player error propagates; the cached `output_time`
    /// is invalidated in that case rather than left stale.
    pub fn update_time_msec(&mut self, wall_ms: u32) -> Result<()> {
        if wall_ms == self.output_time.time_msec {
            return Ok(());
        }

        match self.try_update_time_msec(wall_ms) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.output_time = ControlOutputTime::INVALID;
                Err(err)
            }
        }
    }

    fn try_update_time_msec(&mut self, wall_ms: u32) -> Result<()> {
        self.output = ControlOutput::DEFAULT;

        let Some((scene_index, time_in_scene_ms)) = self.screenplay.scene_at_time_msec(wall_ms)
        else {
            self.output_time = ControlOutputTime {
                time_msec: wall_ms,
                scene_index: NO_ACTIVE_SCENE,
                time_in_scene_msec: 0,
                warped_time_in_scene_sec: 0.0,
            };
            return Ok(());
        };

        if self.active_scene_index != Some(scene_index) {
            #[cfg(feature = "tracing")]
            tracing::debug!(scene_index, "show controller switched active scene");
            self.instantiate_players_for_scene(scene_index);
            self.active_scene_index = Some(scene_index);
        }

        let (warped_sec, rate) = self
            .screenplay
            .get_scene(scene_index)
            .expect("scene_at_time_msec returned a valid index")
            .time_axis()
            .map_ex(time_in_scene_ms);

        if let Some(player) = &mut self.trajectory_player {
            self.output.position = player.position_at(warped_sec)?;
            self.output.mask |= MASK_POSITION;
            self.output.velocity = player.velocity_at(warped_sec)? * rate;
            self.output.mask |= MASK_VELOCITY;
        }

        if let Some(player) = &mut self.light_player {
            let clamp_ms = self.config.light_query_clamp_ms;
            let light_ms = (warped_sec.max(0.0) * 1000.0).round() as u32;
            let (color, _next_change) = player.seek(light_ms.min(clamp_ms))?;
            self.output.color = color;
            self.output.mask |= MASK_LIGHTS;
        }

        if let Some(player) = &mut self.yaw_player {
            self.output.position.yaw = player.yaw_at(warped_sec)?;
            self.output.mask |= MASK_YAW;
            self.output.velocity.yaw = rate * player.yaw_rate_at(warped_sec)?;
            self.output.mask |= MASK_YAW_RATE;
        }

        self.output_time = ControlOutputTime {
            time_msec: wall_ms,
            scene_index: scene_index as i32,
            time_in_scene_msec: time_in_scene_ms,
            warped_time_in_scene_sec: warped_sec,
        };

        Ok(())
    }

    /// Drains one due event from the active scene's event list at the
    /// cached warped time, or `None` if there is none or no event list is
    /// attached.
    pub fn get_next_event(&mut self) -> Option<ShowEvent> {
        let events = self.active_event_list.as_ref()?;
        let deadline_ms = (self.output_time.warped_time_in_scene_sec.max(0.0) * 1000.0) as u32;
        let slice = events.as_slice();
        match slice.get(self.event_cursor) {
            Some(event) if event.time_ms <= deadline_ms => {
                self.event_cursor += 1;
                Some(*event)
            }
            _ => None,
        }
    }
}
