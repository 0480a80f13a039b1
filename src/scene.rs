//! Screenplay and scene (L3): the ordered sequence of scenes that makes up
//! a show.
//!
//! A [`Scene`] owns its inner objects (trajectory, light program, yaw
//! control, event list) through [`Rc`], a reference-counted, single-writer
//! model that bundles several independently-parsed sub-objects behind one
//! owning container rather than re-parsing them per query.

use std::rc::Rc;

use crate::error::{Result, ShowError};
use crate::events::EventList;
use crate::light::LightProgram;
use crate::rth::RthPlan;
use crate::time_axis::TimeAxis;
use crate::trajectory::Trajectory;
use crate::yaw::YawControl;

/// Duration sentinel meaning "this scene never ends".
pub const INFINITE_DURATION_MS: u32 = u32::MAX;

/// A contiguous sub-range of a show: a duration, a time axis, and up to
/// four optional inner objects.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    duration_ms: u32,
    time_axis: TimeAxis,
    trajectory: Option<Rc<Trajectory<'static>>>,
    light_program: Option<Rc<LightProgram<'static>>>,
    yaw_control: Option<Rc<YawControl<'static>>>,
    event_list: Option<Rc<EventList>>,
}

impl Scene {
    /// A scene with an infinite duration, an identity time axis, and no
    /// inner objects attached.
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration_ms: INFINITE_DURATION_MS,
            time_axis: TimeAxis::new(0),
            trajectory: None,
            light_program: None,
            yaw_control: None,
            event_list: None,
        }
    }

    /// Clears the time axis, sets the duration back to infinite, and
    /// releases all four inner references.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The scene's duration in milliseconds (`INFINITE_DURATION_MS` if the
    /// scene never ends).
    #[must_use]
    pub const fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Whether this scene runs forever.
    #[must_use]
    pub const fn is_infinite(&self) -> bool {
        self.duration_ms == INFINITE_DURATION_MS
    }

    /// Sets the scene's duration in milliseconds.
    pub fn set_duration_ms(&mut self, duration_ms: u32) {
        self.duration_ms = duration_ms;
    }

    /// The scene's time axis.
    #[must_use]
    pub const fn time_axis(&self) -> &TimeAxis {
        &self.time_axis
    }

    /// Replaces the scene's time axis.
    pub fn set_time_axis(&mut self, time_axis: TimeAxis) {
        self.time_axis = time_axis;
    }

    /// The scene's trajectory reference, if any.
    #[must_use]
    pub fn trajectory(&self) -> Option<&Rc<Trajectory<'static>>> {
        self.trajectory.as_ref()
    }

    /// Attaches a trajectory, releasing any previous one.
    pub fn set_trajectory(&mut self, trajectory: Option<Rc<Trajectory<'static>>>) {
        self.trajectory = trajectory;
    }

    /// The scene's light-program reference, if any.
    #[must_use]
    pub fn light_program(&self) -> Option<&Rc<LightProgram<'static>>> {
        self.light_program.as_ref()
    }

    /// Attaches a light program, releasing any previous one.
    pub fn set_light_program(&mut self, light_program: Option<Rc<LightProgram<'static>>>) {
        self.light_program = light_program;
    }

    /// The scene's yaw-control reference, if any.
    #[must_use]
    pub fn yaw_control(&self) -> Option<&Rc<YawControl<'static>>> {
        self.yaw_control.as_ref()
    }

    /// Attaches a yaw control, releasing any previous one.
    pub fn set_yaw_control(&mut self, yaw_control: Option<Rc<YawControl<'static>>>) {
        self.yaw_control = yaw_control;
    }

    /// The scene's event-list reference, if any.
    #[must_use]
    pub fn event_list(&self) -> Option<&Rc<EventList>> {
        self.event_list.as_ref()
    }

    /// Attaches an event list, releasing any previous one.
    pub fn set_event_list(&mut self, event_list: Option<Rc<EventList>>) {
        self.event_list = event_list;
    }
}

/// An ordered list of scenes plus an optional global RTH plan.
#[derive(Debug, Clone, Default)]
pub struct Screenplay {
    scenes: Vec<Scene>,
    rth_plan: Option<Rc<RthPlan<'static>>>,
}

impl Screenplay {
    /// An empty screenplay with no scenes and no RTH plan.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scenes: Vec::new(),
            rth_plan: None,
        }
    }

    /// Appends a new, default-initialized scene and returns its index.
    pub fn append_new_scene(&mut self) -> usize {
        self.scenes.push(Scene::new());
        self.scenes.len() - 1
    }

    /// Removes the last scene, if any.
    pub fn remove_last_scene(&mut self) {
        self.scenes.pop();
    }

    /// Removes every scene.
    pub fn clear(&mut self) {
        self.scenes.clear();
    }

    /// Number of scenes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the screenplay holds no scenes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// The scene at `index`, if in range.
    #[must_use]
    pub fn get_scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    /// The scene at `index`, mutably, if in range.
    pub fn get_scene_mut(&mut self, index: usize) -> Option<&mut Scene> {
        self.scenes.get_mut(index)
    }

    /// The screenplay's global RTH plan, if attached.
    #[must_use]
    pub fn rth_plan(&self) -> Option<&Rc<RthPlan<'static>>> {
        self.rth_plan.as_ref()
    }

    /// Attaches (or clears, with `None`) the screenplay's global RTH plan.
    pub fn set_rth_plan(&mut self, rth_plan: Option<Rc<RthPlan<'static>>>) {
        self.rth_plan = rth_plan;
    }

    /// Locates the scene active at `time_ms`, subtracting scene durations
    /// in order.
    ///
    /// Returns `(scene_index, time_in_scene_ms)`. An infinite scene
    /// matches unconditionally and ends the scan. If `time_ms` exceeds
    /// every finite scene's duration and no infinite scene follows,
    /// returns `None` (the caller should treat `time_ms` as `0` and
    /// `scene_index` as `-1`).
    #[must_use]
    pub fn scene_at_time_msec(&self, time_ms: u32) -> Option<(usize, u32)> {
        let mut remaining = time_ms;
        for (index, scene) in self.scenes.iter().enumerate() {
            if scene.is_infinite() {
                return Some((index, remaining));
            }
            if remaining < scene.duration_ms() {
                return Some((index, remaining));
            }
            remaining -= scene.duration_ms();
        }
        None
    }

    /// Total wall-clock duration of the screenplay: the sum of every
    /// scene's duration, or `INFINITE_DURATION_MS` if any scene is
    /// infinite (an infinite scene always terminates the show).
    #[must_use]
    pub fn total_duration_ms(&self) -> u32 {
        let mut total: u64 = 0;
        for scene in &self.scenes {
            if scene.is_infinite() {
                return INFINITE_DURATION_MS;
            }
            total += u64::from(scene.duration_ms());
            if total >= u64::from(INFINITE_DURATION_MS) {
                return INFINITE_DURATION_MS;
            }
        }
        total as u32
    }
}

/// Parses `bytes` as a `.skyb` file and attaches the trajectory,
/// light-program, yaw-control, event-list, and (screenplay-level) RTH
/// blocks it finds to `scene`. On any parse error the scene is left
/// unchanged.
pub fn update_scene_from_binary_file(scene: &mut Scene, bytes: &[u8]) -> Result<()> {
    let parsed = crate::file::parse_file(bytes)?;
    if let Some(traj) = parsed.trajectory {
        scene.set_trajectory(Some(Rc::new(traj)));
    }
    if let Some(light) = parsed.light_program {
        scene.set_light_program(Some(Rc::new(light)));
    }
    if let Some(yaw) = parsed.yaw_control {
        scene.set_yaw_control(Some(Rc::new(yaw)));
    }
    if let Some(events) = parsed.event_list {
        scene.set_event_list(Some(Rc::new(events)));
    }
    Ok(())
}

/// Parses `bytes` as a `.skyb` file into a single-scene [`Screenplay`],
/// attaching the file's RTH-plan block (if any) to the screenplay rather
/// than the scene.
pub fn screenplay_from_binary_file(bytes: &[u8]) -> Result<Screenplay> {
    let parsed = crate::file::parse_file(bytes)?;
    let mut screenplay = Screenplay::new();
    let index = screenplay.append_new_scene();
    let scene = screenplay
        .get_scene_mut(index)
        .expect("just-appended scene is always present");
    if let Some(traj) = parsed.trajectory {
        scene.set_trajectory(Some(Rc::new(traj)));
    }
    if let Some(light) = parsed.light_program {
        scene.set_light_program(Some(Rc::new(light)));
    }
    if let Some(yaw) = parsed.yaw_control {
        scene.set_yaw_control(Some(Rc::new(yaw)));
    }
    if let Some(events) = parsed.event_list {
        scene.set_event_list(Some(Rc::new(events)));
    }
    if let Some(rth) = parsed.rth_plan {
        screenplay.set_rth_plan(Some(Rc::new(rth)));
    }
    Ok(screenplay)
}

/// Required-presence check used by the show controller: returns
/// `ShowError::NotFound` if `scene` has none of the four inner objects
/// attached (nothing for the controller to evaluate).
pub fn ensure_scene_has_content(scene: &Scene) -> Result<()> {
    if scene.trajectory.is_none()
        && scene.light_program.is_none()
        && scene.yaw_control.is_none()
        && scene.event_list.is_none()
    {
        return Err(ShowError::NotFound("scene has no inner objects attached"));
    }
    Ok(())
}
