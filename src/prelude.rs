//! Prelude module for the playback engine.
//!
//! Re-exports the types most callers need to load a show and drive it from
//! a flight-control loop. `use skyplay::prelude::*;` pulls in the
//! controller, the screenplay types, the error vocabulary, and the shared
//! geometry/color value types without naming every module individually.

pub use crate::controller::{
    ControlOutput, ControlOutputTime, PlaybackConfig, ShowController, MASK_LIGHTS,
    MASK_POSITION, MASK_VELOCITY, MASK_YAW, MASK_YAW_RATE,
};
pub use crate::error::{ErrorKind, Result, ShowError};
pub use crate::events::{EventList, EventPlayer, ShowEvent};
pub use crate::file::{ParsedFile, parse_file};
pub use crate::geom::{AxisAlignedBox, Interval, RgbColor, RgbwColor, Vector3WithYaw};
pub use crate::light::{LightPlayer, LightProgram};
pub use crate::rth::{RthAction, RthEntry, RthPlan};
pub use crate::scene::{Scene, Screenplay, screenplay_from_binary_file};
pub use crate::time_axis::{TimeAxis, TimeSegment};
pub use crate::trajectory::{Trajectory, TrajectoryPlayer};
pub use crate::yaw::{YawControl, YawPlayer};
