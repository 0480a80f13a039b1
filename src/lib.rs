//! A playback engine for pre-authored "shows" flown by autonomous craft.
//!
//! Given an in-memory binary file produced by an offline compiler and a
//! current wall-clock time, this crate yields the craft's target position,
//! velocity, yaw, yaw rate, and RGB light color, plus time-stamped
//! side-channel events (pyrotechnics and the like). It is built for
//! resource-constrained flight controllers: no dynamic allocation on the
//! evaluation hot path, and no floating-point surprises — every root-find
//! used during playback is closed form.
//!
//! # Layering
//!
//! The crate is a small stack of pure evaluators plus one sequencer, leaves
//! first:
//!
//! - [`buffer`] — a byte-buffer cursor over borrowed or owned memory.
//! - [`poly`] — the monomial [`poly::Polynomial`] primitive: Horner
//!   evaluation, derivatives, Bezier conversion, closed-form root finding.
//! - [`trajectory`] — the piecewise-polynomial [`trajectory::TrajectoryPlayer`].
//! - [`yaw`] — the piecewise-linear [`yaw::YawPlayer`].
//! - [`light`] — the bytecode [`light::LightPlayer`] VM.
//! - [`events`] — the ordered [`events::EventList`] and its cursor player.
//! - [`rth`] — the return-to-home [`rth::RthPlan`] evaluator and its
//!   synthesis of an ad-hoc abort trajectory.
//! - [`time_axis`] — the wall-clock-to-show-time [`time_axis::TimeAxis`] map.
//! - [`scene`] — [`scene::Scene`] and [`scene::Screenplay`], which bundle the
//!   above into an ordered show.
//! - [`controller`] — [`controller::ShowController`], the single entry point
//!   a flight-control loop calls once per tick.
//! - [`file`] — the `.skyb` container parser that locates blocks by tag and
//!   builds a [`scene::Scene`] from them.
//! - [`prelude`] — convenience re-exports for the types callers touch most.
//!
//! # Usage
//!
//! ```no_run
//! use skyplay::controller::ShowController;
//! use skyplay::scene::{screenplay_from_binary_file};
//!
//! # fn load() -> std::io::Result<Vec<u8>> { std::fs::read("show.skyb") }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = load()?;
//! let screenplay = screenplay_from_binary_file(&bytes)?;
//!
//! let mut controller = ShowController::new(screenplay);
//! controller.update_time_msec(2_500)?;
//! let output = controller.current_output();
//! println!("{:?}", output.position);
//! # Ok(())
//! # }
//! ```
//!
//! # Crate features
//!
//! - `tracing` (default): instruments block parsing, scene transitions, and
//!   light-VM corruption with `tracing` spans/events. A no-op without a
//!   subscriber installed, so it costs nothing on the hot path.
//! - `serde`: derives `Serialize`/`Deserialize` for the value types in
//!   [`geom`] and [`controller`].
//!
//! # Non-goals
//!
//! This crate does not plan trajectories, does not do inverse kinematics,
//! does not enforce dynamic feasibility at play time, and does not perform
//! I/O itself once a file is in memory — callers hand it bytes.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod buffer;
pub mod controller;
pub mod crc;
pub mod error;
pub mod events;
pub mod file;
pub mod geom;
pub mod light;
pub mod poly;
pub mod prelude;
pub mod rth;
pub mod scene;
pub mod time_axis;
pub mod trajectory;
pub mod yaw;

pub use controller::{ControlOutput, ControlOutputTime, ShowController};
pub use error::{ErrorKind, Result, ShowError};
pub use file::{ParsedFile, parse_file};
pub use scene::{Scene, Screenplay};
