//! Return-to-home plan evaluator (L1), including synthesis of an ad-hoc
//! trajectory at abort time.
//!
//! `evaluate_at` binary-searches a sorted list of time-keyed entries for
//! the smallest key not before a given point, clamping to the last entry
//! once the abort time runs past every threshold, then synthesizes a
//! one-shot trajectory through [`crate::trajectory::TrajectoryBuilder`].

use itertools::Itertools;

use crate::buffer::{Buffer, ByteReader};
use crate::error::{Result, ShowError};
use crate::geom::Vector3WithYaw;
use crate::trajectory::{Trajectory, TrajectoryBuilder, choose_scale};

/// One return-to-home action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RthAction {
    /// Land in place.
    Land,
    /// Move to `target` (XY, millimeters) holding the current altitude.
    GoToKeepingAltitude {
        /// Target X, Y in millimeters.
        target: (f32, f32),
        /// Delay before the move starts, seconds.
        pre_delay_sec: u16,
        /// Delay after the move ends, seconds.
        post_delay_sec: u16,
        /// Duration of the move itself, seconds.
        duration_sec: u16,
    },
    /// Move to `target` at `target_altitude`, optionally preceded by a
    /// vertical "neck" displacement.
    GoToWithAltitude {
        /// Target X, Y in millimeters.
        target: (f32, f32),
        /// Target altitude (Z), millimeters.
        target_altitude: f32,
        /// Pre-neck vertical displacement, millimeters (0 if unused; older
        /// fixtures that predate the pre-neck phase decode to 0 here).
        pre_neck_mm: f32,
        /// Duration of the pre-neck displacement, seconds.
        pre_neck_duration_sec: u16,
        /// Delay before the move starts, seconds.
        pre_delay_sec: u16,
        /// Delay after the move ends, seconds.
        post_delay_sec: u16,
        /// Duration of the main move, seconds.
        duration_sec: u16,
    },
}

/// One entry in an [`RthPlan`]: an abort-time threshold and the action to
/// take once the abort time reaches or passes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RthEntry {
    /// The entry applies from this abort time onward (seconds).
    pub time_sec: u16,
    /// The action to synthesize.
    pub action: RthAction,
}

/// A return-to-home plan: reference points plus a time-sorted list of
/// entries.
#[derive(Debug, Clone)]
pub struct RthPlan<'a> {
    #[allow(dead_code)]
    buffer: Buffer<'a>,
    reference_points: Vec<(f32, f32)>,
    entries: Vec<RthEntry>,
}

const ACTION_LAND: u8 = 0;
const ACTION_GO_TO_KEEPING_ALTITUDE: u8 = 1;
const ACTION_GO_TO_WITH_ALTITUDE: u8 = 2;

fn checked_total_duration(pre_delay: u16, post_delay: u16, duration: u16) -> Result<()> {
    u16::try_from(u32::from(pre_delay) + u32::from(post_delay) + u32::from(duration))
        .map(|_| ())
        .map_err(|_| ShowError::Overflow("pre_delay + post_delay + duration overflows u16"))
}

impl<'a> RthPlan<'a> {
    /// Parses an RTH plan body: a scale byte, a point count, the
    /// reference points (scaled 16-bit millimeter pairs, decoded the same
    /// way as a trajectory header's per-axis scale), an entry count, and
    /// the entries. Action targets are point indices into the reference
    /// table rather than inline coordinates, so a plan's reachable range
    /// is bounded only by the scale byte, not by `i16`.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let scale = r.read_u8()?.max(1);
        let point_count = r.read_u16()?;
        let mut reference_points = Vec::with_capacity(usize::from(point_count));
        for _ in 0..point_count {
            let x = ByteReader::decode_scaled(r.read_i16()?, scale);
            let y = ByteReader::decode_scaled(r.read_i16()?, scale);
            reference_points.push((x, y));
        }

        let resolve_point = |index: u16| -> Result<(f32, f32)> {
            reference_points
                .get(usize::from(index))
                .copied()
                .ok_or(ShowError::Parse("RTH plan target index out of range"))
        };

        let entry_count = r.read_u16()?;
        let mut entries = Vec::with_capacity(usize::from(entry_count));
        for _ in 0..entry_count {
            let time_sec = r.read_u16()?;
            let tag = r.read_u8()?;
            let action = match tag {
                ACTION_LAND => RthAction::Land,
                ACTION_GO_TO_KEEPING_ALTITUDE => {
                    let target = resolve_point(r.read_u16()?)?;
                    let pre_delay_sec = r.read_u16()?;
                    let post_delay_sec = r.read_u16()?;
                    let duration_sec = r.read_u16()?;
                    checked_total_duration(pre_delay_sec, post_delay_sec, duration_sec)?;
                    RthAction::GoToKeepingAltitude {
                        target,
                        pre_delay_sec,
                        post_delay_sec,
                        duration_sec,
                    }
                }
                ACTION_GO_TO_WITH_ALTITUDE => {
                    let target = resolve_point(r.read_u16()?)?;
                    let target_altitude = ByteReader::decode_scaled(r.read_i16()?, scale);
                    let pre_neck_mm = ByteReader::decode_scaled(r.read_i16()?, scale);
                    let pre_neck_duration_sec = r.read_u16()?;
                    let pre_delay_sec = r.read_u16()?;
                    let post_delay_sec = r.read_u16()?;
                    let duration_sec = r.read_u16()?;
                    checked_total_duration(pre_delay_sec, post_delay_sec, duration_sec)?;
                    RthAction::GoToWithAltitude {
                        target,
                        target_altitude,
                        pre_neck_mm,
                        pre_neck_duration_sec,
                        pre_delay_sec,
                        post_delay_sec,
                        duration_sec,
                    }
                }
                _ => return Err(ShowError::Parse("unknown RTH plan action tag")),
            };
            entries.push(RthEntry { time_sec, action });
        }

        if !entries
            .iter()
            .tuple_windows()
            .all(|(a, b)| a.time_sec <= b.time_sec)
        {
            return Err(ShowError::Parse("RTH plan entries are not time-sorted"));
        }

        Ok(Self {
            buffer: Buffer::borrowed(bytes),
            reference_points,
            entries,
        })
    }

    /// Parses an RTH plan body, taking ownership of the byte vector.
    pub fn from_owned_bytes(bytes: Vec<u8>) -> Result<RthPlan<'static>> {
        let parsed = Self::from_bytes(&bytes)?;
        Ok(RthPlan {
            buffer: Buffer::owned(bytes),
            reference_points: parsed.reference_points,
            entries: parsed.entries,
        })
    }

    /// The plan's reference points (XY, millimeters), in file order.
    #[must_use]
    pub fn reference_points(&self) -> &[(f32, f32)] {
        &self.reference_points
    }

    /// All entries, in time order.
    #[must_use]
    pub fn entries(&self) -> &[RthEntry] {
        &self.entries
    }

    /// Binary-searches for the entry in effect at abort time `t_sec`: the
    /// one with the smallest `time_sec >= t_sec`. Once `t_sec` runs past
    /// every entry's time, clamps to the last entry rather than treating
    /// the plan as exhausted. Only a plan with no entries at all falls
    /// back to a synthetic `LAND` anchored at `t_sec`.
    #[must_use]
    pub fn evaluate_at(&self, t_sec: f32) -> RthEntry {
        let t = t_sec.max(0.0).min(f32::from(u16::MAX)) as u16;
        let idx = self.entries.partition_point(|e| e.time_sec < t);
        match self.entries.get(idx) {
            Some(entry) => *entry,
            None => self.entries.last().copied().unwrap_or(RthEntry {
                time_sec: t,
                action: RthAction::Land,
            }),
        }
    }

    /// Synthesizes a one-shot [`Trajectory`] for `entry`, starting from
    /// the craft's current `start_pose`.
    #[must_use]
    pub fn init_trajectory_from_entry(
        entry: &RthEntry,
        start_pose: Vector3WithYaw,
    ) -> Trajectory<'static> {
        match entry.action {
            RthAction::Land => Trajectory::hold_at(start_pose),
            RthAction::GoToKeepingAltitude {
                target,
                pre_delay_sec,
                post_delay_sec,
                duration_sec,
            } => {
                let end_pose = Vector3WithYaw::new(target.0, target.1, start_pose.z, start_pose.yaw);
                let scale = choose_scale(
                    [start_pose.x, start_pose.y, start_pose.z, target.0, target.1]
                        .iter()
                        .fold(0.0f32, |acc, v| acc.max(v.abs())),
                );
                let mut builder = TrajectoryBuilder::new(start_pose, true, scale);
                let hold_sec = u32::from(entry.time_sec) + u32::from(pre_delay_sec);
                builder.hold(hold_sec * 1000);
                builder.line_to(end_pose, u32::from(duration_sec) * 1000);
                builder.hold(u32::from(post_delay_sec) * 1000);
                builder.build()
            }
            RthAction::GoToWithAltitude {
                target,
                target_altitude,
                pre_neck_mm,
                pre_neck_duration_sec,
                pre_delay_sec,
                post_delay_sec,
                duration_sec,
            } => {
                let end_pose =
                    Vector3WithYaw::new(target.0, target.1, target_altitude, start_pose.yaw);
                let max_abs = [
                    start_pose.x,
                    start_pose.y,
                    start_pose.z,
                    target.0,
                    target.1,
                    target_altitude,
                    start_pose.z + pre_neck_mm,
                ]
                .iter()
                .fold(0.0f32, |acc, v| acc.max(v.abs()));
                let scale = choose_scale(max_abs);
                let mut builder = TrajectoryBuilder::new(start_pose, true, scale);
                builder.hold(u32::from(pre_delay_sec) * 1000);
                if pre_neck_mm.abs() > f32::EPSILON && pre_neck_duration_sec > 0 {
                    let necked = Vector3WithYaw::new(
                        start_pose.x,
                        start_pose.y,
                        start_pose.z + pre_neck_mm,
                        start_pose.yaw,
                    );
                    builder.line_to(necked, u32::from(pre_neck_duration_sec) * 1000);
                }
                builder.line_to(end_pose, u32::from(duration_sec) * 1000);
                builder.hold(u32::from(post_delay_sec) * 1000);
                builder.build()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_plan(points: &[(i16, i16)], scale: u8, entries: &[(u16, u8, Vec<u8>)]) -> Vec<u8> {
        let mut bytes = vec![scale];
        bytes.extend_from_slice(&(points.len() as u16).to_le_bytes());
        for (x, y) in points {
            bytes.extend_from_slice(&x.to_le_bytes());
            bytes.extend_from_slice(&y.to_le_bytes());
        }
        bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (time_sec, tag, params) in entries {
            bytes.extend_from_slice(&time_sec.to_le_bytes());
            bytes.push(*tag);
            bytes.extend_from_slice(params);
        }
        bytes
    }

    fn go_to_keeping_altitude_params(
        target_point_index: u16,
        pre_delay: u16,
        post_delay: u16,
        duration: u16,
    ) -> Vec<u8> {
        let mut p = Vec::new();
        p.extend_from_slice(&target_point_index.to_le_bytes());
        p.extend_from_slice(&pre_delay.to_le_bytes());
        p.extend_from_slice(&post_delay.to_le_bytes());
        p.extend_from_slice(&duration.to_le_bytes());
        p
    }

    #[test]
    fn evaluate_at_matches_fixture_scenario() {
        // scale=2 carries targets out to +-40_000mm through a raw i16.
        let points = [(15_000i16, 20_000i16), (-20_000i16, -15_000i16)];
        let bytes = encode_plan(
            &points,
            2,
            &[
                (
                    15,
                    ACTION_GO_TO_KEEPING_ALTITUDE,
                    go_to_keeping_altitude_params(0, 0, 5, 50),
                ),
                (
                    45,
                    ACTION_GO_TO_KEEPING_ALTITUDE,
                    go_to_keeping_altitude_params(1, 2, 0, 50),
                ),
            ],
        );
        let plan = RthPlan::from_bytes(&bytes).unwrap();

        let first = plan.evaluate_at(12.5);
        assert_eq!(first.time_sec, 15);
        match first.action {
            RthAction::GoToKeepingAltitude {
                target,
                post_delay_sec,
                duration_sec,
                ..
            } => {
                assert_eq!(target, (30_000.0, 40_000.0));
                assert_eq!(post_delay_sec, 5);
                assert_eq!(duration_sec, 50);
            }
            other => panic!("unexpected action {other:?}"),
        }

        let second = plan.evaluate_at(50.0);
        assert_eq!(second.time_sec, 45);
        match second.action {
            RthAction::GoToKeepingAltitude {
                target,
                pre_delay_sec,
                duration_sec,
                ..
            } => {
                assert_eq!(target, (-40_000.0, -30_000.0));
                assert_eq!(pre_delay_sec, 2);
                assert_eq!(duration_sec, 50);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn evaluate_at_past_every_entry_clamps_to_last() {
        let bytes = encode_plan(
            &[(0, 0)],
            1,
            &[(
                10,
                ACTION_GO_TO_KEEPING_ALTITUDE,
                go_to_keeping_altitude_params(0, 0, 0, 5),
            )],
        );
        let plan = RthPlan::from_bytes(&bytes).unwrap();
        let entry = plan.evaluate_at(100.0);
        assert_eq!(entry.time_sec, 10);
        assert!(matches!(
            entry.action,
            RthAction::GoToKeepingAltitude { .. }
        ));
    }

    #[test]
    fn evaluate_at_with_no_entries_synthesizes_land() {
        let bytes = encode_plan(&[], 1, &[]);
        let plan = RthPlan::from_bytes(&bytes).unwrap();
        let entry = plan.evaluate_at(42.0);
        assert_eq!(entry.time_sec, 42);
        assert_eq!(entry.action, RthAction::Land);
    }

    #[test]
    fn oversized_duration_is_overflow() {
        let bytes = encode_plan(
            &[(0, 0)],
            1,
            &[(
                1,
                ACTION_GO_TO_KEEPING_ALTITUDE,
                go_to_keeping_altitude_params(0, 40_000, 40_000, 40_000),
            )],
        );
        assert!(matches!(
            RthPlan::from_bytes(&bytes),
            Err(ShowError::Overflow(_))
        ));
    }

    #[test]
    fn unknown_action_tag_is_parse_error() {
        let bytes = encode_plan(&[], 1, &[(1, 250, Vec::new())]);
        assert!(matches!(RthPlan::from_bytes(&bytes), Err(ShowError::Parse(_))));
    }

    #[test]
    fn out_of_range_target_index_is_parse_error() {
        let bytes = encode_plan(
            &[(0, 0)],
            1,
            &[(
                1,
                ACTION_GO_TO_KEEPING_ALTITUDE,
                go_to_keeping_altitude_params(7, 0, 0, 5),
            )],
        );
        assert!(matches!(RthPlan::from_bytes(&bytes), Err(ShowError::Parse(_))));
    }

    #[test]
    fn land_synthesizes_zero_duration_hold() {
        let start = Vector3WithYaw::new(1000.0, 2000.0, 3000.0, 45.0);
        let entry = RthEntry {
            time_sec: 0,
            action: RthAction::Land,
        };
        let traj = RthPlan::init_trajectory_from_entry(&entry, start);
        let mut player = crate::trajectory::TrajectoryPlayer::new(traj);
        let pose = player.position_at(0.0).unwrap();
        assert!((pose.x - start.x).abs() < 1.0);
        assert!((pose.z - start.z).abs() < 1.0);
    }

    #[test]
    fn go_to_keeping_altitude_reaches_target_xy_at_same_altitude() {
        let start = Vector3WithYaw::new(0.0, 0.0, 5000.0, 0.0);
        let entry = RthEntry {
            time_sec: 0,
            action: RthAction::GoToKeepingAltitude {
                target: (10_000.0, 20_000.0),
                pre_delay_sec: 0,
                post_delay_sec: 1,
                duration_sec: 10,
            },
        };
        let traj = RthPlan::init_trajectory_from_entry(&entry, start);
        let mut player = crate::trajectory::TrajectoryPlayer::new(traj);
        let end = player.end_position().unwrap();
        assert!((end.x - 10_000.0).abs() < 5.0);
        assert!((end.y - 20_000.0).abs() < 5.0);
        assert!((end.z - 5000.0).abs() < 5.0);
    }
}
