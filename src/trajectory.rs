//! Piecewise-polynomial trajectory player (L1).
//!
//! A [`Trajectory`] is a view over a byte buffer holding a fixed header
//! followed by a stream of segments, each a 4-D Bezier curve over a local
//! parameter `u in [0, 1]`. [`TrajectoryPlayer`] walks that stream lazily,
//! caching the decoded "current segment" so repeated queries near the same
//! time never re-walk the buffer from the start.

use crate::buffer::{Buffer, ByteReader};
use crate::error::{Result, ShowError};
use crate::geom::{AxisAlignedBox, Interval, Vector3WithYaw};
use crate::poly::{Poly4D, Polynomial, SegmentKind};

/// Header fields fixed at the start of every trajectory buffer.
#[derive(Debug, Clone, Copy)]
struct Header {
    scale: u8,
    yaw_used: bool,
    start: Vector3WithYaw,
    body_offset: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header> {
    let mut r = ByteReader::new(bytes);
    let flags = r.read_u8()?;
    let scale = flags & 0x7F;
    let yaw_used = flags & 0x80 != 0;
    let x = f32::from(r.read_i16()?) * f32::from(scale);
    let y = f32::from(r.read_i16()?) * f32::from(scale);
    let z = f32::from(r.read_i16()?) * f32::from(scale);
    let yaw = f32::from(r.read_i16()?) / 10.0;
    Ok(Header {
        scale,
        yaw_used,
        start: Vector3WithYaw::new(x, y, z, yaw),
        body_offset: r.position(),
    })
}

/// A view over an encoded trajectory: header plus a segment stream.
///
/// Owns or borrows its backing [`Buffer`] per the file's own flag; either
/// way the trajectory itself never copies segment data out, it only ever
/// hands back decoded polynomials.
#[derive(Debug, Clone)]
pub struct Trajectory<'a> {
    buffer: Buffer<'a>,
    header: Header,
}

/// One decoded segment: its wall-clock span and the 4-D curve over it.
#[derive(Debug, Clone, Copy)]
struct DecodedSegment {
    start_time_ms: u32,
    duration_ms: u32,
    start_pose: Vector3WithYaw,
    poly: Poly4D,
    end_offset: usize,
}

impl<'a> Trajectory<'a> {
    /// Parses a trajectory from a borrowed byte slice.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let header = parse_header(bytes)?;
        Ok(Self {
            buffer: Buffer::borrowed(bytes),
            header,
        })
    }

    /// Parses a trajectory, taking ownership of the byte vector.
    pub fn from_owned_bytes(bytes: Vec<u8>) -> Result<Trajectory<'static>> {
        let header = parse_header(&bytes)?;
        Ok(Trajectory {
            buffer: Buffer::owned(bytes),
            header,
        })
    }

    /// A zero-duration, single-point trajectory held at `pose` forever
    /// (used by the RTH-plan `LAND` synthesis and as a builder seed).
    #[must_use]
    pub fn hold_at(pose: Vector3WithYaw) -> Trajectory<'static> {
        // header byte (scale=1, yaw_used) + start pose + terminator-less body
        let scale = 1u8;
        let mut bytes = Vec::with_capacity(9);
        bytes.push(0x80 | scale);
        bytes.extend_from_slice(&(pose.x as i16).to_le_bytes());
        bytes.extend_from_slice(&(pose.y as i16).to_le_bytes());
        bytes.extend_from_slice(&(pose.z as i16).to_le_bytes());
        bytes.extend_from_slice(&((pose.yaw * 10.0) as i16).to_le_bytes());
        Trajectory::from_owned_bytes(bytes).unwrap_or_else(|_| Trajectory {
            buffer: Buffer::owned(Vec::new()),
            header: Header {
                scale: 1,
                yaw_used: true,
                start: pose,
                body_offset: 0,
            },
        })
    }

    fn body(&self) -> &[u8] {
        &self.buffer.as_slice()[self.header.body_offset..]
    }

    /// The pose at `t = 0`.
    #[must_use]
    pub const fn start_position(&self) -> Vector3WithYaw {
        self.header.start
    }
}

/// A decoding cursor over a [`Trajectory`], answering position, velocity
/// and acceleration queries by lazily walking and caching segments.
#[derive(Debug, Clone)]
pub struct TrajectoryPlayer<'a> {
    trajectory: Trajectory<'a>,
    cursor_offset: usize,
    cursor_time_ms: u32,
    cursor_pose: Vector3WithYaw,
    current: Option<DecodedSegment>,
    total_duration_ms: Option<u32>,
}

impl<'a> TrajectoryPlayer<'a> {
    /// Builds a player positioned at the start of `trajectory`.
    #[must_use]
    pub fn new(trajectory: Trajectory<'a>) -> Self {
        let start = trajectory.header.start;
        let offset = trajectory.header.body_offset;
        Self {
            trajectory,
            cursor_offset: offset,
            cursor_time_ms: 0,
            cursor_pose: start,
            current: None,
            total_duration_ms: None,
        }
    }

    /// Duplicates the player's cached state (cursor position included).
    #[must_use]
    pub fn clone_player(&self) -> Self {
        self.clone()
    }

    fn rewind(&mut self) {
        self.cursor_offset = self.trajectory.header.body_offset;
        self.cursor_time_ms = 0;
        self.cursor_pose = self.trajectory.header.start;
        self.current = None;
    }

    /// Decodes the segment starting at `self.cursor_offset`, advancing the
    /// cursor past it and caching it as `self.current`. Returns `Ok(false)`
    /// once the body is exhausted (no terminator byte is required; the
    /// buffer simply ends).
    fn decode_next(&mut self) -> Result<bool> {
        let bytes = self.trajectory.buffer.as_slice();
        if self.cursor_offset >= bytes.len() {
            return Ok(false);
        }
        let mut r = ByteReader::new(&bytes[self.cursor_offset..]);
        let kinds_byte = r.read_u8()?;
        let duration_ms = u32::from(r.read_u16()?);
        let scale = self.trajectory.header.scale;
        let start_pose = self.cursor_pose;

        let axis_kinds = [
            SegmentKind::from_bits(kinds_byte),
            SegmentKind::from_bits(kinds_byte >> 2),
            SegmentKind::from_bits(kinds_byte >> 4),
            SegmentKind::from_bits(if self.trajectory.header.yaw_used {
                kinds_byte >> 6
            } else {
                0
            }),
        ];
        let starts = [start_pose.x, start_pose.y, start_pose.z, start_pose.yaw];
        let mut axis_polys = [Polynomial::zero(); 4];
        let mut end_values = starts;

        for (axis, kind) in axis_kinds.iter().enumerate() {
            let n = kind.control_point_count();
            let mut control = Vec::with_capacity(n + 1);
            control.push(starts[axis]);
            for _ in 0..n {
                let raw = r.read_i16()?;
                let decoded = if axis == 3 {
                    f32::from(raw) / 10.0
                } else {
                    f32::from(raw) * f32::from(scale)
                };
                control.push(decoded);
            }
            if let Some(&last) = control.last() {
                end_values[axis] = last;
            }
            axis_polys[axis] = Polynomial::from_bezier(&control, 1.0);
        }

        let end_offset = self.cursor_offset + r.position();
        let segment = DecodedSegment {
            start_time_ms: self.cursor_time_ms,
            duration_ms,
            start_pose,
            poly: Poly4D {
                x: axis_polys[0],
                y: axis_polys[1],
                z: axis_polys[2],
                yaw: axis_polys[3],
            },
            end_offset,
        };

        self.cursor_pose = Vector3WithYaw::new(
            end_values[0],
            end_values[1],
            end_values[2],
            end_values[3],
        );
        self.cursor_time_ms = self.cursor_time_ms.saturating_add(duration_ms);
        self.cursor_offset = end_offset;
        self.current = Some(segment);
        Ok(true)
    }

    /// Locates the segment containing `t_ms`, walking forward from the
    /// cache or rewinding and walking from the start if `t_ms` precedes
    /// the cached segment. Returns `None` when `t_ms` is past the end.
    fn locate(&mut self, t_ms: u32) -> Result<Option<DecodedSegment>> {
        if let Some(seg) = self.current {
            if t_ms >= seg.start_time_ms
                && (t_ms < seg.start_time_ms + seg.duration_ms || seg.duration_ms == 0)
            {
                return Ok(Some(seg));
            }
            if t_ms < seg.start_time_ms {
                self.rewind();
            }
        }
        loop {
            if let Some(seg) = self.current {
                if t_ms >= seg.start_time_ms && t_ms < seg.start_time_ms + seg.duration_ms {
                    return Ok(Some(seg));
                }
                if t_ms < seg.start_time_ms + seg.duration_ms.max(1) && seg.duration_ms == 0 {
                    return Ok(Some(seg));
                }
            }
            if !self.decode_next()? {
                return Ok(None);
            }
        }
    }

    fn local_u(seg: &DecodedSegment, t_ms: u32) -> f32 {
        if seg.duration_ms == 0 {
            0.0
        } else {
            (t_ms - seg.start_time_ms) as f32 / seg.duration_ms as f32
        }
    }

    /// Position at `t_sec`, clamped to the start/end pose outside the
    /// trajectory's span.
    pub fn position_at(&mut self, t_sec: f32) -> Result<Vector3WithYaw> {
        if t_sec < 0.0 {
            return Ok(self.trajectory.start_position());
        }
        let t_ms = (t_sec * 1000.0).round() as u32;
        match self.locate(t_ms)? {
            Some(seg) => {
                let u = Self::local_u(&seg, t_ms);
                Ok(Vector3WithYaw::new(
                    seg.poly.x.evaluate(u),
                    seg.poly.y.evaluate(u),
                    seg.poly.z.evaluate(u),
                    seg.poly.yaw.evaluate(u),
                ))
            }
            None => Ok(self.cursor_pose),
        }
    }

    /// Velocity at `t_sec` (derivative of position, scaled by
    /// `1 / duration`), zero outside the trajectory's span.
    pub fn velocity_at(&mut self, t_sec: f32) -> Result<Vector3WithYaw> {
        if t_sec < 0.0 {
            return Ok(Vector3WithYaw::ZERO);
        }
        let t_ms = (t_sec * 1000.0).round() as u32;
        match self.locate(t_ms)? {
            Some(seg) => {
                let u = Self::local_u(&seg, t_ms);
                let inv_dt = if seg.duration_ms == 0 {
                    0.0
                } else {
                    1000.0 / seg.duration_ms as f32
                };
                let d = |p: &Polynomial| p.derivative().evaluate(u) * inv_dt;
                Ok(Vector3WithYaw::new(
                    d(&seg.poly.x),
                    d(&seg.poly.y),
                    d(&seg.poly.z),
                    d(&seg.poly.yaw),
                ))
            }
            None => Ok(Vector3WithYaw::ZERO),
        }
    }

    /// Acceleration at `t_sec` (second derivative, scaled by
    /// `1 / duration^2`), zero outside the trajectory's span.
    pub fn acceleration_at(&mut self, t_sec: f32) -> Result<Vector3WithYaw> {
        if t_sec < 0.0 {
            return Ok(Vector3WithYaw::ZERO);
        }
        let t_ms = (t_sec * 1000.0).round() as u32;
        match self.locate(t_ms)? {
            Some(seg) => {
                let u = Self::local_u(&seg, t_ms);
                let inv_dt2 = if seg.duration_ms == 0 {
                    0.0
                } else {
                    1_000_000.0 / (seg.duration_ms as f32 * seg.duration_ms as f32)
                };
                let dd = |p: &Polynomial| p.derivative().derivative().evaluate(u) * inv_dt2;
                Ok(Vector3WithYaw::new(
                    dd(&seg.poly.x),
                    dd(&seg.poly.y),
                    dd(&seg.poly.z),
                    dd(&seg.poly.yaw),
                ))
            }
            None => Ok(Vector3WithYaw::ZERO),
        }
    }

    /// The pose at `t = 0`.
    #[must_use]
    pub const fn start_position(&self) -> Vector3WithYaw {
        self.trajectory.header.start
    }

    /// The pose at the trajectory's end, walking to the last segment if
    /// that has not already been cached.
    pub fn end_position(&mut self) -> Result<Vector3WithYaw> {
        self.walk_to_end()?;
        Ok(self.cursor_pose)
    }

    /// Total trajectory duration in milliseconds, walking to the end and
    /// caching the result the first time it is asked.
    pub fn total_duration_ms(&mut self) -> Result<u32> {
        if let Some(d) = self.total_duration_ms {
            return Ok(d);
        }
        self.walk_to_end()?;
        let d = self.cursor_time_ms;
        self.total_duration_ms = Some(d);
        Ok(d)
    }

    fn walk_to_end(&mut self) -> Result<()> {
        self.rewind();
        while self.decode_next()? {}
        Ok(())
    }

    /// The axis-aligned bounding box over the whole trajectory, walking
    /// every segment's extrema (exact for Bezier curves, since the curve
    /// never leaves the convex hull of its control points, but we use the
    /// tight per-axis extrema instead of the hull).
    pub fn axis_aligned_bounding_box(&mut self) -> Result<AxisAlignedBox> {
        self.rewind();
        let mut bbox = AxisAlignedBox {
            x: Interval::point(self.trajectory.header.start.x),
            y: Interval::point(self.trajectory.header.start.y),
            z: Interval::point(self.trajectory.header.start.z),
        };
        while self.decode_next()? {
            let seg = self.current.expect("decode_next just populated current");
            let (xlo, xhi) = seg.poly.x.extrema_unit_interval();
            let (ylo, yhi) = seg.poly.y.extrema_unit_interval();
            let (zlo, zhi) = seg.poly.z.extrema_unit_interval();
            bbox = AxisAlignedBox {
                x: bbox.x.union(Interval::new(xlo, xhi)),
                y: bbox.y.union(Interval::new(ylo, yhi)),
                z: bbox.z.union(Interval::new(zlo, zhi)),
            };
        }
        Ok(bbox)
    }

    /// Earliest time at which `z` exceeds `min_ascent_mm` above the start
    /// altitude, then backs off by the time needed to cover that ascent at
    /// `takeoff_speed_mm_per_s` (or, with finite acceleration, by the
    /// minimum time of a triangular/trapezoidal speed profile). Returns
    /// `f32::INFINITY` if the trajectory never reaches the threshold.
    pub fn propose_takeoff_time(
        &mut self,
        min_ascent_mm: f32,
        takeoff_speed_mm_per_s: f32,
        accel_mm_per_s2: f32,
    ) -> Result<f32> {
        self.rewind();
        let base_z = self.trajectory.header.start.z;
        let threshold = base_z + min_ascent_mm;
        let mut elapsed_sec = 0.0f32;
        while self.decode_next()? {
            let seg = self.current.expect("decode_next just populated current");
            let duration_sec = seg.duration_ms as f32 / 1000.0;
            if let Some(u) = seg.poly.z.touches(threshold)? {
                let t_star = elapsed_sec + u * duration_sec;
                let ramp_time = if accel_mm_per_s2 > 0.0 {
                    let speed_limited_distance =
                        takeoff_speed_mm_per_s * takeoff_speed_mm_per_s / accel_mm_per_s2;
                    if speed_limited_distance >= min_ascent_mm {
                        2.0 * (min_ascent_mm / accel_mm_per_s2).sqrt()
                    } else {
                        let cruise_distance = min_ascent_mm - speed_limited_distance;
                        2.0 * (takeoff_speed_mm_per_s / accel_mm_per_s2)
                            + cruise_distance / takeoff_speed_mm_per_s
                    }
                } else if takeoff_speed_mm_per_s > 0.0 {
                    min_ascent_mm / takeoff_speed_mm_per_s
                } else {
                    return Ok(f32::INFINITY);
                };
                return Ok(t_star - ramp_time);
            }
            elapsed_sec += duration_sec;
        }
        Ok(f32::INFINITY)
    }

    /// Scans backward from the end, accumulating descent over segments
    /// whose horizontal displacement stays within `verticality_threshold_mm`,
    /// until `preferred_descent_mm` is reached; returns the wall-clock time
    /// at which that descent run begins.
    pub fn propose_landing_time(
        &mut self,
        preferred_descent_mm: f32,
        verticality_threshold_mm: f32,
    ) -> Result<f32> {
        self.rewind();
        let mut segments = Vec::new();
        while self.decode_next()? {
            segments.push(self.current.expect("decode_next just populated current"));
        }
        if segments.is_empty() {
            return Ok(0.0);
        }

        let mut accumulated_descent = 0.0f32;
        let mut last_vertical_index: Option<usize> = None;
        for (i, seg) in segments.iter().enumerate().rev() {
            let start = Vector3WithYaw::new(seg.start_pose.x, seg.start_pose.y, seg.start_pose.z, 0.0);
            let end_x = seg.poly.x.evaluate(1.0);
            let end_y = seg.poly.y.evaluate(1.0);
            let end_z = seg.poly.z.evaluate(1.0);
            let end = Vector3WithYaw::new(end_x, end_y, end_z, 0.0);
            let horizontal = start.horizontal_distance(&end);
            let descent = start.z - end.z;
            if horizontal <= verticality_threshold_mm && descent > 0.0 {
                accumulated_descent += descent;
                last_vertical_index = Some(i);
                if accumulated_descent >= preferred_descent_mm {
                    break;
                }
            } else if last_vertical_index.is_some() {
                break;
            }
        }

        let index = match last_vertical_index {
            Some(i) => i,
            None => segments.len() - 1,
        };
        Ok(segments[index].start_time_ms as f32 / 1000.0)
    }

    /// Truncates the trajectory at `t_sec`, subdividing the segment that
    /// straddles the cut (de Casteljau, keeping the left half) so the
    /// result's end pose and degree match the original curve exactly at
    /// that instant. `t_sec <= 0` yields a trajectory with no segments,
    /// held forever at the start pose.
    pub fn cut_at(&mut self, t_sec: f32) -> Result<Trajectory<'static>> {
        let scale = self.trajectory.header.scale;
        let yaw_used = self.trajectory.header.yaw_used;
        let start = self.trajectory.header.start;

        let mut out = Vec::new();
        out.push((if yaw_used { 0x80 } else { 0 }) | scale);
        out.extend_from_slice(&encode_scaled(start.x, scale).to_le_bytes());
        out.extend_from_slice(&encode_scaled(start.y, scale).to_le_bytes());
        out.extend_from_slice(&encode_scaled(start.z, scale).to_le_bytes());
        out.extend_from_slice(&encode_deci_deg(start.yaw).to_le_bytes());

        if t_sec <= 0.0 {
            return Trajectory::from_owned_bytes(out);
        }

        let t_ms = (t_sec * 1000.0).round() as u32;
        let body = self.trajectory.body();
        let mut offset = 0usize;
        let mut cursor_time = 0u32;
        let mut cursor_pose = start;

        while offset < body.len() {
            let (duration_ms, axis_kinds, controls, consumed) =
                decode_segment_controls(&body[offset..], yaw_used, scale, cursor_pose)?;
            let seg_end = cursor_time.saturating_add(u32::from(duration_ms));
            if t_ms >= seg_end {
                out.extend_from_slice(&body[offset..offset + consumed]);
                cursor_pose = Vector3WithYaw::new(
                    *controls[0].last().expect("control list always has a start"),
                    *controls[1].last().expect("control list always has a start"),
                    *controls[2].last().expect("control list always has a start"),
                    *controls[3].last().expect("control list always has a start"),
                );
                cursor_time = seg_end;
                offset += consumed;
                continue;
            }

            let u = if duration_ms == 0 {
                0.0
            } else {
                (t_ms - cursor_time) as f32 / f32::from(duration_ms)
            };
            let new_duration = (f32::from(duration_ms) * u)
                .round()
                .clamp(0.0, f32::from(u16::MAX)) as u16;
            let kinds_byte = axis_kinds[0].to_bits()
                | (axis_kinds[1].to_bits() << 2)
                | (axis_kinds[2].to_bits() << 4)
                | (axis_kinds[3].to_bits() << 6);
            out.push(kinds_byte);
            out.extend_from_slice(&new_duration.to_le_bytes());
            for (axis, kind) in axis_kinds.iter().enumerate() {
                if kind.control_point_count() == 0 {
                    continue;
                }
                let left = subdivide_left(&controls[axis], u);
                for &v in &left[1..] {
                    let raw = if axis == 3 {
                        encode_deci_deg(v)
                    } else {
                        encode_scaled(v, scale)
                    };
                    out.extend_from_slice(&raw.to_le_bytes());
                }
            }
            break;
        }

        Trajectory::from_owned_bytes(out)
    }
}

fn encode_scaled(value_mm: f32, scale: u8) -> i16 {
    (value_mm / f32::from(scale)).round() as i16
}

fn encode_deci_deg(value_deg: f32) -> i16 {
    (value_deg * 10.0).round() as i16
}

/// Like the hot-path `decode_next`, but also returns the raw control-point
/// values (including the implicit leading start point) per axis, so callers
/// that need to re-encode a subdivided curve (i.e. [`TrajectoryPlayer::cut_at`])
/// don't have to reconstruct them from the composed monomial polynomial.
/// Not used on the hot path; allocates one small `Vec` per axis.
fn decode_segment_controls(
    bytes: &[u8],
    yaw_used: bool,
    scale: u8,
    start_pose: Vector3WithYaw,
) -> Result<(u16, [SegmentKind; 4], [Vec<f32>; 4], usize)> {
    let mut r = ByteReader::new(bytes);
    let kinds_byte = r.read_u8()?;
    let duration_ms = r.read_u16()?;
    let axis_kinds = [
        SegmentKind::from_bits(kinds_byte),
        SegmentKind::from_bits(kinds_byte >> 2),
        SegmentKind::from_bits(kinds_byte >> 4),
        SegmentKind::from_bits(if yaw_used { kinds_byte >> 6 } else { 0 }),
    ];
    let starts = [start_pose.x, start_pose.y, start_pose.z, start_pose.yaw];
    let mut controls: [Vec<f32>; 4] = Default::default();
    for (axis, kind) in axis_kinds.iter().enumerate() {
        let n = kind.control_point_count();
        let mut v = Vec::with_capacity(n + 1);
        v.push(starts[axis]);
        for _ in 0..n {
            let raw = r.read_i16()?;
            let decoded = if axis == 3 {
                f32::from(raw) / 10.0
            } else {
                f32::from(raw) * f32::from(scale)
            };
            v.push(decoded);
        }
        controls[axis] = v;
    }
    Ok((duration_ms, axis_kinds, controls, r.position()))
}

/// De Casteljau subdivision: returns the left-half control points of `cp`
/// (a Bezier curve including its implicit start point) cut at `u in [0, 1]`.
/// The result has the same length as `cp`, preserving the curve's degree.
fn subdivide_left(cp: &[f32], u: f32) -> Vec<f32> {
    let mut left = Vec::with_capacity(cp.len());
    let mut pts = cp.to_vec();
    left.push(pts[0]);
    while pts.len() > 1 {
        for i in 0..pts.len() - 1 {
            pts[i] = pts[i] * (1.0 - u) + pts[i + 1] * u;
        }
        pts.pop();
        left.push(pts[0]);
    }
    left
}

/// Picks the smallest per-axis scale byte (1..=127) that lets `max_abs_mm`
/// round-trip through a signed 16-bit control point.
#[must_use]
pub fn choose_scale(max_abs_mm: f32) -> u8 {
    let needed = (max_abs_mm / f32::from(i16::MAX)).ceil();
    if needed <= 1.0 {
        1
    } else {
        (needed as u8).min(127).max(1)
    }
}

/// Builds an owned [`Trajectory`] one segment at a time, used by RTH-plan
/// synthesis and by tests. Not used on the evaluation hot path: it
/// allocates freely while assembling the encoded segment buffer.
pub struct TrajectoryBuilder {
    scale: u8,
    yaw_used: bool,
    bytes: Vec<u8>,
    cursor_pose: Vector3WithYaw,
}

impl TrajectoryBuilder {
    /// Starts a builder at `start`, with the given per-axis scale (see
    /// [`choose_scale`]) and whether yaw segments are encoded.
    #[must_use]
    pub fn new(start: Vector3WithYaw, yaw_used: bool, scale: u8) -> Self {
        let scale = scale.clamp(1, 127);
        let mut bytes = Vec::new();
        bytes.push((if yaw_used { 0x80 } else { 0 }) | scale);
        bytes.extend_from_slice(&encode_scaled(start.x, scale).to_le_bytes());
        bytes.extend_from_slice(&encode_scaled(start.y, scale).to_le_bytes());
        bytes.extend_from_slice(&encode_scaled(start.z, scale).to_le_bytes());
        bytes.extend_from_slice(&encode_deci_deg(start.yaw).to_le_bytes());
        Self {
            scale,
            yaw_used,
            bytes,
            cursor_pose: start,
        }
    }

    /// Appends a zero-motion hold of `duration_ms` at the current pose.
    /// Splits into multiple encoded segments if `duration_ms` exceeds the
    /// 16-bit duration field: long holds are split so no encoded
    /// segment exceeds 65 535 ms.
    pub fn hold(&mut self, duration_ms: u32) -> &mut Self {
        let target = self.cursor_pose;
        self.line_to(target, duration_ms)
    }

    /// Appends a straight-line move to `target` over `duration_ms`,
    /// splitting as `hold` does.
    pub fn line_to(&mut self, target: Vector3WithYaw, duration_ms: u32) -> &mut Self {
        if duration_ms == 0 {
            self.push_segment(target, 0);
            return self;
        }
        let start = self.cursor_pose;
        let mut remaining = duration_ms;
        let mut done = 0u32;
        while remaining > 0 {
            let chunk = remaining.min(u32::from(u16::MAX));
            done += chunk;
            remaining -= chunk;
            let u = done as f32 / duration_ms as f32;
            let waypoint = Vector3WithYaw::new(
                start.x + (target.x - start.x) * u,
                start.y + (target.y - start.y) * u,
                start.z + (target.z - start.z) * u,
                start.yaw + (target.yaw - start.yaw) * u,
            );
            self.push_segment(waypoint, chunk as u16);
        }
        self
    }

    fn push_segment(&mut self, target: Vector3WithYaw, duration_ms: u16) {
        let targets = [target.x, target.y, target.z, target.yaw];
        let starts = [
            self.cursor_pose.x,
            self.cursor_pose.y,
            self.cursor_pose.z,
            self.cursor_pose.yaw,
        ];
        let mut kinds_byte = 0u8;
        let mut body = Vec::new();
        for axis in 0..4 {
            if axis == 3 && !self.yaw_used {
                continue;
            }
            let moving = (targets[axis] - starts[axis]).abs() > f32::EPSILON;
            let kind = if moving {
                SegmentKind::Linear
            } else {
                SegmentKind::Constant
            };
            kinds_byte |= kind.to_bits() << (axis * 2);
            if moving {
                let raw = if axis == 3 {
                    encode_deci_deg(targets[axis])
                } else {
                    encode_scaled(targets[axis], self.scale)
                };
                body.extend_from_slice(&raw.to_le_bytes());
            }
        }
        self.bytes.push(kinds_byte);
        self.bytes.extend_from_slice(&duration_ms.to_le_bytes());
        self.bytes.extend_from_slice(&body);
        self.cursor_pose = target;
    }

    /// Finalizes the builder into an owned [`Trajectory`].
    #[must_use]
    pub fn build(self) -> Trajectory<'static> {
        Trajectory::from_owned_bytes(self.bytes)
            .expect("a trajectory assembled by this builder is always well-formed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_segment(kinds_byte: u8, duration_ms: u16, control: &[(i16, i16, i16, i16)]) -> Vec<u8> {
        let mut out = vec![kinds_byte];
        out.extend_from_slice(&duration_ms.to_le_bytes());
        for &(x, y, z, yaw) in control {
            for v in [x, y, z, yaw] {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }
        out
    }

    fn sample_trajectory_bytes() -> Vec<u8> {
        // header: yaw used, scale = 1
        let mut bytes = vec![0x80 | 1u8];
        for v in [0i16, 0, 0, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        // segment 1: linear move on x,y,z (kind=1 each), no yaw change (kind=0)
        // kinds byte: axis0=1, axis1=1, axis2=1, axis3=0 => 0b00_01_01_01 = 0x15
        bytes.extend(encode_segment(
            0b00_01_01_01,
            1000,
            &[(100, 100, 100, 0)],
        ));
        bytes
    }

    #[test]
    fn position_at_start_and_end_of_linear_segment() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let start = player.position_at(0.0).unwrap();
        assert_eq!(start, Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0));
        let end = player.position_at(1.0).unwrap();
        assert!((end.x - 100.0).abs() < 1e-2);
        assert!((end.y - 100.0).abs() < 1e-2);
        assert!((end.z - 100.0).abs() < 1e-2);
    }

    #[test]
    fn position_after_end_holds_final_pose() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let past_end = player.position_at(10.0).unwrap();
        assert!((past_end.x - 100.0).abs() < 1e-2);
    }

    #[test]
    fn position_before_start_returns_start_pose() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let before = player.position_at(-1.0).unwrap();
        assert_eq!(before, Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn random_access_matches_forward_walk() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut forward = TrajectoryPlayer::new(traj.clone());
        let mut random = TrajectoryPlayer::new(traj);
        let forward_mid = forward.position_at(0.5).unwrap();
        let _ = random.position_at(1.0).unwrap();
        let _ = random.position_at(0.0).unwrap();
        let random_mid = random.position_at(0.5).unwrap();
        assert_eq!(forward_mid, random_mid);
    }

    #[test]
    fn velocity_is_zero_outside_span() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        assert_eq!(player.velocity_at(-1.0).unwrap(), Vector3WithYaw::ZERO);
        assert_eq!(player.velocity_at(5.0).unwrap(), Vector3WithYaw::ZERO);
    }

    #[test]
    fn total_duration_matches_single_segment() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        assert_eq!(player.total_duration_ms().unwrap(), 1000);
    }

    #[test]
    fn builder_line_to_matches_expected_endpoint() {
        let start = Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0);
        let mut builder = TrajectoryBuilder::new(start, true, 1);
        builder.line_to(Vector3WithYaw::new(500.0, 0.0, 0.0, 0.0), 2000);
        let traj = builder.build();
        let mut player = TrajectoryPlayer::new(traj);
        let end = player.position_at(2.0).unwrap();
        assert!((end.x - 500.0).abs() < 1.0);
    }

    #[test]
    fn builder_splits_long_moves_into_multiple_segments() {
        let start = Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0);
        let mut builder = TrajectoryBuilder::new(start, false, 1);
        builder.line_to(Vector3WithYaw::new(1000.0, 0.0, 0.0, 0.0), 200_000);
        let traj = builder.build();
        let mut player = TrajectoryPlayer::new(traj);
        assert_eq!(player.total_duration_ms().unwrap(), 200_000);
        let end = player.position_at(200.0).unwrap();
        assert!((end.x - 1000.0).abs() < 1.0);
    }

    #[test]
    fn cut_at_preserves_pose_at_cut_time() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let before_cut = player.position_at(0.5).unwrap();
        let cut = player.cut_at(0.5).unwrap();
        let mut cut_player = TrajectoryPlayer::new(cut);
        let end = cut_player.end_position().unwrap();
        assert!((end.x - before_cut.x).abs() < 1.0);
        assert!((end.z - before_cut.z).abs() < 1.0);
    }

    #[test]
    fn cut_at_zero_holds_start_pose() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let cut = player.cut_at(0.0).unwrap();
        let mut cut_player = TrajectoryPlayer::new(cut);
        assert_eq!(
            cut_player.position_at(0.0).unwrap(),
            Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0)
        );
        assert_eq!(
            cut_player.position_at(5.0).unwrap(),
            Vector3WithYaw::new(0.0, 0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn bounding_box_contains_both_endpoints() {
        let traj = Trajectory::from_bytes(&sample_trajectory_bytes()).unwrap();
        let mut player = TrajectoryPlayer::new(traj);
        let bbox = player.axis_aligned_bounding_box().unwrap();
        assert!(bbox.x.min <= 0.0 && bbox.x.max >= 99.0);
        assert!(bbox.z.min <= 0.0 && bbox.z.max >= 99.0);
    }
}
