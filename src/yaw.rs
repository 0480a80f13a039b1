//! Piecewise-linear yaw player (L1).
//!
//! A [`YawControl`] is a stream of `(dyaw_deci_deg, duration_ms)` deltas
//! over an initial yaw; [`YawPlayer`] walks it the same lazy,
//! cache-the-current-span way [`crate::trajectory::TrajectoryPlayer`]
//! walks segments.

use crate::buffer::{Buffer, ByteReader};
use crate::error::Result;

/// One yaw-delta tuple as encoded in the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
struct YawTuple {
    dyaw_deci_deg: i16,
    duration_ms: u16,
}

/// A view over an encoded yaw-control stream: an initial yaw followed by
/// `(dyaw_deci_deg, duration_ms)` tuples.
#[derive(Debug, Clone)]
pub struct YawControl<'a> {
    buffer: Buffer<'a>,
    initial_yaw_deg: f32,
    body_offset: usize,
}

impl<'a> YawControl<'a> {
    /// Parses a yaw-control stream from a borrowed byte slice: a leading
    /// little-endian `i16` initial yaw in decidegrees, then tuples.
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let initial_yaw_deg = f32::from(r.read_i16()?) / 10.0;
        Ok(Self {
            buffer: Buffer::borrowed(bytes),
            initial_yaw_deg,
            body_offset: r.position(),
        })
    }

    /// A track holding a single, unchanging yaw forever (the
    /// "constant-yaw" mode, represented as one infinite tuple with
    /// zero delta).
    #[must_use]
    pub fn constant(yaw_deg: f32) -> YawControl<'static> {
        let mut bytes = Vec::with_capacity(6);
        bytes.extend_from_slice(&((yaw_deg * 10.0) as i16).to_le_bytes());
        bytes.extend_from_slice(&0i16.to_le_bytes());
        bytes.extend_from_slice(&u16::MAX.to_le_bytes());
        YawControl::from_owned_bytes(bytes)
    }

    /// Parses a yaw-control stream, taking ownership of the byte vector.
    #[must_use]
    pub fn from_owned_bytes(bytes: Vec<u8>) -> YawControl<'static> {
        let mut r = ByteReader::new(&bytes);
        let initial_yaw_deg = f32::from(r.read_i16().unwrap_or(0)) / 10.0;
        let body_offset = r.position();
        YawControl {
            buffer: Buffer::owned(bytes),
            initial_yaw_deg,
            body_offset,
        }
    }

    fn body(&self) -> &[u8] {
        &self.buffer.as_slice()[self.body_offset..]
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveSpan {
    start_time_ms: u32,
    tuple: YawTuple,
    start_yaw_deg: f32,
}

/// A decoding cursor over a [`YawControl`], answering yaw and yaw-rate
/// queries.
#[derive(Debug, Clone)]
pub struct YawPlayer<'a> {
    control: YawControl<'a>,
    cursor_offset: usize,
    cursor_time_ms: u32,
    cursor_yaw_deg: f32,
    current: Option<ActiveSpan>,
}

impl<'a> YawPlayer<'a> {
    /// Builds a player positioned at the start of `control`.
    #[must_use]
    pub fn new(control: YawControl<'a>) -> Self {
        let initial = control.initial_yaw_deg;
        Self {
            control,
            cursor_offset: 0,
            cursor_time_ms: 0,
            cursor_yaw_deg: initial,
            current: None,
        }
    }

    fn rewind(&mut self) {
        self.cursor_offset = 0;
        self.cursor_time_ms = 0;
        self.cursor_yaw_deg = self.control.initial_yaw_deg;
        self.current = None;
    }

    fn decode_next(&mut self) -> Result<bool> {
        let body = self.control.body();
        if self.cursor_offset >= body.len() {
            return Ok(false);
        }
        let mut r = ByteReader::new(&body[self.cursor_offset..]);
        let dyaw_deci_deg = r.read_i16()?;
        let duration_ms = r.read_u16()?;
        let tuple = YawTuple {
            dyaw_deci_deg,
            duration_ms,
        };
        let span = ActiveSpan {
            start_time_ms: self.cursor_time_ms,
            tuple,
            start_yaw_deg: self.cursor_yaw_deg,
        };
        self.cursor_yaw_deg += f32::from(dyaw_deci_deg) / 10.0;
        self.cursor_time_ms = self.cursor_time_ms.saturating_add(u32::from(duration_ms));
        self.cursor_offset += r.position();
        self.current = Some(span);
        Ok(true)
    }

    fn locate(&mut self, t_ms: u32) -> Result<Option<ActiveSpan>> {
        if let Some(span) = self.current {
            let end = span.start_time_ms.saturating_add(u32::from(span.tuple.duration_ms));
            if t_ms >= span.start_time_ms && (t_ms < end || span.tuple.duration_ms == 0) {
                return Ok(Some(span));
            }
            if t_ms < span.start_time_ms {
                self.rewind();
            }
        }
        loop {
            if let Some(span) = self.current {
                let end = span.start_time_ms.saturating_add(u32::from(span.tuple.duration_ms));
                if t_ms >= span.start_time_ms && t_ms < end {
                    return Ok(Some(span));
                }
            }
            if !self.decode_next()? {
                return Ok(None);
            }
        }
    }

    /// Yaw in degrees at `t_sec`, linearly interpolated within the tuple
    /// covering it; zero-duration tuples are jumps to their final value.
    pub fn yaw_at(&mut self, t_sec: f32) -> Result<f32> {
        if t_sec < 0.0 {
            return Ok(self.control.initial_yaw_deg);
        }
        let t_ms = (t_sec * 1000.0).round() as u32;
        match self.locate(t_ms)? {
            Some(span) => {
                if span.tuple.duration_ms == 0 {
                    Ok(span.start_yaw_deg + f32::from(span.tuple.dyaw_deci_deg) / 10.0)
                } else {
                    let u = (t_ms - span.start_time_ms) as f32 / f32::from(span.tuple.duration_ms);
                    Ok(span.start_yaw_deg + u * f32::from(span.tuple.dyaw_deci_deg) / 10.0)
                }
            }
            None => Ok(self.cursor_yaw_deg),
        }
    }

    /// Yaw rate in degrees/second at `t_sec`; zero for a zero-duration
    /// (jump) tuple.
    pub fn yaw_rate_at(&mut self, t_sec: f32) -> Result<f32> {
        if t_sec < 0.0 {
            return Ok(0.0);
        }
        let t_ms = (t_sec * 1000.0).round() as u32;
        match self.locate(t_ms)? {
            Some(span) if span.tuple.duration_ms != 0 => {
                let dyaw_deg = f32::from(span.tuple.dyaw_deci_deg) / 10.0;
                Ok(dyaw_deg / (f32::from(span.tuple.duration_ms) / 1000.0))
            }
            _ => Ok(0.0),
        }
    }
}
