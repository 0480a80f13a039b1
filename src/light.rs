//! Light-program bytecode interpreter (L1).
//!
//! A [`LightProgram`] is a view over a byte buffer holding the opcode
//! stream. [`LightPlayer`] is the VM: program counter, current color,
//! pyro mask, a small loop stack, and a clock. Modeled as a value type
//! with an explicit `seek` returning `(color, next_change)` rather than an
//! opaque-pointer iterator — the "what is the next interesting time?"
//! contract is a first-class return value.

use crate::buffer::{Buffer, ByteReader};
use crate::error::{Result, ShowError};
use crate::geom::RgbColor;

/// Opcode tag bytes for the light-program bytecode.
///
/// The retrieval pack's `original_source/` held no recoverable files (see
/// `DESIGN.md`), so the exact historical tag values could not be carried
/// forward; these are this crate's own assignment, stable from here on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Opcode {
    End = 0,
    Nop = 1,
    Sleep = 2,
    WaitUntil = 3,
    SetColor = 4,
    SetGray = 5,
    SetBlack = 6,
    SetWhite = 7,
    FadeToColor = 8,
    FadeToGray = 9,
    FadeToBlack = 10,
    FadeToWhite = 11,
    LoopBegin = 12,
    LoopEnd = 13,
    ResetClock = 14,
    SetPyro = 15,
    ClearPyro = 16,
    Jump = 17,
}

impl Opcode {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => Self::End,
            1 => Self::Nop,
            2 => Self::Sleep,
            3 => Self::WaitUntil,
            4 => Self::SetColor,
            5 => Self::SetGray,
            6 => Self::SetBlack,
            7 => Self::SetWhite,
            8 => Self::FadeToColor,
            9 => Self::FadeToGray,
            10 => Self::FadeToBlack,
            11 => Self::FadeToWhite,
            12 => Self::LoopBegin,
            13 => Self::LoopEnd,
            14 => Self::ResetClock,
            15 => Self::SetPyro,
            16 => Self::ClearPyro,
            17 => Self::Jump,
            _ => return None,
        })
    }
}

/// A view over an encoded light-program instruction stream.
#[derive(Debug, Clone)]
pub struct LightProgram<'a> {
    buffer: Buffer<'a>,
}

impl<'a> LightProgram<'a> {
    /// Wraps a borrowed byte slice as a light program, without validating
    /// it (malformed bytecode surfaces as [`ShowError::Corrupted`] lazily,
    /// the first time the VM reaches the bad instruction).
    #[must_use]
    pub const fn from_bytes(bytes: &'a [u8]) -> Self {
        Self {
            buffer: Buffer::borrowed(bytes),
        }
    }

    /// Takes ownership of a byte vector as a light program.
    #[must_use]
    pub const fn from_owned_bytes(bytes: Vec<u8>) -> LightProgram<'static> {
        LightProgram {
            buffer: Buffer::owned(bytes),
        }
    }

    fn program(&self) -> &[u8] {
        self.buffer.as_slice()
    }
}

/// One timed span of the VM's output: either a held color or a linear fade.
#[derive(Debug, Clone, Copy)]
enum SpanKind {
    Hold(RgbColor),
    Fade { from: RgbColor, to: RgbColor },
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start_ms: u32,
    end_ms: u32,
    kind: SpanKind,
}

impl Span {
    fn color_at(&self, t_ms: u32) -> RgbColor {
        match self.kind {
            SpanKind::Hold(c) => c,
            SpanKind::Fade { from, to } => {
                let dur = self.end_ms.saturating_sub(self.start_ms);
                if dur == 0 {
                    to
                } else {
                    let u = (t_ms.saturating_sub(self.start_ms)) as f32 / dur as f32;
                    from.lerp(to, u.clamp(0.0, 1.0))
                }
            }
        }
    }
}

const MAX_LOOP_DEPTH: usize = 16;

/// The light-program VM: a program counter, a clock, and a small set of
/// registers.
#[derive(Debug, Clone)]
pub struct LightPlayer<'a> {
    program: LightProgram<'a>,
    pc: usize,
    clock_ms: u32,
    current_color: RgbColor,
    current_pyro_mask: u8,
    loop_stack: Vec<(usize, Option<u32>)>,
    active_span: Option<Span>,
    end_reached: bool,
}

impl<'a> LightPlayer<'a> {
    /// Builds a player positioned at the start of `program`.
    #[must_use]
    pub fn new(program: LightProgram<'a>) -> Self {
        Self {
            program,
            pc: 0,
            clock_ms: 0,
            current_color: RgbColor::BLACK,
            current_pyro_mask: 0,
            loop_stack: Vec::new(),
            active_span: None,
            end_reached: false,
        }
    }

    fn reset(&mut self) {
        self.pc = 0;
        self.clock_ms = 0;
        self.current_color = RgbColor::BLACK;
        self.current_pyro_mask = 0;
        self.loop_stack.clear();
        self.active_span = None;
        self.end_reached = false;
    }

    /// The pyro-channel bitmask last set by `SET_PYRO`/`CLEAR_PYRO`.
    #[must_use]
    pub const fn pyro_mask(&self) -> u8 {
        self.current_pyro_mask
    }

    /// Runs instructions from the current position until either a timed
    /// span is opened (`self.active_span` becomes `Some`) or the program
    /// ends (`self.end_reached` becomes `true`).
    fn run_until_span_or_end(&mut self) -> Result<()> {
        let program = self.program.program();
        loop {
            if self.active_span.is_some() || self.end_reached {
                return Ok(());
            }
            if self.pc >= program.len() {
                self.end_reached = true;
                return Ok(());
            }
            let mut r = ByteReader::new(&program[self.pc..]);
            let tag = r.read_u8()?;
            let Some(op) = Opcode::from_tag(tag) else {
                #[cfg(feature = "tracing")]
                tracing::warn!(tag, "light program hit an unknown opcode");
                return Err(ShowError::Corrupted("unknown light-program opcode"));
            };
            match op {
                Opcode::End => {
                    self.pc += r.position();
                    self.end_reached = true;
                }
                Opcode::Nop => {
                    self.pc += r.position();
                }
                Opcode::Sleep => {
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.open_span(ms, SpanKind::Hold(self.current_color));
                }
                Opcode::WaitUntil => {
                    let target = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    if target > self.clock_ms {
                        let ms = target - self.clock_ms;
                        self.open_span(ms, SpanKind::Hold(self.current_color));
                    }
                }
                Opcode::SetColor => {
                    let (r8, g8, b8) = (r.read_u8()?, r.read_u8()?, r.read_u8()?);
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.current_color = RgbColor::new(r8, g8, b8);
                    self.open_span(ms, SpanKind::Hold(self.current_color));
                }
                Opcode::SetGray => {
                    let y = r.read_u8()?;
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.current_color = RgbColor::gray(y);
                    self.open_span(ms, SpanKind::Hold(self.current_color));
                }
                Opcode::SetBlack => {
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.current_color = RgbColor::BLACK;
                    self.open_span(ms, SpanKind::Hold(self.current_color));
                }
                Opcode::SetWhite => {
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.current_color = RgbColor::WHITE;
                    self.open_span(ms, SpanKind::Hold(self.current_color));
                }
                Opcode::FadeToColor => {
                    let (r8, g8, b8) = (r.read_u8()?, r.read_u8()?, r.read_u8()?);
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.open_fade(ms, RgbColor::new(r8, g8, b8));
                }
                Opcode::FadeToGray => {
                    let y = r.read_u8()?;
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.open_fade(ms, RgbColor::gray(y));
                }
                Opcode::FadeToBlack => {
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.open_fade(ms, RgbColor::BLACK);
                }
                Opcode::FadeToWhite => {
                    let ms = r.read_uvarint()? as u32;
                    self.pc += r.position();
                    self.open_fade(ms, RgbColor::WHITE);
                }
                Opcode::LoopBegin => {
                    let iterations = r.read_u8()?;
                    self.pc += r.position();
                    let remaining = if iterations == 0 {
                        None
                    } else {
                        Some(u32::from(iterations))
                    };
                    if self.loop_stack.len() >= MAX_LOOP_DEPTH {
                        return Err(ShowError::Corrupted("light program loop nesting too deep"));
                    }
                    self.loop_stack.push((self.pc, remaining));
                }
                Opcode::LoopEnd => {
                    self.pc += r.position();
                    let Some((back_pc, remaining)) = self.loop_stack.pop() else {
                        return Err(ShowError::Corrupted("LOOP_END with an empty loop stack"));
                    };
                    match remaining {
                        None => {
                            self.loop_stack.push((back_pc, None));
                            self.pc = back_pc;
                        }
                        Some(n) if n > 1 => {
                            self.loop_stack.push((back_pc, Some(n - 1)));
                            self.pc = back_pc;
                        }
                        Some(_) => {}
                    }
                }
                Opcode::ResetClock => {
                    self.pc += r.position();
                    self.clock_ms = 0;
                }
                Opcode::SetPyro => {
                    let channel = r.read_u8()?;
                    self.pc += r.position();
                    self.current_pyro_mask |= 1 << (channel & 0x07);
                }
                Opcode::ClearPyro => {
                    let channel = r.read_u8()?;
                    self.pc += r.position();
                    self.current_pyro_mask &= !(1 << (channel & 0x07));
                }
                Opcode::Jump => {
                    let offset = r.read_ivarint()?;
                    self.pc += r.position();
                    let next = i64::try_from(self.pc)
                        .map_err(|_| ShowError::Overflow("jump target does not fit a pc"))?
                        + offset;
                    if next < 0 || next as usize > program.len() {
                        return Err(ShowError::Corrupted("jump target out of program bounds"));
                    }
                    self.pc = next as usize;
                }
            }
        }
    }

    fn open_span(&mut self, duration_ms: u32, kind: SpanKind) {
        if duration_ms == 0 {
            if let SpanKind::Fade { to, .. } = kind {
                self.current_color = to;
            }
            return;
        }
        let start = self.clock_ms;
        self.active_span = Some(Span {
            start_ms: start,
            end_ms: start.saturating_add(duration_ms),
            kind,
        });
    }

    fn open_fade(&mut self, duration_ms: u32, to: RgbColor) {
        let from = self.current_color;
        self.open_span(duration_ms, SpanKind::Fade { from, to });
        if duration_ms == 0 {
            self.current_color = to;
        }
    }

    fn consume_active_span(&mut self) {
        if let Some(span) = self.active_span.take() {
            self.clock_ms = span.end_ms;
            if let SpanKind::Fade { to, .. } = span.kind {
                self.current_color = to;
            }
        }
    }

    /// Advances (or rewinds, re-parsing from the beginning) to `t_ms` and
    /// returns the color at that time plus the next timestamp at which it
    /// might change (the end of the span now active), or `None` if the
    /// program has ended and the color is final.
    pub fn seek(&mut self, t_ms: u32) -> Result<(RgbColor, Option<u32>)> {
        if t_ms < self.clock_ms {
            self.reset();
        }
        loop {
            if let Some(span) = self.active_span {
                if t_ms < span.end_ms {
                    return Ok((span.color_at(t_ms), Some(span.end_ms)));
                }
                self.consume_active_span();
                continue;
            }
            if self.end_reached {
                return Ok((self.current_color, None));
            }
            self.run_until_span_or_end()?;
            if self.active_span.is_none() && !self.end_reached {
                // defensive: run_until_span_or_end only returns once one
                // of these is true.
                return Ok((self.current_color, None));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uvarint(mut v: u32, out: &mut Vec<u8>) {
        loop {
            let byte = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                out.push(byte);
                break;
            }
            out.push(byte | 0x80);
        }
    }

    #[test]
    fn black_then_gray_then_black_then_white_matches_fixture_timeline() {
        // Mirrors scenario 4's `light_program_with_wait_until_cmd` timeline:
        // black 0..3s, gray(128) 3..10s, black 10..12s, white from 12.04s on.
        let mut p = Vec::new();
        p.push(6u8); // SET_BLACK
        uvarint(3000, &mut p);
        p.push(5u8); // SET_GRAY
        p.push(128u8);
        uvarint(7000, &mut p);
        p.push(6u8); // SET_BLACK
        uvarint(2000, &mut p);
        p.push(7u8); // SET_WHITE
        uvarint(1_000_000, &mut p);

        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        assert_eq!(player.seek(0).unwrap().0, RgbColor::BLACK);
        assert_eq!(player.seek(3500).unwrap().0, RgbColor::gray(128));
        assert_eq!(player.seek(10_500).unwrap().0, RgbColor::BLACK);
        assert_eq!(player.seek(12_040).unwrap().0, RgbColor::WHITE);
    }

    #[test]
    fn fade_interpolates_linearly() {
        let mut p = vec![4u8, 0, 0, 0]; // SET_COLOR black
        uvarint(0, &mut p);
        p.push(8u8); // FADE_TO_COLOR white over 1000ms
        p.extend_from_slice(&[255, 255, 255]);
        uvarint(1000, &mut p);

        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        let (mid, _) = player.seek(500).unwrap();
        assert_eq!(mid, RgbColor::new(128, 128, 128));
    }

    #[test]
    fn loop_begin_end_repeats_the_body() {
        // LOOP_BEGIN(2): SET_GRAY(1, 100ms); LOOP_END
        let mut p = vec![12u8, 2u8];
        p.push(5u8);
        p.push(1u8);
        uvarint(100, &mut p);
        p.push(13u8);
        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        assert_eq!(player.seek(50).unwrap().0, RgbColor::gray(1));
        assert_eq!(player.seek(150).unwrap().0, RgbColor::gray(1));
        // after two iterations (200ms), the loop body is exhausted and the
        // program reaches END implicitly (no more bytes).
        let (_, next_change) = player.seek(250).unwrap();
        assert_eq!(next_change, None);
    }

    #[test]
    fn unknown_opcode_is_corrupted() {
        let p = vec![255u8];
        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        assert!(matches!(player.seek(0), Err(ShowError::Corrupted(_))));
    }

    #[test]
    fn loop_end_without_begin_is_corrupted() {
        let p = vec![13u8];
        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        assert!(matches!(player.seek(0), Err(ShowError::Corrupted(_))));
    }

    #[test]
    fn seek_forward_backward_random_agree() {
        let mut p = Vec::new();
        p.push(6u8);
        uvarint(1000, &mut p);
        p.push(7u8);
        uvarint(1000, &mut p);
        p.push(6u8);
        uvarint(1000, &mut p);

        let mut forward = LightPlayer::new(LightProgram::from_bytes(&p));
        let mut random = LightPlayer::new(LightProgram::from_bytes(&p));
        let expected = forward.seek(1500).unwrap().0;
        let _ = random.seek(2500).unwrap();
        let _ = random.seek(0).unwrap();
        let got = random.seek(1500).unwrap().0;
        assert_eq!(expected, got);
    }

    #[test]
    fn pyro_mask_tracks_set_and_clear() {
        let p = vec![15u8, 2u8, 16u8, 0u8];
        let mut player = LightPlayer::new(LightProgram::from_bytes(&p));
        let _ = player.seek(0).unwrap();
        assert_eq!(player.pyro_mask(), 0b0000_0100);
    }
}
