//! `.skyb` binary container parser.
//!
//! A thin block-tag walker over a flat tag+length+body block stream: takes
//! a whole file's bytes and hands back one populated [`ParsedFile`].

use crate::error::{Result, ShowError};
use crate::events::EventList;
use crate::light::LightProgram;
use crate::rth::RthPlan;
use crate::trajectory::Trajectory;
use crate::yaw::YawControl;

const MAGIC: [u8; 4] = [0x73, 0x6B, 0x79, 0x62];

const BLOCK_NONE: u8 = 0;
const BLOCK_TRAJECTORY: u8 = 1;
const BLOCK_LIGHT_PROGRAM: u8 = 2;
const BLOCK_COMMENT: u8 = 3;
const BLOCK_RTH_PLAN: u8 = 4;
/// Producer-defined block tag for this format's yaw-control blocks.
const BLOCK_YAW_CONTROL: u8 = 5;
/// Producer-defined block tag, see [`BLOCK_YAW_CONTROL`].
const BLOCK_EVENT_LIST: u8 = 6;

const FEATURE_CRC32: u8 = 0x01;

/// The inner objects recovered from one `.skyb` file, ready to attach to a
/// [`crate::scene::Scene`].
#[derive(Debug, Default)]
pub struct ParsedFile {
    /// The file's trajectory block, if present.
    pub trajectory: Option<Trajectory<'static>>,
    /// The file's light-program block, if present.
    pub light_program: Option<LightProgram<'static>>,
    /// The file's yaw-control block, if present.
    pub yaw_control: Option<YawControl<'static>>,
    /// The file's event-list block, if present.
    pub event_list: Option<EventList>,
    /// The file's RTH-plan block, if present.
    pub rth_plan: Option<RthPlan<'static>>,
}

/// A cursor over a block stream: `seek_to_next_block` always returns
/// `Ok(())` — reaching the last block does not itself signal an error;
/// callers check [`BlockCursor::is_current_block_valid`] instead.
struct BlockCursor<'a> {
    bytes: &'a [u8],
    offset: usize,
    current: Option<(u8, &'a [u8])>,
}

impl<'a> BlockCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            current: None,
        }
    }

    fn is_current_block_valid(&self) -> bool {
        self.current.is_some()
    }

    /// Decodes the block at the cursor's offset, if any. Never returns an
    /// error for "no more blocks"; only malformed length fields (running
    /// past the end of `bytes`) are `EREAD`.
    fn seek_to_next_block(&mut self) -> Result<()> {
        if self.offset + 3 > self.bytes.len() {
            self.current = None;
            return Ok(());
        }
        let tag = self.bytes[self.offset];
        let len = u16::from_le_bytes([self.bytes[self.offset + 1], self.bytes[self.offset + 2]])
            as usize;
        let body_start = self.offset + 3;
        let body_end = body_start
            .checked_add(len)
            .ok_or(ShowError::Read("block length overflows the file"))?;
        if body_end > self.bytes.len() {
            return Err(ShowError::Read("block body runs past end of file"));
        }
        if tag == BLOCK_NONE {
            self.current = None;
            return Ok(());
        }
        self.current = Some((tag, &self.bytes[body_start..body_end]));
        self.offset = body_end;
        Ok(())
    }
}

fn check_crc(header_and_body: &[u8], expected: u32) -> Result<()> {
    let actual = crate::crc::checksum(header_and_body);
    if actual != expected {
        #[cfg(feature = "tracing")]
        tracing::warn!(actual, expected, "skyb file failed CRC32 check");
        return Err(ShowError::Corrupted("CRC32 mismatch"));
    }
    Ok(())
}

/// Parses a whole `.skyb` file's bytes into a [`ParsedFile`].
pub fn parse_file(bytes: &[u8]) -> Result<ParsedFile> {
    if bytes.len() < 5 || bytes[0..4] != MAGIC {
        return Err(ShowError::Parse("missing skyb magic"));
    }
    let version = bytes[4];
    if version != 1 && version != 2 {
        return Err(ShowError::Parse("unsupported skyb version"));
    }

    let mut offset = 5usize;
    if version == 2 {
        if bytes.len() < offset + 1 {
            return Err(ShowError::Read("truncated version-2 feature bitfield"));
        }
        let features = bytes[offset];
        offset += 1;
        if features & FEATURE_CRC32 != 0 {
            if bytes.len() < offset + 4 {
                return Err(ShowError::Read("truncated CRC32 trailer"));
            }
            let crc_bytes = &bytes[offset..offset + 4];
            let expected = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
            offset += 4;
            let mut crc_input = Vec::with_capacity(bytes.len() - 4);
            crc_input.extend_from_slice(&bytes[..offset - 4]);
            crc_input.extend_from_slice(&bytes[offset..]);
            check_crc(&crc_input, expected)?;
        }
    }

    let mut parsed = ParsedFile::default();
    let mut cursor = BlockCursor::new(&bytes[offset..]);
    cursor.seek_to_next_block()?;
    while cursor.is_current_block_valid() {
        let (tag, body) = cursor.current.expect("checked by is_current_block_valid");
        match tag {
            BLOCK_TRAJECTORY => parsed.trajectory = Some(Trajectory::from_owned_bytes(body.to_vec())?),
            BLOCK_LIGHT_PROGRAM => {
                parsed.light_program = Some(LightProgram::from_owned_bytes(body.to_vec()));
            }
            BLOCK_YAW_CONTROL => {
                parsed.yaw_control = Some(YawControl::from_owned_bytes(body.to_vec()));
            }
            BLOCK_EVENT_LIST => parsed.event_list = Some(parse_event_list_block(body)?),
            BLOCK_RTH_PLAN => parsed.rth_plan = Some(RthPlan::from_owned_bytes(body.to_vec())?),
            BLOCK_COMMENT | BLOCK_NONE => {}
            _unknown => {
                #[cfg(feature = "tracing")]
                tracing::debug!(tag = _unknown, "skipping unrecognized skyb block tag");
            }
        }
        cursor.seek_to_next_block()?;
    }

    Ok(parsed)
}

fn parse_event_list_block(body: &[u8]) -> Result<EventList> {
    use crate::buffer::ByteReader;
    use crate::events::ShowEvent;

    let mut r = ByteReader::new(body);
    let count = r.read_u32()?;
    let mut events = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let time_ms = r.read_u32()?;
        let event_type = r.read_u8()?;
        let subtype = r.read_u8()?;
        let payload = r.read_u32()?;
        events.push(ShowEvent::new(time_ms, event_type, subtype, payload));
    }
    let mut list = EventList::from_sorted_vec(events);
    if !list.is_sorted() {
        list.sort();
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(tag: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn trajectory_body() -> Vec<u8> {
        let mut body = vec![0x80 | 1u8];
        for v in [0i16, 0, 0, 0] {
            body.extend_from_slice(&v.to_le_bytes());
        }
        body
    }

    #[test]
    fn rejects_missing_magic() {
        let bytes = vec![0, 0, 0, 0, 1];
        assert!(matches!(parse_file(&bytes), Err(ShowError::Parse(_))));
    }

    #[test]
    fn version_1_file_with_trajectory_block_parses() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(1);
        bytes.extend(block(BLOCK_TRAJECTORY, &trajectory_body()));
        bytes.extend(block(BLOCK_NONE, &[]));
        let parsed = parse_file(&bytes).unwrap();
        assert!(parsed.trajectory.is_some());
    }

    #[test]
    fn version_2_without_crc_feature_parses() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(2);
        bytes.push(0x00); // no features
        bytes.extend(block(BLOCK_COMMENT, b"hello"));
        let parsed = parse_file(&bytes).unwrap();
        assert!(parsed.trajectory.is_none());
    }

    #[test]
    fn version_2_with_crc_mismatch_is_corrupted() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(2);
        bytes.push(FEATURE_CRC32);
        bytes.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        bytes.extend(block(BLOCK_NONE, &[]));
        assert!(matches!(parse_file(&bytes), Err(ShowError::Corrupted(_))));
    }

    #[test]
    fn version_2_with_correct_crc_parses() {
        let mut header_and_body = MAGIC.to_vec();
        header_and_body.push(2);
        header_and_body.push(FEATURE_CRC32);
        header_and_body.extend(block(BLOCK_NONE, &[]));
        let crc = crate::crc::checksum(&header_and_body);

        let mut bytes = MAGIC.to_vec();
        bytes.push(2);
        bytes.push(FEATURE_CRC32);
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend(block(BLOCK_NONE, &[]));
        assert!(parse_file(&bytes).is_ok());
    }

    #[test]
    fn unknown_tag_is_skipped() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(1);
        bytes.extend(block(250, &[1, 2, 3]));
        bytes.extend(block(BLOCK_TRAJECTORY, &trajectory_body()));
        let parsed = parse_file(&bytes).unwrap();
        assert!(parsed.trajectory.is_some());
    }

    #[test]
    fn truncated_block_length_is_read_error() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(1);
        bytes.push(BLOCK_TRAJECTORY);
        bytes.extend_from_slice(&100u16.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        assert!(matches!(parse_file(&bytes), Err(ShowError::Read(_))));
    }
}
