//! The store's binary point-cloud patch wire format.
//!
//! Layout:
//! ```text
//! byte 0       endianness flag (0 = big, 1 = little)
//! bytes 1..4   WKB type tag (ignored)
//! bytes 5..8   pcid, u32, patch endianness
//! bytes 9..12  point count, u32, patch endianness
//! bytes 13..16 payload byte length, u32, patch endianness
//! bytes 17..   payload
//! ```

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::CodecError;

const HEADER_LEN: usize = 17;

/// A parsed patch: the caller-relevant fields plus a reference to its
/// payload bytes. Borrows from the original buffer to avoid copying
/// potentially large compressed payloads.
#[derive(Debug, Clone, Copy)]
pub struct PatchHeader {
    pub little_endian: bool,
    pub pcid: u32,
    pub point_count: u32,
    pub payload_len: u32,
}

fn read_header(wkb: &[u8]) -> Result<PatchHeader, CodecError> {
    if wkb.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            need: HEADER_LEN,
            got: wkb.len(),
        });
    }
    let little_endian = match wkb[0] {
        0 => false,
        1 => true,
        other => return Err(CodecError::BadEndianFlag(other)),
    };

    let mut cursor = Cursor::new(&wkb[5..HEADER_LEN]);
    let (pcid, point_count, payload_len) = if little_endian {
        (
            cursor.read_u32::<LittleEndian>()?,
            cursor.read_u32::<LittleEndian>()?,
            cursor.read_u32::<LittleEndian>()?,
        )
    } else {
        (
            cursor.read_u32::<BigEndian>()?,
            cursor.read_u32::<BigEndian>()?,
            cursor.read_u32::<BigEndian>()?,
        )
    };

    Ok(PatchHeader {
        little_endian,
        pcid,
        point_count,
        payload_len,
    })
}

/// Number of points encoded in a patch (bytes 9..12, honouring the
/// endianness flag at byte 0).
pub fn npoints(wkb: &[u8]) -> Result<u32, CodecError> {
    Ok(read_header(wkb)?.point_count)
}

/// The pcid this patch was stamped with (bytes 5..8).
pub fn pcid(wkb: &[u8]) -> Result<u32, CodecError> {
    Ok(read_header(wkb)?.pcid)
}

/// The patch's payload slice (bytes 17..), validated against the declared
/// payload length.
pub fn payload(wkb: &[u8]) -> Result<&[u8], CodecError> {
    let header = read_header(wkb)?;
    let start = HEADER_LEN;
    let end = start
        .checked_add(header.payload_len as usize)
        .ok_or(CodecError::Truncated {
            need: usize::MAX,
            got: wkb.len(),
        })?;
    wkb.get(start..end).ok_or(CodecError::Truncated {
        need: end,
        got: wkb.len(),
    })
}

/// Build a binary read-response frame: `payload ∥ uint32_le(point_count)`.
/// The footer is always little-endian regardless of the patch's own
/// endianness — a protocol requirement of the consuming viewers, not an
/// accident of the store's native byte order.
pub fn frame_response(payload: &[u8], point_count: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(payload);
    out.write_u32::<LittleEndian>(point_count)
        .expect("writing to a Vec<u8> cannot fail");
    out
}

/// The canonical empty/failure response: `uint32_le(0)`.
pub fn empty_response() -> [u8; 4] {
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, 0);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_patch(little_endian: bool, pcid: u32, point_count: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(if little_endian { 1 } else { 0 });
        buf.extend_from_slice(&[0u8; 4]); // WKB type tag, ignored
        if little_endian {
            buf.write_u32::<LittleEndian>(pcid).unwrap();
            buf.write_u32::<LittleEndian>(point_count).unwrap();
            buf.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        } else {
            buf.write_u32::<BigEndian>(pcid).unwrap();
            buf.write_u32::<BigEndian>(point_count).unwrap();
            buf.write_u32::<BigEndian>(payload.len() as u32).unwrap();
        }
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn roundtrip_little_endian() {
        let wkb = build_patch(true, 7, 400, b"payload-bytes");
        assert_eq!(npoints(&wkb).unwrap(), 400);
        assert_eq!(pcid(&wkb).unwrap(), 7);
        assert_eq!(payload(&wkb).unwrap(), b"payload-bytes");
    }

    #[test]
    fn roundtrip_big_endian() {
        let wkb = build_patch(false, 3, 12, b"xyz");
        assert_eq!(npoints(&wkb).unwrap(), 12);
        assert_eq!(payload(&wkb).unwrap(), b"xyz");
    }

    #[test]
    fn frame_response_footer_is_always_little_endian() {
        let wkb = build_patch(false, 1, 9, b"abc");
        let p = payload(&wkb).unwrap();
        let framed = frame_response(p, npoints(&wkb).unwrap());
        assert_eq!(&framed[framed.len() - 4..], &[9, 0, 0, 0]);
    }

    #[test]
    fn empty_response_is_four_zero_bytes() {
        assert_eq!(empty_response(), [0, 0, 0, 0]);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let wkb = vec![1u8, 0, 0, 0];
        assert!(matches!(npoints(&wkb), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn bad_endian_flag_is_an_error() {
        let wkb = vec![2u8; HEADER_LEN];
        assert!(matches!(npoints(&wkb), Err(CodecError::BadEndianFlag(2))));
    }
}
