//! Low-level wire format primitives shared by the encoder and the decoder.
//!
//! Protocol buffer payloads are streams of tagged values. The tag is a varint
//! of `(field number << 3) | wire type`; the wire type tells a reader how to
//! frame the payload that follows even when the field itself is unknown.

use bytes::{BufMut, BytesMut};

/// Varint payload (wire type 0).
pub const WIRE_VARINT: u8 = 0;

/// 64-bit little-endian payload (wire type 1).
pub const WIRE_FIXED64: u8 = 1;

/// Length-delimited payload (wire type 2).
pub const WIRE_LEN_DELIMITED: u8 = 2;

/// Legacy group start marker (wire type 3).
pub const WIRE_START_GROUP: u8 = 3;

/// Legacy group end marker (wire type 4).
pub const WIRE_END_GROUP: u8 = 4;

/// 32-bit little-endian payload (wire type 5).
pub const WIRE_FIXED32: u8 = 5;

/// Smallest valid field number.
pub const ID_MIN: u64 = 1;

/// Largest valid field number.
pub const ID_MAX: u64 = (1 << 29) - 1;

/// Composes a field tag from a field number and a wire type.
pub fn make_tag(number: u64, wire_type: u8) -> u64
{
    number << 3 | u64::from(wire_type)
}

/// Splits a field tag into its field number and wire type.
pub fn split_tag(tag: u64) -> (u64, u8)
{
    (tag >> 3, (tag & 0x07) as u8)
}

/// Writes a base-128 varint.
pub fn write_varint(buf: &mut BytesMut, mut value: u64)
{
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            break;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Reads a base-128 varint, advancing `data` past it.
///
/// Returns `None` when the input ends in the middle of the varint or when the
/// continuation bits run past the ten bytes a 64-bit value can occupy.
pub fn read_varint(data: &mut &[u8]) -> Option<u64>
{
    let mut result = 0u64;
    for idx in 0..10 {
        let b = *data.get(idx)?;
        result |= u64::from(b & 0x7f) << (idx * 7);
        if b & 0x80 == 0 {
            *data = &data[idx + 1..];
            return Some(result);
        }
    }
    None
}

/// Maps a signed 32-bit value onto the zig-zag unsigned form.
pub fn zigzag_encode32(value: i32) -> u32
{
    ((value << 1) ^ (value >> 31)) as u32
}

/// Maps a signed 64-bit value onto the zig-zag unsigned form.
pub fn zigzag_encode64(value: i64) -> u64
{
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode32`].
pub fn zigzag_decode32(value: u32) -> i32
{
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Inverse of [`zigzag_encode64`].
pub fn zigzag_decode64(value: u64) -> i64
{
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Reads four bytes, advancing `data` past them.
pub fn read_fixed32(data: &mut &[u8]) -> Option<[u8; 4]>
{
    if data.len() < 4 {
        return None;
    }
    let mut out = [0u8; 4];
    out.copy_from_slice(&data[..4]);
    *data = &data[4..];
    Some(out)
}

/// Reads eight bytes, advancing `data` past them.
pub fn read_fixed64(data: &mut &[u8]) -> Option<[u8; 8]>
{
    if data.len() < 8 {
        return None;
    }
    let mut out = [0u8; 8];
    out.copy_from_slice(&data[..8]);
    *data = &data[8..];
    Some(out)
}
