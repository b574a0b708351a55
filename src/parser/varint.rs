//!
//! Bitcoin compact size integers.
//!
//! | value range        | encoding              | width |
//! |--------------------|-----------------------|-------|
//! | `0..=0xfc`         | the byte itself       | 1     |
//! | `0xfd..=0xffff`    | `0xfd` + `u16` (LE)   | 3     |
//! | `0x10000..=u32::MAX` | `0xfe` + `u32` (LE) | 5     |
//! | above              | `0xff` + `u64` (LE)   | 9     |
//!
use crate::parser::errors::OpResult;
use crate::parser::reader::BlockchainRead;
use std::io::Cursor;

pub(crate) const VARINT_U16_PREFIX: u8 = 0xfd;
pub(crate) const VARINT_U32_PREFIX: u8 = 0xfe;
pub(crate) const VARINT_U64_PREFIX: u8 = 0xff;

/// A decoded compact size and the number of bytes it occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Varint {
    pub value: u64,
    pub consumed: usize,
}

///
/// Decode the compact size at the start of `buffer`.
///
/// Fails with `TruncatedInput` if `buffer` ends before the
/// width announced by the prefix byte.
///
pub fn decode_varint(buffer: &[u8]) -> OpResult<Varint> {
    Cursor::new(buffer).read_compact_size()
}

/// canonical (shortest) encoding of `value`
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(VARINT_U16_PREFIX);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffff_ffff => {
            out.push(VARINT_U32_PREFIX);
            out.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            out.push(VARINT_U64_PREFIX);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}
