use crate::dex::error::DexError;

/// DEX LEB128 values are 32-bit, so a valid encoding is at most 5 bytes.
const MAX_LEB_BYTES: usize = 5;

/// Decode an unsigned LEB128 value starting at `start`.
/// Returns the value and the number of bytes consumed.
pub(crate) fn decode_uleb128(bytes: &[u8], start: usize) -> Result<(u32, usize), DexError> {
    let mut value: u32 = 0;
    let mut shift: u32 = 0;
    let mut count: usize = 0;

    loop {
        let byte = match bytes.get(start + count) {
            Some(b) => *b,
            None => return Err(DexError::MalformedVarint { offset: start }),
        };
        count += 1;

        let low = (byte & 0x7F) as u32;
        if shift < 32 {
            value |= low.wrapping_shl(shift);
        }

        if (byte & 0x80) == 0 {
            return Ok((value, count));
        }
        if count == MAX_LEB_BYTES {
            return Err(DexError::MalformedVarint { offset: start });
        }
        shift += 7;
    }
}

/// Decode a signed LEB128 value starting at `start`.
/// Sign-extends from the final 7-bit group when fewer than 32 bits were filled.
pub(crate) fn decode_sleb128(bytes: &[u8], start: usize) -> Result<(i32, usize), DexError> {
    let mut value: i32 = 0;
    let mut shift: u32 = 0;
    let mut count: usize = 0;

    loop {
        let byte = match bytes.get(start + count) {
            Some(b) => *b,
            None => return Err(DexError::MalformedVarint { offset: start }),
        };
        count += 1;

        let low = (byte & 0x7F) as i32;
        if shift < 32 {
            value |= low.wrapping_shl(shift);
        }
        shift += 7;

        if (byte & 0x80) == 0 {
            if (byte & 0x40) != 0 && shift < 32 {
                value |= (-1i32).wrapping_shl(shift);
            }
            return Ok((value, count));
        }
        if count == MAX_LEB_BYTES {
            return Err(DexError::MalformedVarint { offset: start });
        }
    }
}

/// Decode a `uleb128p1`: an unsigned LEB128 biased by one, so that -1
/// (the "no index" marker) encodes as 0.
pub(crate) fn decode_uleb128p1(bytes: &[u8], start: usize) -> Result<(i32, usize), DexError> {
    let (v, c) = decode_uleb128(bytes, start)?;
    Ok((v as i32 - 1, c))
}
