use std::fmt;

/// Errors raised while decoding a DEX image.
///
/// Every decode failure is surfaced to the immediate caller; nothing is
/// silently truncated. A failed class lookup is *not* an error — the loader
/// returns `None` for those.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DexError {
    /// A seek or read landed outside the backing buffer.
    OutOfRange { offset: usize, len: usize },
    /// The 8-byte header magic is not `dex\n` + three digits + NUL.
    InvalidMagic { magic: [u8; 8] },
    /// The header's declared file size differs from the buffer length.
    SizeMismatch { declared: u32, actual: usize },
    /// A section or register index is outside its declared bound.
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        size: u32,
    },
    /// A LEB128 sequence ran past 5 bytes or off the end of the buffer.
    MalformedVarint { offset: usize },
    /// The debug byte-code referenced a register it never introduced, or
    /// one outside the method's register frame.
    InvalidDebugStream { reason: &'static str, register: u32 },
    /// The debug byte-code ended without a DBG_END_SEQUENCE opcode.
    UnexpectedEndOfStream { offset: usize },
    /// Reading the file from disk failed.
    Io { message: String },
}

impl fmt::Display for DexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexError::OutOfRange { offset, len } => {
                write!(f, "offset {} out of range (buffer is {} bytes)", offset, len)
            }
            DexError::InvalidMagic { magic } => {
                write!(f, "invalid DEX magic: {:02x?}", magic)
            }
            DexError::SizeMismatch { declared, actual } => {
                write!(
                    f,
                    "DEX file size mismatch: header declares {} but buffer is {} bytes",
                    declared, actual
                )
            }
            DexError::IndexOutOfRange { what, index, size } => {
                write!(f, "{} index {} out of range (section has {})", what, index, size)
            }
            DexError::MalformedVarint { offset } => {
                write!(f, "malformed LEB128 value at offset {:#x}", offset)
            }
            DexError::InvalidDebugStream { reason, register } => {
                write!(f, "invalid debug stream: {} (register v{})", reason, register)
            }
            DexError::UnexpectedEndOfStream { offset } => {
                write!(f, "debug stream ended without DBG_END_SEQUENCE at offset {:#x}", offset)
            }
            DexError::Io { message } => {
                write!(f, "io error: {}", message)
            }
        }
    }
}

impl std::error::Error for DexError {}
