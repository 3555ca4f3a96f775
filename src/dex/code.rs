/* code_item: a method body with its try/catch tables */

use log::warn;

use crate::dex::class_data::EncodedMethod;
use crate::dex::cursor::Cursor;
use crate::dex::dex_file::DexFile;
use crate::dex::error::DexError;

/// One `(type, handler address)` pair of a catch handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTypeAddrPair {
    pub type_idx: u32,
    pub addr: u32,
}

/// A `try_item`: a guarded range of instruction units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryItem {
    pub start_addr: u32,
    pub insn_count: u16,
    /// Byte offset of this try's handler record, relative to the start of
    /// the encoded_catch_handler_list (not file-absolute). Several tries
    /// may share one handler record.
    pub handler_off: u16,
}

impl TryItem {
    pub fn read(cur: &mut Cursor) -> Result<TryItem, DexError> {
        Ok(TryItem {
            start_addr: cur.read_u32()?,
            insn_count: cur.read_u16()?,
            handler_off: cur.read_u16()?,
        })
    }
}

/// An `encoded_catch_handler`. A catch-all handler is encoded on the wire
/// as a non-positive pair count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCatchHandler {
    pub handlers: Vec<EncodedTypeAddrPair>,
    pub catch_all_addr: Option<u32>,
}

impl EncodedCatchHandler {
    pub fn read(cur: &mut Cursor) -> Result<EncodedCatchHandler, DexError> {
        let size = cur.read_sleb128()?;
        let count = size.unsigned_abs() as usize;
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            pairs.push(EncodedTypeAddrPair {
                type_idx: cur.read_uleb128()?,
                addr: cur.read_uleb128()?,
            });
        }
        // size <= 0 means the handler also catches everything else.
        let catch_all_addr = if size <= 0 { Some(cur.read_uleb128()?) } else { None };
        Ok(EncodedCatchHandler { handlers: pairs, catch_all_addr })
    }

    pub fn catches_all(&self) -> bool {
        self.catch_all_addr.is_some()
    }
}

/// A handler record together with its byte offset within the
/// encoded_catch_handler_list, so a `TryItem::handler_off` can be matched
/// back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchHandlerEntry {
    pub offset: u32,
    pub handler: EncodedCatchHandler,
}

/// A decoded `code_item`. Instructions are exposed as raw 16-bit code
/// units; interpreting them is a caller concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeItem {
    pub registers_size: u16,
    pub ins_size: u16,
    pub outs_size: u16,
    pub debug_info_off: u32,
    pub insns: Vec<u16>,
    pub tries: Vec<TryItem>,
    pub handlers: Vec<CatchHandlerEntry>,
}

impl CodeItem {
    pub fn read(cur: &mut Cursor) -> Result<CodeItem, DexError> {
        let registers_size = cur.read_u16()?;
        let ins_size = cur.read_u16()?;
        let outs_size = cur.read_u16()?;
        let tries_size = cur.read_u16()?;
        let debug_info_off = cur.read_u32()?;
        let insns_size = cur.read_u32()?;

        let mut insns = Vec::with_capacity(insns_size as usize);
        for _ in 0..insns_size {
            insns.push(cur.read_u16()?);
        }

        let mut tries = Vec::with_capacity(tries_size as usize);
        let mut handlers = Vec::new();
        if tries_size > 0 {
            // Align the try table to 4 bytes when the instruction count is odd.
            if (insns_size & 1) != 0 {
                let padding = cur.read_u16()?;
                if padding != 0 {
                    warn!("[codeitem] non-zero alignment padding {:#06x} at {:#x}", padding, cur.tell() - 2);
                }
            }

            for _ in 0..tries_size {
                tries.push(TryItem::read(cur)?);
            }

            // The handler-list size field only exists when there are tries.
            // handler_off values are relative to the list start, which
            // includes the size field itself.
            let list_start = cur.tell();
            let handlers_size = cur.read_uleb128()?;
            for _ in 0..handlers_size {
                let offset = (cur.tell() - list_start) as u32;
                handlers.push(CatchHandlerEntry {
                    offset,
                    handler: EncodedCatchHandler::read(cur)?,
                });
            }
        }

        Ok(CodeItem {
            registers_size,
            ins_size,
            outs_size,
            debug_info_off,
            insns,
            tries,
            handlers,
        })
    }

    /// Look up the handler record a `TryItem::handler_off` points at.
    pub fn handler_at(&self, handler_off: u16) -> Option<&EncodedCatchHandler> {
        self.handlers
            .iter()
            .find(|e| e.offset == handler_off as u32)
            .map(|e| &e.handler)
    }
}

impl DexFile {
    /// Decode a method's body, or `None` for methods without one
    /// (`code_off == 0`: abstract and native methods).
    pub fn code_item(&self, method: &EncodedMethod) -> Result<Option<CodeItem>, DexError> {
        if method.code_off == 0 {
            return Ok(None);
        }
        let mut cur = self.cursor();
        cur.seek(method.code_off as usize)?;
        CodeItem::read(&mut cur).map(Some)
    }
}
