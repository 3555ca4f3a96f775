/* debug_info_item: the line-number / local-variable byte program */

use log::warn;
use serde::{Deserialize, Serialize};

use crate::dex::code::CodeItem;
use crate::dex::cursor::Cursor;
use crate::dex::dex_file::DexFile;
use crate::dex::error::DexError;

const DBG_END_SEQUENCE: u8 = 0x00;
const DBG_ADVANCE_PC: u8 = 0x01;
const DBG_ADVANCE_LINE: u8 = 0x02;
const DBG_START_LOCAL: u8 = 0x03;
const DBG_START_LOCAL_EXTENDED: u8 = 0x04;
const DBG_END_LOCAL: u8 = 0x05;
const DBG_RESTART_LOCAL: u8 = 0x06;
const DBG_SET_PROLOGUE_END: u8 = 0x07;
const DBG_SET_EPILOGUE_BEGIN: u8 = 0x08;
const DBG_SET_FILE: u8 = 0x09;
const DBG_FIRST_SPECIAL: u8 = 0x0a;
const DBG_LINE_BASE: i32 = -4;
const DBG_LINE_RANGE: i32 = 15;

/// One address→line entry of the positions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub address: u32,
    pub line: i32,
}

/// A local variable live range: `[start_address, end_address)` in
/// instruction units. Name, descriptor and signature may each be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVar {
    pub register: u32,
    pub start_address: u32,
    pub end_address: u32,
    pub name: Option<String>,
    pub descriptor: Option<String>,
    pub signature: Option<String>,
}

/// The decoded debug program of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub line_start: u32,
    pub parameter_names: Vec<Option<String>>,
    pub positions: Vec<Position>,
    /// Sorted by ascending end address, then register.
    pub locals: Vec<LocalVar>,
    pub prologue_ends: Vec<u32>,
    pub epilogue_begins: Vec<u32>,
    /// Source file override set by DBG_SET_FILE, if any.
    pub source_file: Option<String>,
}

/// Everything the machine remembers about one register.
#[derive(Debug, Clone)]
struct RegState {
    name: Option<String>,
    descriptor: Option<String>,
    signature: Option<String>,
    start_address: u32,
}

fn close_local(locals: &mut Vec<LocalVar>, register: u32, state: RegState, end_address: u32) {
    locals.push(LocalVar {
        register,
        start_address: state.start_address,
        end_address,
        name: state.name,
        descriptor: state.descriptor,
        signature: state.signature,
    });
}

impl DexFile {
    /// Optional string reference: uleb128p1, where -1 marks "absent".
    fn opt_string(&self, cur: &mut Cursor) -> Result<Option<String>, DexError> {
        let idx = cur.read_uleb128p1()?;
        if idx < 0 {
            return Ok(None);
        }
        self.string_at(idx as u32).map(Some)
    }

    /// Optional type reference, resolved to its descriptor.
    fn opt_type_descriptor(&self, cur: &mut Cursor) -> Result<Option<String>, DexError> {
        let idx = cur.read_uleb128p1()?;
        if idx < 0 {
            return Ok(None);
        }
        self.type_descriptor_at(idx as u32).map(Some)
    }

    /// Run the debug byte program attached to a code item.
    ///
    /// Returns an all-empty `DebugInfo` when the method carries none
    /// (`debug_info_off == 0`). The program is a little state machine over
    /// `address` and `line`; its only terminators are DBG_END_SEQUENCE and
    /// the tolerated out-of-range register in a start-local opcode, which
    /// produces the same terminal state (all live locals flushed at the
    /// method's instruction-unit count).
    pub fn debug_info(&self, code: &CodeItem) -> Result<DebugInfo, DexError> {
        if code.debug_info_off == 0 {
            return Ok(DebugInfo::default());
        }

        let mut cur = self.cursor();
        cur.seek(code.debug_info_off as usize)?;

        let line_start = cur.read_uleb128()?;
        let parameters_size = cur.read_uleb128()?;
        let mut parameter_names = Vec::with_capacity(parameters_size as usize);
        for _ in 0..parameters_size {
            // string_at() resolves through its own cursor, so the program
            // position is unaffected by the lookup.
            parameter_names.push(self.opt_string(&mut cur)?);
        }

        let registers = code.registers_size as u32;
        let insns_size = code.insns.len() as u32;

        let mut info = DebugInfo {
            line_start,
            parameter_names,
            ..DebugInfo::default()
        };

        let mut address: u32 = 0;
        let mut line: i32 = line_start as i32;
        let mut live: Vec<Option<RegState>> = vec![None; registers as usize];
        let mut remembered: Vec<Option<RegState>> = vec![None; registers as usize];

        loop {
            if cur.remaining() == 0 {
                return Err(DexError::UnexpectedEndOfStream { offset: cur.tell() });
            }
            let opcode = cur.read_u8()?;

            match opcode {
                DBG_END_SEQUENCE => {
                    for (reg, slot) in live.iter_mut().enumerate() {
                        if let Some(state) = slot.take() {
                            close_local(&mut info.locals, reg as u32, state, insns_size);
                        }
                    }
                    break;
                }
                DBG_ADVANCE_PC => {
                    address = address.wrapping_add(cur.read_uleb128()?);
                }
                DBG_ADVANCE_LINE => {
                    line = line.wrapping_add(cur.read_sleb128()?);
                }
                DBG_START_LOCAL | DBG_START_LOCAL_EXTENDED => {
                    let reg = cur.read_uleb128()?;
                    if reg >= registers {
                        // Malformed-stream tolerance: terminate exactly as
                        // DBG_END_SEQUENCE would.
                        warn!(
                            "[debug] start-local register v{} outside frame of {}; treating as end of sequence",
                            reg, registers
                        );
                        for (r, slot) in live.iter_mut().enumerate() {
                            if let Some(state) = slot.take() {
                                close_local(&mut info.locals, r as u32, state, insns_size);
                            }
                        }
                        break;
                    }
                    let name = self.opt_string(&mut cur)?;
                    let descriptor = self.opt_type_descriptor(&mut cur)?;
                    let signature = if opcode == DBG_START_LOCAL_EXTENDED {
                        self.opt_string(&mut cur)?
                    } else {
                        None
                    };

                    if let Some(prev) = live[reg as usize].take() {
                        close_local(&mut info.locals, reg, prev, address);
                    }
                    let state = RegState { name, descriptor, signature, start_address: address };
                    remembered[reg as usize] = Some(state.clone());
                    live[reg as usize] = Some(state);
                }
                DBG_END_LOCAL => {
                    let reg = cur.read_uleb128()?;
                    if (reg as usize) < live.len() {
                        if let Some(state) = live[reg as usize].take() {
                            close_local(&mut info.locals, reg, state, address);
                        }
                    }
                }
                DBG_RESTART_LOCAL => {
                    let reg = cur.read_uleb128()?;
                    if reg >= registers {
                        return Err(DexError::InvalidDebugStream {
                            reason: "restart of a register outside the frame",
                            register: reg,
                        });
                    }
                    match &remembered[reg as usize] {
                        None => {
                            return Err(DexError::InvalidDebugStream {
                                reason: "restart of a register that was never started",
                                register: reg,
                            });
                        }
                        Some(prev) => {
                            // A restart of an already-live register is a no-op.
                            if live[reg as usize].is_none() {
                                live[reg as usize] = Some(RegState {
                                    start_address: address,
                                    ..prev.clone()
                                });
                            }
                        }
                    }
                }
                DBG_SET_PROLOGUE_END => {
                    info.prologue_ends.push(address);
                }
                DBG_SET_EPILOGUE_BEGIN => {
                    info.epilogue_begins.push(address);
                }
                DBG_SET_FILE => {
                    info.source_file = self.opt_string(&mut cur)?;
                }
                _ => {
                    // Special opcode: one byte advancing address and line together.
                    let adj = (opcode - DBG_FIRST_SPECIAL) as i32;
                    address = address.wrapping_add((adj / DBG_LINE_RANGE) as u32);
                    line = line.wrapping_add(DBG_LINE_BASE + (adj % DBG_LINE_RANGE));
                    info.positions.push(Position { address, line });
                }
            }
        }

        info.locals.sort_by(|a, b| {
            a.end_address
                .cmp(&b.end_address)
                .then(a.register.cmp(&b.register))
        });
        Ok(info)
    }
}
