/* class_data_item: the per-class member lists, ULEB128 encoded */

use crate::dex::cursor::Cursor;
use crate::dex::dex_file::{ClassDef, DexFile};
use crate::dex::error::DexError;

/// An `encoded_field` with its index already resolved to an absolute
/// `field_id` index (the wire format stores deltas).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EncodedField {
    pub field_idx: u32,
    pub access_flags: u32,
}

/// An `encoded_method` with its index resolved to an absolute `method_id`
/// index. `code_off == 0` means the method has no body (abstract/native).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct EncodedMethod {
    pub method_idx: u32,
    pub access_flags: u32,
    pub code_off: u32,
}

/// Decoded `class_data_item`: the four member lists of a class.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct ClassData {
    pub static_fields: Vec<EncodedField>,
    pub instance_fields: Vec<EncodedField>,
    pub direct_methods: Vec<EncodedMethod>,
    pub virtual_methods: Vec<EncodedMethod>,
}

impl ClassData {
    /// Decode a `class_data_item` at the cursor position.
    ///
    /// Each entry's index is stored as a delta against the previous entry
    /// in the same list (the first entry's delta is absolute); the running
    /// accumulator resets at the start of each of the four lists.
    pub fn read(cur: &mut Cursor) -> Result<ClassData, DexError> {
        let static_fields_size = cur.read_uleb128()?;
        let instance_fields_size = cur.read_uleb128()?;
        let direct_methods_size = cur.read_uleb128()?;
        let virtual_methods_size = cur.read_uleb128()?;

        let static_fields = Self::read_fields(cur, static_fields_size)?;
        let instance_fields = Self::read_fields(cur, instance_fields_size)?;
        let direct_methods = Self::read_methods(cur, direct_methods_size)?;
        let virtual_methods = Self::read_methods(cur, virtual_methods_size)?;

        Ok(ClassData { static_fields, instance_fields, direct_methods, virtual_methods })
    }

    fn read_fields(cur: &mut Cursor, count: u32) -> Result<Vec<EncodedField>, DexError> {
        let mut fields = Vec::with_capacity(count as usize);
        let mut field_idx = 0u32;
        for _ in 0..count {
            field_idx = field_idx.wrapping_add(cur.read_uleb128()?);
            fields.push(EncodedField {
                field_idx,
                access_flags: cur.read_uleb128()?,
            });
        }
        Ok(fields)
    }

    fn read_methods(cur: &mut Cursor, count: u32) -> Result<Vec<EncodedMethod>, DexError> {
        let mut methods = Vec::with_capacity(count as usize);
        let mut method_idx = 0u32;
        for _ in 0..count {
            method_idx = method_idx.wrapping_add(cur.read_uleb128()?);
            methods.push(EncodedMethod {
                method_idx,
                access_flags: cur.read_uleb128()?,
                code_off: cur.read_uleb128()?,
            });
        }
        Ok(methods)
    }
}

impl DexFile {
    /// Decode the member lists of a class. Empty lists when the class def
    /// carries no class data at all (`class_data_off == 0`).
    pub fn class_data(&self, def: &ClassDef) -> Result<ClassData, DexError> {
        if def.class_data_off == 0 {
            return Ok(ClassData::default());
        }
        let mut cur = self.cursor();
        cur.seek(def.class_data_off as usize)?;
        ClassData::read(&mut cur)
    }
}
