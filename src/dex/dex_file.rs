/* Dex file format structures: header, id tables and the parsed-file object */

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::dex::cursor::Cursor;
use crate::dex::error::DexError;
use crate::types::descriptor_to_display;

/* Constants */
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const REVERSE_ENDIAN_CONSTANT: u32 = 0x78563412;
pub const NO_INDEX: u32 = 0xffffffff;

const HEADER_SIZE: usize = 0x70;
const SHA1_DIGEST_LEN: usize = 20;

/* Fixed record strides within the id sections */
const STRING_ID_STRIDE: u32 = 4;
const TYPE_ID_STRIDE: u32 = 4;
const PROTO_ID_STRIDE: u32 = 12;
const FIELD_ID_STRIDE: u32 = 8;
const METHOD_ID_STRIDE: u32 = 8;
const CLASS_DEF_STRIDE: u32 = 32;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header {
    pub fn read(cur: &mut Cursor) -> Result<Header, DexError> {
        let magic = <[u8; 8]>::try_from(cur.read_bytes(8)?).unwrap();
        if !Self::valid_magic(&magic) {
            return Err(DexError::InvalidMagic { magic });
        }

        Ok(Header {
            magic,
            checksum: cur.read_u32()?,
            signature: <[u8; 20]>::try_from(cur.read_bytes(SHA1_DIGEST_LEN)?).unwrap(),
            file_size: cur.read_u32()?,
            header_size: cur.read_u32()?,
            endian_tag: cur.read_u32()?,
            link_size: cur.read_u32()?,
            link_off: cur.read_u32()?,
            map_off: cur.read_u32()?,
            string_ids_size: cur.read_u32()?,
            string_ids_off: cur.read_u32()?,
            type_ids_size: cur.read_u32()?,
            type_ids_off: cur.read_u32()?,
            proto_ids_size: cur.read_u32()?,
            proto_ids_off: cur.read_u32()?,
            field_ids_size: cur.read_u32()?,
            field_ids_off: cur.read_u32()?,
            method_ids_size: cur.read_u32()?,
            method_ids_off: cur.read_u32()?,
            class_defs_size: cur.read_u32()?,
            class_defs_off: cur.read_u32()?,
            data_size: cur.read_u32()?,
            data_off: cur.read_u32()?,
        })
    }

    // "dex\n" + three ASCII digits + NUL, e.g. "dex\n035\0"
    fn valid_magic(magic: &[u8; 8]) -> bool {
        magic[0..4] == *b"dex\n"
            && magic[4].is_ascii_digit()
            && magic[5].is_ascii_digit()
            && magic[6].is_ascii_digit()
            && magic[7] == 0
    }

    /// The numeric DEX version from the magic, e.g. 35, 38, 39.
    pub fn version(&self) -> u32 {
        ((self.magic[4] - b'0') as u32) * 100
            + ((self.magic[5] - b'0') as u32) * 10
            + ((self.magic[6] - b'0') as u32)
    }
}

/// A `proto_id_item`: method shape without a name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ProtoId {
    pub shorty_idx: u32,
    pub return_type_idx: u32,
    pub parameters_off: u32,
}

/// A `field_id_item`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FieldId {
    pub class_idx: u16,
    pub type_idx: u16,
    pub name_idx: u32,
}

/// A `method_id_item`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodId {
    pub class_idx: u16,
    pub proto_idx: u16,
    pub name_idx: u32,
}

/// A `class_def_item`. Offsets of 0 mean the referenced item is absent;
/// `superclass_idx == NO_INDEX` marks a class with no supertype.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassDef {
    pub class_idx: u32,
    pub access_flags: u32,
    pub superclass_idx: u32,
    pub interfaces_off: u32,
    pub source_file_idx: u32,
    pub annotations_off: u32,
    pub class_data_off: u32,
    pub static_values_off: u32,
}

/// A `type_list`: interface lists and method parameter lists.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TypeList(pub Vec<u16>);

impl TypeList {
    pub fn read(cur: &mut Cursor) -> Result<TypeList, DexError> {
        let size = cur.read_u32()?;
        let mut v = Vec::with_capacity(size as usize);
        for _ in 0..size {
            v.push(cur.read_u16()?);
        }
        Ok(TypeList(v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An entry of the `map_list` section.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MapItem {
    pub item_type: u16,
    pub size: u32,
    pub offset: u32,
}

/// A parsed DEX file.
///
/// The header is decoded eagerly at construction; everything else is read
/// on demand through the section accessors, with per-file memoization for
/// decoded strings and descriptor lookups. The caches use interior
/// mutability and are append-only, so the object is meant for
/// single-threaded use (wrap it in a lock if you must share it).
#[derive(Debug)]
pub struct DexFile {
    data: Vec<u8>,
    pub header: Header,
    string_cache: RefCell<HashMap<u32, String>>,
    class_def_idx_cache: RefCell<HashMap<String, Option<u32>>>,
}

impl DexFile {
    /// Parse a DEX image held in memory. Fails on a malformed magic or if
    /// the header's declared file size does not match the buffer length.
    pub fn from_bytes(bytes: &[u8]) -> Result<DexFile, DexError> {
        let mut cur = Cursor::new(bytes);
        if bytes.len() < HEADER_SIZE {
            return Err(DexError::OutOfRange { offset: HEADER_SIZE, len: bytes.len() });
        }
        let header = Header::read(&mut cur)?;
        if header.file_size as usize != bytes.len() {
            return Err(DexError::SizeMismatch {
                declared: header.file_size,
                actual: bytes.len(),
            });
        }

        Ok(DexFile {
            data: bytes.to_vec(),
            header,
            string_cache: RefCell::new(HashMap::new()),
            class_def_idx_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn from_file(path: &Path) -> Result<DexFile, DexError> {
        let bytes = fs::read(path)
            .map_err(|e| DexError::Io { message: e.to_string() })?;
        DexFile::from_bytes(&bytes)
    }

    pub(crate) fn cursor(&self) -> Cursor<'_> {
        Cursor::new(&self.data)
    }

    fn check_index(what: &'static str, index: u32, size: u32) -> Result<(), DexError> {
        if index >= size {
            return Err(DexError::IndexOutOfRange { what, index, size });
        }
        Ok(())
    }

    /// File offset of the `string_data_item` for a string id.
    pub fn string_data_offset(&self, string_idx: u32) -> Result<u32, DexError> {
        Self::check_index("string", string_idx, self.header.string_ids_size)?;
        let off = self.header.string_ids_off + string_idx * STRING_ID_STRIDE;
        self.cursor().u32_at(off as usize)
    }

    /// Decode the string for a string id, memoized per file.
    ///
    /// The `string_data_item` stores an advisory UTF-16 length followed by
    /// MUTF-8 bytes and a NUL terminator; decoding reads to the NUL. MUTF-8
    /// is decoded via cesu8, falling back to lossy UTF-8 for byte runs that
    /// are not valid MUTF-8, so one bad constant cannot abort enumeration.
    pub fn string_at(&self, string_idx: u32) -> Result<String, DexError> {
        if let Some(s) = self.string_cache.borrow().get(&string_idx) {
            return Ok(s.clone());
        }

        let data_off = self.string_data_offset(string_idx)?;
        let mut cur = self.cursor();
        cur.seek(data_off as usize)?;
        let _utf16_len = cur.read_uleb128()?;
        let raw = cur.read_bytes_nul()?;

        let s = match cesu8::from_java_cesu8(raw) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => String::from_utf8_lossy(raw).into_owned(),
        };

        self.string_cache.borrow_mut().insert(string_idx, s.clone());
        Ok(s)
    }

    /// The type descriptor for a type id, e.g. `Ljava/lang/String;` or `[I`.
    pub fn type_descriptor_at(&self, type_idx: u32) -> Result<String, DexError> {
        Self::check_index("type", type_idx, self.header.type_ids_size)?;
        let off = self.header.type_ids_off + type_idx * TYPE_ID_STRIDE;
        let descriptor_idx = self.cursor().u32_at(off as usize)?;
        self.string_at(descriptor_idx)
    }

    /// The display name for a type id, e.g. `java.lang.String` or `int[]`.
    pub fn display_type_at(&self, type_idx: u32) -> Result<String, DexError> {
        Ok(descriptor_to_display(&self.type_descriptor_at(type_idx)?))
    }

    pub fn proto_id(&self, proto_idx: u32) -> Result<ProtoId, DexError> {
        Self::check_index("proto", proto_idx, self.header.proto_ids_size)?;
        let off = self.header.proto_ids_off + proto_idx * PROTO_ID_STRIDE;
        let mut cur = self.cursor();
        cur.seek(off as usize)?;
        Ok(ProtoId {
            shorty_idx: cur.read_u32()?,
            return_type_idx: cur.read_u32()?,
            parameters_off: cur.read_u32()?,
        })
    }

    pub fn field_id(&self, field_idx: u32) -> Result<FieldId, DexError> {
        Self::check_index("field", field_idx, self.header.field_ids_size)?;
        let off = self.header.field_ids_off + field_idx * FIELD_ID_STRIDE;
        let mut cur = self.cursor();
        cur.seek(off as usize)?;
        Ok(FieldId {
            class_idx: cur.read_u16()?,
            type_idx: cur.read_u16()?,
            name_idx: cur.read_u32()?,
        })
    }

    pub fn method_id(&self, method_idx: u32) -> Result<MethodId, DexError> {
        Self::check_index("method", method_idx, self.header.method_ids_size)?;
        let off = self.header.method_ids_off + method_idx * METHOD_ID_STRIDE;
        let mut cur = self.cursor();
        cur.seek(off as usize)?;
        Ok(MethodId {
            class_idx: cur.read_u16()?,
            proto_idx: cur.read_u16()?,
            name_idx: cur.read_u32()?,
        })
    }

    pub fn class_def(&self, class_def_idx: u32) -> Result<ClassDef, DexError> {
        Self::check_index("class_def", class_def_idx, self.header.class_defs_size)?;
        let off = self.header.class_defs_off + class_def_idx * CLASS_DEF_STRIDE;
        let mut cur = self.cursor();
        cur.seek(off as usize)?;
        Ok(ClassDef {
            class_idx: cur.read_u32()?,
            access_flags: cur.read_u32()?,
            superclass_idx: cur.read_u32()?,
            interfaces_off: cur.read_u32()?,
            source_file_idx: cur.read_u32()?,
            annotations_off: cur.read_u32()?,
            class_data_off: cur.read_u32()?,
            static_values_off: cur.read_u32()?,
        })
    }

    /// Decode a `type_list` at a file offset. Callers use the `Option`
    /// wrappers below; a zero offset means "no list at all", which is not
    /// the same thing as an empty list.
    pub fn type_list_at(&self, off: u32) -> Result<TypeList, DexError> {
        let mut cur = self.cursor();
        cur.seek(off as usize)?;
        TypeList::read(&mut cur)
    }

    /// Interfaces of a class def, `None` when `interfaces_off == 0`.
    pub fn interfaces_list(&self, def: &ClassDef) -> Result<Option<TypeList>, DexError> {
        if def.interfaces_off == 0 {
            return Ok(None);
        }
        self.type_list_at(def.interfaces_off).map(Some)
    }

    /// Parameter types of a prototype, `None` when `parameters_off == 0`.
    pub fn parameters_list(&self, proto: &ProtoId) -> Result<Option<TypeList>, DexError> {
        if proto.parameters_off == 0 {
            return Ok(None);
        }
        self.type_list_at(proto.parameters_off).map(Some)
    }

    /// Decode the `map_list` section describing the file's layout.
    pub fn map_list(&self) -> Result<Vec<MapItem>, DexError> {
        let mut cur = self.cursor();
        cur.seek(self.header.map_off as usize)?;
        let size = cur.read_u32()?;
        let mut items = Vec::with_capacity(size as usize);
        for _ in 0..size {
            let item_type = cur.read_u16()?;
            let _unused = cur.read_u16()?;
            items.push(MapItem {
                item_type,
                size: cur.read_u32()?,
                offset: cur.read_u32()?,
            });
        }
        Ok(items)
    }

    /// Find the class def whose descriptor matches, or `None`.
    ///
    /// The scan memoizes every descriptor it resolves along the way, so a
    /// later lookup for a different class skips the prefix already visited;
    /// a miss is cached too, making repeated failed lookups O(1).
    pub fn class_def_by_descriptor(&self, descriptor: &str) -> Result<Option<ClassDef>, DexError> {
        if let Some(cached) = self.class_def_idx_cache.borrow().get(descriptor) {
            return match cached {
                Some(idx) => self.class_def(*idx).map(Some),
                None => Ok(None),
            };
        }

        for i in 0..self.header.class_defs_size {
            let def = self.class_def(i)?;
            let def_descriptor = self.type_descriptor_at(def.class_idx)?;
            let found = def_descriptor == descriptor;
            self.class_def_idx_cache
                .borrow_mut()
                .entry(def_descriptor)
                .or_insert(Some(i));
            if found {
                return Ok(Some(def));
            }
        }

        self.class_def_idx_cache
            .borrow_mut()
            .insert(descriptor.to_string(), None);
        Ok(None)
    }
}
