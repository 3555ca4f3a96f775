//! Builds a small, fully-formed DEX image in memory for the integration
//! tests: one class `com.example.Foo implements java.lang.Runnable` with
//! two fields and three methods, one of which carries a try/catch table
//! and both of which carry debug programs.

/// String table, kept sorted as a real dx-produced file would be.
pub const STRINGS: [&str; 15] = [
    "<init>",                // 0
    "Foo.java",              // 1
    "I",                     // 2
    "Lcom/example/Foo;",     // 3
    "Ljava/lang/Exception;", // 4
    "Ljava/lang/Object;",    // 5
    "Ljava/lang/Runnable;",  // 6
    "MAX",                   // 7
    "V",                     // 8
    "VI",                    // 9
    "count",                 // 10
    "i",                     // 11
    "run",                   // 12
    "setCount",              // 13
    "value",                 // 14
];

/// Type table: string index backing each type id.
const TYPE_STRING_IDS: [u32; 6] = [
    2, // 0: I
    3, // 1: Lcom/example/Foo;
    4, // 2: Ljava/lang/Exception;
    5, // 3: Ljava/lang/Object;
    6, // 4: Ljava/lang/Runnable;
    8, // 5: V
];

pub const TYPE_INT: u32 = 0;
pub const TYPE_FOO: u32 = 1;
pub const TYPE_EXCEPTION: u32 = 2;
pub const TYPE_OBJECT: u32 = 3;
pub const TYPE_RUNNABLE: u32 = 4;

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_uleb128(out: &mut Vec<u8>, mut v: u32) {
    loop {
        let mut byte = (v & 0x7F) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
}

fn put_sleb128(out: &mut Vec<u8>, v: i32) {
    let mut remaining = v;
    loop {
        let mut byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        let more = !((remaining == 0 && (byte & 0x40) == 0)
            || (remaining == -1 && (byte & 0x40) != 0));
        if more {
            byte |= 0x80;
        }
        out.push(byte);
        if !more {
            break;
        }
    }
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

/// Assemble the fixture image. All offsets are computed, never hard-coded,
/// so the content can be adjusted without re-deriving the layout.
pub fn build_dex() -> Vec<u8> {
    let string_ids_off: u32 = 0x70;
    let type_ids_off = string_ids_off + STRINGS.len() as u32 * 4;
    let proto_ids_off = type_ids_off + TYPE_STRING_IDS.len() as u32 * 4;
    let field_ids_off = proto_ids_off + 2 * 12;
    let method_ids_off = field_ids_off + 2 * 8;
    let class_defs_off = method_ids_off + 3 * 8;
    let data_off = class_defs_off + 32;

    // --- data section, offsets recorded as they are laid down ---
    let mut data: Vec<u8> = Vec::new();

    let mut string_offs = Vec::with_capacity(STRINGS.len());
    for s in STRINGS {
        string_offs.push(data_off + data.len() as u32);
        put_uleb128(&mut data, s.chars().count() as u32);
        data.extend_from_slice(s.as_bytes());
        data.push(0);
    }

    align4(&mut data);
    let interfaces_off = data_off + data.len() as u32;
    put_u32(&mut data, 1);
    put_u16(&mut data, TYPE_RUNNABLE as u16);

    align4(&mut data);
    let params_off = data_off + data.len() as u32;
    put_u32(&mut data, 1);
    put_u16(&mut data, TYPE_INT as u16);

    // debug program for run()V: a position at line 10, a local "i" in v0,
    // a second position at line 11.
    let run_debug_off = data_off + data.len() as u32;
    put_uleb128(&mut data, 10); // line_start
    put_uleb128(&mut data, 0); // parameters_size
    data.extend_from_slice(&[
        0x07, // DBG_SET_PROLOGUE_END
        0x0e, // special: adj 4 -> pc +0, line +0 -> position {0, 10}
        0x03, 0x00, 0x0c, 0x01, // DBG_START_LOCAL v0, name "i", type I
        0x01, 0x01, // DBG_ADVANCE_PC +1
        0x02, 0x01, // DBG_ADVANCE_LINE +1
        0x0e, // position {1, 11}
        0x00, // DBG_END_SEQUENCE
    ]);

    // debug program for setCount(I)V: one named parameter.
    let set_debug_off = data_off + data.len() as u32;
    put_uleb128(&mut data, 20); // line_start
    put_uleb128(&mut data, 1); // parameters_size
    put_uleb128(&mut data, 14 + 1); // name "value"
    data.extend_from_slice(&[0x0e, 0x00]);

    // code for run()V: 3 units (odd, forcing alignment padding before the
    // try table), one try covering units [0,2) with a catch of Exception
    // plus a catch-all.
    align4(&mut data);
    let run_code_off = data_off + data.len() as u32;
    put_u16(&mut data, 3); // registers_size
    put_u16(&mut data, 1); // ins_size
    put_u16(&mut data, 0); // outs_size
    put_u16(&mut data, 1); // tries_size
    put_u32(&mut data, run_debug_off);
    put_u32(&mut data, 3); // insns_size
    put_u16(&mut data, 0x0012);
    put_u16(&mut data, 0x000e);
    put_u16(&mut data, 0x0000);
    put_u16(&mut data, 0); // alignment padding
    put_u32(&mut data, 0); // try start_addr
    put_u16(&mut data, 2); // try insn_count
    put_u16(&mut data, 1); // try handler_off (first record after the size)
    put_uleb128(&mut data, 1); // handler list size
    put_sleb128(&mut data, -1); // one pair, then a catch-all
    put_uleb128(&mut data, TYPE_EXCEPTION);
    put_uleb128(&mut data, 2); // handler address
    put_uleb128(&mut data, 2); // catch_all_addr

    // code for setCount(I)V: a bare return-void, no tries.
    align4(&mut data);
    let set_code_off = data_off + data.len() as u32;
    put_u16(&mut data, 2);
    put_u16(&mut data, 2);
    put_u16(&mut data, 0);
    put_u16(&mut data, 0);
    put_u32(&mut data, set_debug_off);
    put_u32(&mut data, 1);
    put_u16(&mut data, 0x000e);

    // class data: MAX / count / <init> / run + setCount.
    let class_data_off = data_off + data.len() as u32;
    put_uleb128(&mut data, 1); // static fields
    put_uleb128(&mut data, 1); // instance fields
    put_uleb128(&mut data, 1); // direct methods
    put_uleb128(&mut data, 2); // virtual methods
    put_uleb128(&mut data, 1); // MAX: field idx delta 1
    put_uleb128(&mut data, 0x19); // public static final
    put_uleb128(&mut data, 0); // count: field idx 0
    put_uleb128(&mut data, 0x2); // private
    put_uleb128(&mut data, 0); // <init>: method idx 0
    put_uleb128(&mut data, 0x10001); // public constructor
    put_uleb128(&mut data, 0); // no code
    put_uleb128(&mut data, 1); // run: method idx delta 1
    put_uleb128(&mut data, 0x1); // public
    put_uleb128(&mut data, run_code_off);
    put_uleb128(&mut data, 1); // setCount: method idx delta 1 -> 2
    put_uleb128(&mut data, 0x1); // public
    put_uleb128(&mut data, set_code_off);

    align4(&mut data);
    let map_off = data_off + data.len() as u32;
    put_u32(&mut data, 1);
    put_u16(&mut data, 0x0000); // TYPE_HEADER_ITEM
    put_u16(&mut data, 0);
    put_u32(&mut data, 1);
    put_u32(&mut data, 0);

    // --- assemble the file ---
    let file_size = data_off + data.len() as u32;
    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"dex\n035\0");
    put_u32(&mut bytes, 0); // checksum (not verified)
    bytes.extend_from_slice(&[0u8; 20]); // signature (not verified)
    put_u32(&mut bytes, file_size);
    put_u32(&mut bytes, 0x70); // header_size
    put_u32(&mut bytes, 0x12345678); // endian_tag
    put_u32(&mut bytes, 0); // link_size
    put_u32(&mut bytes, 0); // link_off
    put_u32(&mut bytes, map_off);
    put_u32(&mut bytes, STRINGS.len() as u32);
    put_u32(&mut bytes, string_ids_off);
    put_u32(&mut bytes, TYPE_STRING_IDS.len() as u32);
    put_u32(&mut bytes, type_ids_off);
    put_u32(&mut bytes, 2);
    put_u32(&mut bytes, proto_ids_off);
    put_u32(&mut bytes, 2);
    put_u32(&mut bytes, field_ids_off);
    put_u32(&mut bytes, 3);
    put_u32(&mut bytes, method_ids_off);
    put_u32(&mut bytes, 1);
    put_u32(&mut bytes, class_defs_off);
    put_u32(&mut bytes, data.len() as u32);
    put_u32(&mut bytes, data_off);
    assert_eq!(bytes.len(), 0x70);

    for off in &string_offs {
        put_u32(&mut bytes, *off);
    }
    for sid in TYPE_STRING_IDS {
        put_u32(&mut bytes, sid);
    }

    // proto 0: ()V — no parameter list at all
    put_u32(&mut bytes, 8); // shorty "V"
    put_u32(&mut bytes, 5); // return type V
    put_u32(&mut bytes, 0);
    // proto 1: (I)V
    put_u32(&mut bytes, 9); // shorty "VI"
    put_u32(&mut bytes, 5);
    put_u32(&mut bytes, params_off);

    // field 0: Foo.count:I
    put_u16(&mut bytes, TYPE_FOO as u16);
    put_u16(&mut bytes, TYPE_INT as u16);
    put_u32(&mut bytes, 10);
    // field 1: Foo.MAX:I
    put_u16(&mut bytes, TYPE_FOO as u16);
    put_u16(&mut bytes, TYPE_INT as u16);
    put_u32(&mut bytes, 7);

    // method 0: Foo.<init>()V
    put_u16(&mut bytes, TYPE_FOO as u16);
    put_u16(&mut bytes, 0);
    put_u32(&mut bytes, 0);
    // method 1: Foo.run()V
    put_u16(&mut bytes, TYPE_FOO as u16);
    put_u16(&mut bytes, 0);
    put_u32(&mut bytes, 12);
    // method 2: Foo.setCount(I)V
    put_u16(&mut bytes, TYPE_FOO as u16);
    put_u16(&mut bytes, 1);
    put_u32(&mut bytes, 13);

    // class def: public Foo extends Object implements Runnable
    put_u32(&mut bytes, TYPE_FOO);
    put_u32(&mut bytes, 0x1);
    put_u32(&mut bytes, TYPE_OBJECT);
    put_u32(&mut bytes, interfaces_off);
    put_u32(&mut bytes, 1); // source file "Foo.java"
    put_u32(&mut bytes, 0); // no annotations
    put_u32(&mut bytes, class_data_off);
    put_u32(&mut bytes, 0); // no static values

    assert_eq!(bytes.len() as u32, data_off);
    bytes.extend_from_slice(&data);
    assert_eq!(bytes.len() as u32, file_size);
    bytes
}
