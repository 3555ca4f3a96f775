/* Public type vocabulary: descriptor conversions, access flags and the
 * resolved class/field/method records produced by the class loader. */

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// DEX access flags for classes, fields and methods.
    ///
    /// Some bit values are shared between member kinds (`BRIDGE`/`VOLATILE`,
    /// `VARARGS`/`TRANSIENT`); interpretation depends on the owner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl Serialize for AccessFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for AccessFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(AccessFlags::from_bits_retain(u32::deserialize(deserializer)?))
    }
}

/// What a set of access flags is attached to; decides which bits are
/// rendered as Java modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Class,
    Field,
    Method,
}

impl AccessFlags {
    /// Render the flags as a Java modifier string, e.g. `"public static final"`.
    pub fn modifier_string(&self, kind: MemberKind) -> String {
        let mut mods: Vec<&str> = Vec::new();
        let is_interface = self.contains(AccessFlags::INTERFACE);
        let is_enum = self.contains(AccessFlags::ENUM);

        if self.contains(AccessFlags::PUBLIC) {
            mods.push("public");
        } else if self.contains(AccessFlags::PROTECTED) {
            mods.push("protected");
        } else if self.contains(AccessFlags::PRIVATE) {
            mods.push("private");
        }

        // Interfaces are implicitly abstract; enums and interfaces never print final.
        if self.contains(AccessFlags::ABSTRACT) && !(kind == MemberKind::Class && is_interface) {
            mods.push("abstract");
        }
        if self.contains(AccessFlags::STATIC) {
            mods.push("static");
        }
        if self.contains(AccessFlags::FINAL) && !(kind == MemberKind::Class && (is_interface || is_enum)) {
            mods.push("final");
        }

        if kind == MemberKind::Field {
            if self.contains(AccessFlags::TRANSIENT) {
                mods.push("transient");
            }
            if self.contains(AccessFlags::VOLATILE) {
                mods.push("volatile");
            }
        }

        if kind == MemberKind::Method {
            if self.contains(AccessFlags::SYNCHRONIZED) {
                mods.push("synchronized");
            }
            if self.contains(AccessFlags::NATIVE) {
                mods.push("native");
            }
            if self.contains(AccessFlags::STRICT) {
                mods.push("strictfp");
            }
        }

        mods.join(" ")
    }
}

/// Convert a DEX type descriptor to the conventional Java spelling.
///
/// # Examples
///
/// ```
/// use dexload::types::descriptor_to_display;
///
/// assert_eq!(descriptor_to_display("Ljava/lang/String;"), "java.lang.String");
/// assert_eq!(descriptor_to_display("[[I"), "int[][]");
/// assert_eq!(descriptor_to_display("Z"), "boolean");
/// ```
pub fn descriptor_to_display(descriptor: &str) -> String {
    let dim = descriptor.chars().take_while(|&c| c == '[').count();
    let base = &descriptor[dim..];

    let mut name = match base {
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "D" => "double".to_string(),
        "F" => "float".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "S" => "short".to_string(),
        "V" => "void".to_string(),
        "Z" => "boolean".to_string(),
        _ if base.len() >= 2 && base.starts_with('L') && base.ends_with(';') => {
            base[1..base.len() - 1].replace('/', ".")
        }
        _ => base.replace('/', "."),
    };

    for _ in 0..dim {
        name.push_str("[]");
    }
    name
}

/// Convert a display type name back to its DEX descriptor. Inverse of
/// [`descriptor_to_display`], including primitive names and `[]` suffixes.
///
/// # Examples
///
/// ```
/// use dexload::types::dot_to_descriptor;
///
/// assert_eq!(dot_to_descriptor("java.lang.String"), "Ljava/lang/String;");
/// assert_eq!(dot_to_descriptor("int[][]"), "[[I");
/// ```
pub fn dot_to_descriptor(name: &str) -> String {
    let mut base = name;
    let mut dim = 0;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dim += 1;
    }

    let desc = match base {
        "byte" => "B".to_string(),
        "char" => "C".to_string(),
        "double" => "D".to_string(),
        "float" => "F".to_string(),
        "int" => "I".to_string(),
        "long" => "J".to_string(),
        "short" => "S".to_string(),
        "void" => "V".to_string(),
        "boolean" => "Z".to_string(),
        _ if base.starts_with('[') => base.replace('.', "/"),
        _ => format!("L{};", base.replace('.', "/")),
    };

    let mut out = String::with_capacity(dim + desc.len());
    for _ in 0..dim {
        out.push('[');
    }
    out.push_str(&desc);
    out
}

/// Normalize a caller-supplied class name to descriptor form.
///
/// Inputs already in descriptor syntax (leading `[`, or `L...;`) pass
/// through with only dot-to-slash normalization; everything else is treated
/// as a dotted display name.
pub fn normalize_to_descriptor(name: &str) -> String {
    if name.starts_with('[') {
        return name.replace('.', "/");
    }
    if name.len() > 1 && name.starts_with('L') && name.ends_with(';') {
        return name.replace('.', "/");
    }
    dot_to_descriptor(name)
}

/// A field of a resolved class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub access_flags: AccessFlags,
    pub name: String,
    pub type_name: String,
}

/// A method of a resolved class, with display-form types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMethod {
    pub access_flags: AccessFlags,
    pub name: String,
    pub return_type: String,
    pub parameter_types: Vec<String>,
}

/// A class assembled by the loader: supertype, interfaces and members all
/// resolved to display names. Immutable once constructed; the loader caches
/// it by descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedClass {
    pub access_flags: AccessFlags,
    pub name: String,
    /// `None` only for the root type (`java.lang.Object`).
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ResolvedField>,
    pub methods: Vec<ResolvedMethod>,
}
