pub mod error;

pub mod class_data;
pub mod class_loader;
pub mod code;
pub mod cursor;
pub mod dex_file;
pub mod debug;
pub(crate) mod leb;

pub use class_data::{ClassData, EncodedField, EncodedMethod};
pub use class_loader::DexClassLoader;
pub use code::{CatchHandlerEntry, CodeItem, EncodedCatchHandler, EncodedTypeAddrPair, TryItem};
pub use cursor::Cursor;
pub use debug::{DebugInfo, LocalVar, Position};
pub use dex_file::{
    ClassDef, DexFile, FieldId, Header, MapItem, MethodId, ProtoId, TypeList, NO_INDEX,
};
pub use error::DexError;
