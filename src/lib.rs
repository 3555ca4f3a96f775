//! # dexload
//!
//! A read-only decoder for the Android DEX (Dalvik Executable) container
//! format: header, id tables, class data, method bodies with their
//! try/catch tables, and the debug byte programs that reconstruct line
//! numbers and local-variable scopes. A small class loader on top resolves
//! classes by name and assembles their members into display form.
//!
//! # Examples
//!
//! ```no_run
//! use dexload::dex::{DexClassLoader, DexFile};
//! use std::path::Path;
//!
//! let dex = DexFile::from_file(Path::new("classes.dex")).unwrap();
//! let loader = DexClassLoader::new(&dex);
//! if let Some(cls) = loader.find_class("com.example.Foo").unwrap() {
//!     for m in &cls.methods {
//!         println!("{} {}()", m.return_type, m.name);
//!     }
//! }
//! ```
pub mod dex;
mod tests;
pub mod types;

pub use dex::{DexClassLoader, DexError, DexFile};
pub use types::{AccessFlags, ResolvedClass, ResolvedField, ResolvedMethod};
