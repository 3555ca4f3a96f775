/* Class resolution on top of the raw section accessors */

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::dex::class_data::{EncodedField, EncodedMethod};
use crate::dex::dex_file::{DexFile, NO_INDEX};
use crate::dex::error::DexError;
use crate::types::{
    normalize_to_descriptor, AccessFlags, ResolvedClass, ResolvedField, ResolvedMethod,
};

/// Resolves classes by name or descriptor, caching every result — including
/// misses, so a repeated lookup for an unknown class costs one map probe.
///
/// Assembled classes are shared out as `Rc`; they are immutable once built.
#[derive(Debug)]
pub struct DexClassLoader<'a> {
    dex: &'a DexFile,
    class_cache: RefCell<HashMap<String, Option<Rc<ResolvedClass>>>>,
}

impl<'a> DexClassLoader<'a> {
    pub fn new(dex: &'a DexFile) -> DexClassLoader<'a> {
        DexClassLoader {
            dex,
            class_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn dex(&self) -> &DexFile {
        self.dex
    }

    /// Look up a class by dotted name (`java.lang.String`) or descriptor
    /// (`Ljava/lang/String;`). Returns `None` when the file defines no such
    /// class; both forms of the same name resolve to the same cached value.
    pub fn find_class(&self, name: &str) -> Result<Option<Rc<ResolvedClass>>, DexError> {
        let descriptor = normalize_to_descriptor(name);

        if let Some(cached) = self.class_cache.borrow().get(&descriptor) {
            return Ok(cached.clone());
        }

        let def = match self.dex.class_def_by_descriptor(&descriptor)? {
            Some(def) => def,
            None => {
                self.class_cache.borrow_mut().insert(descriptor, None);
                return Ok(None);
            }
        };

        let display_name = self.dex.display_type_at(def.class_idx)?;
        let superclass = if def.superclass_idx == NO_INDEX {
            None
        } else {
            Some(self.dex.display_type_at(def.superclass_idx)?)
        };

        let mut interfaces = Vec::new();
        if let Some(type_list) = self.dex.interfaces_list(&def)? {
            for &type_idx in &type_list.0 {
                interfaces.push(self.dex.display_type_at(type_idx as u32)?);
            }
        }

        let class_data = self.dex.class_data(&def)?;

        let mut fields = Vec::new();
        self.resolve_fields(&class_data.instance_fields, &mut fields)?;
        self.resolve_fields(&class_data.static_fields, &mut fields)?;

        let mut methods = Vec::new();
        self.resolve_methods(&class_data.direct_methods, &mut methods)?;
        self.resolve_methods(&class_data.virtual_methods, &mut methods)?;

        let cls = Rc::new(ResolvedClass {
            access_flags: AccessFlags::from_bits_retain(def.access_flags),
            name: display_name,
            superclass,
            interfaces,
            fields,
            methods,
        });

        self.class_cache
            .borrow_mut()
            .insert(descriptor, Some(cls.clone()));
        Ok(Some(cls))
    }

    fn resolve_fields(
        &self,
        encoded: &[EncodedField],
        out: &mut Vec<ResolvedField>,
    ) -> Result<(), DexError> {
        for ef in encoded {
            let field_id = self.dex.field_id(ef.field_idx)?;
            out.push(ResolvedField {
                access_flags: AccessFlags::from_bits_retain(ef.access_flags),
                name: self.dex.string_at(field_id.name_idx)?,
                type_name: self.dex.display_type_at(field_id.type_idx as u32)?,
            });
        }
        Ok(())
    }

    fn resolve_methods(
        &self,
        encoded: &[EncodedMethod],
        out: &mut Vec<ResolvedMethod>,
    ) -> Result<(), DexError> {
        for em in encoded {
            let method_id = self.dex.method_id(em.method_idx)?;
            let proto = self.dex.proto_id(method_id.proto_idx as u32)?;

            let mut parameter_types = Vec::new();
            if let Some(type_list) = self.dex.parameters_list(&proto)? {
                for &type_idx in &type_list.0 {
                    parameter_types.push(self.dex.display_type_at(type_idx as u32)?);
                }
            }

            out.push(ResolvedMethod {
                access_flags: AccessFlags::from_bits_retain(em.access_flags),
                name: self.dex.string_at(method_id.name_idx)?,
                return_type: self.dex.display_type_at(proto.return_type_idx)?,
                parameter_types,
            });
        }
        Ok(())
    }
}
