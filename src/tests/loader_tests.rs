use std::rc::Rc;

use crate::dex::{DexClassLoader, DexFile};
use crate::tests::fixture::{build_dex, TYPE_EXCEPTION};
use crate::types::AccessFlags;

#[test]
fn resolves_class_by_dotted_name_and_descriptor() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let loader = DexClassLoader::new(&dex);

    let by_name = loader.find_class("com.example.Foo").unwrap().expect("found");
    let by_descriptor = loader.find_class("Lcom/example/Foo;").unwrap().expect("found");

    // Both spellings normalize to the same descriptor and share the cache entry.
    assert!(Rc::ptr_eq(&by_name, &by_descriptor));
    assert_eq!(by_name.name, "com.example.Foo");
}

#[test]
fn resolved_class_contents() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let loader = DexClassLoader::new(&dex);
    let cls = loader.find_class("com.example.Foo").unwrap().expect("found");

    assert_eq!(cls.access_flags, AccessFlags::PUBLIC);
    assert_eq!(cls.superclass.as_deref(), Some("java.lang.Object"));
    assert_eq!(cls.interfaces, vec!["java.lang.Runnable"]);

    // Instance fields first, then statics.
    let field_names: Vec<&str> = cls.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(field_names, vec!["count", "MAX"]);
    assert_eq!(cls.fields[0].type_name, "int");
    assert_eq!(cls.fields[0].access_flags, AccessFlags::PRIVATE);
    assert_eq!(
        cls.fields[1].access_flags,
        AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL
    );

    // Direct methods first, then virtuals.
    let method_names: Vec<&str> = cls.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(method_names, vec!["<init>", "run", "setCount"]);
    assert_eq!(cls.methods[1].return_type, "void");
    assert!(cls.methods[1].parameter_types.is_empty());
    assert_eq!(cls.methods[2].parameter_types, vec!["int"]);
}

#[test]
fn unknown_class_is_a_cached_miss() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let loader = DexClassLoader::new(&dex);

    assert!(loader.find_class("com.example.Missing").unwrap().is_none());
    assert!(loader.find_class("com.example.Missing").unwrap().is_none());
    // A miss must not poison later hits.
    assert!(loader.find_class("com.example.Foo").unwrap().is_some());
}

#[test]
fn code_item_for_run_with_try_and_catch_all() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let def = dex.class_def_by_descriptor("Lcom/example/Foo;").unwrap().unwrap();
    let class_data = dex.class_data(&def).unwrap();

    // <init> has no body.
    assert_eq!(dex.code_item(&class_data.direct_methods[0]).unwrap(), None);

    let code = dex
        .code_item(&class_data.virtual_methods[0])
        .unwrap()
        .expect("run() has a body");
    assert_eq!(code.registers_size, 3);
    assert_eq!(code.ins_size, 1);
    assert_eq!(code.insns.len(), 3);
    assert_eq!(code.tries.len(), 1);
    assert_eq!(code.tries[0].insn_count, 2);

    let handler = code.handler_at(code.tries[0].handler_off).expect("handler");
    assert!(handler.catches_all());
    assert_eq!(handler.catch_all_addr, Some(2));
    assert_eq!(handler.handlers.len(), 1);
    assert_eq!(handler.handlers[0].type_idx, TYPE_EXCEPTION);
    assert_eq!(
        dex.type_descriptor_at(handler.handlers[0].type_idx).unwrap(),
        "Ljava/lang/Exception;"
    );
}

#[test]
fn debug_info_for_run() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let def = dex.class_def_by_descriptor("Lcom/example/Foo;").unwrap().unwrap();
    let class_data = dex.class_data(&def).unwrap();
    let code = dex.code_item(&class_data.virtual_methods[0]).unwrap().unwrap();

    let info = dex.debug_info(&code).unwrap();
    assert_eq!(info.line_start, 10);
    assert!(info.parameter_names.is_empty());
    assert_eq!(info.prologue_ends, vec![0]);

    let positions: Vec<(u32, i32)> = info.positions.iter().map(|p| (p.address, p.line)).collect();
    assert_eq!(positions, vec![(0, 10), (1, 11)]);

    assert_eq!(info.locals.len(), 1);
    let local = &info.locals[0];
    assert_eq!(local.register, 0);
    assert_eq!(local.name.as_deref(), Some("i"));
    assert_eq!(local.descriptor.as_deref(), Some("I"));
    assert_eq!(local.signature, None);
    assert_eq!((local.start_address, local.end_address), (0, 3));
}

#[test]
fn debug_info_parameter_names() {
    let dex = DexFile::from_bytes(&build_dex()).unwrap();
    let def = dex.class_def_by_descriptor("Lcom/example/Foo;").unwrap().unwrap();
    let class_data = dex.class_data(&def).unwrap();
    let code = dex.code_item(&class_data.virtual_methods[1]).unwrap().unwrap();

    let info = dex.debug_info(&code).unwrap();
    assert_eq!(info.line_start, 20);
    assert_eq!(info.parameter_names, vec![Some("value".to_string())]);
    let positions: Vec<(u32, i32)> = info.positions.iter().map(|p| (p.address, p.line)).collect();
    assert_eq!(positions, vec![(0, 20)]);
}
