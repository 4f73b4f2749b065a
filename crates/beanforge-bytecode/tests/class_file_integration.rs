//! Integration tests for the class model and class file format

use beanforge_bytecode::{
    modifiers, ClassDef, ClassFile, ClassFileWriter, ClassTypeDef, ExpressionDef, FieldDef, FieldRef, MethodDef,
    MethodRef, PrettyPrint, StatementDef, SwitchKey, TypeDef,
};

fn dispatch_class() -> ClassDef {
    let owner = "com.example.$Greeter$Definition$Exec";
    let mut builder = ClassDef::builder(owner);
    builder
        .add_modifiers(modifiers::FINAL | modifiers::SYNTHETIC)
        .superclass(ClassTypeDef::of("io.beanforge.context.AbstractExecutableMethodsDefinition"));

    let greet = MethodRef::new("com.example.Greeter", "greet", vec![TypeDef::string()], TypeDef::string());
    let dispatch = MethodDef::builder("dispatch")
        .add_modifiers(modifiers::PROTECTED | modifiers::FINAL)
        .add_parameter("index", TypeDef::int())
        .add_parameter("target", TypeDef::object())
        .add_parameter("args", TypeDef::object().array())
        .returns(TypeDef::object())
        .build_with(|params| {
            StatementDef::switch(
                params[0].clone(),
                vec![(
                    SwitchKey::Int(0),
                    params[1]
                        .clone()
                        .cast(TypeDef::of("com.example.Greeter"))
                        .invoke(greet, vec![params[2].clone().array_element(0).cast(TypeDef::string())])
                        .returning(),
                )],
                Some(ExpressionDef::null().returning()),
            )
        });
    builder.add_method(dispatch);

    let flag = FieldDef::builder("$interceptable", TypeDef::boolean())
        .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
        .build();
    builder.add_field(flag);

    let mut inner = ClassDef::builder(format!("{}$Inner", owner));
    inner.add_static_statement(StatementDef::put_static(
        FieldRef::new(format!("{}$Inner", owner), "X", TypeDef::int()),
        ExpressionDef::int(1),
    ));
    builder.add_inner_type(inner.build());
    builder.build()
}

#[test]
fn test_write_and_decode_class() {
    let class = dispatch_class();
    let bytes = ClassFileWriter::write(&class).unwrap();
    let decoded = ClassFile::decode(&bytes).expect("Failed to decode");

    assert_eq!(decoded.name, "com/example/$Greeter$Definition$Exec");
    assert_eq!(decoded.modifiers & modifiers::SYNTHETIC, modifiers::SYNTHETIC);
    let dispatch = decoded
        .method("dispatch", "(ILjava/lang/Object;[Ljava/lang/Object;)Ljava/lang/Object;")
        .expect("dispatch method");
    assert_eq!(dispatch.parameter_names, vec!["index", "target", "args"]);
    assert!(!dispatch.code.is_empty());
    assert_eq!(decoded.field("$interceptable").unwrap().descriptor, "Z");
    assert_eq!(decoded.inner_types, vec!["com/example/$Greeter$Definition$Exec$Inner"]);
}

#[test]
fn test_write_all_includes_inner_types() {
    let files = ClassFileWriter::write_all(&dispatch_class()).unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].0, "com.example.$Greeter$Definition$Exec$Inner");

    let inner = ClassFile::decode(&files[1].1).unwrap();
    assert_ne!(inner.flags & beanforge_bytecode::class_file::flags::HAS_STATIC_INITIALIZER, 0);
    assert!(!inner.static_initializer.is_empty());
}

#[test]
fn test_encoding_is_deterministic() {
    let a = ClassFileWriter::write(&dispatch_class()).unwrap();
    let b = ClassFileWriter::write(&dispatch_class()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_truncated_class_file_fails() {
    let bytes = ClassFileWriter::write(&dispatch_class()).unwrap();
    assert!(ClassFile::decode(&bytes[..10]).is_err());
}

#[test]
fn test_pretty_print_dispatch_switch() {
    let text = dispatch_class().pretty_print();
    assert!(text.contains("extends io.beanforge.context.AbstractExecutableMethodsDefinition"));
    assert!(text.contains("switch (arg0)"));
    assert!(text.contains("case 0:"));
    assert!(text.contains("greet("));
}
