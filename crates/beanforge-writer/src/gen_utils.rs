//! Small expression builders shared by the writers

use crate::runtime;
use beanforge_bytecode::{ClassTypeDef, ExpressionDef, MethodRef, PrimitiveType, TypeDef};
use beanforge_types::{ClassElement, MethodElement};

/// Above this many entries `Map.ofEntries` is used instead of `Map.of`
const MAP_OF_MAX_ENTRIES: usize = 10;

/// Type definition of an element, keeping array dimensions
pub fn type_def(element: &ClassElement) -> TypeDef {
    TypeDef::of(&element.name).array_of(element.array_dimensions)
}

/// Erased type of an element with placeholders and wildcards resolved to their bounds
pub fn erased_type(element: &ClassElement) -> TypeDef {
    type_def(&element.resolved()).erasure()
}

/// Erased parameter types of a method
pub fn parameter_types(method: &MethodElement) -> Vec<TypeDef> {
    method.parameters.iter().map(|p| erased_type(&p.ty)).collect()
}

/// Symbolic reference to a method element on its declaring type
pub fn method_ref(method: &MethodElement) -> MethodRef {
    MethodRef::new(
        method.declaring_type.clone(),
        method.name.clone(),
        parameter_types(method),
        erased_type(&method.return_type),
    )
}

/// Runtime type as a [`ClassTypeDef`]
pub fn class(name: &str) -> ClassTypeDef {
    ClassTypeDef::of(name)
}

/// Runtime type as a [`TypeDef`]
pub fn type_of(name: &str) -> TypeDef {
    TypeDef::of(name)
}

/// `java.util.Map.of(...)` or `Map.ofEntries(...)` keyed by string constants
pub fn string_map_of(entries: Vec<(String, ExpressionDef)>) -> ExpressionDef {
    let map = type_of(runtime::MAP);
    if entries.len() <= MAP_OF_MAX_ENTRIES {
        let params = vec![TypeDef::object(); entries.len() * 2];
        let args = entries
            .into_iter()
            .flat_map(|(k, v)| [ExpressionDef::string(k), v])
            .collect();
        ExpressionDef::invoke_static(MethodRef::interface(runtime::MAP, "of", params, map), args)
    } else {
        let entry = type_of(runtime::MAP_ENTRY);
        let items = entries
            .into_iter()
            .map(|(k, v)| {
                ExpressionDef::invoke_static(
                    MethodRef::interface(runtime::MAP, "entry", vec![TypeDef::object(), TypeDef::object()], entry.clone()),
                    vec![ExpressionDef::string(k), v],
                )
            })
            .collect();
        ExpressionDef::invoke_static(
            MethodRef::interface(runtime::MAP, "ofEntries", vec![entry.clone().array()], map),
            vec![ExpressionDef::new_array(entry, items)],
        )
    }
}

/// `java.util.List.of(new String[]{...})`
pub fn string_list_of(items: &[String]) -> ExpressionDef {
    ExpressionDef::invoke_static(
        MethodRef::interface(runtime::LIST, "of", vec![TypeDef::object().array()], type_of(runtime::LIST)),
        vec![ExpressionDef::new_array(
            TypeDef::string(),
            items.iter().map(ExpressionDef::string).collect(),
        )],
    )
}

/// `new String[]{...}`
pub fn string_array(items: &[String]) -> ExpressionDef {
    ExpressionDef::new_array(TypeDef::string(), items.iter().map(ExpressionDef::string).collect())
}

/// `new Class[]{A.class, ...}`
pub fn class_array(types: &[TypeDef]) -> ExpressionDef {
    ExpressionDef::new_array(
        TypeDef::class(),
        types.iter().map(|t| ExpressionDef::class_literal(t.clone())).collect(),
    )
}

/// Value used when a nullable value meets a slot of type `ty`
pub fn default_value(ty: &TypeDef) -> ExpressionDef {
    match ty {
        TypeDef::Primitive(PrimitiveType::Boolean) => ExpressionDef::bool(false),
        TypeDef::Primitive(PrimitiveType::Long) => ExpressionDef::long(0),
        TypeDef::Primitive(PrimitiveType::Double) | TypeDef::Primitive(PrimitiveType::Float) => {
            ExpressionDef::double(0.0).cast(ty.clone())
        }
        TypeDef::Primitive(_) => ExpressionDef::int(0).cast(ty.clone()),
        _ => ExpressionDef::null(),
    }
}

/// `new IllegalStateException(message)`
pub fn illegal_state(message: &str) -> ExpressionDef {
    ExpressionDef::new_instance(
        MethodRef::constructor(runtime::ILLEGAL_STATE_EXCEPTION, vec![TypeDef::string()]),
        vec![ExpressionDef::string(message)],
    )
}

/// First character upper-cased
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Package part of a class name
pub fn package_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) => &name[..i],
        None => "",
    }
}

/// Simple part of a class name, nested names keep their `$` segments
pub fn simple_name_of(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Join a package and a simple name
pub fn qualify(package: &str, simple: &str) -> String {
    if package.is_empty() {
        simple.to_string()
    } else {
        format!("{}.{}", package, simple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;

    #[test]
    fn test_string_map_switches_to_entries() {
        let small: Vec<_> = (0..3).map(|i| (format!("k{}", i), ExpressionDef::int(i))).collect();
        assert_eq!(string_map_of(small).pretty_print(), "Map.of(\"k0\", 0, \"k1\", 1, \"k2\", 2)");

        let large: Vec<_> = (0..11).map(|i| (format!("k{}", i), ExpressionDef::int(i))).collect();
        let text = string_map_of(large).pretty_print();
        assert!(text.starts_with("Map.ofEntries(new java.util.Map$Entry[]{Map.entry(\"k0\", 0)"));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_value(&TypeDef::boolean()), ExpressionDef::bool(false));
        assert_eq!(default_value(&TypeDef::string()), ExpressionDef::null());
        assert_eq!(default_value(&TypeDef::int()).pretty_print(), "((int) 0)");
    }

    #[test]
    fn test_names() {
        assert_eq!(capitalize("name"), "Name");
        assert_eq!(package_of("a.b.C"), "a.b");
        assert_eq!(simple_name_of("a.b.C$D"), "C$D");
        assert_eq!(qualify("", "$C$Definition"), "$C$Definition");
    }

    #[test]
    fn test_erased_placeholder_type() {
        let t = ClassElement::placeholder("T", ClassElement::of("java.lang.Number")).to_array();
        assert_eq!(erased_type(&t), TypeDef::of("java.lang.Number").array());
    }
}
