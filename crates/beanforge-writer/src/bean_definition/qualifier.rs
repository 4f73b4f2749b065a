//! Qualifier expressions for injection points

use crate::gen_utils::type_of;
use crate::runtime;
use beanforge_bytecode::{ExpressionDef, FieldRef, MethodRef, TypeDef};
use beanforge_types::AnnotationMetadata;

fn qualifiers(name: &str, parameters: Vec<TypeDef>) -> MethodRef {
    MethodRef::new(runtime::QUALIFIERS, name, parameters, type_of(runtime::QUALIFIER_TYPE))
}

fn argument_metadata(argument: &ExpressionDef) -> ExpressionDef {
    argument.clone().invoke(
        MethodRef::interface(runtime::ARGUMENT, "getAnnotationMetadata", vec![], type_of(runtime::ANNOTATION_METADATA)),
        vec![],
    )
}

/// Qualifier for an injection point, `null` when it has none
///
/// `argument` is the runtime `Argument` describing the point; `element_name`
/// stands in for an empty `@Named`.
pub(crate) fn qualifier_expression(meta: &AnnotationMetadata, element_name: &str, argument: &ExpressionDef) -> ExpressionDef {
    let names = meta.annotation_names_by_stereotype(runtime::QUALIFIER);
    if names.len() == 1 {
        return qualifier_for_annotation(meta, &names[0], element_name, argument);
    }
    if names.len() > 1 {
        let items = names
            .iter()
            .map(|name| qualifier_for_annotation(meta, name, element_name, argument))
            .collect();
        return ExpressionDef::invoke_static(
            qualifiers("byQualifiers", vec![type_of(runtime::QUALIFIER_TYPE).array()]),
            vec![ExpressionDef::new_array(type_of(runtime::QUALIFIER_TYPE), items)],
        );
    }
    if meta.has_annotation(runtime::INTERCEPTOR_BINDING_QUALIFIER) {
        return ExpressionDef::invoke_static(
            qualifiers("byInterceptorBinding", vec![type_of(runtime::ANNOTATION_METADATA)]),
            vec![argument_metadata(argument)],
        );
    }
    let types = meta.string_values(runtime::TYPE, "value");
    if meta.has_declared_annotation(runtime::TYPE) && !types.is_empty() {
        let classes = types
            .iter()
            .map(|t| ExpressionDef::class_literal(type_of(t)))
            .collect();
        return ExpressionDef::invoke_static(
            qualifiers("byType", vec![TypeDef::class().array()]),
            vec![ExpressionDef::new_array(TypeDef::class(), classes)],
        );
    }
    ExpressionDef::null()
}

fn qualifier_for_annotation(
    meta: &AnnotationMetadata,
    annotation: &str,
    element_name: &str,
    argument: &ExpressionDef,
) -> ExpressionDef {
    match annotation {
        runtime::PRIMARY => ExpressionDef::null(),
        runtime::NAMED => {
            let name = meta
                .string_value(runtime::NAMED, "value")
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| element_name.to_string());
            if name.contains('$') {
                ExpressionDef::invoke_static(
                    qualifiers("forArgument", vec![type_of(runtime::ARGUMENT)]),
                    vec![argument.clone()],
                )
            } else {
                ExpressionDef::invoke_static(qualifiers("byName", vec![TypeDef::string()]), vec![ExpressionDef::string(name)])
            }
        }
        runtime::ANY => {
            ExpressionDef::static_field(FieldRef::new(runtime::ANY_QUALIFIER, "INSTANCE", type_of(runtime::ANY_QUALIFIER)))
        }
        _ => match meta.find_repeatable_container(annotation) {
            Some(container) => ExpressionDef::invoke_static(
                qualifiers("byRepeatableAnnotation", vec![type_of(runtime::ANNOTATION_METADATA), TypeDef::string()]),
                vec![argument_metadata(argument), ExpressionDef::string(container)],
            ),
            None => ExpressionDef::invoke_static(
                qualifiers("byAnnotation", vec![type_of(runtime::ANNOTATION_METADATA), TypeDef::string()]),
                vec![argument_metadata(argument), ExpressionDef::string(annotation)],
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::{AnnotationEntry, AnnotationValue};

    fn arg() -> ExpressionDef {
        ExpressionDef::local("argument", type_of(runtime::ARGUMENT))
    }

    fn qualified(entry: AnnotationEntry) -> AnnotationMetadata {
        let name = entry.name.clone();
        AnnotationMetadata::empty().declare(entry).stereotype(runtime::QUALIFIER, name)
    }

    #[test]
    fn test_named_qualifiers() {
        let meta = qualified(AnnotationEntry::new(runtime::NAMED).with("value", AnnotationValue::String("primary".into())));
        assert_eq!(qualifier_expression(&meta, "db", &arg()).pretty_print(), "Qualifiers.byName(\"primary\")");

        let unnamed = qualified(AnnotationEntry::new(runtime::NAMED));
        assert_eq!(qualifier_expression(&unnamed, "db", &arg()).pretty_print(), "Qualifiers.byName(\"db\")");

        let placeholder = qualified(AnnotationEntry::new(runtime::NAMED).with("value", AnnotationValue::String("$x".into())));
        assert_eq!(qualifier_expression(&placeholder, "db", &arg()).pretty_print(), "Qualifiers.forArgument(argument)");
    }

    #[test]
    fn test_special_qualifiers() {
        let primary = qualified(AnnotationEntry::new(runtime::PRIMARY));
        assert_eq!(qualifier_expression(&primary, "x", &arg()), ExpressionDef::null());

        let any = qualified(AnnotationEntry::new(runtime::ANY));
        assert_eq!(qualifier_expression(&any, "x", &arg()).pretty_print(), "AnyQualifier.INSTANCE");

        let custom = qualified(AnnotationEntry::new("a.Fast"));
        assert_eq!(
            qualifier_expression(&custom, "x", &arg()).pretty_print(),
            "Qualifiers.byAnnotation(argument.getAnnotationMetadata(), \"a.Fast\")"
        );

        assert_eq!(qualifier_expression(&AnnotationMetadata::empty(), "x", &arg()), ExpressionDef::null());
    }

    #[test]
    fn test_composite_and_type_qualifiers() {
        let both = qualified(AnnotationEntry::new("a.Fast"))
            .declare(AnnotationEntry::new("a.Cheap"))
            .stereotype(runtime::QUALIFIER, "a.Cheap");
        let text = qualifier_expression(&both, "x", &arg()).pretty_print();
        assert!(text.starts_with("Qualifiers.byQualifiers(new io.beanforge.context.Qualifier[]{"));

        let typed = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::TYPE).with("value", AnnotationValue::Classes(vec!["a.Impl".into()])));
        assert_eq!(
            qualifier_expression(&typed, "x", &arg()).pretty_print(),
            "Qualifiers.byType(new java.lang.Class[]{a.Impl.class})"
        );
    }
}
