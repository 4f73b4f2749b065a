//! Argument metadata builder
//!
//! Builds the expressions that create runtime `Argument` descriptors for
//! fields, parameters and return types, generics included.

use crate::error::WriterResult;
use crate::gen_utils::{erased_type, type_of};
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{ExpressionDef, FieldRef, MethodRef, TypeDef};
use beanforge_types::{AnnotationMetadata, ClassElement, MethodElement, ParameterElement};
use rustc_hash::FxHashSet;

/// `Argument.<name>` constant
pub fn argument_constant(name: &str) -> ExpressionDef {
    let ty = if name == "ZERO_ARGUMENTS" {
        type_of(runtime::ARGUMENT).array()
    } else {
        type_of(runtime::ARGUMENT)
    };
    ExpressionDef::static_field(FieldRef::new(runtime::ARGUMENT, name, ty))
}

fn argument_factory(name: &str, parameters: Vec<TypeDef>) -> MethodRef {
    MethodRef::interface(runtime::ARGUMENT, name, parameters, type_of(runtime::ARGUMENT))
}

/// Argument expressions emitted into one generated class
pub struct ArgumentBuilder<'a> {
    session: &'a mut BuildSession,
    owner: &'a str,
}

impl<'a> ArgumentBuilder<'a> {
    /// Builder for arguments used inside `owner`
    pub fn new(session: &'a mut BuildSession, owner: &'a str) -> Self {
        Self { session, owner }
    }

    /// Argument describing a return type
    pub fn return_type(&mut self, ty: &ClassElement) -> WriterResult<ExpressionDef> {
        if ty.is_void() {
            return Ok(argument_constant("VOID"));
        }
        if ty.is_primitive() {
            return Ok(argument_constant(&ty.name.to_uppercase()));
        }
        let mut visited = FxHashSet::default();
        self.create(&ty.name, ty, &ty.annotation_metadata, &mut visited)
    }

    /// Argument for a named, annotated element
    pub fn argument(&mut self, name: &str, ty: &ClassElement, meta: &AnnotationMetadata) -> WriterResult<ExpressionDef> {
        let mut visited = FxHashSet::default();
        self.create(name, ty, meta, &mut visited)
    }

    /// `new Argument[]{...}` for the parameters of `method`
    pub fn method_arguments(&mut self, method: &MethodElement) -> WriterResult<ExpressionDef> {
        self.parameter_arguments(&method.parameters)
    }

    /// `new Argument[]{...}` for a parameter list
    pub fn parameter_arguments(&mut self, parameters: &[ParameterElement]) -> WriterResult<ExpressionDef> {
        let mut items = Vec::with_capacity(parameters.len());
        for p in parameters {
            let meta = if p.has_default {
                nullable_for_default(&p.annotation_metadata)
            } else {
                p.annotation_metadata.clone()
            };
            items.push(self.argument(&p.name, p.generic_type(), &meta)?);
        }
        Ok(ExpressionDef::new_array(type_of(runtime::ARGUMENT), items))
    }

    /// `new Argument[]{...}` for the type arguments declared by `declaring`
    pub fn type_arguments(&mut self, declaring: &str, arguments: &[(String, ClassElement)]) -> WriterResult<ExpressionDef> {
        let mut visited = FxHashSet::default();
        self.type_argument_elements(declaring, arguments, &mut visited)
    }

    fn create(
        &mut self,
        name: &str,
        ty: &ClassElement,
        meta: &AnnotationMetadata,
        visited: &mut FxHashSet<String>,
    ) -> WriterResult<ExpressionDef> {
        let type_args = &ty.type_arguments;
        if ty.name == runtime::STRING
            && !ty.is_array()
            && meta.is_empty()
            && type_args.is_empty()
            && !ty.is_generic_placeholder()
            && name == ty.name
        {
            return Ok(argument_constant("STRING"));
        }

        let class_literal = ExpressionDef::class_literal(erased_type(ty));
        if meta.is_empty() && type_args.is_empty() && !ty.is_generic_placeholder() {
            return Ok(ExpressionDef::invoke_static(
                argument_factory("of", vec![TypeDef::class(), TypeDef::string()]),
                vec![class_literal, ExpressionDef::string(name)],
            ));
        }

        let mut params = vec![TypeDef::class(), TypeDef::string()];
        let mut args = vec![class_literal, ExpressionDef::string(name)];
        let differing_variable = ty.type_variable.as_deref().filter(|v| *v != name);
        if let Some(variable) = differing_variable {
            params.push(TypeDef::string());
            args.push(ExpressionDef::string(variable));
        }

        params.push(type_of(runtime::ANNOTATION_METADATA));
        if meta.is_empty() {
            args.push(ExpressionDef::null());
        } else {
            args.push(self.session.annotation_metadata_expression(self.owner, meta)?);
        }

        params.push(type_of(runtime::ARGUMENT).array());
        if type_args.is_empty() {
            args.push(ExpressionDef::null());
        } else {
            args.push(self.type_argument_elements(&ty.name, type_args, visited)?);
        }

        let factory = if ty.is_generic_placeholder() { "ofTypeVariable" } else { "of" };
        Ok(ExpressionDef::invoke_static(argument_factory(factory, params), args))
    }

    fn type_argument_elements(
        &mut self,
        declaring: &str,
        arguments: &[(String, ClassElement)],
        visited: &mut FxHashSet<String>,
    ) -> WriterResult<ExpressionDef> {
        if arguments.is_empty() {
            return Ok(ExpressionDef::new_array(type_of(runtime::ARGUMENT), vec![]));
        }
        if !visited.insert(declaring.to_string()) {
            return Ok(argument_constant("ZERO_ARGUMENTS"));
        }
        let mut items = Vec::with_capacity(arguments.len());
        for (variable, argument) in arguments {
            let self_referencing = argument.is_generic_placeholder() && visited.contains(&argument.name);
            let nested = !argument.type_arguments.is_empty() || !argument.annotation_metadata.is_empty();
            if nested && !self_referencing {
                items.push(self.create(variable, argument, &argument.annotation_metadata, visited)?);
            } else {
                items.push(simple_argument(variable, argument));
            }
        }
        visited.remove(declaring);
        Ok(ExpressionDef::new_array(type_of(runtime::ARGUMENT), items))
    }
}

fn simple_argument(name: &str, ty: &ClassElement) -> ExpressionDef {
    let class_literal = ExpressionDef::class_literal(erased_type(ty));
    match ty.type_variable.as_deref() {
        Some(variable) if variable != name => ExpressionDef::invoke_static(
            argument_factory("ofTypeVariable", vec![TypeDef::class(), TypeDef::string(), TypeDef::string()]),
            vec![class_literal, ExpressionDef::string(name), ExpressionDef::string(variable)],
        ),
        Some(_) => ExpressionDef::invoke_static(
            argument_factory("ofTypeVariable", vec![TypeDef::class(), TypeDef::string()]),
            vec![class_literal, ExpressionDef::string(name)],
        ),
        None => ExpressionDef::invoke_static(
            argument_factory("of", vec![TypeDef::class(), TypeDef::string()]),
            vec![class_literal, ExpressionDef::string(name)],
        ),
    }
}

/// Kotlin parameters with defaults accept null, whatever their declared nullability
fn nullable_for_default(meta: &AnnotationMetadata) -> AnnotationMetadata {
    let mut meta = meta.clone();
    for entry in meta.declared.iter_mut().chain(meta.inherited.iter_mut()) {
        if entry.name == runtime::NON_NULL {
            entry.name = runtime::NULLABLE.to_string();
        }
    }
    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WriterOptions;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::AnnotationEntry;

    const OWNER: &str = "a.$B$Definition";

    #[test]
    fn test_return_type_constants() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut builder = ArgumentBuilder::new(&mut session, OWNER);
        assert_eq!(builder.return_type(&ClassElement::of("void")).unwrap().pretty_print(), "Argument.VOID");
        assert_eq!(builder.return_type(&ClassElement::of("long")).unwrap().pretty_print(), "Argument.LONG");
        assert_eq!(builder.return_type(&ClassElement::of("java.lang.String")).unwrap().pretty_print(), "Argument.STRING");
        assert_eq!(
            builder.return_type(&ClassElement::of("int").to_array()).unwrap().pretty_print(),
            "Argument.of(int[].class, \"int\")"
        );
    }

    #[test]
    fn test_plain_and_generic_arguments() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut builder = ArgumentBuilder::new(&mut session, OWNER);
        let plain = builder
            .argument("service", &ClassElement::of("a.Service"), &AnnotationMetadata::empty())
            .unwrap();
        assert_eq!(plain.pretty_print(), "Argument.of(a.Service.class, \"service\")");

        let list = ClassElement::of("java.util.List").with_type_argument("E", ClassElement::of("a.Service"));
        let generic = builder.argument("services", &list, &AnnotationMetadata::empty()).unwrap();
        assert_eq!(
            generic.pretty_print(),
            "Argument.of(java.util.List.class, \"services\", null, new io.beanforge.core.type.Argument[]{Argument.of(a.Service.class, \"E\")})"
        );
    }

    #[test]
    fn test_type_variable_arguments() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut builder = ArgumentBuilder::new(&mut session, OWNER);
        let t = ClassElement::placeholder("T", ClassElement::of("java.lang.Number"));
        let same = builder.argument("T", &t, &AnnotationMetadata::empty()).unwrap();
        assert_eq!(same.pretty_print(), "Argument.ofTypeVariable(java.lang.Number.class, \"T\", null, null)");
        let differing = builder.argument("value", &t, &AnnotationMetadata::empty()).unwrap();
        assert_eq!(
            differing.pretty_print(),
            "Argument.ofTypeVariable(java.lang.Number.class, \"value\", \"T\", null, null)"
        );
    }

    #[test]
    fn test_self_referencing_generics_terminate() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut builder = ArgumentBuilder::new(&mut session, OWNER);
        let inner = ClassElement::of("a.Node").with_type_argument("T", ClassElement::of("a.Leaf"));
        let node = ClassElement::of("a.Node").with_type_argument("T", inner);
        let text = builder.argument("node", &node, &AnnotationMetadata::empty()).unwrap().pretty_print();
        assert!(text.contains("Argument.ZERO_ARGUMENTS"));
    }

    #[test]
    fn test_default_parameter_becomes_nullable() {
        let meta = AnnotationMetadata::empty().declare(AnnotationEntry::new(runtime::NON_NULL));
        let swapped = nullable_for_default(&meta);
        assert!(swapped.has_annotation(runtime::NULLABLE));
        assert!(!swapped.has_annotation(runtime::NON_NULL));
    }
}
