//! Class assembly: static initializer, constructors and reference methods

use super::commands::BuildMethodDefinition;
use super::conditions::{conditions_from_requires, Condition};
use super::BeanDefinitionWriter;
use crate::argument::ArgumentBuilder;
use crate::error::WriterResult;
use crate::gen_utils::{class, erased_type, string_map_of, type_of};
use crate::metadata::metadata_type;
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{
    modifiers, AnnotationDef, ClassDef, ClassDefBuilder, ClassTypeDef, ExpressionDef, FieldDef, FieldRef, InvokeKind,
    MethodDef, MethodRef, StatementDef, TypeDef,
};
use beanforge_types::{AnnotationMetadata, MethodElement};

pub(super) const ANNOTATION_METADATA: &str = "$ANNOTATION_METADATA";
pub(super) const FAILED_INITIALIZATION: &str = "$FAILED_INITIALIZATION";
pub(super) const CONSTRUCTOR: &str = "$CONSTRUCTOR";
pub(super) const INJECTION_METHODS: &str = "$INJECTION_METHODS";
pub(super) const INJECTION_FIELDS: &str = "$INJECTION_FIELDS";
pub(super) const ANNOTATION_INJECTIONS: &str = "$ANNOTATION_INJECTIONS";
pub(super) const TYPE_ARGUMENTS: &str = "$TYPE_ARGUMENTS";
pub(super) const EXEC: &str = "$EXEC";
pub(super) const INFO: &str = "$INFO";
pub(super) const PRE_CONDITIONS: &str = "$PRE_CONDITIONS";
pub(super) const POST_CONDITIONS: &str = "$POST_CONDITIONS";
const INNER_CONFIGURATION_CLASSES: &str = "$INNER_CONFIGURATION_CLASSES";
const EXPOSED_TYPES: &str = "$EXPOSED_TYPES";

/// Static fields handed to the abstract definition, in constructor order
const SUPER_FIELDS: [&str; 9] = [
    ANNOTATION_METADATA,
    INJECTION_METHODS,
    INJECTION_FIELDS,
    ANNOTATION_INJECTIONS,
    EXEC,
    TYPE_ARGUMENTS,
    PRE_CONDITIONS,
    POST_CONDITIONS,
    FAILED_INITIALIZATION,
];

fn field_type(name: &str) -> TypeDef {
    match name {
        ANNOTATION_METADATA => metadata_type().into(),
        FAILED_INITIALIZATION => type_of(runtime::THROWABLE),
        CONSTRUCTOR => type_of(runtime::METHOD_OR_FIELD_REFERENCE),
        INJECTION_METHODS => type_of(runtime::METHOD_REFERENCE).array(),
        INJECTION_FIELDS => type_of(runtime::FIELD_REFERENCE).array(),
        ANNOTATION_INJECTIONS => type_of(runtime::ANNOTATION_REFERENCE).array(),
        TYPE_ARGUMENTS => type_of(runtime::MAP),
        EXEC => type_of(runtime::EXECUTABLE_METHODS_DEFINITION),
        INFO => type_of(runtime::PRECALCULATED_INFO),
        PRE_CONDITIONS | POST_CONDITIONS => type_of(runtime::CONDITION).array(),
        _ => type_of(runtime::SET),
    }
}

fn boolean_method(name: &str, value: bool) -> MethodDef {
    MethodDef::builder(name)
        .add_modifiers(modifiers::PUBLIC)
        .returns(TypeDef::boolean())
        .build(ExpressionDef::bool(value).returning())
}

fn class_method(name: &str, class_name: &str) -> MethodDef {
    MethodDef::builder(name)
        .add_modifiers(modifiers::PUBLIC)
        .returns(TypeDef::class())
        .build(ExpressionDef::class_literal(type_of(class_name)).returning())
}

/// `Set.of(new Object[]{A.class, ...})`
fn class_set(names: &[String]) -> ExpressionDef {
    ExpressionDef::invoke_static(
        MethodRef::interface(runtime::SET, "of", vec![TypeDef::object().array()], type_of(runtime::SET)),
        vec![ExpressionDef::new_array(
            TypeDef::object(),
            names.iter().map(|n| ExpressionDef::class_literal(type_of(n))).collect(),
        )],
    )
}

fn method_reference(
    class_literal: ExpressionDef,
    name: &str,
    arguments: ExpressionDef,
    metadata: ExpressionDef,
    requires_reflection: bool,
    lifecycle: Option<(bool, bool)>,
) -> ExpressionDef {
    let mut params = vec![
        TypeDef::class(),
        TypeDef::string(),
        type_of(runtime::ARGUMENT).array(),
        metadata_type().into(),
        TypeDef::boolean(),
    ];
    let mut args = vec![
        class_literal,
        ExpressionDef::string(name),
        arguments,
        metadata,
        ExpressionDef::bool(requires_reflection),
    ];
    if let Some((post_construct, pre_destroy)) = lifecycle {
        params.extend([TypeDef::boolean(), TypeDef::boolean()]);
        args.extend([ExpressionDef::bool(post_construct), ExpressionDef::bool(pre_destroy)]);
    }
    ExpressionDef::new_instance(MethodRef::constructor(runtime::METHOD_REFERENCE, params), args)
}

impl BeanDefinitionWriter {
    /// The finalized `$Definition` class
    pub(super) fn assemble(&self, session: &mut BuildSession) -> WriterResult<ClassDef> {
        let owner = self.class_name.clone();
        let bean_type = erased_type(&self.bean_type);
        let mut builder = ClassDef::builder(owner.clone());
        builder
            .add_modifiers(modifiers::SYNTHETIC)
            .add_annotation(AnnotationDef::of(runtime::GENERATED))
            .superclass(match &self.super_definition {
                Some(name) => class(name),
                None => ClassTypeDef::parameterized(runtime::ABSTRACT_INITIALIZABLE_BEAN_DEFINITION, vec![bean_type.clone()]),
            });

        let (pre, post) = conditions_from_requires(&self.annotation_metadata);
        self.static_fields(session, &mut builder, &pre, &post)?;
        self.constructors(&mut builder);

        let build = self.build_method(&mut builder)?;
        builder.add_method(build);
        if self.build_method.as_ref().map_or(false, BuildMethodDefinition::is_parametrized) {
            builder.add_interface(class(runtime::PARAMETRIZED_INSTANTIATABLE_BEAN_DEFINITION));
        }
        if let Some(inject) = self.inject_method(session)? {
            builder.add_method(inject);
        }
        for post_construct in [true, false] {
            for method in self.lifecycle_methods(&mut builder, post_construct)? {
                builder.add_method(method);
            }
        }
        if let Some(check) = self.check_if_should_load_method() {
            builder.add_method(check);
        }
        self.reference_methods(&mut builder, pre.is_empty() && post.is_empty());
        for method in session.take_load_class_methods(&owner) {
            builder.add_method(method);
        }
        Ok(builder.build())
    }

    // ===== Static state =====

    fn static_fields(
        &self,
        session: &mut BuildSession,
        builder: &mut ClassDefBuilder,
        pre: &[Condition],
        post: &[Condition],
    ) -> WriterResult<()> {
        let owner = self.class_name.clone();
        let field = |name: &str| FieldRef::new(owner.clone(), name, field_type(name));
        let mut assigned: Vec<&str> = Vec::new();
        let mut body = Vec::new();

        let metadata = if self.annotation_metadata.is_empty() {
            crate::metadata::empty_metadata()
        } else {
            session.annotation_metadata_expression(&owner, &self.annotation_metadata)?
        };
        body.push(StatementDef::put_static(field(ANNOTATION_METADATA), metadata));
        assigned.push(ANNOTATION_METADATA);

        body.push(StatementDef::put_static(field(CONSTRUCTOR), self.constructor_reference(session)?));
        assigned.push(CONSTRUCTOR);

        if !self.all_method_visits.is_empty() {
            let mut items = Vec::with_capacity(self.all_method_visits.len());
            for visit in &self.all_method_visits {
                items.push(self.injection_method_reference(session, &visit.method, visit.requires_reflection, visit.post_construct, visit.pre_destroy)?);
            }
            body.push(StatementDef::put_static(
                field(INJECTION_METHODS),
                ExpressionDef::new_array(type_of(runtime::METHOD_REFERENCE), items),
            ));
            assigned.push(INJECTION_METHODS);
        }

        if !self.field_injection_points.is_empty() {
            let mut items = Vec::with_capacity(self.field_injection_points.len());
            for visit in &self.field_injection_points {
                let f = &visit.field;
                let argument = ArgumentBuilder::new(session, &owner).argument(&f.name, f.generic_type(), &f.annotation_metadata)?;
                items.push(ExpressionDef::new_instance(
                    MethodRef::constructor(
                        runtime::FIELD_REFERENCE,
                        vec![TypeDef::class(), type_of(runtime::ARGUMENT), TypeDef::boolean()],
                    ),
                    vec![
                        ExpressionDef::class_literal(type_of(&f.declaring_type)),
                        argument,
                        ExpressionDef::bool(visit.requires_reflection),
                    ],
                ));
            }
            body.push(StatementDef::put_static(
                field(INJECTION_FIELDS),
                ExpressionDef::new_array(type_of(runtime::FIELD_REFERENCE), items),
            ));
            assigned.push(INJECTION_FIELDS);
        }

        if !self.annotation_injections.is_empty() {
            let mut items = Vec::with_capacity(self.annotation_injections.len());
            for injection in &self.annotation_injections {
                let ty = &injection.bean_type;
                let argument = ArgumentBuilder::new(session, &owner).argument(ty.simple_name(), ty, &AnnotationMetadata::empty())?;
                items.push(ExpressionDef::new_instance(
                    MethodRef::constructor(runtime::ANNOTATION_REFERENCE, vec![type_of(runtime::ARGUMENT)]),
                    vec![argument],
                ));
            }
            body.push(StatementDef::put_static(
                field(ANNOTATION_INJECTIONS),
                ExpressionDef::new_array(type_of(runtime::ANNOTATION_REFERENCE), items),
            ));
            assigned.push(ANNOTATION_INJECTIONS);
        }

        if !self.type_arguments.is_empty() {
            let mut entries = Vec::with_capacity(self.type_arguments.len());
            for (ty, arguments) in &self.type_arguments {
                let value = ArgumentBuilder::new(session, &owner).type_arguments(ty, arguments)?;
                entries.push((ty.clone(), value));
            }
            body.push(StatementDef::put_static(field(TYPE_ARGUMENTS), string_map_of(entries)));
            assigned.push(TYPE_ARGUMENTS);
        }

        if let Some(exec) = &self.executable_methods {
            body.push(StatementDef::put_static(
                field(EXEC),
                ExpressionDef::new_instance(MethodRef::constructor(exec.class_name(), vec![]), vec![]),
            ));
            assigned.push(EXEC);
        }

        body.push(StatementDef::put_static(field(INFO), self.precalculated_info()));
        assigned.push(INFO);

        let metadata_field = ExpressionDef::static_field(field(ANNOTATION_METADATA));
        for (name, conditions) in [(PRE_CONDITIONS, pre), (POST_CONDITIONS, post)] {
            if conditions.is_empty() {
                continue;
            }
            let items = conditions.iter().map(|c| c.expression(&metadata_field)).collect();
            body.push(StatementDef::put_static(
                field(name),
                ExpressionDef::new_array(type_of(runtime::CONDITION), items),
            ));
            assigned.push(name);
        }

        let inner_classes = if self.is_configuration_properties { self.bean_type.inner_classes.clone() } else { Vec::new() };
        if !inner_classes.is_empty() {
            body.push(StatementDef::put_static(field(INNER_CONFIGURATION_CLASSES), class_set(&inner_classes)));
            assigned.push(INNER_CONFIGURATION_CLASSES);
        }
        if !self.exposed_types.is_empty() {
            body.push(StatementDef::put_static(field(EXPOSED_TYPES), class_set(&self.exposed_types)));
            assigned.push(EXPOSED_TYPES);
        }

        for name in assigned.iter().chain(std::iter::once(&FAILED_INITIALIZATION)) {
            builder.add_field(
                FieldDef::builder(*name, field_type(name))
                    .add_modifiers(modifiers::PRIVATE | modifiers::STATIC)
                    .build(),
            );
        }

        let mut failure = vec![StatementDef::put_static(
            field(FAILED_INITIALIZATION),
            ExpressionDef::local("t", type_of(runtime::THROWABLE)),
        )];
        failure.extend(assigned.iter().map(|name| StatementDef::put_static(field(name), ExpressionDef::null())));
        builder.add_static_statement(StatementDef::try_catch(
            StatementDef::multi(body),
            class(runtime::THROWABLE),
            "t",
            StatementDef::multi(failure),
        ));
        Ok(())
    }

    fn constructor_reference(&self, session: &mut BuildSession) -> WriterResult<ExpressionDef> {
        let owner = self.class_name.clone();
        Ok(match &self.build_method {
            Some(BuildMethodDefinition::Constructor {
                constructor,
                requires_reflection,
            }) => {
                let arguments = ArgumentBuilder::new(session, &owner).method_arguments(constructor)?;
                let metadata = session.annotation_metadata_expression(&owner, &constructor.annotation_metadata)?;
                method_reference(
                    ExpressionDef::class_literal(type_of(&constructor.declaring_type)),
                    "<init>",
                    arguments,
                    metadata,
                    *requires_reflection || constructor.reflection_required,
                    None,
                )
            }
            Some(BuildMethodDefinition::FactoryMethod { factory, method }) => {
                let arguments = ArgumentBuilder::new(session, &owner).method_arguments(method)?;
                let metadata = session.annotation_metadata_expression(&owner, &method.annotation_metadata)?;
                method_reference(
                    ExpressionDef::class_literal(erased_type(factory)),
                    &method.name,
                    arguments,
                    metadata,
                    method.reflection_required,
                    None,
                )
            }
            Some(BuildMethodDefinition::FactoryField { factory, field }) => {
                let argument = ArgumentBuilder::new(session, &owner).argument(&field.name, field.generic_type(), &field.annotation_metadata)?;
                ExpressionDef::new_instance(
                    MethodRef::constructor(
                        runtime::FIELD_REFERENCE,
                        vec![TypeDef::class(), type_of(runtime::ARGUMENT), TypeDef::boolean()],
                    ),
                    vec![
                        ExpressionDef::class_literal(erased_type(factory)),
                        argument,
                        ExpressionDef::bool(field.reflection_required),
                    ],
                )
            }
            None => ExpressionDef::null(),
        })
    }

    fn injection_method_reference(
        &self,
        session: &mut BuildSession,
        method: &MethodElement,
        requires_reflection: bool,
        post_construct: bool,
        pre_destroy: bool,
    ) -> WriterResult<ExpressionDef> {
        let arguments = ArgumentBuilder::new(session, &self.class_name).method_arguments(method)?;
        let metadata = session.annotation_metadata_expression(&self.class_name, &method.annotation_metadata)?;
        let lifecycle = (post_construct || pre_destroy).then_some((post_construct, pre_destroy));
        Ok(method_reference(
            ExpressionDef::class_literal(type_of(&method.declaring_type)),
            &method.name,
            arguments,
            metadata,
            requires_reflection,
            lifecycle,
        ))
    }

    fn precalculated_info(&self) -> ExpressionDef {
        let meta = &self.annotation_metadata;
        let scope = meta
            .declared_annotation_names_by_stereotype(runtime::SCOPE)
            .into_iter()
            .next()
            .or_else(|| meta.annotation_names_by_stereotype(runtime::SCOPE).into_iter().next());
        let optional = type_of(runtime::OPTIONAL);
        let scope_value = match &scope {
            Some(name) => ExpressionDef::invoke_static(
                MethodRef::new(runtime::OPTIONAL, "of", vec![TypeDef::object()], optional.clone()),
                vec![ExpressionDef::string(name.clone())],
            ),
            None => ExpressionDef::invoke_static(MethodRef::new(runtime::OPTIONAL, "empty", vec![], optional.clone()), vec![]),
        };
        let flags = [
            self.bean_type.is_abstract,
            meta.has_declared_stereotype(runtime::EACH_PROPERTY) || meta.has_declared_stereotype(runtime::EACH_BEAN),
            scope.as_deref() == Some(runtime::SINGLETON),
            meta.has_declared_stereotype(runtime::PRIMARY),
            self.is_configuration_properties,
            self.bean_type.is_container_type(),
            self.requires_method_processing,
            self.has_evaluated_expressions,
        ];
        let mut params = vec![optional];
        params.extend(std::iter::repeat(TypeDef::boolean()).take(flags.len()));
        let mut args = vec![scope_value];
        args.extend(flags.iter().map(|f| ExpressionDef::bool(*f)));
        ExpressionDef::new_instance(MethodRef::constructor(runtime::PRECALCULATED_INFO, params), args)
    }

    // ===== Constructors =====

    fn constructors(&self, builder: &mut ClassDefBuilder) {
        let owner = self.class_name.as_str();
        let bean_class = ExpressionDef::class_literal(erased_type(&self.bean_type));
        let constructor_field = ExpressionDef::static_field(FieldRef::new(owner, CONSTRUCTOR, field_type(CONSTRUCTOR)));
        let pair = vec![TypeDef::class(), field_type(CONSTRUCTOR)];

        if let Some(parent) = &self.super_definition {
            builder.add_method(MethodDef::constructor().add_modifiers(modifiers::PUBLIC).build(StatementDef::multi(vec![
                ExpressionDef::invoke_super(MethodRef::constructor(parent.clone(), pair), vec![bean_class, constructor_field])
                    .statement(),
                StatementDef::return_void(),
            ])));
            return;
        }

        let mut super_params = pair.clone();
        super_params.extend(SUPER_FIELDS.iter().map(|f| field_type(f)));
        super_params.push(field_type(INFO));
        let protected = MethodDef::constructor()
            .add_modifiers(modifiers::PROTECTED)
            .add_parameter("beanType", TypeDef::class())
            .add_parameter("constructor", field_type(CONSTRUCTOR));
        let params = protected.params();
        let mut super_args = params.clone();
        super_args.extend(SUPER_FIELDS.iter().map(|f| {
            if builder.has_field(f) {
                ExpressionDef::static_field(FieldRef::new(owner, *f, field_type(f)))
            } else {
                ExpressionDef::null()
            }
        }));
        super_args.push(ExpressionDef::static_field(FieldRef::new(owner, INFO, field_type(INFO))));
        builder.add_method(protected.build(StatementDef::multi(vec![
            ExpressionDef::invoke_super(
                MethodRef::constructor(runtime::ABSTRACT_INITIALIZABLE_BEAN_DEFINITION, super_params),
                super_args,
            )
            .statement(),
            StatementDef::return_void(),
        ])));

        let this_call = ExpressionDef::Invoke {
            kind: InvokeKind::Special,
            instance: Box::new(ExpressionDef::This),
            method: MethodRef::constructor(owner, pair),
            args: vec![bean_class, constructor_field],
        };
        builder.add_method(MethodDef::constructor().add_modifiers(modifiers::PUBLIC).build(StatementDef::multi(vec![
            this_call.statement(),
            StatementDef::return_void(),
        ])));
    }

    // ===== Reference methods =====

    fn reference_methods(&self, builder: &mut ClassDefBuilder, unconditional: bool) {
        let owner = self.class_name.as_str();
        if let Some(order) = self.annotation_metadata.int_value(runtime::ORDER, "value").filter(|o| *o != 0) {
            builder.add_method(
                MethodDef::builder("getOrder")
                    .add_modifiers(modifiers::PUBLIC)
                    .returns(TypeDef::int())
                    .build(ExpressionDef::int(order as i32).returning()),
            );
        }
        if let Some(intercepted) = &self.intercepted_type {
            builder.add_method(class_method("getInterceptedType", intercepted));
        }
        builder.add_method(
            MethodDef::builder("load")
                .add_modifiers(modifiers::PUBLIC)
                .returns(type_of(runtime::BEAN_DEFINITION))
                .build(ExpressionDef::this().returning()),
        );
        builder.add_method(boolean_method("isContextScope", self.annotation_metadata.has_stereotype(runtime::CONTEXT)));
        builder.add_method(boolean_method("isProxiedBean", self.proxied_bean));
        builder.add_method(boolean_method("isProxyTarget", self.proxy_target));
        if unconditional {
            builder.add_method(
                MethodDef::builder("isEnabled")
                    .add_modifiers(modifiers::PUBLIC)
                    .add_parameter("context", type_of(runtime::BEAN_CONTEXT))
                    .returns(TypeDef::boolean())
                    .build(ExpressionDef::bool(true).returning()),
            );
            builder.add_method(
                MethodDef::builder("isEnabled")
                    .add_modifiers(modifiers::PUBLIC)
                    .add_parameter("context", type_of(runtime::BEAN_CONTEXT))
                    .add_parameter("resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
                    .returns(TypeDef::boolean())
                    .build(ExpressionDef::bool(true).returning()),
            );
        }
        if let Some(reference) = &self.proxy_reference {
            builder.add_interface(class(runtime::PROXY_BEAN_DEFINITION));
            builder.add_method(class_method("getTargetDefinitionType", &reference.definition));
            builder.add_method(class_method("getTargetType", &reference.target_type));
        }
        if builder.has_field(INNER_CONFIGURATION_CLASSES) {
            let set = FieldRef::new(owner, INNER_CONFIGURATION_CLASSES, field_type(INNER_CONFIGURATION_CLASSES));
            builder.add_method(
                MethodDef::builder("isInnerConfiguration")
                    .add_modifiers(modifiers::PROTECTED)
                    .add_parameter("type", TypeDef::class())
                    .returns(TypeDef::boolean())
                    .build_with(|params| {
                        ExpressionDef::static_field(set)
                            .invoke(
                                MethodRef::interface(runtime::SET, "contains", vec![TypeDef::object()], TypeDef::boolean()),
                                vec![params[0].clone()],
                            )
                            .returning()
                    }),
            );
        }
        if builder.has_field(EXPOSED_TYPES) {
            let set = FieldRef::new(owner, EXPOSED_TYPES, field_type(EXPOSED_TYPES));
            builder.add_method(
                MethodDef::builder("getExposedTypes")
                    .add_modifiers(modifiers::PUBLIC)
                    .returns(type_of(runtime::SET))
                    .build(ExpressionDef::static_field(set).returning()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_definition::BeanProducer;
    use crate::options::WriterOptions;
    use beanforge_bytecode::{CatchDef, Constant};
    use beanforge_types::{AnnotationEntry, AnnotationValue, ClassElement, CollectingVisitorContext};

    fn finished(bean: &ClassElement, exec: Option<MethodElement>) -> (BeanDefinitionWriter, BuildSession) {
        let mut context = CollectingVisitorContext::new();
        let mut writer =
            BeanDefinitionWriter::new(BeanProducer::Class(bean.clone()), vec![bean.name.clone()], None, &mut context)
                .expect("writer");
        writer.visit_default_constructor().expect("constructor");
        if let Some(method) = exec {
            writer.visit_executable_method(&method, None).expect("executable method");
        }
        let mut session = BuildSession::new(WriterOptions::default());
        writer.visit_bean_definition_end(&mut session).expect("end");
        (writer, session)
    }

    fn singleton(name: &str) -> ClassElement {
        ClassElement::of(name).with_annotation_metadata(
            AnnotationMetadata::empty()
                .declare(AnnotationEntry::new(runtime::SINGLETON))
                .stereotype(runtime::SCOPE, runtime::SINGLETON),
        )
    }

    /// The guarded initializer and its single catch clause
    fn guarded(statement: &StatementDef) -> Option<(&StatementDef, &CatchDef)> {
        if let StatementDef::Try { body, catches, .. } = statement {
            return catches.first().map(|c| (body.as_ref(), c));
        }
        statement.children().into_iter().find_map(guarded)
    }

    fn static_writes(statement: &StatementDef) -> Vec<(&str, &ExpressionDef)> {
        match statement {
            StatementDef::PutStatic { field, value } => vec![(field.name.as_str(), value)],
            StatementDef::Multi(items) => items.iter().flat_map(static_writes).collect(),
            _ => Vec::new(),
        }
    }

    fn info_flags(writer: &BeanDefinitionWriter) -> Vec<bool> {
        let class_def = writer.class_def().expect("class def");
        let (body, _) = class_def.static_initializer.as_ref().and_then(guarded).expect("guarded initializer");
        let info = static_writes(body)
            .into_iter()
            .find(|(name, _)| *name == INFO)
            .map(|(_, value)| value.clone())
            .expect("info assignment");
        let ExpressionDef::New { args, .. } = &info else {
            panic!("precalculated info is not instantiated: {:?}", info);
        };
        args.iter()
            .skip(1)
            .map(|a| match a {
                ExpressionDef::Constant(Constant::Bool(b)) => *b,
                other => panic!("not a flag: {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_failed_initialization_nulls_assigned_fields() {
        let (writer, _) = finished(&singleton("app.Engine"), None);
        let class_def = writer.class_def().expect("class def");
        let (body, catch) = class_def.static_initializer.as_ref().and_then(guarded).expect("guarded initializer");
        assert_eq!(catch.local, "t");

        let assigned: Vec<&str> = static_writes(body).into_iter().map(|(name, _)| name).collect();
        assert!(assigned.contains(&ANNOTATION_METADATA));
        assert!(assigned.contains(&INFO));

        let handler = static_writes(&catch.body);
        let (first, failure) = handler[0];
        assert_eq!(first, FAILED_INITIALIZATION);
        assert!(matches!(failure, ExpressionDef::Local { name, .. } if name == "t"));
        let nulled: Vec<&str> = handler[1..]
            .iter()
            .map(|(name, value)| {
                assert_eq!(**value, ExpressionDef::null(), "{} is not reset", name);
                *name
            })
            .collect();
        assert_eq!(nulled, assigned);

        for name in assigned.iter().chain(std::iter::once(&FAILED_INITIALIZATION)) {
            assert!(class_def.find_field(name).is_some(), "missing static field {}", name);
        }
    }

    #[test]
    fn test_precalculated_info_flags() {
        let flags = info_flags(&finished(&singleton("app.Engine"), None).0);
        // abstract, iterable, singleton, primary, configuration properties, container, method processing, expressions
        assert_eq!(flags, vec![false, false, true, false, false, false, false, false]);
    }

    #[test]
    fn test_executable_method_expressions_are_registered() {
        let method = MethodElement::new("app.Engine", "start", ClassElement::of("void")).with_annotation_metadata(
            AnnotationMetadata::empty().declare(
                AnnotationEntry::new("app.Guarded")
                    .with("value", AnnotationValue::String("#{ env['x'] == 1 }".into())),
            ),
        );
        let (writer, session) = finished(&singleton("app.Engine"), Some(method));
        let expressions = session.evaluated_expressions();
        assert_eq!(expressions.len(), 1);
        assert_eq!(expressions[0].class_name, "app.$Engine$Definition$Expr0");
        assert_eq!(info_flags(&writer).last(), Some(&true));
    }
}
