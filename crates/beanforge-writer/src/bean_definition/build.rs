//! Instantiation and lifecycle methods
//!
//! `instantiate` (or `doInstantiate` for parametrized beans) creates the bean
//! through its constructor or factory, then runs injection and post-construct
//! callbacks on the new instance. Constructors and lifecycle callbacks bound to
//! `AROUND_CONSTRUCT`, `POST_CONSTRUCT` or `PRE_DESTROY` interceptors are routed
//! through generated inner classes handed to the interceptor chains.

use super::commands::{BuildMethodDefinition, LifecycleDefinition};
use super::conditions::requires_bean_property;
use super::injection::{
    bean_context, definition_call, destroy_inject_scoped_beans, invoke_injected, resolution_context, InjectionSite, Locals,
};
use super::static_init::ANNOTATION_METADATA;
use super::BeanDefinitionWriter;
use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class, erased_type, method_ref, parameter_types, type_of};
use crate::metadata::{get_annotation_metadata_method, metadata_type};
use crate::dispatch::required_method;
use crate::aop_proxy::ADDITIONAL_PARAMETERS_COUNT;
use crate::method_gen::{invoke_bean_constructor, invoke_kotlin_default_method};
use crate::runtime;
use beanforge_bytecode::{
    modifiers, ClassDef, ClassDefBuilder, ExpressionDef, FieldDef, FieldRef, InvokeKind, MethodDef, MethodDefBuilder,
    MethodRef, StatementDef, TypeDef,
};
use beanforge_types::{AnnotationMetadata, ClassElement, FieldElement, InterceptorKind, MethodElement, ParameterElement};

/// Suffix of the inner constructor interceptor class
const CONSTRUCTOR_INTERCEPTOR: &str = "$ConstructorInterceptor";

/// Whether lifecycle stage `kind` of a bean goes through interceptors
///
/// A bean declared `@Around(proxyTarget = true)`, or produced by a factory
/// method, is intercepted by its own definition; a plain `@Around` bean only
/// through its generated AOP type. Outside of that candidate a binding of
/// `kind` still applies when no `AROUND` binding is present, so an advised
/// pair reports interception exactly once. Interceptors are never
/// intercepted themselves.
pub fn is_intercepted_lifecycle_by_type(
    bean_type: &ClassElement,
    meta: &AnnotationMetadata,
    factory_method: bool,
    aop_type: bool,
    kind: InterceptorKind,
) -> bool {
    if bean_type.is_assignable(runtime::INTERCEPTOR) {
        return false;
    }
    let has_kind = meta.has_interceptor_binding(kind);
    let proxy_target = meta.bool_value(runtime::AROUND, "proxyTarget").unwrap_or(false) || factory_method;
    let candidate = proxy_target != aop_type;
    if candidate {
        has_kind
    } else if has_kind {
        !meta.has_interceptor_binding(InterceptorKind::Around)
    } else {
        false
    }
}

fn lifecycle_params() -> Vec<TypeDef> {
    vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT), TypeDef::object()]
}

impl BeanDefinitionWriter {
    // ===== Build method =====

    /// `instantiate(res, ctx)` or `doInstantiate(res, ctx, args)`
    pub(super) fn build_method(&self, builder: &mut ClassDefBuilder) -> WriterResult<MethodDef> {
        let Some(build) = self.build_method.as_ref() else {
            return Err(WriterError::illegal_state(format!(
                "Bean definition {} has no constructor",
                self.class_name
            )));
        };
        let parametrized = build.is_parametrized();
        let mut method = MethodDef::builder(if parametrized { "doInstantiate" } else { "instantiate" })
            .add_modifiers(modifiers::PUBLIC)
            .add_parameter("$resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
            .add_parameter("$context", type_of(runtime::BEAN_CONTEXT));
        if parametrized {
            method = method.add_parameter("$args", type_of(runtime::MAP));
        }
        let method = method.returns(TypeDef::object());
        let args = if parametrized { method.params().get(2).cloned() } else { None };

        let mut statements = Vec::new();
        if self.check_if_should_load_required() {
            statements.push(
                definition_call(
                    "checkIfShouldLoad",
                    vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT)],
                    TypeDef::Void,
                    vec![resolution_context(), bean_context()],
                )
                .statement(),
            );
        }

        let bean_type = erased_type(&self.bean_type);
        let mut locals = Locals::default();
        let intercepted = self.is_intercepted_lifecycle(InterceptorKind::AroundConstruct);
        let creation = match build {
            BuildMethodDefinition::Constructor {
                constructor,
                requires_reflection,
            } => {
                let values = self.constructor_values(&constructor.parameters, args.as_ref())?;
                if intercepted {
                    builder.add_inner_type(self.constructor_interceptor(build)?);
                    self.intercepted_construction(None, values)
                } else {
                    let mut constructor = constructor.clone();
                    constructor.reflection_required |= *requires_reflection;
                    let (defined, values, has_values) =
                        self.kotlin_flags(&constructor.parameters, values, &mut locals);
                    statements.extend(defined);
                    invoke_bean_constructor(&constructor, values, has_values.as_deref())?
                }
            }
            BuildMethodDefinition::FactoryMethod { factory, method: producer } => {
                let factory_bean = if producer.is_static {
                    None
                } else {
                    let local = locals.next("factoryBean");
                    statements.push(StatementDef::DefineLocal {
                        name: local.clone(),
                        ty: erased_type(factory),
                        value: factory_lookup(factory),
                    });
                    statements.push(mark_dependent_as_factory());
                    Some(ExpressionDef::local(local, erased_type(factory)))
                };
                let values = self.constructor_values(&producer.parameters, args.as_ref())?;
                if intercepted {
                    builder.add_inner_type(self.constructor_interceptor(build)?);
                    self.intercepted_construction(factory_bean, values)
                } else {
                    invoke_factory_method(producer, factory_bean, values)
                }
            }
            BuildMethodDefinition::FactoryField { factory, field } => {
                let factory_bean = if field.is_static {
                    None
                } else {
                    let local = locals.next("factoryBean");
                    statements.push(StatementDef::DefineLocal {
                        name: local.clone(),
                        ty: erased_type(factory),
                        value: factory_lookup(factory),
                    });
                    statements.push(mark_dependent_as_factory());
                    Some(ExpressionDef::local(local, erased_type(factory)))
                };
                if intercepted {
                    builder.add_inner_type(self.constructor_interceptor(build)?);
                    self.intercepted_construction(factory_bean, Vec::new())
                } else {
                    read_factory_field(factory, field, factory_bean)
                }
            }
        };

        let on_instance = self.on_bean_instance(build);
        let body = creation
            .cast(bean_type.clone())
            .new_local("bean", bean_type, |bean| {
                let mut tail = on_instance(&bean);
                tail.push(bean.returning());
                StatementDef::multi(tail)
            });
        statements.push(body);
        Ok(method.build(StatementDef::multi(statements)))
    }

    fn constructor_values(&self, parameters: &[ParameterElement], args: Option<&ExpressionDef>) -> WriterResult<Vec<ExpressionDef>> {
        parameters
            .iter()
            .enumerate()
            .map(|(i, p)| self.resolve_value(InjectionSite::Constructor(i), &p.name, p.generic_type(), &p.annotation_metadata, args))
            .collect()
    }

    /// Locals and has-value flags for Kotlin constructors with default parameters
    fn kotlin_flags(
        &self,
        parameters: &[ParameterElement],
        values: Vec<ExpressionDef>,
        locals: &mut Locals,
    ) -> (Vec<StatementDef>, Vec<ExpressionDef>, Option<Vec<ExpressionDef>>) {
        if !parameters.iter().any(|p| p.has_default) {
            return (Vec::new(), values, None);
        }
        let mut defined = Vec::new();
        let mut out = Vec::with_capacity(values.len());
        let mut flags = Vec::with_capacity(values.len());
        for (p, value) in parameters.iter().zip(values) {
            if !p.has_default {
                out.push(value);
                flags.push(ExpressionDef::bool(true));
                continue;
            }
            let property = p
                .annotation_metadata
                .string_value(runtime::PROPERTY, "name")
                .filter(|n| !n.is_empty());
            match property {
                Some(property) => {
                    flags.push(definition_call(
                        "containsPropertyValue",
                        vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT), TypeDef::string()],
                        TypeDef::boolean(),
                        vec![resolution_context(), bean_context(), ExpressionDef::string(property)],
                    ));
                    out.push(value);
                }
                None => {
                    let name = locals.next("value");
                    defined.push(StatementDef::DefineLocal {
                        name: name.clone(),
                        ty: TypeDef::object(),
                        value,
                    });
                    let local = ExpressionDef::local(name, TypeDef::object());
                    flags.push(local.clone().is_non_null());
                    out.push(local);
                }
            }
        }
        (defined, out, Some(flags))
    }

    /// Statements run on the new instance before it is returned
    fn on_bean_instance(&self, build: &BuildMethodDefinition) -> impl FnOnce(&ExpressionDef) -> Vec<StatementDef> {
        let inject = !self.inject_commands.is_empty() || self.super_definition.is_some();
        let scoped = build.has_inject_scope();
        let initialize = self.post_construct.is_some();
        move |bean| {
            let mut statements = Vec::new();
            if inject {
                statements.push(
                    definition_call("inject", lifecycle_params(), TypeDef::object(), vec![resolution_context(), bean_context(), bean.clone()])
                        .statement(),
                );
            }
            if scoped {
                statements.push(destroy_inject_scoped_beans());
            }
            if initialize {
                statements.push(
                    definition_call(
                        "initialize",
                        lifecycle_params(),
                        TypeDef::object(),
                        vec![resolution_context(), bean_context(), bean.clone()],
                    )
                    .statement(),
                );
            }
            statements
        }
    }

    // ===== Constructor interception =====

    fn intercepted_construction(&self, factory_bean: Option<ExpressionDef>, values: Vec<ExpressionDef>) -> ExpressionDef {
        let interceptor = format!("{}{}", self.class_name, CONSTRUCTOR_INTERCEPTOR);
        let mut ctor_params = vec![type_of(runtime::BEAN_DEFINITION)];
        let mut ctor_args = vec![ExpressionDef::this()];
        if let Some(factory) = factory_bean {
            ctor_params.push(TypeDef::object());
            ctor_args.push(factory);
        }
        let additional = if self.intercepted_type.is_some() { ADDITIONAL_PARAMETERS_COUNT as i32 } else { 0 };
        ExpressionDef::invoke_static(
            MethodRef::new(
                runtime::CONSTRUCTOR_INTERCEPTOR_CHAIN,
                "instantiate",
                vec![
                    type_of(runtime::BEAN_RESOLUTION_CONTEXT),
                    type_of(runtime::BEAN_CONTEXT),
                    type_of(runtime::LIST),
                    type_of(runtime::BEAN_DEFINITION),
                    type_of(runtime::ABSTRACT_BEAN_DEFINITION_BEAN_CONSTRUCTOR),
                    TypeDef::int(),
                    TypeDef::object().array(),
                ],
                TypeDef::object(),
            ),
            vec![
                resolution_context(),
                bean_context(),
                ExpressionDef::null(),
                ExpressionDef::this(),
                ExpressionDef::new_instance(MethodRef::constructor(interceptor, ctor_params), ctor_args),
                ExpressionDef::int(additional),
                ExpressionDef::new_array(
                    TypeDef::object(),
                    values.into_iter().map(|v| v.cast(TypeDef::object())).collect(),
                ),
            ],
        )
    }

    /// Inner `$ConstructorInterceptor` creating the bean from an argument array
    fn constructor_interceptor(&self, build: &BuildMethodDefinition) -> WriterResult<ClassDef> {
        let name = format!("{}{}", self.class_name, CONSTRUCTOR_INTERCEPTOR);
        let factory_field = FieldRef::new(name.clone(), "$factory", TypeDef::object());
        let has_factory = match build {
            BuildMethodDefinition::Constructor { .. } => false,
            BuildMethodDefinition::FactoryMethod { method, .. } => !method.is_static,
            BuildMethodDefinition::FactoryField { field, .. } => !field.is_static,
        };

        let mut builder = ClassDef::builder(name.clone());
        builder
            .modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL | modifiers::SYNTHETIC)
            .superclass(class(runtime::ABSTRACT_BEAN_DEFINITION_BEAN_CONSTRUCTOR));

        let mut ctor = MethodDef::constructor().add_parameter("definition", type_of(runtime::BEAN_DEFINITION));
        if has_factory {
            builder.add_field(
                FieldDef::builder("$factory", TypeDef::object())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            );
            ctor = ctor.add_parameter("factory", TypeDef::object());
        }
        let params = ctor.params();
        let mut ctor_body = vec![ExpressionDef::invoke_super(
            MethodRef::constructor(runtime::ABSTRACT_BEAN_DEFINITION_BEAN_CONSTRUCTOR, vec![type_of(runtime::BEAN_DEFINITION)]),
            vec![params[0].clone()],
        )
        .statement()];
        if has_factory {
            ctor_body.push(ExpressionDef::this().put_field(factory_field.clone(), params[1].clone()));
        }
        ctor_body.push(StatementDef::return_void());
        builder.add_method(ctor.build(StatementDef::multi(ctor_body)));

        let instantiate = MethodDef::builder("instantiate")
            .add_modifiers(modifiers::PUBLIC)
            .add_parameter("args", TypeDef::object().array())
            .returns(TypeDef::object());
        let args = instantiate.params()[0].clone();
        let values = |parameters: &[ParameterElement]| -> Vec<ExpressionDef> {
            (0..parameters.len()).map(|i| args.clone().array_element(i)).collect()
        };
        let created = match build {
            BuildMethodDefinition::Constructor { constructor, requires_reflection } => {
                let mut constructor = constructor.clone();
                constructor.reflection_required |= *requires_reflection;
                invoke_bean_constructor(&constructor, values(&constructor.parameters), None)?
            }
            BuildMethodDefinition::FactoryMethod { factory, method } => {
                let target = has_factory.then(|| ExpressionDef::this().field(factory_field).cast(erased_type(factory)));
                invoke_factory_method(method, target, values(&method.parameters))
            }
            BuildMethodDefinition::FactoryField { factory, field } => {
                let target = has_factory.then(|| ExpressionDef::this().field(factory_field).cast(erased_type(factory)));
                read_factory_field(factory, field, target)
            }
        };
        builder.add_method(instantiate.build(created.returning()));
        Ok(builder.build())
    }

    // ===== Lifecycle =====

    /// `initialize` or `dispose`, plus the intercepted variant and its inner class
    pub(super) fn lifecycle_methods(&self, builder: &mut ClassDefBuilder, post_construct: bool) -> WriterResult<Vec<MethodDef>> {
        let (lifecycle, name, super_name, interface, inner) = if post_construct {
            (
                self.post_construct.as_ref(),
                "initialize",
                "postConstruct",
                runtime::INITIALIZING_BEAN_DEFINITION,
                "$InitializeInterceptor",
            )
        } else {
            (
                self.pre_destroy.as_ref(),
                "dispose",
                "preDestroy",
                runtime::DISPOSABLE_BEAN_DEFINITION,
                "$DisposeInterceptor",
            )
        };
        let Some(lifecycle) = lifecycle else {
            return Ok(Vec::new());
        };
        builder.add_interface(class(interface));

        let body = self.lifecycle_body(lifecycle, super_name)?;
        if !lifecycle.intercepted {
            return Ok(vec![lifecycle_method(name).build(body)]);
        }
        let intercepted_name = format!("{}$intercepted", name);
        let inner_name = format!("{}{}", self.class_name, inner);
        builder.add_inner_type(self.lifecycle_interceptor(&inner_name, name, &intercepted_name));

        let chain_call = ExpressionDef::invoke_static(
            MethodRef::new(
                runtime::METHOD_INTERCEPTOR_CHAIN,
                name,
                vec![
                    type_of(runtime::BEAN_RESOLUTION_CONTEXT),
                    type_of(runtime::BEAN_CONTEXT),
                    type_of(runtime::BEAN_DEFINITION),
                    type_of(runtime::EXECUTABLE_METHOD),
                    TypeDef::object(),
                ],
                TypeDef::object(),
            ),
            vec![
                resolution_context(),
                bean_context(),
                ExpressionDef::this(),
                ExpressionDef::new_instance(
                    MethodRef::constructor(
                        inner_name,
                        vec![type_of(&self.class_name), type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT)],
                    ),
                    vec![ExpressionDef::this(), resolution_context(), bean_context()],
                ),
                ExpressionDef::param(2, TypeDef::object()),
            ],
        )
        .cast(erased_type(&self.bean_type));
        Ok(vec![
            lifecycle_method(&intercepted_name).build(body),
            lifecycle_method(name).build(chain_call.returning()),
        ])
    }

    fn lifecycle_body(&self, lifecycle: &LifecycleDefinition, super_name: &str) -> WriterResult<StatementDef> {
        let bean = ExpressionDef::param(2, TypeDef::object());
        let bean_type = erased_type(&self.bean_type);
        let instance = ExpressionDef::local("beanInstance", bean_type.clone());
        let mut statements = lifecycle
            .points
            .iter()
            .map(|point| {
                let values = point
                    .method
                    .parameters
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let site = InjectionSite::Method {
                            method: point.method_index,
                            argument: i,
                        };
                        self.resolve_value(site, &p.name, p.generic_type(), &p.annotation_metadata, None)
                    })
                    .collect::<WriterResult<_>>()?;
                Ok(invoke_injected(&point.method, point.method_index, point.requires_reflection, &instance, &bean, values).statement())
            })
            .collect::<WriterResult<Vec<StatementDef>>>()?;
        if lifecycle.has_inject_scope() {
            statements.push(destroy_inject_scoped_beans());
        }
        let super_call = ExpressionDef::Invoke {
            kind: InvokeKind::Special,
            instance: Box::new(ExpressionDef::This),
            method: MethodRef::new(runtime::ABSTRACT_INITIALIZABLE_BEAN_DEFINITION, super_name, lifecycle_params(), TypeDef::object()),
            args: vec![resolution_context(), bean_context(), bean.clone()],
        };
        statements.push(super_call.returning());
        Ok(bean
            .cast(bean_type.clone())
            .new_local("beanInstance", bean_type, |_| StatementDef::multi(statements)))
    }

    /// Executable method handed to the interceptor chain, calling back `intercepted_name`
    fn lifecycle_interceptor(&self, inner_name: &str, method_name: &str, intercepted_name: &str) -> ClassDef {
        let definition_type = type_of(&self.class_name);
        let definition = FieldRef::new(inner_name, "$definition", definition_type.clone());
        let res = FieldRef::new(inner_name, "$resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT));
        let ctx = FieldRef::new(inner_name, "$beanContext", type_of(runtime::BEAN_CONTEXT));

        let mut builder = ClassDef::builder(inner_name);
        builder
            .modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL | modifiers::SYNTHETIC)
            .superclass(class(runtime::ABSTRACT_EXECUTABLE_METHOD));
        for field in [&definition, &res, &ctx] {
            builder.add_field(
                FieldDef::builder(field.name.clone(), field.ty.clone())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            );
        }

        let ctor = MethodDef::constructor()
            .add_parameter("definition", definition_type)
            .add_parameter("resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
            .add_parameter("beanContext", type_of(runtime::BEAN_CONTEXT));
        let params = ctor.params();
        builder.add_method(ctor.build(StatementDef::multi(vec![
            ExpressionDef::invoke_super(
                MethodRef::constructor(runtime::ABSTRACT_EXECUTABLE_METHOD, vec![TypeDef::class(), TypeDef::string()]),
                vec![
                    ExpressionDef::class_literal(erased_type(&self.bean_type)),
                    ExpressionDef::string(method_name),
                ],
            )
            .statement(),
            ExpressionDef::this().put_field(definition.clone(), params[0].clone()),
            ExpressionDef::this().put_field(res.clone(), params[1].clone()),
            ExpressionDef::this().put_field(ctx.clone(), params[2].clone()),
            StatementDef::return_void(),
        ])));

        let invoke = MethodDef::builder("invokeInternal")
            .add_modifiers(modifiers::PROTECTED)
            .add_parameter("instance", TypeDef::object())
            .add_parameter("arguments", TypeDef::object().array())
            .returns(TypeDef::object());
        let instance = invoke.params()[0].clone();
        let call = ExpressionDef::this()
            .field(definition)
            .invoke(
                MethodRef::new(self.class_name.clone(), intercepted_name, lifecycle_params(), TypeDef::object()),
                vec![ExpressionDef::this().field(res), ExpressionDef::this().field(ctx), instance],
            );
        builder.add_method(invoke.build(call.returning()));
        builder.add_method(get_annotation_metadata_method(Some(FieldRef::new(
            self.class_name.clone(),
            ANNOTATION_METADATA,
            metadata_type().into(),
        ))));
        builder.build()
    }

    // ===== Conditional loading =====

    fn check_if_should_load_required(&self) -> bool {
        !self.annotation_injections.is_empty() && requires_bean_property(&self.annotation_metadata)
    }

    /// `checkIfShouldLoad(res, ctx)` reading the properties of other beans
    pub(super) fn check_if_should_load_method(&self) -> Option<MethodDef> {
        if !self.check_if_should_load_required() {
            return None;
        }
        let mut locals = Locals::default();
        let mut statements = Vec::new();
        for (index, injection) in self.annotation_injections.iter().enumerate() {
            let bean_type = erased_type(&injection.bean_type);
            let bean_local = locals.next("bean");
            let lookup = definition_call(
                "getBeanForAnnotation",
                vec![
                    type_of(runtime::BEAN_RESOLUTION_CONTEXT),
                    type_of(runtime::BEAN_CONTEXT),
                    TypeDef::int(),
                    type_of(runtime::QUALIFIER_TYPE),
                ],
                TypeDef::object(),
                vec![resolution_context(), bean_context(), ExpressionDef::int(index as i32), ExpressionDef::null()],
            );
            let bean = ExpressionDef::local(bean_local.clone(), bean_type.clone());
            let checks = injection
                .points
                .iter()
                .map(|point| {
                    let value = bean.clone().invoke(method_ref(&point.getter), vec![]);
                    definition_call(
                        "checkInjectedBeanPropertyValue",
                        vec![TypeDef::string(), TypeDef::object(), TypeDef::string(), TypeDef::string()],
                        TypeDef::Void,
                        vec![
                            ExpressionDef::string(point.property.clone()),
                            value.cast(TypeDef::object()),
                            ExpressionDef::string_or_null(point.required_value.as_deref()),
                            ExpressionDef::string_or_null(point.not_equals_value.as_deref()),
                        ],
                    )
                    .statement()
                })
                .collect();
            statements.push(lookup.cast(bean_type.clone()).new_local(&bean_local, bean_type, |_| StatementDef::multi(checks)));
        }
        statements.push(StatementDef::return_void());
        Some(
            MethodDef::builder("checkIfShouldLoad")
                .add_modifiers(modifiers::PROTECTED)
                .add_parameter("$resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
                .add_parameter("$context", type_of(runtime::BEAN_CONTEXT))
                .build(StatementDef::multi(statements)),
        )
    }
}

fn lifecycle_method(name: &str) -> MethodDefBuilder {
    MethodDef::builder(name)
        .add_modifiers(modifiers::PUBLIC)
        .add_parameter("$resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
        .add_parameter("$context", type_of(runtime::BEAN_CONTEXT))
        .add_parameter("bean", TypeDef::object())
        .returns(TypeDef::object())
}

/// `((DefaultBeanContext) ctx).getBean(res, Factory.class, null)`
fn factory_lookup(factory: &ClassElement) -> ExpressionDef {
    let ty = erased_type(factory);
    bean_context()
        .cast(type_of(runtime::DEFAULT_BEAN_CONTEXT))
        .invoke(
            MethodRef::new(
                runtime::DEFAULT_BEAN_CONTEXT,
                "getBean",
                vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), TypeDef::class(), type_of(runtime::QUALIFIER_TYPE)],
                TypeDef::object(),
            ),
            vec![resolution_context(), ExpressionDef::class_literal(ty.clone()), ExpressionDef::null()],
        )
        .cast(ty)
}

fn mark_dependent_as_factory() -> StatementDef {
    resolution_context()
        .invoke(
            MethodRef::interface(runtime::BEAN_RESOLUTION_CONTEXT, "markDependentAsFactory", vec![], TypeDef::Void),
            vec![],
        )
        .statement()
}

/// Call of a factory method, static or on `factory_bean`
fn invoke_factory_method(
    method: &MethodElement,
    factory_bean: Option<ExpressionDef>,
    values: Vec<ExpressionDef>,
) -> ExpressionDef {
    let types = parameter_types(method);
    match factory_bean {
        None => {
            let args = values.into_iter().zip(types).map(|(v, t)| v.cast(t)).collect();
            ExpressionDef::invoke_static(method_ref(method), args)
        }
        Some(factory) if method.reflection_required => ExpressionDef::invoke_static(
            MethodRef::new(
                runtime::REFLECTION_UTILS,
                "invokeInaccessibleMethod",
                vec![TypeDef::object(), type_of(runtime::METHOD), TypeDef::object().array()],
                TypeDef::object(),
            ),
            vec![
                factory,
                required_method(method),
                ExpressionDef::new_array(TypeDef::object(), values.into_iter().map(|v| v.cast(TypeDef::object())).collect()),
            ],
        ),
        Some(factory) if method.has_parameters_with_defaults() => invoke_kotlin_default_method(method, factory, values, None),
        Some(factory) => {
            let args = values.into_iter().zip(types).map(|(v, t)| v.cast(t)).collect();
            factory.invoke(method_ref(method), args)
        }
    }
}

/// Value of a factory field, read reflectively when it is not accessible
fn read_factory_field(factory: &ClassElement, field: &FieldElement, factory_bean: Option<ExpressionDef>) -> ExpressionDef {
    if field.reflection_required {
        return ExpressionDef::invoke_static(
            MethodRef::new(
                runtime::REFLECTION_UTILS,
                "getField",
                vec![TypeDef::class(), TypeDef::string(), TypeDef::object()],
                TypeDef::object(),
            ),
            vec![
                ExpressionDef::class_literal(erased_type(factory)),
                ExpressionDef::string(field.name.clone()),
                factory_bean.unwrap_or_else(ExpressionDef::null),
            ],
        );
    }
    let field_ref = FieldRef::new(field.declaring_type.clone(), field.name.clone(), erased_type(&field.ty));
    match factory_bean {
        Some(factory_bean) if !field.is_static => factory_bean.field(field_ref),
        _ => ExpressionDef::static_field(field_ref),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_types::annotation::INTERCEPTOR_BINDING_DEFINITIONS;
    use beanforge_types::AnnotationEntry;

    const PROXY_TARGET: bool = true;
    const FACTORY: bool = true;
    const AOP_TYPE: bool = true;

    fn meta(proxy_target: Option<bool>, kinds: &[&str]) -> AnnotationMetadata {
        let mut meta = AnnotationMetadata::empty();
        if let Some(proxy_target) = proxy_target {
            meta = meta
                .declare(
                    AnnotationEntry::new(runtime::AROUND)
                        .with("proxyTarget", beanforge_types::AnnotationValue::Bool(proxy_target)),
                )
                .stereotype(runtime::AROUND, runtime::AROUND);
        }
        if !kinds.is_empty() {
            meta = meta.declare(bindings(kinds));
        }
        meta
    }

    fn bindings(kinds: &[&str]) -> AnnotationEntry {
        let values = kinds
            .iter()
            .map(|kind| {
                AnnotationEntry::new("io.beanforge.aop.InterceptorBinding")
                    .with("kind", beanforge_types::AnnotationValue::Enum((*kind).into()))
            })
            .collect();
        AnnotationEntry::new(INTERCEPTOR_BINDING_DEFINITIONS)
            .with("value", beanforge_types::AnnotationValue::Annotations(values))
    }

    fn intercepted(meta: &AnnotationMetadata, factory: bool, aop: bool) -> bool {
        is_intercepted_lifecycle_by_type(&ClassElement::of("a.Bean"), meta, factory, aop, InterceptorKind::AroundConstruct)
    }

    #[test]
    fn test_proxy_target_pair_intercepts_once() {
        let meta = meta(Some(PROXY_TARGET), &["AROUND", "AROUND_CONSTRUCT"]);
        let definition = intercepted(&meta, false, false);
        let aop = intercepted(&meta, false, AOP_TYPE);
        assert!(definition != aop);
        assert!(definition);
    }

    #[test]
    fn test_around_pair_intercepts_aop_type_only() {
        let meta = meta(Some(false), &["AROUND", "AROUND_CONSTRUCT"]);
        assert!(!intercepted(&meta, false, false));
        assert!(intercepted(&meta, false, AOP_TYPE));
    }

    #[test]
    fn test_factory_beans_count_as_proxy_targets() {
        for proxy_target in [Some(false), Some(true)] {
            let meta = meta(proxy_target, &["AROUND", "AROUND_CONSTRUCT"]);
            assert!(intercepted(&meta, FACTORY, false));
            assert!(!intercepted(&meta, FACTORY, AOP_TYPE));
        }
    }

    #[test]
    fn test_truth_table_without_binding() {
        for proxy_target in [None, Some(false), Some(true)] {
            for kinds in [&[][..], &["AROUND"][..]] {
                let meta = meta(proxy_target, kinds);
                for factory in [false, FACTORY] {
                    for aop in [false, AOP_TYPE] {
                        assert!(!intercepted(&meta, factory, aop));
                    }
                }
            }
        }
    }

    #[test]
    fn test_plain_bean_with_binding() {
        let meta = meta(None, &["AROUND_CONSTRUCT"]);
        for factory in [false, FACTORY] {
            for aop in [false, AOP_TYPE] {
                assert!(intercepted(&meta, factory, aop));
            }
        }
    }

    #[test]
    fn test_around_binding_decides_outside_candidates() {
        // Not a candidate: neither proxy target nor AOP type.
        let advised = meta(None, &["AROUND_CONSTRUCT", "AROUND"]);
        assert!(!intercepted(&advised, false, false));
        assert!(intercepted(&advised, false, AOP_TYPE));

        // The @Around stereotype alone does not suppress construction interception.
        let stereotype_only = meta(Some(false), &["AROUND_CONSTRUCT"]);
        assert!(intercepted(&stereotype_only, false, false));
        assert!(intercepted(&stereotype_only, false, AOP_TYPE));
    }

    #[test]
    fn test_truth_table_with_around_construct() {
        // (proxyTarget, factory, aop type, around binding) -> intercepted
        let table = [
            (false, false, false, false, true),
            (false, false, false, true, false),
            (false, false, true, false, true),
            (false, false, true, true, true),
            (false, true, false, false, true),
            (false, true, false, true, true),
            (false, true, true, false, true),
            (false, true, true, true, false),
            (true, false, false, false, true),
            (true, false, false, true, true),
            (true, false, true, false, true),
            (true, false, true, true, false),
            (true, true, false, false, true),
            (true, true, false, true, true),
            (true, true, true, false, true),
            (true, true, true, true, false),
        ];
        for (proxy_target, factory, aop, around, expected) in table {
            let kinds: &[&str] = if around { &["AROUND_CONSTRUCT", "AROUND"] } else { &["AROUND_CONSTRUCT"] };
            let meta = meta(Some(proxy_target), kinds);
            assert_eq!(
                intercepted(&meta, factory, aop),
                expected,
                "proxyTarget={} factory={} aop={} around={}",
                proxy_target,
                factory,
                aop,
                around
            );
        }
    }

    #[test]
    fn test_interceptors_are_never_intercepted() {
        let meta = meta(Some(true), &["AROUND_CONSTRUCT"]);
        let interceptor = ClassElement::of("a.Logging").with_supertypes([runtime::INTERCEPTOR]);
        assert!(!is_intercepted_lifecycle_by_type(&interceptor, &meta, false, false, InterceptorKind::AroundConstruct));
    }
}
