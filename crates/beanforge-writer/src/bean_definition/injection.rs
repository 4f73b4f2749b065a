//! Injection point resolution and the `inject` method

use super::commands::{ConfigBuilder, ConfigBuilderPoint, ConfigBuilderSource, InjectCommand};
use super::qualifier::qualifier_expression;
use super::{is_value_type, BeanDefinitionWriter};
use crate::argument::{argument_constant, ArgumentBuilder};
use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class, erased_type, method_ref, parameter_types, type_of};
use crate::method_gen::invoke_kotlin_default_method;
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{modifiers, ExpressionDef, FieldRef, MethodDef, MethodRef, StatementDef, TypeDef};
use beanforge_types::annotation::EXPRESSION_PREFIX;
use beanforge_types::{AnnotationMetadata, ClassElement, MethodElement};

/// Where an injected value goes; selects the runtime lookup overloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum InjectionSite {
    Constructor(usize),
    Method { method: usize, argument: usize },
    Field(usize),
}

impl InjectionSite {
    fn suffix(self) -> &'static str {
        match self {
            InjectionSite::Constructor(_) => "ForConstructorArgument",
            InjectionSite::Method { .. } => "ForMethodArgument",
            InjectionSite::Field(_) => "ForField",
        }
    }

    fn index_params(self) -> (Vec<TypeDef>, Vec<ExpressionDef>) {
        match self {
            InjectionSite::Constructor(i) | InjectionSite::Field(i) => {
                (vec![TypeDef::int()], vec![ExpressionDef::int(i as i32)])
            }
            InjectionSite::Method { method, argument } => (
                vec![TypeDef::int(), TypeDef::int()],
                vec![ExpressionDef::int(method as i32), ExpressionDef::int(argument as i32)],
            ),
        }
    }

    /// Runtime `Argument` of the site, read from the reference fields
    pub(super) fn argument(self, owner: &str) -> ExpressionDef {
        let argument = type_of(runtime::ARGUMENT);
        match self {
            InjectionSite::Constructor(i) => ExpressionDef::static_field(FieldRef::new(
                owner,
                super::static_init::CONSTRUCTOR,
                type_of(runtime::METHOD_OR_FIELD_REFERENCE),
            ))
            .cast(type_of(runtime::METHOD_REFERENCE))
            .field(FieldRef::new(runtime::METHOD_REFERENCE, "arguments", argument.array()))
            .array_element(i),
            InjectionSite::Method { method, argument: a } => ExpressionDef::static_field(FieldRef::new(
                owner,
                super::static_init::INJECTION_METHODS,
                type_of(runtime::METHOD_REFERENCE).array(),
            ))
            .array_element(method)
            .field(FieldRef::new(runtime::METHOD_REFERENCE, "arguments", argument.array()))
            .array_element(a),
            InjectionSite::Field(i) => ExpressionDef::static_field(FieldRef::new(
                owner,
                super::static_init::INJECTION_FIELDS,
                type_of(runtime::FIELD_REFERENCE).array(),
            ))
            .array_element(i)
            .field(FieldRef::new(runtime::FIELD_REFERENCE, "argument", argument)),
        }
    }
}

/// Bean lookup flavour chosen from the injected type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Bean,
    BeansOfType,
    BeanRegistration,
    BeanRegistrations,
    MapOfType,
    StreamOfType,
    FindBean,
}

impl Lookup {
    fn of(ty: &ClassElement) -> Lookup {
        if ty.is_array() {
            return Lookup::BeansOfType;
        }
        let first = ty.first_type_argument().map(|t| t.name.as_str());
        match ty.name.as_str() {
            runtime::BEAN_REGISTRATION => Lookup::BeanRegistration,
            runtime::OPTIONAL => Lookup::FindBean,
            runtime::STREAM => Lookup::StreamOfType,
            name if runtime::MAP_TYPES.contains(&name) && first == Some(runtime::STRING) => Lookup::MapOfType,
            _ if ty.is_container_type() => {
                if first == Some(runtime::BEAN_REGISTRATION) {
                    Lookup::BeanRegistrations
                } else {
                    Lookup::BeansOfType
                }
            }
            _ => Lookup::Bean,
        }
    }

    fn method_name(self) -> &'static str {
        match self {
            Lookup::Bean => "getBean",
            Lookup::BeansOfType => "getBeansOfType",
            Lookup::BeanRegistration => "getBeanRegistration",
            Lookup::BeanRegistrations => "getBeanRegistrations",
            Lookup::MapOfType => "getMapOfType",
            Lookup::StreamOfType => "getStreamOfType",
            Lookup::FindBean => "findBean",
        }
    }

    fn return_type(self) -> TypeDef {
        match self {
            Lookup::Bean => TypeDef::object(),
            Lookup::BeansOfType | Lookup::BeanRegistrations => type_of(runtime::COLLECTION),
            Lookup::BeanRegistration => type_of(runtime::BEAN_REGISTRATION),
            Lookup::MapOfType => type_of(runtime::MAP),
            Lookup::StreamOfType => type_of(runtime::STREAM),
            Lookup::FindBean => type_of(runtime::OPTIONAL),
        }
    }

    /// Index of the `Argument` type parameter describing the looked-up beans
    fn generic_index(self) -> Option<usize> {
        match self {
            Lookup::Bean => None,
            Lookup::MapOfType => Some(1),
            _ => Some(0),
        }
    }
}

/// `this.<name>(...)` on the abstract bean definition
pub(super) fn definition_call(name: &str, params: Vec<TypeDef>, ret: TypeDef, args: Vec<ExpressionDef>) -> ExpressionDef {
    ExpressionDef::this().invoke(
        MethodRef::new(runtime::ABSTRACT_INITIALIZABLE_BEAN_DEFINITION, name, params, ret),
        args,
    )
}

/// First parameter of `instantiate`, `inject`, `initialize` and `dispose`
pub(super) fn resolution_context() -> ExpressionDef {
    ExpressionDef::param(0, type_of(runtime::BEAN_RESOLUTION_CONTEXT))
}

/// Second parameter of `instantiate`, `inject`, `initialize` and `dispose`
pub(super) fn bean_context() -> ExpressionDef {
    ExpressionDef::param(1, type_of(runtime::BEAN_CONTEXT))
}

fn context_params() -> Vec<TypeDef> {
    vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT)]
}

fn contains_property(name: &str, property: ExpressionDef) -> ExpressionDef {
    let mut params = context_params();
    params.push(TypeDef::string());
    definition_call(name, params, TypeDef::boolean(), vec![resolution_context(), bean_context(), property])
}

fn is_multi_value(ty: &ClassElement) -> bool {
    ty.is_container_type() || runtime::MAP_TYPES.contains(&ty.name.as_str())
}

/// Unique local variable names within one generated method
#[derive(Debug, Default)]
pub(super) struct Locals {
    counter: usize,
}

impl Locals {
    pub(super) fn next(&mut self, prefix: &str) -> String {
        let name = format!("{}{}", prefix, self.counter);
        self.counter += 1;
        name
    }
}

impl BeanDefinitionWriter {
    // ===== Values =====

    /// Expression resolving the value injected at `site`
    ///
    /// `args` is the argument map of `doInstantiate` when the bean is
    /// parametrized.
    pub(super) fn resolve_value(
        &self,
        site: InjectionSite,
        name: &str,
        ty: &ClassElement,
        meta: &AnnotationMetadata,
        args: Option<&ExpressionDef>,
    ) -> WriterResult<ExpressionDef> {
        if let Some(args) = args {
            if meta.has_declared_annotation(runtime::PARAMETER) {
                return Ok(args.clone().invoke(
                    MethodRef::interface(runtime::MAP, "get", vec![TypeDef::object()], TypeDef::object()),
                    vec![ExpressionDef::string(name)],
                ));
            }
        }
        if let Some(bypass) = bypass_value(ty) {
            return Ok(bypass);
        }
        if is_value_type(meta) && !self.is_inner_configuration(ty) {
            return self.property_value(site, name, meta);
        }
        Ok(self.bean_lookup(site, name, ty, meta))
    }

    fn is_inner_configuration(&self, ty: &ClassElement) -> bool {
        self.bean_type.inner_classes.iter().any(|c| *c == ty.name)
    }

    fn site_call(&self, site: InjectionSite, base: &str, extra_params: Vec<TypeDef>, extra: Vec<ExpressionDef>, ret: TypeDef) -> ExpressionDef {
        let mut params = context_params();
        let mut args = vec![resolution_context(), bean_context()];
        match site {
            InjectionSite::Field(_) => {
                params.push(type_of(runtime::ARGUMENT));
                args.push(site.argument(&self.class_name));
            }
            _ => {
                let (index_params, index_args) = site.index_params();
                params.extend(index_params);
                args.extend(index_args);
            }
        }
        params.extend(extra_params);
        args.extend(extra);
        definition_call(&format!("{}{}", base, site.suffix()), params, ret, args)
    }

    fn property_value(&self, site: InjectionSite, name: &str, meta: &AnnotationMetadata) -> WriterResult<ExpressionDef> {
        if let Some(property) = meta.string_value(runtime::PROPERTY, "name").filter(|p| !p.is_empty()) {
            let cli = self.cli_property(&property);
            return Ok(self.site_call(
                site,
                "getPropertyValue",
                vec![TypeDef::string(), TypeDef::string()],
                vec![ExpressionDef::string(property), ExpressionDef::string_or_null(cli.as_deref())],
                TypeDef::object(),
            ));
        }
        match meta.string_value(runtime::VALUE, "value") {
            Some(value) if value.contains(EXPRESSION_PREFIX) => {
                let (params, args) = site.index_params();
                Ok(definition_call(
                    &format!("getEvaluatedExpressionValue{}", site.suffix()),
                    params,
                    TypeDef::object(),
                    args,
                ))
            }
            Some(value) => Ok(self.site_call(
                site,
                "getPropertyPlaceholderValue",
                vec![TypeDef::string()],
                vec![ExpressionDef::string(value)],
                TypeDef::object(),
            )),
            None => Err(WriterError::illegal_argument(format!(
                "Value injection point [{}] of {} declares neither a property name nor a value",
                name, self.class_name
            ))),
        }
    }

    fn bean_lookup(&self, site: InjectionSite, name: &str, ty: &ClassElement, meta: &AnnotationMetadata) -> ExpressionDef {
        let lookup = Lookup::of(ty);
        let argument = site.argument(&self.class_name);
        let qualifier = qualifier_expression(meta, name, &argument);
        let qualifier_type = type_of(runtime::QUALIFIER_TYPE);
        let value = match lookup.generic_index() {
            None => self.site_call(site, lookup.method_name(), vec![qualifier_type], vec![qualifier], lookup.return_type()),
            Some(i) => {
                let generic = argument
                    .invoke(
                        MethodRef::interface(runtime::ARGUMENT, "getTypeParameters", vec![], type_of(runtime::ARGUMENT).array()),
                        vec![],
                    )
                    .array_element(i);
                self.site_call(
                    site,
                    lookup.method_name(),
                    vec![type_of(runtime::ARGUMENT), qualifier_type],
                    vec![generic, qualifier],
                    lookup.return_type(),
                )
            }
        };
        if ty.is_array() {
            let component = erased_type(&ty.from_array());
            return value
                .cast(type_of(runtime::COLLECTION))
                .invoke(
                    MethodRef::interface(runtime::COLLECTION, "toArray", vec![TypeDef::object().array()], TypeDef::object().array()),
                    vec![ExpressionDef::new_array(component, vec![])],
                )
                .cast(erased_type(ty));
        }
        if lookup == Lookup::BeansOfType && (ty.name == runtime::LIST || ty.name == runtime::SET) {
            return definition_call(
                "coerceCollectionToCorrectType",
                vec![TypeDef::class(), type_of(runtime::COLLECTION)],
                TypeDef::object(),
                vec![ExpressionDef::class_literal(erased_type(ty)), value],
            );
        }
        value
    }

    /// `cliPrefix + property` for configuration properties beans
    fn cli_property(&self, property: &str) -> Option<String> {
        if !self.is_configuration_properties {
            return None;
        }
        self.annotation_metadata
            .string_values(runtime::CONFIGURATION_PROPERTIES, "cliPrefix")
            .into_iter()
            .next()
            .map(|prefix| format!("{}{}", prefix, property))
    }

    /// Whether a value exists for an optional configuration value
    fn contains_value_check(&self, ty: &ClassElement, meta: &AnnotationMetadata) -> Option<ExpressionDef> {
        let property = meta
            .string_value(runtime::PROPERTY, "name")
            .filter(|p| !p.is_empty())?;
        let method = if is_multi_value(ty) {
            "containsPropertiesValue"
        } else {
            "containsPropertyValue"
        };
        let check = contains_property(method, ExpressionDef::string(property.clone()));
        Some(match self.cli_property(&property) {
            Some(cli) => check.or(contains_property(method, ExpressionDef::string(cli))),
            None => check,
        })
    }

    // ===== inject =====

    /// `inject(res, ctx, bean)` replaying the recorded commands, `None` when there is nothing to inject
    pub(super) fn inject_method(&self, session: &mut BuildSession) -> WriterResult<Option<MethodDef>> {
        if self.inject_commands.is_empty() && self.super_definition.is_none() {
            return Ok(None);
        }
        let object = TypeDef::object();
        let builder = MethodDef::builder("inject")
            .add_modifiers(modifiers::PUBLIC)
            .add_parameter("$resolutionContext", type_of(runtime::BEAN_RESOLUTION_CONTEXT))
            .add_parameter("$context", type_of(runtime::BEAN_CONTEXT))
            .add_parameter("bean", object.clone())
            .returns(object.clone());
        let bean = builder.params()[2].clone();
        let bean_type = erased_type(&self.bean_type);

        let mut statements = Vec::new();
        if self.super_definition.is_some() {
            statements.push(
                ExpressionDef::invoke_super(
                    MethodRef::new(
                        runtime::ABSTRACT_INITIALIZABLE_BEAN_DEFINITION,
                        "inject",
                        vec![type_of(runtime::BEAN_RESOLUTION_CONTEXT), type_of(runtime::BEAN_CONTEXT), object.clone()],
                        object.clone(),
                    ),
                    vec![resolution_context(), bean_context(), bean.clone()],
                )
                .statement(),
            );
        }

        let instance = ExpressionDef::local("beanInstance", bean_type.clone());
        let mut locals = Locals::default();
        let mut body = Vec::new();
        let mut guarded = Vec::new();
        for command in &self.inject_commands {
            let (statement, needs_guard) = self.inject_statement(session, command, &instance, &bean, &mut locals)?;
            if needs_guard && self.is_configuration_properties {
                guarded.push(statement);
            } else {
                flush_guarded(&mut body, &mut guarded);
                body.push(statement);
            }
        }
        flush_guarded(&mut body, &mut guarded);

        let scoped = self
            .inject_commands
            .iter()
            .any(|c| c.has_inject_scope(&self.field_injection_points, &self.all_method_visits));
        if scoped {
            body.push(destroy_inject_scoped_beans());
        }
        body.push(bean.clone().returning());
        statements.push(bean.cast(bean_type.clone()).new_local("beanInstance", bean_type, |_| StatementDef::multi(body)));
        Ok(Some(builder.build(StatementDef::multi(statements))))
    }

    fn inject_statement(
        &self,
        session: &mut BuildSession,
        command: &InjectCommand,
        instance: &ExpressionDef,
        bean: &ExpressionDef,
        locals: &mut Locals,
    ) -> WriterResult<(StatementDef, bool)> {
        Ok(match command {
            InjectCommand::InjectField { field_index } => (self.field_statement(*field_index, instance, bean, false)?, false),
            InjectCommand::FieldValue { field_index, optional } => {
                (self.field_statement(*field_index, instance, bean, *optional)?, true)
            }
            InjectCommand::InjectMethod { method_index } => {
                (self.method_statement(*method_index, instance, bean)?, false)
            }
            InjectCommand::SetterValue {
                setter,
                optional,
                method_index,
            } => (self.setter_statement(session, setter, *optional, *method_index, instance)?, true),
            InjectCommand::ConfigBuilder(builder) => (self.config_builder_statement(session, builder, instance, locals)?, true),
        })
    }

    fn field_statement(
        &self,
        field_index: usize,
        instance: &ExpressionDef,
        bean: &ExpressionDef,
        optional: bool,
    ) -> WriterResult<StatementDef> {
        let visit = &self.field_injection_points[field_index];
        let field = &visit.field;
        let site = InjectionSite::Field(field_index);
        let value = self.resolve_value(site, &field.name, field.generic_type(), &field.annotation_metadata, None)?;
        let statement = if visit.requires_reflection {
            let mut params = context_params();
            params.extend([TypeDef::int(), TypeDef::object(), TypeDef::object()]);
            definition_call(
                "setFieldWithReflection",
                params,
                TypeDef::Void,
                vec![resolution_context(), bean_context(), ExpressionDef::int(field_index as i32), bean.clone(), value],
            )
            .statement()
        } else {
            let ty = erased_type(&field.ty);
            instance
                .clone()
                .put_field(FieldRef::new(field.declaring_type.clone(), field.name.clone(), ty.clone()), value.cast(ty))
        };
        Ok(match self.contains_value_check(&field.ty, &field.annotation_metadata).filter(|_| optional) {
            Some(check) => check.if_true(statement),
            None => statement,
        })
    }

    fn method_statement(&self, method_index: usize, instance: &ExpressionDef, bean: &ExpressionDef) -> WriterResult<StatementDef> {
        let visit = &self.all_method_visits[method_index];
        let method = &visit.method;
        let values: Vec<ExpressionDef> = method
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let site = InjectionSite::Method {
                    method: method_index,
                    argument: i,
                };
                self.resolve_value(site, &p.name, p.generic_type(), &p.annotation_metadata, None)
            })
            .collect::<WriterResult<_>>()?;
        Ok(invoke_injected(method, method_index, visit.requires_reflection, instance, bean, values).statement())
    }

    fn setter_statement(
        &self,
        session: &mut BuildSession,
        setter: &MethodElement,
        optional: bool,
        method_index: Option<usize>,
        instance: &ExpressionDef,
    ) -> WriterResult<StatementDef> {
        let Some(parameter) = setter.parameters.first() else {
            return Ok(StatementDef::empty());
        };
        let value = match method_index {
            Some(m) => self.resolve_value(
                InjectionSite::Method { method: m, argument: 0 },
                &parameter.name,
                parameter.generic_type(),
                &setter.annotation_metadata,
                None,
            )?,
            None => {
                let property = setter
                    .annotation_metadata
                    .string_value(runtime::PROPERTY, "name")
                    .unwrap_or_default();
                let cli = self.cli_property(&property);
                let argument =
                    ArgumentBuilder::new(session, &self.class_name).argument(&parameter.name, parameter.generic_type(), &parameter.annotation_metadata)?;
                let mut params = context_params();
                params.extend([TypeDef::string(), type_of(runtime::ARGUMENT), TypeDef::string(), TypeDef::string()]);
                definition_call(
                    "getPropertyValueForSetter",
                    params,
                    TypeDef::object(),
                    vec![
                        resolution_context(),
                        bean_context(),
                        ExpressionDef::string(setter.name.clone()),
                        argument,
                        ExpressionDef::string(property),
                        ExpressionDef::string_or_null(cli.as_deref()),
                    ],
                )
            }
        };
        let ty = erased_type(&parameter.ty);
        let statement = instance.clone().invoke(method_ref(setter), vec![value.cast(ty)]).statement();
        Ok(
            match self
                .contains_value_check(&parameter.ty, &setter.annotation_metadata)
                .filter(|_| optional)
            {
                Some(check) => check.if_true(statement),
                None => statement,
            },
        )
    }

    // ===== Configuration builders =====

    fn config_builder_statement(
        &self,
        session: &mut BuildSession,
        builder: &ConfigBuilder,
        instance: &ExpressionDef,
        locals: &mut Locals,
    ) -> WriterResult<StatementDef> {
        let builder_type = erased_type(&builder.builder_type);
        let source = match &builder.source {
            ConfigBuilderSource::Field(field) => {
                instance
                    .clone()
                    .field(FieldRef::new(field.declaring_type.clone(), field.name.clone(), erased_type(&field.ty)))
            }
            ConfigBuilderSource::Getter(getter) => instance.clone().invoke(method_ref(getter), vec![]),
        };
        let builder_local = locals.next("builder");
        let target = ExpressionDef::local(builder_local.clone(), builder_type.clone());

        let mut points = Vec::with_capacity(builder.points.len());
        for point in &builder.points {
            points.push(self.config_point_statement(session, &builder.builder_type, &target, point, locals)?);
        }
        Ok(source
            .cast(builder_type.clone())
            .new_local(&builder_local, builder_type, |_| StatementDef::multi(points)))
    }

    fn config_point_statement(
        &self,
        session: &mut BuildSession,
        builder_type: &ClassElement,
        target: &ExpressionDef,
        point: &ConfigBuilderPoint,
        locals: &mut Locals,
    ) -> WriterResult<StatementDef> {
        let optional = type_of(runtime::OPTIONAL);
        let (path, value_type, argument) = match point {
            ConfigBuilderPoint::Method { path, parameter: Some(p), .. } => {
                let argument = ArgumentBuilder::new(session, &self.class_name).argument(path, p, &p.annotation_metadata)?;
                (path, erased_type(p), argument)
            }
            ConfigBuilderPoint::Method { path, parameter: None, .. } => {
                (path, TypeDef::boolean(), argument_constant("BOOLEAN"))
            }
            ConfigBuilderPoint::Duration { path, .. } => {
                let duration = ClassElement::of(runtime::DURATION);
                let argument = ArgumentBuilder::new(session, &self.class_name).argument(path, &duration, &AnnotationMetadata::empty())?;
                (path, type_of(runtime::DURATION), argument)
            }
        };
        let mut params = context_params();
        params.extend([type_of(runtime::ARGUMENT), TypeDef::string()]);
        let lookup = definition_call(
            "getValueForPath",
            params,
            optional.clone(),
            vec![resolution_context(), bean_context(), argument, ExpressionDef::string(path.clone())],
        );
        let value_local = locals.next("value");
        let value = ExpressionDef::local(value_local.clone(), optional.clone());
        let is_present = value
            .clone()
            .invoke(MethodRef::new(runtime::OPTIONAL, "isPresent", vec![], TypeDef::boolean()), vec![]);
        let get = value.invoke(MethodRef::new(runtime::OPTIONAL, "get", vec![], TypeDef::object()), vec![]);
        let owner = builder_type.name.clone();

        let call = match point {
            ConfigBuilderPoint::Method {
                method_name,
                parameter: Some(_),
                return_type,
                ..
            } => target
                .clone()
                .invoke(
                    MethodRef::new(owner, method_name.clone(), vec![value_type.clone()], erased_type(return_type)),
                    vec![get.cast(value_type)],
                )
                .statement(),
            ConfigBuilderPoint::Method {
                method_name,
                parameter: None,
                return_type,
                ..
            } => get.cast(TypeDef::boolean()).if_true(
                target
                    .clone()
                    .invoke(MethodRef::new(owner, method_name.clone(), vec![], erased_type(return_type)), vec![])
                    .statement(),
            ),
            ConfigBuilderPoint::Duration {
                method_name,
                return_type,
                ..
            } => {
                let millis = get
                    .cast(type_of(runtime::DURATION))
                    .invoke(MethodRef::new(runtime::DURATION, "toMillis", vec![], TypeDef::of("long")), vec![]);
                let unit = ExpressionDef::static_field(FieldRef::new(runtime::TIME_UNIT, "MILLISECONDS", type_of(runtime::TIME_UNIT)));
                target
                    .clone()
                    .invoke(
                        MethodRef::new(
                            owner,
                            method_name.clone(),
                            vec![TypeDef::of("long"), type_of(runtime::TIME_UNIT)],
                            erased_type(return_type),
                        ),
                        vec![millis, unit],
                    )
                    .statement()
            }
        };
        let guarded = StatementDef::try_catch(call, class(runtime::NO_SUCH_METHOD_ERROR), "e", StatementDef::empty());
        Ok(lookup.new_local(&value_local, optional, |_| is_present.if_true(guarded)))
    }
}

/// Call of an injection or lifecycle method on the bean instance
pub(super) fn invoke_injected(
    method: &MethodElement,
    method_index: usize,
    requires_reflection: bool,
    instance: &ExpressionDef,
    bean: &ExpressionDef,
    values: Vec<ExpressionDef>,
) -> ExpressionDef {
    if requires_reflection {
        let mut params = context_params();
        params.extend([TypeDef::int(), TypeDef::object(), TypeDef::object().array()]);
        let args = values.into_iter().map(|v| v.cast(TypeDef::object())).collect();
        return definition_call(
            "invokeMethodWithReflection",
            params,
            TypeDef::Void,
            vec![
                resolution_context(),
                bean_context(),
                ExpressionDef::int(method_index as i32),
                bean.clone(),
                ExpressionDef::new_array(TypeDef::object(), args),
            ],
        );
    }
    if method.has_parameters_with_defaults() {
        return invoke_kotlin_default_method(method, instance.clone(), values, None);
    }
    let args = values
        .into_iter()
        .zip(parameter_types(method))
        .map(|(v, t)| v.cast(t))
        .collect();
    instance.clone().invoke(method_ref(method), args)
}

/// `res.destroyInjectScopedBeans()`
pub(super) fn destroy_inject_scoped_beans() -> StatementDef {
    resolution_context()
        .invoke(
            MethodRef::interface(runtime::BEAN_RESOLUTION_CONTEXT, "destroyInjectScopedBeans", vec![], TypeDef::Void),
            vec![],
        )
        .statement()
}

/// Framework types passed through without a container lookup
fn bypass_value(ty: &ClassElement) -> Option<ExpressionDef> {
    if ty.is_array() {
        return None;
    }
    match ty.name.as_str() {
        runtime::BEAN_RESOLUTION_CONTEXT => Some(resolution_context()),
        runtime::BEAN_CONTEXT => Some(bean_context()),
        runtime::CONVERSION_SERVICE => Some(bean_context().invoke(
            MethodRef::interface(runtime::BEAN_CONTEXT, "getConversionService", vec![], type_of(runtime::CONVERSION_SERVICE)),
            vec![],
        )),
        runtime::CONFIGURATION_PATH => Some(resolution_context().invoke(
            MethodRef::interface(runtime::BEAN_RESOLUTION_CONTEXT, "getConfigurationPath", vec![], type_of(runtime::CONFIGURATION_PATH)),
            vec![],
        )),
        _ => None,
    }
}

fn flush_guarded(body: &mut Vec<StatementDef>, guarded: &mut Vec<StatementDef>) {
    if guarded.is_empty() {
        return;
    }
    let check = definition_call(
        "containsProperties",
        context_params(),
        TypeDef::boolean(),
        vec![resolution_context(), bean_context()],
    );
    body.push(check.if_true(StatementDef::multi(std::mem::take(guarded))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean_definition::BeanProducer;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::{AnnotationEntry, AnnotationValue, CollectingVisitorContext};

    fn writer() -> BeanDefinitionWriter {
        let mut ctx = CollectingVisitorContext::new();
        BeanDefinitionWriter::new(BeanProducer::Class(ClassElement::of("a.Bean")), vec![], None, &mut ctx).unwrap()
    }

    fn property(name: &str) -> AnnotationMetadata {
        AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::PROPERTY).with("name", AnnotationValue::String(name.into())))
            .stereotype(runtime::PROPERTY, runtime::PROPERTY)
    }

    #[test]
    fn test_lookup_classification() {
        let list = ClassElement::of(runtime::LIST).with_type_argument("E", ClassElement::of("a.Dep"));
        assert_eq!(Lookup::of(&list), Lookup::BeansOfType);
        let map = ClassElement::of(runtime::MAP)
            .with_type_argument("K", ClassElement::of(runtime::STRING))
            .with_type_argument("V", ClassElement::of("a.Dep"));
        assert_eq!(Lookup::of(&map), Lookup::MapOfType);
        assert_eq!(Lookup::of(&ClassElement::of(runtime::OPTIONAL)), Lookup::FindBean);
        assert_eq!(Lookup::of(&ClassElement::of(runtime::STREAM)), Lookup::StreamOfType);
        assert_eq!(Lookup::of(&ClassElement::of("a.Dep").to_array()), Lookup::BeansOfType);
        let registrations =
            ClassElement::of(runtime::COLLECTION).with_type_argument("E", ClassElement::of(runtime::BEAN_REGISTRATION));
        assert_eq!(Lookup::of(&registrations), Lookup::BeanRegistrations);
        assert_eq!(Lookup::of(&ClassElement::of("a.Dep")), Lookup::Bean);
    }

    #[test]
    fn test_bypass_and_bean_values() {
        let writer = writer();
        let site = InjectionSite::Constructor(0);
        let meta = AnnotationMetadata::empty();

        let ctx = writer.resolve_value(site, "ctx", &ClassElement::of(runtime::BEAN_CONTEXT), &meta, None).unwrap();
        assert_eq!(ctx, bean_context());

        let dep = writer.resolve_value(site, "dep", &ClassElement::of("a.Dep"), &meta, None).unwrap();
        assert!(dep.invokes("getBeanForConstructorArgument"));

        let field = writer.resolve_value(InjectionSite::Field(1), "deps", &ClassElement::of("a.Dep").to_array(), &meta, None).unwrap();
        assert!(field.invokes("getBeansOfTypeForField"));
        assert!(field.invokes("toArray"));
    }

    #[test]
    fn test_property_values() {
        let writer = writer();
        let site = InjectionSite::Method { method: 2, argument: 0 };
        let value = writer.resolve_value(site, "port", &ClassElement::of("int"), &property("server.port"), None).unwrap();
        assert!(value.invokes("getPropertyValueForMethodArgument"));
        assert!(value.pretty_print().contains("\"server.port\""));

        let placeholder = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::VALUE).with("value", AnnotationValue::String("${x:1}".into())))
            .stereotype(runtime::VALUE, runtime::VALUE);
        let value = writer.resolve_value(site, "x", &ClassElement::of(runtime::STRING), &placeholder, None).unwrap();
        assert!(value.invokes("getPropertyPlaceholderValueForMethodArgument"));

        let expression = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::VALUE).with("value", AnnotationValue::String("#{1 + 1}".into())))
            .stereotype(runtime::VALUE, runtime::VALUE);
        let value = writer.resolve_value(site, "x", &ClassElement::of("int"), &expression, None).unwrap();
        assert!(value.invokes("getEvaluatedExpressionValueForMethodArgument"));
    }

    #[test]
    fn test_value_without_source_is_rejected() {
        let writer = writer();
        let meta = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::PROPERTY))
            .stereotype(runtime::PROPERTY, runtime::PROPERTY);
        let err = writer
            .resolve_value(InjectionSite::Constructor(0), "port", &ClassElement::of("int"), &meta, None)
            .unwrap_err();
        assert!(matches!(err, WriterError::IllegalArgument { .. }));
        assert!(err.to_string().contains("[port]"));
    }

    #[test]
    fn test_parameter_from_argument_map() {
        let writer = writer();
        let meta = AnnotationMetadata::empty().declare(AnnotationEntry::new(runtime::PARAMETER));
        let args = ExpressionDef::param(2, type_of(runtime::MAP));
        let value = writer.resolve_value(InjectionSite::Constructor(0), "name", &ClassElement::of(runtime::STRING), &meta, Some(&args)).unwrap();
        assert_eq!(value.pretty_print(), "arg2.get(\"name\")");
    }

    #[test]
    fn test_locals_are_unique() {
        let mut locals = Locals::default();
        assert_eq!(locals.next("value"), "value0");
        assert_eq!(locals.next("value"), "value1");
        assert_eq!(locals.next("builder"), "builder2");
    }
}
