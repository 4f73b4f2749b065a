//! Bean definition writer
//!
//! A front end drives one [`BeanDefinitionWriter`] per bean: first the
//! constructor or factory, then any number of injection points, lifecycle
//! methods and executable methods, then [`BeanDefinitionWriter::visit_bean_definition_end`].
//! Visits only record data; the class is assembled at the end and may then be
//! serialized with [`BeanDefinitionWriter::to_byte_array`] or
//! [`BeanDefinitionWriter::accept`].

mod build;
mod commands;
mod conditions;
mod injection;
mod qualifier;
mod static_init;

pub use build::is_intercepted_lifecycle_by_type;
pub use commands::{ConfigBuilderPoint, ConfigBuilderSource};
pub use conditions::{conditions_from_requires, requires_bean_property, Condition, PropertyMode};

use crate::error::{WriterError, WriterResult};
use crate::executable_methods::ExecutableMethodsDefinitionWriter;
use crate::gen_utils::{capitalize, package_of, qualify, simple_name_of};
use crate::options::WriterOptions;
use crate::output::{write_class_def, ClassOutputVisitor};
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{ClassDef, ClassFileWriter};
use beanforge_types::{AnnotationMetadata, ClassElement, FieldElement, InterceptorKind, MethodElement, VisitorContext};
use commands::{
    AnnotationInjection, AnnotationVisitData, BuildMethodDefinition, ConfigBuilder, FieldVisitData, InjectCommand,
    InjectMethodPoint, LifecycleDefinition, MethodVisitData,
};

/// Suffix of bean definition classes
pub const CLASS_SUFFIX: &str = "$Definition";

/// Element a bean definition is written for
#[derive(Debug, Clone)]
pub enum BeanProducer {
    /// Bean created from its own class
    Class(ClassElement),
    /// Bean returned by a method of a factory bean
    FactoryMethod {
        /// Factory declaring the method
        factory: ClassElement,
        /// Producing method
        method: MethodElement,
    },
    /// Bean read from a field of a factory bean
    FactoryField {
        /// Factory declaring the field
        factory: ClassElement,
        /// Producing field
        field: FieldElement,
    },
}

/// Proxy definition replacing this bean at runtime
#[derive(Debug, Clone)]
struct ProxyReference {
    definition: String,
    target_type: String,
}

/// Writer of one `$Definition` class
#[derive(Debug)]
pub struct BeanDefinitionWriter {
    class_name: String,
    bean_type: ClassElement,
    producer: BeanProducer,
    annotation_metadata: AnnotationMetadata,
    originating: Vec<String>,
    is_configuration_properties: bool,
    keep_confprop_inject_points: bool,
    exposed_types: Vec<String>,
    super_definition: Option<String>,
    build_method: Option<BuildMethodDefinition>,
    post_construct: Option<LifecycleDefinition>,
    pre_destroy: Option<LifecycleDefinition>,
    inject_commands: Vec<InjectCommand>,
    field_injection_points: Vec<FieldVisitData>,
    all_method_visits: Vec<MethodVisitData>,
    annotation_injections: Vec<AnnotationInjection>,
    type_arguments: Vec<(String, Vec<(String, ClassElement)>)>,
    intercepted_type: Option<String>,
    proxied_bean: bool,
    proxy_target: bool,
    proxy_reference: Option<ProxyReference>,
    requires_method_processing: bool,
    has_evaluated_expressions: bool,
    executable_methods: Option<ExecutableMethodsDefinitionWriter>,
    config_builder: Option<ConfigBuilder>,
    disabled: bool,
    class_def: Option<ClassDef>,
}

impl BeanDefinitionWriter {
    /// Writer for the bean produced by `producer`
    ///
    /// Factory producers need a `unique_id` distinguishing them from other
    /// members with the same name. Invalid `@Bean(typed = ...)` entries are
    /// reported through `context`.
    pub fn new(
        producer: BeanProducer,
        originating: Vec<String>,
        unique_id: Option<&str>,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Self> {
        let (class_name, bean_type, annotation_metadata) = match &producer {
            BeanProducer::Class(element) => {
                if element.is_primitive() {
                    return Err(WriterError::illegal_argument(
                        "Primitive beans can only be created from factories",
                    ));
                }
                let simple = element.simple_name();
                let simple = if simple.starts_with('$') {
                    simple.to_string()
                } else {
                    format!("${}", simple)
                };
                (
                    qualify(element.package_name(), &format!("{}{}", simple, CLASS_SUFFIX)),
                    element.clone(),
                    element.annotation_metadata.clone(),
                )
            }
            BeanProducer::FactoryMethod { factory, method } => (
                factory_definition_name(factory, &method.name, unique_id)?,
                method.generic_return_type().clone(),
                method.annotation_metadata.clone(),
            ),
            BeanProducer::FactoryField { factory, field } => (
                factory_definition_name(factory, &field.name, unique_id)?,
                field.generic_type().clone(),
                field.annotation_metadata.clone(),
            ),
        };

        let is_configuration_properties = annotation_metadata.has_declared_stereotype(runtime::EACH_PROPERTY)
            || annotation_metadata.has_declared_stereotype(runtime::EACH_BEAN)
            || annotation_metadata.has_stereotype(runtime::CONFIGURATION_READER);
        let keep_confprop_inject_points = WriterOptions::from_map(context.options())?.keep_confprop_inject_points();
        let exposed_types = validate_exposed_types(&bean_type, &annotation_metadata, context);
        log::debug!("Writing bean definition {} for {}", class_name, bean_type.name);

        Ok(Self {
            class_name,
            bean_type,
            producer,
            annotation_metadata,
            originating,
            is_configuration_properties,
            keep_confprop_inject_points,
            exposed_types,
            super_definition: None,
            build_method: None,
            post_construct: None,
            pre_destroy: None,
            inject_commands: Vec::new(),
            field_injection_points: Vec::new(),
            all_method_visits: Vec::new(),
            annotation_injections: Vec::new(),
            type_arguments: Vec::new(),
            intercepted_type: None,
            proxied_bean: false,
            proxy_target: false,
            proxy_reference: None,
            requires_method_processing: false,
            has_evaluated_expressions: false,
            executable_methods: None,
            config_builder: None,
            disabled: false,
            class_def: None,
        })
    }

    // ===== Accessors =====

    /// Generated class name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Type of the produced bean
    pub fn bean_type(&self) -> &ClassElement {
        &self.bean_type
    }

    /// Annotation metadata of the producing element
    pub fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.annotation_metadata
    }

    /// Names of the source elements the definition originates from
    pub fn originating_elements(&self) -> &[String] {
        &self.originating
    }

    /// Whether the bean is read from configuration
    pub fn is_configuration_properties(&self) -> bool {
        self.is_configuration_properties
    }

    /// Whether `visit_bean_definition_end` ran
    pub fn is_finalized(&self) -> bool {
        self.class_def.is_some()
    }

    /// Whether `accept` writes nothing
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Number of recorded field injection points
    pub fn field_injection_count(&self) -> usize {
        self.field_injection_points.len()
    }

    /// Number of recorded method visits, lifecycle methods included
    pub fn method_injection_count(&self) -> usize {
        self.all_method_visits.len()
    }

    /// Constructor or factory method parameters, once visited
    pub fn constructor_parameters(&self) -> Option<&[beanforge_types::ParameterElement]> {
        self.build_method.as_ref().map(|b| b.parameters())
    }

    /// Executable-methods writer, created by the first executable method
    pub fn executable_methods(&self) -> Option<&ExecutableMethodsDefinitionWriter> {
        self.executable_methods.as_ref()
    }

    /// Whether executable methods are processed when the context starts
    pub fn requires_method_processing(&self) -> bool {
        self.requires_method_processing
    }

    /// Post-construct methods recorded so far, with their reflection flag
    pub fn post_construct_methods(&self) -> Vec<(MethodElement, bool)> {
        self.all_method_visits
            .iter()
            .filter(|v| v.post_construct)
            .map(|v| (v.method.clone(), v.requires_reflection))
            .collect()
    }

    /// Finalized class
    pub fn class_def(&self) -> Option<&ClassDef> {
        self.class_def.as_ref()
    }

    // ===== Settings =====

    /// Skip the definition on `accept`
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Mark the definition as the AOP type generated for `intercepted_type`
    pub fn set_intercepted_type(&mut self, intercepted_type: impl Into<String>) {
        self.intercepted_type = Some(intercepted_type.into());
    }

    /// Type the AOP definition was generated for
    pub fn intercepted_type(&self) -> Option<&str> {
        self.intercepted_type.as_deref()
    }

    /// Mark the bean as proxied and/or as a proxy target
    pub fn set_proxied_bean(&mut self, proxied: bool, proxy_target: bool) {
        self.proxied_bean = proxied;
        self.proxy_target = proxy_target;
    }

    /// Executable methods must be processed when the context starts
    pub fn set_requires_method_processing(&mut self, requires: bool) {
        self.requires_method_processing = requires;
    }

    /// Point the definition at the proxy definition replacing it
    pub fn generate_proxy_reference(&mut self, proxy_definition: impl Into<String>, proxy_type: impl Into<String>) {
        self.proxy_reference = Some(ProxyReference {
            definition: proxy_definition.into(),
            target_type: proxy_type.into(),
        });
    }

    /// Extend the definition `name` instead of the abstract base
    pub fn visit_super_bean_definition(&mut self, name: impl Into<String>) {
        self.super_definition = Some(name.into());
    }

    /// Type arguments of the bean's supertypes, by type name
    pub fn visit_type_arguments(&mut self, type_arguments: Vec<(String, Vec<(String, ClassElement)>)>) -> WriterResult<()> {
        self.ensure_open()?;
        self.type_arguments = type_arguments;
        Ok(())
    }

    fn ensure_open(&self) -> WriterResult<()> {
        if self.class_def.is_some() {
            return Err(WriterError::illegal_state(format!(
                "Bean definition {} is already finalized",
                self.class_name
            )));
        }
        Ok(())
    }

    fn set_build_method(&mut self, build: BuildMethodDefinition) -> WriterResult<()> {
        self.ensure_open()?;
        if self.build_method.is_some() {
            return Err(WriterError::illegal_state(format!(
                "Only a single call to visit_bean_definition_constructor(..) or visit_bean_factory_*(..) is permitted for {}",
                self.class_name
            )));
        }
        self.build_method = Some(build);
        Ok(())
    }

    // ===== Construction =====

    /// Bean created by `constructor`
    pub fn visit_bean_definition_constructor(&mut self, constructor: &MethodElement, requires_reflection: bool) -> WriterResult<()> {
        self.set_build_method(BuildMethodDefinition::Constructor {
            constructor: constructor.clone(),
            requires_reflection,
        })
    }

    /// Bean created by the public no-argument constructor, unless a constructor was visited
    pub fn visit_default_constructor(&mut self) -> WriterResult<()> {
        if self.build_method.is_none() {
            let constructor = MethodElement::constructor(self.bean_type.name.clone(), Vec::new());
            self.visit_bean_definition_constructor(&constructor, false)?;
        }
        Ok(())
    }

    /// Bean returned by `method` of `factory`
    pub fn visit_bean_factory_method(&mut self, factory: &ClassElement, method: &MethodElement) -> WriterResult<()> {
        self.set_build_method(BuildMethodDefinition::FactoryMethod {
            factory: factory.clone(),
            method: method.clone(),
        })
    }

    /// Bean read from `field` of `factory`
    pub fn visit_bean_factory_field(&mut self, factory: &ClassElement, field: &FieldElement) -> WriterResult<()> {
        self.set_build_method(BuildMethodDefinition::FactoryField {
            factory: factory.clone(),
            field: field.clone(),
        })
    }

    // ===== Injection points =====

    fn push_field(&mut self, field: &FieldElement, requires_reflection: bool) -> usize {
        self.field_injection_points.push(FieldVisitData {
            field: field.clone(),
            requires_reflection,
        });
        self.field_injection_points.len() - 1
    }

    fn push_method(&mut self, method: &MethodElement, requires_reflection: bool, post_construct: bool, pre_destroy: bool) -> usize {
        self.all_method_visits.push(MethodVisitData {
            method: method.clone(),
            requires_reflection,
            post_construct,
            pre_destroy,
        });
        self.all_method_visits.len() - 1
    }

    /// Field receiving a bean, returning its `$INJECTION_FIELDS` index
    pub fn visit_field_injection_point(&mut self, field: &FieldElement, requires_reflection: bool) -> WriterResult<usize> {
        self.ensure_open()?;
        let field_index = self.push_field(field, requires_reflection);
        self.inject_commands.push(InjectCommand::InjectField { field_index });
        Ok(field_index)
    }

    /// Field receiving a configuration value, returning its `$INJECTION_FIELDS` index
    ///
    /// A value without a property name or value expression is reported to
    /// `context` and not recorded.
    pub fn visit_field_value(
        &mut self,
        field: &FieldElement,
        requires_reflection: bool,
        optional: bool,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Option<usize>> {
        self.ensure_open()?;
        if !check_value_source(&field.name, &field.annotation_metadata, &field.declaring_type, context) {
            return Ok(None);
        }
        let field_index = self.push_field(field, requires_reflection);
        self.inject_commands.push(InjectCommand::FieldValue { field_index, optional });
        Ok(Some(field_index))
    }

    /// Method called with injected arguments, returning its `$INJECTION_METHODS` index
    pub fn visit_method_injection_point(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<usize> {
        self.ensure_open()?;
        let method_index = self.push_method(method, requires_reflection, false, false);
        self.inject_commands.push(InjectCommand::InjectMethod { method_index });
        Ok(method_index)
    }

    /// Setter receiving a configuration value
    ///
    /// Setters of configuration properties beans are fed by property path and
    /// only recorded in `$INJECTION_METHODS` when injection points are kept;
    /// the index is `None` otherwise, or when the value source was reported
    /// missing to `context`.
    pub fn visit_setter_value(
        &mut self,
        setter: &MethodElement,
        requires_reflection: bool,
        optional: bool,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<Option<usize>> {
        self.ensure_open()?;
        if setter.parameters.len() != 1 {
            return Err(WriterError::illegal_argument(format!(
                "Setter {}.{} must take exactly one parameter",
                setter.declaring_type, setter.name
            )));
        }
        if !check_value_source(&setter.name, &setter.annotation_metadata, &setter.declaring_type, context) {
            return Ok(None);
        }
        if !requires_reflection && self.is_configuration_properties && is_value_type(&setter.annotation_metadata) {
            let method_index = if self.keep_confprop_inject_points {
                Some(self.push_method(setter, false, false, false))
            } else {
                None
            };
            self.inject_commands.push(InjectCommand::SetterValue {
                setter: setter.clone(),
                optional,
                method_index,
            });
            return Ok(method_index);
        }
        let method_index = self.push_method(setter, requires_reflection, false, false);
        self.inject_commands.push(InjectCommand::InjectMethod { method_index });
        Ok(Some(method_index))
    }

    /// Post-construct method, returning its `$INJECTION_METHODS` index when recorded
    pub fn visit_post_construct_method(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<Option<usize>> {
        self.ensure_open()?;
        let intercepted = self.is_intercepted_lifecycle(InterceptorKind::PostConstruct);
        self.post_construct.get_or_insert_with(LifecycleDefinition::default);
        if self.super_definition.is_some() && !intercepted {
            return Ok(None);
        }
        let method_index = self.push_method(method, requires_reflection, true, false);
        if let Some(lifecycle) = self.post_construct.as_mut() {
            lifecycle.points.push(InjectMethodPoint {
                method: method.clone(),
                requires_reflection,
                method_index,
            });
        }
        Ok(Some(method_index))
    }

    /// Pre-destroy method, returning its `$INJECTION_METHODS` index when recorded
    pub fn visit_pre_destroy_method(&mut self, method: &MethodElement, requires_reflection: bool) -> WriterResult<Option<usize>> {
        self.ensure_open()?;
        let intercepted = self.is_intercepted_lifecycle(InterceptorKind::PreDestroy);
        self.pre_destroy.get_or_insert_with(LifecycleDefinition::default);
        if self.super_definition.is_some() && !intercepted {
            return Ok(None);
        }
        let method_index = self.push_method(method, requires_reflection, false, true);
        if let Some(lifecycle) = self.pre_destroy.as_mut() {
            lifecycle.points.push(InjectMethodPoint {
                method: method.clone(),
                requires_reflection,
                method_index,
            });
        }
        Ok(Some(method_index))
    }

    /// Executable method, returning its index in the `$Exec` class
    ///
    /// `intercepted` is the `(proxy class, bridge method)` pair of methods
    /// advised without a proxy target.
    pub fn visit_executable_method(&mut self, method: &MethodElement, intercepted: Option<(&str, &str)>) -> WriterResult<usize> {
        self.ensure_open()?;
        let class_name = self.class_name.clone();
        let originating = self.originating.clone();
        self.executable_methods
            .get_or_insert_with(|| ExecutableMethodsDefinitionWriter::new(&class_name, originating))
            .visit_executable_method(method, intercepted)
    }

    // ===== Configuration builders =====

    fn start_config_builder(&mut self, source: ConfigBuilderSource, builder_type: &ClassElement) -> WriterResult<()> {
        self.ensure_open()?;
        if self.config_builder.is_some() {
            return Err(WriterError::illegal_state(
                "visit_config_builder_end() must be called before another configuration builder is visited",
            ));
        }
        self.config_builder = Some(ConfigBuilder {
            source,
            builder_type: builder_type.clone(),
            points: Vec::new(),
        });
        Ok(())
    }

    /// Builder held in `field`
    pub fn visit_config_builder_field(&mut self, builder_type: &ClassElement, field: &FieldElement) -> WriterResult<()> {
        self.start_config_builder(ConfigBuilderSource::Field(field.clone()), builder_type)
    }

    /// Builder returned by `getter`
    pub fn visit_config_builder_method(&mut self, builder_type: &ClassElement, getter: &MethodElement) -> WriterResult<()> {
        self.start_config_builder(ConfigBuilderSource::Getter(getter.clone()), builder_type)
    }

    fn current_builder(&mut self) -> WriterResult<&mut ConfigBuilder> {
        self.config_builder
            .as_mut()
            .ok_or_else(|| WriterError::illegal_state("No configuration builder is being visited"))
    }

    /// Builder method fed from `path`; a `None` parameter calls the method without arguments when the flag is set
    pub fn visit_config_builder_method_point(
        &mut self,
        path: &str,
        method_name: &str,
        parameter: Option<&ClassElement>,
        return_type: &ClassElement,
    ) -> WriterResult<()> {
        self.current_builder()?.points.push(ConfigBuilderPoint::Method {
            path: path.to_string(),
            method_name: method_name.to_string(),
            parameter: parameter.cloned(),
            return_type: return_type.clone(),
        });
        Ok(())
    }

    /// Builder method taking a duration as milliseconds and a time unit
    pub fn visit_config_builder_duration_method(&mut self, path: &str, method_name: &str, return_type: &ClassElement) -> WriterResult<()> {
        self.current_builder()?.points.push(ConfigBuilderPoint::Duration {
            path: path.to_string(),
            method_name: method_name.to_string(),
            return_type: return_type.clone(),
        });
        Ok(())
    }

    /// Close the current builder
    pub fn visit_config_builder_end(&mut self) -> WriterResult<()> {
        let builder = self
            .config_builder
            .take()
            .ok_or_else(|| WriterError::illegal_state("No configuration builder is being visited"))?;
        self.inject_commands.push(InjectCommand::ConfigBuilder(builder));
        Ok(())
    }

    // ===== Annotation members =====

    /// Property of another bean that decides whether this bean loads
    pub fn visit_annotation_member_property_injection_point(
        &mut self,
        member_bean_type: &ClassElement,
        property: &str,
        required_value: Option<&str>,
        not_equals_value: Option<&str>,
        context: &mut dyn VisitorContext,
    ) -> WriterResult<()> {
        self.ensure_open()?;
        let Some(getter) = member_bean_type.find_property_getter(property) else {
            context.fail(
                &format!(
                    "Bean property [{}] is not available on bean [{}]",
                    property, member_bean_type.name
                ),
                Some(&member_bean_type.name),
            );
            return Ok(());
        };
        let point = AnnotationVisitData {
            property: property.to_string(),
            getter: getter.clone(),
            required_value: required_value.map(str::to_string),
            not_equals_value: not_equals_value.map(str::to_string),
        };
        match self
            .annotation_injections
            .iter_mut()
            .find(|a| a.bean_type.name == member_bean_type.name)
        {
            Some(existing) => existing.points.push(point),
            None => self.annotation_injections.push(AnnotationInjection {
                bean_type: member_bean_type.clone(),
                points: vec![point],
            }),
        }
        Ok(())
    }

    // ===== Interception =====

    /// Whether lifecycle stage `kind` of this bean runs through interceptors
    pub fn is_intercepted_lifecycle(&self, kind: InterceptorKind) -> bool {
        is_intercepted_lifecycle_by_type(
            &self.bean_type,
            &self.annotation_metadata,
            matches!(self.producer, BeanProducer::FactoryMethod { .. }),
            self.intercepted_type.is_some(),
            kind,
        )
    }

    /// Wrap post-construct and pre-destroy methods when they are intercepted
    fn on_build(&mut self) {
        if self.is_intercepted_lifecycle(InterceptorKind::PostConstruct) {
            self.post_construct.get_or_insert_with(LifecycleDefinition::default).intercepted = true;
        }
        if self.super_definition.is_none() && self.is_intercepted_lifecycle(InterceptorKind::PreDestroy) {
            self.pre_destroy.get_or_insert_with(LifecycleDefinition::default).intercepted = true;
        }
    }

    // ===== Finalization =====

    /// Assemble the definition class; no visit is accepted afterwards
    pub fn visit_bean_definition_end(&mut self, session: &mut BuildSession) -> WriterResult<()> {
        self.ensure_open()?;
        if self.config_builder.is_some() {
            return Err(WriterError::illegal_state(format!(
                "visit_config_builder_end() was not called for {}",
                self.class_name
            )));
        }
        if self.build_method.is_none() {
            return Err(WriterError::illegal_state(format!(
                "Bean definition {} has no constructor. Call visit_bean_definition_constructor(..) first.",
                self.class_name
            )));
        }
        self.on_build();

        let mut expressions = session.process_evaluated_expressions(&self.annotation_metadata, &self.class_name);
        for meta in self.element_metadata() {
            expressions.extend(session.process_evaluated_expressions(&meta, &self.class_name));
        }
        self.has_evaluated_expressions = !expressions.is_empty();

        if let Some(exec) = self.executable_methods.as_mut() {
            exec.visit_definition_end(session)?;
        }
        let class_def = self.assemble(session)?;
        log::debug!(
            "Finalized bean definition {} with {} methods",
            self.class_name,
            class_def.methods.len()
        );
        self.class_def = Some(class_def);
        Ok(())
    }

    /// Metadata of the build parameters, every recorded injection point and every executable method
    fn element_metadata(&self) -> Vec<AnnotationMetadata> {
        let mut out: Vec<AnnotationMetadata> = self
            .build_method
            .iter()
            .flat_map(|b| b.parameters())
            .map(|p| p.annotation_metadata.clone())
            .collect();
        out.extend(self.field_injection_points.iter().map(|f| f.field.annotation_metadata.clone()));
        for visit in &self.all_method_visits {
            out.push(visit.method.annotation_metadata.clone());
            out.extend(visit.method.parameters.iter().map(|p| p.annotation_metadata.clone()));
        }
        for method in self.executable_methods.iter().flat_map(|exec| exec.methods()) {
            out.push(method.annotation_metadata.clone());
            out.extend(method.parameters.iter().map(|p| p.annotation_metadata.clone()));
        }
        out
    }

    // ===== Output =====

    /// Encoded class file
    pub fn to_byte_array(&self) -> WriterResult<Vec<u8>> {
        let class_def = self.class_def.as_ref().ok_or_else(|| {
            WriterError::illegal_state("Bean definition not finalized. Call visit_bean_definition_end() first.")
        })?;
        Ok(ClassFileWriter::write(class_def)?)
    }

    /// Write the definition, its inner types and its `$Exec` class, and register the service
    pub fn accept(&self, visitor: &mut dyn ClassOutputVisitor, session: &mut BuildSession) -> WriterResult<()> {
        if self.disabled {
            log::debug!("Bean definition {} is disabled", self.class_name);
            return Ok(());
        }
        let class_def = self.class_def.as_ref().ok_or_else(|| {
            WriterError::illegal_state("Bean definition not finalized. Call visit_bean_definition_end() first.")
        })?;
        visitor.visit_service_descriptor(runtime::BEAN_DEFINITION_REFERENCE, &self.class_name, &self.originating);
        write_class_def(visitor, class_def, &self.originating)?;
        if let Some(exec) = &self.executable_methods {
            exec.accept(visitor)?;
        }
        session.write_evaluated_expressions(visitor)
    }
}

fn factory_definition_name(factory: &ClassElement, member: &str, unique_id: Option<&str>) -> WriterResult<String> {
    let id = unique_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| WriterError::illegal_argument("Factory methods require passing a unique identifier"))?;
    let declaring = simple_name_of(&factory.name);
    Ok(qualify(
        package_of(&factory.name),
        &format!("${}${}{}{}", declaring, capitalize(member), id, CLASS_SUFFIX),
    ))
}

/// `@Value` or `@Property` declared on the element
fn is_value_type(meta: &AnnotationMetadata) -> bool {
    meta.has_declared_stereotype(runtime::VALUE) || meta.has_declared_stereotype(runtime::PROPERTY)
}

/// Property name or `@Value` text of a value injection, `None` when neither is set
fn value_source(meta: &AnnotationMetadata) -> Option<String> {
    meta.string_value(runtime::PROPERTY, "name")
        .filter(|p| !p.is_empty())
        .or_else(|| meta.string_value(runtime::VALUE, "value"))
}

/// Report a value injection point that names no source; `false` when reported
fn check_value_source(name: &str, meta: &AnnotationMetadata, declaring_type: &str, context: &mut dyn VisitorContext) -> bool {
    if !is_value_type(meta) || value_source(meta).is_some() {
        return true;
    }
    context.fail(
        &format!("Value injection point [{}] declares neither a property name nor a value", name),
        Some(declaring_type),
    );
    false
}

/// Exposed types of `@Bean(typed = ...)` that exist and are implemented by the bean
fn validate_exposed_types(bean_type: &ClassElement, meta: &AnnotationMetadata, context: &mut dyn VisitorContext) -> Vec<String> {
    let mut exposed = Vec::new();
    for name in meta.string_values(runtime::BEAN, "typed") {
        if context.class_element(&name).is_none() {
            context.fail(
                &format!("Bean defines an exposed type [{}] that is not on the classpath", name),
                Some(&bean_type.name),
            );
        } else if !bean_type.is_assignable(&name) {
            context.fail(
                &format!("Bean defines an exposed type [{}] that is not implemented by the bean type", name),
                Some(&bean_type.name),
            );
        } else {
            exposed.push(name);
        }
    }
    exposed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::InMemoryClassOutput;
    use beanforge_types::{AnnotationEntry, AnnotationValue, CollectingVisitorContext, ParameterElement};

    fn singleton(name: &str) -> ClassElement {
        ClassElement::of(name).with_annotation_metadata(
            AnnotationMetadata::empty()
                .declare(AnnotationEntry::new(runtime::SINGLETON))
                .stereotype(runtime::SCOPE, runtime::SINGLETON),
        )
    }

    fn writer(bean: &ClassElement) -> BeanDefinitionWriter {
        let mut context = CollectingVisitorContext::new();
        BeanDefinitionWriter::new(BeanProducer::Class(bean.clone()), vec![bean.name.clone()], None, &mut context)
            .expect("writer")
    }

    #[test]
    fn test_definition_names() {
        let mut context = CollectingVisitorContext::new();
        assert_eq!(writer(&singleton("app.Engine")).class_name(), "app.$Engine$Definition");
        assert_eq!(writer(&singleton("app.$Proxy")).class_name(), "app.$Proxy$Definition");

        let factory = ClassElement::of("app.EngineFactory");
        let method = MethodElement::new("app.EngineFactory", "engine", ClassElement::of("app.Engine"));
        let def = BeanDefinitionWriter::new(
            BeanProducer::FactoryMethod {
                factory: factory.clone(),
                method: method.clone(),
            },
            Vec::new(),
            Some("0"),
            &mut context,
        )
        .expect("factory writer");
        assert_eq!(def.class_name(), "app.$EngineFactory$Engine0$Definition");

        let err = BeanDefinitionWriter::new(BeanProducer::FactoryMethod { factory, method }, Vec::new(), None, &mut context)
            .expect_err("missing id");
        assert!(err.to_string().contains("unique identifier"));
    }

    #[test]
    fn test_single_constructor_visit() {
        let bean = singleton("app.Engine");
        let mut def = writer(&bean);
        let ctor = MethodElement::constructor("app.Engine", Vec::new());
        def.visit_bean_definition_constructor(&ctor, false).expect("first");
        let err = def.visit_bean_definition_constructor(&ctor, false).expect_err("second");
        assert!(matches!(err, WriterError::IllegalState { .. }));
    }

    #[test]
    fn test_end_without_constructor() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut def = writer(&singleton("app.Engine"));
        assert!(def.visit_bean_definition_end(&mut session).is_err());
        assert!(!def.is_finalized());
    }

    #[test]
    fn test_injection_indices_are_stable() {
        let bean = singleton("app.Engine");
        let mut def = writer(&bean);
        let dep = ClassElement::of("app.Dep");
        let field = FieldElement::new("app.Engine", "dep", dep.clone());
        let setter = MethodElement::new("app.Engine", "setDep", ClassElement::of("void"))
            .with_parameter(ParameterElement::new("dep", dep));
        assert_eq!(def.visit_field_injection_point(&field, false).expect("field"), 0);
        assert_eq!(def.visit_method_injection_point(&setter, false).expect("method"), 0);
        assert_eq!(def.visit_field_injection_point(&field, true).expect("field"), 1);
        assert_eq!(def.visit_post_construct_method(&setter, false).expect("post"), Some(1));
        assert_eq!(def.field_injection_count(), 2);
        assert_eq!(def.method_injection_count(), 2);
    }

    #[test]
    fn test_missing_bean_property_is_reported() {
        let mut context = CollectingVisitorContext::new();
        let mut def = writer(&singleton("app.Engine"));
        def.visit_annotation_member_property_injection_point(&ClassElement::of("app.Config"), "enabled", None, None, &mut context)
            .expect("visit");
        assert!(context.has_errors());
        assert!(context.errors()[0]
            .to_string()
            .contains("Bean property [enabled] is not available on bean [app.Config]"));
    }

    #[test]
    fn test_value_without_source_is_reported() {
        let mut context = CollectingVisitorContext::new();
        let mut def = writer(&singleton("app.Engine"));
        let unnamed = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::PROPERTY))
            .stereotype(runtime::PROPERTY, runtime::PROPERTY);
        let field = FieldElement::new("app.Engine", "port", ClassElement::of("int")).with_annotation_metadata(unnamed);
        assert_eq!(def.visit_field_value(&field, false, false, &mut context).expect("visit"), None);
        assert!(context.errors()[0].to_string().contains("[port]"));
        assert_eq!(def.field_injection_count(), 0);

        let mut context = CollectingVisitorContext::new();
        let named = AnnotationMetadata::empty()
            .declare(AnnotationEntry::new(runtime::PROPERTY).with("name", AnnotationValue::String("server.port".into())))
            .stereotype(runtime::PROPERTY, runtime::PROPERTY);
        let field = FieldElement::new("app.Engine", "port", ClassElement::of("int")).with_annotation_metadata(named);
        assert_eq!(def.visit_field_value(&field, false, false, &mut context).expect("visit"), Some(0));
        assert!(!context.has_errors());
    }

    #[test]
    fn test_disabled_definition_writes_nothing() {
        let mut session = BuildSession::new(WriterOptions::default());
        let mut def = writer(&singleton("app.Engine"));
        def.visit_default_constructor().expect("ctor");
        def.visit_bean_definition_end(&mut session).expect("end");
        def.set_disabled(true);
        let mut output = InMemoryClassOutput::new();
        def.accept(&mut output, &mut session).expect("accept");
        assert!(output.class_names().is_empty());
        assert!(output.service_implementations(runtime::BEAN_DEFINITION_REFERENCE).is_empty());
    }
}
