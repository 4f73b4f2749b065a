//! Executable-methods definition writer
//!
//! Produces `<definition>$Exec`, the class that lets the runtime invoke a bean's
//! executable methods by index without reflection.

use crate::argument::ArgumentBuilder;
use crate::dispatch::{DispatchWriter, INTERCEPTABLE_FIELD};
use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class, type_of};
use crate::output::{write_class_def, ClassOutputVisitor};
use crate::runtime;
use crate::session::BuildSession;
use beanforge_bytecode::{
    modifiers, AnnotationDef, ClassDef, ExpressionDef, FieldDef, FieldRef, MethodDef, MethodRef, StatementDef,
    SwitchKey, TypeDef,
};
use beanforge_types::MethodElement;
use rustc_hash::FxHashMap;

/// Suffix of the executable-methods class
pub const CLASS_SUFFIX: &str = "$Exec";

/// Above this many methods `getMethod` is generated
const GET_METHOD_THRESHOLD: usize = 5;

const METHODS_REFERENCES: &str = "$METHODS_REFERENCES";

/// Writer of one `$Exec` class
#[derive(Debug)]
pub struct ExecutableMethodsDefinitionWriter {
    class_name: String,
    originating: Vec<String>,
    dispatch: DispatchWriter,
    methods: Vec<MethodElement>,
    keys: FxHashMap<String, usize>,
    class_def: Option<ClassDef>,
}

impl ExecutableMethodsDefinitionWriter {
    /// Writer for the bean definition `bean_definition_name`
    pub fn new(bean_definition_name: &str, originating: Vec<String>) -> Self {
        let class_name = format!("{}{}", bean_definition_name, CLASS_SUFFIX);
        Self {
            dispatch: DispatchWriter::new(class_name.clone()),
            class_name,
            originating,
            methods: Vec::new(),
            keys: FxHashMap::default(),
            class_def: None,
        }
    }

    /// Generated class name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Whether no method was visited
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Number of distinct methods
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Visited methods in index order
    pub fn methods(&self) -> &[MethodElement] {
        &self.methods
    }

    /// Whether any method dispatches through a proxy bridge
    pub fn has_interceptable_method(&self) -> bool {
        self.dispatch.has_interceptable_method()
    }

    /// Index of a method already visited
    pub fn index_of(&self, method: &MethodElement) -> Option<usize> {
        self.keys.get(&method_key(method)).copied()
    }

    /// Add an executable method, returning its index
    ///
    /// A method with the same name and parameter types as one already visited
    /// keeps its first index. With `intercepted`, the `(proxy class, bridge)`
    /// pair routes calls on the proxy to the unadvised method.
    pub fn visit_executable_method(
        &mut self,
        method: &MethodElement,
        intercepted: Option<(&str, &str)>,
    ) -> WriterResult<usize> {
        if self.class_def.is_some() {
            return Err(WriterError::illegal_state(format!(
                "Executable methods of {} are already finalized",
                self.class_name
            )));
        }
        let key = method_key(method);
        if let Some(index) = self.keys.get(&key) {
            log::trace!("Executable method {} already registered at {}", key, index);
            return Ok(*index);
        }
        let index = match intercepted {
            Some((proxy_class, bridge)) => self.dispatch.add_intercepted_method(method, proxy_class, bridge)?,
            None => self.dispatch.add_method(method)?,
        };
        debug_assert_eq!(index, self.methods.len());
        self.methods.push(method.clone());
        self.keys.insert(key, index);
        Ok(index)
    }

    /// Assemble the class
    pub fn visit_definition_end(&mut self, session: &mut BuildSession) -> WriterResult<()> {
        if self.class_def.is_some() {
            return Err(WriterError::illegal_state(format!("{} is already finalized", self.class_name)));
        }
        let owner = self.class_name.clone();
        let reference_type = type_of(runtime::EXECUTABLE_METHOD_REFERENCE);

        let mut builder = ClassDef::builder(owner.clone());
        builder
            .add_modifiers(modifiers::FINAL | modifiers::SYNTHETIC)
            .superclass(class(runtime::ABSTRACT_EXECUTABLE_METHODS_DEFINITION))
            .add_annotation(AnnotationDef::of(runtime::GENERATED));

        let mut used_names: FxHashMap<String, usize> = FxHashMap::default();
        let mut factories = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            let count = used_names.entry(method.name.clone()).or_default();
            let name = if *count == 0 {
                format!("$metadata${}", method.name)
            } else {
                format!("$metadata${}${}", method.name, count)
            };
            *count += 1;
            let body = metadata_factory_body(session, &owner, method)?;
            builder.add_method(
                MethodDef::builder(name.clone())
                    .add_modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL)
                    .returns(reference_type.clone())
                    .build(body.returning()),
            );
            factories.push(ExpressionDef::invoke_static(
                MethodRef::new(owner.clone(), name, vec![], reference_type.clone()),
                vec![],
            ));
        }

        let references = FieldRef::new(owner.clone(), METHODS_REFERENCES, reference_type.clone().array());
        builder.add_field(
            FieldDef::builder(METHODS_REFERENCES, reference_type.clone().array())
                .add_modifiers(modifiers::PRIVATE | modifiers::STATIC | modifiers::FINAL)
                .build(),
        );
        builder.add_static_statement(StatementDef::put_static(
            references.clone(),
            ExpressionDef::new_array(reference_type.clone(), factories),
        ));

        let super_ctor = MethodRef::constructor(runtime::ABSTRACT_EXECUTABLE_METHODS_DEFINITION, vec![reference_type.array()]);
        let super_call = ExpressionDef::invoke_super(super_ctor, vec![ExpressionDef::static_field(references)]);
        if self.dispatch.has_interceptable_method() {
            let flag = FieldRef::new(owner.clone(), INTERCEPTABLE_FIELD, TypeDef::boolean());
            builder.add_field(
                FieldDef::builder(INTERCEPTABLE_FIELD, TypeDef::boolean())
                    .add_modifiers(modifiers::PRIVATE | modifiers::FINAL)
                    .build(),
            );
            builder.add_method(MethodDef::constructor().add_modifiers(modifiers::PUBLIC).build(StatementDef::multi(vec![
                super_call.clone().statement(),
                ExpressionDef::this().put_field(flag.clone(), ExpressionDef::bool(false)),
                StatementDef::return_void(),
            ])));
            builder.add_method(
                MethodDef::constructor()
                    .add_modifiers(modifiers::PUBLIC)
                    .add_parameter("interceptable", TypeDef::boolean())
                    .build_with(|params| {
                        StatementDef::multi(vec![
                            super_call.statement(),
                            ExpressionDef::this().put_field(flag, params[0].clone()),
                            StatementDef::return_void(),
                        ])
                    }),
            );
        } else {
            builder.add_method(MethodDef::constructor().add_modifiers(modifiers::PUBLIC).build(StatementDef::multi(vec![
                super_call.statement(),
                StatementDef::return_void(),
            ])));
        }

        for method in self.dispatch.build_methods()? {
            builder.add_method(method);
        }
        if self.methods.len() > GET_METHOD_THRESHOLD {
            builder.add_method(self.get_method());
        }
        for method in session.take_load_class_methods(&owner) {
            builder.add_method(method);
        }

        log::debug!("Finalized {} with {} executable method(s)", owner, self.methods.len());
        self.class_def = Some(builder.build());
        Ok(())
    }

    /// `getMethod(String, Class[])` switching on the name, then testing each overload
    fn get_method(&self) -> MethodDef {
        let executable = type_of(runtime::EXECUTABLE_METHOD);
        let builder = MethodDef::builder("getMethod")
            .add_modifiers(modifiers::PUBLIC)
            .add_parameter("name", TypeDef::string())
            .add_parameter("argumentTypes", TypeDef::class().array())
            .returns(executable.clone());
        let params = builder.params();

        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (i, m) in self.methods.iter().enumerate() {
            match groups.iter_mut().find(|(n, _)| *n == m.name) {
                Some((_, indices)) => indices.push(i),
                None => groups.push((m.name.clone(), vec![i])),
            }
        }
        let cases = groups
            .into_iter()
            .map(|(name, indices)| {
                let mut body: Vec<StatementDef> = indices
                    .into_iter()
                    .map(|i| {
                        let matches = ExpressionDef::this().invoke(
                            MethodRef::new(
                                self.class_name.clone(),
                                "methodAtIndexMatches",
                                vec![TypeDef::int(), TypeDef::string(), TypeDef::class().array()],
                                TypeDef::boolean(),
                            ),
                            vec![ExpressionDef::int(i as i32), params[0].clone(), params[1].clone()],
                        );
                        let found = ExpressionDef::this().invoke(
                            MethodRef::new(
                                self.class_name.clone(),
                                "getExecutableMethodByIndex",
                                vec![TypeDef::int()],
                                executable.clone(),
                            ),
                            vec![ExpressionDef::int(i as i32)],
                        );
                        matches.if_true(found.returning())
                    })
                    .collect();
                body.push(ExpressionDef::null().returning());
                (SwitchKey::String(name), StatementDef::multi(body))
            })
            .collect();
        builder.build(StatementDef::multi(vec![
            StatementDef::switch(params[0].clone(), cases, None),
            ExpressionDef::null().returning(),
        ]))
    }

    /// Finalized class
    pub fn class_def(&self) -> Option<&ClassDef> {
        self.class_def.as_ref()
    }

    /// Write the finalized class
    pub fn accept(&self, visitor: &mut dyn ClassOutputVisitor) -> WriterResult<()> {
        let class_def = self.class_def.as_ref().ok_or_else(|| {
            WriterError::illegal_state(format!("visit_definition_end() was not called for {}", self.class_name))
        })?;
        write_class_def(visitor, class_def, &self.originating)
    }
}

/// `name(type1,type2,...)` with resolved generic parameter types
pub fn method_key(method: &MethodElement) -> String {
    format!("{}({})", method.name, method.generic_parameter_type_names().join(","))
}

fn metadata_factory_body(session: &mut BuildSession, owner: &str, method: &MethodElement) -> WriterResult<ExpressionDef> {
    let metadata = session.annotation_metadata_expression(owner, &method.annotation_metadata)?;
    let mut arguments = ArgumentBuilder::new(session, owner);
    let return_argument = arguments.return_type(method.generic_return_type())?;
    let parameters = arguments.method_arguments(method)?;
    Ok(ExpressionDef::new_instance(
        MethodRef::constructor(
            runtime::EXECUTABLE_METHOD_REFERENCE,
            vec![
                TypeDef::class(),
                type_of(runtime::ANNOTATION_METADATA),
                TypeDef::string(),
                type_of(runtime::ARGUMENT),
                type_of(runtime::ARGUMENT).array(),
                TypeDef::boolean(),
                TypeDef::boolean(),
            ],
        ),
        vec![
            ExpressionDef::class_literal(type_of(&method.declaring_type)),
            metadata,
            ExpressionDef::string(method.name.clone()),
            return_argument,
            parameters,
            ExpressionDef::bool(method.is_abstract),
            ExpressionDef::bool(method.is_suspend),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::WriterOptions;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::{ClassElement, ParameterElement};

    fn method(name: &str, params: &[&str]) -> MethodElement {
        let mut m = MethodElement::new("a.Greeter", name, ClassElement::of("java.lang.String"));
        for (i, p) in params.iter().enumerate() {
            m = m.with_parameter(ParameterElement::new(format!("p{}", i), ClassElement::of(*p)));
        }
        m
    }

    #[test]
    fn test_dedup_returns_existing_index() {
        let mut writer = ExecutableMethodsDefinitionWriter::new("a.$Greeter$Definition", vec![]);
        assert_eq!(writer.visit_executable_method(&method("greet", &["java.lang.String"]), None).unwrap(), 0);
        assert_eq!(writer.visit_executable_method(&method("greet", &["int"]), None).unwrap(), 1);
        assert_eq!(writer.visit_executable_method(&method("greet", &["java.lang.String"]), None).unwrap(), 0);
        assert_eq!(writer.method_count(), 2);

        let mut session = BuildSession::new(WriterOptions::default());
        writer.visit_definition_end(&mut session).unwrap();
        let class_def = writer.class_def().unwrap();
        assert_eq!(class_def.name, "a.$Greeter$Definition$Exec");
        assert!(class_def.find_method("$metadata$greet").is_some());
        assert!(class_def.find_method("$metadata$greet$1").is_some());
        assert!(class_def.find_method("$metadata$greet$2").is_none());
        assert!(class_def.find_method("getMethod").is_none());
        assert_eq!(class_def.methods_named("<init>").len(), 1);
    }

    #[test]
    fn test_interceptable_constructors() {
        let mut writer = ExecutableMethodsDefinitionWriter::new("a.$Greeter$Definition", vec![]);
        writer
            .visit_executable_method(&method("greet", &[]), Some(("a.$Greeter$Definition$Intercepted", "$$access$$greet")))
            .unwrap();
        let mut session = BuildSession::new(WriterOptions::default());
        writer.visit_definition_end(&mut session).unwrap();
        let class_def = writer.class_def().unwrap();
        assert_eq!(class_def.methods_named("<init>").len(), 2);
        assert!(class_def.find_field(INTERCEPTABLE_FIELD).is_some());
    }

    #[test]
    fn test_get_method_above_threshold() {
        let mut writer = ExecutableMethodsDefinitionWriter::new("a.$Greeter$Definition", vec![]);
        for name in ["a", "b", "c", "d", "e"] {
            writer.visit_executable_method(&method(name, &[]), None).unwrap();
        }
        writer.visit_executable_method(&method("a", &["int"]), None).unwrap();
        let mut session = BuildSession::new(WriterOptions::default());
        writer.visit_definition_end(&mut session).unwrap();
        let text = writer.class_def().unwrap().find_method("getMethod").unwrap().pretty_print();
        assert!(text.contains("case \"a\":"));
        assert!(text.contains("this.methodAtIndexMatches(5, arg0, arg1)"));
        assert!(!text.contains("case \"f\":"));
    }

    #[test]
    fn test_visit_after_end_fails() {
        let mut writer = ExecutableMethodsDefinitionWriter::new("a.$Greeter$Definition", vec![]);
        let mut session = BuildSession::new(WriterOptions::default());
        writer.visit_definition_end(&mut session).unwrap();
        assert!(writer.visit_executable_method(&method("late", &[]), None).is_err());
    }
}
