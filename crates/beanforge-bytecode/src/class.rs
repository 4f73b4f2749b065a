//! Class, field and method definitions

use crate::expr::{Constant, ExpressionDef, FieldRef, MethodRef};
use crate::stmt::StatementDef;
use crate::types::{ClassTypeDef, TypeDef};

/// Access and property flags, using the JVM bit values
pub mod modifiers {
    /// `public`
    pub const PUBLIC: u16 = 0x0001;
    /// `private`
    pub const PRIVATE: u16 = 0x0002;
    /// `protected`
    pub const PROTECTED: u16 = 0x0004;
    /// `static`
    pub const STATIC: u16 = 0x0008;
    /// `final`
    pub const FINAL: u16 = 0x0010;
    /// `synchronized`
    pub const SYNCHRONIZED: u16 = 0x0020;
    /// `volatile`
    pub const VOLATILE: u16 = 0x0040;
    /// Interface type
    pub const INTERFACE: u16 = 0x0200;
    /// `abstract`
    pub const ABSTRACT: u16 = 0x0400;
    /// Compiler generated
    pub const SYNTHETIC: u16 = 0x1000;
}

/// Annotation attached to a class, method, field or parameter
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDef {
    /// Annotation type
    pub ty: ClassTypeDef,
    /// Member values
    pub values: Vec<(String, Constant)>,
}

impl AnnotationDef {
    /// Marker annotation with no members
    pub fn of(name: impl Into<String>) -> Self {
        Self {
            ty: ClassTypeDef::of(name),
            values: Vec::new(),
        }
    }

    /// Add a member value
    pub fn with_value(mut self, name: impl Into<String>, value: Constant) -> Self {
        self.values.push((name.into(), value));
        self
    }
}

/// Method parameter declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeDef,
    /// Parameter annotations
    pub annotations: Vec<AnnotationDef>,
}

impl ParameterDef {
    /// Unannotated parameter
    pub fn of(name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    /// Add an annotation
    pub fn annotated(mut self, annotation: AnnotationDef) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// Field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeDef,
    /// Modifier bits
    pub modifiers: u16,
    /// Inline initializer, run by the constructor or static initializer
    pub initializer: Option<ExpressionDef>,
}

impl FieldDef {
    /// Start building a field
    pub fn builder(name: impl Into<String>, ty: TypeDef) -> FieldDefBuilder {
        FieldDefBuilder {
            field: FieldDef {
                name: name.into(),
                ty,
                modifiers: 0,
                initializer: None,
            },
        }
    }

    /// Whether the field is static
    pub fn is_static(&self) -> bool {
        self.modifiers & modifiers::STATIC != 0
    }

    /// Whether the field is final
    pub fn is_final(&self) -> bool {
        self.modifiers & modifiers::FINAL != 0
    }

    /// Symbolic reference to this field on `owner`
    pub fn field_ref(&self, owner: &str) -> FieldRef {
        FieldRef::new(owner, self.name.clone(), self.ty.clone())
    }
}

/// Builder for [`FieldDef`]
pub struct FieldDefBuilder {
    field: FieldDef,
}

impl FieldDefBuilder {
    /// Add modifier bits
    pub fn add_modifiers(mut self, modifiers: u16) -> Self {
        self.field.modifiers |= modifiers;
        self
    }

    /// Set the initializer
    pub fn initializer(mut self, value: ExpressionDef) -> Self {
        self.field.initializer = Some(value);
        self
    }

    /// Finish the field
    pub fn build(self) -> FieldDef {
        self.field
    }
}

/// Method or constructor declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    /// Method name, `<init>` for constructors
    pub name: String,
    /// Modifier bits
    pub modifiers: u16,
    /// Parameters
    pub parameters: Vec<ParameterDef>,
    /// Return type
    pub return_type: TypeDef,
    /// Method annotations
    pub annotations: Vec<AnnotationDef>,
    /// Body, absent for abstract methods
    pub body: Option<StatementDef>,
}

impl MethodDef {
    /// Start building a method
    pub fn builder(name: impl Into<String>) -> MethodDefBuilder {
        MethodDefBuilder {
            method: MethodDef {
                name: name.into(),
                modifiers: 0,
                parameters: Vec::new(),
                return_type: TypeDef::Void,
                annotations: Vec::new(),
                body: None,
            },
        }
    }

    /// Start building a constructor
    pub fn constructor() -> MethodDefBuilder {
        MethodDef::builder("<init>")
    }

    /// Start building a public override of `method`; parameters are named `arg0..argN`
    pub fn override_of(method: &MethodRef) -> MethodDefBuilder {
        let mut builder = MethodDef::builder(method.name.clone())
            .add_modifiers(modifiers::PUBLIC)
            .returns(method.return_type.clone());
        for (i, p) in method.parameters.iter().enumerate() {
            builder = builder.add_parameter(format!("arg{}", i), p.clone());
        }
        builder
    }

    /// Whether this is a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// Whether this method is static
    pub fn is_static(&self) -> bool {
        self.modifiers & modifiers::STATIC != 0
    }

    /// Expression reading parameter `index`
    pub fn param(&self, index: usize) -> Option<ExpressionDef> {
        self.parameters
            .get(index)
            .map(|p| ExpressionDef::param(index, p.ty.clone()))
    }

    /// Symbolic reference to this method on `owner`
    pub fn method_ref(&self, owner: &str) -> MethodRef {
        MethodRef::new(
            owner,
            self.name.clone(),
            self.parameters.iter().map(|p| p.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }

    /// JVM descriptor
    pub fn descriptor(&self) -> String {
        let params: Vec<TypeDef> = self.parameters.iter().map(|p| p.ty.clone()).collect();
        crate::types::method_descriptor(&params, &self.return_type)
    }
}

/// Builder for [`MethodDef`]
pub struct MethodDefBuilder {
    method: MethodDef,
}

impl MethodDefBuilder {
    /// Add modifier bits
    pub fn add_modifiers(mut self, modifiers: u16) -> Self {
        self.method.modifiers |= modifiers;
        self
    }

    /// Add a parameter
    pub fn add_parameter(mut self, name: impl Into<String>, ty: TypeDef) -> Self {
        self.method.parameters.push(ParameterDef::of(name, ty));
        self
    }

    /// Add a fully described parameter
    pub fn add_parameter_def(mut self, parameter: ParameterDef) -> Self {
        self.method.parameters.push(parameter);
        self
    }

    /// Add several parameters
    pub fn add_parameters(mut self, parameters: impl IntoIterator<Item = ParameterDef>) -> Self {
        self.method.parameters.extend(parameters);
        self
    }

    /// Set the return type
    pub fn returns(mut self, ty: TypeDef) -> Self {
        self.method.return_type = ty;
        self
    }

    /// Add an annotation
    pub fn add_annotation(mut self, annotation: AnnotationDef) -> Self {
        self.method.annotations.push(annotation);
        self
    }

    /// Parameter expressions, in declaration order
    pub fn params(&self) -> Vec<ExpressionDef> {
        self.method
            .parameters
            .iter()
            .enumerate()
            .map(|(i, p)| ExpressionDef::param(i, p.ty.clone()))
            .collect()
    }

    /// Finish with the given body
    pub fn build(mut self, body: StatementDef) -> MethodDef {
        self.method.body = Some(body);
        self.method
    }

    /// Finish with a body produced from the parameter expressions
    pub fn build_with<F>(self, body: F) -> MethodDef
    where
        F: FnOnce(&[ExpressionDef]) -> StatementDef,
    {
        let params = self.params();
        let statement = body(&params);
        self.build(statement)
    }

    /// Finish without a body
    pub fn build_abstract(mut self) -> MethodDef {
        self.method.modifiers |= modifiers::ABSTRACT;
        self.method
    }
}

/// A complete class definition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    /// Fully qualified name
    pub name: String,
    /// Modifier bits
    pub modifiers: u16,
    /// Superclass, `None` means `java.lang.Object`
    pub superclass: Option<ClassTypeDef>,
    /// Implemented interfaces, in declaration order
    pub interfaces: Vec<ClassTypeDef>,
    /// Class annotations
    pub annotations: Vec<AnnotationDef>,
    /// Fields
    pub fields: Vec<FieldDef>,
    /// Methods and constructors
    pub methods: Vec<MethodDef>,
    /// Static initializer body
    pub static_initializer: Option<StatementDef>,
    /// Nested classes, serialized as separate class files
    pub inner_types: Vec<ClassDef>,
}

impl ClassDef {
    /// Start building a class
    pub fn builder(name: impl Into<String>) -> ClassDefBuilder {
        ClassDefBuilder {
            class: ClassDef {
                name: name.into(),
                modifiers: modifiers::PUBLIC,
                superclass: None,
                interfaces: Vec::new(),
                annotations: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                static_initializer: None,
                inner_types: Vec::new(),
            },
        }
    }

    /// Type reference to this class
    pub fn this_type(&self) -> ClassTypeDef {
        ClassTypeDef::of(self.name.clone())
    }

    /// First method with the given name
    pub fn find_method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// All methods with the given name
    pub fn methods_named(&self, name: &str) -> Vec<&MethodDef> {
        self.methods.iter().filter(|m| m.name == name).collect()
    }

    /// Field with the given name
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the class directly implements `interface`
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i.name == interface)
    }

    /// Inner type with the given name
    pub fn find_inner_type(&self, name: &str) -> Option<&ClassDef> {
        self.inner_types.iter().find(|c| c.name == name)
    }
}

/// Mutable builder for [`ClassDef`], kept alive while a writer accumulates members
#[derive(Debug, Clone)]
pub struct ClassDefBuilder {
    class: ClassDef,
}

impl ClassDefBuilder {
    /// Class name
    pub fn name(&self) -> &str {
        &self.class.name
    }

    /// Type reference to the class being built
    pub fn this_type(&self) -> ClassTypeDef {
        self.class.this_type()
    }

    /// Replace the modifier bits
    pub fn modifiers(&mut self, modifiers: u16) -> &mut Self {
        self.class.modifiers = modifiers;
        self
    }

    /// Add modifier bits
    pub fn add_modifiers(&mut self, modifiers: u16) -> &mut Self {
        self.class.modifiers |= modifiers;
        self
    }

    /// Set the superclass
    pub fn superclass(&mut self, superclass: ClassTypeDef) -> &mut Self {
        self.class.superclass = Some(superclass);
        self
    }

    /// Add an interface; duplicates are ignored
    pub fn add_interface(&mut self, interface: ClassTypeDef) -> &mut Self {
        if !self.class.interfaces.iter().any(|i| i.name == interface.name) {
            self.class.interfaces.push(interface);
        }
        self
    }

    /// Add a class annotation
    pub fn add_annotation(&mut self, annotation: AnnotationDef) -> &mut Self {
        self.class.annotations.push(annotation);
        self
    }

    /// Add a field
    pub fn add_field(&mut self, field: FieldDef) -> &mut Self {
        self.class.fields.push(field);
        self
    }

    /// Add a method
    pub fn add_method(&mut self, method: MethodDef) -> &mut Self {
        self.class.methods.push(method);
        self
    }

    /// Add a nested class
    pub fn add_inner_type(&mut self, inner: ClassDef) -> &mut Self {
        self.class.inner_types.push(inner);
        self
    }

    /// Append to the static initializer
    pub fn add_static_statement(&mut self, statement: StatementDef) -> &mut Self {
        let merged = match self.class.static_initializer.take() {
            Some(existing) => StatementDef::multi(vec![existing, statement]),
            None => statement,
        };
        self.class.static_initializer = Some(merged);
        self
    }

    /// Whether a method with this name was added
    pub fn has_method(&self, name: &str) -> bool {
        self.class.find_method(name).is_some()
    }

    /// Whether a field with this name was added
    pub fn has_field(&self, name: &str) -> bool {
        self.class.find_field(name).is_some()
    }

    /// Snapshot of the class built so far
    pub fn build(&self) -> ClassDef {
        self.class.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_names_parameters() {
        let m = MethodRef::new("a.B", "dispatch", vec![TypeDef::int(), TypeDef::object()], TypeDef::object());
        let def = MethodDef::override_of(&m).build_with(|params| params[1].clone().returning());
        assert_eq!(def.parameters[0].name, "arg0");
        assert_eq!(def.parameters[1].name, "arg1");
        assert_eq!(def.modifiers & modifiers::PUBLIC, modifiers::PUBLIC);
        assert_eq!(def.descriptor(), "(ILjava/lang/Object;)Ljava/lang/Object;");
        assert_eq!(
            def.body,
            Some(ExpressionDef::param(1, TypeDef::object()).returning())
        );
    }

    #[test]
    fn test_builder_deduplicates_interfaces() {
        let mut builder = ClassDef::builder("a.Proxy");
        builder
            .add_interface(ClassTypeDef::of("a.Intercepted"))
            .add_interface(ClassTypeDef::of("a.Intercepted"));
        assert_eq!(builder.build().interfaces.len(), 1);
    }

    #[test]
    fn test_static_statements_accumulate() {
        let f = FieldRef::new("a.B", "X", TypeDef::int());
        let mut builder = ClassDef::builder("a.B");
        builder.add_static_statement(StatementDef::put_static(f.clone(), ExpressionDef::int(1)));
        builder.add_static_statement(StatementDef::put_static(f, ExpressionDef::int(2)));
        match builder.build().static_initializer {
            Some(StatementDef::Multi(s)) => assert_eq!(s.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
