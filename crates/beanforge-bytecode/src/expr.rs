//! Expression nodes

use crate::stmt::StatementDef;
use crate::types::{method_descriptor, ClassTypeDef, TypeDef};

/// Constant values that can be loaded directly
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null`
    Null,
    /// Boolean literal
    Bool(bool),
    /// 32-bit integer literal
    Int(i32),
    /// 64-bit integer literal
    Long(i64),
    /// Double literal
    Double(f64),
    /// String literal
    String(String),
    /// Class literal (`Foo.class`)
    Type(TypeDef),
}

/// Symbolic reference to a method or constructor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Declaring class
    pub owner: ClassTypeDef,
    /// Method name, `<init>` for constructors
    pub name: String,
    /// Parameter types
    pub parameters: Vec<TypeDef>,
    /// Return type
    pub return_type: TypeDef,
    /// Whether the owner is an interface
    pub interface: bool,
}

impl MethodRef {
    /// Reference to a class method
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        parameters: Vec<TypeDef>,
        return_type: TypeDef,
    ) -> Self {
        Self {
            owner: ClassTypeDef::of(owner),
            name: name.into(),
            parameters,
            return_type,
            interface: false,
        }
    }

    /// Reference to an interface method
    pub fn interface(
        owner: impl Into<String>,
        name: impl Into<String>,
        parameters: Vec<TypeDef>,
        return_type: TypeDef,
    ) -> Self {
        Self {
            interface: true,
            ..Self::new(owner, name, parameters, return_type)
        }
    }

    /// Reference to a constructor
    pub fn constructor(owner: impl Into<String>, parameters: Vec<TypeDef>) -> Self {
        Self::new(owner, "<init>", parameters, TypeDef::Void)
    }

    /// Whether this refers to a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// JVM method descriptor
    pub fn descriptor(&self) -> String {
        method_descriptor(&self.parameters, &self.return_type)
    }
}

/// Symbolic reference to a field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Declaring class
    pub owner: ClassTypeDef,
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeDef,
}

impl FieldRef {
    /// Create a field reference
    pub fn new(owner: impl Into<String>, name: impl Into<String>, ty: TypeDef) -> Self {
        Self {
            owner: ClassTypeDef::of(owner),
            name: name.into(),
            ty,
        }
    }
}

/// Dispatch mode of an instance invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    /// Virtual dispatch on a class method
    Virtual,
    /// Interface dispatch
    Interface,
    /// Non-virtual call: `super.m()`, constructors, private methods
    Special,
}

/// An expression producing a value (or `void` for invocations)
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionDef {
    /// Constant load
    Constant(Constant),
    /// The current instance
    This,
    /// Method parameter, zero based excluding `this`
    Param {
        /// Parameter position
        index: usize,
        /// Declared type
        ty: TypeDef,
    },
    /// Local variable defined by [`StatementDef::DefineLocal`]
    Local {
        /// Variable name
        name: String,
        /// Variable type
        ty: TypeDef,
    },
    /// Static field read
    StaticField(FieldRef),
    /// Instance field read
    Field {
        /// Owning instance
        instance: Box<ExpressionDef>,
        /// Field reference
        field: FieldRef,
    },
    /// Static method invocation
    InvokeStatic {
        /// Target method
        method: MethodRef,
        /// Arguments
        args: Vec<ExpressionDef>,
    },
    /// Instance method invocation
    Invoke {
        /// Dispatch mode
        kind: InvokeKind,
        /// Receiver
        instance: Box<ExpressionDef>,
        /// Target method
        method: MethodRef,
        /// Arguments
        args: Vec<ExpressionDef>,
    },
    /// Object instantiation
    New {
        /// Constructor to call
        constructor: MethodRef,
        /// Arguments
        args: Vec<ExpressionDef>,
    },
    /// Array instantiation with initial items
    NewArray {
        /// Component type
        component: TypeDef,
        /// Items
        items: Vec<ExpressionDef>,
    },
    /// Array element read
    ArrayElement {
        /// Array value
        array: Box<ExpressionDef>,
        /// Element index
        index: usize,
    },
    /// Checked cast, boxing or unboxing when crossing primitive boundaries
    Cast {
        /// Value to cast
        value: Box<ExpressionDef>,
        /// Target type
        ty: TypeDef,
    },
    /// `value instanceof ty`
    InstanceOf {
        /// Tested value
        value: Box<ExpressionDef>,
        /// Tested type
        ty: ClassTypeDef,
    },
    /// `value == null`
    IsNull(Box<ExpressionDef>),
    /// `value != null`
    IsNonNull(Box<ExpressionDef>),
    /// Identity/primitive equality
    Equals(Box<ExpressionDef>, Box<ExpressionDef>),
    /// Short-circuit and
    And(Box<ExpressionDef>, Box<ExpressionDef>),
    /// Short-circuit or
    Or(Box<ExpressionDef>, Box<ExpressionDef>),
    /// Boolean negation
    Not(Box<ExpressionDef>),
    /// Integer bitwise or
    BitOr(Box<ExpressionDef>, Box<ExpressionDef>),
    /// `condition ? if_true : if_false`
    Conditional {
        /// Condition
        condition: Box<ExpressionDef>,
        /// Value when true
        if_true: Box<ExpressionDef>,
        /// Value when false
        if_false: Box<ExpressionDef>,
    },
}

impl ExpressionDef {
    // ===== Constants =====

    /// `null`
    pub fn null() -> Self {
        ExpressionDef::Constant(Constant::Null)
    }

    /// Boolean literal
    pub fn bool(value: bool) -> Self {
        ExpressionDef::Constant(Constant::Bool(value))
    }

    /// Integer literal
    pub fn int(value: i32) -> Self {
        ExpressionDef::Constant(Constant::Int(value))
    }

    /// Long literal
    pub fn long(value: i64) -> Self {
        ExpressionDef::Constant(Constant::Long(value))
    }

    /// Double literal
    pub fn double(value: f64) -> Self {
        ExpressionDef::Constant(Constant::Double(value))
    }

    /// String literal
    pub fn string(value: impl Into<String>) -> Self {
        ExpressionDef::Constant(Constant::String(value.into()))
    }

    /// String literal or `null`
    pub fn string_or_null(value: Option<&str>) -> Self {
        match value {
            Some(v) => ExpressionDef::string(v),
            None => ExpressionDef::null(),
        }
    }

    /// Class literal
    pub fn class_literal(ty: impl Into<TypeDef>) -> Self {
        ExpressionDef::Constant(Constant::Type(ty.into().erasure()))
    }

    // ===== Variables =====

    /// The current instance
    pub fn this() -> Self {
        ExpressionDef::This
    }

    /// Method parameter
    pub fn param(index: usize, ty: TypeDef) -> Self {
        ExpressionDef::Param { index, ty }
    }

    /// Local variable
    pub fn local(name: impl Into<String>, ty: TypeDef) -> Self {
        ExpressionDef::Local {
            name: name.into(),
            ty,
        }
    }

    /// Static field read
    pub fn static_field(field: FieldRef) -> Self {
        ExpressionDef::StaticField(field)
    }

    // ===== Invocation and allocation =====

    /// Static method call
    pub fn invoke_static(method: MethodRef, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::InvokeStatic { method, args }
    }

    /// `new T(args)`
    pub fn new_instance(constructor: MethodRef, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::New { constructor, args }
    }

    /// `new T[]{items}`
    pub fn new_array(component: TypeDef, items: Vec<ExpressionDef>) -> Self {
        ExpressionDef::NewArray { component, items }
    }

    /// `super.m(args)` or a super constructor call on `this`
    pub fn invoke_super(method: MethodRef, args: Vec<ExpressionDef>) -> Self {
        ExpressionDef::Invoke {
            kind: InvokeKind::Special,
            instance: Box::new(ExpressionDef::This),
            method,
            args,
        }
    }

    /// Instance method call, interface dispatch when the owner is an interface
    pub fn invoke(self, method: MethodRef, args: Vec<ExpressionDef>) -> Self {
        let kind = if method.interface {
            InvokeKind::Interface
        } else {
            InvokeKind::Virtual
        };
        ExpressionDef::Invoke {
            kind,
            instance: Box::new(self),
            method,
            args,
        }
    }

    /// Field read on this value
    pub fn field(self, field: FieldRef) -> Self {
        ExpressionDef::Field {
            instance: Box::new(self),
            field,
        }
    }

    /// Array element read on this value
    pub fn array_element(self, index: usize) -> Self {
        ExpressionDef::ArrayElement {
            array: Box::new(self),
            index,
        }
    }

    // ===== Conversions and tests =====

    /// Cast to `ty`. Casting a `null` constant or casting twice to the same type is a no-op.
    pub fn cast(self, ty: TypeDef) -> Self {
        match &self {
            ExpressionDef::Constant(Constant::Null) if !ty.is_primitive() => self,
            ExpressionDef::Cast { ty: existing, .. } if *existing == ty => self,
            _ => ExpressionDef::Cast {
                value: Box::new(self),
                ty,
            },
        }
    }

    /// `this instanceof ty`
    pub fn instance_of(self, ty: ClassTypeDef) -> Self {
        ExpressionDef::InstanceOf {
            value: Box::new(self),
            ty,
        }
    }

    /// `this == null`
    pub fn is_null(self) -> Self {
        ExpressionDef::IsNull(Box::new(self))
    }

    /// `this != null`
    pub fn is_non_null(self) -> Self {
        ExpressionDef::IsNonNull(Box::new(self))
    }

    /// `this == other`
    pub fn equals(self, other: ExpressionDef) -> Self {
        ExpressionDef::Equals(Box::new(self), Box::new(other))
    }

    /// `this && other`
    pub fn and(self, other: ExpressionDef) -> Self {
        ExpressionDef::And(Box::new(self), Box::new(other))
    }

    /// `this || other`
    pub fn or(self, other: ExpressionDef) -> Self {
        ExpressionDef::Or(Box::new(self), Box::new(other))
    }

    /// `!this`
    pub fn not(self) -> Self {
        ExpressionDef::Not(Box::new(self))
    }

    /// `this | other`
    pub fn bit_or(self, other: ExpressionDef) -> Self {
        ExpressionDef::BitOr(Box::new(self), Box::new(other))
    }

    /// `condition ? if_true : if_false`
    pub fn conditional(condition: ExpressionDef, if_true: ExpressionDef, if_false: ExpressionDef) -> Self {
        ExpressionDef::Conditional {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        }
    }

    // ===== Statements =====

    /// `return this;`
    pub fn returning(self) -> StatementDef {
        StatementDef::Return(Some(self))
    }

    /// `throw this;`
    pub fn do_throw(self) -> StatementDef {
        StatementDef::Throw(self)
    }

    /// Evaluate for side effects
    pub fn statement(self) -> StatementDef {
        StatementDef::Expression(self)
    }

    /// `this.field = value;`
    pub fn put_field(self, field: FieldRef, value: ExpressionDef) -> StatementDef {
        StatementDef::PutField {
            instance: self,
            field,
            value,
        }
    }

    /// `if (this) { then }`
    pub fn if_true(self, then: StatementDef) -> StatementDef {
        StatementDef::If {
            condition: self,
            then_branch: Box::new(then),
            else_branch: None,
        }
    }

    /// `if (this) { then } else { otherwise }`
    pub fn if_else(self, then: StatementDef, otherwise: StatementDef) -> StatementDef {
        StatementDef::If {
            condition: self,
            then_branch: Box::new(then),
            else_branch: Some(Box::new(otherwise)),
        }
    }

    /// Store this value in a new local and continue with a body using it
    pub fn new_local<F>(self, name: &str, ty: TypeDef, body: F) -> StatementDef
    where
        F: FnOnce(ExpressionDef) -> StatementDef,
    {
        let local = ExpressionDef::local(name, ty.clone());
        StatementDef::Multi(vec![
            StatementDef::DefineLocal {
                name: name.to_string(),
                ty,
                value: self,
            },
            body(local),
        ])
    }

    // ===== Inspection =====

    /// Direct child expressions
    pub fn children(&self) -> Vec<&ExpressionDef> {
        match self {
            ExpressionDef::Constant(_)
            | ExpressionDef::This
            | ExpressionDef::Param { .. }
            | ExpressionDef::Local { .. }
            | ExpressionDef::StaticField(_) => Vec::new(),
            ExpressionDef::Field { instance, .. } => vec![instance.as_ref()],
            ExpressionDef::InvokeStatic { args, .. } | ExpressionDef::New { args, .. } => args.iter().collect(),
            ExpressionDef::Invoke { instance, args, .. } => {
                let mut out: Vec<&ExpressionDef> = vec![instance.as_ref()];
                out.extend(args.iter());
                out
            }
            ExpressionDef::NewArray { items, .. } => items.iter().collect(),
            ExpressionDef::ArrayElement { array, .. } => vec![array.as_ref()],
            ExpressionDef::Cast { value, .. }
            | ExpressionDef::InstanceOf { value, .. }
            | ExpressionDef::IsNull(value)
            | ExpressionDef::IsNonNull(value)
            | ExpressionDef::Not(value) => vec![value.as_ref()],
            ExpressionDef::Equals(l, r)
            | ExpressionDef::And(l, r)
            | ExpressionDef::Or(l, r)
            | ExpressionDef::BitOr(l, r) => vec![l.as_ref(), r.as_ref()],
            ExpressionDef::Conditional {
                condition,
                if_true,
                if_false,
            } => vec![condition.as_ref(), if_true.as_ref(), if_false.as_ref()],
        }
    }

    /// Whether this expression or any nested one satisfies `predicate`
    pub fn any(&self, predicate: &dyn Fn(&ExpressionDef) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|c| c.any(predicate))
    }

    /// Whether a method or constructor named `name` is invoked anywhere in this expression
    pub fn invokes(&self, name: &str) -> bool {
        self.any(&|e| match e {
            ExpressionDef::InvokeStatic { method, .. } | ExpressionDef::Invoke { method, .. } => method.name == name,
            ExpressionDef::New { constructor, .. } => constructor.owner.name == name,
            _ => false,
        })
    }
}

impl From<Constant> for ExpressionDef {
    fn from(value: Constant) -> Self {
        ExpressionDef::Constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_of_null_is_elided() {
        assert_eq!(ExpressionDef::null().cast(TypeDef::string()), ExpressionDef::null());
        let twice = ExpressionDef::this().cast(TypeDef::string()).cast(TypeDef::string());
        assert!(matches!(twice, ExpressionDef::Cast { ref value, .. } if **value == ExpressionDef::This));
    }

    #[test]
    fn test_invoke_uses_interface_dispatch() {
        let m = MethodRef::interface("java.util.List", "size", vec![], TypeDef::int());
        let call = ExpressionDef::this().invoke(m, vec![]);
        assert!(matches!(call, ExpressionDef::Invoke { kind: InvokeKind::Interface, .. }));
    }

    #[test]
    fn test_invokes_finds_nested_calls() {
        let inner = ExpressionDef::invoke_static(
            MethodRef::new("a.B", "resolve", vec![], TypeDef::object()),
            vec![],
        );
        let outer = ExpressionDef::this().invoke(
            MethodRef::new("a.C", "accept", vec![TypeDef::object()], TypeDef::Void),
            vec![inner.cast(TypeDef::string())],
        );
        assert!(outer.invokes("resolve"));
        assert!(outer.invokes("accept"));
        assert!(!outer.invokes("missing"));
    }

    #[test]
    fn test_constructor_descriptor() {
        let ctor = MethodRef::constructor("a.B", vec![TypeDef::int(), TypeDef::string()]);
        assert!(ctor.is_constructor());
        assert_eq!(ctor.descriptor(), "(ILjava/lang/String;)V");
    }
}
