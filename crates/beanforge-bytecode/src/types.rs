//! Type references used by generated code

use std::fmt;

/// Name of `java.lang.Object`
pub const OBJECT: &str = "java.lang.Object";
/// Name of `java.lang.String`
pub const STRING: &str = "java.lang.String";
/// Name of `java.lang.Class`
pub const CLASS: &str = "java.lang.Class";

/// JVM primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `char`
    Char,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
}

impl PrimitiveType {
    /// Look up a primitive by its source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" => Some(PrimitiveType::Boolean),
            "byte" => Some(PrimitiveType::Byte),
            "short" => Some(PrimitiveType::Short),
            "char" => Some(PrimitiveType::Char),
            "int" => Some(PrimitiveType::Int),
            "long" => Some(PrimitiveType::Long),
            "float" => Some(PrimitiveType::Float),
            "double" => Some(PrimitiveType::Double),
            _ => None,
        }
    }

    /// Source name of the primitive
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    /// Single character JVM descriptor
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveType::Boolean => 'Z',
            PrimitiveType::Byte => 'B',
            PrimitiveType::Short => 'S',
            PrimitiveType::Char => 'C',
            PrimitiveType::Int => 'I',
            PrimitiveType::Long => 'J',
            PrimitiveType::Float => 'F',
            PrimitiveType::Double => 'D',
        }
    }

    /// Name of the wrapper class
    pub fn boxed_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to a class or interface, optionally parameterized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeDef {
    /// Fully qualified name, nested types separated by `$`
    pub name: String,
    /// Type arguments, empty for raw types
    pub type_args: Vec<TypeDef>,
}

impl ClassTypeDef {
    /// Raw class reference
    pub fn of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_args: Vec::new(),
        }
    }

    /// Parameterized class reference
    pub fn parameterized(name: impl Into<String>, type_args: Vec<TypeDef>) -> Self {
        Self {
            name: name.into(),
            type_args,
        }
    }

    /// Internal (slash separated) name
    pub fn internal_name(&self) -> String {
        self.name.replace('.', "/")
    }

    /// Simple name without package
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(self.name.as_str())
    }

    /// Erase the type arguments
    pub fn erasure(&self) -> ClassTypeDef {
        ClassTypeDef::of(self.name.clone())
    }

    /// Array type with this class as its component
    pub fn array(&self) -> TypeDef {
        TypeDef::Class(self.clone()).array()
    }
}

impl fmt::Display for ClassTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.type_args.is_empty() {
            let args: Vec<String> = self.type_args.iter().map(|t| t.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        Ok(())
    }
}

/// Any type that can appear in a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDef {
    /// `void`
    Void,
    /// Primitive type
    Primitive(PrimitiveType),
    /// Class or interface
    Class(ClassTypeDef),
    /// Array of a non-array component
    Array {
        /// Component type
        component: Box<TypeDef>,
        /// Number of dimensions, at least one
        dimensions: u32,
    },
}

impl TypeDef {
    /// Raw class type by name. Primitive names resolve to primitives.
    pub fn of(name: &str) -> TypeDef {
        if name == "void" {
            return TypeDef::Void;
        }
        match PrimitiveType::from_name(name) {
            Some(p) => TypeDef::Primitive(p),
            None => TypeDef::Class(ClassTypeDef::of(name)),
        }
    }

    /// `java.lang.Object`
    pub fn object() -> TypeDef {
        TypeDef::Class(ClassTypeDef::of(OBJECT))
    }

    /// `java.lang.String`
    pub fn string() -> TypeDef {
        TypeDef::Class(ClassTypeDef::of(STRING))
    }

    /// `java.lang.Class`
    pub fn class() -> TypeDef {
        TypeDef::Class(ClassTypeDef::of(CLASS))
    }

    /// `int`
    pub fn int() -> TypeDef {
        TypeDef::Primitive(PrimitiveType::Int)
    }

    /// `boolean`
    pub fn boolean() -> TypeDef {
        TypeDef::Primitive(PrimitiveType::Boolean)
    }

    /// Add one array dimension
    pub fn array(self) -> TypeDef {
        self.array_of(1)
    }

    /// Add `dimensions` array dimensions
    pub fn array_of(self, dimensions: u32) -> TypeDef {
        if dimensions == 0 {
            return self;
        }
        match self {
            TypeDef::Array {
                component,
                dimensions: existing,
            } => TypeDef::Array {
                component,
                dimensions: existing + dimensions,
            },
            other => TypeDef::Array {
                component: Box::new(other),
                dimensions,
            },
        }
    }

    /// Remove one array dimension
    pub fn component(&self) -> Option<TypeDef> {
        match self {
            TypeDef::Array {
                component,
                dimensions,
            } => Some(if *dimensions > 1 {
                TypeDef::Array {
                    component: component.clone(),
                    dimensions: dimensions - 1,
                }
            } else {
                (**component).clone()
            }),
            _ => None,
        }
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, TypeDef::Void)
    }

    /// Whether this is a primitive (not an array of primitives)
    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDef::Primitive(_))
    }

    /// Whether this is an array
    pub fn is_array(&self) -> bool {
        matches!(self, TypeDef::Array { .. })
    }

    /// Class part of this type, if any
    pub fn as_class(&self) -> Option<&ClassTypeDef> {
        match self {
            TypeDef::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Drop type arguments at every level
    pub fn erasure(&self) -> TypeDef {
        match self {
            TypeDef::Class(c) => TypeDef::Class(c.erasure()),
            TypeDef::Array {
                component,
                dimensions,
            } => TypeDef::Array {
                component: Box::new(component.erasure()),
                dimensions: *dimensions,
            },
            other => other.clone(),
        }
    }

    /// Boxed equivalent for primitives, identity otherwise
    pub fn boxed(&self) -> TypeDef {
        match self {
            TypeDef::Primitive(p) => TypeDef::Class(ClassTypeDef::of(p.boxed_name())),
            other => other.clone(),
        }
    }

    /// JVM field descriptor
    pub fn descriptor(&self) -> String {
        match self {
            TypeDef::Void => "V".to_string(),
            TypeDef::Primitive(p) => p.descriptor().to_string(),
            TypeDef::Class(c) => format!("L{};", c.internal_name()),
            TypeDef::Array {
                component,
                dimensions,
            } => {
                let mut out = "[".repeat(*dimensions as usize);
                out.push_str(&component.descriptor());
                out
            }
        }
    }
}

impl From<ClassTypeDef> for TypeDef {
    fn from(value: ClassTypeDef) -> Self {
        TypeDef::Class(value)
    }
}

impl From<PrimitiveType> for TypeDef {
    fn from(value: PrimitiveType) -> Self {
        TypeDef::Primitive(value)
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDef::Void => f.write_str("void"),
            TypeDef::Primitive(p) => write!(f, "{}", p),
            TypeDef::Class(c) => write!(f, "{}", c),
            TypeDef::Array {
                component,
                dimensions,
            } => {
                write!(f, "{}", component)?;
                for _ in 0..*dimensions {
                    f.write_str("[]")?;
                }
                Ok(())
            }
        }
    }
}

/// JVM method descriptor for the given parameter and return types
pub fn method_descriptor(params: &[TypeDef], ret: &TypeDef) -> String {
    let mut out = String::from("(");
    for p in params {
        out.push_str(&p.descriptor());
    }
    out.push(')');
    out.push_str(&ret.descriptor());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_descriptors() {
        assert_eq!(TypeDef::of("int").descriptor(), "I");
        assert_eq!(TypeDef::of("long").descriptor(), "J");
        assert_eq!(TypeDef::of("boolean").descriptor(), "Z");
        assert_eq!(TypeDef::of("void").descriptor(), "V");
    }

    #[test]
    fn test_class_and_array_descriptors() {
        assert_eq!(TypeDef::string().descriptor(), "Ljava/lang/String;");
        let matrix = TypeDef::of("double").array().array();
        assert_eq!(matrix.descriptor(), "[[D");
        assert_eq!(matrix.to_string(), "double[][]");
        assert_eq!(matrix.component(), Some(TypeDef::of("double").array()));
    }

    #[test]
    fn test_method_descriptor() {
        let desc = method_descriptor(&[TypeDef::int(), TypeDef::object().array()], &TypeDef::object());
        assert_eq!(desc, "(I[Ljava/lang/Object;)Ljava/lang/Object;");
    }

    #[test]
    fn test_erasure_drops_type_arguments() {
        let list = TypeDef::Class(ClassTypeDef::parameterized("java.util.List", vec![TypeDef::string()]));
        assert_eq!(list.to_string(), "java.util.List<java.lang.String>");
        assert_eq!(list.erasure().to_string(), "java.util.List");
        assert_eq!(list.erasure().descriptor(), "Ljava/util/List;");
    }

    #[test]
    fn test_boxed() {
        assert_eq!(TypeDef::int().boxed(), TypeDef::of("java.lang.Integer"));
        assert_eq!(TypeDef::string().boxed(), TypeDef::string());
    }
}
