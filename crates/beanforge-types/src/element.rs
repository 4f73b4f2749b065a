//! Class, method, field and parameter elements

use crate::annotation::AnnotationMetadata;
use crate::error::ElementError;
use serde::{Deserialize, Serialize};

/// Names of primitive types, `void` excluded
pub const PRIMITIVE_NAMES: [&str; 8] = ["boolean", "byte", "short", "char", "int", "long", "float", "double"];

/// Name of `java.lang.Object`
pub const OBJECT: &str = "java.lang.Object";

const CONTAINER_TYPES: [&str; 12] = [
    "java.lang.Iterable",
    "java.util.Collection",
    "java.util.List",
    "java.util.Set",
    "java.util.SortedSet",
    "java.util.Queue",
    "java.util.Deque",
    "java.util.ArrayList",
    "java.util.LinkedList",
    "java.util.HashSet",
    "java.util.TreeSet",
    "java.util.stream.Stream",
];

/// A class, interface, primitive or array type as seen by the front end
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassElement {
    /// Fully qualified name of the component type
    pub name: String,
    /// Type arguments in declaration order, keyed by type variable name
    #[serde(default)]
    pub type_arguments: Vec<(String, ClassElement)>,
    /// Array dimensions
    #[serde(default)]
    pub array_dimensions: u32,
    /// Interface type
    #[serde(default)]
    pub is_interface: bool,
    /// Abstract type
    #[serde(default)]
    pub is_abstract: bool,
    /// Final type
    #[serde(default)]
    pub is_final: bool,
    /// Set when this is a generic placeholder; holds the variable name
    #[serde(default)]
    pub type_variable: Option<String>,
    /// Wildcard (`?`, `? extends X`)
    #[serde(default)]
    pub wildcard: bool,
    /// Upper bound of a placeholder or wildcard
    #[serde(default)]
    pub bound: Option<Box<ClassElement>>,
    /// Every type this type is assignable to
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Enclosed methods
    #[serde(default)]
    pub methods: Vec<MethodElement>,
    /// Nested configuration classes
    #[serde(default)]
    pub inner_classes: Vec<String>,
    /// Annotation metadata
    #[serde(default)]
    pub annotation_metadata: AnnotationMetadata,
}

impl ClassElement {
    /// Plain element for the named type
    pub fn of(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Primitive element, rejecting unknown names
    pub fn primitive(name: &str) -> Result<Self, ElementError> {
        if name == "void" || PRIMITIVE_NAMES.contains(&name) {
            Ok(Self::of(name))
        } else {
            Err(ElementError::UnknownPrimitive { name: name.to_string() })
        }
    }

    /// Generic placeholder with an upper bound
    pub fn placeholder(variable: impl Into<String>, bound: ClassElement) -> Self {
        Self {
            name: bound.name.clone(),
            type_variable: Some(variable.into()),
            bound: Some(Box::new(bound)),
            ..Default::default()
        }
    }

    /// Parse an element description from JSON
    pub fn from_json(json: &str) -> Result<Self, ElementError> {
        serde_json::from_str(json).map_err(|e| ElementError::InvalidElement { message: e.to_string() })
    }

    // ===== Construction =====

    /// Add a type argument
    pub fn with_type_argument(mut self, variable: impl Into<String>, argument: ClassElement) -> Self {
        self.type_arguments.push((variable.into(), argument));
        self
    }

    /// Add assignable supertypes
    pub fn with_supertypes<I, S>(mut self, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes.extend(supertypes.into_iter().map(Into::into));
        self
    }

    /// Add a method
    pub fn with_method(mut self, method: MethodElement) -> Self {
        self.methods.push(method);
        self
    }

    /// Replace the annotation metadata
    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    /// Mark as interface
    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self.is_abstract = true;
        self
    }

    /// Mark as abstract
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    // ===== Queries =====

    /// Whether this is a primitive, not an array of primitives
    pub fn is_primitive(&self) -> bool {
        self.array_dimensions == 0 && PRIMITIVE_NAMES.contains(&self.name.as_str())
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        self.array_dimensions == 0 && self.name == "void"
    }

    /// Whether this is an array
    pub fn is_array(&self) -> bool {
        self.array_dimensions > 0
    }

    /// Whether this is a generic placeholder
    pub fn is_generic_placeholder(&self) -> bool {
        self.type_variable.is_some()
    }

    /// Component element of an array
    pub fn from_array(&self) -> ClassElement {
        let mut component = self.clone();
        component.array_dimensions = self.array_dimensions.saturating_sub(1);
        component
    }

    /// Array of this element
    pub fn to_array(&self) -> ClassElement {
        let mut array = self.clone();
        array.array_dimensions += 1;
        array
    }

    /// Concrete type of a placeholder or wildcard, the element itself otherwise
    pub fn resolved(&self) -> ClassElement {
        if self.is_generic_placeholder() || self.wildcard {
            let mut resolved = match &self.bound {
                Some(b) => b.resolved(),
                None => ClassElement::of(OBJECT),
            };
            resolved.array_dimensions += self.array_dimensions;
            resolved
        } else {
            self.clone()
        }
    }

    /// First type argument
    pub fn first_type_argument(&self) -> Option<&ClassElement> {
        self.type_arguments.first().map(|(_, e)| e)
    }

    /// Type argument by variable name
    pub fn type_argument(&self, variable: &str) -> Option<&ClassElement> {
        self.type_arguments.iter().find(|(v, _)| v == variable).map(|(_, e)| e)
    }

    /// Name without the package
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(self.name.as_str())
    }

    /// Package name, empty for the default package
    pub fn package_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) => &self.name[..i],
            None => "",
        }
    }

    /// Name including one `[]` per array dimension
    pub fn canonical_name(&self) -> String {
        let mut out = self.name.clone();
        for _ in 0..self.array_dimensions {
            out.push_str("[]");
        }
        out
    }

    /// Whether a value of this type can be assigned to `name`
    pub fn is_assignable(&self, name: &str) -> bool {
        if self.is_array() {
            return name == OBJECT;
        }
        self.name == name || self.supertypes.iter().any(|s| s == name) || (name == OBJECT && !self.is_primitive())
    }

    /// Whether this is an array or a collection-like container
    pub fn is_container_type(&self) -> bool {
        self.is_array() || CONTAINER_TYPES.iter().any(|c| *c == self.name)
    }

    /// Enclosed method by name
    pub fn find_method(&self, name: &str) -> Option<&MethodElement> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Getter of a bean property (`getX`, or `isX` for booleans)
    pub fn find_property_getter(&self, property: &str) -> Option<&MethodElement> {
        let mut chars = property.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => return None,
        };
        let get = format!("get{}", capitalized);
        let is = format!("is{}", capitalized);
        self.methods
            .iter()
            .find(|m| m.parameters.is_empty() && !m.is_static && (m.name == get || m.name == is))
    }
}

/// A method or constructor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodElement {
    /// Method name, `<init>` for constructors
    pub name: String,
    /// Declaring type name
    pub declaring_type: String,
    /// Parameters
    #[serde(default)]
    pub parameters: Vec<ParameterElement>,
    /// Return type
    pub return_type: ClassElement,
    /// Return type with generics resolved
    #[serde(default)]
    pub generic_return_type: Option<ClassElement>,
    /// Static method
    #[serde(default)]
    pub is_static: bool,
    /// Abstract method
    #[serde(default)]
    pub is_abstract: bool,
    /// Interface default method
    #[serde(default)]
    pub is_default: bool,
    /// Final method
    #[serde(default)]
    pub is_final: bool,
    /// Kotlin suspend function
    #[serde(default)]
    pub is_suspend: bool,
    /// Not accessible without reflection
    #[serde(default)]
    pub reflection_required: bool,
    /// Types whose same-named method this method overrides
    #[serde(default)]
    pub overridden_types: Vec<String>,
    /// Annotation metadata
    #[serde(default)]
    pub annotation_metadata: AnnotationMetadata,
}

impl MethodElement {
    /// Instance method with no parameters
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, return_type: ClassElement) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.into(),
            return_type,
            ..Default::default()
        }
    }

    /// Constructor of `declaring_type`
    pub fn constructor(declaring_type: impl Into<String>, parameters: Vec<ParameterElement>) -> Self {
        Self {
            parameters,
            ..Self::new(declaring_type, "<init>", ClassElement::of("void"))
        }
    }

    /// Add a parameter
    pub fn with_parameter(mut self, parameter: ParameterElement) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Replace the annotation metadata
    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    /// Whether this is a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// Return type with generics resolved where known
    pub fn generic_return_type(&self) -> &ClassElement {
        self.generic_return_type.as_ref().unwrap_or(&self.return_type)
    }

    /// Whether any parameter has a Kotlin default value
    pub fn has_parameters_with_defaults(&self) -> bool {
        self.parameters.iter().any(|p| p.has_default)
    }

    /// Whether this method overrides `other`
    pub fn overrides(&self, other: &MethodElement) -> bool {
        self.name == other.name
            && !self.is_static
            && !other.is_static
            && self.parameters.len() == other.parameters.len()
            && self.overridden_types.iter().any(|t| *t == other.declaring_type)
    }

    /// Erased parameter type names
    pub fn parameter_type_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.ty.canonical_name()).collect()
    }

    /// Resolved generic parameter type names
    pub fn generic_parameter_type_names(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|p| p.generic_type().resolved().canonical_name())
            .collect()
    }
}

/// A field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldElement {
    /// Field name
    pub name: String,
    /// Declaring type name
    pub declaring_type: String,
    /// Declared type
    pub ty: ClassElement,
    /// Type with generics resolved
    #[serde(default)]
    pub generic_type: Option<ClassElement>,
    /// Static field
    #[serde(default)]
    pub is_static: bool,
    /// Final field
    #[serde(default)]
    pub is_final: bool,
    /// Not accessible without reflection
    #[serde(default)]
    pub reflection_required: bool,
    /// Annotation metadata
    #[serde(default)]
    pub annotation_metadata: AnnotationMetadata,
}

impl FieldElement {
    /// Instance field
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, ty: ClassElement) -> Self {
        Self {
            name: name.into(),
            declaring_type: declaring_type.into(),
            ty,
            ..Default::default()
        }
    }

    /// Replace the annotation metadata
    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    /// Type with generics resolved where known
    pub fn generic_type(&self) -> &ClassElement {
        self.generic_type.as_ref().unwrap_or(&self.ty)
    }
}

/// A method or constructor parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterElement {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: ClassElement,
    /// Type with generics resolved
    #[serde(default)]
    pub generic_type: Option<ClassElement>,
    /// Annotation metadata
    #[serde(default)]
    pub annotation_metadata: AnnotationMetadata,
    /// Kotlin parameter with a default value
    #[serde(default)]
    pub has_default: bool,
}

impl ParameterElement {
    /// Unannotated parameter
    pub fn new(name: impl Into<String>, ty: ClassElement) -> Self {
        Self {
            name: name.into(),
            ty,
            ..Default::default()
        }
    }

    /// Replace the annotation metadata
    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    /// Mark as having a default value
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Type with generics resolved where known
    pub fn generic_type(&self) -> &ClassElement {
        self.generic_type.as_ref().unwrap_or(&self.ty)
    }
}
