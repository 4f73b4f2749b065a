//! Integration tests for loading elements handed over as JSON

use beanforge_types::{AnnotationValue, ClassElement, InterceptorKind};

const GREETER: &str = r#"{
  "name": "com.example.Greeter",
  "supertypes": ["com.example.Greeting"],
  "methods": [
    {
      "name": "greet",
      "declaring_type": "com.example.Greeter",
      "parameters": [{ "name": "name", "ty": { "name": "java.lang.String" } }],
      "return_type": { "name": "java.lang.String" },
      "annotation_metadata": {
        "declared": [
          { "name": "io.beanforge.context.Executable" },
          {
            "name": "io.beanforge.aop.InterceptorBindingDefinitions",
            "values": {
              "value": { "annotations": [
                { "name": "io.beanforge.aop.InterceptorBinding",
                  "values": { "value": { "class": "com.example.Logged" }, "kind": { "enum": "AROUND" } } }
              ] }
            }
          }
        ]
      }
    }
  ],
  "annotation_metadata": {
    "declared": [{ "name": "jakarta.inject.Singleton" }],
    "stereotypes": { "jakarta.inject.Scope": ["jakarta.inject.Singleton"] }
  }
}"#;

#[test]
fn test_load_class_element() {
    let greeter = ClassElement::from_json(GREETER).unwrap();
    assert_eq!(greeter.simple_name(), "Greeter");
    assert!(greeter.is_assignable("com.example.Greeting"));
    assert!(greeter.annotation_metadata.has_declared_stereotype("jakarta.inject.Scope"));

    let greet = greeter.find_method("greet").unwrap();
    assert_eq!(greet.parameter_type_names(), vec!["java.lang.String"]);
    assert!(greet.annotation_metadata.has_interceptor_binding(InterceptorKind::Around));
}

#[test]
fn test_member_value_kinds() {
    let greeter = ClassElement::from_json(GREETER).unwrap();
    let greet = greeter.find_method("greet").unwrap();
    let bindings = greet.annotation_metadata.interceptor_bindings();
    assert_eq!(bindings, vec![(Some("com.example.Logged".to_string()), InterceptorKind::Around)]);
    assert_eq!(
        AnnotationValue::Classes(vec!["a.B".into()]).as_strings(),
        vec!["a.B".to_string()]
    );
}

#[test]
fn test_invalid_element_json() {
    assert!(ClassElement::from_json("{\"methods\": 3}").is_err());
}
