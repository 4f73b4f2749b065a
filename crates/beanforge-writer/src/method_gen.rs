//! Method generation helpers
//!
//! Kotlin compiles a function with default parameter values into a synthetic
//! `name$default` overload that takes one `int` mask per 32 parameters plus a
//! trailing marker. A set bit means "use the default for this parameter".

use crate::error::{WriterError, WriterResult};
use crate::gen_utils::{class_array, default_value, erased_type, parameter_types, type_of};
use crate::runtime;
use beanforge_bytecode::{Constant, ExpressionDef, FieldRef, MethodRef, TypeDef};
use beanforge_types::{MethodElement, ParameterElement};

/// Suffix of the Kotlin default-argument overload
pub const DEFAULT_METHOD_SUFFIX: &str = "$default";

/// Name of the Kotlin companion object field
const COMPANION: &str = "Companion";

/// Number of `int` mask words for `parameter_count` parameters
pub fn mask_words(parameter_count: usize) -> usize {
    (parameter_count + 31) / 32
}

/// Mask words for known supplied-value flags
///
/// Bit `k` of word `w` is set when parameter `32w + k` has a default and no
/// value was supplied.
pub fn kotlin_default_masks(parameters: &[ParameterElement], supplied: &[bool]) -> Vec<i32> {
    let mut masks = vec![0i32; mask_words(parameters.len())];
    for (i, p) in parameters.iter().enumerate() {
        if p.has_default && !supplied.get(i).copied().unwrap_or(false) {
            masks[i / 32] |= 1i32.wrapping_shl((i % 32) as u32);
        }
    }
    masks
}

/// Mask word expressions
///
/// With `has_values`, each defaulted parameter contributes
/// `hasValue ? 0 : (1 << k)`; constant flags are folded. Without them every
/// defaulted parameter takes its default.
pub fn kotlin_default_mask_expressions(
    parameters: &[ParameterElement],
    has_values: Option<&[ExpressionDef]>,
) -> Vec<ExpressionDef> {
    let words = mask_words(parameters.len());
    let mut constants = vec![0i32; words];
    let mut dynamic: Vec<Vec<ExpressionDef>> = vec![Vec::new(); words];
    for (i, p) in parameters.iter().enumerate() {
        if !p.has_default {
            continue;
        }
        let bit = 1i32.wrapping_shl((i % 32) as u32);
        match has_values.and_then(|h| h.get(i)) {
            None => constants[i / 32] |= bit,
            Some(ExpressionDef::Constant(Constant::Bool(true))) => {}
            Some(ExpressionDef::Constant(Constant::Bool(false))) => constants[i / 32] |= bit,
            Some(flag) => dynamic[i / 32].push(ExpressionDef::conditional(
                flag.clone(),
                ExpressionDef::int(0),
                ExpressionDef::int(bit),
            )),
        }
    }
    constants
        .into_iter()
        .zip(dynamic)
        .map(|(constant, parts)| {
            parts
                .into_iter()
                .fold(ExpressionDef::int(constant), |acc, part| acc.bit_or(part))
        })
        .collect()
}

fn cast_value(value: ExpressionDef, ty: &TypeDef) -> ExpressionDef {
    match value {
        ExpressionDef::Constant(Constant::Null) => default_value(ty),
        other => other.cast(ty.clone()),
    }
}

/// Values cast to the parameter types, primitives with defaults guarded against null
fn parameter_values(parameters: &[ParameterElement], values: Vec<ExpressionDef>, with_defaults: bool) -> Vec<ExpressionDef> {
    parameters
        .iter()
        .zip(values)
        .map(|(p, value)| {
            let ty = erased_type(&p.ty);
            if with_defaults && p.has_default && ty.is_primitive() {
                let guarded = ExpressionDef::invoke_static(
                    MethodRef::new(runtime::OBJECTS, "requireNonNullElse", vec![TypeDef::object(), TypeDef::object()], TypeDef::object()),
                    vec![value, default_value(&ty).cast(ty.boxed())],
                );
                guarded.cast(ty)
            } else {
                cast_value(value, &ty)
            }
        })
        .collect()
}

/// Expression creating the bean through `constructor`
///
/// `constructor` may be a real constructor, a static factory method or a
/// method of a Kotlin companion object.
pub fn invoke_bean_constructor(
    constructor: &MethodElement,
    values: Vec<ExpressionDef>,
    has_values: Option<&[ExpressionDef]>,
) -> WriterResult<ExpressionDef> {
    let declaring = constructor.declaring_type.as_str();
    let companion = declaring.ends_with(&format!("${}", COMPANION));
    let param_types = parameter_types(constructor);
    let declaring_type = type_of(declaring);

    if constructor.reflection_required && !companion {
        let args = parameter_values(&constructor.parameters, values, false)
            .into_iter()
            .map(|v| v.cast(TypeDef::object()))
            .collect();
        return Ok(ExpressionDef::invoke_static(
            MethodRef::new(
                runtime::INSTANTIATION_UTILS,
                "instantiate",
                vec![TypeDef::class(), TypeDef::class().array(), TypeDef::object().array()],
                TypeDef::object(),
            ),
            vec![
                ExpressionDef::class_literal(declaring_type.clone()),
                class_array(&param_types),
                ExpressionDef::new_array(TypeDef::object(), args),
            ],
        )
        .cast(declaring_type));
    }

    if constructor.is_constructor() {
        if constructor.has_parameters_with_defaults() {
            let mut params = param_types;
            let masks = kotlin_default_mask_expressions(&constructor.parameters, has_values);
            params.extend(std::iter::repeat(TypeDef::int()).take(masks.len()));
            params.push(type_of(runtime::KOTLIN_DEFAULT_CONSTRUCTOR_MARKER));
            let mut args = parameter_values(&constructor.parameters, values, true);
            args.extend(masks);
            args.push(ExpressionDef::null());
            return Ok(ExpressionDef::new_instance(MethodRef::constructor(declaring, params), args));
        }
        let args = parameter_values(&constructor.parameters, values, false);
        return Ok(ExpressionDef::new_instance(MethodRef::constructor(declaring, param_types), args));
    }

    let return_type = erased_type(&constructor.return_type);
    let args = parameter_values(&constructor.parameters, values, false);
    if constructor.is_static {
        return Ok(ExpressionDef::invoke_static(
            MethodRef::new(declaring, constructor.name.clone(), param_types, return_type),
            args,
        ));
    }
    if companion {
        let outer = &declaring[..declaring.len() - COMPANION.len() - 1];
        let instance = ExpressionDef::static_field(FieldRef::new(outer, COMPANION, declaring_type));
        return Ok(instance.invoke(
            MethodRef::new(declaring, constructor.name.clone(), param_types, return_type),
            args,
        ));
    }
    Err(WriterError::illegal_state(format!(
        "Unknown constructor: {}.{}",
        declaring, constructor.name
    )))
}

/// `Decl.name$default(target, values..., masks..., null)`
pub fn invoke_kotlin_default_method(
    method: &MethodElement,
    target: ExpressionDef,
    values: Vec<ExpressionDef>,
    has_values: Option<&[ExpressionDef]>,
) -> ExpressionDef {
    let declaring = method.declaring_type.as_str();
    let masks = kotlin_default_mask_expressions(&method.parameters, has_values);
    let mut params = vec![type_of(declaring)];
    params.extend(parameter_types(method));
    params.extend(std::iter::repeat(TypeDef::int()).take(masks.len()));
    params.push(TypeDef::object());

    let mut args = vec![target.cast(type_of(declaring))];
    args.extend(parameter_values(&method.parameters, values, true));
    args.extend(masks);
    args.push(ExpressionDef::null());

    let return_type = if method.is_suspend {
        TypeDef::object()
    } else {
        erased_type(&method.return_type)
    };
    ExpressionDef::invoke_static(
        MethodRef::new(declaring, format!("{}{}", method.name, DEFAULT_METHOD_SUFFIX), params, return_type),
        args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use beanforge_bytecode::PrettyPrint;
    use beanforge_types::ClassElement;

    fn params(count: usize, defaults: &[usize]) -> Vec<ParameterElement> {
        (0..count)
            .map(|i| {
                let p = ParameterElement::new(format!("p{}", i), ClassElement::of("java.lang.String"));
                if defaults.contains(&i) {
                    p.with_default()
                } else {
                    p
                }
            })
            .collect()
    }

    #[test]
    fn test_mask_words() {
        assert_eq!(mask_words(0), 0);
        assert_eq!(mask_words(1), 1);
        assert_eq!(mask_words(32), 1);
        assert_eq!(mask_words(33), 2);
        assert_eq!(mask_words(40), 2);
    }

    #[test]
    fn test_mask_bits_for_supplied_values() {
        let parameters = params(10, &[2, 5, 9]);
        let mut supplied = vec![false; 10];
        supplied[2] = true;
        supplied[9] = true;
        let masks = kotlin_default_masks(&parameters, &supplied);
        assert_eq!(masks, vec![1 << 5]);
    }

    #[test]
    fn test_mask_second_word() {
        let parameters = params(40, &[35]);
        let masks = kotlin_default_masks(&parameters, &[]);
        assert_eq!(masks, vec![0, 1 << 3]);
    }

    #[test]
    fn test_mask_expressions_fold_constants() {
        let parameters = params(3, &[0, 1, 2]);
        let flags = vec![
            ExpressionDef::bool(true),
            ExpressionDef::bool(false),
            ExpressionDef::local("has2", TypeDef::boolean()),
        ];
        let masks = kotlin_default_mask_expressions(&parameters, Some(&flags));
        assert_eq!(masks.len(), 1);
        assert_eq!(masks[0].pretty_print(), "(2 | has2 ? 0 : 4)");
        let all = kotlin_default_mask_expressions(&parameters, None);
        assert_eq!(all[0], ExpressionDef::int(7));
    }

    #[test]
    fn test_invoke_constructor_variants() {
        let ctor = MethodElement::constructor(
            "a.Bean",
            vec![ParameterElement::new("count", ClassElement::of("int"))],
        );
        let plain = invoke_bean_constructor(&ctor, vec![ExpressionDef::null()], None).unwrap();
        assert_eq!(plain.pretty_print(), "new Bean(((int) 0))");

        let mut factory = MethodElement::new("a.Factory$Companion", "create", ClassElement::of("a.Bean"));
        factory.parameters.clear();
        let companion = invoke_bean_constructor(&factory, vec![], None).unwrap();
        assert_eq!(companion.pretty_print(), "Factory.Companion.create()");

        let unknown = MethodElement::new("a.Factory", "create", ClassElement::of("a.Bean"));
        assert!(matches!(
            invoke_bean_constructor(&unknown, vec![], None),
            Err(WriterError::IllegalState { .. })
        ));
    }

    #[test]
    fn test_reflective_constructor() {
        let mut ctor = MethodElement::constructor("a.Bean", vec![]);
        ctor.reflection_required = true;
        let expr = invoke_bean_constructor(&ctor, vec![], None).unwrap();
        assert_eq!(
            expr.pretty_print(),
            "((a.Bean) InstantiationUtils.instantiate(a.Bean.class, new java.lang.Class[]{}, new java.lang.Object[]{}))"
        );
    }
}
