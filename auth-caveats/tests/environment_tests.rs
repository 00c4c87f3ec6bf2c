//! Caveat environment tests
//!
//! Registries, evaluation environments and expression compilation through the
//! public API.

use auth_caveats::*;
use std::collections::{BTreeMap, HashMap};

fn registry(vars: &[(&str, VariableType)]) -> Environment {
    Environment::env_for_variables(
        vars.iter()
            .map(|(name, var_type)| (name.to_string(), var_type.clone())),
    )
    .unwrap()
}

#[test]
fn test_registry_compiles_then_rejects_duplicate() {
    let mut env = registry(&[("x", VariableType::Int), ("y", VariableType::String)]);

    let evaluation_env = env.as_evaluation_environment().unwrap();
    assert_eq!(evaluation_env.variable("x"), Some(&CelType::Int));
    assert_eq!(evaluation_env.variable("y"), Some(&CelType::String));

    let err = env.add_variable("x", VariableType::Bool).unwrap_err();
    assert!(matches!(err, CaveatError::DuplicateVariable(ref name) if name == "x"));
    assert_eq!(env.variables()["x"], VariableType::Int);
}

#[test]
fn test_env_for_variables_from_hash_map() {
    let mut vars = HashMap::new();
    vars.insert("expires_at".to_string(), VariableType::Timestamp);
    vars.insert("ttl".to_string(), VariableType::Duration);

    let env = Environment::env_for_variables(vars).unwrap();
    assert_eq!(env.variables().len(), 2);
}

#[test]
fn test_environment_pins_utc_and_enables_syntax_options() {
    // the same options regardless of which variables are declared
    for env in [
        Environment::new(),
        registry(&[("now", VariableType::Timestamp)]),
        registry(&[("source", VariableType::IpAddress), ("tags", VariableType::list_of(VariableType::String))]),
    ] {
        let evaluation_env = env.as_evaluation_environment().unwrap();
        assert!(evaluation_env.default_utc_time_zone(), "timestamps must evaluate in UTC");
        assert_eq!(evaluation_env.optional_types_version(), Some(0));
        assert!(evaluation_env.macro_call_tracking());
    }
}

#[test]
fn test_environment_includes_custom_type_catalog() {
    let env = registry(&[("source", VariableType::IpAddress)]);
    let evaluation_env = env.as_evaluation_environment().unwrap();

    let names: Vec<&str> = evaluation_env.custom_types().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![IP_ADDRESS_TYPE]);
    assert!(evaluation_env.has_function("in_cidr"));
    assert_eq!(
        evaluation_env.variable("source"),
        Some(&CelType::Opaque(IP_ADDRESS_TYPE.to_string()))
    );
}

#[test]
fn test_evaluation_environment_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EvaluationEnvironment>();

    let env = registry(&[("count", VariableType::Int)]);
    let evaluation_env = std::sync::Arc::new(env.as_evaluation_environment().unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let evaluation_env = evaluation_env.clone();
            std::thread::spawn(move || {
                evaluation_env
                    .compile(&format!("count > {}", i))
                    .map(|compiled| compiled.source().to_string())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), format!("count > {}", i));
    }
}

#[test]
fn test_compile_checks_references() {
    let env = registry(&[
        ("x", VariableType::Int),
        ("name", VariableType::String),
        ("source", VariableType::IpAddress),
    ]);
    let evaluation_env = env.as_evaluation_environment().unwrap();

    let compiled = evaluation_env.compile("x > 5 && name.startsWith('adm')").unwrap();
    assert_eq!(compiled.referenced_variables(), &["name".to_string(), "x".to_string()]);

    let compiled = evaluation_env.compile("source.in_cidr('10.0.0.0/8')").unwrap();
    assert_eq!(compiled.referenced_functions(), &["in_cidr".to_string()]);

    assert_eq!(
        evaluation_env.compile("z == 1"),
        Err(CaveatError::UndeclaredVariable("z".to_string()))
    );
    assert_eq!(
        evaluation_env.compile("launch_missiles(x)"),
        Err(CaveatError::UndefinedFunction("launch_missiles".to_string()))
    );
    assert!(matches!(
        evaluation_env.compile("x >"),
        Err(CaveatError::Parse { .. })
    ));
}

#[test]
fn test_encoded_parameters_round_trip_through_storage() {
    let env = registry(&[
        ("allowed", VariableType::map_of(VariableType::list_of(VariableType::String))),
        ("expires_at", VariableType::Timestamp),
    ]);

    let encoded = env.encoded_parameters_types();
    let stored = serde_json::to_string(&encoded).unwrap();
    let loaded: BTreeMap<String, CaveatTypeReference> = serde_json::from_str(&stored).unwrap();

    let decoded = decode_parameter_types(&loaded).unwrap();
    assert_eq!(&decoded, env.variables());
    assert_eq!(Environment::env_for_variables(decoded).unwrap(), env);
}

#[test]
fn test_compile_caveat_with_parameters() {
    let env = registry(&[
        ("source", VariableType::IpAddress),
        ("cidrs", VariableType::list_of(VariableType::String)),
    ]);

    let caveat = compile_caveat(&env, "office_network", "cidrs.exists(c, source.in_cidr(c))").unwrap();
    assert_eq!(caveat.name(), "office_network");
    assert_eq!(caveat.expression_string(), "cidrs.exists(c, source.in_cidr(c))");
    assert_eq!(caveat.parameter_types()["source"].type_name, "ipaddress");
    assert_eq!(caveat.parameter_types()["cidrs"].child_types[0].type_name, "string");
}

#[test]
fn test_optional_field_syntax_compiles() {
    let env = registry(&[
        ("labels", VariableType::map_of(VariableType::String)),
        ("source", VariableType::IpAddress),
    ]);
    let evaluation_env = env.as_evaluation_environment().unwrap();

    let expression = "labels.?team.orValue('none') == 'infra' || labels[?'owner'].hasValue()";
    let compiled = evaluation_env.compile(expression).unwrap();
    assert_eq!(compiled.source(), expression);
    assert_eq!(compiled.referenced_variables(), &["labels".to_string()]);

    let compiled = evaluation_env
        .compile("optional.of(source).hasValue() && labels.?region.or(optional.none()).hasValue()")
        .unwrap();
    assert_eq!(
        compiled.referenced_variables(),
        &["labels".to_string(), "source".to_string()]
    );
    assert!(compiled
        .referenced_functions()
        .contains(&"optional.of".to_string()));

    assert_eq!(
        evaluation_env.compile("missing.?field.hasValue()"),
        Err(CaveatError::UndeclaredVariable("missing".to_string()))
    );
}

#[test]
fn test_macro_variable_scoped_to_its_call() {
    let env = registry(&[("xs", VariableType::list_of(VariableType::Int))]);
    let evaluation_env = env.as_evaluation_environment().unwrap();

    assert_eq!(
        evaluation_env.compile("xs.all(v, v > 0) && v == 1"),
        Err(CaveatError::UndeclaredVariable("v".to_string()))
    );
    assert!(evaluation_env.compile("xs.all(v, v > 0) && xs.size() == 1").is_ok());
}

#[test]
fn test_methods_on_builtin_types_are_declared() {
    let env = registry(&[("raw_source", VariableType::String)]);
    let evaluation_env = env.as_evaluation_environment().unwrap();

    for function in CUSTOM_METHODS_ON_TYPES.iter() {
        assert!(evaluation_env.has_function(&function.name));
    }
    assert!(evaluation_env
        .compile("ipaddress(raw_source).in_cidr('192.168.0.0/16')")
        .is_ok());
}
