use crate::{
    catalog::{CUSTOM_METHODS_ON_TYPES, CUSTOM_TYPES},
    error::{CaveatError, Result},
    evaluation::{EnvOption, EvaluationEnvironment},
    types::{encode_parameter_types, CaveatTypeReference, VariableType},
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Version of the optional field syntax enabled for caveats
pub const OPTIONAL_TYPES_VERSION: u32 = 0;

/// Registry of the variables a caveat declares, used to build its
/// evaluation environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    variables: BTreeMap<String, VariableType>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment holding the given variables.
    ///
    /// # Errors
    ///
    /// Fails on the first variable that cannot be added.
    pub fn env_for_variables<I>(variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, VariableType)>,
    {
        let mut env = Environment::new();
        for (name, var_type) in variables {
            env.add_variable(&name, var_type)?;
        }
        Ok(env)
    }

    /// Like [`Environment::env_for_variables`] for call sites where a failure
    /// is a programming error.
    ///
    /// # Panics
    ///
    /// Panics if any variable cannot be added.
    pub fn must_env_for_variables<I>(variables: I) -> Self
    where
        I: IntoIterator<Item = (String, VariableType)>,
    {
        match Self::env_for_variables(variables) {
            Ok(env) => env,
            Err(err) => panic!("failed to build caveat environment: {}", err),
        }
    }

    /// Adds a variable with the given type.
    ///
    /// # Errors
    ///
    /// Returns [`CaveatError::DuplicateVariable`] if `name` already exists; the
    /// existing declaration is kept.
    pub fn add_variable(&mut self, name: &str, var_type: VariableType) -> Result<()> {
        if self.variables.contains_key(name) {
            return Err(CaveatError::DuplicateVariable(name.to_string()));
        }

        trace!(name, var_type = %var_type, "Adding caveat variable");
        self.variables.insert(name.to_string(), var_type);
        Ok(())
    }

    pub fn variables(&self) -> &BTreeMap<String, VariableType> {
        &self.variables
    }

    /// Encoded parameter types, as persisted with a caveat definition
    pub fn encoded_parameters_types(&self) -> BTreeMap<String, CaveatTypeReference> {
        encode_parameter_types(&self.variables)
    }

    /// Builds the evaluation environment: the custom type catalog and its
    /// functions on built-in types, one
    /// declaration per variable, then UTC time zone, optional field syntax
    /// and macro call tracking.
    ///
    /// # Errors
    ///
    /// Fails if the composed declarations are rejected.
    pub fn as_evaluation_environment(&self) -> Result<EvaluationEnvironment> {
        let mut options = Vec::with_capacity(
            CUSTOM_TYPES.len() + CUSTOM_METHODS_ON_TYPES.len() + self.variables.len() + 3,
        );

        options.extend(CUSTOM_TYPES.iter().cloned().map(EnvOption::CustomType));
        options.extend(CUSTOM_METHODS_ON_TYPES.iter().cloned().map(EnvOption::Function));

        options.extend(self.variables.iter().map(|(name, var_type)| EnvOption::Variable {
            name: name.clone(),
            cel_type: var_type.cel_type(),
        }));

        options.push(EnvOption::DefaultUtcTimeZone(true));
        options.push(EnvOption::OptionalTypes {
            version: OPTIONAL_TYPES_VERSION,
        });
        options.push(EnvOption::MacroCallTracking);

        debug!(variables = self.variables.len(), "Composing caveat evaluation environment");
        EvaluationEnvironment::new(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_variable_keeps_first_type() {
        let mut env = Environment::new();
        env.add_variable("x", VariableType::Int).unwrap();

        let err = env.add_variable("x", VariableType::String).unwrap_err();
        assert_eq!(err, CaveatError::DuplicateVariable("x".to_string()));
        assert_eq!(err.to_string(), "variable `x` already exists");
        assert_eq!(env.variables().get("x"), Some(&VariableType::Int));
    }

    #[test]
    fn test_env_for_variables_fails_fast() {
        let vars = vec![
            ("a".to_string(), VariableType::Bool),
            ("a".to_string(), VariableType::Bool),
        ];
        assert_eq!(
            Environment::env_for_variables(vars),
            Err(CaveatError::DuplicateVariable("a".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "variable `dup` already exists")]
    fn test_must_env_for_variables_panics() {
        Environment::must_env_for_variables(vec![
            ("dup".to_string(), VariableType::Int),
            ("dup".to_string(), VariableType::Int),
        ]);
    }

    #[test]
    fn test_evaluation_environment_options_always_set() {
        let env = Environment::new().as_evaluation_environment().unwrap();
        assert!(env.default_utc_time_zone());
        assert_eq!(env.optional_types_version(), Some(OPTIONAL_TYPES_VERSION));
        assert!(env.macro_call_tracking());
        assert!(env.variables().is_empty());
        assert_eq!(env.custom_types().count(), CUSTOM_TYPES.len());
    }

    #[test]
    fn test_evaluation_environment_declares_methods_on_types() {
        let env = Environment::env_for_variables(vec![("raw".to_string(), VariableType::String)])
            .unwrap()
            .as_evaluation_environment()
            .unwrap();
        for function in CUSTOM_METHODS_ON_TYPES.iter() {
            assert!(env.has_function(&function.name), "{} not declared", function.name);
        }

        let compiled = env.compile("ipaddress(raw).in_cidr('10.0.0.0/8')").unwrap();
        assert_eq!(
            compiled.referenced_functions(),
            &["in_cidr".to_string(), "ipaddress".to_string()]
        );
    }
}
