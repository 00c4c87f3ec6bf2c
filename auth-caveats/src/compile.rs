use crate::{
    env::Environment,
    error::{CaveatError, Result},
    evaluation::CompiledExpression,
    types::CaveatTypeReference,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// A named caveat whose expression type-checked against its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledCaveat {
    name: String,
    expression: CompiledExpression,
    parameter_types: BTreeMap<String, CaveatTypeReference>,
}

impl CompiledCaveat {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.expression
    }

    /// Expression source exactly as written
    pub fn expression_string(&self) -> &str {
        self.expression.source()
    }

    pub fn parameter_types(&self) -> &BTreeMap<String, CaveatTypeReference> {
        &self.parameter_types
    }
}

/// Compiles a caveat expression under the variables of `env`.
///
/// # Errors
///
/// Fails on an empty name, if the evaluation environment cannot be built,
/// or if the expression does not compile.
pub fn compile_caveat(env: &Environment, name: &str, expression: &str) -> Result<CompiledCaveat> {
    if name.trim().is_empty() {
        return Err(CaveatError::EmptyCaveatName);
    }

    let evaluation_env = env.as_evaluation_environment()?;
    let compiled = evaluation_env.compile(expression)?;

    debug!(caveat = name, "Compiled caveat");
    Ok(CompiledCaveat {
        name: name.to_string(),
        expression: compiled,
        parameter_types: env.encoded_parameters_types(),
    })
}
