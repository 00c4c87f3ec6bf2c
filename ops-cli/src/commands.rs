use crate::config::OutputFormat;
use anyhow::{bail, Context, Result};
use auth_caveats::{compile_caveat, decode_parameter_types, CaveatTypeReference, Environment};
use auth_zanzibar::{MembershipSet, ObjectAndRelation, RelationTupleTreeNode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Read;
use tracing::{info, warn};

/// One expansion to feed into a membership set
#[derive(Debug, Clone, Deserialize)]
pub struct ExpansionRecord {
    pub root: ObjectAndRelation,
    pub tree: RelationTupleTreeNode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExpansionInput {
    Many(Vec<ExpansionRecord>),
    One(ExpansionRecord),
}

/// Builds a membership set from JSON expansions and renders who was found
/// for each root, and through which relationships.
///
/// # Errors
///
/// Fails on malformed JSON and on internally inconsistent expansion trees.
pub fn membership_report(input: &str, output: OutputFormat) -> Result<String> {
    let records = match serde_json::from_str::<ExpansionInput>(input)
        .context("input must be an expansion record or a list of them")?
    {
        ExpansionInput::Many(records) => records,
        ExpansionInput::One(record) => vec![record],
    };

    let mut memberships = MembershipSet::new();
    for record in &records {
        let (found, added) = memberships
            .add_expansion(&record.root, &record.tree)
            .with_context(|| format!("failed to expand {}", record.root))?;
        if added {
            info!(root = %record.root, subjects = found.len(), "Expanded root");
        } else {
            warn!(root = %record.root, "Root already expanded, ignoring duplicate tree");
        }
    }

    let by_root: BTreeMap<&String, _> = memberships.subjects_by_onr().iter().collect();

    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&by_root)?),
        OutputFormat::Text => {
            let mut rendered = String::new();
            for (root, found) in by_root {
                writeln!(rendered, "{}", root)?;
                let mut subjects = found.list_found();
                subjects.sort_by_key(|f| f.subject().onr_string());
                for subject in subjects {
                    let via: Vec<String> = subject
                        .relationships()
                        .iter()
                        .map(|onr| onr.onr_string())
                        .collect();
                    writeln!(rendered, "  {} via {}", subject.subject(), via.join(", "))?;
                }
            }
            Ok(rendered)
        }
    }
}

#[derive(Serialize)]
struct CaveatReport<'a> {
    caveat: &'a auth_caveats::CompiledCaveat,
    environment: &'a auth_caveats::EvaluationEnvironment,
}

/// Compiles a caveat expression against parameters given as encoded types.
///
/// # Errors
///
/// Fails on malformed parameter JSON, unknown types or an expression that
/// does not compile.
pub fn caveat_report(
    parameters: &str,
    name: &str,
    expression: &str,
    output: OutputFormat,
) -> Result<String> {
    let encoded: BTreeMap<String, CaveatTypeReference> =
        serde_json::from_str(parameters).context("parameters must map names to type references")?;
    let variables = decode_parameter_types(&encoded)?;

    let env = Environment::env_for_variables(variables)?;
    let caveat = compile_caveat(&env, name, expression)
        .with_context(|| format!("caveat `{}` does not compile", name))?;
    let environment = env.as_evaluation_environment()?;

    info!(caveat = name, parameters = env.variables().len(), "Compiled caveat");

    match output {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&CaveatReport {
            caveat: &caveat,
            environment: &environment,
        })?),
        OutputFormat::Text => {
            let mut rendered = String::new();
            writeln!(rendered, "caveat {} compiled", caveat.name())?;
            writeln!(rendered, "  expression: {}", caveat.expression_string())?;
            for (param, var_type) in env.variables() {
                writeln!(rendered, "  parameter {}: {}", param, var_type)?;
            }
            writeln!(
                rendered,
                "  utc: {}, optional types: {}, macro call tracking: {}",
                environment.default_utc_time_zone(),
                environment
                    .optional_types_version()
                    .map(|v| format!("v{}", v))
                    .unwrap_or_else(|| "off".to_string()),
                environment.macro_call_tracking()
            )?;
            Ok(rendered)
        }
    }
}

/// Reads a command input file, `-` meaning stdin
pub fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        return read_non_empty(std::io::stdin().lock(), "stdin");
    }
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path))?;
    read_non_empty(file, path)
}

fn read_non_empty(mut reader: impl Read, source: &str) -> Result<String> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .with_context(|| format!("failed to read {}", source))?;
    if contents.trim().is_empty() {
        bail!("{} is empty", source);
    }
    Ok(contents)
}
