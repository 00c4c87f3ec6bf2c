use crate::{
    catalog::{CustomType, FunctionDecl, BUILTIN_FUNCTIONS, OPTIONAL_FUNCTIONS},
    error::{CaveatError, Result},
    types::CelType,
};
use cel_parser::{Expression, Member};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Macros whose first argument binds an iteration variable for the rest of the call
const COMPREHENSION_MACROS: &[&str] = &["all", "exists", "exists_one", "map", "filter"];

lazy_static! {
    // string literals are matched first so that their contents are left alone
    static ref OPTIONAL_SELECT_REGEX: Regex =
        Regex::new(r#"'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|(\.\?|\[\?)"#).unwrap();
}

/// One building block of an evaluation environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvOption {
    CustomType(CustomType),
    Function(FunctionDecl),
    Variable { name: String, cel_type: CelType },
    /// Evaluate timestamps without a time zone argument in UTC
    DefaultUtcTimeZone(bool),
    /// Enable optional field selection (`msg.?field`), optional indexing
    /// (`m[?key]`) and the `optional.*` / `orValue` family of functions.
    ///
    /// Only accepted for reference checking: optional selection is checked
    /// like its plain form. Optional map and message entries (`{?k: v}`) are
    /// not supported and fail to parse.
    OptionalTypes { version: u32 },
    /// Keep call macros in the AST so rendering reproduces the source form
    MacroCallTracking,
}

/// Compiled, immutable environment for type-checking caveat expressions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationEnvironment {
    variables: BTreeMap<String, CelType>,
    custom_types: BTreeMap<String, CustomType>,
    functions: BTreeMap<String, FunctionDecl>,
    default_utc_time_zone: bool,
    optional_types_version: Option<u32>,
    macro_call_tracking: bool,
}

impl EvaluationEnvironment {
    /// Builds an environment from the given options, applied in order.
    ///
    /// # Errors
    ///
    /// Fails on duplicate declarations and on variables whose type refers to an
    /// opaque type that no option declares.
    pub fn new(options: Vec<EnvOption>) -> Result<Self> {
        let mut env = EvaluationEnvironment::default();

        for option in options {
            match option {
                EnvOption::CustomType(custom_type) => {
                    if env.custom_types.contains_key(&custom_type.name) {
                        return Err(CaveatError::DuplicateDeclaration(custom_type.name));
                    }
                    for method in &custom_type.methods {
                        env.declare_function(method.clone())?;
                    }
                    env.custom_types.insert(custom_type.name.clone(), custom_type);
                }
                EnvOption::Function(function) => env.declare_function(function)?,
                EnvOption::Variable { name, cel_type } => {
                    if env.variables.contains_key(&name) {
                        return Err(CaveatError::DuplicateDeclaration(name));
                    }
                    env.variables.insert(name, cel_type);
                }
                EnvOption::DefaultUtcTimeZone(enabled) => env.default_utc_time_zone = enabled,
                EnvOption::OptionalTypes { version } => env.optional_types_version = Some(version),
                EnvOption::MacroCallTracking => env.macro_call_tracking = true,
            }
        }

        for (name, cel_type) in &env.variables {
            if let Some(missing) = cel_type
                .opaque_names()
                .into_iter()
                .find(|opaque| !env.custom_types.contains_key(*opaque))
            {
                return Err(CaveatError::UnsupportedType {
                    variable: name.clone(),
                    type_name: missing.to_string(),
                });
            }
        }

        debug!(
            variables = env.variables.len(),
            custom_types = env.custom_types.len(),
            functions = env.functions.len(),
            "Built evaluation environment"
        );
        Ok(env)
    }

    fn declare_function(&mut self, function: FunctionDecl) -> Result<()> {
        let overload_id = function.overload_id();
        if self.functions.contains_key(&overload_id) {
            return Err(CaveatError::DuplicateDeclaration(overload_id));
        }
        self.functions.insert(overload_id, function);
        Ok(())
    }

    pub fn variables(&self) -> &BTreeMap<String, CelType> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&CelType> {
        self.variables.get(name)
    }

    pub fn custom_types(&self) -> impl Iterator<Item = &CustomType> {
        self.custom_types.values()
    }

    /// True if any declared overload carries this function name
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.values().any(|f| f.name == name)
    }

    pub fn default_utc_time_zone(&self) -> bool {
        self.default_utc_time_zone
    }

    pub fn optional_types_version(&self) -> Option<u32> {
        self.optional_types_version
    }

    pub fn macro_call_tracking(&self) -> bool {
        self.macro_call_tracking
    }

    /// Parses `expression` and checks that every variable and function it
    /// references is declared in this environment.
    ///
    /// # Errors
    ///
    /// Fails on syntax errors and undeclared references.
    pub fn compile(&self, expression: &str) -> Result<CompiledExpression> {
        let source = self.desugar_optional_selection(expression);
        let ast = cel_parser::parse(&source).map_err(|err| CaveatError::Parse {
            expression: expression.to_string(),
            message: format!("{:?}", err),
        })?;

        let mut collector = ReferenceCollector {
            optional_types: self.optional_types_version.is_some(),
            ..ReferenceCollector::default()
        };
        collector.visit(&ast);

        for variable in &collector.variables {
            if !self.variables.contains_key(variable) {
                return Err(CaveatError::UndeclaredVariable(variable.clone()));
            }
        }

        for function in &collector.functions {
            let name = function.as_str();
            let optional = collector.optional_types && OPTIONAL_FUNCTIONS.contains(&name);
            if !optional && !BUILTIN_FUNCTIONS.contains(&name) && !self.has_function(name) {
                return Err(CaveatError::UndefinedFunction(function.clone()));
            }
        }

        trace!(
            expression,
            variables = ?collector.variables,
            functions = ?collector.functions,
            "Compiled caveat expression"
        );
        Ok(CompiledExpression {
            source: expression.to_string(),
            variables: collector.variables.into_iter().collect(),
            functions: collector.functions.into_iter().collect(),
        })
    }

    /// Rewrites `.?` and `[?` to their plain forms outside string literals
    fn desugar_optional_selection<'a>(&self, expression: &'a str) -> Cow<'a, str> {
        if self.optional_types_version.is_none() {
            return Cow::Borrowed(expression);
        }
        OPTIONAL_SELECT_REGEX.replace_all(expression, |caps: &Captures| match caps.get(1) {
            Some(select) => select.as_str()[..1].to_string(),
            None => caps[0].to_string(),
        })
    }
}

/// Collects free variables and called functions. Comprehension variables are
/// only bound inside the macro call that introduces them.
#[derive(Default)]
struct ReferenceCollector<'a> {
    optional_types: bool,
    bound: Vec<&'a str>,
    variables: BTreeSet<String>,
    functions: BTreeSet<String>,
}

impl<'a> ReferenceCollector<'a> {
    fn visit(&mut self, expr: &'a Expression) {
        match expr {
            Expression::Ident(name) => {
                if !self.bound.contains(&name.as_str()) {
                    self.variables.insert(name.to_string());
                }
            }
            Expression::Atom(_) => {}
            Expression::Arithmetic(left, _, right) | Expression::Relation(left, _, right) => {
                self.visit(left);
                self.visit(right);
            }
            Expression::Or(left, right) | Expression::And(left, right) => {
                self.visit(left);
                self.visit(right);
            }
            Expression::Ternary(condition, if_true, if_false) => {
                self.visit(condition);
                self.visit(if_true);
                self.visit(if_false);
            }
            Expression::Unary(_, operand) => self.visit(operand),
            Expression::Member(target, member) => match member.as_ref() {
                Member::Attribute(_) => self.visit(target),
                Member::Index(index) => {
                    self.visit(target);
                    self.visit(index);
                }
                // message construction; the target is a type name
                Member::Fields(fields) => {
                    for (_, value) in fields {
                        self.visit(value);
                    }
                }
            },
            Expression::List(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Expression::Map(entries) => {
                for (key, value) in entries {
                    self.visit(key);
                    self.visit(value);
                }
            }
            Expression::FunctionCall(name, target, args) => {
                self.visit_call(name, target.as_deref(), args)
            }
        }
    }

    fn visit_call(
        &mut self,
        name: &'a Expression,
        target: Option<&'a Expression>,
        args: &'a [Expression],
    ) {
        let Expression::Ident(function) = name else {
            self.visit(name);
            self.visit_all(target, args);
            return;
        };

        match (target, args) {
            (Some(range), [Expression::Ident(var), body @ ..])
                if !body.is_empty() && COMPREHENSION_MACROS.contains(&function.as_str()) =>
            {
                self.functions.insert(function.to_string());
                self.visit(range);
                self.bound.push(var.as_str());
                for expr in body {
                    self.visit(expr);
                }
                self.bound.pop();
            }
            (Some(Expression::Ident(namespace)), _)
                if self.optional_types && namespace.as_str() == "optional" =>
            {
                self.functions.insert(format!("optional.{}", function));
                self.visit_all(None, args);
            }
            _ => {
                self.functions.insert(function.to_string());
                self.visit_all(target, args);
            }
        }
    }

    fn visit_all(&mut self, target: Option<&'a Expression>, args: &'a [Expression]) {
        if let Some(target) = target {
            self.visit(target);
        }
        for arg in args {
            self.visit(arg);
        }
    }
}

/// A type-checked expression. Keeps the source verbatim for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledExpression {
    source: String,
    variables: Vec<String>,
    functions: Vec<String>,
}

impl CompiledExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared variables the expression refers to, sorted
    pub fn referenced_variables(&self) -> &[String] {
        &self.variables
    }

    pub fn referenced_functions(&self) -> &[String] {
        &self.functions
    }
}
