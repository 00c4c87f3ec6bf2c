use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaveatError {
    #[error("variable `{0}` already exists")]
    DuplicateVariable(String),

    #[error("variable `{variable}` has unsupported type `{type_name}`")]
    UnsupportedType { variable: String, type_name: String },

    #[error("duplicate declaration of `{0}` in evaluation environment")]
    DuplicateDeclaration(String),

    #[error("unknown caveat type `{0}`")]
    UnknownTypeName(String),

    #[error("caveat type `{type_name}` expects {expected} child type(s), found {found}")]
    InvalidTypeArity {
        type_name: String,
        expected: usize,
        found: usize,
    },

    #[error("failed to parse caveat expression `{expression}`: {message}")]
    Parse { expression: String, message: String },

    #[error("undeclared reference to variable `{0}`")]
    UndeclaredVariable(String),

    #[error("undeclared reference to function `{0}`")]
    UndefinedFunction(String),

    #[error("caveat name must not be empty")]
    EmptyCaveatName,
}

pub type Result<T> = std::result::Result<T, CaveatError>;
