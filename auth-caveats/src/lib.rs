//! Caveat environments for conditional relationships
//!
//! A caveat is a named expression attached to a relationship that decides at
//! check time whether the relationship is active. This crate provides:
//! - The closed set of caveat parameter types and their encoded form
//! - The process-wide catalog of custom types (e.g. `ipaddress`)
//! - Variable registries and the evaluation environments compiled from them
//! - Type-checking of caveat expressions against an environment
//!
//! Evaluating a compiled expression against a concrete context is left to the
//! caller.
//!
//! # Example
//!
//! ```rust
//! use auth_caveats::{compile_caveat, Environment, VariableType};
//!
//! let env = Environment::env_for_variables(vec![
//!     ("source".to_string(), VariableType::IpAddress),
//!     ("allowed".to_string(), VariableType::String),
//! ])?;
//!
//! let evaluation_env = env.as_evaluation_environment()?;
//! assert!(evaluation_env.default_utc_time_zone());
//!
//! let caveat = compile_caveat(&env, "ip_allowlist", "source.in_cidr(allowed)")?;
//! assert_eq!(caveat.expression_string(), "source.in_cidr(allowed)");
//! # Ok::<(), auth_caveats::CaveatError>(())
//! ```

pub mod types;
pub mod catalog;
pub mod evaluation;
pub mod env;
pub mod compile;
pub mod error;

pub use types::*;
pub use catalog::*;
pub use evaluation::*;
pub use env::*;
pub use compile::*;
pub use error::*;
