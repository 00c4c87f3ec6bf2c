//! Developer CLI for the authorization core
//!
//! Offline introspection commands that wire the libraries together:
//! - `membership`: feed expansion trees into a membership set and show every
//!   subject found together with the relationships that led to it
//! - `caveat`: build a caveat environment from encoded parameter types and
//!   type-check an expression against it
//!
//! # Example Usage
//!
//! ```bash
//! authzdb membership --input expansions.json --output json
//! authzdb caveat --parameters params.json --name ip_allowlist \
//!     --expression "source.in_cidr(allowed)"
//! AUTHZDB_LOG_LEVEL=debug authzdb membership --input -
//! ```

pub mod config;
pub mod logging;
pub mod commands;

pub use crate::config::*;
pub use crate::logging::*;
pub use crate::commands::*;
