use crate::types::{CelType, IP_ADDRESS_TYPE};
use lazy_static::lazy_static;
use serde::Serialize;

/// Function or method declaration available to caveat expressions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Receiver type for member-style calls (`value.name(..)`)
    pub receiver: Option<CelType>,
    pub params: Vec<CelType>,
    pub result: CelType,
}

impl FunctionDecl {
    pub fn method(name: &str, receiver: CelType, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            name: name.to_string(),
            receiver: Some(receiver),
            params,
            result,
        }
    }

    pub fn global(name: &str, params: Vec<CelType>, result: CelType) -> Self {
        Self {
            name: name.to_string(),
            receiver: None,
            params,
            result,
        }
    }

    /// Unique identifier of this overload, e.g. `ipaddress_in_cidr_string`
    pub fn overload_id(&self) -> String {
        let mut parts = Vec::with_capacity(self.params.len() + 2);
        if let Some(receiver) = &self.receiver {
            parts.push(receiver.to_string());
        }
        parts.push(self.name.clone());
        parts.extend(self.params.iter().map(|p| p.to_string()));
        parts.join("_")
    }
}

/// Opaque type contributed by the catalog together with its methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomType {
    pub name: String,
    pub methods: Vec<FunctionDecl>,
}

lazy_static! {
    /// Custom types shared by every caveat environment. Never mutated.
    pub static ref CUSTOM_TYPES: Vec<CustomType> = vec![ip_address_type()];

    /// Extra functions over built-in types, declared after the custom types
    pub static ref CUSTOM_METHODS_ON_TYPES: Vec<FunctionDecl> = vec![
        // parses an address or CIDR string
        FunctionDecl::global(
            IP_ADDRESS_TYPE,
            vec![CelType::String],
            CelType::Opaque(IP_ADDRESS_TYPE.to_string()),
        ),
    ];
}

fn ip_address_type() -> CustomType {
    let ip_address = CelType::Opaque(IP_ADDRESS_TYPE.to_string());
    CustomType {
        name: IP_ADDRESS_TYPE.to_string(),
        methods: vec![FunctionDecl::method(
            "in_cidr",
            ip_address,
            vec![CelType::String],
            CelType::Bool,
        )],
    }
}

/// Functions and macros provided by the expression language itself
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "has",
    "all",
    "exists",
    "exists_one",
    "map",
    "filter",
    "size",
    "contains",
    "startsWith",
    "endsWith",
    "matches",
    "int",
    "uint",
    "double",
    "string",
    "bytes",
    "bool",
    "dyn",
    "type",
    "duration",
    "timestamp",
    "max",
    "min",
    "getFullYear",
    "getMonth",
    "getDate",
    "getDayOfMonth",
    "getDayOfWeek",
    "getDayOfYear",
    "getHours",
    "getMinutes",
    "getSeconds",
    "getMilliseconds",
];

/// Functions available when optional field syntax is enabled
pub const OPTIONAL_FUNCTIONS: &[&str] = &[
    "optional.of",
    "optional.ofNonZeroValue",
    "optional.none",
    "hasValue",
    "value",
    "or",
    "orValue",
];
