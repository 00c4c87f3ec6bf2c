use crate::error::{CaveatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name of the opaque type used for IP address parameters
pub const IP_ADDRESS_TYPE: &str = "ipaddress";

/// Native type of a declaration inside an evaluation environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelType {
    Dyn,
    Bool,
    String,
    Int,
    Uint,
    Double,
    Bytes,
    Duration,
    Timestamp,
    List(Box<CelType>),
    Map(Box<CelType>, Box<CelType>),
    /// Type provided by the custom type catalog
    Opaque(String),
}

impl CelType {
    /// Names of the opaque types this type refers to, including nested ones
    pub fn opaque_names(&self) -> Vec<&str> {
        match self {
            CelType::Opaque(name) => vec![name.as_str()],
            CelType::List(elem) => elem.opaque_names(),
            CelType::Map(key, value) => {
                let mut names = key.opaque_names();
                names.extend(value.opaque_names());
                names
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for CelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CelType::Dyn => f.write_str("dyn"),
            CelType::Bool => f.write_str("bool"),
            CelType::String => f.write_str("string"),
            CelType::Int => f.write_str("int"),
            CelType::Uint => f.write_str("uint"),
            CelType::Double => f.write_str("double"),
            CelType::Bytes => f.write_str("bytes"),
            CelType::Duration => f.write_str("google.protobuf.Duration"),
            CelType::Timestamp => f.write_str("google.protobuf.Timestamp"),
            CelType::List(elem) => write!(f, "list({})", elem),
            CelType::Map(key, value) => write!(f, "map({}, {})", key, value),
            CelType::Opaque(name) => f.write_str(name),
        }
    }
}

/// Closed set of types a caveat parameter can be declared with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableType {
    Any,
    Bool,
    String,
    Int,
    Uint,
    Double,
    Bytes,
    Duration,
    Timestamp,
    List(Box<VariableType>),
    /// Map with string keys
    Map(Box<VariableType>),
    IpAddress,
}

impl VariableType {
    pub fn list_of(elem: VariableType) -> Self {
        VariableType::List(Box::new(elem))
    }

    pub fn map_of(value: VariableType) -> Self {
        VariableType::Map(Box::new(value))
    }

    /// Keyword used for this type in schemas and encoded references
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableType::Any => "any",
            VariableType::Bool => "bool",
            VariableType::String => "string",
            VariableType::Int => "int",
            VariableType::Uint => "uint",
            VariableType::Double => "double",
            VariableType::Bytes => "bytes",
            VariableType::Duration => "duration",
            VariableType::Timestamp => "timestamp",
            VariableType::List(_) => "list",
            VariableType::Map(_) => "map",
            VariableType::IpAddress => IP_ADDRESS_TYPE,
        }
    }

    pub fn cel_type(&self) -> CelType {
        match self {
            VariableType::Any => CelType::Dyn,
            VariableType::Bool => CelType::Bool,
            VariableType::String => CelType::String,
            VariableType::Int => CelType::Int,
            VariableType::Uint => CelType::Uint,
            VariableType::Double => CelType::Double,
            VariableType::Bytes => CelType::Bytes,
            VariableType::Duration => CelType::Duration,
            VariableType::Timestamp => CelType::Timestamp,
            VariableType::List(elem) => CelType::List(Box::new(elem.cel_type())),
            VariableType::Map(value) => {
                CelType::Map(Box::new(CelType::String), Box::new(value.cel_type()))
            }
            VariableType::IpAddress => CelType::Opaque(IP_ADDRESS_TYPE.to_string()),
        }
    }

    pub fn encode(&self) -> CaveatTypeReference {
        let child_types = match self {
            VariableType::List(child) | VariableType::Map(child) => vec![child.encode()],
            _ => Vec::new(),
        };
        CaveatTypeReference {
            type_name: self.type_name().to_string(),
            child_types,
        }
    }

    /// Decodes an encoded type reference.
    ///
    /// # Errors
    ///
    /// Fails on unknown type names and on a wrong number of child types.
    pub fn decode(reference: &CaveatTypeReference) -> Result<Self> {
        let expected_children = match reference.type_name.as_str() {
            "list" | "map" => 1,
            _ => 0,
        };

        let leaf = match reference.type_name.as_str() {
            "any" => Some(VariableType::Any),
            "bool" => Some(VariableType::Bool),
            "string" => Some(VariableType::String),
            "int" => Some(VariableType::Int),
            "uint" => Some(VariableType::Uint),
            "double" => Some(VariableType::Double),
            "bytes" => Some(VariableType::Bytes),
            "duration" => Some(VariableType::Duration),
            "timestamp" => Some(VariableType::Timestamp),
            IP_ADDRESS_TYPE => Some(VariableType::IpAddress),
            "list" | "map" => None,
            other => return Err(CaveatError::UnknownTypeName(other.to_string())),
        };

        if reference.child_types.len() != expected_children {
            return Err(CaveatError::InvalidTypeArity {
                type_name: reference.type_name.clone(),
                expected: expected_children,
                found: reference.child_types.len(),
            });
        }

        if let Some(leaf) = leaf {
            return Ok(leaf);
        }

        let child = match reference.child_types.first() {
            Some(child) => Self::decode(child)?,
            None => {
                return Err(CaveatError::InvalidTypeArity {
                    type_name: reference.type_name.clone(),
                    expected: 1,
                    found: 0,
                })
            }
        };

        if reference.type_name == "list" {
            Ok(VariableType::list_of(child))
        } else {
            Ok(VariableType::map_of(child))
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableType::List(child) | VariableType::Map(child) => {
                write!(f, "{}<{}>", self.type_name(), child)
            }
            _ => f.write_str(self.type_name()),
        }
    }
}

/// Serializable descriptor of a parameter type, stored with caveat definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaveatTypeReference {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_types: Vec<CaveatTypeReference>,
}

/// Encodes every parameter type of a caveat
pub fn encode_parameter_types<'a, I>(parameters: I) -> BTreeMap<String, CaveatTypeReference>
where
    I: IntoIterator<Item = (&'a String, &'a VariableType)>,
{
    parameters
        .into_iter()
        .map(|(name, var_type)| (name.clone(), var_type.encode()))
        .collect()
}

/// Decodes stored parameter types back into variable types.
///
/// # Errors
///
/// Fails on the first reference that cannot be decoded.
pub fn decode_parameter_types(
    encoded: &BTreeMap<String, CaveatTypeReference>,
) -> Result<BTreeMap<String, VariableType>> {
    encoded
        .iter()
        .map(|(name, reference)| Ok((name.clone(), VariableType::decode(reference)?)))
        .collect()
}
