//! Deals with types

use std::str::FromStr;
use strum_macros::Display;

/// The type tag of a value, and the vocabulary of type annotations.
///
/// Only a subset of these can be written in source (`int`, `float`, `bool`,
/// `string`, `None`), the reference types only appear at runtime and in the
/// symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum DataType {
    #[default]
    None,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "string")]
    String,
    #[strum(serialize = "function")]
    Function,
    #[strum(serialize = "native_function")]
    Native,
    #[strum(serialize = "prism")]
    Prism,
}

/// Returned when a type annotation names something that is not a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownType(pub String);

impl FromStr for DataType {
    type Err = UnknownType;

    /// parses a type annotation as it appears after `:` or `>>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "int" => DataType::Int,
            "float" => DataType::Float,
            "bool" => DataType::Bool,
            "string" => DataType::String,
            "None" => DataType::None,
            other => return Err(UnknownType(other.to_owned())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotations_parse() {
        assert_eq!("int".parse(), Ok(DataType::Int));
        assert_eq!("None".parse(), Ok(DataType::None));
        assert_eq!(
            "function".parse::<DataType>(),
            Err(UnknownType("function".into()))
        );
    }

    #[test]
    fn names_match_runtime_type_names() {
        assert_eq!(DataType::Native.to_string(), "native_function");
        assert_eq!(DataType::None.to_string(), "None");
        assert_eq!(DataType::String.to_string(), "string");
    }
}
