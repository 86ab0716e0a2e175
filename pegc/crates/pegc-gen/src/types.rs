//! C++ result-type model for generated rules.

use std::fmt;

use pegc_par::ast::Sequence;

use crate::error::{CodeGenError, Result};

/// The C++ result type of a generated rule method.
///
/// Value-returning rules wrap their raw type in `std::optional`, whose
/// empty state doubles as the failure sentinel; boolean rules use `false`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CppType {
    raw: String,
    optional: bool,
}

impl CppType {
    /// The boolean result type of rules without semantic values.
    pub fn boolean() -> Self {
        Self {
            raw: "bool".to_string(),
            optional: false,
        }
    }

    /// An `std::optional`-wrapped semantic result type.
    pub fn optional(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            optional: true,
        }
    }

    /// The unwrapped type name.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the type is wrapped in `std::optional`.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// The expression a failing rule returns.
    pub fn null(&self) -> Result<&'static str> {
        if self.optional {
            Ok("std::nullopt")
        } else if self.raw == "bool" {
            Ok("false")
        } else {
            Err(CodeGenError::NoNullValue(self.raw.clone()))
        }
    }

    /// The accessor that unwraps a successful result.
    pub fn getter(&self) -> &'static str {
        if self.optional {
            ".value()"
        } else {
            ""
        }
    }
}

impl fmt::Display for CppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            write!(f, "std::optional<{}>", self.raw)
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// The result type a sequence produces on its own: boolean unless its
/// action assigns `$$`, in which case the default `ExprResult`.
pub fn sequence_result_type(sequence: &Sequence) -> CppType {
    if sequence.returns_value() {
        CppType::optional("ExprResult")
    } else {
        CppType::boolean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_type() {
        let t = CppType::boolean();
        assert_eq!(t.to_string(), "bool");
        assert_eq!(t.null().unwrap(), "false");
        assert_eq!(t.getter(), "");
    }

    #[test]
    fn test_optional_type() {
        let t = CppType::optional("int");
        assert_eq!(t.to_string(), "std::optional<int>");
        assert_eq!(t.raw(), "int");
        assert_eq!(t.null().unwrap(), "std::nullopt");
        assert_eq!(t.getter(), ".value()");
    }

    #[test]
    fn test_no_null_for_plain_type() {
        let t = CppType {
            raw: "int".to_string(),
            optional: false,
        };
        assert!(t.null().is_err());
    }
}
