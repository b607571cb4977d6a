//! Error codes for compiler diagnostics.
//!
//! Codes follow the numbering C# and MSVC users already know for the same
//! conditions, so a code can be searched for and compared against other
//! C-family toolchains.

use std::fmt;

/// Error codes for all compiler diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Operator cannot be applied to operands
    E0019,
    /// Struct value used where a scalar is required
    E0020,
    /// Invalid conversion
    E0030,
    /// Unresolved name
    E0103,
    /// Duplicate definition with the same parameter types
    E0111,
    /// Member access on a non-struct expression
    E0119,
    /// Missing return value
    E0126,
    /// Value returned from a void function
    E0127,
    /// Duplicate local variable
    E0128,
    /// Assignment target is not an lvalue
    E0131,
    /// Unknown type name
    E0246,
    /// Unknown struct member
    E1061,
    /// Too few arguments
    E1501,
    /// No overload accepts the argument types
    E1503,
    /// Declared but never defined
    E2019,
    /// Call target is not a function
    E2064,
}

impl ErrorCode {
    pub const ALL: &[ErrorCode] = &[
        ErrorCode::E0019,
        ErrorCode::E0020,
        ErrorCode::E0030,
        ErrorCode::E0103,
        ErrorCode::E0111,
        ErrorCode::E0119,
        ErrorCode::E0126,
        ErrorCode::E0127,
        ErrorCode::E0128,
        ErrorCode::E0131,
        ErrorCode::E0246,
        ErrorCode::E1061,
        ErrorCode::E1501,
        ErrorCode::E1503,
        ErrorCode::E2019,
        ErrorCode::E2064,
    ];

    /// Get the code as a string (e.g., "E1501").
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E0019 => "E0019",
            ErrorCode::E0020 => "E0020",
            ErrorCode::E0030 => "E0030",
            ErrorCode::E0103 => "E0103",
            ErrorCode::E0111 => "E0111",
            ErrorCode::E0119 => "E0119",
            ErrorCode::E0126 => "E0126",
            ErrorCode::E0127 => "E0127",
            ErrorCode::E0128 => "E0128",
            ErrorCode::E0131 => "E0131",
            ErrorCode::E0246 => "E0246",
            ErrorCode::E1061 => "E1061",
            ErrorCode::E1501 => "E1501",
            ErrorCode::E1503 => "E1503",
            ErrorCode::E2019 => "E2019",
            ErrorCode::E2064 => "E2064",
        }
    }

    /// The integer code reported to hosts (e.g., 1501).
    pub fn number(&self) -> u32 {
        self.as_str()[1..].parse().unwrap_or(0)
    }

    /// Look up a code by its integer value.
    pub fn from_number(number: u32) -> Option<ErrorCode> {
        Self::ALL.iter().copied().find(|c| c.number() == number)
    }

    /// One-line description used by documentation and `Debug` output of reports.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::E0019 => "operator cannot be applied to operands",
            ErrorCode::E0020 => "struct value used as a scalar",
            ErrorCode::E0030 => "invalid conversion",
            ErrorCode::E0103 => "unresolved symbol",
            ErrorCode::E0111 => "duplicate definition",
            ErrorCode::E0119 => "invalid receiver",
            ErrorCode::E0126 => "missing return value",
            ErrorCode::E0127 => "value returned from void function",
            ErrorCode::E0128 => "duplicate local variable",
            ErrorCode::E0131 => "assignment target is not an lvalue",
            ErrorCode::E0246 => "unknown type",
            ErrorCode::E1061 => "unknown member",
            ErrorCode::E1501 => "arity mismatch",
            ErrorCode::E1503 => "no matching overload",
            ErrorCode::E2019 => "declared but never defined",
            ErrorCode::E2064 => "call target is not a function",
        }
    }

    /// Errors produced while resolving a call target.
    pub fn is_call_resolution_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::E0103
                | ErrorCode::E0119
                | ErrorCode::E1061
                | ErrorCode::E1501
                | ErrorCode::E1503
                | ErrorCode::E2064
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
