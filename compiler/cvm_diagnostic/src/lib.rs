//! Diagnostic system for the cvm compiler.
//!
//! Every problem the compiler finds in a program is a [`Diagnostic`] with an
//! [`ErrorCode`], a message and the span it points at. Diagnostics go to a
//! [`Report`], which collects all of them for a unit instead of stopping at
//! the first.
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] is type-level proof that an error was reported:
//!
//! ```text
//! // Can only get ErrorGuaranteed by reporting an error
//! let guarantee = report.error(ErrorCode::E0103, span, message);
//!
//! // Functions return it to prove the failure was explained
//! fn resolve(...) -> Result<Overload, ErrorGuaranteed> { ... }
//! ```

mod diagnostic;
mod error_code;
mod guarantee;
mod report;

pub use diagnostic::{Diagnostic, Label};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use report::{Report, ReportConfig};
