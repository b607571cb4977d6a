//! The diagnostic sink threaded through compilation.
//!
//! Features:
//! - Every diagnostic of a unit is collected; nothing aborts compilation
//! - Identical reports (same code, span and message) are kept once; reports
//!   at `Span::DUMMY` are always kept
//! - Optional error limit
//! - `ErrorGuaranteed` proof that errors were emitted

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use cvm_ir::Span;

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

/// Configuration for diagnostic collection.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ReportConfig {
    /// Maximum number of errors kept (0 = unlimited).
    pub error_limit: usize,
    /// Drop reports identical to one already collected at the same real span.
    pub deduplicate: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            error_limit: 0,
            deduplicate: true,
        }
    }
}

/// Collects diagnostics for one compilation unit.
#[derive(Clone, Debug, Default)]
pub struct Report {
    diagnostics: Vec<Diagnostic>,
    /// (code, primary span, message hash) of everything collected so far.
    seen: HashSet<(ErrorCode, Span, u64)>,
    error_count: usize,
    /// Errors dropped because the limit was reached.
    suppressed: usize,
    config: ReportConfig,
}

#[inline]
fn message_hash(msg: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    msg.hash(&mut hasher);
    hasher.finish()
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ReportConfig) -> Self {
        Report {
            config,
            ..Self::default()
        }
    }

    /// Add an error.
    ///
    /// Duplicates and over-limit errors are dropped but still count as
    /// reported, so the guarantee is always returned. Reports without a real
    /// span are never treated as duplicates of each other.
    pub fn report(&mut self, diag: Diagnostic) -> ErrorGuaranteed {
        if self.config.deduplicate {
            if let Some(span) = diag.primary_span().filter(|s| !s.is_dummy()) {
                let key = (diag.code, span, message_hash(&diag.message));
                if !self.seen.insert(key) {
                    return ErrorGuaranteed::new();
                }
            }
        }

        if self.config.error_limit > 0 && self.error_count >= self.config.error_limit {
            self.suppressed += 1;
            return ErrorGuaranteed::new();
        }
        self.error_count += 1;

        tracing::debug!(
            code = %diag.code,
            message = %diag.message,
            "diagnostic reported"
        );
        self.diagnostics.push(diag);
        ErrorGuaranteed::new()
    }

    /// Report an error at `span`.
    pub fn error(
        &mut self,
        code: ErrorCode,
        span: Span,
        message: impl Into<String>,
    ) -> ErrorGuaranteed {
        let diag = Diagnostic::error(code)
            .with_label(span, code.description())
            .with_message(message);
        self.report(diag)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0 || self.suppressed > 0
    }

    /// Number of errors kept.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of errors dropped by the error limit.
    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    /// Number of kept diagnostics carrying `code`.
    pub fn count_of(&self, code: ErrorCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Proof that errors were reported, if any were.
    pub fn guarantee(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count + self.suppressed)
    }
}
