//! Structured diagnostics produced by checkers and the resolution engine.
//!
//! [`Diagnostic`] carries a severity, a category-prefixed code, a message and
//! a source span. The thread-safe [`DiagnosticSink`] accumulates diagnostics
//! while several files are checked in parallel.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
