// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Error taxonomy and diagnostic plumbing.
//!
//! The core never panics on caller-supplied input at parse time; instead it
//! routes problems through one of two channels. Catalog-definition mistakes
//! (programmer errors, made before parsing even starts) surface as
//! [`GetoptError::Logic`] and are expected to propagate, not be caught as
//! normal control flow. Anything encountered while draining one source
//! (a config file, the environment variable, one argv) is reported through
//! the injected [`DiagnosticSink`] and accumulated; once the source is fully
//! drained, a single [`GetoptError::Parse`] is raised if anything fired.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Severity of a single diagnostic emitted while draining one source.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One diagnostic message produced while parsing a single source.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A caller-injected callback that receives every diagnostic as it is
/// produced. The default, installed by [`set_diagnostic_sink`] never being
/// called, forwards to the `log` crate at the matching level.
pub type DiagnosticSink = Arc<dyn Fn(Severity, &str) + Send + Sync>;

fn default_sink() -> DiagnosticSink {
    Arc::new(|severity, message| match severity {
        Severity::Info => log::info!("{message}"),
        Severity::Warning => log::warn!("{message}"),
        Severity::Error => log::error!("{message}"),
    })
}

static SINK: Mutex<Option<DiagnosticSink>> = Mutex::new(None);

/// Install the process-wide diagnostic sink. This is global mutable state by
/// design: the callback must be reachable from deep inside the parser
/// without threading it through every call.
pub fn set_diagnostic_sink(sink: DiagnosticSink) {
    *SINK.lock() = Some(sink);
}

/// Reset to the default `log`-crate-backed sink. Mainly useful in tests.
pub fn reset_diagnostic_sink() {
    *SINK.lock() = None;
}

pub(crate) fn emit(diagnostic: &Diagnostic) {
    let sink = SINK.lock().clone().unwrap_or_else(default_sink);
    sink(diagnostic.severity, &diagnostic.message);
}

/// A collector that accumulates diagnostics for a single source (one config
/// file, the environment variable string, one argv) and, once the source is
/// fully drained, turns them into a [`GetoptError::Parse`] if any `Error`
/// severity diagnostic was recorded.
#[derive(Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    had_error: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        emit(&diagnostic);
        if diagnostic.severity == Severity::Error {
            self.had_error = true;
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::error(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Diagnostic::warning(message));
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Consume the collector, raising `GetoptError::Parse` iff any error
    /// severity diagnostic was recorded.
    pub fn finish(self) -> Result<(), GetoptError> {
        if self.had_error {
            Err(GetoptError::Parse(
                self.diagnostics.into_iter().map(|d| d.message).collect(),
            ))
        } else {
            Ok(())
        }
    }
}

/// The core's error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum GetoptError {
    /// A catalog-definition mistake: duplicate option, missing short name,
    /// unresolved alias target, unknown validator factory, two
    /// `DEFAULT_OPTION`s, and the like. A programmer error; never expected
    /// to be caught as normal control flow.
    #[error("{0}")]
    Logic(String),

    /// A query method (`is_defined`, `get_string`, …) was invoked before
    /// parsing completed.
    #[error("{0}")]
    Initialization(String),

    /// `get_string(name, index)` (or similar) was asked for an out-of-range
    /// index.
    #[error("option --{option} has no value at index {index}")]
    Undefined { option: String, index: i64 },

    /// One or more parse-time diagnostics fired while draining a source.
    /// Carries the rendered messages, in the order they were produced.
    #[error("{} error(s) found on the command line, environment variable, or configuration file:\n{}", .0.len(), .0.join("\n"))]
    Parse(Vec<String>),

    /// A system option (`--help`, `--version`, …) was consumed; the caller
    /// should exit with this code after the designated text (already
    /// delivered through the diagnostic sink) has been shown.
    #[error("exit requested with code {code}")]
    Exit { code: i32 },
}

impl GetoptError {
    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic(message.into())
    }

    pub fn initialization(message: impl Into<String>) -> Self {
        Self::Initialization(message.into())
    }
}
