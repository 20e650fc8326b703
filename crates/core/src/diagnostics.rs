//! Structured diagnostics and the sinks they are routed to.
//!
//! The engine never writes anywhere itself. It classifies what it finds into
//! [`Diagnostic`] events and hands them to an injected [`DiagnosticSink`]. The sinks here
//! cover the three destinations a check can be configured with:
//!
//! - [`TracingSink`]: the process log
//! - [`EchoSink`]: a writer, normally standard output
//! - [`CollectingSink`]: an in-memory list returned to the caller
//!
//! [`DiagnosticRouter`] fans one event out to any combination of them.

use crate::reconcile::CheckOptions;
use crate::resource::Resource;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        })
    }
}

/// What a diagnostic is about. Every condition the engine detects has exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// More than one legacy name column is set on a record
    MultipleNames,
    /// A qualified name does not fit the resource's layout
    MalformedPath,
    /// The name's qualification contradicts the resource's federation
    FederationMismatch,
    /// A `data/contents/` header was stripped from a name
    HeaderStripped,
    /// The recorded folder disagrees with the folder in the name
    FolderMismatch,
    /// A short name was qualified to an existing canonical path
    Qualified,
    /// An inferred canonical path does not exist in the grid
    InferredPathMissing,
    /// No usable name is recorded
    NoValidName,
    /// The grid could not answer an existence check
    StorageUnreachable,
    FederationPrefix,
    SkippedFederated,
    /// Step 1: a database record has no storage object
    DatabaseFileMissing,
    /// Step 2: a storage object has no database record
    StorageFileUnrecorded,
    /// Step 2: a collection could not be listed
    ListingFailed,
    /// Step 3: the resource's root collection is absent
    ResourceRootMissing,
    /// Summary naming a resource with a non-zero error count
    AffectedResource,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MultipleNames => "multiple_names",
            DiagnosticKind::MalformedPath => "malformed_path",
            DiagnosticKind::FederationMismatch => "federation_mismatch",
            DiagnosticKind::HeaderStripped => "header_stripped",
            DiagnosticKind::FolderMismatch => "folder_mismatch",
            DiagnosticKind::Qualified => "qualified",
            DiagnosticKind::InferredPathMissing => "inferred_path_missing",
            DiagnosticKind::NoValidName => "no_valid_name",
            DiagnosticKind::StorageUnreachable => "storage_unreachable",
            DiagnosticKind::FederationPrefix => "federation_prefix",
            DiagnosticKind::SkippedFederated => "skipped_federated",
            DiagnosticKind::DatabaseFileMissing => "database_file_missing",
            DiagnosticKind::StorageFileUnrecorded => "storage_file_unrecorded",
            DiagnosticKind::ListingFailed => "listing_failed",
            DiagnosticKind::ResourceRootMissing => "resource_root_missing",
            DiagnosticKind::AffectedResource => "affected_resource",
        }
    }

    /// Kinds that always increment a resource's error count.
    ///
    /// `StorageUnreachable` counts only when raised by the resource root check, so it is
    /// carried per event in [`Diagnostic::counted`] rather than here.
    pub fn counts_toward_total(self) -> bool {
        matches!(
            self,
            DiagnosticKind::DatabaseFileMissing
                | DiagnosticKind::StorageFileUnrecorded
                | DiagnosticKind::ListingFailed
                | DiagnosticKind::ResourceRootMissing
        )
    }
}

/// The resource (and optionally the file) a diagnostic refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticContext {
    pub short_id: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl DiagnosticContext {
    pub fn for_resource(resource: &Resource) -> Self {
        Self {
            short_id: resource.short_id.to_string(),
            resource_type: resource.resource_type.clone(),
            file: None,
        }
    }

    #[must_use]
    pub fn with_file(&self, file: Option<&str>) -> Self {
        Self {
            file: file.map(str::to_owned),
            ..self.clone()
        }
    }
}

/// One classified event emitted during a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub context: DiagnosticContext,
    /// Whether this event increments the resource's error count.
    pub counted: bool,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        context: DiagnosticContext,
        counted: bool,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            context,
            counted,
        }
    }

    pub fn info(kind: DiagnosticKind, message: impl Into<String>, context: DiagnosticContext) -> Self {
        Self::new(Severity::Info, kind, message, context, false)
    }

    pub fn warning(
        kind: DiagnosticKind,
        message: impl Into<String>,
        context: DiagnosticContext,
    ) -> Self {
        Self::new(Severity::Warning, kind, message, context, false)
    }

    /// An error that is reported but does not count toward the resource total.
    pub fn error(
        kind: DiagnosticKind,
        message: impl Into<String>,
        context: DiagnosticContext,
    ) -> Self {
        Self::new(Severity::Error, kind, message, context, false)
    }

    /// An error that counts toward the resource total.
    pub fn counted_error(
        kind: DiagnosticKind,
        message: impl Into<String>,
        context: DiagnosticContext,
    ) -> Self {
        Self::new(Severity::Error, kind, message, context, true)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Destination for diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: &Diagnostic);
}

/// Writes diagnostics to the process log through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        let short_id = diagnostic.context.short_id.as_str();
        let resource_type = diagnostic.context.resource_type.as_str();
        let kind = diagnostic.kind.as_str();
        match diagnostic.severity {
            Severity::Info => {
                tracing::info!(short_id, resource_type, kind, "{}", diagnostic.message)
            }
            Severity::Warning => {
                tracing::warn!(short_id, resource_type, kind, "{}", diagnostic.message)
            }
            Severity::Error => {
                tracing::error!(short_id, resource_type, kind, "{}", diagnostic.message)
            }
        }
    }
}

/// Writes one `SEVERITY: message` line per diagnostic.
pub struct EchoSink<W: Write> {
    out: W,
}

impl EchoSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> EchoSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DiagnosticSink for EchoSink<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        if let Err(e) = writeln!(self.out, "{}", diagnostic) {
            tracing::warn!("failed to echo diagnostic: {}", e);
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Number of collected diagnostics of `kind`.
    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Messages of the collected diagnostics that count toward the error total.
    pub fn counted_messages(&self) -> Vec<String> {
        self.diagnostics
            .iter()
            .filter(|d| d.counted)
            .map(|d| d.message.clone())
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// Fans diagnostics out to the sinks selected by [`CheckOptions`].
#[derive(Default)]
pub struct DiagnosticRouter {
    log: Option<TracingSink>,
    echo: Option<Box<dyn DiagnosticSink>>,
    collector: Option<CollectingSink>,
}

impl DiagnosticRouter {
    /// Builds a router with the process log, standard output and in-memory sinks enabled
    /// according to `options`.
    pub fn from_options(options: &CheckOptions) -> Self {
        Self {
            log: options.log_errors.then_some(TracingSink),
            echo: options
                .echo_errors
                .then(|| Box::new(EchoSink::stdout()) as Box<dyn DiagnosticSink>),
            collector: options.return_errors.then(CollectingSink::new),
        }
    }

    /// Replaces the echo destination, keeping it enabled.
    #[must_use]
    pub fn with_echo(mut self, echo: Box<dyn DiagnosticSink>) -> Self {
        self.echo = Some(echo);
        self
    }

    pub fn collected(&self) -> &[Diagnostic] {
        self.collector
            .as_ref()
            .map(CollectingSink::diagnostics)
            .unwrap_or_default()
    }

    /// Consumes the router, returning whatever was collected.
    pub fn into_collected(self) -> Vec<Diagnostic> {
        self.collector
            .map(CollectingSink::into_inner)
            .unwrap_or_default()
    }
}

impl DiagnosticSink for DiagnosticRouter {
    fn emit(&mut self, diagnostic: &Diagnostic) {
        if let Some(log) = self.log.as_mut() {
            log.emit(diagnostic);
        }
        if let Some(echo) = self.echo.as_mut() {
            echo.emit(diagnostic);
        }
        if let Some(collector) = self.collector.as_mut() {
            collector.emit(diagnostic);
        }
    }
}
