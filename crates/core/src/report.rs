//! Check results returned to callers.

use crate::diagnostics::Diagnostic;
use chrono::{DateTime, Utc};
use gridcheck_types::ShortId;
use serde::Serialize;

/// Outcome of checking one resource.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub short_id: ShortId,
    pub error_count: usize,
    /// Messages of the counted errors. Only filled when errors are returned.
    pub errors: Vec<String>,
    /// Every diagnostic emitted. Only filled when errors are returned.
    pub diagnostics: Vec<Diagnostic>,
    /// Summary line for a resource with errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl CheckReport {
    pub fn is_consistent(&self) -> bool {
        self.error_count == 0
    }
}

/// Outcome of checking a batch of resources.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub resources_checked: usize,
    pub total_errors: usize,
    /// Resources with at least one error, in check order.
    pub affected: Vec<ShortId>,
    /// Resources whose check stopped at their first error.
    pub aborted: Vec<ShortId>,
    pub reports: Vec<CheckReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn is_consistent(&self) -> bool {
        self.total_errors == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticContext, DiagnosticKind};

    #[test]
    fn report_serializes_with_kinds_and_timestamp() {
        let report = CheckReport {
            short_id: ShortId::new("abc").unwrap(),
            error_count: 1,
            errors: vec!["root missing".into()],
            diagnostics: vec![Diagnostic::counted_error(
                DiagnosticKind::ResourceRootMissing,
                "root missing",
                DiagnosticContext {
                    short_id: "abc".into(),
                    resource_type: "CompositeResource".into(),
                    file: None,
                },
            )],
            summary: None,
            checked_at: Utc::now(),
        };

        let value = serde_json::to_value(&report).unwrap();

        assert!(!report.is_consistent());
        assert_eq!(value["short_id"], "abc");
        assert_eq!(value["diagnostics"][0]["kind"], "resource_root_missing");
        assert_eq!(value["diagnostics"][0]["severity"], "error");
        assert!(value["diagnostics"][0]["context"].get("file").is_none());
        assert!(value.get("summary").is_none());
        assert!(value["checked_at"].is_string());
    }
}
