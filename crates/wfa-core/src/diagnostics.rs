//! Non-fatal findings recorded while a ledger is computed.
//!
//! Telemetry rejected by the sanity filter, frozen met-mast sensors, alarms
//! the normaliser discards and rows left without a potential energy do not
//! abort a period. They land in [`Diagnostics`], which is serialised next to
//! the ledger as `diagnostics.json`.
//!
//! ```
//! use wfa_core::diagnostics::{Diagnostics, IssueCategory};
//!
//! let mut diag = Diagnostics::new();
//! diag.warn(IssueCategory::Sanity, "3 row(s) of 'grid' outside physical limits");
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.summary(), "1 warning");
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Data was discarded or nulled; the period still completed
    Warning,
    /// A ledger row is incomplete
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Pipeline stage a finding comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    /// Telemetry outside physical limits
    Sanity,
    /// Repeated met-mast values
    Stuck,
    /// Alarms dropped by normalisation
    Alarms,
    /// Rows no estimation tier could resolve
    Estimation,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Sanity => "sanity",
            IssueCategory::Stuck => "stuck",
            IssueCategory::Alarms => "alarms",
            IssueCategory::Estimation => "estimation",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub message: String,
    /// What the finding is about, e.g. `"turbine 2307405"` or `"table grid"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// First affected bin, for row-level findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
}

impl DiagnosticIssue {
    pub fn warning(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, category, message)
    }

    pub fn error(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, category, message)
    }

    fn with_severity(severity: Severity, category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            entity: None,
            timestamp: None,
        }
    }

    pub fn about(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.severity.as_str(),
            self.category.as_str(),
            self.message
        )?;
        if let Some(entity) = &self.entity {
            write!(f, " ({entity})")?;
        }
        if let Some(ts) = self.timestamp {
            write!(f, " from {ts}")?;
        }
        Ok(())
    }
}

/// Findings for one period, in the order they were raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn warn(&mut self, category: IssueCategory, message: impl Into<String>) {
        self.push(DiagnosticIssue::warning(category, message));
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn in_category(&self, category: IssueCategory) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// `"clean"`, or the warning and error counts.
    pub fn summary(&self) -> String {
        fn plural(n: usize, word: &str) -> String {
            if n == 1 {
                format!("1 {word}")
            } else {
                format!("{n} {word}s")
            }
        }
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "clean".to_string(),
            (w, 0) => plural(w, "warning"),
            (0, e) => plural(e, "error"),
            (w, e) => format!("{}, {}", plural(w, "warning"), plural(e, "error")),
        }
    }
}

impl Extend<DiagnosticIssue> for Diagnostics {
    fn extend<I: IntoIterator<Item = DiagnosticIssue>>(&mut self, iter: I) {
        self.issues.extend(iter);
    }
}

/// Row counts discarded (or values nulled) by the sanity filter, per table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SanityStats {
    pub grid_dropped: usize,
    pub counter_dropped: usize,
    pub turbine_dropped: usize,
    pub curtailment_dropped: usize,
    pub met_values_nulled: usize,
    pub met_values_stuck: usize,
}

impl SanityStats {
    pub fn total_dropped(&self) -> usize {
        self.grid_dropped + self.counter_dropped + self.turbine_dropped + self.curtailment_dropped
    }
}
