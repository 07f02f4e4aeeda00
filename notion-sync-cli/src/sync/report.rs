//! Per-row outcomes and the run summary

use serde_json::{Map, Value};
use std::fmt;

use super::properties::UnresolvedColumn;

/// Terminal state of one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowStatus {
    Created { page_id: String },
    Updated { page_id: String },
    /// Empty unique key; nothing was sent
    Skipped,
    /// The core upsert failed
    Failed { error: String },
    /// Dry run: payload built, nothing written
    Planned {
        properties: Map<String, Value>,
        cover: Option<String>,
    },
}

impl RowStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RowStatus::Created { .. } | RowStatus::Updated { .. } | RowStatus::Planned { .. }
        )
    }

    /// Page the row was written to
    pub fn page_id(&self) -> Option<&str> {
        match self {
            RowStatus::Created { page_id } | RowStatus::Updated { page_id } => Some(page_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowOutcome {
    /// Sheet row number as shown to operators (header is row 1)
    pub row_number: usize,
    pub key: String,
    pub status: RowStatus,
}

/// Everything a sync run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub outcomes: Vec<RowOutcome>,
    /// Mapped columns that were ignored for the whole run
    pub unresolved: Vec<UnresolvedColumn>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn summary(&self) -> SyncSummary {
        let mut summary = SyncSummary::default();
        for outcome in &self.outcomes {
            if matches!(outcome.status, RowStatus::Skipped) {
                summary.skipped += 1;
            } else if outcome.status.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, RowStatus::Failed { .. }))
    }
}

/// Row counts shown at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {}, Skipped: {}, Failed: {}",
            self.succeeded, self.skipped, self.failed
        )
    }
}
