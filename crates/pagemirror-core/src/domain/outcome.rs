//! Outcome of a best-effort step
//!
//! Per-item work (one block upsert, one asset fetch) never aborts the run.
//! It resolves to a [`StepOutcome`] that callers collect into reports.
//! Fatal failures are plain `Err` values instead.

use std::fmt::{self, Display, Formatter};

/// Result class of a recoverable step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step completed and its effect is in place
    Applied,
    /// The step was skipped; the reason has already been logged
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(StepOutcome::Applied.to_string(), "applied");
        assert_eq!(
            StepOutcome::skipped("timeout").to_string(),
            "skipped: timeout"
        );
        assert!(!StepOutcome::skipped("x").is_applied());
    }
}
