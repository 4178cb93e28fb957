//! Error and warning types shared by the planner.
//!
//! Fatal conditions are [`PlannerError`] values returned through
//! [`PlannerResult`]. Conditions that must be surfaced to the caller without
//! failing the call are [`StoreWarning`] values carried by an [`Outcome`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Error type for planner operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("Name not resolved: {0}")]
    NameNotResolved(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration not found: {0}")]
    ConfigurationNotFound(String),

    #[error("Date not in plan: {0}")]
    DateNotInPlan(NaiveDate),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid visibility window: {0}")]
    InvalidWindow(String),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Unknown observing site: {0}")]
    UnknownSite(String),

    #[error("Invalid observing site: {0}")]
    InvalidSite(String),

    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PlannerError {
    /// Whether retrying the same call could succeed.
    ///
    /// Only transport failures of the name-resolution service qualify; a
    /// definitive "not found" answer is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlannerError::Network(_))
    }
}

/// Non-fatal condition raised while mutating or querying planner state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreWarning {
    /// A configuration with the same name already existed and was replaced.
    ConfigurationOverwritten { name: String },
    /// A configuration selected for an offset star has no coordinate.
    MissingCoordinates { configuration: String },
    /// A plan target has no resolved coordinate and was left out.
    TargetWithoutCoordinates { target: String },
}

impl std::fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreWarning::ConfigurationOverwritten { name } => {
                write!(f, "configuration '{}' already existed and was overwritten", name)
            }
            StoreWarning::MissingCoordinates { configuration } => write!(
                f,
                "configuration '{}' has no coordinates; offset star skipped",
                configuration
            ),
            StoreWarning::TargetWithoutCoordinates { target } => {
                write!(f, "target '{}' has no coordinates; visibility skipped", target)
            }
        }
    }
}

/// Successful result of an operation together with the warnings it raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<StoreWarning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<StoreWarning>) -> Self {
        Self { value, warnings }
    }

    /// Record a warning, mirroring it to the log.
    pub fn warn(&mut self, warning: StoreWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_parts(self) -> (T, Vec<StoreWarning>) {
        (self.value, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(PlannerError::Network("timeout".into()).is_retryable());
        assert!(!PlannerError::NameNotResolved("M999".into()).is_retryable());
        assert!(!PlannerError::InvalidCoordinate("abc".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = PlannerError::ConfigurationNotFound("primary".to_string());
        assert_eq!(err.to_string(), "Configuration not found: primary");

        let date = NaiveDate::from_ymd_opt(2022, 2, 25).unwrap();
        let err = PlannerError::DateNotInPlan(date);
        assert_eq!(err.to_string(), "Date not in plan: 2022-02-25");
    }

    #[test]
    fn test_outcome_collects_warnings() {
        let mut outcome = Outcome::new(3);
        assert!(!outcome.has_warnings());

        outcome.warn(StoreWarning::ConfigurationOverwritten {
            name: "primary".into(),
        });
        let mapped = outcome.map(|v| v * 2);
        assert_eq!(mapped.value, 6);
        assert_eq!(mapped.warnings.len(), 1);
    }

    #[test]
    fn test_warning_serialization_is_tagged() {
        let warning = StoreWarning::MissingCoordinates {
            configuration: "tertiary".into(),
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "missing_coordinates");
        assert_eq!(json["configuration"], "tertiary");
    }
}
