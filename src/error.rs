//! Error taxonomy for plan calculations and data loading

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while calculating a plan
///
/// Request-level validation errors abort the whole run. Every other error is
/// caught at the calculator boundary and reported against a single goal.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    /// Missing or invalid required input
    #[error("validation failed: {0}")]
    Validation(String),

    /// No matching portfolio, product or yield line where one is mandatory
    #[error("not found: {0}")]
    NotFound(String),

    /// The external life-insurance quoting call failed
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Unexpected numeric failure
    #[error("computation error: {0}")]
    Computation(String),
}

impl PlanError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlanError::Validation(_) => ErrorKind::Validation,
            PlanError::NotFound(_) => ErrorKind::NotFound,
            PlanError::ExternalService(_) => ErrorKind::ExternalService,
            PlanError::Computation(_) => ErrorKind::Computation,
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            PlanError::Validation(m)
            | PlanError::NotFound(m)
            | PlanError::ExternalService(m)
            | PlanError::Computation(m) => m,
        }
    }
}

/// Wire tag for an error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    ExternalService,
    Computation,
}

/// Errors raised while loading requests, settings or catalog data
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },
}
