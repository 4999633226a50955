//! Error types for the solver.
//!
//! Configuration problems are reported before a run starts; numeric
//! anomalies abort a run as soon as they are detected.

use std::fmt;

/// Errors raised by the solver library
#[derive(Debug)]
pub enum SolverError {
    /// A configuration parameter is out of its valid range
    InvalidConfiguration {
        parameter: &'static str,
        reason: String,
    },
    /// The map has fewer than two cities
    TooFewCities { count: usize },
    /// A supplied initial tour is not a permutation of the cities
    InvalidInitialTour { reason: String },
    /// A temperature, delta or length became NaN or infinite during a run
    NumericAnomaly {
        iteration: usize,
        quantity: &'static str,
        value: f64,
    },
    /// Malformed input data (city files, config files)
    Parse(String),
    /// Underlying I/O failure
    Io(std::io::Error),
}

impl SolverError {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        SolverError::InvalidConfiguration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Whether this error was raised before any iteration ran
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidConfiguration { .. }
                | SolverError::TooFewCities { .. }
                | SolverError::InvalidInitialTour { .. }
        )
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::InvalidConfiguration { parameter, reason } => {
                write!(f, "Invalid configuration for '{}': {}", parameter, reason)
            }
            SolverError::TooFewCities { count } => write!(
                f,
                "Annealing needs at least 2 cities, got {}",
                count
            ),
            SolverError::InvalidInitialTour { reason } => {
                write!(f, "Initial tour is not a valid permutation: {}", reason)
            }
            SolverError::NumericAnomaly {
                iteration,
                quantity,
                value,
            } => write!(
                f,
                "Non-finite {} ({}) at iteration {}",
                quantity, value, iteration
            ),
            SolverError::Parse(msg) => write!(f, "Parse error: {}", msg),
            SolverError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SolverError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SolverError {
    fn from(e: std::io::Error) -> Self {
        SolverError::Io(e)
    }
}

impl From<serde_json::Error> for SolverError {
    fn from(e: serde_json::Error) -> Self {
        SolverError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
