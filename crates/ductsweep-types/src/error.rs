use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Geometry error in unit {unit} ({region}): {reason}")]
    Geometry {
        unit: usize,
        region: String,
        reason: String,
    },

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Update of unit {unit} failed: {source}")]
    WorkerFailed {
        unit: usize,
        #[source]
        source: Box<SweepError>,
    },

    #[error("Invalid sweep state: {0}")]
    InvalidState(String),

    #[error("Linear algebra error: {0}")]
    LinAlg(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SweepError {
    /// Wrap an error raised while updating `unit`.
    ///
    /// Errors that already carry a unit index are returned unchanged so the
    /// innermost attribution wins.
    pub fn in_unit(self, unit: usize) -> Self {
        match self {
            SweepError::WorkerFailed { .. } | SweepError::Geometry { .. } => self,
            other => SweepError::WorkerFailed {
                unit,
                source: Box::new(other),
            },
        }
    }

    /// Unit index responsible for the failure, if known.
    pub fn unit(&self) -> Option<usize> {
        match self {
            SweepError::WorkerFailed { unit, .. } | SweepError::Geometry { unit, .. } => {
                Some(*unit)
            }
            _ => None,
        }
    }
}

pub type SweepResult<T> = Result<T, SweepError>;
