use thiserror::Error;

/// Malformed pricing input. The only failure surfaced to callers.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("passenger_count must be in range 1..={max}, got {actual}")]
    InvalidPassengerCount { actual: u32, max: u32 },
    #[error("{field} coordinates are invalid: ({latitude}, {longitude})")]
    InvalidCoordinates { field: &'static str, latitude: f64, longitude: f64 },
}

/// Unexpected failure downstream of validation. Recovered by the fallback quote.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComputationError {
    #[error("non-finite {signal} signal: {value}")]
    NonFiniteSignal { signal: &'static str, value: f64 },
    #[error("decimal overflow while computing {stage}")]
    Overflow { stage: &'static str },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum PricingError {
    #[error(transparent)]
    InvalidRequest(#[from] ValidationError),
}

impl PricingError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest(ValidationError::InvalidPassengerCount { .. }) => {
                "The number of passengers is not supported for this booking."
            }
            Self::InvalidRequest(ValidationError::InvalidCoordinates { .. }) => {
                "The pickup or dropoff location could not be recognised."
            }
        }
    }
}
