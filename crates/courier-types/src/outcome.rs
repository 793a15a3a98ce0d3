//! Terminal result handed to reply callbacks.

use crate::envelope::Envelope;
use crate::error::BusError;

/// The resolution of one request.
///
/// A reply callback receives exactly one `Outcome`. On success it carries the
/// reply envelope, so the receiver can read the payload and, if the replier
/// asked for one, reply again.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = Envelope> {
    Success(T),
    Failure(BusError),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The success value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The failure, if any.
    pub fn failure(&self) -> Option<&BusError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(err) => Some(err),
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(err) => Outcome::Failure(err),
        }
    }

    pub fn into_result(self) -> Result<T, BusError> {
        self.into()
    }
}

impl<T> From<Outcome<T>> for Result<T, BusError> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, BusError>> for Outcome<T> {
    fn from(result: Result<T, BusError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(err),
        }
    }
}
