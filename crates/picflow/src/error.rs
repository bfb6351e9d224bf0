// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for pipeline stages.

use crate::request::CacheChoice;

/// A terminal failure delivered by a producer.
///
/// Stages forward failures they receive unchanged. Cloning shares the underlying
/// cause, so a forwarded error carries the very cause the upstream stage raised.
///
/// # Examples
///
/// ```
/// use picflow::ProducerError;
///
/// let error = ProducerError::from_message("connection reset");
/// assert!(error.to_string().contains("connection reset"));
/// ```
#[ohno::error]
#[derive(Clone)]
#[display("producer failed")]
pub struct ProducerError {}

impl ProducerError {
    /// Creates a new error from any type that can be converted to an error.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// No disk tier is configured for the request's cache choice.
///
/// Reported through telemetry; the result is still delivered, just not cached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("got no disk cache for cache choice: {choice} (ordinal {ordinal})", ordinal = .choice.ordinal())]
pub struct NoDiskTierChosen {
    choice: CacheChoice,
}

impl NoDiskTierChosen {
    pub(crate) fn new(choice: CacheChoice) -> Self {
        Self { choice }
    }

    /// Returns the cache choice that could not be resolved.
    #[must_use]
    pub fn choice(&self) -> &CacheChoice {
        &self.choice
    }
}

/// A background task could not be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unable to spawn background task: {reason}")]
pub struct SpawnError {
    reason: String,
}

impl SpawnError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}
