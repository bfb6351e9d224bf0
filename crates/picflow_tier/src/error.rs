// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for disk tier operations.

/// An error from a disk tier operation.
///
/// This is an opaque error type that can wrap any underlying error from a tier
/// implementation. Use [`std::error::Error::source()`] to access the underlying
/// cause if needed.
///
/// # Example
///
/// ```
/// use picflow_tier::Error;
///
/// let error = Error::from_message("disk full");
/// assert!(error.to_string().contains("disk full"));
/// ```
#[ohno::error]
#[from(std::io::Error)]
#[display("disk tier operation failed")]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// This is the public API for creating tier errors from external crates.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for disk tier operations.
pub type Result<T> = std::result::Result<T, Error>;
