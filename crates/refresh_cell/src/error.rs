// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache cell operations.

/// An error from a cache cell operation or a value loader.
///
/// This is an opaque error type that can wrap any underlying error raised by a
/// [`ValueLoader`](crate::ValueLoader) or reported by a pending reload. The cell
/// enriches errors it propagates with the stage that failed; use
/// [`std::error::Error::source()`] to reach the original cause.
///
/// # Example
///
/// ```
/// use refresh_cell::Error;
///
/// let error = Error::from_message("backend unavailable");
/// assert!(error.to_string().contains("backend unavailable"));
/// ```
#[ohno::error]
#[derive(Clone)]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use refresh_cell::Error;
    ///
    /// let error = Error::from_message("load failed");
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for cache cell operations.
pub type Result<T> = std::result::Result<T, Error>;
