//! Error types for telemdb core.

use crate::control::Subject;
use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while arbitrating control of a resource.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The caller does not hold (or cannot acquire) control.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of why authorization failed.
        message: String,
        /// The subject currently in control, if any.
        holder: Option<Subject>,
    },

    /// A configuration field or request was invalid.
    #[error("validation error: {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// The request describes a layout the controller does not support.
    #[error("unsupported configuration: {message}")]
    UnsupportedConfiguration {
        /// Description of the configuration.
        message: String,
    },

    /// The resource for a new region could not be opened.
    #[error("failed to open resource: {source}")]
    OpenResource {
        /// The error returned by the open callback.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A control update could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ControlError {
    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>, holder: Option<Subject>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            holder,
        }
    }

    /// Creates a validation error for `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates an unsupported configuration error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Wraps an error produced while opening a resource.
    pub fn open_resource(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::OpenResource {
            source: source.into(),
        }
    }

    /// Returns true for [`ControlError::Unauthorized`].
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns true for [`ControlError::Validation`].
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the subject in control at the time of an unauthorized error.
    #[must_use]
    pub fn holder(&self) -> Option<&Subject> {
        match self {
            Self::Unauthorized { holder, .. } => holder.as_ref(),
            _ => None,
        }
    }
}
