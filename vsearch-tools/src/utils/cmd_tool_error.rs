/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use thiserror::Error;
use vsearch::{VSError, recall::ComputeRecallError};

/// The error returned from the command line tools.
#[derive(Debug, Error)]
#[error("{details}")]
pub struct CMDToolError {
    pub details: String,
}

impl CMDToolError {
    pub fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
        }
    }
}

impl From<VSError> for CMDToolError {
    fn from(err: VSError) -> Self {
        Self {
            details: format!("{:?}: {err}", err.kind()),
        }
    }
}

impl From<ComputeRecallError> for CMDToolError {
    fn from(err: ComputeRecallError) -> Self {
        Self::from(VSError::from(err))
    }
}

impl From<std::io::Error> for CMDToolError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

pub type CMDResult<T> = Result<T, CMDToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vs_errors_keep_their_kind_and_message() {
        let err = VSError::invalid_argument("k must be positive");
        let err = CMDToolError::from(err);
        assert!(err.details.contains("k must be positive"), "{err}");
        assert!(err.details.starts_with("InvalidArgument"), "{err}");
    }

    #[test]
    fn recall_errors_convert() {
        let err = CMDToolError::from(ComputeRecallError::KExceedsN(5, 2));
        assert!(!err.details.is_empty());
    }
}
