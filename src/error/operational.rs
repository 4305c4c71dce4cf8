//! Operational error context via `anyhow`.
//!
//! Host-facing operations that cross several error domains (disk plus
//! validation, for example) attach human-readable context instead of
//! growing the typed enums.

use std::{error::Error as StdError, fmt::Display};

use anyhow::{Context, Result as AnyhowResult};

/// Attaches operation-level context to any typed error.
pub trait ResultExt<T, E> {
    /// Wraps the error with a fixed context message.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Wraps the error with a formatted context message.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::operational::ResultExt, store::StoreError};

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<(), StoreError> = Err(StoreError::NotFound {
            path: "plan/act1/gone.md".to_string(),
        });
        let with_context = result.add_context("Loading plan document");

        let error = with_context.unwrap_err();
        assert!(error.to_string().contains("Loading plan document"));
        assert!(error.chain().any(|cause| cause.to_string().contains("gone.md")));
    }

    #[test]
    fn test_result_ext_with_contextf() {
        let result: Result<(), StoreError> = Err(StoreError::AccessDenied {
            path: "plan".to_string(),
        });
        let with_context = result.add_contextf(format_args!("Scanning part {}", 3));

        assert!(with_context.unwrap_err().to_string().contains("Scanning part 3"));
    }
}
