//! Error types for Weft operations.
//!
//! This module provides the main error type [`WeftError`] which wraps every
//! failure that can occur while composing and instantiating a fixture tree.
//! All failures are synchronous and abort the whole in-progress walk: there
//! is no retry and no rollback of objects already produced by sibling
//! subtrees.

use thiserror::Error;

use weft_core::{CoreError, Id};

/// The main error type for Weft operations.
#[derive(Debug, Error)]
pub enum WeftError {
    /// Argument classification or spec merging failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Factory-name completion exhausted every ancestor-derived candidate
    /// and the literal name itself.
    #[error("factory `{name}` is not defined")]
    UnknownType { name: Id },

    /// Association metadata was requested for a factory the registry does
    /// not know.
    #[error("factory `{name}` is not registered")]
    UnregisteredType { name: Id },

    /// Opaque passthrough of a construction-provider failure.
    #[error("provider error: {0}")]
    Provider(Box<dyn std::error::Error>),
}

impl WeftError {
    /// Wraps a provider failure.
    pub fn provider(error: impl std::error::Error + 'static) -> Self {
        Self::Provider(Box::new(error))
    }
}
