//! Error types for spec-node construction and merging.

use thiserror::Error;

use crate::identifier::Id;
use crate::spec::Variation;

/// Errors raised while classifying arguments or merging spec nodes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Two spec nodes can only be merged when their variation and factory
    /// name match exactly.
    #[error(
        "cannot merge spec for {found_variation:?} `{found_factory}` into \
         spec for {expected_variation:?} `{expected_factory}`"
    )]
    IncompatibleMerge {
        expected_variation: Variation,
        expected_factory: Id,
        found_variation: Variation,
        found_factory: Id,
    },

    /// The classifier saw an argument it cannot place into children, traits,
    /// or attributes.
    #[error("unsupported argument for spec construction: {kind}")]
    UnsupportedArgument { kind: &'static str },
}
