//! Weft Core Types
//!
//! This crate provides the foundational types for the Weft fixture
//! composition engine. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Spec nodes**: The tree node describing one planned construction
//!   ([`spec::SpecNode`]) with its merge semantics
//! - **Arguments**: The classifier that partitions loosely-typed argument
//!   lists into spec-node fields ([`args::classify`])

pub mod args;
pub mod error;
pub mod identifier;
pub mod spec;

pub use args::{Arg, ClassifiedArgs, classify};
pub use error::CoreError;
pub use identifier::Id;
pub use spec::{AttrMap, Finalizer, SpecNode, TraitArg, Variation};
