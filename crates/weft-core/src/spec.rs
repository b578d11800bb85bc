//! The specification node: one planned construction and its nested
//! constructions.
//!
//! A [`SpecNode`] describes *what* to build: a factory name, traits,
//! attributes, child specs, and an optional finalizer. It does not build
//! anything. Nodes are assembled from loosely-typed argument lists (see
//! [`crate::args`]), optionally merged with other compatible nodes, and
//! consumed by an instantiator that walks the tree.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::args::{Arg, classify};
use crate::error::CoreError;
use crate::identifier::Id;

/// How many objects a spec node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variation {
    /// One object.
    Unit,
    /// Exactly two objects.
    Pair,
    /// A caller-sized sequence of objects.
    List,
}

/// A trait passed to the construction provider alongside a factory name.
///
/// Integers are accepted anywhere a trait is accepted, as positional
/// shorthand for repeat counts. They are not interpreted by this crate; the
/// provider's list strategy reads the leading count itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraitArg {
    Name(Id),
    Count(u64),
}

impl From<Id> for TraitArg {
    fn from(name: Id) -> Self {
        Self::Name(name)
    }
}

impl From<&str> for TraitArg {
    fn from(name: &str) -> Self {
        Self::Name(Id::new(name))
    }
}

impl From<u64> for TraitArg {
    fn from(count: u64) -> Self {
        Self::Count(count)
    }
}

/// Insertion-ordered attribute map. Keys are unique; merging is
/// last-write-wins.
pub type AttrMap<O> = IndexMap<Id, O>;

/// A callback invoked with each constructed object after its children have
/// been built.
pub type Finalizer<O> = Rc<dyn Fn(&O)>;

/// A tree node describing one planned construction.
///
/// Mutable while it is being assembled from arguments, immutable once handed
/// to an instantiator. Merging produces a new node and leaves the operands
/// untouched, except for the plain-node shortcut documented on
/// [`SpecNode::merge`].
#[derive(Clone)]
pub struct SpecNode<O> {
    variation: Variation,
    factory: Id,
    children: Vec<SpecNode<O>>,
    traits: Vec<TraitArg>,
    attrs: AttrMap<O>,
    finalizer: Option<Finalizer<O>>,
}

impl<O> SpecNode<O> {
    /// Creates a plain node: no children, traits, attributes, or finalizer.
    pub fn new(variation: Variation, factory: Id) -> Self {
        Self {
            variation,
            factory,
            children: Vec::new(),
            traits: Vec::new(),
            attrs: AttrMap::new(),
            finalizer: None,
        }
    }

    /// Creates a node by classifying `args` into children, traits, and
    /// attributes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedArgument`] when an argument cannot be
    /// placed (see [`crate::args::classify`]).
    pub fn build(
        variation: Variation,
        factory: Id,
        args: Vec<Arg<O>>,
        finalizer: Option<Finalizer<O>>,
    ) -> Result<Self, CoreError> {
        let classified = classify(args)?;
        Ok(Self {
            variation,
            factory,
            children: classified.children,
            traits: classified.traits,
            attrs: classified.attrs,
            finalizer,
        })
    }

    pub fn variation(&self) -> Variation {
        self.variation
    }

    pub fn factory(&self) -> Id {
        self.factory
    }

    pub fn children(&self) -> &[SpecNode<O>] {
        &self.children
    }

    pub fn traits(&self) -> &[TraitArg] {
        &self.traits
    }

    pub fn attrs(&self) -> &AttrMap<O> {
        &self.attrs
    }

    pub fn finalizer(&self) -> Option<&Finalizer<O>> {
        self.finalizer.as_ref()
    }

    /// Whether this node carries nothing beyond its variation and factory
    /// name.
    ///
    /// Plain nodes short-circuit [`SpecNode::merge`].
    pub fn is_plain(&self) -> bool {
        self.children.is_empty()
            && self.traits.is_empty()
            && self.attrs.is_empty()
            && self.finalizer.is_none()
    }

    /// Merges `other` into this node, producing the combined spec.
    ///
    /// Children and traits concatenate in argument order; attributes overlay
    /// with `other` winning on key collision; finalizers compose so that
    /// `self`'s runs before `other`'s. If either side is plain the other is
    /// returned unchanged; callers that repeatedly reuse a template node
    /// rely on this allocating nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IncompatibleMerge`] unless both nodes have the
    /// same variation and factory name.
    pub fn merge(self, other: Self) -> Result<Self, CoreError>
    where
        O: 'static,
    {
        if self.variation != other.variation || self.factory != other.factory {
            return Err(CoreError::IncompatibleMerge {
                expected_variation: self.variation,
                expected_factory: self.factory,
                found_variation: other.variation,
                found_factory: other.factory,
            });
        }

        if other.is_plain() {
            return Ok(self);
        }
        if self.is_plain() {
            return Ok(other);
        }

        let mut children = self.children;
        children.extend(other.children);
        let mut traits = self.traits;
        traits.extend(other.traits);
        let mut attrs = self.attrs;
        attrs.extend(other.attrs);

        let finalizer = match (self.finalizer, other.finalizer) {
            (Some(first), Some(second)) => {
                let composed: Finalizer<O> = Rc::new(move |object: &O| {
                    first.as_ref()(object);
                    second.as_ref()(object);
                });
                Some(composed)
            }
            (first, second) => first.or(second),
        };

        Ok(Self {
            variation: self.variation,
            factory: self.factory,
            children,
            traits,
            attrs,
            finalizer,
        })
    }
}

impl<O: PartialEq> PartialEq for SpecNode<O> {
    /// Structural equality; finalizers are compared by identity since
    /// closures have no structure to compare.
    fn eq(&self, other: &Self) -> bool {
        let finalizers_match = match (&self.finalizer, &other.finalizer) {
            (None, None) => true,
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        };
        self.variation == other.variation
            && self.factory == other.factory
            && self.children == other.children
            && self.traits == other.traits
            && self.attrs == other.attrs
            && finalizers_match
    }
}

impl<O: fmt::Debug> fmt::Debug for SpecNode<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecNode")
            .field("variation", &self.variation)
            .field("factory", &self.factory)
            .field("children", &self.children)
            .field("traits", &self.traits)
            .field("attrs", &self.attrs)
            .field("finalizer", &self.finalizer.as_ref().map(|_| "<finalizer>"))
            .finish()
    }
}
