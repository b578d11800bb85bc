//! The factory/schema registry boundary.
//!
//! The engine never introspects domain types itself; it consumes a
//! [`SchemaRegistry`] that answers two questions: is a factory name
//! registered, and what does its declaration look like
//! ([`FactoryDescription`]). The registry is assumed immutable after load.
//!
//! [`InMemoryRegistry`] is the reference implementation. Descriptions are
//! plain serde-able data, so a schema can equally be deserialized from a
//! configuration file and loaded in one pass.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use weft_core::Id;

/// A declared reference from one factory's objects to another's, expressed
/// as the attribute name that holds the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub related: Id,
    pub attribute: Id,
}

impl Association {
    pub fn new(related: impl Into<Id>, attribute: impl Into<Id>) -> Self {
        Self {
            related: related.into(),
            attribute: attribute.into(),
        }
    }
}

/// Associations declared inside one of a factory's traits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDescription {
    pub name: Id,
    pub associations: Vec<Association>,
}

/// The declaration of a single factory, as reported by the registry.
///
/// `name` is the canonical factory name: looking up an alias yields the same
/// description, whose `name` differs from the lookup key. Association
/// metadata construction relies on that to treat an alias as compatible with
/// its base factory while keeping sibling aliases incompatible with each
/// other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryDescription {
    pub name: Id,
    #[serde(default)]
    pub aliases: Vec<Id>,
    #[serde(default)]
    pub parent: Option<Id>,
    #[serde(default)]
    pub associations: Vec<Association>,
    #[serde(default)]
    pub traits: Vec<TraitDescription>,
}

impl FactoryDescription {
    /// Creates a description with no aliases, parent, associations, or
    /// traits.
    pub fn new(name: impl Into<Id>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            parent: None,
            associations: Vec::new(),
            traits: Vec::new(),
        }
    }

    pub fn with_aliases<I>(mut self, aliases: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Id>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_parent(mut self, parent: impl Into<Id>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_association(mut self, related: impl Into<Id>, attribute: impl Into<Id>) -> Self {
        self.associations.push(Association::new(related, attribute));
        self
    }

    pub fn with_trait<I>(mut self, name: impl Into<Id>, associations: I) -> Self
    where
        I: IntoIterator<Item = Association>,
    {
        self.traits.push(TraitDescription {
            name: name.into(),
            associations: associations.into_iter().collect(),
        });
        self
    }
}

/// The registry interface the engine consumes.
pub trait SchemaRegistry {
    /// Whether `name` names a registered factory (canonical or alias).
    fn is_registered(&self, name: Id) -> bool;

    /// The declaration registered under `name`, if any.
    fn describe(&self, name: Id) -> Option<&FactoryDescription>;
}

impl<R: SchemaRegistry + ?Sized> SchemaRegistry for &R {
    fn is_registered(&self, name: Id) -> bool {
        (**self).is_registered(name)
    }

    fn describe(&self, name: Id) -> Option<&FactoryDescription> {
        (**self).describe(name)
    }
}

impl<R: SchemaRegistry + ?Sized> SchemaRegistry for Rc<R> {
    fn is_registered(&self, name: Id) -> bool {
        (**self).is_registered(name)
    }

    fn describe(&self, name: Id) -> Option<&FactoryDescription> {
        (**self).describe(name)
    }
}

/// A registry holding descriptions in a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    factories: HashMap<Id, Rc<FactoryDescription>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a description under its canonical name and each alias.
    pub fn define(&mut self, description: FactoryDescription) {
        let description = Rc::new(description);
        for &alias in &description.aliases {
            self.factories.insert(alias, Rc::clone(&description));
        }
        self.factories.insert(description.name, description);
    }
}

impl SchemaRegistry for InMemoryRegistry {
    fn is_registered(&self, name: Id) -> bool {
        self.factories.contains_key(&name)
    }

    fn describe(&self, name: Id) -> Option<&FactoryDescription> {
        self.factories.get(&name).map(Rc::as_ref)
    }
}
