//! Association metadata and the resolution/completion algorithms.
//!
//! An [`AssocInfo`] is computed once per factory name by walking the
//! registry's description up the parent chain, then memoized for the process
//! lifetime by [`AssocCache`]. It answers two questions during
//! instantiation:
//!
//! - which factory names are compatible with this one (the name itself plus
//!   the canonical names along its parent chain), used both for matching
//!   ancestors and for completing partial factory names;
//! - which related factory maps to which attribute (`links`), used to infer
//!   references from a child object back to its ancestors.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};

use weft_core::{AttrMap, Id};

use crate::context::AncestorFrame;
use crate::error::WeftError;
use crate::registry::SchemaRegistry;

/// Association metadata for one factory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssocInfo {
    /// The requested name followed by the canonical name at each level of
    /// the parent chain, in walk order. Aliases of the same base factory are
    /// deliberately not included: two aliases are only compatible with the
    /// base, never with each other.
    compatible: IndexSet<Id>,
    /// Related factory name to attribute name, in declaration order with the
    /// closest declaration first. Two different related names may map to the
    /// same attribute; resolution arbitrates by ancestor closeness.
    links: IndexMap<Id, Id>,
}

impl AssocInfo {
    fn from_registry<R: SchemaRegistry>(registry: &R, name: Id) -> Result<Self, WeftError> {
        let mut compatible = IndexSet::new();
        compatible.insert(name);
        let mut links = IndexMap::new();

        let mut description = registry
            .describe(name)
            .ok_or(WeftError::UnregisteredType { name })?;
        loop {
            compatible.insert(description.name);

            // Levels are walked closest-first and entries never overwritten,
            // so a declaration on the factory itself shadows an inherited
            // one for the same related name. Within a level, own
            // associations come before trait-scoped ones.
            let level_associations = description.associations.iter().chain(
                description
                    .traits
                    .iter()
                    .flat_map(|t| t.associations.iter()),
            );
            for association in level_associations {
                links
                    .entry(association.related)
                    .or_insert(association.attribute);
            }

            match description.parent {
                Some(parent) => {
                    description = registry
                        .describe(parent)
                        .ok_or(WeftError::UnregisteredType { name: parent })?;
                }
                None => break,
            }
        }

        Ok(Self { compatible, links })
    }

    /// Whether `name` is one of this factory's compatible names.
    pub fn is_compatible(&self, name: Id) -> bool {
        self.compatible.contains(&name)
    }

    /// The compatible names in recorded order: the requested name first,
    /// then the canonical parent-chain names.
    pub fn compatible_names(&self) -> impl Iterator<Item = Id> + '_ {
        self.compatible.iter().copied()
    }

    /// The link map in declaration order.
    pub fn links(&self) -> impl Iterator<Item = (Id, Id)> + '_ {
        self.links.iter().map(|(&related, &attribute)| (related, attribute))
    }

    /// Fills `dest` with inferred associations from `ancestors`.
    ///
    /// For each link entry in declaration order, the closest compatible
    /// ancestor is chosen. An attribute present in `dest` before resolution
    /// started is never overwritten; an attribute this pass inferred may
    /// still be upgraded by a later entry that finds a strictly closer
    /// ancestor. Ties at equal closeness keep the earlier entry.
    pub fn resolve<O: Clone>(&self, ancestors: &[AncestorFrame<O>], dest: &mut AttrMap<O>) {
        let mut priorities: HashMap<Id, usize> = HashMap::new();
        for (&related, &attribute) in &self.links {
            // An explicitly supplied attribute wins over any inference.
            if dest.contains_key(&attribute) && !priorities.contains_key(&attribute) {
                continue;
            }

            let found = ancestors
                .iter()
                .enumerate()
                .find(|(_, frame)| frame.info.is_compatible(related));
            let Some((priority, frame)) = found else {
                continue;
            };
            if priorities.get(&attribute).copied().unwrap_or(usize::MAX) <= priority {
                continue;
            }

            trace!(related:% = related, attribute:% = attribute, priority = priority; "inferred association");
            priorities.insert(attribute, priority);
            dest.insert(attribute, frame.object.clone());
        }
    }
}

/// The registry adapter: memoizes [`AssocInfo`] per factory name.
///
/// The table lives as long as the cache and is never invalidated; the
/// registry is assumed immutable after load.
pub struct AssocCache<R: SchemaRegistry> {
    registry: R,
    infos: RefCell<HashMap<Id, Rc<AssocInfo>>>,
}

impl<R: SchemaRegistry> AssocCache<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            infos: RefCell::new(HashMap::new()),
        }
    }

    /// The association metadata for `name`, computed on first request.
    ///
    /// # Errors
    ///
    /// Returns [`WeftError::UnregisteredType`] when `name` (or one of its
    /// declared parents) is unknown to the registry.
    pub fn info(&self, name: Id) -> Result<Rc<AssocInfo>, WeftError> {
        if let Some(info) = self.infos.borrow().get(&name) {
            return Ok(Rc::clone(info));
        }
        let info = Rc::new(AssocInfo::from_registry(&self.registry, name)?);
        self.infos.borrow_mut().insert(name, Rc::clone(&info));
        Ok(info)
    }

    /// Whether `name` is registered, preferring the memoized table.
    pub fn is_registered(&self, name: Id) -> bool {
        self.infos.borrow().contains_key(&name) || self.registry.is_registered(name)
    }

    /// Completes a partial factory name against the ancestor chain.
    ///
    /// Tries `"{compatible}_{partial}"` for each ancestor (closest first)
    /// and each of its compatible names (in recorded order), then falls back
    /// to the literal `partial`.
    ///
    /// # Errors
    ///
    /// Returns [`WeftError::UnknownType`] when no candidate is registered.
    pub fn complete_name<O>(
        &self,
        ancestors: &[AncestorFrame<O>],
        partial: Id,
    ) -> Result<Id, WeftError> {
        for frame in ancestors {
            for compatible in frame.info.compatible_names() {
                let candidate = Id::compound(compatible, partial);
                if self.is_registered(candidate) {
                    debug!(partial:% = partial, factory:% = candidate; "completed factory name");
                    return Ok(candidate);
                }
            }
        }

        if self.is_registered(partial) {
            return Ok(partial);
        }
        Err(WeftError::UnknownType { name: partial })
    }
}
