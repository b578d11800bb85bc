//! The instantiator: walks a spec tree and drives the construction
//! provider.
//!
//! For every node, the instantiator completes the factory name and resolves
//! associations against the current ancestor chain, invokes the provider
//! according to the node's variation, then, per produced object, pushes an
//! ancestor frame, recurses into the children, and runs the finalizer inside
//! that scope. The spec tree itself is never mutated.

use std::rc::Rc;

use log::debug;

use weft_core::{AttrMap, Id, SpecNode, TraitArg, Variation};

use crate::assoc::AssocCache;
use crate::context::{AncestorContext, AncestorFrame};
use crate::error::WeftError;
use crate::registry::SchemaRegistry;

/// The build strategy forwarded to the provider.
///
/// A [`Strategy::Custom`] name is pure passthrough for providers that
/// register their own strategies. The template-only strategy is not listed
/// here: templates are spec nodes returned unevaluated (see
/// [`crate::template`]), so no provider call is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Build,
    BuildStubbed,
    Create,
    AttributesFor,
    Custom(Id),
}

/// The construction backend consumed by the instantiator.
///
/// One provider call produces one object (`build`), exactly two
/// (`build_pair`), or a caller-sized sequence (`build_list`). The list count
/// arrives as the leading [`TraitArg::Count`] in `traits`; integers are
/// passed through identically to named traits and are never interpreted by
/// the engine.
pub trait Provider {
    type Object: Clone;
    type Error: std::error::Error + 'static;

    fn build(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Self::Object, Self::Error>;

    fn build_pair(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<[Self::Object; 2], Self::Error>;

    fn build_list(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Vec<Self::Object>, Self::Error>;
}

impl<P: Provider + ?Sized> Provider for &P {
    type Object = P::Object;
    type Error = P::Error;

    fn build(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Self::Object, Self::Error> {
        (**self).build(strategy, factory, traits, attrs)
    }

    fn build_pair(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<[Self::Object; 2], Self::Error> {
        (**self).build_pair(strategy, factory, traits, attrs)
    }

    fn build_list(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Vec<Self::Object>, Self::Error> {
        (**self).build_list(strategy, factory, traits, attrs)
    }
}

impl<P: Provider + ?Sized> Provider for Rc<P> {
    type Object = P::Object;
    type Error = P::Error;

    fn build(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Self::Object, Self::Error> {
        (**self).build(strategy, factory, traits, attrs)
    }

    fn build_pair(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<[Self::Object; 2], Self::Error> {
        (**self).build_pair(strategy, factory, traits, attrs)
    }

    fn build_list(
        &self,
        strategy: Strategy,
        factory: Id,
        traits: &[TraitArg],
        attrs: &AttrMap<Self::Object>,
    ) -> Result<Vec<Self::Object>, Self::Error> {
        (**self).build_list(strategy, factory, traits, attrs)
    }
}

/// What one spec node produced: one object for a unit node, a sequence for
/// pair and list nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Produced<O> {
    One(O),
    Many(Vec<O>),
}

impl<O> Produced<O> {
    pub fn iter(&self) -> impl Iterator<Item = &O> {
        match self {
            Self::One(object) => std::slice::from_ref(object).iter(),
            Self::Many(objects) => objects.iter(),
        }
    }

    /// All produced objects as a vector.
    pub fn into_vec(self) -> Vec<O> {
        match self {
            Self::One(object) => vec![object],
            Self::Many(objects) => objects,
        }
    }
}

/// Walks spec trees against a registry adapter, a provider, and an ancestor
/// context.
pub struct Instantiator<'a, R: SchemaRegistry, P: Provider> {
    assoc: &'a AssocCache<R>,
    provider: &'a P,
    context: &'a AncestorContext<P::Object>,
}

impl<'a, R: SchemaRegistry, P: Provider> Instantiator<'a, R, P> {
    pub fn new(
        assoc: &'a AssocCache<R>,
        provider: &'a P,
        context: &'a AncestorContext<P::Object>,
    ) -> Self {
        Self {
            assoc,
            provider,
            context,
        }
    }

    /// Instantiates `spec` depth-first.
    ///
    /// When no ancestor context exists (the root-node case with nothing
    /// pre-seeded), the node's own factory name and attributes are used
    /// verbatim; otherwise the name is completed and associations are
    /// resolved against the chain before the provider is invoked.
    ///
    /// # Errors
    ///
    /// Any failure (an uncompletable name, an unregistered factory, or a
    /// provider error) aborts the whole walk. Objects already produced by
    /// earlier siblings remain as side effects.
    pub fn instantiate(
        &self,
        strategy: Strategy,
        spec: &SpecNode<P::Object>,
    ) -> Result<Produced<P::Object>, WeftError> {
        let ancestors = self.context.current();
        let (factory, attrs) = match &ancestors {
            Some(chain) => {
                let factory = self.assoc.complete_name(chain, spec.factory())?;
                let mut attrs = spec.attrs().clone();
                self.assoc.info(factory)?.resolve(chain, &mut attrs);
                (factory, attrs)
            }
            None => (spec.factory(), spec.attrs().clone()),
        };

        debug!(factory:% = factory, variation:? = spec.variation(); "instantiating spec");
        let produced = match spec.variation() {
            Variation::Unit => Produced::One(
                self.provider
                    .build(strategy, factory, spec.traits(), &attrs)
                    .map_err(WeftError::provider)?,
            ),
            Variation::Pair => {
                let [first, second] = self
                    .provider
                    .build_pair(strategy, factory, spec.traits(), &attrs)
                    .map_err(WeftError::provider)?;
                Produced::Many(vec![first, second])
            }
            Variation::List => Produced::Many(
                self.provider
                    .build_list(strategy, factory, spec.traits(), &attrs)
                    .map_err(WeftError::provider)?,
            ),
        };

        if !spec.children().is_empty() || spec.finalizer().is_some() {
            let info = self.assoc.info(factory)?;
            for object in produced.iter() {
                let frame = AncestorFrame {
                    info: Rc::clone(&info),
                    object: object.clone(),
                };
                self.context.with_frames(vec![frame], || -> Result<(), WeftError> {
                    for child in spec.children() {
                        self.instantiate(strategy, child)?;
                    }
                    if let Some(finalizer) = spec.finalizer() {
                        finalizer.as_ref()(object);
                    }
                    Ok(())
                })?;
            }
        }

        Ok(produced)
    }
}
