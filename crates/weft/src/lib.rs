//! Weft - a declarative builder for nested test fixtures.
//!
//! A caller describes a tree of things to construct; child constructions
//! automatically receive references back to compatible ancestors without the
//! links being spelled out, partial factory names are completed from the
//! ancestor chain, and reusable spec templates can be merged into concrete
//! constructions. The actual object construction is delegated to a
//! [`Provider`]; factory declarations come from a [`SchemaRegistry`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use weft::{Arg, Weaver};
//!
//! let weaver = Weaver::new(registry, provider);
//!
//! // Build a customer with a profile; the profile's `customer` attribute
//! // is inferred, and `profile` is completed to `customer_profile`.
//! let profile = weft::template(weft::Variation::Unit, "profile", vec![], None)?;
//! let customer = weaver.build("customer", vec![Arg::from(profile)])?;
//! ```

mod assoc;
mod context;
mod error;
mod instantiate;
mod registry;

pub use weft_core::{
    Arg, AttrMap, ClassifiedArgs, CoreError, Finalizer, Id, SpecNode, TraitArg, Variation, attrs,
    classify,
};

pub use assoc::{AssocCache, AssocInfo};
pub use context::{AncestorContext, AncestorFrame};
pub use error::WeftError;
pub use instantiate::{Instantiator, Produced, Provider, Strategy};
pub use registry::{
    Association, FactoryDescription, InMemoryRegistry, SchemaRegistry, TraitDescription,
};

use log::info;

/// Builds a spec template without constructing anything.
///
/// This is the template-only strategy: the returned [`SpecNode`] can be
/// passed as a child argument to other constructions or merged into a
/// concrete one via [`Weaver::instantiate_from`].
///
/// # Errors
///
/// Returns [`WeftError::Core`] when an argument cannot be classified.
pub fn template<O>(
    variation: Variation,
    factory: impl Into<Id>,
    args: Vec<Arg<O>>,
    finalizer: Option<Finalizer<O>>,
) -> Result<SpecNode<O>, WeftError> {
    Ok(SpecNode::build(variation, factory.into(), args, finalizer)?)
}

/// The caller-facing construction surface.
///
/// A weaver ties together a schema registry (through a memoizing
/// [`AssocCache`]), a construction [`Provider`], and one [`AncestorContext`].
/// Each weaver is one logical task: constructions driven by different
/// weavers never observe each other's ancestor chains, even when their
/// execution interleaves.
pub struct Weaver<R: SchemaRegistry, P: Provider> {
    assoc: AssocCache<R>,
    provider: P,
    context: AncestorContext<P::Object>,
}

impl<R: SchemaRegistry, P: Provider> Weaver<R, P> {
    pub fn new(registry: R, provider: P) -> Self {
        Self {
            assoc: AssocCache::new(registry),
            provider,
            context: AncestorContext::new(),
        }
    }

    /// The ancestor context this weaver threads through its constructions.
    pub fn context(&self) -> &AncestorContext<P::Object> {
        &self.context
    }

    /// The general entry point: classify `args`, then instantiate with
    /// `strategy`.
    ///
    /// # Errors
    ///
    /// Classification, name completion, registry, and provider failures all
    /// abort the construction; see [`WeftError`].
    pub fn instantiate(
        &self,
        strategy: Strategy,
        variation: Variation,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
        finalizer: Option<Finalizer<P::Object>>,
    ) -> Result<Produced<P::Object>, WeftError> {
        let spec = SpecNode::build(variation, factory.into(), args, finalizer)?;
        self.instantiate_spec(strategy, &spec)
    }

    /// Instantiates an already-built spec node.
    pub fn instantiate_spec(
        &self,
        strategy: Strategy,
        spec: &SpecNode<P::Object>,
    ) -> Result<Produced<P::Object>, WeftError> {
        info!(factory:% = spec.factory(); "instantiating fixture tree");
        Instantiator::new(&self.assoc, &self.provider, &self.context).instantiate(strategy, spec)
    }

    /// Merges `args` (and `finalizer`) into a reusable template, then
    /// instantiates the combined spec. The template itself is not mutated.
    pub fn instantiate_from(
        &self,
        strategy: Strategy,
        template: &SpecNode<P::Object>,
        args: Vec<Arg<P::Object>>,
        finalizer: Option<Finalizer<P::Object>>,
    ) -> Result<Produced<P::Object>, WeftError>
    where
        P::Object: 'static,
    {
        let addition = SpecNode::build(template.variation(), template.factory(), args, finalizer)?;
        let spec = template.clone().merge(addition)?;
        self.instantiate_spec(strategy, &spec)
    }

    /// Builds a spec template without constructing anything; see the free
    /// [`template`] function.
    ///
    /// # Errors
    ///
    /// Returns [`WeftError::Core`] when an argument cannot be classified.
    pub fn template(
        &self,
        variation: Variation,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
        finalizer: Option<Finalizer<P::Object>>,
    ) -> Result<SpecNode<P::Object>, WeftError> {
        template(variation, factory, args, finalizer)
    }

    /// Starts a two-step construction for when the factory name is not known
    /// yet.
    pub fn deferred(&self, strategy: Strategy, variation: Variation) -> Deferred<'_, R, P> {
        Deferred {
            weaver: self,
            strategy,
            variation,
        }
    }

    /// Pre-seeds the ancestor context with named objects for the duration of
    /// `body`. Constructions inside `body` resolve associations and complete
    /// names against these objects.
    ///
    /// # Errors
    ///
    /// Returns [`WeftError::UnregisteredType`] when a name is unknown.
    pub fn scoped<T>(
        &self,
        objects: impl IntoIterator<Item = (Id, P::Object)>,
        body: impl FnOnce() -> T,
    ) -> Result<T, WeftError> {
        self.context.with_objects(&self.assoc, objects, body)
    }

    /// Like [`Weaver::scoped`], but with pre-built frames for callers that
    /// already hold the association metadata.
    pub fn scoped_frames<T>(
        &self,
        frames: Vec<AncestorFrame<P::Object>>,
        body: impl FnOnce() -> T,
    ) -> T {
        self.context.with_frames(frames, body)
    }

    /// Builds one object ([`Strategy::Build`], unit variation).
    pub fn build(
        &self,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<P::Object, WeftError> {
        self.one(Strategy::Build, factory, args)
    }

    /// Builds exactly two objects.
    pub fn build_pair(
        &self,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<[P::Object; 2], WeftError> {
        self.pair(Strategy::Build, factory, args)
    }

    /// Builds `count` objects. The count travels to the provider as the
    /// leading numeric trait.
    pub fn build_list(
        &self,
        factory: impl Into<Id>,
        count: u64,
        args: Vec<Arg<P::Object>>,
    ) -> Result<Vec<P::Object>, WeftError> {
        self.list(Strategy::Build, factory, count, args)
    }

    /// Creates (persists) one object ([`Strategy::Create`], unit variation).
    pub fn create(
        &self,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<P::Object, WeftError> {
        self.one(Strategy::Create, factory, args)
    }

    /// Creates exactly two objects.
    pub fn create_pair(
        &self,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<[P::Object; 2], WeftError> {
        self.pair(Strategy::Create, factory, args)
    }

    /// Creates `count` objects.
    pub fn create_list(
        &self,
        factory: impl Into<Id>,
        count: u64,
        args: Vec<Arg<P::Object>>,
    ) -> Result<Vec<P::Object>, WeftError> {
        self.list(Strategy::Create, factory, count, args)
    }

    fn one(
        &self,
        strategy: Strategy,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<P::Object, WeftError> {
        match self.instantiate(strategy, Variation::Unit, factory, args, None)? {
            Produced::One(object) => Ok(object),
            // A unit spec always produces exactly one object.
            Produced::Many(_) => unreachable!("unit variation produced a sequence"),
        }
    }

    fn pair(
        &self,
        strategy: Strategy,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<[P::Object; 2], WeftError> {
        let objects = self
            .instantiate(strategy, Variation::Pair, factory, args, None)?
            .into_vec();
        match <[P::Object; 2]>::try_from(objects) {
            Ok(pair) => Ok(pair),
            // The provider contract fixes the pair variation at two objects.
            Err(_) => unreachable!("pair variation produced a different count"),
        }
    }

    fn list(
        &self,
        strategy: Strategy,
        factory: impl Into<Id>,
        count: u64,
        mut args: Vec<Arg<P::Object>>,
    ) -> Result<Vec<P::Object>, WeftError> {
        args.insert(0, Arg::Trait(TraitArg::Count(count)));
        Ok(self
            .instantiate(strategy, Variation::List, factory, args, None)?
            .into_vec())
    }
}

/// A pending construction whose factory name has not been supplied yet.
///
/// The typed replacement for dynamic call forwarding: its only operation is
/// to supply the name along with the remaining arguments.
pub struct Deferred<'w, R: SchemaRegistry, P: Provider> {
    weaver: &'w Weaver<R, P>,
    strategy: Strategy,
    variation: Variation,
}

impl<R: SchemaRegistry, P: Provider> Deferred<'_, R, P> {
    /// Supplies the factory name and runs the construction.
    pub fn named(
        &self,
        factory: impl Into<Id>,
        args: Vec<Arg<P::Object>>,
    ) -> Result<Produced<P::Object>, WeftError> {
        self.weaver
            .instantiate(self.strategy, self.variation, factory, args, None)
    }
}
