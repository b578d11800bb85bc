//! Classification of loosely-typed argument lists into spec-node fields.
//!
//! Callers describe a construction with a flat list of heterogeneous
//! arguments: child specs, traits, attribute maps, nested lists of the same,
//! and conditional placeholders. [`classify`] partitions such a list, in
//! order, into the three destinations a [`SpecNode`] carries.

use log::trace;

use crate::error::CoreError;
use crate::identifier::Id;
use crate::spec::{AttrMap, SpecNode, TraitArg};

/// One argument in a spec construction call.
///
/// This is a closed union: every placeable argument shape has a variant, and
/// the classifier pattern-matches them explicitly rather than inspecting
/// runtime types.
pub enum Arg<O> {
    /// A nested construction, performed against whatever the enclosing node
    /// produces.
    Spec(SpecNode<O>),
    /// A named or numeric trait.
    Trait(TraitArg),
    /// An attribute map, merged key-wise into the node's attributes
    /// (last write wins across multiple maps).
    Attrs(AttrMap<O>),
    /// A nested argument list, flattened recursively with relative order
    /// preserved.
    Nested(Vec<Arg<O>>),
    /// Silently dropped. Produced by [`Arg::when`] for conditional
    /// inclusion.
    Skip,
    /// A bare domain value with no destination; classification rejects it.
    Value(O),
}

impl<O> Arg<O> {
    /// Includes `arg` only when `condition` holds.
    ///
    /// ```
    /// use weft_core::args::Arg;
    ///
    /// let premium = false;
    /// let arg: Arg<i32> = Arg::when(premium, Arg::from("premium"));
    /// assert!(matches!(arg, Arg::Skip));
    /// ```
    pub fn when(condition: bool, arg: Arg<O>) -> Arg<O> {
        if condition { arg } else { Arg::Skip }
    }
}

impl<O> From<SpecNode<O>> for Arg<O> {
    fn from(spec: SpecNode<O>) -> Self {
        Self::Spec(spec)
    }
}

impl<O> From<TraitArg> for Arg<O> {
    fn from(value: TraitArg) -> Self {
        Self::Trait(value)
    }
}

impl<O> From<Id> for Arg<O> {
    fn from(name: Id) -> Self {
        Self::Trait(TraitArg::Name(name))
    }
}

impl<O> From<&str> for Arg<O> {
    fn from(name: &str) -> Self {
        Self::Trait(TraitArg::Name(Id::new(name)))
    }
}

impl<O> From<u64> for Arg<O> {
    fn from(count: u64) -> Self {
        Self::Trait(TraitArg::Count(count))
    }
}

impl<O> From<AttrMap<O>> for Arg<O> {
    fn from(attrs: AttrMap<O>) -> Self {
        Self::Attrs(attrs)
    }
}

impl<O> From<Vec<Arg<O>>> for Arg<O> {
    fn from(args: Vec<Arg<O>>) -> Self {
        Self::Nested(args)
    }
}

/// The three destinations an argument list is partitioned into.
#[derive(Default)]
pub struct ClassifiedArgs<O> {
    pub children: Vec<SpecNode<O>>,
    pub traits: Vec<TraitArg>,
    pub attrs: AttrMap<O>,
}

impl<O> ClassifiedArgs<O> {
    fn new() -> Self {
        Self {
            children: Vec::new(),
            traits: Vec::new(),
            attrs: AttrMap::new(),
        }
    }
}

/// Partitions `args`, in order, into children, traits, and attributes.
///
/// Nested lists are flattened recursively; relative order is preserved
/// within and across nesting. [`Arg::Skip`] values are dropped. Attribute
/// maps merge key-wise with the last write winning.
///
/// # Errors
///
/// Returns [`CoreError::UnsupportedArgument`] for [`Arg::Value`].
pub fn classify<O>(args: Vec<Arg<O>>) -> Result<ClassifiedArgs<O>, CoreError> {
    let mut dest = ClassifiedArgs::new();
    classify_into(args, &mut dest)?;
    trace!(
        children = dest.children.len(),
        traits = dest.traits.len(),
        attrs = dest.attrs.len();
        "classified spec arguments"
    );
    Ok(dest)
}

fn classify_into<O>(args: Vec<Arg<O>>, dest: &mut ClassifiedArgs<O>) -> Result<(), CoreError> {
    for arg in args {
        match arg {
            Arg::Spec(spec) => dest.children.push(spec),
            Arg::Trait(value) => dest.traits.push(value),
            Arg::Attrs(attrs) => dest.attrs.extend(attrs),
            Arg::Nested(inner) => classify_into(inner, dest)?,
            Arg::Skip => {}
            Arg::Value(_) => {
                return Err(CoreError::UnsupportedArgument {
                    kind: "a bare domain value",
                });
            }
        }
    }
    Ok(())
}

/// Builds an [`AttrMap`] from `key => value` pairs.
///
/// ```
/// use weft_core::attrs;
///
/// let map = attrs!["name" => 1, "title" => 2];
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! attrs {
    () => { $crate::spec::AttrMap::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::spec::AttrMap::new();
        $( map.insert($crate::identifier::Id::new($key), $value); )+
        map
    }};
}
