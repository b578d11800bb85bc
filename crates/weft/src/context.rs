//! The ancestor context: the chain of enclosing constructions.
//!
//! The chain is task-local state, held by an explicitly threaded
//! [`AncestorContext`] rather than any process-wide global: every
//! construction call chain owns (or borrows) exactly one context, so two
//! cooperatively interleaved constructions each observe only their own
//! frames no matter how their steps overlap.
//!
//! The active chain is read fresh on every access and is never captured by
//! value into a spec node. [`AncestorContext::with_frames`] installs frames
//! for the duration of a closure and restores the previous chain on every
//! exit path, including early returns and panics.

use std::cell::RefCell;
use std::rc::Rc;

use weft_core::Id;

use crate::assoc::{AssocCache, AssocInfo};
use crate::error::WeftError;
use crate::registry::SchemaRegistry;

/// One level of the ancestor chain: a constructed object paired with the
/// association metadata of the factory that produced it.
#[derive(Clone)]
pub struct AncestorFrame<O> {
    pub info: Rc<AssocInfo>,
    pub object: O,
}

type Chain<O> = Option<Vec<AncestorFrame<O>>>;

/// The scoped ancestor chain for one logical task.
///
/// `None` means no ancestor context exists at all (the root-node case),
/// where resolution and name completion are skipped entirely. This is
/// distinct from an empty chain, under which resolution runs and simply
/// finds no ancestors.
pub struct AncestorContext<O> {
    chain: RefCell<Chain<O>>,
}

impl<O> Default for AncestorContext<O> {
    fn default() -> Self {
        Self {
            chain: RefCell::new(None),
        }
    }
}

impl<O: Clone> AncestorContext<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of the active chain, closest ancestor first.
    pub fn current(&self) -> Chain<O> {
        self.chain.borrow().clone()
    }

    /// Installs `frames` prepended to the active chain for the duration of
    /// `body`, restoring the previous chain on every exit path.
    pub fn with_frames<T>(&self, frames: Vec<AncestorFrame<O>>, body: impl FnOnce() -> T) -> T {
        let previous = self.chain.borrow().clone();
        let mut installed = frames;
        if let Some(prior) = &previous {
            installed.extend(prior.iter().cloned());
        }
        *self.chain.borrow_mut() = Some(installed);

        let _restore = RestoreOnDrop {
            chain: &self.chain,
            previous: Some(previous),
        };
        body()
    }

    /// Convenience over [`AncestorContext::with_frames`]: turns a
    /// name-to-object mapping into frames by looking up each name's
    /// association metadata.
    ///
    /// # Errors
    ///
    /// Returns [`WeftError::UnregisteredType`] when a name is unknown.
    pub fn with_objects<T, R: SchemaRegistry>(
        &self,
        cache: &AssocCache<R>,
        objects: impl IntoIterator<Item = (Id, O)>,
        body: impl FnOnce() -> T,
    ) -> Result<T, WeftError> {
        let frames = objects
            .into_iter()
            .map(|(name, object)| {
                Ok(AncestorFrame {
                    info: cache.info(name)?,
                    object,
                })
            })
            .collect::<Result<Vec<_>, WeftError>>()?;
        Ok(self.with_frames(frames, body))
    }
}

struct RestoreOnDrop<'a, O> {
    chain: &'a RefCell<Chain<O>>,
    previous: Option<Chain<O>>,
}

impl<O> Drop for RestoreOnDrop<'_, O> {
    fn drop(&mut self) {
        *self.chain.borrow_mut() = self.previous.take().unwrap_or(None);
    }
}
