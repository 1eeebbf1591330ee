//! Independent processing contexts.
//!
//! Each context owns its own store and index and must see payloads in
//! arrival order. Different contexts share nothing, so they can be driven
//! from different threads.

use parking_lot::Mutex;

/// A fixed set of contexts, each behind its own lock.
pub struct ContextSet<C> {
    contexts: Vec<Mutex<C>>,
}

impl<C> ContextSet<C> {
    /// Builds `count` contexts with `make`, stopping at the first error.
    pub fn new<E>(count: usize, mut make: impl FnMut(usize) -> Result<C, E>) -> Result<Self, E> {
        let contexts = (0..count)
            .map(|idx| make(idx).map(Mutex::new))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self { contexts })
    }

    /// Returns the number of contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if the set holds no contexts.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Runs `f` with exclusive access to context `idx`. Returns `None` if
    /// there is no such context.
    ///
    /// Callers that need ordering across payloads must serialize them
    /// themselves; the lock only prevents concurrent use.
    pub fn with<R>(&self, idx: usize, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let context = self.contexts.get(idx)?;
        let mut guard = context.lock();
        Some(f(&mut guard))
    }

    /// Applies `f` to every context.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(usize, &mut C)) {
        for (idx, context) in self.contexts.iter_mut().enumerate() {
            f(idx, context.get_mut());
        }
    }

    /// Consumes the set, returning the contexts in order.
    pub fn into_inner(self) -> Vec<C> {
        self.contexts.into_iter().map(Mutex::into_inner).collect()
    }
}
