// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Correlation callbacks for `invoke`-style control calls.
//!
//! `Transport::invoke` is not request/response RPC: the caller stores a
//! callback here, embeds the returned [`CallbackId`] in the envelope, and
//! a later `triggerCallback` message resolves it. The registry is generic
//! over the callback type so each context can choose its own signature.

use crate::id::CallbackId;
use std::collections::HashMap;
use std::rc::Rc;

struct Stored<F: ?Sized> {
    callback: Rc<F>,
    keep: bool,
}

/// Stores callbacks awaiting a `triggerCallback` resolution.
///
/// Entries stored with `keep` survive resolution (event-style listeners);
/// storing the same `Rc` again with `keep` returns the existing id
/// instead of minting a duplicate.
pub struct CallbackRegistry<F: ?Sized> {
    callbacks: HashMap<CallbackId, Stored<F>>,
}

impl<F: ?Sized> Default for CallbackRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> CallbackRegistry<F> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            callbacks: HashMap::new(),
        }
    }

    /// Stores a callback and returns its correlation id.
    pub fn store(&mut self, callback: Rc<F>, keep: bool) -> CallbackId {
        if keep {
            if let Some(id) = self
                .callbacks
                .iter()
                .find(|(_, stored)| Rc::ptr_eq(&stored.callback, &callback))
                .map(|(id, _)| id.clone())
            {
                return id;
            }
        }
        let id = CallbackId::generate();
        self.callbacks.insert(id.clone(), Stored { callback, keep });
        id
    }

    /// Resolves a correlation id to its callback.
    ///
    /// One-shot entries are removed; `keep` entries stay registered.
    /// Unknown ids return `None` — late resolutions after a lifecycle
    /// teardown are expected, not an error.
    pub fn resolve(&mut self, id: &CallbackId) -> Option<Rc<F>> {
        let keep = self.callbacks.get(id)?.keep;
        if keep {
            self.callbacks.get(id).map(|s| Rc::clone(&s.callback))
        } else {
            self.callbacks.remove(id).map(|s| s.callback)
        }
    }

    /// Drops one stored callback.
    pub fn remove(&mut self, id: &CallbackId) {
        self.callbacks.remove(id);
    }

    /// Drops every `keep` listener, e.g. when its owner unloads.
    pub fn remove_kept(&mut self) {
        self.callbacks.retain(|_, stored| !stored.keep);
    }

    /// Number of stored callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    type TestFn = dyn Fn(i32);

    #[test]
    fn one_shot_is_removed_after_resolve() {
        let mut registry: CallbackRegistry<TestFn> = CallbackRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let hits2 = Rc::clone(&hits);
        let id = registry.store(Rc::new(move |n| hits2.set(hits2.get() + n)), false);

        registry.resolve(&id).unwrap()(2);
        assert_eq!(hits.get(), 2);
        assert!(registry.resolve(&id).is_none());
    }

    #[test]
    fn kept_callback_survives_and_dedups() {
        let mut registry: CallbackRegistry<TestFn> = CallbackRegistry::new();
        let callback: Rc<TestFn> = Rc::new(|_| {});
        let id = registry.store(Rc::clone(&callback), true);
        let again = registry.store(Rc::clone(&callback), true);
        assert_eq!(id, again);
        assert_eq!(registry.len(), 1);

        assert!(registry.resolve(&id).is_some());
        assert!(registry.resolve(&id).is_some());

        registry.remove_kept();
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_id_is_not_an_error() {
        let mut registry: CallbackRegistry<TestFn> = CallbackRegistry::new();
        assert!(registry.resolve(&CallbackId::generate()).is_none());
    }
}
