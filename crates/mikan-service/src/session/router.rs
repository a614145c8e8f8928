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

//! Page-stack bookkeeping.
//!
//! The container owns actual navigation; the logic context only mirrors
//! which sessions sit on which stack so stack-level show/hide can fan out
//! to the right page. Stacks are created on first push and discarded the
//! moment they empty.

use mikan_core::{BridgeId, StackId};
use std::collections::HashMap;

/// Mirror of the container's page stacks.
#[derive(Default)]
pub struct PageRouter {
    stacks: HashMap<StackId, Vec<BridgeId>>,
    current: Option<BridgeId>,
}

impl PageRouter {
    /// An empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a session onto a stack, creating the stack on first use.
    /// Also marks the session current.
    pub fn push(&mut self, stack: &StackId, bridge: BridgeId) {
        self.stacks
            .entry(stack.clone())
            .or_default()
            .push(bridge.clone());
        self.current = Some(bridge);
    }

    /// Pops the top session of a stack; an emptied stack is discarded.
    pub fn pop(&mut self, stack: &StackId) -> Option<BridgeId> {
        let entries = self.stacks.get_mut(stack)?;
        let popped = entries.pop();
        if entries.is_empty() {
            self.stacks.remove(stack);
        }
        popped
    }

    /// Removes a session from whichever stack holds it (teardown may
    /// arrive for a non-top page).
    pub fn remove(&mut self, bridge: &BridgeId) {
        self.stacks.retain(|_, entries| {
            entries.retain(|b| b != bridge);
            !entries.is_empty()
        });
        if self.current.as_ref() == Some(bridge) {
            self.current = None;
        }
    }

    /// The top session of a stack.
    #[must_use]
    pub fn top(&self, stack: &StackId) -> Option<&BridgeId> {
        self.stacks.get(stack).and_then(|entries| entries.last())
    }

    /// Marks a session as the one currently presented.
    pub fn set_current(&mut self, bridge: BridgeId) {
        self.current = Some(bridge);
    }

    /// The currently presented session.
    #[must_use]
    pub fn current(&self) -> Option<&BridgeId> {
        self.current.as_ref()
    }

    /// Number of live stacks.
    #[must_use]
    pub fn stack_count(&self) -> usize {
        self.stacks.len()
    }

    /// Number of sessions on one stack (0 for a discarded stack).
    #[must_use]
    pub fn depth(&self, stack: &StackId) -> usize {
        self.stacks.get(stack).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_are_lazy_and_discarded_when_empty() {
        let mut router = PageRouter::new();
        let main = StackId::from("main");
        assert_eq!(router.stack_count(), 0);

        router.push(&main, BridgeId::from("b1"));
        router.push(&main, BridgeId::from("b2"));
        assert_eq!(router.depth(&main), 2);
        assert_eq!(router.current(), Some(&BridgeId::from("b2")));

        assert_eq!(router.pop(&main), Some(BridgeId::from("b2")));
        assert_eq!(router.pop(&main), Some(BridgeId::from("b1")));
        assert_eq!(router.stack_count(), 0);
        assert_eq!(router.pop(&main), None);
    }

    #[test]
    fn remove_drops_mid_stack_sessions() {
        let mut router = PageRouter::new();
        let main = StackId::from("main");
        router.push(&main, BridgeId::from("b1"));
        router.push(&main, BridgeId::from("b2"));
        router.push(&main, BridgeId::from("b3"));

        router.remove(&BridgeId::from("b2"));
        assert_eq!(router.depth(&main), 2);
        assert_eq!(router.top(&main), Some(&BridgeId::from("b3")));

        router.remove(&BridgeId::from("b3"));
        router.remove(&BridgeId::from("b1"));
        assert_eq!(router.stack_count(), 0);
        assert_eq!(router.current(), None);
    }
}
