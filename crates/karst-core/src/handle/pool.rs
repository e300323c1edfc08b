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

//! Typed slot allocators behind the opaque handles.

use super::{Handle, HandleKind};

struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// A slot allocator for one resource kind.
///
/// Maintains a dense slot vector plus a free list for $O(1)$ recycling.
/// Freed slots bump their generation so stale handles fail on their next
/// access instead of resolving to the recycled occupant. Allocation never
/// blocks; the slot vector grows by doubling.
///
/// Pools are not thread-safe by themselves; callers serialize access per
/// resource kind. Only the command-buffer and render-pass pools cross the
/// producer/execution boundary, and those are lock-wrapped by the context.
pub struct HandlePool<T> {
    kind: HandleKind,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> HandlePool<T> {
    /// Creates an empty pool issuing handles of `kind`.
    pub fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// The kind of handle this pool issues.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no entries are live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Allocates a slot for `value` and returns its handle.
    pub fn alloc(&mut self, value: T) -> Handle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return Handle::new(self.kind, index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).expect("handle pool exceeded u32 slots");
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(self.kind, index, 0)
    }

    fn check(&self, handle: Handle) -> usize {
        assert!(handle.is_valid(), "{:?} pool: invalid handle", self.kind);
        assert_eq!(
            handle.kind(),
            Some(self.kind),
            "{:?} pool: handle of foreign kind {handle:?}",
            self.kind
        );
        let index = handle.index() as usize;
        let slot = self
            .slots
            .get(index)
            .unwrap_or_else(|| panic!("{:?} pool: handle {handle:?} out of range", self.kind));
        assert_eq!(
            slot.generation,
            handle.generation(),
            "{:?} pool: stale handle {handle:?}",
            self.kind
        );
        assert!(
            slot.value.is_some(),
            "{:?} pool: handle {handle:?} was freed",
            self.kind
        );
        index
    }

    /// Resolves `handle` to its entry.
    ///
    /// # Panics
    /// Panics on an invalid, foreign-kind, stale, or freed handle; handing
    /// back garbage silently is the one thing a pool must never do.
    pub fn get(&self, handle: Handle) -> &T {
        let index = self.check(handle);
        self.slots[index].value.as_ref().unwrap()
    }

    /// Resolves `handle` to its entry, mutably.
    ///
    /// # Panics
    /// Same conditions as [`HandlePool::get`].
    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        let index = self.check(handle);
        self.slots[index].value.as_mut().unwrap()
    }

    /// Returns `true` if `handle` currently resolves in this pool.
    pub fn contains(&self, handle: Handle) -> bool {
        if !handle.is_valid() || handle.kind() != Some(self.kind) {
            return false;
        }
        match self.slots.get(handle.index() as usize) {
            Some(slot) => slot.generation == handle.generation() && slot.value.is_some(),
            None => false,
        }
    }

    /// Releases the entry behind `handle` and returns it.
    ///
    /// The slot's generation is bumped immediately, so every outstanding
    /// copy of `handle` is dead from this point on.
    ///
    /// # Panics
    /// Same conditions as [`HandlePool::get`]; a double-free trips the
    /// freed-handle check.
    pub fn free(&mut self, handle: Handle) -> T {
        let index = self.check(handle);
        let slot = &mut self.slots[index];
        let value = slot.value.take().unwrap();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        self.live -= 1;
        value
    }
}
