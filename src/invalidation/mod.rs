//! Table-level invalidation without keeping observers alive.
//!
//! Observers live in a generation-tagged arena. A registration handle owns
//! its slot: dropping it frees the slot and bumps the generation, so the
//! tracker never holds a snapshot alive and a reused slot is never mistaken
//! for its former occupant.


use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use crate::store::TableSet;

#[derive(Debug)]
struct ObserverSlot {
    generation: u64,
    live: bool,
    subscribed: TableSet,
    dirty: TableSet,
}

#[derive(Debug, Default)]
struct ObserverArena {
    slots: Vec<ObserverSlot>,
    free: Vec<usize>,
}

/// Broadcasts changed tables to every live observer.
///
/// Cloning yields another handle to the same arena.
#[derive(Debug, Clone, Default)]
pub struct InvalidationTracker {
    arena: Arc<Mutex<ObserverArena>>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        tables: TableSet,
    ) -> ObserverRegistration {
        let mut arena = self.arena.lock();

        let (index, generation) = match arena.free.pop() {
            Some(index) => {
                let slot = &mut arena.slots[index];
                slot.live = true;
                slot.subscribed = tables;
                slot.dirty = TableSet::empty();
                (index, slot.generation)
            }
            None => {
                arena.slots.push(ObserverSlot {
                    generation: 0,
                    live: true,
                    subscribed: tables,
                    dirty: TableSet::empty(),
                });
                (arena.slots.len() - 1, 0)
            }
        };

        trace!(index, generation, ?tables, "observer registered");

        ObserverRegistration {
            arena: self.arena.clone(),
            index,
            generation,
            subscribed: tables,
        }
    }

    /// Marks `changed` dirty on every live observer subscribed to any of it.
    /// Returns how many observers were affected.
    pub fn notify(
        &self,
        changed: TableSet,
    ) -> usize {
        if changed.is_empty() {
            return 0;
        }

        let mut arena = self.arena.lock();
        let mut affected = 0;
        for slot in arena.slots.iter_mut().filter(|slot| slot.live) {
            let relevant = changed & slot.subscribed;
            if !relevant.is_empty() {
                slot.dirty |= relevant;
                affected += 1;
            }
        }

        debug!(?changed, affected, "tables invalidated");
        affected
    }

    pub fn live_observers(&self) -> usize {
        let arena = self.arena.lock();
        arena.slots.len() - arena.free.len()
    }
}

/// Handle of one observer slot; the slot is released on drop.
#[derive(Debug)]
pub struct ObserverRegistration {
    arena: Arc<Mutex<ObserverArena>>,
    index: usize,
    generation: u64,
    subscribed: TableSet,
}

impl ObserverRegistration {
    /// Tables changed since registration or the last [`acknowledge`](Self::acknowledge).
    pub fn dirty(&self) -> TableSet {
        let arena = self.arena.lock();
        match arena.slots.get(self.index) {
            Some(slot) if slot.live && slot.generation == self.generation => slot.dirty,
            // unreachable while the handle is alive; assume everything changed
            _ => self.subscribed,
        }
    }

    /// Clears `seen` once the observer has re-read those tables and found
    /// nothing that concerns it. Tables changed meanwhile outside `seen`
    /// stay dirty.
    pub fn acknowledge(
        &self,
        seen: TableSet,
    ) {
        let mut arena = self.arena.lock();
        if let Some(slot) = arena.slots.get_mut(self.index) {
            if slot.live && slot.generation == self.generation {
                slot.dirty.remove(seen);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    pub fn subscribed(&self) -> TableSet {
        self.subscribed
    }
}

impl Drop for ObserverRegistration {
    fn drop(&mut self) {
        let mut arena = self.arena.lock();
        let Some(slot) = arena.slots.get_mut(self.index) else {
            return;
        };
        if !slot.live || slot.generation != self.generation {
            return;
        }

        slot.live = false;
        slot.generation += 1;
        slot.dirty = TableSet::empty();
        arena.free.push(self.index);
    }
}
