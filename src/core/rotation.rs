//! Round-robin rotation over per-user backlog entries.
//!
//! Entries live in a stable arena indexed by [`EntryId`]; the rotation itself
//! is a separate list of active entry ids in arrival order plus a cursor into
//! that list. Retiring a user removes its id from the list and fixes up the
//! cursor, so the arena is never restructured while the cursor walks it.

use std::collections::HashMap;

use crate::util::serde::UserKey;

/// Stable arena index of a backlog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// Outcome of [`Rotation::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// User joined the tail of the rotation.
    Joined,
    /// User already had an entry; merged into it.
    Merged,
}

#[derive(Debug)]
struct Backlog {
    user: UserKey,
    in_flight: bool,
    /// Registered again while a dispatch was in flight.
    rearmed: bool,
}

/// Circular ordering of users holding a non-empty backlog.
#[derive(Debug, Default)]
pub struct Rotation {
    entries: Vec<Option<Backlog>>,
    free: Vec<usize>,
    index: HashMap<UserKey, usize>,
    order: Vec<usize>,
    cursor: usize,
}

impl Rotation {
    /// Empty rotation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one pending unit for `user`.
    pub fn register(&mut self, user: &UserKey) -> Registration {
        if let Some(&slot) = self.index.get(user) {
            if let Some(entry) = self.entries[slot].as_mut() {
                if entry.in_flight {
                    entry.rearmed = true;
                }
            }
            return Registration::Merged;
        }

        let backlog = Backlog {
            user: user.clone(),
            in_flight: false,
            rearmed: false,
        };
        let slot = if let Some(slot) = self.free.pop() {
            self.entries[slot] = Some(backlog);
            slot
        } else {
            self.entries.push(Some(backlog));
            self.entries.len() - 1
        };
        self.index.insert(user.clone(), slot);
        self.order.push(slot);
        Registration::Joined
    }

    /// Pick the next user without a dispatch in flight, starting at the
    /// cursor, mark it in flight and move the cursor past it.
    pub fn next_ready(&mut self) -> Option<(EntryId, UserKey)> {
        let len = self.order.len();
        for step in 0..len {
            let pos = (self.cursor + step) % len;
            let slot = self.order[pos];
            let Some(entry) = self.entries[slot].as_mut() else {
                continue;
            };
            if entry.in_flight {
                continue;
            }
            entry.in_flight = true;
            self.cursor = (pos + 1) % len;
            return Some((EntryId(slot), entry.user.clone()));
        }
        None
    }

    /// Record completion of the dispatch for `id`. Returns `true` when the
    /// user left the rotation.
    pub fn finish(&mut self, id: EntryId, backlog_empty: bool) -> bool {
        let Some(entry) = self.entries.get_mut(id.0).and_then(Option::as_mut) else {
            return false;
        };
        entry.in_flight = false;
        let rearmed = std::mem::take(&mut entry.rearmed);
        if backlog_empty && !rearmed {
            self.retire(id.0);
            return true;
        }
        false
    }

    fn retire(&mut self, slot: usize) {
        if let Some(pos) = self.order.iter().position(|&s| s == slot) {
            self.order.remove(pos);
            if pos < self.cursor {
                self.cursor -= 1;
            }
            if self.cursor >= self.order.len() {
                self.cursor = 0;
            }
        }
        if let Some(entry) = self.entries[slot].take() {
            self.index.remove(&entry.user);
        }
        self.free.push(slot);
    }

    /// Users currently in the rotation, in rotation order.
    pub fn users(&self) -> Vec<UserKey> {
        self.order
            .iter()
            .filter_map(|&slot| self.entries[slot].as_ref().map(|e| e.user.clone()))
            .collect()
    }

    /// Whether `user` holds an entry.
    pub fn contains(&self, user: &UserKey) -> bool {
        self.index.contains_key(user)
    }

    /// Number of active users.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// No active users.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
