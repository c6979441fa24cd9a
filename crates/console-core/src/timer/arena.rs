//! Generational slot arena backing the timer pool.
//!
//! Slots are addressed by index.  Free slots form a singly linked chain of
//! indices threaded through the `Free` entries, so allocating and recycling a
//! slot are both O(1) and never touch the allocator once the arena has grown
//! to its working size.
//!
//! # Free-list order (for beginners)
//!
//! The chain is a stack: [`TimerArena::remove`] pushes the released slot onto
//! the head and [`TimerArena::insert`] pops the head.  The most recently
//! recycled slot is therefore the first one reused (LIFO), which keeps the hot
//! slot in cache on a tight schedule/fire cycle.
//!
//! Every slot carries a generation counter that is bumped on release.  A
//! [`SlotKey`] remembers the generation it was issued with, so a key that
//! outlives its slot simply stops resolving instead of aliasing the next
//! occupant.

/// Stable reference to an occupied arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl SlotKey {
    /// Slot index inside the arena.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot had when this key was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

enum Entry<T> {
    Occupied { value: T, generation: u32 },
    Free { next_free: Option<u32>, generation: u32 },
}

/// Growable arena with an intrusive LIFO free list.
pub struct TimerArena<T> {
    entries: Vec<Entry<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for TimerArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerArena<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Stores `value`, reusing the most recently freed slot when one exists.
    pub fn insert(&mut self, value: T) -> SlotKey {
        self.len += 1;

        if let Some(head) = self.free_head {
            let slot = &mut self.entries[head as usize];
            let (next_free, generation) = match &*slot {
                Entry::Free {
                    next_free,
                    generation,
                } => (*next_free, *generation),
                // free_head only ever points at Free entries
                Entry::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            *slot = Entry::Occupied { value, generation };
            self.free_head = next_free;
            return SlotKey {
                index: head,
                generation,
            };
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry::Occupied {
            value,
            generation: 0,
        });
        SlotKey {
            index,
            generation: 0,
        }
    }

    /// Releases the slot behind `key` and returns its value.
    ///
    /// Returns `None` for a stale key or an already free slot.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.entries.get_mut(key.index as usize)?;
        match &*slot {
            Entry::Occupied { generation, .. } if *generation == key.generation => {}
            _ => return None,
        }

        let released = std::mem::replace(
            slot,
            Entry::Free {
                next_free: self.free_head,
                generation: key.generation.wrapping_add(1),
            },
        );
        self.free_head = Some(key.index);
        self.len -= 1;

        match released {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Free { .. } => None,
        }
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        match self.entries.get(key.index as usize)? {
            Entry::Occupied { value, generation } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        match self.entries.get_mut(key.index as usize)? {
            Entry::Occupied { value, generation } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    /// Returns `true` while `key` still refers to its original occupant.
    pub fn contains(&self, key: SlotKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of slots ever allocated (occupied plus free).
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over every occupied slot.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match entry {
                Entry::Occupied { value, generation } => Some((
                    SlotKey {
                        index: index as u32,
                        generation: *generation,
                    },
                    value,
                )),
                Entry::Free { .. } => None,
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
