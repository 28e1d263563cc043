use crate::Fault;
use log::trace;

/// Initial (and minimum) stack capacity, in words
pub const INITIAL_CAPACITY: usize = 32;

/// Largest stack capacity, in words
///
/// A full stack at this size doesn't grow, so the next push faults.
pub const MAX_CAPACITY: usize = 1 << 24;

/// Growable LIFO stack backing `push`, `pop`, `call`, and `ret`
///
/// Unlike a plain `Vec`, the capacity is part of the machine state: it is
/// saved in checkpoints and only changes when [`Stack::reconcile`] is called,
/// which the engine does once after every instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stack {
    /// Backing buffer; its length is the allocated capacity
    data: Vec<u16>,

    /// Number of valid items at the start of `data`
    used: usize,
}

/// Result of a call to [`Stack::reconcile`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resize {
    /// Capacity did not change
    Unchanged,
    /// Capacity was doubled
    Grew,
    /// Capacity was halved
    Shrank,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Builds an empty stack with the initial capacity
    pub fn new() -> Self {
        Self {
            data: vec![0; INITIAL_CAPACITY],
            used: 0,
        }
    }

    /// Rebuilds a stack from its saved contents and capacity
    ///
    /// Returns `None` if the items don't fit, the capacity is zero or above
    /// [`MAX_CAPACITY`], or the buffer can't be allocated.
    pub fn from_parts(items: &[u16], capacity: usize) -> Option<Self> {
        if capacity == 0 || capacity > MAX_CAPACITY || items.len() > capacity {
            return None;
        }
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).ok()?;
        data.extend_from_slice(items);
        data.resize(capacity, 0);
        Some(Self {
            data,
            used: items.len(),
        })
    }

    /// Returns the number of items on the stack
    #[inline]
    pub fn len(&self) -> usize {
        self.used
    }

    /// Checks whether the stack is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Returns the allocated capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the valid items, bottom first
    #[inline]
    pub fn as_slice(&self) -> &[u16] {
        &self.data[..self.used]
    }

    /// Returns the top item without removing it
    #[inline]
    pub fn peek(&self) -> Option<u16> {
        self.as_slice().last().copied()
    }

    /// Pushes a value, returning `false` if the buffer is full
    #[inline]
    #[must_use]
    pub fn push(&mut self, v: u16) -> bool {
        match self.data.get_mut(self.used) {
            Some(slot) => {
                *slot = v;
                self.used += 1;
                true
            }
            None => false,
        }
    }

    /// Pops a value, returning `None` if the stack is empty
    #[inline]
    pub fn pop(&mut self) -> Option<u16> {
        self.used = self.used.checked_sub(1)?;
        Some(self.data[self.used])
    }

    /// Applies the resize policy
    ///
    /// A full buffer doubles (up to [`MAX_CAPACITY`]); a buffer above the
    /// initial capacity which is less than a quarter full is halved.
    pub fn reconcile(&mut self) -> Result<Resize, Fault> {
        let capacity = self.capacity();
        if self.used > capacity {
            return Err(Fault::StackCorrupt {
                used: self.used,
                capacity,
            });
        }
        let (size, out) = if self.used == capacity && capacity < MAX_CAPACITY {
            ((capacity * 2).min(MAX_CAPACITY), Resize::Grew)
        } else if capacity > INITIAL_CAPACITY && self.used < capacity / 4 {
            (capacity / 2, Resize::Shrank)
        } else {
            return Ok(Resize::Unchanged);
        };
        trace!("resizing stack from {capacity} to {size} ({} used)", self.used);
        let mut data = vec![0; size];
        data[..self.used].copy_from_slice(self.as_slice());
        self.data = data;
        Ok(out)
    }
}
