//! LRU Recency List Module
//!
//! Doubly linked recency list stored in an index-addressed arena.
//!
//! Slots are reused through a free list, so a `SlotId` stays valid until the
//! value it points to is removed. All link updates are O(1).

// == Slot Id ==
/// Stable handle to a value stored in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Tracks access order for LRU eviction.
///
/// - Head = most recently used
/// - Tail = least recently used
#[derive(Debug)]
pub struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> RecencyList<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts a value as most recently used and returns its handle.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let node = Node {
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.attach_front(idx);
        self.len += 1;
        SlotId(idx)
    }

    // == Move To Front ==
    /// Marks a value as most recently used. Returns false for a stale handle.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head != Some(id.0) {
            self.detach(id.0);
            self.attach_front(id.0);
        }
        true
    }

    // == Remove ==
    /// Unlinks and returns the value behind `id`.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        self.detach(id.0);
        let node = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used value.
    pub fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        self.remove(SlotId(tail))
    }

    // == Peek Back ==
    /// Returns the least recently used value without removing it.
    pub fn peek_back(&self) -> Option<&T> {
        self.tail.and_then(|idx| self.get(SlotId(idx)))
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots
            .get(id.0)
            .and_then(|slot| slot.as_ref())
            .map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots
            .get_mut(id.0)
            .and_then(|slot| slot.as_mut())
            .map(|node| &mut node.value)
    }

    pub fn contains(&self, id: SlotId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates from most to least recently used.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    fn node(&self, idx: usize) -> &Node<T> {
        match self.slots[idx].as_ref() {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<T> {
        match self.slots[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {idx} is vacant"),
        }
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn attach_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    cursor: Option<usize>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.node(idx);
        self.cursor = node.next;
        Some(&node.value)
    }
}
