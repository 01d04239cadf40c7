//! Thread-safe intrusive-style doubly linked lists over arena indices.
//!
//! A textbook intrusive list stores `prev`/`next`/`parent` inside the linked
//! value itself. Here the value lives in a [`generational_arena::Arena`]
//! owned by a cache and is addressed purely by [`Index`]; the list instead
//! keeps its own topology map keyed by `Index`. This sidesteps back-pointers
//! entirely while preserving every operation and invariant the spec cares
//! about: `contains(idx)` is the "`member.parent == list`" test the
//! restart-loop protocol relies on, and mutations still happen under a
//! single per-list lock (see the "Per-list internal mutexes" lock class).

use fxhash::FxHashMap;
use generational_arena::Index;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Node {
    prev: Option<Index>,
    next: Option<Index>,
}

#[derive(Debug, Default)]
struct Topology {
    head: Option<Index>,
    tail: Option<Index>,
    nodes: FxHashMap<Index, Node>,
}

#[derive(Debug, Default)]
pub struct IntrusiveList {
    state: Mutex<Topology>,
}

impl IntrusiveList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links `idx` at the back. No-op (returns `false`) if already a member.
    pub fn push_back(&self, idx: Index) -> bool {
        let mut state = self.state.lock();
        if state.nodes.contains_key(&idx) {
            return false;
        }
        let prev = state.tail;
        state.nodes.insert(idx, Node { prev, next: None });
        if let Some(prev) = prev {
            state.nodes.get_mut(&prev).unwrap().next = Some(idx);
        } else {
            state.head = Some(idx);
        }
        state.tail = Some(idx);
        true
    }

    /// Links `idx` at the front. No-op (returns `false`) if already a member.
    pub fn push_front(&self, idx: Index) -> bool {
        let mut state = self.state.lock();
        if state.nodes.contains_key(&idx) {
            return false;
        }
        let next = state.head;
        state.nodes.insert(idx, Node { prev: None, next });
        if let Some(next) = next {
            state.nodes.get_mut(&next).unwrap().prev = Some(idx);
        } else {
            state.tail = Some(idx);
        }
        state.head = Some(idx);
        true
    }

    pub fn front(&self) -> Option<Index> {
        self.state.lock().head
    }

    pub fn back(&self) -> Option<Index> {
        self.state.lock().tail
    }

    pub fn contains(&self, idx: Index) -> bool {
        self.state.lock().nodes.contains_key(&idx)
    }

    /// Unlinks `idx`. No-op (returns `false`) if not currently a member —
    /// this is what makes it safe to call after a caller only holds a stale
    /// pointer/index to an entry that may have already moved.
    pub fn remove(&self, idx: Index) -> bool {
        let mut state = self.state.lock();
        Self::remove_locked(&mut state, idx)
    }

    fn remove_locked(state: &mut Topology, idx: Index) -> bool {
        let Some(node) = state.nodes.remove(&idx) else {
            return false;
        };
        match node.prev {
            Some(prev) => state.nodes.get_mut(&prev).unwrap().next = node.next,
            None => state.head = node.next,
        }
        match node.next {
            Some(next) => state.nodes.get_mut(&next).unwrap().prev = node.prev,
            None => state.tail = node.prev,
        }
        true
    }

    /// No-op if `idx` is not currently a member of this list.
    pub fn move_to_back(&self, idx: Index) -> bool {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(&idx) {
            return false;
        }
        if state.tail == Some(idx) {
            return true;
        }
        Self::remove_locked(&mut state, idx);
        let prev = state.tail;
        state.nodes.insert(idx, Node { prev, next: None });
        if let Some(prev) = prev {
            state.nodes.get_mut(&prev).unwrap().next = Some(idx);
        } else {
            state.head = Some(idx);
        }
        state.tail = Some(idx);
        true
    }

    /// No-op if `idx` is not currently a member of this list.
    pub fn move_to_front(&self, idx: Index) -> bool {
        let mut state = self.state.lock();
        if !state.nodes.contains_key(&idx) {
            return false;
        }
        if state.head == Some(idx) {
            return true;
        }
        Self::remove_locked(&mut state, idx);
        let next = state.head;
        state.nodes.insert(idx, Node { prev: None, next });
        if let Some(next) = next {
            state.nodes.get_mut(&next).unwrap().prev = Some(idx);
        } else {
            state.tail = Some(idx);
        }
        state.head = Some(idx);
        true
    }

    /// Rotates the current front to the back, returning the index that moved.
    pub fn move_front_to_back(&self) -> Option<Index> {
        let head = self.front()?;
        self.move_to_back(head);
        Some(head)
    }

    /// Exchanges the positions of `a` and `b`. No-op if either is absent.
    pub fn swap(&self, a: Index, b: Index) {
        if a == b {
            return;
        }
        let mut state = self.state.lock();
        if !state.nodes.contains_key(&a) || !state.nodes.contains_key(&b) {
            return;
        }

        let mut order = Vec::with_capacity(state.nodes.len());
        let mut cur = state.head;
        while let Some(idx) = cur {
            order.push(idx);
            cur = state.nodes.get(&idx).and_then(|n| n.next);
        }

        let pa = order.iter().position(|&x| x == a).unwrap();
        let pb = order.iter().position(|&x| x == b).unwrap();
        order.swap(pa, pb);

        state.nodes.clear();
        state.head = order.first().copied();
        state.tail = order.last().copied();
        for (i, &idx) in order.iter().enumerate() {
            let prev = if i == 0 { None } else { Some(order[i - 1]) };
            let next = order.get(i + 1).copied();
            state.nodes.insert(idx, Node { prev, next });
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time front-to-back copy of the list's order.
    pub fn snapshot(&self) -> Vec<Index> {
        let state = self.state.lock();
        let mut out = Vec::with_capacity(state.nodes.len());
        let mut cur = state.head;
        while let Some(idx) = cur {
            out.push(idx);
            cur = state.nodes.get(&idx).and_then(|n| n.next);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generational_arena::Arena;

    fn indices(n: usize) -> (Arena<()>, Vec<Index>) {
        let mut arena = Arena::new();
        let idxs = (0..n).map(|_| arena.insert(())).collect();
        (arena, idxs)
    }

    #[test]
    fn push_back_preserves_order() {
        let (_arena, idx) = indices(3);
        let list = IntrusiveList::new();
        assert!(list.push_back(idx[0]));
        assert!(list.push_back(idx[1]));
        assert!(list.push_back(idx[2]));
        assert_eq!(list.snapshot(), idx);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn push_back_twice_is_noop() {
        let (_arena, idx) = indices(1);
        let list = IntrusiveList::new();
        assert!(list.push_back(idx[0]));
        assert!(!list.push_back(idx[0]));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let (_arena, idx) = indices(1);
        let list = IntrusiveList::new();
        assert!(!list.remove(idx[0]));
    }

    #[test]
    fn move_to_back_reorders() {
        let (_arena, idx) = indices(3);
        let list = IntrusiveList::new();
        for &i in &idx {
            list.push_back(i);
        }
        list.move_to_back(idx[0]);
        assert_eq!(list.snapshot(), vec![idx[1], idx[2], idx[0]]);
    }

    #[test]
    fn move_front_to_back_rotates() {
        let (_arena, idx) = indices(3);
        let list = IntrusiveList::new();
        for &i in &idx {
            list.push_back(i);
        }
        let moved = list.move_front_to_back();
        assert_eq!(moved, Some(idx[0]));
        assert_eq!(list.snapshot(), vec![idx[1], idx[2], idx[0]]);
    }

    #[test]
    fn remove_middle_relinks_neighbors() {
        let (_arena, idx) = indices(3);
        let list = IntrusiveList::new();
        for &i in &idx {
            list.push_back(i);
        }
        assert!(list.remove(idx[1]));
        assert_eq!(list.snapshot(), vec![idx[0], idx[2]]);
        assert!(!list.contains(idx[1]));
    }
}
