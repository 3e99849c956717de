//! Ordered container with O(1) removal by instance.
//!
//! A [`List`] is a doubly-linked list whose nodes live in a [`NodePool`]. The
//! list keeps an instance → node map, so removing a member never walks the
//! chain. Because the map belongs to the list rather than to the instance, the
//! same instance can be a member of any number of different lists at once
//! (the world's entity list and several systems' node lists, for example).
//!
//! Every successful append/prepend emits [`ListEvent::Add`] and every removal
//! emits [`ListEvent::Remove`] on the list's own [`EventBus`].

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::trace;

use crate::error::ListError;
use crate::events::{EventBus, SubscriptionId};
use crate::pool::{NodeId, NodePool};

/// Membership notifications emitted by a [`List`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListEvent {
    /// An instance was linked in.
    Add,
    /// An instance was unlinked.
    Remove,
}

/// Ordered container of instance handles.
#[derive(Debug)]
pub struct List<T> {
    name: String,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
    pool: NodePool<T>,
    links: HashMap<T, NodeId>,
    events: EventBus<ListEvent, T>,
}

impl<T> List<T>
where
    T: Copy + Eq + Hash + Debug,
{
    /// Create an empty list. The name shows up in logs and errors.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: None,
            tail: None,
            len: 0,
            pool: NodePool::new(),
            links: HashMap::new(),
            events: EventBus::new(),
        }
    }

    /// Create an empty list whose pool already holds `warmup` spare nodes.
    #[must_use]
    pub fn with_warmup(name: impl Into<String>, warmup: usize) -> Self {
        let mut list = Self::new(name);
        list.pool.warmup(warmup);
        list.links.reserve(warmup);
        list
    }

    /// The list's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Link `instance` at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `instance` is already a member.
    pub fn append(&mut self, instance: T) -> Result<NodeId, ListError> {
        let id = self.acquire(instance)?;
        match self.tail {
            Some(tail) => {
                self.pool.slot_mut(tail).next = Some(id);
                self.pool.slot_mut(id).prev = Some(tail);
                self.tail = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }
        self.linked(instance);
        Ok(id)
    }

    /// Link `instance` at the head.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::AlreadyLinked`] if `instance` is already a member.
    pub fn prepend(&mut self, instance: T) -> Result<NodeId, ListError> {
        let id = self.acquire(instance)?;
        match self.head {
            Some(head) => {
                self.pool.slot_mut(head).prev = Some(id);
                self.pool.slot_mut(id).next = Some(head);
                self.head = Some(id);
            }
            None => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }
        self.linked(instance);
        Ok(id)
    }

    /// Unlink `instance`.
    ///
    /// Returns `false`, without notifying anyone, if it was not a member.
    pub fn remove(&mut self, instance: T) -> bool {
        match self.links.get(&instance).copied() {
            Some(id) => {
                self.unlink(id, instance);
                true
            }
            None => false,
        }
    }

    /// Unlink the member held by node `id`.
    ///
    /// Returns `false` if the node is not currently linked into this list.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(instance) = self.pool.node(id).and_then(|n| n.instance) else {
            return false;
        };
        if self.links.get(&instance) != Some(&id) {
            return false;
        }
        self.unlink(id, instance);
        true
    }

    /// Unlink every member, head first. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        while let Some(head) = self.head {
            let Some(instance) = self.pool.slot(head).instance else {
                break;
            };
            self.unlink(head, instance);
            removed += 1;
        }
        removed
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the list has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `instance` is a member.
    #[must_use]
    pub fn contains(&self, instance: &T) -> bool {
        self.links.contains_key(instance)
    }

    /// The node currently holding `instance`.
    #[must_use]
    pub fn node_of(&self, instance: &T) -> Option<NodeId> {
        self.links.get(instance).copied()
    }

    /// The head member.
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.head.and_then(|id| self.pool.slot(id).instance)
    }

    /// The tail member.
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.tail.and_then(|id| self.pool.slot(id).instance)
    }

    /// Iterate members from head to tail.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Call `f` for every member from head to tail.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(T),
    {
        for instance in self {
            f(instance);
        }
    }

    /// Start a traversal that tolerates mutation of the list between steps.
    #[must_use]
    pub fn cursor(&self) -> Cursor<T> {
        Cursor {
            current: None,
            next: self.first(),
        }
    }

    /// Collect the members into a `Vec`, head first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    fn successor(&self, instance: &T) -> Option<T> {
        let id = self.node_of(instance)?;
        let next = self.pool.slot(id).next?;
        self.pool.slot(next).instance
    }

    /// Register a membership observer.
    pub fn subscribe<F>(&mut self, event: ListEvent, handler: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        self.events.subscribe(event, handler)
    }

    /// Remove a membership observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// The pool backing this list's nodes.
    #[must_use]
    pub fn pool(&self) -> &NodePool<T> {
        &self.pool
    }

    fn acquire(&mut self, instance: T) -> Result<NodeId, ListError> {
        if self.links.contains_key(&instance) {
            return Err(ListError::AlreadyLinked {
                list: self.name.clone(),
                instance: format!("{instance:?}"),
            });
        }
        let id = self.pool.get();
        self.pool.slot_mut(id).instance = Some(instance);
        self.links.insert(instance, id);
        Ok(id)
    }

    fn linked(&mut self, instance: T) {
        self.len += 1;
        trace!(list = %self.name, ?instance, len = self.len, "linked");
        self.events.trigger(ListEvent::Add, &instance);
    }

    fn unlink(&mut self, id: NodeId, instance: T) {
        let (prev, next) = {
            let node = self.pool.slot(id);
            (node.prev, node.next)
        };

        if self.tail == Some(id) {
            self.tail = prev;
        }
        if self.head == Some(id) {
            self.head = next;
        }
        if let Some(prev) = prev {
            self.pool.slot_mut(prev).next = next;
        }
        if let Some(next) = next {
            self.pool.slot_mut(next).prev = prev;
        }

        self.links.remove(&instance);
        self.pool.dispose(id);
        self.len -= 1;
        trace!(list = %self.name, ?instance, len = self.len, "unlinked");
        self.events.trigger(ListEvent::Remove, &instance);
    }
}

/// Borrowing iterator over a [`List`], head to tail.
#[derive(Debug)]
pub struct Iter<'a, T> {
    list: &'a List<T>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<T: Copy> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let id = self.next?;
        let node = self.list.pool.slot(id);
        self.next = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        node.instance
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a List<T>
where
    T: Copy + Eq + Hash + Debug,
{
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Detached traversal state for a [`List`].
///
/// Each [`advance`](Cursor::advance) yields the current member and captures
/// its successor before returning, so the caller may remove the yielded member
/// or append new ones before the next step. If the captured successor has been
/// removed in the meantime, traversal resumes from the last yielded member's
/// node instead. It ends early only when both of those are gone.
#[derive(Debug, Clone)]
pub struct Cursor<T> {
    current: Option<T>,
    next: Option<T>,
}

impl<T> Cursor<T>
where
    T: Copy + Eq + Hash + Debug,
{
    /// Yield the next member of `list`.
    pub fn advance(&mut self, list: &List<T>) -> Option<T> {
        let current = match self.next.take() {
            Some(next) if list.contains(&next) => next,
            _ => self.current.and_then(|prev| list.successor(&prev))?,
        };
        self.next = list.successor(&current);
        self.current = Some(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn list_of(items: &[u32]) -> List<u32> {
        let mut list = List::new("test");
        for &item in items {
            list.append(item).unwrap();
        }
        list
    }

    #[test]
    fn test_append_keeps_insertion_order() {
        let list = list_of(&[1, 2, 3]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
        assert_eq!(list.first(), Some(1));
        assert_eq!(list.last(), Some(3));
    }

    #[test]
    fn test_prepend_puts_instance_at_head() {
        let mut list = list_of(&[2, 3]);
        list.prepend(1).unwrap();
        assert_eq!(list.to_vec(), vec![1, 2, 3]);

        let mut empty: List<u32> = List::new("empty");
        empty.prepend(9).unwrap();
        assert_eq!(empty.first(), Some(9));
        assert_eq!(empty.last(), Some(9));
    }

    #[test]
    fn test_double_append_is_rejected() {
        let mut list = list_of(&[1]);
        let err = list.append(1).unwrap_err();
        assert!(matches!(err, ListError::AlreadyLinked { .. }));
        assert!(list.prepend(1).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_remove_head_middle_tail() {
        let mut list = list_of(&[1, 2, 3, 4]);
        assert!(list.remove(1));
        assert_eq!(list.to_vec(), vec![2, 3, 4]);
        assert!(list.remove(3));
        assert_eq!(list.to_vec(), vec![2, 4]);
        assert!(list.remove(4));
        assert_eq!(list.to_vec(), vec![2]);
        assert_eq!(list.first(), list.last());
        assert!(list.remove(2));
        assert!(list.is_empty());
        assert_eq!(list.first(), None);
        assert_eq!(list.last(), None);
    }

    #[test]
    fn test_remove_missing_is_silent() {
        let notified = Rc::new(RefCell::new(0));
        let mut list = list_of(&[1, 2]);
        let sink = Rc::clone(&notified);
        list.subscribe(ListEvent::Remove, move |_| *sink.borrow_mut() += 1);

        assert!(!list.remove(42));
        assert_eq!(list.len(), 2);
        assert_eq!(*notified.borrow(), 0);
    }

    #[test]
    fn test_remove_node_by_id() {
        let mut list: List<u32> = List::new("test");
        list.append(1).unwrap();
        let id = list.append(2).unwrap();
        list.append(3).unwrap();

        assert!(list.remove_node(id));
        assert!(!list.remove_node(id));
        assert_eq!(list.to_vec(), vec![1, 3]);
    }

    #[test]
    fn test_instance_can_rejoin_after_removal() {
        let mut list = list_of(&[1, 2]);
        assert!(list.remove(1));
        list.append(1).unwrap();
        assert_eq!(list.to_vec(), vec![2, 1]);
    }

    #[test]
    fn test_same_instance_in_two_lists() {
        let mut world = list_of(&[7]);
        let mut system = list_of(&[7]);
        assert!(system.remove(7));
        assert!(world.contains(&7));
        assert!(world.remove(7));
    }

    #[test]
    fn test_nodes_are_recycled_through_pool() {
        let mut list: List<u32> = List::with_warmup("warm", 4);
        assert_eq!(list.pool().free_count(), 4);

        list.append(1).unwrap();
        list.append(2).unwrap();
        assert_eq!(list.pool().free_count(), 2);

        list.remove(1);
        list.append(3).unwrap();
        assert_eq!(list.pool().capacity(), 4);
        assert_eq!(list.pool().in_use(), 2);
    }

    #[test]
    fn test_add_and_remove_notifications() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut list: List<u32> = List::new("observed");

        let sink = Rc::clone(&log);
        list.subscribe(ListEvent::Add, move |v| sink.borrow_mut().push(("add", *v)));
        let sink = Rc::clone(&log);
        let remove_sub =
            list.subscribe(ListEvent::Remove, move |v| sink.borrow_mut().push(("remove", *v)));

        list.append(1).unwrap();
        list.prepend(2).unwrap();
        list.remove(1);
        assert!(list.unsubscribe(remove_sub));
        list.remove(2);

        assert_eq!(*log.borrow(), vec![("add", 1), ("add", 2), ("remove", 1)]);
    }

    #[test]
    fn test_cursor_survives_removal_of_current() {
        let mut list = list_of(&[1, 2, 3, 4]);
        let mut visited = Vec::new();
        let mut cursor = list.cursor();
        while let Some(item) = cursor.advance(&list) {
            visited.push(item);
            if item % 2 == 0 {
                list.remove(item);
            }
        }
        assert_eq!(visited, vec![1, 2, 3, 4]);
        assert_eq!(list.to_vec(), vec![1, 3]);
    }

    #[test]
    fn test_cursor_drains_whole_list() {
        let mut list = list_of(&[1, 2, 3]);
        let mut cursor = list.cursor();
        while let Some(item) = cursor.advance(&list) {
            list.remove(item);
        }
        assert!(list.is_empty());
        assert_eq!(list.pool().in_use(), 0);
    }

    #[test]
    fn test_cursor_sees_members_appended_during_traversal() {
        let mut list = list_of(&[1]);
        let mut visited = Vec::new();
        let mut cursor = list.cursor();
        while let Some(item) = cursor.advance(&list) {
            visited.push(item);
            if item < 3 {
                list.append(item + 1).unwrap();
            }
        }
        assert_eq!(visited, vec![1, 2, 3]);
        assert_eq!(list.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_skips_removed_successor() {
        let mut list = list_of(&[1, 2, 3, 4]);
        let mut visited = Vec::new();
        let mut cursor = list.cursor();
        while let Some(item) = cursor.advance(&list) {
            visited.push(item);
            if item == 1 {
                list.remove(2);
            }
        }
        assert_eq!(visited, vec![1, 3, 4]);
    }

    #[test]
    fn test_cursor_stops_when_current_and_successor_are_gone() {
        let mut list = list_of(&[1, 2, 3]);
        let mut visited = Vec::new();
        let mut cursor = list.cursor();
        while let Some(item) = cursor.advance(&list) {
            visited.push(item);
            list.remove(1);
            list.remove(2);
        }
        assert_eq!(visited, vec![1]);
        assert_eq!(list.to_vec(), vec![3]);
    }

    #[test]
    fn test_clear_emits_remove_per_member() {
        let removed = Rc::new(RefCell::new(Vec::new()));
        let mut list = list_of(&[5, 6, 7]);
        let sink = Rc::clone(&removed);
        list.subscribe(ListEvent::Remove, move |v| sink.borrow_mut().push(*v));

        assert_eq!(list.clear(), 3);
        assert!(list.is_empty());
        assert_eq!(*removed.borrow(), vec![5, 6, 7]);
    }

    #[test]
    fn test_for_each_visits_in_order() {
        let list = list_of(&[3, 1, 2]);
        let mut seen = Vec::new();
        list.for_each(|v| seen.push(v));
        assert_eq!(seen, vec![3, 1, 2]);
    }
}
