//! Node wrappers and the pool that recycles them.
//!
//! High-frequency add/remove traffic on a [`List`](crate::List) would otherwise
//! grow its node storage on every insertion. The pool keeps disposed slots on a
//! free list and hands them back out before allocating fresh ones.

/// Index of a node slot inside a [`NodePool`].
///
/// Ids are stable for as long as the node stays linked. Once a node is
/// disposed its id may be reissued for a different instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the raw slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A list node: neighbour links plus the wrapped instance.
#[derive(Debug, Clone)]
pub struct Node<T> {
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) instance: Option<T>,
    free: bool,
}

impl<T> Node<T> {
    const fn empty() -> Self {
        Self {
            prev: None,
            next: None,
            instance: None,
            free: false,
        }
    }

    /// The instance this node wraps, if it is in use.
    #[must_use]
    pub fn instance(&self) -> Option<&T> {
        self.instance.as_ref()
    }

    /// The previous node in the owning list.
    #[must_use]
    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    /// The next node in the owning list.
    #[must_use]
    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Returns `true` if the node holds no links and no instance.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.prev.is_none() && self.next.is_none() && self.instance.is_none()
    }

    fn reset(&mut self) {
        self.prev = None;
        self.next = None;
        self.instance = None;
    }
}

/// Free-list pool of [`Node`] slots.
///
/// # Thread Safety
///
/// The pool is owned by a single list and is not shared across threads.
#[derive(Debug, Clone)]
pub struct NodePool<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
}

impl<T> NodePool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Returns a fully reset node, reusing a disposed one when available.
    pub fn get(&mut self) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0].free = false;
            return id;
        }
        self.nodes.push(Node::empty());
        NodeId(self.nodes.len() - 1)
    }

    /// Reset a node and return it to the free list.
    ///
    /// The node drops its instance and its neighbour links, so nothing
    /// disposed keeps a reference to its former owner. Disposing a node that
    /// is already free does nothing.
    pub fn dispose(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        if node.free {
            return;
        }
        node.reset();
        node.free = true;
        self.free.push(id);
    }

    /// Pre-populate the free list with `count` fresh nodes.
    pub fn warmup(&mut self, count: usize) -> &mut Self {
        self.nodes.reserve(count);
        self.free.reserve(count);
        for _ in 0..count {
            self.nodes.push(Node {
                free: true,
                ..Node::empty()
            });
            self.free.push(NodeId(self.nodes.len() - 1));
        }
        self
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    /// Number of nodes waiting on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of nodes currently handed out.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Total number of node slots ever allocated.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn slot(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub(crate) fn slot_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }
}

impl<T> Default for NodePool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_allocates_when_empty() {
        let mut pool: NodePool<u32> = NodePool::new();
        let a = pool.get();
        let b = pool.get();
        assert_ne!(a, b);
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_dispose_then_get_reuses_slot() {
        let mut pool: NodePool<u32> = NodePool::new();
        let a = pool.get();
        pool.dispose(a);
        assert_eq!(pool.free_count(), 1);
        let b = pool.get();
        assert_eq!(a, b);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn test_disposed_node_holds_no_residual_links() {
        let mut pool: NodePool<u32> = NodePool::new();
        let a = pool.get();
        let b = pool.get();
        {
            let node = pool.slot_mut(a);
            node.instance = Some(7);
            node.next = Some(b);
            node.prev = Some(b);
        }
        pool.dispose(a);
        assert!(pool.node(a).is_some_and(Node::is_reset));

        let reissued = pool.get();
        assert_eq!(reissued, a);
        assert!(pool.slot(reissued).is_reset());
    }

    #[test]
    fn test_double_dispose_is_ignored() {
        let mut pool: NodePool<u32> = NodePool::new();
        let a = pool.get();
        pool.dispose(a);
        pool.dispose(a);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.in_use(), 0);

        let x = pool.get();
        let y = pool.get();
        assert_ne!(x, y);
        assert_eq!(pool.in_use(), 2);
    }

    #[test]
    fn test_dispose_of_warmed_node_is_ignored() {
        let mut pool: NodePool<u32> = NodePool::new();
        pool.warmup(2);
        pool.dispose(NodeId(0));
        assert_eq!(pool.free_count(), 2);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn test_warmup_prepopulates_free_list() {
        let mut pool: NodePool<u32> = NodePool::new();
        pool.warmup(16);
        assert_eq!(pool.free_count(), 16);
        assert_eq!(pool.in_use(), 0);

        let _ = pool.get();
        assert_eq!(pool.free_count(), 15);
        assert_eq!(pool.capacity(), 16);
    }
}
