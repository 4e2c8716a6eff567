use super::KdTree;
use parking_lot::RwLock;
use std::sync::Arc;

/// A shared slot holding the current [`KdTree`] of a scene.
///
/// Render threads take a snapshot with [`KdTreeHandle::load`] and keep querying it while a
/// new tree, built for modified geometry, is published with [`KdTreeHandle::publish`].
/// Readers never observe a partially built tree: a snapshot is either the old tree or the
/// new one.
#[derive(Debug, Default)]
pub struct KdTreeHandle {
    current: RwLock<Arc<KdTree>>,
}

impl KdTreeHandle {
    /// A handle to an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the given tree.
    pub fn from_tree(tree: KdTree) -> Self {
        Self {
            current: RwLock::new(Arc::new(tree)),
        }
    }

    /// A snapshot of the current tree.
    #[inline]
    pub fn load(&self) -> Arc<KdTree> {
        self.current.read().clone()
    }

    /// Replaces the current tree, and returns the previous one.
    ///
    /// Snapshots taken before this call keep referencing the previous tree.
    pub fn publish(&self, tree: KdTree) -> Arc<KdTree> {
        let tree = Arc::new(tree);
        std::mem::replace(&mut *self.current.write(), tree)
    }

    /// Builds a new tree from a snapshot of the current one, publishes it, and returns it.
    ///
    /// `f` runs without holding the lock, so readers aren't blocked during the
    /// construction. If another tree is published while `f` runs, the last one published
    /// wins.
    pub fn rebuild_with(&self, f: impl FnOnce(&KdTree) -> KdTree) -> Arc<KdTree> {
        let snapshot = self.load();
        let tree = Arc::new(f(&snapshot));
        *self.current.write() = tree.clone();
        tree
    }
}

impl From<KdTree> for KdTreeHandle {
    fn from(tree: KdTree) -> Self {
        Self::from_tree(tree)
    }
}
