//! Guarded references to tree nodes.
//!
//! Every [`NodeId`] is already generation-checked: once a node is destroyed,
//! its id no longer resolves in the [`Tree`](crate::Tree). That covers code
//! that holds the tree.
//!
//! [`GuardSlot`] is for holders that cannot consult the tree when they need
//! the answer (callbacks, caches, UI state living outside the graph). A slot
//! is registered in the node's guard list and is set to `None` the moment the
//! node is destroyed.
//!
//! ```
//! use cgui_core::Tree;
//!
//! let mut tree = Tree::new();
//! let root = tree.insert_root("root");
//! let child = tree.push(root, "child").unwrap();
//!
//! let slot = tree.guard(child).unwrap();
//! assert_eq!(slot.get(), Some(child));
//!
//! tree.delete(root, child);
//! assert!(slot.is_null());
//! assert_eq!(slot.get(), None);
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::node::NodeId;

/// An external reference to a node that reads `None` once the node is gone.
///
/// Dropping the slot deregisters it; the node prunes dead registrations the
/// next time a slot is registered or the node is destroyed.
#[derive(Clone)]
pub struct GuardSlot {
    target: Rc<Cell<Option<NodeId>>>,
}

impl GuardSlot {
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            target: Rc::new(Cell::new(Some(id))),
        }
    }

    /// The guarded node, or `None` if it has been destroyed or released.
    pub fn get(&self) -> Option<NodeId> {
        self.target.get()
    }

    /// Whether the guarded node is gone.
    pub fn is_null(&self) -> bool {
        self.target.get().is_none()
    }

    /// Stop tracking the node. All clones of this slot read `None` afterwards.
    pub fn release(&self) {
        self.target.set(None);
    }

    fn downgrade(&self) -> Weak<Cell<Option<NodeId>>> {
        Rc::downgrade(&self.target)
    }
}

impl fmt::Debug for GuardSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GuardSlot").field(&self.target.get()).finish()
    }
}

impl PartialEq<Option<NodeId>> for GuardSlot {
    fn eq(&self, other: &Option<NodeId>) -> bool {
        self.target.get() == *other
    }
}

/// Per-node list of registered guard slots.
#[derive(Default)]
pub(crate) struct GuardList {
    slots: Vec<Weak<Cell<Option<NodeId>>>>,
}

impl GuardList {
    /// Register a new slot pointing at `id`.
    pub(crate) fn register(&mut self, id: NodeId) -> GuardSlot {
        self.slots.retain(|weak| weak.strong_count() > 0);
        let slot = GuardSlot::new(id);
        self.slots.push(slot.downgrade());
        slot
    }

    /// Number of slots whose holders are still alive.
    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|weak| weak.strong_count() > 0).count()
    }

    /// Null every live slot and forget all registrations.
    pub(crate) fn invalidate(&mut self) -> usize {
        let mut nulled = 0;
        for weak in self.slots.drain(..) {
            if let Some(cell) = weak.upgrade() {
                cell.set(None);
                nulled += 1;
            }
        }
        nulled
    }
}
