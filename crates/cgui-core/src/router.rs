//! OS event routing.
//!
//! Events originate at generator entities (those whose behavior provides
//! [`Behavior::poll_os_event`](crate::Behavior::poll_os_event)). Each frame
//! the scene drains every generator in registration order and walks the
//! generator's own subtree in pre-order for each event:
//!
//! 1. A node with handlers runs them in registration order. A handler that
//!    returns [`Propagation::Stop`] ends the walk down that branch.
//! 2. A node without handlers whose behavior provides `handle_os_event` gets
//!    that hook instead, with the same stop rule.
//! 3. Otherwise the event continues to the node's children.

use crate::capability::{Capabilities, Propagation};
use crate::error::{GraphError, GraphResult};
use crate::logging::{span_names, targets};
use crate::node::NodeId;
use crate::scene::{Context, Scene};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// An OS-originated event.
///
/// The routing machinery only looks at [`OsEvent::kind`]; payloads are for
/// handlers to interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum OsEvent {
    /// The window was asked to close.
    Closed,
    Resized { width: u32, height: u32 },
    Moved { x: i32, y: i32 },
    FocusGained,
    FocusLost,
    Key {
        /// Logical key name, e.g. `"Escape"` or `"a"`.
        key: String,
        pressed: bool,
        repeat: bool,
    },
    /// Committed text input.
    Text(String),
    MouseMoved { x: f64, y: f64 },
    MouseButton { button: PointerButton, pressed: bool },
    MouseWheel { dx: f32, dy: f32 },
    /// Application-defined event.
    Custom(u32),
}

/// Discriminant of an [`OsEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Closed,
    Resized,
    Moved,
    FocusGained,
    FocusLost,
    Key,
    Text,
    MouseMoved,
    MouseButton,
    MouseWheel,
    Custom,
}

impl OsEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Closed => EventKind::Closed,
            Self::Resized { .. } => EventKind::Resized,
            Self::Moved { .. } => EventKind::Moved,
            Self::FocusGained => EventKind::FocusGained,
            Self::FocusLost => EventKind::FocusLost,
            Self::Key { .. } => EventKind::Key,
            Self::Text(_) => EventKind::Text,
            Self::MouseMoved { .. } => EventKind::MouseMoved,
            Self::MouseButton { .. } => EventKind::MouseButton,
            Self::MouseWheel { .. } => EventKind::MouseWheel,
            Self::Custom(_) => EventKind::Custom,
        }
    }

    /// Whether this is user input that should bring a window forward.
    pub fn is_user_input(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::Key | EventKind::Text | EventKind::MouseButton | EventKind::MouseWheel
        )
    }
}

/// Identifies a handler registered in a [`HandlerChain`].
///
/// Ids are unique within the chain that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// An ordered chain of boxed event handlers.
///
/// During dispatch the owner moves the handlers out with
/// [`checkout`](Self::checkout) so that handlers can freely register or
/// remove handlers on the same node; [`restore`](Self::restore) merges those
/// changes back afterwards.
pub struct HandlerChain<F: ?Sized> {
    handlers: Vec<(HandlerId, Box<F>)>,
    next_id: u64,
    /// Ids of the handlers currently checked out.
    checked_out: Vec<HandlerId>,
    removed_while_out: Vec<HandlerId>,
}

impl<F: ?Sized> HandlerChain<F> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 1,
            checked_out: Vec::new(),
            removed_while_out: Vec::new(),
        }
    }

    /// Append a handler; it runs after every handler already in the chain.
    pub fn push(&mut self, handler: Box<F>) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, handler));
        id
    }

    /// Remove a handler. Returns whether `id` was registered.
    ///
    /// While the chain is checked out, removing a checked-out handler is
    /// recorded and applied on [`restore`](Self::restore).
    pub fn remove(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        if self.handlers.len() != before {
            return true;
        }
        if self.checked_out.contains(&id) && !self.removed_while_out.contains(&id) {
            self.removed_while_out.push(id);
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
        let pending = self.checked_out.clone();
        for id in pending {
            if !self.removed_while_out.contains(&id) {
                self.removed_while_out.push(id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = HandlerId> + '_ {
        self.handlers.iter().map(|(id, _)| *id)
    }

    /// Handlers in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<F>> + '_ {
        self.handlers.iter_mut().map(|(_, handler)| handler)
    }

    /// Move the handlers out for dispatch, leaving an empty chain that
    /// collects additions and removals until [`restore`](Self::restore).
    pub fn checkout(&mut self) -> HandlerChain<F> {
        let out = HandlerChain {
            handlers: std::mem::take(&mut self.handlers),
            next_id: self.next_id,
            checked_out: Vec::new(),
            removed_while_out: Vec::new(),
        };
        // Checkouts nest when a handler re-enters dispatch on its own node.
        self.checked_out.extend(out.ids());
        out
    }

    /// Put checked-out handlers back, applying changes made meanwhile.
    pub fn restore(&mut self, mut chain: HandlerChain<F>) {
        let returned: Vec<HandlerId> = chain.ids().collect();
        let removed = &self.removed_while_out;
        chain.handlers.retain(|(id, _)| !removed.contains(id));
        self.checked_out.retain(|id| !returned.contains(id));
        self.removed_while_out.retain(|id| !returned.contains(id));
        chain.handlers.append(&mut self.handlers);
        self.handlers = chain.handlers;
    }
}

impl<F: ?Sized> Default for HandlerChain<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> std::fmt::Debug for HandlerChain<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerChain")
            .field("len", &self.handlers.len())
            .field("checked_out", &self.checked_out.len())
            .finish()
    }
}

/// Event handler attached to a scene entity.
pub type EventHandler = dyn FnMut(&mut Context<'_>, &OsEvent) -> Propagation;

impl Scene {
    /// Append an event handler to an entity's chain.
    pub fn on_event<F>(&mut self, id: NodeId, handler: F) -> GraphResult<HandlerId>
    where
        F: FnMut(&mut Context<'_>, &OsEvent) -> Propagation + 'static,
    {
        let entity = self.tree.get_mut(id).ok_or(GraphError::StaleNode)?;
        let handler_id = entity.handlers.push(Box::new(handler));
        tracing::trace!(target: targets::ROUTER, ?id, ?handler_id, "registered handler");
        Ok(handler_id)
    }

    /// Remove a handler from an entity's chain.
    pub fn remove_handler(&mut self, id: NodeId, handler_id: HandlerId) -> bool {
        self.tree
            .get_mut(id)
            .is_some_and(|entity| entity.handlers.remove(handler_id))
    }

    /// Generator entities in registration order.
    pub fn generators(&self) -> &[NodeId] {
        &self.generators
    }

    /// Drain every generator and route its events through its subtree.
    ///
    /// Returns the number of events routed.
    pub fn os_event_pass(&mut self) -> usize {
        let _span = tracing::debug_span!(target: targets::ROUTER, span_names::OS_EVENT_PASS).entered();
        self.enter_dispatch();
        let mut routed = 0;
        for generator in self.generators.clone() {
            while let Some(event) = self.poll_generator(generator) {
                let _ = self.route(generator, &event);
                routed += 1;
            }
        }
        self.leave_dispatch();
        tracing::debug!(target: targets::ROUTER, routed, "os event pass complete");
        routed
    }

    /// Route a single event through the subtree rooted at `id`.
    ///
    /// Used by embedders that receive events from elsewhere than a
    /// generator entity.
    pub fn send_event(&mut self, id: NodeId, event: &OsEvent) -> Propagation {
        if !self.tree.contains(id) {
            return Propagation::Continue;
        }
        self.enter_dispatch();
        let flow = self.route(id, event);
        self.leave_dispatch();
        flow
    }

    fn poll_generator(&mut self, generator: NodeId) -> Option<OsEvent> {
        let capabilities = self.tree.get(generator)?.capabilities();
        if !capabilities.contains(Capabilities::POLL_OS_EVENT) {
            return None;
        }
        self.with_behavior(generator, |behavior, cx| behavior.poll_os_event(cx))
            .flatten()
    }

    /// Pre-order walk; returns `Stop` if the walk was cut at `start` itself.
    ///
    /// Children are read after their parent has seen the event, so a
    /// handler may reshape its own subtree before the walk descends.
    fn route(&mut self, start: NodeId, event: &OsEvent) -> Propagation {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(entity) = self.tree.get(id) else {
                continue;
            };
            let has_handlers = !entity.handlers.is_empty();
            let handles_events = entity.overrides_handle_os_event();
            let flow = if has_handlers {
                self.run_handlers(id, event)
            } else if handles_events {
                self.with_behavior(id, |behavior, cx| behavior.handle_os_event(cx, event))
                    .unwrap_or_default()
            } else {
                Propagation::Continue
            };
            if flow.is_stop() {
                tracing::trace!(target: targets::ROUTER, ?id, kind = ?event.kind(), "propagation stopped");
                if id == start {
                    return Propagation::Stop;
                }
                // A child stopping only ends its own branch.
                continue;
            }
            stack.extend(self.tree.branches(id).iter().rev().copied());
        }
        Propagation::Continue
    }

    fn run_handlers(&mut self, id: NodeId, event: &OsEvent) -> Propagation {
        let Some(entity) = self.tree.get_mut(id) else {
            return Propagation::Continue;
        };
        let mut chain = entity.handlers.checkout();
        let mut flow = Propagation::Continue;
        for handler in chain.iter_mut() {
            let mut cx = Context::new(self, id);
            if handler(&mut cx, event).is_stop() {
                flow = Propagation::Stop;
                break;
            }
        }
        if let Some(entity) = self.tree.get_mut(id) {
            entity.handlers.restore(chain);
        }
        flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Handler = dyn FnMut(&mut Vec<u32>) -> Propagation;

    #[test]
    fn test_event_kind() {
        assert_eq!(OsEvent::Closed.kind(), EventKind::Closed);
        let key = OsEvent::Key {
            key: "Escape".into(),
            pressed: true,
            repeat: false,
        };
        assert_eq!(key.kind(), EventKind::Key);
        assert!(key.is_user_input());
        assert!(!OsEvent::FocusLost.is_user_input());
    }

    #[test]
    fn test_handler_ids_unique() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let a = chain.push(Box::new(|_| Propagation::Continue));
        let b = chain.push(Box::new(|_| Propagation::Continue));
        assert_ne!(a, b);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_remove() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let a = chain.push(Box::new(|_| Propagation::Continue));
        assert!(chain.remove(a));
        assert!(!chain.remove(a));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_checkout_restore_merges_changes() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let first = chain.push(Box::new(|log| {
            log.push(1);
            Propagation::Continue
        }));
        let second = chain.push(Box::new(|log| {
            log.push(2);
            Propagation::Continue
        }));

        let mut out = chain.checkout();
        let mut log = Vec::new();
        for handler in out.iter_mut() {
            let _ = handler(&mut log);
        }
        // Changes made while dispatching.
        assert!(chain.remove(first));
        let third = chain.push(Box::new(|log| {
            log.push(3);
            Propagation::Continue
        }));
        chain.restore(out);

        assert_eq!(log, vec![1, 2]);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![second, third]);
        // No longer checked out.
        assert!(!chain.remove(first));
    }

    #[test]
    fn test_ids_stay_unique_across_checkout() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let first = chain.push(Box::new(|_| Propagation::Continue));
        let out = chain.checkout();
        let during = chain.push(Box::new(|_| Propagation::Continue));
        assert_ne!(during, first);
        chain.restore(out);
        let after = chain.push(Box::new(|_| Propagation::Continue));
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![first, during, after]);

        // Counters are per chain, so a fresh chain starts over.
        let mut other: HandlerChain<Handler> = HandlerChain::new();
        assert_eq!(other.push(Box::new(|_| Propagation::Continue)), first);
    }

    #[test]
    fn test_remove_while_checked_out_only_reports_known_ids() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let first = chain.push(Box::new(|_| Propagation::Continue));
        let mut unrelated: HandlerChain<Handler> = HandlerChain::new();
        unrelated.push(Box::new(|_| Propagation::Continue));
        let unknown = unrelated.push(Box::new(|_| Propagation::Continue));

        let out = chain.checkout();
        assert!(!chain.remove(unknown));
        assert!(chain.remove(first));
        assert!(!chain.remove(first));
        chain.restore(out);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_nested_checkout_keeps_outer_removals() {
        let mut chain: HandlerChain<Handler> = HandlerChain::new();
        let outer_id = chain.push(Box::new(|_| Propagation::Continue));
        let outer = chain.checkout();
        let inner_id = chain.push(Box::new(|_| Propagation::Continue));
        let inner = chain.checkout();

        // Removed while both are out; applies when the outer chain returns.
        assert!(chain.remove(outer_id));
        chain.restore(inner);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![inner_id]);
        chain.restore(outer);
        assert_eq!(chain.ids().collect::<Vec<_>>(), vec![inner_id]);
    }
}
