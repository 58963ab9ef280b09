//! The window forest.
//!
//! [`WindowGraph`] is a [`Tree`] of [`WindowNode`]s. Each node owns one
//! native window; child windows (dialogs, tool panels) never outlive their
//! parent.
//!
//! # Frame protocol
//!
//! [`WindowGraph::process_events`] runs once per application frame:
//!
//! 1. **Open**: windows created since the last frame get their native window
//!    from the backend. A failed open marks the node for removal.
//! 2. **Removal**: every marked subtree is torn down, leaves first. Each node
//!    runs its dealloc callback, closes its native window and is detached.
//! 3. **Events**: every live window is polled, roots first, pre-order. A
//!    frozen window's events go to its frozen callback instead of its handlers.
//!
//! [`WindowGraph::destroy`] only marks. Calling it from a handler, even on the
//! window being dispatched, is safe; the node disappears in the next removal
//! phase.

use cgui_core::logging::{NodeLabel, span_names, targets};
use cgui_core::{HandlerChain, HandlerId, NodeId, OsEvent, PerfSpan, Propagation, Tree};
use static_assertions::assert_not_impl_any;

use std::borrow::Cow;

use crate::error::{WindowError, WindowResult};
use crate::headless::HeadlessWindow;
use crate::hints::WindowHints;
use crate::native::{NativeWindow, WindowBackend};

/// Handle to a window in a [`WindowGraph`].
pub type WindowId = NodeId;

/// Normal event handler.
pub type WindowHandler<W> = dyn FnMut(&mut WindowCtx<'_, W>, &OsEvent) -> Propagation;

/// Receives events for a frozen window.
pub type FrozenHandler<W> = dyn FnMut(&mut WindowCtx<'_, W>, &OsEvent);

/// Runs once, right before the window's native resource is closed.
pub type DeallocHandler<W> = dyn FnOnce(WindowId, Option<&mut W>);

enum NativeSlot<W> {
    /// Waiting for the next frame's open phase.
    Pending,
    Open(W),
    /// Open failed or the window was closed.
    Closed,
}

/// A window node's payload.
pub struct WindowNode<W: NativeWindow> {
    native: NativeSlot<W>,
    hints: WindowHints,
    marked: bool,
    frozen_by: Option<WindowId>,
    handlers: HandlerChain<WindowHandler<W>>,
    on_frozen: Option<Box<FrozenHandler<W>>>,
    on_dealloc: Option<Box<DeallocHandler<W>>>,
}

impl<W: NativeWindow> WindowNode<W> {
    fn new(hints: WindowHints, native: NativeSlot<W>) -> Self {
        Self {
            native,
            hints,
            marked: false,
            frozen_by: None,
            handlers: HandlerChain::new(),
            on_frozen: None,
            on_dealloc: None,
        }
    }

    pub fn hints(&self) -> &WindowHints {
        &self.hints
    }

    pub fn native(&self) -> Option<&W> {
        match &self.native {
            NativeSlot::Open(window) => Some(window),
            _ => None,
        }
    }

    pub fn native_mut(&mut self) -> Option<&mut W> {
        match &mut self.native {
            NativeSlot::Open(window) => Some(window),
            _ => None,
        }
    }

    /// Whether the native window has not been opened yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.native, NativeSlot::Pending)
    }

    /// Whether the native window exists and reports itself open.
    pub fn is_open(&self) -> bool {
        self.native().is_some_and(W::is_open)
    }

    /// Whether the node will be removed in the next removal phase.
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn frozen_by(&self) -> Option<WindowId> {
        self.frozen_by
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn close_native(&mut self) {
        if let NativeSlot::Open(window) = &mut self.native {
            window.close();
        }
        self.native = NativeSlot::Closed;
    }
}

impl<W: NativeWindow> NodeLabel for WindowNode<W> {
    fn label(&self) -> Option<Cow<'_, str>> {
        self.hints.title().map(Cow::Borrowed)
    }

    fn kind(&self) -> Cow<'_, str> {
        let state = match (&self.native, self.marked) {
            (_, true) => "marked",
            (NativeSlot::Pending, _) => "pending",
            (NativeSlot::Open(_), _) if self.frozen_by.is_some() => "frozen",
            (NativeSlot::Open(_), _) => "open",
            (NativeSlot::Closed, _) => "closed",
        };
        Cow::Borrowed(state)
    }
}

/// What happened during one [`WindowGraph::process_events`] call.
#[derive(Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Native windows opened this frame.
    pub opened: usize,
    /// Windows whose native open failed; they were removed this frame.
    pub open_failures: Vec<(WindowId, WindowError)>,
    /// Nodes removed in the removal phase, subtrees included.
    pub removed: usize,
    /// Events delivered to handler chains.
    pub dispatched: usize,
    /// Events diverted to frozen callbacks.
    pub diverted: usize,
}

/// The forest of windows owned by an application.
///
/// Neither `Send` nor `Sync`; native windows belong to the thread that runs
/// the event loop.
pub struct WindowGraph<W: NativeWindow> {
    tree: Tree<WindowNode<W>>,
    /// Nesting of handler calls currently on the stack.
    dispatching: usize,
}

assert_not_impl_any!(WindowGraph<HeadlessWindow>: Send, Sync);

impl<W: NativeWindow> WindowGraph<W> {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            dispatching: 0,
        }
    }

    /// Read access to the underlying tree.
    pub fn tree(&self) -> &Tree<WindowNode<W>> {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.tree.contains(id)
    }

    /// Root windows in creation order.
    pub fn roots(&self) -> &[WindowId] {
        self.tree.roots()
    }

    pub fn node(&self, id: WindowId) -> Option<&WindowNode<W>> {
        self.tree.get(id)
    }

    pub fn stem(&self, id: WindowId) -> Option<WindowId> {
        self.tree.stem(id)
    }

    pub fn children(&self, id: WindowId) -> &[WindowId] {
        self.tree.branches(id)
    }

    pub fn native(&self, id: WindowId) -> Option<&W> {
        self.tree.get(id)?.native()
    }

    pub fn native_mut(&mut self, id: WindowId) -> Option<&mut W> {
        self.tree.get_mut(id)?.native_mut()
    }

    pub fn is_marked(&self, id: WindowId) -> bool {
        self.tree.get(id).is_some_and(WindowNode::is_marked)
    }

    /// Live, unmarked node.
    fn live(&self, id: WindowId) -> WindowResult<&WindowNode<W>> {
        self.tree
            .get(id)
            .filter(|node| !node.marked)
            .ok_or(WindowError::StaleWindow)
    }

    fn live_mut(&mut self, id: WindowId) -> WindowResult<&mut WindowNode<W>> {
        self.tree
            .get_mut(id)
            .filter(|node| !node.marked)
            .ok_or(WindowError::StaleWindow)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Add a window under `parent`, or as a root.
    ///
    /// The id is usable immediately; the native window is opened at the
    /// start of the next [`process_events`](Self::process_events).
    pub fn create(&mut self, hints: WindowHints, parent: Option<WindowId>) -> WindowResult<WindowId> {
        self.insert(WindowNode::new(hints, NativeSlot::Pending), parent)
    }

    /// Add a window and open its native window right away.
    ///
    /// Nothing is inserted if the backend fails.
    pub fn create_now<B>(
        &mut self,
        backend: &mut B,
        hints: WindowHints,
        parent: Option<WindowId>,
    ) -> WindowResult<WindowId>
    where
        B: WindowBackend<Window = W>,
    {
        if let Some(parent) = parent {
            self.live(parent)?;
        }
        let window = backend.open(&hints)?;
        self.insert(WindowNode::new(hints, NativeSlot::Open(window)), parent)
    }

    fn insert(&mut self, node: WindowNode<W>, parent: Option<WindowId>) -> WindowResult<WindowId> {
        let id = match parent {
            Some(parent) => {
                self.live(parent)?;
                self.tree.push(parent, node)?
            }
            None => self.tree.insert_root(node),
        };
        tracing::debug!(target: targets::WINDOW_GRAPH, ?id, ?parent, "created window");
        Ok(id)
    }

    // =========================================================================
    // Destruction
    // =========================================================================

    /// Mark a window and its subtree for removal.
    ///
    /// Nothing is freed until the next removal phase. Returns `false` for
    /// windows already removed; marking twice is harmless.
    pub fn destroy(&mut self, id: WindowId) -> bool {
        let Ok(subtree) = self.tree.preorder(id) else {
            return false;
        };
        for node in subtree {
            if let Some(window) = self.tree.get_mut(node) {
                window.marked = true;
            }
        }
        tracing::debug!(target: targets::WINDOW_GRAPH, ?id, "marked window for removal");
        true
    }

    /// Tear down every marked subtree. Returns the number of nodes removed.
    ///
    /// Refused while a handler is running.
    pub fn apply_window_removal(&mut self) -> WindowResult<usize> {
        if self.dispatching > 0 {
            tracing::warn!(target: targets::WINDOW_GRAPH, "window removal requested during dispatch");
            return Err(WindowError::DispatchInProgress);
        }
        let mut removed = 0;
        for root in self.tree.roots().to_vec() {
            self.sweep(root, &mut removed);
        }
        if removed > 0 {
            tracing::debug!(target: targets::WINDOW_GRAPH, removed, "applied window removal");
        }
        Ok(removed)
    }

    fn sweep(&mut self, root: WindowId, removed: &mut usize) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.is_marked(id) {
                self.teardown(id, removed);
            } else {
                stack.extend(self.tree.branches(id).iter().rev().copied());
            }
        }
    }

    /// Remove `id` and its subtree, last child first, leaves before parents.
    fn teardown(&mut self, id: WindowId, removed: &mut usize) {
        let Ok(mut order) = self.tree.preorder(id) else {
            return;
        };
        // Reversed pre-order visits the last child's subtree first and every
        // node after all of its descendants.
        order.reverse();
        for node_id in order {
            if let Some(node) = self.tree.get_mut(node_id) {
                if let Some(dealloc) = node.on_dealloc.take() {
                    dealloc(node_id, node.native_mut());
                }
                node.close_native();
            }
            if self.tree.remove_leaf(node_id).is_some() {
                tracing::trace!(target: targets::WINDOW_GRAPH, id = ?node_id, "removed window");
                *removed += 1;
            }
        }
    }

    /// Close and remove every window.
    pub fn shutdown(&mut self) -> usize {
        self.dispatching = 0;
        for root in self.tree.roots().to_vec() {
            self.destroy(root);
        }
        self.apply_window_removal().unwrap_or(0)
    }

    // =========================================================================
    // Freezing
    // =========================================================================

    /// Divert `id`'s events away from its handlers until unfrozen.
    ///
    /// While frozen, events go to the [`on_frozen`](Self::on_frozen) callback,
    /// or by default bring `freezer` forward on user input.
    pub fn freeze(&mut self, id: WindowId, freezer: WindowId) -> WindowResult<()> {
        if id == freezer {
            return Err(WindowError::SelfFreeze);
        }
        self.live(freezer)?;
        self.live_mut(id)?.frozen_by = Some(freezer);
        tracing::debug!(target: targets::WINDOW_GRAPH, ?id, ?freezer, "froze window");
        Ok(())
    }

    /// Restore normal dispatch. Returns whether the window was frozen.
    pub fn unfreeze(&mut self, id: WindowId) -> bool {
        let was_frozen = self
            .tree
            .get_mut(id)
            .and_then(|node| node.frozen_by.take())
            .is_some();
        if was_frozen {
            tracing::debug!(target: targets::WINDOW_GRAPH, ?id, "unfroze window");
        }
        was_frozen
    }

    pub fn is_frozen(&self, id: WindowId) -> bool {
        self.tree.get(id).is_some_and(|node| node.frozen_by.is_some())
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Append a handler to the window's chain.
    pub fn on_event<F>(&mut self, id: WindowId, handler: F) -> WindowResult<HandlerId>
    where
        F: FnMut(&mut WindowCtx<'_, W>, &OsEvent) -> Propagation + 'static,
    {
        Ok(self.live_mut(id)?.handlers.push(Box::new(handler)))
    }

    pub fn remove_handler(&mut self, id: WindowId, handler_id: HandlerId) -> bool {
        self.tree
            .get_mut(id)
            .is_some_and(|node| node.handlers.remove(handler_id))
    }

    /// Replace the callback that receives events while the window is frozen.
    pub fn on_frozen<F>(&mut self, id: WindowId, handler: F) -> WindowResult<()>
    where
        F: FnMut(&mut WindowCtx<'_, W>, &OsEvent) + 'static,
    {
        self.live_mut(id)?.on_frozen = Some(Box::new(handler));
        Ok(())
    }

    /// Replace the callback run when the window is removed.
    pub fn on_dealloc<F>(&mut self, id: WindowId, handler: F) -> WindowResult<()>
    where
        F: FnOnce(WindowId, Option<&mut W>) + 'static,
    {
        self.live_mut(id)?.on_dealloc = Some(Box::new(handler));
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// First window, in pre-order over the roots, matching `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<WindowId>
    where
        P: FnMut(WindowId, &WindowNode<W>) -> bool,
    {
        self.tree.roots().iter().find_map(|&root| {
            self.tree
                .preorder(root)
                .ok()?
                .into_iter()
                .find(|&id| self.tree.get(id).is_some_and(|node| predicate(id, node)))
        })
    }

    /// Visit every open, unmarked native window in pre-order.
    pub fn for_each_open<F>(&mut self, mut visit: F)
    where
        F: FnMut(WindowId, &mut W),
    {
        for root in self.tree.roots().to_vec() {
            let _ = self.tree.apply_mut(root, |id, node| {
                if node.marked {
                    return;
                }
                if let NativeSlot::Open(window) = &mut node.native {
                    if window.is_open() {
                        visit(id, window);
                    }
                }
            });
        }
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Run one frame: open pending windows, remove marked ones, dispatch events.
    pub fn process_events<B>(&mut self, backend: &mut B) -> FrameReport
    where
        B: WindowBackend<Window = W>,
    {
        let _span = tracing::debug_span!(target: targets::WINDOW_GRAPH, span_names::WINDOW_FRAME).entered();
        let _perf = PerfSpan::new("window_frame");
        let mut report = FrameReport::default();

        self.open_pending(backend, &mut report);
        // Not dispatching here, so removal cannot be refused.
        report.removed = self.apply_window_removal().unwrap_or(0);

        self.dispatching += 1;
        let mut stack: Vec<WindowId> = self.tree.roots().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if self.dispatch_node(id, &mut report) {
                stack.extend(self.tree.branches(id).iter().rev().copied());
            }
        }
        self.dispatching -= 1;

        tracing::debug!(
            target: targets::WINDOW_GRAPH,
            opened = report.opened,
            removed = report.removed,
            dispatched = report.dispatched,
            diverted = report.diverted,
            "window frame complete"
        );
        report
    }

    fn open_pending<B>(&mut self, backend: &mut B, report: &mut FrameReport)
    where
        B: WindowBackend<Window = W>,
    {
        // Parents open before their children.
        let pending: Vec<WindowId> = self
            .tree
            .roots()
            .iter()
            .filter_map(|&root| self.tree.preorder(root).ok())
            .flatten()
            .filter(|&id| self.tree.get(id).is_some_and(|node| node.is_pending() && !node.marked))
            .collect();
        for id in pending {
            // An earlier failure may have marked this node's ancestor.
            let Some(node) = self.tree.get_mut(id).filter(|node| !node.marked) else {
                continue;
            };
            match backend.open(&node.hints) {
                Ok(window) => {
                    node.native = NativeSlot::Open(window);
                    report.opened += 1;
                }
                Err(err) => {
                    tracing::warn!(target: targets::WINDOW_GRAPH, ?id, error = %err, "failed to open window");
                    node.native = NativeSlot::Closed;
                    self.destroy(id);
                    report.open_failures.push((id, err));
                }
            }
        }
    }

    /// Drain one window's events. Returns whether its children are next.
    fn dispatch_node(&mut self, id: WindowId, report: &mut FrameReport) -> bool {
        if self.tree.get(id).is_none_or(|node| node.marked) {
            return false;
        }
        self.release_dead_freezer(id);

        while let Some(event) = self.native_mut(id).and_then(W::poll_event) {
            match self.tree.get(id).and_then(|node| node.frozen_by) {
                Some(freezer) => {
                    self.divert(id, freezer, &event);
                    report.diverted += 1;
                }
                None => {
                    self.run_handlers(id, &event);
                    report.dispatched += 1;
                }
            }
            // A handler may have closed the native window or marked this node.
            if self.is_marked(id) {
                break;
            }
        }
        true
    }

    fn release_dead_freezer(&mut self, id: WindowId) {
        let Some(freezer) = self.tree.get(id).and_then(|node| node.frozen_by) else {
            return;
        };
        if self.live(freezer).is_err() {
            tracing::debug!(target: targets::WINDOW_GRAPH, ?id, ?freezer, "freezer gone, unfreezing");
            self.unfreeze(id);
        }
    }

    fn run_handlers(&mut self, id: WindowId, event: &OsEvent) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        let mut chain = node.handlers.checkout();
        for handler in chain.iter_mut() {
            let mut cx = WindowCtx { graph: self, id };
            if handler(&mut cx, event).is_stop() {
                break;
            }
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.handlers.restore(chain);
        }
    }

    fn divert(&mut self, id: WindowId, freezer: WindowId, event: &OsEvent) {
        let callback = self.tree.get_mut(id).and_then(|node| node.on_frozen.take());
        match callback {
            Some(mut callback) => {
                {
                    let mut cx = WindowCtx { graph: self, id };
                    callback(&mut cx, event);
                }
                if let Some(node) = self.tree.get_mut(id) {
                    // Keep a replacement installed by the callback itself.
                    node.on_frozen.get_or_insert(callback);
                }
            }
            None => {
                if matches!(event, OsEvent::FocusGained) || event.is_user_input() {
                    if let Some(window) = self.native_mut(freezer) {
                        window.request_focus();
                    }
                }
            }
        }
    }
}

impl<W: NativeWindow> Default for WindowGraph<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: NativeWindow> Drop for WindowGraph<W> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<W: NativeWindow> std::fmt::Debug for WindowGraph<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowGraph")
            .field("len", &self.tree.len())
            .field("roots", &self.tree.roots())
            .field("dispatching", &self.dispatching)
            .finish()
    }
}

/// Access to the graph from inside a window handler.
pub struct WindowCtx<'a, W: NativeWindow> {
    graph: &'a mut WindowGraph<W>,
    id: WindowId,
}

impl<W: NativeWindow> WindowCtx<'_, W> {
    /// The window whose handler is running.
    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn graph(&self) -> &WindowGraph<W> {
        &*self.graph
    }

    pub fn native(&self) -> Option<&W> {
        self.graph.native(self.id)
    }

    pub fn native_mut(&mut self) -> Option<&mut W> {
        self.graph.native_mut(self.id)
    }

    /// Create a child of the running window; it opens next frame.
    pub fn create_child(&mut self, hints: WindowHints) -> WindowResult<WindowId> {
        self.graph.create(hints, Some(self.id))
    }

    pub fn create(&mut self, hints: WindowHints, parent: Option<WindowId>) -> WindowResult<WindowId> {
        self.graph.create(hints, parent)
    }

    /// Mark a window for removal in the next frame.
    pub fn destroy(&mut self, id: WindowId) -> bool {
        self.graph.destroy(id)
    }

    pub fn destroy_self(&mut self) -> bool {
        self.graph.destroy(self.id)
    }

    pub fn freeze(&mut self, id: WindowId, freezer: WindowId) -> WindowResult<()> {
        self.graph.freeze(id, freezer)
    }

    pub fn unfreeze(&mut self, id: WindowId) -> bool {
        self.graph.unfreeze(id)
    }

    pub fn on_event<F>(&mut self, id: WindowId, handler: F) -> WindowResult<HandlerId>
    where
        F: FnMut(&mut WindowCtx<'_, W>, &OsEvent) -> Propagation + 'static,
    {
        self.graph.on_event(id, handler)
    }

    pub fn on_dealloc<F>(&mut self, id: WindowId, handler: F) -> WindowResult<()>
    where
        F: FnOnce(WindowId, Option<&mut W>) + 'static,
    {
        self.graph.on_dealloc(id, handler)
    }

    /// Always refused: removal runs between frames.
    pub fn apply_window_removal(&mut self) -> WindowResult<usize> {
        self.graph.apply_window_removal()
    }
}
