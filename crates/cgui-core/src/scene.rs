//! The entity scene: a [`Tree`] of [`Entity`] values with hook dispatch.
//!
//! # Lifecycle
//!
//! - Inserting an entity ([`Scene::create`], [`Scene::push`], ...) runs its
//!   `create` hook once the node is attached.
//! - Destroying an entity runs its `destroy` hook, then destroys each child
//!   by the same rule, then nulls the node's guards and frees it.
//! - While any hook, handler or frame pass is running, destruction is
//!   deferred and flushed when the outermost one returns. A hook can therefore
//!   destroy its own entity without invalidating the stack frame it runs in.
//!
//! # Frame passes
//!
//! [`Scene::run_frame`] runs the OS event pass followed by the events,
//! systems and graphics passes. Each pass walks every root in order,
//! pre-order, and skips the children of any entity whose hook returns
//! [`Propagation::Stop`].

use std::any::TypeId;
use std::collections::VecDeque;

use static_assertions::assert_not_impl_any;

use crate::capability::{Behavior, Capabilities, Propagation};
use crate::entity::{Entity, ErasedBehavior};
use crate::error::{GraphError, GraphResult};
use crate::guard::GuardSlot;
use crate::logging::{PerfSpan, span_names, targets};
use crate::node::{NodeId, Tree};
use crate::router::{HandlerId, OsEvent};

/// Per-frame passes that walk the whole scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePass {
    Events,
    Systems,
    Graphics,
}

impl FramePass {
    pub fn name(self) -> &'static str {
        match self {
            Self::Events => "process_events",
            Self::Systems => "process_systems",
            Self::Graphics => "process_graphics",
        }
    }

    fn capability(self) -> Capabilities {
        match self {
            Self::Events => Capabilities::PROCESS_EVENTS,
            Self::Systems => Capabilities::PROCESS_SYSTEMS,
            Self::Graphics => Capabilities::PROCESS_GRAPHICS,
        }
    }
}

/// Counts gathered by [`Scene::run_frame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// OS events routed from generators.
    pub os_events: usize,
    /// Entities whose hooks ran across the three frame passes.
    pub hooks_run: usize,
    /// Entities destroyed during the frame, subtrees included.
    pub destroyed: usize,
}

/// Owner of every entity in an application.
///
/// The scene is single-threaded; it is neither `Send` nor `Sync`.
pub struct Scene {
    pub(crate) tree: Tree<Entity>,
    /// Entities flagged `POLL_OS_EVENT`, in registration order.
    pub(crate) generators: Vec<NodeId>,
    /// Nesting of hooks, handlers and passes currently on the stack.
    depth: usize,
    pending_destroy: VecDeque<NodeId>,
    destroyed: usize,
}

assert_not_impl_any!(Scene: Send, Sync);

impl Scene {
    pub fn new() -> Self {
        Self {
            tree: Tree::new(),
            generators: Vec::new(),
            depth: 0,
            pending_destroy: VecDeque::new(),
            destroyed: 0,
        }
    }

    /// Read access to the underlying tree for structural queries.
    pub fn tree(&self) -> &Tree<Entity> {
        &self.tree
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn roots(&self) -> &[NodeId] {
        self.tree.roots()
    }

    pub fn entity(&self, id: NodeId) -> Option<&Entity> {
        self.tree.get(id)
    }

    /// Whether a hook, handler or pass is currently running.
    pub fn is_dispatching(&self) -> bool {
        self.depth > 0
    }

    /// Destructions waiting for the outermost hook to return.
    pub fn pending_destroy_count(&self) -> usize {
        self.pending_destroy.len()
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Add a root entity wrapping `value`.
    pub fn create<T: Behavior>(&mut self, value: T) -> NodeId {
        self.create_entity(Entity::new(value))
    }

    /// Add a prepared entity as a root.
    pub fn create_entity(&mut self, entity: Entity) -> NodeId {
        let id = self.tree.insert_root(entity);
        self.attached(id);
        id
    }

    /// Add a child entity wrapping `value` at the back of `parent`'s children.
    pub fn push<T: Behavior>(&mut self, parent: NodeId, value: T) -> GraphResult<NodeId> {
        self.push_entity(parent, Entity::new(value))
    }

    /// Add a prepared entity as a child of `parent`.
    pub fn push_entity(&mut self, parent: NodeId, entity: Entity) -> GraphResult<NodeId> {
        let id = self.tree.push(parent, entity)?;
        self.attached(id);
        Ok(id)
    }

    fn attached(&mut self, id: NodeId) {
        if let Some(entity) = self.tree.get(id) {
            tracing::trace!(target: targets::SCENE, ?id, type_name = entity.type_name(), "attached entity");
            if entity.overrides_poll_os_event() {
                self.generators.push(id);
            }
        }
        let _ = self.with_behavior(id, |behavior, cx| behavior.create(cx));
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Detach `child` from `parent` without destroying it; it becomes a root.
    pub fn pop(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        self.tree.pop(parent, child)
    }

    /// Move `id` under `new_parent`.
    pub fn adopt(&mut self, new_parent: NodeId, id: NodeId) -> GraphResult<()> {
        self.tree.adopt(new_parent, id)
    }

    /// Destroy `child` if it is a direct child of `parent`.
    pub fn delete(&mut self, parent: NodeId, child: NodeId) -> bool {
        self.tree.is_child_of(child, parent) && self.destroy(child)
    }

    pub fn delete_back(&mut self, parent: NodeId) -> bool {
        match self.tree.back(parent) {
            Some(child) => self.destroy(child),
            None => false,
        }
    }

    pub fn delete_front(&mut self, parent: NodeId) -> bool {
        match self.tree.front(parent) {
            Some(child) => self.destroy(child),
            None => false,
        }
    }

    /// Destroy an entity and its subtree.
    ///
    /// Deferred while dispatching. Returns `false` if the entity is gone.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        if !self.tree.contains(id) {
            return false;
        }
        if self.depth > 0 {
            if !self.pending_destroy.contains(&id) {
                tracing::trace!(target: targets::SCENE, ?id, "deferring destroy");
                self.pending_destroy.push_back(id);
            }
            return true;
        }
        self.depth += 1;
        self.destroy_subtree(id);
        self.leave_dispatch();
        true
    }

    fn destroy_subtree(&mut self, id: NodeId) {
        // Each entry carries whether the node's destroy hook already ran.
        let mut stack = vec![(id, false)];
        while let Some((node, hooked)) = stack.pop() {
            if !hooked {
                let _ = self.with_behavior(node, |behavior, cx| behavior.destroy(cx));
            }
            // The destroy hook may have added children; they go too.
            if let Some(child) = self.tree.front(node) {
                stack.push((node, true));
                stack.push((child, false));
                continue;
            }
            self.generators.retain(|&generator| generator != node);
            if let Some(entity) = self.tree.remove_leaf(node) {
                tracing::trace!(target: targets::SCENE, id = ?node, type_name = entity.type_name(), "destroyed entity");
                self.destroyed += 1;
            }
        }
    }

    pub(crate) fn enter_dispatch(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave_dispatch(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            while let Some(id) = self.pending_destroy.pop_front() {
                self.destroy(id);
            }
        }
    }

    /// Check the behavior out, run `f` with a context, and put it back.
    ///
    /// `None` if the entity is gone or its behavior is already running.
    pub(crate) fn with_behavior<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut dyn ErasedBehavior, &mut Context<'_>) -> R,
    ) -> Option<R> {
        let entity = self.tree.get_mut(id)?;
        if entity.is_checked_out() {
            tracing::trace!(target: targets::SCENE, ?id, "hook already running, skipped");
            return None;
        }
        let mut behavior = entity.take_behavior()?;
        self.enter_dispatch();
        let result = {
            let mut cx = Context::new(self, id);
            f(behavior.as_mut(), &mut cx)
        };
        if let Some(entity) = self.tree.get_mut(id) {
            entity.put_behavior(behavior);
        }
        self.leave_dispatch();
        Some(result)
    }

    // =========================================================================
    // Copy
    // =========================================================================

    /// Deep-copy the subtree rooted at `id` and attach the copy under
    /// `parent`, or as a root when `parent` is `None`.
    ///
    /// Fails with [`GraphError::NotCopyable`] naming the first entity in the
    /// subtree that cannot be copied; nothing is inserted in that case.
    /// Handlers are not copied. Create hooks run on the copies once the whole
    /// copy is attached.
    pub fn clone_entity(&mut self, id: NodeId, parent: Option<NodeId>) -> GraphResult<NodeId> {
        let order = self.tree.preorder(id)?;
        if let Some(parent) = parent {
            if !self.tree.contains(parent) {
                return Err(GraphError::StaleNode);
            }
        }
        let mut copies = Vec::with_capacity(order.len());
        for &node in &order {
            let entity = self.tree.get(node).ok_or(GraphError::StaleNode)?;
            copies.push((node, entity.try_clone()?));
        }

        let mut mapping: Vec<(NodeId, NodeId)> = Vec::with_capacity(copies.len());
        for (original, entity) in copies {
            let new_parent = if original == id {
                parent
            } else {
                let source_parent = self.tree.stem(original);
                mapping
                    .iter()
                    .find(|(from, _)| Some(*from) == source_parent)
                    .map(|(_, to)| *to)
            };
            let new_id = match new_parent {
                Some(new_parent) => self.tree.push(new_parent, entity)?,
                None => self.tree.insert_root(entity),
            };
            mapping.push((original, new_id));
        }

        tracing::debug!(target: targets::SCENE, source = ?id, count = mapping.len(), "cloned subtree");
        self.enter_dispatch();
        for &(_, copy) in &mapping {
            self.attached(copy);
        }
        self.leave_dispatch();
        mapping
            .first()
            .map(|(_, copy)| *copy)
            .ok_or(GraphError::StaleNode)
    }

    // =========================================================================
    // Typed queries
    // =========================================================================

    /// Borrow an entity's behavior as `T`.
    pub fn get<T: Behavior>(&self, id: NodeId) -> Option<&T> {
        self.tree.get(id)?.downcast_ref()
    }

    pub fn get_mut<T: Behavior>(&mut self, id: NodeId) -> Option<&mut T> {
        self.tree.get_mut(id)?.downcast_mut()
    }

    /// Whether the entity's behavior is a `T`.
    pub fn is<T: Behavior>(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some_and(Entity::is::<T>)
    }

    /// Whether any ancestor of `id` holds a `T`.
    pub fn is_descendant_of_type<T: Behavior>(&self, id: NodeId) -> bool {
        self.find_ancestor::<T>(id).is_some()
    }

    /// Whether the parent of `id` holds a `T`.
    pub fn is_child_of_type<T: Behavior>(&self, id: NodeId) -> bool {
        self.tree.stem(id).is_some_and(|parent| self.is::<T>(parent))
    }

    /// Closest ancestor of `id` holding a `T`.
    pub fn find_ancestor<T: Behavior>(&self, id: NodeId) -> Option<NodeId> {
        let target = TypeId::of::<T>();
        let mut current = self.tree.stem(id);
        while let Some(ancestor) = current {
            if self.tree.get(ancestor)?.type_id() == target {
                return Some(ancestor);
            }
            current = self.tree.stem(ancestor);
        }
        None
    }

    /// Register a guard slot on an entity.
    pub fn guard(&mut self, id: NodeId) -> GraphResult<GuardSlot> {
        self.tree.guard(id)
    }

    // =========================================================================
    // Names
    // =========================================================================

    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> bool {
        match self.tree.get_mut(id) {
            Some(entity) => {
                entity.set_name(Some(name.into()));
                true
            }
            None => false,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.tree.get(id)?.name()
    }

    /// First entity named `name`, searching each root's subtree in order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.tree.roots().iter().find_map(|&root| {
            self.tree
                .preorder(root)
                .ok()?
                .into_iter()
                .find(|&id| self.name(id) == Some(name))
        })
    }

    // =========================================================================
    // Frame passes
    // =========================================================================

    pub fn process_events(&mut self) -> usize {
        self.run_pass(FramePass::Events)
    }

    pub fn process_systems(&mut self) -> usize {
        self.run_pass(FramePass::Systems)
    }

    pub fn process_graphics(&mut self) -> usize {
        self.run_pass(FramePass::Graphics)
    }

    /// Run one pass over every root. Returns how many hooks ran.
    pub fn run_pass(&mut self, pass: FramePass) -> usize {
        let _span = tracing::debug_span!(target: targets::SCENE, span_names::PASS, name = pass.name()).entered();
        self.enter_dispatch();
        let mut hooks_run = 0;
        let mut stack: Vec<NodeId> = self.tree.roots().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let flow = self
                .with_behavior(id, |behavior, cx| match pass {
                    FramePass::Events => behavior.process_events(cx),
                    FramePass::Systems => behavior.process_systems(cx),
                    FramePass::Graphics => behavior.process_graphics(cx),
                })
                .inspect(|_| hooks_run += 1)
                .unwrap_or_default();
            // Stop skips the node's children, not its siblings.
            if flow.is_continue() {
                stack.extend(self.tree.branches(id).iter().rev().copied());
            }
        }
        self.leave_dispatch();
        hooks_run
    }

    /// Entities whose type provides the hook for `pass`.
    pub fn count_overriding(&self, pass: FramePass) -> usize {
        self.tree
            .iter()
            .filter(|(_, entity)| entity.capabilities().contains(pass.capability()))
            .count()
    }

    /// OS event pass, then the events, systems and graphics passes.
    pub fn run_frame(&mut self) -> FrameStats {
        let _perf = PerfSpan::new("scene_frame");
        let destroyed_before = self.destroyed;
        let os_events = self.os_event_pass();
        let hooks_run = self.process_events() + self.process_systems() + self.process_graphics();
        let stats = FrameStats {
            os_events,
            hooks_run,
            destroyed: self.destroyed - destroyed_before,
        };
        tracing::debug!(target: targets::SCENE, ?stats, "frame complete");
        stats
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.depth = 0;
        for root in self.tree.roots().to_vec() {
            self.destroy(root);
        }
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("len", &self.tree.len())
            .field("roots", &self.tree.roots())
            .field("generators", &self.generators)
            .finish()
    }
}

/// Access to the scene from inside a hook or handler.
pub struct Context<'a> {
    scene: &'a mut Scene,
    id: NodeId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(scene: &'a mut Scene, id: NodeId) -> Self {
        Self { scene, id }
    }

    /// The entity whose hook is running.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    pub fn stem(&self) -> Option<NodeId> {
        self.scene.tree.stem(self.id)
    }

    pub fn get<T: Behavior>(&self, id: NodeId) -> Option<&T> {
        self.scene.get(id)
    }

    pub fn get_mut<T: Behavior>(&mut self, id: NodeId) -> Option<&mut T> {
        self.scene.get_mut(id)
    }

    /// Add a child to the running entity.
    pub fn push<T: Behavior>(&mut self, value: T) -> GraphResult<NodeId> {
        self.scene.push(self.id, value)
    }

    pub fn push_to<T: Behavior>(&mut self, parent: NodeId, value: T) -> GraphResult<NodeId> {
        self.scene.push(parent, value)
    }

    /// Add an event handler to the running entity.
    pub fn on_event<F>(&mut self, handler: F) -> GraphResult<HandlerId>
    where
        F: FnMut(&mut Context<'_>, &OsEvent) -> Propagation + 'static,
    {
        self.scene.on_event(self.id, handler)
    }

    pub fn remove_handler(&mut self, handler_id: HandlerId) -> bool {
        self.scene.remove_handler(self.id, handler_id)
    }

    /// Destroy `id` once the outermost running hook returns.
    pub fn destroy_later(&mut self, id: NodeId) -> bool {
        self.scene.destroy(id)
    }

    pub fn destroy_self(&mut self) -> bool {
        self.scene.destroy(self.id)
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> bool {
        self.scene.set_name(self.id, name)
    }

    pub fn guard(&mut self, id: NodeId) -> GraphResult<GuardSlot> {
        self.scene.guard(id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::behavior;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Records every hook into a shared log.
    struct Recorder {
        tag: &'static str,
        log: Log,
    }

    impl Recorder {
        fn new(tag: &'static str, log: &Log) -> Self {
            Self {
                tag,
                log: log.clone(),
            }
        }

        fn record(&self, what: &str) {
            self.log.borrow_mut().push(format!("{}:{}", what, self.tag));
        }
    }

    impl Behavior for Recorder {
        const CAPABILITIES: Capabilities = Capabilities::all();

        fn create(&mut self, _cx: &mut Context<'_>) {
            self.record("create");
        }

        fn destroy(&mut self, _cx: &mut Context<'_>) {
            self.record("destroy");
        }

        fn process_systems(&mut self, _cx: &mut Context<'_>) -> Propagation {
            self.record("systems");
            if self.tag == "stop" {
                Propagation::Stop
            } else {
                Propagation::Continue
            }
        }
    }

    #[derive(Clone)]
    struct Plain(u8);

    #[behavior]
    impl Behavior for Plain {}

    struct Sticky;

    #[behavior]
    impl Behavior for Sticky {}

    fn take(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.borrow_mut())
    }

    #[test]
    fn test_create_runs_on_attach() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = scene.create(Recorder::new("root", &log));
        scene.push(root, Recorder::new("child", &log)).unwrap();
        assert_eq!(take(&log), ["create:root", "create:child"]);
    }

    #[test]
    fn test_destroy_order() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = scene.create(Recorder::new("root", &log));
        let a = scene.push(root, Recorder::new("a", &log)).unwrap();
        scene.push(a, Recorder::new("a1", &log)).unwrap();
        scene.push(root, Recorder::new("b", &log)).unwrap();
        take(&log);

        assert!(scene.destroy(root));
        assert_eq!(
            take(&log),
            ["destroy:root", "destroy:a", "destroy:a1", "destroy:b"]
        );
        assert!(scene.is_empty());
    }

    #[test]
    fn test_destroy_from_hook_is_deferred() {
        struct SelfDestruct;

        #[behavior]
        impl Behavior for SelfDestruct {
            fn process_systems(&mut self, cx: &mut Context<'_>) -> Propagation {
                assert!(cx.destroy_self());
                // Still alive until the pass ends.
                assert!(cx.scene().contains(cx.id()));
                Propagation::Continue
            }
        }

        let mut scene = Scene::new();
        let id = scene.create(SelfDestruct);
        let other = scene.create(Plain(0));
        let stats = scene.run_frame();
        assert!(!scene.contains(id));
        assert!(scene.contains(other));
        assert_eq!(stats.destroyed, 1);
    }

    #[test]
    fn test_stop_skips_children_only() {
        let log = Log::default();
        let mut scene = Scene::new();
        let root = scene.create(Recorder::new("root", &log));
        let stop = scene.push(root, Recorder::new("stop", &log)).unwrap();
        scene.push(stop, Recorder::new("hidden", &log)).unwrap();
        scene.push(root, Recorder::new("sibling", &log)).unwrap();
        take(&log);

        scene.process_systems();
        assert_eq!(
            take(&log),
            ["systems:root", "systems:stop", "systems:sibling"]
        );
    }

    #[test]
    fn test_typed_queries() {
        let mut scene = Scene::new();
        let root = scene.create(Sticky);
        let mid = scene.push(root, Plain(1)).unwrap();
        let leaf = scene.push(mid, Plain(2)).unwrap();

        assert!(scene.is::<Sticky>(root));
        assert!(scene.is_child_of_type::<Plain>(leaf));
        assert!(!scene.is_child_of_type::<Sticky>(leaf));
        assert!(scene.is_descendant_of_type::<Sticky>(leaf));
        assert_eq!(scene.find_ancestor::<Sticky>(leaf), Some(root));
        assert_eq!(scene.find_ancestor::<Plain>(leaf), Some(mid));
        assert_eq!(scene.find_ancestor::<Plain>(mid), None);
        assert_eq!(scene.get::<Plain>(leaf).map(|p| p.0), Some(2));
        scene.get_mut::<Plain>(leaf).unwrap().0 = 9;
        assert_eq!(scene.get::<Plain>(leaf).map(|p| p.0), Some(9));
        assert!(scene.get::<Sticky>(leaf).is_none());
    }

    #[test]
    fn test_clone_entity_deep() {
        let mut scene = Scene::new();
        let root = scene.create_entity(Entity::cloneable(Plain(1)).with_name("original"));
        scene.push_entity(root, Entity::cloneable(Plain(2))).unwrap();

        let copy = scene.clone_entity(root, None).unwrap();
        assert_ne!(copy, root);
        assert_eq!(scene.roots(), &[root, copy]);
        assert_eq!(scene.tree().branch_count(copy), 1);
        let child = scene.tree().front(copy).unwrap();
        assert_eq!(scene.get::<Plain>(child).map(|p| p.0), Some(2));
        assert_eq!(scene.name(copy), Some("original"));
    }

    #[test]
    fn test_clone_entity_not_copyable_leaves_scene_untouched() {
        let mut scene = Scene::new();
        let root = scene.create_entity(Entity::cloneable(Plain(1)));
        scene.push(root, Sticky).unwrap();

        let err = scene.clone_entity(root, None).unwrap_err();
        assert!(matches!(err, GraphError::NotCopyable { type_name } if type_name.ends_with("Sticky")));
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.roots(), &[root]);
    }

    #[test]
    fn test_guard_nulled_with_subtree() {
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let child = scene.push(root, Plain(1)).unwrap();
        let slot = scene.guard(child).unwrap();
        assert!(scene.delete(root, child));
        assert!(slot.is_null());
        assert!(!scene.delete(root, child));
    }

    #[test]
    fn test_names() {
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let child = scene.push(root, Plain(1)).unwrap();
        assert!(scene.set_name(child, "status-bar"));
        assert_eq!(scene.find_by_name("status-bar"), Some(child));
        assert_eq!(scene.find_by_name("missing"), None);
    }

    #[test]
    fn test_drop_runs_destroy_hooks() {
        let log = Log::default();
        {
            let mut scene = Scene::new();
            let root = scene.create(Recorder::new("root", &log));
            scene.push(root, Recorder::new("child", &log)).unwrap();
            take(&log);
        }
        assert_eq!(take(&log), ["destroy:root", "destroy:child"]);
    }

    #[test]
    fn test_child_created_in_create_hook() {
        struct Parent;

        #[behavior]
        impl Behavior for Parent {
            fn create(&mut self, cx: &mut Context<'_>) {
                cx.push(Plain(7)).unwrap();
            }
        }

        let mut scene = Scene::new();
        let id = scene.create(Parent);
        assert_eq!(scene.tree().branch_count(id), 1);
    }

    /// Emits its queued events, last first.
    struct Source(Vec<OsEvent>);

    #[behavior]
    impl Behavior for Source {
        fn poll_os_event(&mut self, _cx: &mut Context<'_>) -> Option<OsEvent> {
            self.0.pop()
        }
    }

    /// Counts the OS events that reach it.
    struct Listener(Rc<RefCell<usize>>);

    #[behavior]
    impl Behavior for Listener {
        fn handle_os_event(&mut self, _cx: &mut Context<'_>, _event: &OsEvent) -> Propagation {
            *self.0.borrow_mut() += 1;
            Propagation::Continue
        }
    }

    struct Ticker(u32);

    #[behavior]
    impl Behavior for Ticker {
        fn process_systems(&mut self, _cx: &mut Context<'_>) -> Propagation {
            self.0 += 1;
            Propagation::Continue
        }
    }

    #[test]
    fn test_send_event_routes_one_subtree() {
        let hits = Rc::new(RefCell::new(0));
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let target = scene.push(root, Listener(hits.clone())).unwrap();
        scene.push(target, Listener(hits.clone())).unwrap();
        let other = scene.push(root, Listener(hits.clone())).unwrap();

        assert_eq!(
            scene.send_event(target, &OsEvent::FocusGained),
            Propagation::Continue
        );
        assert_eq!(*hits.borrow(), 2);

        scene.on_event(other, |_, _| Propagation::Stop).unwrap();
        assert_eq!(scene.send_event(other, &OsEvent::FocusLost), Propagation::Stop);
        // The handler ran instead of the hook.
        assert_eq!(*hits.borrow(), 2);

        assert!(scene.destroy(other));
        assert_eq!(scene.send_event(other, &OsEvent::Closed), Propagation::Continue);
        assert!(!scene.is_dispatching());
    }

    #[test]
    fn test_pop_keeps_subtree_alive_as_root() {
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let source = scene.push(root, Source(vec![OsEvent::Closed])).unwrap();
        let leaf = scene.push(source, Plain(1)).unwrap();
        let slot = scene.guard(leaf).unwrap();
        assert_eq!(scene.tree().level(source), Some(1));

        assert_eq!(scene.pop(root, source), Some(source));
        assert_eq!(scene.roots(), &[root, source]);
        assert_eq!(scene.tree().level(source), Some(0));
        assert_eq!(scene.tree().stem(source), None);
        assert!(!scene.delete(root, source));

        // Still polled after leaving its parent.
        assert_eq!(scene.generators(), &[source]);
        assert_eq!(scene.os_event_pass(), 1);

        // Destroying the old parent leaves the popped subtree alone.
        assert!(scene.destroy(root));
        assert!(scene.contains(source));
        assert_eq!(slot.get(), Some(leaf));
        assert_eq!(scene.pop(root, source), None);
    }

    #[test]
    fn test_adopt_moves_subtree() {
        let log = Log::default();
        let mut scene = Scene::new();
        let a = scene.create(Plain(0));
        let b = scene.create(Plain(1));
        let moved = scene.push(a, Recorder::new("moved", &log)).unwrap();
        let nested = scene.push(moved, Plain(2)).unwrap();

        scene.adopt(b, moved).unwrap();
        assert_eq!(scene.tree().stem(moved), Some(b));
        assert_eq!(scene.tree().branch_count(a), 0);
        assert_eq!(scene.tree().level(nested), Some(2));
        assert_eq!(scene.adopt(nested, b), Err(GraphError::CircularParentage));

        take(&log);
        assert!(scene.destroy(b));
        assert_eq!(take(&log), ["destroy:moved"]);
        assert!(!scene.contains(nested));
        assert!(scene.contains(a));
    }

    #[test]
    fn test_count_overriding_and_hooks_run() {
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let outer = scene.push(root, Ticker(0)).unwrap();
        let inner = scene.push(outer, Ticker(0)).unwrap();
        scene.push(root, Plain(1)).unwrap();

        assert_eq!(scene.count_overriding(FramePass::Systems), 2);
        assert_eq!(scene.count_overriding(FramePass::Events), 0);
        assert_eq!(scene.count_overriding(FramePass::Graphics), 0);

        // Passes visit every entity; the default hooks are no-ops.
        let stats = scene.run_frame();
        assert_eq!(
            stats,
            FrameStats {
                os_events: 0,
                hooks_run: 12,
                destroyed: 0,
            }
        );
        assert_eq!(scene.get::<Ticker>(inner).map(|t| t.0), Some(1));
        assert_eq!(scene.process_systems(), 4);
        assert_eq!(scene.get::<Ticker>(outer).map(|t| t.0), Some(2));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        const DEPTH: usize = 100_000;
        let hits = Rc::new(RefCell::new(0));
        let mut scene = Scene::new();
        let root = scene.create(Plain(0));
        let mut tip = root;
        for _ in 0..DEPTH {
            tip = scene.push(tip, Listener(hits.clone())).unwrap();
        }
        let slot = scene.guard(tip).unwrap();

        assert_eq!(
            scene.send_event(root, &OsEvent::FocusGained),
            Propagation::Continue
        );
        assert_eq!(*hits.borrow(), DEPTH);
        assert_eq!(scene.process_systems(), DEPTH + 1);

        assert!(scene.destroy(root));
        assert!(scene.is_empty());
        assert!(slot.is_null());
    }
}
