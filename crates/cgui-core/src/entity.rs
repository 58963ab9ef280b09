//! Type-erased scene entities.
//!
//! An [`Entity`] owns one boxed behavior value of any type implementing
//! [`Behavior`], the capability flags computed for that type, an optional
//! debug name and the entity's event handler chain.

use std::any::{Any, TypeId};
use std::fmt;

use crate::capability::{Behavior, Capabilities, Propagation};
use crate::error::{GraphError, GraphResult};
use crate::router::{EventHandler, HandlerChain, OsEvent};
use crate::scene::Context;

/// Object-safe view of a [`Behavior`].
pub(crate) trait ErasedBehavior {
    fn create(&mut self, cx: &mut Context<'_>);
    fn destroy(&mut self, cx: &mut Context<'_>);
    fn handle_os_event(&mut self, cx: &mut Context<'_>, event: &OsEvent) -> Propagation;
    fn process_events(&mut self, cx: &mut Context<'_>) -> Propagation;
    fn process_systems(&mut self, cx: &mut Context<'_>) -> Propagation;
    fn process_graphics(&mut self, cx: &mut Context<'_>) -> Propagation;
    fn poll_os_event(&mut self, cx: &mut Context<'_>) -> Option<OsEvent>;
    fn try_clone(&self) -> Option<Box<dyn ErasedBehavior>>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Concrete storage for a behavior value.
struct Model<T> {
    value: T,
    clone_fn: Option<fn(&T) -> T>,
}

impl<T: Behavior> ErasedBehavior for Model<T> {
    fn create(&mut self, cx: &mut Context<'_>) {
        self.value.create(cx);
    }

    fn destroy(&mut self, cx: &mut Context<'_>) {
        self.value.destroy(cx);
    }

    fn handle_os_event(&mut self, cx: &mut Context<'_>, event: &OsEvent) -> Propagation {
        self.value.handle_os_event(cx, event)
    }

    fn process_events(&mut self, cx: &mut Context<'_>) -> Propagation {
        self.value.process_events(cx)
    }

    fn process_systems(&mut self, cx: &mut Context<'_>) -> Propagation {
        self.value.process_systems(cx)
    }

    fn process_graphics(&mut self, cx: &mut Context<'_>) -> Propagation {
        self.value.process_graphics(cx)
    }

    fn poll_os_event(&mut self, cx: &mut Context<'_>) -> Option<OsEvent> {
        self.value.poll_os_event(cx)
    }

    fn try_clone(&self) -> Option<Box<dyn ErasedBehavior>> {
        let clone_fn = self.clone_fn?;
        Some(Box::new(Model {
            value: clone_fn(&self.value),
            clone_fn: Some(clone_fn),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        &mut self.value
    }
}

/// A scene node's payload: a type-erased behavior plus bookkeeping.
pub struct Entity {
    /// `None` while a hook is running on this entity.
    behavior: Option<Box<dyn ErasedBehavior>>,
    type_id: TypeId,
    type_name: &'static str,
    capabilities: Capabilities,
    copyable: bool,
    name: Option<String>,
    pub(crate) handlers: HandlerChain<EventHandler>,
}

impl Entity {
    /// Wrap a behavior value. The entity cannot be copied.
    pub fn new<T: Behavior>(value: T) -> Self {
        Self::from_model(Model {
            value,
            clone_fn: None,
        })
    }

    /// Wrap a behavior value that can be deep-copied with
    /// [`Scene::clone_entity`](crate::Scene::clone_entity).
    pub fn cloneable<T: Behavior + Clone>(value: T) -> Self {
        Self::from_model(Model {
            value,
            clone_fn: Some(T::clone),
        })
    }

    fn from_model<T: Behavior>(model: Model<T>) -> Self {
        let copyable = model.clone_fn.is_some();
        Self {
            behavior: Some(Box::new(model)),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            capabilities: T::CAPABILITIES,
            copyable,
            name: None,
            handlers: HandlerChain::new(),
        }
    }

    /// Builder-style debug name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Full type name of the behavior.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn overrides_poll_os_event(&self) -> bool {
        self.capabilities.contains(Capabilities::POLL_OS_EVENT)
    }

    pub fn overrides_handle_os_event(&self) -> bool {
        self.capabilities.contains(Capabilities::HANDLE_OS_EVENT)
    }

    /// Whether the behavior was registered with a clone function.
    pub fn is_copyable(&self) -> bool {
        self.copyable
    }

    /// Whether the behavior is of type `T`. Works while a hook is running.
    pub fn is<T: Behavior>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the behavior as `T`.
    ///
    /// `None` on a type mismatch or while one of the entity's hooks runs.
    pub fn downcast_ref<T: Behavior>(&self) -> Option<&T> {
        self.behavior.as_ref()?.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Behavior>(&mut self) -> Option<&mut T> {
        self.behavior.as_mut()?.as_any_mut().downcast_mut()
    }

    /// Number of registered event handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Copy the behavior into a fresh entity with no handlers.
    pub fn try_clone(&self) -> GraphResult<Entity> {
        if !self.copyable {
            return Err(GraphError::NotCopyable {
                type_name: self.type_name,
            });
        }
        let behavior = self.behavior.as_ref().ok_or(GraphError::BehaviorInUse)?;
        let cloned = behavior.try_clone().ok_or(GraphError::NotCopyable {
            type_name: self.type_name,
        })?;
        Ok(Self {
            behavior: Some(cloned),
            type_id: self.type_id,
            type_name: self.type_name,
            capabilities: self.capabilities,
            copyable: self.copyable,
            name: self.name.clone(),
            handlers: HandlerChain::new(),
        })
    }

    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn ErasedBehavior>> {
        self.behavior.take()
    }

    pub(crate) fn put_behavior(&mut self, behavior: Box<dyn ErasedBehavior>) {
        self.behavior = Some(behavior);
    }

    pub(crate) fn is_checked_out(&self) -> bool {
        self.behavior.is_none()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type_name", &self.type_name)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
