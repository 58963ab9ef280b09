//! Optional lifecycle and event hooks for entity behaviors.
//!
//! Any `'static` type can live in a [`Scene`](crate::Scene) by implementing
//! [`Behavior`]. Every hook has a default, so an empty impl is valid. The
//! [`behavior`](crate::behavior) attribute records which hooks an impl block
//! actually provides in [`Behavior::CAPABILITIES`]:
//!
//! ```
//! use cgui_core::{Behavior, Capabilities, Context, Propagation, behavior};
//!
//! struct Clock {
//!     ticks: u64,
//! }
//!
//! #[behavior]
//! impl Behavior for Clock {
//!     fn process_systems(&mut self, _cx: &mut Context<'_>) -> Propagation {
//!         self.ticks += 1;
//!         Propagation::Continue
//!     }
//! }
//!
//! assert_eq!(Clock::CAPABILITIES, Capabilities::PROCESS_SYSTEMS);
//! ```
//!
//! A hook with the wrong signature is a trait-impl mismatch and fails to
//! compile rather than silently falling back to the default. The constant
//! has no default either, so an impl without the attribute that provides a
//! hook cannot be left with empty flags by accident:
//!
//! ```compile_fail
//! use cgui_core::{Behavior, Context, OsEvent};
//!
//! struct Source;
//!
//! impl Behavior for Source {
//!     fn poll_os_event(&mut self, _cx: &mut Context<'_>) -> Option<OsEvent> {
//!         Some(OsEvent::Closed)
//!     }
//! }
//! ```
//!
//! Writing the constant by hand is allowed outside the attribute:
//!
//! ```
//! use cgui_core::{Behavior, Capabilities};
//!
//! struct Marker;
//!
//! impl Behavior for Marker {
//!     const CAPABILITIES: Capabilities = Capabilities::empty();
//! }
//! ```

use std::any::Any;

use bitflags::bitflags;

use crate::router::OsEvent;
use crate::scene::Context;

bitflags! {
    /// The set of hooks a behavior type provides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// [`Behavior::create`]
        const CREATE = 1 << 0;
        /// [`Behavior::destroy`]
        const DESTROY = 1 << 1;
        /// [`Behavior::handle_os_event`]
        const HANDLE_OS_EVENT = 1 << 2;
        /// [`Behavior::process_events`]
        const PROCESS_EVENTS = 1 << 3;
        /// [`Behavior::process_systems`]
        const PROCESS_SYSTEMS = 1 << 4;
        /// [`Behavior::process_graphics`]
        const PROCESS_GRAPHICS = 1 << 5;
        /// [`Behavior::poll_os_event`]
        const POLL_OS_EVENT = 1 << 6;
    }
}

impl Capabilities {
    /// Map a hook method name to its flag.
    pub fn from_hook_name(name: &str) -> Option<Self> {
        Some(match name {
            "create" => Self::CREATE,
            "destroy" => Self::DESTROY,
            "handle_os_event" => Self::HANDLE_OS_EVENT,
            "process_events" => Self::PROCESS_EVENTS,
            "process_systems" => Self::PROCESS_SYSTEMS,
            "process_graphics" => Self::PROCESS_GRAPHICS,
            "poll_os_event" => Self::POLL_OS_EVENT,
            _ => return None,
        })
    }
}

/// Result of a hook or handler that can cut propagation short.
///
/// `Stop` ends the walk down the current branch. Sibling branches are
/// unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[must_use]
pub enum Propagation {
    #[default]
    Continue,
    Stop,
}

impl Propagation {
    pub fn is_stop(self) -> bool {
        self == Self::Stop
    }

    pub fn is_continue(self) -> bool {
        self == Self::Continue
    }
}

/// Per-entity behavior with optional hooks.
///
/// Hooks receive a [`Context`] for the entity they are attached to. While a
/// hook runs, the behavior is checked out of the scene, so looking up the
/// running entity's own value through the context yields `None`.
pub trait Behavior: Any {
    /// Hooks provided by this type. Filled in by [`behavior`](crate::behavior).
    ///
    /// Required: gated hooks (`poll_os_event`, `handle_os_event`) only run
    /// when their flag is set here.
    const CAPABILITIES: Capabilities;

    /// Called once the entity is attached to the scene.
    fn create(&mut self, cx: &mut Context<'_>) {
        let _ = cx;
    }

    /// Called before the entity's children are torn down.
    fn destroy(&mut self, cx: &mut Context<'_>) {
        let _ = cx;
    }

    /// Called for OS events reaching this entity when it has no handlers.
    /// Only dispatched when [`Capabilities::HANDLE_OS_EVENT`] is set.
    fn handle_os_event(&mut self, cx: &mut Context<'_>, event: &OsEvent) -> Propagation {
        let _ = (cx, event);
        Propagation::Continue
    }

    /// Per-frame event processing. `Stop` skips this entity's children.
    fn process_events(&mut self, cx: &mut Context<'_>) -> Propagation {
        let _ = cx;
        Propagation::Continue
    }

    /// Per-frame application logic. `Stop` skips this entity's children.
    fn process_systems(&mut self, cx: &mut Context<'_>) -> Propagation {
        let _ = cx;
        Propagation::Continue
    }

    /// Per-frame draw pass. `Stop` skips this entity's children.
    fn process_graphics(&mut self, cx: &mut Context<'_>) -> Propagation {
        let _ = cx;
        Propagation::Continue
    }

    /// Produce the next pending OS event, or `None` when drained.
    /// Only dispatched when [`Capabilities::POLL_OS_EVENT`] is set.
    fn poll_os_event(&mut self, cx: &mut Context<'_>) -> Option<OsEvent> {
        let _ = cx;
        None
    }
}
