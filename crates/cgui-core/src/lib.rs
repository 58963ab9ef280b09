//! Core systems for cgui.
//!
//! This crate provides the entity/node graph the CIDE presentation layer is
//! built on:
//!
//! - **Node Tree**: generic arena tree with generation-checked ids ([`Tree`])
//! - **Guards**: external references nulled when their node dies ([`GuardSlot`])
//! - **Capabilities**: optional behavior hooks detected at compile time ([`behavior`])
//! - **Entities**: type-erased behavior values living in a [`Scene`]
//! - **Event Routing**: generator polling and cancellable pre-order dispatch
//! - **Progress**: background step sequences reported through atomics
//!
//! # Example
//!
//! ```
//! use cgui_core::{Behavior, Context, OsEvent, Propagation, Scene, behavior};
//!
//! /// Feeds a fixed list of events into the scene.
//! struct Source(Vec<OsEvent>);
//!
//! #[behavior]
//! impl Behavior for Source {
//!     fn poll_os_event(&mut self, _cx: &mut Context<'_>) -> Option<OsEvent> {
//!         self.0.pop()
//!     }
//! }
//!
//! #[derive(Default)]
//! struct KeyCounter(usize);
//!
//! #[behavior]
//! impl Behavior for KeyCounter {
//!     fn handle_os_event(&mut self, _cx: &mut Context<'_>, event: &OsEvent) -> Propagation {
//!         if matches!(event, OsEvent::Key { .. }) {
//!             self.0 += 1;
//!         }
//!         Propagation::Continue
//!     }
//! }
//!
//! let mut scene = Scene::new();
//! let window = scene.create(Source(vec![
//!     OsEvent::FocusGained,
//!     OsEvent::Key { key: "a".into(), pressed: true, repeat: false },
//! ]));
//! let counter = scene.push(window, KeyCounter::default()).unwrap();
//!
//! let stats = scene.run_frame();
//! assert_eq!(stats.os_events, 2);
//! assert_eq!(scene.get::<KeyCounter>(counter).unwrap().0, 1);
//! ```

extern crate self as cgui_core;

mod capability;
mod entity;
mod error;
mod guard;
pub mod logging;
mod node;
pub mod progress;
mod router;
mod scene;

pub use capability::{Behavior, Capabilities, Propagation};
pub use cgui_macros::behavior;
pub use entity::Entity;
pub use error::{GraphError, GraphResult, ProgressError};
pub use guard::GuardSlot;
pub use logging::{NodeLabel, PerfSpan, TreeDebug, TreeFormatOptions, TreeStyle};
pub use node::{NodeId, Tree};
pub use progress::{ProgressHandle, ProgressSequence, ProgressSnapshot};
pub use router::{EventHandler, EventKind, HandlerChain, HandlerId, OsEvent, PointerButton};
pub use scene::{Context, FramePass, FrameStats, Scene};
