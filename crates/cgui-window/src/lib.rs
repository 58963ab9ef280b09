//! Native window forest for cgui.
//!
//! A [`WindowGraph`] owns every OS window of an application as a tree:
//! dialogs and tool windows are children of the window that spawned them and
//! are torn down with it. Destruction is deferred, so a window can close
//! itself from its own event handler, and a window can be *frozen* by
//! another (a modal dialog freezing its owner) so that its input is diverted.
//!
//! Native windows come from a [`WindowBackend`]. Two are provided:
//!
//! - [`WinitBackend`], opening real windows on an active winit event loop
//! - [`HeadlessBackend`], in-memory windows for tests and tooling
//!
//! # Example
//!
//! ```
//! use cgui_core::{OsEvent, Propagation};
//! use cgui_window::{HeadlessBackend, WindowGraph, WindowHints};
//!
//! let mut backend = HeadlessBackend::new();
//! let mut graph = WindowGraph::new();
//!
//! let main = graph.create(WindowHints::new().with_title("main"), None).unwrap();
//! graph
//!     .on_event(main, |cx, event| {
//!         if *event == OsEvent::Closed {
//!             cx.destroy_self();
//!         }
//!         Propagation::Continue
//!     })
//!     .unwrap();
//!
//! graph.process_events(&mut backend);
//! backend.last_handle().unwrap().push_event(OsEvent::Closed);
//!
//! graph.process_events(&mut backend);
//! assert!(graph.is_marked(main));
//!
//! graph.process_events(&mut backend);
//! assert!(graph.is_empty());
//! ```

mod error;
mod graph;
mod headless;
mod hints;
mod native;
mod winit_backend;

pub use error::{WindowError, WindowResult};
pub use graph::{
    DeallocHandler, FrameReport, FrozenHandler, WindowCtx, WindowGraph, WindowHandler, WindowId,
    WindowNode,
};
pub use headless::{HeadlessBackend, HeadlessHandle, HeadlessWindow};
pub use hints::{DEFAULT_HEIGHT, DEFAULT_TITLE, DEFAULT_WIDTH, WindowHints};
pub use native::{Color, NativeWindow, WindowBackend};
pub use winit_backend::{
    WinitBackend, WinitWindow, hints_to_attributes, key_name, route_window_event,
    translate_window_event,
};
