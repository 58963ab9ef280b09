//! winit-backed native windows.
//!
//! winit delivers events to the application's `ApplicationHandler`, not to
//! individual windows. The handler forwards each one with
//! [`route_window_event`], which translates it and queues it on the matching
//! [`WinitWindow`]; the graph then drains the queue in its event phase.
//!
//! Windows can only be created while the event loop is active, so a
//! [`WinitBackend`] borrows the [`ActiveEventLoop`] for one frame:
//!
//! ```ignore
//! fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
//!     let mut backend = WinitBackend::new(event_loop);
//!     self.graph.process_events(&mut backend);
//!     if self.graph.is_empty() {
//!         event_loop.exit();
//!     }
//! }
//! ```

use std::collections::VecDeque;

use cgui_core::logging::targets;
use cgui_core::{OsEvent, PointerButton};
use winit::dpi::{LogicalPosition, LogicalSize, PhysicalPosition, PhysicalSize, Position, Size};
use winit::event::{ElementState, Ime, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::Key;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId as WinitWindowId};

use crate::error::{WindowError, WindowResult};
use crate::graph::WindowGraph;
use crate::hints::WindowHints;
use crate::native::{Color, NativeWindow, WindowBackend};

/// Opens [`WinitWindow`]s on an active event loop.
pub struct WinitBackend<'a> {
    event_loop: &'a ActiveEventLoop,
}

impl<'a> WinitBackend<'a> {
    pub fn new(event_loop: &'a ActiveEventLoop) -> Self {
        Self { event_loop }
    }
}

impl WindowBackend for WinitBackend<'_> {
    type Window = WinitWindow;

    fn open(&mut self, hints: &WindowHints) -> WindowResult<WinitWindow> {
        let window = self
            .event_loop
            .create_window(hints_to_attributes(hints))
            .map_err(|e| WindowError::OpenFailed(e.to_string()))?;
        tracing::debug!(
            target: targets::WINDOW_BACKEND,
            winit_id = ?window.id(),
            title = hints.title_or_default(),
            "opened winit window"
        );
        Ok(WinitWindow {
            window: Some(window),
            queue: VecDeque::new(),
            clear_color: Color::default(),
            frame_limit: hints.frame_limit(),
        })
    }
}

/// Convert hints to winit attributes, applying defaults for unset fields.
pub fn hints_to_attributes(hints: &WindowHints) -> WindowAttributes {
    let (width, height) = hints.size_or_default();
    let mut attrs = Window::default_attributes()
        .with_title(hints.title_or_default())
        .with_inner_size(Size::Logical(LogicalSize::new(width as f64, height as f64)));

    if let Some((x, y)) = hints.position() {
        attrs = attrs.with_position(Position::Logical(LogicalPosition::new(x as f64, y as f64)));
    }
    if hints.fullscreen().unwrap_or(false) {
        attrs = attrs.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }
    if let Some(no_titlebar) = hints.no_titlebar() {
        attrs = attrs.with_decorations(!no_titlebar);
    }
    if let Some(resizable) = hints.resizable() {
        attrs = attrs.with_resizable(resizable);
    }
    if let Some(visible) = hints.visible() {
        attrs = attrs.with_visible(visible);
    }
    attrs
}

/// A winit window plus the events routed to it since the last poll.
#[derive(Debug)]
pub struct WinitWindow {
    /// `None` once closed; dropping the winit window destroys the OS window.
    window: Option<Window>,
    queue: VecDeque<OsEvent>,
    clear_color: Color,
    frame_limit: Option<u32>,
}

impl WinitWindow {
    /// The winit id, while the window is open.
    pub fn winit_id(&self) -> Option<WinitWindowId> {
        self.window.as_ref().map(Window::id)
    }

    pub fn winit_window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    /// Queue an already translated event.
    pub fn push_event(&mut self, event: OsEvent) {
        if self.window.is_some() {
            self.queue.push_back(event);
        }
    }

    /// Color passed to the last [`clear`](NativeWindow::clear).
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Frames-per-second cap requested at creation.
    pub fn frame_limit(&self) -> Option<u32> {
        self.frame_limit
    }
}

impl NativeWindow for WinitWindow {
    fn is_open(&self) -> bool {
        self.window.is_some()
    }

    fn close(&mut self) {
        if let Some(window) = self.window.take() {
            tracing::debug!(target: targets::WINDOW_BACKEND, winit_id = ?window.id(), "closed winit window");
        }
        self.queue.clear();
    }

    fn poll_event(&mut self) -> Option<OsEvent> {
        self.window.as_ref()?;
        self.queue.pop_front()
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn display(&mut self) {
        if let Some(window) = &self.window {
            window.pre_present_notify();
            window.request_redraw();
        }
    }

    fn size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map(|window| {
                let size = window.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if let Some(window) = &self.window {
            let _ = window.request_inner_size(PhysicalSize::new(width, height));
        }
    }

    fn position(&self) -> Option<(i32, i32)> {
        let position = self.window.as_ref()?.outer_position().ok()?;
        Some((position.x, position.y))
    }

    fn set_position(&mut self, x: i32, y: i32) {
        if let Some(window) = &self.window {
            window.set_outer_position(PhysicalPosition::new(x, y));
        }
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = &self.window {
            window.set_title(title);
        }
    }

    fn request_focus(&mut self) {
        if let Some(window) = &self.window {
            window.focus_window();
        }
    }
}

/// Translate a winit event. Events the graph has no use for map to `None`.
pub fn translate_window_event(event: &WindowEvent) -> Option<OsEvent> {
    let translated = match event {
        WindowEvent::CloseRequested | WindowEvent::Destroyed => OsEvent::Closed,
        WindowEvent::Resized(size) => OsEvent::Resized {
            width: size.width,
            height: size.height,
        },
        WindowEvent::Moved(position) => OsEvent::Moved {
            x: position.x,
            y: position.y,
        },
        WindowEvent::Focused(true) => OsEvent::FocusGained,
        WindowEvent::Focused(false) => OsEvent::FocusLost,
        WindowEvent::KeyboardInput { event, .. } => OsEvent::Key {
            key: key_name(&event.logical_key),
            pressed: event.state == ElementState::Pressed,
            repeat: event.repeat,
        },
        WindowEvent::Ime(Ime::Commit(text)) => OsEvent::Text(text.clone()),
        WindowEvent::CursorMoved { position, .. } => OsEvent::MouseMoved {
            x: position.x,
            y: position.y,
        },
        WindowEvent::MouseInput { state, button, .. } => OsEvent::MouseButton {
            button: pointer_button(*button),
            pressed: *state == ElementState::Pressed,
        },
        WindowEvent::MouseWheel { delta, .. } => {
            let (dx, dy) = match delta {
                MouseScrollDelta::LineDelta(dx, dy) => (*dx, *dy),
                MouseScrollDelta::PixelDelta(position) => (position.x as f32, position.y as f32),
            };
            OsEvent::MouseWheel { dx, dy }
        }
        _ => return None,
    };
    Some(translated)
}

/// Stable name for a logical key: the character for printable keys, the
/// variant name for named keys.
pub fn key_name(key: &Key) -> String {
    match key {
        Key::Character(text) => text.to_string(),
        Key::Named(named) => format!("{named:?}"),
        Key::Unidentified(_) => "Unidentified".to_string(),
        Key::Dead(Some(c)) => format!("Dead({c})"),
        Key::Dead(None) => "Dead".to_string(),
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Left,
        MouseButton::Right => PointerButton::Right,
        MouseButton::Middle => PointerButton::Middle,
        MouseButton::Back => PointerButton::Other(3),
        MouseButton::Forward => PointerButton::Other(4),
        MouseButton::Other(code) => PointerButton::Other(code),
    }
}

/// Queue a winit event on the graph window that owns `winit_id`.
///
/// Returns `false` if no open window matches or the event is not translated.
pub fn route_window_event(
    graph: &mut WindowGraph<WinitWindow>,
    winit_id: WinitWindowId,
    event: &WindowEvent,
) -> bool {
    let Some(translated) = translate_window_event(event) else {
        return false;
    };
    let target = graph.find(|_, node| {
        !node.is_marked() && node.native().and_then(WinitWindow::winit_id) == Some(winit_id)
    });
    let Some(window) = target.and_then(|id| graph.native_mut(id)) else {
        tracing::trace!(target: targets::WINDOW_BACKEND, ?winit_id, "event for unknown window");
        return false;
    };
    window.push_event(translated);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_window_events() {
        assert_eq!(
            translate_window_event(&WindowEvent::CloseRequested),
            Some(OsEvent::Closed)
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Focused(true)),
            Some(OsEvent::FocusGained)
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Resized(PhysicalSize::new(640, 480))),
            Some(OsEvent::Resized {
                width: 640,
                height: 480
            })
        );
        assert_eq!(
            translate_window_event(&WindowEvent::Ime(Ime::Commit("é".to_string()))),
            Some(OsEvent::Text("é".to_string()))
        );
        assert_eq!(translate_window_event(&WindowEvent::RedrawRequested), None);
    }

    #[test]
    fn test_key_names() {
        use winit::keyboard::NamedKey;
        assert_eq!(key_name(&Key::Character("a".into())), "a");
        assert_eq!(key_name(&Key::Named(NamedKey::Escape)), "Escape");
    }

    #[test]
    fn test_hints_to_attributes() {
        let attrs = hints_to_attributes(
            &WindowHints::new()
                .with_title("Find")
                .with_no_titlebar(true)
                .with_resizable(false),
        );
        assert_eq!(attrs.title, "Find");
        assert!(!attrs.decorations);
        assert!(!attrs.resizable);
    }
}
