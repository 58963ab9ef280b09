//! In-memory window backend.
//!
//! [`HeadlessBackend`] opens [`HeadlessWindow`]s that never touch the OS.
//! Each window shares its state with a [`HeadlessHandle`] the caller keeps,
//! so events can be injected and effects (focus requests, presented frames,
//! closing) observed from outside the graph.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cgui_core::OsEvent;
use cgui_core::logging::targets;

use crate::error::{WindowError, WindowResult};
use crate::hints::WindowHints;
use crate::native::{Color, NativeWindow, WindowBackend};

#[derive(Debug, Default)]
struct HeadlessState {
    serial: u64,
    open: bool,
    title: String,
    size: (u32, u32),
    position: (i32, i32),
    events: VecDeque<OsEvent>,
    clear_color: Option<Color>,
    frames_presented: usize,
    focus_requests: usize,
}

/// A window that lives only in memory.
#[derive(Debug)]
pub struct HeadlessWindow {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessWindow {
    /// Open a standalone window with defaults applied to `hints`.
    pub fn new(hints: &WindowHints) -> (Self, HeadlessHandle) {
        let (width, height) = hints.size_or_default();
        let state = Rc::new(RefCell::new(HeadlessState {
            open: true,
            title: hints.title_or_default().to_string(),
            size: (width, height),
            position: hints.position().unwrap_or_default(),
            ..Default::default()
        }));
        (
            Self {
                state: Rc::clone(&state),
            },
            HeadlessHandle { state },
        )
    }
}

impl NativeWindow for HeadlessWindow {
    fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    fn close(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.open {
            state.open = false;
            state.events.clear();
            tracing::trace!(target: targets::WINDOW_BACKEND, serial = state.serial, "closed headless window");
        }
    }

    fn poll_event(&mut self) -> Option<OsEvent> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return None;
        }
        state.events.pop_front()
    }

    fn clear(&mut self, color: Color) {
        self.state.borrow_mut().clear_color = Some(color);
    }

    fn display(&mut self) {
        self.state.borrow_mut().frames_presented += 1;
    }

    fn size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.state.borrow_mut().size = (width, height);
    }

    fn position(&self) -> Option<(i32, i32)> {
        Some(self.state.borrow().position)
    }

    fn set_position(&mut self, x: i32, y: i32) {
        self.state.borrow_mut().position = (x, y);
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn request_focus(&mut self) {
        self.state.borrow_mut().focus_requests += 1;
    }
}

/// Outside view of a [`HeadlessWindow`].
#[derive(Debug, Clone)]
pub struct HeadlessHandle {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessHandle {
    /// Queue an event for the window's next poll. Ignored once closed.
    pub fn push_event(&self, event: OsEvent) {
        let mut state = self.state.borrow_mut();
        if state.open {
            state.events.push_back(event);
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().events.len()
    }

    pub fn focus_requests(&self) -> usize {
        self.state.borrow().focus_requests
    }

    pub fn frames_presented(&self) -> usize {
        self.state.borrow().frames_presented
    }

    pub fn clear_color(&self) -> Option<Color> {
        self.state.borrow().clear_color
    }

    /// Order in which the backend opened this window, starting at 1.
    pub fn serial(&self) -> u64 {
        self.state.borrow().serial
    }
}

/// Backend producing [`HeadlessWindow`]s.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    opened: Vec<HeadlessHandle>,
    fail_next: Option<String>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` call fail with `reason`.
    pub fn fail_next_open(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    /// Handles of every window opened so far, in opening order.
    pub fn handles(&self) -> &[HeadlessHandle] {
        &self.opened
    }

    pub fn last_handle(&self) -> Option<&HeadlessHandle> {
        self.opened.last()
    }

    /// Handle of the first open window with the given title.
    pub fn handle_by_title(&self, title: &str) -> Option<&HeadlessHandle> {
        self.opened
            .iter()
            .find(|handle| handle.is_open() && handle.title() == title)
    }
}

impl WindowBackend for HeadlessBackend {
    type Window = HeadlessWindow;

    fn open(&mut self, hints: &WindowHints) -> WindowResult<HeadlessWindow> {
        if let Some(reason) = self.fail_next.take() {
            tracing::warn!(target: targets::WINDOW_BACKEND, %reason, "headless open failed");
            return Err(WindowError::OpenFailed(reason));
        }
        let (window, handle) = HeadlessWindow::new(hints);
        handle.state.borrow_mut().serial = self.opened.len() as u64 + 1;
        tracing::trace!(target: targets::WINDOW_BACKEND, title = hints.title_or_default(), "opened headless window");
        self.opened.push(handle);
        Ok(window)
    }
}
