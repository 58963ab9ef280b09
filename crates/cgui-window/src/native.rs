//! The boundary between the window graph and the platform.
//!
//! The graph owns one [`NativeWindow`] per node and only calls the methods
//! below; everything about how a window is drawn or created belongs to the
//! backend.

use cgui_core::OsEvent;

use crate::error::WindowResult;
use crate::hints::WindowHints;

/// An RGBA color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// A native OS window owned by exactly one graph node.
pub trait NativeWindow {
    fn is_open(&self) -> bool;

    /// Release the OS window. Later calls are no-ops.
    fn close(&mut self);

    /// Next pending event, or `None` when drained.
    fn poll_event(&mut self) -> Option<OsEvent>;

    fn clear(&mut self, color: Color);

    /// Present the frame drawn since the last `clear`.
    fn display(&mut self);

    /// Inner size in physical pixels.
    fn size(&self) -> (u32, u32);

    fn set_size(&mut self, width: u32, height: u32);

    /// Outer position, if the platform reports one.
    fn position(&self) -> Option<(i32, i32)>;

    fn set_position(&mut self, x: i32, y: i32);

    fn set_title(&mut self, title: &str);

    /// Ask the OS to bring this window forward and give it input focus.
    fn request_focus(&mut self);
}

/// Creates native windows from hints.
pub trait WindowBackend {
    type Window: NativeWindow;

    /// Open a window, applying defaults for unset hints.
    fn open(&mut self, hints: &WindowHints) -> WindowResult<Self::Window>;
}

impl<B: WindowBackend + ?Sized> WindowBackend for &mut B {
    type Window = B::Window;

    fn open(&mut self, hints: &WindowHints) -> WindowResult<Self::Window> {
        (**self).open(hints)
    }
}
