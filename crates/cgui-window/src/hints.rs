//! Window creation hints.
//!
//! Every field is optional. The core never interprets them; backends apply
//! the defaults below when a field is unset.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Width used when no width hint is given.
pub const DEFAULT_WIDTH: u32 = 800;
/// Height used when no height hint is given.
pub const DEFAULT_HEIGHT: u32 = 600;
/// Title used when no title hint is given.
pub const DEFAULT_TITLE: &str = "cgui";

/// Options passed to [`WindowGraph::create`](crate::WindowGraph::create).
///
/// # Example
///
/// ```
/// use cgui_window::WindowHints;
///
/// let hints = WindowHints::new()
///     .with_title("Settings")
///     .with_size(480, 320)
///     .with_no_titlebar(true);
///
/// assert_eq!(hints.size_or_default(), (480, 320));
/// assert_eq!(WindowHints::new().title_or_default(), "cgui");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WindowHints {
    width: Option<u32>,
    height: Option<u32>,
    title: Option<String>,
    /// Frames per second cap.
    frame_limit: Option<u32>,
    fullscreen: Option<bool>,
    no_titlebar: Option<bool>,
    resizable: Option<bool>,
    visible: Option<bool>,
    position: Option<(i32, i32)>,
}

impl WindowHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial inner size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_frame_limit(mut self, fps: u32) -> Self {
        self.frame_limit = Some(fps);
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = Some(fullscreen);
        self
    }

    /// Create the window without decorations.
    pub fn with_no_titlebar(mut self, no_titlebar: bool) -> Self {
        self.no_titlebar = Some(no_titlebar);
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = Some(resizable);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Set the initial outer position.
    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn frame_limit(&self) -> Option<u32> {
        self.frame_limit
    }

    pub fn fullscreen(&self) -> Option<bool> {
        self.fullscreen
    }

    pub fn no_titlebar(&self) -> Option<bool> {
        self.no_titlebar
    }

    pub fn resizable(&self) -> Option<bool> {
        self.resizable
    }

    pub fn visible(&self) -> Option<bool> {
        self.visible
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    /// Inner size with defaults applied.
    pub fn size_or_default(&self) -> (u32, u32) {
        (
            self.width.unwrap_or(DEFAULT_WIDTH),
            self.height.unwrap_or(DEFAULT_HEIGHT),
        )
    }

    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let hints = WindowHints::new();
        assert_eq!(hints.size_or_default(), (DEFAULT_WIDTH, DEFAULT_HEIGHT));
        assert_eq!(hints.title_or_default(), DEFAULT_TITLE);
        assert_eq!(hints.fullscreen(), None);
        assert_eq!(hints.position(), None);
    }

    #[test]
    fn test_partial_size() {
        let hints = WindowHints::new().with_width(1024);
        assert_eq!(hints.size_or_default(), (1024, DEFAULT_HEIGHT));
    }

    #[test]
    fn test_builder() {
        let hints = WindowHints::new()
            .with_title("Build Output")
            .with_frame_limit(30)
            .with_resizable(false)
            .with_position(10, -20);
        assert_eq!(hints.title(), Some("Build Output"));
        assert_eq!(hints.frame_limit(), Some(30));
        assert_eq!(hints.resizable(), Some(false));
        assert_eq!(hints.position(), Some((10, -20)));
    }
}
