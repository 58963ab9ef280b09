//! Logging and debugging facilities.
//!
//! cgui uses `tracing` for instrumentation. Library crates only emit events;
//! install a subscriber in the application to see them:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("cgui_core::scene=trace,cgui_window=debug")
//!     .init();
//! ```
//!
//! Structural mutation is logged at `trace`, frame passes at `debug`, and
//! rejected operations at `warn`.
//!
//! [`TreeDebug`] renders any [`Tree`] whose payload implements
//! [`NodeLabel`]:
//!
//! ```
//! use cgui_core::logging::{TreeDebug, TreeFormatOptions};
//! use cgui_core::{Behavior, Scene, behavior};
//!
//! struct Panel;
//!
//! #[behavior]
//! impl Behavior for Panel {}
//!
//! let mut scene = Scene::new();
//! let root = scene.create(Panel);
//! scene.set_name(root, "hud");
//!
//! let text = TreeDebug::with_options(TreeFormatOptions::minimal()).format_forest(scene.tree());
//! assert!(text.contains("hud"));
//! ```

use std::borrow::Cow;
use std::fmt::Write as FmtWrite;

use crate::entity::Entity;
use crate::node::{NodeId, Tree};

/// Span names used for tracing.
pub mod span_names {
    /// OS event routing.
    pub const OS_EVENT_PASS: &str = "os_event_pass";
    /// Scene frame passes.
    pub const PASS: &str = "pass";
    /// Window graph frame.
    pub const WINDOW_FRAME: &str = "window_frame";
}

/// Target names for log filtering.
pub mod targets {
    pub const CORE: &str = "cgui_core";
    /// Tree structure changes.
    pub const NODE: &str = "cgui_core::node";
    /// Entity lifecycle and frame passes.
    pub const SCENE: &str = "cgui_core::scene";
    /// OS event routing and handler chains.
    pub const ROUTER: &str = "cgui_core::router";
    /// Background progress sequences.
    pub const PROGRESS: &str = "cgui_core::progress";
    /// Window forest.
    pub const WINDOW_GRAPH: &str = "cgui_window::graph";
    /// Native window backends.
    pub const WINDOW_BACKEND: &str = "cgui_window::backend";
    /// Performance spans.
    pub const PERF: &str = "cgui::perf";
}

/// How a payload describes itself in tree dumps.
pub trait NodeLabel {
    /// Human-readable name, if any.
    fn label(&self) -> Option<Cow<'_, str>>;

    /// Short type or kind description.
    fn kind(&self) -> Cow<'_, str>;
}

impl NodeLabel for Entity {
    fn label(&self) -> Option<Cow<'_, str>> {
        self.name().map(Cow::Borrowed)
    }

    fn kind(&self) -> Cow<'_, str> {
        let full = self.type_name();
        Cow::Borrowed(full.rsplit("::").next().unwrap_or(full))
    }
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// Dash-prefixed lines.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Show node ids.
    pub show_ids: bool,
    /// Show payload kinds.
    pub show_kinds: bool,
    /// Show the number of live guard slots per node.
    pub show_guards: bool,
    /// Maximum depth to descend (None for unlimited).
    pub max_depth: Option<usize>,
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_kinds: true,
            show_guards: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything on.
    pub fn detailed() -> Self {
        Self {
            show_guards: true,
            ..Default::default()
        }
    }

    /// Labels only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_kinds: false,
            show_guards: false,
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: TreeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// Renders trees as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format every root of the forest.
    pub fn format_forest<T: NodeLabel>(&self, tree: &Tree<T>) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "Tree ({} nodes):", tree.len());
        if tree.roots().is_empty() {
            output.push_str("  (empty)\n");
        }
        for &root in tree.roots() {
            self.format_into(tree, root, 0, true, &mut output);
        }
        output
    }

    /// Format the subtree rooted at `id`. Empty for stale ids.
    pub fn format_subtree<T: NodeLabel>(&self, tree: &Tree<T>, id: NodeId) -> String {
        let mut output = String::new();
        self.format_into(tree, id, 0, true, &mut output);
        output
    }

    fn format_into<T: NodeLabel>(
        &self,
        tree: &Tree<T>,
        id: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(value) = tree.get(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        match value.label() {
            Some(label) if !label.is_empty() => output.push_str(&label),
            _ => output.push_str("(unnamed)"),
        }
        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", id);
        }
        if self.options.show_kinds {
            let _ = write!(output, " ({})", value.kind());
        }
        if self.options.show_guards {
            let guards = tree.guard_count(id);
            if guards > 0 {
                let _ = write!(output, " guards={}", guards);
            }
        }
        output.push('\n');

        let children = tree.branches(id);
        let count = children.len();
        for (i, &child) in children.iter().enumerate() {
            self.format_into(tree, child, depth + 1, i + 1 == count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }
        let (branch, middle, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { middle });
        prefix
    }
}

/// An entered `tracing` span that closes when dropped.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}
