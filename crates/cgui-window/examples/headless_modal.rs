//! A modal dialog freezing its owner, run without a display.
//!
//! Run with `RUST_LOG=cgui_window=debug cargo run -p cgui-window --example headless_modal`
//! to see the graph's frame logging.

use cgui_core::{OsEvent, PointerButton, Propagation};
use cgui_window::{HeadlessBackend, NativeWindow, WindowGraph, WindowHints};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut backend = HeadlessBackend::new();
    let mut graph = WindowGraph::new();

    let editor = graph
        .create(WindowHints::new().with_title("editor").with_size(1280, 720), None)
        .expect("create editor");

    // Ctrl+S style shortcut: "s" opens a save dialog that freezes the editor.
    graph
        .on_event(editor, |cx, event| {
            if let OsEvent::Key { key, pressed: true, .. } = event {
                if key == "s" {
                    let dialog = cx
                        .create_child(WindowHints::new().with_title("save").with_size(400, 200))
                        .expect("create dialog");
                    let owner = cx.id();
                    cx.freeze(owner, dialog).expect("freeze editor");
                    cx.on_event(dialog, move |cx, event| {
                        if *event == OsEvent::Closed {
                            cx.unfreeze(owner);
                            cx.destroy_self();
                        }
                        Propagation::Continue
                    })
                    .expect("dialog handler");
                }
            }
            Propagation::Continue
        })
        .expect("editor handler");

    graph.process_events(&mut backend);
    let editor_handle = backend.handle_by_title("editor").expect("editor open").clone();

    editor_handle.push_event(OsEvent::Key {
        key: "s".into(),
        pressed: true,
        repeat: false,
    });
    graph.process_events(&mut backend);
    let report = graph.process_events(&mut backend);
    println!("frame opened {} window(s)", report.opened);

    // Clicks on the frozen editor bring the dialog forward instead.
    editor_handle.push_event(OsEvent::MouseButton {
        button: PointerButton::Left,
        pressed: true,
    });
    graph.process_events(&mut backend);
    let dialog_handle = backend.handle_by_title("save").expect("dialog open").clone();
    println!("dialog focus requests: {}", dialog_handle.focus_requests());

    dialog_handle.push_event(OsEvent::Closed);
    graph.process_events(&mut backend);
    let report = graph.process_events(&mut backend);
    println!(
        "removed {} window(s); editor frozen: {}",
        report.removed,
        graph.is_frozen(editor)
    );

    graph.for_each_open(|id, window| {
        window.display();
        println!("{id:?} presented at {:?}", window.size());
    });
}
