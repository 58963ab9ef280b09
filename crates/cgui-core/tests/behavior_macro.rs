//! Integration tests for the #[behavior] attribute.

use std::cell::RefCell;
use std::rc::Rc;

use cgui_core::{
    Behavior, Capabilities, Context, Entity, GraphError, OsEvent, Propagation, Scene, behavior,
};

type Log = Rc<RefCell<Vec<&'static str>>>;

// Provides create and process_systems, but no destroy.
struct Partial {
    log: Log,
}

#[behavior]
impl Behavior for Partial {
    fn create(&mut self, _cx: &mut Context<'_>) {
        self.log.borrow_mut().push("create");
    }

    fn process_systems(&mut self, _cx: &mut Context<'_>) -> Propagation {
        self.log.borrow_mut().push("systems");
        Propagation::Continue
    }
}

struct Empty;

#[behavior]
impl Behavior for Empty {}

#[derive(Clone)]
struct Window {
    queue: Vec<OsEvent>,
}

#[behavior]
impl Behavior for Window {
    fn poll_os_event(&mut self, _cx: &mut Context<'_>) -> Option<OsEvent> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }
}

struct Recorder {
    seen: Rc<RefCell<Vec<OsEvent>>>,
    stop: bool,
}

#[behavior]
impl Behavior for Recorder {
    fn handle_os_event(&mut self, _cx: &mut Context<'_>, event: &OsEvent) -> Propagation {
        self.seen.borrow_mut().push(event.clone());
        if self.stop {
            Propagation::Stop
        } else {
            Propagation::Continue
        }
    }
}

// Flags written by hand are taken as given.
struct Muted {
    seen: Rc<RefCell<Vec<OsEvent>>>,
}

impl Behavior for Muted {
    const CAPABILITIES: Capabilities = Capabilities::empty();

    fn handle_os_event(&mut self, _cx: &mut Context<'_>, event: &OsEvent) -> Propagation {
        self.seen.borrow_mut().push(event.clone());
        Propagation::Continue
    }
}

mod custom_path {
    use cgui_core as engine;
    use engine::{Behavior, Context};

    pub struct Renamed;

    #[engine::behavior(crate = engine)]
    impl Behavior for Renamed {
        fn destroy(&mut self, _cx: &mut Context<'_>) {}
    }
}

#[test]
fn test_capabilities_detected() {
    assert_eq!(
        Partial::CAPABILITIES,
        Capabilities::CREATE | Capabilities::PROCESS_SYSTEMS
    );
    assert_eq!(Empty::CAPABILITIES, Capabilities::empty());
    assert_eq!(Window::CAPABILITIES, Capabilities::POLL_OS_EVENT);
    assert_eq!(Recorder::CAPABILITIES, Capabilities::HANDLE_OS_EVENT);
    assert_eq!(
        custom_path::Renamed::CAPABILITIES,
        Capabilities::DESTROY
    );
}

#[test]
fn test_missing_destroy_hook_is_harmless() {
    let log = Log::default();
    let mut scene = Scene::new();
    let root = scene.create(Empty);
    let partial = scene.push(root, Partial { log: log.clone() }).unwrap();
    assert_eq!(*log.borrow(), ["create"]);

    scene.process_systems();
    assert_eq!(*log.borrow(), ["create", "systems"]);

    assert!(scene.delete(root, partial));
    assert!(!scene.contains(partial));
    // Nothing ran for the missing destroy hook.
    assert_eq!(*log.borrow(), ["create", "systems"]);
}

#[test]
fn test_generator_routes_to_subtree() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut scene = Scene::new();
    let window = scene.create(Window {
        queue: vec![OsEvent::FocusGained, OsEvent::Closed],
    });
    scene
        .push(
            window,
            Recorder {
                seen: seen.clone(),
                stop: false,
            },
        )
        .unwrap();

    assert_eq!(scene.generators(), &[window]);
    assert_eq!(scene.os_event_pass(), 2);
    assert_eq!(*seen.borrow(), [OsEvent::FocusGained, OsEvent::Closed]);
    assert_eq!(scene.os_event_pass(), 0);
}

#[test]
fn test_stop_cuts_branch_not_siblings() {
    let first = Rc::new(RefCell::new(Vec::new()));
    let nested = Rc::new(RefCell::new(Vec::new()));
    let sibling = Rc::new(RefCell::new(Vec::new()));

    let mut scene = Scene::new();
    let window = scene.create(Window {
        queue: vec![OsEvent::Custom(7)],
    });
    let stopper = scene
        .push(
            window,
            Recorder {
                seen: first.clone(),
                stop: true,
            },
        )
        .unwrap();
    scene
        .push(
            stopper,
            Recorder {
                seen: nested.clone(),
                stop: false,
            },
        )
        .unwrap();
    scene
        .push(
            window,
            Recorder {
                seen: sibling.clone(),
                stop: false,
            },
        )
        .unwrap();

    scene.os_event_pass();
    assert_eq!(first.borrow().len(), 1);
    assert!(nested.borrow().is_empty());
    assert_eq!(sibling.borrow().len(), 1);
}

#[test]
fn test_handlers_take_precedence_over_hook() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let order = Rc::new(RefCell::new(Vec::new()));

    let mut scene = Scene::new();
    let window = scene.create(Window {
        queue: vec![OsEvent::Text("x".into())],
    });
    let node = scene
        .push(
            window,
            Recorder {
                seen: seen.clone(),
                stop: false,
            },
        )
        .unwrap();

    let first = order.clone();
    scene
        .on_event(node, move |_, _| {
            first.borrow_mut().push(1);
            Propagation::Continue
        })
        .unwrap();
    let second = order.clone();
    scene
        .on_event(node, move |_, _| {
            second.borrow_mut().push(2);
            Propagation::Stop
        })
        .unwrap();
    let third = order.clone();
    scene
        .on_event(node, move |_, _| {
            third.borrow_mut().push(3);
            Propagation::Continue
        })
        .unwrap();

    scene.os_event_pass();
    assert_eq!(*order.borrow(), [1, 2]);
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_handler_can_destroy_its_own_node() {
    let mut scene = Scene::new();
    let window = scene.create(Window {
        queue: vec![OsEvent::Closed, OsEvent::FocusLost],
    });
    let child = scene.push(window, Empty).unwrap();
    let guard = scene.guard(child).unwrap();

    scene
        .on_event(window, |cx, event| {
            if *event == OsEvent::Closed {
                cx.destroy_self();
            }
            Propagation::Continue
        })
        .unwrap();

    // Both events drain before the window is torn down.
    assert_eq!(scene.os_event_pass(), 2);
    assert!(!scene.contains(window));
    assert!(guard.is_null());
    assert!(scene.generators().is_empty());
}

#[test]
fn test_clone_requires_cloneable_registration() {
    let mut scene = Scene::new();
    let plain = scene.create(Window { queue: Vec::new() });
    assert!(matches!(
        scene.clone_entity(plain, None),
        Err(GraphError::NotCopyable { .. })
    ));

    let cloneable = scene.create_entity(Entity::cloneable(Window {
        queue: vec![OsEvent::FocusGained],
    }));
    let copy = scene.clone_entity(cloneable, None).unwrap();
    // The copy is a generator in its own right.
    assert_eq!(scene.generators(), &[plain, cloneable, copy]);
    assert_eq!(scene.os_event_pass(), 2);
}

#[test]
fn test_detected_hooks_are_dispatched_and_hand_written_flags_respected() {
    let muted = Rc::new(RefCell::new(Vec::new()));
    let heard = Rc::new(RefCell::new(Vec::new()));
    let mut scene = Scene::new();
    let window = scene.create(Window {
        queue: vec![OsEvent::FocusGained],
    });
    scene.push(window, Muted { seen: muted.clone() }).unwrap();
    scene
        .push(
            window,
            Recorder {
                seen: heard.clone(),
                stop: false,
            },
        )
        .unwrap();

    assert!(scene.entity(window).unwrap().overrides_poll_os_event());
    assert_eq!(scene.os_event_pass(), 1);
    assert_eq!(*heard.borrow(), [OsEvent::FocusGained]);
    assert!(muted.borrow().is_empty());
}
