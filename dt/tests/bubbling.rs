//! Integration tests for bubbling and child groups
//!
//! These tests drive small trees through the public API only.

use std::cell::RefCell;
use std::rc::Rc;

use dashtree::{Application, ChildListenOptions, ComponentId, Dash, Delivery};
use serde_json::json;

struct Item {
    dash: Dash,
    name: &'static str,
}

fn item(name: &'static str) -> impl FnOnce(Dash) -> Item {
    move |dash| Item { dash, name }
}

type Seen = Rc<RefCell<Vec<(ComponentId, bool, String)>>>;

fn watch_children(parent: &Dash, event: &str, options: ChildListenOptions) -> Seen {
    let seen: Seen = Rc::default();
    let sink = seen.clone();
    parent
        .listen_to_children(event, options)
        .unwrap()
        .on_event(move |event| {
            let name = event.source_as::<Item>().map(|i| i.name.to_string())?;
            sink.borrow_mut().push((event.origin(), event.is_from_deep(), name));
            Ok(())
        });
    seen
}

// =============================================================================
// Group Listening
// =============================================================================

#[test]
fn test_grab_focus_reaches_group_listener() {
    let app = Application::default();
    let list = app.create_root(item("list")).unwrap();
    let first = list.dash.create(item("first")).unwrap();
    let second = list.dash.create(item("second")).unwrap();
    list.dash.add_to_group(&first, "items").unwrap();
    list.dash.add_to_group(&second, "items").unwrap();

    let seen = watch_children(&list.dash, "grabFocus", ChildListenOptions::in_group("items"));
    second.dash.emit("grabFocus", json!(null), Delivery::Sync).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], (second.dash.id(), false, "second".to_string()));
}

#[test]
fn test_group_removal_stops_delivery() {
    let app = Application::default();
    let list = app.create_root(item("list")).unwrap();
    let entry = list.dash.create(item("entry")).unwrap();
    list.dash.add_to_group(&entry, "items").unwrap();

    let seen = watch_children(&list.dash, "grabFocus", ChildListenOptions::in_group("items"));
    list.dash.remove_from_group(&entry, "items").unwrap();
    entry.dash.emit("grabFocus", json!(null), Delivery::Sync).unwrap();

    assert!(seen.borrow().is_empty());
    assert!(!list.dash.is_in_group(&entry, "items").unwrap());
}

#[test]
fn test_groups_follow_the_direct_child_on_the_path() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let panel = root.dash.create(item("panel")).unwrap();
    let button = panel.dash.create(item("button")).unwrap();
    root.dash.add_to_group(&panel, "panels").unwrap();

    // The button is in no group of its own; at the root it bubbles through the panel
    let at_root = watch_children(&root.dash, "click", ChildListenOptions::in_group("panels"));
    let at_panel = watch_children(&panel.dash, "click", ChildListenOptions::in_group("panels"));
    button.dash.emit("click", json!(null), Delivery::Sync).unwrap();

    assert!(at_panel.borrow().is_empty());
    let at_root = at_root.borrow();
    assert_eq!(at_root.len(), 1);
    assert_eq!(at_root[0], (button.dash.id(), true, "button".to_string()));
}

#[test]
fn test_direct_only_ignores_grandchildren() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let mid = root.dash.create(item("mid")).unwrap();
    let leaf = mid.dash.create(item("leaf")).unwrap();

    let seen = watch_children(&root.dash, "ping", ChildListenOptions::default().direct_only());
    leaf.dash.emit("ping", json!(null), Delivery::Sync).unwrap();
    assert!(seen.borrow().is_empty());

    mid.dash.emit("ping", json!(null), Delivery::Sync).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

// =============================================================================
// Propagation
// =============================================================================

#[test]
fn test_stop_propagation_keeps_lower_levels() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let mid = root.dash.create(item("mid")).unwrap();
    let leaf = mid.dash.create(item("leaf")).unwrap();

    let at_root = watch_children(&root.dash, "ping", ChildListenOptions::default());
    mid.dash
        .listen_to_children("ping", ChildListenOptions::default())
        .unwrap()
        .on_event(|event| {
            event.stop_propagation();
            Ok(())
        });
    let own = Rc::new(RefCell::new(0));
    let counter = own.clone();
    leaf.dash
        .on_event("ping", move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        })
        .unwrap();

    leaf.dash.emit("ping", json!(null), Delivery::Sync).unwrap();

    assert_eq!(*own.borrow(), 1);
    assert!(at_root.borrow().is_empty());
}

#[test]
fn test_depth_flag_per_level() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let mid = root.dash.create(item("mid")).unwrap();
    let leaf = mid.dash.create(item("leaf")).unwrap();

    let at_root = watch_children(&root.dash, "ping", ChildListenOptions::default());
    let at_mid = watch_children(&mid.dash, "ping", ChildListenOptions::default());
    leaf.dash.emit("ping", json!(1), Delivery::Sync).unwrap();

    assert!(!at_mid.borrow()[0].1);
    assert!(at_root.borrow()[0].1);
}

#[test]
fn test_depth_flag_is_read_during_dispatch() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let mid = root.dash.create(item("mid")).unwrap();
    let leaf = mid.dash.create(item("leaf")).unwrap();

    let kept = Rc::new(RefCell::new(None));
    let sink = kept.clone();
    mid.dash
        .listen_to_children("ping", ChildListenOptions::default())
        .unwrap()
        .on_event(move |event| {
            *sink.borrow_mut() = Some((event.is_from_deep(), event.clone()));
            Ok(())
        });
    leaf.dash.emit("ping", json!(null), Delivery::Sync).unwrap();

    let (during, event) = kept.borrow_mut().take().unwrap();
    assert!(!during);
    // The root level was visited last
    assert!(event.is_from_deep());
}

#[test]
fn test_emit_all_in_order() {
    let app = Application::default();
    let root = app.create_root(item("root")).unwrap();
    let leaf = root.dash.create(item("leaf")).unwrap();

    let names = Rc::new(RefCell::new(Vec::new()));
    let sink = names.clone();
    root.dash
        .listen_to_children(["a", "b"], ChildListenOptions::default())
        .unwrap()
        .on_event(move |event| {
            sink.borrow_mut().push(event.name().to_string());
            Ok(())
        });

    leaf.dash.emit_all(["b", "a"], json!(null), Delivery::Sync).unwrap();
    assert_eq!(*names.borrow(), vec!["b", "a"]);
}
