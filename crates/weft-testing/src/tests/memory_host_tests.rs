use weft_core::{HostAdapter, HostProps};

use super::{HostCall, MemoryHost};

#[test]
fn create_and_append_build_the_tree() {
    let mut host = MemoryHost::new();
    let div = host.create_element("div", &HostProps::new().with("id", "main"));
    let hello = host.create_text("hello");
    host.append_child(div, hello);
    host.append_child(MemoryHost::CONTAINER, div);

    assert_eq!(host.node(div).tag(), Some("div"));
    assert_eq!(host.node(hello).text(), Some("hello"));
    assert_eq!(
        host.dump_tree(MemoryHost::CONTAINER),
        "[0] container\n  [1] div id=\"main\"\n    [2] \"hello\"\n"
    );
}

#[test]
fn every_call_is_recorded_in_order() {
    let mut host = MemoryHost::new();
    let span = host.create_element("span", &HostProps::new());
    let word = host.create_text("w");
    host.append_child(span, word);
    host.append_child(MemoryHost::CONTAINER, span);
    host.update_text(word, "x");

    assert_eq!(
        host.take_calls(),
        vec![
            HostCall::CreateElement {
                node: span,
                tag: "span".to_owned(),
            },
            HostCall::CreateText {
                node: word,
                content: "w".to_owned(),
            },
            HostCall::AppendChild {
                parent: span,
                child: word,
            },
            HostCall::AppendChild {
                parent: MemoryHost::CONTAINER,
                child: span,
            },
            HostCall::UpdateText {
                node: word,
                content: "x".to_owned(),
            },
        ]
    );
    assert!(host.calls().is_empty());
    assert_eq!(host.text_content(MemoryHost::CONTAINER), "x");
}

#[test]
fn reattaching_moves_instead_of_duplicating() {
    let mut host = MemoryHost::new();
    let left = host.create_element("left", &HostProps::new());
    let right = host.create_element("right", &HostProps::new());
    let item = host.create_text("x");
    host.append_child(MemoryHost::CONTAINER, left);
    host.append_child(MemoryHost::CONTAINER, right);
    host.append_child(left, item);

    host.append_child(right, item);

    assert!(host.node(left).children().is_empty());
    assert_eq!(host.node(right).children(), &[item]);
    assert_eq!(host.node(item).parent(), Some(right));
}

#[test]
fn insert_before_places_at_the_anchor() {
    let mut host = MemoryHost::new();
    let a = host.create_element("a", &HostProps::new());
    let b = host.create_element("b", &HostProps::new());
    let c = host.create_element("c", &HostProps::new());
    host.append_child(MemoryHost::CONTAINER, a);
    host.append_child(MemoryHost::CONTAINER, b);

    host.insert_before(MemoryHost::CONTAINER, c, b);

    assert_eq!(host.node(MemoryHost::CONTAINER).children(), &[a, c, b]);
}

#[test]
#[should_panic(expected = "anchor")]
fn insert_before_rejects_a_foreign_anchor() {
    let mut host = MemoryHost::new();
    let a = host.create_element("a", &HostProps::new());
    let b = host.create_element("b", &HostProps::new());
    host.insert_before(MemoryHost::CONTAINER, a, b);
}

#[test]
fn removed_nodes_stay_inspectable() {
    let mut host = MemoryHost::new();
    let gone = host.create_text("gone");
    host.append_child(MemoryHost::CONTAINER, gone);
    host.remove_child(MemoryHost::CONTAINER, gone);

    assert!(host.node(MemoryHost::CONTAINER).children().is_empty());
    assert_eq!(host.node(gone).parent(), None);
    assert_eq!(host.node(gone).text(), Some("gone"));
}

#[test]
fn update_element_replaces_props_in_place() {
    let mut host = MemoryHost::new();
    let button = host.create_element("button", &HostProps::new().with("enabled", false));

    host.update_element(button, &HostProps::new().with("enabled", true));

    assert_eq!(
        host.node(button).props(),
        &HostProps::new().with("enabled", true)
    );
    assert_eq!(
        host.take_calls().last(),
        Some(&HostCall::UpdateElement { node: button })
    );
}

#[test]
fn dump_prints_props_sorted_by_name() {
    let mut host = MemoryHost::new();
    let gauge = host.create_element(
        "gauge",
        &HostProps::new()
            .with("width", 3)
            .with("live", true)
            .with("label", "cpu"),
    );
    host.append_child(MemoryHost::CONTAINER, gauge);

    assert_eq!(
        host.dump_tree(gauge),
        "[1] gauge label=\"cpu\" live=true width=3\n"
    );
}
