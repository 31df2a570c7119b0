//! Interruptible rendering: cooperative yields, lane preemption, buffered
//! render-phase dispatches and abandoned renders.

use std::cell::Cell;
use std::rc::Rc;

use crate::element::{component, host, text, Element, HostProps};
use crate::error::RenderError;
use crate::hooks::Scope;
use crate::lanes::Lane;
use crate::scheduler::RenderOutcome;
use crate::test_utils::{fixture, setter_cell, take_setter, HostOp, SetterCell};
use crate::work_loop::perform_render;

struct ProbeProps {
    label: &'static str,
    renders: Rc<Cell<usize>>,
}

fn probe(_scope: &mut Scope, props: &ProbeProps) -> Element {
    props.renders.set(props.renders.get() + 1);
    host("span", HostProps::new(), vec![text(props.label)])
}

fn pair(a: &Rc<Cell<usize>>, b: &Rc<Cell<usize>>) -> Element {
    host(
        "div",
        HostProps::new(),
        vec![
            component(probe, ProbeProps { label: "a", renders: a.clone() }),
            component(probe, ProbeProps { label: "b", renders: b.clone() }),
        ],
    )
}

#[test]
fn render_without_pending_work_is_idle() {
    let fx = fixture();
    assert_eq!(
        perform_render(fx.root.inner(), Lane::DEFAULT),
        Ok(RenderOutcome::Idle)
    );
    assert_eq!(
        perform_render(fx.root.inner(), Lane::NONE),
        Ok(RenderOutcome::Idle)
    );
}

#[test]
fn yielded_render_resumes_where_it_parked() {
    let a = Rc::new(Cell::new(0));
    let b = Rc::new(Cell::new(0));
    let fx = fixture();
    fx.mount(pair(&a, &b));
    assert_eq!((a.get(), b.get()), (1, 1));

    // Units walk root, div, a, a's text, then b; the fifth check parks.
    fx.scheduler.script_yields(&[false, false, false, false, true]);
    fx.scheduler.with_lane(Lane::DEFAULT, || fx.root.render(pair(&a, &b)));
    assert!(fx.scheduler.run_next_callback());
    assert_eq!((a.get(), b.get()), (2, 1), "parked between the components");
    assert_eq!(fx.container_text(), "ab", "nothing commits while parked");

    assert!(fx.scheduler.run_next_callback());
    assert_eq!((a.get(), b.get()), (2, 2), "resume does not restart the pass");
    assert_eq!(
        fx.scheduler.outcomes(),
        vec![Ok(RenderOutcome::Yielded), Ok(RenderOutcome::Committed)]
    );
}

#[test]
fn sync_renders_never_yield() {
    let a = Rc::new(Cell::new(0));
    let b = Rc::new(Cell::new(0));
    let fx = fixture();
    fx.scheduler.script_yields(&[true; 8]);
    fx.root.render(pair(&a, &b));
    assert!(fx.root.flush_sync().is_ok());
    assert_eq!(fx.container_text(), "ab");
    assert_eq!((a.get(), b.get()), (1, 1));
}

struct CountingProps {
    renders: Rc<Cell<usize>>,
    setter: SetterCell<i64>,
}

fn counting_counter(scope: &mut Scope, props: &CountingProps) -> Element {
    props.renders.set(props.renders.get() + 1);
    let (count, set) = scope.use_state(|| 0i64);
    *props.setter.borrow_mut() = Some(set);
    host("p", HostProps::new(), vec![text(count.to_string())])
}

#[test]
fn higher_priority_lane_discards_a_parked_render() {
    let renders = Rc::new(Cell::new(0));
    let cell = setter_cell::<i64>();
    let fx = fixture();
    fx.mount(component(
        counting_counter,
        CountingProps { renders: renders.clone(), setter: cell.clone() },
    ));
    assert_eq!(renders.get(), 1);
    let set = take_setter(&cell);

    // Park the default render after the root unit, before the component.
    fx.scheduler.script_yields(&[false, true]);
    fx.scheduler.with_lane(Lane::DEFAULT, || set.update(|n| n + 1));
    assert!(fx.scheduler.run_next_callback());
    assert_eq!(renders.get(), 1, "parked before reaching the component");

    // Input arrives while parked.
    fx.scheduler.with_lane(Lane::INPUT, || set.update(|n| n + 10));

    // The parked continuation has been superseded and reports idle; the
    // input callback throws the parked session away and renders fresh,
    // folding only the input-lane update.
    assert!(fx.scheduler.run_next_callback());
    assert!(fx.scheduler.run_next_callback());
    assert_eq!(fx.container_text(), "10");
    assert_eq!(renders.get(), 2);
    assert!(fx.pending_lanes().contains(Lane::DEFAULT));

    // The default update is still queued and lands afterwards.
    assert!(fx.scheduler.run_next_callback());
    assert_eq!(fx.container_text(), "11");
    assert!(fx.pending_lanes().is_empty());
    assert_eq!(
        fx.scheduler.outcomes(),
        vec![
            Ok(RenderOutcome::Yielded),
            Ok(RenderOutcome::Idle),
            Ok(RenderOutcome::Committed),
            Ok(RenderOutcome::Committed),
        ]
    );
}

struct SelfBumpProps {
    renders: Rc<Cell<usize>>,
}

fn self_bump(scope: &mut Scope, props: &SelfBumpProps) -> Element {
    props.renders.set(props.renders.get() + 1);
    let (count, set) = scope.use_state(|| 0i64);
    if count == 0 {
        set.set(1);
    }
    host("p", HostProps::new(), vec![text(count.to_string())])
}

#[test]
fn render_phase_dispatch_lands_in_the_next_render() {
    let renders = Rc::new(Cell::new(0));
    let fx = fixture();
    fx.mount(component(self_bump, SelfBumpProps { renders: renders.clone() }));

    // The first render commits its own value; the dispatch buffered during
    // it is spliced in afterwards and drives exactly one follow-up.
    assert_eq!(fx.container_text(), "1");
    assert_eq!(renders.get(), 2);
    assert!(fx.pending_lanes().is_empty());

    let ops = fx.ops();
    let texts: Vec<&HostOp> = ops
        .iter()
        .filter(|op| matches!(op, HostOp::CreateText { .. } | HostOp::UpdateText { .. }))
        .collect();
    assert!(matches!(
        texts.as_slice(),
        [
            HostOp::CreateText { content: first, .. },
            HostOp::UpdateText { content: second, .. },
        ] if first == "0" && second == "1"
    ));
}

struct FaultyProps {
    panic_now: bool,
    setter: SetterCell<i64>,
}

fn faulty(scope: &mut Scope, props: &FaultyProps) -> Element {
    let (count, set) = scope.use_state(|| 0i64);
    *props.setter.borrow_mut() = Some(set);
    if props.panic_now {
        panic!("boom at {count}");
    }
    host("p", HostProps::new(), vec![text(count.to_string())])
}

#[test]
fn panicking_component_abandons_the_render_and_keeps_the_tree() {
    let cell = setter_cell::<i64>();
    let fx = fixture();
    fx.mount(component(
        faulty,
        FaultyProps { panic_now: false, setter: cell.clone() },
    ));
    take_setter(&cell).set(5);
    fx.flush();
    assert_eq!(fx.container_text(), "5");

    fx.root.render(component(
        faulty,
        FaultyProps { panic_now: true, setter: cell.clone() },
    ));
    let error = fx.root.flush_sync().unwrap_err();
    assert_eq!(
        error,
        RenderError::ComponentPanicked { message: "boom at 5".to_owned() }
    );
    assert_eq!(fx.container_text(), "5", "the committed tree is untouched");
    assert!(fx.pending_lanes().is_empty(), "the failed lane is cleared");

    fx.root.render(component(
        faulty,
        FaultyProps { panic_now: false, setter: cell.clone() },
    ));
    assert!(fx.root.flush_sync().is_ok());
    assert_eq!(fx.container_text(), "5", "state survives the failed render");
}
